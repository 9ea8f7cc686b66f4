use std::borrow::Cow;

#[inline(always)]
fn hex_value(c: u8) -> Option<u8> {
    char::from(c).to_digit(16).map(|d| d as u8)
}

/// Decodes one key segment or value of a querystring:
/// - `+` becomes a space
/// - `%XX` sequences become the byte they encode; a `%` that is not
///   followed by two hex digits is kept verbatim
/// - the resulting bytes are read as UTF-8, with invalid sequences
///   replaced by `U+FFFD`
///
/// Borrows from the input when there is nothing to decode.
pub fn decode(input: &[u8]) -> Cow<'_, str> {
    if !input.iter().any(|&b| b == b'+' || b == b'%') {
        return String::from_utf8_lossy(input);
    }

    let mut decoded = Vec::with_capacity(input.len());
    let mut idx = 0;
    while idx < input.len() {
        match input[idx] {
            b'+' => {
                decoded.push(b' ');
                idx += 1;
            }
            b'%' => {
                let pair = input
                    .get(idx + 1)
                    .and_then(|&h| hex_value(h))
                    .zip(input.get(idx + 2).and_then(|&l| hex_value(l)));
                match pair {
                    Some((h, l)) => {
                        decoded.push(h * 0x10 + l);
                        idx += 3;
                    }
                    None => {
                        decoded.push(b'%');
                        idx += 1;
                    }
                }
            }
            b => {
                decoded.push(b);
                idx += 1;
            }
        }
    }

    match String::from_utf8(decoded) {
        Ok(s) => Cow::Owned(s),
        Err(e) => Cow::Owned(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}
