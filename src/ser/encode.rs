use std::borrow::Cow;

use percent_encoding::AsciiSet;

/// As defined in https://url.spec.whatwg.org/#query-percent-encode-set
///
/// The set of characters that need to be encoded in a _query_ string
/// are:
/// - CONTROL characters
/// - SPACE (but we'll separately encode it as `+`)
/// - U+0022 ("), U+0023 (#), U+003C (<), and U+003E (>).
///
/// NOTE: we add our querystring-specific characters here
/// because the encode method is only ever called on
/// keys and values. `%` is included so that a literal `%41`
/// does not decode to `A` on the way back.
const MINIMAL_QS_SET: &AsciiSet = &percent_encoding::CONTROLS
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'%')
    // `+` is used to represent a space in query strings
    .add(b'+')
    // denote nested keys
    .add(b'[')
    .add(b']')
    // key, value separator
    .add(b'=')
    // denote key-value pairs
    .add(b'&');

/// As defined in https://url.spec.whatwg.org/#application-x-www-form-urlencoded-percent-encode-set
///
/// All code points except the ASCII alphanumeric, U+002A (*), U+002D (-),
/// U+002E (.), and U+005F (_).
const FORM_URLENCODED_SET: &AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// Encodes bytes for use in a querystring.
///
/// In query-string mode spaces become `+`; in form mode every byte outside
/// the unreserved set is percent-encoded, spaces included.
///
/// The function returns an iterator to avoid allocations when no encoding is needed.
pub fn encode(b: &[u8], use_form_encoding: bool) -> impl Iterator<Item = Cow<'_, [u8]>> + '_ {
    let set = if use_form_encoding {
        FORM_URLENCODED_SET
    } else {
        MINIMAL_QS_SET
    };
    percent_encoding::percent_encode(b, set).map(move |s| {
        if !use_form_encoding && s.as_bytes().contains(&b' ') {
            Cow::Owned(
                s.as_bytes()
                    .iter()
                    .map(|b| if *b == b' ' { b'+' } else { *b })
                    .collect(),
            )
        } else {
            Cow::Borrowed(s.as_bytes())
        }
    })
}
