use criterion::{Criterion, black_box, criterion_group, criterion_main};
use typed_qs::date::reduce;
use typed_qs::{ParseOptions, Template, Value, parsers};

const SIMPLE: &str = "id=42&name=test_user&active=true";
const NESTED: &str = "id=7&user[name]=ann&user[address][city]=Carrot+City&user[address][postcode]=12345&tags[0]=a&tags[1]=b";

fn simple_template() -> Template {
    Template::mapping([
        ("id", parsers::natural()),
        ("name", parsers::string(true)),
        ("active", parsers::boolean()),
    ])
}

fn nested_template() -> Template {
    Template::mapping([
        ("id", Template::from(parsers::natural())),
        (
            "user",
            Template::mapping([
                ("name", Template::from(parsers::string(true))),
                (
                    "address",
                    Template::mapping([
                        ("city", parsers::string(true)),
                        ("postcode", parsers::natural()),
                    ]),
                ),
            ]),
        ),
        ("tags", parsers::array(None).into()),
    ])
}

fn large_list() -> String {
    (0..1000)
        .map(|i| format!("ids={i}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn tokenize_simple(c: &mut Criterion) {
    c.bench_function("tokenize_simple", |b| {
        b.iter(|| typed_qs::tokenize(black_box(SIMPLE)).unwrap())
    });
}

fn tokenize_nested(c: &mut Criterion) {
    c.bench_function("tokenize_nested", |b| {
        b.iter(|| typed_qs::tokenize(black_box(NESTED)).unwrap())
    });
}

fn parse_simple(c: &mut Criterion) {
    let options = ParseOptions::new().template(simple_template());
    c.bench_function("parse_simple", |b| {
        b.iter(|| typed_qs::parse(black_box(SIMPLE), &options).unwrap())
    });
}

fn parse_nested_with_defaults(c: &mut Criterion) {
    let options = ParseOptions::new()
        .template(nested_template())
        .defaults(Value::object([(
            "user",
            Value::object([("name", "anonymous")]),
        )]));
    c.bench_function("parse_nested_with_defaults", |b| {
        b.iter(|| typed_qs::parse(black_box(NESTED), &options).unwrap())
    });
}

fn parse_large_list(c: &mut Criterion) {
    let search = large_list();
    let options = ParseOptions::new().template(Template::mapping([(
        "ids",
        parsers::array(Some(parsers::natural())),
    )]));
    c.bench_function("parse_large_list", |b| {
        b.iter(|| typed_qs::parse(black_box(&search), &options).unwrap())
    });
}

fn parse_dates(c: &mut Criterion) {
    let options = ParseOptions::new().template(Template::mapping([
        (
            "start",
            parsers::date(vec![reduce::start_of_day(), reduce::to_datetime_string()]),
        ),
        ("end", parsers::datetime_pattern(vec![reduce::end_of_day()])),
    ]));
    c.bench_function("parse_dates", |b| {
        b.iter(|| {
            typed_qs::parse(
                black_box("start=2020/01/11+11:11:11&end=1607656271000"),
                &options,
            )
            .unwrap()
        })
    });
}

fn stringify_nested(c: &mut Criterion) {
    let options = ParseOptions::new().template(nested_template());
    let value = typed_qs::parse(NESTED, &options).unwrap();
    c.bench_function("stringify_nested", |b| {
        b.iter(|| typed_qs::stringify(black_box(&value)).unwrap())
    });
}

criterion_group!(
    benches,
    tokenize_simple,
    tokenize_nested,
    parse_simple,
    parse_nested_with_defaults,
    parse_large_list,
    parse_dates,
    stringify_nested
);
criterion_main!(benches);
