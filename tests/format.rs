mod common;

use column_infer::{
    FormatOptions, SchemaOptions, data_format, data_format_with_report, normalize_boolean,
    normalize_number,
};
use common::{rows, to_value};
use proptest::prelude::*;
use serde_json::{Value, json};

#[test]
fn normalizer_examples() {
    assert_eq!(normalize_number(&json!("$2,345.50"), true), json!(2345.5));
    assert_eq!(normalize_number(&json!("12%"), true), json!(12));
    assert_eq!(normalize_number(&json!(""), true), Value::Null);
    assert_eq!(normalize_number(&json!(""), false), json!(""));
    assert_eq!(normalize_boolean(&json!("True")), json!(true));
    assert_eq!(normalize_boolean(&json!(1)), json!(1));
}

#[test]
fn ages_are_coerced_to_numbers() {
    let formatted = data_format(
        &rows(json!([{"age": "32"}, {"age": "23"}])),
        &FormatOptions::default(),
    );
    assert_eq!(to_value(formatted), json!([{"age": 32}, {"age": 23}]));
}

#[test]
fn mixed_and_text_columns_are_untouched() {
    let data = rows(json!([
        {"id": "1", "code": "A1", "mixed": "5"},
        {"id": "2", "code": "B2", "mixed": "five"}
    ]));
    let formatted = data_format(&data, &FormatOptions::default());
    assert_eq!(
        to_value(formatted),
        json!([
            {"id": 1, "code": "A1", "mixed": "5"},
            {"id": 2, "code": "B2", "mixed": "five"}
        ])
    );
}

#[test]
fn sparse_rows_keep_their_own_keys() {
    let data = rows(json!([{"a": "1", "b": "x"}, {"b": "y"}, "not a row"]));
    let formatted = data_format(&data, &FormatOptions::default());
    assert_eq!(
        to_value(formatted),
        json!([{"a": 1, "b": "x"}, {"b": "y"}])
    );
}

#[test]
fn sanitized_output_keys() {
    let data = rows(json!([{"\u{200B}Price ": "$5"}, {"\u{200B}Price ": "$7.25"}]));
    let options = FormatOptions {
        schema: SchemaOptions {
            sanitize_keys: true,
            ..SchemaOptions::default()
        },
        ..FormatOptions::default()
    };
    assert_eq!(
        to_value(data_format(&data, &options)),
        json!([{"Price": 5}, {"Price": 7.25}])
    );
}

#[test]
fn time_and_datetime_conversion() {
    let data = rows(json!([
        {"at": "2021-03-04 05:06:07", "clock": "9:30 PM", "stamp": "2021-03-04T05:06:07Z"},
        {"at": "2021-03-05 00:00:00", "clock": "10:15 AM", "stamp": "2021-03-04T07:06:07+02:00"}
    ]));
    let options = FormatOptions {
        convert_dates: true,
        ..FormatOptions::default()
    };
    let formatted = to_value(data_format(&data, &options));
    assert_eq!(formatted[0]["at"], json!("2021-03-04T05:06:07"));
    assert_eq!(formatted[0]["clock"], json!("21:30:00"));
    assert_eq!(formatted[1]["clock"], json!("10:15:00"));
    assert_eq!(formatted[0]["stamp"], json!("2021-03-04T05:06:07+00:00"));
    assert_eq!(formatted[1]["stamp"], json!("2021-03-04T07:06:07+02:00"));
}

#[test]
fn year_columns_are_not_converted() {
    let data = rows(json!([{"year": "1999"}, {"year": "2000"}]));
    let options = FormatOptions {
        convert_dates: true,
        ..FormatOptions::default()
    };
    assert_eq!(to_value(data_format(&data, &options)), json!([{"year": "1999"}, {"year": "2000"}]));
}

#[test]
fn best_guess_booleans() {
    let data = rows(json!([{"flag": "true"}, {"flag": "FALSE"}, {"flag": "maybe"}]));
    let options = FormatOptions {
        best_guess: true,
        report_ignored: true,
        ..FormatOptions::default()
    };
    let report = data_format_with_report(&data, &options);
    assert_eq!(
        to_value(report.rows),
        json!([{"flag": true}, {"flag": false}, {"flag": "maybe"}])
    );
    assert_eq!(report.ignored.len(), 1);
    assert_eq!(report.ignored[0].row, 2);
    assert_eq!(report.ignored[0].value, json!("maybe"));
}

#[test]
fn ignored_values_are_only_collected_on_request() {
    let data = rows(json!([{"flag": "true"}, {"flag": "maybe"}, {"flag": "false"}]));
    let options = FormatOptions {
        best_guess: true,
        ..FormatOptions::default()
    };
    assert!(data_format_with_report(&data, &options).ignored.is_empty());
}

#[test]
fn numerals_beyond_f64_range_are_kept_verbatim() {
    let huge = "9".repeat(400);
    let data = rows(json!([{"n": "1"}, {"n": huge.clone()}]));
    let formatted = to_value(data_format(&data, &FormatOptions::default()));
    assert_eq!(formatted[1]["n"], json!(huge));

    let schema = column_infer::get_schema(&data, &SchemaOptions::default());
    assert_eq!(schema[0].format.as_deref(), Some("mixed"));
    assert!(schema[0].num_stats.is_none());
}

fn cell_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!("")),
        Just(Value::Null),
        Just(json!("TRUE")),
        Just(json!("false")),
        Just(json!("$1,200.50")),
        Just(json!("12%")),
        Just(json!("7 EUR")),
        Just(json!("2020-01-01")),
        "[0-9]{1,4}(\\.[0-9]{1,2})?".prop_map(Value::String),
        "[a-z]{1,6}".prop_map(Value::String),
    ]
}

proptest! {
    #[test]
    fn formatting_twice_changes_nothing(
        cells in prop::collection::vec((cell_strategy(), cell_strategy()), 0..30)
    ) {
        let data: Vec<Value> = cells
            .into_iter()
            .map(|(a, b)| json!({"a": a, "b": b}))
            .collect();
        let options = FormatOptions::default();
        let once = to_value(data_format(&data, &options));
        let once_rows = once.as_array().cloned().unwrap_or_default();
        let twice = to_value(data_format(&once_rows, &options));
        prop_assert_eq!(once, twice);
    }
}
