//! Tests for partition module

use super::*;
use serde_json::json;
use test_case::test_case;

// ============================================================================
// PartitionValue Tests
// ============================================================================

#[test]
fn test_partition_value_matches() {
    assert!(PartitionValue::from("2019").matches(&PartitionValue::from("2019")));
    assert!(PartitionValue::Int(2019).matches(&PartitionValue::from("2019")));
    assert!(PartitionValue::from("1").matches(&PartitionValue::Int(1)));
    assert!(!PartitionValue::from("01").matches(&PartitionValue::Int(1)));
    assert!(!PartitionValue::from("01").matches(&PartitionValue::from("1")));
}

#[test]
fn test_partition_value_from_json() {
    assert_eq!(
        PartitionValue::try_from(&json!("2019")).unwrap(),
        PartitionValue::from("2019")
    );
    assert_eq!(
        PartitionValue::try_from(&json!(7)).unwrap(),
        PartitionValue::Int(7)
    );
    assert!(PartitionValue::try_from(&json!(1.5)).is_err());
    assert!(PartitionValue::try_from(&json!(true)).is_err());
    assert!(PartitionValue::try_from(&json!(null)).is_err());
}

// ============================================================================
// PartitionKey Tests
// ============================================================================

#[test]
fn test_partition_key_preserves_order() {
    let key = PartitionKey::new()
        .with("year", "2020")
        .with("month", "01")
        .with("day", "31");
    let names: Vec<&str> = key.field_names().collect();
    assert_eq!(names, vec!["year", "month", "day"]);
    assert_eq!(key.to_string(), "{year: 2020, month: 01, day: 31}");
}

#[test]
fn test_partition_key_insert_replaces() {
    let key = PartitionKey::new().with("year", "2020").with("year", "2021");
    assert_eq!(key.len(), 1);
    assert_eq!(key.get("year"), Some(&PartitionValue::from("2021")));
}

#[test]
fn test_partition_key_matches_constraints() {
    let key = PartitionKey::new().with("year", "2019").with("month", "02");

    let mut options = BatchOptions::new();
    assert!(key.matches(&options));

    options.insert("year".to_string(), PartitionValue::from("2019"));
    assert!(key.matches(&options));

    options.insert("month".to_string(), PartitionValue::from("03"));
    assert!(!key.matches(&options));

    let mut unknown = BatchOptions::new();
    unknown.insert("day".to_string(), PartitionValue::from("01"));
    assert!(!key.matches(&unknown));
}

#[test]
fn test_partition_key_serializes_in_field_order() {
    let key = PartitionKey::new()
        .with("year", PartitionValue::Int(2019))
        .with("month", "01");
    assert_eq!(
        serde_json::to_string(&key).unwrap(),
        r#"{"year":2019,"month":"01"}"#
    );
}

// ============================================================================
// FilePartitioner Tests
// ============================================================================

#[test]
fn test_yearly_extracts_and_drops_non_matching() {
    let partitioner = FilePartitioner::yearly(r"data_(?P<year>\d{4})\.csv").unwrap();

    let names = ["data_2019.csv", "data_2020.csv", "notes.txt"];
    let keys: Vec<PartitionKey> = names
        .iter()
        .filter_map(|n| partitioner.extract(n))
        .collect();

    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], PartitionKey::new().with("year", "2019"));
    assert_eq!(keys[1], PartitionKey::new().with("year", "2020"));
}

#[test]
fn test_extract_requires_whole_name_match() {
    let partitioner = FilePartitioner::yearly(r"data_(?P<year>\d{4})\.csv").unwrap();
    assert!(partitioner.extract("data_2019.csv.bak").is_none());
    assert!(partitioner.extract("old_data_2019.csv").is_none());
}

#[test]
fn test_extract_is_pure() {
    let partitioner =
        FilePartitioner::monthly(r"yellow_(?P<year>\d{4})-(?P<month>\d{2})\.csv").unwrap();
    let first = partitioner.extract("yellow_2019-02.csv");
    let second = partitioner.extract("yellow_2019-02.csv");
    assert_eq!(first, second);
    assert_eq!(
        first.unwrap(),
        PartitionKey::new().with("year", "2019").with("month", "02")
    );
}

#[test]
fn test_extract_follows_param_name_order_not_group_order() {
    let partitioner = FilePartitioner::new(
        PartitionerKind::Monthly,
        r"(?P<month>\d{2})_(?P<year>\d{4})\.csv",
        None,
        true,
    )
    .unwrap();

    let key = partitioner.extract("03_2021.csv").unwrap();
    let names: Vec<&str> = key.field_names().collect();
    assert_eq!(names, vec!["year", "month"]);
}

#[test]
fn test_verbose_pattern_with_trailing_comment() {
    let partitioner =
        FilePartitioner::yearly(r"(?x)data_(?P<year>\d{4})\.csv # yearly files").unwrap();

    assert_eq!(
        partitioner.extract("data_2019.csv"),
        Some(PartitionKey::new().with("year", "2019"))
    );
    assert!(partitioner.extract("data_2019.csv.bak").is_none());
    assert!(partitioner.extract("data_2019.csv\n").is_none());
}

#[test]
fn test_non_verbose_pattern_does_not_match_trailing_newline() {
    let partitioner = FilePartitioner::yearly(r"data_(?P<year>\d{4})\.csv").unwrap();
    assert!(partitioner.extract("data_2019.csv\n").is_none());
}

#[test]
fn test_extract_ignores_groups_not_in_param_names() {
    let partitioner = FilePartitioner::yearly(r"(?P<name>\w+)_(?P<year>\d{4})\.csv").unwrap();
    let key = partitioner.extract("trips_2018.csv").unwrap();
    assert_eq!(key, PartitionKey::new().with("year", "2018"));
}

#[test]
fn test_custom_param_names() {
    let partitioner = FilePartitioner::new(
        PartitionerKind::Yearly,
        r"(?P<region>[a-z]+)/(?P<year>\d{4})\.json",
        Some(vec!["region".to_string(), "year".to_string()]),
        true,
    )
    .unwrap();

    let key = partitioner.extract("emea/2022.json").unwrap();
    assert_eq!(key, PartitionKey::new().with("region", "emea").with("year", "2022"));
}

#[test_case(PartitionerKind::Yearly, &["year"]; "yearly")]
#[test_case(PartitionerKind::Monthly, &["year", "month"]; "monthly")]
#[test_case(PartitionerKind::Daily, &["year", "month", "day"]; "daily")]
#[test_case(PartitionerKind::Path, &[]; "path")]
fn test_default_param_names(kind: PartitionerKind, expected: &[&str]) {
    assert_eq!(kind.default_param_names(), expected);
}

#[test]
fn test_invalid_regex_fails_fast() {
    let err = FilePartitioner::yearly(r"data_(?P<year>\d{4}\.csv").unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("data_(?P<year>"));
}

#[test]
fn test_param_names_must_be_capture_groups() {
    let err = FilePartitioner::monthly(r"data_(?P<year>\d{4})\.csv").unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("month"));
}

#[test]
fn test_duplicate_param_names_rejected() {
    let err = FilePartitioner::new(
        PartitionerKind::Yearly,
        r"(?P<year>\d{4})",
        Some(vec!["year".to_string(), "year".to_string()]),
        true,
    )
    .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_path_partitioner_has_no_params() {
    let partitioner = FilePartitioner::path(r".*\.parquet").unwrap();
    assert!(partitioner.param_names().is_empty());
    assert_eq!(partitioner.extract("a/b.parquet"), Some(PartitionKey::new()));
    assert_eq!(partitioner.extract("a/b.csv"), None);

    let err = FilePartitioner::new(
        PartitionerKind::Path,
        r".*",
        Some(vec!["year".to_string()]),
        true,
    )
    .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_sort_ascending_default_and_override() {
    let partitioner = FilePartitioner::yearly(r"(?P<year>\d{4})").unwrap();
    assert!(partitioner.sort_ascending());
    let partitioner = partitioner.with_sort_ascending(false);
    assert!(!partitioner.sort_ascending());
    assert_eq!(partitioner.kind(), PartitionerKind::Yearly);
}

// ============================================================================
// ColumnPartitioner Tests
// ============================================================================

#[test]
fn test_column_partitioner() {
    let partitioner = ColumnPartitioner::new(PartitionerKind::Daily, "pickup_datetime", true).unwrap();
    assert_eq!(partitioner.column(), "pickup_datetime");
    assert_eq!(partitioner.param_names(), &["year", "month", "day"]);

    let partitioner = Partitioner::from(partitioner);
    assert_eq!(partitioner.family(), crate::types::ConnectorFamily::Sql);
    assert!(partitioner.has_param("day"));
    assert!(!partitioner.has_param("hour"));
}

#[test]
fn test_column_partitioner_rejects_path_and_bad_identifiers() {
    assert!(ColumnPartitioner::new(PartitionerKind::Path, "ts", true).is_err());
    assert!(ColumnPartitioner::new(PartitionerKind::Yearly, "ts; DROP TABLE x", true).is_err());
    assert!(ColumnPartitioner::new(PartitionerKind::Yearly, "", true).is_err());
}
