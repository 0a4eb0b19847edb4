//! Tests for connector module

use super::*;
use crate::asset::{AssetSource, DataAsset};
use crate::error::Error;
use crate::partition::{
    ColumnPartitioner, FilePartitioner, Location, PartitionKey, Partitioner, PartitionerKind,
};
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

async fn memory_store(paths: &[&str]) -> Arc<InMemory> {
    let store = Arc::new(InMemory::new());
    for path in paths {
        store
            .put(&ObjectPath::from(*path), PutPayload::from_static(b"a,b\n1,2\n"))
            .await
            .unwrap();
    }
    store
}

fn yearly() -> Partitioner {
    FilePartitioner::yearly(r"data_(?P<year>\d{4})\.csv").unwrap().into()
}

fn locations(partitions: &[crate::partition::Partition]) -> Vec<&str> {
    partitions.iter().map(|p| p.location.as_str()).collect()
}

// ============================================================================
// List Context Tests
// ============================================================================

#[tokio::test]
async fn test_list_context_passes_result_through() {
    let ctx = ListContext::new();
    let value = ctx.run(async { Ok(42) }).await.unwrap();
    assert_eq!(value, 42);
}

#[tokio::test]
async fn test_list_context_deadline() {
    let ctx = ListContext::new().with_deadline(Duration::from_millis(20));
    let err = ctx
        .run(std::future::pending::<crate::error::Result<()>>())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 20 }));
}

#[tokio::test]
async fn test_list_context_already_cancelled() {
    let token = CancellationToken::new();
    token.cancel();
    let ctx = ListContext::new().with_cancellation(token);
    let err = ctx.run(async { Ok(()) }).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn test_list_context_cancelled_while_running() {
    let token = CancellationToken::new();
    let ctx = ListContext::new().with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });

    let err = ctx
        .run(std::future::pending::<crate::error::Result<()>>())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    canceller.await.unwrap();
}

// ============================================================================
// Object Store Connector Tests
// ============================================================================

#[tokio::test]
async fn test_yearly_listing_drops_non_matching() {
    let store = memory_store(&["data/data_2020.csv", "data/notes.txt", "data/data_2019.csv"]).await;
    let connector = ObjectStoreConnector::new(store, "memory", "memory://", "");
    let asset = DataAsset::files("trips", "csv", "data");
    let partitioner = yearly();

    let partitions = connector
        .list_partitions(&asset, Some(&partitioner), &ListContext::new())
        .await
        .unwrap();

    // Listing order is lexicographic by location
    assert_eq!(
        locations(&partitions),
        vec!["memory://data/data_2019.csv", "memory://data/data_2020.csv"]
    );
    assert_eq!(partitions[0].key, PartitionKey::new().with("year", "2019"));
}

#[tokio::test]
async fn test_names_are_relative_to_asset_prefix() {
    let store = memory_store(&["base/sales/data_2021.csv", "base/other/data_2022.csv"]).await;
    let connector = ObjectStoreConnector::new(store, "s3", "s3://bucket", "base");
    let asset = DataAsset::files("sales", "csv", "sales/");
    let partitioner = yearly();

    let partitions = connector
        .list_partitions(&asset, Some(&partitioner), &ListContext::new())
        .await
        .unwrap();

    assert_eq!(locations(&partitions), vec!["s3://bucket/base/sales/data_2021.csv"]);
    assert_eq!(connector.describe(), "s3://bucket/base");
    assert!(connector.is_cloud());
}

#[tokio::test]
async fn test_non_recursive_listing_skips_subdirectories() {
    let store = memory_store(&["data/data_2019.csv", "data/archive/data_2018.csv"]).await;
    let connector = ObjectStoreConnector::new(store, "memory", "memory://", "");
    let partitioner: Partitioner =
        FilePartitioner::yearly(r"(?:.*/)?data_(?P<year>\d{4})\.csv").unwrap().into();

    let recursive = DataAsset::files("trips", "csv", "data");
    let flat = DataAsset::new(
        "trips",
        "csv",
        AssetSource::Files {
            prefix: "data".to_string(),
            recursive: false,
        },
    );

    let all = connector
        .list_partitions(&recursive, Some(&partitioner), &ListContext::new())
        .await
        .unwrap();
    let top = connector
        .list_partitions(&flat, Some(&partitioner), &ListContext::new())
        .await
        .unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(locations(&top), vec!["memory://data/data_2019.csv"]);
}

#[tokio::test]
async fn test_empty_listing_is_not_an_error() {
    let store = memory_store(&[]).await;
    let connector = ObjectStoreConnector::new(store, "memory", "memory://", "");
    let asset = DataAsset::files("trips", "csv", "data");

    let partitions = connector
        .list_partitions(&asset, Some(&yearly()), &ListContext::new())
        .await
        .unwrap();
    assert!(partitions.is_empty());
}

#[tokio::test]
async fn test_file_listing_requires_file_partitioner() {
    let store = memory_store(&["data/data_2019.csv"]).await;
    let connector = ObjectStoreConnector::new(store, "memory", "memory://", "");
    let asset = DataAsset::files("trips", "csv", "data");

    let err = connector
        .list_partitions(&asset, None, &ListContext::new())
        .await
        .unwrap_err();
    assert!(err.is_configuration());

    let column: Partitioner = ColumnPartitioner::new(PartitionerKind::Yearly, "ts", true)
        .unwrap()
        .into();
    let err = connector
        .list_partitions(&asset, Some(&column), &ListContext::new())
        .await
        .unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_local_filesystem_listing() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("data")).unwrap();
    std::fs::write(dir.path().join("data/data_2019.csv"), "a\n1\n").unwrap();
    std::fs::write(dir.path().join("data/README.md"), "docs").unwrap();

    let base = dir.path().to_str().unwrap();
    let connector = ObjectStoreConnector::parse(base).unwrap();
    assert_eq!(connector.scheme(), "file");
    assert!(!connector.is_cloud());
    connector.check().await.unwrap();

    let asset = DataAsset::files("trips", "csv", "data");
    let partitions = connector
        .list_partitions(&asset, Some(&yearly()), &ListContext::new())
        .await
        .unwrap();

    assert_eq!(partitions.len(), 1);
    assert_eq!(
        partitions[0].location,
        Location::Path(format!("{base}/data/data_2019.csv"))
    );
}

#[test]
fn test_parse_missing_local_directory_is_connection_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");
    let err = ObjectStoreConnector::parse(missing.to_str().unwrap()).unwrap_err();
    assert!(err.is_connection());
}

#[test]
fn test_parse_memory_url() {
    let connector = ObjectStoreConnector::parse("memory://").unwrap();
    assert_eq!(connector.scheme(), "memory");
    assert_eq!(connector.family(), crate::types::ConnectorFamily::FilePath);
}

#[tokio::test]
async fn test_memory_locations_keep_scheme_separator() {
    let connector = ObjectStoreConnector::parse("memory://").unwrap();
    connector
        .store()
        .put(&ObjectPath::from("data/data_2019.csv"), PutPayload::from_static(b"x"))
        .await
        .unwrap();

    let partitions = connector
        .list_partitions(&DataAsset::files("trips", "csv", "data"), Some(&yearly()), &ListContext::new())
        .await
        .unwrap();

    assert_eq!(locations(&partitions), vec!["memory://data/data_2019.csv"]);
    assert_eq!(connector.describe(), "memory://");

    let prefixed = ObjectStoreConnector::new(Arc::new(InMemory::new()), "memory", "memory://", "raw/");
    assert_eq!(prefixed.describe(), "memory://raw");
}

// ============================================================================
// SQL Connector Tests
// ============================================================================

fn events_connector() -> SqlConnector {
    let conn = duckdb::Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE events (id INTEGER, ts DATE);
         INSERT INTO events VALUES
            (1, DATE '2019-01-05'),
            (2, DATE '2019-01-20'),
            (3, DATE '2019-02-01'),
            (4, DATE '2020-03-01'),
            (5, NULL);",
    )
    .unwrap();
    SqlConnector::from_connection(conn)
}

#[tokio::test]
async fn test_sql_whole_table_is_single_partition() {
    let connector = events_connector();
    let asset = DataAsset::table("events", "events");

    let partitions = connector
        .list_partitions(&asset, None, &ListContext::new())
        .await
        .unwrap();

    assert_eq!(partitions.len(), 1);
    assert_eq!(partitions[0].location, Location::Query("SELECT * FROM events".to_string()));
    assert!(partitions[0].key.is_empty());
}

#[tokio::test]
async fn test_sql_monthly_column_partitions() {
    let connector = events_connector();
    let asset = DataAsset::table("events", "events");
    let partitioner: Partitioner = ColumnPartitioner::new(PartitionerKind::Monthly, "ts", true)
        .unwrap()
        .into();

    let partitions = connector
        .list_partitions(&asset, Some(&partitioner), &ListContext::new())
        .await
        .unwrap();

    let keys: Vec<PartitionKey> = partitions.iter().map(|p| p.key.clone()).collect();
    assert_eq!(
        keys,
        vec![
            PartitionKey::new().with("year", 2019_i64).with("month", 1_i64),
            PartitionKey::new().with("year", 2019_i64).with("month", 2_i64),
            PartitionKey::new().with("year", 2020_i64).with("month", 3_i64),
        ]
    );
    assert_eq!(
        partitions[0].location,
        Location::Query("SELECT * FROM events WHERE year(ts) = 2019 AND month(ts) = 1".to_string())
    );
}

#[tokio::test]
async fn test_sql_query_asset_wraps_query() {
    let connector = events_connector();
    let asset = DataAsset::query("recent", "SELECT * FROM events WHERE id > 2");
    let partitioner: Partitioner = ColumnPartitioner::new(PartitionerKind::Yearly, "ts", true)
        .unwrap()
        .into();

    let partitions = connector
        .list_partitions(&asset, Some(&partitioner), &ListContext::new())
        .await
        .unwrap();

    assert_eq!(partitions.len(), 2);
    assert!(partitions[0]
        .location
        .as_str()
        .starts_with("SELECT * FROM (SELECT * FROM events WHERE id > 2) AS q WHERE"));
}

#[tokio::test]
async fn test_sql_rejects_file_partitioner_and_file_asset() {
    let connector = events_connector();

    let err = connector
        .list_partitions(&DataAsset::table("events", "events"), Some(&yearly()), &ListContext::new())
        .await
        .unwrap_err();
    assert!(err.is_configuration());

    let err = connector
        .list_partitions(&DataAsset::files("trips", "csv", "data"), None, &ListContext::new())
        .await
        .unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_sql_missing_table_is_connection_error() {
    let connector = events_connector();
    let asset = DataAsset::table("ghost", "ghost");
    let partitioner: Partitioner = ColumnPartitioner::new(PartitionerKind::Yearly, "ts", true)
        .unwrap()
        .into();

    let err = connector
        .list_partitions(&asset, Some(&partitioner), &ListContext::new())
        .await
        .unwrap_err();
    assert!(err.is_connection());
}

#[tokio::test]
async fn test_attached_duckdb_file() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("warehouse.duckdb");
    {
        let conn = duckdb::Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE orders (id INTEGER, created_at TIMESTAMP);
             INSERT INTO orders VALUES (1, TIMESTAMP '2021-06-01 10:00:00'),
                                       (2, TIMESTAMP '2022-06-01 10:00:00');",
        )
        .unwrap();
    }

    let config = SqlConnectionConfig {
        engine: SqlEngine::Duckdb,
        connection_string: None,
        host: None,
        port: None,
        database: Some(db_path.to_str().unwrap().to_string()),
        user: None,
        password: None,
    };

    let connector = SqlConnector::connect(&config).unwrap();
    connector.check().await.unwrap();
    assert_eq!(connector.list_tables().await.unwrap(), vec!["main.orders"]);

    let asset = DataAsset::table("orders", "orders");
    let partitioner: Partitioner =
        ColumnPartitioner::new(PartitionerKind::Yearly, "created_at", false)
            .unwrap()
            .into();
    let partitions = connector
        .list_partitions(&asset, Some(&partitioner), &ListContext::new())
        .await
        .unwrap();

    assert_eq!(partitions.len(), 2);
    assert!(partitions[0].location.as_str().contains("FROM source_db.orders"));
}
