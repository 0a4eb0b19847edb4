//! SQL connector using DuckDB as the query engine
//!
//! Provides unified access to PostgreSQL, MySQL, SQLite and DuckDB files via
//! DuckDB extensions. The source database is attached read-only as
//! `source_db`; enumeration runs `SELECT DISTINCT` over date parts.

use super::types::{DataConnector, ListContext};
use crate::asset::{AssetSource, DataAsset};
use crate::error::{Error, Result};
use crate::partition::{ColumnPartitioner, Location, Partition, PartitionKey, Partitioner, PartitionerKind};
use crate::template;
use crate::types::ConnectorFamily;
use async_trait::async_trait;
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

// ============================================================================
// Engine & Connection Config
// ============================================================================

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlEngine {
    Postgres,
    Mysql,
    Sqlite,
    Duckdb,
}

impl SqlEngine {
    fn default_port(self) -> u16 {
        match self {
            SqlEngine::Postgres => 5432,
            SqlEngine::Mysql => 3306,
            SqlEngine::Sqlite | SqlEngine::Duckdb => 0,
        }
    }
}

impl fmt::Display for SqlEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlEngine::Postgres => write!(f, "postgres"),
            SqlEngine::Mysql => write!(f, "mysql"),
            SqlEngine::Sqlite => write!(f, "sqlite"),
            SqlEngine::Duckdb => write!(f, "duckdb"),
        }
    }
}

/// Database connection settings
///
/// Either `connection_string` or the individual components. String fields may
/// reference environment variables as `${VAR}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlConnectionConfig {
    pub engine: SqlEngine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl SqlConnectionConfig {
    /// Config from a full connection string
    pub fn from_connection_string(engine: SqlEngine, connection_string: impl Into<String>) -> Self {
        Self {
            engine,
            connection_string: Some(connection_string.into()),
            host: None,
            port: None,
            database: None,
            user: None,
            password: None,
        }
    }

    /// Build the connection string, substituting `${VAR}` references
    pub fn build_connection_string(&self) -> Result<String> {
        if let Some(ref conn_str) = self.connection_string {
            return template::render(conn_str);
        }

        let host = self
            .host
            .as_deref()
            .map(template::render)
            .transpose()?
            .unwrap_or_else(|| "localhost".to_string());
        let user = self
            .user
            .as_deref()
            .map(template::render)
            .transpose()?
            .unwrap_or_else(|| "postgres".to_string());
        let password = self
            .password
            .as_deref()
            .map(template::render)
            .transpose()?
            .unwrap_or_default();
        let database = self
            .database
            .as_deref()
            .map(template::render)
            .transpose()?;
        let port = self.port.unwrap_or(self.engine.default_port());

        match self.engine {
            SqlEngine::Postgres => Ok(format!(
                "postgresql://{user}:{password}@{host}:{port}/{}",
                database.unwrap_or_else(|| "postgres".to_string())
            )),
            SqlEngine::Mysql => Ok(format!(
                "mysql://{user}:{password}@{host}:{port}/{}",
                database.unwrap_or_else(|| "mysql".to_string())
            )),
            // File-backed engines use the database as a path
            SqlEngine::Sqlite | SqlEngine::Duckdb => {
                database.ok_or_else(|| Error::missing_field("database"))
            }
        }
    }
}

/// Mask the password in a connection string for logging
fn mask_password(connection_string: &str) -> String {
    if let Some(at_pos) = connection_string.find('@') {
        if let Some(colon_pos) = connection_string[..at_pos].rfind(':') {
            let before_pass = &connection_string[..=colon_pos];
            // No password component: the only colon belongs to the scheme
            if !connection_string[colon_pos..].starts_with("://") {
                let after_at = &connection_string[at_pos..];
                return format!("{before_pass}****{after_at}");
            }
        }
    }
    connection_string.to_string()
}

// ============================================================================
// SQL Connector
// ============================================================================

/// Connector enumerating SQL table and query assets
#[derive(Clone)]
pub struct SqlConnector {
    conn: Arc<Mutex<Connection>>,
    engine: SqlEngine,
    /// Connection string with password masked
    display: String,
    /// Whether the source is attached as `source_db`
    attached: bool,
}

impl fmt::Debug for SqlConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlConnector")
            .field("engine", &self.engine)
            .field("display", &self.display)
            .field("attached", &self.attached)
            .finish_non_exhaustive()
    }
}

impl SqlConnector {
    /// Open an in-memory DuckDB and attach the configured database
    pub fn connect(config: &SqlConnectionConfig) -> Result<Self> {
        let connection_string = config.build_connection_string()?;
        let masked = mask_password(&connection_string);

        let conn = Connection::open_in_memory()
            .map_err(|e| Error::connection(&masked, format!("Failed to create DuckDB connection: {e}")))?;

        let attached = attach_database(&conn, config.engine, &connection_string)
            .map_err(|e| Error::connection(&masked, e.to_string()))?;

        tracing::debug!("Connected to {} database {}", config.engine, masked);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            engine: config.engine,
            display: masked,
            attached,
        })
    }

    /// Wrap an already-open DuckDB connection; tables are read from its main catalog
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            engine: SqlEngine::Duckdb,
            display: ":memory:".to_string(),
            attached: false,
        }
    }

    /// Database engine
    pub fn engine(&self) -> SqlEngine {
        self.engine
    }

    /// Relation expression for a table or query asset
    fn relation(&self, source: &AssetSource) -> Result<String> {
        match source {
            AssetSource::Table { table_name } if self.attached => {
                if !table_name.contains('.') && self.engine == SqlEngine::Postgres {
                    // Default to public schema for postgres
                    Ok(format!("source_db.public.{table_name}"))
                } else {
                    Ok(format!("source_db.{table_name}"))
                }
            }
            AssetSource::Table { table_name } => Ok(table_name.clone()),
            AssetSource::Query { query } => Ok(format!("({query}) AS q")),
            AssetSource::Files { .. } => Err(Error::config(format!(
                "File assets cannot be read from SQL database {}",
                self.display
            ))),
        }
    }

    /// Run a blocking closure against the connection on the blocking pool
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::Other("DuckDB connection lock poisoned".to_string()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| Error::Other(format!("Database task failed: {e}")))?
    }

    /// List tables visible in the source database
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let query = match (self.engine, self.attached) {
            (SqlEngine::Postgres, _) => {
                "SELECT table_schema || '.' || table_name AS full_name
                 FROM source_db.information_schema.tables
                 WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
                 ORDER BY table_schema, table_name"
            }
            (SqlEngine::Mysql, _) => {
                "SELECT CONCAT(table_schema, '.', table_name) AS full_name
                 FROM source_db.information_schema.tables
                 WHERE table_schema NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys')
                 ORDER BY table_schema, table_name"
            }
            (SqlEngine::Sqlite, _) => {
                "SELECT name AS full_name FROM source_db.sqlite_master WHERE type = 'table' ORDER BY name"
            }
            (SqlEngine::Duckdb, true) => {
                "SELECT table_schema || '.' || table_name AS full_name
                 FROM information_schema.tables
                 WHERE table_catalog = 'source_db'
                 ORDER BY table_schema, table_name"
            }
            (SqlEngine::Duckdb, false) => {
                "SELECT table_schema || '.' || table_name AS full_name
                 FROM information_schema.tables
                 WHERE table_catalog = current_database()
                 ORDER BY table_schema, table_name"
            }
        };

        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(query)?;
            let tables = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(tables)
        })
        .await
    }

    /// Distinct date-part tuples of the partition column, one partition each
    async fn column_partitions(
        &self,
        relation: String,
        partitioner: &ColumnPartitioner,
    ) -> Result<Vec<Partition>> {
        let column = partitioner.column().to_string();
        let parts = date_parts(partitioner.kind());
        let names: Vec<String> = partitioner.param_names().to_vec();

        let select = parts
            .iter()
            .zip(&names)
            .map(|(part, name)| format!("CAST({part}({column}) AS BIGINT) AS {name}"))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "SELECT DISTINCT {select} FROM {relation} WHERE {column} IS NOT NULL ORDER BY {}",
            (1..=parts.len())
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        tracing::debug!("Enumerating partitions: {}", query);

        let width = parts.len();
        let tuples: Vec<Vec<i64>> = self
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt
                    .query_map([], |row| {
                        (0..width)
                            .map(|i| row.get::<_, i64>(i))
                            .collect::<duckdb::Result<Vec<i64>>>()
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        Ok(tuples
            .into_iter()
            .map(|values| {
                let mut key = PartitionKey::new();
                let mut predicates = Vec::with_capacity(width);
                for ((part, name), value) in parts.iter().zip(&names).zip(values) {
                    predicates.push(format!("{part}({column}) = {value}"));
                    key.insert(name.clone(), value);
                }
                let location = format!(
                    "SELECT * FROM {relation} WHERE {}",
                    predicates.join(" AND ")
                );
                Partition::new(Location::Query(location), key)
            })
            .collect())
    }
}

/// DuckDB date-part functions for a partitioner kind
fn date_parts(kind: PartitionerKind) -> &'static [&'static str] {
    match kind {
        PartitionerKind::Yearly => &["year"],
        PartitionerKind::Monthly => &["year", "month"],
        PartitionerKind::Daily | PartitionerKind::Path => &["year", "month", "day"],
    }
}

/// Attach an external database to DuckDB; returns whether `source_db` exists
fn attach_database(conn: &Connection, engine: SqlEngine, connection_string: &str) -> Result<bool> {
    match engine {
        SqlEngine::Postgres => {
            conn.execute_batch("INSTALL postgres; LOAD postgres;")
                .map_err(|e| Error::config(format!("Failed to load postgres extension: {e}")))?;
            conn.execute_batch(&format!(
                "ATTACH '{connection_string}' AS source_db (TYPE POSTGRES, READ_ONLY);"
            ))?;
        }
        SqlEngine::Mysql => {
            conn.execute_batch("INSTALL mysql; LOAD mysql;")
                .map_err(|e| Error::config(format!("Failed to load mysql extension: {e}")))?;
            conn.execute_batch(&format!(
                "ATTACH '{connection_string}' AS source_db (TYPE MYSQL, READ_ONLY);"
            ))?;
        }
        SqlEngine::Sqlite => {
            conn.execute_batch("INSTALL sqlite; LOAD sqlite;")
                .map_err(|e| Error::config(format!("Failed to load sqlite extension: {e}")))?;
            conn.execute_batch(&format!(
                "ATTACH '{connection_string}' AS source_db (TYPE SQLITE, READ_ONLY);"
            ))?;
        }
        SqlEngine::Duckdb => {
            if connection_string == ":memory:" {
                return Ok(false);
            }
            conn.execute_batch(&format!(
                "ATTACH '{connection_string}' AS source_db (READ_ONLY);"
            ))?;
        }
    }

    Ok(true)
}

#[async_trait]
impl DataConnector for SqlConnector {
    fn family(&self) -> ConnectorFamily {
        ConnectorFamily::Sql
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.engine, self.display)
    }

    async fn check(&self) -> Result<()> {
        let query = match (self.engine, self.attached) {
            (SqlEngine::Postgres, _) => "SELECT 1 FROM source_db.pg_catalog.pg_tables LIMIT 1",
            (SqlEngine::Mysql, _) => "SELECT 1 FROM source_db.information_schema.tables LIMIT 1",
            (SqlEngine::Sqlite, _) => "SELECT 1 FROM source_db.sqlite_master LIMIT 1",
            (SqlEngine::Duckdb, _) => "SELECT 1",
        };
        let target = self.describe();

        self.with_connection(move |conn| {
            let probe = || -> duckdb::Result<()> {
                let mut stmt = conn.prepare(query)?;
                let mut rows = stmt.query([])?;
                rows.next()?;
                Ok(())
            };
            probe().map_err(|e| Error::connection(target, format!("Connection check failed: {e}")))
        })
        .await
    }

    async fn list_partitions(
        &self,
        asset: &DataAsset,
        partitioner: Option<&Partitioner>,
        ctx: &ListContext,
    ) -> Result<Vec<Partition>> {
        let relation = self.relation(asset.source())?;

        match partitioner {
            None => {
                tracing::debug!("Asset {} resolves to the whole of {}", asset.name(), relation);
                Ok(vec![Partition::new(
                    Location::Query(format!("SELECT * FROM {relation}")),
                    PartitionKey::new(),
                )])
            }
            Some(Partitioner::Column(column)) => {
                let partitions = ctx.run(self.column_partitions(relation, column)).await?;
                tracing::debug!(
                    "Asset {}: {} partitions over column {}",
                    asset.name(),
                    partitions.len(),
                    column.column()
                );
                Ok(partitions)
            }
            Some(Partitioner::File(_)) => Err(Error::config(format!(
                "Asset '{}': file name partitioners are not valid for SQL assets",
                asset.name()
            ))),
        }
    }
}
