//! Collects grid snapshots from the GridServer reporting database.
//!
//! GridServer writes a `broker_stats` row per Broker every 30 seconds. The
//! most recent row of each Broker is joined with `brokers` for its name and
//! URL.

use crate::core::{
    application::data_source::DataSource,
    domain::{
        error::{ExporterError, ExporterResult, ValidationError},
        model::{
            call_result::round_millis,
            sql_connection::{SqlConnection, SqlDriver},
            summary::{ClusterSummary, NodeSummary, Snapshot},
        },
    },
    infrastructure::{soap_collector::node_hostname, sql_server::SqlServerClient},
};
use async_trait::async_trait;
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const QUERY_TEMPLATE: &str = "
    WITH latest AS (
        SELECT
            broker_id,
            MAX(time_stamp) AS max_time_stamp
        FROM {schema}.broker_stats
        GROUP BY broker_id )
    SELECT
        CAST(latest.broker_id AS BIGINT) AS broker_id,
        brokers.broker_url,
        brokers.broker_name,
        CAST(broker_stats.num_busy_engines AS BIGINT) AS busy_engines,
        CAST(broker_stats.num_total_engines AS BIGINT) AS total_engines,
        CAST(broker_stats.num_drivers AS BIGINT) AS drivers,
        CAST(broker_stats.uptime_minutes AS {double}) AS uptime_minutes,
        CAST(broker_stats.num_jobs_running AS BIGINT) AS services_running,
        CAST(broker_stats.num_tasks_pending AS BIGINT) AS tasks_pending,
        CAST({age_seconds} AS {double}) AS age_seconds
    FROM latest
    INNER JOIN {schema}.broker_stats ON {schema}.broker_stats.broker_id = latest.broker_id
        AND {schema}.broker_stats.time_stamp = latest.max_time_stamp
    INNER JOIN {schema}.brokers ON {schema}.brokers.broker_id = latest.broker_id
";

/// The parts of the query that differ between databases.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dialect {
    double: &'static str,
    age_seconds: &'static str,
}

pub(crate) const POSTGRES: Dialect = Dialect {
    double: "DOUBLE PRECISION",
    age_seconds: "EXTRACT(EPOCH FROM (CURRENT_TIMESTAMP - latest.max_time_stamp))",
};

pub(crate) const SQL_SERVER: Dialect = Dialect {
    double: "FLOAT",
    age_seconds: "DATEDIFF(SECOND, latest.max_time_stamp, CURRENT_TIMESTAMP)",
};

/// Reports older than this are logged; GridServer writes one every 30 s.
const STALE_REPORT_AGE: Duration = Duration::from_secs(60);

/// One row of the latest-report query, independent of the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct BrokerStatsRow {
    pub broker_id: i64,
    pub broker_url: Option<String>,
    pub broker_name: Option<String>,
    pub busy_engines: Option<i64>,
    pub total_engines: Option<i64>,
    pub drivers: Option<i64>,
    pub uptime_minutes: Option<f64>,
    pub services_running: Option<i64>,
    pub tasks_pending: Option<i64>,
    pub age_seconds: Option<f64>,
}

#[derive(Debug)]
enum Backend {
    Postgres(PgPool),
    SqlServer(SqlServerClient),
}

/// Reads the latest Broker reports from the reporting database.
#[derive(Debug)]
pub struct SqlCollector {
    backend: Backend,
    schema: String,
    query: String,
}

impl SqlCollector {
    /// Creates a collector for a Postgres or SQL Server reporting database.
    ///
    /// No connection is attempted until the first fetch.
    ///
    /// # Errors
    /// Returns a validation error if the schema is not a plain identifier, if
    /// the DSN is rejected, or if the build has no driver for the database.
    pub fn new(connection: &SqlConnection) -> ExporterResult<Self> {
        validate_schema(connection.schema())?;

        let (backend, dialect) = match connection.driver() {
            SqlDriver::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(2)
                    .acquire_timeout(connection.timeout())
                    .connect_lazy(connection.dsn())
                    .map_err(|e| {
                        ValidationError::Format(format!("invalid database URL: {}", e))
                    })?;
                (Backend::Postgres(pool), POSTGRES)
            }
            SqlDriver::SqlServer => (
                Backend::SqlServer(SqlServerClient::new(connection)?),
                SQL_SERVER,
            ),
            driver => {
                debug!(%driver, "Database client creation failed");
                return Err(ValidationError::ConstraintViolation(format!(
                    "no {} driver is available in this build",
                    driver
                ))
                .into());
            }
        };

        Ok(Self {
            backend,
            schema: connection.schema().to_string(),
            query: broker_stats_query(dialect, connection.schema()),
        })
    }

    async fn collect(&self) -> ExporterResult<Snapshot> {
        let rows = match &self.backend {
            Backend::Postgres(pool) => self.postgres_rows(pool).await?,
            Backend::SqlServer(client) => client.broker_stats(&self.query).await?,
        };
        debug!(schema = %self.schema, rows = rows.len(), "Broker reports read");

        let nodes = rows
            .iter()
            .map(node_from_row)
            .collect::<ExporterResult<Vec<_>>>()
            .inspect_err(|e| debug!(error = %e, "Row scan failed"))?;

        let mut cluster = ClusterSummary::from_capacity(&nodes)?;
        cluster.sum_activity(&nodes)?;
        cluster.tasks_running = None;

        Ok(Snapshot { cluster, nodes })
    }

    async fn postgres_rows(&self, pool: &PgPool) -> ExporterResult<Vec<BrokerStatsRow>> {
        let start = Instant::now();
        let ping = pool.acquire().await;
        let elapsed = round_millis(start.elapsed());
        match ping {
            Ok(connection) => {
                drop(connection);
                debug!(?elapsed, "Database connection succeeded");
            }
            Err(e) => {
                debug!(?elapsed, error = %e, "Database connection failed");
                return Err(ExporterError::Database(format!(
                    "database connection failed: {}",
                    e
                )));
            }
        }

        let start = Instant::now();
        let rows = sqlx::query(&self.query).fetch_all(pool).await;
        let elapsed = round_millis(start.elapsed());
        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                debug!(?elapsed, error = %e, sql = %self.query, "SQL query failed");
                return Err(ExporterError::Database(format!("SQL query failed: {}", e)));
            }
        };
        debug!(?elapsed, "SQL query succeeded");

        rows.iter().map(stats_from_pg_row).collect()
    }
}

#[async_trait]
impl DataSource for SqlCollector {
    fn kind(&self) -> &'static str {
        "sql"
    }

    async fn fetch(&self) -> ExporterResult<Snapshot> {
        self.collect().await
    }
}

/// Builds the latest-report query for the given schema, on a single line.
pub(crate) fn broker_stats_query(dialect: Dialect, schema: &str) -> String {
    QUERY_TEMPLATE
        .replace("{schema}", schema)
        .replace("{age_seconds}", dialect.age_seconds)
        .replace("{double}", dialect.double)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The schema is spliced into the query, so only identifier characters pass.
pub(crate) fn validate_schema(schema: &str) -> Result<(), ValidationError> {
    let valid = !schema.is_empty()
        && schema
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::Field {
            field: "schema".to_string(),
            message: format!("invalid schema name: {:?}", schema),
        })
    }
}

pub(crate) fn row_scan_error(error: impl std::fmt::Display) -> ExporterError {
    ExporterError::Database(format!("row scan failed: {}", error))
}

fn node_from_row(row: &BrokerStatsRow) -> ExporterResult<NodeSummary> {
    let mut node = NodeSummary::new(
        row.broker_name.clone().unwrap_or_default(),
        node_hostname(row.broker_url.as_deref().unwrap_or_default()),
        count(row.busy_engines, "busy_engines")?,
        count(row.total_engines, "total_engines")?,
        count(row.drivers, "drivers")?,
    );
    node.services_running = Some(count(row.services_running, "services_running")?);
    node.tasks_pending = Some(count(row.tasks_pending, "tasks_pending")?);
    node.uptime_minutes = row.uptime_minutes;

    if let Some(age) = row
        .age_seconds
        .filter(|age| *age > STALE_REPORT_AGE.as_secs_f64())
    {
        warn!(
            age = ?Duration::from_secs_f64(age.round()),
            hostname = %node.hostname,
            name = %node.name,
            id = row.broker_id,
            "Most recent report for Broker is more than 60 seconds old"
        );
    }

    Ok(node)
}

fn stats_from_pg_row(row: &PgRow) -> ExporterResult<BrokerStatsRow> {
    Ok(BrokerStatsRow {
        broker_id: column(row, "broker_id")?,
        broker_url: column(row, "broker_url")?,
        broker_name: column(row, "broker_name")?,
        busy_engines: column(row, "busy_engines")?,
        total_engines: column(row, "total_engines")?,
        drivers: column(row, "drivers")?,
        uptime_minutes: column(row, "uptime_minutes")?,
        services_running: column(row, "services_running")?,
        tasks_pending: column(row, "tasks_pending")?,
        age_seconds: column(row, "age_seconds")?,
    })
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> ExporterResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name).map_err(row_scan_error)
}

fn count(value: Option<i64>, name: &str) -> ExporterResult<u64> {
    u64::try_from(value.unwrap_or_default())
        .map_err(|_| row_scan_error(format_args!("negative value for {}", name)))
}
