//! Database connection, TLS support, and transient helper routines.

use std::future::Future;
use std::time::Duration;

use tokio_postgres::Client;

use crate::config::ConnectionSettings;
use crate::dsn::{ConnectionParams, SslMode};
use crate::error::{format_db_error, PgDiffError, Result};

/// Quote a SQL identifier to prevent SQL injection.
///
/// Doubles any embedded double-quotes and wraps in double-quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build a rustls ClientConfig using the Mozilla CA bundle and ring crypto provider.
fn make_rustls_config() -> Result<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder_with_provider(std::sync::Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| PgDiffError::ConfigError(format!("TLS setup failed: {}", e)))?
    .with_root_certificates(root_store)
    .with_no_client_auth();
    Ok(config)
}

/// Check if a postgres error is a permanent authentication failure that should not be retried.
fn is_permanent_error(e: &tokio_postgres::Error) -> bool {
    if let Some(db_err) = e.as_db_error() {
        let code = db_err.code().code();
        // 28P01 = invalid_password, 28000 = invalid_authorization_specification
        return code == "28P01" || code == "28000";
    }
    false
}

/// Spawn the background connection driver task.
fn spawn_connection_task<F>(connection: F, endpoint: String)
where
    F: Future<Output = std::result::Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            log::error!("Database connection error; endpoint={}, error={}", endpoint, e);
        }
    });
}

async fn connect_once(
    pg_config: &tokio_postgres::Config,
    ssl_mode: SslMode,
    endpoint: &str,
) -> Result<std::result::Result<Client, tokio_postgres::Error>> {
    let attempt = match ssl_mode {
        SslMode::Disable => match pg_config.connect(tokio_postgres::NoTls).await {
            Ok((client, connection)) => {
                spawn_connection_task(connection, endpoint.to_string());
                Ok(client)
            }
            Err(e) => Err(e),
        },
        SslMode::Require => {
            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(make_rustls_config()?);
            match pg_config.connect(tls).await {
                Ok((client, connection)) => {
                    spawn_connection_task(connection, endpoint.to_string());
                    Ok(client)
                }
                Err(e) => Err(e),
            }
        }
        SslMode::Prefer => {
            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(make_rustls_config()?);
            match pg_config.connect(tls).await {
                Ok((client, connection)) => {
                    spawn_connection_task(connection, endpoint.to_string());
                    Ok(client)
                }
                Err(_) => {
                    log::debug!("TLS connection failed, falling back to plaintext; endpoint={}", endpoint);
                    let mut plain = pg_config.clone();
                    plain.ssl_mode(tokio_postgres::config::SslMode::Disable);
                    match plain.connect(tokio_postgres::NoTls).await {
                        Ok((client, connection)) => {
                            spawn_connection_task(connection, endpoint.to_string());
                            Ok(client)
                        }
                        Err(e) => Err(e),
                    }
                }
            }
        }
    };
    Ok(attempt)
}

/// Connect to one database, retrying up to `connect_retries` times with
/// exponential backoff + jitter.
///
/// Each retry waits `min(2^attempt, 30) + rand(0..1000ms)` before the next attempt.
/// Authentication failures are not retried.
pub async fn connect(params: &ConnectionParams, settings: &ConnectionSettings) -> Result<Client> {
    let endpoint = params.display_name();
    let mut pg_config = params.to_pg_config();
    if settings.connect_timeout_secs > 0 {
        pg_config.connect_timeout(Duration::from_secs(settings.connect_timeout_secs as u64));
    }
    if settings.keepalive_secs > 0 {
        pg_config
            .keepalives(true)
            .keepalives_idle(Duration::from_secs(settings.keepalive_secs as u64));
    } else {
        pg_config.keepalives(false);
    }

    let retries = settings.connect_retries;
    let mut last_err = None;

    for attempt in 0..=retries {
        if attempt > 0 {
            let base_delay = std::cmp::min(1u64 << attempt, 30);
            let jitter_ms = fastrand::u64(0..1000);
            let delay = Duration::from_secs(base_delay) + Duration::from_millis(jitter_ms);
            log::info!(
                "Connection attempt failed, retrying; endpoint={}, attempt={}, max_attempts={}, delay_ms={}",
                endpoint,
                attempt + 1,
                retries + 1,
                delay.as_millis() as u64
            );
            tokio::time::sleep(delay).await;
        }

        match connect_once(&pg_config, params.ssl_mode, &endpoint).await? {
            Ok(client) => {
                log::debug!("Connected; endpoint={}, attempt={}", endpoint, attempt + 1);
                if settings.statement_timeout_secs > 0 {
                    let timeout_sql = format!(
                        "SET statement_timeout = '{}s'",
                        settings.statement_timeout_secs
                    );
                    client
                        .batch_execute(&timeout_sql)
                        .await
                        .map_err(|e| PgDiffError::query("set statement timeout", &e))?;
                }
                return Ok(client);
            }
            Err(e) => {
                if is_permanent_error(&e) {
                    log::error!("Permanent connection error, not retrying; endpoint={}", endpoint);
                    return Err(connection_failed(&endpoint, &e));
                }
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(e) => Err(connection_failed(&endpoint, &e)),
        None => Err(PgDiffError::ConnectionFailed {
            endpoint,
            reason: "no connection attempt was made".to_string(),
        }),
    }
}

fn connection_failed(endpoint: &str, e: &tokio_postgres::Error) -> PgDiffError {
    PgDiffError::ConnectionFailed {
        endpoint: endpoint.to_string(),
        reason: format_db_error(e),
    }
}

/// A server-side function that only lives for the duration of one extraction.
///
/// Created in the session's `pg_temp` schema, so the server discards it
/// with the connection even when the explicit drop never runs.
#[derive(Debug, Clone)]
pub struct HelperRoutine {
    /// Unique function name for this invocation.
    pub name: String,
    /// `CREATE FUNCTION` statement.
    pub create_sql: String,
    /// `DROP FUNCTION IF EXISTS` statement.
    pub drop_sql: String,
}

impl HelperRoutine {
    /// Build a helper from a name prefix, its argument types, and a body
    /// template in which `{name}` is replaced by the unique function name.
    pub fn new(prefix: &str, arg_types: &str, create_template: &str) -> Self {
        let name = unique_name(prefix);
        let quoted = temp_ident(&name);
        Self {
            create_sql: create_template.replace("{name}", &quoted),
            drop_sql: format!("DROP FUNCTION IF EXISTS {}({})", quoted, arg_types),
            name,
        }
    }

    /// The schema-qualified quoted name, for use inside queries.
    pub fn ident(&self) -> String {
        temp_ident(&self.name)
    }
}

/// Temporary functions are only found when called as `pg_temp.<name>`.
fn temp_ident(name: &str) -> String {
    format!("pg_temp.{}", quote_ident(name))
}

/// `<prefix>_<utc timestamp>_<random>`: distinct across runs and across the
/// two sides of a comparison hitting the same database.
fn unique_name(prefix: &str) -> String {
    format!(
        "{}_{}_{:06}",
        prefix,
        chrono::Utc::now().format("%Y%m%d%H%M%S"),
        fastrand::u32(0..1_000_000)
    )
}

/// Create `helper`, run `body`, then drop `helper`.
///
/// The drop is attempted on every path, including when creation itself
/// failed. A drop failure is logged; the body's own error is what the
/// caller sees.
pub async fn with_helper_routine<T, F, Fut>(
    client: &Client,
    helper: &HelperRoutine,
    phase: &str,
    body: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    log::debug!("Creating helper routine; name={}", helper.name);
    let result = match client.batch_execute(&helper.create_sql).await {
        Ok(()) => body().await,
        Err(e) => Err(PgDiffError::query(format!("create {} helper", phase), &e)),
    };

    if let Err(e) = client.batch_execute(&helper.drop_sql).await {
        log::warn!(
            "Failed to drop helper routine; name={}, error={}",
            helper.name,
            format_db_error(&e)
        );
        if result.is_ok() {
            return Err(PgDiffError::query(format!("drop {} helper", phase), &e));
        }
    } else {
        log::debug!("Dropped helper routine; name={}", helper.name);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_simple() {
        assert_eq!(quote_ident("users"), "\"users\"");
    }

    #[test]
    fn test_quote_ident_embedded_quotes() {
        assert_eq!(quote_ident("my\"table"), "\"my\"\"table\"");
    }

    #[test]
    fn test_helper_routine_statements() {
        let helper = HelperRoutine::new(
            "pgdiff_count_rows",
            "text, text",
            "CREATE FUNCTION {name}(s text, t text) RETURNS bigint AS $$ SELECT 0::bigint $$ LANGUAGE sql",
        );
        assert!(helper.name.starts_with("pgdiff_count_rows_"));
        assert!(helper
            .create_sql
            .starts_with(&format!("CREATE FUNCTION pg_temp.\"{}\"(s text", helper.name)));
        assert_eq!(
            helper.drop_sql,
            format!("DROP FUNCTION IF EXISTS pg_temp.\"{}\"(text, text)", helper.name)
        );
        assert_eq!(helper.ident(), format!("pg_temp.\"{}\"", helper.name));
    }

    #[test]
    fn test_unique_names_differ() {
        let names: std::collections::HashSet<String> =
            (0..20).map(|_| unique_name("pgdiff_seq")).collect();
        assert!(names.len() > 1);
    }
}
