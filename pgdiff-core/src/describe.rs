//! Running `psql`'s `\d` meta-command for one table.

use tokio::process::Command;

use crate::db::quote_ident;
use crate::dsn::ConnectionParams;
use crate::error::{PgDiffError, Result};

/// Something that can return the `\d`-style description of a table.
#[allow(async_fn_in_trait)]
pub trait DescribeTable {
    async fn describe(&self, schema: &str, table: &str) -> Result<String>;
}

/// Program, arguments and extra environment for one describe call.
#[derive(Clone, PartialEq, Eq)]
pub struct DescribeInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl std::fmt::Debug for DescribeInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env: Vec<(&str, &str)> = self
            .env
            .iter()
            .map(|(k, v)| {
                if k == "PGPASSWORD" {
                    (k.as_str(), "[REDACTED]")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("DescribeInvocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env)
            .finish()
    }
}

impl DescribeInvocation {
    /// Build the `psql` invocation describing `schema.table`.
    pub fn psql(psql_path: &str, params: &ConnectionParams, schema: &str, table: &str) -> Self {
        let args = vec![
            "-X".to_string(),
            "-h".to_string(),
            params.host.clone(),
            "-U".to_string(),
            params.user.clone(),
            "-p".to_string(),
            params.port.to_string(),
            params.dbname.clone(),
            "-c".to_string(),
            format!("\\d {}.{}", quote_ident(schema), quote_ident(table)),
        ];

        let mut env = vec![(
            "PGSSLMODE".to_string(),
            params.ssl_mode.as_libpq().to_string(),
        )];
        if let Some(ref password) = params.password {
            env.push(("PGPASSWORD".to_string(), password.clone()));
        }

        Self {
            program: psql_path.to_string(),
            args,
            env,
        }
    }
}

/// Describes tables by spawning `psql` against one database.
#[derive(Debug, Clone)]
pub struct PsqlDescriber {
    psql_path: String,
    params: ConnectionParams,
}

impl PsqlDescriber {
    pub fn new(psql_path: impl Into<String>, params: ConnectionParams) -> Self {
        Self {
            psql_path: psql_path.into(),
            params,
        }
    }
}

impl DescribeTable for PsqlDescriber {
    async fn describe(&self, schema: &str, table: &str) -> Result<String> {
        let invocation = DescribeInvocation::psql(&self.psql_path, &self.params, schema, table);
        let label = format!("{}.{}", schema, table);
        let failed = |reason: String| PgDiffError::DescribeFailed {
            table: label.clone(),
            reason,
        };

        log::debug!("Describing table; table={}, program={}", label, invocation.program);

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| failed(format!("failed to run {}: {}", invocation.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "{} exited with {}: {}",
                invocation.program,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|_| failed("output is not valid UTF-8".to_string()))?;
        if text.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!("empty output: {}", stderr.trim())));
        }

        Ok(text)
    }
}
