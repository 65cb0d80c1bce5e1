//! PostgreSQL DatabaseBackend trait 实现

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{Executor, PgPool};

use crate::error::Result;
use crate::template::{render, split_statements};
use crate::traits::{BackendErrorMapper, DatabaseBackend};
use crate::types::{ConnectionDetails, Statements};
use crate::utils::log_sanitizer::sanitize_statement;

use super::connection::{PostgresConnectionDetails, connect};
use super::{BACKEND_NAME, DEFAULT_RENEW_STATEMENTS, DEFAULT_REVOKE_STATEMENTS, PostgresBackend};

/// Split a template into statements and render each one.
///
/// Splitting happens before substitution so a `;` inside a value never
/// creates an extra statement.
pub(crate) fn render_statements(template: &str, data: &[(&str, &str)]) -> Vec<String> {
    split_statements(template)
        .map(|statement| render(statement, data))
        .collect()
}

impl PostgresBackend {
    async fn current_pool(&self) -> Result<PgPool> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or_else(|| self.not_initialized())
    }

    /// Run all statements in one transaction. Dropping the transaction on an
    /// early return rolls it back.
    async fn execute_in_transaction(
        &self,
        pool: &PgPool,
        statements: &[String],
        secrets: &[&str],
    ) -> Result<()> {
        let mut tx = pool.begin().await.map_err(|e| self.map_sqlx_error(e))?;

        for statement in statements {
            log::debug!(
                "[{BACKEND_NAME}] Executing: {}",
                sanitize_statement(statement, secrets)
            );
            tx.execute(sqlx::raw_sql(statement))
                .await
                .map_err(|e| self.map_sqlx_error(e))?;
        }

        tx.commit().await.map_err(|e| self.map_sqlx_error(e))
    }

    /// Best-effort rollback after a failed creation.
    async fn rollback_user(&self, pool: &PgPool, statements: &Statements, username: &str) {
        if statements.rollback.trim().is_empty() {
            return;
        }

        let rendered = render_statements(&statements.rollback, &[("name", username)]);
        if let Err(e) = self.execute_in_transaction(pool, &rendered, &[]).await {
            log::warn!("[{BACKEND_NAME}] Rollback for {username} failed: {e}");
        }
    }
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
    async fn backend_type(&self) -> Result<String> {
        Ok(BACKEND_NAME.to_string())
    }

    async fn initialize(&self, details: &ConnectionDetails) -> Result<()> {
        let details = PostgresConnectionDetails::decode(details)?;
        let settings = self.pool_defaults.merged(&details);
        let pool = connect(settings, &details.connection_url).await?;

        let previous = self.pool.write().await.replace(pool);
        if let Some(previous) = previous {
            log::debug!("[{BACKEND_NAME}] Re-initialized, closing previous pool");
            previous.close().await;
        }

        log::info!("[{BACKEND_NAME}] Connection pool ready");
        Ok(())
    }

    async fn create_user(
        &self,
        statements: &Statements,
        username: &str,
        password: &str,
        expiration: &str,
    ) -> Result<()> {
        if statements.creation.trim().is_empty() {
            return Err(self.invalid_parameter(
                "creation_statements",
                "at least one creation statement is required",
            ));
        }

        let pool = self.current_pool().await?;
        let rendered = render_statements(
            &statements.creation,
            &[
                ("name", username),
                ("password", password),
                ("expiration", expiration),
            ],
        );

        match self
            .execute_in_transaction(&pool, &rendered, &[password])
            .await
        {
            Ok(()) => {
                log::info!("[{BACKEND_NAME}] Created user {username}");
                Ok(())
            }
            Err(e) => {
                self.rollback_user(&pool, statements, username).await;
                Err(e)
            }
        }
    }

    async fn renew_user(
        &self,
        statements: &Statements,
        username: &str,
        expiration: &str,
    ) -> Result<()> {
        let pool = self.current_pool().await?;
        let template = if statements.renewal.trim().is_empty() {
            DEFAULT_RENEW_STATEMENTS
        } else {
            statements.renewal.as_str()
        };
        let rendered =
            render_statements(template, &[("name", username), ("expiration", expiration)]);

        self.execute_in_transaction(&pool, &rendered, &[]).await?;
        log::info!("[{BACKEND_NAME}] Renewed user {username} until {expiration}");
        Ok(())
    }

    async fn revoke_user(&self, statements: &Statements, username: &str) -> Result<()> {
        let pool = self.current_pool().await?;
        let template = if statements.revocation.trim().is_empty() {
            DEFAULT_REVOKE_STATEMENTS
        } else {
            statements.revocation.as_str()
        };
        let rendered = render_statements(template, &[("name", username)]);

        self.execute_in_transaction(&pool, &rendered, &[]).await?;
        log::info!("[{BACKEND_NAME}] Revoked user {username}");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close().await;
            log::debug!("[{BACKEND_NAME}] Connection pool closed");
        }
        Ok(())
    }

    async fn generate_username(&self, display_name: &str) -> Result<String> {
        Ok(self.credentials.generate_username(display_name))
    }

    async fn generate_password(&self) -> Result<String> {
        Ok(self.credentials.generate_password())
    }

    async fn generate_expiration(&self, ttl: Duration) -> Result<String> {
        self.credentials.generate_expiration(BACKEND_NAME, ttl)
    }
}
