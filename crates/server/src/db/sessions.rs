//! Session store: persisted authorization grants, one row per shop.
//!
//! Handlers only touch sessions through the [`SessionStore`] trait so the
//! webhook lifecycle can be tested against an in-memory implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use magic_checkout_core::ShopDomain;

use super::RepositoryError;
use crate::models::Session;

/// Persistence interface for [`Session`] rows.
///
/// Implementations must keep the one-row-per-shop invariant: `upsert`
/// overwrites by session id, `update_scope` never inserts, and
/// `delete_by_shop` removes every row for the shop (stale rows included).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up the active session for a shop.
    async fn find_by_shop(&self, shop: &ShopDomain) -> Result<Option<Session>, RepositoryError>;

    /// Insert or overwrite a session by id.
    async fn upsert(&self, session: &Session) -> Result<(), RepositoryError>;

    /// Overwrite the stored scope of an existing session.
    ///
    /// A no-op when the id no longer exists - a late scopes update after an
    /// uninstall must not recreate the row.
    async fn update_scope(&self, id: &str, scope: &str) -> Result<(), RepositoryError>;

    /// Delete every session row for a shop. Returns the number removed.
    async fn delete_by_shop(&self, shop: &ShopDomain) -> Result<u64, RepositoryError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL`-backed session store.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Create a new store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn find_by_shop(&self, shop: &ShopDomain) -> Result<Option<Session>, RepositoryError> {
        let session = sqlx::query_as::<_, Session>(
            r"
            SELECT id, shop, access_token, scope, expires_at
            FROM sessions
            WHERE shop = $1
            ",
        )
        .bind(shop.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn upsert(&self, session: &Session) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO sessions (id, shop, access_token, scope, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET shop = EXCLUDED.shop,
                access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                expires_at = EXCLUDED.expires_at,
                updated_at = now()
            ",
        )
        .bind(&session.id)
        .bind(session.shop.as_str())
        .bind(&session.access_token)
        .bind(&session.scope)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_scope(&self, id: &str, scope: &str) -> Result<(), RepositoryError> {
        // Update-only: zero affected rows means the session is gone, which
        // is fine under at-least-once delivery.
        sqlx::query(
            r"
            UPDATE sessions
            SET scope = $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(scope)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_by_shop(&self, shop: &ShopDomain) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE shop = $1")
            .bind(shop.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
