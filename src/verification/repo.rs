use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::RepoResult;

#[async_trait]
pub trait VerificationCodeRepository: Send + Sync {
    /// Drops every earlier code for `email` and stores the new one.
    async fn replace(&self, email: &str, code: &str, expires_at: OffsetDateTime)
        -> RepoResult<()>;
    /// Marks a matching unused, unexpired code as used. Returns whether one matched.
    async fn consume(&self, email: &str, code: &str, now: OffsetDateTime) -> RepoResult<bool>;
}

pub struct PgVerificationCodeRepository {
    db: PgPool,
}

impl PgVerificationCodeRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VerificationCodeRepository for PgVerificationCodeRepository {
    async fn replace(
        &self,
        email: &str,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> RepoResult<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query("DELETE FROM verification_codes WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await
            .context("delete old codes")?;
        sqlx::query(
            "INSERT INTO verification_codes (id, email, code, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .context("insert code")?;
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn consume(&self, email: &str, code: &str, now: OffsetDateTime) -> RepoResult<bool> {
        let row = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE verification_codes
               SET used = TRUE
             WHERE email = $1 AND code = $2 AND used = FALSE AND expires_at > $3
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.is_some())
    }
}
