use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfilePatch, User};
use crate::db::RepoResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `RepoError::Conflict` when the email is taken.
    async fn create(&self, user: NewUser) -> RepoResult<User>;
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn update_profile(&self, id: Uuid, patch: &ProfilePatch) -> RepoResult<()>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepoResult<()>;
    async fn mark_email_verified(&self, id: Uuid) -> RepoResult<()>;
    /// Removes the user with its sessions, progress and verification codes,
    /// all or nothing.
    async fn delete_cascade(&self, id: Uuid) -> RepoResult<()>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn record(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> RepoResult<()>;
    /// Returns the number of rows removed.
    async fn invalidate_all(&self, user_id: Uuid) -> RepoResult<u64>;
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone, country, experience, \
     password_hash, newsletter, email_verified, created_at, updated_at";

pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, phone, country,
                               experience, password_hash, newsletter)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.phone)
            .bind(&user.country)
            .bind(&user.experience)
            .bind(&user.password_hash)
            .bind(user.newsletter)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, patch: &ProfilePatch) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET first_name = COALESCE($2, first_name),
                   last_name  = COALESCE($3, last_name),
                   email      = COALESCE($4, email),
                   phone      = COALESCE($5, phone),
                   country    = COALESCE($6, country),
                   experience = COALESCE($7, experience),
                   newsletter = COALESCE($8, newsletter),
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.first_name.as_deref())
        .bind(patch.last_name.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.phone.as_deref())
        .bind(patch.country.as_deref())
        .bind(patch.experience.as_deref())
        .bind(patch.newsletter)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepoResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn mark_email_verified(&self, id: Uuid) -> RepoResult<()> {
        sqlx::query("UPDATE users SET email_verified = TRUE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_cascade(&self, id: Uuid) -> RepoResult<()> {
        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.db.begin().await.context("begin tx")?;

        sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete sessions")?;
        sqlx::query("DELETE FROM course_progress WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete course progress")?;
        sqlx::query(
            "DELETE FROM verification_codes WHERE email IN (SELECT email FROM users WHERE id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("delete verification codes")?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete user")?;

        tx.commit().await.context("commit tx")?;
        Ok(())
    }
}

pub struct PgSessionRepository {
    db: PgPool,
}

impl PgSessionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn record(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO user_sessions (id, user_id, token, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn invalidate_all(&self, user_id: Uuid) -> RepoResult<u64> {
        let res = sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
