use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::RepoResult;

/// Inbound contact form submission; not tied to any account.
#[derive(Debug, Clone, FromRow)]
pub struct ContactMessage {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
    pub newsletter: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
    pub newsletter: bool,
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn insert(&self, msg: NewContactMessage) -> RepoResult<ContactMessage>;
}

pub struct PgContactRepository {
    db: PgPool,
}

impl PgContactRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn insert(&self, msg: NewContactMessage) -> RepoResult<ContactMessage> {
        let row = sqlx::query_as::<_, ContactMessage>(
            r#"
            INSERT INTO contact_messages (id, first_name, last_name, email, phone,
                                          subject, message, newsletter)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, first_name, last_name, email, phone, subject, message,
                      newsletter, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&msg.first_name)
        .bind(&msg.last_name)
        .bind(&msg.email)
        .bind(&msg.phone)
        .bind(&msg.subject)
        .bind(&msg.message)
        .bind(msg.newsletter)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }
}
