use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String, // unique, compared exactly as stored
    pub phone: String,
    pub country: String,
    pub experience: String,
    pub password_hash: String, // Argon2 PHC string, never exposed
    pub newsletter: bool,
    pub email_verified: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub experience: String,
    pub password_hash: String,
    pub newsletter: bool,
}

/// Whitelisted profile fields; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub experience: Option<String>,
    pub newsletter: Option<bool>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.country.is_none()
            && self.experience.is_none()
            && self.newsletter.is_none()
    }
}
