use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{ProfilePatch, User};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub experience: String,
    pub newsletter: bool,
    pub email_verified: bool,
}

impl From<&User> for Profile {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            country: u.country.clone(),
            experience: u.experience.clone(),
            newsletter: u.newsletter,
            email_verified: u.email_verified,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: Profile,
}

/// Any key outside this set is ignored by serde.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub experience: Option<String>,
    pub newsletter: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Empty strings leave the stored value alone, except `phone`, which may be cleared.
impl From<UpdateProfileRequest> for ProfilePatch {
    fn from(r: UpdateProfileRequest) -> Self {
        Self {
            first_name: non_empty(r.first_name),
            last_name: non_empty(r.last_name),
            email: non_empty(r.email),
            phone: r.phone,
            country: non_empty(r.country),
            experience: non_empty(r.experience),
            newsletter: r.newsletter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_produce_empty_patch() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"isAdmin": true, "password_hash": "x"}"#).unwrap();
        assert!(ProfilePatch::from(req).is_empty());
    }

    #[test]
    fn known_keys_are_kept() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"country": "EG", "newsletter": false}"#).unwrap();
        let patch = ProfilePatch::from(req);
        assert_eq!(patch.country.as_deref(), Some("EG"));
        assert_eq!(patch.newsletter, Some(false));
        assert!(patch.first_name.is_none());
    }

    #[test]
    fn empty_strings_are_dropped_except_phone() {
        let req: UpdateProfileRequest = serde_json::from_str(
            r#"{"firstName": "", "email": "", "country": "", "phone": ""}"#,
        )
        .unwrap();
        let patch = ProfilePatch::from(req);
        assert!(patch.first_name.is_none());
        assert!(patch.email.is_none());
        assert!(patch.country.is_none());
        assert_eq!(patch.phone.as_deref(), Some(""));
    }
}
