use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Deliberately loose: an `@` and a `.` anywhere.
pub fn is_valid_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

/// A field is missing when absent, null or empty.
pub fn required<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str, ApiError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::validation(format!("{name} is required"))),
    }
}

pub fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}
