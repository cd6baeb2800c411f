//! Field checks shared by the registration and profile endpoints.

use crate::api::ApiError;

pub const USERNAME_LEN: (usize, usize) = (3, 50);
pub const PASSWORD_LEN: (usize, usize) = (6, 100);

fn length(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn username(value: &str) -> Result<(), ApiError> {
    length("username", value, USERNAME_LEN)
}

pub fn password(value: &str) -> Result<(), ApiError> {
    length("password", value, PASSWORD_LEN)
}

pub fn email(value: &str) -> Result<(), ApiError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::Validation(
            "email is not a valid email address".to_string(),
        ));
    }
    Ok(())
}
