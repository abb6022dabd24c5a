//! Field-level credential checks run before any network call.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

pub const PASSWORD_MIN_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Email,
    Password,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Password => "password",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Please enter your email address")]
    EmailRequired,
    #[error("Please enter a valid email address")]
    EmailInvalid,
    #[error("Please enter your password")]
    PasswordRequired,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
}

impl ValidationError {
    pub fn field(self) -> Field {
        match self {
            Self::EmailRequired | Self::EmailInvalid => Field::Email,
            Self::PasswordRequired | Self::PasswordTooShort => Field::Password,
        }
    }
}

/// At most one error per field, ordered by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: BTreeMap<Field, ValidationError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: Field) -> Option<ValidationError> {
        self.errors.get(&field).copied()
    }

    pub fn contains(&self, error: ValidationError) -> bool {
        self.get(error.field()) == Some(error)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, ValidationError)> + '_ {
        self.errors.iter().map(|(field, error)| (*field, *error))
    }

    fn record(&mut self, error: ValidationError) {
        self.errors.entry(error.field()).or_insert(error);
    }
}

pub fn validate(email: &str, password: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    if let Some(error) = check_email(email) {
        errors.record(error);
    }
    if let Some(error) = check_password(password) {
        errors.record(error);
    }
    errors
}

pub fn check_email(email: &str) -> Option<ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        Some(ValidationError::EmailRequired)
    } else if !is_well_formed_email(email) {
        Some(ValidationError::EmailInvalid)
    } else {
        None
    }
}

pub fn check_password(password: &str) -> Option<ValidationError> {
    if password.is_empty() {
        Some(ValidationError::PasswordRequired)
    } else if password.chars().count() < PASSWORD_MIN_LEN {
        Some(ValidationError::PasswordTooShort)
    } else {
        None
    }
}

fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }
    domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
