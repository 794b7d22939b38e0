use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::access::Role;
use crate::error::required_text;
use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("name must be between 3 and 50 characters")]
    InvalidName,

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("password must be at least 6 characters")]
    WeakPassword,

    #[error("year must be between 1 and 6")]
    InvalidYear,
}

/// Normalized e-mail address (trimmed, lower-cased, one `@` with text on both
/// sides and a dot in the domain).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// # Errors
    ///
    /// Returns `UserError::InvalidEmail` when the address is malformed.
    pub fn parse(raw: &str) -> Result<Self, UserError> {
        let value = raw.trim().to_lowercase();
        let Some((local, domain)) = value.split_once('@') else {
            return Err(UserError::InvalidEmail);
        };
        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains('@');
        if local.is_empty() || !domain_ok || value.chars().any(char::is_whitespace) {
            return Err(UserError::InvalidEmail);
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registration input, validated before hashing and storage.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub year: Option<u8>,
}

impl Registration {
    /// # Errors
    ///
    /// Returns `UserError` when the name, email, password, or year is invalid.
    pub fn validate(
        name: &str,
        email: &str,
        password: &str,
        year: Option<u8>,
    ) -> Result<Self, UserError> {
        let name = required_text(name).ok_or(UserError::InvalidName)?;
        if !(3..=50).contains(&name.chars().count()) {
            return Err(UserError::InvalidName);
        }
        let email = Email::parse(email)?;
        if password.chars().count() < 6 {
            return Err(UserError::WeakPassword);
        }
        if let Some(y) = year {
            if !(1..=6).contains(&y) {
                return Err(UserError::InvalidYear);
            }
        }
        Ok(Self { name, email, year })
    }
}

/// A registered member. The credential hash lives only in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub year: Option<u8>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        let email = Email::parse("  Ada@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "ada@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for raw in ["", "ada", "@example.com", "ada@", "ada@example", "a da@x.io", "a@.io"] {
            assert_eq!(Email::parse(raw), Err(UserError::InvalidEmail), "{raw}");
        }
    }

    #[test]
    fn registration_checks_each_field() {
        assert_eq!(
            Registration::validate("Al", "al@x.io", "secret1", None).unwrap_err(),
            UserError::InvalidName
        );
        assert_eq!(
            Registration::validate("Alice", "al@x.io", "12345", None).unwrap_err(),
            UserError::WeakPassword
        );
        assert_eq!(
            Registration::validate("Alice", "al@x.io", "123456", Some(9)).unwrap_err(),
            UserError::InvalidYear
        );
        let ok = Registration::validate(" Alice ", "AL@x.io", "123456", Some(2)).unwrap();
        assert_eq!(ok.name, "Alice");
        assert_eq!(ok.email.as_str(), "al@x.io");
    }
}
