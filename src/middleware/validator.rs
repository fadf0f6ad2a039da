//! Input validation for user-supplied fields

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Maximum email length (RFC 5321 path limit)
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum display name length in characters
const MAX_NAME_LENGTH: usize = 100;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").ok())
        .as_ref()
}

fn markup_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").ok()).as_ref()
}

/// Control characters other than tab, newline and carriage return
fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
}

/// Input validator
pub struct InputValidator;

impl InputValidator {
    /// Validate an email address
    pub fn validate_email(email: &str) -> Result<(), ValidationError> {
        if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
            warn!("Validation failed: email length {}", email.len());
            return Err(ValidationError::InvalidEmail);
        }

        if !email_pattern().is_some_and(|re| re.is_match(email)) {
            warn!("Validation failed: malformed email");
            return Err(ValidationError::InvalidEmail);
        }

        debug!("Email validation passed");
        Ok(())
    }

    /// Validate a display name
    pub fn validate_name(name: &str) -> Result<(), ValidationError> {
        let length = name.chars().count();
        if length == 0 || length > MAX_NAME_LENGTH {
            warn!("Validation failed: name length {}", length);
            return Err(ValidationError::InvalidName);
        }

        // Tab and newline are the only control characters allowed
        if name.chars().any(|c| (c as u32) < 32 && c != '\t' && c != '\n') {
            warn!("Validation failed: name contains control characters");
            return Err(ValidationError::InvalidName);
        }

        debug!("Name validation passed");
        Ok(())
    }

    /// Strip markup tags and control characters, then trim
    pub fn sanitize_string(input: &str) -> String {
        let stripped = match markup_pattern() {
            Some(re) => re.replace_all(input, ""),
            None => input.into(),
        };

        stripped
            .chars()
            .filter(|c| !is_stripped_control(*c))
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Require 8-128 characters with upper, lower, digit and special classes
    pub fn validate_password(password: &str) -> Result<(), ValidationError> {
        let length = password.chars().count();
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
            return Err(ValidationError::WeakPassword(format!(
                "password must be between {} and {} characters",
                MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH
            )));
        }

        let upper = password.chars().any(|c| c.is_ascii_uppercase());
        let lower = password.chars().any(|c| c.is_ascii_lowercase());
        let digit = password.chars().any(|c| c.is_ascii_digit());
        let special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

        if !(upper && lower && digit && special) {
            return Err(ValidationError::WeakPassword(
                "password must contain uppercase, lowercase, number, and special character"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Parse a path identifier; ids are positive integers
    pub fn validate_id(raw: &str) -> Result<i64, ValidationError> {
        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => {
                warn!("Validation failed: invalid id {:?}", raw);
                Err(ValidationError::InvalidId)
            }
        }
    }
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid request body")]
    MalformedBody,

    #[error("name and email are required")]
    MissingFields,

    #[error("invalid name format")]
    InvalidName,

    #[error("invalid email format")]
    InvalidEmail,

    #[error("{0}")]
    WeakPassword(String),

    #[error("invalid user id")]
    InvalidId,

    #[error("{0}")]
    OutOfRange(&'static str),
}
