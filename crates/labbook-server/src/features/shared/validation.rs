//! Shared validation utilities
//!
//! Common validation for entity names and hostnames used by commands
//! across features.

use thiserror::Error;

/// Errors that can occur during name validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    #[error("Name is required and cannot be empty")]
    Required,

    #[error("Name must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },
}

/// Errors that can occur during hostname validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostnameValidationError {
    #[error("Hostname cannot be empty when provided")]
    Empty,

    #[error("Hostname can only contain letters, numbers, dots and hyphens")]
    InvalidFormat,
}

/// Validate a display/entity name
///
/// Must not be empty after trimming and must not exceed `max_length`.
pub fn validate_name(name: &str, max_length: usize) -> Result<(), NameValidationError> {
    if name.trim().is_empty() {
        return Err(NameValidationError::Required);
    }

    if name.len() > max_length {
        return Err(NameValidationError::TooLong { max_length });
    }

    Ok(())
}

/// Validate a legacy repository hostname
pub fn validate_hostname(hostname: &str) -> Result<(), HostnameValidationError> {
    if hostname.is_empty() {
        return Err(HostnameValidationError::Empty);
    }

    if !hostname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(HostnameValidationError::InvalidFormat);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("flatiron-archive", 255).is_ok());
        assert_eq!(validate_name("   ", 255), Err(NameValidationError::Required));
        assert_eq!(
            validate_name(&"a".repeat(300), 255),
            Err(NameValidationError::TooLong { max_length: 255 })
        );
    }

    #[test]
    fn test_validate_hostname() {
        assert!(validate_hostname("nas-01.lab.example.org").is_ok());
        assert_eq!(validate_hostname(""), Err(HostnameValidationError::Empty));
        assert_eq!(
            validate_hostname("bad host"),
            Err(HostnameValidationError::InvalidFormat)
        );
    }
}
