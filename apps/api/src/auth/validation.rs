use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignupValidationError {
    #[error("Please enter a valid email address (e.g., name@example.com)")]
    InvalidEmail,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

/// Trimmed, lower-cased form used as the account key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `local@domain.tld`: local part of letters, digits and `._%+-`; domain of
/// letters, digits, `.` and `-`; a final label of at least two letters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return false;
    }

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Checks sign-up input and returns the normalised email.
pub fn validate_signup(email: &str, password: &str) -> Result<String, SignupValidationError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(SignupValidationError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SignupValidationError::PasswordTooShort);
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for email in [
            "name@example.com",
            "first.last+tag@sub.domain.org",
            "a_b%c-d@x-y.io",
            "hofhackathon@nyu.edu",
        ] {
            assert!(is_valid_email(email), "{email}");
        }
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        for email in [
            "",
            "plain",
            "@example.com",
            "name@",
            "name@example",
            "name@example.c",
            "name@.com",
            "name@exa mple.com",
            "na me@example.com",
            "name@@example.com",
            "name@example.c0m",
        ] {
            assert!(!is_valid_email(email), "{email}");
        }
    }

    #[test]
    fn test_signup_normalizes_email() {
        assert_eq!(
            validate_signup("  Ana@Example.COM ", "secret1").unwrap(),
            "ana@example.com"
        );
    }

    #[test]
    fn test_short_password_rejected() {
        assert_eq!(
            validate_signup("ana@example.com", "12345").unwrap_err(),
            SignupValidationError::PasswordTooShort
        );
        assert!(validate_signup("ana@example.com", "123456").is_ok());
    }
}
