//! Client-side checks run before any request is sent.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use taskflow_types::NewTask;

use crate::error::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const OTP_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

/// Sign-up form input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    /// Checks name, email syntax, password length and confirmation.
    ///
    /// # Errors
    /// Returns the first rule that fails.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }
}

/// # Errors
/// Returns [`ValidationError::InvalidEmail`] unless the address looks like `a@b.c`.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// # Errors
/// Returns [`ValidationError::MissingCredentials`] if either field is blank.
pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    Ok(())
}

/// # Errors
/// Returns [`ValidationError::InvalidOtp`] unless the code is exactly six digits.
pub fn validate_otp(otp: &str) -> Result<(), ValidationError> {
    if otp.len() == OTP_LEN && otp.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidOtp)
    }
}

/// Title must be non-blank and the due date strictly after `now`.
///
/// # Errors
/// Returns the first rule that fails.
pub fn validate_new_task(task: &NewTask, now: DateTime<Utc>) -> Result<(), ValidationError> {
    if task.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if task.due_date <= now {
        return Err(ValidationError::DueDateNotInFuture);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn registration() -> Registration {
        Registration {
            name: "Ada".into(),
            email: "a@b.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert_eq!(registration().validate(), Ok(()));
    }

    #[test]
    fn test_registration_rules() {
        let mut r = registration();
        r.name = "  ".into();
        assert_eq!(r.validate(), Err(ValidationError::EmptyName));

        let mut r = registration();
        r.email = "a@b".into();
        assert_eq!(r.validate(), Err(ValidationError::InvalidEmail));

        let mut r = registration();
        r.password = "12345".into();
        r.confirm_password = "12345".into();
        assert_eq!(
            r.validate(),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );

        let mut r = registration();
        r.confirm_password = "secret2".into();
        assert_eq!(r.validate(), Err(ValidationError::PasswordMismatch));
    }

    #[test]
    fn test_email_syntax() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("first.last@sub.example.org").is_ok());
        assert!(validate_email("a b@c.com").is_err());
        assert!(validate_email("@b.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_login_requires_both_fields() {
        assert!(validate_login("a@b.com", "secret1").is_ok());
        assert_eq!(
            validate_login("", "secret1"),
            Err(ValidationError::MissingCredentials)
        );
        assert_eq!(
            validate_login("a@b.com", ""),
            Err(ValidationError::MissingCredentials)
        );
    }

    #[test]
    fn test_otp_must_be_six_digits() {
        assert!(validate_otp("123456").is_ok());
        assert!(validate_otp("12345").is_err());
        assert!(validate_otp("1234567").is_err());
        assert!(validate_otp("12a456").is_err());
    }

    #[test]
    fn test_new_task_rules() {
        let now = Utc::now();
        let soon = now + TimeDelta::hours(1);

        assert!(validate_new_task(&NewTask::new("Buy milk", soon), now).is_ok());
        assert_eq!(
            validate_new_task(&NewTask::new(" ", soon), now),
            Err(ValidationError::EmptyTitle)
        );
        assert_eq!(
            validate_new_task(&NewTask::new("Buy milk", now), now),
            Err(ValidationError::DueDateNotInFuture)
        );
        assert_eq!(
            validate_new_task(&NewTask::new("Buy milk", now - TimeDelta::minutes(1)), now),
            Err(ValidationError::DueDateNotInFuture)
        );
    }
}
