//! Form validation performed before any auth or storage call.
//!
//! Each validator returns every failing field so forms can show all inline
//! messages at once.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minimum password length accepted by the auth provider.
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Maximum board title length.
pub const MAX_TITLE_CHARS: usize = 100;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// One failing form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyEmail,
    InvalidEmail,
    EmptyPassword,
    PasswordTooShort { min_chars: usize },
    PasswordMismatch,
    EmptyTitle,
    TitleTooLong { max_chars: usize },
}

impl ValidationError {
    /// Form field the message belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::InvalidEmail => "email",
            Self::EmptyPassword | Self::PasswordTooShort { .. } => "password",
            Self::PasswordMismatch => "password_confirm",
            Self::EmptyTitle | Self::TitleTooLong { .. } => "title",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email is required"),
            Self::InvalidEmail => write!(f, "email format is invalid"),
            Self::EmptyPassword => write!(f, "password is required"),
            Self::PasswordTooShort { min_chars } => {
                write!(f, "password must be at least {min_chars} characters")
            }
            Self::PasswordMismatch => write!(f, "passwords do not match"),
            Self::EmptyTitle => write!(f, "title is required"),
            Self::TitleTooLong { max_chars } => {
                write!(f, "title must be at most {max_chars} characters")
            }
        }
    }
}

impl Error for ValidationError {}

/// Sign-in form input.
#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form input.
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

pub fn validate_sign_in(form: &SignInForm) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_email(&form.email, &mut errors);
    if form.password.is_empty() {
        errors.push(ValidationError::EmptyPassword);
    }
    into_result(errors)
}

pub fn validate_sign_up(form: &SignUpForm) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_email(&form.email, &mut errors);
    if form.password.is_empty() {
        errors.push(ValidationError::EmptyPassword);
    } else if form.password.chars().count() < MIN_PASSWORD_CHARS {
        errors.push(ValidationError::PasswordTooShort {
            min_chars: MIN_PASSWORD_CHARS,
        });
    }
    if form.password != form.password_confirm {
        errors.push(ValidationError::PasswordMismatch);
    }
    into_result(errors)
}

/// Trims and checks a board title, returning the normalized value.
pub fn normalize_board_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong {
            max_chars: MAX_TITLE_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

fn check_email(email: &str, errors: &mut Vec<ValidationError>) {
    let email = email.trim();
    if email.is_empty() {
        errors.push(ValidationError::EmptyEmail);
    } else if !EMAIL_RE.is_match(email) {
        errors.push(ValidationError::InvalidEmail);
    }
}

fn into_result(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_board_title, validate_sign_in, validate_sign_up, SignInForm, SignUpForm,
        ValidationError,
    };

    #[test]
    fn sign_up_reports_every_failing_field() {
        let form = SignUpForm {
            email: "not-an-email".to_string(),
            password: "abc".to_string(),
            password_confirm: "abd".to_string(),
        };
        let errors = validate_sign_up(&form).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidEmail,
                ValidationError::PasswordTooShort { min_chars: 6 },
                ValidationError::PasswordMismatch,
            ]
        );
        assert_eq!(errors[2].field(), "password_confirm");
    }

    #[test]
    fn sign_up_accepts_matching_passwords() {
        let form = SignUpForm {
            email: " user@example.com ".to_string(),
            password: "secret1".to_string(),
            password_confirm: "secret1".to_string(),
        };
        assert!(validate_sign_up(&form).is_ok());
    }

    #[test]
    fn sign_in_requires_both_fields() {
        let errors = validate_sign_in(&SignInForm::default()).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::EmptyEmail, ValidationError::EmptyPassword]
        );
    }

    #[test]
    fn board_title_is_trimmed_and_bounded() {
        assert_eq!(normalize_board_title("  2027 goals ").unwrap(), "2027 goals");
        assert_eq!(normalize_board_title("   "), Err(ValidationError::EmptyTitle));
        assert!(matches!(
            normalize_board_title(&"x".repeat(101)),
            Err(ValidationError::TitleTooLong { max_chars: 100 })
        ));
    }
}
