//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{PasswordChange, Registration};

/// Validate username
///
/// Usernames are either a handle or the e-mail address used as contact
/// identifier by roster imports.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 254 {
        return Err("Username must be at most 254 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.@+-]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers and the characters _ . @ + -".to_string(),
        );
    }

    Ok(())
}

/// Validate a display name part (name or surname)
pub fn validate_name(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }

    if value.len() > 255 {
        return Err(format!("{} must be at most 255 characters long", field));
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;
    let mut has_special = false;

    for c in password.chars() {
        if c.is_ascii_uppercase() {
            has_upper = true;
        } else if c.is_ascii_lowercase() {
            has_lower = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else if !c.is_alphanumeric() {
            has_special = true;
        }
    }

    if !has_upper {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !has_lower {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !has_digit {
        return Err("Password must contain at least one digit".to_string());
    }

    if !has_special {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}

fn validate_confirmation(password: &str, confirmation: &str) -> Result<(), String> {
    if password != confirmation {
        return Err("Passwords must match".to_string());
    }
    Ok(())
}

/// Validate a registration form
pub fn validate_registration(form: &Registration) -> Result<(), String> {
    validate_name("Name", &form.name)?;
    validate_name("Surname", &form.surname)?;
    validate_username(&form.username)?;
    validate_confirmation(&form.password, &form.confirmation)?;
    validate_password(&form.password)
}

/// Validate a password change form
pub fn validate_password_change(form: &PasswordChange) -> Result<(), String> {
    validate_confirmation(&form.password, &form.confirmation)?;
    validate_password(&form.password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            username: "ada.lovelace@example.org".to_string(),
            password: "Engine#1843".to_string(),
            confirmation: "Engine#1843".to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert_eq!(validate_registration(&registration()), Ok(()));
    }

    #[test]
    fn test_usernames_accept_handles_and_emails() {
        assert!(validate_username("ada_l").is_ok());
        assert!(validate_username("ada+events@example.org").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("ada lovelace").is_err());
    }

    #[test]
    fn test_registration_requires_matching_confirmation() {
        let mut form = registration();
        form.confirmation = "Engine#1844".to_string();
        assert_eq!(
            validate_registration(&form),
            Err("Passwords must match".to_string())
        );
    }

    #[test]
    fn test_registration_requires_names() {
        let mut form = registration();
        form.surname = "   ".to_string();
        assert_eq!(
            validate_registration(&form),
            Err("Surname is required".to_string())
        );
    }

    #[test]
    fn test_password_strength_rules() {
        assert!(validate_password("short1!").is_err());
        assert!(validate_password("alllowercase1!").is_err());
        assert!(validate_password("ALLUPPERCASE1!").is_err());
        assert!(validate_password("NoDigitsHere!").is_err());
        assert!(validate_password("NoSpecial123").is_err());
        assert!(validate_password("Good#Pass123").is_ok());
    }

    #[test]
    fn test_password_change_checks_confirmation_first() {
        let form = PasswordChange {
            password: "weak".to_string(),
            confirmation: "other".to_string(),
        };
        assert_eq!(
            validate_password_change(&form),
            Err("Passwords must match".to_string())
        );
    }
}
