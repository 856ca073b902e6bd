//! Password hashing and account input rules.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{2,31}$").expect("invalid username pattern")
});

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` for a wrong password; `Err` only when the stored hash is unreadable.
pub fn verify_password(
    password: &str,
    stored_hash: &str,
) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(stored_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        ));
    }
    if !password.chars().any(|c| c.is_alphabetic()) || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err("password must contain letters and digits".to_string());
    }
    Ok(())
}

/// 3 to 32 characters: letters, digits, `_`, `.` and `-`, starting with a letter or digit.
pub fn validate_username(username: &str) -> Result<(), String> {
    if USERNAME_PATTERN.is_match(username) {
        Ok(())
    } else {
        Err("username must be 3-32 characters of letters, digits, '_', '.' or '-'".to_string())
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
        .unwrap_or(false);

    if valid && !email.chars().any(char::is_whitespace) {
        Ok(())
    } else {
        Err(format!("'{email}' is not a valid email address"))
    }
}
