// src/validation.rs
use crate::models::{Account, AccountType};
use thiserror::Error;

pub const MAX_FIELD_LEN: usize = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Login is required")]
    EmptyLogin,
    #[error("Login must be at most 100 characters")]
    LoginTooLong,
    #[error("Password is required for Local accounts")]
    EmptyPassword,
    #[error("Password must be at most 100 characters")]
    PasswordTooLong,
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyLogin | ValidationError::LoginTooLong => "login",
            ValidationError::EmptyPassword | ValidationError::PasswordTooLong => "password",
        }
    }
}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Checks the login and password rules. Lengths count characters of the untrimmed value.
pub fn validate_account(account: &Account) -> ValidationResult {
    let mut errors = Vec::new();

    if account.login.trim().is_empty() {
        errors.push(ValidationError::EmptyLogin);
    } else if account.login.chars().count() > MAX_FIELD_LEN {
        errors.push(ValidationError::LoginTooLong);
    }

    if account.account_type == AccountType::Local {
        match account.password.as_deref() {
            None => errors.push(ValidationError::EmptyPassword),
            Some(p) if p.trim().is_empty() => errors.push(ValidationError::EmptyPassword),
            Some(p) if p.chars().count() > MAX_FIELD_LEN => errors.push(ValidationError::PasswordTooLong),
            Some(_) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
