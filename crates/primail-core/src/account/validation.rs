//! Registration policy.

/// Validation error for registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is empty.
    EmptyEmail,
    /// Email address format is invalid.
    InvalidEmail,
    /// Email address is outside the organisational domain.
    WrongDomain,
    /// Password is empty.
    EmptyPassword,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyEmail => "Email address is required",
            Self::InvalidEmail => "Invalid email address format",
            Self::WrongDomain => "Email address is not in the organisation's domain",
            Self::EmptyPassword => "Password is required",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::InvalidEmail | Self::WrongDomain => "email",
            Self::EmptyPassword => "password",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Checks that `email` is a well-formed address in `domain`.
///
/// The address is the user's identity key and is matched exactly, so the
/// domain must be written exactly as configured.
///
/// # Errors
///
/// Returns the first rule the address violates.
pub fn validate_email(email: &str, domain: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let Some((local, host)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty() || host.is_empty() || host.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }

    if host == domain {
        Ok(())
    } else {
        Err(ValidationError::WrongDomain)
    }
}

/// Checks that a password is acceptable.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyPassword`] for an empty password.
pub const fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        Err(ValidationError::EmptyPassword)
    } else {
        Ok(())
    }
}
