//! User accounts.
//!
//! Provides the user model, registration policy, password hashing and the
//! credential store that owns all user records.

mod model;
mod password;
mod repository;
mod validation;

pub use model::{User, UserId};
pub use repository::CredentialStore;
pub use validation::{ValidationError, validate_email, validate_password};
