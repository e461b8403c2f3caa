//! Login sessions.
//!
//! Sessions live only in memory and are lost on restart.

mod manager;
mod model;

pub use manager::SessionManager;
pub use model::{Session, SessionToken};
