//! Message storage.

mod model;
mod store;

pub use model::{Message, MessageId};
pub use store::MessageStore;
