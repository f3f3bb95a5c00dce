//! Shared identifiers and value objects used across the inventory ledger crates.

pub mod error;
pub mod money;
pub mod operation;
pub mod types;

pub use error::ErrorKind;
pub use money::Money;
pub use operation::{OperationType, ParseTagError, UserRole};
pub use types::{EntryId, NotificationId, ProductId, UserId};
