pub mod entry;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod product;
pub mod query;
pub mod records;
pub mod store;

pub use common::{EntryId, NotificationId, ProductId, UserId};
pub use entry::{LedgerEntry, LedgerEntryBuilder, Version};
pub use error::{Result, StoreError};
pub use memory::{FailPoint, InMemoryStore};
pub use postgres::PostgresStore;
pub use product::{Pagination, Product, ProductFilter, ProductUpdate};
pub use query::{InvalidQuery, LedgerQuery, SortOrder};
pub use records::{Notification, NotificationType, User};
pub use store::{
    EntryStream, InventoryStore, LedgerStore, LedgerStoreExt, NotificationStore, ProductStore,
    StockMutation, UserStore, validate_initial_entry, validate_mutation,
};
