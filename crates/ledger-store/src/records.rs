//! Users and notifications referenced by the ledger.

use chrono::{DateTime, Utc};
use common::{NotificationId, ParseTagError, ProductId, UserId, UserRole};
use serde::{Deserialize, Serialize};

/// A user that can be credited with stock changes. Read-only to this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

/// Kind of stock notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    LowStock,
    OutOfStock,
    ReorderRequired,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LowStock => "low_stock",
            NotificationType::OutOfStock => "out_of_stock",
            NotificationType::ReorderRequired => "reorder_required",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low_stock" => Ok(NotificationType::LowStock),
            "out_of_stock" => Ok(NotificationType::OutOfStock),
            "reorder_required" => Ok(NotificationType::ReorderRequired),
            other => Err(ParseTagError {
                kind: "notification type",
                value: other.to_string(),
            }),
        }
    }
}

/// A best-effort stock notification for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub product_id: ProductId,
    pub kind: NotificationType,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(product_id: ProductId, kind: NotificationType) -> Self {
        Self {
            id: NotificationId::new(),
            product_id,
            kind,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}
