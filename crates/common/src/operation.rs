//! Categorical tags attached to ledger entries and users.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a product's quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    ManualAdjustment,
    Sale,
    Purchase,
    Damage,
    Transfer,
    Correction,
}

impl OperationType {
    /// Every operation type, in declaration order.
    pub const ALL: [OperationType; 6] = [
        OperationType::ManualAdjustment,
        OperationType::Sale,
        OperationType::Purchase,
        OperationType::Damage,
        OperationType::Transfer,
        OperationType::Correction,
    ];

    /// Returns the wire name of this operation type.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::ManualAdjustment => "manual_adjustment",
            OperationType::Sale => "sale",
            OperationType::Purchase => "purchase",
            OperationType::Damage => "damage",
            OperationType::Transfer => "transfer",
            OperationType::Correction => "correction",
        }
    }

    /// Operation types whose negative deltas count as consumption when
    /// estimating how fast a product runs out.
    pub fn is_consuming(&self) -> bool {
        matches!(
            self,
            OperationType::Sale | OperationType::Damage | OperationType::Transfer
        )
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseTagError {
    pub kind: &'static str,
    pub value: String,
}

impl std::str::FromStr for OperationType {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ParseTagError {
                kind: "operation type",
                value: s.to_string(),
            })
    }
}

/// Role of a user performing stock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Staff,
    Manager,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Staff => "staff",
            UserRole::Manager => "manager",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(UserRole::Staff),
            "manager" => Ok(UserRole::Manager),
            other => Err(ParseTagError {
                kind: "user role",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_type_parses_every_wire_name() {
        for op in OperationType::ALL {
            assert_eq!(op.as_str().parse::<OperationType>().unwrap(), op);
        }
    }

    #[test]
    fn operation_type_rejects_unknown_name() {
        let err = "refund".parse::<OperationType>().unwrap_err();
        assert_eq!(err.value, "refund");
    }

    #[test]
    fn operation_type_serde_uses_snake_case() {
        let json = serde_json::to_string(&OperationType::ManualAdjustment).unwrap();
        assert_eq!(json, "\"manual_adjustment\"");
    }

    #[test]
    fn consuming_types() {
        assert!(OperationType::Sale.is_consuming());
        assert!(OperationType::Damage.is_consuming());
        assert!(OperationType::Transfer.is_consuming());
        assert!(!OperationType::Purchase.is_consuming());
        assert!(!OperationType::Correction.is_consuming());
        assert!(!OperationType::ManualAdjustment.is_consuming());
    }

    #[test]
    fn user_role_roundtrip() {
        assert_eq!("manager".parse::<UserRole>().unwrap(), UserRole::Manager);
        assert!("admin".parse::<UserRole>().is_err());
    }
}
