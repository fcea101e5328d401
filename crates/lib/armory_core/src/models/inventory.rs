//! Inventory models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Availability of an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Available,
    #[serde(alias = "withdrawn", alias = "in-use")]
    InUse,
    #[serde(other)]
    Unknown,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::InUse => "in_use",
            ItemStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item as listed by `GET /api/inventory/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    #[serde(default, alias = "type")]
    pub category: String,
    #[serde(default)]
    pub serial_number: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub qr_string: Option<String>,
}

/// Scan-driven inventory action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemAction {
    Withdraw,
    Return,
}

impl ItemAction {
    /// Backend endpoint for this action.
    pub fn path(&self) -> &'static str {
        match self {
            ItemAction::Withdraw => "/api/inventory/withdraw",
            ItemAction::Return => "/api/inventory/return",
        }
    }

    /// Status an item ends up in once the action succeeds.
    pub fn resulting_status(&self) -> ItemStatus {
        match self {
            ItemAction::Withdraw => ItemStatus::InUse,
            ItemAction::Return => ItemStatus::Available,
        }
    }

    /// Past-tense verb for confirmation messages.
    pub fn past_tense(&self) -> &'static str {
        match self {
            ItemAction::Withdraw => "withdrawn",
            ItemAction::Return => "returned",
        }
    }
}

impl fmt::Display for ItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemAction::Withdraw => f.write_str("withdraw"),
            ItemAction::Return => f.write_str("return"),
        }
    }
}

/// Body of the withdraw/return endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ItemActionRequest {
    pub item_id: String,
}

/// Withdraw/return response: either the updated item or a status message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ActionReceipt {
    Item(InventoryItem),
    Status {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

/// Transaction record from `GET /api/logs/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLog {
    pub id: i64,
    #[serde(default)]
    pub item_id: Option<i64>,
    #[serde(default, alias = "item")]
    pub item_name: Option<String>,
    #[serde(default)]
    pub action: String,
    #[serde(default, alias = "user_name")]
    pub user: Option<String>,
    #[serde(default, alias = "created_at")]
    pub timestamp: Option<DateTime<Utc>>,
}
