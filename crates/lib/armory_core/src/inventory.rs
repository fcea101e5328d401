//! Inventory listing, scan-driven withdraw/return and list helpers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::SessionClient;
use crate::error::{ClientResult, ScanFlowError};
use crate::models::{
    ActionReceipt, InventoryItem, ItemAction, ItemActionRequest, ItemStatus, TransactionLog,
    UserProfile,
};
use crate::scan::{Decoder, ScanController, ScanOutcome};

pub const INVENTORY_PATH: &str = "/api/inventory/";
pub const LOGS_PATH: &str = "/api/logs/";

/// Group label for items without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

pub async fn list_items(client: &SessionClient) -> ClientResult<Vec<InventoryItem>> {
    client.get(INVENTORY_PATH).await
}

pub async fn list_logs(client: &SessionClient) -> ClientResult<Vec<TransactionLog>> {
    client.get(LOGS_PATH).await
}

/// Withdraw or return one item.
pub async fn perform(
    client: &SessionClient,
    action: ItemAction,
    item_id: &str,
) -> ClientResult<ActionReceipt> {
    let receipt = client
        .post(
            action.path(),
            &ItemActionRequest {
                item_id: item_id.to_string(),
            },
        )
        .await?;
    info!(%action, item_id, "inventory action accepted");
    Ok(receipt)
}

/// Scan an item's QR code and withdraw or return it.
///
/// Returns the scanned code with the backend's receipt.
pub async fn scan_and_perform<D: Decoder>(
    client: &SessionClient,
    scanner: &mut ScanController<D>,
    teardown: &CancellationToken,
    action: ItemAction,
) -> Result<(String, ActionReceipt), ScanFlowError> {
    let code = match scanner.run(teardown).await {
        ScanOutcome::Decoded(text) => text,
        ScanOutcome::Failed(e) => return Err(e.into()),
        ScanOutcome::Cancelled => return Err(ScanFlowError::Cancelled),
    };
    match perform(client, action, &code).await {
        Ok(receipt) => Ok((code, receipt)),
        Err(e) => {
            scanner.reset();
            Err(e.into())
        }
    }
}

/// Item list filter. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub status: Option<ItemStatus>,
    pub category: Option<String>,
    /// Case-insensitive substring of name, serial number or category.
    pub search: Option<String>,
}

impl InventoryFilter {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        if self.status.is_some_and(|s| s != item.status) {
            return false;
        }
        if let Some(category) = &self.category
            && !category.eq_ignore_ascii_case(&item.category)
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [&item.name, &item.serial_number, &item.category]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }

    pub fn apply<'a>(&self, items: &'a [InventoryItem]) -> Vec<&'a InventoryItem> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

/// Items grouped by category, categories sorted.
pub fn group_by_category<'a>(
    items: impl IntoIterator<Item = &'a InventoryItem>,
) -> BTreeMap<&'a str, Vec<&'a InventoryItem>> {
    let mut groups: BTreeMap<&str, Vec<&InventoryItem>> = BTreeMap::new();
    for item in items {
        let key = match item.category.trim() {
            "" => UNCATEGORIZED,
            category => category,
        };
        groups.entry(key).or_default().push(item);
    }
    groups
}

/// Availability counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub available: usize,
    pub in_use: usize,
}

pub fn summarize<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Summary {
    items.into_iter().fold(Summary::default(), |mut s, item| {
        s.total += 1;
        match item.status {
            ItemStatus::Available => s.available += 1,
            ItemStatus::InUse => s.in_use += 1,
            ItemStatus::Unknown => {}
        }
        s
    })
}

/// Find the item a scanned code refers to: QR string, then id, then serial number.
pub fn resolve_scanned<'a>(items: &'a [InventoryItem], code: &str) -> Option<&'a InventoryItem> {
    let code = code.trim();
    items
        .iter()
        .find(|item| item.qr_string.as_deref() == Some(code))
        .or_else(|| items.iter().find(|item| item.id.to_string() == code))
        .or_else(|| {
            items
                .iter()
                .find(|item| !item.serial_number.is_empty() && item.serial_number == code)
        })
}

/// Reflect an accepted action in the local list.
///
/// An item in the receipt replaces the local copy; otherwise the scanned item
/// gets the action's resulting status. Returns whether anything changed.
pub fn reconcile(
    items: &mut [InventoryItem],
    code: &str,
    action: ItemAction,
    receipt: &ActionReceipt,
) -> bool {
    if let ActionReceipt::Item(updated) = receipt
        && let Some(local) = items.iter_mut().find(|item| item.id == updated.id)
    {
        *local = updated.clone();
        return true;
    }
    let Some(id) = resolve_scanned(items, code).map(|item| item.id) else {
        return false;
    };
    match items.iter_mut().find(|item| item.id == id) {
        Some(item) => {
            item.status = action.resulting_status();
            true
        }
        None => false,
    }
}

const SLIP_RULE: &str = "--------------------------------";

/// Printable record of the items a user currently holds.
///
/// Only items in use are listed, numbered in list order, each with a
/// checkbox for the issuing clerk.
pub struct TransactionSlip<'a, Tz: TimeZone> {
    user: Option<&'a UserProfile>,
    withdrawn: Vec<&'a InventoryItem>,
    issued_at: DateTime<Tz>,
}

impl<'a, Tz: TimeZone> TransactionSlip<'a, Tz> {
    pub fn new(
        user: Option<&'a UserProfile>,
        items: &'a [InventoryItem],
        issued_at: DateTime<Tz>,
    ) -> Self {
        Self {
            user,
            withdrawn: items
                .iter()
                .filter(|item| item.status == ItemStatus::InUse)
                .collect(),
            issued_at,
        }
    }

    pub fn withdrawn(&self) -> &[&'a InventoryItem] {
        &self.withdrawn
    }
}

impl<Tz: TimeZone> fmt::Display for TransactionSlip<'_, Tz>
where
    Tz::Offset: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_dash(value: Option<&str>) -> &str {
            value.filter(|v| !v.is_empty()).unwrap_or("-")
        }

        writeln!(f, "Transaction Slip")?;
        writeln!(f)?;
        writeln!(f, "Date: {}", self.issued_at.format("%Y-%m-%d"))?;
        writeln!(f, "Time: {}", self.issued_at.format("%H:%M:%S"))?;
        writeln!(f)?;

        writeln!(f, "Military Personnel Details:")?;
        match self.user {
            Some(user) => {
                writeln!(f, "Full Name: {}", user.display_name())?;
                writeln!(f, "Rank: {}", or_dash(user.rank.as_deref()))?;
                writeln!(f, "Unit: {}", or_dash(user.unit.as_deref()))?;
                writeln!(f, "ID Number: {}", or_dash(user.id_code.as_deref()))?;
            }
            None => writeln!(f, "User details not available.")?,
        }
        writeln!(f, "{SLIP_RULE}")?;

        writeln!(f, "Withdrawn Items:")?;
        if self.withdrawn.is_empty() {
            writeln!(f, "No withdrawn items.")?;
        }
        for (n, item) in self.withdrawn.iter().enumerate() {
            let category = match item.category.trim() {
                "" => UNCATEGORIZED,
                category => category,
            };
            writeln!(
                f,
                "{}. {} ({}) - SN: {}  [_]",
                n + 1,
                item.name,
                category,
                or_dash(Some(item.serial_number.as_str()))
            )?;
        }
        writeln!(f, "{SLIP_RULE}")?;
        writeln!(f)?;
        writeln!(f, "Signature: _________________________")?;
        write!(f, "Thank You!")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn item(id: i64, name: &str, category: &str, status: ItemStatus) -> InventoryItem {
        InventoryItem {
            id,
            name: name.into(),
            category: category.into(),
            serial_number: format!("SN-{id}"),
            status,
            qr_string: Some(format!("QR-{id}")),
        }
    }

    fn items() -> Vec<InventoryItem> {
        vec![
            item(1, "M4 Carbine", "Weapons", ItemStatus::Available),
            item(2, "PRC-152 Radio", "Comms", ItemStatus::InUse),
            item(3, "Night Vision Goggles", "Optics", ItemStatus::Available),
            item(4, "Field Radio", "Comms", ItemStatus::Available),
            item(5, "Tarp", "", ItemStatus::Unknown),
        ]
    }

    #[test]
    fn filter_by_status_and_category() {
        let items = items();
        let filter = InventoryFilter {
            status: Some(ItemStatus::Available),
            category: Some("comms".into()),
            search: None,
        };
        let ids: Vec<i64> = filter.apply(&items).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![4]);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let items = items();
        let by_name = InventoryFilter {
            search: Some("RADIO".into()),
            ..Default::default()
        };
        assert_eq!(by_name.apply(&items).len(), 2);

        let by_serial = InventoryFilter {
            search: Some("sn-3".into()),
            ..Default::default()
        };
        assert_eq!(by_serial.apply(&items)[0].id, 3);

        let blank = InventoryFilter {
            search: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(blank.apply(&items).len(), 5);
    }

    #[test]
    fn grouping_sorts_categories_and_labels_blank() {
        let items = items();
        let groups = group_by_category(&items);
        let keys: Vec<&str> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["Comms", "Optics", UNCATEGORIZED, "Weapons"]);
        assert_eq!(groups["Comms"].len(), 2);
    }

    #[test]
    fn summary_counts_statuses() {
        assert_eq!(
            summarize(&items()),
            Summary {
                total: 5,
                available: 3,
                in_use: 1
            }
        );
    }

    #[test]
    fn scanned_code_resolution_order() {
        let items = items();
        assert_eq!(resolve_scanned(&items, "QR-2").map(|i| i.id), Some(2));
        assert_eq!(resolve_scanned(&items, " 3 ").map(|i| i.id), Some(3));
        assert_eq!(resolve_scanned(&items, "SN-4").map(|i| i.id), Some(4));
        assert!(resolve_scanned(&items, "nope").is_none());
    }

    #[test]
    fn reconcile_applies_status_locally() {
        let mut items = items();
        let receipt = ActionReceipt::Status {
            status: Some("ok".into()),
            message: None,
        };
        assert!(reconcile(&mut items, "QR-1", ItemAction::Withdraw, &receipt));
        assert_eq!(items[0].status, ItemStatus::InUse);
        assert!(!reconcile(&mut items, "missing", ItemAction::Return, &receipt));
    }

    #[test]
    fn reconcile_prefers_backend_item() {
        let mut items = items();
        let mut updated = items[1].clone();
        updated.status = ItemStatus::Available;
        updated.name = "PRC-152A Radio".into();
        assert!(reconcile(
            &mut items,
            "QR-2",
            ItemAction::Return,
            &ActionReceipt::Item(updated.clone())
        ));
        assert_eq!(items[1], updated);
    }

    fn soldier() -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "username": "jdoe",
            "full_name": "John Doe",
            "rank": "Sergeant",
            "unit": "1st Signal Battalion",
            "id_code": "ID-KNOWN"
        }))
        .unwrap()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap()
    }

    #[test]
    fn slip_lists_only_withdrawn_items() {
        let mut items = items();
        items[0].status = ItemStatus::InUse;
        let user = soldier();
        let slip = TransactionSlip::new(Some(&user), &items, noon());

        assert_eq!(slip.withdrawn().len(), 2);
        let text = slip.to_string();
        assert!(text.starts_with("Transaction Slip\n"));
        assert!(text.contains("Date: 2024-05-01\nTime: 12:30:05\n"));
        assert!(text.contains("Full Name: John Doe\n"));
        assert!(text.contains("Rank: Sergeant\n"));
        assert!(text.contains("Unit: 1st Signal Battalion\n"));
        assert!(text.contains("ID Number: ID-KNOWN\n"));
        assert!(text.contains("1. M4 Carbine (Weapons) - SN: SN-1  [_]\n"));
        assert!(text.contains("2. PRC-152 Radio (Comms) - SN: SN-2  [_]\n"));
        assert!(!text.contains("Night Vision"));
        assert!(text.contains("Signature: ____"));
    }

    #[test]
    fn slip_without_user_or_withdrawn_items() {
        let items: Vec<InventoryItem> = items()
            .into_iter()
            .filter(|item| item.status != ItemStatus::InUse)
            .collect();
        let text = TransactionSlip::new(None, &items, noon()).to_string();

        assert!(text.contains("User details not available.\n"));
        assert!(text.contains("Withdrawn Items:\nNo withdrawn items.\n"));
        assert!(!text.contains("Full Name:"));
    }

    #[test]
    fn slip_fills_missing_profile_fields() {
        let user: UserProfile =
            serde_json::from_value(serde_json::json!({"id": 7, "username": "rsmith"})).unwrap();
        let text = TransactionSlip::new(Some(&user), &[], noon()).to_string();

        assert!(text.contains("Full Name: rsmith\nRank: -\nUnit: -\nID Number: -\n"));
    }
}
