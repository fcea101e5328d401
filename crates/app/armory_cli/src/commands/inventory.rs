//! Inventory listing and withdraw/return commands.

use armory_core::inventory::{self, InventoryFilter, Summary, TransactionSlip};
use armory_core::models::{ActionReceipt, InventoryItem, ItemAction};
use armory_core::scan::INVENTORY_REGION;

use super::require_session;
use crate::Result;
use crate::cli::InventoryArgs;
use crate::context::{Context, teardown_on_interrupt};

pub async fn list(ctx: &Context, args: InventoryArgs) -> Result<()> {
    require_session(ctx)?;
    let items = inventory::list_items(&ctx.client).await?;
    let filter = InventoryFilter {
        status: args.status.map(Into::into),
        category: args.category,
        search: args.search,
    };
    let shown = filter.apply(&items);

    if args.group {
        for (category, group) in inventory::group_by_category(shown.iter().copied()) {
            println!("{category} ({})", group.len());
            for item in group {
                println!("  {}", item_row(item));
            }
        }
    } else {
        for item in &shown {
            println!("{}", item_row(item));
        }
    }
    println!("{}", summary_line(&inventory::summarize(shown.iter().copied())));
    Ok(())
}

fn item_row(item: &InventoryItem) -> String {
    format!(
        "{:>5}  {:<28}  {:<14}  {:<14}  {}",
        item.id, item.name, item.category, item.serial_number, item.status
    )
}

fn summary_line(summary: &Summary) -> String {
    format!(
        "{} items, {} available, {} in use",
        summary.total, summary.available, summary.in_use
    )
}

pub async fn slip(ctx: &Context) -> Result<()> {
    require_session(ctx)?;
    let items = inventory::list_items(&ctx.client).await?;
    let user = ctx.sessions().user()?;
    println!(
        "{}",
        TransactionSlip::new(user.as_ref(), &items, chrono::Local::now())
    );
    Ok(())
}

pub async fn logs(ctx: &Context) -> Result<()> {
    require_session(ctx)?;
    for entry in inventory::list_logs(&ctx.client).await? {
        let when = entry
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{when:<16}  {:<8}  {:<28}  {}",
            entry.action,
            entry.item_name.as_deref().unwrap_or("-"),
            entry.user.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub async fn act(ctx: &Context, action: ItemAction, item: Option<&str>) -> Result<()> {
    require_session(ctx)?;
    let (code, receipt) = match item {
        Some(item) => (
            item.to_string(),
            inventory::perform(&ctx.client, action, item).await?,
        ),
        None => {
            let mut scanner = ctx.stdin_scanner(INVENTORY_REGION);
            let teardown = teardown_on_interrupt();
            log::info!("Scan the item's QR code.");
            inventory::scan_and_perform(&ctx.client, &mut scanner, &teardown, action).await?
        }
    };
    println!("{}", confirmation(&code, action, &receipt));
    Ok(())
}

fn confirmation(code: &str, action: ItemAction, receipt: &ActionReceipt) -> String {
    match receipt {
        ActionReceipt::Item(item) => {
            format!("{} ({}) {}, now {}", item.name, code, action.past_tense(), item.status)
        }
        ActionReceipt::Status {
            message: Some(message),
            ..
        } => format!("Item {code} {}: {message}", action.past_tense()),
        ActionReceipt::Status { .. } => format!("Item {code} {}.", action.past_tense()),
    }
}
