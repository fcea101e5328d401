use std::path::PathBuf;

use armory_core::models::ItemStatus;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "armory", about = "Armory personnel and inventory client")]
pub struct Cli {
    /// Backend origin, overriding `ARMORY_BACKEND_URL`.
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version.
    Version,

    /// Show who is signed in and where the session is stored.
    Status,

    /// Sign in with username and password.
    Login {
        username: String,

        /// Password; read from stdin when omitted.
        #[arg(long, env = "ARMORY_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Keep the session after this terminal closes.
        #[arg(long)]
        remember: bool,
    },

    /// Sign in with a personnel QR badge.
    ///
    /// Without `--code` the badge is read from stdin, one code per line, the
    /// way a keyboard-wedge scanner types it.
    QrLogin {
        #[arg(long)]
        code: Option<String>,

        #[arg(long)]
        remember: bool,
    },

    /// Create an account.
    Register(RegisterArgs),

    /// Sign out everywhere on this machine.
    Logout,

    /// Show the signed-in user's profile.
    Profile {
        /// Fetch the profile from the backend instead of the cached copy.
        #[arg(long)]
        refresh: bool,
    },

    /// Upload a profile photo.
    UploadPhoto { path: PathBuf },

    /// List inventory items.
    Inventory(InventoryArgs),

    /// List recent withdraw and return transactions.
    Logs,

    /// Print a transaction slip of the items currently withdrawn.
    Slip,

    /// Withdraw an item. Scans the item code from stdin when none is given.
    Withdraw { item: Option<String> },

    /// Return an item. Scans the item code from stdin when none is given.
    Return { item: Option<String> },
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    pub username: String,

    #[arg(long, env = "ARMORY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long)]
    pub full_name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub rank: Option<String>,

    #[arg(long)]
    pub unit: Option<String>,

    #[arg(long)]
    pub phone_number: Option<String>,

    /// Birth date as `YYYY-MM-DD`.
    #[arg(long)]
    pub birth_date: Option<String>,

    #[arg(long)]
    pub role: Option<String>,

    /// Badge code; a fresh one is generated when omitted.
    #[arg(long)]
    pub id_code: Option<String>,

    #[arg(long)]
    pub remember: bool,
}

#[derive(Args, Debug, Default)]
pub struct InventoryArgs {
    #[arg(long, value_enum)]
    pub status: Option<StatusFilter>,

    #[arg(long)]
    pub category: Option<String>,

    /// Match name, serial number or category.
    #[arg(long)]
    pub search: Option<String>,

    /// Group items by category.
    #[arg(long)]
    pub group: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    Available,
    InUse,
}

impl From<StatusFilter> for ItemStatus {
    fn from(status: StatusFilter) -> Self {
        match status {
            StatusFilter::Available => ItemStatus::Available,
            StatusFilter::InUse => ItemStatus::InUse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn withdraw_without_item_scans() {
        let cli = Cli::parse_from(["armory", "withdraw"]);
        assert!(matches!(cli.command, Commands::Withdraw { item: None }));

        let cli = Cli::parse_from(["armory", "return", "QR-7"]);
        assert!(matches!(cli.command, Commands::Return { item: Some(ref i) } if i == "QR-7"));
    }

    #[test]
    fn inventory_filters_parse() {
        let cli = Cli::parse_from([
            "armory",
            "inventory",
            "--status",
            "in-use",
            "--category",
            "Comms",
            "--group",
        ]);
        let Commands::Inventory(args) = cli.command else {
            panic!("expected inventory command");
        };
        assert_eq!(args.status, Some(StatusFilter::InUse));
        assert_eq!(args.category.as_deref(), Some("Comms"));
        assert!(args.group);
    }

    #[test]
    fn backend_url_is_global() {
        let cli = Cli::parse_from(["armory", "logs", "--backend-url", "http://armory.local"]);
        assert_eq!(cli.backend_url.as_deref(), Some("http://armory.local"));
    }
}
