// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use armory_core::models::ItemAction;
use clap::Parser;
use cli::{Cli, Commands};
use context::Context;

mod cli;
mod commands;
mod context;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    if let Commands::Version = args.command {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = Context::load(args.backend_url.as_deref())?;
    match args.command {
        Commands::Status => commands::session::status(&ctx),
        Commands::Login {
            username,
            password,
            remember,
        } => commands::session::login(&ctx, &username, password, remember).await,
        Commands::QrLogin { code, remember } => {
            commands::session::qr_login(&ctx, code.as_deref(), remember).await
        }
        Commands::Register(register) => commands::session::register(&ctx, register).await,
        Commands::Logout => commands::session::logout(&ctx),
        Commands::Profile { refresh } => commands::session::profile(&ctx, refresh).await,
        Commands::UploadPhoto { path } => commands::session::upload_photo(&ctx, &path).await,
        Commands::Inventory(filter) => commands::inventory::list(&ctx, filter).await,
        Commands::Logs => commands::inventory::logs(&ctx).await,
        Commands::Slip => commands::inventory::slip(&ctx).await,
        Commands::Withdraw { item } => {
            commands::inventory::act(&ctx, ItemAction::Withdraw, item.as_deref()).await
        }
        Commands::Return { item } => {
            commands::inventory::act(&ctx, ItemAction::Return, item.as_deref()).await
        }
        Commands::Version => Ok(()),
    }
}
