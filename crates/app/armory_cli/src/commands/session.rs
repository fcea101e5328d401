//! Sign-in, registration and profile commands.

use std::path::Path;

use armory_core::auth::{self, AuthState, RegistrationForm};
use armory_core::models::{Credential, RegisterRequest, UserProfile};
use armory_core::scan::LOGIN_REGION;

use super::{prompt_line, require_session};
use crate::cli::RegisterArgs;
use crate::context::{Context, teardown_on_interrupt};
use crate::{Error, Result};

pub fn status(ctx: &Context) -> Result<()> {
    let state = AuthState::load(ctx.sessions())?;
    match (state.is_authenticated(), state.user()) {
        (true, Some(user)) => {
            let scope = ctx
                .sessions()
                .active_scope()?
                .map(|s| s.to_string())
                .unwrap_or_default();
            println!(
                "Signed in as {} ({}), {scope} session",
                user.display_name(),
                user.username
            );
        }
        (true, None) => println!("Signed in"),
        (false, _) => println!("Not signed in"),
    }
    println!("Backend: {}", ctx.config.backend_url);
    Ok(())
}

pub async fn login(
    ctx: &Context,
    username: &str,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_line(ctx, "Password").await?,
    };
    let session = auth::login(&ctx.client, &Credential::new(username, password), remember).await?;
    println!("Welcome, {}.", session.user.display_name());
    Ok(())
}

pub async fn qr_login(ctx: &Context, code: Option<&str>, remember: bool) -> Result<()> {
    let session = match code {
        Some(code) => auth::login_with_id_code(&ctx.client, code, remember).await?,
        None => {
            let mut scanner = ctx.stdin_scanner(LOGIN_REGION);
            let teardown = teardown_on_interrupt();
            log::info!("Scan your badge.");
            auth::scan_and_login(&ctx.client, &mut scanner, &teardown, remember).await?
        }
    };
    println!("Welcome, {}.", session.user.display_name());
    Ok(())
}

pub async fn register(ctx: &Context, args: RegisterArgs) -> Result<()> {
    let (password, confirm_password) = match args.password {
        Some(p) => (p.clone(), p),
        None => (
            prompt_line(ctx, "Password").await?,
            prompt_line(ctx, "Confirm password").await?,
        ),
    };
    let form = RegistrationForm {
        details: RegisterRequest {
            username: args.username,
            password,
            email: args.email.unwrap_or_default(),
            full_name: args.full_name.unwrap_or_default(),
            rank: args.rank.unwrap_or_default(),
            unit: args.unit.unwrap_or_default(),
            phone_number: args.phone_number.unwrap_or_default(),
            birth_date: args.birth_date.unwrap_or_default(),
            role: args.role.unwrap_or_default(),
            id_code: args.id_code.unwrap_or_else(auth::generate_id_code),
        },
        confirm_password,
    };
    let session = auth::register(&ctx.client, &form, args.remember).await?;
    println!("Account created for {}.", session.user.username);
    println!("Badge code: {}", form.details.id_code);
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    auth::logout(&ctx.client)?;
    println!("Signed out.");
    Ok(())
}

pub async fn profile(ctx: &Context, refresh: bool) -> Result<()> {
    require_session(ctx)?;
    let user = if refresh {
        auth::load_profile(&ctx.client).await?
    } else {
        ctx.sessions()
            .user()?
            .ok_or_else(|| Error::Custom("No profile cached, try --refresh".into()))?
    };
    print_profile(&user);
    Ok(())
}

fn print_profile(user: &UserProfile) {
    println!("{}", user.display_name());
    let fields = [
        ("Username", Some(user.username.as_str())),
        ("Rank", user.rank.as_deref()),
        ("Unit", user.unit.as_deref()),
        ("Role", user.role.as_deref()),
        ("Email", user.email.as_deref()),
        ("Phone", user.phone_number.as_deref()),
        ("Born", user.birth_date.as_deref()),
        ("Badge", user.id_code.as_deref()),
        ("Photo", user.photo_url.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            println!("  {label:<9}{value}");
        }
    }
}

pub async fn upload_photo(ctx: &Context, path: &Path) -> Result<()> {
    require_session(ctx)?;
    let mime = photo_mime(path)
        .ok_or_else(|| Error::Custom(format!("Unsupported photo type: {}", path.display())))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".into());
    let bytes = tokio::fs::read(path).await?;
    let uploaded = auth::upload_photo(&ctx.client, &file_name, bytes, mime).await?;
    println!("Photo uploaded: {}", uploaded.photo_url);
    Ok(())
}

fn photo_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
