pub mod inventory;
pub mod session;

use crate::context::Context;
use crate::{Error, Result};

/// Read one line from stdin after printing `prompt` on stderr.
async fn prompt_line(ctx: &Context, prompt: &str) -> Result<String> {
    eprint!("{prompt}: ");
    ctx.read_line().await
}

/// Refuse protected commands without a session.
fn require_session(ctx: &Context) -> Result<()> {
    if armory_core::auth::admit(ctx.sessions(), ctx.client.navigator())? {
        Ok(())
    } else {
        Err(Error::Custom("Not signed in".into()))
    }
}
