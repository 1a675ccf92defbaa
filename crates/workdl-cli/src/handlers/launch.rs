//! Launch command handler.

use anyhow::Result;

use crate::bootstrap::CliContext;

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let ack = ctx.engine.launch_game().await?;
    match ack.pid {
        Some(pid) => println!("Launched {} (pid {pid})", ack.executable),
        None => println!("Launched {}", ack.executable),
    }
    Ok(())
}
