//! Queue command handlers.
//!
//! These run against the API of a `workdl serve` process.

use std::time::Duration;

use anyhow::Result;
use workdl_core::DownloadStatus;

use crate::commands::QueueCommand;
use crate::presentation::{print_separator, status_label};
use crate::remote::{ApiClient, QueueView};

const FOLLOW_INTERVAL: Duration = Duration::from_millis(500);

pub async fn execute(server: &str, command: QueueCommand) -> Result<()> {
    let api = ApiClient::new(server)?;
    match command {
        QueueCommand::Add { items } => add(&api, &items).await,
        QueueCommand::List => list(&api).await,
        QueueCommand::Clear => {
            let view = api.clear_queue().await?;
            println!("Cleared {} item(s) from the queue.", view.cleared);
            Ok(())
        }
        QueueCommand::Remove { item } => {
            let view = api.remove(&item).await?;
            if view.removed {
                println!("Removed {item} from the queue.");
            } else {
                println!("{item} was not queued.");
            }
            println!("{} item(s) pending.", view.queue.count);
            Ok(())
        }
        QueueCommand::Run { follow } => run(&api, follow).await,
    }
}

async fn add(api: &ApiClient, items: &[String]) -> Result<()> {
    let view = api.enqueue(items).await?;
    for id in &view.added {
        println!("+ {id}");
    }
    if !view.duplicates.is_empty() {
        println!("Skipped duplicates: {}", view.duplicates.join(", "));
    }
    println!(
        "Added {} item(s); {} pending.",
        view.added.len(),
        view.queue.count
    );
    Ok(())
}

async fn list(api: &ApiClient) -> Result<()> {
    let view = api.queue().await?;
    print_queue(&view);
    Ok(())
}

fn print_queue(view: &QueueView) {
    if let Some(id) = &view.processing {
        println!("Processing: {id}");
    }
    if view.items.is_empty() {
        println!("Queue is empty.");
        return;
    }
    println!("{:<4} Item", "#");
    print_separator(24);
    for (index, id) in view.items.iter().enumerate() {
        println!("{:<4} {id}", index + 1);
    }
}

async fn run(api: &ApiClient, follow: bool) -> Result<()> {
    let ack = api.process().await?;
    println!(
        "Processing {} item(s){}.",
        ack.pending,
        if ack.continuous {
            ""
        } else {
            " (one item per run: continuous download is off)"
        }
    );
    if !follow {
        return Ok(());
    }

    let mut last: Option<(u64, DownloadStatus)> = None;
    let mut interval = tokio::time::interval(FOLLOW_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            biased;
            _ = &mut ctrl_c => {
                let stopped = api.stop().await?;
                println!("\n{}", if stopped { "Stop requested." } else { "Nothing to stop." });
                return Ok(());
            }
            _ = interval.tick() => {}
        }

        let status = api.status().await?;
        if let Some(id) = &status.item_id {
            let key = (status.generation, status.status);
            if last != Some(key) {
                last = Some(key);
                match &status.message {
                    Some(message) if status.status.is_terminal() => {
                        println!("{id}: {} ({message})", status_label(status.status));
                    }
                    _ => println!("{id}: {}", status_label(status.status)),
                }
            }
        }

        let queue = api.queue().await?;
        if queue.count == 0 && queue.processing.is_none() && !status.active {
            println!("Queue drained.");
            return Ok(());
        }
    }
}
