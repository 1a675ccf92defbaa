//! CLI entry point - the composition root.
//!
//! Local commands build their engine through `bootstrap`; `config` touches
//! only the settings file and `queue` talks to a running server.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use workdl_cli::{Cli, Commands, bootstrap, exit_code_for, handlers};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(exit_code_for(&err));
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Serve {
            host,
            port,
            allow_origins,
        } => handlers::serve::execute(cli.config, host, port, allow_origins).await,
        Commands::Queue { server, command } => handlers::queue::execute(&server, command).await,
        Commands::Config { command } => handlers::config::execute(cli.config, command).await,
        Commands::Download { item } => {
            let ctx = bootstrap(cli.config).await?;
            handlers::download::execute(&ctx, &item).await
        }
        Commands::Library { command } => {
            let ctx = bootstrap(cli.config).await?;
            handlers::library::execute(&ctx, command).await
        }
        Commands::Launch => {
            let ctx = bootstrap(cli.config).await?;
            handlers::launch::execute(&ctx).await
        }
    }
}
