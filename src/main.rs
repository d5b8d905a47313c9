//! Config Bootstrap CLI
//!
//! Resolves the startup configuration exactly once, from the source selected
//! by `CONFIG_URL` / `PORT`, and prints a redacted summary. Intended for
//! verifying a deployment's configuration before the service proper starts,
//! and as the reference wiring for embedding the resolver in a server binary.

use anyhow::Result;
use clap::Parser;
use config_bootstrap::config::{CONFIG_URL_VAR, PORT_VAR, Resolver, select_source};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "config-bootstrap",
    version,
    about = "Resolve and print the service startup configuration"
)]
struct Cli {
    /// Local config file used when neither CONFIG_URL nor PORT is set.
    #[arg(long, default_value = "config.yaml")]
    config_file: std::path::PathBuf,

    /// Diagnostic log level for the resolver itself.
    #[arg(long, default_value = "info")]
    log_level: Level,
}

/// Show enough of a secret to confirm it is set without echoing it.
fn redact(value: &str) -> String {
    if value.is_empty() {
        "(unset)".to_string()
    } else {
        let prefix: String = value.chars().take(12).collect();
        format!("{prefix}\u{2026} ({} chars)", value.chars().count())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_url = std::env::var(CONFIG_URL_VAR).ok();
    let port = std::env::var(PORT_VAR).ok();
    let source = select_source(config_url.as_deref(), port.as_deref());
    info!(%source, "resolving configuration");

    let resolver = Resolver::new();
    let config = resolver.resolve(&cli.config_file).await?;

    println!("source:             {source}");
    println!("port:               {}", config.port);
    println!("console_reporting:  {}", config.console_reporting);
    println!("log_level:          {}", config.log_level);
    println!(
        "connection_string:  {}",
        redact(&config.iothub_connection_string)
    );
    match &config.auth {
        Some(auth) => {
            println!("auth.login_url:     {}", auth.login_url);
            println!("auth.mongo_uri:     {}", redact(&auth.mongo_uri));
            println!("auth.session_secret: {}", redact(&auth.session_secret));
        }
        None => println!("auth:               (absent)"),
    }

    Ok(())
}
