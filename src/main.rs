use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use ferroftpd::config::Config;
use ferroftpd::core_auth::hash_password;
use ferroftpd::core_cli::Cli;
use ferroftpd::server;
use log::info;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    if let Some(password) = &args.hash_password {
        println!("{}", hash_password(password).context("Failed to hash password")?);
        return Ok(());
    }

    // Initialize the logger with a custom format
    let default_level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();

    let config_path = args.config_path();
    let config = Config::load_from_file(config_path)
        .with_context(|| format!("Failed to load configuration file: {}", config_path))?;
    info!("Configuration loaded from {}", config_path);

    // Run the FTP server
    server::run(config).await?;

    Ok(())
}
