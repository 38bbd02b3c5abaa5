use anyhow::Result;
use clap::Parser;
use token_client::server;
use token_client::utils::config_loader;
use token_client::utils::logging;
use token_client::utils::logging::LogLevel;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "token-client.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// Fetch one token, print it as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, set up logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Create token client
    // -------------------------------

    let client = service_config
        .client
        .builder(&service_config.settings)?
        .build()?;
    info!(
        endpoint = %client.config().endpoint(),
        client_id = client.config().client_id(),
        "token client ready"
    );

    // -------------------------------
    // 3. One-shot mode
    // -------------------------------

    if args.once {
        let token = client
            .get_valid_token_for(service_config.settings.min_validity())
            .await
            .inspect_err(|e| error!(error = %e, "could not obtain token"))?;
        println!("{}", serde_json::to_string_pretty(token.as_ref())?);
        return Ok(());
    }

    // -------------------------------
    // 4. Warm the cache, then serve /token and metrics
    // -------------------------------

    if let Err(e) = client.get_valid_token().await {
        error!(error = %e, "initial token exchange failed, will retry on first request");
    }

    info!("Service starting...");
    server::server::start(&service_config.settings, client).await
}
