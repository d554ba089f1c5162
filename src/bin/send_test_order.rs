//! Posts a sample order to the order webhook and prints what comes back.
//!
//! Manual check that the webhook is deployed and reachable, without going
//! through the assistant.

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Url;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt};

use assistant_bridge::assistant::build_http_client;
use assistant_bridge::config::DEFAULT_HTTP_TIMEOUT_SECS;
use assistant_bridge::repl::colors;
use assistant_bridge::tools::{OrderRequest, SubmitOrder, ToolHandler};

#[derive(Parser)]
#[command(name = "send-test-order")]
#[command(about = "Send a sample order to the order webhook")]
struct Args {
    /// Order webhook URL
    #[arg(long, env = "GOOGLE_APPS_SCRIPT_WEB_APP_URL")]
    webhook_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let webhook_url = Url::parse(&args.webhook_url)
        .with_context(|| format!("invalid webhook URL: {}", args.webhook_url))?;

    let client = build_http_client(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))?;
    let handler = SubmitOrder::new(client, webhook_url);

    let order = OrderRequest::sample();
    println!("Sending: {}", serde_json::to_string_pretty(&order)?);

    match handler.call(serde_json::to_value(&order)?).await {
        Ok(response) => {
            println!("Response: {}", serde_json::to_string_pretty(&response)?);
            if response.get("success").and_then(|v| v.as_bool()) == Some(true) {
                println!("{}", colors::success("Order accepted"));
            } else {
                println!("{}", colors::warning("Webhook did not report success"));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", colors::error(&format!("Error sending order: {e}")));
            std::process::exit(1);
        }
    }
}
