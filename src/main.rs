//! assistant-bridge - relays chat messages to an OpenAI assistant and
//! forwards its `submit_order` tool calls to the order webhook.
//!
//! `--serve` runs the HTTP endpoint; without it an interactive prompt starts.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use assistant_bridge::config::{BridgeConfig, ConfigOverrides, FileConfig};
use assistant_bridge::repl;
use assistant_bridge::run_loop::AssistantRunLoop;
use assistant_bridge::server;

#[derive(Parser)]
#[command(name = "assistant-bridge", version)]
#[command(about = "Bridge between an OpenAI assistant and an order webhook")]
struct Args {
    /// Run the HTTP endpoint instead of the interactive prompt
    #[arg(long)]
    serve: bool,

    /// Print the tool definitions to configure on the assistant, then exit
    #[arg(long, conflicts_with = "serve")]
    print_tools: bool,

    /// Address to bind in serve mode (default: 0.0.0.0)
    #[arg(long, env = "BRIDGE_HOST")]
    host: Option<String>,

    /// Port to bind in serve mode (default: 5000)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Order webhook URL
    #[arg(long, env = "GOOGLE_APPS_SCRIPT_WEB_APP_URL")]
    webhook_url: Option<String>,

    /// Assistant to run on each thread
    #[arg(long, env = "ASSISTANT_ID")]
    assistant_id: Option<String>,

    /// Assistant API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    api_base: Option<String>,

    /// Config file (default: ~/.assistant-bridge/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            openai_api_key: self.openai_api_key.clone(),
            webhook_url: self.webhook_url.clone(),
            assistant_id: self.assistant_id.clone(),
            api_base: self.api_base.clone(),
            host: self.host.clone(),
            port: self.port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env before clap so its values feed the `env` fallbacks
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // The prompt shares the terminal with the logs, keep it quiet by default
    let default_level = if args.serve { "info" } else { "warn" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let file = match &args.config {
        Some(path) => FileConfig::load_from(path)?,
        None => FileConfig::load_default(),
    };

    let config = match BridgeConfig::resolve(args.overrides(), file) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration: {:?}", config);

    let run_loop = Arc::new(AssistantRunLoop::from_config(&config)?);

    if args.print_tools {
        let definitions = run_loop.tools().definitions();
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    if args.serve {
        server::run(&config, run_loop).await
    } else {
        repl::run(run_loop).await
    }
}
