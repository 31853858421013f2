mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "prodex-cli")]
#[command(about = "Extract product details from a single web page")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the extraction cascade and print the product record as JSON.
    Extract {
        url: String,

        /// Never escalate to the browser after a failed static fetch.
        #[arg(long)]
        static_only: bool,

        /// Run without Chromium; browser stages report failure.
        #[arg(long)]
        no_browser: bool,

        /// Print the winning stage and every attempt alongside the record.
        #[arg(long)]
        trace: bool,
    },
    /// Print the linked-data keys, itemprop values, and meta tags of a page.
    Fields {
        url: String,

        #[arg(long)]
        static_only: bool,

        #[arg(long)]
        no_browser: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = prodex_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Extract {
            url,
            static_only,
            no_browser,
            trace,
        } => {
            let options = commands::RunOptions {
                static_only,
                no_browser,
            };
            commands::run_extract(&config, &url, options, trace).await
        }
        Commands::Fields {
            url,
            static_only,
            no_browser,
        } => {
            let options = commands::RunOptions {
                static_only,
                no_browser,
            };
            commands::run_fields(&config, &url, options).await
        }
    }
}
