#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::find::SessionOptions;
use rsprobe::errors::ProbeError;
use rsprobe::types::OutputFormat;
use rsprobe::webdriver::BrowserType;
use rsprobe::EngineConfig;

const EXIT_SUCCESS: i32 = 0;

#[derive(Parser)]
#[command(name = "rsprobe")]
#[command(about = "Resolve recognition strings against a live browser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// WebDriver server URL (defaults to the browser's standard port)
    #[arg(long, global = true)]
    webdriver: Option<String>,

    /// Browser to drive
    #[arg(short, long, global = true, default_value = "firefox")]
    browser: BrowserType,

    /// Run the browser without a window
    #[arg(long, global = true, default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Config file (defaults to ~/.rsprobe/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ignore frame qualifiers and never reset to the top document
    #[arg(long, global = true)]
    bypass_frame_reset: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a recognition string on a page
    Find {
        /// URL to open
        url: String,

        /// Recognition string, e.g. "FRAMEID=f1;\;id=btnOK"
        recognition_string: String,

        /// Return every element the last segment matches
        #[arg(long)]
        all: bool,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Show how a recognition string is tokenized
    Parse {
        recognition_string: String,

        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Show the locator each segment compiles to
    Compile {
        recognition_string: String,

        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            let probe_err: ProbeError = err.into();

            // JSON on stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": probe_err.to_string(),
                "exit_code": probe_err.exit_code()
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            eprintln!("Error: {}", probe_err);
            std::process::exit(probe_err.exit_code());
        }
    }
}

async fn run() -> Result<()> {
    // Logs go to stderr so stdout stays clean JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rsprobe=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if cli.bypass_frame_reset {
        config.bypass_frame_reset = true;
    }

    match cli.command {
        Commands::Find {
            url,
            recognition_string,
            all,
            format,
        } => {
            let session = SessionOptions {
                browser: cli.browser,
                webdriver_url: cli.webdriver.or_else(|| config.webdriver_url.clone()),
                headless: cli.headless,
            };
            commands::find::handle_find(session, config, url, recognition_string, all, format)
                .await?
        }
        Commands::Parse {
            recognition_string,
            format,
        } => commands::parse::handle_parse(recognition_string, &config.grammar, format)?,
        Commands::Compile {
            recognition_string,
            format,
        } => commands::compile::handle_compile(recognition_string, &config.grammar, format)?,
    }

    Ok(())
}
