//! `reelgrab` CLI - serve the extraction API or resolve a single URL

mod cmd;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelgrab::{Config, RendererKind};

#[derive(Parser)]
#[command(name = "reelgrab")]
#[command(about = "Resolve social-media page URLs to direct, playable video URLs")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/reelgrab/config.toml if present)
    #[arg(short, long, global = true, env = "REELGRAB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Page renderer
        #[arg(short, long, value_enum)]
        renderer: Option<RendererKind>,

        /// Device profile (android, iphone, desktop)
        #[arg(short, long)]
        device: Option<String>,

        /// Directory served for non-API paths
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Resolve one page URL and print the video URL
    Extract {
        /// Instagram / Facebook page URL
        url: String,

        /// Page renderer
        #[arg(short, long, value_enum)]
        renderer: Option<RendererKind>,

        /// Device profile (android, iphone, desktop)
        #[arg(short, long)]
        device: Option<String>,

        /// Print the full API response as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reelgrab=info,tower_http=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            renderer,
            device,
            static_dir,
        } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(renderer) = renderer {
                config.renderer = renderer;
            }
            if let Some(device) = device {
                config.device = device;
            }
            if static_dir.is_some() {
                config.static_dir = static_dir;
            }
            cmd::serve::cmd_serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Extract {
            url,
            renderer,
            device,
            json,
        } => {
            if let Some(renderer) = renderer {
                config.renderer = renderer;
            }
            if let Some(device) = device {
                config.device = device;
            }
            cmd::extract::cmd_extract(config, &url, json).await
        }
    }
}
