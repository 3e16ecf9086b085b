mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "herald", about = "Human-confirmed WhatsApp broadcast scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler, confirmation gate, and control surface
    Serve {
        /// Config file path (defaults to ~/.herald/config.json5)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port for the control surface (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Write a default config file to ~/.herald/config.json5
    Init,
    /// Show the resolved configuration
    Health,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve::run(config, port))?;
        }
        Commands::Init => {
            herald_config::save_config(&herald_config::HeraldConfig::default())?;
            println!(
                "Wrote default config to {}",
                herald_config::config_file_path()?.display()
            );
        }
        Commands::Health => {
            let config = herald_config::load_config()?;
            println!("herald configuration");
            println!("  gateway: {}:{}", config.gateway.host, config.gateway.port);
            println!("  bridge: {}", config.bridge.base_url);
            println!(
                "  approver: {}",
                config.broadcast.approver.as_deref().unwrap_or("(unset)")
            );
            println!("  schedule offset: {}", config.broadcast.utc_offset);
            println!("  data dir: {}", config.data_dir()?.display());
        }
    }

    Ok(())
}
