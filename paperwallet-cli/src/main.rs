mod commands;
mod config;

use clap::{Parser, Subcommand};
use paperwallet_core::{GeneratorConfig, PaperWalletError, Session};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "paperwallet")]
#[command(about = "Bitcoin paper wallet generator")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/paperwallet/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bitcoin network (bitcoin, testnet, signet, regtest)
    #[arg(short, long, global = true)]
    network: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate paper wallets
    Generate(commands::GenerateArgs),

    /// Fold a web build into a single standalone index.html
    Inline(commands::InlineArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::CliConfig::load(cli.config.as_deref())?;

    // Initialize logging
    let log_level = if cli.verbose || config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "paperwallet={},paperwallet_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match cli.command {
        Commands::Generate(args) => {
            let network = cli.network.as_deref().unwrap_or(config.default_network.as_str());
            let out_dir = args.out.clone().unwrap_or_else(|| config.output_dir.clone());
            let template = args.template.clone().or_else(|| config.template.clone());

            match commands::parse_network(network)
                .map(|network| GeneratorConfig::new(network).with_template(template))
                .and_then(|generator| Session::new(&generator))
            {
                Ok(session) => commands::handle_generate_command(args, &session, &out_dir).await,
                Err(e) => Err(e),
            }
        }
        Commands::Inline(args) => commands::handle_inline_command(args).await,
    };

    if let Err(e) = result {
        match e {
            e if e.is_user_input() => {
                eprintln!("{}", e);
            }
            PaperWalletError::Derivation(_)
            | PaperWalletError::QrEncode(_)
            | PaperWalletError::Compose(_)
            | PaperWalletError::Image(_) => {
                eprintln!("Error generating wallet: {}", e);
            }
            PaperWalletError::NoWallets => {
                eprintln!("{}", e);
            }
            PaperWalletError::MissingInput { path } => {
                eprintln!("Error: Build file not found: {}", path.display());
                eprintln!("Run the web build first (npm run build)");
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
