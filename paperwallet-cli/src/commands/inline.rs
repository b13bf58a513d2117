use clap::Args;
use comfy_table::{presets::UTF8_FULL, Table};
use paperwallet_core::{inline_bundle, Bundler, InlineOutcome, Result};
use std::path::PathBuf;

#[derive(Args)]
pub struct InlineArgs {
    /// Bundler that produced the build (vite, webpack)
    #[arg(short, long, default_value = "vite")]
    pub bundler: String,

    /// Build output directory
    #[arg(short, long, default_value = "dist")]
    pub dist: PathBuf,
}

pub async fn handle_inline_command(args: InlineArgs) -> Result<()> {
    let bundler: Bundler = args.bundler.parse()?;
    let dist = args.dist;

    let outcome = tokio::task::spawn_blocking(move || inline_bundle(bundler, &dist))
        .await
        .map_err(|e| paperwallet_core::PaperWalletError::internal(e.to_string()))??;

    match outcome {
        InlineOutcome::AlreadyInlined { output } => {
            println!("{} is already standalone. Nothing to do.", output.display());
        }
        InlineOutcome::Inlined(report) => {
            println!("Standalone HTML file created successfully!");

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Item", "Value"]);
            table.add_row(vec!["File".to_string(), report.output.display().to_string()]);
            table.add_row(vec![
                "Size".to_string(),
                format!(
                    "{:.2} KB ({:.2} MB)",
                    report.bytes as f64 / 1024.0,
                    report.bytes as f64 / (1024.0 * 1024.0)
                ),
            ]);
            table.add_row(vec!["SHA-256".to_string(), report.sha256.clone()]);
            table.add_row(vec!["JavaScript inlined".to_string(), yes_no(report.flags.script)]);
            table.add_row(vec!["CSS inlined".to_string(), yes_no(report.flags.stylesheet)]);
            table.add_row(vec![
                "Wallet image embedded".to_string(),
                match &report.flags.image {
                    Some(path) => format!("yes ({})", path.display()),
                    None => "no".to_string(),
                },
            ]);
            table.add_row(vec!["Offline CSP".to_string(), yes_no(report.flags.csp)]);
            println!("{table}");

            for path in &report.removed {
                println!("  Removed {}", path.display());
            }
            if report.flags.image.is_none() && bundler == Bundler::Vite {
                println!("Warning: wallet image not embedded. The page may not render its template.");
            }
            println!("The file can now be opened directly in a browser.");
        }
    }

    Ok(())
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}
