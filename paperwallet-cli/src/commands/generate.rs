use clap::Args;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use dialoguer::{Confirm, Select};
use paperwallet_core::qr::render_terminal;
use paperwallet_core::session::{Clipboard, CopyButton};
use paperwallet_core::{
    Batch, FieldId, FieldKind, GenerationRequest, PaperWalletError, Result, Session,
};
use std::collections::HashMap;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Args)]
pub struct GenerateArgs {
    /// Number of wallets to generate (1-20, empty for 1)
    #[arg(short, long)]
    pub count: Option<String>,

    /// Denomination printed on each card, in satoshis
    #[arg(short, long)]
    pub satoshis: Option<String>,

    /// Wallet template image (PNG or JPEG)
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Directory for the card and preview PNGs
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Open the print page once generated
    #[arg(short, long)]
    pub print: bool,

    /// Show secrets without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Skip the interactive copy/print menu
    #[arg(long)]
    pub no_menu: bool,
}

pub async fn handle_generate_command(args: GenerateArgs, session: &Session, out_dir: &Path) -> Result<()> {
    let request = GenerationRequest::from_inputs(
        args.count.as_deref().unwrap_or_default(),
        args.satoshis.as_deref().unwrap_or_default(),
    )?;

    if request.count == 1 {
        println!("Generating wallet...");
    } else {
        println!("Generating {} wallets...", request.count);
    }

    let batch = session.generate(request).await.map_err(|e| {
        tracing::error!("Generation failed: {:?}", e);
        e
    })?;

    let show_secrets = args.yes
        || Confirm::new()
            .with_prompt("Private keys and mnemonics will be shown on screen. Continue?")
            .default(true)
            .interact()
            .map_err(|e| PaperWalletError::dialog(e.to_string()))?;

    print_batch(&batch, show_secrets)?;
    save_images(&batch, out_dir)?;

    if args.print {
        open_print_page(session)?;
    }

    if !args.no_menu && std::io::stdin().is_terminal() {
        action_menu(session, &batch)?;
    }

    Ok(())
}

fn print_batch(batch: &Batch, show_secrets: bool) -> Result<()> {
    println!(
        "Batch {} generated at {} ({:?})",
        batch.id,
        batch.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        batch.network
    );

    for section in &batch.sections {
        let wallet = &section.wallet;
        println!();
        println!("{}", section.title);

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Field", "Value"]);
        table.add_row(vec![FieldKind::Address.label(), wallet.address.as_str()]);
        if show_secrets {
            table.add_row(vec![FieldKind::PrivateKey.label(), wallet.private_key.as_str()]);
            table.add_row(vec![FieldKind::Mnemonic.label(), wallet.mnemonic.as_str()]);
        }
        println!("{table}");

        println!("{}", render_terminal(&wallet.address)?);
    }

    if show_secrets {
        println!();
        println!("IMPORTANT: Anyone with the private key or mnemonic can spend these funds.");
    }
    Ok(())
}

fn save_images(batch: &Batch, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;

    for (i, section) in batch.sections.iter().enumerate() {
        let path = out_dir.join(format!("wallet-{}.png", i + 1));
        std::fs::write(&path, &section.card.png)?;
        tracing::debug!("Saved {}", path.display());
    }

    let preview = out_dir.join("preview.png");
    std::fs::write(&preview, &batch.preview.image.png)?;

    println!();
    println!("Saved {} card(s) and {}", batch.len(), preview.display());
    println!("{}", batch.preview_caption());
    Ok(())
}

/// Writes the print page to a temporary file and opens it in the browser.
/// The file is removed once the user is done.
fn open_print_page(session: &Session) -> Result<()> {
    let document = session.print_document()?;

    let mut file = tempfile::Builder::new()
        .prefix("paperwallet-print-")
        .suffix(".html")
        .tempfile()?;
    file.write_all(document.to_html().as_bytes())?;
    file.flush()?;

    open::that(file.path()).map_err(|e| {
        tracing::warn!("Failed to open print page: {}", e);
        PaperWalletError::print("Please allow popups to print")
    })?;

    println!("Opened print page with {} page(s).", document.page_count());
    Confirm::new()
        .with_prompt("Done printing?")
        .default(true)
        .interact()
        .map_err(|e| PaperWalletError::dialog(e.to_string()))?;

    drop(file);
    Ok(())
}

enum MenuAction {
    Copy(FieldId),
    Print,
    Quit,
}

fn action_menu(session: &Session, batch: &Batch) -> Result<()> {
    let mut clipboard = ArboardClipboard::default();
    let mut buttons: HashMap<FieldId, CopyButton> = HashMap::new();

    loop {
        let now = Instant::now();
        let mut actions = Vec::new();
        let mut items = Vec::new();

        for field in batch.fields() {
            let label = buttons
                .get(&field)
                .map(|b| b.label_at(now).to_string())
                .unwrap_or_else(|| CopyButton::default().label_at(now).to_string());
            items.push(format!(
                "[{}] {} (wallet {})",
                label,
                field.kind.label(),
                field.wallet + 1
            ));
            actions.push(MenuAction::Copy(field));
        }
        items.push("Print".to_string());
        actions.push(MenuAction::Print);
        items.push("Quit".to_string());
        actions.push(MenuAction::Quit);

        let choice = Select::new()
            .with_prompt("Action")
            .items(&items)
            .default(0)
            .interact()
            .map_err(|e| PaperWalletError::dialog(e.to_string()))?;

        match &actions[choice] {
            MenuAction::Copy(field) => {
                let button = buttons.entry(*field).or_default();
                match session.copy_field(*field, button, &mut clipboard) {
                    Ok(()) => println!("Copied {} to clipboard", field),
                    Err(e) => eprintln!("{}", e),
                }
            }
            MenuAction::Print => {
                if let Err(e) = open_print_page(session) {
                    eprintln!("Error: {}", e);
                }
            }
            MenuAction::Quit => return Ok(()),
        }
    }
}

/// System clipboard, opened on first use.
#[derive(Default)]
struct ArboardClipboard {
    inner: Option<arboard::Clipboard>,
}

impl Clipboard for ArboardClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| PaperWalletError::clipboard(e.to_string()))?;
            self.inner = Some(clipboard);
        }
        match self.inner.as_mut() {
            Some(clipboard) => clipboard
                .set_text(text.to_string())
                .map_err(|e| PaperWalletError::clipboard(e.to_string())),
            None => Err(PaperWalletError::clipboard("Clipboard unavailable")),
        }
    }
}
