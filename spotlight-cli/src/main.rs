use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use spotlight_analyzer::AnalyzerClient;
use spotlight_core::{
    Action, AnalysisOutcome, CategorySelection, FileUpload, Predefined, Wizard, catalog,
    normalize_id, render_text,
};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;

mod analyze_worker;
mod config;
mod logging;
mod state;
mod wizard_tui;

use logging::{LogTarget, init_logging, verbosity_filter};

#[derive(Parser, Debug)]
#[command(
    name = "spotlight",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SPOTLIGHT_BUILD_SHA"), ")"),
    about = "Spending Spotlight: find the unexpected in your statements"
)]
struct Cli {
    /// Analyzer base URL (overrides SPOTLIGHT_ANALYZER_URL and config.toml)
    #[arg(long, global = true)]
    server: Option<String>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive three-step wizard: categories, upload, results
    Wizard,

    /// Analyze one statement without the interactive UI
    Analyze {
        /// PDF statement (max 16MB)
        #[arg(long)]
        pdf: PathBuf,

        /// Predefined category id; repeat for several
        #[arg(long = "category", short = 'c')]
        categories: Vec<String>,

        /// Your own category name; repeat for several
        #[arg(long)]
        custom: Vec<String>,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the predefined categories
    Categories,

    /// Check that the analyzer is up
    Health,

    /// Manage ~/.spotlight/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config.toml if none exists
    Init,

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    let env_url = std::env::var(config::BASE_URL_ENV).ok();
    let base_url = cfg.resolve_base_url(cli.server.as_deref(), env_url.as_deref());

    let is_wizard = matches!(cli.command, Command::Wizard);
    if is_wizard {
        // The alternate screen owns the terminal; log to a file instead.
        let log_path = match &cfg.logging.file {
            Some(p) => PathBuf::from(p),
            None => state::default_log_path()?,
        };
        init_logging(&cfg.logging.filter, LogTarget::File(log_path))?;
    } else {
        init_logging(verbosity_filter(cli.verbose), LogTarget::Stderr)?;
    }

    match cli.command {
        Command::Wizard => {
            run_wizard(&base_url).await?;
        }

        Command::Analyze {
            pdf,
            categories,
            custom,
            json,
        } => {
            analyze_once(&base_url, pdf, &categories, &custom, json).await?;
        }

        Command::Categories => {
            for c in catalog() {
                println!("{:<14} {:<24} {}", c.id, c.label, c.description);
            }
            println!("\nAdd your own with: spotlight analyze --custom \"pet care\" ...");
        }

        Command::Health => {
            let client = AnalyzerClient::new(&base_url);
            let h = client
                .health()
                .await
                .with_context(|| format!("checking {}", client.base_url()))?;
            println!(
                "{}: {} (version {})",
                client.base_url(),
                h.status,
                h.version.as_deref().unwrap_or("unknown")
            );
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
                println!("\n# effective analyzer: {}", base_url);
            }
        },
    }

    Ok(())
}

async fn run_wizard(base_url: &str) -> Result<()> {
    info!(server = base_url, "starting wizard");
    let client = AnalyzerClient::new(base_url);
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (ev_tx, ev_rx) = std::sync::mpsc::channel();

    tokio::spawn(analyze_worker::run_worker(client, req_rx, ev_tx));

    // The UI loop blocks on terminal input; keep it off the async workers.
    tokio::task::block_in_place(|| wizard_tui::run_wizard(base_url, req_tx, ev_rx))
}

/// The wizard driven from flags: choose, upload, print.
async fn analyze_once(
    base_url: &str,
    pdf: PathBuf,
    categories: &[String],
    custom: &[String],
    json: bool,
) -> Result<()> {
    let mut selection = CategorySelection::new();
    for raw in categories {
        let id = normalize_id(raw);
        if Predefined::from_id(&id).is_none() {
            bail!("unknown category '{id}' (see `spotlight categories`, or use --custom)");
        }
        if !selection.is_selected(&id) {
            selection.toggle(&id);
        }
    }
    for raw in custom {
        selection
            .add_custom(raw)
            .with_context(|| format!("--custom {:?}", raw.trim()))?;
    }

    let mut chosen = None;
    if !selection.continue_with(|set| chosen = Some(set)) {
        bail!("Select at least one category (--category or --custom)");
    }

    let mut wizard = Wizard::new();
    if let Some(set) = chosen {
        wizard.dispatch(Action::CategoriesChosen(set))?;
    }

    let mut upload = FileUpload::new();
    upload
        .offer_picked(&pdf)
        .with_context(|| format!("{}", pdf.display()))?;

    let client = AnalyzerClient::new(base_url);
    eprintln!("Analyzing {} via {} ...", pdf.display(), client.base_url());

    match wizard.run_analysis(&mut upload, &client).await? {
        AnalysisOutcome::Completed => {
            let Some(result) = wizard.state().results() else {
                bail!("analysis finished without a result");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(result)?);
            } else {
                print!("{}", render_text(result));
            }
            Ok(())
        }
        AnalysisOutcome::Failed(message) => bail!(message),
        AnalysisOutcome::NoFile => bail!("no statement selected"),
    }
}
