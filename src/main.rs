//! nemo-previewer
//!
//! Drive the previewer service from the command line, through the same bridge
//! the file manager uses.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nemo_previewer::{
    Config, Direction, FileManagerWindow, HostApplication, HostWindow, Pane,
    PreviewSelectionTarget, Previewer, View,
};

/// Slightly longer than the default D-Bus reply timeout
const REPLY_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "nemo-previewer", version, about = "Talk to the NautilusPreviewer service")]
struct Cli {
    /// Configuration file (default: ~/.config/nemo/previewer.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Preview a file
    Show {
        /// URI of the file, e.g. file:///tmp/a.png
        uri: String,

        /// X window the preview should be transient for
        #[arg(long, default_value_t = 0)]
        window_id: u32,

        /// Close the preview instead if it is already showing
        #[arg(long)]
        toggle: bool,

        /// Keep running and print selection events until interrupted
        #[arg(long)]
        follow: bool,
    },

    /// Hide the preview (never starts the previewer)
    Close,

    /// Write the default configuration file
    WriteConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// A file manager with one window whose view prints what it receives
struct ConsoleApp {
    window: Arc<ConsoleWindow>,
}

struct ConsoleWindow {
    pane: Arc<ConsolePane>,
}

struct ConsolePane {
    view: Arc<ConsoleView>,
}

struct ConsoleView;

impl ConsoleApp {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            window: Arc::new(ConsoleWindow {
                pane: Arc::new(ConsolePane {
                    view: Arc::new(ConsoleView),
                }),
            }),
        })
    }
}

impl HostApplication for ConsoleApp {
    fn windows(&self) -> Vec<Arc<dyn HostWindow>> {
        vec![self.window.clone() as Arc<dyn HostWindow>]
    }
}

impl HostWindow for ConsoleWindow {
    fn as_file_manager(&self) -> Option<&dyn FileManagerWindow> {
        Some(self as &dyn FileManagerWindow)
    }
}

impl FileManagerWindow for ConsoleWindow {
    fn active_pane(&self) -> Option<Arc<dyn Pane>> {
        Some(self.pane.clone() as Arc<dyn Pane>)
    }
}

impl Pane for ConsolePane {
    fn current_view(&self) -> Option<Arc<dyn View>> {
        Some(self.view.clone() as Arc<dyn View>)
    }
}

impl View for ConsoleView {
    fn as_preview_target(&self) -> Option<&dyn PreviewSelectionTarget> {
        Some(self as &dyn PreviewSelectionTarget)
    }
}

impl PreviewSelectionTarget for ConsoleView {
    fn preview_selection_event(&self, direction: Direction) {
        println!("{} ({})", direction, direction.code());
    }
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("Received SIGINT, shutting down"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "nemo_previewer=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Command::WriteConfig { force } = cli.command {
        let path = match cli.config {
            Some(path) => path,
            None => Config::config_path()?,
        };
        if path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        return Config::save_default(&path);
    }

    let previewer = match &cli.config {
        Some(path) => {
            let config = Config::load_from(path).context("Failed to load configuration")?;
            Arc::new(Previewer::connect(&config, ConsoleApp::new()).await)
        }
        None => nemo_previewer::get_singleton(ConsoleApp::new()).await,
    };
    if !previewer.is_connected() {
        anyhow::bail!("previewer bus is unavailable");
    }

    match cli.command {
        Command::Show {
            uri,
            window_id,
            toggle,
            follow,
        } => {
            previewer.show_file(&uri, window_id, toggle);
            if follow {
                info!("Printing selection events, press Ctrl-C to stop");
                shutdown_signal().await?;
                previewer.close();
            }
        }
        Command::Close => previewer.close(),
        Command::WriteConfig { .. } => unreachable!("handled before connecting"),
    }

    if tokio::time::timeout(REPLY_WAIT, previewer.wait_for_replies()).await.is_err() {
        warn!(
            "Gave up waiting for the previewer to reply ({} calls pending)",
            previewer.pending_calls()
        );
    }
    Ok(())
}
