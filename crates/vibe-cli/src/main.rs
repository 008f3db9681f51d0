//! Vibe CLI - live preview of generated UI components.

mod colors;
mod preview;
mod render;
mod watch;
mod watcher;

use clap::{Parser, Subcommand};

use crate::preview::PreviewOptions;

#[derive(Parser)]
#[command(name = "vibe")]
#[command(about = "Live preview of generated UI components")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and render a component once
    Render {
        /// Path to a component (.rs) or generation (.json) file
        path: String,

        /// Name of the entry point function
        #[arg(long)]
        entry: Option<String>,

        /// Use release mode (LLVM backend, optimized)
        #[arg(long)]
        release: bool,

        /// Give up on a load after this many seconds (default: 120)
        #[arg(long)]
        timeout: Option<u64>,

        /// Write the normalized source to this path
        #[arg(long)]
        save: Option<String>,
    },

    /// Watch a component and re-render on changes
    Watch {
        /// Path to a component (.rs) or generation (.json) file
        path: String,

        /// Name of the entry point function
        #[arg(long)]
        entry: Option<String>,

        /// Use release mode (LLVM backend, optimized)
        #[arg(long)]
        release: bool,

        /// Give up on a load after this many seconds (default: 120)
        #[arg(long)]
        timeout: Option<u64>,

        /// Clear screen before each outcome
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Helper to format vibe-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(vibe_err) = err.downcast_ref::<vibe_core::Error>() {
            anyhow::anyhow!("{}", vibe_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Render {
            path,
            entry,
            release,
            timeout,
            save,
        } => {
            let options = PreviewOptions {
                entry,
                release,
                timeout,
            };
            render::execute(&path, &options, save.as_deref())
                .await
                .map_err(format_error)?;
        }

        Commands::Watch {
            path,
            entry,
            release,
            timeout,
            clear,
        } => {
            let options = PreviewOptions {
                entry,
                release,
                timeout,
            };
            watch::execute(&path, &options, clear).await.map_err(format_error)?;
        }
    }

    Ok(())
}
