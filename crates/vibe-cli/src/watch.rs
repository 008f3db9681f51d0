//! Watch command implementation.
//!
//! Re-accepts a component or generation file on every change. An edit made
//! while a compile is in flight supersedes it; only the outcome of the
//! latest edit is printed.

use std::path::Path;

use vibe_core::{DylibLoader, PreviewEngine, Revision};

use crate::colors;
use crate::preview::{self, PreviewOptions};
use crate::watcher::{FileEvent, FileWatcher};

/// Execute the watch command.
pub async fn execute(
    source_path: &str,
    options: &PreviewOptions,
    clear_screen: bool,
) -> anyhow::Result<()> {
    let path = Path::new(source_path);
    if !path.exists() {
        anyhow::bail!("Source not found: {}", source_path);
    }

    let abs_path = path.canonicalize()?;
    let mut engine = preview::build_engine(&abs_path, options)?;

    preview::print_header("Watching", path);
    println!(
        "{}Watching for changes... (Ctrl+C to stop){}",
        colors::DIM,
        colors::RESET
    );

    load(&mut engine, &abs_path);

    let mut watcher = FileWatcher::new(&abs_path)?;
    let mut reported: Option<Revision> = None;

    loop {
        tokio::select! {
            settled = engine.settle_next(), if engine.outstanding_loads() > 0 => {
                let revision = engine.phase().revision();
                if settled && !engine.is_loading() && revision != reported {
                    if clear_screen {
                        clear_terminal();
                    }
                    preview::print_outcome(&engine);
                    println!(
                        "\n{}Watching for changes... (Ctrl+C to stop){}",
                        colors::DIM,
                        colors::RESET
                    );
                    reported = revision;
                }
            }
            event = watcher.recv() => match event {
                Some(FileEvent::Modified(_)) => {
                    println!(
                        "\n{}File changed, re-rendering...{}",
                        colors::YELLOW,
                        colors::RESET
                    );
                    load(&mut engine, &abs_path);
                }
                Some(FileEvent::Removed(removed)) => {
                    eprintln!(
                        "\n{}Warning:{} Source file removed: {}",
                        colors::YELLOW,
                        colors::RESET,
                        removed.display()
                    );
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}Stopped{}", colors::DIM, colors::RESET);
                break;
            }
        }
    }

    engine.unmount();
    Ok(())
}

/// Read the file and hand it to the engine, reporting unreadable input.
fn load(engine: &mut PreviewEngine<DylibLoader>, path: &Path) {
    let accepted = preview::read_input(path).and_then(|input| preview::accept(engine, input));
    match accepted {
        Ok(revision) => tracing::debug!(%revision, "accepted edit"),
        Err(e) => eprintln!("{}Error:{} {}", colors::RED, colors::RESET, e),
    }
}

/// Clear the terminal screen.
fn clear_terminal() {
    print!("\x1B[2J\x1B[1;1H");
    colors::flush_stdout();
}
