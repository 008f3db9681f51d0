//! Render command implementation.
//!
//! Loads one component or generation through the preview engine and prints
//! the settled outcome.

use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::colors;
use crate::preview::{self, PreviewOptions};

/// Execute the render command.
pub async fn execute(
    source_path: &str,
    options: &PreviewOptions,
    save: Option<&str>,
) -> anyhow::Result<()> {
    let path = Path::new(source_path);
    if !path.exists() {
        anyhow::bail!("Source not found: {}", source_path);
    }

    let start = Instant::now();
    let input = preview::read_input(path)?;
    let mut engine = preview::build_engine(path, options)?;

    preview::print_header("Rendering", path);
    print!("{}Compiling...{}", colors::DIM, colors::RESET);
    colors::flush_stdout();

    preview::accept(&mut engine, input)?;
    engine.settle_all().await;
    println!();

    if let Some(out) = save
        && let Some(record) = engine.accepted_source()
    {
        fs::write(out, record.text())?;
        println!("{}Saved{} source to {}", colors::GREEN, colors::RESET, out);
    }

    let rendered = preview::print_outcome(&engine);

    println!("\n{}", "─".repeat(50));
    println!(
        "{}Finished{} in {:.2}s",
        if rendered { colors::GREEN } else { colors::RED },
        colors::RESET,
        start.elapsed().as_secs_f64()
    );

    engine.unmount();

    if !rendered {
        anyhow::bail!("Preview failed");
    }
    Ok(())
}
