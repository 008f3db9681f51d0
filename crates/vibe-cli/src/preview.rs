//! Shared plumbing for commands that drive the preview engine.

use std::fs;
use std::path::Path;
use std::time::Duration;

use vibe_core::{
    CompilerConfig, DylibLoader, EngineConfig, Generation, Phase, PreviewDirs, PreviewEngine,
    Revision,
};

use crate::colors;

/// What a source file holds.
pub enum Input {
    /// Bare component source (`.rs`).
    Component(String),
    /// A generation service payload (`.json`).
    Generation(Generation),
}

/// Options shared by `render` and `watch`.
pub struct PreviewOptions {
    /// Entry point name, if not the default
    pub entry: Option<String>,
    /// Build with LLVM at opt-level 3
    pub release: bool,
    /// Load timeout in seconds; the engine default applies when unset
    pub timeout: Option<u64>,
}

/// Read a component or generation file.
pub fn read_input(path: &Path) -> anyhow::Result<Input> {
    let contents = fs::read_to_string(path)?;
    if path.extension().is_some_and(|ext| ext == "json") {
        Ok(Input::Generation(Generation::from_json(&contents)?))
    } else {
        Ok(Input::Component(contents))
    }
}

/// Build an engine compiling next to `path`.
pub fn build_engine(path: &Path, options: &PreviewOptions) -> anyhow::Result<PreviewEngine<DylibLoader>> {
    let dirs = PreviewDirs::from_source_path(path)?;

    let mut config = if options.release {
        CompilerConfig {
            build_dir: dirs.build_dir.clone(),
            ..CompilerConfig::production()
        }
    } else {
        CompilerConfig::for_workspace(&dirs)
    };
    if let Some(entry) = &options.entry {
        config = config.with_entry_point(entry);
    }

    let loader = DylibLoader::new(config)?;
    tracing::debug!(
        rustc = %loader.compiler().toolchain().version(),
        "toolchain ready"
    );

    Ok(PreviewEngine::new(loader, engine_config(options)))
}

/// Engine settings for a CLI run.
fn engine_config(options: &PreviewOptions) -> EngineConfig {
    let mut config = EngineConfig::default().with_initial_source(None);
    if let Some(secs) = options.timeout {
        config = config.with_load_timeout(Some(Duration::from_secs(secs)));
    }
    config
}

/// Hand the input to the engine.
pub fn accept(engine: &mut PreviewEngine<DylibLoader>, input: Input) -> anyhow::Result<Revision> {
    match input {
        Input::Component(source) => Ok(engine.accept(&source)),
        Input::Generation(generation) => Ok(engine.accept_generation(generation)?),
    }
}

/// Print the settled outcome of the accepted revision.
///
/// Returns whether the preview rendered.
pub fn print_outcome(engine: &PreviewEngine<DylibLoader>) -> bool {
    match engine.phase() {
        Phase::Rendering(revision) => {
            println!(
                "\n{}Rendered{} {}{}{}",
                colors::GREEN,
                colors::RESET,
                colors::DIM,
                revision,
                colors::RESET
            );
            println!("{}", engine.view());

            if let Some(generation) = engine.accepted_generation() {
                println!("\n{}Design tokens:{}", colors::BOLD, colors::RESET);
                println!("{}", generation.design_tokens.trim_end());
                println!("\n{}Thoughts:{}", colors::BOLD, colors::RESET);
                println!("{}", generation.thoughts.trim_end());
            }
            true
        }
        Phase::Failed(revision) => {
            if let Some(error) = engine.error() {
                eprintln!(
                    "\n{}{}{} {}({}){}",
                    colors::RED,
                    error.failure,
                    colors::RESET,
                    colors::DIM,
                    revision,
                    colors::RESET
                );
                for diagnostic in &error.failure.diagnostics {
                    match &diagnostic.rendered {
                        Some(rendered) => eprintln!("{}", rendered),
                        None => eprintln!("{}", diagnostic.format_terminal()),
                    }
                }
            }
            println!("{}", engine.view());
            false
        }
        Phase::Loading(_) | Phase::Idle => {
            println!("{}", engine.view());
            false
        }
    }
}

/// Print the command header.
pub fn print_header(action: &str, path: &Path) {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    println!(
        "\n{}Vibe{} - {} {}{}{}",
        colors::BOLD,
        colors::RESET,
        action,
        colors::CYAN,
        name,
        colors::RESET
    );
    println!("{}", "─".repeat(50));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(timeout: Option<u64>) -> PreviewOptions {
        PreviewOptions {
            entry: None,
            release: false,
            timeout,
        }
    }

    #[test]
    fn test_default_timeout_kept_without_flag() {
        let config = engine_config(&options(None));
        assert_eq!(config.load_timeout, EngineConfig::default().load_timeout);
        assert!(config.load_timeout.is_some());
        assert!(config.initial_source.is_none());
    }

    #[test]
    fn test_timeout_flag_overrides_default() {
        let config = engine_config(&options(Some(5)));
        assert_eq!(config.load_timeout, Some(Duration::from_secs(5)));
    }
}
