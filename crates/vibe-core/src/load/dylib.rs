//! Dynamic-library loader backend.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compile::{ComponentCompiler, ComponentSourceProcessor, CompilerConfig, ToolchainManager};
use crate::error::Result;
use crate::render::DylibComponent;

use super::{LoadFailure, LoadOutcome, LoadRequest, ModuleLoader};

/// Compiles components with rustc and opens them with libloading.
///
/// Compilation runs on tokio's blocking pool, so a load never stalls the
/// thread that drives the engine.
#[derive(Clone)]
pub struct DylibLoader {
    compiler: Arc<ComponentCompiler>,
}

impl DylibLoader {
    /// Create a loader, detecting the local toolchain.
    pub fn new(config: CompilerConfig) -> Result<Self> {
        let toolchain = ToolchainManager::new()?;
        Ok(Self::with_compiler(ComponentCompiler::new(config, toolchain)))
    }

    /// Create with an existing compiler.
    pub fn with_compiler(compiler: ComponentCompiler) -> Self {
        Self {
            compiler: Arc::new(compiler),
        }
    }

    /// The underlying compiler.
    pub fn compiler(&self) -> &ComponentCompiler {
        &self.compiler
    }

    /// Compile and open one component on the current thread.
    fn load_blocking(compiler: &ComponentCompiler, request: &LoadRequest) -> LoadOutcome {
        let revision = request.revision;
        let scratch = ScratchDir::new(compiler.config().scratch_dir(&request.handle));

        let compiled = compiler
            .compile(&request.handle, &request.text, scratch.path())
            .map_err(LoadFailure::from_diagnostics)?;

        tracing::debug!(
            %revision,
            compile_time_ms = compiled.compile_time_ms,
            "compiled component"
        );

        let component = DylibComponent::open(compiled)?.with_scratch(scratch);
        Ok(Box::new(component))
    }
}

impl ModuleLoader for DylibLoader {
    fn normalize<'a>(&self, source: &'a str) -> Cow<'a, str> {
        ComponentSourceProcessor::normalize(source)
    }

    fn load(&self, request: LoadRequest) -> impl Future<Output = LoadOutcome> + Send {
        let compiler = Arc::clone(&self.compiler);
        async move {
            tokio::task::spawn_blocking(move || Self::load_blocking(&compiler, &request))
                .await
                .unwrap_or_else(|e| Err(LoadFailure::compile(format!("load task failed: {e}"))))
        }
    }
}

/// Per-load build directory, removed when dropped.
///
/// A failed load drops it on the way out. A loaded component takes it over
/// and drops it after unloading its library, since Windows refuses to delete
/// a DLL that is still mapped.
pub(crate) struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.path.exists()
            && let Err(e) = fs::remove_dir_all(&self.path)
        {
            tracing::warn!("Failed to remove build directory {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("load_abc");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("component.rs"), "").unwrap();

        drop(ScratchDir::new(path.clone()));

        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_dir_tolerates_missing_path() {
        let temp = TempDir::new().unwrap();
        drop(ScratchDir::new(temp.path().join("never_created")));
    }

    #[test]
    fn test_normalize_adds_preamble() {
        let loader = DylibLoader::new(CompilerConfig::default()).unwrap();
        let normalized = loader.normalize("pub fn component() -> u8 { 1 }");
        assert!(normalized.starts_with(crate::compile::PREAMBLE));
    }
}
