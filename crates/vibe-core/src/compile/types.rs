//! Common types for the compilation pipeline.

use std::path::PathBuf;

use crate::paths::PreviewDirs;
use crate::resource::ResourceHandle;

/// Default name of the component entry point.
pub const DEFAULT_ENTRY_POINT: &str = "component";

/// Configuration for the component compiler.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Directory for per-load scratch builds (.vibe/build/)
    pub build_dir: PathBuf,

    /// Use Cranelift backend (fast compilation)
    pub use_cranelift: bool,

    /// Emit debug info
    pub debug_info: bool,

    /// Optimization level (0-3)
    pub opt_level: u8,

    /// Additional rustc flags
    pub extra_rustc_flags: Vec<String>,

    /// Name of the `pub fn` a component must export.
    pub entry_point: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from(".vibe/build"),
            use_cranelift: true,
            debug_info: false,
            opt_level: 0,
            extra_rustc_flags: Vec::new(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
        }
    }
}

impl CompilerConfig {
    /// Create config for fast development builds.
    pub fn development() -> Self {
        Self::default()
    }

    /// Create config for optimized builds.
    pub fn production() -> Self {
        Self {
            use_cranelift: false, // Use LLVM for better optimization
            opt_level: 3,
            ..Default::default()
        }
    }

    /// Create a development config with paths from PreviewDirs.
    pub fn for_workspace(dirs: &PreviewDirs) -> Self {
        Self {
            build_dir: dirs.build_dir.clone(),
            ..Self::development()
        }
    }

    /// Use a different entry point name.
    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    /// Scratch directory for the load bound to `handle`.
    pub fn scratch_dir(&self, handle: &ResourceHandle) -> PathBuf {
        self.build_dir.join(format!("load_{}", handle.slug()))
    }
}

/// A component library produced by rustc, not yet opened.
#[derive(Debug, Clone)]
pub struct CompiledComponent {
    /// Path to the compiled dynamic library
    pub dylib_path: PathBuf,

    /// Why the entry point was not exported, if it was not
    pub missing_entry: Option<String>,

    /// Compilation time in milliseconds
    pub compile_time_ms: u64,
}

/// Platform-specific dynamic library extension.
pub fn dylib_extension() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "dll"
    }
    #[cfg(target_os = "macos")]
    {
        "dylib"
    }
    #[cfg(target_os = "linux")]
    {
        "so"
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        "so" // Default to .so for unknown platforms
    }
}

/// Platform-specific dynamic library prefix.
pub fn dylib_prefix() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        ""
    }
    #[cfg(not(target_os = "windows"))]
    {
        "lib"
    }
}
