//! Component compiler.
//!
//! Wraps normalized component source in a small crate that exports a C ABI
//! render entry, and compiles it to a dynamic library with rustc.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use crate::resource::ResourceHandle;

use super::errors::{Diagnostic, ErrorMapper};
use super::source_processor::{ComponentSourceProcessor, SourceAnalysis};
use super::toolchain::ToolchainManager;
use super::types::{CompiledComponent, CompilerConfig, dylib_extension, dylib_prefix};

/// Exported render entry: `fn(out_ptr, out_len) -> status`.
pub const RENDER_SYMBOL: &str = "__vibe_render";

/// Exported deallocator for buffers returned by the render entry.
pub const FREE_SYMBOL: &str = "__vibe_free";

/// Lines the wrapper places before the component source.
const HEADER_LINES: usize = 1;

/// Compiles component source to dynamic libraries.
pub struct ComponentCompiler {
    /// Compiler configuration
    config: CompilerConfig,

    /// Toolchain manager
    toolchain: ToolchainManager,
}

impl ComponentCompiler {
    /// Create a new component compiler.
    pub fn new(config: CompilerConfig, toolchain: ToolchainManager) -> Self {
        Self { config, toolchain }
    }

    /// The compiler configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// The detected toolchain.
    pub fn toolchain(&self) -> &ToolchainManager {
        &self.toolchain
    }

    /// Compile normalized `source` bound to `handle` inside `scratch_dir`.
    ///
    /// A syntax error or a rustc failure yields the diagnostics, mapped onto
    /// the component source. A missing entry point is not a compile error:
    /// the library is built without the export shim and the reason is
    /// recorded in [`CompiledComponent::missing_entry`].
    pub fn compile(
        &self,
        handle: &ResourceHandle,
        source: &str,
        scratch_dir: &Path,
    ) -> Result<CompiledComponent, Vec<Diagnostic>> {
        let start = Instant::now();
        let mut mapper = ErrorMapper::new(handle.address(), source.lines().count());
        mapper.add_mapping(HEADER_LINES + 1, 1);

        let analysis = ComponentSourceProcessor::analyze(source, &self.config.entry_point)
            .map_err(|e| {
                let (line, column) = ComponentSourceProcessor::error_location(&e);
                vec![mapper.syntax_error(e.to_string(), line, column)]
            })?;

        let wrapper_code = self.generate_wrapper(handle, source, &analysis);
        let dylib_path = self.compile_to_dylib(scratch_dir, &wrapper_code, &mapper)?;

        Ok(CompiledComponent {
            dylib_path,
            missing_entry: analysis.entry.err(),
            compile_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Generate the wrapper crate for a component.
    fn generate_wrapper(
        &self,
        handle: &ResourceHandle,
        source: &str,
        analysis: &SourceAnalysis,
    ) -> String {
        let mut code = String::new();

        code.push_str(&format!("// Generated preview wrapper for {}\n", handle));
        code.push_str(source);
        if !source.ends_with('\n') {
            code.push('\n');
        }

        if let Ok(entry) = &analysis.entry {
            code.push('\n');
            code.push_str(&Self::generate_export_shim(entry));
        }

        code
    }

    /// Generate the C ABI exports that call the entry point.
    ///
    /// The entry runs inside `catch_unwind` so a panicking component reports
    /// status -4 with its message instead of unwinding across the FFI
    /// boundary.
    fn generate_export_shim(entry: &str) -> String {
        let mut code = String::new();

        code.push_str("#[doc(hidden)]\n");
        code.push_str("#[no_mangle]\n");
        code.push_str(&format!(
            "pub unsafe extern \"C\" fn {RENDER_SYMBOL}(out_ptr: *mut *mut u8, out_len: *mut usize) -> i32 {{\n"
        ));
        code.push_str(&format!(
            "    let painted = ::std::panic::catch_unwind(|| ::std::string::ToString::to_string(&{entry}()));\n"
        ));
        code.push_str("    let (status, text) = match painted {\n");
        code.push_str("        Ok(markup) => (0i32, markup),\n");
        code.push_str("        Err(payload) => {\n");
        code.push_str("            let message = if let Some(s) = payload.downcast_ref::<&str>() {\n");
        code.push_str("                ::std::string::ToString::to_string(s)\n");
        code.push_str("            } else if let Some(s) = payload.downcast_ref::<::std::string::String>() {\n");
        code.push_str("                ::std::clone::Clone::clone(s)\n");
        code.push_str("            } else {\n");
        code.push_str("                ::std::string::String::from(\"component panicked\")\n");
        code.push_str("            };\n");
        code.push_str("            (-4i32, message)\n");
        code.push_str("        }\n");
        code.push_str("    };\n");
        code.push_str("    let bytes = text.into_bytes().into_boxed_slice();\n");
        code.push_str("    *out_len = bytes.len();\n");
        code.push_str("    *out_ptr = ::std::boxed::Box::into_raw(bytes) as *mut u8;\n");
        code.push_str("    status\n");
        code.push_str("}\n\n");

        code.push_str("#[doc(hidden)]\n");
        code.push_str("#[no_mangle]\n");
        code.push_str(&format!(
            "pub unsafe extern \"C\" fn {FREE_SYMBOL}(ptr: *mut u8, len: usize) {{\n"
        ));
        code.push_str("    if !ptr.is_null() {\n");
        code.push_str("        ::std::mem::drop(::std::boxed::Box::from_raw(::std::ptr::slice_from_raw_parts_mut(ptr, len)));\n");
        code.push_str("    }\n");
        code.push_str("}\n");

        code
    }

    /// Compile wrapper code to a dynamic library.
    fn compile_to_dylib(
        &self,
        scratch_dir: &Path,
        wrapper_code: &str,
        mapper: &ErrorMapper,
    ) -> Result<PathBuf, Vec<Diagnostic>> {
        fs::create_dir_all(scratch_dir).map_err(|e| {
            Diagnostic::simple(format!("Failed to create build directory: {}", e))
        })?;

        let src_file = scratch_dir.join("component.rs");
        fs::write(&src_file, wrapper_code)
            .map_err(|e| Diagnostic::simple(format!("Failed to write source: {}", e)))?;

        let dylib_name = format!("{}vibe_component.{}", dylib_prefix(), dylib_extension());
        let dylib_path = scratch_dir.join(dylib_name);

        let mut cmd = Command::new(self.toolchain.rustc_path());

        cmd.arg(&src_file)
            .arg("--crate-type=cdylib")
            .arg("--crate-name=vibe_component")
            .arg("--edition=2021")
            .arg("-o")
            .arg(&dylib_path)
            .arg("--error-format=json");

        if self.config.use_cranelift && self.toolchain.has_cranelift() {
            for flag in self.toolchain.cranelift_flags() {
                cmd.arg(&flag);
            }
        }

        cmd.arg(format!("-Copt-level={}", self.config.opt_level));

        if self.config.debug_info {
            cmd.arg("-g");
        }

        for flag in &self.config.extra_rustc_flags {
            cmd.arg(flag);
        }

        let output = cmd
            .output()
            .map_err(|e| Diagnostic::simple(format!("Failed to run rustc: {}", e)))?;

        if output.status.success() {
            return Ok(dylib_path);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut errors = mapper.parse_rustc_output(&stderr);
        errors.retain(|d| d.is_error() && !d.message.starts_with("aborting due to"));

        if errors.is_empty() {
            // Fallback if JSON parsing failed
            Err(Diagnostic::simple_rendered(stderr.to_string()))
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceRegistry;

    fn make_compiler() -> ComponentCompiler {
        let toolchain = ToolchainManager::new().unwrap();
        ComponentCompiler::new(CompilerConfig::default(), toolchain)
    }

    #[test]
    fn test_generate_wrapper_with_entry() {
        let compiler = make_compiler();
        let mut registry = ResourceRegistry::new();
        let source = "pub fn component() -> String { String::new() }";
        let handle = registry.acquire(source);
        let analysis = ComponentSourceProcessor::analyze(source, "component").unwrap();

        let wrapper = compiler.generate_wrapper(&handle, source, &analysis);

        assert!(wrapper.starts_with("// Generated preview wrapper for vibe-blob:"));
        assert_eq!(wrapper.lines().nth(HEADER_LINES), Some(source));
        assert!(wrapper.contains("fn __vibe_render("));
        assert!(wrapper.contains("fn __vibe_free("));
        assert!(wrapper.contains("to_string(&component())"));
    }

    #[test]
    fn test_generate_wrapper_without_entry_omits_shim() {
        let compiler = make_compiler();
        let mut registry = ResourceRegistry::new();
        let source = "pub fn helper() -> u32 { 1 }\n";
        let handle = registry.acquire(source);
        let analysis = ComponentSourceProcessor::analyze(source, "component").unwrap();

        let wrapper = compiler.generate_wrapper(&handle, source, &analysis);

        assert!(!wrapper.contains(RENDER_SYMBOL));
        assert!(!wrapper.contains(FREE_SYMBOL));
    }

    #[test]
    fn test_syntax_error_maps_to_source_line() {
        let compiler = make_compiler();
        let mut registry = ResourceRegistry::new();
        let source = "pub fn component() -> String {\n    let = 1;\n}\n";
        let handle = registry.acquire(source);
        let scratch = tempfile::TempDir::new().unwrap();

        let errors = compiler.compile(&handle, source, scratch.path()).unwrap_err();

        assert_eq!(errors.len(), 1);
        let location = errors[0].location.as_ref().unwrap();
        assert_eq!(location.line, 2);
        assert_eq!(location.source, handle.address());
        assert!(!scratch.path().join("component.rs").exists(), "rustc must not run");
    }
}
