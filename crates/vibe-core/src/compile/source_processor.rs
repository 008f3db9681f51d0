//! Source processing for generated components.
//!
//! Two jobs happen here before rustc ever sees the text:
//! - normalization, which makes sure the execution-mode preamble is present
//!   exactly once
//! - analysis, which parses the source with `syn` and locates the entry point

use std::borrow::Cow;

use syn::{File, Item, ItemFn, ReturnType, Visibility, parse_file};

/// Execution-mode preamble every component is compiled with.
///
/// Generated code routinely carries unused imports and helpers; without this
/// header a warning-heavy but valid component would bury real diagnostics.
pub const PREAMBLE: &str = "#![allow(dead_code, unused_imports, unused_variables, unused_mut)]";

/// Result of analyzing component source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAnalysis {
    /// Name of the entry point, or why no usable one exists.
    pub entry: Result<String, String>,
}

impl SourceAnalysis {
    /// Whether an export shim can be generated.
    pub fn has_entry(&self) -> bool {
        self.entry.is_ok()
    }
}

/// Normalizes and analyzes component source.
pub struct ComponentSourceProcessor;

impl ComponentSourceProcessor {
    /// Prepend the preamble unless the source header already carries it.
    ///
    /// Normalizing normalized text returns it unchanged.
    pub fn normalize(source: &str) -> Cow<'_, str> {
        if Self::has_preamble(source) {
            Cow::Borrowed(source)
        } else {
            Cow::Owned(format!("{PREAMBLE}\n{source}"))
        }
    }

    /// Whether the preamble appears among the leading header lines
    /// (blank lines, comments and inner attributes before the first item).
    pub fn has_preamble(source: &str) -> bool {
        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed == PREAMBLE {
                return true;
            }
            if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with("#![") {
                continue;
            }
            break;
        }
        false
    }

    /// Parse the source and locate the entry point named `entry_point`.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the source is not valid Rust syntax.
    pub fn analyze(source: &str, entry_point: &str) -> Result<SourceAnalysis, syn::Error> {
        let file = parse_file(source)?;
        Ok(SourceAnalysis {
            entry: Self::find_entry_point(&file, entry_point).map(|()| entry_point.to_string()),
        })
    }

    /// 1-indexed line and column of a parse error.
    pub fn error_location(error: &syn::Error) -> (usize, usize) {
        let start = error.span().start();
        (start.line.max(1), start.column + 1)
    }

    /// Find exactly one top-level function with the entry point's name.
    fn find_entry_point(file: &File, name: &str) -> Result<(), String> {
        let candidates: Vec<&ItemFn> = file
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Fn(func) if func.sig.ident == name => Some(func),
                _ => None,
            })
            .collect();

        match candidates.as_slice() {
            [] => Err(format!("no `pub fn {name}()` found at the top level")),
            [func] => Self::check_signature(func, name),
            _ => Err(format!("`{name}` is defined {} times", candidates.len())),
        }
    }

    /// Check that the entry point can be called without arguments.
    fn check_signature(func: &ItemFn, name: &str) -> Result<(), String> {
        let sig = &func.sig;
        if !matches!(func.vis, Visibility::Public(_)) {
            Err(format!("`{name}` must be declared `pub`"))
        } else if !sig.inputs.is_empty() {
            Err(format!("`{name}` must take no arguments"))
        } else if matches!(sig.output, ReturnType::Default) {
            Err(format!("`{name}` must return the markup it renders"))
        } else if sig.asyncness.is_some() {
            Err(format!("`{name}` must not be async"))
        } else if sig.unsafety.is_some() {
            Err(format!("`{name}` must not be unsafe"))
        } else if !sig.generics.params.is_empty() {
            Err(format!("`{name}` must not be generic"))
        } else {
            Ok(())
        }
    }
}
