//! Compiler diagnostics and their mapping back onto component source.

use serde::{Deserialize, Serialize};

/// A compilation diagnostic with source location information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Error message
    pub message: String,

    /// Error code (e.g., "E0308")
    pub code: Option<String>,

    /// Severity level
    pub level: ErrorLevel,

    /// Primary source location
    pub location: Option<SourceLocation>,

    /// Rendered error message (for display)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
}

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Error,
    Warning,
    Note,
    Help,
}

/// A location in component source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// Resource address of the source
    pub source: String,

    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

/// Rustc JSON diagnostic format.
#[derive(Debug, Deserialize)]
pub struct RustcDiagnostic {
    pub message: String,
    pub code: Option<RustcCode>,
    pub level: String,
    pub spans: Vec<RustcSpan>,
    pub rendered: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RustcCode {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct RustcSpan {
    pub line_start: usize,
    pub column_start: usize,
    pub is_primary: bool,
}

/// Maps rustc diagnostics on the generated wrapper back to the component
/// source it embeds.
pub struct ErrorMapper {
    /// Mapping from generated line to component line
    line_map: Vec<LineMapping>,

    /// Address of the component source
    source: String,

    /// Number of lines in the component source
    source_lines: usize,
}

/// Mapping from generated code line to component source.
#[derive(Debug, Clone)]
struct LineMapping {
    /// Line number in generated code
    generated_line: usize,

    /// Line number in component source
    original_line: usize,
}

impl ErrorMapper {
    /// Create a new error mapper for a source binding.
    pub fn new(source: impl Into<String>, source_lines: usize) -> Self {
        Self {
            line_map: Vec::new(),
            source: source.into(),
            source_lines,
        }
    }

    /// Add a line mapping from generated code to component source.
    pub fn add_mapping(&mut self, generated_line: usize, original_line: usize) {
        self.line_map.push(LineMapping {
            generated_line,
            original_line,
        });
    }

    /// Parse rustc JSON output and map errors to component source locations.
    pub fn parse_rustc_output(&self, json_output: &str) -> Vec<Diagnostic> {
        let mut errors = Vec::new();

        for line in json_output.lines() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<RustcDiagnostic>(line) {
                Ok(diagnostic) => {
                    if let Some(error) = self.map_diagnostic(&diagnostic) {
                        errors.push(error);
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        "Failed to parse rustc JSON: {} (line: {})",
                        e,
                        line.chars().take(100).collect::<String>()
                    );
                }
            }
        }

        errors
    }

    /// Build a diagnostic for a syntax error found before compilation.
    pub fn syntax_error(&self, message: impl Into<String>, line: usize, column: usize) -> Diagnostic {
        Diagnostic {
            message: message.into(),
            code: None,
            level: ErrorLevel::Error,
            location: Some(SourceLocation {
                source: self.source.clone(),
                line,
                column,
            }),
            rendered: None,
        }
    }

    /// Map a rustc diagnostic to a Diagnostic with corrected locations.
    fn map_diagnostic(&self, diagnostic: &RustcDiagnostic) -> Option<Diagnostic> {
        let level = match diagnostic.level.as_str() {
            "error" => ErrorLevel::Error,
            "warning" => ErrorLevel::Warning,
            "note" => ErrorLevel::Note,
            "help" => ErrorLevel::Help,
            _ => return None,
        };

        let location = diagnostic
            .spans
            .iter()
            .find(|s| s.is_primary)
            .map(|span| SourceLocation {
                source: self.source.clone(),
                line: self.map_line(span.line_start),
                column: span.column_start,
            });

        Some(Diagnostic {
            message: diagnostic.message.clone(),
            code: diagnostic.code.as_ref().map(|c| c.code.clone()),
            level,
            location,
            rendered: diagnostic.rendered.clone(),
        })
    }

    /// Map a generated line number to component line number.
    fn map_line(&self, generated_line: usize) -> usize {
        let mapped = if let Some(mapping) = self
            .line_map
            .iter()
            .find(|m| m.generated_line == generated_line)
        {
            mapping.original_line
        } else if let Some(mapping) = self
            .line_map
            .iter()
            .min_by_key(|m| (m.generated_line as isize - generated_line as isize).unsigned_abs())
        {
            let offset = generated_line as isize - mapping.generated_line as isize;
            (mapping.original_line as isize + offset).max(1) as usize
        } else {
            generated_line
        };

        // Lines past the end belong to the generated export shim.
        mapped.min(self.source_lines.max(1))
    }
}

impl Diagnostic {
    /// Create a simple error with just a message.
    pub fn simple(message: impl Into<String>) -> Vec<Self> {
        vec![Self {
            message: message.into(),
            code: None,
            level: ErrorLevel::Error,
            location: None,
            rendered: None,
        }]
    }

    /// Create a simple error with a pre-rendered message (for raw rustc output).
    pub fn simple_rendered(message: impl Into<String>) -> Vec<Self> {
        let msg = message.into();
        vec![Self {
            message: msg.clone(),
            code: None,
            level: ErrorLevel::Error,
            location: None,
            rendered: Some(msg),
        }]
    }

    /// Whether this diagnostic is an error (as opposed to a warning or note).
    pub fn is_error(&self) -> bool {
        self.level == ErrorLevel::Error
    }

    /// One-line summary: `line:column: message`.
    pub fn summary(&self) -> String {
        match &self.location {
            Some(loc) => format!("{}:{}: {}", loc.line, loc.column, self.message),
            None => self.message.clone(),
        }
    }

    /// Format the diagnostic for terminal display.
    pub fn format_terminal(&self) -> String {
        let mut output = String::new();

        let level_str = match self.level {
            ErrorLevel::Error => "\x1b[1;31merror\x1b[0m",
            ErrorLevel::Warning => "\x1b[1;33mwarning\x1b[0m",
            ErrorLevel::Note => "\x1b[1;36mnote\x1b[0m",
            ErrorLevel::Help => "\x1b[1;32mhelp\x1b[0m",
        };

        if let Some(code) = &self.code {
            output.push_str(&format!("{level_str}[{code}]: {}\n", self.message));
        } else {
            output.push_str(&format!("{level_str}: {}\n", self.message));
        }

        if let Some(loc) = &self.location {
            output.push_str(&format!(
                "  \x1b[1;34m-->\x1b[0m {}:{}:{}\n",
                loc.source, loc.line, loc.column
            ));
        }

        output
    }
}
