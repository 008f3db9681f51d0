//! Source records and the generation-service boundary.
//!
//! A [`SourceRecord`] is one immutable generation of component source tagged
//! with its [`Revision`]. Records are superseded, never mutated.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Component shown before the first generation arrives.
pub const INITIAL_COMPONENT: &str = r##"//! Starter component shown before the first generation.

pub fn component() -> String {
    let title = "Build something now";
    let description = "Make the dream happen by typing the prompt.";
    format!(
        "<div class=\"p-8 text-center\"><h2 class=\"text-2xl font-semibold\">{title}</h2><p class=\"text-muted-foreground\">{description}</p></div>"
    )
}
"##;

/// Monotonically increasing generation counter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Highest revision an externally numbered record may carry.
    ///
    /// The upper half of the range is left to revisions issued by the
    /// engine, so issuing after any admitted record cannot overflow.
    pub const MAX_SUBMITTED: Self = Self(u64::MAX / 2);

    /// Create a revision from its raw number.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw revision number.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The revision that follows this one, saturating at `u64::MAX`.
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// One accepted generation of component source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    text: Arc<str>,
    revision: Revision,
}

impl SourceRecord {
    /// Create a record.
    pub fn new(text: impl Into<Arc<str>>, revision: Revision) -> Self {
        Self {
            text: text.into(),
            revision,
        }
    }

    /// The source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shared handle to the source text.
    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// The record's revision.
    pub fn revision(&self) -> Revision {
        self.revision
    }
}

/// Output of the remote generation service.
///
/// Only `code` feeds the preview engine; the design tokens and thoughts are
/// carried along for the chrome to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    /// Generated component source.
    #[serde(alias = "tsxCode", alias = "generatedCode")]
    pub code: String,

    /// CSS custom properties for the generated design.
    pub design_tokens: String,

    /// The generator's explanation of its design choices.
    #[serde(alias = "explanation")]
    pub thoughts: String,
}

impl Generation {
    /// Decode a generation from the service's JSON payload.
    pub fn from_json(json: &str) -> Result<Self> {
        let generation: Self =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        generation.validate()?;
        Ok(generation)
    }

    /// Check the service contract: every text field is non-empty.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("code", &self.code),
            ("designTokens", &self.design_tokens),
            ("thoughts", &self.thoughts),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::InvalidGeneration(format!("`{name}` is empty")));
            }
        }
        Ok(())
    }
}
