//! Color tag classification for notifications
//!
//! The color tag is a coarse severity classifier shown by the chat client:
//! - GOOD: build succeeded
//! - DANGER: build failed
//! - WARNING: everything else (aborted, not built, unstable)

use crate::build::BuildResult;

/// Color tag attached to a rendered message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Good,
    Warning,
    Danger,
}

impl std::fmt::Display for ColorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ColorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorTag::Good => "good",
            ColorTag::Warning => "warning",
            ColorTag::Danger => "danger",
        }
    }
}

/// Classify a build result into a color tag
///
/// A missing result (build still running) is treated like any other
/// non-success, non-failure outcome.
pub fn color_for(result: Option<BuildResult>) -> ColorTag {
    match result {
        Some(BuildResult::Success) => ColorTag::Good,
        Some(BuildResult::Failure) => ColorTag::Danger,
        _ => ColorTag::Warning,
    }
}
