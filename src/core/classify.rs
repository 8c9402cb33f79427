// src/core/classify.rs

//! Maps a response's content type and the caller's format hint to the kind of
//! completion event that should be published.

use serde::{Deserialize, Serialize};

/// The caller's declared expectation of the response shape.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FormatHint {
    #[default]
    Default,
    Text,
    Binary,
    StreamingText,
    StreamingBinary,
}

impl FormatHint {
    /// True for hints that ask for incremental chunk delivery.
    pub fn is_streaming(self) -> bool {
        matches!(self, FormatHint::StreamingText | FormatHint::StreamingBinary)
    }

    /// True if the hint forces a binary result.
    pub fn forces_binary(self) -> bool {
        matches!(self, FormatHint::Binary | FormatHint::StreamingBinary)
    }

    /// True if the hint forces a text result.
    pub fn forces_text(self) -> bool {
        matches!(self, FormatHint::Text | FormatHint::StreamingText)
    }
}

/// The final shape of a response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Binary,
    Text,
}

/// Classifies a response. Unknown content types fall through to text and are
/// never dropped.
///
/// `audio/*` wins over any hint and a binary hint wins over a textual content
/// type. JSON, `text/*`, a text hint and anything unrecognised all resolve to
/// text.
pub fn classify(content_type: &str, hint: FormatHint) -> ContentKind {
    if content_type.trim_start().starts_with("audio/") || hint.forces_binary() {
        return ContentKind::Binary;
    }
    ContentKind::Text
}
