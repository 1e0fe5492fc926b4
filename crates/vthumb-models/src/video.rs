//! Video identifier model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum accepted length of a video identifier.
pub const MAX_VIDEO_ID_LEN: usize = 128;

/// Errors returned when parsing a video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VideoIdError {
    #[error("video id is empty")]
    Empty,

    #[error("video id exceeds {MAX_VIDEO_ID_LEN} characters")]
    TooLong,

    #[error("video id contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Stable key naming a source video.
///
/// Used verbatim inside object-store keys, so only `[A-Za-z0-9_.-]` is
/// accepted by [`VideoId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Parse and validate an identifier.
    pub fn parse(s: impl Into<String>) -> Result<Self, VideoIdError> {
        let s = s.into();
        if s.is_empty() {
            return Err(VideoIdError::Empty);
        }
        if s.len() > MAX_VIDEO_ID_LEN {
            return Err(VideoIdError::TooLong);
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(VideoIdError::InvalidCharacter(c));
        }
        // ".." would let a key escape its prefix
        if s.contains("..") {
            return Err(VideoIdError::InvalidCharacter('.'));
        }
        Ok(Self(s))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VideoId {
    type Err = VideoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_recording_ids() {
        let id = VideoId::parse("meeting_2024-05-01.part1").unwrap();
        assert_eq!(id.as_str(), "meeting_2024-05-01.part1");
        assert_eq!(id.to_string(), "meeting_2024-05-01.part1");
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert_eq!(VideoId::parse(""), Err(VideoIdError::Empty));
        assert_eq!(
            VideoId::parse("a/b"),
            Err(VideoIdError::InvalidCharacter('/'))
        );
        assert!(VideoId::parse("..").is_err());
        assert_eq!(
            VideoId::parse("x".repeat(MAX_VIDEO_ID_LEN + 1)),
            Err(VideoIdError::TooLong)
        );
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = VideoId::parse("abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
