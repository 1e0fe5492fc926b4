//! Video source handles.

use std::fmt;
use std::path::PathBuf;

/// An addressable, seekable media resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Remote resource, usually a presigned URL
    Url(String),
    /// Local file
    Path(PathBuf),
}

impl VideoSource {
    /// Value passed to FFmpeg/FFprobe as the input.
    pub fn as_input(&self) -> String {
        match self {
            VideoSource::Url(url) => url.clone(),
            VideoSource::Path(path) => path.to_string_lossy().to_string(),
        }
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Presigned URLs carry credentials in the query string
            VideoSource::Url(url) => {
                let base = url.split('?').next().unwrap_or(url);
                write!(f, "{}", base)
            }
            VideoSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_strips_query() {
        let source = VideoSource::Url("https://r2.example/rec.mp4?X-Amz-Signature=abc".into());
        assert_eq!(source.to_string(), "https://r2.example/rec.mp4");
        assert!(source.as_input().contains("X-Amz-Signature"));
    }
}
