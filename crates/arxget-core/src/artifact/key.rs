//! Artifact key derivation from a record identifier or a feed-supplied asset.

use super::extension;
use crate::error::ParseError;

/// Path segment that precedes the paper identifier in an abstract URL.
const ABS_SEGMENT: &str = "abs";

/// Key of one artifact: where to fetch it and what to call it locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    /// Path appended to the download base URL (`2308.07001v2`, `astro-ph/0701212v1`),
    /// or an absolute URL when the feed names the asset itself.
    pub remote: String,
    /// Local file name without extension; `remote` with `/` removed.
    pub file_stem: String,
    /// Full local name chosen by the feed. Skips `Content-Type` naming.
    pub file_name: Option<String>,
}

impl ArtifactKey {
    /// Derives the key from an identifier such as `http://arxiv.org/abs/2308.07001v2`.
    ///
    /// Everything after the `abs` segment forms the remote key, so legacy
    /// identifiers keep their archive prefix (`abs/astro-ph/0701212v1`). Without
    /// an `abs` segment the last path segment is used.
    pub fn from_record_id(id: &str) -> Result<Self, ParseError> {
        let bad = || ParseError::Identifier(id.to_string());

        let parsed = url::Url::parse(id).map_err(|_| bad())?;
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let tail: Vec<&str> = match segments.iter().rposition(|s| *s == ABS_SEGMENT) {
            Some(pos) => segments[pos + 1..].to_vec(),
            None => segments.last().copied().into_iter().collect(),
        };

        if tail.is_empty() || tail.iter().any(|s| !is_safe_segment(s)) {
            return Err(bad());
        }

        Ok(ArtifactKey {
            remote: tail.join("/"),
            file_stem: tail.concat(),
            file_name: None,
        })
    }

    /// Key for an asset the feed links directly, saved under the feed's own file name.
    ///
    /// `id` is only used to attribute the error.
    pub fn from_asset(id: &str, url: &str, file_name: &str) -> Result<Self, ParseError> {
        let bad = || ParseError::Identifier(id.to_string());

        let parsed = url::Url::parse(url).map_err(|_| bad())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(bad());
        }
        let name = file_name.trim();
        if !is_safe_file_name(name) {
            return Err(bad());
        }
        let stem = std::path::Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name);

        Ok(ArtifactKey {
            remote: parsed.to_string(),
            file_stem: stem.to_string(),
            file_name: Some(name.to_string()),
        })
    }

    /// Name the artifact is saved under, given the response's `Content-Type`.
    pub fn local_name(&self, content_type: Option<&str>) -> String {
        match &self.file_name {
            Some(name) => name.clone(),
            None => extension::file_name(&self.file_stem, content_type),
        }
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.remote)
    }
}

fn is_safe_segment(seg: &str) -> bool {
    seg != "."
        && seg != ".."
        && !seg.contains('%')
        && !seg.chars().any(|c| c == '\\' || c.is_control() || c.is_whitespace())
}

/// Feed-supplied names may contain spaces but never leave the output directory.
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}
