//! Custom images dropped onto the card, carried as data URLs.

use std::{fmt, fs, path::Path, str::FromStr};

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CardError;

static DATA_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(image/[a-z0-9.+-]+);base64,[A-Za-z0-9+/]+={0,2}$")
        .expect("invalid data URL regex")
});

/// A validated `data:image/...;base64,` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataUrl(String);

impl DataUrl {
    /// Validate a data URL handed over by the drop collaborator.
    pub fn parse(value: impl Into<String>) -> Result<Self, CardError> {
        let value = value.into();
        let trimmed = value.trim();
        if !DATA_URL_RE.is_match(trimmed) {
            return Err(CardError::InvalidDataUrl(preview(trimmed)));
        }
        match base64::engine::general_purpose::STANDARD.decode(payload(trimmed)) {
            Ok(bytes) if !bytes.is_empty() => Ok(Self(trimmed.to_string())),
            _ => Err(CardError::InvalidDataUrl(preview(trimmed))),
        }
    }

    /// Encode raw image bytes with the given MIME type.
    pub fn encode(mime: &str, bytes: &[u8]) -> Result<Self, CardError> {
        let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self::parse(format!("data:{mime};base64,{payload}"))
    }

    /// MIME type declared by the URL (`image/png`).
    pub fn mime(&self) -> &str {
        DATA_URL_RE
            .captures(&self.0)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or("image/png")
    }

    /// Full URL text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decoded size in bytes.
    pub fn byte_len(&self) -> usize {
        let payload = payload(&self.0);
        let padding = payload.bytes().rev().take_while(|b| *b == b'=').count();
        (payload.len() / 4 * 3).saturating_sub(padding)
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DataUrl {
    type Err = CardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for DataUrl {
    type Error = CardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DataUrl> for String {
    fn from(value: DataUrl) -> Self {
        value.0
    }
}

/// Read an image file from disk into a data URL.
pub fn load_image(path: impl AsRef<Path>) -> Result<DataUrl> {
    let path = path.as_ref();
    let mime = mime_for(path)
        .ok_or_else(|| anyhow!("unsupported image type: {}", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if bytes.is_empty() {
        return Err(anyhow!("image file is empty: {}", path.display()));
    }
    DataUrl::encode(mime, &bytes).with_context(|| format!("failed to encode {}", path.display()))
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

fn payload(url: &str) -> &str {
    url.split_once(',').map(|(_, data)| data).unwrap_or("")
}

fn preview(value: &str) -> String {
    const LIMIT: usize = 32;
    match value.char_indices().nth(LIMIT) {
        Some((index, _)) => format!("{}…", &value[..index]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn accepts_base64_image_urls() -> Result<(), CardError> {
        let url = DataUrl::parse("data:image/png;base64,iVBORw0KGgo=")?;
        assert_eq!(url.mime(), "image/png");
        assert_eq!(url.byte_len(), 8);
        Ok(())
    }

    #[test]
    fn rejects_non_image_urls() {
        for input in [
            "img/QuantumContour/Fire/P- Fire - S0.png",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png,raw",
        ] {
            assert!(matches!(
                DataUrl::parse(input),
                Err(CardError::InvalidDataUrl(_))
            ));
        }
    }

    #[test]
    fn rejects_truncated_payloads() {
        for input in [
            "data:image/png;base64,A==",
            "data:image/png;base64,A",
            "data:image/png;base64,iVBORw0KGgo",
        ] {
            assert!(
                matches!(DataUrl::parse(input), Err(CardError::InvalidDataUrl(_))),
                "{input} accepted"
            );
        }
    }

    #[test]
    fn byte_len_matches_decoded_size() -> Result<(), CardError> {
        let cases: [&[u8]; 4] = [&[0x89], &[0x89, 0x50], &[0x89, 0x50, 0x4E], &[0xFF; 7]];
        for bytes in cases {
            let url = DataUrl::encode("image/png", bytes)?;
            assert_eq!(url.byte_len(), bytes.len());
        }
        Ok(())
    }

    #[test]
    fn loads_files_with_mime_from_extension() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("art.JPG");
        fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0])?;

        let url = load_image(&path)?;
        assert_eq!(url.mime(), "image/jpeg");
        assert_eq!(url.as_str(), "data:image/jpeg;base64,/9j/4A==");

        let unsupported = dir.path().join("art.bmp");
        fs::write(&unsupported, [1, 2, 3])?;
        assert!(load_image(&unsupported).is_err());
        Ok(())
    }
}
