use base64ct::{Base64, Encoding};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;

const ACCEPTED: &[&str] = &["jpeg", "jpg", "png", "webp", "gif", "heic"];

/// A decoded `data:image/...;base64,` payload together with its original text.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    mime: String,
    bytes: Bytes,
    data_url: String,
}

impl ImagePayload {
    #[cfg(test)]
    pub fn new(mime: &str, bytes: Bytes) -> Self {
        let data_url = format!("data:{};base64,{}", mime, Base64::encode_string(&bytes));
        Self {
            mime: mime.to_string(),
            bytes,
            data_url,
        }
    }

    /// Parses a data URL. The error is a caller-facing message.
    pub fn parse(encoded: &str) -> Result<Self, String> {
        lazy_static! {
            static ref DATA_URL_RE: Regex =
                Regex::new(r"(?s)^data:(image/([A-Za-z0-9.+-]+));base64,(.+)$").unwrap();
        }
        let encoded = encoded.trim();
        let caps = DATA_URL_RE
            .captures(encoded)
            .ok_or_else(|| "Image must be a base64 data URL with an image/* type".to_string())?;

        let subtype = caps[2].to_ascii_lowercase();
        if !ACCEPTED.contains(&subtype.as_str()) {
            return Err(format!("Unsupported image type: image/{}", subtype));
        }

        let b64: String = caps[3].chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = Base64::decode_vec(&b64).map_err(|_| "Image data is not valid base64".to_string())?;
        if bytes.is_empty() {
            return Err("Image data is empty".into());
        }

        Ok(Self {
            mime: caps[1].to_ascii_lowercase(),
            bytes: Bytes::from(bytes),
            data_url: encoded.to_string(),
        })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// The encoding exactly as submitted.
    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}
