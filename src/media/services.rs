use std::{io::Cursor, sync::Arc};

use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView};
use serde::Serialize;
use uuid::Uuid;

use super::{limits_for, ImagePayload, QuotaOracle, QuotaStatus, StorageUsage};
use crate::profiles::Tier;
use crate::storage::StorageClient;

const THUMB_SIDE: u32 = 320;
const THUMB_QUALITY: u8 = 70;
const CDN_URL_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    pub user_id: Uuid,
    pub tier: Tier,
    pub thumbnail: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub success: bool,
    pub path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub cdn_url: Option<String>,
    pub size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl UploadResult {
    fn failed() -> Self {
        Self::default()
    }
}

struct Processed {
    body: Bytes,
    content_type: String,
    ext: &'static str,
    dims: Option<(u32, u32)>,
    thumbnail: Option<Bytes>,
}

/// Quota-gated image persistence on top of a [`StorageClient`].
pub struct MediaStorage {
    storage: Arc<dyn StorageClient>,
    quota: Arc<dyn QuotaOracle>,
    cdn_base_url: Option<String>,
}

impl MediaStorage {
    pub fn new(
        storage: Arc<dyn StorageClient>,
        quota: Arc<dyn QuotaOracle>,
        cdn_base_url: Option<String>,
    ) -> Self {
        Self {
            storage,
            quota,
            cdn_base_url: cdn_base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    /// A failing usage query is logged and treated as zero usage.
    pub async fn check_quota(&self, user_id: Uuid, tier: Tier) -> QuotaStatus {
        let usage = match self.quota.usage(user_id).await {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(error = ?e, %user_id, "quota usage unavailable; allowing upload");
                StorageUsage::default()
            }
        };
        QuotaStatus::evaluate(usage, limits_for(tier))
    }

    /// Never errors: a failed upload comes back with `success = false`.
    pub async fn upload(&self, image: &ImagePayload, opts: UploadOptions) -> UploadResult {
        let original = image.bytes().clone();
        let mime = image.mime().to_string();
        let tier = opts.tier;
        let thumbnail = opts.thumbnail;

        let processed = tokio::task::spawn_blocking(move || process(original, &mime, tier, thumbnail))
            .await;
        let processed = match processed {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "image processing task failed");
                return UploadResult::failed();
            }
        };

        let id = Uuid::new_v4();
        let key = format!("meals/{}/{}.{}", opts.user_id, id, processed.ext);
        let size = processed.body.len() as u64;

        if let Err(e) = self
            .storage
            .put_object(&key, processed.body, &processed.content_type)
            .await
        {
            tracing::warn!(error = ?e, %key, "image upload failed");
            return UploadResult::failed();
        }

        let mut thumbnail_path = None;
        if let Some(thumb) = processed.thumbnail {
            let thumb_key = format!("meals/{}/{}_thumb.jpg", opts.user_id, id);
            match self.storage.put_object(&thumb_key, thumb, "image/jpeg").await {
                Ok(()) => thumbnail_path = Some(thumb_key),
                Err(e) => tracing::warn!(error = ?e, "thumbnail upload failed; continuing without"),
            }
        }

        let cdn_url = self.public_url(&key).await;
        tracing::info!(%key, size, "image stored");

        UploadResult {
            success: true,
            path: Some(key),
            thumbnail_path,
            cdn_url,
            size,
            width: processed.dims.map(|d| d.0),
            height: processed.dims.map(|d| d.1),
        }
    }

    /// Best-effort removal of objects written by [`Self::upload`].
    pub async fn discard(&self, upload: &UploadResult) {
        for key in upload.path.iter().chain(upload.thumbnail_path.iter()) {
            if let Err(e) = self.storage.delete_object(key).await {
                tracing::warn!(error = ?e, %key, "failed to delete orphaned object");
            }
        }
    }

    /// Client-facing URL for a stored image reference. Inline data URLs are
    /// returned unchanged.
    pub async fn url_for(&self, image_ref: &str) -> Option<String> {
        if image_ref.starts_with("data:") {
            return Some(image_ref.to_string());
        }
        self.public_url(image_ref).await
    }

    async fn public_url(&self, key: &str) -> Option<String> {
        if let Some(base) = &self.cdn_base_url {
            return Some(format!("{}/{}", base, key));
        }
        match self.storage.presign_get(key, CDN_URL_TTL_SECS).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!(error = ?e, "presign failed");
                None
            }
        }
    }
}

fn max_side(tier: Tier) -> u32 {
    if tier.is_premium() {
        1600
    } else {
        1024
    }
}

fn jpeg_quality(tier: Tier) -> u8 {
    if tier.is_premium() {
        85
    } else {
        70
    }
}

fn process(original: Bytes, mime: &str, tier: Tier, thumbnail: bool) -> Processed {
    match transcode(&original, tier, thumbnail) {
        Ok(p) => p,
        Err(e) => {
            // e.g. HEIC, which the decoder does not support
            tracing::debug!(error = %e, %mime, "storing image unprocessed");
            Processed {
                body: original,
                content_type: mime.to_string(),
                ext: ext_from_mime(mime).unwrap_or("bin"),
                dims: None,
                thumbnail: None,
            }
        }
    }
}

fn transcode(original: &[u8], tier: Tier, thumbnail: bool) -> image::ImageResult<Processed> {
    let img = image::load_from_memory(original)?;
    let side = max_side(tier);
    let (w, h) = img.dimensions();
    let img = if w > side || h > side {
        img.resize(side, side, FilterType::Lanczos3)
    } else {
        img
    };

    let body = encode_jpeg(&img, jpeg_quality(tier))?;
    let thumbnail = if thumbnail {
        Some(encode_jpeg(&img.thumbnail(THUMB_SIDE, THUMB_SIDE), THUMB_QUALITY)?)
    } else {
        None
    };

    Ok(Processed {
        body,
        content_type: "image/jpeg".into(),
        ext: "jpg",
        dims: Some(img.dimensions()),
        thumbnail,
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> image::ImageResult<Bytes> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&img.to_rgb8())?;
    Ok(Bytes::from(buf.into_inner()))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
