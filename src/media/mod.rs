//! Submitted images: decoding, quota enforcement and durable storage.

mod payload;
mod quota;
mod services;

#[cfg(test)]
pub use quota::fake::FixedUsage;
pub use payload::ImagePayload;
pub use quota::{limits_for, PgQuotaOracle, QuotaOracle, QuotaStatus, StorageUsage};
pub use services::{MediaStorage, UploadOptions, UploadResult};
