//! Vision inference: turns a meal photo into a [`RawAnalysis`].

mod mock;
mod openai;
pub mod prompt;

use async_trait::async_trait;
use thiserror::Error;

use crate::analysis::{AnalysisMode, RawAnalysis};
use crate::media::ImagePayload;
use crate::profiles::Tier;

pub use mock::MockVision;
pub use openai::OpenAiVision;

#[derive(Error, Debug)]
pub enum VisionError {
    /// The model provider throttled us; worth retrying shortly.
    #[error("vision provider rate limited the request")]
    RateLimited,

    #[error("vision provider unavailable: {0}")]
    Unavailable(String),

    #[error("vision response malformed: {0}")]
    Malformed(String),
}

impl VisionError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, VisionError::RateLimited)
    }
}

impl From<reqwest::Error> for VisionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            VisionError::Unavailable(format!("timed out: {}", e))
        } else {
            VisionError::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
pub trait AnalysisSource: Send + Sync {
    async fn analyze(
        &self,
        image: &ImagePayload,
        mode: AnalysisMode,
        tier: Tier,
    ) -> Result<RawAnalysis, VisionError>;

    /// Model name reported in response metadata.
    fn model(&self) -> &str;
}
