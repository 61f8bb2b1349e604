//! The analyze pipeline and the analysis data model it produces.

mod dto;
mod enhance;
mod fallback;
mod handlers;
mod model;
mod services;

use crate::state::AppState;
use axum::Router;

pub use model::{
    Allergens, AnalysisMode, HealthInsights, ModeAnalysis, Nutrition, Portion, PremiumAnalysis,
    RawAnalysis,
};
pub use services::CachedAnalysis;

pub fn router() -> Router<AppState> {
    handlers::analyze_routes()
}
