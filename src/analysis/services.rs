use std::time::Duration;

use axum::{extract::FromRef, http::HeaderMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dto::{AnalysisView, AnalyzeRequest, AnalyzeResponse, ResponseMetadata};
use super::enhance::enhance;
use super::fallback::{fallback_analysis, FALLBACK_MODEL};
use super::model::{AnalysisMode, AnalysisResult};
use crate::auth::{authenticate, JwtKeys};
use crate::cache::fingerprint;
use crate::error::ApiError;
use crate::meals::{MealStatus, NewMeal, NewMealNutrition, NewPhoto};
use crate::media::{ImagePayload, UploadOptions, UploadResult};
use crate::profiles::{CallerContext, Tier};
use crate::state::AppState;

/// What the response cache keeps per fingerprint.
#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub analysis: AnalysisResult,
    pub meal_id: Uuid,
    pub model: String,
    /// Caller whose request produced `meal_id`.
    pub owner: Uuid,
}

/// Runs one analyze request end to end.
///
/// Steps run strictly in order: validate, authenticate, load profile,
/// rate-limit, cache lookup, quota check, vision, enhance, enrich, upload,
/// persist, cache store. A cache hit returns straight away; when the entry
/// was produced by another caller, the cached analysis is recorded as a new
/// meal of the current caller first, without vision or upload. Vision failures
/// other than upstream throttling are absorbed into the fallback analysis
/// and upload failures into an inline image; a persistence failure is not.
pub async fn analyze(
    state: &AppState,
    headers: &HeaderMap,
    req: AnalyzeRequest,
) -> Result<AnalyzeResponse, ApiError> {
    let (image, mode) = validate(req)?;

    let keys = JwtKeys::from_ref(state);
    let user_id = authenticate(&keys, headers)?;

    let caller = state
        .profiles
        .load(user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to load profile", e))?
        .ok_or(ApiError::ProfileNotFound)?;
    let tier = caller.tier;

    let limit = state.config.rate_limits.for_tier(tier);
    if !state.limiter.allow(user_id, limit).await {
        let wait = state.limiter.remaining_time(user_id).await;
        info!(%user_id, %tier, "analyze rate limited");
        return Err(ApiError::RateLimited {
            retry_after_secs: ceil_secs(wait),
        });
    }

    let fp = fingerprint(image.bytes(), mode, tier);
    if let Some(hit) = state.analysis_cache.get(&fp).await {
        debug!(%user_id, fingerprint = %fp, "analysis cache hit");
        if hit.owner == user_id {
            return Ok(respond(&hit.analysis, hit.meal_id, hit.model, tier, true));
        }
        let meal = meal_record(
            &caller,
            &hit.analysis,
            &image,
            &UploadResult::default(),
            MealStatus::Completed,
        );
        let meal_id = meal.id;
        state
            .meals
            .insert(&meal)
            .await
            .map_err(|e| ApiError::internal("Failed to save meal", e))?;
        info!(%user_id, %meal_id, %tier, %mode, "cached analysis recorded for caller");
        return Ok(respond(&hit.analysis, meal_id, hit.model, tier, true));
    }

    let quota = state.media.check_quota(user_id, tier).await;
    if !quota.can_upload {
        info!(%user_id, %tier, files = quota.files_this_month, "storage quota exceeded");
        return Err(ApiError::QuotaExceeded(quota));
    }

    let (raw, model, status) = match state.vision.analyze(&image, mode, tier).await {
        Ok(raw) => (raw, state.vision.model().to_string(), MealStatus::Completed),
        Err(e) if e.is_rate_limited() => {
            warn!(%user_id, "vision provider throttled request");
            return Err(ApiError::UpstreamRateLimited);
        }
        Err(e) => {
            warn!(error = %e, %user_id, %mode, "vision analysis failed; using fallback");
            (fallback_analysis(), FALLBACK_MODEL.to_string(), MealStatus::Degraded)
        }
    };

    let mut result = enhance(raw);
    if let Some(bundle) = state.nutrition.lookup(&result.food_name).await {
        result.nutrition.merge(&bundle);
    }

    let upload = state
        .media
        .upload(
            &image,
            UploadOptions {
                user_id,
                tier,
                thumbnail: true,
            },
        )
        .await;
    if !upload.success {
        warn!(%user_id, "image upload failed; storing inline image");
    }

    let meal = meal_record(&caller, &result, &image, &upload, status);
    let meal_id = meal.id;
    if let Err(e) = state.meals.insert(&meal).await {
        state.media.discard(&upload).await;
        return Err(ApiError::internal("Failed to save meal", e));
    }

    // a degraded answer must not shadow a real one for the whole TTL
    if status == MealStatus::Completed {
        state
            .analysis_cache
            .put(
                fp,
                CachedAnalysis {
                    analysis: result.clone(),
                    meal_id,
                    model: model.clone(),
                    owner: user_id,
                },
            )
            .await;
    }

    info!(%user_id, %meal_id, %tier, %mode, model = %model, "meal analyzed");
    Ok(respond(&result, meal_id, model, tier, false))
}

fn validate(req: AnalyzeRequest) -> Result<(ImagePayload, AnalysisMode), ApiError> {
    let raw = req
        .image
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Image is required".into()))?;
    let image = ImagePayload::parse(&raw).map_err(ApiError::Validation)?;
    let mode = match req.mode.as_deref().map(str::trim) {
        None | Some("") => AnalysisMode::default(),
        Some(m) => m.parse::<AnalysisMode>().map_err(ApiError::Validation)?,
    };
    Ok((image, mode))
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn respond(
    result: &AnalysisResult,
    meal_id: Uuid,
    model: String,
    tier: Tier,
    cached: bool,
) -> AnalyzeResponse {
    AnalyzeResponse {
        success: true,
        meal_id,
        analysis: AnalysisView::shaped(result, tier),
        metadata: ResponseMetadata {
            model,
            tier,
            cached,
        },
    }
}

fn meal_record(
    caller: &CallerContext,
    result: &AnalysisResult,
    image: &ImagePayload,
    upload: &UploadResult,
    status: MealStatus,
) -> NewMeal {
    let tier = caller.tier;
    let view = AnalysisView::shaped(result, tier);
    let n = &result.nutrition;

    // micro-nutrients are part of the paid detail
    let (fiber, sugar, sodium, micros) = if tier.is_premium() {
        let micros = serde_json::json!({
            "fiber": n.fiber,
            "sugar": n.sugar,
            "sodium": n.sodium,
            "cholesterol": n.cholesterol,
            "saturatedFat": n.saturated_fat,
            "transFat": n.trans_fat,
        });
        (n.fiber, n.sugar, n.sodium, Some(micros))
    } else {
        (None, None, None, None)
    };

    let stored = upload.success.then(|| upload.path.clone()).flatten();
    let photo = stored.as_ref().map(|key| NewPhoto {
        s3_key: key.clone(),
        thumbnail_key: upload.thumbnail_path.clone(),
        bytes: upload.size as i64,
        width: upload.width.map(|w| w as i32),
        height: upload.height.map(|h| h as i32),
    });

    NewMeal {
        id: Uuid::new_v4(),
        user_id: caller.user_id,
        title: result.food_name.clone(),
        description: result.description.clone(),
        image_ref: stored.unwrap_or_else(|| image.data_url().to_string()),
        thumbnail_ref: upload.thumbnail_path.clone().filter(|_| upload.success),
        health_score: result.health_insights.score,
        ai_confidence: result.confidence,
        status,
        tags: result.tags.clone(),
        analysis: serde_json::to_value(&view).unwrap_or(serde_json::Value::Null),
        nutrition: NewMealNutrition {
            total_calories_kcal: n.calories,
            protein_g: n.protein,
            fat_g: n.fat,
            carbs_g: n.carbs,
            sodium_mg: sodium,
            sugar_g: sugar,
            fiber_g: fiber,
            micros,
            ai_raw: serde_json::to_value(result).unwrap_or(serde_json::Value::Null),
            global_score: result.health_insights.score,
        },
        photo,
    }
}
