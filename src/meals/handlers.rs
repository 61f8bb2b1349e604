use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{MealDetails, MealListItem, MealListResponse, Pagination};
use super::repo_types::MealRow;
use crate::{auth::AuthUser, error::ApiError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/:id", get(get_meal))
}

async fn to_item(state: &AppState, row: MealRow) -> MealListItem {
    let image_url = state.media.url_for(&row.image_ref).await;
    let thumbnail_url = match &row.thumbnail_ref {
        Some(t) => state.media.url_for(t).await,
        None => None,
    };
    MealListItem::from_row(row, image_url, thumbnail_url)
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<MealListResponse>, ApiError> {
    let (limit, offset) = p.clamped();
    let rows = state
        .meals
        .list_by_user(user_id, limit, offset)
        .await
        .map_err(|e| ApiError::internal("Failed to load meals", e))?;

    let mut meals = Vec::with_capacity(rows.len());
    for row in rows {
        meals.push(to_item(&state, row).await);
    }
    Ok(Json(MealListResponse {
        success: true,
        meals,
    }))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MealDetails>, ApiError> {
    let record = state
        .meals
        .get(user_id, id)
        .await
        .map_err(|e| ApiError::internal("Failed to load meal", e))?
        .ok_or(ApiError::MealNotFound)?;

    Ok(Json(MealDetails {
        meal: to_item(&state, record.meal).await,
        nutrition: record.nutrition,
        analysis: record.analysis,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::repo_types::{MealStatus, NewMeal, NewMealNutrition};
    use crate::meals::MealStore;
    use crate::state::testing::Harness;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn meal(user_id: Uuid, title: &str, image_ref: &str) -> NewMeal {
        NewMeal {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            description: "desc".into(),
            image_ref: image_ref.into(),
            thumbnail_ref: None,
            health_score: 80.0,
            ai_confidence: 0.9,
            status: MealStatus::Completed,
            tags: vec!["lunch".into()],
            analysis: serde_json::json!({ "foodName": title }),
            nutrition: NewMealNutrition {
                total_calories_kcal: 420.0,
                ..Default::default()
            },
            photo: None,
        }
    }

    async fn call(h: Harness, uri: &str, user: Uuid) -> (u16, serde_json::Value) {
        let token = h.token_for(user);
        let res = read_routes()
            .with_state(h.state)
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status().as_u16();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn list_returns_only_own_meals_newest_first() {
        let h = Harness::new();
        let store = h.meals.clone();
        let me = Uuid::new_v4();
        store.insert(&meal(me, "Oatmeal", "meals/a.jpg")).await.unwrap();
        store.insert(&meal(Uuid::new_v4(), "Not mine", "meals/b.jpg")).await.unwrap();
        store.insert(&meal(me, "Salad", "data:image/png;base64,AAAA")).await.unwrap();

        let (status, body) = call(h, "/meals", me).await;
        assert_eq!(status, 200);
        let meals = body["meals"].as_array().unwrap();
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0]["title"], "Salad");
        assert_eq!(meals[0]["imageUrl"], "data:image/png;base64,AAAA");
        assert_eq!(meals[1]["imageUrl"], "https://fake.local/meals/a.jpg");
    }

    #[tokio::test]
    async fn get_meal_includes_analysis_and_nutrition() {
        let h = Harness::new();
        let store = h.meals.clone();
        let me = Uuid::new_v4();
        let m = meal(me, "Pasta", "meals/p.jpg");
        store.insert(&m).await.unwrap();

        let (status, body) = call(h, &format!("/meals/{}", m.id), me).await;
        assert_eq!(status, 200);
        assert_eq!(body["analysis"]["foodName"], "Pasta");
        assert_eq!(body["nutrition"]["totalCaloriesKcal"], 420.0);
        assert_eq!(body["status"], "completed");
    }

    #[tokio::test]
    async fn foreign_meal_is_not_found() {
        let h = Harness::new();
        let store = h.meals.clone();
        let m = meal(Uuid::new_v4(), "Pasta", "meals/p.jpg");
        store.insert(&m).await.unwrap();

        let (status, body) = call(h, &format!("/meals/{}", m.id), Uuid::new_v4()).await;
        assert_eq!(status, 404);
        assert_eq!(body["code"], "MEAL_NOT_FOUND");
    }

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination { limit: 1000, offset: -5 };
        assert_eq!(p.clamped(), (100, 0));
    }
}
