mod dto;
mod handlers;
mod repo;
mod repo_types;

use crate::state::AppState;
use axum::Router;

#[cfg(test)]
pub use repo::fake::MemoryMealStore;
pub use repo::{MealStore, PgMealStore};
pub use repo_types::{MealStatus, NewMeal, NewMealNutrition, NewPhoto};

pub fn router() -> Router<AppState> {
    handlers::read_routes()
}
