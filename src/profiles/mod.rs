mod handlers;
mod repo;
mod repo_types;

use crate::state::AppState;
use axum::Router;

#[cfg(test)]
pub use repo::fake::MemoryProfileStore;
pub use repo::{PgProfileStore, ProfileStore};
pub use repo_types::{CallerContext, Tier};

pub fn router() -> Router<AppState> {
    handlers::me_routes()
}
