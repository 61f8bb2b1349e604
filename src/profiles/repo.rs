use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{CallerContext, Tier};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when the user has no profile row.
    async fn load(&self, user_id: Uuid) -> anyhow::Result<Option<CallerContext>>;
}

#[derive(Clone)]
pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn load(&self, user_id: Uuid) -> anyhow::Result<Option<CallerContext>> {
        let row = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT tier, images_analyzed
              FROM profiles
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("load profile")?;

        Ok(row.map(|(tier, images_analyzed)| {
            let tier = tier.parse::<Tier>().unwrap_or_else(|e| {
                tracing::warn!(error = %e, %user_id, "unrecognised tier; treating as free");
                Tier::Free
            });
            CallerContext {
                user_id,
                tier,
                images_analyzed,
            }
        }))
    }
}
