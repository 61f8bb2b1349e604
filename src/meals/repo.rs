use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{MealNutrition, MealRecord, MealRow, NewMeal};

#[async_trait]
pub trait MealStore: Send + Sync {
    /// Writes the meal, its nutrition row, the photo row and bumps the
    /// owner's `images_analyzed` counter. All or nothing.
    async fn insert(&self, meal: &NewMeal) -> anyhow::Result<()>;

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealRow>>;

    /// `Ok(None)` when the meal does not exist or belongs to someone else.
    async fn get(&self, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<MealRecord>>;
}

#[derive(sqlx::FromRow)]
struct MealWithAnalysis {
    #[sqlx(flatten)]
    meal: MealRow,
    analysis: serde_json::Value,
}

#[derive(Clone)]
pub struct PgMealStore {
    db: PgPool,
}

impl PgMealStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealStore for PgMealStore {
    async fn insert(&self, meal: &NewMeal) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        sqlx::query(
            r#"
            INSERT INTO meals (id, user_id, title, description, image_ref, thumbnail_ref,
                               health_score, ai_confidence, status, tags, analysis)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(meal.id)
        .bind(meal.user_id)
        .bind(&meal.title)
        .bind(&meal.description)
        .bind(&meal.image_ref)
        .bind(&meal.thumbnail_ref)
        .bind(meal.health_score)
        .bind(meal.ai_confidence)
        .bind(meal.status.as_str())
        .bind(&meal.tags)
        .bind(&meal.analysis)
        .execute(&mut *tx)
        .await
        .context("insert meal")?;

        let n = &meal.nutrition;
        sqlx::query(
            r#"
            INSERT INTO meal_nutrition (meal_id, total_calories_kcal, protein_g, fat_g, carbs_g,
                                        sodium_mg, sugar_g, fiber_g, micros, ai_raw, global_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(meal.id)
        .bind(n.total_calories_kcal)
        .bind(n.protein_g)
        .bind(n.fat_g)
        .bind(n.carbs_g)
        .bind(n.sodium_mg)
        .bind(n.sugar_g)
        .bind(n.fiber_g)
        .bind(&n.micros)
        .bind(&n.ai_raw)
        .bind(n.global_score)
        .execute(&mut *tx)
        .await
        .context("insert meal_nutrition")?;

        if let Some(photo) = &meal.photo {
            sqlx::query(
                r#"
                INSERT INTO photos (id, user_id, meal_id, s3_key, thumbnail_key, bytes, width, height, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'ready')
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(meal.user_id)
            .bind(meal.id)
            .bind(&photo.s3_key)
            .bind(&photo.thumbnail_key)
            .bind(photo.bytes)
            .bind(photo.width)
            .bind(photo.height)
            .execute(&mut *tx)
            .await
            .context("insert photo")?;
        }

        let updated = sqlx::query(
            r#"UPDATE profiles SET images_analyzed = images_analyzed + 1 WHERE user_id = $1"#,
        )
        .bind(meal.user_id)
        .execute(&mut *tx)
        .await
        .context("bump images_analyzed")?;
        if updated.rows_affected() == 0 {
            anyhow::bail!("profile {} vanished during analysis", meal.user_id);
        }

        tx.commit().await.context("commit meal")?;
        tracing::debug!(meal_id = %meal.id, user_id = %meal.user_id, "meal persisted");
        Ok(())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealRow>> {
        let rows = sqlx::query_as::<_, MealRow>(
            r#"
            SELECT id, title, description, image_ref, thumbnail_ref,
                   health_score, ai_confidence, status, tags, created_at
            FROM meals
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list meals")?;
        Ok(rows)
    }

    async fn get(&self, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<MealRecord>> {
        let row = sqlx::query_as::<_, MealWithAnalysis>(
            r#"
            SELECT id, title, description, image_ref, thumbnail_ref,
                   health_score, ai_confidence, status, tags, created_at, analysis
            FROM meals
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(meal_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get meal")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let nutrition = sqlx::query_as::<_, MealNutrition>(
            r#"
            SELECT total_calories_kcal, protein_g, fat_g, carbs_g, sodium_mg,
                   sugar_g, fiber_g, micros, global_score
            FROM meal_nutrition
            WHERE meal_id = $1
            "#,
        )
        .bind(meal_id)
        .fetch_optional(&self.db)
        .await
        .context("get meal nutrition")?;

        Ok(Some(MealRecord {
            meal: row.meal,
            analysis: row.analysis,
            nutrition,
        }))
    }
}
