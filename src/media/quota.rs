use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::profiles::Tier;

const MB: i64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageLimits {
    pub files_per_month: i64,
    pub bytes_total: i64,
}

pub fn limits_for(tier: Tier) -> StorageLimits {
    match tier {
        Tier::Free => StorageLimits {
            files_per_month: 30,
            bytes_total: 100 * MB,
        },
        Tier::PremiumMonthly => StorageLimits {
            files_per_month: 500,
            bytes_total: 2 * 1024 * MB,
        },
        Tier::PremiumYearly => StorageLimits {
            files_per_month: 1000,
            bytes_total: 5 * 1024 * MB,
        },
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageUsage {
    pub files_this_month: i64,
    pub bytes_used: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub can_upload: bool,
    pub files_this_month: i64,
    pub files_limit: i64,
    pub bytes_used: i64,
    pub bytes_limit: i64,
}

impl QuotaStatus {
    pub fn evaluate(usage: StorageUsage, limits: StorageLimits) -> Self {
        Self {
            can_upload: usage.files_this_month < limits.files_per_month
                && usage.bytes_used < limits.bytes_total,
            files_this_month: usage.files_this_month,
            files_limit: limits.files_per_month,
            bytes_used: usage.bytes_used,
            bytes_limit: limits.bytes_total,
        }
    }
}

#[async_trait]
pub trait QuotaOracle: Send + Sync {
    async fn usage(&self, user_id: Uuid) -> anyhow::Result<StorageUsage>;
}

#[derive(Clone)]
pub struct PgQuotaOracle {
    db: PgPool,
}

impl PgQuotaOracle {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QuotaOracle for PgQuotaOracle {
    async fn usage(&self, user_id: Uuid) -> anyhow::Result<StorageUsage> {
        let (files_this_month, bytes_used) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*) FILTER (WHERE created_at >= date_trunc('month', now())),
                   COALESCE(SUM(bytes), 0)::BIGINT
              FROM photos
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .context("query storage usage")?;

        Ok(StorageUsage {
            files_this_month,
            bytes_used,
        })
    }
}
