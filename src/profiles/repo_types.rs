use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription level of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    PremiumMonthly,
    PremiumYearly,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::PremiumMonthly => "premium_monthly",
            Tier::PremiumYearly => "premium_yearly",
        }
    }

    pub fn is_premium(&self) -> bool {
        !matches!(self, Tier::Free)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "free" => Ok(Tier::Free),
            "premium_monthly" => Ok(Tier::PremiumMonthly),
            "premium_yearly" => Ok(Tier::PremiumYearly),
            other => anyhow::bail!("unknown tier {:?}", other),
        }
    }
}

/// Per-request view of the caller, loaded once after authentication.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerContext {
    pub user_id: Uuid,
    pub tier: Tier,
    pub images_analyzed: i64, // lifetime counter, display only
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_parses_and_prints() {
        for t in [Tier::Free, Tier::PremiumMonthly, Tier::PremiumYearly] {
            assert_eq!(t.as_str().parse::<Tier>().unwrap(), t);
        }
        assert!("gold".parse::<Tier>().is_err());
        assert!(!Tier::Free.is_premium());
        assert!(Tier::PremiumYearly.is_premium());
        assert_eq!(serde_json::to_string(&Tier::PremiumMonthly).unwrap(), "\"premium_monthly\"");
    }
}
