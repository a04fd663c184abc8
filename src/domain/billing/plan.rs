//! Plan catalog.
//!
//! The catalog is a static, in-process table. It is never persisted and is
//! consulted by checkout and change-plan to turn a human-facing plan selector
//! into the price reference the payment processor understands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::BillingError;

/// Billing option a user can subscribe to.
///
/// Serialized as `weekly` / `monthly` / `yearly`; this is also the value
/// stored in a profile's `subscription_tier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Weekly,
    Monthly,
    Yearly,
}

impl PlanType {
    pub const ALL: [PlanType; 3] = [PlanType::Weekly, PlanType::Monthly, PlanType::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Weekly => "weekly",
            PlanType::Monthly => "monthly",
            PlanType::Yearly => "yearly",
        }
    }

    /// Billing interval as the processor names it.
    pub fn interval(&self) -> &'static str {
        match self {
            PlanType::Weekly => "week",
            PlanType::Monthly => "month",
            PlanType::Yearly => "year",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = BillingError;

    /// Accepts the plan name or the bare interval (`month`), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(PlanType::Weekly),
            "monthly" | "month" => Ok(PlanType::Monthly),
            "yearly" | "year" | "annual" => Ok(PlanType::Yearly),
            _ => Err(BillingError::invalid_plan(s)),
        }
    }
}

/// Processor price references for each plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceIds {
    pub weekly: String,
    pub monthly: String,
    pub yearly: String,
}

impl Default for PriceIds {
    fn default() -> Self {
        Self {
            weekly: "price_weekly".to_string(),
            monthly: "price_monthly".to_string(),
            yearly: "price_yearly".to_string(),
        }
    }
}

/// One offered plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub plan_type: PlanType,
    pub price_id: String,
    pub name: String,
    /// Price in minor currency units.
    pub amount_cents: u32,
    pub currency: String,
    pub interval: String,
    pub description: String,
    pub features: Vec<String>,
    pub is_popular: bool,
}

impl Plan {
    /// Price in major currency units, for display.
    pub fn amount(&self) -> f64 {
        f64::from(self.amount_cents) / 100.0
    }
}

/// The table of plans on offer.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    /// Builds the standard three-plan catalog with the given price references.
    pub fn new(prices: PriceIds) -> Self {
        let plans = vec![
            Plan {
                plan_type: PlanType::Weekly,
                price_id: prices.weekly,
                name: "Weekly Plan".to_string(),
                amount_cents: 999,
                currency: "USD".to_string(),
                interval: PlanType::Weekly.interval().to_string(),
                description: "Great if you want to try the service before committing longer."
                    .to_string(),
                features: features(&[
                    "Unlimited AI meal plans",
                    "AI nutrition insights",
                    "Cancel anytime",
                ]),
                is_popular: false,
            },
            Plan {
                plan_type: PlanType::Monthly,
                price_id: prices.monthly,
                name: "Monthly Plan".to_string(),
                amount_cents: 3999,
                currency: "USD".to_string(),
                interval: PlanType::Monthly.interval().to_string(),
                description: "Perfect for ongoing, month-to-month meal planning and features."
                    .to_string(),
                features: features(&[
                    "Unlimited AI meal plans",
                    "Priority AI support",
                    "Cancel anytime",
                ]),
                is_popular: true,
            },
            Plan {
                plan_type: PlanType::Yearly,
                price_id: prices.yearly,
                name: "Yearly Plan".to_string(),
                amount_cents: 29999,
                currency: "USD".to_string(),
                interval: PlanType::Yearly.interval().to_string(),
                description: "Best value for those committed to improving their diet long-term."
                    .to_string(),
                features: features(&[
                    "Unlimited AI meal plans",
                    "All premium features",
                    "Save over 40% compared to monthly",
                ]),
                is_popular: false,
            },
        ];
        Self { plans }
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn get(&self, plan_type: PlanType) -> Option<&Plan> {
        self.plans.iter().find(|p| p.plan_type == plan_type)
    }

    /// Resolves a raw plan selector from a request.
    ///
    /// # Errors
    ///
    /// `InvalidPlan` if the selector names no offered plan.
    pub fn resolve(&self, selector: &str) -> Result<&Plan, BillingError> {
        let plan_type: PlanType = selector.parse()?;
        self.get(plan_type)
            .ok_or_else(|| BillingError::invalid_plan(selector))
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new(PriceIds::default())
    }
}

fn features(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_type_parses_names_and_intervals() {
        assert_eq!("monthly".parse::<PlanType>().unwrap(), PlanType::Monthly);
        assert_eq!("month".parse::<PlanType>().unwrap(), PlanType::Monthly);
        assert_eq!(" Weekly ".parse::<PlanType>().unwrap(), PlanType::Weekly);
        assert_eq!("year".parse::<PlanType>().unwrap(), PlanType::Yearly);
    }

    #[test]
    fn plan_type_rejects_unknown() {
        let err = "lifetime".parse::<PlanType>().unwrap_err();
        assert!(matches!(err, BillingError::InvalidPlan(ref p) if p == "lifetime"));
    }

    #[test]
    fn plan_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlanType::Yearly).unwrap(), "\"yearly\"");
    }

    #[test]
    fn catalog_has_one_plan_per_type() {
        let catalog = PlanCatalog::default();
        for plan_type in PlanType::ALL {
            assert_eq!(catalog.get(plan_type).unwrap().plan_type, plan_type);
        }
        assert_eq!(catalog.plans().len(), 3);
    }

    #[test]
    fn only_monthly_is_popular() {
        let catalog = PlanCatalog::default();
        let popular: Vec<_> = catalog.plans().iter().filter(|p| p.is_popular).collect();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].plan_type, PlanType::Monthly);
    }

    #[test]
    fn resolve_uses_configured_price_ids() {
        let catalog = PlanCatalog::new(PriceIds {
            weekly: "price_w".to_string(),
            monthly: "price_m".to_string(),
            yearly: "price_y".to_string(),
        });
        assert_eq!(catalog.resolve("monthly").unwrap().price_id, "price_m");
        assert_eq!(catalog.get(PlanType::Yearly).unwrap().price_id, "price_y");
    }

    #[test]
    fn amount_is_in_major_units() {
        let catalog = PlanCatalog::default();
        assert!((catalog.get(PlanType::Weekly).unwrap().amount() - 9.99).abs() < f64::EPSILON);
    }
}
