//! ListPlansHandler - Query for the plan catalog.

use std::sync::Arc;

use crate::domain::billing::{Plan, PlanCatalog};

#[derive(Debug, Clone)]
pub struct ListPlansResult {
    pub plans: Vec<Plan>,
}

pub struct ListPlansHandler {
    catalog: Arc<PlanCatalog>,
}

impl ListPlansHandler {
    pub fn new(catalog: Arc<PlanCatalog>) -> Self {
        Self { catalog }
    }

    pub fn handle(&self) -> ListPlansResult {
        ListPlansResult {
            plans: self.catalog.plans().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PlanType;

    #[test]
    fn lists_all_plans_in_catalog_order() {
        let result = ListPlansHandler::new(Arc::new(PlanCatalog::default())).handle();

        let types: Vec<PlanType> = result.plans.iter().map(|p| p.plan_type).collect();
        assert_eq!(types, vec![PlanType::Weekly, PlanType::Monthly, PlanType::Yearly]);
        assert_eq!(result.plans.iter().filter(|p| p.is_popular).count(), 1);
    }
}
