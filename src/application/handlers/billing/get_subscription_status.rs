//! GetSubscriptionStatusHandler - Query for the caller's subscription fields.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Profile};
use crate::domain::foundation::UserId;
use crate::ports::ProfileStore;

#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusResult {
    pub profile: Profile,
}

pub struct GetSubscriptionStatusHandler {
    store: Arc<dyn ProfileStore>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<GetSubscriptionStatusResult, BillingError> {
        let profile = self
            .store
            .find_by_user_id(&query.user_id)
            .await?
            .ok_or_else(|| BillingError::profile_not_found_for_user(&query.user_id))?;

        Ok(GetSubscriptionStatusResult { profile })
    }
}
