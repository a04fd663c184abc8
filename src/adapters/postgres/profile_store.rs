//! PostgreSQL implementation of ProfileStore.
//!
//! One row per user in `profiles`. Partial updates are built with
//! `QueryBuilder` so only the touched columns are written, and the row is
//! returned in the same round trip.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::billing::{PlanType, Profile, ProfileKey, ProfileUpdate};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::ports::ProfileStore;

const PROFILE_COLUMNS: &str = "user_id, stripe_subscription_id, subscription_tier, \
                               subscription_active, created_at, updated_at";

/// PostgreSQL implementation of the ProfileStore port.
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a profile.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    stripe_subscription_id: Option<String>,
    subscription_tier: Option<String>,
    subscription_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?;
        let subscription_id = row
            .stripe_subscription_id
            .map(SubscriptionId::new)
            .transpose()
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid stripe_subscription_id: {}", e),
                )
            })?;
        let tier = row.subscription_tier.as_deref().map(parse_tier).transpose()?;

        Ok(Profile::reconstitute(
            user_id,
            subscription_id,
            tier,
            row.subscription_active,
            Timestamp::from_datetime(row.created_at),
            Timestamp::from_datetime(row.updated_at),
        ))
    }
}

fn parse_tier(s: &str) -> Result<PlanType, DomainError> {
    match s {
        "weekly" => Ok(PlanType::Weekly),
        "monthly" => Ok(PlanType::Monthly),
        "yearly" => Ok(PlanType::Yearly),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid subscription_tier value: {}", s),
        )),
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

/// Builds `UPDATE profiles SET ... WHERE <key> RETURNING ...`.
///
/// `updated_at` is always refreshed, so an empty update still returns the
/// row and reports a missing profile.
fn build_update<'a>(key: &ProfileKey, update: &ProfileUpdate) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE profiles SET updated_at = NOW()");

    if let Some(subscription_id) = &update.stripe_subscription_id {
        qb.push(", stripe_subscription_id = ")
            .push_bind(subscription_id.as_ref().map(|id| id.as_str().to_string()));
    }
    if let Some(tier) = update.subscription_tier {
        qb.push(", subscription_tier = ")
            .push_bind(tier.map(|t| t.as_str().to_string()));
    }
    if let Some(active) = update.subscription_active {
        qb.push(", subscription_active = ").push_bind(active);
    }

    match key {
        ProfileKey::UserId(id) => {
            qb.push(" WHERE user_id = ").push_bind(id.as_str().to_string());
        }
        ProfileKey::SubscriptionId(id) => {
            qb.push(" WHERE stripe_subscription_id = ")
                .push_bind(id.as_str().to_string());
        }
    }
    qb.push(" RETURNING ").push(PROFILE_COLUMNS);
    qb
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch profile", e))?;

        row.map(Profile::try_from).transpose()
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<Profile>, DomainError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM profiles WHERE stripe_subscription_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(subscription_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch profile", e))?;

        row.map(Profile::try_from).transpose()
    }

    async fn update(
        &self,
        key: &ProfileKey,
        update: &ProfileUpdate,
    ) -> Result<Profile, DomainError> {
        let mut qb = build_update(key, update);
        let row: Option<ProfileRow> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.constraint() == Some("profiles_stripe_subscription_id_key") {
                        return DomainError::new(
                            ErrorCode::DatabaseError,
                            "Subscription is already bound to another profile",
                        );
                    }
                }
                db_error("update profile", e)
            })?;

        match row {
            Some(row) => Profile::try_from(row),
            None => Err(DomainError::new(
                ErrorCode::ProfileNotFound,
                format!("No profile for {}", key),
            )),
        }
    }

    async fn create(&self, profile: &Profile) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (
                user_id, stripe_subscription_id, subscription_tier,
                subscription_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(profile.user_id.as_str())
        .bind(profile.stripe_subscription_id.as_ref().map(|id| id.as_str()))
        .bind(profile.subscription_tier.map(|t| t.as_str()))
        .bind(profile.subscription_active)
        .bind(profile.created_at.as_datetime())
        .bind(profile.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("profiles_pkey") {
                    return DomainError::new(
                        ErrorCode::ProfileExists,
                        format!("Profile already exists for user {}", profile.user_id),
                    );
                }
            }
            db_error("create profile", e)
        })?;

        Ok(())
    }
}
