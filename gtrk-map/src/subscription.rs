//! Subscription record
//!
//! Stored as JSON under `groupie_subscription`. Payment handling is not part
//! of this crate; `subscribe` only records the chosen plan.

use chrono::{DateTime, Utc};
use gtrk_common::db::kv;
use gtrk_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

pub const SUBSCRIPTION_KEY: &str = "groupie_subscription";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub plan: String,
    pub plan_name: String,
    pub amount: f64,
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
    pub status: SubscriptionStatus,
}

/// Record an active subscription, replacing any previous one
pub async fn subscribe(
    pool: &SqlitePool,
    plan: &str,
    plan_name: &str,
    amount: f64,
    email: &str,
) -> Result<Subscription> {
    if plan.trim().is_empty() {
        return Err(Error::InvalidInput("plan is required".to_string()));
    }
    if !email.contains('@') {
        return Err(Error::InvalidInput(format!("invalid email '{}'", email)));
    }
    if amount.is_nan() || amount <= 0.0 {
        return Err(Error::InvalidInput(format!("invalid amount {}", amount)));
    }

    let subscription = Subscription {
        plan: plan.to_string(),
        plan_name: plan_name.to_string(),
        amount,
        email: email.to_string(),
        subscribed_at: Utc::now(),
        status: SubscriptionStatus::Active,
    };

    kv::set_json(pool, SUBSCRIPTION_KEY, &subscription).await?;
    info!(plan = %plan, "Subscription recorded");

    Ok(subscription)
}

pub async fn current(pool: &SqlitePool) -> Result<Option<Subscription>> {
    kv::get_json(pool, SUBSCRIPTION_KEY).await
}

/// Mark the stored subscription cancelled
pub async fn cancel(pool: &SqlitePool) -> Result<Subscription> {
    let mut subscription = current(pool)
        .await?
        .ok_or_else(|| Error::NotFound("no subscription".to_string()))?;

    subscription.status = SubscriptionStatus::Cancelled;
    kv::set_json(pool, SUBSCRIPTION_KEY, &subscription).await?;
    info!(plan = %subscription.plan, "Subscription cancelled");

    Ok(subscription)
}
