use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::period::Month;

/// The five kinds of financial record a transaction can reconcile against.
/// `InternalTransfer` is synthetic — detected from the transaction itself,
/// never stored as a separate entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    InternalTransfer,
    Salary,
    Subscription,
    Expense,
    OrderPayment,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::InternalTransfer => "internal_transfer",
            EntityKind::Salary => "salary",
            EntityKind::Subscription => "subscription",
            EntityKind::Expense => "expense",
            EntityKind::OrderPayment => "order_payment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal_transfer" => Ok(EntityKind::InternalTransfer),
            "salary" => Ok(EntityKind::Salary),
            "subscription" => Ok(EntityKind::Subscription),
            "expense" => Ok(EntityKind::Expense),
            "order_payment" => Ok(EntityKind::OrderPayment),
            other => Err(format!("Unknown entity kind: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("Unknown payment status: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salary {
    pub id: i64,
    pub employee_name: String,
    pub month: Month,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub paid_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionCadence {
    Monthly,
    Yearly,
}

impl SubscriptionCadence {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionCadence::Monthly => "monthly",
            SubscriptionCadence::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for SubscriptionCadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(SubscriptionCadence::Monthly),
            "yearly" => Ok(SubscriptionCadence::Yearly),
            other => Err(format!("Unknown cadence: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub platform: String,
    pub plan: String,
    pub amount_cents: i64,
    pub foreign_amount_cents: Option<i64>,
    pub foreign_currency: Option<String>,
    pub cadence: SubscriptionCadence,
    pub active: bool,
    pub auto_renew: bool,
    pub next_renewal: Option<NaiveDate>,
    /// Known billing-descriptor aliases, e.g. "AMAZON WEB SERVICES" for AWS.
    pub alt_names: Vec<String>,
    /// Optional regex over the description; a hit earns the pattern bonus.
    pub match_pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub category: String,
    pub description: String,
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayment {
    pub id: i64,
    pub order_ref: String,
    pub amount_cents: i64,
    pub expected_date: Option<NaiveDate>,
    pub settled: bool,
}
