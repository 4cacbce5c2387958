use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Salary or other income received by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Income {
    pub id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub source: String,
    pub description: Option<String>,
    pub received_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIncome {
    pub user_id: i64,
    pub amount: Decimal,
    pub source: String,
    pub description: Option<String>,
    pub received_on: NaiveDate,
}
