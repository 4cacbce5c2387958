use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{not_blank, positive_amount};
use crate::database::models::Income;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRequest {
    #[validate(custom(
        function = "positive_amount",
        message = "Amount must be greater than 0 with at most 2 decimal places"
    ))]
    #[schema(value_type = f64, example = 3200.0)]
    pub amount: Decimal,
    /// Employer or other payer
    #[validate(
        length(min = 1, max = 100, message = "Source must be between 1 and 100 characters"),
        custom(function = "not_blank", message = "Source must not be blank")
    )]
    pub source: String,
    #[validate(length(max = 255, message = "Description must be at most 255 characters"))]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeResponse {
    pub id: i64,
    pub user_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub source: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Income> for IncomeResponse {
    fn from(income: Income) -> Self {
        Self {
            id: income.id,
            user_id: income.user_id,
            amount: income.amount,
            source: income.source,
            description: income.description,
            date: income.received_on,
            created_at: income.created_at,
            updated_at: income.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct IncomeQuery {
    pub user_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
