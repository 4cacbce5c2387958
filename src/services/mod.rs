pub mod category_service;
pub mod expense_service;
pub mod income_service;
pub mod user_service;

pub use category_service::CategoryService;
pub use expense_service::ExpenseService;
pub use income_service::IncomeService;
pub use user_service::UserService;

use chrono::NaiveDate;

use crate::error::ApiError;

pub type ServiceResult<T> = Result<T, ApiError>;

/// Reject inverted date ranges on listing filters
pub(crate) fn check_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ServiceResult<()> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(ApiError::bad_request(format!(
            "Invalid date range: 'from' ({}) is after 'to' ({})",
            from, to
        ))),
        _ => Ok(()),
    }
}
