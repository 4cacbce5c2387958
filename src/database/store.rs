use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use super::models::{Category, Expense, Income, NewCategory, NewExpense, NewIncome, NewUser, User};

/// Errors raised by every store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint conflict
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Foreign key or check constraint violation
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Filters for expense and income listings. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub user_id: Option<i64>,
    pub category_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn matches(&self, user_id: i64, category_id: Option<i64>, date: NaiveDate) -> bool {
        self.user_id.map_or(true, |u| u == user_id)
            && self.category_id.map_or(true, |c| Some(c) == category_id)
            && self.from.map_or(true, |from| date >= from)
            && self.to.map_or(true, |to| date <= to)
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;
    /// Persist every mutable column of `user`
    async fn save_user(&self, user: &User) -> Result<User, StoreError>;
    /// Removes the user together with their expenses and incomes
    async fn delete_user(&self, id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn find_category(&self, id: i64) -> Result<Option<Category>, StoreError>;
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn list_subcategories(&self, parent_id: i64) -> Result<Vec<Category>, StoreError>;
    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError>;
    async fn save_category(&self, category: &Category) -> Result<Category, StoreError>;
    async fn delete_category(&self, id: i64) -> Result<bool, StoreError>;
    async fn count_category_expenses(&self, id: i64) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn find_expense(&self, id: i64) -> Result<Option<Expense>, StoreError>;
    async fn list_expenses(&self, filter: &RecordFilter) -> Result<Vec<Expense>, StoreError>;
    async fn insert_expense(&self, expense: NewExpense) -> Result<Expense, StoreError>;
    async fn save_expense(&self, expense: &Expense) -> Result<Expense, StoreError>;
    async fn delete_expense(&self, id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait IncomeStore: Send + Sync {
    async fn find_income(&self, id: i64) -> Result<Option<Income>, StoreError>;
    async fn list_incomes(&self, filter: &RecordFilter) -> Result<Vec<Income>, StoreError>;
    async fn insert_income(&self, income: NewIncome) -> Result<Income, StoreError>;
    async fn save_income(&self, income: &Income) -> Result<Income, StoreError>;
    async fn delete_income(&self, id: i64) -> Result<bool, StoreError>;
}

/// Everything the service needs from its datastore
#[async_trait]
pub trait Store: UserStore + CategoryStore + ExpenseStore + IncomeStore {
    /// Backend name reported by the info endpoint
    fn backend(&self) -> &'static str;

    /// Connectivity check for the health endpoint
    async fn ping(&self) -> Result<(), StoreError>;
}
