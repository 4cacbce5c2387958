use std::sync::Arc;
use tracing::debug;

use super::{check_date_range, ServiceResult};
use crate::api::expenses::{ExpenseQuery, ExpenseRequest};
use crate::auth::Policy;
use crate::database::models::{Expense, NewExpense};
use crate::database::{CategoryStore, ExpenseStore, RecordFilter, Store, UserStore};
use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::state::AppState;

pub struct ExpenseService {
    store: Arc<dyn Store>,
}

impl ExpenseService {
    pub fn new(state: &AppState) -> Self {
        Self { store: state.store.clone() }
    }

    /// Record an expense for `owner_id`
    pub async fn create(&self, owner_id: i64, request: ExpenseRequest) -> ServiceResult<Expense> {
        self.ensure_user(owner_id).await?;
        self.ensure_category(request.category_id).await?;

        Ok(self
            .store
            .insert_expense(NewExpense {
                user_id: owner_id,
                category_id: request.category_id,
                amount: request.amount.normalize(),
                description: request.description,
                spent_on: request.date,
            })
            .await?)
    }

    pub async fn list(&self, query: ExpenseQuery) -> ServiceResult<Vec<Expense>> {
        check_date_range(query.from, query.to)?;
        let filter = RecordFilter {
            user_id: query.user_id,
            category_id: query.category_id,
            from: query.from,
            to: query.to,
        };
        Ok(self.store.list_expenses(&filter).await?)
    }

    /// Expenses of one user; any `userId` in the query is overridden
    pub async fn list_for_user(&self, user_id: i64, query: ExpenseQuery) -> ServiceResult<Vec<Expense>> {
        self.ensure_user(user_id).await?;
        self.list(ExpenseQuery { user_id: Some(user_id), ..query }).await
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Expense> {
        self.store
            .find_expense(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// The record when `context` owns it or is an administrator. Other
    /// callers get the same 404 as for a missing id.
    pub async fn get_owned(&self, id: i64, context: &AuthContext) -> ServiceResult<Expense> {
        let expense = self.get(id).await?;
        if context.authorize(Policy::owner_or_admin(expense.user_id)).is_err() {
            debug!("User {} denied expense {}", context.user_id(), id);
            return Err(not_found(id));
        }
        Ok(expense)
    }

    /// Replace amount, description, date and category. Ownership never moves.
    pub async fn update(&self, mut expense: Expense, request: ExpenseRequest) -> ServiceResult<Expense> {
        self.ensure_category(request.category_id).await?;

        expense.amount = request.amount.normalize();
        expense.description = request.description;
        expense.spent_on = request.date;
        expense.category_id = request.category_id;
        Ok(self.store.save_expense(&expense).await?)
    }

    pub async fn delete(&self, expense: &Expense) -> ServiceResult<()> {
        if !self.store.delete_expense(expense.id).await? {
            return Err(not_found(expense.id));
        }
        Ok(())
    }

    async fn ensure_user(&self, user_id: i64) -> ServiceResult<()> {
        match self.store.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found(format!("User not found with id: {}", user_id))),
        }
    }

    async fn ensure_category(&self, category_id: i64) -> ServiceResult<()> {
        match self.store.find_category(category_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found(format!("Category not found with id: {}", category_id))),
        }
    }
}

fn not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("Expense not found with id: {}", id))
}
