use std::sync::Arc;
use tracing::debug;

use super::{check_date_range, ServiceResult};
use crate::api::incomes::{IncomeQuery, IncomeRequest};
use crate::auth::Policy;
use crate::database::models::{Income, NewIncome};
use crate::database::{IncomeStore, RecordFilter, Store, UserStore};
use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::state::AppState;

pub struct IncomeService {
    store: Arc<dyn Store>,
}

impl IncomeService {
    pub fn new(state: &AppState) -> Self {
        Self { store: state.store.clone() }
    }

    pub async fn create(&self, owner_id: i64, request: IncomeRequest) -> ServiceResult<Income> {
        if self.store.find_user(owner_id).await?.is_none() {
            return Err(ApiError::not_found(format!("User not found with id: {}", owner_id)));
        }

        Ok(self
            .store
            .insert_income(NewIncome {
                user_id: owner_id,
                amount: request.amount.normalize(),
                source: request.source.trim().to_string(),
                description: request.description,
                received_on: request.date,
            })
            .await?)
    }

    pub async fn list(&self, query: IncomeQuery) -> ServiceResult<Vec<Income>> {
        check_date_range(query.from, query.to)?;
        let filter = RecordFilter {
            user_id: query.user_id,
            category_id: None,
            from: query.from,
            to: query.to,
        };
        Ok(self.store.list_incomes(&filter).await?)
    }

    pub async fn list_for_user(&self, user_id: i64, query: IncomeQuery) -> ServiceResult<Vec<Income>> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(ApiError::not_found(format!("User not found with id: {}", user_id)));
        }
        self.list(IncomeQuery { user_id: Some(user_id), ..query }).await
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Income> {
        self.store
            .find_income(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// The record when `context` owns it or is an administrator. Other
    /// callers get the same 404 as for a missing id.
    pub async fn get_owned(&self, id: i64, context: &AuthContext) -> ServiceResult<Income> {
        let income = self.get(id).await?;
        if context.authorize(Policy::owner_or_admin(income.user_id)).is_err() {
            debug!("User {} denied income {}", context.user_id(), id);
            return Err(not_found(id));
        }
        Ok(income)
    }

    pub async fn update(&self, mut income: Income, request: IncomeRequest) -> ServiceResult<Income> {
        income.amount = request.amount.normalize();
        income.source = request.source.trim().to_string();
        income.description = request.description;
        income.received_on = request.date;
        Ok(self.store.save_income(&income).await?)
    }

    pub async fn delete(&self, income: &Income) -> ServiceResult<()> {
        if !self.store.delete_income(income.id).await? {
            return Err(not_found(income.id));
        }
        Ok(())
    }
}

fn not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("Income not found with id: {}", id))
}
