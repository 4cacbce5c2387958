// database/postgres.rs - sqlx-backed store
//
// Listing filters are bound as nullable parameters so every query stays a
// static string.

use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{Category, Expense, Income, NewCategory, NewExpense, NewIncome, NewUser, User};
use super::store::{CategoryStore, ExpenseStore, IncomeStore, RecordFilter, Store, StoreError, UserStore};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, name, description, parent_id, created_at, updated_at";
const EXPENSE_COLUMNS: &str =
    "id, user_id, category_id, amount, description, spent_on, created_at, updated_at";
const INCOME_COLUMNS: &str =
    "id, user_id, amount, source, description, received_on, created_at, updated_at";

/// Map constraint violations onto the backend-neutral error kinds
fn map_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        let detail = db
            .constraint()
            .map(str::to_string)
            .unwrap_or_else(|| db.message().to_string());
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return StoreError::Duplicate(detail),
            Some(FOREIGN_KEY_VIOLATION) => return StoreError::Constraint(detail),
            _ => {}
        }
    }
    StoreError::Sqlx(err)
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn save_user(&self, user: &User) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET username = $2, email = $3, password_hash = $4, role = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        // expenses and incomes go with the user via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn find_category(&self, id: i64) -> Result<Option<Category>, StoreError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name, id");
        sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn list_subcategories(&self, parent_id: i64) -> Result<Vec<Category>, StoreError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE parent_id = $1 ORDER BY name, id"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let sql = format!(
            "INSERT INTO categories (name, description, parent_id) \
             VALUES ($1, $2, $3) RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.parent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn save_category(&self, category: &Category) -> Result<Category, StoreError> {
        let sql = format!(
            "UPDATE categories SET name = $2, description = $3, parent_id = $4, \
             updated_at = NOW() WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.parent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)?
            .ok_or_else(|| StoreError::NotFound(format!("category {}", category.id)))
    }

    async fn delete_category(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_category_expenses(&self, id: i64) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expenses WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_error)
    }
}

#[async_trait]
impl ExpenseStore for PgStore {
    async fn find_expense(&self, id: i64) -> Result<Option<Expense>, StoreError> {
        let sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1");
        sqlx::query_as::<_, Expense>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn list_expenses(&self, filter: &RecordFilter) -> Result<Vec<Expense>, StoreError> {
        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses \
             WHERE ($1::BIGINT IS NULL OR user_id = $1) \
               AND ($2::BIGINT IS NULL OR category_id = $2) \
               AND ($3::DATE IS NULL OR spent_on >= $3) \
               AND ($4::DATE IS NULL OR spent_on <= $4) \
             ORDER BY spent_on DESC, id DESC"
        );
        sqlx::query_as::<_, Expense>(&sql)
            .bind(filter.user_id)
            .bind(filter.category_id)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn insert_expense(&self, expense: NewExpense) -> Result<Expense, StoreError> {
        let sql = format!(
            "INSERT INTO expenses (user_id, category_id, amount, description, spent_on) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {EXPENSE_COLUMNS}"
        );
        sqlx::query_as::<_, Expense>(&sql)
            .bind(expense.user_id)
            .bind(expense.category_id)
            .bind(expense.amount)
            .bind(&expense.description)
            .bind(expense.spent_on)
            .fetch_one(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn save_expense(&self, expense: &Expense) -> Result<Expense, StoreError> {
        let sql = format!(
            "UPDATE expenses SET category_id = $2, amount = $3, description = $4, spent_on = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING {EXPENSE_COLUMNS}"
        );
        sqlx::query_as::<_, Expense>(&sql)
            .bind(expense.id)
            .bind(expense.category_id)
            .bind(expense.amount)
            .bind(&expense.description)
            .bind(expense.spent_on)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)?
            .ok_or_else(|| StoreError::NotFound(format!("expense {}", expense.id)))
    }

    async fn delete_expense(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IncomeStore for PgStore {
    async fn find_income(&self, id: i64) -> Result<Option<Income>, StoreError> {
        let sql = format!("SELECT {INCOME_COLUMNS} FROM incomes WHERE id = $1");
        sqlx::query_as::<_, Income>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn list_incomes(&self, filter: &RecordFilter) -> Result<Vec<Income>, StoreError> {
        let sql = format!(
            "SELECT {INCOME_COLUMNS} FROM incomes \
             WHERE ($1::BIGINT IS NULL OR user_id = $1) \
               AND ($2::DATE IS NULL OR received_on >= $2) \
               AND ($3::DATE IS NULL OR received_on <= $3) \
             ORDER BY received_on DESC, id DESC"
        );
        sqlx::query_as::<_, Income>(&sql)
            .bind(filter.user_id)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn insert_income(&self, income: NewIncome) -> Result<Income, StoreError> {
        let sql = format!(
            "INSERT INTO incomes (user_id, amount, source, description, received_on) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {INCOME_COLUMNS}"
        );
        sqlx::query_as::<_, Income>(&sql)
            .bind(income.user_id)
            .bind(income.amount)
            .bind(&income.source)
            .bind(&income.description)
            .bind(income.received_on)
            .fetch_one(&self.pool)
            .await
            .map_err(map_error)
    }

    async fn save_income(&self, income: &Income) -> Result<Income, StoreError> {
        let sql = format!(
            "UPDATE incomes SET amount = $2, source = $3, description = $4, received_on = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING {INCOME_COLUMNS}"
        );
        sqlx::query_as::<_, Income>(&sql)
            .bind(income.id)
            .bind(income.amount)
            .bind(&income.source)
            .bind(&income.description)
            .bind(income.received_on)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)?
            .ok_or_else(|| StoreError::NotFound(format!("income {}", income.id)))
    }

    async fn delete_income(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM incomes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(map_error)?;
        Ok(())
    }
}
