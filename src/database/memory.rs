// database/memory.rs - In-process store for runs without DATABASE_URL and for tests
//
// Mirrors the constraints of the Postgres schema so both backends behave
// the same from the services' point of view.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::models::{Category, Expense, Income, NewCategory, NewExpense, NewIncome, NewUser, User};
use super::store::{CategoryStore, ExpenseStore, IncomeStore, RecordFilter, Store, StoreError, UserStore};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    expenses: BTreeMap<i64, Expense>,
    incomes: BTreeMap<i64, Income>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_user_unique(&self, id: i64, username: &str, email: &str) -> Result<(), StoreError> {
        for user in self.users.values().filter(|u| u.id != id) {
            if user.username == username {
                return Err(StoreError::Duplicate(format!("username '{}' already exists", username)));
            }
            if user.email.eq_ignore_ascii_case(email) {
                return Err(StoreError::Duplicate(format!("email '{}' already exists", email)));
            }
        }
        Ok(())
    }

    fn check_user_exists(&self, user_id: i64) -> Result<(), StoreError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::Constraint(format!("user {} does not exist", user_id)))
        }
    }

    fn check_category_exists(&self, category_id: i64) -> Result<(), StoreError> {
        if self.categories.contains_key(&category_id) {
            Ok(())
        } else {
            Err(StoreError::Constraint(format!("category {} does not exist", category_id)))
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_user_unique(0, &user.username, &user.email)?;

        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_user_unique(user.id, &user.username, &user.email)?;

        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))?;
        *stored = User {
            updated_at: Utc::now(),
            created_at: stored.created_at,
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.expenses.retain(|_, e| e.user_id != id);
        tables.incomes.retain(|_, i| i.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn find_category(&self, id: i64) -> Result<Option<Category>, StoreError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self.tables.read().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn list_subcategories(&self, parent_id: i64) -> Result<Vec<Category>, StoreError> {
        let mut children: Vec<Category> = self
            .tables
            .read()
            .await
            .categories
            .values()
            .filter(|c| c.parent_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(children)
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(parent_id) = category.parent_id {
            tables.check_category_exists(parent_id)?;
        }

        let now = Utc::now();
        let category = Category {
            id: tables.next_id(),
            name: category.name,
            description: category.description,
            parent_id: category.parent_id,
            created_at: now,
            updated_at: now,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn save_category(&self, category: &Category) -> Result<Category, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(parent_id) = category.parent_id {
            tables.check_category_exists(parent_id)?;
        }

        let stored = tables
            .categories
            .get_mut(&category.id)
            .ok_or_else(|| StoreError::NotFound(format!("category {}", category.id)))?;
        *stored = Category {
            updated_at: Utc::now(),
            created_at: stored.created_at,
            ..category.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_category(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.categories.values().any(|c| c.parent_id == Some(id)) {
            return Err(StoreError::Constraint(format!("category {} has subcategories", id)));
        }
        if tables.expenses.values().any(|e| e.category_id == id) {
            return Err(StoreError::Constraint(format!("category {} is referenced by expenses", id)));
        }
        Ok(tables.categories.remove(&id).is_some())
    }

    async fn count_category_expenses(&self, id: i64) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.expenses.values().filter(|e| e.category_id == id).count() as i64)
    }
}

/// Newest first, matching the Postgres ORDER BY
fn newest_first<T>(records: &mut [T], key: impl Fn(&T) -> (chrono::NaiveDate, i64)) {
    records.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn find_expense(&self, id: i64) -> Result<Option<Expense>, StoreError> {
        Ok(self.tables.read().await.expenses.get(&id).cloned())
    }

    async fn list_expenses(&self, filter: &RecordFilter) -> Result<Vec<Expense>, StoreError> {
        let mut expenses: Vec<Expense> = self
            .tables
            .read()
            .await
            .expenses
            .values()
            .filter(|e| filter.matches(e.user_id, Some(e.category_id), e.spent_on))
            .cloned()
            .collect();
        newest_first(&mut expenses, |e| (e.spent_on, e.id));
        Ok(expenses)
    }

    async fn insert_expense(&self, expense: NewExpense) -> Result<Expense, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_user_exists(expense.user_id)?;
        tables.check_category_exists(expense.category_id)?;

        let now = Utc::now();
        let expense = Expense {
            id: tables.next_id(),
            user_id: expense.user_id,
            category_id: expense.category_id,
            amount: expense.amount,
            description: expense.description,
            spent_on: expense.spent_on,
            created_at: now,
            updated_at: now,
        };
        tables.expenses.insert(expense.id, expense.clone());
        Ok(expense)
    }

    async fn save_expense(&self, expense: &Expense) -> Result<Expense, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_category_exists(expense.category_id)?;

        let stored = tables
            .expenses
            .get_mut(&expense.id)
            .ok_or_else(|| StoreError::NotFound(format!("expense {}", expense.id)))?;
        *stored = Expense {
            updated_at: Utc::now(),
            created_at: stored.created_at,
            user_id: stored.user_id,
            ..expense.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_expense(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.expenses.remove(&id).is_some())
    }
}

#[async_trait]
impl IncomeStore for MemoryStore {
    async fn find_income(&self, id: i64) -> Result<Option<Income>, StoreError> {
        Ok(self.tables.read().await.incomes.get(&id).cloned())
    }

    async fn list_incomes(&self, filter: &RecordFilter) -> Result<Vec<Income>, StoreError> {
        let mut incomes: Vec<Income> = self
            .tables
            .read()
            .await
            .incomes
            .values()
            .filter(|i| filter.matches(i.user_id, None, i.received_on))
            .cloned()
            .collect();
        newest_first(&mut incomes, |i| (i.received_on, i.id));
        Ok(incomes)
    }

    async fn insert_income(&self, income: NewIncome) -> Result<Income, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_user_exists(income.user_id)?;

        let now = Utc::now();
        let income = Income {
            id: tables.next_id(),
            user_id: income.user_id,
            amount: income.amount,
            source: income.source,
            description: income.description,
            received_on: income.received_on,
            created_at: now,
            updated_at: now,
        };
        tables.incomes.insert(income.id, income.clone());
        Ok(income)
    }

    async fn save_income(&self, income: &Income) -> Result<Income, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .incomes
            .get_mut(&income.id)
            .ok_or_else(|| StoreError::NotFound(format!("income {}", income.id)))?;
        *stored = Income {
            updated_at: Utc::now(),
            created_at: stored.created_at,
            user_id: stored.user_id,
            ..income.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_income(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.incomes.remove(&id).is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn enforces_unique_username_and_email() {
        let store = MemoryStore::new();
        store.insert_user(new_user("alice", "alice@example.com")).await.unwrap();

        let dup_name = store.insert_user(new_user("alice", "other@example.com")).await;
        let dup_email = store.insert_user(new_user("alice2", "ALICE@example.com")).await;

        assert!(matches!(dup_name, Err(StoreError::Duplicate(_))));
        assert!(matches!(dup_email, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn deleting_user_cascades_to_records() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("bob", "bob@example.com")).await.unwrap();
        let food = store
            .insert_category(NewCategory { name: "Food".into(), description: None, parent_id: None })
            .await
            .unwrap();
        store
            .insert_expense(NewExpense {
                user_id: user.id,
                category_id: food.id,
                amount: Decimal::new(1250, 2),
                description: None,
                spent_on: date(2024, 1, 5),
            })
            .await
            .unwrap();
        store
            .insert_income(NewIncome {
                user_id: user.id,
                amount: Decimal::new(300000, 2),
                source: "ACME".into(),
                description: None,
                received_on: date(2024, 1, 31),
            })
            .await
            .unwrap();

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(store.list_expenses(&RecordFilter::default()).await.unwrap().is_empty());
        assert!(store.list_incomes(&RecordFilter::default()).await.unwrap().is_empty());
        assert_eq!(store.count_category_expenses(food.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn category_with_children_cannot_be_deleted() {
        let store = MemoryStore::new();
        let root = store
            .insert_category(NewCategory { name: "Home".into(), description: None, parent_id: None })
            .await
            .unwrap();
        store
            .insert_category(NewCategory { name: "Rent".into(), description: None, parent_id: Some(root.id) })
            .await
            .unwrap();

        assert!(matches!(store.delete_category(root.id).await, Err(StoreError::Constraint(_))));
        let missing_parent = store
            .insert_category(NewCategory { name: "Orphan".into(), description: None, parent_id: Some(999) })
            .await;
        assert!(matches!(missing_parent, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn filters_records_by_owner_category_and_dates() {
        let store = MemoryStore::new();
        let alice = store.insert_user(new_user("alice", "a@example.com")).await.unwrap();
        let bob = store.insert_user(new_user("bob", "b@example.com")).await.unwrap();
        let food = store
            .insert_category(NewCategory { name: "Food".into(), description: None, parent_id: None })
            .await
            .unwrap();
        let travel = store
            .insert_category(NewCategory { name: "Travel".into(), description: None, parent_id: None })
            .await
            .unwrap();

        for (user, category, day) in [(alice.id, food.id, 1), (alice.id, travel.id, 10), (bob.id, food.id, 20)] {
            store
                .insert_expense(NewExpense {
                    user_id: user,
                    category_id: category,
                    amount: Decimal::ONE,
                    description: None,
                    spent_on: date(2024, 3, day),
                })
                .await
                .unwrap();
        }

        let alice_all = store
            .list_expenses(&RecordFilter { user_id: Some(alice.id), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(alice_all.len(), 2);
        assert_eq!(alice_all[0].spent_on, date(2024, 3, 10), "newest first");

        let food_after_5th = store
            .list_expenses(&RecordFilter { category_id: Some(food.id), from: Some(date(2024, 3, 5)), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(food_after_5th.len(), 1);
        assert_eq!(food_after_5th[0].user_id, bob.id);
    }
}
