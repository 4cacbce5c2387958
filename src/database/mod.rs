pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::{connect, DatabaseError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{CategoryStore, ExpenseStore, IncomeStore, RecordFilter, Store, StoreError, UserStore};
