pub mod category;
pub mod expense;
pub mod income;
pub mod user;

pub use category::{Category, NewCategory};
pub use expense::{Expense, NewExpense};
pub use income::{Income, NewIncome};
pub use user::{NewUser, User};
