pub mod transaction;
pub mod user;
pub mod wallet;

pub use transaction::{Transaction, TransactionKind};
pub use user::{NewUser, User};
pub use wallet::{Currency, Wallet};
