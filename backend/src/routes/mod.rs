pub mod convert;
pub mod transaction;
pub mod user;
pub mod wallet;

pub use convert::*;
pub use transaction::*;
pub use user::*;
pub use wallet::*;
