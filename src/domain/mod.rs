mod account;
mod balance;
mod money;
mod transaction;
mod validation;

pub use account::*;
pub use balance::*;
pub use money::*;
pub use transaction::*;
pub use validation::*;
