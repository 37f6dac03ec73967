// Application layer - use cases and orchestration over a LedgerStore

mod accounts;
mod balance;
pub mod bootstrap;
pub mod error;
mod service;
mod transactions;

pub use bootstrap::*;
pub use error::*;
pub use service::*;
