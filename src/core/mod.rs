pub mod error;
pub mod unit_of_work;

pub use error::{AppError, Result};
pub use unit_of_work::{Resolution, TransactionScope, UnitOfWork};
