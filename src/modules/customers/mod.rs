// Customers module

pub mod models;
pub mod repositories;

pub use models::{Customer, CustomerFilter};
pub use repositories::CustomerRepository;
