mod customer;

pub use customer::{Customer, CustomerFilter};
