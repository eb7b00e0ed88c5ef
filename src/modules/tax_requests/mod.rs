// Tax requests module

pub mod models;
pub mod repositories;
pub mod services;

pub use models::{TaxRequest, TaxRequestFilter, TaxRequestStatus};
pub use repositories::TaxRequestRepository;
pub use services::TaxRequestService;
