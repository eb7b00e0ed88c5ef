mod tax_request;

pub use tax_request::{TaxRequest, TaxRequestFilter, TaxRequestStatus};
