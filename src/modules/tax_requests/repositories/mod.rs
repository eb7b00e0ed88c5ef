mod tax_request_repository;

pub use tax_request_repository::TaxRequestRepository;
