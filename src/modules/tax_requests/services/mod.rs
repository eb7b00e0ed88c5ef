mod tax_request_service;

pub use tax_request_service::TaxRequestService;
