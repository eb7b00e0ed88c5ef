pub mod customers;
pub mod invoices;
pub mod tax_requests;
