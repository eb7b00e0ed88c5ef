//! Fakturera invoicing library
//!
//! Invoicing engine for Swedish small businesses: invoices and offers,
//! per-row VAT handling with ROT/RUT tax deductions, and the claim
//! lifecycle against the tax authority.

pub mod config;
pub mod core;
pub mod modules;

// Re-export commonly used types
pub use modules::customers;
pub use modules::invoices;
pub use modules::tax_requests;
