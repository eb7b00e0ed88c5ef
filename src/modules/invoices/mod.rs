// Invoices module

pub mod models;
pub mod repositories;
pub mod services;

pub use models::{
    DeductionCategory, DeductionService, Invoice, InvoiceFilter, InvoiceFlag, InvoiceRow,
    InvoiceTotals, OfferStatus, UnitClass, VatClass,
};
pub use repositories::InvoiceRepository;
pub use services::InvoiceService;
