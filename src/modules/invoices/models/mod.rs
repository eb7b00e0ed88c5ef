mod invoice;
mod invoice_row;
mod totals;

pub use invoice::{Invoice, InvoiceFilter, InvoiceFlag, OfferStatus};
pub use invoice_row::{DeductionCategory, DeductionService, InvoiceRow, UnitClass, VatClass};
pub use totals::InvoiceTotals;
