use chrono::NaiveDate;
use tracing::info;

use crate::core::{AppError, Result, UnitOfWork};
use crate::modules::customers::repositories::CustomerRepository;
use crate::modules::invoices::models::{
    Invoice, InvoiceFilter, InvoiceFlag, InvoiceRow, OfferStatus,
};
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::tax_requests::TaxRequestService;

/// Service for invoice business logic
pub struct InvoiceService {
    repository: InvoiceRepository,
    customer_repository: CustomerRepository,
    tax_request_service: TaxRequestService,
}

impl InvoiceService {
    pub fn new() -> Self {
        Self {
            repository: InvoiceRepository::new(),
            customer_repository: CustomerRepository::new(),
            tax_request_service: TaxRequestService::new(),
        }
    }

    /// Get a single invoice matching the filter.
    pub async fn get(&self, uow: &mut UnitOfWork, filter: &InvoiceFilter) -> Result<Invoice> {
        self.repository
            .get(uow, filter)
            .await?
            .ok_or_else(|| AppError::not_found("Invoice not found"))
    }

    pub async fn list(
        &self,
        uow: &mut UnitOfWork,
        filter: &InvoiceFilter,
    ) -> Result<Vec<Invoice>> {
        self.repository.list(uow, filter).await
    }

    /// Save an invoice, creating it when it has no id yet. Customer edits
    /// ride along with the invoice save.
    pub async fn save(&self, uow: &mut UnitOfWork, invoice: &mut Invoice) -> Result<i64> {
        invoice.validate()?;

        self.customer_repository
            .save(uow, &mut invoice.customer)
            .await?;

        match invoice.id {
            Some(id) => {
                self.repository.update(uow, invoice).await?;
                Ok(id)
            }
            None => {
                let id = self.repository.insert(uow, invoice).await?;
                info!(
                    invoice_id = id,
                    number = invoice.number,
                    company_id = invoice.company_id,
                    "Invoice created"
                );
                Ok(id)
            }
        }
    }

    /// Append a row to an invoice that has not been issued yet.
    pub async fn add_row(
        &self,
        uow: &mut UnitOfWork,
        invoice_id: i64,
        company_id: i64,
        row: &mut InvoiceRow,
    ) -> Result<i64> {
        let invoice = self.fetch(uow, invoice_id, company_id, false).await?;
        invoice.ensure_rows_mutable()?;

        let id = self.repository.add_row(uow, invoice_id, row).await?;
        row.id = Some(id);
        Ok(id)
    }

    pub async fn update_row(
        &self,
        uow: &mut UnitOfWork,
        invoice_id: i64,
        company_id: i64,
        row: &InvoiceRow,
    ) -> Result<()> {
        let invoice = self.fetch(uow, invoice_id, company_id, false).await?;
        invoice.ensure_rows_mutable()?;

        let row_id = row
            .id
            .ok_or_else(|| AppError::validation("Cannot update an unsaved invoice row"))?;
        if !invoice.rows.iter().any(|existing| existing.id == Some(row_id)) {
            return Err(AppError::not_found("Invoice row not found"));
        }

        self.repository.update_row(uow, row).await
    }

    pub async fn remove_row(
        &self,
        uow: &mut UnitOfWork,
        invoice_id: i64,
        company_id: i64,
        row_id: i64,
    ) -> Result<()> {
        let invoice = self.fetch(uow, invoice_id, company_id, false).await?;
        invoice.ensure_rows_mutable()?;

        self.repository.remove_row(uow, invoice_id, row_id).await
    }

    /// Apply a flag operation to an invoice or offer. Setting the paid
    /// flag on a ROT/RUT-applicable invoice also derives its tax requests
    /// on the same unit of work.
    pub async fn set_flag(
        &self,
        uow: &mut UnitOfWork,
        id: i64,
        company_id: i64,
        flag: InvoiceFlag,
        value: bool,
        date: NaiveDate,
    ) -> Result<Invoice> {
        let mut invoice = self.fetch(uow, id, company_id, true).await?;

        let derive_claims = invoice.apply_flag(flag, value, date)?;
        self.repository.update(uow, &invoice).await?;

        if derive_claims {
            self.tax_request_service
                .derive_from_invoice(uow, &invoice)
                .await?;
        }

        info!(invoice_id = id, flag = %flag, value, "Invoice flag updated");
        Ok(invoice)
    }

    /// Customer accepted the offer.
    pub async fn accept_offer(
        &self,
        uow: &mut UnitOfWork,
        id: i64,
        company_id: i64,
    ) -> Result<Invoice> {
        let mut invoice = self.fetch(uow, id, company_id, false).await?;

        invoice.advance_offer(OfferStatus::Accepted)?;
        self.repository.update(uow, &invoice).await?;

        info!(invoice_id = id, "Offer accepted");
        Ok(invoice)
    }

    /// Customer turned the offer down.
    pub async fn reject_offer(
        &self,
        uow: &mut UnitOfWork,
        id: i64,
        company_id: i64,
    ) -> Result<Invoice> {
        let mut invoice = self.fetch(uow, id, company_id, false).await?;

        invoice.advance_offer(OfferStatus::Rejected)?;
        self.repository.update(uow, &invoice).await?;

        info!(invoice_id = id, "Offer rejected");
        Ok(invoice)
    }

    /// Lookup by id within a company. Flag operations need to see deleted
    /// invoices so the tombstone flag can be cleared again.
    async fn fetch(
        &self,
        uow: &mut UnitOfWork,
        id: i64,
        company_id: i64,
        include_deleted: bool,
    ) -> Result<Invoice> {
        let filter = InvoiceFilter {
            id: Some(id),
            company_id: Some(company_id),
            include_deleted,
            ..Default::default()
        };

        self.get(uow, &filter).await
    }
}

impl Default for InvoiceService {
    fn default() -> Self {
        Self::new()
    }
}
