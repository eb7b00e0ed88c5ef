use chrono::NaiveDate;
use tracing::info;

use crate::core::{AppError, Result, UnitOfWork};
use crate::modules::invoices::models::Invoice;
use crate::modules::invoices::InvoiceRepository;
use crate::modules::tax_requests::models::{TaxRequest, TaxRequestFilter};
use crate::modules::tax_requests::repositories::TaxRequestRepository;

/// Service for tax request business logic
pub struct TaxRequestService {
    repository: TaxRequestRepository,
    invoice_repository: InvoiceRepository,
}

impl TaxRequestService {
    pub fn new() -> Self {
        Self {
            repository: TaxRequestRepository::new(),
            invoice_repository: InvoiceRepository::new(),
        }
    }

    /// Create the Pending claims a paid invoice calls for, one per
    /// deduction category present among its rows. Safe to call again:
    /// existing claims are left untouched.
    pub async fn derive_from_invoice(
        &self,
        uow: &mut UnitOfWork,
        invoice: &Invoice,
    ) -> Result<()> {
        let invoice_id = invoice.id.ok_or_else(|| {
            AppError::validation("Cannot derive tax requests for an unsaved invoice")
        })?;

        for category in invoice.deduction_groups().keys() {
            let request_id = self
                .repository
                .insert_if_absent(uow, invoice_id, *category)
                .await?;

            info!(
                invoice_id,
                category = %category,
                request_id,
                "Tax request derived"
            );
        }

        Ok(())
    }

    /// Persist a claim and write any claimed-hour overrides back onto the
    /// invoice rows, all on the caller's unit of work.
    pub async fn save(&self, uow: &mut UnitOfWork, request: &TaxRequest) -> Result<()> {
        self.repository.update(uow, request).await?;

        for row in &request.invoice.rows {
            if row.claimed_hours.is_some() {
                self.invoice_repository.update_row(uow, row).await?;
            }
        }

        Ok(())
    }

    /// Get a single claim by id.
    pub async fn get(&self, uow: &mut UnitOfWork, id: i64) -> Result<TaxRequest> {
        let filter = TaxRequestFilter {
            id: Some(id),
            ..Default::default()
        };

        self.repository
            .get(uow, &filter)
            .await?
            .ok_or_else(|| AppError::not_found("Tax request not found"))
    }

    pub async fn list(
        &self,
        uow: &mut UnitOfWork,
        filter: &TaxRequestFilter,
    ) -> Result<Vec<TaxRequest>> {
        self.repository.list(uow, filter).await
    }

    /// The claim was filed with the tax authority.
    pub async fn mark_sent(
        &self,
        uow: &mut UnitOfWork,
        id: i64,
        date: NaiveDate,
    ) -> Result<TaxRequest> {
        let mut request = self.get(uow, id).await?;
        request.mark_sent(date)?;
        self.save(uow, &request).await?;

        info!(request_id = id, "Tax request sent");
        Ok(request)
    }

    /// The refund arrived.
    pub async fn mark_paid(
        &self,
        uow: &mut UnitOfWork,
        id: i64,
        date: NaiveDate,
        received_sum: i64,
    ) -> Result<TaxRequest> {
        let mut request = self.get(uow, id).await?;
        request.mark_paid(date, received_sum)?;
        self.save(uow, &request).await?;

        info!(request_id = id, received_sum, "Tax request paid");
        Ok(request)
    }

    /// The claim was turned down.
    pub async fn mark_rejected(
        &self,
        uow: &mut UnitOfWork,
        id: i64,
        date: NaiveDate,
    ) -> Result<TaxRequest> {
        let mut request = self.get(uow, id).await?;
        request.mark_rejected(date)?;
        self.save(uow, &request).await?;

        info!(request_id = id, "Tax request rejected");
        Ok(request)
    }
}

impl Default for TaxRequestService {
    fn default() -> Self {
        Self::new()
    }
}
