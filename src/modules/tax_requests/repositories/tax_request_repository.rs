// Tax request persistence.
//
// Uniqueness per (invoice, category) is owned by the database: creation
// goes through an insert that treats a unique-key violation as "already
// exists" instead of checking first. The carried invoice is hydrated
// through the invoice repository so there is one source of truth for it.

use chrono::NaiveDate;

use crate::core::{AppError, Result, UnitOfWork};
use crate::modules::invoices::models::{DeductionCategory, Invoice, InvoiceFilter};
use crate::modules::invoices::InvoiceRepository;
use crate::modules::tax_requests::models::{TaxRequest, TaxRequestFilter, TaxRequestStatus};

/// Repository for tax request database operations
pub struct TaxRequestRepository;

impl TaxRequestRepository {
    pub fn new() -> Self {
        Self
    }

    /// Create a Pending request for the invoice and category unless one
    /// already exists. Returns the id of the new or existing request.
    pub async fn insert_if_absent(
        &self,
        uow: &mut UnitOfWork,
        invoice_id: i64,
        category: DeductionCategory,
    ) -> Result<i64> {
        let insert = sqlx::query(
            "INSERT INTO tax_request (invoice_id, category, status) VALUES (?, ?, ?)",
        )
        .bind(invoice_id)
        .bind(category.code())
        .bind(TaxRequestStatus::Pending.to_string())
        .execute(uow.executor())
        .await;

        match insert {
            Ok(result) => Ok(result.last_insert_id() as i64),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tracing::debug!(invoice_id, category = %category, "Tax request already exists");
                let id: i64 = sqlx::query_scalar(
                    "SELECT id FROM tax_request WHERE invoice_id = ? AND category = ?",
                )
                .bind(invoice_id)
                .bind(category.code())
                .fetch_one(uow.executor())
                .await
                .map_err(|e| AppError::database("fetch existing tax request", e))?;
                Ok(id)
            }
            Err(e) => Err(AppError::database("insert tax request", e)),
        }
    }

    /// Persist status, sums and dates. Row-level claimed hours are written
    /// back separately through the invoice repository.
    pub async fn update(&self, uow: &mut UnitOfWork, request: &TaxRequest) -> Result<()> {
        let id = request
            .id
            .ok_or_else(|| AppError::validation("Cannot update an unsaved tax request"))?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE tax_request
            SET
                status = ?,
                requested_sum = ?,
                received_sum = ?,
                date_sent = ?,
                date_paid = ?
            WHERE id = ?
            "#,
        )
        .bind(request.status.to_string())
        .bind(request.requested_sum)
        .bind(request.received_sum)
        .bind(request.date_sent)
        .bind(request.date_paid)
        .bind(id)
        .execute(uow.executor())
        .await
        .map_err(|e| AppError::database("update tax request", e))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found("Tax request not found"));
        }

        Ok(())
    }

    /// Singleton lookup. Zero matches is an expected outcome; more than
    /// one is an integrity violation.
    pub async fn get(
        &self,
        uow: &mut UnitOfWork,
        filter: &TaxRequestFilter,
    ) -> Result<Option<TaxRequest>> {
        let mut requests = self.list(uow, filter).await?;

        match requests.len() {
            0 => Ok(None),
            1 => Ok(Some(requests.remove(0))),
            n => Err(AppError::too_many_rows(format!(
                "Tax request lookup matched {} rows",
                n
            ))),
        }
    }

    /// List tax requests with the carried invoice fully hydrated.
    pub async fn list(
        &self,
        uow: &mut UnitOfWork,
        filter: &TaxRequestFilter,
    ) -> Result<Vec<TaxRequest>> {
        let mut sql = String::from(
            r#"
            SELECT
                tax_request.id,
                tax_request.invoice_id,
                tax_request.category,
                tax_request.status,
                tax_request.requested_sum,
                tax_request.received_sum,
                tax_request.date_sent,
                tax_request.date_paid
            FROM tax_request
            INNER JOIN invoice ON invoice.id = tax_request.invoice_id
            "#,
        );

        let mut conditions: Vec<String> = Vec::new();
        if filter.id.is_some() {
            conditions.push("tax_request.id = ?".to_string());
        }
        if filter.invoice_id.is_some() {
            conditions.push("tax_request.invoice_id = ?".to_string());
        }
        if filter.company_id.is_some() {
            conditions.push("invoice.company_id = ?".to_string());
        }
        if filter.category.is_some() {
            conditions.push("tax_request.category = ?".to_string());
        }
        if !filter.statuses.is_empty() {
            let placeholders = vec!["?"; filter.statuses.len()].join(", ");
            conditions.push(format!("tax_request.status IN ({})", placeholders));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        // Order column comes from a fixed whitelist, never from input
        let order_by = match filter.order_by.as_deref() {
            Some("status") => "tax_request.status",
            Some("date_sent") => "tax_request.date_sent",
            Some("date_paid") => "tax_request.date_paid",
            Some("number") => "invoice.number",
            _ => "tax_request.id",
        };
        let direction = if filter.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY {} {}", order_by, direction));

        let mut query = sqlx::query_as::<_, TaxRequestRecord>(&sql);
        if let Some(id) = filter.id {
            query = query.bind(id);
        }
        if let Some(invoice_id) = filter.invoice_id {
            query = query.bind(invoice_id);
        }
        if let Some(company_id) = filter.company_id {
            query = query.bind(company_id);
        }
        if let Some(category) = filter.category {
            query = query.bind(category.code());
        }
        for status in &filter.statuses {
            query = query.bind(status.to_string());
        }

        let records = query
            .fetch_all(uow.executor())
            .await
            .map_err(|e| AppError::database("list tax requests", e))?;

        let invoice_repository = InvoiceRepository::new();
        let mut requests = Vec::with_capacity(records.len());
        for record in records {
            let invoice_filter = InvoiceFilter {
                id: Some(record.invoice_id),
                include_deleted: true,
                ..Default::default()
            };
            let invoice = invoice_repository
                .get(uow, &invoice_filter)
                .await?
                .ok_or_else(|| {
                    AppError::internal(format!(
                        "Tax request {} references missing invoice {}",
                        record.id, record.invoice_id
                    ))
                })?;
            requests.push(record.into_request(invoice)?);
        }

        Ok(requests)
    }
}

impl Default for TaxRequestRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Database row for the tax_request table
#[derive(sqlx::FromRow)]
struct TaxRequestRecord {
    id: i64,
    invoice_id: i64,
    category: i16,
    status: String,
    requested_sum: Option<i64>,
    received_sum: Option<i64>,
    date_sent: Option<NaiveDate>,
    date_paid: Option<NaiveDate>,
}

impl TaxRequestRecord {
    fn into_request(self, invoice: Invoice) -> Result<TaxRequest> {
        let status = self
            .status
            .parse()
            .map_err(|e: String| AppError::internal(e))?;

        Ok(TaxRequest {
            id: Some(self.id),
            category: DeductionCategory::from_code(self.category)?,
            invoice,
            status,
            requested_sum: self.requested_sum,
            received_sum: self.received_sum,
            date_sent: self.date_sent,
            date_paid: self.date_paid,
        })
    }
}
