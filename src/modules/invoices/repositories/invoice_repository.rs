// Invoice and invoice row persistence.
//
// Every operation runs on the caller's unit of work; there is no direct
// pool access here. Lookups hydrate the customer through a join and the
// row total sum through a subquery, then fetch the rows per invoice.

use rust_decimal::Decimal;

use crate::core::{AppError, Result, UnitOfWork};
use crate::modules::customers::Customer;
use crate::modules::invoices::models::{
    DeductionService, Invoice, InvoiceFilter, InvoiceRow, UnitClass, VatClass,
};

/// Repository for invoice database operations
pub struct InvoiceRepository;

impl InvoiceRepository {
    pub fn new() -> Self {
        Self
    }

    /// Next free invoice number for a company. Numbers start at 1 and are
    /// never reused; the unique key on (company_id, number) backs this up.
    pub async fn next_number(&self, uow: &mut UnitOfWork, company_id: i64) -> Result<i32> {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(number), 0) + 1 FROM invoice WHERE company_id = ?",
        )
        .bind(company_id)
        .fetch_one(uow.executor())
        .await
        .map_err(|e| AppError::database("next invoice number", e))?;

        i32::try_from(next).map_err(|_| AppError::internal("Invoice number overflow"))
    }

    /// Insert a new invoice and assign its id and number.
    pub async fn insert(&self, uow: &mut UnitOfWork, invoice: &mut Invoice) -> Result<i64> {
        let customer_id = invoice
            .customer
            .id
            .ok_or_else(|| AppError::validation("Invoice customer must be saved first"))?;

        invoice.number = self.next_number(uow, invoice.company_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO invoice (
                company_id, number, name, customer_id, is_offer,
                offer_status, rut_applicable, additional_info
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invoice.company_id)
        .bind(invoice.number)
        .bind(&invoice.name)
        .bind(customer_id)
        .bind(invoice.is_offer)
        .bind(invoice.offer_status.to_string())
        .bind(invoice.rut_applicable)
        .bind(&invoice.additional_info)
        .execute(uow.executor())
        .await
        .map_err(|e| AppError::database("insert invoice", e))?;

        let id = result.last_insert_id() as i64;
        invoice.id = Some(id);
        Ok(id)
    }

    /// Update an existing invoice's fields and flags.
    pub async fn update(&self, uow: &mut UnitOfWork, invoice: &Invoice) -> Result<()> {
        let id = invoice
            .id
            .ok_or_else(|| AppError::validation("Cannot update an unsaved invoice"))?;
        let customer_id = invoice
            .customer
            .id
            .ok_or_else(|| AppError::validation("Invoice customer must be saved first"))?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE invoice
            SET
                name = ?,
                customer_id = ?,
                is_invoiced = ?,
                is_paid = ?,
                is_deleted = ?,
                offer_status = ?,
                rut_applicable = ?,
                additional_info = ?,
                date_invoiced = ?,
                date_due = ?,
                date_paid = ?
            WHERE id = ? AND company_id = ?
            "#,
        )
        .bind(&invoice.name)
        .bind(customer_id)
        .bind(invoice.is_invoiced)
        .bind(invoice.is_paid)
        .bind(invoice.is_deleted)
        .bind(invoice.offer_status.to_string())
        .bind(invoice.rut_applicable)
        .bind(&invoice.additional_info)
        .bind(invoice.date_invoiced)
        .bind(invoice.date_due)
        .bind(invoice.date_paid)
        .bind(id)
        .bind(invoice.company_id)
        .execute(uow.executor())
        .await
        .map_err(|e| AppError::database("update invoice", e))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found("Invoice not found"));
        }

        Ok(())
    }

    /// Singleton lookup. Zero matches is an expected outcome; more than
    /// one is an integrity violation.
    pub async fn get(
        &self,
        uow: &mut UnitOfWork,
        filter: &InvoiceFilter,
    ) -> Result<Option<Invoice>> {
        let mut invoices = self.list(uow, filter).await?;

        match invoices.len() {
            0 => Ok(None),
            1 => Ok(Some(invoices.remove(0))),
            n => Err(AppError::too_many_rows(format!(
                "Invoice lookup matched {} rows",
                n
            ))),
        }
    }

    /// List invoices with customer and rows hydrated.
    pub async fn list(
        &self,
        uow: &mut UnitOfWork,
        filter: &InvoiceFilter,
    ) -> Result<Vec<Invoice>> {
        let mut sql = String::from(
            r#"
            SELECT
                invoice.id,
                invoice.company_id,
                invoice.number,
                invoice.name,
                invoice.is_offer,
                invoice.is_invoiced,
                invoice.is_paid,
                invoice.is_deleted,
                invoice.offer_status,
                invoice.rut_applicable,
                invoice.additional_info,
                invoice.date_created,
                invoice.date_invoiced,
                invoice.date_due,
                invoice.date_paid,
                COALESCE((
                    SELECT SUM(r.cost * r.`count`)
                    FROM invoice_row r
                    WHERE r.invoice_id = invoice.id
                ), 0) AS total_sum,
                customer.id AS customer_id,
                customer.name AS customer_name,
                customer.email AS customer_email,
                customer.address1 AS customer_address1,
                customer.address2 AS customer_address2,
                customer.postcode AS customer_postcode,
                customer.city AS customer_city,
                customer.pnr AS customer_pnr,
                customer.telephone AS customer_telephone
            FROM invoice
            INNER JOIN customer ON customer.id = invoice.customer_id
            "#,
        );

        let mut conditions: Vec<&str> = Vec::new();
        if filter.id.is_some() {
            conditions.push("invoice.id = ?");
        }
        if filter.company_id.is_some() {
            conditions.push("invoice.company_id = ?");
        }
        if filter.is_offer.is_some() {
            conditions.push("invoice.is_offer = ?");
        }
        if filter.paid.is_some() {
            conditions.push("invoice.is_paid = ?");
        }
        if !filter.include_deleted {
            conditions.push("NOT invoice.is_deleted");
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        // Order column comes from a fixed whitelist, never from input
        let order_by = match filter.order_by.as_deref() {
            Some("number") => "invoice.number",
            Some("name") => "invoice.name",
            Some("customer_email") => "customer.email",
            Some("date_created") => "invoice.date_created",
            Some("date_paid") => "invoice.date_paid",
            Some("date_due") => "invoice.date_due",
            Some("total_sum") => "total_sum",
            _ => "invoice.number",
        };
        let direction = if filter.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY {} {}", order_by, direction));

        let mut query = sqlx::query_as::<_, InvoiceRecord>(&sql);
        if let Some(id) = filter.id {
            query = query.bind(id);
        }
        if let Some(company_id) = filter.company_id {
            query = query.bind(company_id);
        }
        if let Some(is_offer) = filter.is_offer {
            query = query.bind(is_offer);
        }
        if let Some(paid) = filter.paid {
            query = query.bind(paid);
        }

        let records = query
            .fetch_all(uow.executor())
            .await
            .map_err(|e| AppError::database("list invoices", e))?;

        let mut invoices = records
            .into_iter()
            .map(Invoice::try_from)
            .collect::<Result<Vec<_>>>()?;

        for invoice in &mut invoices {
            if let Some(id) = invoice.id {
                invoice.rows = self.rows_for_invoice(uow, id).await?;
            }
        }

        Ok(invoices)
    }

    /// All rows of one invoice, in display order.
    pub async fn rows_for_invoice(
        &self,
        uow: &mut UnitOfWork,
        invoice_id: i64,
    ) -> Result<Vec<InvoiceRow>> {
        let records = sqlx::query_as::<_, InvoiceRowRecord>(
            r#"
            SELECT
                id, row_order, description, cost, `count`, unit, vat,
                is_deductible, service, claimed_hours
            FROM invoice_row
            WHERE invoice_id = ?
            ORDER BY row_order
            "#,
        )
        .bind(invoice_id)
        .fetch_all(uow.executor())
        .await
        .map_err(|e| AppError::database("fetch invoice rows", e))?;

        records.into_iter().map(InvoiceRow::try_from).collect()
    }

    pub async fn add_row(
        &self,
        uow: &mut UnitOfWork,
        invoice_id: i64,
        row: &InvoiceRow,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO invoice_row (
                invoice_id, row_order, description, cost, `count`, unit, vat,
                is_deductible, service, claimed_hours
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invoice_id)
        .bind(row.row_order)
        .bind(&row.description)
        .bind(row.cost)
        .bind(row.count)
        .bind(row.unit.code())
        .bind(row.vat.code())
        .bind(row.is_deductible)
        .bind(row.service.map(|service| service.code()))
        .bind(row.claimed_hours)
        .execute(uow.executor())
        .await
        .map_err(|e| AppError::database("insert invoice row", e))?;

        Ok(result.last_insert_id() as i64)
    }

    pub async fn update_row(&self, uow: &mut UnitOfWork, row: &InvoiceRow) -> Result<()> {
        let id = row
            .id
            .ok_or_else(|| AppError::validation("Cannot update an unsaved invoice row"))?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE invoice_row
            SET
                row_order = ?,
                description = ?,
                cost = ?,
                `count` = ?,
                unit = ?,
                vat = ?,
                is_deductible = ?,
                service = ?,
                claimed_hours = ?
            WHERE id = ?
            "#,
        )
        .bind(row.row_order)
        .bind(&row.description)
        .bind(row.cost)
        .bind(row.count)
        .bind(row.unit.code())
        .bind(row.vat.code())
        .bind(row.is_deductible)
        .bind(row.service.map(|service| service.code()))
        .bind(row.claimed_hours)
        .bind(id)
        .execute(uow.executor())
        .await
        .map_err(|e| AppError::database("update invoice row", e))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found("Invoice row not found"));
        }

        Ok(())
    }

    pub async fn remove_row(
        &self,
        uow: &mut UnitOfWork,
        invoice_id: i64,
        row_id: i64,
    ) -> Result<()> {
        sqlx::query("DELETE FROM invoice_row WHERE invoice_id = ? AND id = ?")
            .bind(invoice_id)
            .bind(row_id)
            .execute(uow.executor())
            .await
            .map_err(|e| AppError::database("remove invoice row", e))?;

        Ok(())
    }
}

impl Default for InvoiceRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Database row for the invoice table joined with its customer
#[derive(sqlx::FromRow)]
struct InvoiceRecord {
    id: i64,
    company_id: i64,
    number: i32,
    name: String,
    is_offer: bool,
    is_invoiced: bool,
    is_paid: bool,
    is_deleted: bool,
    offer_status: String,
    rut_applicable: bool,
    additional_info: String,
    date_created: chrono::DateTime<chrono::Utc>,
    date_invoiced: Option<chrono::NaiveDate>,
    date_due: Option<chrono::NaiveDate>,
    date_paid: Option<chrono::NaiveDate>,
    total_sum: Decimal,
    customer_id: i64,
    customer_name: String,
    customer_email: String,
    customer_address1: String,
    customer_address2: String,
    customer_postcode: String,
    customer_city: String,
    customer_pnr: String,
    customer_telephone: String,
}

impl TryFrom<InvoiceRecord> for Invoice {
    type Error = AppError;

    fn try_from(record: InvoiceRecord) -> Result<Self> {
        let offer_status = record
            .offer_status
            .parse()
            .map_err(|e: String| AppError::internal(e))?;

        Ok(Invoice {
            id: Some(record.id),
            company_id: record.company_id,
            number: record.number,
            name: record.name,
            customer: Customer {
                id: Some(record.customer_id),
                name: record.customer_name,
                email: record.customer_email,
                address1: record.customer_address1,
                address2: record.customer_address2,
                postcode: record.customer_postcode,
                city: record.customer_city,
                pnr: record.customer_pnr,
                telephone: record.customer_telephone,
                company_id: record.company_id,
            },
            rows: Vec::new(),
            is_offer: record.is_offer,
            is_invoiced: record.is_invoiced,
            is_paid: record.is_paid,
            is_deleted: record.is_deleted,
            offer_status,
            rut_applicable: record.rut_applicable,
            additional_info: record.additional_info,
            date_created: record.date_created,
            date_invoiced: record.date_invoiced,
            date_due: record.date_due,
            date_paid: record.date_paid,
            total_sum: record.total_sum,
        })
    }
}

/// Database row for the invoice_row table
#[derive(sqlx::FromRow)]
struct InvoiceRowRecord {
    id: i64,
    row_order: i32,
    description: String,
    cost: Decimal,
    count: Decimal,
    unit: i16,
    vat: i16,
    is_deductible: bool,
    service: Option<i16>,
    claimed_hours: Option<i32>,
}

impl TryFrom<InvoiceRowRecord> for InvoiceRow {
    type Error = AppError;

    fn try_from(record: InvoiceRowRecord) -> Result<Self> {
        Ok(InvoiceRow {
            id: Some(record.id),
            row_order: record.row_order,
            description: record.description,
            cost: record.cost,
            count: record.count,
            unit: UnitClass::from_code(record.unit)?,
            vat: VatClass::from_code(record.vat)?,
            is_deductible: record.is_deductible,
            service: record
                .service
                .map(DeductionService::from_code)
                .transpose()?,
            claimed_hours: record.claimed_hours,
        })
    }
}
