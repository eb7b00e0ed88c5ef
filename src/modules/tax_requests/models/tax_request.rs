// ROT/RUT claim records. One request per invoice and deduction category,
// derived when the invoice is paid and then walked through the lifecycle
// as the claim is filed with Skatteverket and settled.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{AppError, Result};
use crate::modules::invoices::models::{DeductionCategory, Invoice, InvoiceRow};

/// Claim lifecycle. There is no way back to Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxRequestStatus {
    /// Created, not yet filed
    #[serde(rename = "pending")]
    Pending,

    /// Filed with the tax authority
    #[serde(rename = "sent")]
    Sent,

    /// Refund received
    #[serde(rename = "paid")]
    Paid,

    /// Claim turned down
    #[serde(rename = "rejected")]
    Rejected,
}

impl TaxRequestStatus {
    /// Operator-facing label, as shown in the claim lists.
    pub fn label(self) -> &'static str {
        match self {
            TaxRequestStatus::Pending => "skall skickas in",
            TaxRequestStatus::Sent => "inskickad",
            TaxRequestStatus::Paid => "betalad",
            TaxRequestStatus::Rejected => "avslagen",
        }
    }
}

impl Default for TaxRequestStatus {
    fn default() -> Self {
        TaxRequestStatus::Pending
    }
}

impl std::fmt::Display for TaxRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxRequestStatus::Pending => write!(f, "pending"),
            TaxRequestStatus::Sent => write!(f, "sent"),
            TaxRequestStatus::Paid => write!(f, "paid"),
            TaxRequestStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for TaxRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaxRequestStatus::Pending),
            "sent" => Ok(TaxRequestStatus::Sent),
            "paid" => Ok(TaxRequestStatus::Paid),
            "rejected" => Ok(TaxRequestStatus::Rejected),
            _ => Err(format!("Invalid tax request status: {}", s)),
        }
    }
}

/// One ROT or RUT claim against an invoice.
///
/// The carried invoice is a derived read copy for claim math and the hour
/// writeback; the invoice table stays the system of record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxRequest {
    pub id: Option<i64>,

    pub category: DeductionCategory,

    pub invoice: Invoice,

    pub status: TaxRequestStatus,

    /// Operator's estimate of the claim, whole kronor
    pub requested_sum: Option<i64>,

    /// Actual refund, entered when the claim is settled
    pub received_sum: Option<i64>,

    pub date_sent: Option<NaiveDate>,
    pub date_paid: Option<NaiveDate>,
}

/// Filter for claim lookups
#[derive(Debug, Clone, Default)]
pub struct TaxRequestFilter {
    pub id: Option<i64>,
    pub invoice_id: Option<i64>,
    pub company_id: Option<i64>,
    pub category: Option<DeductionCategory>,
    pub statuses: Vec<TaxRequestStatus>,
    pub order_by: Option<String>,
    pub descending: bool,
}

impl TaxRequest {
    pub fn new(category: DeductionCategory, invoice: Invoice) -> Self {
        Self {
            id: None,
            category,
            invoice,
            status: TaxRequestStatus::Pending,
            requested_sum: None,
            received_sum: None,
            date_sent: None,
            date_paid: None,
        }
    }

    /// The claim has been filed with the tax authority.
    pub fn mark_sent(&mut self, date: NaiveDate) -> Result<()> {
        self.transition(TaxRequestStatus::Sent)?;
        self.date_sent = Some(date);
        Ok(())
    }

    /// The refund arrived. Records what was actually paid out.
    pub fn mark_paid(&mut self, date: NaiveDate, received_sum: i64) -> Result<()> {
        self.transition(TaxRequestStatus::Paid)?;
        self.date_paid = Some(date);
        self.received_sum = Some(received_sum);
        Ok(())
    }

    /// The claim was turned down. The paid date doubles as the
    /// settlement date for rejections.
    pub fn mark_rejected(&mut self, date: NaiveDate) -> Result<()> {
        self.transition(TaxRequestStatus::Rejected)?;
        self.date_paid = Some(date);
        Ok(())
    }

    fn transition(&mut self, next: TaxRequestStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, next),
            (TaxRequestStatus::Pending, TaxRequestStatus::Sent)
                | (TaxRequestStatus::Sent, TaxRequestStatus::Paid)
                | (TaxRequestStatus::Sent, TaxRequestStatus::Rejected)
        );

        if !allowed {
            return Err(AppError::validation(format!(
                "Invalid tax request transition from {} to {}",
                self.status, next
            )));
        }

        self.status = next;
        Ok(())
    }

    /// Set the operator's claim estimate. Only editable before filing.
    pub fn set_requested_sum(&mut self, sum: i64) -> Result<()> {
        self.ensure_editable()?;
        self.requested_sum = Some(sum);
        Ok(())
    }

    /// Override the claimed hours on one of the carried invoice rows.
    /// Only editable before filing; the override is persisted onto the
    /// row together with the claim save.
    pub fn set_claimed_hours(&mut self, row_id: i64, hours: i32) -> Result<()> {
        self.ensure_editable()?;

        let row = self
            .invoice
            .rows
            .iter_mut()
            .find(|row| row.id == Some(row_id))
            .ok_or_else(|| {
                AppError::validation(format!("Invoice has no row with id {}", row_id))
            })?;

        row.claimed_hours = Some(hours);
        Ok(())
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.status != TaxRequestStatus::Pending {
            return Err(AppError::validation(format!(
                "Tax request in status {} cannot be edited",
                self.status
            )));
        }

        Ok(())
    }

    /// Rows of the carried invoice that count towards this claim.
    pub fn claimable_rows(&self) -> Vec<&InvoiceRow> {
        self.invoice
            .rows
            .iter()
            .filter(|row| row.deduction_category() == Some(self.category))
            .collect()
    }

    /// Upper bound for the claim: the deductible share of every claimable
    /// row's line total.
    pub fn max_claim_amount(&self) -> Decimal {
        let share = self.category.deduction_share();
        self.claimable_rows()
            .iter()
            .map(|row| row.line_total() * share)
            .sum()
    }

    /// A claim can be filed once it has rows, the customer's personnummer
    /// is on record, and the operator entered a non-zero estimate.
    pub fn can_export(&self) -> bool {
        !self.claimable_rows().is_empty()
            && self.invoice.customer.has_personnummer()
            && self.requested_sum.map_or(false, |sum| sum != 0)
    }
}
