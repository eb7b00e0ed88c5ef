// Invoice aggregate. The same table backs both offers and invoices; the
// document kind decides which flag operations apply and which lists a
// document shows up in.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::invoice_row::{DeductionCategory, InvoiceRow};
use super::totals::InvoiceTotals;
use crate::core::{AppError, Result};
use crate::modules::customers::Customer;

/// Offer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    /// Offer drafted but not yet sent to the customer
    #[serde(rename = "draft")]
    Draft,

    /// Offer sent, awaiting the customer's answer
    #[serde(rename = "offered")]
    Offered,

    /// Customer accepted the offer
    #[serde(rename = "accepted")]
    Accepted,

    /// Customer turned the offer down
    #[serde(rename = "rejected")]
    Rejected,
}

impl Default for OfferStatus {
    fn default() -> Self {
        OfferStatus::Draft
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferStatus::Draft => write!(f, "draft"),
            OfferStatus::Offered => write!(f, "offered"),
            OfferStatus::Accepted => write!(f, "accepted"),
            OfferStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for OfferStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(OfferStatus::Draft),
            "offered" => Ok(OfferStatus::Offered),
            "accepted" => Ok(OfferStatus::Accepted),
            "rejected" => Ok(OfferStatus::Rejected),
            _ => Err(format!("Invalid offer status: {}", s)),
        }
    }
}

/// Flag operations exposed to the document views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceFlag {
    Invoiced,
    Paid,
    Offered,
    Deleted,
}

impl InvoiceFlag {
    /// Whether this flag may be set on the given document kind.
    /// Invoiced/paid exist for invoices, offered for offers, deleted for
    /// both.
    pub fn applies_to(self, is_offer: bool) -> bool {
        match self {
            InvoiceFlag::Invoiced | InvoiceFlag::Paid => !is_offer,
            InvoiceFlag::Offered => is_offer,
            InvoiceFlag::Deleted => true,
        }
    }
}

impl std::fmt::Display for InvoiceFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceFlag::Invoiced => write!(f, "invoiced"),
            InvoiceFlag::Paid => write!(f, "paid"),
            InvoiceFlag::Offered => write!(f, "offered"),
            InvoiceFlag::Deleted => write!(f, "deleted"),
        }
    }
}

impl std::str::FromStr for InvoiceFlag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "invoiced" => Ok(InvoiceFlag::Invoiced),
            "paid" => Ok(InvoiceFlag::Paid),
            "offered" => Ok(InvoiceFlag::Offered),
            "deleted" => Ok(InvoiceFlag::Deleted),
            _ => Err(format!("Invalid invoice flag: {}", s)),
        }
    }
}

/// An invoice or offer with its rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(skip_deserializing)]
    pub id: Option<i64>,

    pub company_id: i64,

    /// Assigned at first save from the company's sequence, never reused
    #[serde(skip_deserializing)]
    pub number: i32,

    pub name: String,

    pub customer: Customer,

    #[serde(default)]
    pub rows: Vec<InvoiceRow>,

    /// Document kind: offer or invoice
    pub is_offer: bool,

    pub is_invoiced: bool,
    pub is_paid: bool,
    pub is_deleted: bool,

    pub offer_status: OfferStatus,

    /// ROT/RUT claims are derived for this document when it is paid
    pub rut_applicable: bool,

    pub additional_info: String,

    #[serde(skip_deserializing)]
    pub date_created: DateTime<Utc>,
    pub date_invoiced: Option<NaiveDate>,
    pub date_due: Option<NaiveDate>,
    pub date_paid: Option<NaiveDate>,

    /// Sum over the rows, hydrated by the list query
    #[serde(skip_deserializing)]
    pub total_sum: Decimal,
}

/// Filter for invoice lookups
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub id: Option<i64>,
    pub company_id: Option<i64>,
    /// When set, restrict to offers or to invoices
    pub is_offer: Option<bool>,
    /// When set, restrict on the paid flag
    pub paid: Option<bool>,
    pub include_deleted: bool,
    pub order_by: Option<String>,
    pub descending: bool,
}

impl Invoice {
    pub fn new(company_id: i64, is_offer: bool, name: String, customer: Customer) -> Self {
        Self {
            id: None,
            company_id,
            number: 0,
            name,
            customer,
            rows: Vec::new(),
            is_offer,
            is_invoiced: false,
            is_paid: false,
            is_deleted: false,
            offer_status: OfferStatus::Draft,
            rut_applicable: false,
            additional_info: String::new(),
            date_created: Utc::now(),
            date_invoiced: None,
            date_due: None,
            date_paid: None,
            total_sum: Decimal::ZERO,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.company_id <= 0 {
            return Err(AppError::validation("Invoice must belong to a company"));
        }

        Ok(())
    }

    /// Rows are frozen once the invoice has been issued.
    pub fn ensure_rows_mutable(&self) -> Result<()> {
        if self.is_invoiced {
            return Err(AppError::validation(
                "Rows cannot be changed after the invoice is issued",
            ));
        }

        Ok(())
    }

    /// Apply a flag operation. Returns true when the change makes this
    /// document due for ROT/RUT claim derivation, which the caller must
    /// run inside the same unit of work as the save.
    pub fn apply_flag(&mut self, flag: InvoiceFlag, value: bool, date: NaiveDate) -> Result<bool> {
        if !flag.applies_to(self.is_offer) {
            let kind = if self.is_offer { "offers" } else { "invoices" };
            return Err(AppError::validation(format!(
                "Flag {} is not valid for {}",
                flag, kind
            )));
        }

        let mut derive_claims = false;
        match flag {
            InvoiceFlag::Invoiced => {
                self.is_invoiced = value;
                self.date_invoiced = Some(date);
            }
            InvoiceFlag::Deleted => {
                self.is_deleted = value;
            }
            InvoiceFlag::Offered => {
                if value {
                    self.advance_offer(OfferStatus::Offered)?;
                } else {
                    self.revoke_offer()?;
                }
            }
            InvoiceFlag::Paid => {
                self.is_paid = value;
                self.date_paid = Some(date);
                derive_claims = self.rut_applicable && value;
            }
        }

        Ok(derive_claims)
    }

    /// Move the offer lifecycle forward.
    pub fn advance_offer(&mut self, next: OfferStatus) -> Result<()> {
        if !self.is_offer {
            return Err(AppError::validation("Document is not an offer"));
        }

        let allowed = matches!(
            (self.offer_status, next),
            (OfferStatus::Draft, OfferStatus::Offered)
                | (OfferStatus::Offered, OfferStatus::Accepted)
                | (OfferStatus::Offered, OfferStatus::Rejected)
        );

        if !allowed {
            return Err(AppError::validation(format!(
                "Invalid offer status transition from {} to {}",
                self.offer_status, next
            )));
        }

        self.offer_status = next;
        Ok(())
    }

    /// Pull back an offer that was sent but not yet answered.
    pub fn revoke_offer(&mut self) -> Result<()> {
        if self.offer_status != OfferStatus::Offered {
            return Err(AppError::validation(format!(
                "Cannot revoke an offer in status {}",
                self.offer_status
            )));
        }

        self.offer_status = OfferStatus::Draft;
        Ok(())
    }

    /// Deductible rows with a service class, grouped by category. Rows
    /// missing either the flag or the service are left out.
    pub fn deduction_groups(&self) -> BTreeMap<DeductionCategory, Vec<&InvoiceRow>> {
        let mut groups: BTreeMap<DeductionCategory, Vec<&InvoiceRow>> = BTreeMap::new();

        for row in &self.rows {
            if let Some(category) = row.deduction_category() {
                groups.entry(category).or_default().push(row);
            }
        }

        groups
    }

    /// Aggregate totals over all rows.
    pub fn totals(&self, include_vat: bool, include_deduction: bool) -> InvoiceTotals {
        self.rows
            .iter()
            .fold(InvoiceTotals::default(), |acc, row| {
                acc + row.totals(include_vat, include_deduction)
            })
    }
}
