use serde::{Deserialize, Serialize};

use crate::core::{AppError, Result};

/// Invoice recipient. The personnummer is required by the tax authority
/// before a ROT/RUT claim can be filed for this customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub address1: String,
    pub address2: String,
    pub postcode: String,
    pub city: String,
    pub pnr: String,
    pub telephone: String,

    pub company_id: i64,
}

/// Filter for customer lookups
#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    pub id: Option<i64>,
    pub company_id: Option<i64>,
    /// Substring match on the customer name or email
    pub search: Option<String>,
    pub order_by: Option<String>,
    pub descending: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Customer {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Customer name cannot be empty"));
        }

        Ok(())
    }

    pub fn has_personnummer(&self) -> bool {
        !self.pnr.trim().is_empty()
    }
}
