use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monetary figures derived for one row or aggregated over an invoice.
///
/// The zero value is the identity under `+`, and addition is field-wise,
/// so folding row results in any grouping gives the same aggregate. The
/// per-unit fields only carry meaning for a single row; after a fold they
/// are sums of per-unit prices and must not be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Grand total under the requested inclusion mode
    pub total: Decimal,
    /// VAT-inclusive total
    pub incl: Decimal,
    /// VAT-exclusive total
    pub excl: Decimal,
    /// VAT accrued in the 25 % bracket
    pub vat25: Decimal,
    /// VAT accrued in the 12 % bracket
    pub vat12: Decimal,
    /// VAT accrued in the 6 % bracket
    pub vat6: Decimal,
    /// Amount the customer pays after ROT/RUT discounts
    pub customer: Decimal,
    /// Amount claimed from the tax authority
    pub rot_rut: Decimal,

    /// Price per unit under the requested inclusion mode
    pub ppu: Decimal,
    /// Price per unit, VAT-inclusive
    pub ppu_incl: Decimal,
    /// Price per unit, VAT-exclusive
    pub ppu_excl: Decimal,
    /// ROT/RUT discount for the whole row less one unit's customer price
    pub rot_rut_per_unit: Decimal,
}

impl std::ops::Add for InvoiceTotals {
    type Output = InvoiceTotals;

    fn add(self, other: InvoiceTotals) -> InvoiceTotals {
        InvoiceTotals {
            total: self.total + other.total,
            incl: self.incl + other.incl,
            excl: self.excl + other.excl,
            vat25: self.vat25 + other.vat25,
            vat12: self.vat12 + other.vat12,
            vat6: self.vat6 + other.vat6,
            customer: self.customer + other.customer,
            rot_rut: self.rot_rut + other.rot_rut,
            ppu: self.ppu + other.ppu,
            ppu_incl: self.ppu_incl + other.ppu_incl,
            ppu_excl: self.ppu_excl + other.ppu_excl,
            rot_rut_per_unit: self.rot_rut_per_unit + other.rot_rut_per_unit,
        }
    }
}

impl std::iter::Sum for InvoiceTotals {
    fn sum<I: Iterator<Item = InvoiceTotals>>(iter: I) -> Self {
        iter.fold(InvoiceTotals::default(), |acc, totals| acc + totals)
    }
}
