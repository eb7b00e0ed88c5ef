// Invoice line rows and the per-row totals calculator.
//
// Unit prices are entered VAT-inclusive. Rows flagged as deductible with a
// service class get a discounted customer price under the ROT/RUT scheme;
// the remainder is claimed back from the tax authority.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::totals::InvoiceTotals;
use crate::core::{AppError, Result};

/// VAT rate bracket applied to a row's inclusive price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum VatClass {
    Vat25 = 0,
    Vat12 = 1,
    Vat6 = 2,
    Vat0 = 3,
}

impl VatClass {
    pub fn code(self) -> i16 {
        self as i16
    }

    /// Decode a stored bracket code. Unknown codes are rejected here, before
    /// any calculation sees them.
    pub fn from_code(code: i16) -> Result<Self> {
        match code {
            0 => Ok(VatClass::Vat25),
            1 => Ok(VatClass::Vat12),
            2 => Ok(VatClass::Vat6),
            3 => Ok(VatClass::Vat0),
            _ => Err(AppError::validation(format!("Invalid VAT class: {}", code))),
        }
    }

    pub fn rate(self) -> Decimal {
        match self {
            VatClass::Vat25 => Decimal::new(25, 2),
            VatClass::Vat12 => Decimal::new(12, 2),
            VatClass::Vat6 => Decimal::new(6, 2),
            VatClass::Vat0 => Decimal::ZERO,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VatClass::Vat25 => "25 %",
            VatClass::Vat12 => "12 %",
            VatClass::Vat6 => "6 %",
            VatClass::Vat0 => "0 %",
        }
    }
}

impl Default for VatClass {
    fn default() -> Self {
        VatClass::Vat25
    }
}

impl From<VatClass> for i16 {
    fn from(value: VatClass) -> Self {
        value.code()
    }
}

impl TryFrom<i16> for VatClass {
    type Error = String;

    fn try_from(value: i16) -> std::result::Result<Self, Self::Error> {
        VatClass::from_code(value).map_err(|e| e.to_string())
    }
}

/// Unit of sale shown on the printed row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum UnitClass {
    Unspecified = 0,
    Piece = 1,
    Hours = 2,
    Days = 3,
}

impl UnitClass {
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Result<Self> {
        match code {
            0 => Ok(UnitClass::Unspecified),
            1 => Ok(UnitClass::Piece),
            2 => Ok(UnitClass::Hours),
            3 => Ok(UnitClass::Days),
            _ => Err(AppError::validation(format!("Invalid unit class: {}", code))),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UnitClass::Unspecified => "-",
            UnitClass::Piece => "st",
            UnitClass::Hours => "timmar",
            UnitClass::Days => "dagar",
        }
    }
}

impl Default for UnitClass {
    fn default() -> Self {
        UnitClass::Unspecified
    }
}

impl From<UnitClass> for i16 {
    fn from(value: UnitClass) -> Self {
        value.code()
    }
}

impl TryFrom<i16> for UnitClass {
    type Error = String;

    fn try_from(value: i16) -> std::result::Result<Self, Self::Error> {
        UnitClass::from_code(value).map_err(|e| e.to_string())
    }
}

/// Tax-deduction category. RUT covers household services, ROT covers
/// renovation and repair work; the customer share differs between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum DeductionCategory {
    Rut = 0,
    Rot = 1,
}

impl DeductionCategory {
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Result<Self> {
        match code {
            0 => Ok(DeductionCategory::Rut),
            1 => Ok(DeductionCategory::Rot),
            _ => Err(AppError::validation(format!(
                "Invalid deduction category: {}",
                code
            ))),
        }
    }

    /// Share of the row price the customer still pays.
    pub fn customer_share(self) -> Decimal {
        match self {
            DeductionCategory::Rut => Decimal::new(5, 1),
            DeductionCategory::Rot => Decimal::new(7, 1),
        }
    }

    /// Share of the row price claimed from the tax authority.
    pub fn deduction_share(self) -> Decimal {
        match self {
            DeductionCategory::Rut => Decimal::new(5, 1),
            DeductionCategory::Rot => Decimal::new(3, 1),
        }
    }
}

impl std::fmt::Display for DeductionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeductionCategory::Rut => write!(f, "RUT"),
            DeductionCategory::Rot => write!(f, "ROT"),
        }
    }
}

impl From<DeductionCategory> for i16 {
    fn from(value: DeductionCategory) -> Self {
        value.code()
    }
}

impl TryFrom<i16> for DeductionCategory {
    type Error = String;

    fn try_from(value: i16) -> std::result::Result<Self, Self::Error> {
        DeductionCategory::from_code(value).map_err(|e| e.to_string())
    }
}

/// Service classes accepted by the tax authority, ROT services first.
/// Codes are stable and stored as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum DeductionService {
    Bygg = 0,
    El = 1,
    GlasOchPlat = 2,
    MarkOchDraneringsarbete = 3,
    Murning = 4,
    Tapetsering = 5,
    Vvs = 6,

    Stadning = 7,
    KladOchTextilvard = 8,
    Snoskottning = 9,
    Tradgardsarbete = 10,
    Barnpassning = 11,
    PersonligOmsorg = 12,
    Flyttjanster = 13,
    ItTjanster = 14,
    ReparationAvVitvaror = 15,
    Moblering = 16,
    TillsynAvBostad = 17,
    TransportTillForsaljning = 18,
    TvattVidTvattinrattning = 19,
}

impl DeductionService {
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Result<Self> {
        let service = match code {
            0 => DeductionService::Bygg,
            1 => DeductionService::El,
            2 => DeductionService::GlasOchPlat,
            3 => DeductionService::MarkOchDraneringsarbete,
            4 => DeductionService::Murning,
            5 => DeductionService::Tapetsering,
            6 => DeductionService::Vvs,
            7 => DeductionService::Stadning,
            8 => DeductionService::KladOchTextilvard,
            9 => DeductionService::Snoskottning,
            10 => DeductionService::Tradgardsarbete,
            11 => DeductionService::Barnpassning,
            12 => DeductionService::PersonligOmsorg,
            13 => DeductionService::Flyttjanster,
            14 => DeductionService::ItTjanster,
            15 => DeductionService::ReparationAvVitvaror,
            16 => DeductionService::Moblering,
            17 => DeductionService::TillsynAvBostad,
            18 => DeductionService::TransportTillForsaljning,
            19 => DeductionService::TvattVidTvattinrattning,
            _ => {
                return Err(AppError::validation(format!(
                    "Invalid deduction service: {}",
                    code
                )))
            }
        };
        Ok(service)
    }

    pub fn category(self) -> DeductionCategory {
        if self.code() <= DeductionService::Vvs.code() {
            DeductionCategory::Rot
        } else {
            DeductionCategory::Rut
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeductionService::Bygg => "Bygg",
            DeductionService::El => "El",
            DeductionService::GlasOchPlat => "Glas och plåt",
            DeductionService::MarkOchDraneringsarbete => "Mark- och dräneringsarbete",
            DeductionService::Murning => "Murning",
            DeductionService::Tapetsering => "Tapetsering",
            DeductionService::Vvs => "VVS",
            DeductionService::Stadning => "Städning",
            DeductionService::KladOchTextilvard => "Kläd- och textilvård",
            DeductionService::Snoskottning => "Snöskottning",
            DeductionService::Tradgardsarbete => "Trädgårdsarbete",
            DeductionService::Barnpassning => "Barnpassning",
            DeductionService::PersonligOmsorg => "Personling omsorg",
            DeductionService::Flyttjanster => "Flyttjänster",
            DeductionService::ItTjanster => "IT-tjänster",
            DeductionService::ReparationAvVitvaror => "Reparation av vitvaror",
            DeductionService::Moblering => "Möblering",
            DeductionService::TillsynAvBostad => "Tillsyn av bostad",
            DeductionService::TransportTillForsaljning => "Transport till försäljning",
            DeductionService::TvattVidTvattinrattning => "Tvätt vid tvättinrättning",
        }
    }

    /// All ROT service classes, in code order.
    pub fn rot_services() -> &'static [DeductionService] {
        &[
            DeductionService::Bygg,
            DeductionService::El,
            DeductionService::GlasOchPlat,
            DeductionService::MarkOchDraneringsarbete,
            DeductionService::Murning,
            DeductionService::Tapetsering,
            DeductionService::Vvs,
        ]
    }

    /// All RUT service classes, in code order.
    pub fn rut_services() -> &'static [DeductionService] {
        &[
            DeductionService::Stadning,
            DeductionService::KladOchTextilvard,
            DeductionService::Snoskottning,
            DeductionService::Tradgardsarbete,
            DeductionService::Barnpassning,
            DeductionService::PersonligOmsorg,
            DeductionService::Flyttjanster,
            DeductionService::ItTjanster,
            DeductionService::ReparationAvVitvaror,
            DeductionService::Moblering,
            DeductionService::TillsynAvBostad,
            DeductionService::TransportTillForsaljning,
            DeductionService::TvattVidTvattinrattning,
        ]
    }

    /// Default service preselected in row editors.
    pub fn default_for(category: DeductionCategory) -> Self {
        match category {
            DeductionCategory::Rot => DeductionService::Bygg,
            DeductionCategory::Rut => DeductionService::Tradgardsarbete,
        }
    }
}

impl std::fmt::Display for DeductionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<DeductionService> for i16 {
    fn from(value: DeductionService) -> Self {
        value.code()
    }
}

impl TryFrom<i16> for DeductionService {
    type Error = String;

    fn try_from(value: i16) -> std::result::Result<Self, Self::Error> {
        DeductionService::from_code(value).map_err(|e| e.to_string())
    }
}

/// One line on an invoice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRow {
    pub id: Option<i64>,

    pub row_order: i32,

    pub description: String,

    /// Unit price, VAT-inclusive
    pub cost: Decimal,

    /// Quantity, fractional values allowed
    pub count: Decimal,

    pub unit: UnitClass,

    pub vat: VatClass,

    /// Row is eligible for a ROT/RUT deduction
    pub is_deductible: bool,

    /// Service class reported to the tax authority. A deductible row
    /// without one is excluded from claim derivation.
    pub service: Option<DeductionService>,

    /// Fixed hour count for the claim, used when the row is priced by
    /// something other than hours
    pub claimed_hours: Option<i32>,
}

impl InvoiceRow {
    /// Line total, VAT-inclusive.
    pub fn line_total(&self) -> Decimal {
        self.cost * self.count
    }

    /// The deduction category this row counts towards, if any.
    pub fn deduction_category(&self) -> Option<DeductionCategory> {
        if !self.is_deductible {
            return None;
        }
        self.service.map(|service| service.category())
    }

    /// Derive the monetary figures for this row.
    ///
    /// With `include_vat` false the totals are VAT-exclusive and the
    /// deduction flag is ignored. With both flags set, the total is what
    /// the customer actually pays after the ROT/RUT discount and the VAT
    /// amount is recomputed on the discounted price.
    pub fn totals(&self, include_vat: bool, include_deduction: bool) -> InvoiceTotals {
        let mut totals = InvoiceTotals::default();

        let mut discounted_price = self.cost;
        totals.ppu_incl = self.cost;

        if let Some(category) = self.deduction_category() {
            match category {
                DeductionCategory::Rot => {
                    discounted_price = self.cost * category.customer_share();
                    totals.rot_rut += self.cost * category.deduction_share() * self.count;
                }
                DeductionCategory::Rut => {
                    discounted_price = self.cost * category.customer_share();
                    totals.rot_rut += discounted_price * self.count;
                }
            }
            totals.rot_rut_per_unit = self.cost * self.count - discounted_price;
        }

        totals.customer += discounted_price * self.count;
        totals.incl += self.line_total();

        let price_excl = self.cost / (Decimal::ONE + self.vat.rate());
        totals.excl = price_excl * self.count;
        totals.ppu_excl = price_excl;
        let mut vat_amount = totals.incl - totals.excl;

        if include_vat {
            totals.total = totals.incl;
            totals.ppu = totals.ppu_incl;

            if include_deduction {
                totals.total = totals.customer;
                totals.ppu = discounted_price;
                vat_amount = (discounted_price
                    - discounted_price / (Decimal::ONE + self.vat.rate()))
                    * self.count;
            }
        } else {
            totals.total = totals.excl;
            totals.ppu = totals.ppu_excl;
        }

        match self.vat {
            VatClass::Vat25 => totals.vat25 = vat_amount,
            VatClass::Vat12 => totals.vat12 = vat_amount,
            VatClass::Vat6 => totals.vat6 = vat_amount,
            VatClass::Vat0 => {}
        }

        totals
    }
}
