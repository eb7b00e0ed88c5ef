// Property-based tests for the per-row totals calculator.
//
// Anchors the known numeric cases (125 kr gross at 25 % VAT, the ROT
// 70/30 and RUT 50/50 splits) and verifies invariants for arbitrary
// rows: determinism, excl <= incl, the customer total never exceeding
// the gross total, and non-negativity.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fakturera::modules::invoices::models::{DeductionService, InvoiceRow, VatClass};

fn row(
    cost: Decimal,
    count: Decimal,
    vat: VatClass,
    service: Option<DeductionService>,
) -> InvoiceRow {
    InvoiceRow {
        description: "Arbete".to_string(),
        cost,
        count,
        vat,
        is_deductible: service.is_some(),
        service,
        ..Default::default()
    }
}

#[test]
fn test_gross_125_at_25_percent_vat() {
    let row = row(dec!(125), dec!(1), VatClass::Vat25, None);

    let with_vat = row.totals(true, false);
    assert_eq!(with_vat.total, dec!(125));
    assert_eq!(with_vat.incl, dec!(125));
    assert_eq!(with_vat.excl, dec!(100));
    assert_eq!(with_vat.vat25, dec!(25));

    let without_vat = row.totals(false, false);
    assert_eq!(without_vat.total, dec!(100));
    assert_eq!(without_vat.ppu, dec!(100));
}

#[test]
fn test_rot_splits_70_30() {
    let row = row(dec!(1000), dec!(1), VatClass::Vat25, Some(DeductionService::Bygg));

    let totals = row.totals(true, true);
    assert_eq!(totals.total, dec!(700));
    assert_eq!(totals.customer, dec!(700));
    assert_eq!(totals.rot_rut, dec!(300));
    assert_eq!(totals.incl, dec!(1000));
}

#[test]
fn test_rut_splits_50_50() {
    let row = row(
        dec!(1000),
        dec!(1),
        VatClass::Vat25,
        Some(DeductionService::Stadning),
    );

    let totals = row.totals(true, true);
    assert_eq!(totals.total, dec!(500));
    assert_eq!(totals.customer, dec!(500));
    assert_eq!(totals.rot_rut, dec!(500));
    assert_eq!(totals.incl, dec!(1000));
}

#[test]
fn test_non_deductible_row_passes_through() {
    let row = row(dec!(250), dec!(2), VatClass::Vat25, None);

    let totals = row.totals(true, true);
    assert_eq!(totals.total, dec!(500));
    assert_eq!(totals.customer, dec!(500));
    assert_eq!(totals.rot_rut, dec!(0));
    assert_eq!(totals.rot_rut_per_unit, dec!(0));
}

#[test]
fn test_deduction_mode_vat_scales_with_count() {
    // RUT at 100 kr x 2: the customer pays 50 kr per unit, and the VAT
    // inside that discounted price is (50 - 50/1.25) * 2 = 20 kr.
    let row = row(
        dec!(100),
        dec!(2),
        VatClass::Vat25,
        Some(DeductionService::Stadning),
    );

    let totals = row.totals(true, true);
    assert_eq!(totals.customer, dec!(100));
    assert_eq!(totals.vat25, dec!(20));
    assert_eq!(totals.rot_rut, dec!(100));
}

#[test]
fn test_fractional_count() {
    let row = row(
        dec!(800),
        dec!(1.5),
        VatClass::Vat25,
        Some(DeductionService::Stadning),
    );

    let totals = row.totals(true, true);
    assert_eq!(totals.incl, dec!(1200));
    assert_eq!(totals.customer, dec!(600));
    assert_eq!(totals.rot_rut, dec!(600));
    assert_eq!(totals.rot_rut_per_unit, dec!(800));
}

#[test]
fn test_rot_per_unit_figure() {
    // Gross for all units minus the discounted price of one unit.
    let row = row(dec!(1000), dec!(2), VatClass::Vat25, Some(DeductionService::Bygg));

    let totals = row.totals(true, true);
    assert_eq!(totals.customer, dec!(1400));
    assert_eq!(totals.rot_rut, dec!(600));
    assert_eq!(totals.rot_rut_per_unit, dec!(1300));
}

#[test]
fn test_zero_vat_class_accrues_nothing() {
    let row = row(dec!(500), dec!(1), VatClass::Vat0, None);

    let totals = row.totals(true, false);
    assert_eq!(totals.excl, totals.incl);
    assert_eq!(totals.vat25, dec!(0));
    assert_eq!(totals.vat12, dec!(0));
    assert_eq!(totals.vat6, dec!(0));
}

#[test]
fn test_reduced_vat_rates() {
    let reduced = row(dec!(112), dec!(1), VatClass::Vat12, None);
    let totals = reduced.totals(true, false);
    assert_eq!(totals.excl, dec!(100));
    assert_eq!(totals.vat12, dec!(12));

    let food = row(dec!(106), dec!(1), VatClass::Vat6, None);
    let totals = food.totals(true, false);
    assert_eq!(totals.excl, dec!(100));
    assert_eq!(totals.vat6, dec!(6));
}

prop_compose! {
    fn arbitrary_row()(
        cost_cents in 0i64..=10_000_000,
        count_cents in 1i64..=100_000,
        vat_code in 0i16..4,
        service_code in proptest::option::of(0i16..20),
    ) -> InvoiceRow {
        row(
            Decimal::new(cost_cents, 2),
            Decimal::new(count_cents, 2),
            VatClass::from_code(vat_code).unwrap(),
            service_code.map(|code| DeductionService::from_code(code).unwrap()),
        )
    }
}

proptest! {
    /// Property: the calculator is a pure function of its inputs
    #[test]
    fn test_totals_deterministic(row in arbitrary_row()) {
        for include_vat in [false, true] {
            for include_deduction in [false, true] {
                let first = row.totals(include_vat, include_deduction);
                let second = row.totals(include_vat, include_deduction);
                prop_assert_eq!(first, second);
            }
        }
    }

    /// Property: the net total never exceeds the gross total
    #[test]
    fn test_excl_never_exceeds_incl(row in arbitrary_row()) {
        let totals = row.totals(true, false);
        prop_assert!(
            totals.excl <= totals.incl,
            "excl {} > incl {}", totals.excl, totals.incl
        );
    }

    /// Property: a deduction can only lower what the customer pays
    #[test]
    fn test_customer_total_never_exceeds_gross(row in arbitrary_row()) {
        let totals = row.totals(true, true);
        prop_assert!(
            totals.customer <= totals.incl,
            "customer {} > incl {}", totals.customer, totals.incl
        );
        prop_assert!(totals.total <= totals.incl);
    }

    /// Property: non-negative inputs produce non-negative totals
    #[test]
    fn test_totals_non_negative(row in arbitrary_row()) {
        for include_vat in [false, true] {
            for include_deduction in [false, true] {
                let totals = row.totals(include_vat, include_deduction);
                prop_assert!(totals.total >= Decimal::ZERO);
                prop_assert!(totals.incl >= Decimal::ZERO);
                prop_assert!(totals.excl >= Decimal::ZERO);
                prop_assert!(totals.customer >= Decimal::ZERO);
                prop_assert!(totals.rot_rut >= Decimal::ZERO);
            }
        }
    }

    /// Property: VAT lands in the bucket of the row's class only
    #[test]
    fn test_vat_bucket_exclusive(row in arbitrary_row()) {
        let totals = row.totals(true, false);
        match row.vat {
            VatClass::Vat25 => {
                prop_assert_eq!(totals.vat12, Decimal::ZERO);
                prop_assert_eq!(totals.vat6, Decimal::ZERO);
            }
            VatClass::Vat12 => {
                prop_assert_eq!(totals.vat25, Decimal::ZERO);
                prop_assert_eq!(totals.vat6, Decimal::ZERO);
            }
            VatClass::Vat6 => {
                prop_assert_eq!(totals.vat25, Decimal::ZERO);
                prop_assert_eq!(totals.vat12, Decimal::ZERO);
            }
            VatClass::Vat0 => {
                prop_assert_eq!(totals.vat25, Decimal::ZERO);
                prop_assert_eq!(totals.vat12, Decimal::ZERO);
                prop_assert_eq!(totals.vat6, Decimal::ZERO);
            }
        }
    }

    /// Property: without the deduction flag the customer pays the gross
    #[test]
    fn test_total_is_gross_without_deduction_flag(row in arbitrary_row()) {
        let totals = row.totals(true, false);
        prop_assert_eq!(totals.total, totals.incl);
    }
}
