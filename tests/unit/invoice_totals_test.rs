// Tests for invoice-level totals aggregation.
//
// Aggregation is a fold of per-row totals under field-wise addition, so
// it must behave like a commutative monoid: associative, commutative,
// with the zero-valued totals as identity. Scenario tests anchor the
// mixed-row numbers.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fakturera::modules::customers::Customer;
use fakturera::modules::invoices::models::{
    DeductionService, Invoice, InvoiceRow, InvoiceTotals, VatClass,
};

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

fn invoice_with(rows: Vec<InvoiceRow>) -> Invoice {
    let mut invoice = Invoice::new(1, false, "Faktura".to_string(), Customer::default());
    invoice.rows = rows;
    invoice
}

#[test]
fn test_rut_row_plus_plain_row() {
    // 800 kr RUT cleaning plus 200 kr of materials: the customer pays
    // 400 + 200 and the deduction covers the remaining 400.
    let invoice = invoice_with(vec![
        row(
            dec!(800),
            dec!(1),
            VatClass::Vat25,
            Some(DeductionService::Stadning),
        ),
        row(dec!(200), dec!(1), VatClass::Vat25, None),
    ]);

    let totals = invoice.totals(true, true);
    assert_eq!(totals.customer, dec!(600));
    assert_eq!(totals.total, dec!(600));
    assert_eq!(totals.rot_rut, dec!(400));
    assert_eq!(totals.incl, dec!(1000));
}

#[test]
fn test_fold_matches_manual_sum() {
    let rows = vec![
        row(dec!(500), dec!(2), VatClass::Vat25, Some(DeductionService::Bygg)),
        row(dec!(112), dec!(1), VatClass::Vat12, None),
        row(dec!(300), dec!(1.5), VatClass::Vat0, None),
    ];
    let invoice = invoice_with(rows.clone());

    let manual = rows[0].totals(true, true) + rows[1].totals(true, true)
        + rows[2].totals(true, true);
    assert_eq!(invoice.totals(true, true), manual);
}

#[test]
fn test_empty_invoice_yields_identity() {
    let invoice = invoice_with(Vec::new());
    assert_eq!(invoice.totals(true, true), InvoiceTotals::default());
    assert_eq!(invoice.totals(false, false), InvoiceTotals::default());
}

#[test]
fn test_sum_over_iterator() {
    let rows = vec![
        row(dec!(125), dec!(1), VatClass::Vat25, None),
        row(
            dec!(1000),
            dec!(1),
            VatClass::Vat25,
            Some(DeductionService::Stadning),
        ),
    ];
    let invoice = invoice_with(rows.clone());

    let summed: InvoiceTotals = rows.iter().map(|r| r.totals(true, true)).sum();
    assert_eq!(summed, invoice.totals(true, true));
}

#[test]
fn test_vat_buckets_aggregate_per_class() {
    let invoice = invoice_with(vec![
        row(dec!(125), dec!(1), VatClass::Vat25, None),
        row(dec!(112), dec!(1), VatClass::Vat12, None),
        row(dec!(106), dec!(1), VatClass::Vat6, None),
        row(dec!(100), dec!(1), VatClass::Vat0, None),
    ]);

    let totals = invoice.totals(true, false);
    assert_eq!(totals.vat25, dec!(25));
    assert_eq!(totals.vat12, dec!(12));
    assert_eq!(totals.vat6, dec!(6));
    assert_eq!(totals.excl, dec!(400));
    assert_eq!(totals.incl, dec!(443));
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
    /// Property: addition of totals is associative
    #[test]
    fn test_addition_associative(
        a in arbitrary_row(),
        b in arbitrary_row(),
        c in arbitrary_row(),
    ) {
        let (ta, tb, tc) = (
            a.totals(true, true),
            b.totals(true, true),
            c.totals(true, true),
        );
        prop_assert_eq!((ta + tb) + tc, ta + (tb + tc));
    }

    /// Property: addition of totals is commutative
    #[test]
    fn test_addition_commutative(a in arbitrary_row(), b in arbitrary_row()) {
        let (ta, tb) = (a.totals(true, true), b.totals(true, true));
        prop_assert_eq!(ta + tb, tb + ta);
    }

    /// Property: zero-valued totals are the identity
    #[test]
    fn test_default_is_identity(a in arbitrary_row()) {
        let ta = a.totals(true, true);
        prop_assert_eq!(ta + InvoiceTotals::default(), ta);
        prop_assert_eq!(InvoiceTotals::default() + ta, ta);
    }

    /// Property: row order does not change the invoice totals
    #[test]
    fn test_fold_order_independent(mut rows in proptest::collection::vec(arbitrary_row(), 0..6)) {
        let forward = invoice_with(rows.clone()).totals(true, true);
        rows.reverse();
        let backward = invoice_with(rows).totals(true, true);
        prop_assert_eq!(forward, backward);
    }
}
