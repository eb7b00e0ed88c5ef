// Tests for the ROT/RUT claim lifecycle and its derivation inputs.
//
// The lifecycle only ever moves forward: Pending -> Sent -> Paid or
// Rejected, with edits allowed while Pending only. The property test
// throws arbitrary operation sequences at a claim and checks that the
// status rank never decreases and that edit legality tracks the status
// at the time of the edit.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal_macros::dec;

use fakturera::modules::customers::Customer;
use fakturera::modules::invoices::models::{
    DeductionCategory, DeductionService, Invoice, InvoiceRow,
};
use fakturera::modules::tax_requests::models::{TaxRequest, TaxRequestStatus};

fn mixed_invoice() -> Invoice {
    let customer = Customer {
        name: "Anna Andersson".to_string(),
        pnr: "19800101-1234".to_string(),
        company_id: 1,
        ..Default::default()
    };
    let mut invoice = Invoice::new(1, false, "Faktura 1".to_string(), customer);
    invoice.id = Some(10);
    invoice.rows = vec![
        InvoiceRow {
            id: Some(1),
            description: "Takbyte".to_string(),
            cost: dec!(1000),
            count: dec!(2),
            is_deductible: true,
            service: Some(DeductionService::Bygg),
            ..Default::default()
        },
        InvoiceRow {
            id: Some(2),
            description: "Städning".to_string(),
            cost: dec!(800),
            count: dec!(1),
            is_deductible: true,
            service: Some(DeductionService::Stadning),
            ..Default::default()
        },
        InvoiceRow {
            id: Some(3),
            description: "Material".to_string(),
            cost: dec!(200),
            count: dec!(1),
            ..Default::default()
        },
        // Flagged deductible but missing the service class, so it must
        // not produce a claim.
        InvoiceRow {
            id: Some(4),
            description: "Övrigt".to_string(),
            cost: dec!(100),
            count: dec!(1),
            is_deductible: true,
            ..Default::default()
        },
    ];
    invoice
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

#[test]
fn test_derivation_partitions_rows_by_category() {
    let invoice = mixed_invoice();
    let groups = invoice.deduction_groups();

    let categories: Vec<_> = groups.keys().copied().collect();
    assert_eq!(
        categories,
        vec![DeductionCategory::Rut, DeductionCategory::Rot]
    );

    let rut_ids: Vec<_> = groups[&DeductionCategory::Rut]
        .iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(rut_ids, vec![Some(2)]);

    let rot_ids: Vec<_> = groups[&DeductionCategory::Rot]
        .iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(rot_ids, vec![Some(1)]);
}

#[test]
fn test_new_claim_starts_pending_and_empty() {
    let request = TaxRequest::new(DeductionCategory::Rut, mixed_invoice());
    assert_eq!(request.status, TaxRequestStatus::Pending);
    assert_eq!(request.requested_sum, None);
    assert_eq!(request.received_sum, None);
    assert_eq!(request.date_sent, None);
    assert_eq!(request.date_paid, None);
}

#[test]
fn test_lifecycle_stamps_dates() {
    let sent = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let settled = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();

    let mut paid = TaxRequest::new(DeductionCategory::Rut, mixed_invoice());
    paid.mark_sent(sent).unwrap();
    assert_eq!(paid.date_sent, Some(sent));
    assert_eq!(paid.date_paid, None);

    paid.mark_paid(settled, 400).unwrap();
    assert_eq!(paid.date_paid, Some(settled));
    assert_eq!(paid.received_sum, Some(400));

    // A rejection is settled on the same date field, with no payout.
    let mut rejected = TaxRequest::new(DeductionCategory::Rot, mixed_invoice());
    rejected.mark_sent(sent).unwrap();
    rejected.mark_rejected(settled).unwrap();
    assert_eq!(rejected.date_paid, Some(settled));
    assert_eq!(rejected.received_sum, None);
}

#[test]
fn test_terminal_states_stay_terminal() {
    let mut request = TaxRequest::new(DeductionCategory::Rut, mixed_invoice());
    request.mark_sent(date()).unwrap();
    request.mark_paid(date(), 400).unwrap();

    assert!(request.mark_sent(date()).is_err());
    assert!(request.mark_paid(date(), 400).is_err());
    assert!(request.mark_rejected(date()).is_err());
    assert_eq!(request.status, TaxRequestStatus::Paid);
}

fn rank(status: TaxRequestStatus) -> u8 {
    match status {
        TaxRequestStatus::Pending => 0,
        TaxRequestStatus::Sent => 1,
        TaxRequestStatus::Paid | TaxRequestStatus::Rejected => 2,
    }
}

proptest! {
    /// Property: arbitrary operation sequences never move a claim
    /// backwards, and edits only succeed while it is still Pending
    #[test]
    fn test_lifecycle_monotone_under_arbitrary_ops(ops in proptest::collection::vec(0u8..5, 0..12)) {
        let mut request = TaxRequest::new(DeductionCategory::Rut, mixed_invoice());

        for op in ops {
            let before = request.status;
            match op {
                0 => {
                    let sent = request.mark_sent(date());
                    prop_assert_eq!(sent.is_ok(), before == TaxRequestStatus::Pending);
                }
                1 => {
                    let paid = request.mark_paid(date(), 400);
                    prop_assert_eq!(paid.is_ok(), before == TaxRequestStatus::Sent);
                }
                2 => {
                    let rejected = request.mark_rejected(date());
                    prop_assert_eq!(rejected.is_ok(), before == TaxRequestStatus::Sent);
                }
                3 => {
                    let edited = request.set_requested_sum(500);
                    prop_assert_eq!(edited.is_ok(), before == TaxRequestStatus::Pending);
                }
                _ => {
                    let edited = request.set_claimed_hours(2, 8);
                    prop_assert_eq!(edited.is_ok(), before == TaxRequestStatus::Pending);
                }
            }

            prop_assert!(
                rank(request.status) >= rank(before),
                "status moved backwards: {} -> {}", before, request.status
            );
        }
    }
}
