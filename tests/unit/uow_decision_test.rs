// Tests for the transaction resolution decision.
//
// A unit of work commits only when the handler succeeded AND the
// response it produced is below the HTTP error range. Everything else
// rolls back, including a handler that returned Ok with a 4xx/5xx
// response.

use actix_web::http::StatusCode;
use proptest::prelude::*;

use fakturera::core::unit_of_work::{resolve_response, Resolution};

#[test]
fn test_success_with_ok_response_commits() {
    assert_eq!(
        resolve_response(false, StatusCode::OK),
        Resolution::Commit
    );
    assert_eq!(
        resolve_response(false, StatusCode::CREATED),
        Resolution::Commit
    );
    assert_eq!(
        resolve_response(false, StatusCode::SEE_OTHER),
        Resolution::Commit
    );
}

#[test]
fn test_error_status_rolls_back_even_on_success() {
    assert_eq!(
        resolve_response(false, StatusCode::BAD_REQUEST),
        Resolution::Rollback
    );
    assert_eq!(
        resolve_response(false, StatusCode::NOT_FOUND),
        Resolution::Rollback
    );
    assert_eq!(
        resolve_response(false, StatusCode::INTERNAL_SERVER_ERROR),
        Resolution::Rollback
    );
}

#[test]
fn test_handler_failure_rolls_back_regardless_of_status() {
    assert_eq!(
        resolve_response(true, StatusCode::OK),
        Resolution::Rollback
    );
    assert_eq!(
        resolve_response(true, StatusCode::BAD_REQUEST),
        Resolution::Rollback
    );
}

#[test]
fn test_boundary_at_400() {
    // 399 is the last committing status, 400 the first rolling back.
    let just_below = StatusCode::from_u16(399).unwrap();
    assert_eq!(resolve_response(false, just_below), Resolution::Commit);

    let boundary = StatusCode::from_u16(400).unwrap();
    assert_eq!(resolve_response(false, boundary), Resolution::Rollback);
}

proptest! {
    /// Property: a failed handler never commits
    #[test]
    fn test_failure_never_commits(code in 100u16..600) {
        let status = StatusCode::from_u16(code).unwrap();
        prop_assert_eq!(resolve_response(true, status), Resolution::Rollback);
    }

    /// Property: on success the decision follows the status class alone
    #[test]
    fn test_success_follows_status_class(code in 100u16..600) {
        let status = StatusCode::from_u16(code).unwrap();
        let expected = if code < 400 {
            Resolution::Commit
        } else {
            Resolution::Rollback
        };
        prop_assert_eq!(resolve_response(false, status), expected);
    }
}
