use std::any::Any;
use std::panic::AssertUnwindSafe;

use actix_web::error::ResponseError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use futures_util::future::{FutureExt, LocalBoxFuture};
use sqlx::{MySql, MySqlConnection, MySqlPool, Transaction};
use tracing::{debug, error};
use uuid::Uuid;

use crate::core::error::{AppError, Result};

/// One store transaction bound to one inbound request.
///
/// Repository methods take `&mut UnitOfWork`, so a query cannot run without
/// an open transaction. Resolution consumes the value, so it happens at
/// most once; an unresolved unit of work rolls back when dropped.
pub struct UnitOfWork {
    tx: Transaction<'static, MySql>,
    id: Uuid,
}

impl UnitOfWork {
    pub async fn begin(pool: &MySqlPool) -> Result<Self> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| AppError::database("begin transaction", e))?;
        let id = Uuid::new_v4();
        debug!(unit_of_work = %id, "transaction started");
        Ok(Self { tx, id })
    }

    /// Correlation id carried by every log line of this unit of work.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Executor for repository queries.
    pub fn executor(&mut self) -> &mut MySqlConnection {
        self.tx.as_mut()
    }

    pub async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AppError::database("commit transaction", e))?;
        debug!(unit_of_work = %self.id, "transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| AppError::database("rollback transaction", e))?;
        debug!(unit_of_work = %self.id, "transaction rolled back");
        Ok(())
    }

    /// Single resolution point: commit on success, roll back on failure.
    /// A rollback failure is logged and the original error is returned.
    pub async fn resolve<T>(self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let id = self.id;
                if let Err(rollback_err) = self.rollback().await {
                    error!(unit_of_work = %id, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// How a finished unit of work must be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Commit,
    Rollback,
}

/// Decision table for the HTTP-coupled scope: only a successful handler
/// producing a non-error response commits. Error-class responses
/// (status 400 and up) roll back even when the handler returned Ok.
pub fn resolve_response(handler_failed: bool, status: StatusCode) -> Resolution {
    if handler_failed || status.as_u16() >= 400 {
        Resolution::Rollback
    } else {
        Resolution::Commit
    }
}

/// Bounded transaction scope wrapping a request handler.
pub struct TransactionScope;

impl TransactionScope {
    /// Begin a transaction, run the handler, resolve exactly once.
    ///
    /// A panic inside the handler is caught, logged with the unit-of-work
    /// id, converted to an internal error, and rolled back. It never
    /// unwinds past this scope.
    pub async fn run<T, F>(pool: &MySqlPool, handler: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut UnitOfWork) -> LocalBoxFuture<'a, Result<T>>,
    {
        let mut uow = UnitOfWork::begin(pool).await?;
        let outcome = AssertUnwindSafe(handler(&mut uow)).catch_unwind().await;
        match outcome {
            Ok(result) => uow.resolve(result).await,
            Err(payload) => {
                let message = panic_message(payload);
                error!(unit_of_work = %uow.id(), panic = %message, "handler panicked");
                let id = uow.id();
                if let Err(rollback_err) = uow.rollback().await {
                    error!(unit_of_work = %id, error = %rollback_err, "rollback failed after panic");
                }
                Err(AppError::internal(format!("handler panicked: {}", message)))
            }
        }
    }

    /// HTTP-coupled variant: applies [`resolve_response`] to the produced
    /// response, then renders errors through [`ResponseError`].
    pub async fn respond<F>(pool: &MySqlPool, handler: F) -> HttpResponse
    where
        F: for<'a> FnOnce(&'a mut UnitOfWork) -> LocalBoxFuture<'a, Result<HttpResponse>>,
    {
        let mut uow = match UnitOfWork::begin(pool).await {
            Ok(uow) => uow,
            Err(err) => return err.error_response(),
        };
        let outcome = match AssertUnwindSafe(handler(&mut uow)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload);
                error!(unit_of_work = %uow.id(), panic = %message, "handler panicked");
                Err(AppError::internal(format!("handler panicked: {}", message)))
            }
        };
        match outcome {
            Ok(response) => match resolve_response(false, response.status()) {
                Resolution::Commit => match uow.commit().await {
                    Ok(()) => response,
                    Err(err) => err.error_response(),
                },
                Resolution::Rollback => {
                    let id = uow.id();
                    if let Err(rollback_err) = uow.rollback().await {
                        error!(unit_of_work = %id, error = %rollback_err, "rollback failed");
                    }
                    response
                }
            },
            Err(err) => {
                let id = uow.id();
                if let Err(rollback_err) = uow.rollback().await {
                    error!(unit_of_work = %id, error = %rollback_err, "rollback failed");
                }
                err.error_response()
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    }
}
