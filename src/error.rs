use std::collections::BTreeMap;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    InvalidTimeRange,
    InvalidWeekday,
    DuplicateSchedule,
    DateWeekdayMismatch,
    ExecutorScheduleMismatch,
    SlotAlreadyBooked,
    MissingExecutor,
    InvalidExecutor,
    MissingField,
    ProfileConflict,
    ScheduleInUse,
}

impl ValidationKind {
    /// Request field the failure is reported under.
    pub fn field(self) -> &'static str {
        match self {
            ValidationKind::InvalidTimeRange => "end_time",
            ValidationKind::InvalidWeekday => "weekday",
            ValidationKind::DateWeekdayMismatch => "date",
            ValidationKind::ExecutorScheduleMismatch
            | ValidationKind::MissingExecutor
            | ValidationKind::InvalidExecutor => "executor",
            ValidationKind::ProfileConflict => "user",
            ValidationKind::DuplicateSchedule
            | ValidationKind::SlotAlreadyBooked
            | ValidationKind::ScheduleInUse
            | ValidationKind::MissingField => "non_field_errors",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ValidationKind::InvalidTimeRange => "Start time must be earlier than end time.",
            ValidationKind::InvalidWeekday => "Weekday must be between 1 (Monday) and 7 (Sunday).",
            ValidationKind::DuplicateSchedule => {
                "This schedule already exists for the given executor."
            }
            ValidationKind::DateWeekdayMismatch => {
                "The selected date does not match the weekday of the schedule."
            }
            ValidationKind::ExecutorScheduleMismatch => {
                "The selected executor does not match the executor of the schedule."
            }
            ValidationKind::SlotAlreadyBooked => {
                "This schedule slot is already booked for the selected date."
            }
            ValidationKind::MissingExecutor => "This field is required for administrators.",
            ValidationKind::InvalidExecutor => "Executor must be a studio or a photographer.",
            ValidationKind::MissingField => "This field is required.",
            ValidationKind::ProfileConflict => {
                "A user cannot hold both a studio and a photographer profile."
            }
            ValidationKind::ScheduleInUse => {
                "This schedule has bookings; its executor and weekday cannot change."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    NotAuthorized,
    ClientMismatch,
}

impl PermissionKind {
    pub fn message(self) -> &'static str {
        match self {
            PermissionKind::NotAuthorized => "You do not have permission to perform this action.",
            PermissionKind::ClientMismatch => "You cannot manage orders for another client.",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{field}: {}", .kind.message())]
    Validation {
        kind: ValidationKind,
        field: &'static str,
    },
    #[error("{}", .kind.message())]
    Permission {
        kind: PermissionKind,
        field: &'static str,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type BookingResult<T> = Result<T, BookingError>;

impl BookingError {
    pub fn invalid(kind: ValidationKind) -> Self {
        BookingError::Validation {
            kind,
            field: kind.field(),
        }
    }

    pub fn required(field: &'static str) -> Self {
        BookingError::Validation {
            kind: ValidationKind::MissingField,
            field,
        }
    }

    pub fn forbidden(kind: PermissionKind, field: &'static str) -> Self {
        BookingError::Permission { kind, field }
    }

    #[cfg(test)]
    pub fn validation_kind(&self) -> Option<ValidationKind> {
        match self {
            BookingError::Validation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn permission_kind(&self) -> Option<PermissionKind> {
        match self {
            BookingError::Permission { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Maps a failed write onto the constraint it tripped. Unique violations become
/// `on_unique`, foreign key violations mean a referenced row vanished meanwhile.
pub fn translate_write_error(
    err: sqlx::Error,
    on_unique: ValidationKind,
    missing: &'static str,
) -> BookingError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return BookingError::invalid(on_unique);
        }
        if db_err.is_foreign_key_violation() {
            return BookingError::NotFound(missing);
        }
    }
    BookingError::Database(err)
}

fn field_errors(field: &str, message: &str) -> BTreeMap<String, Vec<String>> {
    let mut errors = BTreeMap::new();
    errors.insert(field.to_string(), vec![message.to_string()]);
    errors
}

impl ResponseError for BookingError {
    fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Validation { .. } => StatusCode::BAD_REQUEST,
            BookingError::Permission { .. } => StatusCode::FORBIDDEN,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            BookingError::Validation { kind, field } => json!({
                "code": kind,
                "errors": field_errors(field, kind.message()),
            }),
            BookingError::Permission { kind, field } => json!({
                "code": kind,
                "errors": field_errors(field, kind.message()),
            }),
            BookingError::NotFound(entity) => json!({
                "code": "not_found",
                "detail": format!("{entity} not found"),
            }),
            BookingError::Database(err) => {
                log::error!("Database error: {err}");
                json!({ "code": "internal_error", "detail": "Internal server error" })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
