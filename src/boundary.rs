//! Translation of service results into status codes and JSON bodies.
//!
//! Transport wiring lives elsewhere; this only fixes what each outcome looks
//! like on the wire.
use super::appointment::Appointment;
use super::error::{BookingError, ValidationError};
use serde::Serialize;

pub const OK: u16 = 200;
pub const CREATED: u16 = 201;
pub const FORBIDDEN: u16 = 403;
pub const NOT_FOUND: u16 = 404;
pub const CONFLICT: u16 = 409;
pub const UNPROCESSABLE: u16 = 422;
pub const INTERNAL: u16 = 500;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AppointmentEnvelope {
    pub message: &'static str,
    pub appointment: Appointment,
}

#[derive(Debug, Serialize)]
pub struct AppointmentList {
    pub appointments: Vec<Appointment>,
}

#[derive(Debug)]
pub struct Reply<T> {
    pub status: u16,
    pub body: T,
}

impl<T: Serialize> Reply<T> {
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&self.body)?)
    }
}

impl BookingError {
    pub fn status_code(&self) -> u16 {
        match self {
            BookingError::Validation(_) => UNPROCESSABLE,
            BookingError::Forbidden(_) => FORBIDDEN,
            BookingError::NotFound(_) => NOT_FOUND,
            BookingError::SlotTaken { .. } => CONFLICT,
            BookingError::Internal(_) => INTERNAL,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Validation(ValidationError::InvalidStatus { .. }) => "INVALID_STATUS",
            BookingError::Validation(_) => "VALIDATION_FAILED",
            BookingError::Forbidden(_) => "FORBIDDEN",
            BookingError::NotFound(_) => "NOT_FOUND",
            BookingError::SlotTaken { .. } => "SLOT_TAKEN",
            BookingError::Internal(_) => "INTERNAL",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            BookingError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
            },
        }
    }
}

/// Reply for `POST /appointments`.
pub fn created(
    result: Result<Appointment, BookingError>,
) -> Result<Reply<AppointmentEnvelope>, Reply<ErrorBody>> {
    envelope(result, CREATED, "Appointment created successfully")
}

/// Reply for `PUT /appointments/{id}`.
pub fn status_updated(
    result: Result<Appointment, BookingError>,
) -> Result<Reply<AppointmentEnvelope>, Reply<ErrorBody>> {
    envelope(result, OK, "Appointment status updated")
}

/// Reply for `PUT /doctor/appointments/{id}`.
pub fn status_updated_by_doctor(
    result: Result<Appointment, BookingError>,
) -> Result<Reply<AppointmentEnvelope>, Reply<ErrorBody>> {
    envelope(result, OK, "Appointment status updated by doctor")
}

/// Reply for both list endpoints.
pub fn listed(
    result: Result<Vec<Appointment>, BookingError>,
) -> Result<Reply<AppointmentList>, Reply<ErrorBody>> {
    result
        .map(|appointments| Reply {
            status: OK,
            body: AppointmentList { appointments },
        })
        .map_err(failure)
}

pub fn failure(err: BookingError) -> Reply<ErrorBody> {
    Reply {
        status: err.status_code(),
        body: err.to_body(),
    }
}

fn envelope(
    result: Result<Appointment, BookingError>,
    status: u16,
    message: &'static str,
) -> Result<Reply<AppointmentEnvelope>, Reply<ErrorBody>> {
    result
        .map(|appointment| Reply {
            status,
            body: AppointmentEnvelope {
                message,
                appointment,
            },
        })
        .map_err(failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::{AppointmentDate, UserId};

    #[test]
    fn each_kind_has_a_fixed_status() {
        let cases = [
            (BookingError::from(ValidationError::SelfBooking), 422u16, "VALIDATION_FAILED"),
            (BookingError::forbidden("no"), 403, "FORBIDDEN"),
            (BookingError::NotFound("appt_x".into()), 404, "NOT_FOUND"),
            (
                BookingError::SlotTaken {
                    doctor_id: UserId::new("d"),
                    date: "2030-01-10".into(),
                },
                409,
                "SLOT_TAKEN",
            ),
            (BookingError::Internal(anyhow::anyhow!("disk on fire")), 500, "INTERNAL"),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn internal_details_are_not_echoed() {
        let reply = failure(BookingError::Internal(anyhow::anyhow!("disk on fire")));
        let json = reply.to_json().unwrap();
        assert!(!json.contains("disk on fire"));
        assert!(json.contains("\"code\":\"INTERNAL\""));
    }

    #[test]
    fn created_envelope_shape() {
        let appointment = Appointment::new(
            UserId::new("user_p"),
            UserId::new("user_d"),
            AppointmentDate::parse("2030-01-10").unwrap(),
        )
        .unwrap();

        let reply = created(Ok(appointment)).unwrap();
        assert_eq!(reply.status, CREATED);

        let value: serde_json::Value = serde_json::from_str(&reply.to_json().unwrap()).unwrap();
        assert_eq!(value["message"], "Appointment created successfully");
        assert_eq!(value["appointment"]["status"], "RSVP");
        assert_eq!(value["appointment"]["appointment_date"], "2030-01-10");
        assert_eq!(value["appointment"]["doctor_id"], "user_d");
    }
}
