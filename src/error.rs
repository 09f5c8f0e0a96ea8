use crate::appointment::UserId;

/// Malformed or out-of-range input. Surfaces as 422 at the boundary.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The {0} field is required")]
    MissingField(&'static str),
    #[error("Could not parse '{0}' as a date")]
    MalformedDate(String),
    #[error("Appointment date {date} is before today ({today})")]
    InvalidDate { date: String, today: String },
    #[error("Doctor {0} does not exist")]
    UnknownDoctor(UserId),
    #[error("A patient cannot book an appointment with themselves")]
    SelfBooking,
    #[error("Status '{status}' is not one of: {allowed}")]
    InvalidStatus { status: String, allowed: String },
}

#[derive(thiserror::Error, Debug)]
pub enum BookingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Forbidden(String),
    #[error("Appointment {0} not found")]
    NotFound(String),
    #[error("This appointment slot is already booked")]
    SlotTaken { doctor_id: UserId, date: String },
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        BookingError::Forbidden(msg.into())
    }
}

impl From<sled::Error> for BookingError {
    fn from(err: sled::Error) -> Self {
        BookingError::Internal(err.into())
    }
}

impl From<minicbor::decode::Error> for BookingError {
    fn from(err: minicbor::decode::Error) -> Self {
        BookingError::Internal(err.into())
    }
}

impl<E: std::fmt::Debug + std::fmt::Display + Send + Sync + 'static>
    From<minicbor::encode::Error<E>> for BookingError
{
    fn from(err: minicbor::encode::Error<E>) -> Self {
        BookingError::Internal(anyhow::anyhow!("failed to encode record: {err}"))
    }
}
