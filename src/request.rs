//! Inbound request bodies and their schema checks.
//!
//! Only shape and format are checked here. Anything needing a lookup (doctor
//! existence, slot occupancy) or the clock is left to the store.
use super::appointment::{AppointmentDate, UserId};
use super::error::ValidationError;
use super::status::{StatusChange, StatusEndpoint};
use chrono::NaiveDate;

/// Body of `POST /appointments`.
#[derive(serde::Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct CreateAppointment {
    pub doctor_id: Option<String>,
    pub appointment_date: Option<String>,
}

/// A create request that passed the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub doctor_id: UserId,
    pub appointment_date: AppointmentDate,
}

impl CreateAppointment {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_doctor(mut self, doctor_id: impl Into<String>) -> Self {
        self.doctor_id = Some(doctor_id.into());
        self
    }
    pub fn set_date(mut self, date: impl Into<String>) -> Self {
        self.appointment_date = Some(date.into());
        self
    }
    pub fn validate(&self) -> Result<NewAppointment, ValidationError> {
        let doctor_id = required(&self.doctor_id, "doctor_id")?;
        let date = required(&self.appointment_date, "appointment_date")?;

        Ok(NewAppointment {
            doctor_id: UserId::new(doctor_id),
            appointment_date: AppointmentDate::parse(date)?,
        })
    }
}

/// Body of both status update endpoints.
#[derive(serde::Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
        }
    }
    pub fn validate(&self, endpoint: StatusEndpoint) -> Result<StatusChange, ValidationError> {
        endpoint.validate(required(&self.status, "status")?)
    }
}

/// Query string of the list endpoints, `?date=`.
#[derive(serde::Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub date: Option<String>,
}

impl ListQuery {
    pub fn on(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
        }
    }
    /// Only the calendar day of the filter matters.
    pub fn day(&self) -> Result<Option<NaiveDate>, ValidationError> {
        match self.date.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(AppointmentDate::parse(raw)?.day())),
        }
    }
}

fn required<'a>(
    field: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, ValidationError> {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ValidationError::MissingField(name)),
    }
}
