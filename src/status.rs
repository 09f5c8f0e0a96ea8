//! Status transition validation
//!
//! Each update endpoint accepts its own set of target statuses. An appointment
//! in any state may move to any status in the endpoint's set.
use super::appointment::AppointmentStatus;
use super::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEndpoint {
    /// `PUT /appointments/{id}`, used by patients (and, loosely, doctors)
    Generic,
    /// `PUT /doctor/appointments/{id}`, assigned doctor only
    Doctor,
}

impl StatusEndpoint {
    pub fn allowed(self) -> &'static [AppointmentStatus] {
        match self {
            StatusEndpoint::Generic => &[
                AppointmentStatus::Cancelled,
                AppointmentStatus::Rejected,
                AppointmentStatus::Postponed,
            ],
            StatusEndpoint::Doctor => &[
                AppointmentStatus::Approved,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Rejected,
            ],
        }
    }

    pub fn permits(self, status: AppointmentStatus) -> bool {
        self.allowed().contains(&status)
    }

    /// Parse a raw status against this endpoint's set.
    pub fn validate(self, raw: &str) -> Result<StatusChange, ValidationError> {
        match AppointmentStatus::parse(raw.trim()) {
            Some(status) if self.permits(status) => Ok(StatusChange {
                endpoint: self,
                status,
            }),
            _ => Err(ValidationError::InvalidStatus {
                status: raw.to_string(),
                allowed: self.describe_allowed(),
            }),
        }
    }

    fn describe_allowed(self) -> String {
        self.allowed()
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A target status already checked against its endpoint. Only obtainable
/// through [`StatusEndpoint::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    endpoint: StatusEndpoint,
    status: AppointmentStatus,
}

impl StatusChange {
    pub fn status(&self) -> AppointmentStatus {
        self.status
    }
    pub fn endpoint(&self) -> StatusEndpoint {
        self.endpoint
    }
}
