//! Core appointment record and the value types it is built from
use super::error::ValidationError;
use super::utils;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";
const SLOT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
// accepted in order, first match wins
const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Stable identity of a user, as handed to us by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    // fresh bech32 encoded id, mostly useful for tests and seeding
    pub fn generate() -> anyhow::Result<Self> {
        Ok(Self(utils::new_uuid_to_bech32("user_")?))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(
    minicbor::Encode,
    minicbor::Decode,
    serde::Serialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[n(0)]
    Patient,
    #[n(1)]
    Doctor,
}

impl Role {
    /// Anything other than "patient" or "doctor" is an unrecognised role.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            _ => None,
        }
    }
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }
}

/// The authenticated identity making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
    pub fn patient(id: impl Into<String>) -> Self {
        Self::new(UserId::new(id), Role::Patient)
    }
    pub fn doctor(id: impl Into<String>) -> Self {
        Self::new(UserId::new(id), Role::Doctor)
    }
}

#[derive(
    minicbor::Encode,
    minicbor::Decode,
    serde::Serialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
pub enum AppointmentStatus {
    #[n(0)]
    #[serde(rename = "RSVP")]
    Rsvp,
    #[n(1)]
    #[serde(rename = "approved")]
    Approved,
    #[n(2)]
    #[serde(rename = "cancelled")]
    Cancelled,
    #[n(3)]
    #[serde(rename = "rejected")]
    Rejected,
    #[n(4)]
    #[serde(rename = "postponed")]
    Postponed,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Rsvp,
        AppointmentStatus::Approved,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Rejected,
        AppointmentStatus::Postponed,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Rsvp => "RSVP",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Postponed => "postponed",
        }
    }
    /// Cancelled or rejected. Such a slot can be released when
    /// `release_closed_slots` is set.
    pub fn is_closed(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Rejected
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

/// The booked date, optionally with a time of day. A bare date is held as midnight.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct AppointmentDate(NaiveDateTime);

impl AppointmentDate {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
            return Ok(date.into());
        }
        DATE_TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(AppointmentDate)
            .ok_or_else(|| ValidationError::MalformedDate(value.to_string()))
    }
    pub fn day(&self) -> NaiveDate {
        self.0.date()
    }
    pub fn to_naive(&self) -> NaiveDateTime {
        self.0
    }
    /// Key identifying a doctor's slot. Sorts lexicographically in date order.
    pub fn slot_key(&self) -> String {
        self.0.format(SLOT_FORMAT).to_string()
    }
    fn is_date_only(&self) -> bool {
        self.0.time() == NaiveTime::MIN
    }
}

impl From<NaiveDate> for AppointmentDate {
    fn from(value: NaiveDate) -> Self {
        AppointmentDate(value.and_time(NaiveTime::MIN))
    }
}

impl From<NaiveDateTime> for AppointmentDate {
    fn from(value: NaiveDateTime) -> Self {
        AppointmentDate(value)
    }
}

impl fmt::Display for AppointmentDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_date_only() {
            write!(f, "{}", self.0.format(DATE_FORMAT))
        } else {
            write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
        }
    }
}

// key is the appointment id, value is this struct encoded into cbor
#[derive(minicbor::Encode, minicbor::Decode, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded
    #[n(1)]
    pub patient_id: UserId,
    #[n(2)]
    pub doctor_id: UserId,
    #[n(3)]
    pub appointment_date: AppointmentDate,
    #[n(4)]
    pub status: AppointmentStatus,
    #[n(5)]
    pub created_at: TimeStamp<Utc>,
    #[n(6)]
    pub updated_at: TimeStamp<Utc>,
}

impl Appointment {
    /// A fresh request, always starting out as RSVP.
    pub fn new(
        patient_id: UserId,
        doctor_id: UserId,
        appointment_date: AppointmentDate,
    ) -> anyhow::Result<Self> {
        let now = TimeStamp::new();
        Ok(Self {
            id: utils::new_uuid_to_bech32("appt_")?,
            patient_id,
            doctor_id,
            appointment_date,
            status: AppointmentStatus::Rsvp,
            created_at: now.clone(),
            updated_at: now,
        })
    }
    /// Returns the updated record; the original is left untouched.
    pub fn with_status(&self, status: AppointmentStatus) -> Self {
        Self {
            status,
            updated_at: TimeStamp::new(),
            ..self.clone()
        }
    }
}

impl<C> minicbor::Encode<C> for UserId {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.str(&self.0)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for UserId {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        Ok(UserId(d.str()?.to_string()))
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

impl<C> minicbor::Encode<C> for AppointmentDate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i64(self.0.and_utc().timestamp())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for AppointmentDate {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let secs = d.i64()?;

        DateTime::from_timestamp(secs, 0)
            .map(|dt| AppointmentDate(dt.naive_utc()))
            .ok_or(minicbor::decode::Error::message(
                "failed to convert appointment date from timestamp",
            ))
    }
}

impl serde::Serialize for TimeStamp<Utc> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl serde::Serialize for AppointmentDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appointment_encoding() {
        let original = Appointment::new(
            UserId::new("user_patient"),
            UserId::new("user_doctor"),
            AppointmentDate::parse("2030-01-10 09:30").unwrap(),
        )
        .unwrap();

        let encoding = minicbor::to_vec(&original).unwrap();
        let decode: Appointment = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn date_only_renders_without_time() {
        let date = AppointmentDate::parse("2030-01-10").unwrap();
        assert_eq!(date.to_string(), "2030-01-10");
        assert_eq!(date.slot_key(), "2030-01-10T00:00:00");

        let date = AppointmentDate::parse("2030-01-10T14:05").unwrap();
        assert_eq!(date.to_string(), "2030-01-10 14:05:00");
        assert_eq!(date.day(), NaiveDate::from_ymd_opt(2030, 1, 10).unwrap());
    }

    #[test]
    fn midnight_and_bare_date_share_a_slot() {
        let a = AppointmentDate::parse("2030-01-10").unwrap();
        let b = AppointmentDate::parse("2030-01-10 00:00:00").unwrap();
        assert_eq!(a.slot_key(), b.slot_key());
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(matches!(
            AppointmentDate::parse("tomorrow"),
            Err(ValidationError::MalformedDate(_))
        ));
        assert!(AppointmentDate::parse("2030-02-30").is_err());
    }

    #[test]
    fn status_strings() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse("rsvp"), None);
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::Rsvp).unwrap(),
            "\"RSVP\""
        );
    }

    #[test]
    fn with_status_leaves_original_untouched() {
        let original = Appointment::new(
            UserId::new("user_patient"),
            UserId::new("user_doctor"),
            AppointmentDate::parse("2030-01-10").unwrap(),
        )
        .unwrap();
        let updated = original.with_status(AppointmentStatus::Approved);

        assert_eq!(original.status, AppointmentStatus::Rsvp);
        assert_eq!(updated.status, AppointmentStatus::Approved);
        assert_eq!(updated.id, original.id);
        assert!(updated.updated_at.to_datetime_utc() >= original.updated_at.to_datetime_utc());
    }
}
