//! Appointment store on sled.
//!
//! Layout:
//! - `appointments`: id -> cbor encoded [`Appointment`]
//! - `slots`: slot key (`len(doctor) doctor date`) -> id of the appointment holding it
//! - `by_patient` / `by_doctor`: `len(owner) owner date \0 id` -> id
//!
//! Owner ids are length prefixed (u32 big endian), so one owner's prefix never
//! covers another owner's keys whatever bytes the ids contain.
//!
//! Creation runs as one serializable transaction over all four trees, so the
//! slot check and the insert cannot interleave with another create.
use super::appointment::{Appointment, AppointmentDate, UserId};
use super::config::BookingConfig;
use super::directory::UserDirectory;
use super::error::{BookingError, ValidationError};
use super::status::StatusChange;
use super::utils;
use chrono::NaiveDate;
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use std::sync::Arc;

const SEP: u8 = 0;

type TxResult<T> = Result<T, ConflictableTransactionError<BookingError>>;

/// Whose appointments to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Patient,
    Doctor,
}

#[derive(Debug, Clone)]
pub struct ListFilter {
    pub scope: Scope,
    pub owner: UserId,
    pub date: Option<NaiveDate>,
}

impl ListFilter {
    pub fn new(scope: Scope, owner: UserId) -> Self {
        Self {
            scope,
            owner,
            date: None,
        }
    }
    pub fn on(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }
}

pub struct AppointmentStore {
    instance: Arc<sled::Db>,
    appointments: sled::Tree,
    slots: sled::Tree,
    by_patient: sled::Tree,
    by_doctor: sled::Tree,
    directory: Arc<dyn UserDirectory>,
    config: BookingConfig,
}

impl AppointmentStore {
    pub fn open(
        instance: Arc<sled::Db>,
        directory: Arc<dyn UserDirectory>,
        config: BookingConfig,
    ) -> Result<Self, BookingError> {
        Ok(Self {
            appointments: instance.open_tree("appointments")?,
            slots: instance.open_tree("slots")?,
            by_patient: instance.open_tree("by_patient")?,
            by_doctor: instance.open_tree("by_doctor")?,
            instance,
            directory,
            config,
        })
    }

    /// Book a new appointment in RSVP state.
    pub fn create(
        &self,
        patient_id: UserId,
        doctor_id: UserId,
        date: AppointmentDate,
    ) -> Result<Appointment, BookingError> {
        if !self.directory.exists(&doctor_id)? {
            return Err(ValidationError::UnknownDoctor(doctor_id).into());
        }
        let today = self.config.today();
        if date.day() < today {
            return Err(ValidationError::InvalidDate {
                date: date.to_string(),
                today: today.to_string(),
            }
            .into());
        }
        if patient_id == doctor_id {
            return Err(ValidationError::SelfBooking.into());
        }

        let appointment = Appointment::new(patient_id, doctor_id, date)?;
        let encoded = minicbor::to_vec(&appointment)?;
        let id = appointment.id.as_bytes();
        let slot = slot_key(&appointment.doctor_id, &date);
        let patient_key = index_key(&appointment.patient_id, &date, &appointment.id);
        let doctor_key = index_key(&appointment.doctor_id, &date, &appointment.id);
        let release_closed = self.config.release_closed_slots;

        let result = (
            &self.appointments,
            &self.slots,
            &self.by_patient,
            &self.by_doctor,
        )
            .transaction(|(appointments, slots, by_patient, by_doctor)| -> TxResult<()> {
                if let Some(holder) = slots.get(&slot)? {
                    let released = release_closed
                        && match appointments.get(&holder)? {
                            Some(bytes) => decode(&bytes)?.status.is_closed(),
                            None => false,
                        };
                    if !released {
                        return Err(ConflictableTransactionError::Abort(
                            BookingError::SlotTaken {
                                doctor_id: appointment.doctor_id.clone(),
                                date: date.to_string(),
                            },
                        ));
                    }
                }
                slots.insert(slot.as_slice(), id)?;
                appointments.insert(id, encoded.as_slice())?;
                by_patient.insert(patient_key.as_slice(), id)?;
                by_doctor.insert(doctor_key.as_slice(), id)?;
                Ok(())
            });

        match result {
            Ok(()) => {
                tracing::info!(
                    appointment = %appointment.id,
                    patient = %appointment.patient_id,
                    doctor = %appointment.doctor_id,
                    date = %date,
                    "appointment created"
                );
                Ok(appointment)
            }
            Err(TransactionError::Abort(err)) => {
                tracing::warn!(doctor = %appointment.doctor_id, date = %date, "slot already booked");
                Err(err)
            }
            Err(TransactionError::Storage(err)) => Err(err.into()),
        }
    }

    pub fn get(&self, id: &str) -> Result<Appointment, BookingError> {
        if !utils::has_prefix(id, "appt_") {
            return Err(BookingError::NotFound(id.to_string()));
        }
        match self.appointments.get(id.as_bytes())? {
            Some(bytes) => Ok(minicbor::decode(&bytes)?),
            None => Err(BookingError::NotFound(id.to_string())),
        }
    }

    /// Appointments owned by the filter's patient or doctor, ordered by date then id.
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<Appointment>, BookingError> {
        let index = match filter.scope {
            Scope::Patient => &self.by_patient,
            Scope::Doctor => &self.by_doctor,
        };
        let mut prefix = owner_prefix(&filter.owner);
        if let Some(day) = filter.date {
            prefix.extend_from_slice(day.format("%Y-%m-%d").to_string().as_bytes());
        }

        let mut found = Vec::new();
        for entry in index.scan_prefix(prefix) {
            let (_, id) = entry?;
            match self.appointments.get(&id)? {
                Some(bytes) => found.push(minicbor::decode(&bytes)?),
                None => {
                    return Err(BookingError::Internal(anyhow::anyhow!(
                        "index entry points at missing appointment {}",
                        String::from_utf8_lossy(&id)
                    )));
                }
            }
        }

        tracing::debug!(
            owner = %filter.owner,
            scope = ?filter.scope,
            date = ?filter.date,
            count = found.len(),
            "listed appointments"
        );
        Ok(found)
    }

    /// Write a validated status change. Authorization is the caller's job.
    pub fn update_status(
        &self,
        id: &str,
        change: StatusChange,
        requested_by: &UserId,
    ) -> Result<Appointment, BookingError> {
        if !utils::has_prefix(id, "appt_") {
            return Err(BookingError::NotFound(id.to_string()));
        }
        let release_closed = self.config.release_closed_slots;

        let result = (&self.appointments, &self.slots).transaction(
            |(appointments, slots)| -> TxResult<Appointment> {
                let current = match appointments.get(id.as_bytes())? {
                    Some(bytes) => decode(&bytes)?,
                    None => return abort(BookingError::NotFound(id.to_string())),
                };
                let next = change.status();

                // a reopened appointment must still hold its slot
                if release_closed && current.status.is_closed() && !next.is_closed() {
                    let slot = slot_key(&current.doctor_id, &current.appointment_date);
                    let holder = slots.get(&slot)?;
                    if holder.as_deref() != Some(current.id.as_bytes()) {
                        return abort(BookingError::SlotTaken {
                            doctor_id: current.doctor_id.clone(),
                            date: current.appointment_date.to_string(),
                        });
                    }
                }

                let updated = current.with_status(next);
                let encoded = minicbor::to_vec(&updated)
                    .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
                appointments.insert(id.as_bytes(), encoded)?;
                Ok(updated)
            },
        );

        match result {
            Ok(updated) => {
                tracing::info!(
                    appointment = %updated.id,
                    status = %updated.status,
                    requested_by = %requested_by,
                    "appointment status updated"
                );
                Ok(updated)
            }
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(err)) => Err(err.into()),
        }
    }

    pub fn flush(&self) -> Result<usize, BookingError> {
        Ok(self.instance.flush()?)
    }
}

fn abort<T>(err: BookingError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err))
}

fn decode(bytes: &[u8]) -> TxResult<Appointment> {
    minicbor::decode(bytes).map_err(|e| ConflictableTransactionError::Abort(e.into()))
}

fn owner_prefix(owner: &UserId) -> Vec<u8> {
    let owner = owner.as_str().as_bytes();
    let mut key = Vec::with_capacity(4 + owner.len());
    key.extend_from_slice(&(owner.len() as u32).to_be_bytes());
    key.extend_from_slice(owner);
    key
}

fn slot_key(doctor_id: &UserId, date: &AppointmentDate) -> Vec<u8> {
    let mut key = owner_prefix(doctor_id);
    key.extend_from_slice(date.slot_key().as_bytes());
    key
}

fn index_key(owner: &UserId, date: &AppointmentDate, id: &str) -> Vec<u8> {
    let mut key = slot_key(owner, date);
    key.push(SEP);
    key.extend_from_slice(id.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::Role;
    use std::collections::HashMap;

    #[test]
    fn keys_sort_by_date_within_owner() {
        let owner = UserId::new("user_a");
        let early = index_key(&owner, &AppointmentDate::parse("2030-01-09 23:00").unwrap(), "x");
        let late = index_key(&owner, &AppointmentDate::parse("2030-01-10").unwrap(), "a");
        assert!(early < late);

        let other = owner_prefix(&UserId::new("user_ab"));
        assert!(!early.starts_with(&other));

        // an id that embeds the separator stays outside the shorter owner's range
        let embedded = index_key(
            &UserId::new("user_a\0x"),
            &AppointmentDate::parse("2030-01-10").unwrap(),
            "a",
        );
        assert!(!embedded.starts_with(&owner_prefix(&owner)));
    }

    #[test]
    fn list_never_crosses_owners() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let db = Arc::new(sled::open(temp_dir.path().join("owners.db"))?);
        let doctor = UserId::new("user_doc");
        let directory: HashMap<UserId, Role> = [(doctor.clone(), Role::Doctor)].into();
        let directory: Arc<dyn UserDirectory> = Arc::new(directory);
        let store = AppointmentStore::open(db, directory, BookingConfig::default())?;

        let lookalike = UserId::new("user_p\0x");
        store.create(
            lookalike.clone(),
            doctor.clone(),
            AppointmentDate::parse("2030-02-02").unwrap(),
        )?;

        let plain = ListFilter::new(Scope::Patient, UserId::new("user_p"));
        assert!(store.list(&plain)?.is_empty());

        let own = store.list(&ListFilter::new(Scope::Patient, lookalike.clone()))?;
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].patient_id, lookalike);

        let prefix_doctor = ListFilter::new(Scope::Doctor, UserId::new("user_do"));
        assert!(store.list(&prefix_doctor)?.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_ids_are_not_found_without_lookup() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let db = Arc::new(sled::open(temp_dir.path().join("store.db"))?);
        let directory: Arc<dyn UserDirectory> = Arc::new(HashMap::<UserId, Role>::new());
        let store = AppointmentStore::open(db, directory, BookingConfig::default())?;

        assert!(matches!(store.get("42"), Err(BookingError::NotFound(_))));
        Ok(())
    }
}
