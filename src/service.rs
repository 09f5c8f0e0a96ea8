//! Service layer API for appointment operations.
//!
//! Every call takes the acting user explicitly; nothing is read from ambient
//! request state. Each method lines up with one endpoint.
use super::appointment::{Actor, Appointment, Role};
use super::config::BookingConfig;
use super::directory::UserDirectory;
use super::error::BookingError;
use super::policy::{Action, Policy};
use super::request::{CreateAppointment, ListQuery, StatusUpdate};
use super::status::StatusEndpoint;
use super::store::{AppointmentStore, ListFilter, Scope};
use std::sync::Arc;

pub struct BookingService {
    store: AppointmentStore,
    policy: Policy,
}

impl BookingService {
    pub fn new(
        instance: Arc<sled::Db>,
        directory: Arc<dyn UserDirectory>,
        config: BookingConfig,
    ) -> Result<Self, BookingError> {
        let policy = Policy::new(config.restrict_generic_update);
        Ok(Self {
            store: AppointmentStore::open(instance, directory, config)?,
            policy,
        })
    }

    pub fn store(&self) -> &AppointmentStore {
        &self.store
    }

    /// `POST /appointments`
    pub fn create_appointment(
        &self,
        actor: &Actor,
        body: &CreateAppointment,
    ) -> Result<Appointment, BookingError> {
        self.policy.require(actor, Action::Create)?;
        let new = body.validate()?;

        self.store
            .create(actor.id.clone(), new.doctor_id, new.appointment_date)
    }

    /// `GET /appointments/{id}`
    pub fn view_appointment(&self, actor: &Actor, id: &str) -> Result<Appointment, BookingError> {
        let appointment = self.store.get(id)?;
        self.policy.require(actor, Action::View(&appointment))?;
        Ok(appointment)
    }

    /// `PUT /appointments/{id}`. Cancel, reject or postpone.
    pub fn update_status(
        &self,
        actor: &Actor,
        id: &str,
        body: &StatusUpdate,
    ) -> Result<Appointment, BookingError> {
        let change = body.validate(StatusEndpoint::Generic)?;
        let appointment = self.store.get(id)?;
        self.policy.require(actor, Action::UpdateStatus(&appointment))?;

        self.store.update_status(id, change, &actor.id)
    }

    /// `PUT /doctor/appointments/{id}`. Approve, cancel or reject.
    pub fn update_status_as_doctor(
        &self,
        actor: &Actor,
        id: &str,
        body: &StatusUpdate,
    ) -> Result<Appointment, BookingError> {
        let change = body.validate(StatusEndpoint::Doctor)?;
        let appointment = self.store.get(id)?;
        self.policy
            .require(actor, Action::UpdateStatusAsDoctor(&appointment))?;

        self.store.update_status(id, change, &actor.id)
    }

    /// `GET /appointments`. Patients see what they booked, doctors what is booked with them.
    pub fn list_appointments(
        &self,
        actor: &Actor,
        query: &ListQuery,
    ) -> Result<Vec<Appointment>, BookingError> {
        self.policy.require(actor, Action::List)?;
        let scope = match actor.role {
            Role::Patient => Scope::Patient,
            Role::Doctor => Scope::Doctor,
        };

        self.store
            .list(&ListFilter::new(scope, actor.id.clone()).on(query.day()?))
    }

    /// `GET /doctor/appointments`
    pub fn list_for_doctor(
        &self,
        actor: &Actor,
        query: &ListQuery,
    ) -> Result<Vec<Appointment>, BookingError> {
        self.policy.require(actor, Action::ListAsDoctor)?;

        self.store
            .list(&ListFilter::new(Scope::Doctor, actor.id.clone()).on(query.day()?))
    }

    /// Patient-only counterpart of [`BookingService::list_for_doctor`].
    pub fn list_for_patient(
        &self,
        actor: &Actor,
        query: &ListQuery,
    ) -> Result<Vec<Appointment>, BookingError> {
        self.policy.require(actor, Action::ListAsPatient)?;

        self.store
            .list(&ListFilter::new(Scope::Patient, actor.id.clone()).on(query.day()?))
    }
}
