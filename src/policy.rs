//! Authorization gate.
//!
//! A pure decision over (actor, action, appointment). Nothing here touches
//! storage, so every rule is unit-testable without a database.
//!
//! Rules:
//! - create: patients only
//! - view: the appointment's patient, or its assigned doctor
//! - list (self-scoped): any recognised role, scoped by role
//! - list as patient / list as doctor: matching role only
//! - generic status update: the appointment's patient, or ANY doctor
//! - doctor status update: the assigned doctor only
//!
//! The generic update rule lets an unassigned doctor through. That is the
//! long-standing behaviour of the endpoint; `restrict_generic_update` narrows
//! it to the assigned doctor.
use super::appointment::{Actor, Appointment, Role, UserId};
use super::error::BookingError;

#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    Create,
    View(&'a Appointment),
    List,
    ListAsPatient,
    ListAsDoctor,
    UpdateStatus(&'a Appointment),
    UpdateStatusAsDoctor(&'a Appointment),
}

impl Action<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::View(_) => "view",
            Action::List => "list",
            Action::ListAsPatient => "list_as_patient",
            Action::ListAsDoctor => "list_as_doctor",
            Action::UpdateStatus(_) => "update_status",
            Action::UpdateStatusAsDoctor(_) => "update_status_as_doctor",
        }
    }
}

/// Why access was granted or denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    AllowedRole,
    OwnAppointment,
    AssignedDoctor,
    /// A doctor passing the generic update without being assigned.
    AnyDoctor,
    WrongRole,
    NotParticipant,
    NotAssignedDoctor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }
    fn deny(reason: AccessReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Policy {
    pub restrict_generic_update: bool,
}

impl Policy {
    pub fn new(restrict_generic_update: bool) -> Self {
        Self {
            restrict_generic_update,
        }
    }

    pub fn authorize(&self, actor: &Actor, action: Action<'_>) -> AccessDecision {
        use AccessReason::*;

        match action {
            Action::Create | Action::ListAsPatient => role_is(actor, Role::Patient),
            Action::ListAsDoctor => role_is(actor, Role::Doctor),
            Action::List => AccessDecision::allow(AllowedRole),
            Action::View(appt) => participant(actor, appt),
            Action::UpdateStatus(appt) => match actor.role {
                Role::Patient if actor.id == appt.patient_id => AccessDecision::allow(OwnAppointment),
                Role::Patient => AccessDecision::deny(NotParticipant),
                Role::Doctor if actor.id == appt.doctor_id => AccessDecision::allow(AssignedDoctor),
                Role::Doctor if self.restrict_generic_update => {
                    AccessDecision::deny(NotAssignedDoctor)
                }
                Role::Doctor => AccessDecision::allow(AnyDoctor),
            },
            Action::UpdateStatusAsDoctor(appt) => match actor.role {
                Role::Doctor if actor.id == appt.doctor_id => AccessDecision::allow(AssignedDoctor),
                Role::Doctor => AccessDecision::deny(NotAssignedDoctor),
                Role::Patient => AccessDecision::deny(WrongRole),
            },
        }
    }

    /// Like [`Policy::authorize`], turning a denial into `Forbidden`.
    pub fn require(&self, actor: &Actor, action: Action<'_>) -> Result<AccessReason, BookingError> {
        let decision = self.authorize(actor, action);
        if decision.allowed {
            if decision.reason == AccessReason::AnyDoctor {
                tracing::warn!(
                    actor = %actor.id,
                    action = action.name(),
                    "unassigned doctor allowed through generic status update"
                );
            }
            return Ok(decision.reason);
        }

        tracing::warn!(
            actor = %actor.id,
            role = actor.role.as_str(),
            action = action.name(),
            reason = ?decision.reason,
            "authorization denied"
        );
        Err(BookingError::forbidden(denial_message(action)))
    }
}

/// Build an actor from what the authentication layer hands over. A role we do
/// not recognise is refused outright.
pub fn recognise(id: UserId, role: &str) -> Result<Actor, BookingError> {
    match Role::parse(role) {
        Some(role) => Ok(Actor::new(id, role)),
        None => {
            tracing::warn!(actor = %id, role, "unrecognised user role");
            Err(BookingError::forbidden("Invalid user role"))
        }
    }
}

/// Authorize under the default (literal) policy.
pub fn authorize(actor: &Actor, action: Action<'_>) -> AccessDecision {
    Policy::default().authorize(actor, action)
}

fn role_is(actor: &Actor, role: Role) -> AccessDecision {
    if actor.role == role {
        AccessDecision::allow(AccessReason::AllowedRole)
    } else {
        AccessDecision::deny(AccessReason::WrongRole)
    }
}

fn participant(actor: &Actor, appt: &Appointment) -> AccessDecision {
    match actor.role {
        Role::Patient if actor.id == appt.patient_id => {
            AccessDecision::allow(AccessReason::OwnAppointment)
        }
        Role::Doctor if actor.id == appt.doctor_id => {
            AccessDecision::allow(AccessReason::AssignedDoctor)
        }
        _ => AccessDecision::deny(AccessReason::NotParticipant),
    }
}

fn denial_message(action: Action<'_>) -> &'static str {
    match action {
        Action::Create => "Only patients can create appointments",
        Action::ListAsPatient => "Only patients can view this resource",
        Action::ListAsDoctor => "Only doctors can view this resource",
        _ => "Unauthorized action",
    }
}
