//! Property-based tests for the authorization gate and status validation
//!
//! The gate is pure, so these run without a database. They pin down the
//! visibility and update rules for every combination of actor and appointment
//! the strategies can produce, rather than a handful of picked cases.

use appointment_booking::{
    appointment::{Actor, Appointment, AppointmentDate, AppointmentStatus, Role, UserId},
    policy::{AccessReason, Action, Policy, authorize},
    status::StatusEndpoint,
};
use proptest::prelude::*;

// PROPERTY TEST STRATEGIES

/// Small id pool so actors and appointments collide often
fn user_strategy() -> impl Strategy<Value = String> {
    (0u8..4).prop_map(|n| format!("user_{n}"))
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop::bool::ANY.prop_map(|b| if b { Role::Patient } else { Role::Doctor })
}

fn actor_strategy() -> impl Strategy<Value = Actor> {
    (user_strategy(), role_strategy()).prop_map(|(id, role)| Actor::new(UserId::new(id), role))
}

fn appointment_strategy() -> impl Strategy<Value = Appointment> {
    (user_strategy(), user_strategy(), 1u32..=28).prop_map(|(patient, doctor, day)| {
        let date = AppointmentDate::parse(&format!("2030-06-{day:02}")).unwrap();
        Appointment::new(UserId::new(patient), UserId::new(doctor), date).unwrap()
    })
}

/// Arbitrary status strings, mostly near-misses of real ones
fn raw_status_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec![
            "RSVP", "approved", "cancelled", "rejected", "postponed", "Approved", "CANCELLED",
            "pending", "",
        ])
        .prop_map(String::from),
        "[a-zA-Z]{0,12}",
    ]
}

// PROPERTY TESTS
proptest! {
    /// Property: only patients may create, whoever they are
    #[test]
    fn prop_create_is_patient_only(actor in actor_strategy()) {
        let decision = authorize(&actor, Action::Create);
        prop_assert_eq!(decision.allowed, actor.role == Role::Patient);
    }

    /// Property: view is granted exactly to the patient who booked it and the
    /// assigned doctor, each in their own role
    #[test]
    fn prop_view_matches_ownership(actor in actor_strategy(), appt in appointment_strategy()) {
        let expected = match actor.role {
            Role::Patient => actor.id == appt.patient_id,
            Role::Doctor => actor.id == appt.doctor_id,
        };
        prop_assert_eq!(authorize(&actor, Action::View(&appt)).allowed, expected);
    }

    /// Property: the doctor endpoint admits the assigned doctor and nobody else
    #[test]
    fn prop_doctor_update_requires_assignment(
        actor in actor_strategy(),
        appt in appointment_strategy(),
    ) {
        let expected = actor.role == Role::Doctor && actor.id == appt.doctor_id;
        prop_assert_eq!(
            authorize(&actor, Action::UpdateStatusAsDoctor(&appt)).allowed,
            expected
        );
    }

    /// Property: the generic endpoint admits the booking patient or any doctor,
    /// and with the restriction on, only participants
    #[test]
    fn prop_generic_update_rules(actor in actor_strategy(), appt in appointment_strategy()) {
        let loose = match actor.role {
            Role::Patient => actor.id == appt.patient_id,
            Role::Doctor => true,
        };
        let strict = match actor.role {
            Role::Patient => actor.id == appt.patient_id,
            Role::Doctor => actor.id == appt.doctor_id,
        };

        let decision = Policy::new(false).authorize(&actor, Action::UpdateStatus(&appt));
        prop_assert_eq!(decision.allowed, loose);
        if decision.reason == AccessReason::AnyDoctor {
            prop_assert!(actor.id != appt.doctor_id);
        }
        prop_assert_eq!(
            Policy::new(true).authorize(&actor, Action::UpdateStatus(&appt)).allowed,
            strict
        );
    }

    /// Property: anything the restricted policy allows, the default allows too
    #[test]
    fn prop_restriction_only_narrows(actor in actor_strategy(), appt in appointment_strategy()) {
        for action in [
            Action::Create,
            Action::View(&appt),
            Action::List,
            Action::ListAsPatient,
            Action::ListAsDoctor,
            Action::UpdateStatus(&appt),
            Action::UpdateStatusAsDoctor(&appt),
        ] {
            if Policy::new(true).authorize(&actor, action).allowed {
                prop_assert!(Policy::new(false).authorize(&actor, action).allowed);
            }
        }
    }

    /// Property: a status is accepted iff it names a status in the endpoint's set
    #[test]
    fn prop_status_validation_is_exactly_the_allowed_set(raw in raw_status_strategy()) {
        for endpoint in [StatusEndpoint::Generic, StatusEndpoint::Doctor] {
            let expected = AppointmentStatus::parse(&raw)
                .map(|status| endpoint.allowed().contains(&status))
                .unwrap_or(false);
            prop_assert_eq!(endpoint.validate(&raw).is_ok(), expected);
        }
    }
}

#[test]
fn rsvp_is_never_a_valid_target() {
    for endpoint in [StatusEndpoint::Generic, StatusEndpoint::Doctor] {
        assert!(!endpoint.permits(AppointmentStatus::Rsvp));
    }
}
