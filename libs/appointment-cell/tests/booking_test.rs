use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use appointment_cell::models::{
    BookAppointmentRequest, BookingError, RescheduleAppointmentRequest, SlotStatus,
    TIME_SLOT_UNAVAILABLE,
};
use appointment_cell::services::booking::BookingService;
use appointment_cell::services::projector::ScheduleProjector;
use shared_database::{
    AppointmentRepository, AvailabilityRepository, ScheduleStore, StorageError,
};
use shared_models::appointment::{Appointment, AppointmentFlags, ClinicalNotes};
use shared_models::schedule::Weekday;
use shared_models::slot::{SlotGrid, TimeSlot};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// Fixed clock for projections: Wednesday noon, before the booked Monday.
fn now() -> NaiveDateTime {
    d(2026, 8, 5).and_hms_opt(12, 0, 0).unwrap()
}

fn next_monday() -> NaiveDate {
    d(2026, 8, 10)
}

fn services(store: &Arc<ScheduleStore>) -> (BookingService, ScheduleProjector) {
    let appointments = Arc::clone(store) as Arc<dyn AppointmentRepository>;
    let availability = Arc::clone(store) as Arc<dyn AvailabilityRepository>;
    (
        BookingService::new(
            Arc::clone(&appointments),
            Arc::clone(&availability),
            SlotGrid::default(),
        ),
        ScheduleProjector::new(appointments, availability, SlotGrid::default()),
    )
}

async fn offer_monday_slots(store: &ScheduleStore, doctor_id: Uuid, starts: &[NaiveTime]) {
    let slots: Vec<TimeSlot> = starts.iter().map(|s| TimeSlot::from_start(*s)).collect();
    store
        .union_slots(doctor_id, Weekday::Mon, slots)
        .await
        .unwrap();
}

fn request(doctor_id: Uuid, date: NaiveDate, hour: NaiveTime) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_id,
        patient_id: Uuid::new_v4(),
        date,
        hour,
        reason: "persistent cough".to_string(),
        location: Some("Room 2".to_string()),
        flags: AppointmentFlags::default(),
    }
}

fn cell_status(
    days: &[appointment_cell::models::DaySchedule],
    start: NaiveTime,
) -> SlotStatus {
    days[0]
        .cells
        .iter()
        .find(|cell| cell.slot.start_time == start)
        .map(|cell| cell.status)
        .expect("slot should be on the grid")
}

#[tokio::test]
async fn booking_scenario_second_attempt_gets_the_sentinel() {
    let store = Arc::new(ScheduleStore::new());
    let (booking, projector) = services(&store);
    let doctor = Uuid::new_v4();

    offer_monday_slots(&store, doctor, &[t(9, 0), t(9, 30), t(10, 0)]).await;

    let booked = booking
        .book(request(doctor, next_monday(), t(9, 30)))
        .await
        .unwrap();
    assert_eq!(booked.hour, t(9, 30));
    assert_eq!(booked.date, next_monday());

    let rejection = booking
        .book(request(doctor, next_monday(), t(9, 30)))
        .await
        .unwrap_err();
    assert_matches!(rejection, BookingError::SlotUnavailable);
    assert_eq!(rejection.to_string(), TIME_SLOT_UNAVAILABLE);

    let days = projector
        .project(doctor, next_monday(), next_monday(), now())
        .await
        .unwrap();
    assert_eq!(cell_status(&days, t(9, 0)), SlotStatus::Available);
    assert_eq!(cell_status(&days, t(9, 30)), SlotStatus::BookedUpcoming);
    assert_eq!(cell_status(&days, t(10, 0)), SlotStatus::Available);
}

#[tokio::test]
async fn cancelling_restores_availability_but_not_the_template() {
    let store = Arc::new(ScheduleStore::new());
    let (booking, projector) = services(&store);
    let doctor = Uuid::new_v4();

    offer_monday_slots(&store, doctor, &[t(9, 30)]).await;

    let booked = booking
        .book(request(doctor, next_monday(), t(9, 30)))
        .await
        .unwrap();

    let days = projector
        .project(doctor, next_monday(), next_monday(), now())
        .await
        .unwrap();
    assert_eq!(cell_status(&days, t(9, 30)), SlotStatus::BookedUpcoming);

    booking.cancel(booked.id).await.unwrap();

    let days = projector
        .project(doctor, next_monday(), next_monday(), now())
        .await
        .unwrap();
    assert_eq!(cell_status(&days, t(9, 30)), SlotStatus::Available);

    // The weekly template still offers the slot.
    let template = store.template(doctor).await.unwrap();
    assert!(template.offers(Weekday::Mon, t(9, 30)));
}

#[tokio::test]
async fn misaligned_hour_is_a_validation_error_not_a_sentinel() {
    let store = Arc::new(ScheduleStore::new());
    let (booking, _) = services(&store);
    let doctor = Uuid::new_v4();
    offer_monday_slots(&store, doctor, &[t(9, 0)]).await;

    let err = booking
        .book(request(doctor, next_monday(), t(9, 15)))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::InvalidSlot(_));

    let err = booking
        .book(request(doctor, next_monday(), t(6, 0)))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::InvalidSlot(_));
}

#[tokio::test]
async fn unoffered_slot_and_closed_date_share_the_sentinel() {
    let store = Arc::new(ScheduleStore::new());
    let (booking, _) = services(&store);
    let doctor = Uuid::new_v4();
    offer_monday_slots(&store, doctor, &[t(9, 0)]).await;

    // Tuesday has no template entry at all.
    let tuesday = d(2026, 8, 11);
    let err = booking
        .book(request(doctor, tuesday, t(9, 0)))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::SlotUnavailable);

    // A date override closes an otherwise offered slot.
    store
        .mark_unavailable(doctor, next_monday())
        .await
        .unwrap();
    let err = booking
        .book(request(doctor, next_monday(), t(9, 0)))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::SlotUnavailable);
}

#[tokio::test]
async fn concurrent_bookings_admit_exactly_one_winner() {
    let store = Arc::new(ScheduleStore::new());
    let doctor = Uuid::new_v4();
    offer_monday_slots(&store, doctor, &[t(9, 30)]).await;

    let attempts = (0..12).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let (booking, _) = services(&store);
            booking.book(request(doctor, next_monday(), t(9, 30))).await
        })
    });

    let outcomes: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1);
    for outcome in outcomes {
        if let Err(err) = outcome {
            assert_matches!(err, BookingError::SlotUnavailable);
        }
    }
}

#[tokio::test]
async fn cancel_of_absent_appointment_reports_not_found() {
    let store = Arc::new(ScheduleStore::new());
    let (booking, _) = services(&store);

    let err = booking.cancel(Uuid::new_v4()).await.unwrap_err();
    assert_matches!(err, BookingError::NotFound);
}

#[tokio::test]
async fn reschedule_moves_the_record_and_frees_the_old_slot() {
    let store = Arc::new(ScheduleStore::new());
    let (booking, _) = services(&store);
    let doctor = Uuid::new_v4();
    offer_monday_slots(&store, doctor, &[t(9, 0), t(10, 0)]).await;

    let original = booking
        .book(request(doctor, next_monday(), t(9, 0)))
        .await
        .unwrap();

    let moved = booking
        .reschedule(
            original.id,
            RescheduleAppointmentRequest {
                date: next_monday(),
                hour: t(10, 0),
            },
        )
        .await
        .unwrap();

    assert_ne!(moved.id, original.id);
    assert_eq!(moved.hour, t(10, 0));
    assert_eq!(moved.patient_id, original.patient_id);
    assert_matches!(
        store.get(original.id).await,
        Err(StorageError::NotFound)
    );

    // The vacated slot is bookable again.
    booking
        .book(request(doctor, next_monday(), t(9, 0)))
        .await
        .unwrap();
}

#[tokio::test]
async fn reschedule_into_a_taken_slot_leaves_the_original_alone() {
    let store = Arc::new(ScheduleStore::new());
    let (booking, _) = services(&store);
    let doctor = Uuid::new_v4();
    offer_monday_slots(&store, doctor, &[t(9, 0), t(10, 0)]).await;

    let original = booking
        .book(request(doctor, next_monday(), t(9, 0)))
        .await
        .unwrap();
    booking
        .book(request(doctor, next_monday(), t(10, 0)))
        .await
        .unwrap();

    let err = booking
        .reschedule(
            original.id,
            RescheduleAppointmentRequest {
                date: next_monday(),
                hour: t(10, 0),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::SlotUnavailable);
    assert!(store.get(original.id).await.is_ok());
}

// ==============================================================================
// STORAGE FAILURE INJECTION
// ==============================================================================

mod storage_retry {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use mockall::mock;
    use mockall::Sequence;
    use shared_models::template::WeeklyTemplate;
    use std::collections::BTreeMap;

    mock! {
        Appointments {}

        #[async_trait]
        impl AppointmentRepository for Appointments {
            async fn insert(&self, appointment: Appointment) -> Result<Appointment, StorageError>;
            async fn remove(&self, id: Uuid) -> Result<Appointment, StorageError>;
            async fn get(&self, id: Uuid) -> Result<Appointment, StorageError>;
            async fn update_clinical(
                &self,
                id: Uuid,
                clinical: ClinicalNotes,
                flags: Option<AppointmentFlags>,
            ) -> Result<Appointment, StorageError>;
            async fn for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StorageError>;
            async fn for_doctor_on(
                &self,
                doctor_id: Uuid,
                date: NaiveDate,
            ) -> Result<Vec<Appointment>, StorageError>;
            async fn for_doctor_weekday_from(
                &self,
                doctor_id: Uuid,
                weekday: Weekday,
                from: NaiveDate,
            ) -> Result<Vec<Appointment>, StorageError>;
            async fn for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StorageError>;
        }
    }

    mock! {
        Availability {}

        #[async_trait]
        impl AvailabilityRepository for Availability {
            async fn template(&self, doctor_id: Uuid) -> Result<WeeklyTemplate, StorageError>;
            async fn union_slots(
                &self,
                doctor_id: Uuid,
                weekday: Weekday,
                slots: Vec<TimeSlot>,
            ) -> Result<WeeklyTemplate, StorageError>;
            async fn remove_slot(
                &self,
                doctor_id: Uuid,
                weekday: Weekday,
                start_time: NaiveTime,
            ) -> Result<WeeklyTemplate, StorageError>;
            async fn replace_slots(
                &self,
                doctor_id: Uuid,
                slots: BTreeMap<Weekday, Vec<TimeSlot>>,
            ) -> Result<WeeklyTemplate, StorageError>;
            async fn mark_unavailable(
                &self,
                doctor_id: Uuid,
                date: NaiveDate,
            ) -> Result<(), StorageError>;
            async fn clear_unavailable(
                &self,
                doctor_id: Uuid,
                date: NaiveDate,
            ) -> Result<(), StorageError>;
        }
    }

    fn monday_template() -> WeeklyTemplate {
        let mut template = WeeklyTemplate::default();
        template.union_slots(Weekday::Mon, [TimeSlot::from_start(t(9, 30))]);
        template
    }

    #[tokio::test]
    async fn transient_storage_outage_is_retried_to_success() {
        let mut appointments = MockAppointments::new();
        let mut availability = MockAvailability::new();

        availability
            .expect_template()
            .returning(|_| Ok(monday_template()));

        let mut seq = Sequence::new();
        appointments
            .expect_insert()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(StorageError::Unavailable("connection reset".to_string())));
        appointments
            .expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(Ok);

        let booking = BookingService::new(
            Arc::new(appointments),
            Arc::new(availability),
            SlotGrid::default(),
        )
        .with_retry_policy(3, Duration::from_millis(1));

        let booked = booking
            .book(request(Uuid::new_v4(), next_monday(), t(9, 30)))
            .await
            .unwrap();
        assert_eq!(booked.hour, t(9, 30));
    }

    #[tokio::test]
    async fn persistent_outage_surfaces_after_retries() {
        let mut appointments = MockAppointments::new();
        let mut availability = MockAvailability::new();

        availability
            .expect_template()
            .returning(|_| Ok(monday_template()));
        appointments
            .expect_insert()
            .times(3)
            .returning(|_| Err(StorageError::Unavailable("still down".to_string())));

        let booking = BookingService::new(
            Arc::new(appointments),
            Arc::new(availability),
            SlotGrid::default(),
        )
        .with_retry_policy(2, Duration::from_millis(1));

        let err = booking
            .book(request(Uuid::new_v4(), next_monday(), t(9, 30)))
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::Storage(_));
    }

    #[tokio::test]
    async fn duplicate_slot_is_terminal_and_never_retried() {
        let mut appointments = MockAppointments::new();
        let mut availability = MockAvailability::new();

        availability
            .expect_template()
            .returning(|_| Ok(monday_template()));
        appointments
            .expect_insert()
            .times(1)
            .returning(|_| Err(StorageError::DuplicateSlot));

        let booking = BookingService::new(
            Arc::new(appointments),
            Arc::new(availability),
            SlotGrid::default(),
        )
        .with_retry_policy(3, Duration::from_millis(1));

        let err = booking
            .book(request(Uuid::new_v4(), next_monday(), t(9, 30)))
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::SlotUnavailable);
    }
}
