//! Appointment lifecycle
//!
//! Booking derives the end time from the duration and refuses start times
//! off the slot grid. Named actions move the status forward; a generic
//! update may still set any status.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use clinic_db::models::{
    Appointment, AppointmentStatus, AppointmentUpdate, NewAppointment, Patient, Reminder,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{end_time_for, minute_of_day, validate_duration, validate_span, ScheduleError, WorkingHours};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentAction {
    Confirm,
    Start,
    Complete,
    Cancel,
    NoShow,
    Reschedule,
    SendReminder,
}

impl AppointmentAction {
    /// Path segment of the action endpoint
    pub fn slug(&self) -> &'static str {
        match self {
            AppointmentAction::Confirm => "confirm",
            AppointmentAction::Start => "start",
            AppointmentAction::Complete => "complete",
            AppointmentAction::Cancel => "cancel",
            AppointmentAction::NoShow => "no-show",
            AppointmentAction::Reschedule => "reschedule",
            AppointmentAction::SendReminder => "send-reminder",
        }
    }
}

impl std::fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AppointmentAction::Confirm => "confirm",
            AppointmentAction::Start => "start",
            AppointmentAction::Complete => "complete",
            AppointmentAction::Cancel => "cancel",
            AppointmentAction::NoShow => "mark as no-show",
            AppointmentAction::Reschedule => "reschedule",
            AppointmentAction::SendReminder => "send a reminder for",
        })
    }
}

/// Actions offered for an appointment in the given status
pub fn available_actions(status: AppointmentStatus) -> &'static [AppointmentAction] {
    use AppointmentAction::*;
    match status {
        AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled => &[
            Confirm,
            Start,
            Complete,
            Cancel,
            NoShow,
            Reschedule,
            SendReminder,
        ],
        AppointmentStatus::Confirmed => &[Start, Complete, Cancel, NoShow, Reschedule, SendReminder],
        AppointmentStatus::InProgress => &[Complete],
        AppointmentStatus::Cancelled | AppointmentStatus::NoShow => &[Reschedule],
        AppointmentStatus::Completed => &[],
    }
}

fn ensure_allowed(status: AppointmentStatus, action: AppointmentAction) -> Result<(), ScheduleError> {
    if available_actions(status).contains(&action) {
        Ok(())
    } else {
        Err(ScheduleError::Transition { from: status, action })
    }
}

/// Books a new appointment; it starts out scheduled with no reminder sent
pub fn book(
    id: Uuid,
    form: NewAppointment,
    patient_name: String,
    hours: &WorkingHours,
    now: DateTime<Utc>,
) -> Result<Appointment, ScheduleError> {
    hours.validate_start(form.start_time)?;
    validate_duration(form.duration)?;
    validate_span(form.start_time, form.duration)?;

    Ok(Appointment {
        id,
        patient_id: form.patient_id,
        patient_name,
        doctor_name: form.doctor_name.trim().to_string(),
        appointment_date: form.appointment_date,
        start_time: form.start_time,
        end_time: end_time_for(form.start_time, form.duration),
        appointment_type: form.appointment_type,
        status: AppointmentStatus::Scheduled,
        duration: form.duration,
        notes: form.notes,
        reminder: Reminder::default(),
        created_date: now,
        updated_date: now,
    })
}

/// Applies a partial update, re-deriving the end time when start or duration move
pub fn apply_update(
    appointment: &mut Appointment,
    update: AppointmentUpdate,
    hours: &WorkingHours,
    now: DateTime<Utc>,
) -> Result<(), ScheduleError> {
    if let Some(start) = update.start_time {
        hours.validate_start(start)?;
    }
    if let Some(duration) = update.duration {
        validate_duration(duration)?;
    }
    validate_span(
        update.start_time.unwrap_or(appointment.start_time),
        update.duration.unwrap_or(appointment.duration),
    )?;

    if let Some(date) = update.appointment_date {
        appointment.appointment_date = date;
    }
    if let Some(start) = update.start_time {
        appointment.start_time = start;
    }
    if let Some(duration) = update.duration {
        appointment.duration = duration;
    }
    appointment.end_time = end_time_for(appointment.start_time, appointment.duration);

    if let Some(kind) = update.appointment_type {
        appointment.appointment_type = kind;
    }
    if let Some(status) = update.status {
        appointment.status = status;
    }
    if let Some(notes) = update.notes {
        appointment.notes = notes;
    }
    if let Some(doctor) = update.doctor_name {
        appointment.doctor_name = doctor;
    }
    appointment.updated_date = now;
    Ok(())
}

fn transition(
    appointment: &mut Appointment,
    action: AppointmentAction,
    to: AppointmentStatus,
    now: DateTime<Utc>,
) -> Result<(), ScheduleError> {
    ensure_allowed(appointment.status, action)?;
    appointment.status = to;
    appointment.updated_date = now;
    Ok(())
}

pub fn confirm(appointment: &mut Appointment, now: DateTime<Utc>) -> Result<(), ScheduleError> {
    transition(appointment, AppointmentAction::Confirm, AppointmentStatus::Confirmed, now)
}

pub fn start(appointment: &mut Appointment, now: DateTime<Utc>) -> Result<(), ScheduleError> {
    transition(appointment, AppointmentAction::Start, AppointmentStatus::InProgress, now)
}

/// Finishes the visit; the caller records it on the patient with [`record_visit`]
pub fn complete(appointment: &mut Appointment, now: DateTime<Utc>) -> Result<(), ScheduleError> {
    transition(appointment, AppointmentAction::Complete, AppointmentStatus::Completed, now)
}

pub fn cancel(appointment: &mut Appointment, now: DateTime<Utc>) -> Result<(), ScheduleError> {
    transition(appointment, AppointmentAction::Cancel, AppointmentStatus::Cancelled, now)
}

pub fn mark_no_show(appointment: &mut Appointment, now: DateTime<Utc>) -> Result<(), ScheduleError> {
    transition(appointment, AppointmentAction::NoShow, AppointmentStatus::NoShow, now)
}

/// Moves the visit to a new date and start time, keeping its duration
pub fn reschedule(
    appointment: &mut Appointment,
    date: NaiveDate,
    start_time: NaiveTime,
    hours: &WorkingHours,
    now: DateTime<Utc>,
) -> Result<(), ScheduleError> {
    ensure_allowed(appointment.status, AppointmentAction::Reschedule)?;
    hours.validate_start(start_time)?;
    validate_span(start_time, appointment.duration)?;

    appointment.appointment_date = date;
    appointment.start_time = start_time;
    appointment.end_time = end_time_for(start_time, appointment.duration);
    appointment.status = AppointmentStatus::Rescheduled;
    appointment.updated_date = now;
    Ok(())
}

pub fn send_reminder(appointment: &mut Appointment, now: DateTime<Utc>) -> Result<(), ScheduleError> {
    ensure_allowed(appointment.status, AppointmentAction::SendReminder)?;
    appointment.reminder = Reminder {
        sent: true,
        sent_date: Some(now),
    };
    appointment.updated_date = now;
    Ok(())
}

/// Counts a completed visit on the patient record
pub fn record_visit(patient: &mut Patient, visited_on: NaiveDate) {
    patient.total_visits += 1;
    if patient.last_visit.map_or(true, |last| last < visited_on) {
        patient.last_visit = Some(visited_on);
    }
}

/// Cancelled and missed visits leave the chair free
pub(crate) fn blocks_the_chair(appointment: &Appointment) -> bool {
    !matches!(
        appointment.status,
        AppointmentStatus::Cancelled | AppointmentStatus::NoShow
    )
}

/// First active appointment on `date` overlapping `[start, start + duration)`.
///
/// `exclude` skips the appointment being edited.
pub fn find_conflict<'a>(
    appointments: &'a [Appointment],
    date: NaiveDate,
    start: NaiveTime,
    duration_minutes: i32,
    exclude: Option<Uuid>,
) -> Option<&'a Appointment> {
    let start = minute_of_day(start);
    let end = start + i64::from(duration_minutes);
    appointments
        .iter()
        .filter(|a| Some(a.id) != exclude)
        .filter(|a| a.appointment_date == date && blocks_the_chair(a))
        .find(|a| {
            let other_start = minute_of_day(a.start_time);
            let other_end = other_start + i64::from(a.duration);
            other_start < end && start < other_end
        })
}

fn sorted_by_time(mut appointments: Vec<&Appointment>) -> Vec<&Appointment> {
    appointments.sort_by_key(|a| (a.appointment_date, a.start_time));
    appointments
}

pub fn on_date(appointments: &[Appointment], date: NaiveDate) -> Vec<&Appointment> {
    sorted_by_time(
        appointments
            .iter()
            .filter(|a| a.appointment_date == date)
            .collect(),
    )
}

pub fn for_patient(appointments: &[Appointment], patient_id: Uuid) -> Vec<&Appointment> {
    sorted_by_time(
        appointments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .collect(),
    )
}

/// Appointments from `today` through `today + days`, soonest first
pub fn upcoming(appointments: &[Appointment], today: NaiveDate, days: i64) -> Vec<&Appointment> {
    let until = match u64::try_from(days) {
        Ok(days) => today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX),
        Err(_) => return Vec::new(),
    };
    sorted_by_time(
        appointments
            .iter()
            .filter(|a| a.appointment_date >= today && a.appointment_date <= until)
            .collect(),
    )
}

/// Active appointments on `date` whose reminder has not gone out yet
pub fn due_for_reminder(appointments: &[Appointment], date: NaiveDate) -> Vec<&Appointment> {
    on_date(appointments, date)
        .into_iter()
        .filter(|a| !a.reminder.sent && available_actions(a.status).contains(&AppointmentAction::SendReminder))
        .collect()
}

/// Earliest future visit of a patient that is still going to happen
pub fn next_appointment_for(
    appointments: &[Appointment],
    patient_id: Uuid,
    today: NaiveDate,
) -> Option<NaiveDate> {
    appointments
        .iter()
        .filter(|a| a.patient_id == patient_id && a.appointment_date >= today)
        .filter(|a| {
            matches!(
                a.status,
                AppointmentStatus::Scheduled
                    | AppointmentStatus::Confirmed
                    | AppointmentStatus::Rescheduled
            )
        })
        .map(|a| a.appointment_date)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::tests::{at, booked};
    use chrono::Duration;
    use clinic_db::models::{Address, AppointmentType, EmergencyContact};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn form(start: NaiveTime, duration: i32) -> NewAppointment {
        NewAppointment {
            patient_id: Uuid::new_v4(),
            appointment_date: monday(),
            start_time: start,
            appointment_type: AppointmentType::RootCanal,
            duration,
            notes: String::new(),
            doctor_name: " Dr. Smith ".into(),
        }
    }

    #[test]
    fn booking_derives_end_time() {
        let hours = WorkingHours::default();
        let appointment =
            book(Uuid::new_v4(), form(at(9, 30), 90), "John Doe".into(), &hours, Utc::now()).unwrap();
        assert_eq!(appointment.end_time, at(11, 0));
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert!(!appointment.reminder.sent);
        assert_eq!(appointment.doctor_name, "Dr. Smith");
    }

    #[test]
    fn booking_refuses_off_grid_starts() {
        let hours = WorkingHours::default();
        let err = book(Uuid::new_v4(), form(at(9, 10), 30), "John".into(), &hours, Utc::now());
        assert!(matches!(err, Err(ScheduleError::OffGrid { .. })));
        let err = book(Uuid::new_v4(), form(at(9, 0), 600), "John".into(), &hours, Utc::now());
        assert_eq!(err, Err(ScheduleError::InvalidDuration(600)));
    }

    #[test]
    fn update_rederives_end_time() {
        let mut appointment = booked(monday(), at(9, 0), 30);
        let update = AppointmentUpdate {
            duration: Some(60),
            notes: Some("Bring X-rays".into()),
            ..Default::default()
        };
        apply_update(&mut appointment, update, &WorkingHours::default(), Utc::now()).unwrap();
        assert_eq!(appointment.end_time, at(10, 0));
        assert_eq!(appointment.notes, "Bring X-rays");

        let bad = AppointmentUpdate {
            start_time: Some(at(18, 0)),
            ..Default::default()
        };
        assert!(apply_update(&mut appointment, bad, &WorkingHours::default(), Utc::now()).is_err());
        assert_eq!(appointment.start_time, at(9, 0));
    }

    #[test]
    fn lifecycle() {
        let mut appointment = booked(monday(), at(9, 0), 30);
        confirm(&mut appointment, Utc::now()).unwrap();
        assert!(confirm(&mut appointment, Utc::now()).is_err());
        start(&mut appointment, Utc::now()).unwrap();
        assert_eq!(appointment.status, AppointmentStatus::InProgress);
        assert!(cancel(&mut appointment, Utc::now()).is_err());
        complete(&mut appointment, Utc::now()).unwrap();
        assert_eq!(
            send_reminder(&mut appointment, Utc::now()),
            Err(ScheduleError::Transition {
                from: AppointmentStatus::Completed,
                action: AppointmentAction::SendReminder
            })
        );
    }

    #[test]
    fn reschedule_moves_and_flags() {
        let hours = WorkingHours::default();
        let mut appointment = booked(monday(), at(9, 0), 45);
        mark_no_show(&mut appointment, Utc::now()).unwrap();

        let thursday = monday() + Duration::days(3);
        reschedule(&mut appointment, thursday, at(14, 0), &hours, Utc::now()).unwrap();
        assert_eq!(appointment.appointment_date, thursday);
        assert_eq!(appointment.end_time, at(14, 45));
        assert_eq!(appointment.status, AppointmentStatus::Rescheduled);
        assert!(reschedule(&mut appointment, thursday, at(17, 30), &hours, Utc::now()).is_err());
    }

    #[test]
    fn reminder_is_stamped() {
        let mut appointment = booked(monday(), at(9, 0), 30);
        let now = Utc::now();
        send_reminder(&mut appointment, now).unwrap();
        assert!(appointment.reminder.sent);
        assert_eq!(appointment.reminder.sent_date, Some(now));
    }

    #[test]
    fn conflicts_ignore_cancelled_and_adjacent() {
        let mut cancelled = booked(monday(), at(11, 0), 60);
        cancelled.status = AppointmentStatus::Cancelled;
        let morning = booked(monday(), at(9, 0), 60);
        let appointments = vec![morning.clone(), cancelled];

        assert_eq!(
            find_conflict(&appointments, monday(), at(9, 30), 30, None).map(|a| a.id),
            Some(morning.id)
        );
        assert!(find_conflict(&appointments, monday(), at(10, 0), 30, None).is_none());
        assert!(find_conflict(&appointments, monday(), at(11, 0), 30, None).is_none());
        assert!(find_conflict(&appointments, monday(), at(9, 0), 30, Some(morning.id)).is_none());
        assert!(find_conflict(&appointments, monday().succ_opt().unwrap(), at(9, 0), 30, None).is_none());
    }

    #[test]
    fn late_long_visits_are_refused_but_still_block() {
        let hours = WorkingHours::default();
        let err = book(Uuid::new_v4(), form(at(16, 0), 480), "John".into(), &hours, Utc::now());
        assert!(matches!(err, Err(ScheduleError::PastMidnight { .. })));

        let mut moved = booked(monday(), at(9, 0), 480);
        let err = reschedule(&mut moved, monday(), at(16, 30), &hours, Utc::now());
        assert!(matches!(err, Err(ScheduleError::PastMidnight { .. })));
        assert_eq!(moved.start_time, at(9, 0));

        // A stored visit whose end time wrapped to 00:00 still occupies its afternoon
        let long = booked(monday(), at(16, 0), 480);
        assert_eq!(long.end_time, at(0, 0));
        let appointments = vec![long.clone()];
        assert_eq!(
            find_conflict(&appointments, monday(), at(16, 0), 30, None).map(|a| a.id),
            Some(long.id)
        );
        assert_eq!(
            find_conflict(&appointments, monday(), at(16, 30), 30, None).map(|a| a.id),
            Some(long.id)
        );
    }

    #[test]
    fn upcoming_tolerates_any_window() {
        let appointments = vec![booked(monday() + Duration::days(400), at(9, 0), 30)];
        assert_eq!(upcoming(&appointments, monday(), 1_000_000_000).len(), 1);
        assert_eq!(upcoming(&appointments, monday(), i64::MAX).len(), 1);
        assert!(upcoming(&appointments, monday(), -1).is_empty());
    }

    #[test]
    fn listings_are_sorted() {
        let tuesday = monday().succ_opt().unwrap();
        let late = booked(monday(), at(15, 0), 30);
        let early = booked(monday(), at(9, 0), 30);
        let next = booked(tuesday, at(9, 0), 30);
        let far = booked(monday() + Duration::days(30), at(9, 0), 30);
        let appointments = vec![far, next.clone(), late.clone(), early.clone()];

        let ids = |list: Vec<&Appointment>| list.iter().map(|a| a.id).collect::<Vec<_>>();
        assert_eq!(ids(on_date(&appointments, monday())), vec![early.id, late.id]);
        assert_eq!(
            ids(upcoming(&appointments, monday(), 7)),
            vec![early.id, late.id, next.id]
        );
        assert_eq!(ids(for_patient(&appointments, next.patient_id)), vec![next.id]);
        assert_eq!(due_for_reminder(&appointments, monday()).len(), 2);
        assert_eq!(
            next_appointment_for(&appointments, next.patient_id, monday()),
            Some(tuesday)
        );
    }

    #[test]
    fn visits_move_forward() {
        let mut patient = Patient {
            id: Uuid::new_v4(),
            first_name: "Mike".into(),
            last_name: "Johnson".into(),
            email: "mike.johnson@email.com".into(),
            phone: "+1 (555) 456-7890".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1978, 11, 8).unwrap(),
            gender: None,
            address: Address::default(),
            medical_history: vec![],
            allergies: vec![],
            emergency_contact: EmergencyContact::default(),
            registration_date: Utc::now(),
            last_visit: Some(monday()),
            next_appointment: None,
            total_visits: 4,
            notes: String::new(),
        };
        record_visit(&mut patient, monday() - Duration::days(10));
        assert_eq!(patient.total_visits, 5);
        assert_eq!(patient.last_visit, Some(monday()));
    }
}
