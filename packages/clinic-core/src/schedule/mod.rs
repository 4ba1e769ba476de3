//! Scheduling rules
//!
//! - Working hours and the fixed slot grid inside them
//! - Per-day slot availability derived from booked appointments
//! - Weekly navigation ([`week`]) and the appointment lifecycle ([`appointments`])
//!
//! A slot is booked when an appointment on that date starts exactly at the
//! slot time. Start times off the grid are refused when booking, so every
//! stored appointment shows up on some slot.

pub mod appointments;
pub mod week;

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use clinic_db::models::{clock_time, Appointment, AppointmentStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use self::appointments::blocks_the_chair;

pub use appointments::AppointmentAction;
pub use week::{WeekGrid, WeekView};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Working hours must start before they end and use a positive slot length")]
    InvalidHours,

    #[error("{time} is outside working hours ({start}-{end})")]
    OutsideWorkingHours {
        time: NaiveTime,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("{time} is not on the {slot_minutes}-minute slot grid")]
    OffGrid { time: NaiveTime, slot_minutes: u32 },

    #[error("Duration must be between 5 and 480 minutes, got {0}")]
    InvalidDuration(i32),

    #[error("A {duration}-minute visit starting at {start} would run past midnight")]
    PastMidnight { start: NaiveTime, duration: i32 },

    #[error("Cannot {action} an appointment that is {from}")]
    Transition {
        from: AppointmentStatus,
        action: AppointmentAction,
    },
}

/// Opening hours of the clinic and the width of one booking slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    #[serde(with = "clock_time")]
    pub start: NaiveTime,
    #[serde(with = "clock_time")]
    pub end: NaiveTime,
    pub slot_minutes: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            slot_minutes: 30,
        }
    }
}

impl WorkingHours {
    pub fn new(start: NaiveTime, end: NaiveTime, slot_minutes: u32) -> Result<Self, ScheduleError> {
        if start >= end || slot_minutes == 0 {
            return Err(ScheduleError::InvalidHours);
        }
        Ok(Self {
            start,
            end,
            slot_minutes,
        })
    }

    /// Slot start times from `start` (inclusive) to `end` (exclusive)
    pub fn slot_times(&self) -> Vec<NaiveTime> {
        let mut times = Vec::new();
        if self.slot_minutes == 0 {
            return times;
        }
        let step = Duration::minutes(i64::from(self.slot_minutes));
        let mut current = self.start;
        while current < self.end {
            times.push(current);
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }
        times
    }

    /// Refuses start times outside the window or between two slots
    pub fn validate_start(&self, time: NaiveTime) -> Result<(), ScheduleError> {
        if time < self.start || time >= self.end {
            return Err(ScheduleError::OutsideWorkingHours {
                time,
                start: self.start,
                end: self.end,
            });
        }
        let offset = time - self.start;
        let on_grid = time.second() == 0
            && time.nanosecond() == 0
            && self.slot_minutes > 0
            && offset.num_minutes() % i64::from(self.slot_minutes) == 0;
        if !on_grid {
            return Err(ScheduleError::OffGrid {
                time,
                slot_minutes: self.slot_minutes,
            });
        }
        Ok(())
    }
}

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minutes elapsed since midnight
pub fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight() / 60)
}

/// End of a visit starting at `start` and lasting `duration_minutes`.
///
/// Only meaningful for visits accepted by [`validate_span`]; longer ones wrap.
pub fn end_time_for(start: NaiveTime, duration_minutes: i32) -> NaiveTime {
    start.overflowing_add_signed(Duration::minutes(i64::from(duration_minutes))).0
}

/// Refuses visits that would end at or after midnight
pub fn validate_span(start: NaiveTime, duration_minutes: i32) -> Result<(), ScheduleError> {
    if minute_of_day(start) + i64::from(duration_minutes) >= MINUTES_PER_DAY {
        return Err(ScheduleError::PastMidnight {
            start,
            duration: duration_minutes,
        });
    }
    Ok(())
}

pub fn validate_duration(duration_minutes: i32) -> Result<(), ScheduleError> {
    if !(5..=480).contains(&duration_minutes) {
        return Err(ScheduleError::InvalidDuration(duration_minutes));
    }
    Ok(())
}

/// One bookable interval of a day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    #[serde(with = "clock_time")]
    pub time: NaiveTime,
    pub available: bool,
    /// Appointment occupying the slot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
}

/// Slot grid for `date`, marking the slots where an appointment starts
pub fn day_slots(date: NaiveDate, appointments: &[Appointment], hours: &WorkingHours) -> Vec<TimeSlot> {
    let booked_that_day: Vec<&Appointment> = appointments
        .iter()
        .filter(|appointment| appointment.appointment_date == date)
        .collect();

    hours
        .slot_times()
        .into_iter()
        .map(|time| {
            let starting_here = || {
                booked_that_day
                    .iter()
                    .filter(move |appointment| appointment.start_time == time)
            };
            let booked = starting_here()
                .find(|appointment| blocks_the_chair(appointment))
                .or_else(|| starting_here().next());
            TimeSlot {
                time,
                available: booked.is_none(),
                appointment_id: booked.map(|appointment| appointment.id),
            }
        })
        .collect()
}

/// A date with its slot grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub time_slots: Vec<TimeSlot>,
}

impl DaySchedule {
    pub fn build(date: NaiveDate, appointments: &[Appointment], hours: &WorkingHours) -> Self {
        Self {
            date,
            time_slots: day_slots(date, appointments, hours),
        }
    }

    pub fn available_count(&self) -> usize {
        self.time_slots.iter().filter(|slot| slot.available).count()
    }
}
