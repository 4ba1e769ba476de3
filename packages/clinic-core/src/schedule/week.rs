//! Weekly calendar navigation
//!
//! A week is anchored on its Monday; moving forward or back shifts the
//! anchor by seven days.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use clinic_db::models::{clock_time, Appointment};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::appointments::blocks_the_chair;
use super::WorkingHours;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekView {
    /// Always a Monday
    pub start: NaiveDate,
}

impl WeekView {
    /// The week (Monday to Sunday) that contains `date`
    pub fn containing(date: NaiveDate) -> Self {
        let offset = i64::from(date.weekday().num_days_from_monday());
        Self {
            start: date - Duration::days(offset),
        }
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        (0..7).map(|offset| self.start + Duration::days(offset)).collect()
    }

    /// The Sunday closing the week
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(6)
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.start + Duration::days(7),
        }
    }

    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Duration::days(7),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end()
    }

    /// Appointments dated inside the week, by date then start time
    pub fn appointments<'a>(&self, appointments: &'a [Appointment]) -> Vec<&'a Appointment> {
        let mut in_week: Vec<&Appointment> = appointments
            .iter()
            .filter(|appointment| self.contains(appointment.appointment_date))
            .collect();
        in_week.sort_by_key(|appointment| (appointment.appointment_date, appointment.start_time));
        in_week
    }

    /// Day-by-slot grid of the week
    pub fn grid(&self, appointments: &[Appointment], hours: &WorkingHours) -> WeekGrid {
        let times = hours.slot_times();
        let days = self
            .days()
            .into_iter()
            .map(|date| WeekDay {
                date,
                cells: times
                    .iter()
                    .map(|&time| WeekCell {
                        time,
                        appointment_ids: cell_ids(appointments, date, time),
                    })
                    .collect(),
            })
            .collect();
        WeekGrid {
            week_start: self.start,
            days,
        }
    }
}

/// Appointments starting at `date` `time`, live ones before cancelled or missed ones
fn cell_ids(appointments: &[Appointment], date: NaiveDate, time: NaiveTime) -> Vec<Uuid> {
    let mut here: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.appointment_date == date && a.start_time == time)
        .collect();
    here.sort_by_key(|a| !blocks_the_chair(a));
    here.into_iter().map(|a| a.id).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekCell {
    #[serde(with = "clock_time")]
    pub time: NaiveTime,
    /// Appointments starting in this cell
    pub appointment_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekDay {
    pub date: NaiveDate,
    pub cells: Vec<WeekCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub week_start: NaiveDate,
    pub days: Vec<WeekDay>,
}

impl WeekGrid {
    pub fn cell(&self, date: NaiveDate, time: NaiveTime) -> Option<&WeekCell> {
        self.days
            .iter()
            .find(|day| day.date == date)?
            .cells
            .iter()
            .find(|cell| cell.time == time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::tests::{at, booked};
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn anchors_on_monday() {
        // Thursday 7 March 2024
        let week = WeekView::containing(date(2024, 3, 7));
        assert_eq!(week.start, date(2024, 3, 4));
        assert_eq!(week.start.weekday(), Weekday::Mon);
        assert_eq!(WeekView::containing(date(2024, 3, 10)), week);
        assert_eq!(WeekView::containing(date(2024, 3, 4)), week);

        let days = week.days();
        assert_eq!(days.len(), 7);
        assert_eq!(days[6], date(2024, 3, 10));
        assert_eq!(week.end(), date(2024, 3, 10));
    }

    #[test]
    fn navigation_moves_whole_weeks() {
        let week = WeekView::containing(date(2024, 1, 3));
        assert_eq!(week.start, date(2024, 1, 1));
        assert_eq!(week.next().start, date(2024, 1, 8));
        assert_eq!(week.previous().start, date(2023, 12, 25));
        assert_eq!(week.next().previous(), week);
    }

    #[test]
    fn grid_places_appointments_in_cells() {
        let week = WeekView::containing(date(2024, 3, 6));
        let wednesday = booked(date(2024, 3, 6), at(10, 0), 30);
        let next_week = booked(date(2024, 3, 11), at(10, 0), 30);
        let appointments = vec![wednesday.clone(), next_week];

        let grid = week.grid(&appointments, &WorkingHours::default());
        assert_eq!(grid.days.len(), 7);
        assert!(grid.days.iter().all(|day| day.cells.len() == 16));
        assert_eq!(
            grid.cell(date(2024, 3, 6), at(10, 0)).map(|c| c.appointment_ids.clone()),
            Some(vec![wednesday.id])
        );
        assert_eq!(
            grid.cell(date(2024, 3, 7), at(10, 0)).map(|c| c.appointment_ids.len()),
            Some(0)
        );
        assert_eq!(week.appointments(&appointments).len(), 1);
    }

    #[test]
    fn live_appointment_leads_its_cell() {
        let week = WeekView::containing(date(2024, 3, 6));
        let mut cancelled = booked(date(2024, 3, 6), at(10, 0), 30);
        cancelled.status = clinic_db::models::AppointmentStatus::Cancelled;
        let live = booked(date(2024, 3, 6), at(10, 0), 30);
        let appointments = vec![cancelled.clone(), live.clone()];

        let grid = week.grid(&appointments, &WorkingHours::default());
        assert_eq!(
            grid.cell(date(2024, 3, 6), at(10, 0)).map(|c| c.appointment_ids.clone()),
            Some(vec![live.id, cancelled.id])
        );
    }
}
