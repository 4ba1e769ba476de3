//! Appointment repository

use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::Appointment;

pub async fn list_appointments(pool: &SqlitePool) -> Result<Vec<Appointment>, DbError> {
    let appointments = sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments ORDER BY appointment_date, start_time",
    )
    .fetch_all(pool)
    .await?;
    Ok(appointments)
}

pub async fn get_appointment(pool: &SqlitePool, id: Uuid) -> Result<Appointment, DbError> {
    sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::not_found("appointment", id))
}

pub async fn appointments_for_patient(
    pool: &SqlitePool,
    patient_id: Uuid,
) -> Result<Vec<Appointment>, DbError> {
    let appointments = sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE patient_id = ? ORDER BY appointment_date, start_time",
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;
    Ok(appointments)
}

pub async fn appointments_on(pool: &SqlitePool, date: NaiveDate) -> Result<Vec<Appointment>, DbError> {
    let appointments = sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE appointment_date = ? ORDER BY start_time",
    )
    .bind(date)
    .fetch_all(pool)
    .await?;
    Ok(appointments)
}

/// Appointments dated within `[from, to]`
pub async fn appointments_between(
    pool: &SqlitePool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Appointment>, DbError> {
    let appointments = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT * FROM appointments
        WHERE appointment_date >= ? AND appointment_date <= ?
        ORDER BY appointment_date, start_time
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(appointments)
}

pub async fn insert_appointment(pool: &SqlitePool, appointment: &Appointment) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO appointments (
            id, patient_id, patient_name, doctor_name, appointment_date, start_time, end_time,
            duration_minutes, type, status, notes, reminder_sent, reminder_sent_at,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(appointment.id)
    .bind(appointment.patient_id)
    .bind(&appointment.patient_name)
    .bind(&appointment.doctor_name)
    .bind(appointment.appointment_date)
    .bind(appointment.start_time)
    .bind(appointment.end_time)
    .bind(appointment.duration)
    .bind(appointment.appointment_type.as_str())
    .bind(appointment.status.as_str())
    .bind(&appointment.notes)
    .bind(appointment.reminder.sent)
    .bind(appointment.reminder.sent_date)
    .bind(appointment.created_date)
    .bind(appointment.updated_date)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_appointment(pool: &SqlitePool, appointment: &Appointment) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE appointments SET
            patient_name = ?, doctor_name = ?, appointment_date = ?, start_time = ?, end_time = ?,
            duration_minutes = ?, type = ?, status = ?, notes = ?, reminder_sent = ?,
            reminder_sent_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&appointment.patient_name)
    .bind(&appointment.doctor_name)
    .bind(appointment.appointment_date)
    .bind(appointment.start_time)
    .bind(appointment.end_time)
    .bind(appointment.duration)
    .bind(appointment.appointment_type.as_str())
    .bind(appointment.status.as_str())
    .bind(&appointment.notes)
    .bind(appointment.reminder.sent)
    .bind(appointment.reminder.sent_date)
    .bind(appointment.updated_date)
    .bind(appointment.id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("appointment", appointment.id));
    }
    Ok(())
}

pub async fn delete_appointment(pool: &SqlitePool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("appointment", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_pool;
    use crate::models::{AppointmentStatus, AppointmentType, Reminder};
    use chrono::{NaiveTime, Utc};

    fn appointment(date: NaiveDate, hour: u32, patient_id: Uuid) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            patient_name: "John Doe".into(),
            doctor_name: "Dr. Smith".into(),
            appointment_date: date,
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour, 30, 0).unwrap(),
            appointment_type: AppointmentType::Cleaning,
            status: AppointmentStatus::Scheduled,
            duration: 30,
            notes: String::new(),
            reminder: Reminder::default(),
            created_date: now,
            updated_date: now,
        }
    }

    #[tokio::test]
    async fn round_trip_and_queries() -> anyhow::Result<()> {
        let pool = memory_pool().await?;
        let patient_id = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let tuesday = monday.succ_opt().unwrap();

        let late = appointment(monday, 14, patient_id);
        let early = appointment(monday, 9, patient_id);
        let other = appointment(tuesday, 11, Uuid::new_v4());
        for a in [&late, &early, &other] {
            insert_appointment(&pool, a).await?;
        }

        let stored = get_appointment(&pool, early.id).await?;
        assert_eq!(stored, early_with_same_precision(&stored, &early));

        let on_monday = appointments_on(&pool, monday).await?;
        assert_eq!(
            on_monday.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![early.id, late.id]
        );
        assert_eq!(appointments_for_patient(&pool, patient_id).await?.len(), 2);
        assert_eq!(appointments_between(&pool, monday, tuesday).await?.len(), 3);

        let mut cancelled = stored.clone();
        cancelled.status = AppointmentStatus::Cancelled;
        update_appointment(&pool, &cancelled).await?;
        assert_eq!(
            get_appointment(&pool, early.id).await?.status,
            AppointmentStatus::Cancelled
        );

        delete_appointment(&pool, other.id).await?;
        assert_eq!(list_appointments(&pool).await?.len(), 2);
        Ok(())
    }

    /// Timestamps come back from SQLite exactly as written; compare the rest field by field
    fn early_with_same_precision(stored: &Appointment, original: &Appointment) -> Appointment {
        Appointment {
            created_date: stored.created_date,
            updated_date: stored.updated_date,
            ..original.clone()
        }
    }
}
