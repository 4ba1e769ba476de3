//! Patient repository

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::Patient;

pub async fn list_patients(pool: &SqlitePool) -> Result<Vec<Patient>, DbError> {
    let patients = sqlx::query_as::<_, Patient>(
        "SELECT * FROM patients ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE",
    )
    .fetch_all(pool)
    .await?;
    Ok(patients)
}

pub async fn get_patient(pool: &SqlitePool, id: Uuid) -> Result<Patient, DbError> {
    sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::not_found("patient", id))
}

pub async fn insert_patient(pool: &SqlitePool, patient: &Patient) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO patients (
            id, first_name, last_name, email, phone, date_of_birth, gender,
            street, city, state, zip_code, medical_history, allergies,
            emergency_name, emergency_phone, emergency_relationship,
            registration_date, last_visit, next_appointment, total_visits, notes
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(patient.id)
    .bind(&patient.first_name)
    .bind(&patient.last_name)
    .bind(&patient.email)
    .bind(&patient.phone)
    .bind(patient.date_of_birth)
    .bind(&patient.gender)
    .bind(&patient.address.street)
    .bind(&patient.address.city)
    .bind(&patient.address.state)
    .bind(&patient.address.zip_code)
    .bind(serde_json::to_string(&patient.medical_history)?)
    .bind(serde_json::to_string(&patient.allergies)?)
    .bind(&patient.emergency_contact.name)
    .bind(&patient.emergency_contact.phone)
    .bind(&patient.emergency_contact.relationship)
    .bind(patient.registration_date)
    .bind(patient.last_visit)
    .bind(patient.next_appointment)
    .bind(patient.total_visits)
    .bind(&patient.notes)
    .execute(pool)
    .await?;

    debug!(patient_id = %patient.id, "patient inserted");
    Ok(())
}

/// Overwrites every mutable column of an existing patient
pub async fn update_patient(pool: &SqlitePool, patient: &Patient) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE patients SET
            first_name = ?, last_name = ?, email = ?, phone = ?, date_of_birth = ?, gender = ?,
            street = ?, city = ?, state = ?, zip_code = ?, medical_history = ?, allergies = ?,
            emergency_name = ?, emergency_phone = ?, emergency_relationship = ?,
            last_visit = ?, next_appointment = ?, total_visits = ?, notes = ?
        WHERE id = ?
        "#,
    )
    .bind(&patient.first_name)
    .bind(&patient.last_name)
    .bind(&patient.email)
    .bind(&patient.phone)
    .bind(patient.date_of_birth)
    .bind(&patient.gender)
    .bind(&patient.address.street)
    .bind(&patient.address.city)
    .bind(&patient.address.state)
    .bind(&patient.address.zip_code)
    .bind(serde_json::to_string(&patient.medical_history)?)
    .bind(serde_json::to_string(&patient.allergies)?)
    .bind(&patient.emergency_contact.name)
    .bind(&patient.emergency_contact.phone)
    .bind(&patient.emergency_contact.relationship)
    .bind(patient.last_visit)
    .bind(patient.next_appointment)
    .bind(patient.total_visits)
    .bind(&patient.notes)
    .bind(patient.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("patient", patient.id));
    }
    Ok(())
}

pub async fn delete_patient(pool: &SqlitePool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM patients WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("patient", id));
    }
    Ok(())
}

/// Bumps the visit counter and moves `last_visit` forward
pub async fn record_visit(pool: &SqlitePool, id: Uuid, visited_on: NaiveDate) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE patients SET
            total_visits = total_visits + 1,
            last_visit = CASE
                WHEN last_visit IS NULL OR last_visit < ? THEN ?
                ELSE last_visit
            END
        WHERE id = ?
        "#,
    )
    .bind(visited_on)
    .bind(visited_on)
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("patient", id));
    }
    Ok(())
}
