//! Bill repository
//!
//! A bill and its line items are always written together inside one
//! transaction.

use std::collections::HashMap;

use sqlx::{Executor, FromRow, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{Bill, BillItem, BillStatus};

pub async fn list_bills(pool: &SqlitePool) -> Result<Vec<Bill>, DbError> {
    let bills = sqlx::query_as::<_, Bill>("SELECT * FROM bills ORDER BY issue_date DESC, bill_number DESC")
        .fetch_all(pool)
        .await?;
    attach_items(pool, bills).await
}

pub async fn get_bill(pool: &SqlitePool, id: Uuid) -> Result<Bill, DbError> {
    let bill = sqlx::query_as::<_, Bill>("SELECT * FROM bills WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::not_found("bill", id))?;
    let mut bills = attach_items(pool, vec![bill]).await?;
    bills.pop().ok_or_else(|| DbError::not_found("bill", id))
}

/// Like [`get_bill`], on a connection that already holds a transaction
pub async fn get_bill_on(conn: &mut SqliteConnection, id: Uuid) -> Result<Bill, DbError> {
    let bill = sqlx::query_as::<_, Bill>("SELECT * FROM bills WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("bill", id))?;
    let mut bills = attach_items(&mut *conn, vec![bill]).await?;
    bills.pop().ok_or_else(|| DbError::not_found("bill", id))
}

/// Takes the database write lock through a no-op update of the bill row.
///
/// Reads made after this inside the same transaction cannot be invalidated
/// by another writer before commit.
pub async fn lock_bill(conn: &mut SqliteConnection, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE bills SET updated_at = updated_at WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("bill", id));
    }
    Ok(())
}

pub async fn bills_for_patient(pool: &SqlitePool, patient_id: Uuid) -> Result<Vec<Bill>, DbError> {
    let bills = sqlx::query_as::<_, Bill>(
        "SELECT * FROM bills WHERE patient_id = ? ORDER BY issue_date DESC",
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;
    attach_items(pool, bills).await
}

pub async fn bills_with_status(pool: &SqlitePool, status: BillStatus) -> Result<Vec<Bill>, DbError> {
    let bills = sqlx::query_as::<_, Bill>(
        "SELECT * FROM bills WHERE status = ? ORDER BY issue_date DESC",
    )
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;
    attach_items(pool, bills).await
}

/// Bill numbers starting with `prefix`, used to pick the next sequence number
pub async fn bill_numbers_with_prefix(pool: &SqlitePool, prefix: &str) -> Result<Vec<String>, DbError> {
    let numbers = sqlx::query_scalar::<_, String>("SELECT bill_number FROM bills WHERE bill_number LIKE ?")
        .bind(format!("{}%", prefix))
        .fetch_all(pool)
        .await?;
    Ok(numbers)
}

pub async fn insert_bill(pool: &SqlitePool, bill: &Bill) -> Result<(), DbError> {
    let mut transaction = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO bills (
            id, patient_id, patient_name, appointment_id, bill_number, issue_date, due_date,
            subtotal, tax, discount, total, status, payment_method, payment_date, notes,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(bill.id)
    .bind(bill.patient_id)
    .bind(&bill.patient_name)
    .bind(bill.appointment_id)
    .bind(&bill.bill_number)
    .bind(bill.issue_date)
    .bind(bill.due_date)
    .bind(bill.subtotal.to_string())
    .bind(bill.tax.to_string())
    .bind(bill.discount.to_string())
    .bind(bill.total.to_string())
    .bind(bill.status.as_str())
    .bind(bill.payment_method.map(|m| m.as_str()))
    .bind(bill.payment_date)
    .bind(&bill.notes)
    .bind(bill.created_date)
    .bind(bill.updated_date)
    .execute(&mut *transaction)
    .await?;

    write_items(&mut *transaction, bill).await?;
    transaction.commit().await?;

    debug!(bill_id = %bill.id, bill_number = %bill.bill_number, "bill inserted");
    Ok(())
}

/// Overwrites the bill row and replaces its line items
pub async fn update_bill(pool: &SqlitePool, bill: &Bill) -> Result<(), DbError> {
    let mut transaction = pool.begin().await?;
    update_bill_on(&mut *transaction, bill).await?;
    transaction.commit().await?;
    Ok(())
}

/// Like [`update_bill`], on a connection that already holds a transaction
pub async fn update_bill_on(conn: &mut SqliteConnection, bill: &Bill) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE bills SET
            patient_name = ?, appointment_id = ?, due_date = ?, subtotal = ?, tax = ?,
            discount = ?, total = ?, status = ?, payment_method = ?, payment_date = ?,
            notes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&bill.patient_name)
    .bind(bill.appointment_id)
    .bind(bill.due_date)
    .bind(bill.subtotal.to_string())
    .bind(bill.tax.to_string())
    .bind(bill.discount.to_string())
    .bind(bill.total.to_string())
    .bind(bill.status.as_str())
    .bind(bill.payment_method.map(|m| m.as_str()))
    .bind(bill.payment_date)
    .bind(&bill.notes)
    .bind(bill.updated_date)
    .bind(bill.id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("bill", bill.id));
    }

    sqlx::query("DELETE FROM bill_items WHERE bill_id = ?")
        .bind(bill.id)
        .execute(&mut *conn)
        .await?;
    write_items(conn, bill).await
}

/// Deletes the bill together with its line items and payments
pub async fn delete_bill(pool: &SqlitePool, id: Uuid) -> Result<(), DbError> {
    let mut transaction = pool.begin().await?;

    let payments = sqlx::query("DELETE FROM payments WHERE bill_id = ?")
        .bind(id)
        .execute(&mut *transaction)
        .await?;
    let result = sqlx::query("DELETE FROM bills WHERE id = ?")
        .bind(id)
        .execute(&mut *transaction)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("bill", id));
    }

    transaction.commit().await?;
    debug!(bill_id = %id, payments = payments.rows_affected(), "bill deleted");
    Ok(())
}

async fn write_items(conn: &mut SqliteConnection, bill: &Bill) -> Result<(), DbError> {
    for (position, item) in bill.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO bill_items (id, bill_id, position, description, category, quantity, unit_price, total)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id)
        .bind(bill.id)
        .bind(position as i64)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(item.quantity)
        .bind(item.unit_price.to_string())
        .bind(item.total.to_string())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn attach_items<'c, E>(executor: E, mut bills: Vec<Bill>) -> Result<Vec<Bill>, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    if bills.is_empty() {
        return Ok(bills);
    }

    let rows = match bills.as_slice() {
        [single] => {
            sqlx::query("SELECT * FROM bill_items WHERE bill_id = ? ORDER BY position")
                .bind(single.id)
                .fetch_all(executor)
                .await?
        }
        _ => {
            sqlx::query("SELECT * FROM bill_items ORDER BY bill_id, position")
                .fetch_all(executor)
                .await?
        }
    };

    let mut by_bill: HashMap<Uuid, Vec<BillItem>> = HashMap::new();
    for row in &rows {
        let bill_id: Uuid = row.try_get("bill_id")?;
        by_bill
            .entry(bill_id)
            .or_default()
            .push(BillItem::from_row(row)?);
    }

    for bill in &mut bills {
        bill.items = by_bill.remove(&bill.id).unwrap_or_default();
    }
    Ok(bills)
}
