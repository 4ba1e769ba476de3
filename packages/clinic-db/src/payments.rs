//! Payment repository

use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::bills;
use crate::error::DbError;
use crate::models::{Bill, Payment};

pub async fn list_payments(pool: &SqlitePool) -> Result<Vec<Payment>, DbError> {
    let payments = sqlx::query_as::<_, Payment>("SELECT * FROM payments ORDER BY paid_at DESC")
        .fetch_all(pool)
        .await?;
    Ok(payments)
}

pub async fn get_payment(pool: &SqlitePool, id: Uuid) -> Result<Payment, DbError> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::not_found("payment", id))
}

pub async fn payments_for_bill(pool: &SqlitePool, bill_id: Uuid) -> Result<Vec<Payment>, DbError> {
    fetch_for_bill(pool, bill_id).await
}

pub async fn insert_payment(pool: &SqlitePool, payment: &Payment) -> Result<(), DbError> {
    write_payment(pool, payment).await
}

/// Records a payment against a bill in a single write transaction.
///
/// The bill is locked before it and its payments are read, so two payments
/// racing on the same bill are applied one after the other. `settle` receives
/// the bill and the payments already made on it; it updates the bill in place
/// and returns the payment to store. Nothing is written when it fails.
pub async fn record_for_bill<F, E>(pool: &SqlitePool, bill_id: Uuid, settle: F) -> Result<(Bill, Payment), E>
where
    F: FnOnce(&mut Bill, &[Payment]) -> Result<Payment, E>,
    E: From<DbError>,
{
    let mut transaction = pool.begin().await.map_err(DbError::from)?;
    let conn: &mut SqliteConnection = &mut transaction;

    bills::lock_bill(conn, bill_id).await?;
    let mut bill = bills::get_bill_on(conn, bill_id).await?;
    let earlier = fetch_for_bill(&mut *conn, bill_id).await?;

    let payment = settle(&mut bill, &earlier)?;
    write_payment(&mut *conn, &payment).await?;
    bills::update_bill_on(conn, &bill).await?;

    transaction.commit().await.map_err(DbError::from)?;
    debug!(bill_id = %bill.id, payment_id = %payment.id, status = bill.status.as_str(), "payment recorded");
    Ok((bill, payment))
}

async fn fetch_for_bill<'c, E>(executor: E, bill_id: Uuid) -> Result<Vec<Payment>, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE bill_id = ? ORDER BY paid_at",
    )
    .bind(bill_id)
    .fetch_all(executor)
    .await?;
    Ok(payments)
}

async fn write_payment<'c, E>(executor: E, payment: &Payment) -> Result<(), DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO payments (id, bill_id, amount, method, paid_at, reference, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payment.id)
    .bind(payment.bill_id)
    .bind(payment.amount.to_string())
    .bind(payment.method.as_str())
    .bind(payment.date)
    .bind(&payment.reference)
    .bind(&payment.notes)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_payment(pool: &SqlitePool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM payments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("payment", id));
    }
    Ok(())
}
