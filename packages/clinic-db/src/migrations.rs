//! Database migration system
//!
//! This module manages the SQLite schema migrations. Applied migrations are
//! tracked through `PRAGMA user_version`.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{error, info};

/// SQL migrations, applied in order
const MIGRATIONS: &[&str] = &[
    // 001_initial_schema.sql
    r#"
    CREATE TABLE IF NOT EXISTS patients (
        id BLOB PRIMARY KEY NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        date_of_birth DATE NOT NULL,
        gender TEXT,
        street TEXT NOT NULL DEFAULT '',
        city TEXT NOT NULL DEFAULT '',
        state TEXT NOT NULL DEFAULT '',
        zip_code TEXT NOT NULL DEFAULT '',
        medical_history TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
        allergies TEXT NOT NULL DEFAULT '[]',       -- JSON array of strings
        emergency_name TEXT NOT NULL DEFAULT '',
        emergency_phone TEXT NOT NULL DEFAULT '',
        emergency_relationship TEXT NOT NULL DEFAULT '',
        registration_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        last_visit DATE,
        next_appointment DATE,
        total_visits INTEGER NOT NULL DEFAULT 0,
        notes TEXT NOT NULL DEFAULT ''
    );

    -- Patient names are denormalized: appointments and bills outlive the patient row
    CREATE TABLE IF NOT EXISTS appointments (
        id BLOB PRIMARY KEY NOT NULL,
        patient_id BLOB NOT NULL,
        patient_name TEXT NOT NULL,
        doctor_name TEXT NOT NULL,
        appointment_date DATE NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        duration_minutes INTEGER NOT NULL DEFAULT 30,
        type TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('scheduled', 'confirmed', 'in-progress', 'completed', 'cancelled', 'no-show', 'rescheduled')),
        notes TEXT NOT NULL DEFAULT '',
        reminder_sent BOOLEAN NOT NULL DEFAULT 0,
        reminder_sent_at TIMESTAMP,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    -- Amounts are stored as decimal strings
    CREATE TABLE IF NOT EXISTS bills (
        id BLOB PRIMARY KEY NOT NULL,
        patient_id BLOB NOT NULL,
        patient_name TEXT NOT NULL,
        appointment_id BLOB,
        bill_number TEXT NOT NULL,
        issue_date DATE NOT NULL,
        due_date DATE NOT NULL,
        subtotal TEXT NOT NULL,
        tax TEXT NOT NULL,
        discount TEXT NOT NULL,
        total TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('draft', 'sent', 'paid', 'overdue', 'cancelled', 'partial')),
        payment_method TEXT,
        payment_date TIMESTAMP,
        notes TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS bill_items (
        id BLOB PRIMARY KEY NOT NULL,
        bill_id BLOB NOT NULL,
        position INTEGER NOT NULL,
        description TEXT NOT NULL,
        category TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity >= 1),
        unit_price TEXT NOT NULL,
        total TEXT NOT NULL,
        FOREIGN KEY (bill_id) REFERENCES bills (id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS payments (
        id BLOB PRIMARY KEY NOT NULL,
        bill_id BLOB NOT NULL,
        amount TEXT NOT NULL,
        method TEXT NOT NULL,
        paid_at TIMESTAMP NOT NULL,
        reference TEXT NOT NULL,
        notes TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS service_templates (
        id BLOB PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        default_price TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    );
    "#,
    // 002_indexes.sql
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_bills_bill_number ON bills (bill_number);
    CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients (last_name);
    CREATE INDEX IF NOT EXISTS idx_appointments_patient_id ON appointments (patient_id);
    CREATE INDEX IF NOT EXISTS idx_appointments_date ON appointments (appointment_date);
    CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments (status);
    CREATE INDEX IF NOT EXISTS idx_bills_patient_id ON bills (patient_id);
    CREATE INDEX IF NOT EXISTS idx_bills_status ON bills (status);
    CREATE INDEX IF NOT EXISTS idx_bill_items_bill_id ON bill_items (bill_id);
    CREATE INDEX IF NOT EXISTS idx_payments_bill_id ON payments (bill_id);
    CREATE INDEX IF NOT EXISTS idx_service_templates_category ON service_templates (category);
    "#,
    // 003_payments_cascade.sql
    r#"
    CREATE TABLE payments_new (
        id BLOB PRIMARY KEY NOT NULL,
        bill_id BLOB NOT NULL,
        amount TEXT NOT NULL,
        method TEXT NOT NULL,
        paid_at TIMESTAMP NOT NULL,
        reference TEXT NOT NULL,
        notes TEXT NOT NULL DEFAULT '',
        FOREIGN KEY (bill_id) REFERENCES bills (id) ON DELETE CASCADE
    );

    -- Payments whose bill is already gone are dropped
    INSERT INTO payments_new (id, bill_id, amount, method, paid_at, reference, notes)
    SELECT id, bill_id, amount, method, paid_at, reference, notes
    FROM payments
    WHERE bill_id IN (SELECT id FROM bills);

    DROP TABLE payments;
    ALTER TABLE payments_new RENAME TO payments;
    CREATE INDEX IF NOT EXISTS idx_payments_bill_id ON payments (bill_id);
    "#,
];

/// Number of migrations shipped with this build
pub fn latest_version() -> i64 {
    MIGRATIONS.len() as i64
}

/// Applies every pending migration
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Applying database migrations...");

    let mut version: i64 = 0;
    match sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
    {
        Ok(v) => version = v,
        Err(e) => {
            // A brand new file may not answer yet; start from zero
            error!("Failed to read database version: {}", e);
        }
    }

    info!("Current database version: {}", version);

    for (i, migration_sql) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as i64;

        if migration_version <= version {
            info!("Migration {} already applied", migration_version);
            continue;
        }

        info!("Applying migration {}...", migration_version);

        let mut transaction = pool
            .begin()
            .await
            .with_context(|| format!("Failed to open transaction for migration {}", migration_version))?;

        sqlx::query(migration_sql)
            .execute(&mut *transaction)
            .await
            .with_context(|| format!("Failed to execute migration {}", migration_version))?;

        sqlx::query(&format!("PRAGMA user_version = {}", migration_version))
            .execute(&mut *transaction)
            .await
            .with_context(|| format!("Failed to bump version to {}", migration_version))?;

        transaction
            .commit()
            .await
            .with_context(|| format!("Failed to commit migration {}", migration_version))?;

        info!("Migration {} applied", migration_version);
    }

    info!("Migrations finished. Current version: {}", MIGRATIONS.len());
    Ok(())
}
