//! Service template (price catalogue) repository

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{ServiceCategory, ServiceTemplate};

pub async fn list_templates(pool: &SqlitePool) -> Result<Vec<ServiceTemplate>, DbError> {
    let templates = sqlx::query_as::<_, ServiceTemplate>(
        "SELECT * FROM service_templates ORDER BY category, name",
    )
    .fetch_all(pool)
    .await?;
    Ok(templates)
}

pub async fn templates_in_category(
    pool: &SqlitePool,
    category: ServiceCategory,
) -> Result<Vec<ServiceTemplate>, DbError> {
    let templates = sqlx::query_as::<_, ServiceTemplate>(
        "SELECT * FROM service_templates WHERE category = ? ORDER BY name",
    )
    .bind(category.as_str())
    .fetch_all(pool)
    .await?;
    Ok(templates)
}

pub async fn get_template(pool: &SqlitePool, id: Uuid) -> Result<ServiceTemplate, DbError> {
    sqlx::query_as::<_, ServiceTemplate>("SELECT * FROM service_templates WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::not_found("service template", id))
}

pub async fn insert_template(pool: &SqlitePool, template: &ServiceTemplate) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO service_templates (id, name, category, default_price, description)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(template.id)
    .bind(&template.name)
    .bind(template.category.as_str())
    .bind(template.default_price.to_string())
    .bind(&template.description)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_template(pool: &SqlitePool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM service_templates WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("service template", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_pool;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn catalogue_by_category() -> anyhow::Result<()> {
        let pool = memory_pool().await?;
        let cleaning = ServiceTemplate {
            id: Uuid::new_v4(),
            name: "Routine Cleaning".into(),
            category: ServiceCategory::Cleaning,
            default_price: Decimal::new(12000, 2),
            description: "Standard dental cleaning and polishing".into(),
        };
        let crown = ServiceTemplate {
            id: Uuid::new_v4(),
            name: "Porcelain Crown".into(),
            category: ServiceCategory::Crown,
            default_price: Decimal::new(95000, 2),
            description: String::new(),
        };
        insert_template(&pool, &cleaning).await?;
        insert_template(&pool, &crown).await?;

        assert_eq!(get_template(&pool, crown.id).await?, crown);
        assert_eq!(
            templates_in_category(&pool, ServiceCategory::Cleaning).await?,
            vec![cleaning.clone()]
        );

        delete_template(&pool, cleaning.id).await?;
        assert_eq!(list_templates(&pool).await?, vec![crown]);
        Ok(())
    }
}
