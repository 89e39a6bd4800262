//! 认证目录仓储

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::traits::CatalogRepositoryTrait;
use crate::error::Result;
use crate::models::MasterCertificationDefinition;

/// 认证目录仓储
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepositoryTrait for CatalogRepository {
    async fn get_definition(&self, id: Uuid) -> Result<Option<MasterCertificationDefinition>> {
        let definition = sqlx::query_as::<_, MasterCertificationDefinition>(
            r#"
            SELECT id, full_name, short_name, version, vendor, level, points, validity_months,
                   description, is_active, introduced_on, retired_on, created_at, updated_at
            FROM master_certifications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(definition)
    }

    async fn get_definitions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<MasterCertificationDefinition>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let definitions = sqlx::query_as::<_, MasterCertificationDefinition>(
            r#"
            SELECT id, full_name, short_name, version, vendor, level, points, validity_months,
                   description, is_active, introduced_on, retired_on, created_at, updated_at
            FROM master_certifications
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(definitions)
    }

    async fn list_definitions(
        &self,
        active_only: bool,
    ) -> Result<Vec<MasterCertificationDefinition>> {
        let definitions = sqlx::query_as::<_, MasterCertificationDefinition>(
            r#"
            SELECT id, full_name, short_name, version, vendor, level, points, validity_months,
                   description, is_active, introduced_on, retired_on, created_at, updated_at
            FROM master_certifications
            WHERE ($1 = FALSE OR is_active = TRUE)
            ORDER BY full_name
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(definitions)
    }

    async fn create_definition(&self, definition: &MasterCertificationDefinition) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO master_certifications (
                id, full_name, short_name, version, vendor, level, points, validity_months,
                description, is_active, introduced_on, retired_on, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(definition.id)
        .bind(&definition.full_name)
        .bind(&definition.short_name)
        .bind(&definition.version)
        .bind(&definition.vendor)
        .bind(definition.level)
        .bind(definition.points)
        .bind(definition.validity_months)
        .bind(&definition.description)
        .bind(definition.is_active)
        .bind(definition.introduced_on)
        .bind(definition.retired_on)
        .bind(definition.created_at)
        .bind(definition.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_definition(&self, definition: &MasterCertificationDefinition) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE master_certifications
            SET full_name = $2, short_name = $3, version = $4, vendor = $5, level = $6,
                points = $7, validity_months = $8, description = $9, is_active = $10,
                retired_on = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(definition.id)
        .bind(&definition.full_name)
        .bind(&definition.short_name)
        .bind(&definition.version)
        .bind(&definition.vendor)
        .bind(definition.level)
        .bind(definition.points)
        .bind(definition.validity_months)
        .bind(&definition.description)
        .bind(definition.is_active)
        .bind(definition.retired_on)
        .bind(definition.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
