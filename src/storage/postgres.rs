use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use std::marker::PhantomData;
use uuid::Uuid;

use super::{Document, DocumentStore, StoreError};
use crate::domain::tenant::TenantId;

/// Documents in the shared `documents` table, one JSONB body per row.
pub struct PgDocumentStore<T: Document> {
    pool: PgPool,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Document> PgDocumentStore<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: PhantomData,
        }
    }
}

fn map_write_error(collection: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation(collection),
        other => StoreError::Database(other),
    }
}

fn unwrap_rows<T>(rows: Vec<(Json<T>,)>) -> Vec<T> {
    rows.into_iter().map(|(Json(doc),)| doc).collect()
}

#[async_trait]
impl<T: Document> DocumentStore<T> for PgDocumentStore<T> {
    async fn insert(&self, doc: &T) -> Result<(), StoreError> {
        let result = sqlx::query(
            "insert into documents (collection, id, tenant_id, body)
             values ($1, $2, $3, $4)",
        )
        .bind(T::COLLECTION)
        .bind(doc.id())
        .bind(doc.tenant_id().as_uuid())
        .bind(Json(doc))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.constraint() == Some("documents_pkey") => {
                Err(StoreError::Duplicate {
                    collection: T::COLLECTION,
                    id: doc.id(),
                })
            }
            Err(e) => Err(map_write_error(T::COLLECTION, e)),
        }
    }

    async fn get(&self, tenant: TenantId, id: Uuid) -> Result<Option<T>, StoreError> {
        let row: Option<(Json<T>,)> = sqlx::query_as(
            "select body from documents where collection = $1 and id = $2 and tenant_id = $3",
        )
        .bind(T::COLLECTION)
        .bind(id)
        .bind(tenant.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(Json(doc),)| doc))
    }

    async fn list(&self, tenant: TenantId) -> Result<Vec<T>, StoreError> {
        let rows: Vec<(Json<T>,)> = sqlx::query_as(
            "select body from documents where collection = $1 and tenant_id = $2 order by created_at",
        )
        .bind(T::COLLECTION)
        .bind(tenant.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(unwrap_rows(rows))
    }

    async fn update(&self, doc: &T) -> Result<(), StoreError> {
        let result = sqlx::query(
            "update documents set body = $4, updated_at = now()
             where collection = $1 and id = $2 and tenant_id = $3",
        )
        .bind(T::COLLECTION)
        .bind(doc.id())
        .bind(doc.tenant_id().as_uuid())
        .bind(Json(doc))
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(T::COLLECTION, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: T::COLLECTION,
                id: doc.id(),
            });
        }
        Ok(())
    }

    async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "delete from documents where collection = $1 and id = $2 and tenant_id = $3",
        )
        .bind(T::COLLECTION)
        .bind(id)
        .bind(tenant.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: T::COLLECTION,
                id,
            });
        }
        Ok(())
    }

    async fn save_versioned(&self, doc: &T, version: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "insert into documents (collection, id, tenant_id, body)
             values ($1, $2, $3, $4)
             on conflict (collection, id) do update
                set body = excluded.body, updated_at = now()
              where documents.tenant_id = excluded.tenant_id
                and coalesce((documents.body ->> 'version')::bigint, -1) < $5",
        )
        .bind(T::COLLECTION)
        .bind(doc.id())
        .bind(doc.tenant_id().as_uuid())
        .bind(Json(doc))
        .bind(version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(T::COLLECTION, e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_field(&self, tenant: TenantId, field: &str, value: &str) -> Result<Vec<T>, StoreError> {
        let rows: Vec<(Json<T>,)> = sqlx::query_as(
            "select body from documents
             where collection = $1 and tenant_id = $2 and lower(body ->> $3) = lower($4)
             order by created_at",
        )
        .bind(T::COLLECTION)
        .bind(tenant.as_uuid())
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        Ok(unwrap_rows(rows))
    }

    async fn list_all(&self) -> Result<Vec<T>, StoreError> {
        let rows: Vec<(Json<T>,)> = sqlx::query_as(
            "select body from documents where collection = $1 order by created_at",
        )
        .bind(T::COLLECTION)
        .fetch_all(&self.pool)
        .await?;

        Ok(unwrap_rows(rows))
    }

    async fn find_any_by_field(&self, field: &str, value: &str) -> Result<Vec<T>, StoreError> {
        let rows: Vec<(Json<T>,)> = sqlx::query_as(
            "select body from documents
             where collection = $1 and lower(body ->> $2) = lower($3)
             order by created_at",
        )
        .bind(T::COLLECTION)
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        Ok(unwrap_rows(rows))
    }
}
