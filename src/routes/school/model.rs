use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl School {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, School>(
            "SELECT id, name, location, external_id, created_at FROM schools WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, School>(
            "SELECT id, name, location, external_id, created_at FROM schools ORDER BY name",
        )
        .fetch_all(pool)
        .await
    }

    /// Schools created by the federated login are keyed by their external
    /// school code; a second login with the same code reuses the row.
    pub async fn find_or_create_by_external_id<'e, E: PgExecutor<'e>>(
        executor: E,
        external_id: &str,
        location: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, School>(
            r#"
            INSERT INTO schools (name, location, external_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
            RETURNING id, name, location, external_id, created_at
            "#,
        )
        .bind(format!("Schule {}", external_id))
        .bind(location.unwrap_or("Deutschland"))
        .bind(external_id)
        .fetch_one(executor)
        .await
    }
}
