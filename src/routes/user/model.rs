use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Role, Session};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub school_id: Option<Uuid>,
    pub vidis_pseudonym: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub school_id: Option<Uuid>,
    pub vidis_pseudonym: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub redirect_to: &'static str,
}

impl User {
    pub fn session(&self) -> Session {
        Session {
            user_id: self.id,
            role: self.role,
            school_id: self.school_id,
        }
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, school_id, vidis_pseudonym, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_pseudonym<'e, E: PgExecutor<'e>>(
        executor: E,
        pseudonym: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, school_id, vidis_pseudonym, created_at
            FROM users
            WHERE vidis_pseudonym = $1
            "#,
        )
        .bind(pseudonym)
        .fetch_optional(executor)
        .await
    }

    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        new_user: NewUser,
    ) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, role, school_id, vidis_pseudonym)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, name, role, school_id, vidis_pseudonym, created_at
            "#,
        )
        .bind(new_user.email)
        .bind(new_user.name)
        .bind(new_user.role)
        .bind(new_user.school_id)
        .bind(new_user.vidis_pseudonym)
        .fetch_one(executor)
        .await?;

        tracing::info!("Created user {} with role {}", user.id, user.role);
        Ok(user)
    }

    pub async fn set_role<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        role: Role,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, school_id, vidis_pseudonym, created_at
            FROM users
            ORDER BY created_at
            "#,
        )
        .fetch_all(pool)
        .await
    }
}
