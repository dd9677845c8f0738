use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    models::{LicenseType, Role},
    routes::{assignment::Assignment, license::License, user::User},
};

pub const UNSPECIFIED_SUBJECT: &str = "unspezifiziert";

#[derive(Debug, Clone, Serialize)]
pub struct Totals {
    pub users: i64,
    pub schools: i64,
    pub licenses: i64,
    pub assignments: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct SubjectCount {
    pub subject: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub totals: Totals,
    pub by_subject: Vec<SubjectCount>,
}

async fn count(pool: &PgPool, table: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
}

impl AdminStats {
    pub async fn load(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let (users, schools, licenses, assignments, by_subject) = futures_util::try_join!(
            count(pool, "users"),
            count(pool, "schools"),
            count(pool, "licenses"),
            count(pool, "assignments"),
            SubjectCount::load(pool),
        )?;

        Ok(Self {
            totals: Totals {
                users,
                schools,
                licenses,
                assignments,
            },
            by_subject,
        })
    }
}

impl SubjectCount {
    /// Licenses per subject; licenses without one are grouped as unspecified.
    pub async fn load(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubjectCount>(
            r#"
            SELECT COALESCE(NULLIF(subject, ''), $1) AS subject, COUNT(*) AS count
            FROM licenses
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(UNSPECIFIED_SUBJECT)
        .fetch_all(pool)
        .await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentExportRow {
    #[serde(rename = "Zugewiesen_an")]
    pub assigned_to: Option<String>,
    #[serde(rename = "Datum")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(rename = "LizenzReferenz")]
    pub school_license_id: Uuid,
}

impl From<Assignment> for AssignmentExportRow {
    fn from(a: Assignment) -> Self {
        Self {
            assigned_to: a.assigned_to,
            assigned_at: a.assigned_at,
            school_license_id: a.school_license_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserExportRow {
    #[serde(rename = "EMail")]
    pub email: String,
    #[serde(rename = "Rolle")]
    pub role: Role,
    #[serde(rename = "Schule")]
    pub school_id: Option<Uuid>,
}

impl From<User> for UserExportRow {
    fn from(u: User) -> Self {
        Self {
            email: u.email,
            role: u.role,
            school_id: u.school_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LicenseExportRow {
    #[serde(rename = "Titel")]
    pub title: String,
    #[serde(rename = "Fach")]
    pub subject: Option<String>,
    #[serde(rename = "Typ")]
    pub license_type: LicenseType,
    #[serde(rename = "Gültig_bis")]
    pub valid_until: NaiveDate,
}

impl From<License> for LicenseExportRow {
    fn from(l: License) -> Self {
        Self {
            title: l.title,
            subject: l.subject,
            license_type: l.license_type,
            valid_until: l.valid_until,
        }
    }
}
