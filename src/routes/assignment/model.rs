use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{error::AppError, routes::license::License};

const MISSING_INPUT: &str = "Bitte Klasse oder Lehrkraft angeben";
const BAD_FORMAT: &str = "Ungültiges Format. Beispiel: \"9a x 3\"";

/// `<name>` optionally followed by `x <count>`, e.g. `9a x 3`. Only ASCII
/// digits form a count.
static ASSIGNMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*?)(?:\s*x\s*([0-9]+))?$").expect("assignment pattern compiles")
});

/// A parsed claim request: who gets the seats and how many.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRequest {
    pub name: String,
    pub count: i64,
}

impl AssignmentRequest {
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AppError::Validation(MISSING_INPUT.into()));
        }

        let captures = ASSIGNMENT_PATTERN
            .captures(input)
            .ok_or_else(|| AppError::Validation(BAD_FORMAT.into()))?;

        let name = captures
            .get(1)
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        let count = match captures.get(2) {
            Some(digits) => digits
                .as_str()
                .parse::<i64>()
                .map_err(|_| AppError::Validation(BAD_FORMAT.into()))?,
            None => 1,
        };

        if name.is_empty() || count < 1 {
            return Err(AppError::Validation(BAD_FORMAT.into()));
        }

        Ok(Self {
            name: name.to_string(),
            count,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub school_license_id: Uuid,
    pub assigned_to: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    pub school_license_id: Uuid,
    pub name: String,
    pub claimed: i64,
}

impl Assignment {
    /// Claims `request.count` free seats of a school license for
    /// `request.name`, all or nothing.
    ///
    /// Claims on the same pool are serialized by locking the school license
    /// row first, so the free seats read afterwards are exactly the ones
    /// available. If fewer are free than requested the transaction is rolled
    /// back untouched and the error reports how many were free.
    pub async fn claim(
        pool: &PgPool,
        school_license_id: Uuid,
        request: &AssignmentRequest,
    ) -> Result<ClaimOutcome, AppError> {
        let mut tx = pool.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM school_licenses WHERE id = $1 FOR UPDATE")
            .bind(school_license_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Lizenz nicht gefunden".into()))?;

        let free: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM assignments
            WHERE school_license_id = $1 AND assigned_to IS NULL
            ORDER BY created_at, id
            LIMIT $2
            FOR UPDATE
            "#,
        )
        .bind(school_license_id)
        .bind(request.count)
        .fetch_all(&mut *tx)
        .await?;

        let available = free.len() as i64;
        if available < request.count {
            tx.rollback().await?;
            tracing::info!(
                "Claim of {} seats on {} refused, {} free",
                request.count,
                school_license_id,
                available
            );
            return Err(AppError::InsufficientSeats {
                requested: request.count,
                available,
            });
        }

        let claimed = sqlx::query(
            r#"
            UPDATE assignments
            SET assigned_to = $1, assigned_at = NOW()
            WHERE id = ANY($2) AND assigned_to IS NULL
            "#,
        )
        .bind(&request.name)
        .bind(&free)
        .execute(&mut *tx)
        .await?
        .rows_affected() as i64;

        if claimed != request.count {
            tx.rollback().await?;
            return Err(AppError::Internal(format!(
                "claimed {} of {} locked seats on {}",
                claimed, request.count, school_license_id
            )));
        }

        tx.commit().await?;
        tracing::info!(
            "{} seats on {} assigned to {}",
            claimed,
            school_license_id,
            request.name
        );

        Ok(ClaimOutcome {
            school_license_id,
            name: request.name.clone(),
            claimed,
        })
    }

    pub async fn list_for_school_licenses(
        pool: &PgPool,
        school_license_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Assignment>(
            r#"
            SELECT id, school_license_id, assigned_to, assigned_at
            FROM assignments
            WHERE school_license_id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(school_license_ids)
        .fetch_all(pool)
        .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Assignment>(
            r#"
            SELECT id, school_license_id, assigned_to, assigned_at
            FROM assignments
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// The seat held by `pseudonym`, otherwise any free seat.
    pub async fn find_for_user(
        pool: &PgPool,
        school_license_id: Uuid,
        pseudonym: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Assignment>(
            r#"
            SELECT id, school_license_id, assigned_to, assigned_at
            FROM assignments
            WHERE school_license_id = $1 AND (assigned_to IS NULL OR assigned_to = $2)
            ORDER BY (assigned_to IS NULL), created_at
            LIMIT 1
            "#,
        )
        .bind(school_license_id)
        .bind(pseudonym)
        .fetch_optional(pool)
        .await
    }
}

#[derive(Debug, FromRow)]
struct SchoolLicenseRow {
    school_license_id: Uuid,
    quantity: i32,
    #[sqlx(flatten)]
    license: License,
}

/// One license of a school with its seat pool.
#[derive(Debug, Clone, Serialize)]
pub struct SchoolLicenseOverview {
    pub id: Uuid,
    pub quantity: i32,
    pub assigned: usize,
    pub license: License,
    pub assignments: Vec<Assignment>,
}

impl SchoolLicenseOverview {
    pub fn new(id: Uuid, quantity: i32, license: License, assignments: Vec<Assignment>) -> Self {
        let assigned = assignments
            .iter()
            .filter(|a| a.assigned_to.is_some())
            .count();
        Self {
            id,
            quantity,
            assigned,
            license,
            assignments,
        }
    }

    pub async fn list_for_school(pool: &PgPool, school_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, SchoolLicenseRow>(
            r#"
            SELECT
                sl.id AS school_license_id, sl.quantity,
                l.id, l.title, l.type, l.valid_from, l.valid_until, l.subject, l.grade_level,
                l.permission, l.prohibition, l.duty, l.scope, l.created_by, l.created_at
            FROM school_licenses sl
            JOIN licenses l ON l.id = sl.license_id
            WHERE sl.school_id = $1
            ORDER BY sl.created_at
            "#,
        )
        .bind(school_id)
        .fetch_all(pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.school_license_id).collect();
        let mut by_license: HashMap<Uuid, Vec<Assignment>> = HashMap::new();
        for assignment in Assignment::list_for_school_licenses(pool, &ids).await? {
            by_license
                .entry(assignment.school_license_id)
                .or_default()
                .push(assignment);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let assignments = by_license
                    .remove(&row.school_license_id)
                    .unwrap_or_default();
                Self::new(row.school_license_id, row.quantity, row.license, assignments)
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionEntry {
    pub assigned_to: String,
    pub count: usize,
}

/// Claimed seats per class or person across all given licenses, by name.
pub fn distribution(overviews: &[SchoolLicenseOverview]) -> Vec<DistributionEntry> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for assigned_to in overviews
        .iter()
        .flat_map(|o| o.assignments.iter())
        .filter_map(|a| a.assigned_to.as_deref())
    {
        *counts.entry(assigned_to).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(assigned_to, count)| DistributionEntry {
            assigned_to: assigned_to.to_string(),
            count,
        })
        .collect()
}

const MISSING_VALUE: &str = "–";

/// One line of the school export, one per seat.
#[derive(Debug, Clone, Serialize)]
pub struct SchoolExportRow {
    #[serde(rename = "Lizenz")]
    pub license: String,
    #[serde(rename = "Typ")]
    pub license_type: String,
    #[serde(rename = "Fach")]
    pub subject: String,
    #[serde(rename = "Jahrgang")]
    pub grade_level: String,
    #[serde(rename = "Zugewiesen_an")]
    pub assigned_to: String,
    #[serde(rename = "Datum")]
    pub assigned_at: String,
    #[serde(rename = "Gültig_bis")]
    pub valid_until: String,
}

pub fn export_rows(overviews: &[SchoolLicenseOverview]) -> Vec<SchoolExportRow> {
    overviews
        .iter()
        .flat_map(|overview| {
            let license = &overview.license;
            overview.assignments.iter().map(move |a| SchoolExportRow {
                license: license.title.clone(),
                license_type: license.license_type.to_string(),
                subject: license.subject.clone().unwrap_or_default(),
                grade_level: license.grade_level.clone().unwrap_or_default(),
                assigned_to: a
                    .assigned_to
                    .clone()
                    .unwrap_or_else(|| MISSING_VALUE.to_string()),
                assigned_at: a
                    .assigned_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| MISSING_VALUE.to_string()),
                valid_until: license.valid_until.to_string(),
            })
        })
        .collect()
}
