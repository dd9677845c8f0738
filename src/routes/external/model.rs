use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    models::LicenseType,
    routes::{
        assignment::{Assignment, SchoolLicenseOverview},
        license::{License, Validity},
        user::User,
    },
};

pub const USER_NOT_FOUND: &str = "User not found";
pub const NOT_AVAILABLE: &str = "License not available for this school";
pub const NOT_CURRENTLY_VALID: &str = "License expired or not yet valid";

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub user: String,
    pub license: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SsoQuery {
    pub license_id: Uuid,
    pub user: String,
    #[serde(default)]
    pub return_url: Option<String>,
}

/// Result of checking one user against one license.
#[derive(Debug, Clone)]
pub enum LicenseCheck {
    UserNotFound,
    NotAvailable,
    NotCurrentlyValid,
    Granted {
        license: License,
        assignment: Option<Assignment>,
    },
}

#[derive(Debug, FromRow)]
struct HeldLicense {
    school_license_id: Uuid,
    #[sqlx(flatten)]
    license: License,
}

impl LicenseCheck {
    pub async fn run(
        pool: &PgPool,
        pseudonym: &str,
        license_id: Uuid,
        today: NaiveDate,
    ) -> Result<Self, sqlx::Error> {
        let Some(user) = User::find_by_pseudonym(pool, pseudonym).await? else {
            return Ok(LicenseCheck::UserNotFound);
        };
        let Some(school_id) = user.school_id else {
            return Ok(LicenseCheck::NotAvailable);
        };

        let held = sqlx::query_as::<_, HeldLicense>(
            r#"
            SELECT
                sl.id AS school_license_id,
                l.id, l.title, l.type, l.valid_from, l.valid_until, l.subject, l.grade_level,
                l.permission, l.prohibition, l.duty, l.scope, l.created_by, l.created_at
            FROM school_licenses sl
            JOIN licenses l ON l.id = sl.license_id
            WHERE sl.school_id = $1 AND sl.license_id = $2
            ORDER BY sl.created_at
            LIMIT 1
            "#,
        )
        .bind(school_id)
        .bind(license_id)
        .fetch_optional(pool)
        .await?;

        let Some(held) = held else {
            return Ok(LicenseCheck::NotAvailable);
        };
        if held.license.validity_on(today) != Validity::Valid {
            return Ok(LicenseCheck::NotCurrentlyValid);
        }

        let assignment = Assignment::find_for_user(pool, held.school_license_id, pseudonym).await?;
        Ok(LicenseCheck::Granted {
            license: held.license,
            assignment,
        })
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, LicenseCheck::Granted { .. })
    }

    pub fn message(&self) -> &'static str {
        match self {
            LicenseCheck::UserNotFound => USER_NOT_FOUND,
            LicenseCheck::NotAvailable => NOT_AVAILABLE,
            LicenseCheck::NotCurrentlyValid => NOT_CURRENTLY_VALID,
            LicenseCheck::Granted { .. } => "License valid",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Permissions {
    pub permission: String,
    pub prohibition: String,
    pub duty: String,
    pub scope: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LicenseSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub valid_until: NaiveDate,
    pub permissions: Permissions,
}

impl From<License> for LicenseSummary {
    fn from(l: License) -> Self {
        Self {
            id: l.id,
            title: l.title,
            license_type: l.license_type,
            valid_until: l.valid_until,
            permissions: Permissions {
                permission: l.permission,
                prohibition: l.prohibition,
                duty: l.duty,
                scope: l.scope,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentStatus {
    pub assigned: bool,
    pub assigned_at: Option<DateTime<Utc>>,
}

impl From<Assignment> for AssignmentStatus {
    fn from(a: Assignment) -> Self {
        Self {
            assigned: a.assigned_to.is_some(),
            assigned_at: a.assigned_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LicenseCheckResponse {
    Failure {
        success: bool,
        error: &'static str,
        has_license: bool,
    },
    Denied {
        success: bool,
        has_license: bool,
        message: &'static str,
    },
    Granted {
        success: bool,
        has_license: bool,
        license: LicenseSummary,
        assignment: Option<AssignmentStatus>,
    },
}

impl From<LicenseCheck> for LicenseCheckResponse {
    fn from(check: LicenseCheck) -> Self {
        let message = check.message();
        match check {
            LicenseCheck::UserNotFound => LicenseCheckResponse::Failure {
                success: false,
                error: USER_NOT_FOUND,
                has_license: false,
            },
            LicenseCheck::NotAvailable | LicenseCheck::NotCurrentlyValid => {
                LicenseCheckResponse::Denied {
                    success: true,
                    has_license: false,
                    message,
                }
            }
            LicenseCheck::Granted {
                license,
                assignment,
            } => LicenseCheckResponse::Granted {
                success: true,
                has_license: true,
                license: license.into(),
                assignment: assignment.map(Into::into),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserLicense {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub subject: Option<String>,
    pub grade_level: Option<String>,
    pub valid_until: NaiveDate,
    pub permissions: Permissions,
    pub assignment: Option<Assignment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UserLicensesResponse {
    Failure {
        success: bool,
        error: &'static str,
        licenses: Vec<UserLicense>,
    },
    Found {
        success: bool,
        licenses: Vec<UserLicense>,
        total: usize,
    },
}

/// Currently valid licenses of a school as seen by one user: each with the
/// seat held by the user, otherwise the first free one.
pub fn user_licenses(
    overviews: Vec<SchoolLicenseOverview>,
    pseudonym: &str,
    today: NaiveDate,
) -> Vec<UserLicense> {
    overviews
        .into_iter()
        .filter(|o| o.license.validity_on(today) == Validity::Valid)
        .map(|o| {
            let assignment = o
                .assignments
                .iter()
                .find(|a| a.assigned_to.as_deref() == Some(pseudonym))
                .or_else(|| o.assignments.iter().find(|a| a.assigned_to.is_none()))
                .cloned();
            let l = o.license;
            UserLicense {
                id: l.id,
                title: l.title,
                license_type: l.license_type,
                subject: l.subject,
                grade_level: l.grade_level,
                valid_until: l.valid_until,
                permissions: Permissions {
                    permission: l.permission,
                    prohibition: l.prohibition,
                    duty: l.duty,
                    scope: l.scope,
                },
                assignment,
            }
        })
        .collect()
}

impl UserLicensesResponse {
    pub async fn load(pool: &PgPool, pseudonym: &str, today: NaiveDate) -> Result<Self, sqlx::Error> {
        let Some(user) = User::find_by_pseudonym(pool, pseudonym).await? else {
            return Ok(UserLicensesResponse::Failure {
                success: false,
                error: USER_NOT_FOUND,
                licenses: Vec::new(),
            });
        };

        let licenses = match user.school_id {
            Some(school_id) => user_licenses(
                SchoolLicenseOverview::list_for_school(pool, school_id).await?,
                pseudonym,
                today,
            ),
            None => Vec::new(),
        };

        Ok(UserLicensesResponse::Found {
            success: true,
            total: licenses.len(),
            licenses,
        })
    }
}

/// Best-effort audit trail of external API calls.
pub async fn record_access(pool: &PgPool, endpoint: &str, provider_id: Uuid, status: u16) {
    let result = sqlx::query(
        "INSERT INTO api_access_logs (endpoint, provider_id, response_status) VALUES ($1, $2, $3)",
    )
    .bind(endpoint)
    .bind(provider_id)
    .bind(i32::from(status))
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("Failed to log API access to {}: {}", endpoint, e);
    }
}
