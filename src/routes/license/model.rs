use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{error::AppError, models::LicenseType};

/// Upper bound for the seats created by one attachment.
pub const MAX_SEATS_PER_SCHOOL: i32 = 10_000;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct License {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub license_type: LicenseType,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub subject: Option<String>,
    pub grade_level: Option<String>,
    pub permission: String,
    pub prohibition: String,
    pub duty: String,
    pub scope: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    NotYetValid,
    Valid,
    Expired,
}

impl Validity {
    /// Both ends of the window are inclusive calendar days.
    pub fn on(valid_from: NaiveDate, valid_until: NaiveDate, today: NaiveDate) -> Self {
        if today < valid_from {
            Validity::NotYetValid
        } else if today > valid_until {
            Validity::Expired
        } else {
            Validity::Valid
        }
    }
}

impl License {
    pub fn validity_on(&self, today: NaiveDate) -> Validity {
        Validity::on(self.valid_from, self.valid_until, today)
    }
}

fn default_permission() -> String {
    "use".into()
}

fn default_prohibition() -> String {
    "commercialUse".into()
}

fn default_duty() -> String {
    "attribution".into()
}

fn default_scope() -> String {
    "schule".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLicenseRequest {
    pub title: String,
    #[serde(rename = "type", default)]
    pub license_type: LicenseType,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub grade_level: Option<String>,
    #[serde(default = "default_permission")]
    pub permission: String,
    #[serde(default = "default_prohibition")]
    pub prohibition: String,
    #[serde(default = "default_duty")]
    pub duty: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateLicenseRequest {
    /// Trims the text fields and rejects an empty title or an inverted
    /// validity window.
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(AppError::Validation("Bitte einen Titel angeben".into()));
        }
        if self.valid_from > self.valid_until {
            return Err(AppError::Validation(
                "Das Startdatum muss vor dem Enddatum liegen".into(),
            ));
        }
        self.subject = non_empty(self.subject);
        self.grade_level = non_empty(self.grade_level);
        Ok(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachToSchoolRequest {
    pub school_id: Uuid,
    pub quantity: i32,
}

impl AttachToSchoolRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.quantity < 1 || self.quantity > MAX_SEATS_PER_SCHOOL {
            return Err(AppError::Validation(
                "Bitte Schule und gültige Menge angeben".into(),
            ));
        }
        Ok(())
    }
}

const LICENSE_COLUMNS: &str = "id, title, type, valid_from, valid_until, subject, grade_level, \
     permission, prohibition, duty, scope, created_by, created_at";

impl License {
    pub async fn create(
        pool: &PgPool,
        req: CreateLicenseRequest,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let license = sqlx::query_as::<_, License>(&format!(
            r#"
            INSERT INTO licenses (
                title, type, valid_from, valid_until, subject, grade_level,
                permission, prohibition, duty, scope, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            LICENSE_COLUMNS
        ))
        .bind(req.title)
        .bind(req.license_type)
        .bind(req.valid_from)
        .bind(req.valid_until)
        .bind(req.subject)
        .bind(req.grade_level)
        .bind(req.permission)
        .bind(req.prohibition)
        .bind(req.duty)
        .bind(req.scope)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        tracing::info!("License {} created by {}", license.id, created_by);
        Ok(license)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, License>(&format!(
            "SELECT {} FROM licenses WHERE id = $1",
            LICENSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_by_creator(pool: &PgPool, created_by: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, License>(&format!(
            "SELECT {} FROM licenses WHERE created_by = $1 ORDER BY valid_until DESC",
            LICENSE_COLUMNS
        ))
        .bind(created_by)
        .fetch_all(pool)
        .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, License>(&format!(
            "SELECT {} FROM licenses ORDER BY created_at",
            LICENSE_COLUMNS
        ))
        .fetch_all(pool)
        .await
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SchoolLicense {
    pub id: Uuid,
    pub license_id: Uuid,
    pub school_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl SchoolLicense {
    /// Binds a license to a school and creates its seat pool: exactly
    /// `quantity` unclaimed assignments. Either both inserts land or neither.
    pub async fn attach(
        pool: &PgPool,
        license_id: Uuid,
        school_id: Uuid,
        quantity: i32,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let school_license = sqlx::query_as::<_, SchoolLicense>(
            r#"
            INSERT INTO school_licenses (license_id, school_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, license_id, school_id, quantity, created_at
            "#,
        )
        .bind(license_id)
        .bind(school_id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        let seats = sqlx::query(
            r#"
            INSERT INTO assignments (school_license_id)
            SELECT $1 FROM generate_series(1, $2)
            "#,
        )
        .bind(school_license.id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(
            "License {} attached to school {} with {} seats",
            license_id,
            school_id,
            seats
        );
        Ok(school_license)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SchoolLicense>(
            "SELECT id, license_id, school_id, quantity, created_at FROM school_licenses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn validity_window_is_inclusive() {
        let from = date("2025-08-01");
        let until = date("2026-07-31");
        assert_eq!(Validity::on(from, until, date("2025-08-01")), Validity::Valid);
        assert_eq!(Validity::on(from, until, date("2026-07-31")), Validity::Valid);
        assert_eq!(
            Validity::on(from, until, date("2025-07-31")),
            Validity::NotYetValid
        );
        assert_eq!(Validity::on(from, until, date("2026-08-01")), Validity::Expired);
    }

    #[test]
    fn create_request_fills_odrl_defaults() {
        let req: CreateLicenseRequest = serde_json::from_value(serde_json::json!({
            "title": "  Mathematik Klasse 9 ",
            "valid_from": "2025-08-01",
            "valid_until": "2026-07-31",
            "subject": "",
        }))
        .unwrap();
        let req = req.validate().unwrap();

        assert_eq!(req.title, "Mathematik Klasse 9");
        assert_eq!(req.license_type, LicenseType::Einzellizenz);
        assert_eq!(req.permission, "use");
        assert_eq!(req.prohibition, "commercialUse");
        assert_eq!(req.duty, "attribution");
        assert_eq!(req.scope, "schule");
        assert_eq!(req.subject, None);
    }

    #[test]
    fn create_request_rejects_blank_title_and_inverted_window() {
        let blank: CreateLicenseRequest = serde_json::from_value(serde_json::json!({
            "title": "   ",
            "valid_from": "2025-08-01",
            "valid_until": "2026-07-31",
        }))
        .unwrap();
        assert!(matches!(blank.validate(), Err(AppError::Validation(_))));

        let inverted: CreateLicenseRequest = serde_json::from_value(serde_json::json!({
            "title": "Deutsch",
            "type": "klassenlizenz",
            "valid_from": "2026-08-01",
            "valid_until": "2025-07-31",
        }))
        .unwrap();
        assert!(matches!(inverted.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn attach_request_needs_positive_quantity() {
        let school_id = Uuid::new_v4();
        for quantity in [0, -3, MAX_SEATS_PER_SCHOOL + 1] {
            let req = AttachToSchoolRequest {
                school_id,
                quantity,
            };
            assert!(req.validate().is_err());
        }
        assert!(
            AttachToSchoolRequest {
                school_id,
                quantity: 25
            }
            .validate()
            .is_ok()
        );
    }
}
