use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Role, VerificationStatus},
    routes::user::User,
    utils::{generate_api_key, hash_api_key},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialization {
    Schulbuecher,
    Software,
    Medien,
    Plattformen,
    Mixed,
    Other,
}

impl Specialization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Specialization::Schulbuecher => "schulbuecher",
            Specialization::Software => "software",
            Specialization::Medien => "medien",
            Specialization::Plattformen => "plattformen",
            Specialization::Mixed => "mixed",
            Specialization::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnbieterProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub address: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub tax_id: Option<String>,
    pub vat_id: Option<String>,
    pub specialization: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub verification_status: VerificationStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A profile as shown to admins, with the owning account.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProviderListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub profile: AnbieterProfile,
    pub user_email: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub company_name: String,
    pub address: String,
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub vat_id: Option<String>,
    pub specialization: Option<Specialization>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A registration that passed validation.
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub company_name: String,
    pub address: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub tax_id: Option<String>,
    pub vat_id: Option<String>,
    pub specialization: Specialization,
    pub website: Option<String>,
    pub description: Option<String>,
}

fn required(value: &str, message: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AppError::Validation(message.into()))
    } else {
        Ok(value.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewProvider, AppError> {
        let company_name = required(&self.company_name, "Bitte Firmenname angeben")?;
        let contact_email = required(&self.contact_email, "Bitte Kontakt-E-Mail angeben")?;
        if !contact_email.contains('@') {
            return Err(AppError::Validation("Ungültige Kontakt-E-Mail".into()));
        }
        let address = required(&self.address, "Bitte Adresse angeben")?;
        let specialization = self
            .specialization
            .ok_or_else(|| AppError::Validation("Bitte Spezialisierung wählen".into()))?;

        Ok(NewProvider {
            company_name,
            address,
            contact_email,
            contact_phone: optional(self.contact_phone),
            tax_id: optional(self.tax_id),
            vat_id: optional(self.vat_id),
            specialization,
            website: optional(self.website),
            description: optional(self.description),
        })
    }
}

/// An admin's verdict on a pending profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Verify,
    Reject { reason: String },
}

impl Decision {
    pub fn reject(reason: Option<String>) -> Result<Self, AppError> {
        optional(reason)
            .map(|reason| Decision::Reject { reason })
            .ok_or_else(|| AppError::Validation("Bitte einen Grund für die Ablehnung angeben".into()))
    }

    fn status(&self) -> VerificationStatus {
        match self {
            Decision::Verify => VerificationStatus::Verified,
            Decision::Reject { .. } => VerificationStatus::Rejected,
        }
    }

    fn reason(&self) -> Option<&str> {
        match self {
            Decision::Verify => None,
            Decision::Reject { reason } => Some(reason),
        }
    }
}

const PROFILE_COLUMNS: &str = "id, user_id, company_name, address, contact_email, contact_phone, \
     tax_id, vat_id, specialization, website, description, verification_status, verified_at, \
     verification_reason, created_at";

const LISTING_SELECT: &str = r#"
    SELECT
        p.id, p.user_id, p.company_name, p.address, p.contact_email, p.contact_phone,
        p.tax_id, p.vat_id, p.specialization, p.website, p.description,
        p.verification_status, p.verified_at, p.verification_reason, p.created_at,
        u.email AS user_email, u.name AS user_name
    FROM anbieter_profile p
    JOIN users u ON u.id = p.user_id
"#;

impl AnbieterProfile {
    /// Creates a pending profile with a fresh API key and makes the user a
    /// provider. Returns the profile and the plain key, which is not stored.
    pub async fn register(
        pool: &PgPool,
        user_id: Uuid,
        provider: NewProvider,
    ) -> Result<(Self, String), AppError> {
        let api_key = generate_api_key();
        let mut tx = pool.begin().await?;

        let inserted = sqlx::query_as::<_, AnbieterProfile>(&format!(
            r#"
            INSERT INTO anbieter_profile (
                user_id, company_name, address, contact_email, contact_phone, tax_id, vat_id,
                specialization, website, description, verification_status, api_key_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(provider.company_name)
        .bind(provider.address)
        .bind(provider.contact_email)
        .bind(provider.contact_phone)
        .bind(provider.tax_id)
        .bind(provider.vat_id)
        .bind(provider.specialization.as_str())
        .bind(provider.website)
        .bind(provider.description)
        .bind(VerificationStatus::Pending)
        .bind(hash_api_key(&api_key))
        .fetch_one(&mut *tx)
        .await;

        let profile = match inserted {
            Ok(profile) => profile,
            Err(e) if AppError::is_unique_violation(&e) => {
                return Err(AppError::AlreadyExists(
                    "Für dieses Konto ist bereits ein Anbieterprofil registriert".into(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        User::set_role(&mut *tx, user_id, Role::Anbieter).await?;
        tx.commit().await?;

        tracing::info!("Provider {} registered by user {}", profile.id, user_id);
        Ok((profile, api_key))
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AnbieterProfile>(&format!(
            "SELECT {} FROM anbieter_profile WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Looks up a key by its digest; only verified providers match.
    pub async fn find_verified_by_api_key(
        pool: &PgPool,
        api_key_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AnbieterProfile>(&format!(
            "SELECT {} FROM anbieter_profile WHERE api_key_hash = $1 AND verification_status = $2",
            PROFILE_COLUMNS
        ))
        .bind(api_key_hash)
        .bind(VerificationStatus::Verified)
        .fetch_optional(pool)
        .await
    }

    /// Pending profiles, newest first.
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<ProviderListing>, sqlx::Error> {
        sqlx::query_as::<_, ProviderListing>(&format!(
            "{} WHERE p.verification_status = 'pending' ORDER BY p.created_at DESC",
            LISTING_SELECT
        ))
        .fetch_all(pool)
        .await
    }

    /// Verified and rejected profiles, most recently decided first.
    pub async fn list_processed(pool: &PgPool) -> Result<Vec<ProviderListing>, sqlx::Error> {
        sqlx::query_as::<_, ProviderListing>(&format!(
            "{} WHERE p.verification_status IN ('verified', 'rejected') \
             ORDER BY p.verified_at DESC NULLS LAST",
            LISTING_SELECT
        ))
        .fetch_all(pool)
        .await
    }

    /// Applies an admin decision. Only pending profiles transition.
    pub async fn decide(pool: &PgPool, id: Uuid, decision: &Decision) -> Result<Self, AppError> {
        let updated = sqlx::query_as::<_, AnbieterProfile>(&format!(
            r#"
            UPDATE anbieter_profile
            SET verification_status = $1, verified_at = NOW(), verification_reason = $2
            WHERE id = $3 AND verification_status = 'pending'
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(decision.status())
        .bind(decision.reason())
        .bind(id)
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(profile) => {
                tracing::info!(
                    "Provider {} is now {}",
                    profile.id,
                    profile.verification_status.as_str()
                );
                Ok(profile)
            }
            None => match Self::find_by_id(pool, id).await? {
                Some(_) => Err(AppError::Conflict(
                    "Anbieter wurde bereits bearbeitet".into(),
                )),
                None => Err(AppError::NotFound("Anbieter nicht gefunden".into())),
            },
        }
    }
}
