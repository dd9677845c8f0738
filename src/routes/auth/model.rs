use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::Role,
    routes::{
        school::School,
        user::{NewUser, User},
    },
};

const DEFAULT_LOCATION: &str = "Deutschland";
const FALLBACK_EMAIL_DOMAIN: &str = "vidis.local";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub role: Role,
    pub token: String,
    pub expires_at: i64,
    pub redirect_to: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct VidisLoginQuery {
    pub vidis_idp_hint: Option<String>,
    pub kc_idp_hint: Option<String>,
}

impl VidisLoginQuery {
    /// Identity provider preselected at the VIDIS realm, if any.
    pub fn idp_hint(self) -> Option<String> {
        self.vidis_idp_hint
            .or(self.kc_idp_hint)
            .map(|hint| hint.trim().to_string())
            .filter(|hint| !hint.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Maps an `error` returned by the identity provider to the message shown
/// to the user.
pub fn provider_error(error: &str) -> AppError {
    if error == "invalid_scope" {
        AppError::IdentityProvider(
            "VIDIS Scope-Fehler: Nur 'openid' Scope wird unterstützt. \
             Bitte überprüfen Sie die VIDIS-Client-Konfiguration."
                .into(),
        )
    } else {
        AppError::IdentityProvider(format!("VIDIS Error: {}", error))
    }
}

/// Claims VIDIS puts into its access tokens.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VidisClaims {
    pub sub: String,
    pub rolle: Option<String>,
    pub schulkennung: Option<String>,
    pub bundesland: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub preferred_username: Option<String>,
}

/// Reads the payload of a VIDIS access token.
///
/// The token comes straight from the token endpoint over TLS, so the
/// signature is not checked here and expiry or audience do not matter.
pub fn decode_access_token(token: &str) -> Result<VidisClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<VidisClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("unreadable VIDIS access token: {}", e);
            AppError::IdentityProvider("VIDIS Error: invalid_token".into())
        })
}

/// `pseudo-` followed by the subject with every non-alphanumeric character
/// replaced by `-`.
pub fn pseudonym_for(sub: &str) -> String {
    let cleaned: String = sub
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("pseudo-{}", cleaned)
}

/// What a first VIDIS login provisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VidisProfile {
    pub pseudonym: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub schulkennung: Option<String>,
    pub bundesland: Option<String>,
}

impl From<VidisClaims> for VidisProfile {
    fn from(claims: VidisClaims) -> Self {
        let name = claims.name.filter(|n| !n.trim().is_empty()).or_else(|| {
            let joined = format!(
                "{} {}",
                claims.given_name.as_deref().unwrap_or_default(),
                claims.family_name.as_deref().unwrap_or_default()
            );
            let joined = joined.trim();
            (!joined.is_empty()).then(|| joined.to_string())
        });

        let email = claims.email.filter(|e| !e.trim().is_empty()).unwrap_or_else(|| {
            format!(
                "{}@{}",
                claims.preferred_username.as_deref().unwrap_or(&claims.sub),
                FALLBACK_EMAIL_DOMAIN
            )
        });

        Self {
            pseudonym: pseudonym_for(&claims.sub),
            name,
            email,
            role: Role::from_vidis_rolle(claims.rolle.as_deref()),
            schulkennung: claims.schulkennung.filter(|k| !k.trim().is_empty()),
            bundesland: claims.bundesland,
        }
    }
}

impl VidisProfile {
    /// Returns the user behind the pseudonym, creating the user (and the
    /// school, found by its VIDIS id) on first login.
    pub async fn provision(self, pool: &PgPool) -> Result<User, AppError> {
        if let Some(user) = User::find_by_pseudonym(pool, &self.pseudonym).await? {
            return Ok(user);
        }

        let mut tx = pool.begin().await?;

        let school_id = match self.schulkennung.as_deref() {
            Some(kennung) => {
                let location = self.bundesland.as_deref().unwrap_or(DEFAULT_LOCATION);
                Some(
                    School::find_or_create_by_external_id(&mut *tx, kennung, Some(location))
                        .await?
                        .id,
                )
            }
            None => None,
        };

        let created = User::create(
            &mut *tx,
            NewUser {
                email: self.email,
                name: self.name,
                role: self.role,
                school_id,
                vidis_pseudonym: Some(self.pseudonym.clone()),
            },
        )
        .await;

        match created {
            Ok(user) => {
                tx.commit().await?;
                Ok(user)
            }
            // A parallel first login won the race.
            Err(e) if AppError::is_unique_violation(&e) => {
                tx.rollback().await?;
                User::find_by_pseudonym(pool, &self.pseudonym)
                    .await?
                    .ok_or_else(|| AppError::Internal("provisioned user vanished".into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
