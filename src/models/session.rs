use uuid::Uuid;

use super::Role;
use crate::error::AppError;
use crate::utils::Claims;

/// Identity of the caller, decoded from the session token by the auth
/// middleware and handed to every data call that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
    pub school_id: Option<Uuid>,
}

impl Session {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn school(&self) -> Result<Uuid, AppError> {
        self.school_id
            .ok_or_else(|| AppError::NotFound("Keine Schule mit diesem Konto verknüpft".into()))
    }
}

impl TryFrom<Claims> for Session {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;
        Ok(Session {
            user_id,
            role: claims.role,
            school_id: claims.school_id,
        })
    }
}
