use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Anbieter,
    Schulleiter,
    Admin,
    Lehrer,
}

impl Role {
    /// Dashboard a user lands on after login.
    pub fn dashboard_path(self) -> &'static str {
        match self {
            Role::Anbieter => "/anbieter",
            Role::Schulleiter | Role::Lehrer => "/schule",
            Role::Admin => "/admin",
        }
    }

    /// Maps the `rolle` claim of the federated login. Learners have no role of
    /// their own and are treated like teachers.
    pub fn from_vidis_rolle(rolle: Option<&str>) -> Self {
        match rolle {
            Some("LEIT") => Role::Schulleiter,
            Some("LEHR") | Some("LERN") => Role::Lehrer,
            _ => Role::Lehrer,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Anbieter => "anbieter",
            Role::Schulleiter => "schulleiter",
            Role::Admin => "admin",
            Role::Lehrer => "lehrer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anbieter" => Ok(Role::Anbieter),
            "schulleiter" => Ok(Role::Schulleiter),
            "admin" => Ok(Role::Admin),
            "lehrer" => Ok(Role::Lehrer),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "verification_status", rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

/// Individual, class, school and state-wide licenses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "license_type", rename_all = "lowercase")]
pub enum LicenseType {
    #[default]
    Einzellizenz,
    Klassenlizenz,
    Schullizenz,
    Landeslizenz,
}

impl LicenseType {
    pub fn as_str(self) -> &'static str {
        match self {
            LicenseType::Einzellizenz => "einzellizenz",
            LicenseType::Klassenlizenz => "klassenlizenz",
            LicenseType::Schullizenz => "schullizenz",
            LicenseType::Landeslizenz => "landeslizenz",
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
