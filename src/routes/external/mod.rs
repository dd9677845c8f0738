mod handler;
mod model;

pub use handler::{check_license, sso_redirect, user_licenses};
pub use model::{LicenseCheck, UserLicensesResponse};
