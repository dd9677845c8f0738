mod role;
mod session;

pub use role::{LicenseType, Role, VerificationStatus};
pub use session::Session;
