mod handler;
mod model;

pub use handler::{list_providers, register, reject_provider, verify_provider};
pub use model::{AnbieterProfile, Decision, RegisterRequest};
