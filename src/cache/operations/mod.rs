mod oidc_state;

pub use oidc_state::{OIDC_STATE_TTL_SECS, OidcStateOperations, PendingLogin};
