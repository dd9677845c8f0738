/// One-time `state` values of pending federated logins.
const OIDC_STATE_PREFIX: &str = "oidc:state:";

/// Request counters of the rate limiter, per client IP.
const RATE_LIMIT_PREFIX: &str = "rate_limit:";

pub fn oidc_state_key(state: &str) -> String {
    format!("{}{}", OIDC_STATE_PREFIX, state)
}

pub fn rate_limit_key(ip: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, ip)
}
