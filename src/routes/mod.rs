pub mod admin;
pub mod anbieter;
pub mod assignment;
pub mod auth;
pub mod external;
pub mod license;
pub mod school;
pub mod user;
