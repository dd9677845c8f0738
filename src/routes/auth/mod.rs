mod client;
mod handler;
mod model;

pub use handler::{login, refresh, vidis_callback, vidis_login};
pub use model::{VidisClaims, VidisProfile, pseudonym_for};
