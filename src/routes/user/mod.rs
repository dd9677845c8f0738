mod handler;
mod model;

pub use handler::me;
pub use model::{NewUser, User};
