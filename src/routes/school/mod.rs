mod handler;
mod model;

pub use handler::list_schools;
pub use model::School;
