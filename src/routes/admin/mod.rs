mod handler;
mod model;

pub use handler::{
    export_assignments, export_licenses, export_users, list_licenses, list_schools, list_users,
    stats,
};
