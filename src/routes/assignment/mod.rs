mod handler;
mod model;

pub use handler::{assign_seats, export_assignments, list_school_licenses, school_statistics};
pub use model::{Assignment, AssignmentRequest, SchoolLicenseOverview};
