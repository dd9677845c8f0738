mod handler;
mod model;

pub use handler::{attach_to_school, create_license, export_licenses, list_licenses};
pub use model::{CreateLicenseRequest, License, SchoolLicense, Validity};
