pub mod analyze;
pub mod reports;
pub mod status;
pub mod upload;
