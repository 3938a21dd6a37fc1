/// Administrator-only endpoints
pub mod admin;
/// User-facing enrollment endpoints
pub mod enrollments;
