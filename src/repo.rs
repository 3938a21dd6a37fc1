mod enrollments;
mod users;

pub use enrollments::EnrollmentRepo;
pub use users::{NewUser, UserCredentials, UsersRepo};
