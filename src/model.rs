mod enrollments;

pub use enrollments::*;
