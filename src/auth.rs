mod admin_guard;
mod credentials;
mod user_guard;

pub use admin_guard::Administrator;
pub use credentials::Credentials;
pub use user_guard::AuthenticatedUser;
