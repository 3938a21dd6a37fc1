mod email_client;
mod plan_client;
mod user_client;

pub use email_client::{EmailAuthorizationToken, EmailClient, ReminderEmail};
pub use plan_client::{PlanCatalogClient, PlanDetails};
pub use user_client::{Identity, UserDirectoryClient};
