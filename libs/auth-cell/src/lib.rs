pub mod handlers;
pub mod router;
pub mod seed;

pub use router::{auth_routes, client_routes};
pub use seed::seed_default_users;
