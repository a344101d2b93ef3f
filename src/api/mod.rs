pub mod admin;
pub mod auth;
pub mod extract;
pub mod handlers;
pub mod types;

pub use admin::*;
pub use auth::*;
pub use extract::*;
pub use handlers::*;
pub use types::*;
