pub mod admin;
pub mod catalog;
pub mod identity;
pub mod model;
pub mod repo;
pub mod sqlite;

pub use admin::AdminStore;
pub use catalog::CatalogStore;
pub use identity::IdentityStore;
pub use model::*;
pub use repo::*;
