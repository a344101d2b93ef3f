pub mod engine;
pub mod merge;

pub use engine::{ProductLocation, Recommendation, RecommendError, Recommender};
pub use merge::merged_catalog;
