pub mod artifact;
pub mod catalog;
pub mod evaluation;
pub mod loader;
pub mod merge;
pub mod pipeline;
pub mod providers;
pub mod recommendations;
pub mod reconcile;
pub mod similarity;
mod stop_words;
pub mod tags;
pub mod title_search;
pub mod vectorizer;

pub use artifact::{ArtifactStore, RecommenderModel};
pub use providers::{MetadataProvider, OfflineProvider, TmdbProvider};
