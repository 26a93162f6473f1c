//! Profile documents and their local cache

pub mod cache;
pub mod model;
pub mod store;

pub use cache::ProfileCache;
pub use model::{LikedSong, UserProfile};
pub use store::{HttpProfileStore, ProfileStore};
