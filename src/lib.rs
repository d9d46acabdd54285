//! Plugin info cards: fetch plugin metadata from the WordPress.org catalog
//! and render it as sanitized HTML cards.

pub mod api;
pub mod cache;
pub mod cards;
pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod sanitize;

pub use api::CatalogClient;
pub use cache::{CacheStore, MemoryCache};
pub use cards::PluginCards;
pub use config::Config;
pub use error::{AppError, FetchError, ValidationError};
pub use models::{CardRequest, Identifier, PluginRecord};
pub use render::CardRenderer;
