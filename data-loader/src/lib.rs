// Request-deduplicating JSON loader for the course's data files

mod config;
pub mod documents;
mod error;
mod fetch;
mod loader;


pub use config::{ConfigError, LoaderConfig};
pub use error::{ErrorKind, LoadError};
pub use fetch::{Fetch, FetchResponse, HttpFetcher};
pub use loader::{DataLoader, LoaderStats, SharedDataLoader};
