pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod net;
pub mod services;
pub mod state;

// Convenient re-exports (so call sites can do `kitbox::Registry`, etc.)
pub use state::registry::Registry;
