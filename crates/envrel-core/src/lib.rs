pub mod assign;
pub mod config;
pub mod db;
pub mod error;
pub mod io;
pub mod memory;
pub mod paths;
pub mod reconcile;
pub mod refresh;
pub mod relations;
pub mod set;
pub mod store;
pub mod types;

pub use error::{RelationsError, Result};
