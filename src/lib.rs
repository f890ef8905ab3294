pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod i18n;
pub mod model;
pub mod node;
pub mod retry;
pub mod robots;
pub mod scheduler;
pub mod security;
pub mod tor;

pub use error::{Error, Result};
