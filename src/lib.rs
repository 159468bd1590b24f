pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
