//! Application state management.
//!
//! Defines the shared application state passed to request handlers. The
//! state contains the configuration and the database connection pool.

/// Shared application state.
///
/// Cloned for each handler; the contained pool handle is an inexpensive Arc
/// clone.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL database connection pool
    pub db: database::postgres::DatabaseConnection,
}
