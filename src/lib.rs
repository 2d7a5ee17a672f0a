// Library module for bucketsync
// Re-exports modules for use in integration tests and the CLI binary

pub mod auth;
pub mod hash;
pub mod store;
pub mod sync;
