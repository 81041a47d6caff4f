//! Identity E2E test suite.
//!
//! Drives the HTTP API and the social login pipeline against a real database,
//! with avatars served by an in-process mock server and stored in memory.
//! Requires a running PostgreSQL database reachable through `DATABASE_URL`
//! (`RUST_ENV=development` uses the local default).
//!
//! Run with: cargo test --test identity_e2e

mod mock_avatar_server;
mod test_helpers;

mod test_account;
mod test_admin;
mod test_session;
mod test_user_manager;
