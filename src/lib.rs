//! Shop identity server library.
//!
//! Accounts with email login, one-to-one customer profiles, social login via
//! OAuth2 providers, and the admin screens that manage them.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
