//! Sora pool console: typed admin client and client-side sync core for a
//! pooled-account Sora proxy.
//!
//! [`session::AppContext`] is the entry point. It owns the configuration,
//! the session and the [`api::ConsoleClient`]; list views and watches in
//! [`sync`] are built on top of the client's resource handles.

pub mod api;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod presentation;
pub mod reconcile;
pub mod secrets;
pub mod session;
pub mod sync;
