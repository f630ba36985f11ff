//! Video recommendation service: cosine-similarity collaborative, content
//! and hybrid recommendations over an immutable dataset snapshot.

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
