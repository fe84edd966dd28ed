//! Job-application tracker and curse feed backend.
//!
//! Each feature slice (`accounts`, `feed`, `tracker`, `rituals`) carries its own domain
//! model, repository traits, service layer and axum router. `storage` provides the
//! Postgres and in-memory backends behind those traits and `http` assembles the
//! versioned API.

pub mod accounts;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod http;
pub mod rituals;
pub mod storage;
pub mod telemetry;
pub mod tracker;

pub use error::AppError;
pub use http::{api_router, ApiState};
pub use storage::{RepositoryError, Repositories};
