//! # Middleware Stack
//!
//! - [`metrics`]: Prometheus request metrics keyed by matched route.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly; bearer
//! auth lives in [`crate::auth`].

pub mod metrics;
