//! Middleware for the notes gateway.
//!
//! # Components
//!
//! - `pipeline` - Authentication then admission control for protected routes
//! - `http_metrics` - HTTP request metrics for every response

pub mod http_metrics;
pub mod pipeline;

pub use http_metrics::http_metrics_middleware;
pub use pipeline::{
    admission_control, BearerAuthFilter, Filter, PipelineOutcome, RateLimitFilter,
    RequestContext, RequestPipeline, Step,
};
