//! Observability for the notes gateway: Prometheus metrics definitions.

pub mod metrics;
