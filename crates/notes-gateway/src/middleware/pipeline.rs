//! Authentication and admission control for protected routes.
//!
//! Each protected request runs an ordered list of [`Filter`]s. A filter
//! either continues to the next one or short-circuits with a final
//! [`PipelineOutcome`]. The standard chain is:
//!
//! 1. [`BearerAuthFilter`] resolves the `Authorization` header into an
//!    [`Identity`], or rejects with the specific [`AuthError`]
//! 2. [`RateLimitFilter`] consumes one permit from that identity's bucket,
//!    or throttles
//!
//! Unauthenticated requests never reach the rate limiter, so they create
//! no bucket. Throttled requests never reach the handler.

use crate::auth::{Identity, PrincipalResolver};
use crate::clock::Clock;
use crate::errors::{AuthError, GatewayError};
use crate::observability::metrics;
use crate::rate_limit::{Admission, RateLimiterRegistry};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Per-request state threaded through the filters.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Raw `Authorization` header value, if present and valid UTF-8.
    pub authorization: Option<String>,

    /// Time of arrival, read once from the pipeline clock.
    pub now: DateTime<Utc>,

    /// Set by the authentication filter.
    pub identity: Option<Identity>,
}

/// Terminal state of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Rejected(AuthError),
    Throttled { retry_after: Duration },
    Admitted(Identity),
}

/// Result of one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    ShortCircuit(PipelineOutcome),
}

/// One stage of the request pipeline.
#[async_trait::async_trait]
pub trait Filter: Send + Sync {
    /// Stable name for logs.
    fn name(&self) -> &'static str;

    async fn apply(&self, ctx: &mut RequestContext) -> Step;
}

/// Attaches an identity or rejects the request.
pub struct BearerAuthFilter {
    resolver: PrincipalResolver,
}

impl BearerAuthFilter {
    pub fn new(resolver: PrincipalResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait::async_trait]
impl Filter for BearerAuthFilter {
    fn name(&self) -> &'static str {
        "bearer_auth"
    }

    async fn apply(&self, ctx: &mut RequestContext) -> Step {
        match self
            .resolver
            .resolve(ctx.authorization.as_deref(), ctx.now)
            .await
        {
            Ok(identity) => {
                ctx.identity = Some(identity);
                Step::Continue
            }
            Err(kind) => {
                metrics::record_auth_failure(kind.as_label());
                Step::ShortCircuit(PipelineOutcome::Rejected(kind))
            }
        }
    }
}

/// Consumes one permit for the resolved identity.
pub struct RateLimitFilter {
    registry: Arc<RateLimiterRegistry>,
}

impl RateLimitFilter {
    pub fn new(registry: Arc<RateLimiterRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait::async_trait]
impl Filter for RateLimitFilter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn apply(&self, ctx: &mut RequestContext) -> Step {
        // Only ever keyed by a resolved identity.
        let Some(identity) = ctx.identity.as_ref() else {
            return Step::ShortCircuit(PipelineOutcome::Rejected(AuthError::MissingCredential));
        };

        let admission = self.registry.check(identity.subject(), ctx.now);
        metrics::record_admission_decision(admission.as_label());

        match admission {
            Admission::Throttled { retry_after } => {
                Step::ShortCircuit(PipelineOutcome::Throttled { retry_after })
            }
            Admission::Admitted | Admission::Bypassed => Step::Continue,
        }
    }
}

/// Ordered filter chain plus the clock it reads arrival time from.
pub struct RequestPipeline {
    filters: Vec<Arc<dyn Filter>>,
    clock: Arc<dyn Clock>,
}

impl RequestPipeline {
    /// Standard chain: authentication, then admission control.
    pub fn new(
        resolver: PrincipalResolver,
        registry: Arc<RateLimiterRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_filters(
            vec![
                Arc::new(BearerAuthFilter::new(resolver)),
                Arc::new(RateLimitFilter::new(registry)),
            ],
            clock,
        )
    }

    /// Custom chain. Filters run in the given order.
    pub fn with_filters(filters: Vec<Arc<dyn Filter>>, clock: Arc<dyn Clock>) -> Self {
        Self { filters, clock }
    }

    /// Run every filter until one short-circuits.
    ///
    /// A chain that completes without attaching an identity rejects with
    /// `MissingCredential`.
    pub async fn run(&self, authorization: Option<&str>) -> PipelineOutcome {
        let mut ctx = RequestContext {
            authorization: authorization.map(str::to_owned),
            now: self.clock.now(),
            identity: None,
        };

        for filter in &self.filters {
            if let Step::ShortCircuit(outcome) = filter.apply(&mut ctx).await {
                tracing::debug!(
                    target: "gateway.middleware.admission",
                    filter = filter.name(),
                    "Pipeline short-circuited"
                );
                return outcome;
            }
        }

        match ctx.identity {
            Some(identity) => PipelineOutcome::Admitted(identity),
            None => PipelineOutcome::Rejected(AuthError::MissingCredential),
        }
    }
}

/// Axum middleware running the [`RequestPipeline`].
///
/// # Response
///
/// - 401 with a generic body if authentication fails
/// - 429 with `Retry-After` if the identity is throttled
/// - Otherwise continues with the [`Identity`] in request extensions
#[instrument(skip_all, name = "gateway.middleware.admission")]
pub async fn admission_control(
    State(pipeline): State<Arc<RequestPipeline>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    match pipeline.run(authorization.as_deref()).await {
        PipelineOutcome::Admitted(identity) => {
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
        PipelineOutcome::Rejected(kind) => {
            tracing::info!(target: "gateway.middleware.admission", reason = kind.as_label(), "Request rejected");
            Err(GatewayError::Unauthenticated(kind))
        }
        PipelineOutcome::Throttled { retry_after } => Err(GatewayError::Throttled {
            retry_after_secs: retry_after.as_secs(),
        }),
    }
}
