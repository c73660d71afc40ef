//! Remote review service access.
//!
//! `ReviewService` is the seam between the workflow and the network: the
//! controller only ever sees classified outcomes, never HTTP responses.

mod http;
mod wire;

pub use http::HttpGateway;

use crate::error::GatewayError;
use crate::model::{AuditReport, OptimizationResult, VisitorIdentity};
use std::future::Future;

pub type AuditOutcome = Result<AuditReport, GatewayError>;
pub type OptimizeOutcome = Result<OptimizationResult, GatewayError>;

/// Operations offered by the analysis and identity service. Implementations
/// never retry; every call resolves to exactly one classified outcome.
pub trait ReviewService: Send + Sync + 'static {
    fn register(
        &self,
        visitor: &VisitorIdentity,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn audit(&self, code: &str) -> impl Future<Output = AuditOutcome> + Send;

    fn optimize(&self, code: &str) -> impl Future<Output = OptimizeOutcome> + Send;
}
