//! JSON payloads exchanged with the review service.

use crate::error::GatewayError;
use crate::model::{AuditReport, OptimizationResult, VisitorIdentity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
}

impl<'a> From<&'a VisitorIdentity> for RegisterRequest<'a> {
    fn from(v: &'a VisitorIdentity) -> Self {
        Self {
            name: &v.name,
            email: &v.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CodeRequest<'a> {
    pub code: &'a str,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum AuditStatus {
    Error,
    Success,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuditResponse {
    pub status: AuditStatus,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl TryFrom<AuditResponse> for AuditReport {
    type Error = GatewayError;

    fn try_from(r: AuditResponse) -> Result<Self, Self::Error> {
        match r.status {
            AuditStatus::Success => match (r.complexity, r.hint) {
                (Some(complexity), Some(hint)) => Ok(AuditReport::clean(complexity, hint)),
                (None, _) => Err(GatewayError::malformed("SUCCESS verdict without complexity")),
                (_, None) => Err(GatewayError::malformed("SUCCESS verdict without hint")),
            },
            AuditStatus::Error => {
                AuditReport::flagged(r.errors.unwrap_or_default(), r.complexity, r.hint)
                    .ok_or_else(|| GatewayError::malformed("ERROR verdict without errors"))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OptimizeResponse {
    pub optimized_code: String,
}

impl From<OptimizeResponse> for OptimizationResult {
    fn from(r: OptimizeResponse) -> Self {
        Self {
            rewritten_code: r.optimized_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReportStatus;

    fn parse(json: &str) -> Result<AuditReport, GatewayError> {
        let r: AuditResponse = serde_json::from_str(json).unwrap();
        AuditReport::try_from(r)
    }

    #[test]
    fn success_maps_to_clean_report() {
        let report = parse(r#"{"status":"SUCCESS","complexity":"O(1)","hint":"fine"}"#).unwrap();
        assert_eq!(report.status(), ReportStatus::Clean);
        assert_eq!(report.complexity_estimate(), Some("O(1)"));
    }

    #[test]
    fn error_keeps_issue_order() {
        let report =
            parse(r#"{"status":"ERROR","errors":["null deref","leak"],"hint":"check ptr"}"#).unwrap();
        assert_eq!(report.status(), ReportStatus::Flagged);
        assert_eq!(report.issues(), ["null deref".to_string(), "leak".to_string()]);
        assert_eq!(report.hint(), Some("check ptr"));
    }

    #[test]
    fn incomplete_verdicts_are_malformed() {
        assert!(parse(r#"{"status":"SUCCESS","hint":"fine"}"#).is_err());
        assert!(parse(r#"{"status":"ERROR","errors":[]}"#).is_err());
        assert!(parse(r#"{"status":"ERROR"}"#).is_err());
    }
}
