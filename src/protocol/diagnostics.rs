//! Diagnostics — the error taxonomy as data.
//!
//! The intended caller is a language model that must self-correct from the
//! error's content, so every validation failure is a structured payload
//! carrying the problem, the correct workflow, and an immediately-callable
//! next action. Nothing at the protocol boundary is raised; internal
//! `Error`s are converted here.

use crate::types::Error;
use serde::Serialize;

/// The correct three-stage call sequence, repeated in every workflow
/// diagnostic.
pub const WORKFLOW: &str = "1) list_tools(tags=[\"all\"]) to discover tools, \
     2) get_tool_details(tool_name) to unlock one, \
     3) execute_tool(tool_name, parameters) to run it";

/// Diagnostic category, mirroring the internal error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UsageViolation,
    NotFound,
    SecurityViolation,
    RateLimitExceeded,
    UnitsError,
    ComputationError,
    Internal,
}

/// A structured, actionable error payload.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// The exact call that fixes the problem, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_call: Option<String>,
    /// Well-formed example invocations or values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    /// Similarly named tools or alternative tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// The full workflow sequence, included on workflow-shaped failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<&'static str>,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            next_call: None,
            examples: Vec::new(),
            suggestions: Vec::new(),
            workflow: None,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        let mut d = Self::new(DiagnosticKind::UsageViolation, message);
        d.workflow = Some(WORKFLOW);
        d
    }

    pub fn not_found(tool_name: &str) -> Self {
        let mut d = Self::new(
            DiagnosticKind::NotFound,
            format!("no tool named '{}' is registered", tool_name),
        );
        d.next_call = Some("list_tools(tags=[\"all\"])".to_string());
        d
    }

    pub fn security(tool_name: &str) -> Self {
        let mut d = Self::new(
            DiagnosticKind::SecurityViolation,
            format!(
                "tool '{}' is not unlocked for this session; fetch its details first",
                tool_name
            ),
        );
        d.next_call = Some(format!("get_tool_details(tool_name=\"{}\")", tool_name));
        d.workflow = Some(WORKFLOW);
        d
    }

    pub fn rate_limit(stage: &str, tool_name: &str, limit: u32, window_secs: u64) -> Self {
        Self::new(
            DiagnosticKind::RateLimitExceeded,
            format!(
                "{} rate limit for '{}' exceeded: at most {} calls per {} s; wait for the \
                 window to pass",
                stage, tool_name, limit, window_secs
            ),
        )
    }

    pub fn units(message: impl Into<String>) -> Self {
        let mut d = Self::new(DiagnosticKind::UnitsError, message);
        d.examples = vec![
            "\"radius\": \"5.2 mm\"".to_string(),
            "\"p\": \"10 bar\"".to_string(),
            "\"sigma\": \"160 N/mm²\"".to_string(),
        ];
        d
    }

    pub fn computation(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::ComputationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Internal, message)
    }

    pub fn with_next_call(mut self, call: impl Into<String>) -> Self {
        self.next_call = Some(call.into());
        self
    }

    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

impl From<Error> for Diagnostic {
    fn from(error: Error) -> Self {
        match error {
            Error::Validation(msg) => Diagnostic::usage(msg),
            Error::NotFound(msg) => {
                let mut d = Diagnostic::new(DiagnosticKind::NotFound, msg);
                d.next_call = Some("list_tools(tags=[\"all\"])".to_string());
                d
            }
            Error::QuotaExceeded(msg) => {
                Diagnostic::new(DiagnosticKind::RateLimitExceeded, msg)
            }
            Error::Security(msg) => {
                let mut d = Diagnostic::new(DiagnosticKind::SecurityViolation, msg);
                d.workflow = Some(WORKFLOW);
                d
            }
            Error::Units(msg) => Diagnostic::units(msg),
            Error::Computation(msg) => Diagnostic::computation(msg),
            Error::Internal(msg) => Diagnostic::internal(msg),
            Error::Serialization(e) => Diagnostic::internal(e.to_string()),
            Error::Io(e) => Diagnostic::internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_diagnostic_names_remedial_call() {
        let d = Diagnostic::security("solve_kreis_umfang");
        assert_eq!(d.kind, DiagnosticKind::SecurityViolation);
        assert_eq!(
            d.next_call.as_deref(),
            Some("get_tool_details(tool_name=\"solve_kreis_umfang\")")
        );
        assert!(d.workflow.is_some());
    }

    #[test]
    fn not_found_attaches_suggestions_via_builder() {
        let d = Diagnostic::not_found("solve_kreis")
            .with_suggestions(vec!["solve_kreis_umfang".to_string()]);
        assert_eq!(d.kind, DiagnosticKind::NotFound);
        assert_eq!(d.suggestions, vec!["solve_kreis_umfang".to_string()]);
        assert_eq!(d.next_call.as_deref(), Some("list_tools(tags=[\"all\"])"));
    }

    #[test]
    fn units_error_converts_with_examples() {
        let d = Diagnostic::from(Error::units("parameter 'radius' needs a unit"));
        assert_eq!(d.kind, DiagnosticKind::UnitsError);
        assert!(!d.examples.is_empty());
    }

    #[test]
    fn handler_faults_become_computation_diagnostics() {
        let d = Diagnostic::from(Error::computation("division by zero"));
        assert_eq!(d.kind, DiagnosticKind::ComputationError);
    }

    #[test]
    fn serializes_without_empty_fields() {
        let d = Diagnostic::computation("x");
        let value = serde_json::to_value(&d).unwrap();
        assert!(value.get("suggestions").is_none());
        assert!(value.get("next_call").is_none());
        assert_eq!(value["kind"], "computation_error");
    }
}
