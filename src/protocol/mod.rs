//! Three-stage discovery protocol — list, details, execute.
//!
//! The state machine gating tool execution: every tool starts Locked for a
//! session and is unlocked only by a successful `get_details` call.
//! `execute` never unlocks implicitly. All failures return as structured
//! `Diagnostic` payloads; nothing at this boundary raises.

mod diagnostics;

pub use diagnostics::{Diagnostic, DiagnosticKind, WORKFLOW};

use crate::registry::{ToolRegistry, ToolSummary};
use crate::repair::{parse_lenient, repair, RepairedValue};
use crate::session::SessionContext;
use crate::types::ProtocolLimits;
use crate::validation::validate_non_empty;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Tag filter value requesting the full catalog.
pub const ALL_TAGS: &str = "all";

/// Reply to a `list` call.
#[derive(Debug, Clone, Serialize)]
pub struct ListReply {
    pub tools: Vec<ToolSummary>,
    /// Tag vocabulary with tool counts; present on the empty-string probe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_tags: Option<Vec<TagCount>>,
    /// Set when a valid query matched nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub guidance: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub tool_count: usize,
}

/// Reply to a `get_details` call — the full documentation payload.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDetails {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: String,
    pub has_solving: crate::registry::SolvingMode,
    pub supports_batch: bool,
    pub parameters: Vec<crate::registry::ParamSpec>,
    pub examples: Vec<Value>,
    pub solvable_variables: Vec<String>,
    pub unlocked: bool,
    pub guidance: String,
}

/// Reply to a successful `execute` call: the handler result wrapped in an
/// execution-metadata envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReply {
    pub tool_name: String,
    pub parameters_used: BTreeMap<String, RepairedValue>,
    pub result: Value,
    pub completed: bool,
}

/// The protocol front end. Owns the registry; session state is threaded
/// through every call.
#[derive(Debug)]
pub struct DiscoveryProtocol {
    registry: ToolRegistry,
    limits: ProtocolLimits,
}

impl DiscoveryProtocol {
    pub fn new(registry: ToolRegistry, limits: ProtocolLimits) -> Self {
        Self { registry, limits }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Stage 1: list tools by tag.
    ///
    /// `tags=["all"]` returns the full catalog; an empty-string probe
    /// returns the tag vocabulary; an empty tag list is a usage violation.
    pub fn list(
        &self,
        session: &mut SessionContext,
        tags: &[String],
    ) -> Result<ListReply, Diagnostic> {
        if tags.is_empty() {
            return Err(Diagnostic::usage(
                "list_tools requires a non-empty tags argument",
            )
            .with_examples(vec![
                "list_tools(tags=[\"all\"])".to_string(),
                "list_tools(tags=[\"elementar\", \"Umfang\"])".to_string(),
                "list_tools(tags=[\"\"]) to see available tags".to_string(),
            ]));
        }

        session.mark_viewed_tags(tags);

        if tags.iter().all(|t| t.trim().is_empty()) {
            let vocabulary: Vec<TagCount> = self
                .registry
                .tag_vocabulary()
                .into_iter()
                .map(|(tag, tool_count)| TagCount { tag, tool_count })
                .collect();
            return Ok(ListReply {
                tools: Vec::new(),
                available_tags: Some(vocabulary),
                warning: None,
                guidance: "call list_tools with one of these tags, or tags=[\"all\"]"
                    .to_string(),
            });
        }

        let catalog = self.registry.get_catalog(true);
        let tools: Vec<ToolSummary> = if tags.iter().any(|t| t == ALL_TAGS) {
            catalog
        } else {
            catalog
                .into_iter()
                .filter(|summary| summary.tags.iter().any(|t| tags.contains(t)))
                .collect()
        };

        let warning = if tools.is_empty() && !self.registry.is_empty() {
            let known: Vec<String> = self
                .registry
                .tag_vocabulary()
                .into_iter()
                .map(|(tag, _)| tag)
                .collect();
            Some(format!(
                "no tools match tags {:?}; known tags: {}",
                tags,
                known.join(", ")
            ))
        } else {
            None
        };

        tracing::debug!(session = %session.session_id(), count = tools.len(), "list served");
        Ok(ListReply {
            tools,
            available_tags: None,
            warning,
            guidance: "next: get_tool_details(tool_name) to unlock a tool for execution"
                .to_string(),
        })
    }

    /// Stage 2: fetch full documentation for one tool.
    ///
    /// The only transition that unlocks a tool. Idempotent; rate limited
    /// per tool.
    pub fn get_details(
        &self,
        session: &mut SessionContext,
        tool_name: &str,
    ) -> Result<ToolDetails, Diagnostic> {
        if validate_non_empty(tool_name, "tool_name").is_err() {
            return Err(Diagnostic::usage(
                "get_tool_details requires a tool_name; list tools first to find one",
            )
            .with_next_call("list_tools(tags=[\"all\"])"));
        }

        let Some(descriptor) = self.registry.get(tool_name) else {
            return Err(Diagnostic::not_found(tool_name)
                .with_suggestions(suggest_similar(tool_name, &self.registry.names())));
        };

        let counter = details_key(tool_name);
        if session.count_in_window(&counter) >= self.limits.details_per_window as usize {
            return Err(Diagnostic::rate_limit(
                "details",
                tool_name,
                self.limits.details_per_window,
                self.limits.window.as_secs(),
            ));
        }
        session.record_call(&counter);

        session.unlock(tool_name);
        session.mark_viewed_tool(tool_name);
        tracing::info!(session = %session.session_id(), tool = tool_name, "tool unlocked");

        let metadata = &descriptor.metadata;
        Ok(ToolDetails {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            tags: metadata.tags.clone(),
            category: metadata.category.clone(),
            has_solving: metadata.has_solving,
            supports_batch: metadata.supports_batch,
            parameters: metadata.parameters.clone(),
            examples: metadata.examples.clone(),
            solvable_variables: crate::registry::extract_solvable_variables(
                &metadata.description,
            ),
            unlocked: true,
            guidance: format!(
                "next: execute_tool(tool_name=\"{}\", parameters={{...}}); mark the unknown \
                 with \"target\"",
                metadata.name
            ),
        })
    }

    /// Stage 3: execute an unlocked tool.
    ///
    /// Gate order: name present, name registered, parameters present,
    /// whitelisted, rate limit, parameters non-empty after repair. Handler
    /// faults are wrapped, never propagated.
    pub async fn execute(
        &self,
        session: &mut SessionContext,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<ExecutionReply, Diagnostic> {
        if validate_non_empty(tool_name, "tool_name").is_err() {
            return Err(Diagnostic::usage(
                "execute_tool requires a tool_name; list tools first to find one",
            )
            .with_next_call("list_tools(tags=[\"all\"])"));
        }

        if !self.registry.has_tool(tool_name) {
            return Err(Diagnostic::not_found(tool_name)
                .with_suggestions(suggest_similar(tool_name, &self.registry.names())));
        }

        let raw = match parameters {
            Value::Object(map) if !map.is_empty() => map.clone(),
            Value::String(blob) => match parse_lenient(blob) {
                Ok(map) if !map.is_empty() => map,
                _ => {
                    return Err(parameters_usage_diagnostic(tool_name));
                }
            },
            _ => {
                return Err(parameters_usage_diagnostic(tool_name));
            }
        };

        if !session.is_unlocked(tool_name) {
            return Err(Diagnostic::security(tool_name));
        }

        let counter = execute_key(tool_name);
        if session.count_in_window(&counter) >= self.limits.execute_per_window as usize {
            return Err(Diagnostic::rate_limit(
                "execute",
                tool_name,
                self.limits.execute_per_window,
                self.limits.window.as_secs(),
            ));
        }
        session.record_call(&counter);

        let repaired = repair(&raw);
        if repaired.is_empty() {
            return Err(parameters_usage_diagnostic(tool_name));
        }

        tracing::info!(session = %session.session_id(), tool = tool_name, "executing tool");
        match self.registry.invoke(tool_name, &repaired).await {
            Ok(result) => Ok(ExecutionReply {
                tool_name: tool_name.to_string(),
                parameters_used: repaired,
                result,
                completed: true,
            }),
            Err(error) => {
                tracing::warn!(tool = tool_name, error = %error, "tool execution failed");
                Err(Diagnostic::from(error))
            }
        }
    }
}

fn details_key(tool_name: &str) -> String {
    format!("details:{}", tool_name)
}

fn execute_key(tool_name: &str) -> String {
    format!("execute:{}", tool_name)
}

fn parameters_usage_diagnostic(tool_name: &str) -> Diagnostic {
    Diagnostic::usage(format!(
        "execute_tool requires a non-empty parameters mapping for '{}'",
        tool_name
    ))
    .with_next_call(format!("get_tool_details(tool_name=\"{}\")", tool_name))
    .with_examples(vec![
        format!(
            "execute_tool(tool_name=\"{}\", parameters={{\"radius\": \"5 cm\"}})",
            tool_name
        ),
        "mark the value to solve for with \"target\"".to_string(),
    ])
}

/// Fuzzy name suggestions: substring containment either way, or a shared
/// snake_case word.
fn suggest_similar(name: &str, names: &[String]) -> Vec<String> {
    let needle = name.to_lowercase();
    let needle_words: Vec<&str> = needle.split('_').filter(|w| !w.is_empty()).collect();

    names
        .iter()
        .filter(|candidate| {
            let hay = candidate.to_lowercase();
            hay.contains(&needle)
                || needle.contains(&hay)
                || needle_words
                    .iter()
                    // "solve" is common to every tool and would match all
                    .any(|w| w.len() > 2 && *w != "solve" && hay.split('_').any(|h| h == *w))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::builtin_handlers;
    use pretty_assertions::assert_eq;

    fn protocol() -> DiscoveryProtocol {
        let mut registry = ToolRegistry::new();
        registry.discover(builtin_handlers());
        DiscoveryProtocol::new(registry, ProtocolLimits::default())
    }

    #[test]
    fn list_requires_tags() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        let err = protocol.list(&mut session, &[]).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::UsageViolation);
        assert!(!err.examples.is_empty());
    }

    #[test]
    fn list_all_is_superset_of_each_tag() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        let all = protocol
            .list(&mut session, &["all".to_string()])
            .unwrap()
            .tools;
        let all_names: Vec<&str> = all.iter().map(|t| t.name.as_str()).collect();

        for (tag, _) in protocol.registry().tag_vocabulary() {
            let filtered = protocol.list(&mut session, &[tag.clone()]).unwrap().tools;
            for tool in filtered {
                assert!(all_names.contains(&tool.name.as_str()), "tag {}", tag);
            }
        }
    }

    #[test]
    fn list_empty_string_probe_returns_vocabulary() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        let reply = protocol.list(&mut session, &[String::new()]).unwrap();
        assert!(reply.tools.is_empty());
        let tags = reply.available_tags.unwrap();
        assert!(tags.iter().any(|t| t.tag == "elementar"));
    }

    #[test]
    fn list_unmatched_tag_warns_not_errors() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        let reply = protocol
            .list(&mut session, &["Thermodynamik".to_string()])
            .unwrap();
        assert!(reply.tools.is_empty());
        assert!(reply.warning.unwrap().contains("known tags"));
    }

    #[test]
    fn list_filters_by_tag_intersection() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        let reply = protocol
            .list(&mut session, &["Umfang".to_string()])
            .unwrap();
        assert_eq!(reply.tools.len(), 1);
        assert_eq!(reply.tools[0].name, "solve_kreis_umfang");
    }

    #[test]
    fn details_blank_name_is_usage_violation() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        for name in ["", "   "] {
            let err = protocol.get_details(&mut session, name).unwrap_err();
            assert_eq!(err.kind, DiagnosticKind::UsageViolation);
            assert!(err.next_call.unwrap().contains("list_tools"));
        }
    }

    #[tokio::test]
    async fn execute_blank_name_is_usage_violation() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        let err = protocol
            .execute(&mut session, "  ", &serde_json::json!({ "radius": "5 cm" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::UsageViolation);
    }

    #[test]
    fn details_unknown_tool_suggests() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        let err = protocol.get_details(&mut session, "solve_kreis").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::NotFound);
        assert!(err.suggestions.contains(&"solve_kreis_umfang".to_string()));
    }

    #[test]
    fn details_unlocks_and_documents() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        let details = protocol
            .get_details(&mut session, "solve_kesselformel")
            .unwrap();
        assert!(details.unlocked);
        assert!(details.supports_batch);
        assert_eq!(details.solvable_variables, vec!["p", "d", "s", "sigma"]);
        assert!(session.is_unlocked("solve_kesselformel"));
    }

    #[tokio::test]
    async fn execute_locked_tool_is_security_violation() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        let err = protocol
            .execute(
                &mut session,
                "solve_kreis_umfang",
                &serde_json::json!({ "radius": "5 cm" }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SecurityViolation);
        assert!(err.next_call.unwrap().contains("get_tool_details"));
    }

    #[tokio::test]
    async fn execute_never_unlocks_implicitly() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        let _ = protocol
            .execute(
                &mut session,
                "solve_kreis_umfang",
                &serde_json::json!({ "radius": "5 cm" }),
            )
            .await;
        assert!(!session.is_unlocked("solve_kreis_umfang"));
    }

    #[tokio::test]
    async fn execute_after_details_succeeds() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        protocol
            .get_details(&mut session, "solve_kreis_umfang")
            .unwrap();

        let reply = protocol
            .execute(
                &mut session,
                "solve_kreis_umfang",
                &serde_json::json!({ "radius": "5 cm" }),
            )
            .await
            .unwrap();
        assert!(reply.completed);
        assert_eq!(reply.result["diameter"]["value"], 10.0);
    }

    #[tokio::test]
    async fn execute_accepts_lenient_string_blob() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        protocol
            .get_details(&mut session, "solve_kesselformel")
            .unwrap();

        let blob = Value::String("{p=10 bar, d=100 mm, sigma=160 N/mm2}".to_string());
        let reply = protocol
            .execute(&mut session, "solve_kesselformel", &blob)
            .await
            .unwrap();
        assert_eq!(reply.result["solved"], "s");
    }

    #[tokio::test]
    async fn execute_empty_parameters_is_usage_violation() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        protocol
            .get_details(&mut session, "solve_kreis_umfang")
            .unwrap();

        for bad in [serde_json::json!({}), Value::Null, serde_json::json!(42)] {
            let err = protocol
                .execute(&mut session, "solve_kreis_umfang", &bad)
                .await
                .unwrap_err();
            assert_eq!(err.kind, DiagnosticKind::UsageViolation);
        }
    }

    #[tokio::test]
    async fn execute_handler_fault_is_wrapped() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        protocol
            .get_details(&mut session, "solve_kreis_umfang")
            .unwrap();

        let err = protocol
            .execute(
                &mut session,
                "solve_kreis_umfang",
                &serde_json::json!({ "radius": "5 cm", "diameter": "10 cm" }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ComputationError);
    }

    #[test]
    fn details_rate_limit_at_51st_call() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        for _ in 0..50 {
            protocol
                .get_details(&mut session, "solve_kreis_umfang")
                .unwrap();
        }
        let err = protocol
            .get_details(&mut session, "solve_kreis_umfang")
            .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::RateLimitExceeded);
        assert!(err.message.contains("details"));
    }

    #[tokio::test]
    async fn execute_rate_limit_is_independent_of_details() {
        let protocol = protocol();
        let mut session = SessionContext::new();
        protocol
            .get_details(&mut session, "solve_kreis_umfang")
            .unwrap();

        for _ in 0..20 {
            protocol
                .execute(
                    &mut session,
                    "solve_kreis_umfang",
                    &serde_json::json!({ "radius": "5 cm" }),
                )
                .await
                .unwrap();
        }
        let err = protocol
            .execute(
                &mut session,
                "solve_kreis_umfang",
                &serde_json::json!({ "radius": "5 cm" }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::RateLimitExceeded);
        assert!(err.message.contains("execute"));

        // details counter is untouched by the 21 execute calls
        protocol
            .get_details(&mut session, "solve_kreis_umfang")
            .unwrap();
    }

    #[test]
    fn suggest_similar_matches_substrings_and_words() {
        let names = vec![
            "solve_kreis_umfang".to_string(),
            "solve_rechteck".to_string(),
        ];
        assert_eq!(
            suggest_similar("kreis", &names),
            vec!["solve_kreis_umfang".to_string()]
        );
        assert_eq!(
            suggest_similar("solve_kreis_flaeche", &names),
            vec!["solve_kreis_umfang".to_string()]
        );
        assert!(suggest_similar("xyz", &names).is_empty());
    }
}
