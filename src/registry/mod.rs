//! Tool registry — typed handler metadata and name-keyed dispatch.
//!
//! Owns the catalog of discovered formula handlers. The catalog is never
//! handed to the protocol layer directly; it is consumed through
//! `get_catalog` projections and `invoke`. Discovery rebuilds the map from
//! an explicit registration table — no runtime namespace scanning.

use crate::repair::RepairedValue;
use crate::types::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Textual marker in a handler description that carries the machine-parsable
/// list of solvable variables.
pub const SOLVABLE_MARKER: &str = "Lösbare Variablen:";

/// How a handler solves for its unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolvingMode {
    #[serde(rename = "symbolic")]
    Symbolic,
    #[serde(rename = "numeric")]
    Numeric,
    #[serde(rename = "symbolic/numeric")]
    SymbolicNumeric,
    #[serde(rename = "none")]
    None,
}

/// A single parameter definition for a formula handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    /// Example well-formed value, shown in diagnostics and details replies.
    pub example: String,
}

/// Declared metadata for one formula handler.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerMetadata {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: String,
    pub has_solving: SolvingMode,
    pub supports_batch: bool,
    pub parameters: Vec<ParamSpec>,
    pub examples: Vec<Value>,
}

/// A formula handler: named parameters in, solved values out.
///
/// Handlers receive repaired parameters (clean strings, `"target"`
/// sentinel) and return a JSON result. Faults are returned as errors,
/// never panics; the protocol layer wraps them into diagnostics.
#[async_trait]
pub trait FormulaHandler: Send + Sync + fmt::Debug {
    fn metadata(&self) -> HandlerMetadata;

    async fn solve(&self, parameters: &BTreeMap<String, RepairedValue>) -> Result<Value>;
}

/// One registered tool: declared metadata plus its callable.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub metadata: HandlerMetadata,
    pub handler: Arc<dyn FormulaHandler>,
}

/// Catalog projection returned by the discovery step.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub category: String,
    pub solvable_variables: Vec<String>,
    pub is_symbolic: bool,
}

/// In-memory tool registry keyed by tool name.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Rebuild the registry from a registration table.
    ///
    /// Clears any previous contents. Handlers with an empty name are
    /// logged and skipped; the scan never aborts. Name collisions are
    /// renamed (`name_2`, `name_3`, ...) and logged at warn.
    pub fn discover(&mut self, handlers: Vec<Arc<dyn FormulaHandler>>) -> usize {
        self.tools.clear();

        for handler in handlers {
            let metadata = handler.metadata();
            if metadata.name.trim().is_empty() {
                tracing::warn!(category = %metadata.category, "skipping handler with empty name");
                continue;
            }

            let mut name = metadata.name.clone();
            let mut suffix = 2;
            while self.tools.contains_key(&name) {
                name = format!("{}_{}", metadata.name, suffix);
                suffix += 1;
            }
            if name != metadata.name {
                tracing::warn!(
                    original = %metadata.name,
                    renamed = %name,
                    "tool name collision, renamed"
                );
            }

            tracing::info!(tool = %name, category = %metadata.category, "discovered tool");
            let mut metadata = metadata;
            metadata.name = name.clone();
            self.tools.insert(name, ToolDescriptor { metadata, handler });
        }

        self.tools.len()
    }

    /// Get a tool descriptor by name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Distinct tag vocabulary with per-tag tool counts, sorted by tag.
    pub fn tag_vocabulary(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for descriptor in self.tools.values() {
            for tag in &descriptor.metadata.tags {
                *counts.entry(tag.clone()).or_default() += 1;
            }
        }
        counts.into_iter().collect()
    }

    /// Project the registry into summaries, sorted by name.
    pub fn get_catalog(&self, include_metadata: bool) -> Vec<ToolSummary> {
        let mut summaries: Vec<ToolSummary> = self
            .tools
            .values()
            .map(|d| summarize(&d.metadata, include_metadata))
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Look up and call a handler, awaiting its result.
    pub async fn invoke(
        &self,
        name: &str,
        parameters: &BTreeMap<String, RepairedValue>,
    ) -> Result<Value> {
        let descriptor = self.tools.get(name).ok_or_else(|| {
            Error::not_found(format!(
                "unknown tool '{}', available: {}",
                name,
                self.names().join(", ")
            ))
        })?;
        descriptor.handler.solve(parameters).await
    }
}

fn summarize(metadata: &HandlerMetadata, include_metadata: bool) -> ToolSummary {
    ToolSummary {
        name: metadata.name.clone(),
        description: include_metadata.then(|| metadata.description.clone()),
        tags: metadata.tags.clone(),
        category: metadata.category.clone(),
        solvable_variables: extract_solvable_variables(&metadata.description),
        is_symbolic: metadata.tags.iter().any(|t| t == "symbolic"),
    }
}

/// Extract the `Lösbare Variablen: [a, b, c]` list from a description.
pub fn extract_solvable_variables(description: &str) -> Vec<String> {
    let Some(start) = description.find(SOLVABLE_MARKER) else {
        return Vec::new();
    };
    let rest = &description[start + SOLVABLE_MARKER.len()..];
    let Some(open) = rest.find('[') else {
        return Vec::new();
    };
    let Some(close) = rest[open..].find(']') else {
        return Vec::new();
    };
    rest[open + 1..open + close]
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
