//! Resource Provisioner.
//!
//! Executes the ordered provisioning pipeline against the platform
//! boundary:
//!
//! ```text
//! SCHEMA → TABLES → SEMANTIC_VIEW → SEARCH_INDEX → AGENT
//! ```
//!
//! `SCHEMA` and `TABLES` are mandatory; the rest are independently enabled
//! by configuration. A mandatory failure halts the pipeline and marks every
//! remaining enabled stage `skipped`; an optional failure is recorded and
//! isolated; later optional stages still run. Stages disabled by
//! configuration leave no record at all.

use crate::generate::GeneratedTable;
use crate::naming::NameSet;
use crate::platform::{
    AgentDef, AgentTool, Platform, PlatformError, SearchIndexDef, SemanticViewDef,
};
use crate::RunConfig;
use demoforge_spec::{CanonicalSchema, TableKind};
use serde::Serialize;
use thiserror::Error;

const BLOCKED_BY_PREREQUISITE: &str = "blocked by prerequisite failure";

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Schema,
    Tables,
    SemanticView,
    SearchIndex,
    Agent,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema => write!(f, "SCHEMA"),
            Self::Tables => write!(f, "TABLES"),
            Self::SemanticView => write!(f, "SEMANTIC_VIEW"),
            Self::SearchIndex => write!(f, "SEARCH_INDEX"),
            Self::Agent => write!(f, "AGENT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Schema,
    Table,
    SemanticView,
    SearchIndex,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Stage attempt in flight. Never present in the final resource list.
    Pending,
    Created,
    Failed,
    Skipped,
}

/// One stage's outcome. The full ordered list is the provisioner's output
/// contract: the authoritative record of what happened.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedResource {
    pub kind: ResourceKind,
    pub name: String,
    pub status: ResourceStatus,
    /// Error detail, skip reason, or degraded-toolset note.
    pub detail: Option<String>,
}

/// A per-stage platform failure, carried in the resource record.
#[derive(Debug, Error)]
#[error("stage {stage} failed for `{resource}`: {source}")]
pub struct ProvisioningError {
    pub stage: Stage,
    pub resource: String,
    #[source]
    pub source: PlatformError,
}

/// Inputs to one provisioning run.
pub struct ProvisionRequest<'a> {
    pub names: &'a NameSet,
    pub organization: &'a str,
    pub schema: &'a CanonicalSchema,
    pub tables: &'a [GeneratedTable],
    pub config: &'a RunConfig,
}

/// Run the provisioning pipeline. Never fails as a whole: every outcome,
/// including mandatory-stage failure, is reported through the returned
/// resource list.
pub fn provision(
    request: &ProvisionRequest<'_>,
    platform: &mut dyn Platform,
) -> Vec<ProvisionedResource> {
    let names = request.names;
    let config = request.config;
    let mut resources: Vec<ProvisionedResource> = Vec::new();
    let mut mandatory_failed = false;

    // ------------------------------------------------------------------
    // SCHEMA (mandatory)
    // ------------------------------------------------------------------
    tracing::info!(stage = %Stage::Schema, schema = %names.schema, "provisioning");
    let created = attempt(
        &mut resources,
        Stage::Schema,
        ResourceKind::Schema,
        names.schema.clone(),
        |p| p.create_schema(&names.schema),
        platform,
    );
    mandatory_failed |= !created;

    // ------------------------------------------------------------------
    // TABLES (mandatory)
    // ------------------------------------------------------------------
    if mandatory_failed {
        skip(
            &mut resources,
            ResourceKind::Table,
            names.schema.clone(),
            BLOCKED_BY_PREREQUISITE,
        );
    } else {
        tracing::info!(stage = %Stage::Tables, count = request.tables.len(), "provisioning");
        let idx = begin(&mut resources, ResourceKind::Table, names.schema.clone());
        let mut failure: Option<ProvisioningError> = None;
        for table in request.tables {
            if let Err(source) = platform.create_table(&names.schema, table) {
                failure = Some(ProvisioningError {
                    stage: Stage::Tables,
                    resource: table.name.clone(),
                    source,
                });
                break;
            }
        }
        match failure {
            None => {
                resources[idx].status = ResourceStatus::Created;
                resources[idx].detail = Some(format!("created {} tables", request.tables.len()));
            }
            Some(err) => {
                tracing::warn!(error = %err, "mandatory stage failed; halting pipeline");
                resources[idx].status = ResourceStatus::Failed;
                resources[idx].detail = Some(err.to_string());
                mandatory_failed = true;
            }
        }
    }

    // ------------------------------------------------------------------
    // SEMANTIC_VIEW (optional)
    // ------------------------------------------------------------------
    let mut semantic_view_created = false;
    if config.enable_semantic_view {
        let structured: Vec<&GeneratedTable> = request
            .tables
            .iter()
            .filter(|t| t.kind != TableKind::Unstructured)
            .collect();

        if mandatory_failed {
            skip(
                &mut resources,
                ResourceKind::SemanticView,
                names.semantic_view.clone(),
                BLOCKED_BY_PREREQUISITE,
            );
        } else if structured.len() < 2 {
            skip(
                &mut resources,
                ResourceKind::SemanticView,
                names.semantic_view.clone(),
                "requires at least two structured tables",
            );
        } else {
            tracing::info!(stage = %Stage::SemanticView, view = %names.semantic_view, "provisioning");
            let view = SemanticViewDef {
                name: names.semantic_view.clone(),
                tables: structured.iter().map(|t| t.name.clone()).collect(),
                relationships: request.schema.relationships.clone(),
                example_queries: request
                    .schema
                    .target_questions
                    .iter()
                    .take(3)
                    .cloned()
                    .collect(),
            };
            semantic_view_created = attempt(
                &mut resources,
                Stage::SemanticView,
                ResourceKind::SemanticView,
                names.semantic_view.clone(),
                |p| p.create_semantic_view(&names.schema, &view),
                platform,
            );
        }
    }

    // ------------------------------------------------------------------
    // SEARCH_INDEX (optional)
    // ------------------------------------------------------------------
    let mut search_index_created = false;
    let chunk_table = request
        .tables
        .iter()
        .find(|t| t.kind == TableKind::Unstructured);
    if config.enable_search_index {
        if mandatory_failed {
            skip(
                &mut resources,
                ResourceKind::SearchIndex,
                names.search_index.clone(),
                BLOCKED_BY_PREREQUISITE,
            );
        } else if let Some(chunks) = chunk_table {
            tracing::info!(stage = %Stage::SearchIndex, index = %names.search_index, "provisioning");
            let index = SearchIndexDef {
                name: names.search_index.clone(),
                source_table: chunks.name.clone(),
                text_column: "CHUNK_TEXT".to_string(),
                language: config.language_code.clone(),
            };
            search_index_created = attempt(
                &mut resources,
                Stage::SearchIndex,
                ResourceKind::SearchIndex,
                names.search_index.clone(),
                |p| p.create_search_index(&names.schema, &index),
                platform,
            );
        } else {
            skip(
                &mut resources,
                ResourceKind::SearchIndex,
                names.search_index.clone(),
                "no unstructured table in schema",
            );
        }
    }

    // ------------------------------------------------------------------
    // AGENT (optional; needs at least one created tool)
    // ------------------------------------------------------------------
    if config.enable_agent {
        let mut tools = Vec::new();
        if semantic_view_created {
            tools.push(AgentTool::SemanticView {
                view: names.semantic_view.clone(),
            });
        }
        if search_index_created {
            tools.push(AgentTool::SearchIndex {
                index: names.search_index.clone(),
            });
        }

        if mandatory_failed {
            skip(
                &mut resources,
                ResourceKind::Agent,
                names.agent.clone(),
                BLOCKED_BY_PREREQUISITE,
            );
        } else if tools.is_empty() {
            skip(
                &mut resources,
                ResourceKind::Agent,
                names.agent.clone(),
                "no agent tools available",
            );
        } else {
            tracing::info!(stage = %Stage::Agent, agent = %names.agent, tools = tools.len(), "provisioning");
            let degraded = degraded_toolset_note(
                config,
                chunk_table.is_some(),
                semantic_view_created,
                search_index_created,
            );
            let agent = AgentDef {
                name: names.agent.clone(),
                display_name: format!("{} Demo Agent", request.organization),
                tools,
                sample_questions: request.schema.target_questions.clone(),
            };
            let created = attempt(
                &mut resources,
                Stage::Agent,
                ResourceKind::Agent,
                names.agent.clone(),
                |p| p.create_agent(&names.schema, &agent),
                platform,
            );
            if created {
                if let Some(note) = degraded {
                    tracing::warn!(agent = %names.agent, note = %note, "agent created with degraded toolset");
                    if let Some(last) = resources.last_mut() {
                        last.detail = Some(note);
                    }
                }
            }
        }
    }

    resources
}

/// Note attached to an agent created with fewer tools than configuration
/// asked for. Reported, not silently dropped.
fn degraded_toolset_note(
    config: &RunConfig,
    has_chunk_table: bool,
    semantic_view_created: bool,
    search_index_created: bool,
) -> Option<String> {
    let mut missing = Vec::new();
    if config.enable_semantic_view && !semantic_view_created {
        missing.push("semantic view");
    }
    if config.enable_search_index && has_chunk_table && !search_index_created {
        missing.push("search index");
    }
    if missing.is_empty() {
        None
    } else {
        Some(format!("degraded toolset: {} unavailable", missing.join(", ")))
    }
}

fn begin(resources: &mut Vec<ProvisionedResource>, kind: ResourceKind, name: String) -> usize {
    resources.push(ProvisionedResource {
        kind,
        name,
        status: ResourceStatus::Pending,
        detail: None,
    });
    resources.len() - 1
}

fn skip(resources: &mut Vec<ProvisionedResource>, kind: ResourceKind, name: String, reason: &str) {
    tracing::info!(kind = ?kind, name = %name, reason = %reason, "stage skipped");
    resources.push(ProvisionedResource {
        kind,
        name,
        status: ResourceStatus::Skipped,
        detail: Some(reason.to_string()),
    });
}

fn attempt(
    resources: &mut Vec<ProvisionedResource>,
    stage: Stage,
    kind: ResourceKind,
    name: String,
    call: impl FnOnce(&mut dyn Platform) -> Result<(), PlatformError>,
    platform: &mut dyn Platform,
) -> bool {
    let idx = begin(resources, kind, name);
    match call(platform) {
        Ok(()) => {
            resources[idx].status = ResourceStatus::Created;
            true
        }
        Err(source) => {
            let err = ProvisioningError {
                stage,
                resource: resources[idx].name.clone(),
                source,
            };
            tracing::warn!(error = %err, "stage failed");
            resources[idx].status = ResourceStatus::Failed;
            resources[idx].detail = Some(err.to_string());
            false
        }
    }
}
