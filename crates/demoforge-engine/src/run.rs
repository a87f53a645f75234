//! Run orchestration.
//!
//! Wires the five components in order (plan, allocate, generate, resolve
//! names, provision) and emits one immutable `RunRecord` per run for the
//! history sink. Validation and generation errors abort before any platform
//! side effect; provisioning outcomes, good or bad, live inside the record.

use crate::generate::{generate, GenerationError};
use crate::keys::allocate;
use crate::naming::{resolve_names, NameSet};
use crate::platform::Platform;
use crate::provision::{provision, ProvisionRequest, ProvisionedResource};
use crate::RunConfig;
use chrono::{DateTime, Utc};
use demoforge_spec::{plan, DemoSpec, SpecValidationError};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Spec(#[from] SpecValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Which optional stages the run was configured with.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StageFlags {
    pub semantic_view: bool,
    pub search_index: bool,
    pub agent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
    pub table: String,
    pub records: usize,
}

/// The output contract to the persistence/history collaborator: one record
/// per run. The engine emits it and never reads it back.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub organization: String,
    pub created_at: DateTime<Utc>,
    pub names: NameSet,
    pub language_code: String,
    pub enabled: StageFlags,
    pub record_counts: Vec<TableCount>,
    /// Dimensions whose overlap target was relaxed (too few rows).
    pub relaxed_dimensions: Vec<String>,
    pub resources: Vec<ProvisionedResource>,
}

impl RunRecord {
    /// True when every mandatory stage succeeded.
    pub fn mandatory_succeeded(&self) -> bool {
        use crate::provision::{ResourceKind, ResourceStatus};
        self.resources
            .iter()
            .filter(|r| matches!(r.kind, ResourceKind::Schema | ResourceKind::Table))
            .all(|r| r.status == ResourceStatus::Created)
    }
}

/// Execute one full orchestration run.
///
/// Cancellation mid-run leaves already-created resources in place; cleanup
/// (dropping the named schema or agent) is an external, manual operation.
pub fn run_demo(
    spec: &DemoSpec,
    config: &RunConfig,
    organization: &str,
    timestamp: DateTime<Utc>,
    platform: &mut dyn Platform,
) -> Result<RunRecord, RunError> {
    let run_id = Uuid::new_v4();
    tracing::info!(%run_id, organization, "starting orchestration run");

    let schema = plan(spec)?;

    // One seed per run keeps allocator and generator draws reproducible
    // within the run without requiring cross-run determinism.
    let seed = timestamp.timestamp_millis() as u64;
    let keys = allocate(&schema, config, seed);
    let tables = generate(&schema, &keys, config, organization, timestamp, seed ^ 1)?;

    let names = resolve_names(organization, timestamp);

    let resources = provision(
        &ProvisionRequest {
            names: &names,
            organization,
            schema: &schema,
            tables: &tables,
            config,
        },
        platform,
    );

    let record = RunRecord {
        run_id,
        organization: organization.to_string(),
        created_at: timestamp,
        names,
        language_code: config.language_code.clone(),
        enabled: StageFlags {
            semantic_view: config.enable_semantic_view,
            search_index: config.enable_search_index,
            agent: config.enable_agent,
        },
        record_counts: tables
            .iter()
            .map(|t| TableCount {
                table: t.name.clone(),
                records: t.row_count(),
            })
            .collect(),
        relaxed_dimensions: keys.relaxed_dimensions(),
        resources,
    };

    tracing::info!(
        %run_id,
        schema = %record.names.schema,
        resources = record.resources.len(),
        "orchestration run finished"
    );
    Ok(record)
}
