//! Demoforge Infrastructure Orchestration Engine
//!
//! Turns a validated demo schema into a physically consistent multi-table
//! dataset and provisions the dependent analytical resources in order,
//! under partial-failure isolation.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                      ORCHESTRATION PIPELINE                          │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  DemoSpec ──► Schema Planner ──► Key Allocator ──► Data Generator    │
//! │  (oracle)     (demoforge-spec)   (shared pools)    (tables + rows)   │
//! │                                                         │            │
//! │  organization + timestamp ──► Naming Resolver           │            │
//! │                                     │                   │            │
//! │                                     ▼                   ▼            │
//! │                            ┌─────────────────────────────────┐       │
//! │                            │        Resource Provisioner     │       │
//! │                            │ SCHEMA → TABLES → SEMANTIC_VIEW │       │
//! │                            │        → SEARCH_INDEX → AGENT   │       │
//! │                            └───────────────┬─────────────────┘       │
//! │                                            ▼                         │
//! │                                   Platform boundary                  │
//! │                              (declarative resource calls)            │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Execution is single-threaded and strictly sequential. Validation and
//! generation errors abort a run before any platform side effect; optional
//! provisioning failures are isolated per stage and reported in the run
//! record rather than aborting. There is no retry and no rollback; re-runs
//! are always safe because resource names are timestamp-qualified.

pub mod generate;
pub mod keys;
pub mod naming;
pub mod oracle;
pub mod platform;
pub mod provision;
pub mod rng;
pub mod run;

use serde::{Deserialize, Serialize};

use demoforge_spec::{CanonicalTable, MAX_TABLE_ROWS, MIN_TABLE_ROWS};

// ============================================================================
// Run Configuration
// ============================================================================

/// Configuration for one orchestration run.
///
/// Passed once at the start of a run, never ambient state: the provisioner's
/// stage-skip logic is purely a function of this value plus upstream stage
/// outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Target fraction of dimension keys shared with referencing fact
    /// tables, in [0, 1].
    pub overlap_ratio: f64,
    /// Rows generated per table, clamped to [20, 10_000]; per-table spec
    /// overrides win.
    pub records_per_table: usize,
    pub enable_semantic_view: bool,
    pub enable_search_index: bool,
    pub enable_agent: bool,
    /// BCP-47-ish language tag for generated text and the search index.
    pub language_code: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            overlap_ratio: 0.70,
            records_per_table: 100,
            enable_semantic_view: true,
            enable_search_index: true,
            enable_agent: true,
            language_code: "en".to_string(),
        }
    }
}

impl RunConfig {
    /// Effective row count for a table: the validated spec override if
    /// present, otherwise `records_per_table` clamped to the global bounds.
    pub fn effective_rows(&self, table: &CanonicalTable) -> usize {
        table
            .row_count
            .unwrap_or_else(|| self.records_per_table.clamp(MIN_TABLE_ROWS, MAX_TABLE_ROWS))
    }
}

// ============================================================================
// Re-exports
// ============================================================================

pub use generate::{
    generate, generate_with_registry, ColumnContext, GeneratedTable, GenerationError,
    GeneratorRegistry, Value, ValueGenerator,
};
pub use keys::{allocate, JoinKeyPool, KeyPlan, MIN_VIABLE_DIMENSION};
pub use naming::{resolve_names, sanitize_identifier, NameSet};
pub use oracle::{ContentOracle, MockOracle, OracleConfig, OracleError, OrgBrief};
pub use platform::{
    AgentDef, AgentTool, Platform, PlatformError, SearchIndexDef, SemanticViewDef,
    SqlScriptPlatform,
};
pub use provision::{
    provision, ProvisionRequest, ProvisionedResource, ProvisioningError, ResourceKind,
    ResourceStatus, Stage,
};
pub use run::{run_demo, RunError, RunRecord, StageFlags, TableCount};
