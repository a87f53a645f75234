//! Raw demo specification, as produced by the content oracle.
//!
//! Everything here is deliberately loose: `kind` and `semantic_type` are
//! plain strings because the oracle emits free-form JSON and different
//! prompts settle on slightly different vocabulary (`"number"` vs
//! `"numeric"`, `"fk"` vs `"foreign_key"`, ...). The planner owns the
//! normalization; nothing else in the workspace should read these types.

use serde::{Deserialize, Serialize};

/// One demo environment description, produced once per session by the
/// external content oracle. Read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSpec {
    pub title: String,
    pub description: String,
    /// Industry tag, e.g. "retail" or "logistics".
    pub industry: String,
    pub tables: Vec<TableSpec>,
    /// Natural-language questions the generated environment should be able
    /// to answer. Passed through to the semantic view and agent.
    #[serde(default)]
    pub target_questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    /// Loose table kind: fact | dimension | unstructured (plus synonyms).
    pub kind: String,
    pub columns: Vec<ColumnSpec>,
    /// Optional per-table row-count override. Validated against the
    /// [20, 10_000] bound by the planner.
    #[serde(default)]
    pub row_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    /// Loose semantic type: identifier | categorical | numeric | temporal |
    /// free_text | foreign_key (plus synonyms).
    pub semantic_type: String,
    /// Sample-value domain hints from the oracle. Optional; generators fall
    /// back to synthesized values when absent.
    #[serde(default)]
    pub sample_values: Vec<String>,
    /// Reference target when this column is a foreign key.
    #[serde(default)]
    pub references: Option<ReferenceSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSpec {
    pub table: String,
    pub column: String,
}
