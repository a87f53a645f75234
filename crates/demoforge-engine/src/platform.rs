//! Platform boundary.
//!
//! The provisioner's side effects are expressed as declarative
//! resource-definition calls against a hosting analytical platform. Exact
//! call syntax is platform-specific; the engine only guarantees call
//! ordering, idempotent naming, and per-stage status reporting. A live
//! connector implements [`Platform`]; the shipped [`SqlScriptPlatform`]
//! renders every call into a reviewable SQL script for dry runs.

use crate::generate::{GeneratedTable, Value};
use demoforge_spec::Relationship;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform could not be reached or timed out. Transient-retry
    /// policy belongs to the calling collaborator, not the engine.
    #[error("platform unavailable while creating `{resource}`: {reason}")]
    Unavailable { resource: String, reason: String },

    /// The platform reached a decision and said no.
    #[error("platform rejected `{resource}`: {reason}")]
    Rejected { resource: String, reason: String },
}

// ============================================================================
// Resource definitions
// ============================================================================

/// Declarative semantic-view definition spanning the structured tables.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticViewDef {
    pub name: String,
    pub tables: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub example_queries: Vec<String>,
}

/// Declarative search-index definition over a chunk table's text column.
#[derive(Debug, Clone, Serialize)]
pub struct SearchIndexDef {
    pub name: String,
    pub source_table: String,
    pub text_column: String,
    pub language: String,
}

/// One callable tool wired into the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum AgentTool {
    SemanticView { view: String },
    SearchIndex { index: String },
}

/// Declarative conversational-agent definition.
#[derive(Debug, Clone, Serialize)]
pub struct AgentDef {
    pub name: String,
    pub display_name: String,
    pub tools: Vec<AgentTool>,
    pub sample_questions: Vec<String>,
}

// ============================================================================
// Platform trait
// ============================================================================

/// The hosting analytical platform, as seen by the provisioner.
///
/// Calls are synchronous/blocking and issued exactly once per run in stage
/// order. The engine does not retry and does not roll back.
pub trait Platform {
    fn create_schema(&mut self, name: &str) -> Result<(), PlatformError>;
    fn create_table(&mut self, schema: &str, table: &GeneratedTable) -> Result<(), PlatformError>;
    fn create_semantic_view(
        &mut self,
        schema: &str,
        view: &SemanticViewDef,
    ) -> Result<(), PlatformError>;
    fn create_search_index(
        &mut self,
        schema: &str,
        index: &SearchIndexDef,
    ) -> Result<(), PlatformError>;
    fn create_agent(&mut self, schema: &str, agent: &AgentDef) -> Result<(), PlatformError>;
}

// ============================================================================
// SQL script renderer
// ============================================================================

/// Escape a string for inclusion in a single-quoted SQL literal.
pub fn escape_sql_literal(raw: &str) -> String {
    raw.replace('\'', "''")
}

/// Renders every provisioning call into an ordered SQL script.
///
/// Used by the CLI dry run; also a convenient reference for what a live
/// connector would execute.
pub struct SqlScriptPlatform {
    statements: Vec<String>,
    insert_batch_rows: usize,
}

impl SqlScriptPlatform {
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
            insert_batch_rows: 500,
        }
    }

    /// The accumulated script, statements separated by blank lines.
    pub fn script(&self) -> String {
        self.statements.join("\n\n")
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    fn column_types(table: &GeneratedTable) -> Vec<&'static str> {
        (0..table.columns.len())
            .map(|idx| match table.rows.first().map(|r| &r[idx]) {
                Some(Value::Int(_)) => "NUMBER",
                Some(Value::Float(_)) => "FLOAT",
                Some(Value::Timestamp(_)) => "TIMESTAMP_NTZ",
                Some(Value::Bool(_)) => "BOOLEAN",
                Some(Value::Text(_)) | None => "VARCHAR",
            })
            .collect()
    }

    fn render_value(value: &Value) -> String {
        match value {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => format!("{v}"),
            Value::Text(v) => format!("'{}'", escape_sql_literal(v)),
            Value::Timestamp(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S")),
            Value::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

impl Default for SqlScriptPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for SqlScriptPlatform {
    fn create_schema(&mut self, name: &str) -> Result<(), PlatformError> {
        self.statements
            .push(format!("CREATE SCHEMA IF NOT EXISTS {name};"));
        Ok(())
    }

    fn create_table(&mut self, schema: &str, table: &GeneratedTable) -> Result<(), PlatformError> {
        let types = Self::column_types(table);
        let column_defs = table
            .columns
            .iter()
            .zip(types.iter())
            .map(|(name, ty)| format!("    {name} {ty}"))
            .collect::<Vec<_>>()
            .join(",\n");
        self.statements.push(format!(
            "CREATE OR REPLACE TABLE {schema}.{table} (\n{columns}\n);",
            table = table.name,
            columns = column_defs
        ));

        for batch in table.rows.chunks(self.insert_batch_rows) {
            let values = batch
                .iter()
                .map(|row| {
                    let rendered = row
                        .iter()
                        .map(Self::render_value)
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("    ({rendered})")
                })
                .collect::<Vec<_>>()
                .join(",\n");
            self.statements.push(format!(
                "INSERT INTO {schema}.{table} ({columns}) VALUES\n{values};",
                table = table.name,
                columns = table.columns.join(", "),
            ));
        }
        Ok(())
    }

    fn create_semantic_view(
        &mut self,
        schema: &str,
        view: &SemanticViewDef,
    ) -> Result<(), PlatformError> {
        let tables = view
            .tables
            .iter()
            .map(|t| format!("    {schema}.{t}"))
            .collect::<Vec<_>>()
            .join(",\n");
        let relationships = view
            .relationships
            .iter()
            .map(|r| {
                format!(
                    "    {}.{} REFERENCES {}.{}",
                    r.fact, r.fact_column, r.dimension, r.dimension_column
                )
            })
            .collect::<Vec<_>>()
            .join(",\n");
        let mut statement = format!(
            "CREATE OR REPLACE SEMANTIC VIEW {schema}.{name}\nTABLES (\n{tables}\n)",
            name = view.name,
        );
        if !view.relationships.is_empty() {
            statement.push_str(&format!("\nRELATIONSHIPS (\n{relationships}\n)"));
        }
        if !view.example_queries.is_empty() {
            let comment = escape_sql_literal(&view.example_queries.join(" | "));
            statement.push_str(&format!("\nCOMMENT = '{comment}'"));
        }
        statement.push(';');
        self.statements.push(statement);
        Ok(())
    }

    fn create_search_index(
        &mut self,
        schema: &str,
        index: &SearchIndexDef,
    ) -> Result<(), PlatformError> {
        self.statements.push(format!(
            "CREATE OR REPLACE SEARCH SERVICE {schema}.{name}\nON {column}\nFROM {schema}.{table}\nLANGUAGE = '{language}';",
            name = index.name,
            column = index.text_column,
            table = index.source_table,
            language = escape_sql_literal(&index.language),
        ));
        Ok(())
    }

    fn create_agent(&mut self, schema: &str, agent: &AgentDef) -> Result<(), PlatformError> {
        let tools = agent
            .tools
            .iter()
            .map(|tool| match tool {
                AgentTool::SemanticView { view } => {
                    format!("    SEMANTIC_VIEW {schema}.{view}")
                }
                AgentTool::SearchIndex { index } => {
                    format!("    SEARCH_SERVICE {schema}.{index}")
                }
            })
            .collect::<Vec<_>>()
            .join(",\n");
        let mut statement = format!(
            "CREATE OR REPLACE AGENT {name}\nDISPLAY_NAME = '{display}'\nTOOLS (\n{tools}\n)",
            name = agent.name,
            display = escape_sql_literal(&agent.display_name),
        );
        if !agent.sample_questions.is_empty() {
            let questions = escape_sql_literal(&agent.sample_questions.join(" | "));
            statement.push_str(&format!("\nSAMPLE_QUESTIONS = '{questions}'"));
        }
        statement.push(';');
        self.statements.push(statement);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demoforge_spec::TableKind;

    fn small_table() -> GeneratedTable {
        GeneratedTable {
            name: "CUSTOMERS".to_string(),
            kind: TableKind::Dimension,
            columns: vec!["CUSTOMER_ID".to_string(), "SEGMENT".to_string()],
            rows: vec![
                vec![Value::Int(1), Value::Text("smb".to_string())],
                vec![Value::Int(2), Value::Text("ent'erprise".to_string())],
            ],
        }
    }

    #[test]
    fn renders_schema_table_and_escaped_inserts() {
        let mut platform = SqlScriptPlatform::new();
        platform.create_schema("ACME_DEMO_X").unwrap();
        platform.create_table("ACME_DEMO_X", &small_table()).unwrap();

        let script = platform.script();
        assert!(script.contains("CREATE SCHEMA IF NOT EXISTS ACME_DEMO_X;"));
        assert!(script.contains("CREATE OR REPLACE TABLE ACME_DEMO_X.CUSTOMERS"));
        assert!(script.contains("CUSTOMER_ID NUMBER"));
        assert!(script.contains("SEGMENT VARCHAR"));
        // Single quotes in values are doubled.
        assert!(script.contains("'ent''erprise'"));
    }

    #[test]
    fn agent_statement_lists_tools() {
        let mut platform = SqlScriptPlatform::new();
        platform
            .create_agent(
                "ACME_DEMO_X",
                &AgentDef {
                    name: "ACME_AGENT".to_string(),
                    display_name: "Acme Demo Agent".to_string(),
                    tools: vec![
                        AgentTool::SemanticView {
                            view: "ACME_SV".to_string(),
                        },
                        AgentTool::SearchIndex {
                            index: "ACME_SEARCH".to_string(),
                        },
                    ],
                    sample_questions: vec!["top customers?".to_string()],
                },
            )
            .unwrap();

        let script = platform.script();
        assert!(script.contains("SEMANTIC_VIEW ACME_DEMO_X.ACME_SV"));
        assert!(script.contains("SEARCH_SERVICE ACME_DEMO_X.ACME_SEARCH"));
        assert!(script.contains("SAMPLE_QUESTIONS = 'top customers?'"));
    }
}
