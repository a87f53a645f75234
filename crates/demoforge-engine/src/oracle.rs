//! Content-oracle boundary.
//!
//! The external AI content oracle turns an organization brief into a
//! `DemoSpec`. The engine never performs inference itself; this module is
//! the interface a collaborator implements, plus a mock provider for tests
//! and offline runs. Oracle output is untrusted and always goes through the
//! schema planner before anything else touches it.

use demoforge_spec::spec::ReferenceSpec;
use demoforge_spec::{ColumnSpec, DemoSpec, TableSpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the caller knows about the target organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgBrief {
    pub organization: String,
    pub description: String,
    #[serde(default)]
    pub industry_hint: Option<String>,
    #[serde(default = "default_language")]
    pub language_code: String,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Error)]
pub enum OracleError {
    /// The oracle service is unreachable or timed out. Retry policy belongs
    /// to the caller.
    #[error("content oracle unreachable: {reason}")]
    Unreachable { reason: String },

    /// The oracle answered, but the payload did not deserialize into a
    /// demo spec.
    #[error("content oracle returned a malformed spec: {reason}")]
    Malformed { reason: String },

    #[error("no content oracle configured; set DEMOFORGE_ORACLE_URL or an API key")]
    NotConfigured,
}

/// Produces one demo spec per session from an organization brief.
pub trait ContentOracle {
    fn demo_spec(&self, brief: &OrgBrief) -> Result<DemoSpec, OracleError>;
}

/// Which hosted model family a live oracle implementation talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleProvider {
    OpenAI,
    Anthropic,
    Local,
}

/// Connection settings for a live oracle, resolved from the environment.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub provider: OracleProvider,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Transient-error retries a live implementation should apply; the
    /// engine itself never retries.
    pub max_retries: u32,
}

impl OracleConfig {
    /// Load from environment variables, trying providers in order.
    pub fn from_env() -> Result<Self, OracleError> {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            return Ok(Self {
                provider: OracleProvider::OpenAI,
                api_key: key,
                model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
                base_url: std::env::var("OPENAI_BASE_URL").ok(),
                timeout_secs: 60,
                max_retries: 3,
            });
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            return Ok(Self {
                provider: OracleProvider::Anthropic,
                api_key: key,
                model: std::env::var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|_| "claude-3-5-sonnet-latest".to_string()),
                base_url: None,
                timeout_secs: 60,
                max_retries: 3,
            });
        }
        if let Ok(url) = std::env::var("DEMOFORGE_ORACLE_URL") {
            return Ok(Self {
                provider: OracleProvider::Local,
                api_key: String::new(),
                model: std::env::var("DEMOFORGE_ORACLE_MODEL")
                    .unwrap_or_else(|_| "default".to_string()),
                base_url: Some(url),
                timeout_secs: 120,
                max_retries: 1,
            });
        }
        Err(OracleError::NotConfigured)
    }
}

// ============================================================================
// Mock oracle
// ============================================================================

/// Canned oracle for tests and offline CLI runs: a small retail demo with
/// one fact table, two dimensions, and an unstructured notes table.
pub struct MockOracle;

impl ContentOracle for MockOracle {
    fn demo_spec(&self, brief: &OrgBrief) -> Result<DemoSpec, OracleError> {
        let industry = brief
            .industry_hint
            .clone()
            .unwrap_or_else(|| "retail".to_string());

        Ok(DemoSpec {
            title: format!("{} analytics demo", brief.organization),
            description: brief.description.clone(),
            industry,
            tables: vec![
                TableSpec {
                    name: "ORDERS".to_string(),
                    kind: "fact".to_string(),
                    columns: vec![
                        column("ORDER_ID", "identifier", &[]),
                        fk_column("CUSTOMER_ID", "CUSTOMERS", "CUSTOMER_ID"),
                        fk_column("PRODUCT_ID", "PRODUCTS", "PRODUCT_ID"),
                        column("ORDER_TOTAL", "numeric", &["129.90", "54.20", "310.00"]),
                        column("ORDER_STATUS", "categorical", &["placed", "shipped", "returned"]),
                        column("ORDER_TS", "temporal", &[]),
                    ],
                    row_count: None,
                },
                TableSpec {
                    name: "CUSTOMERS".to_string(),
                    kind: "dimension".to_string(),
                    columns: vec![
                        column("CUSTOMER_ID", "identifier", &[]),
                        column("CUSTOMER_NAME", "categorical", &[]),
                        column("SEGMENT", "categorical", &["smb", "mid-market", "enterprise"]),
                        column("REGION", "categorical", &["emea", "amer", "apac"]),
                    ],
                    row_count: None,
                },
                TableSpec {
                    name: "PRODUCTS".to_string(),
                    kind: "dimension".to_string(),
                    columns: vec![
                        column("PRODUCT_ID", "identifier", &[]),
                        column("CATEGORY", "categorical", &["hardware", "software", "services"]),
                        column("UNIT_PRICE", "numeric", &["19.99", "249.00", "999.00"]),
                    ],
                    row_count: None,
                },
                TableSpec {
                    name: "SUPPORT_NOTES".to_string(),
                    kind: "unstructured".to_string(),
                    columns: vec![column(
                        "NOTE_TEXT",
                        "free_text",
                        &["support ticket", "product review", "onboarding note"],
                    )],
                    row_count: None,
                },
            ],
            target_questions: vec![
                "Which customer segment drives the most order revenue?".to_string(),
                "What are the top product categories by order count this week?".to_string(),
                "What are customers complaining about in support notes?".to_string(),
            ],
        })
    }
}

fn column(name: &str, semantic: &str, samples: &[&str]) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        semantic_type: semantic.to_string(),
        sample_values: samples.iter().map(|s| s.to_string()).collect(),
        references: None,
    }
}

fn fk_column(name: &str, table: &str, target: &str) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        semantic_type: "foreign_key".to_string(),
        sample_values: vec![],
        references: Some(ReferenceSpec {
            table: table.to_string(),
            column: target.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_spec_passes_the_planner() {
        let brief = OrgBrief {
            organization: "Acme-Corp".to_string(),
            description: "retail chain".to_string(),
            industry_hint: None,
            language_code: "en".to_string(),
        };
        let spec = MockOracle.demo_spec(&brief).expect("mock spec");
        let schema = demoforge_spec::plan(&spec).expect("mock spec must validate");
        assert_eq!(schema.relationships.len(), 2);
        assert!(schema.unstructured_table().is_some());
    }
}
