//! Referential Key Allocator.
//!
//! For every fact → dimension relationship, partitions the dimension's key
//! space into a shared pool (reused by the fact table's foreign-key column)
//! and a private remainder, sized so that the realized join-key overlap
//! converges to the configured target ratio. Foreign keys are later drawn
//! only from the shared pool, so every fact row joins to an existing
//! dimension row by construction.

use crate::rng::XorShift64;
use crate::RunConfig;
use demoforge_spec::CanonicalSchema;
use serde::Serialize;

/// Dimensions smaller than this cannot express a meaningful overlap split;
/// the whole key set becomes shared and the relaxation is reported.
pub const MIN_VIABLE_DIMENSION: usize = 2;

/// Key pool for one fact ↔ dimension relationship.
#[derive(Debug, Clone, Serialize)]
pub struct JoinKeyPool {
    pub fact: String,
    pub fact_column: String,
    pub dimension: String,
    pub dimension_column: String,
    /// Dimension keys the fact table's foreign-key column draws from.
    pub shared: Vec<i64>,
    /// Dimension-only keys never referenced by the fact table.
    pub private: Vec<i64>,
    /// True when the dimension was too small for the ratio target and the
    /// entire key set was shared instead.
    pub relaxed: bool,
}

impl JoinKeyPool {
    pub fn dimension_rows(&self) -> usize {
        self.shared.len() + self.private.len()
    }

    pub fn contains_shared(&self, key: i64) -> bool {
        self.shared.contains(&key)
    }

    /// Realized overlap from the dimension side: shared keys over all keys.
    pub fn overlap_ratio(&self) -> f64 {
        let total = self.dimension_rows();
        if total == 0 {
            return 0.0;
        }
        self.shared.len() as f64 / total as f64
    }
}

/// All pools for one run, keyed by (fact, fact_column).
#[derive(Debug, Clone, Serialize)]
pub struct KeyPlan {
    pools: Vec<JoinKeyPool>,
}

impl KeyPlan {
    pub fn pools(&self) -> &[JoinKeyPool] {
        &self.pools
    }

    pub fn pool_for(&self, fact: &str, fact_column: &str) -> Option<&JoinKeyPool> {
        self.pools
            .iter()
            .find(|p| p.fact == fact && p.fact_column == fact_column)
    }

    /// Dimensions whose ratio target was relaxed, for run-record reporting.
    pub fn relaxed_dimensions(&self) -> Vec<String> {
        self.pools
            .iter()
            .filter(|p| p.relaxed)
            .map(|p| p.dimension.clone())
            .collect()
    }
}

/// Compute shared key pools for every relationship in the schema.
///
/// Dimension primary keys are the deterministic sequence `1..=D`, so pools
/// can be allocated before any row is generated; the generator materializes
/// exactly those keys.
pub fn allocate(schema: &CanonicalSchema, config: &RunConfig, seed: u64) -> KeyPlan {
    let mut rng = XorShift64::new(seed);
    let mut pools = Vec::with_capacity(schema.relationships.len());

    for rel in &schema.relationships {
        let dimension_rows = schema
            .table(&rel.dimension)
            .map(|t| config.effective_rows(t))
            .unwrap_or(0);

        let mut keys: Vec<i64> = (1..=dimension_rows as i64).collect();
        rng.shuffle(&mut keys);

        let (shared, private, relaxed) = if dimension_rows < MIN_VIABLE_DIMENSION {
            tracing::warn!(
                dimension = %rel.dimension,
                rows = dimension_rows,
                "dimension below minimum viable pool; sharing entire key set"
            );
            (keys, Vec::new(), true)
        } else {
            let k = ((dimension_rows as f64 * config.overlap_ratio).round() as usize)
                .clamp(1, dimension_rows);
            let private = keys.split_off(k);
            (keys, private, false)
        };

        let mut shared = shared;
        let mut private = private;
        shared.sort_unstable();
        private.sort_unstable();

        tracing::debug!(
            fact = %rel.fact,
            dimension = %rel.dimension,
            shared = shared.len(),
            private = private.len(),
            "allocated join key pool"
        );

        pools.push(JoinKeyPool {
            fact: rel.fact.clone(),
            fact_column: rel.fact_column.clone(),
            dimension: rel.dimension.clone(),
            dimension_column: rel.dimension_column.clone(),
            shared,
            private,
            relaxed,
        });
    }

    KeyPlan { pools }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demoforge_spec::{
        CanonicalColumn, CanonicalSchema, CanonicalTable, Relationship, SemanticType, TableKind,
    };

    fn schema_with_dimension_rows(rows: usize) -> CanonicalSchema {
        CanonicalSchema {
            title: "t".to_string(),
            industry: "retail".to_string(),
            tables: vec![
                CanonicalTable {
                    name: "ORDERS".to_string(),
                    kind: TableKind::Fact,
                    columns: vec![
                        CanonicalColumn {
                            name: "ORDER_ID".to_string(),
                            semantic: SemanticType::Identifier,
                            sample_values: vec![],
                            reference: None,
                        },
                        CanonicalColumn {
                            name: "CUSTOMER_ID".to_string(),
                            semantic: SemanticType::ForeignKey,
                            sample_values: vec![],
                            reference: Some(demoforge_spec::ColumnRef {
                                table: "CUSTOMERS".to_string(),
                                column: "CUSTOMER_ID".to_string(),
                            }),
                        },
                    ],
                    row_count: None,
                },
                CanonicalTable {
                    name: "CUSTOMERS".to_string(),
                    kind: TableKind::Dimension,
                    columns: vec![CanonicalColumn {
                        name: "CUSTOMER_ID".to_string(),
                        semantic: SemanticType::Identifier,
                        sample_values: vec![],
                        reference: None,
                    }],
                    row_count: Some(rows),
                },
            ],
            relationships: vec![Relationship {
                fact: "ORDERS".to_string(),
                fact_column: "CUSTOMER_ID".to_string(),
                dimension: "CUSTOMERS".to_string(),
                dimension_column: "CUSTOMER_ID".to_string(),
            }],
            target_questions: vec![],
        }
    }

    #[test]
    fn pool_size_is_rounded_ratio() {
        let schema = schema_with_dimension_rows(100);
        let plan = allocate(&schema, &RunConfig::default(), 1);
        let pool = plan.pool_for("ORDERS", "CUSTOMER_ID").expect("pool");
        assert_eq!(pool.shared.len(), 70);
        assert_eq!(pool.private.len(), 30);
        assert!(!pool.relaxed);
    }

    #[test]
    fn shared_and_private_partition_the_key_space() {
        let schema = schema_with_dimension_rows(50);
        let plan = allocate(&schema, &RunConfig::default(), 9);
        let pool = plan.pool_for("ORDERS", "CUSTOMER_ID").expect("pool");

        let mut all: Vec<i64> = pool.shared.iter().chain(pool.private.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (1..=50).collect::<Vec<i64>>());
    }

    #[test]
    fn tiny_dimension_relaxes_and_reports() {
        let mut schema = schema_with_dimension_rows(100);
        // Bypass the planner bound on purpose: the allocator must still
        // behave when handed a programmatic schema with a 1-row dimension.
        schema.tables[1].row_count = Some(1);
        let plan = allocate(&schema, &RunConfig::default(), 3);
        let pool = plan.pool_for("ORDERS", "CUSTOMER_ID").expect("pool");
        assert!(pool.relaxed);
        assert_eq!(pool.shared, vec![1]);
        assert!(pool.private.is_empty());
        assert_eq!(plan.relaxed_dimensions(), vec!["CUSTOMERS".to_string()]);
    }

    #[test]
    fn ratio_extremes_keep_at_least_one_shared_key() {
        let schema = schema_with_dimension_rows(40);
        let config = RunConfig {
            overlap_ratio: 0.0,
            ..RunConfig::default()
        };
        let plan = allocate(&schema, &config, 5);
        let pool = plan.pool_for("ORDERS", "CUSTOMER_ID").expect("pool");
        assert_eq!(pool.shared.len(), 1);
    }
}
