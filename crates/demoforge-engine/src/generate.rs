//! Synthetic Data Generator.
//!
//! Materializes rows for every canonical table: dimension and unstructured
//! tables first (so their primary keys exist), fact tables last, drawing
//! foreign-key values from the allocator's shared pools and everything else
//! from per-semantic-type generators. Fails fast: no table reaches the
//! provisioner unless every table generated.

use crate::keys::KeyPlan;
use crate::rng::XorShift64;
use crate::RunConfig;
use chrono::{DateTime, Duration, Utc};
use demoforge_spec::{
    CanonicalColumn, CanonicalSchema, CanonicalTable, SemanticType, TableKind, MAX_TABLE_ROWS,
    MIN_TABLE_ROWS,
};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Suffix the platform's text-search service expects on chunk tables.
pub const CHUNKS_SUFFIX: &str = "_CHUNKS";

/// Fixed column layout of materialized unstructured tables.
pub const CHUNK_COLUMNS: [&str; 6] = [
    "CHUNK_ID",
    "DOCUMENT_ID",
    "CHUNK_TEXT",
    "DOCUMENT_TYPE",
    "SOURCE_SYSTEM",
    "LANGUAGE",
];

const DEFAULT_DOCUMENT_TYPES: [&str; 4] = ["report", "email", "meeting note", "faq entry"];
const SOURCE_SYSTEMS: [&str; 4] = ["crm", "helpdesk", "wiki", "email"];

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("table `{table}`, column `{column}`: no generator registered for semantic type `{semantic}`")]
    MissingGenerator {
        table: String,
        column: String,
        semantic: SemanticType,
    },

    #[error("fact table `{fact}`, column `{column}`: no key pool allocated for the referenced dimension")]
    UnresolvedKeyPool { fact: String, column: String },

    #[error("table `{table}`: row count {requested} outside [20, 10000]")]
    RowCountOutOfBounds { table: String, requested: usize },
}

// ============================================================================
// Generated values and tables
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Bool(bool),
}

/// One materialized table. Immutable once handed to the provisioner.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedTable {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl GeneratedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order.
    pub fn column_values<'a>(&'a self, name: &str) -> Vec<&'a Value> {
        match self.column_index(name) {
            Some(idx) => self.rows.iter().map(|r| &r[idx]).collect(),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// Per-semantic-type generators
// ============================================================================

/// Everything a column generator may condition on.
pub struct ColumnContext<'a> {
    pub table: &'a CanonicalTable,
    pub column: &'a CanonicalColumn,
    pub organization: &'a str,
    pub industry: &'a str,
    /// Run timestamp; temporal values land in the trailing seven days.
    pub now: DateTime<Utc>,
}

pub trait ValueGenerator {
    fn generate(&self, ctx: &ColumnContext<'_>, rng: &mut XorShift64, rows: usize) -> Vec<Value>;
}

/// Registry of column generators keyed by semantic type. Foreign keys are
/// not registry-driven; they always come from the allocator's pools.
pub struct GeneratorRegistry {
    generators: HashMap<SemanticType, Box<dyn ValueGenerator>>,
}

impl GeneratorRegistry {
    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// The built-in generator set covering every non-foreign-key type.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(SemanticType::Identifier, Box::new(IdentifierGenerator));
        registry.register(SemanticType::Categorical, Box::new(CategoricalGenerator));
        registry.register(SemanticType::Numeric, Box::new(NumericGenerator));
        registry.register(SemanticType::Temporal, Box::new(TemporalGenerator));
        registry.register(SemanticType::FreeText, Box::new(FreeTextGenerator));
        registry
    }

    pub fn register(&mut self, semantic: SemanticType, generator: Box<dyn ValueGenerator>) {
        self.generators.insert(semantic, generator);
    }

    fn get(&self, semantic: SemanticType) -> Option<&dyn ValueGenerator> {
        self.generators.get(&semantic).map(|g| g.as_ref())
    }
}

struct IdentifierGenerator;

impl ValueGenerator for IdentifierGenerator {
    fn generate(&self, _ctx: &ColumnContext<'_>, _rng: &mut XorShift64, rows: usize) -> Vec<Value> {
        (1..=rows as i64).map(Value::Int).collect()
    }
}

struct CategoricalGenerator;

impl ValueGenerator for CategoricalGenerator {
    fn generate(&self, ctx: &ColumnContext<'_>, rng: &mut XorShift64, rows: usize) -> Vec<Value> {
        let hints = &ctx.column.sample_values;
        if hints.is_empty() {
            // Oracle supplied no domain; degrade to labeled placeholders.
            return (0..rows)
                .map(|i| Value::Text(format!("{}_{}", ctx.column.name, i + 1)))
                .collect();
        }
        (0..rows)
            .map(|_| Value::Text(rng.pick(hints).clone()))
            .collect()
    }
}

struct NumericGenerator;

impl NumericGenerator {
    fn looks_like_percentage(name: &str, samples: &[f64]) -> bool {
        let name = name.to_ascii_uppercase();
        ["RATE", "PERCENT", "YIELD", "RATIO", "MARGIN", "SCORE"]
            .iter()
            .any(|m| name.contains(m))
            || (!samples.is_empty()
                && samples.iter().all(|v| (0.0..=100.0).contains(v))
                && samples.iter().sum::<f64>() / samples.len() as f64 > 5.0)
    }
}

impl ValueGenerator for NumericGenerator {
    fn generate(&self, ctx: &ColumnContext<'_>, rng: &mut XorShift64, rows: usize) -> Vec<Value> {
        let name_upper = ctx.column.name.to_ascii_uppercase();
        // ID-suffixed numerics stay sequential so they read as keys.
        if name_upper.ends_with("_ID") || name_upper == "ID" {
            return (1..=rows as i64).map(Value::Int).collect();
        }

        let samples: Vec<f64> = ctx
            .column
            .sample_values
            .iter()
            .filter_map(|s| s.trim().parse::<f64>().ok())
            .collect();

        if samples.is_empty() {
            return (0..rows)
                .map(|_| Value::Int(rng.gen_range_i64(1, 1000)))
                .collect();
        }

        let all_integers = ctx
            .column
            .sample_values
            .iter()
            .all(|s| s.trim().parse::<i64>().is_ok());
        let non_negative = samples.iter().all(|v| *v >= 0.0);

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let mut std_dev = if samples.len() > 1 {
            let var =
                samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64;
            var.sqrt()
        } else {
            mean.abs() * 0.35
        };

        // Widen the spread so generated measures look diverse rather than
        // clustered on the handful of oracle samples.
        let percentage = Self::looks_like_percentage(&ctx.column.name, &samples);
        if percentage {
            std_dev = std_dev.max(mean.abs() * 0.20);
        } else if std_dev < mean.abs() * 0.30 {
            std_dev = mean.abs() * 0.40;
        }

        (0..rows)
            .map(|_| {
                // Roughly 30% of draws get a wider spread for outliers.
                let spread = if !percentage && rng.next_f64() < 0.30 {
                    std_dev * 2.5
                } else {
                    std_dev
                };
                let mut v = rng.gaussian(mean, spread);
                if percentage {
                    v = v.clamp(0.0, 100.0);
                } else if non_negative {
                    v = v.max(0.0);
                }
                if all_integers {
                    Value::Int(v.round() as i64)
                } else {
                    Value::Float((v * 100.0).round() / 100.0)
                }
            })
            .collect()
    }
}

struct TemporalGenerator;

/// Timestamps land in the trailing seven days so "last 24 hours"-style demo
/// questions return rows.
const TEMPORAL_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

impl ValueGenerator for TemporalGenerator {
    fn generate(&self, ctx: &ColumnContext<'_>, rng: &mut XorShift64, rows: usize) -> Vec<Value> {
        (0..rows)
            .map(|_| {
                let offset = rng.gen_range_i64(0, TEMPORAL_WINDOW_SECS - 1);
                Value::Timestamp(ctx.now - Duration::seconds(offset))
            })
            .collect()
    }
}

struct FreeTextGenerator;

impl ValueGenerator for FreeTextGenerator {
    fn generate(&self, ctx: &ColumnContext<'_>, rng: &mut XorShift64, rows: usize) -> Vec<Value> {
        let templates = [
            "routine {col} update for {org} in the {industry} segment",
            "{org} flagged a {col} item worth a closer look",
            "summary of recent {col} activity across {org} accounts",
            "no anomalies in {col}; {industry} baseline holds",
        ];
        (0..rows)
            .map(|i| {
                let template = rng.pick(&templates);
                let text = template
                    .replace("{col}", &ctx.column.name.to_ascii_lowercase())
                    .replace("{org}", ctx.organization)
                    .replace("{industry}", ctx.industry);
                Value::Text(format!("{text} (#{})", i + 1))
            })
            .collect()
    }
}

// ============================================================================
// Table generation
// ============================================================================

/// Generate all tables with the built-in generator set.
pub fn generate(
    schema: &CanonicalSchema,
    keys: &KeyPlan,
    config: &RunConfig,
    organization: &str,
    now: DateTime<Utc>,
    seed: u64,
) -> Result<Vec<GeneratedTable>, GenerationError> {
    generate_with_registry(
        schema,
        keys,
        config,
        organization,
        now,
        seed,
        &GeneratorRegistry::builtin(),
    )
}

/// Generate all tables with a caller-supplied registry.
///
/// Dimension and unstructured tables are generated first, fact tables last;
/// within one run every foreign-key draw lands inside the precomputed
/// shared pool.
pub fn generate_with_registry(
    schema: &CanonicalSchema,
    keys: &KeyPlan,
    config: &RunConfig,
    organization: &str,
    now: DateTime<Utc>,
    seed: u64,
    registry: &GeneratorRegistry,
) -> Result<Vec<GeneratedTable>, GenerationError> {
    let mut rng = XorShift64::new(seed);
    let mut tables = Vec::with_capacity(schema.tables.len());

    let ordered = schema
        .tables
        .iter()
        .filter(|t| t.kind != TableKind::Fact)
        .chain(schema.tables.iter().filter(|t| t.kind == TableKind::Fact));

    for table in ordered {
        let rows = config.effective_rows(table);
        if !(MIN_TABLE_ROWS..=MAX_TABLE_ROWS).contains(&rows) {
            return Err(GenerationError::RowCountOutOfBounds {
                table: table.name.clone(),
                requested: rows,
            });
        }

        let generated = match table.kind {
            TableKind::Unstructured => {
                generate_chunk_table(table, config, organization, &schema.industry, &mut rng, rows)
            }
            _ => generate_structured_table(
                table,
                schema,
                keys,
                registry,
                organization,
                now,
                &mut rng,
                rows,
            )?,
        };

        tracing::debug!(table = %generated.name, rows = generated.row_count(), "generated table");
        tables.push(generated);
    }

    Ok(tables)
}

#[allow(clippy::too_many_arguments)]
fn generate_structured_table(
    table: &CanonicalTable,
    schema: &CanonicalSchema,
    keys: &KeyPlan,
    registry: &GeneratorRegistry,
    organization: &str,
    now: DateTime<Utc>,
    rng: &mut XorShift64,
    rows: usize,
) -> Result<GeneratedTable, GenerationError> {
    let mut columns: Vec<Vec<Value>> = Vec::with_capacity(table.columns.len());

    for column in &table.columns {
        let values = if column.semantic == SemanticType::ForeignKey {
            foreign_key_values(table, column, keys, rng, rows)?
        } else {
            let generator = registry.get(column.semantic).ok_or_else(|| {
                GenerationError::MissingGenerator {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    semantic: column.semantic,
                }
            })?;
            let ctx = ColumnContext {
                table,
                column,
                organization,
                industry: &schema.industry,
                now,
            };
            generator.generate(&ctx, rng, rows)
        };
        columns.push(values);
    }

    let rows_out: Vec<Vec<Value>> = (0..rows)
        .map(|i| columns.iter().map(|col| col[i].clone()).collect())
        .collect();

    Ok(GeneratedTable {
        name: table.name.clone(),
        kind: table.kind,
        columns: table.columns.iter().map(|c| c.name.clone()).collect(),
        rows: rows_out,
    })
}

fn foreign_key_values(
    table: &CanonicalTable,
    column: &CanonicalColumn,
    keys: &KeyPlan,
    rng: &mut XorShift64,
    rows: usize,
) -> Result<Vec<Value>, GenerationError> {
    let pool = keys
        .pool_for(&table.name, &column.name)
        .filter(|p| !p.shared.is_empty())
        .ok_or_else(|| GenerationError::UnresolvedKeyPool {
            fact: table.name.clone(),
            column: column.name.clone(),
        })?;

    // Deal every shared key once before uniform reuse: the realized
    // dimension-side overlap then equals the pool ratio exactly whenever the
    // fact row count covers the pool.
    let mut values: Vec<i64> = pool.shared.clone();
    if rows >= values.len() {
        while values.len() < rows {
            values.push(*rng.pick(&pool.shared));
        }
    } else {
        rng.shuffle(&mut values);
        values.truncate(rows);
    }
    rng.shuffle(&mut values);

    Ok(values.into_iter().map(Value::Int).collect())
}

/// Resolve the physical name of an unstructured table: always `_CHUNKS`
/// suffixed, without doubling an existing suffix.
pub fn chunk_table_name(declared: &str) -> String {
    if declared.to_ascii_uppercase().ends_with(CHUNKS_SUFFIX) {
        declared.to_string()
    } else {
        format!("{declared}{CHUNKS_SUFFIX}")
    }
}

fn generate_chunk_table(
    table: &CanonicalTable,
    config: &RunConfig,
    organization: &str,
    industry: &str,
    rng: &mut XorShift64,
    rows: usize,
) -> GeneratedTable {
    // Declared columns are advisory for unstructured tables; the search
    // service expects the fixed chunk layout. Free-text hints feed the
    // document-type vocabulary.
    let document_types: Vec<String> = table
        .columns
        .iter()
        .find(|c| c.semantic == SemanticType::FreeText && !c.sample_values.is_empty())
        .map(|c| c.sample_values.clone())
        .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPES.iter().map(|s| s.to_string()).collect());

    let topics = [
        "delivery delays",
        "pricing questions",
        "onboarding friction",
        "feature requests",
        "renewal discussions",
    ];

    let rows_out: Vec<Vec<Value>> = (0..rows)
        .map(|i| {
            let doc_type = rng.pick(&document_types).clone();
            let topic = *rng.pick(&topics);
            let source = *rng.pick(&SOURCE_SYSTEMS);
            let text = format!(
                "{doc_type} for {organization}: customers in the {industry} segment mention \
                 {topic}. Synthetic chunk {n}.",
                n = i + 1
            );
            vec![
                Value::Int(i as i64 + 1),
                Value::Text(format!("DOC_{:04}", 1 + i / 3)),
                Value::Text(text),
                Value::Text(doc_type),
                Value::Text(source.to_string()),
                Value::Text(config.language_code.clone()),
            ]
        })
        .collect();

    GeneratedTable {
        name: chunk_table_name(&table.name),
        kind: TableKind::Unstructured,
        columns: CHUNK_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: rows_out,
    }
}
