//! Canonical schema model.
//!
//! The strict, tagged-variant form of a demo schema. Produced only by the
//! planner; every downstream component (key allocator, generator,
//! provisioner) consumes this model and never the raw spec.

use serde::{Deserialize, Serialize};

/// Lower bound on generated rows per table.
pub const MIN_TABLE_ROWS: usize = 20;
/// Upper bound on generated rows per table.
pub const MAX_TABLE_ROWS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Fact,
    Dimension,
    Unstructured,
}

impl TableKind {
    /// Normalize a loose oracle-provided kind string.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fact" | "facts" | "transaction" | "transactions" => Some(Self::Fact),
            "dimension" | "dim" | "lookup" | "reference" => Some(Self::Dimension),
            "unstructured" | "documents" | "text" | "chunks" => Some(Self::Unstructured),
            _ => None,
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fact => write!(f, "fact"),
            Self::Dimension => write!(f, "dimension"),
            Self::Unstructured => write!(f, "unstructured"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Identifier,
    Categorical,
    Numeric,
    Temporal,
    FreeText,
    ForeignKey,
}

impl SemanticType {
    /// Normalize a loose oracle-provided semantic type string.
    ///
    /// The synonym set covers the vocabulary drift we have seen in oracle
    /// output; anything outside it is a validation error, not a guess.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "identifier" | "id" | "key" | "primary_key" => Some(Self::Identifier),
            "categorical" | "category" | "string" | "varchar" | "enum" => Some(Self::Categorical),
            "numeric" | "number" | "int" | "integer" | "float" | "decimal" | "measure" => {
                Some(Self::Numeric)
            }
            "temporal" | "timestamp" | "datetime" | "date" | "time" => Some(Self::Temporal),
            "free_text" | "freetext" | "text" | "document" => Some(Self::FreeText),
            "foreign_key" | "foreignkey" | "fk" | "reference" | "ref" => Some(Self::ForeignKey),
            _ => None,
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identifier => write!(f, "identifier"),
            Self::Categorical => write!(f, "categorical"),
            Self::Numeric => write!(f, "numeric"),
            Self::Temporal => write!(f, "temporal"),
            Self::FreeText => write!(f, "free_text"),
            Self::ForeignKey => write!(f, "foreign_key"),
        }
    }
}

/// A resolved `table.column` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalColumn {
    pub name: String,
    pub semantic: SemanticType,
    pub sample_values: Vec<String>,
    /// Present iff `semantic == ForeignKey`; always resolved by the planner.
    pub reference: Option<ColumnRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTable {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<CanonicalColumn>,
    /// Explicit row-count override from the spec, already bounds-checked.
    pub row_count: Option<usize>,
}

impl CanonicalTable {
    /// The table's primary-key column, when it has one.
    ///
    /// Dimension tables always have exactly one (the planner enforces it);
    /// fact tables have at least one identifier and the first is primary.
    pub fn primary_key(&self) -> Option<&CanonicalColumn> {
        self.columns
            .iter()
            .find(|c| c.semantic == SemanticType::Identifier)
    }
}

/// One fact → dimension join relationship, derived from a foreign-key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub fact: String,
    pub fact_column: String,
    pub dimension: String,
    pub dimension_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalSchema {
    pub title: String,
    pub industry: String,
    pub tables: Vec<CanonicalTable>,
    /// All fact↔dimension relationships, in spec order.
    pub relationships: Vec<Relationship>,
    pub target_questions: Vec<String>,
}

impl CanonicalSchema {
    pub fn table(&self, name: &str) -> Option<&CanonicalTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn fact_tables(&self) -> impl Iterator<Item = &CanonicalTable> {
        self.tables.iter().filter(|t| t.kind == TableKind::Fact)
    }

    pub fn dimension_tables(&self) -> impl Iterator<Item = &CanonicalTable> {
        self.tables
            .iter()
            .filter(|t| t.kind == TableKind::Dimension)
    }

    /// The single unstructured table, if the spec declared one.
    pub fn unstructured_table(&self) -> Option<&CanonicalTable> {
        self.tables
            .iter()
            .find(|t| t.kind == TableKind::Unstructured)
    }

    /// Fact and dimension tables, i.e. everything the semantic view spans.
    pub fn structured_tables(&self) -> impl Iterator<Item = &CanonicalTable> {
        self.tables
            .iter()
            .filter(|t| t.kind != TableKind::Unstructured)
    }
}
