//! Schema Planner: validate and normalize a raw `DemoSpec`.
//!
//! The planner is side-effect free and all-or-nothing: either the whole
//! spec normalizes into a `CanonicalSchema`, or it fails with a
//! `SpecValidationError` naming the offending table/column. Downstream
//! components never see a half-validated schema.

use crate::canonical::{
    CanonicalColumn, CanonicalSchema, CanonicalTable, ColumnRef, Relationship, SemanticType,
    TableKind, MAX_TABLE_ROWS, MIN_TABLE_ROWS,
};
use crate::spec::DemoSpec;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecValidationError {
    #[error("spec declares no tables")]
    Empty,

    #[error("duplicate table name `{table}`")]
    DuplicateTable { table: String },

    #[error("table `{table}`: unrecognized kind `{kind}`")]
    UnknownTableKind { table: String, kind: String },

    #[error("spec declares no fact table")]
    NoFactTable,

    #[error("spec declares more than one unstructured table (`{first}` and `{second}`)")]
    MultipleUnstructuredTables { first: String, second: String },

    #[error("table `{table}` declares no columns")]
    NoColumns { table: String },

    #[error("table `{table}`, column `{column}`: unrecognized semantic type `{semantic_type}`")]
    UnknownSemanticType {
        table: String,
        column: String,
        semantic_type: String,
    },

    #[error("table `{table}`, column `{column}`: foreign key without a reference target")]
    MissingReference { table: String, column: String },

    #[error(
        "table `{table}`, column `{column}`: reference target `{target_table}.{target_column}` \
         does not resolve to a dimension identifier column"
    )]
    UnresolvedReference {
        table: String,
        column: String,
        target_table: String,
        target_column: String,
    },

    #[error("table `{table}`: {kind} tables may not declare foreign keys (column `{column}`)")]
    ForeignKeyNotAllowed {
        table: String,
        kind: TableKind,
        column: String,
    },

    #[error("fact table `{table}` has no identifier column")]
    FactWithoutIdentifier { table: String },

    #[error("dimension table `{table}` must have exactly one identifier column, found {found}")]
    DimensionIdentifierCount { table: String, found: usize },

    #[error("unstructured table `{table}` has no free-text column")]
    UnstructuredWithoutText { table: String },

    #[error("table `{table}`: row count {requested} outside [20, 10000]")]
    RowCountOutOfBounds { table: String, requested: usize },
}

/// Validate a raw demo spec into the canonical schema model.
pub fn plan(spec: &DemoSpec) -> Result<CanonicalSchema, SpecValidationError> {
    if spec.tables.is_empty() {
        return Err(SpecValidationError::Empty);
    }

    // Table names become SQL identifiers, so uniqueness is case-insensitive.
    let mut seen: Vec<String> = Vec::new();
    for table in &spec.tables {
        let upper = table.name.to_ascii_uppercase();
        if seen.contains(&upper) {
            return Err(SpecValidationError::DuplicateTable {
                table: table.name.clone(),
            });
        }
        seen.push(upper);
    }

    let mut tables: Vec<CanonicalTable> = Vec::with_capacity(spec.tables.len());
    for table in &spec.tables {
        let kind = TableKind::parse(&table.kind).ok_or_else(|| {
            SpecValidationError::UnknownTableKind {
                table: table.name.clone(),
                kind: table.kind.clone(),
            }
        })?;

        if table.columns.is_empty() {
            return Err(SpecValidationError::NoColumns {
                table: table.name.clone(),
            });
        }

        if let Some(requested) = table.row_count {
            if !(MIN_TABLE_ROWS..=MAX_TABLE_ROWS).contains(&requested) {
                return Err(SpecValidationError::RowCountOutOfBounds {
                    table: table.name.clone(),
                    requested,
                });
            }
        }

        let mut columns = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let semantic = SemanticType::parse(&column.semantic_type).ok_or_else(|| {
                SpecValidationError::UnknownSemanticType {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    semantic_type: column.semantic_type.clone(),
                }
            })?;

            let reference = match (semantic, &column.references) {
                (SemanticType::ForeignKey, Some(r)) => Some(ColumnRef {
                    table: r.table.clone(),
                    column: r.column.clone(),
                }),
                (SemanticType::ForeignKey, None) => {
                    return Err(SpecValidationError::MissingReference {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
                // A stray `references` on a non-FK column is oracle noise;
                // drop it rather than fail the whole spec.
                _ => None,
            };

            columns.push(CanonicalColumn {
                name: column.name.clone(),
                semantic,
                sample_values: column.sample_values.clone(),
                reference,
            });
        }

        tables.push(CanonicalTable {
            name: table.name.clone(),
            kind,
            columns,
            row_count: table.row_count,
        });
    }

    check_table_mix(&tables)?;
    check_per_kind_shape(&tables)?;
    let relationships = resolve_relationships(&tables)?;

    tracing::debug!(
        tables = tables.len(),
        relationships = relationships.len(),
        "demo spec validated"
    );

    Ok(CanonicalSchema {
        title: spec.title.clone(),
        industry: spec.industry.clone(),
        tables,
        relationships,
        target_questions: spec.target_questions.clone(),
    })
}

fn check_table_mix(tables: &[CanonicalTable]) -> Result<(), SpecValidationError> {
    if !tables.iter().any(|t| t.kind == TableKind::Fact) {
        return Err(SpecValidationError::NoFactTable);
    }

    let unstructured: Vec<&CanonicalTable> = tables
        .iter()
        .filter(|t| t.kind == TableKind::Unstructured)
        .collect();
    if unstructured.len() > 1 {
        return Err(SpecValidationError::MultipleUnstructuredTables {
            first: unstructured[0].name.clone(),
            second: unstructured[1].name.clone(),
        });
    }
    Ok(())
}

fn check_per_kind_shape(tables: &[CanonicalTable]) -> Result<(), SpecValidationError> {
    for table in tables {
        let identifiers = table
            .columns
            .iter()
            .filter(|c| c.semantic == SemanticType::Identifier)
            .count();

        match table.kind {
            TableKind::Fact => {
                if identifiers == 0 {
                    return Err(SpecValidationError::FactWithoutIdentifier {
                        table: table.name.clone(),
                    });
                }
            }
            TableKind::Dimension => {
                if identifiers != 1 {
                    return Err(SpecValidationError::DimensionIdentifierCount {
                        table: table.name.clone(),
                        found: identifiers,
                    });
                }
                if let Some(fk) = table
                    .columns
                    .iter()
                    .find(|c| c.semantic == SemanticType::ForeignKey)
                {
                    return Err(SpecValidationError::ForeignKeyNotAllowed {
                        table: table.name.clone(),
                        kind: table.kind,
                        column: fk.name.clone(),
                    });
                }
            }
            TableKind::Unstructured => {
                if !table
                    .columns
                    .iter()
                    .any(|c| c.semantic == SemanticType::FreeText)
                {
                    return Err(SpecValidationError::UnstructuredWithoutText {
                        table: table.name.clone(),
                    });
                }
                if let Some(fk) = table
                    .columns
                    .iter()
                    .find(|c| c.semantic == SemanticType::ForeignKey)
                {
                    return Err(SpecValidationError::ForeignKeyNotAllowed {
                        table: table.name.clone(),
                        kind: table.kind,
                        column: fk.name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn resolve_relationships(
    tables: &[CanonicalTable],
) -> Result<Vec<Relationship>, SpecValidationError> {
    let mut relationships = Vec::new();

    for table in tables.iter().filter(|t| t.kind == TableKind::Fact) {
        for column in table
            .columns
            .iter()
            .filter(|c| c.semantic == SemanticType::ForeignKey)
        {
            // FK columns always carry a reference by the time they land in
            // the canonical model; a bare one cannot resolve.
            let Some(reference) = column.reference.as_ref() else {
                return Err(SpecValidationError::MissingReference {
                    table: table.name.clone(),
                    column: column.name.clone(),
                });
            };

            let target_ok = tables.iter().any(|t| {
                t.kind == TableKind::Dimension
                    && t.name == reference.table
                    && t.columns
                        .iter()
                        .any(|c| c.name == reference.column && c.semantic == SemanticType::Identifier)
            });
            if !target_ok {
                return Err(SpecValidationError::UnresolvedReference {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    target_table: reference.table.clone(),
                    target_column: reference.column.clone(),
                });
            }

            relationships.push(Relationship {
                fact: table.name.clone(),
                fact_column: column.name.clone(),
                dimension: reference.table.clone(),
                dimension_column: reference.column.clone(),
            });
        }
    }

    Ok(relationships)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ColumnSpec, ReferenceSpec, TableSpec};

    fn column(name: &str, semantic: &str) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            semantic_type: semantic.to_string(),
            sample_values: vec![],
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

    fn orders_customers_spec() -> DemoSpec {
        DemoSpec {
            title: "Retail demo".to_string(),
            description: "Orders and customers".to_string(),
            industry: "retail".to_string(),
            tables: vec![
                TableSpec {
                    name: "ORDERS".to_string(),
                    kind: "fact".to_string(),
                    columns: vec![
                        column("ORDER_ID", "identifier"),
                        fk_column("CUSTOMER_ID", "CUSTOMERS", "CUSTOMER_ID"),
                        column("ORDER_TOTAL", "numeric"),
                        column("ORDER_TS", "temporal"),
                    ],
                    row_count: None,
                },
                TableSpec {
                    name: "CUSTOMERS".to_string(),
                    kind: "dimension".to_string(),
                    columns: vec![
                        column("CUSTOMER_ID", "identifier"),
                        column("SEGMENT", "categorical"),
                    ],
                    row_count: None,
                },
            ],
            target_questions: vec![],
        }
    }

    #[test]
    fn plans_a_valid_spec() {
        let schema = plan(&orders_customers_spec()).expect("valid spec");
        assert_eq!(schema.tables.len(), 2);
        assert_eq!(schema.relationships.len(), 1);
        assert_eq!(schema.relationships[0].fact, "ORDERS");
        assert_eq!(schema.relationships[0].dimension, "CUSTOMERS");
    }

    #[test]
    fn normalizes_loose_vocabulary() {
        let mut spec = orders_customers_spec();
        spec.tables[0].kind = "Transactions".to_string();
        spec.tables[0].columns[2].semantic_type = "Number".to_string();
        spec.tables[1].kind = "dim".to_string();

        let schema = plan(&spec).expect("synonyms normalize");
        assert_eq!(schema.tables[0].kind, TableKind::Fact);
        assert_eq!(schema.tables[0].columns[2].semantic, SemanticType::Numeric);
    }

    #[test]
    fn rejects_duplicate_table_names_case_insensitively() {
        let mut spec = orders_customers_spec();
        spec.tables[1].name = "orders".to_string();
        assert!(matches!(
            plan(&spec),
            Err(SpecValidationError::DuplicateTable { table }) if table == "orders"
        ));
    }

    #[test]
    fn rejects_spec_without_fact_table() {
        let mut spec = orders_customers_spec();
        spec.tables.remove(0);
        assert!(matches!(plan(&spec), Err(SpecValidationError::NoFactTable)));
    }

    #[test]
    fn rejects_unknown_semantic_type_naming_the_column() {
        let mut spec = orders_customers_spec();
        spec.tables[0].columns[2].semantic_type = "vibes".to_string();
        match plan(&spec) {
            Err(SpecValidationError::UnknownSemanticType { table, column, .. }) => {
                assert_eq!(table, "ORDERS");
                assert_eq!(column, "ORDER_TOTAL");
            }
            other => panic!("expected UnknownSemanticType, got {other:?}"),
        }
    }

    #[test]
    fn rejects_dangling_foreign_key() {
        let mut spec = orders_customers_spec();
        spec.tables[0].columns[1] = fk_column("CUSTOMER_ID", "CUSTOMERS", "NO_SUCH_COLUMN");
        assert!(matches!(
            plan(&spec),
            Err(SpecValidationError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn rejects_foreign_key_into_a_fact_table() {
        let mut spec = orders_customers_spec();
        // Re-point the FK at the fact table itself; fact tables are not
        // valid reference targets even when the column name matches.
        spec.tables[0].columns[1] = fk_column("SELF_ID", "ORDERS", "ORDER_ID");
        assert!(matches!(
            plan(&spec),
            Err(SpecValidationError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn rejects_row_count_outside_bounds() {
        let mut spec = orders_customers_spec();
        spec.tables[0].row_count = Some(12);
        assert!(matches!(
            plan(&spec),
            Err(SpecValidationError::RowCountOutOfBounds { requested: 12, .. })
        ));

        spec.tables[0].row_count = Some(20_000);
        assert!(matches!(
            plan(&spec),
            Err(SpecValidationError::RowCountOutOfBounds { .. })
        ));
    }

    #[test]
    fn rejects_second_unstructured_table() {
        let mut spec = orders_customers_spec();
        for name in ["NOTES", "TICKETS"] {
            spec.tables.push(TableSpec {
                name: name.to_string(),
                kind: "unstructured".to_string(),
                columns: vec![column("BODY", "free_text")],
                row_count: None,
            });
        }
        assert!(matches!(
            plan(&spec),
            Err(SpecValidationError::MultipleUnstructuredTables { .. })
        ));
    }

    #[test]
    fn rejects_dimension_with_two_identifiers() {
        let mut spec = orders_customers_spec();
        spec.tables[1]
            .columns
            .push(column("ALT_ID", "identifier"));
        assert!(matches!(
            plan(&spec),
            Err(SpecValidationError::DimensionIdentifierCount { found: 2, .. })
        ));
    }
}
