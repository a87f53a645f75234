//! Demoforge demo-spec model and Schema Planner
//!
//! This crate defines the two schema surfaces of a demo run:
//!
//! - the **raw demo spec** (`spec` module): the loosely structured,
//!   string-typed table/column description produced by the external content
//!   oracle. It is untrusted input and is never consumed downstream as-is.
//! - the **canonical schema** (`canonical` module): the strict tagged-variant
//!   model every other component operates on.
//!
//! The planner (`planner` module) is the only path from one to the other:
//! it validates and normalizes a `DemoSpec` into a `CanonicalSchema`, or
//! fails with a `SpecValidationError` naming the offending table/column.
//! No partial schema is ever handed downstream.

pub mod canonical;
pub mod planner;
pub mod spec;

pub use canonical::{
    CanonicalColumn, CanonicalSchema, CanonicalTable, ColumnRef, Relationship, SemanticType,
    TableKind, MAX_TABLE_ROWS, MIN_TABLE_ROWS,
};
pub use planner::{plan, SpecValidationError};
pub use spec::{ColumnSpec, DemoSpec, TableSpec};
