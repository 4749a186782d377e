// Pipeline processing: column matching, field coercion, aggregation and root causes

pub mod aggregate;
pub mod coercion;
pub mod normalize;
pub mod root_cause;

pub use coercion::ClaimTable;
pub use normalize::{ColumnMapping, ColumnMatch, ColumnNormalizer};
