// Pipeline ingestion: raw bytes to a header-aligned table

pub mod loader;

pub use loader::{Loader, RawTable};
