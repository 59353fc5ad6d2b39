pub mod duckdb;
pub mod memory;
pub mod traits;

pub use self::duckdb::DuckDbArchive;
pub use memory::{MemorySource, SeriesData};
pub use traits::{HourlyAggregate, SampleRow, SampleSource, SourceError};
