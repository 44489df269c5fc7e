//! Conversion engine.
//!
//! - `dsl`: value transforms (`Trim`, `Zip5`, `Concat(...)`)
//! - `resolver`: profile mappings to resolved groups with effective metadata
//! - `processor`: one input row against every group
//! - `builder`: output rows per object type, property deduplication
//! - `columns`: output column order
//! - `pipeline`: the whole run

pub mod builder;
pub mod columns;
pub mod dsl;
pub mod pipeline;
pub mod processor;
pub mod resolver;

pub use builder::{build, merge_labels, OutputBuilder, OutputRows};
pub use columns::plan;
pub use pipeline::{process, process_cancellable, ProcessOptions, ProcessResult, RunHandle, RunOutcome};
pub use processor::{process_row, GroupCount, GroupCounters, ProcessedGroup, ProcessedRow};
pub use resolver::{resolve, ResolvedGroup, ResolvedGroups};
