// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types shared by every other layer: partitioned
// polars frames, the column schema, processing options, the
// network description, training events and the run lifecycle.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Only structs, enums, traits, small frame helpers and the error type

pub mod dataset;
pub mod error;
pub mod events;
pub mod network_config;
pub mod options;
pub mod run;
pub mod schema;
pub mod traits;
