// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from raw CSV partitions to Burn tensor batches.
//
//   dataset.csv
//       │  splitter        → train / val / test
//       ▼
//   train.csv  val.csv  test.csv
//       │  loader          → typed Datasets
//       ▼
//   reconciler             → cross-partition duplicates removed
//       ▼
//   imputer                → mode fill (fit on train)
//       ▼
//   label pop ─────────────────────────┐
//       ▼                              ▼
//   categorical (pooled fit)       label_encoder (pooled fit)
//   scaler      (train fit)            │
//       ▼                              ▼
//   processed_*.csv               processed_y_*.csv
//       │
//       ▼
//   dataset (Burn Dataset) → batcher (Burn Batcher)
//
// profile answers the read-only questions (dtypes, summary,
// value counts, before/after comparison).

/// CSV read/write and the on-disk partition source
pub mod loader;

/// Seeded train/validation/test split
pub mod splitter;

/// Cross-partition duplicate removal
pub mod reconciler;

/// Most-frequent-value imputation
pub mod imputer;

/// Pooled integer coding of categorical features
pub mod categorical;

/// Standardization / min-max normalization
pub mod scaler;

/// Pooled label indexing and one-hot encoding
pub mod label_encoder;

/// Dtype inference, summaries, value counts, quality snapshots
pub mod profile;

/// Burn Dataset over processed partitions
pub mod dataset;

/// Burn Batcher producing tensor batches
pub mod batcher;
