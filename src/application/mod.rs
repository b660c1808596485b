// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Each use case reads its inputs from a Workspace, drives the
// data / ml layers, and writes its artifacts back.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No printing here (that's Layer 1)
//   - File formats belong to Layer 4 and 6
//   - Workflow coordination and error context only
//
// Typical order of a session:
//   prepare (split, select-label) → process → save-model → train
//   compare can run any time after process

// Split, label selection, column dropping, profiling, model config
pub mod prepare_use_case;

// The preprocessing run
pub mod process_use_case;

// The training workflow
pub mod train_use_case;

// Before/after data-quality report
pub mod compare_use_case;
