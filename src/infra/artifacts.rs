// ============================================================
// Layer 6 - Workspace Artifacts
// ============================================================
// One directory holds everything a dataset goes through:
//
//   workspace/
//     dataset.csv                 ← the uploaded table
//     train.csv  val.csv  test.csv
//     label_column.json           ← {"label_column": "..."}
//     column_data_types.json      ← {"col": "int64", ...}
//     processed_train.csv  processed_val.csv  processed_test.csv
//     processed_y_train.csv  processed_y_val.csv  processed_y_test.csv
//     processed_combined_y.csv
//     network_parameters.json     ← {"num_cols": .., "num_label_classes": ..}
//     model_config.json
//     train_config.json           ← settings of the last completed run
//     training_history.csv
//     model.mpk                   ← weights of the last completed run
//     .run.lock                   ← present while a run writes here
//
// JSON documents are read and written through serde_json. A
// document that is required but absent is a MissingInput error.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::PathBuf,
};

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::domain::dataset::{Partition, Partitions};
use crate::domain::error::{PipelineError, PipelineResult};

pub const DATASET_FILE: &str            = "dataset.csv";
pub const LABEL_COLUMN_FILE: &str       = "label_column.json";
pub const COLUMN_TYPES_FILE: &str       = "column_data_types.json";
pub const COMBINED_LABELS_FILE: &str    = "processed_combined_y.csv";
pub const NETWORK_PARAMETERS_FILE: &str = "network_parameters.json";
pub const MODEL_CONFIG_FILE: &str       = "model_config.json";
pub const TRAIN_CONFIG_FILE: &str       = "train_config.json";
pub const HISTORY_FILE: &str            = "training_history.csv";
pub const MODEL_WEIGHTS_STEM: &str      = "model";
const LOCK_FILE: &str                   = ".run.lock";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace directory, creating it if needed
    pub fn open(root: impl Into<PathBuf>) -> PipelineResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.path(DATASET_FILE)
    }

    /// train.csv / val.csv / test.csv
    pub fn raw_partition_path(&self, partition: Partition) -> PathBuf {
        self.path(&format!("{}.csv", partition.tag()))
    }

    pub fn raw_partition_paths(&self) -> Partitions<PathBuf> {
        Partitions::new(
            self.raw_partition_path(Partition::Train),
            self.raw_partition_path(Partition::Validation),
            self.raw_partition_path(Partition::Test),
        )
    }

    /// processed_{train,val,test}.csv, features only
    pub fn processed_features_path(&self, partition: Partition) -> PathBuf {
        self.path(&format!("processed_{}.csv", partition.tag()))
    }

    pub fn processed_features_paths(&self) -> Partitions<PathBuf> {
        Partitions::new(
            self.processed_features_path(Partition::Train),
            self.processed_features_path(Partition::Validation),
            self.processed_features_path(Partition::Test),
        )
    }

    /// processed_y_{train,val,test}.csv, one-hot labels
    pub fn processed_labels_path(&self, partition: Partition) -> PathBuf {
        self.path(&format!("processed_y_{}.csv", partition.tag()))
    }

    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> PipelineResult<T> {
        let path = self.path(name);
        let json = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PipelineError::MissingInput(format!("'{}' does not exist", path.display())),
            _ => PipelineError::Io(e),
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> PipelineResult<()> {
        let path = self.path(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    /// Claim the workspace for one writer. The lock is released on drop.
    pub fn lock(&self) -> PipelineResult<RunLock> {
        RunLock::acquire(self.path(LOCK_FILE))
    }
}

// ─── RunLock ──────────────────────────────────────────────────────────────────

/// Held for the lifetime of a processing or training run.
/// A second run on the same workspace gets RunInProgress.
#[derive(Debug)]
pub struct RunLock {
    path:   PathBuf,
    run_id: Uuid,
}

impl RunLock {
    fn acquire(path: PathBuf) -> PipelineResult<Self> {
        let run_id = Uuid::new_v4();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                write!(file, "{run_id}")?;
                tracing::debug!("Run {} holds '{}'", run_id, path.display());
                Ok(Self { path, run_id })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                Err(PipelineError::RunInProgress { holder: holder.trim().to_string() })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn run_id(&self) -> Uuid { self.run_id }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // only remove a lock file that still names this run
        let ours = fs::read_to_string(&self.path)
            .map(|s| s.trim() == self.run_id.to_string())
            .unwrap_or(false);
        if ours {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!("Could not release '{}': {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network_config::NetworkParameters;

    #[test]
    fn test_json_round_trip_and_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();

        let params = NetworkParameters { num_cols: 4, num_label_classes: 3 };
        ws.write_json(NETWORK_PARAMETERS_FILE, &params).unwrap();
        let back: NetworkParameters = ws.read_json(NETWORK_PARAMETERS_FILE).unwrap();
        assert_eq!(back, params);

        let missing: PipelineResult<NetworkParameters> = ws.read_json(MODEL_CONFIG_FILE);
        assert!(matches!(missing, Err(PipelineError::MissingInput(_))));
    }

    #[test]
    fn test_partition_paths() {
        let ws = Workspace::open(tempfile::tempdir().unwrap().path()).unwrap();
        assert!(ws.raw_partition_path(Partition::Validation).ends_with("val.csv"));
        assert!(ws.processed_features_path(Partition::Test).ends_with("processed_test.csv"));
        assert!(ws.processed_labels_path(Partition::Train).ends_with("processed_y_train.csv"));
    }

    #[test]
    fn test_second_lock_is_rejected_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();

        let first = ws.lock().unwrap();
        match ws.lock() {
            Err(PipelineError::RunInProgress { holder }) => assert_eq!(holder, first.run_id().to_string()),
            other => panic!("expected RunInProgress, got {other:?}"),
        }
        drop(first);
        assert!(ws.lock().is_ok());
    }
}
