// ============================================================
// Layer 6 - Training History Log
// ============================================================
// Appends one CSV row per epoch to training_history.csv so the
// learning curves of every run can be plotted later.
//
//   epoch,train_loss,val_loss,accuracy,precision,recall,learning_rate
//   1,0.693100,0.688400,0.540000,0.531000,0.529000,0.001
//   2,0.651200,0.649900,0.610000,0.604000,0.600000,0.001
//
// The header is written only when the file is new; later runs
// append below the earlier ones.

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineResult;
use crate::domain::run::EpochRecord;

/// One row of the history file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub epoch:         usize,
    pub train_loss:    f64,
    pub val_loss:      f64,
    pub accuracy:      f64,
    pub precision:     f64,
    pub recall:        f64,
    pub learning_rate: f64,
}

impl From<&EpochRecord> for HistoryRow {
    fn from(r: &EpochRecord) -> Self {
        Self {
            epoch:         r.epoch,
            train_loss:    r.train_loss,
            val_loss:      r.validation.loss,
            accuracy:      r.validation.accuracy,
            precision:     r.validation.precision,
            recall:        r.validation.recall,
            learning_rate: r.learning_rate,
        }
    }
}

pub struct HistoryLogger {
    csv_path: PathBuf,
}

impl HistoryLogger {
    pub fn new(csv_path: impl Into<PathBuf>) -> PipelineResult<Self> {
        let csv_path = csv_path.into();
        if let Some(dir) = csv_path.parent() {
            fs::create_dir_all(dir)?;
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, record: &EpochRecord) -> PipelineResult<()> {
        let is_new = !self.csv_path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&self.csv_path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
        writer.serialize(HistoryRow::from(record))?;
        writer.flush()?;

        tracing::debug!(
            "Logged epoch {}: train_loss={:.4}, val_loss={:.4}",
            record.epoch,
            record.train_loss,
            record.validation.loss
        );
        Ok(())
    }

    #[cfg(test)]
    pub fn csv_path(&self) -> &std::path::Path {
        &self.csv_path
    }

    #[cfg(test)]
    pub fn read_all(&self) -> PipelineResult<Vec<HistoryRow>> {
        let mut reader = csv::Reader::from_path(&self.csv_path)?;
        Ok(reader.deserialize().collect::<Result<Vec<HistoryRow>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::EvaluationReport;

    fn record(epoch: usize) -> EpochRecord {
        EpochRecord {
            epoch,
            train_loss: 0.5 / epoch as f64,
            learning_rate: 1e-3,
            validation: EvaluationReport { loss: 0.6, accuracy: 0.7, precision: 0.65, recall: 0.6, ..Default::default() },
        }
    }

    #[test]
    fn test_header_once_then_rows_append() {
        let dir = tempfile::tempdir().unwrap();
        let logger = HistoryLogger::new(dir.path().join("training_history.csv")).unwrap();
        logger.log(&record(1)).unwrap();
        logger.log(&record(2)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().next().unwrap(), "epoch,train_loss,val_loss,accuracy,precision,recall,learning_rate");
        assert_eq!(text.lines().filter(|l| l.starts_with("epoch")).count(), 1);

        let rows = logger.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].epoch, 2);
        assert!((rows[1].train_loss - 0.25).abs() < 1e-12);
        assert_eq!(rows[0].accuracy, 0.7);
    }
}
