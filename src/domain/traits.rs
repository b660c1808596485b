// ============================================================
// Layer 3 - Core Traits
// ============================================================
// The seams between layers:
//   - Transform       → a fitted preprocessing step (imputer,
//                       categorical encoder, scaler)
//   - PartitionSource → anything that can hand over the three
//                       raw partitions (the artifact store on
//                       disk, an in-memory fixture in tests)
//   - ProgressSink    → the receiving end of training events

use polars::prelude::DataFrame;

use crate::domain::dataset::Partitions;
use crate::domain::error::PipelineResult;
use crate::domain::events::TrainingEvent;

/// A transformer whose parameters were already fit.
/// Applying it never changes those parameters.
pub trait Transform {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn transform(&self, df: &DataFrame) -> PipelineResult<DataFrame>;

    /// Apply the same fitted state to every partition
    fn transform_all(&self, partitions: &Partitions<DataFrame>) -> PipelineResult<Partitions<DataFrame>> {
        partitions.try_map(|_, df| self.transform(df))
    }
}

pub trait PartitionSource {
    fn load_partitions(&self) -> PipelineResult<Partitions<DataFrame>>;
}

pub trait ProgressSink {
    fn publish(&mut self, event: TrainingEvent);
}

/// Collecting sink, handy when the caller wants the events afterwards
impl ProgressSink for Vec<TrainingEvent> {
    fn publish(&mut self, event: TrainingEvent) {
        self.push(event);
    }
}
