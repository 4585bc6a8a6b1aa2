//! Records per-stage `in → out` counts, rejection histograms, and up to
//! 25 sample rejects per stage (spec.md §4.5). Write-only during a run;
//! snapshotted into the [`crate::types::RunResult`] at the end.

use crate::types::{RejectSample, StageRecord, StageTrace};

const MAX_SAMPLES_PER_STAGE: usize = 25;

#[derive(Default)]
pub struct StageTracer {
    trace: StageTrace,
}

impl StageTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, name: &str, in_count: usize) {
        self.trace.stages.push(StageRecord {
            name: name.to_string(),
            in_count,
            out_count: 0,
            rejections: Default::default(),
            samples: Vec::new(),
        });
    }

    /// Records a single rejection with a reason. Up to
    /// [`MAX_SAMPLES_PER_STAGE`] concrete samples are retained; beyond
    /// that only the histogram count grows.
    pub fn reject(&mut self, symbol: &str, reason: &str, details: Option<String>) {
        let record = self
            .trace
            .stages
            .last_mut()
            .expect("reject() called before enter()");
        *record.rejections.entry(reason.to_string()).or_insert(0) += 1;
        if record.samples.len() < MAX_SAMPLES_PER_STAGE {
            record.samples.push(RejectSample {
                symbol: symbol.to_string(),
                reason: reason.to_string(),
                details,
            });
        }
    }

    pub fn exit(&mut self, kept: usize) {
        let record = self
            .trace
            .stages
            .last_mut()
            .expect("exit() called before enter()");
        record.out_count = kept;
    }

    pub fn into_trace(self) -> StageTrace {
        self.trace
    }

    pub fn trace(&self) -> &StageTrace {
        &self.trace
    }
}
