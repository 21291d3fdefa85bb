//! Record sinks receiving the evaluations selected by the triggers.

use serde::{Deserialize, Serialize};

use crate::ecdf::RunKey;
use crate::observation::Observation;
use crate::trigger::Firing;

/// Destination of recorded evaluations.
///
/// The core never buffers or writes records itself; a sink decides what to
/// keep and where it goes.
pub trait RecordSink {
    /// A new run starts. Called before its first record.
    fn start_run(&mut self, _key: RunKey) {}

    /// An evaluation for which at least one trigger fired.
    fn record(&mut self, key: RunKey, observation: &Observation, firing: &Firing);
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn start_run(&mut self, key: RunKey) {
        (**self).start_run(key);
    }

    fn record(&mut self, key: RunKey, observation: &Observation, firing: &Firing) {
        (**self).record(key, observation, firing);
    }
}

/// One recorded evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Run the evaluation belongs to
    pub key: RunKey,
    /// The evaluation
    pub observation: Observation,
    /// Which policies selected it
    pub firing: Firing,
}

/// Sink keeping every record in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    runs: Vec<RunKey>,
    records: Vec<Record>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs started so far, in order.
    pub fn runs(&self) -> &[RunKey] {
        &self.runs
    }

    /// Records received so far, in order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records of one run.
    pub fn records_of(&self, key: RunKey) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |record| record.key == key)
    }

    /// Take the records out of the sink.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl RecordSink for MemorySink {
    fn start_run(&mut self, key: RunKey) {
        self.runs.push(key);
    }

    fn record(&mut self, key: RunKey, observation: &Observation, firing: &Firing) {
        self.records.push(Record {
            key,
            observation: *observation,
            firing: *firing,
        });
    }
}
