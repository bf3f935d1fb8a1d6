use std::collections::BTreeMap;

use toasttalk_traits::ToolCallRecord;

use crate::llm::ToolCallDelta;

/// What a delta did to the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// A new record was opened; carries a snapshot of it.
    Opened(ToolCallRecord),
    /// Arguments were appended to an existing record (or nothing to append).
    Appended,
    /// The delta referenced an index with no open record.
    Ignored,
}

/// Reassembles streamed tool-call fragments into complete records, keyed by
/// the positional index the provider assigns each call.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    records: BTreeMap<usize, ToolCallRecord>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn apply(&mut self, delta: &ToolCallDelta) -> DeltaOutcome {
        let mut outcome = DeltaOutcome::Appended;

        if let (Some(id), Some(name)) = (&delta.id, &delta.name) {
            let same_call = self
                .records
                .get(&delta.index)
                .is_some_and(|existing| existing.id == *id);

            // Some servers repeat id and name on every fragment of a call.
            if !same_call {
                let record = ToolCallRecord::new(id.clone(), name.clone(), String::new());
                if let Some(stale) = self.records.insert(delta.index, record.clone()) {
                    tracing::warn!(
                        category = "stream",
                        index = delta.index,
                        stale_id = %stale.id,
                        new_id = %id,
                        "Replacing unfinished tool call at the same index"
                    );
                }
                outcome = DeltaOutcome::Opened(record);
            }
        }

        let Some(record) = self.records.get_mut(&delta.index) else {
            tracing::warn!(
                category = "stream",
                index = delta.index,
                "Ignoring tool call delta with no open call"
            );
            return DeltaOutcome::Ignored;
        };

        if let Some(fragment) = &delta.arguments {
            record.arguments.push_str(fragment);
        }

        outcome
    }

    /// Hand out every open record in index order and reset.
    pub fn finalize(&mut self) -> Vec<ToolCallRecord> {
        std::mem::take(&mut self.records).into_values().collect()
    }
}
