//! Result types produced by batch ingestion.

use crate::error::ItemError;
use serde::{Deserialize, Serialize};

/// What happened to one batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// 1-based position in the batch.
    pub index: usize,
    /// Product name the item was (or would have been) created with.
    pub name: String,
    /// Final price after the boost policy.
    pub price: f64,
    /// Hosted image URL, once the upload succeeded.
    pub image_url: Option<String>,
    /// Id of the created catalog record.
    pub product_id: Option<String>,
    pub error: Option<ItemError>,
}

impl ItemOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.product_id.is_some()
    }
}

/// Aggregate result of a bulk-image or document batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One entry per submitted item, in submission order.
    pub items: Vec<ItemOutcome>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn success_count(&self) -> usize {
        self.items.iter().filter(|i| i.succeeded()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.total() - self.success_count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Items that failed, in batch order.
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|i| !i.succeeded())
    }

    /// Hosted assets that ended up without a catalog record.
    pub fn orphaned_assets(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|i| i.error.as_ref().and_then(ItemError::orphaned_url))
            .collect()
    }

    /// The batch's terminal state.
    pub fn final_state(&self) -> BatchState {
        if self.is_complete_success() {
            BatchState::Completed {
                total: self.total(),
            }
        } else {
            BatchState::Failed {
                succeeded: self.success_count(),
                failed: self.failure_count(),
            }
        }
    }
}

/// Lifecycle of the orchestrator's current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatchState {
    #[default]
    Idle,
    Validating,
    Processing {
        done: usize,
        total: usize,
    },
    Completed {
        total: usize,
    },
    /// At least one item failed; the others may have been created.
    Failed {
        succeeded: usize,
        failed: usize,
    },
}

impl BatchState {
    pub fn is_busy(&self) -> bool {
        matches!(self, BatchState::Validating | BatchState::Processing { .. })
    }
}
