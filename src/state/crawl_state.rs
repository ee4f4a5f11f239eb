//! Controller and phase state definitions
//!
//! `CrawlState` is the in-process state machine of a run; `Phase` is the
//! coarser value persisted in checkpoints to say where a resume re-enters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of the crawl controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    // ===== Initial State =====
    /// Constructed, nothing started
    Idle,

    // ===== Active States =====
    /// Scanning listing batches and paginating
    CollectingIds,

    /// Visiting collected listings one at a time
    ExtractingDetails,

    // ===== Terminal States =====
    /// The run finished its phases
    Complete,

    /// The driver session could not be constructed
    Failed,
}

impl CrawlState {
    /// Returns true if no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Returns true while a phase is running
    pub fn is_active(&self) -> bool {
        matches!(self, Self::CollectingIds | Self::ExtractingDetails)
    }

    /// Checks whether the controller may move from this state to `next`
    ///
    /// Phases only move forward. Any non-terminal state may fail.
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        match (self, next) {
            (current, Self::Failed) => !current.is_terminal(),
            (Self::Idle, Self::CollectingIds | Self::ExtractingDetails | Self::Complete) => true,
            (Self::CollectingIds, Self::ExtractingDetails | Self::Complete) => true,
            (Self::ExtractingDetails, Self::Complete) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CollectingIds => "collecting_ids",
            Self::ExtractingDetails => "extracting_details",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Phase recorded in a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[serde(alias = "collecting_ids", alias = "id-collection")]
    IdCollection,

    #[serde(alias = "extracting_details", alias = "detail-extraction")]
    DetailExtraction,

    #[serde(alias = "completed")]
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdCollection => "id_collection",
            Self::DetailExtraction => "detail_extraction",
            Self::Complete => "complete",
        }
    }

    /// Controller state a resume re-enters for this phase
    pub fn resume_state(&self) -> CrawlState {
        match self {
            Self::IdCollection => CrawlState::CollectingIds,
            Self::DetailExtraction => CrawlState::ExtractingDetails,
            Self::Complete => CrawlState::Complete,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
