//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Votes cast through reactions
//! - Input wizard sessions
//! - Mirror card operations
//! - Commands

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Rating Metrics
// =============================================================================

/// Reaction votes by action.
pub static VOTES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_votes_total", "Total reaction votes processed"),
        &["action"], // "up", "down", "cancel"
    )
    .unwrap()
});

/// Ratings removed by leaver cleanup.
pub static LEAVER_RATINGS_PRUNED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "curator_leaver_ratings_pruned_total",
        "Total ratings removed because their member left",
    )
    .unwrap()
});

// =============================================================================
// Wizard Metrics
// =============================================================================

/// Wizard sessions by flow and outcome.
pub static WIZARD_SESSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_wizard_sessions_total", "Total input wizard sessions"),
        &["flow", "outcome"], // outcome: "completed", "timeout", "malformed", "failed"
    )
    .unwrap()
});

// =============================================================================
// Mirror Metrics
// =============================================================================

/// Mirror operations by kind and status.
pub static MIRROR_OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "curator_mirror_operations_total",
            "Total mirror card operations",
        ),
        &["kind", "status"], // kind: "publish", "edit", "republish", "refresh", "retract"
    )
    .unwrap()
});

// =============================================================================
// Command Metrics
// =============================================================================

/// Commands by name and outcome.
pub static COMMANDS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_commands_total", "Total commands executed"),
        &["command", "outcome"], // outcome: "success", "denied", "aborted", "error"
    )
    .unwrap()
});

/// Command duration in seconds, including time spent waiting on wizard replies.
pub static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "curator_command_duration_seconds",
            "Duration of command execution",
        )
        .buckets(vec![0.05, 0.25, 1.0, 5.0, 15.0, 60.0, 180.0, 600.0]),
        &["command"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(VOTES.clone()),
        Box::new(LEAVER_RATINGS_PRUNED.clone()),
        Box::new(WIZARD_SESSIONS.clone()),
        Box::new(MIRROR_OPERATIONS.clone()),
        Box::new(COMMANDS.clone()),
        Box::new(COMMAND_DURATION.clone()),
    ]
}
