//! Slideshow lifecycle state machine and startup-resume classification.
//!
//! Status ids are intentionally duplicated from the `db` crate's
//! `SlideshowStatus` enum because `core` has zero internal deps. The
//! persisted status field is the cross-process source of truth for
//! "is a render in progress"; the in-memory queue state is not
//! persisted, which is why interrupted statuses must be recognizable
//! here at startup.

// ---------------------------------------------------------------------------
// Status ids
// ---------------------------------------------------------------------------

/// Status IDs matching `slideshow_statuses` seed data (1-based).
pub const STATUS_DRAFT: i16 = 1;
pub const STATUS_QUEUED: i16 = 2;
pub const STATUS_RENDERING: i16 = 3;
pub const STATUS_COMPLETED: i16 = 4;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Returns the set of valid target status IDs reachable from
/// `from_status`.
///
/// Once a render is admitted the queue/executor own all transitions;
/// `draft` is the only state the editor writes to. A failed render
/// rolls back to `draft` so the slideshow is never stuck.
pub fn valid_transitions(from_status: i16) -> &'static [i16] {
    match from_status {
        // Draft -> Queued (render admitted)
        STATUS_DRAFT => &[STATUS_QUEUED],
        // Queued -> Rendering (dequeued), Draft (rollback),
        // Queued (re-admission by the startup resume scan)
        STATUS_QUEUED => &[STATUS_RENDERING, STATUS_DRAFT, STATUS_QUEUED],
        // Rendering -> Completed, Draft (rollback),
        // Queued (re-admission by the startup resume scan)
        STATUS_RENDERING => &[STATUS_COMPLETED, STATUS_DRAFT, STATUS_QUEUED],
        // Completed -> Queued (re-render)
        STATUS_COMPLETED => &[STATUS_QUEUED],
        // Unknown status: no transitions allowed
        _ => &[],
    }
}

/// Check whether a transition from `from` to `to` is valid.
pub fn can_transition(from: i16, to: i16) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate a state transition, returning an error message for invalid
/// ones.
pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(format!(
            "Invalid transition: {} ({from}) -> {} ({to})",
            status_name(from),
            status_name(to)
        ))
    }
}

/// Human-readable name for a status ID (for error messages).
pub fn status_name(id: i16) -> &'static str {
    match id {
        STATUS_DRAFT => "Draft",
        STATUS_QUEUED => "Queued",
        STATUS_RENDERING => "Rendering",
        STATUS_COMPLETED => "Completed",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Startup-resume classification
// ---------------------------------------------------------------------------

/// What the startup resume scan should do with a slideshow found in a
/// given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    /// Interrupted mid-render: partial output objects cannot be
    /// trusted. Delete them, reset the path list, then re-admit.
    PurgeAndRequeue,
    /// Admitted but never dequeued: nothing was written. Re-admit
    /// directly.
    Requeue,
    /// Not interrupted; leave alone.
    Ignore,
}

/// Classify a persisted status for the startup resume protocol.
pub fn resume_action(status_id: i16) -> ResumeAction {
    match status_id {
        STATUS_RENDERING => ResumeAction::PurgeAndRequeue,
        STATUS_QUEUED => ResumeAction::Requeue,
        _ => ResumeAction::Ignore,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- transitions --------------------------------------------------------

    #[test]
    fn draft_to_queued() {
        assert!(can_transition(STATUS_DRAFT, STATUS_QUEUED));
    }

    #[test]
    fn queued_to_rendering() {
        assert!(can_transition(STATUS_QUEUED, STATUS_RENDERING));
    }

    #[test]
    fn queued_rolls_back_to_draft() {
        assert!(can_transition(STATUS_QUEUED, STATUS_DRAFT));
    }

    #[test]
    fn rendering_to_completed() {
        assert!(can_transition(STATUS_RENDERING, STATUS_COMPLETED));
    }

    #[test]
    fn rendering_rolls_back_to_draft() {
        assert!(can_transition(STATUS_RENDERING, STATUS_DRAFT));
    }

    #[test]
    fn completed_can_requeue() {
        assert!(can_transition(STATUS_COMPLETED, STATUS_QUEUED));
    }

    #[test]
    fn interrupted_statuses_can_requeue() {
        assert!(can_transition(STATUS_QUEUED, STATUS_QUEUED));
        assert!(can_transition(STATUS_RENDERING, STATUS_QUEUED));
    }

    #[test]
    fn draft_cannot_jump_to_rendering() {
        assert!(!can_transition(STATUS_DRAFT, STATUS_RENDERING));
    }

    #[test]
    fn completed_cannot_return_to_draft_directly() {
        assert!(!can_transition(STATUS_COMPLETED, STATUS_DRAFT));
    }

    #[test]
    fn unknown_status_has_no_transitions() {
        assert!(valid_transitions(99).is_empty());
    }

    #[test]
    fn validate_reports_names() {
        let err = validate_transition(STATUS_DRAFT, STATUS_COMPLETED).unwrap_err();
        assert!(err.contains("Draft"));
        assert!(err.contains("Completed"));
    }

    // -- resume classification ----------------------------------------------

    #[test]
    fn rendering_purges_and_requeues() {
        assert_eq!(resume_action(STATUS_RENDERING), ResumeAction::PurgeAndRequeue);
    }

    #[test]
    fn queued_requeues_without_purge() {
        assert_eq!(resume_action(STATUS_QUEUED), ResumeAction::Requeue);
    }

    #[test]
    fn draft_and_completed_are_ignored() {
        assert_eq!(resume_action(STATUS_DRAFT), ResumeAction::Ignore);
        assert_eq!(resume_action(STATUS_COMPLETED), ResumeAction::Ignore);
    }
}
