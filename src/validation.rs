//! Input validation for schedule documents.
//!
//! Checks structural integrity of a decoded document before a schedule
//! is built from it. Detects:
//! - Duplicate IDs
//! - Missing resource references (slots and preferences)
//! - Zero horizon, capacity, or duration
//! - Windows that are empty or leave the horizon
//! - Slots that run past the horizon
//! - Problems whose slot tables would exceed [`MAX_SLOTS`]
//!
//! Constraint violations (overbooking, wrong capabilities, missed windows)
//! are not validation errors; the evaluator reports them as cost.

use crate::codec::ScheduleDocument;
use std::collections::HashSet;

/// Upper bound on `resources × horizon` and `leaders × horizon`.
///
/// Schedules keep one counter per slot, and the evaluator one per
/// leader and bucket; larger inputs are rejected before allocating.
pub const MAX_SLOTS: u64 = 100_000_000;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A task references a resource that doesn't exist.
    InvalidResourceReference,
    /// The horizon has no buckets.
    EmptyHorizon,
    /// A resource cannot hold any task.
    ZeroCapacity,
    /// A task occupies no buckets.
    ZeroDuration,
    /// A window is empty or extends past the horizon.
    InvalidWindow,
    /// An assigned task runs past the horizon.
    SlotOutsideHorizon,
    /// The slot or leader tables would exceed [`MAX_SLOTS`].
    ProblemTooLarge,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a decoded schedule document.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_document(doc: &ScheduleDocument) -> ValidationResult {
    let mut errors = Vec::new();

    if doc.horizon == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyHorizon,
            "horizon must be at least 1 bucket",
        ));
    }

    let mut resource_ids = HashSet::new();
    for r in &doc.resources {
        if !resource_ids.insert(r.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate resource ID: {}", r.id),
            ));
        }
        if r.capacity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroCapacity,
                format!("Resource '{}' has capacity 0", r.id),
            ));
        }
    }

    let mut task_ids = HashSet::new();
    for task in &doc.tasks {
        if !task_ids.insert(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }

        if task.duration == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroDuration,
                format!("Task '{}' has duration 0", task.id),
            ));
        }

        if let Some(w) = task.window {
            if w.start >= w.end || w.end > doc.horizon {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidWindow,
                    format!(
                        "Task '{}' window [{}, {}) is empty or exceeds horizon {}",
                        task.id, w.start, w.end, doc.horizon
                    ),
                ));
            }
        }

        if let Some(pref) = &task.preferred {
            if !resource_ids.contains(pref.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidResourceReference,
                    format!("Task '{}' prefers unknown resource '{}'", task.id, pref),
                ));
            }
        }

        if let Some(slot) = &task.slot {
            if !resource_ids.contains(slot.resource.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidResourceReference,
                    format!(
                        "Task '{}' is assigned to unknown resource '{}'",
                        task.id, slot.resource
                    ),
                ));
            }
            if slot.start.saturating_add(task.duration) > doc.horizon {
                errors.push(ValidationError::new(
                    ValidationErrorKind::SlotOutsideHorizon,
                    format!(
                        "Task '{}' starting at {} runs past horizon {}",
                        task.id, slot.start, doc.horizon
                    ),
                ));
            }
        }
    }

    let horizon = u64::from(doc.horizon);
    let slots = doc.resources.len() as u64 * horizon;
    if slots > MAX_SLOTS {
        errors.push(ValidationError::new(
            ValidationErrorKind::ProblemTooLarge,
            format!(
                "{} resources over horizon {} is too large: {} slots exceed the limit of {}",
                doc.resources.len(),
                doc.horizon,
                slots,
                MAX_SLOTS
            ),
        ));
    }
    let leaders: HashSet<&str> = doc.tasks.iter().filter_map(|t| t.leader.as_deref()).collect();
    let leader_slots = leaders.len() as u64 * horizon;
    if leader_slots > MAX_SLOTS {
        errors.push(ValidationError::new(
            ValidationErrorKind::ProblemTooLarge,
            format!(
                "{} leaders over horizon {} is too large: {} entries exceed the limit of {}",
                leaders.len(),
                doc.horizon,
                leader_slots,
                MAX_SLOTS
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
