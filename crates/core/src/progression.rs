use thiserror::Error;

use crate::model::{Lesson, LessonId, LessonKind, LessonStatus, StudentLesson};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Faults in the per-student lesson snapshot the state machine runs on.
///
/// These indicate broken data (a lesson without its StudentLesson row, an
/// insertion with no predecessor), never a normal progression outcome; the
/// triggering operation fails loudly instead of leaving the course half
/// unlocked.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressionError {
    #[error("no student lesson row for lesson {lesson_id}")]
    MissingStudentLesson { lesson_id: LessonId },

    #[error("no lesson with number {number} in the course snapshot")]
    UnknownLessonNumber { number: u32 },

    #[error("lessons cannot be inserted at position {number}")]
    InvalidInsertPosition { number: u32 },
}

//
// ─── SNAPSHOT TYPES ────────────────────────────────────────────────────────────
//

/// One lesson of a course as seen by one student: position, kind and the
/// current unlock status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonSlot {
    pub lesson_id: LessonId,
    pub number: u32,
    pub kind: LessonKind,
    pub status: LessonStatus,
}

impl LessonSlot {
    #[must_use]
    pub fn new(lesson_id: LessonId, number: u32, kind: LessonKind, status: LessonStatus) -> Self {
        Self {
            lesson_id,
            number,
            kind,
            status,
        }
    }

    /// Joins a lesson with its per-student record.
    #[must_use]
    pub fn from_records(lesson: &Lesson, record: &StudentLesson) -> Self {
        Self {
            lesson_id: lesson.id(),
            number: lesson.number(),
            kind: lesson.kind(),
            status: record.status(),
        }
    }
}

/// One status transition the caller must persist. Transitions of one
/// trigger are applied atomically: all rows move together or none do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub lesson_id: LessonId,
    pub status: LessonStatus,
}

impl StatusChange {
    #[must_use]
    pub fn new(lesson_id: LessonId, status: LessonStatus) -> Self {
        Self { lesson_id, status }
    }
}

fn sorted_by_number(slots: &[LessonSlot]) -> Vec<&LessonSlot> {
    let mut sorted: Vec<&LessonSlot> = slots.iter().collect();
    sorted.sort_by_key(|s| s.number);
    sorted
}

//
// ─── TRIGGER (A): SEQUENTIAL ADVANCE ───────────────────────────────────────────
//

/// Unlock scan after a lesson is completed.
///
/// Walks the lessons after `completed_number` in ascending order. The
/// first lesson encountered becomes `Active` whatever its kind. After
/// that, lectures become `Available` one by one until a test or exam is
/// reached: gates require their own completion event, so the scan halts
/// there and everything from the gate on keeps its current status.
///
/// The returned changes do not include the completed lesson itself; the
/// caller records its completion separately.
#[must_use]
pub fn advance_after_completion(slots: &[LessonSlot], completed_number: u32) -> Vec<StatusChange> {
    let mut changes = Vec::new();
    let mut first = true;

    for slot in sorted_by_number(slots)
        .into_iter()
        .filter(|s| s.number > completed_number)
    {
        if first {
            changes.push(StatusChange::new(slot.lesson_id, LessonStatus::Active));
            first = false;
            if slot.kind.is_gate() {
                break;
            }
            continue;
        }

        if slot.kind.is_gate() {
            break;
        }
        changes.push(StatusChange::new(slot.lesson_id, LessonStatus::Available));
    }

    changes
}

//
// ─── TRIGGER (B): LESSON INSERTION ─────────────────────────────────────────────
//

/// Placement of a lesson newly inserted into a course a student is
/// already taking.
///
/// `slots` is the full renumbered snapshot including the inserted lesson
/// (its row freshly created in `New` status). The decision is keyed on the
/// status, and where relevant the kind, of the lesson immediately
/// preceding the insertion point.
///
/// Unlike the sequential advance, a lecture insertion touches at most the
/// single lesson immediately after the new one. The two triggers are
/// intentionally asymmetric.
///
/// # Errors
///
/// Returns `ProgressionError::InvalidInsertPosition` for insertions at the
/// course head, `ProgressionError::UnknownLessonNumber` when the inserted
/// number is not in the snapshot, and
/// `ProgressionError::MissingStudentLesson` when the predecessor row is
/// absent.
pub fn place_inserted_lesson(
    slots: &[LessonSlot],
    inserted_number: u32,
) -> Result<Vec<StatusChange>, ProgressionError> {
    if inserted_number < 2 {
        return Err(ProgressionError::InvalidInsertPosition {
            number: inserted_number,
        });
    }

    let sorted = sorted_by_number(slots);
    let inserted = sorted
        .iter()
        .find(|s| s.number == inserted_number)
        .copied()
        .ok_or(ProgressionError::UnknownLessonNumber {
            number: inserted_number,
        })?;
    let preceding = sorted
        .iter()
        .find(|s| s.number == inserted_number - 1)
        .copied()
        .ok_or(ProgressionError::UnknownLessonNumber {
            number: inserted_number - 1,
        })?;

    let mut changes = Vec::new();

    if inserted.kind.is_gate() {
        match preceding.status {
            LessonStatus::Completed => {
                changes.push(StatusChange::new(inserted.lesson_id, LessonStatus::Active));
                block_following(&sorted, inserted_number, &mut changes);
            }
            LessonStatus::Available | LessonStatus::Active => {
                changes.push(StatusChange::new(inserted.lesson_id, LessonStatus::Blocked));
                block_following(&sorted, inserted_number, &mut changes);
            }
            // A blocked (or not yet placed) predecessor already gates
            // everything behind it; the followers keep their statuses.
            LessonStatus::Blocked | LessonStatus::New => {
                changes.push(StatusChange::new(inserted.lesson_id, LessonStatus::Blocked));
            }
        }
    } else {
        match preceding.status {
            LessonStatus::Completed => {
                changes.push(StatusChange::new(inserted.lesson_id, LessonStatus::Active));
                if let Some(next) = sorted.iter().find(|s| s.number == inserted_number + 1) {
                    let status = if next.kind.is_gate() {
                        LessonStatus::Blocked
                    } else {
                        LessonStatus::Available
                    };
                    changes.push(StatusChange::new(next.lesson_id, status));
                }
            }
            LessonStatus::Active if preceding.kind.is_gate() => {
                changes.push(StatusChange::new(inserted.lesson_id, LessonStatus::Blocked));
            }
            LessonStatus::Active | LessonStatus::Available => {
                changes.push(StatusChange::new(
                    inserted.lesson_id,
                    LessonStatus::Available,
                ));
            }
            LessonStatus::Blocked | LessonStatus::New => {
                changes.push(StatusChange::new(inserted.lesson_id, LessonStatus::Blocked));
            }
        }
    }

    Ok(changes)
}

fn block_following(sorted: &[&LessonSlot], after_number: u32, changes: &mut Vec<StatusChange>) {
    for slot in sorted.iter().filter(|s| s.number > after_number) {
        changes.push(StatusChange::new(slot.lesson_id, LessonStatus::Blocked));
    }
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// Initial statuses for a fresh enrollment: the same scan as the
/// sequential advance, run from the course head. The first lesson becomes
/// `Active`, following lectures `Available` up to the first gate, and the
/// gate plus everything after it `Blocked`.
#[must_use]
pub fn enroll_statuses(slots: &[LessonSlot]) -> Vec<StatusChange> {
    let mut changes = Vec::new();
    let mut gate_seen = false;
    let mut first = true;

    for slot in sorted_by_number(slots) {
        let status = if first {
            first = false;
            gate_seen = slot.kind.is_gate();
            LessonStatus::Active
        } else if gate_seen {
            LessonStatus::Blocked
        } else if slot.kind.is_gate() {
            gate_seen = true;
            LessonStatus::Blocked
        } else {
            LessonStatus::Available
        };
        changes.push(StatusChange::new(slot.lesson_id, status));
    }

    changes
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(number: u32, kind: LessonKind, status: LessonStatus) -> LessonSlot {
        LessonSlot::new(LessonId::new(u64::from(number)), number, kind, status)
    }

    fn change_for(changes: &[StatusChange], number: u32) -> Option<LessonStatus> {
        changes
            .iter()
            .find(|c| c.lesson_id == LessonId::new(u64::from(number)))
            .map(|c| c.status)
    }

    #[test]
    fn advance_activates_next_and_halts_at_gate() {
        // [lecture#1, lecture#2, test#3, lecture#4], completing #1.
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Completed),
            slot(2, LessonKind::Lecture, LessonStatus::Blocked),
            slot(3, LessonKind::Test, LessonStatus::Blocked),
            slot(4, LessonKind::Lecture, LessonStatus::Blocked),
        ];

        let changes = advance_after_completion(&slots, 1);

        assert_eq!(changes.len(), 1);
        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Active));
        assert_eq!(change_for(&changes, 3), None);
        assert_eq!(change_for(&changes, 4), None);
    }

    #[test]
    fn advance_unlocks_multiple_lectures_until_gate() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Completed),
            slot(2, LessonKind::Lecture, LessonStatus::Blocked),
            slot(3, LessonKind::Lecture, LessonStatus::Blocked),
            slot(4, LessonKind::Exam, LessonStatus::Blocked),
            slot(5, LessonKind::Lecture, LessonStatus::Blocked),
        ];

        let changes = advance_after_completion(&slots, 1);

        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Active));
        assert_eq!(change_for(&changes, 3), Some(LessonStatus::Available));
        assert_eq!(change_for(&changes, 4), None);
        assert_eq!(change_for(&changes, 5), None);
    }

    #[test]
    fn advance_activates_a_gate_but_unlocks_nothing_beyond_it() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Completed),
            slot(2, LessonKind::Test, LessonStatus::Blocked),
            slot(3, LessonKind::Lecture, LessonStatus::Blocked),
        ];

        let changes = advance_after_completion(&slots, 1);

        assert_eq!(changes.len(), 1);
        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Active));
    }

    #[test]
    fn advance_after_last_lesson_changes_nothing() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Completed),
            slot(2, LessonKind::Lecture, LessonStatus::Completed),
        ];

        assert!(advance_after_completion(&slots, 2).is_empty());
    }

    #[test]
    fn inserted_test_after_completed_becomes_active_and_blocks_rest() {
        // [lecture#1(completed), test#2(inserted), lecture#3].
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Completed),
            slot(2, LessonKind::Test, LessonStatus::New),
            slot(3, LessonKind::Lecture, LessonStatus::Available),
        ];

        let changes = place_inserted_lesson(&slots, 2).unwrap();

        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Active));
        assert_eq!(change_for(&changes, 3), Some(LessonStatus::Blocked));
    }

    #[test]
    fn inserted_test_after_active_is_blocked_and_blocks_rest() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Active),
            slot(2, LessonKind::Test, LessonStatus::New),
            slot(3, LessonKind::Lecture, LessonStatus::Available),
            slot(4, LessonKind::Lecture, LessonStatus::Blocked),
        ];

        let changes = place_inserted_lesson(&slots, 2).unwrap();

        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Blocked));
        assert_eq!(change_for(&changes, 3), Some(LessonStatus::Blocked));
        assert_eq!(change_for(&changes, 4), Some(LessonStatus::Blocked));
    }

    #[test]
    fn inserted_test_after_blocked_leaves_followers_untouched() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Blocked),
            slot(2, LessonKind::Test, LessonStatus::New),
            slot(3, LessonKind::Lecture, LessonStatus::Blocked),
        ];

        let changes = place_inserted_lesson(&slots, 2).unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Blocked));
    }

    #[test]
    fn inserted_lecture_after_completed_activates_and_touches_one_successor() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Completed),
            slot(2, LessonKind::Lecture, LessonStatus::New),
            slot(3, LessonKind::Lecture, LessonStatus::Blocked),
            slot(4, LessonKind::Lecture, LessonStatus::Blocked),
        ];

        let changes = place_inserted_lesson(&slots, 2).unwrap();

        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Active));
        assert_eq!(change_for(&changes, 3), Some(LessonStatus::Available));
        // Only one step ahead, unlike the sequential advance.
        assert_eq!(change_for(&changes, 4), None);
    }

    #[test]
    fn inserted_lecture_after_completed_blocks_a_following_gate() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Completed),
            slot(2, LessonKind::Lecture, LessonStatus::New),
            slot(3, LessonKind::Exam, LessonStatus::Available),
        ];

        let changes = place_inserted_lesson(&slots, 2).unwrap();

        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Active));
        assert_eq!(change_for(&changes, 3), Some(LessonStatus::Blocked));
    }

    #[test]
    fn inserted_lecture_after_active_gate_is_blocked() {
        let slots = [
            slot(1, LessonKind::Test, LessonStatus::Active),
            slot(2, LessonKind::Lecture, LessonStatus::New),
        ];

        let changes = place_inserted_lesson(&slots, 2).unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Blocked));
    }

    #[test]
    fn inserted_lecture_after_active_lecture_is_available() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Active),
            slot(2, LessonKind::Lecture, LessonStatus::New),
        ];

        let changes = place_inserted_lesson(&slots, 2).unwrap();

        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Available));
    }

    #[test]
    fn inserted_lecture_after_available_is_available() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Available),
            slot(2, LessonKind::Lecture, LessonStatus::New),
        ];

        let changes = place_inserted_lesson(&slots, 2).unwrap();

        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Available));
    }

    #[test]
    fn inserted_lecture_after_blocked_is_blocked() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Blocked),
            slot(2, LessonKind::Lecture, LessonStatus::New),
        ];

        let changes = place_inserted_lesson(&slots, 2).unwrap();

        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Blocked));
    }

    #[test]
    fn insertion_at_course_head_is_rejected() {
        let slots = [slot(1, LessonKind::Lecture, LessonStatus::New)];
        let err = place_inserted_lesson(&slots, 1).unwrap_err();
        assert!(matches!(
            err,
            ProgressionError::InvalidInsertPosition { number: 1 }
        ));
    }

    #[test]
    fn insertion_without_predecessor_in_snapshot_fails() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::Completed),
            slot(3, LessonKind::Lecture, LessonStatus::New),
        ];
        let err = place_inserted_lesson(&slots, 3).unwrap_err();
        assert!(matches!(
            err,
            ProgressionError::UnknownLessonNumber { number: 2 }
        ));
    }

    #[test]
    fn enrollment_unlocks_up_to_first_gate() {
        let slots = [
            slot(1, LessonKind::Lecture, LessonStatus::New),
            slot(2, LessonKind::Lecture, LessonStatus::New),
            slot(3, LessonKind::Test, LessonStatus::New),
            slot(4, LessonKind::Lecture, LessonStatus::New),
        ];

        let changes = enroll_statuses(&slots);

        assert_eq!(change_for(&changes, 1), Some(LessonStatus::Active));
        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Available));
        assert_eq!(change_for(&changes, 3), Some(LessonStatus::Blocked));
        assert_eq!(change_for(&changes, 4), Some(LessonStatus::Blocked));
    }

    #[test]
    fn enrollment_with_leading_gate_blocks_everything_after_it() {
        let slots = [
            slot(1, LessonKind::Exam, LessonStatus::New),
            slot(2, LessonKind::Lecture, LessonStatus::New),
        ];

        let changes = enroll_statuses(&slots);

        assert_eq!(change_for(&changes, 1), Some(LessonStatus::Active));
        assert_eq!(change_for(&changes, 2), Some(LessonStatus::Blocked));
    }
}
