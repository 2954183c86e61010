use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AnswerId, AssessmentId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors that can occur when building question data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question score must be > 0")]
    InvalidScore,

    #[error("invalid question kind: {0}")]
    InvalidKind(String),
}

//
// ─── QUESTION KIND ─────────────────────────────────────────────────────────────
//

/// The answering mode of a question, which selects its scoring rule.
///
/// - `Boolean`, `Test`, `AnswerWithPhoto` and `QuestionWithPhoto` are all
///   scored classically: one submitted id against one correct id, all or
///   nothing.
/// - `MultipleChoice` splits the question score evenly across its correct
///   answers and penalizes over-selection.
/// - `Matching` awards a fixed quarter of the question score per correctly
///   matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    Boolean,
    Test,
    MultipleChoice,
    AnswerWithPhoto,
    QuestionWithPhoto,
    Matching,
}

impl QuestionKind {
    /// Storage encoding of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Boolean => "boolean",
            QuestionKind::Test => "test",
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::AnswerWithPhoto => "answer_with_photo",
            QuestionKind::QuestionWithPhoto => "question_with_photo",
            QuestionKind::Matching => "matching",
        }
    }

    /// Parses a stored kind string.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidKind` for unknown encodings.
    pub fn parse(s: &str) -> Result<Self, QuestionError> {
        match s {
            "boolean" => Ok(QuestionKind::Boolean),
            "test" => Ok(QuestionKind::Test),
            "multiple_choice" => Ok(QuestionKind::MultipleChoice),
            "answer_with_photo" => Ok(QuestionKind::AnswerWithPhoto),
            "question_with_photo" => Ok(QuestionKind::QuestionWithPhoto),
            "matching" => Ok(QuestionKind::Matching),
            other => Err(QuestionError::InvalidKind(other.to_string())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One question owned by a test or exam.
///
/// `score` is the number of points the question is worth; the sum of all
/// question scores of an assessment must equal the assessment's score
/// (validated at authoring time, not at grading time).
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    assessment_id: AssessmentId,
    text: String,
    number: u32,
    score: u32,
    kind: QuestionKind,
    hidden: bool,
    image_path: Option<String>,
}

impl Question {
    /// Creates a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` for blank text and
    /// `QuestionError::InvalidScore` for a zero score.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QuestionId,
        assessment_id: AssessmentId,
        text: impl Into<String>,
        number: u32,
        score: u32,
        kind: QuestionKind,
        hidden: bool,
        image_path: Option<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if score == 0 {
            return Err(QuestionError::InvalidScore);
        }

        Ok(Self {
            id,
            assessment_id,
            text,
            number,
            score,
            kind,
            hidden,
            image_path,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn assessment_id(&self) -> AssessmentId {
        self.assessment_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    #[must_use]
    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref()
    }
}

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// One answer option of a non-matching question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    id: AnswerId,
    question_id: QuestionId,
    text: String,
    is_correct: bool,
    image_path: Option<String>,
}

impl Answer {
    #[must_use]
    pub fn new(
        id: AnswerId,
        question_id: QuestionId,
        text: impl Into<String>,
        is_correct: bool,
        image_path: Option<String>,
    ) -> Self {
        Self {
            id,
            question_id,
            text: text.into(),
            is_correct,
            image_path,
        }
    }

    #[must_use]
    pub fn id(&self) -> AnswerId {
        self.id
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref()
    }
}

//
// ─── MATCHING PAIR ─────────────────────────────────────────────────────────────
//

/// One authored pair of a matching question.
///
/// `right_id` is the id of the right-hand item that correctly matches
/// `left_id`. Students submit (left, right) selections which are checked
/// against these pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingPair {
    question_id: QuestionId,
    left_id: AnswerId,
    left_text: String,
    right_id: AnswerId,
    right_text: String,
}

impl MatchingPair {
    #[must_use]
    pub fn new(
        question_id: QuestionId,
        left_id: AnswerId,
        left_text: impl Into<String>,
        right_id: AnswerId,
        right_text: impl Into<String>,
    ) -> Self {
        Self {
            question_id,
            left_id,
            left_text: left_text.into(),
            right_id,
            right_text: right_text.into(),
        }
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn left_id(&self) -> AnswerId {
        self.left_id
    }

    #[must_use]
    pub fn left_text(&self) -> &str {
        &self.left_text
    }

    #[must_use]
    pub fn right_id(&self) -> AnswerId {
        self.right_id
    }

    #[must_use]
    pub fn right_text(&self) -> &str {
        &self.right_text
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn build_question(kind: QuestionKind, score: u32) -> Result<Question, QuestionError> {
        Question::new(
            QuestionId::new(1),
            AssessmentId::new(1),
            "What is the capital of France?",
            1,
            score,
            kind,
            false,
            None,
        )
    }

    #[test]
    fn question_rejects_zero_score() {
        let err = build_question(QuestionKind::Test, 0).unwrap_err();
        assert!(matches!(err, QuestionError::InvalidScore));
    }

    #[test]
    fn question_rejects_blank_text() {
        let err = Question::new(
            QuestionId::new(1),
            AssessmentId::new(1),
            "   ",
            1,
            10,
            QuestionKind::Boolean,
            false,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, QuestionError::EmptyText));
    }

    #[test]
    fn kind_encoding_round_trips() {
        for kind in [
            QuestionKind::Boolean,
            QuestionKind::Test,
            QuestionKind::MultipleChoice,
            QuestionKind::AnswerWithPhoto,
            QuestionKind::QuestionWithPhoto,
            QuestionKind::Matching,
        ] {
            assert_eq!(QuestionKind::parse(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn kind_parse_rejects_unknown() {
        let err = QuestionKind::parse("essay").unwrap_err();
        assert!(matches!(err, QuestionError::InvalidKind(_)));
    }

    #[test]
    fn question_getters_expose_fields() {
        let q = build_question(QuestionKind::Matching, 20).unwrap();
        assert_eq!(q.id(), QuestionId::new(1));
        assert_eq!(q.score(), 20);
        assert_eq!(q.kind(), QuestionKind::Matching);
        assert!(!q.hidden());
        assert!(q.image_path().is_none());
    }
}
