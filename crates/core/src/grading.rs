use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::model::{
    Answer, AnswerId, MatchingPair, MatchingSelection, Question, QuestionId, QuestionKind,
    SubmittedResponse,
};

/// Fixed divisor for matching questions: every correctly matched pair is
/// worth a quarter of the question score, independent of how many pairs
/// the question actually has.
pub const MATCHING_SCORE_DIVISOR: f64 = 4.0;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Data-integrity faults detected while grading.
///
/// These are authoring errors, never student errors: they abort the
/// submission instead of silently scoring zero.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradingError {
    #[error("question {question_id} has no correct answers")]
    NoCorrectAnswers { question_id: QuestionId },

    #[error("response shape does not match question {question_id} of kind {kind:?}")]
    MismatchedResponse {
        question_id: QuestionId,
        kind: QuestionKind,
    },
}

//
// ─── ANSWER KEY ────────────────────────────────────────────────────────────────
//

/// Stored correct-answer data for one question, in the shape its scoring
/// rule consumes.
///
/// Built by the services layer from repository rows and passed to
/// [`score_question`] together with the student's submission.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerKey {
    /// The single correct answer id (classic kinds).
    Classic { correct_id: AnswerId },
    /// All correct answer ids (multiple choice).
    MultipleChoice { correct_ids: HashSet<AnswerId> },
    /// Correct right item per left item (matching).
    Matching { pairs: HashMap<AnswerId, AnswerId> },
}

impl AnswerKey {
    /// Builds the key for a non-matching question from its stored answers.
    ///
    /// # Errors
    ///
    /// Returns `GradingError::NoCorrectAnswers` when a classically scored
    /// question has no answer flagged correct.
    pub fn from_answers(question: &Question, answers: &[Answer]) -> Result<Self, GradingError> {
        match question.kind() {
            QuestionKind::MultipleChoice => Ok(AnswerKey::MultipleChoice {
                correct_ids: answers
                    .iter()
                    .filter(|a| a.is_correct())
                    .map(Answer::id)
                    .collect(),
            }),
            _ => {
                let correct_id = answers
                    .iter()
                    .find(|a| a.is_correct())
                    .map(Answer::id)
                    .ok_or(GradingError::NoCorrectAnswers {
                        question_id: question.id(),
                    })?;
                Ok(AnswerKey::Classic { correct_id })
            }
        }
    }

    /// Builds the key for a matching question from its authored pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[MatchingPair]) -> Self {
        AnswerKey::Matching {
            pairs: pairs.iter().map(|p| (p.left_id(), p.right_id())).collect(),
        }
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Scores one answered question.
///
/// Dispatches on the question kind: multiple choice and matching have
/// dedicated rules, every other kind (boolean, test, both photo variants)
/// is scored classically. The result is an unrounded point total; callers
/// round once per question when building the attempt detail.
///
/// # Errors
///
/// Returns `GradingError::NoCorrectAnswers` for a multiple-choice question
/// with an empty correct set, and `GradingError::MismatchedResponse` when
/// the submission or key shape does not fit the question kind.
pub fn score_question(
    question: &Question,
    key: &AnswerKey,
    response: &SubmittedResponse,
) -> Result<f64, GradingError> {
    let mismatch = || GradingError::MismatchedResponse {
        question_id: question.id(),
        kind: question.kind(),
    };

    match question.kind() {
        QuestionKind::MultipleChoice => {
            let (AnswerKey::MultipleChoice { correct_ids }, SubmittedResponse::Multiple(ids)) =
                (key, response)
            else {
                return Err(mismatch());
            };
            score_multiple_choice(question.id(), question.score(), correct_ids, ids)
        }
        QuestionKind::Matching => {
            let (AnswerKey::Matching { pairs }, SubmittedResponse::Matching(selections)) =
                (key, response)
            else {
                return Err(mismatch());
            };
            Ok(score_matching(question.score(), pairs, selections))
        }
        _ => {
            let (AnswerKey::Classic { correct_id }, SubmittedResponse::Single(submitted)) =
                (key, response)
            else {
                return Err(mismatch());
            };
            Ok(score_classic(question.score(), *correct_id, *submitted))
        }
    }
}

/// All-or-nothing scoring: the full question score for the correct answer
/// id, zero for anything else. No partial credit.
#[must_use]
pub fn score_classic(question_score: u32, correct_id: AnswerId, submitted: AnswerId) -> f64 {
    if submitted == correct_id {
        f64::from(question_score)
    } else {
        0.0
    }
}

/// Multiple-choice scoring.
///
/// With `C` correct answers, each correctly selected id is worth
/// `score / C`. Selecting more ids than `C` subtracts the same share per
/// extra id; the result is clamped at zero. Accumulation stays real-valued
/// here; rounding happens once, at the caller.
///
/// # Errors
///
/// Returns `GradingError::NoCorrectAnswers` when `C == 0` instead of
/// dividing by zero.
pub fn score_multiple_choice(
    question_id: QuestionId,
    question_score: u32,
    correct_ids: &HashSet<AnswerId>,
    submitted: &[AnswerId],
) -> Result<f64, GradingError> {
    let correct_count = correct_ids.len();
    if correct_count == 0 {
        return Err(GradingError::NoCorrectAnswers { question_id });
    }

    // The submission is a set; duplicates carry no extra credit or penalty.
    let submitted: HashSet<AnswerId> = submitted.iter().copied().collect();

    #[allow(clippy::cast_precision_loss)]
    let per_correct = f64::from(question_score) / correct_count as f64;

    let hits = submitted.intersection(correct_ids).count();
    #[allow(clippy::cast_precision_loss)]
    let mut total = hits as f64 * per_correct;

    if submitted.len() > correct_count {
        #[allow(clippy::cast_precision_loss)]
        let penalty = (submitted.len() - correct_count) as f64 * per_correct;
        total -= penalty;
    }

    Ok(total.max(0.0))
}

/// Matching scoring: a quarter of the question score per correctly matched
/// pair, accumulated unrounded.
#[must_use]
pub fn score_matching(
    question_score: u32,
    pairs: &HashMap<AnswerId, AnswerId>,
    submitted: &[MatchingSelection],
) -> f64 {
    let per_pair = f64::from(question_score) / MATCHING_SCORE_DIVISOR;

    let correct = submitted
        .iter()
        .filter(|sel| pairs.get(&sel.left_id) == Some(&sel.right_id))
        .count();

    #[allow(clippy::cast_precision_loss)]
    let total = correct as f64 * per_pair;
    total
}

/// Rounds an accumulated question score once, to the nearest integer.
#[must_use]
pub fn round_score(raw: f64) -> u32 {
    // Scores are non-negative and bounded by the 200-point assessment cap.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = raw.round() as u32;
    rounded
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
