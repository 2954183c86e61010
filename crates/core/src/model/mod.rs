mod assessment;
mod attempt;
mod course;
mod ids;
mod lesson;
mod question;

pub use ids::{
    AnswerId, AssessmentId, CategoryId, CourseId, LessonId, ParseIdError, QuestionId, StudentId,
};

pub use assessment::{
    Assessment, AssessmentError, AssessmentKind, DEFAULT_MAX_ATTEMPTS, MAX_ASSESSMENT_SCORE,
    reconciled_exam_score,
};
pub use attempt::{AttemptDetail, MatchingSelection, StudentAttempt, SubmittedResponse};
pub use course::{
    Course, CourseError, CourseStatus, MAX_COURSE_GRADE, StudentCourse, category_completed,
    progress_percent,
};
pub use lesson::{Lesson, LessonError, LessonKind, LessonStatus, StudentLesson};
pub use question::{Answer, MatchingPair, Question, QuestionError, QuestionKind};
