use std::sync::Arc;

use course_core::model::{
    Answer, AnswerId, Assessment, AssessmentId, CategoryId, Course, CourseId, Lesson, LessonId,
    LessonKind, LessonStatus, Question, QuestionId, QuestionKind, StudentId, SubmittedResponse,
};
use course_core::time::fixed_clock;
use services::{AppServices, QuestionResponse, RecordingDispatcher, RecordingIssuer};
use storage::repository::{
    AssessmentRepository, CourseRepository, LessonRepository, QuestionRepository, Storage,
};

/// Seeds a one-category course: lecture #1, test #2, each question worth
/// the full assessment score.
async fn seed_course(storage: &Storage) {
    let course = Course::new(CourseId::new(1), CategoryId::new(1), "Rust 101", true).unwrap();
    storage.courses.upsert_course(&course).await.unwrap();

    let lecture = Lesson::new(
        LessonId::new(1),
        course.id(),
        1,
        "Introduction",
        LessonKind::Lecture,
    )
    .unwrap();
    let test = Lesson::new(
        LessonId::new(2),
        course.id(),
        2,
        "Checkpoint",
        LessonKind::Test,
    )
    .unwrap();
    storage.lessons.upsert_lesson(&lecture).await.unwrap();
    storage.lessons.upsert_lesson(&test).await.unwrap();

    let assessment = Assessment::test(AssessmentId::new(1), test.id(), 100).unwrap();
    storage
        .assessments
        .upsert_assessment(&assessment)
        .await
        .unwrap();

    let question = Question::new(
        QuestionId::new(1),
        assessment.id(),
        "Does ownership move by default?",
        1,
        100,
        QuestionKind::Boolean,
        false,
        None,
    )
    .unwrap();
    storage.questions.upsert_question(&question).await.unwrap();
    storage
        .questions
        .upsert_answer(&Answer::new(
            AnswerId::new(1),
            question.id(),
            "yes",
            true,
            None,
        ))
        .await
        .unwrap();
    storage
        .questions
        .upsert_answer(&Answer::new(
            AnswerId::new(2),
            question.id(),
            "no",
            false,
            None,
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn enrollment_to_category_certificate_end_to_end() {
    let storage = Storage::in_memory();
    let dispatcher = RecordingDispatcher::new();
    let issuer = RecordingIssuer::new();
    let services = AppServices::from_storage(
        &storage,
        fixed_clock(),
        Arc::new(dispatcher.clone()),
        Arc::new(issuer.clone()),
    );

    seed_course(&storage).await;
    let student = StudentId::new(7);

    // Enroll: lecture is active, the test behind it is blocked.
    services
        .progression()
        .enroll(student, CourseId::new(1))
        .await
        .unwrap();
    let rows = storage
        .lessons
        .student_lessons(student, CourseId::new(1))
        .await
        .unwrap();
    assert_eq!(rows[0].status(), LessonStatus::Active);
    assert_eq!(rows[1].status(), LessonStatus::Blocked);

    // Confirm the lecture: the test becomes the active gate.
    services
        .progression()
        .confirm_lesson_completion(student, LessonId::new(1), None)
        .await
        .unwrap();
    services
        .completion()
        .record_lesson_completion(student, CourseId::new(1), None)
        .await
        .unwrap();

    let rows = storage
        .lessons
        .student_lessons(student, CourseId::new(1))
        .await
        .unwrap();
    assert_eq!(rows[1].status(), LessonStatus::Active);

    // Submit the test with the correct answer.
    let attempt = services
        .attempts()
        .submit_attempt(
            student,
            LessonId::new(2),
            &[QuestionResponse::new(
                QuestionId::new(1),
                SubmittedResponse::Single(AnswerId::new(1)),
            )],
        )
        .await
        .unwrap();
    assert_eq!(attempt.number, 1);
    assert_eq!(attempt.score, 100);

    // Record the test lesson as completed with the attempt score.
    services
        .progression()
        .confirm_lesson_completion(student, LessonId::new(2), Some(attempt.score))
        .await
        .unwrap();
    let outcome = services
        .completion()
        .record_lesson_completion(student, CourseId::new(1), Some(attempt.score))
        .await
        .unwrap();

    assert_eq!(outcome.progress, 100);
    assert_eq!(outcome.grade, 100);
    assert!(outcome.course_completed);
    // The only published course in the category is now done.
    assert!(outcome.category_completed);

    assert!(issuer.has_course_certificate(student, CourseId::new(1)));
    assert!(issuer.has_category_certificate(student, CategoryId::new(1)));

    let task_names: Vec<String> = dispatcher.tasks().into_iter().map(|(name, _)| name).collect();
    assert!(task_names.contains(&"course_completed".to_string()));
    assert!(task_names.contains(&"category_completed".to_string()));

    let history = services
        .attempts()
        .attempt_history(student, AssessmentId::new(1))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    let details = services
        .attempts()
        .attempt_detail(attempt.attempt_id)
        .await
        .unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].score, 100);
}
