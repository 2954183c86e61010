use course_core::model::{
    Answer, AnswerId, Assessment, AssessmentId, AssessmentKind, Course, CourseId, CategoryId,
    CourseStatus, Lesson, LessonId, LessonKind, LessonStatus, Question, QuestionId, StudentCourse,
    StudentId, StudentLesson, SubmittedResponse,
};
use course_core::progression::StatusChange;
use course_core::time::fixed_now;
use storage::repository::{
    AssessmentRepository, AttemptDetailRecord, AttemptRecord, AttemptRepository, CourseRepository,
    LessonRepository, QuestionRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

fn build_lesson(id: u64, number: u32, kind: LessonKind) -> Lesson {
    Lesson::new(
        LessonId::new(id),
        CourseId::new(1),
        number,
        format!("Lesson {number}"),
        kind,
    )
    .unwrap()
}

async fn seed_course(repo: &SqliteRepository) {
    let course = Course::new(CourseId::new(1), CategoryId::new(1), "Rust 101", true).unwrap();
    repo.upsert_course(&course).await.unwrap();
}

#[tokio::test]
async fn sqlite_roundtrip_persists_assessment_and_questions() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_assessments?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    seed_course(&repo).await;
    repo.upsert_lesson(&build_lesson(1, 1, LessonKind::Test))
        .await
        .unwrap();

    let assessment = Assessment::test(AssessmentId::new(1), LessonId::new(1), 100).unwrap();
    repo.upsert_assessment(&assessment).await.unwrap();

    let question = Question::new(
        QuestionId::new(1),
        AssessmentId::new(1),
        "2 + 2 = 4?",
        1,
        100,
        course_core::model::QuestionKind::Boolean,
        false,
        None,
    )
    .unwrap();
    repo.upsert_question(&question).await.unwrap();
    repo.upsert_answer(&Answer::new(
        AnswerId::new(1),
        QuestionId::new(1),
        "true",
        true,
        None,
    ))
    .await
    .unwrap();
    repo.upsert_answer(&Answer::new(
        AnswerId::new(2),
        QuestionId::new(1),
        "false",
        false,
        None,
    ))
    .await
    .unwrap();

    let fetched = repo.assessment_for_lesson(LessonId::new(1)).await.unwrap();
    assert_eq!(fetched, assessment);

    let questions = repo
        .questions_for_assessment(AssessmentId::new(1))
        .await
        .unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0], question);

    let answers = repo.answers_for_question(QuestionId::new(1)).await.unwrap();
    assert_eq!(answers.len(), 2);
    assert!(answers.iter().any(|a| a.is_correct()));
}

#[tokio::test]
async fn sqlite_attempt_insert_is_transactional_and_numbered() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_attempts?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    seed_course(&repo).await;
    repo.upsert_lesson(&build_lesson(1, 1, LessonKind::Test))
        .await
        .unwrap();
    let assessment = Assessment::test(AssessmentId::new(1), LessonId::new(1), 100).unwrap();
    repo.upsert_assessment(&assessment).await.unwrap();

    let student = StudentId::new(7);
    assert_eq!(
        repo.last_attempt_number(student, assessment.id())
            .await
            .unwrap(),
        None
    );

    let attempt = AttemptRecord {
        id: None,
        student_id: student,
        assessment_id: assessment.id(),
        kind: AssessmentKind::Test,
        number: 1,
        score: 80,
        submitted_at: fixed_now(),
    };
    let details = [AttemptDetailRecord {
        id: None,
        attempt_id: None,
        question_id: QuestionId::new(1),
        score: 80,
        response: SubmittedResponse::Single(AnswerId::new(3)),
    }];

    let id = repo.insert_attempt(&attempt, &details).await.unwrap();

    assert_eq!(
        repo.last_attempt_number(student, assessment.id())
            .await
            .unwrap(),
        Some(1)
    );

    let stored = repo.get_attempt(id).await.unwrap();
    assert_eq!(stored.score, 80);
    assert_eq!(stored.submitted_at, fixed_now());

    let stored_details = repo.details_for_attempt(id).await.unwrap();
    assert_eq!(stored_details.len(), 1);
    assert_eq!(
        stored_details[0].response,
        SubmittedResponse::Single(AnswerId::new(3))
    );

    // Re-inserting the same attempt number must conflict, not duplicate.
    let err = repo.insert_attempt(&attempt, &details).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let history = repo.attempts_for(student, assessment.id()).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn sqlite_status_changes_roll_back_on_missing_row() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_statuses?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    seed_course(&repo).await;
    repo.upsert_lesson(&build_lesson(1, 1, LessonKind::Lecture))
        .await
        .unwrap();
    repo.upsert_lesson(&build_lesson(2, 2, LessonKind::Lecture))
        .await
        .unwrap();

    let student = StudentId::new(1);
    repo.upsert_student_lesson(&StudentLesson::new(student, LessonId::new(1)))
        .await
        .unwrap();

    // Lesson 2 has no row for this student: the batch must not apply at all.
    let changes = [
        StatusChange::new(LessonId::new(1), LessonStatus::Active),
        StatusChange::new(LessonId::new(2), LessonStatus::Blocked),
    ];
    let err = repo
        .apply_status_changes(student, &changes)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let rows = repo.student_lessons(student, CourseId::new(1)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status(), LessonStatus::New);

    // A valid batch applies together with the completion update.
    repo.upsert_student_lesson(&StudentLesson::new(student, LessonId::new(2)))
        .await
        .unwrap();
    repo.complete_and_apply(
        student,
        LessonId::new(1),
        Some(90),
        true,
        &[StatusChange::new(LessonId::new(2), LessonStatus::Active)],
    )
    .await
    .unwrap();

    let rows = repo.student_lessons(student, CourseId::new(1)).await.unwrap();
    assert_eq!(rows[0].status(), LessonStatus::Completed);
    assert_eq!(rows[0].score(), Some(90));
    assert_eq!(rows[0].attempt(), 1);
    assert_eq!(rows[1].status(), LessonStatus::Active);
}

#[tokio::test]
async fn sqlite_tracks_course_completion_and_category_queries() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_courses?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let category = CategoryId::new(5);
    for (id, published) in [(1_u64, true), (2, true), (3, false)] {
        let course = Course::new(CourseId::new(id), category, format!("Course {id}"), published)
            .unwrap();
        repo.upsert_course(&course).await.unwrap();
    }

    let published = repo.published_courses_in_category(category).await.unwrap();
    assert_eq!(published, vec![CourseId::new(1), CourseId::new(2)]);

    let student = StudentId::new(9);
    let mut sc = StudentCourse::new(student, CourseId::new(1));
    sc.add_grade(150).unwrap();
    sc.set_progress(100);
    sc.set_completed();
    repo.upsert_student_course(&sc).await.unwrap();

    let fetched = repo.get_student_course(student, CourseId::new(1)).await.unwrap();
    assert_eq!(fetched.grade(), 150);
    assert_eq!(fetched.progress(), 100);
    assert_eq!(fetched.status(), CourseStatus::Completed);

    assert_eq!(
        repo.completed_courses(student).await.unwrap(),
        vec![CourseId::new(1)]
    );
    assert_eq!(
        repo.students_in_course(CourseId::new(1)).await.unwrap(),
        vec![student]
    );
}
