#![forbid(unsafe_code)]

//! Orchestration layer: submission grading, lesson progression, course
//! completion aggregation, and authoring-time score reconciliation, all
//! over the repository contracts of the `storage` crate.

pub mod app_services;
pub mod attempt_service;
pub mod authoring_service;
pub mod completion_service;
pub mod dispatch;
pub mod error;
pub mod progression_service;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use attempt_service::{AttemptService, FinalizedAttempt, QuestionResponse};
pub use authoring_service::{AuthoringService, ScoreCorrection};
pub use completion_service::{CompletionOutcome, CompletionService};
pub use dispatch::{
    CertificateIssuer, DispatchError, RecordingDispatcher, RecordingIssuer, TaskDispatcher,
};
pub use error::{
    AppServicesError, AuthoringError, CompletionError, ProgressionServiceError, SubmissionError,
};
pub use progression_service::ProgressionService;
