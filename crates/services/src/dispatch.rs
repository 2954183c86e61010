use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use course_core::model::{CategoryId, CourseId, StudentId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors surfaced by the collaborator boundary (task queue, certificate
/// issuance).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("dispatch failed: {0}")]
    Failed(String),
}

//
// ─── COLLABORATOR CONTRACTS ────────────────────────────────────────────────────
//

/// Fire-and-forget background task queue with at-least-once delivery.
///
/// Completion consequences (notifications, rendering) go through here so
/// the synchronous submission path never blocks on them.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Enqueue a named task with a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` when the task cannot be queued.
    async fn enqueue(&self, task: &str, payload: serde_json::Value) -> Result<(), DispatchError>;
}

/// Certificate issuance collaborator.
///
/// Both operations are idempotent per (student, course) and
/// (student, category): retries after a crash must not create duplicate
/// certificates.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    /// Issue (or re-confirm) the course certificate for a student.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` when issuance cannot be requested.
    async fn issue_course_certificate(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<(), DispatchError>;

    /// Issue (or re-confirm) the category certificate for a student.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` when issuance cannot be requested.
    async fn issue_category_certificate(
        &self,
        student_id: StudentId,
        category_id: CategoryId,
    ) -> Result<(), DispatchError>;
}

//
// ─── RECORDING IMPLEMENTATIONS ─────────────────────────────────────────────────
//

/// In-memory dispatcher that records enqueued tasks, for testing and
/// prototyping.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    tasks: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

impl RecordingDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything enqueued so far, in order.
    #[must_use]
    pub fn tasks(&self) -> Vec<(String, serde_json::Value)> {
        self.tasks.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TaskDispatcher for RecordingDispatcher {
    async fn enqueue(&self, task: &str, payload: serde_json::Value) -> Result<(), DispatchError> {
        self.tasks
            .lock()
            .map_err(|e| DispatchError::Failed(e.to_string()))?
            .push((task.to_string(), payload));
        Ok(())
    }
}

/// In-memory issuer that enforces the idempotency contract: repeated
/// issuance for the same key is recorded as a call but produces no second
/// certificate.
#[derive(Clone, Default)]
pub struct RecordingIssuer {
    inner: Arc<Mutex<IssuerState>>,
}

#[derive(Default)]
struct IssuerState {
    course_certificates: HashSet<(StudentId, CourseId)>,
    category_certificates: HashSet<(StudentId, CategoryId)>,
    course_calls: usize,
    category_calls: usize,
}

impl RecordingIssuer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct course certificates issued.
    #[must_use]
    pub fn course_certificate_count(&self) -> usize {
        self.inner
            .lock()
            .map(|s| s.course_certificates.len())
            .unwrap_or(0)
    }

    /// Number of distinct category certificates issued.
    #[must_use]
    pub fn category_certificate_count(&self) -> usize {
        self.inner
            .lock()
            .map(|s| s.category_certificates.len())
            .unwrap_or(0)
    }

    /// Total course-certificate calls, including idempotent repeats.
    #[must_use]
    pub fn course_call_count(&self) -> usize {
        self.inner.lock().map(|s| s.course_calls).unwrap_or(0)
    }

    /// Total category-certificate calls, including idempotent repeats.
    #[must_use]
    pub fn category_call_count(&self) -> usize {
        self.inner.lock().map(|s| s.category_calls).unwrap_or(0)
    }

    #[must_use]
    pub fn has_course_certificate(&self, student_id: StudentId, course_id: CourseId) -> bool {
        self.inner
            .lock()
            .map(|s| s.course_certificates.contains(&(student_id, course_id)))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn has_category_certificate(&self, student_id: StudentId, category_id: CategoryId) -> bool {
        self.inner
            .lock()
            .map(|s| s.category_certificates.contains(&(student_id, category_id)))
            .unwrap_or(false)
    }
}

#[async_trait]
impl CertificateIssuer for RecordingIssuer {
    async fn issue_course_certificate(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<(), DispatchError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| DispatchError::Failed(e.to_string()))?;
        guard.course_calls += 1;
        guard.course_certificates.insert((student_id, course_id));
        Ok(())
    }

    async fn issue_category_certificate(
        &self,
        student_id: StudentId,
        category_id: CategoryId,
    ) -> Result<(), DispatchError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| DispatchError::Failed(e.to_string()))?;
        guard.category_calls += 1;
        guard.category_certificates.insert((student_id, category_id));
        Ok(())
    }
}
