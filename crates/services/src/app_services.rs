use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::attempt_service::AttemptService;
use crate::authoring_service::AuthoringService;
use crate::completion_service::CompletionService;
use crate::dispatch::{CertificateIssuer, TaskDispatcher};
use crate::error::AppServicesError;
use crate::progression_service::ProgressionService;

/// Assembles the assessment services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    attempts: Arc<AttemptService>,
    progression: Arc<ProgressionService>,
    completion: Arc<CompletionService>,
    authoring: Arc<AuthoringService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        dispatcher: Arc<dyn TaskDispatcher>,
        certificates: Arc<dyn CertificateIssuer>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, dispatcher, certificates))
    }

    /// Build services over an existing storage aggregate.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        dispatcher: Arc<dyn TaskDispatcher>,
        certificates: Arc<dyn CertificateIssuer>,
    ) -> Self {
        let attempts = Arc::new(AttemptService::new(
            clock,
            Arc::clone(&storage.assessments),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.attempts),
        ));
        let progression = Arc::new(ProgressionService::new(
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.courses),
        ));
        let completion = Arc::new(CompletionService::new(
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.courses),
            dispatcher,
            certificates,
        ));
        let authoring = Arc::new(AuthoringService::new(
            Arc::clone(&storage.assessments),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.lessons),
        ));

        Self {
            attempts,
            progression,
            completion,
            authoring,
        }
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<AttemptService> {
        Arc::clone(&self.attempts)
    }

    #[must_use]
    pub fn progression(&self) -> Arc<ProgressionService> {
        Arc::clone(&self.progression)
    }

    #[must_use]
    pub fn completion(&self) -> Arc<CompletionService> {
        Arc::clone(&self.completion)
    }

    #[must_use]
    pub fn authoring(&self) -> Arc<AuthoringService> {
        Arc::clone(&self.authoring)
    }
}
