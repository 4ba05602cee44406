use crate::domain::{NewProblem, ProblemEntry, ProblemRef, ProblemWithId, Session, TIMESTAMP_FORMAT};
use crate::infrastructure::security::InputSanitizer;
use crate::infrastructure::store::{problem_path, TreeStore};
use problem_board_errors::AppError;
use std::sync::Arc;

/// Files a new problem under the reporter's own collection.
pub struct SubmitProblem {
    store: Arc<dyn TreeStore>,
    app_version: String,
}

impl SubmitProblem {
    pub fn new(store: Arc<dyn TreeStore>, app_version: String) -> Self {
        Self { store, app_version }
    }

    pub async fn execute(
        &self,
        session: &Session,
        new_problem: NewProblem,
    ) -> Result<ProblemWithId, AppError> {
        let reporter = session.require_user()?.clone();
        let problem_query = InputSanitizer::validate_problem_query(&new_problem.problem_query)?;

        let mut app_version = InputSanitizer::sanitize_metadata(&new_problem.app_version);
        if app_version.is_empty() {
            app_version = self.app_version.clone();
        }
        let cleaned = NewProblem {
            problem_query,
            app_version,
            os_version: InputSanitizer::sanitize_metadata(&new_problem.os_version),
            device_model: InputSanitizer::sanitize_metadata(&new_problem.device_model),
        };

        let timestamp = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let entry = ProblemEntry::new(cleaned, reporter.clone(), timestamp);
        let target = ProblemRef::new(reporter, uuid::Uuid::new_v4().to_string());

        let value = serde_json::to_value(&entry).map_err(|e| AppError::Internal(e.to_string()))?;
        self.store
            .set(&problem_path(&target), value)
            .await
            .map_err(|e| {
                tracing::error!("Problem submission failed: {}", e);
                AppError::from(e)
            })?;

        tracing::info!(id = %target.id, owner = %target.owner, "Problem submitted");
        Ok(ProblemWithId {
            id: target.id,
            owner: target.owner,
            entry,
        })
    }
}
