use crate::application::{IntegrityChecker, ListProblems, SubmitProblem, ToggleLike};
use crate::infrastructure::store::{MemoryTree, TreeStore};
use crate::Config;
use problem_board_errors::AppError;
use std::sync::Arc;

#[cfg(feature = "rest")]
use crate::infrastructure::store::RestTree;

#[derive(Clone)]
pub struct AppContext {
    pub toggle_like: Arc<ToggleLike>,
    pub list_problems: Arc<ListProblems>,
    pub submit_problem: Arc<SubmitProblem>,
    pub integrity_checker: Arc<IntegrityChecker>,
}

impl AppContext {
    pub fn new(store: Arc<dyn TreeStore>, config: &Config) -> Self {
        Self {
            toggle_like: Arc::new(ToggleLike::new(store.clone())),
            list_problems: Arc::new(ListProblems::new(store.clone())),
            submit_problem: Arc::new(SubmitProblem::new(store, config.app_version.clone())),
            integrity_checker: Arc::new(IntegrityChecker::new(
                config.integrity_root.clone(),
                config.baseline_path.clone(),
            )),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let store: Arc<dyn TreeStore> = match &config.database_url {
            #[cfg(feature = "rest")]
            Some(url) => {
                tracing::info!("Using hosted database at {}", url);
                Arc::new(
                    RestTree::new(url.clone())
                        .with_auth(config.database_auth.clone())
                        .with_max_retries(config.max_retries)
                        .with_poll_interval(config.poll_interval),
                )
            }
            #[cfg(not(feature = "rest"))]
            Some(_) => {
                tracing::warn!("Built without the rest feature, ignoring database URL");
                Arc::new(MemoryTree::with_max_retries(config.max_retries))
            }
            None => {
                tracing::info!("Using in-memory store");
                Arc::new(MemoryTree::with_max_retries(config.max_retries))
            }
        };
        Self::new(store, config)
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::from_config(&Config::from_env()?))
    }
}
