mod check_integrity;
mod list_problems;
mod submit_problem;
mod toggle_like;

pub use check_integrity::IntegrityChecker;
pub use list_problems::{collect_all, collect_owned, ListProblems, ProblemFeed, ProblemWatch};
pub use submit_problem::SubmitProblem;
pub use toggle_like::{plan_toggle, ToggleLike};
