mod integrity;
mod like;
mod listing;
mod problem;
mod user;

pub use integrity::Verdict;
pub use like::{AbortReason, LikeOutcome};
pub use listing::ProblemListing;
pub use problem::{NewProblem, ProblemEntry, ProblemRef, ProblemWithId, TIMESTAMP_FORMAT};
pub use user::{Session, UserKey};
