use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use problem_board_app::domain::{
    LikeOutcome, NewProblem, ProblemListing, ProblemRef, ProblemWithId, Session, UserKey, Verdict,
};
use problem_board_app::infrastructure::security::KeySanitizer;
use problem_board_app::AppContext;
use problem_board_errors::{AppError, ErrorBody};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// Header carrying the signed-in user's email. Absent means anonymous.
pub const USER_HEADER: &str = "x-user-email";

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/problems", get(list_universal).post(submit_problem))
        .route("/problems/mine", get(list_personal))
        .route("/problems/stream", get(stream_universal))
        .route("/problems/{owner}/{id}", get(problem_detail))
        .route("/problems/{owner}/{id}/like", post(toggle_like))
        .route("/integrity", get(verify_integrity))
        .route("/integrity/baseline", post(generate_baseline))
        .with_state(ctx)
}

/// The caller's session, taken from [`USER_HEADER`].
pub struct CurrentUser(pub Session);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        Ok(CurrentUser(match email {
            Some(email) => Session::signed_in(KeySanitizer::user_key(email)),
            None => Session::anonymous(),
        }))
    }
}

#[derive(Deserialize)]
struct LikeRequest {
    #[serde(default)]
    currently_liked: bool,
}

/// A problem with its owner and reporter keys decoded back to emails.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProblemDetail {
    #[serde(flatten)]
    problem: ProblemWithId,
    owner_email: Option<String>,
    reporter_email: Option<String>,
}

impl From<ProblemWithId> for ProblemDetail {
    fn from(problem: ProblemWithId) -> Self {
        let owner_email = KeySanitizer::unsanitize(problem.owner.as_str());
        let reporter_email = problem
            .entry
            .reporter_id
            .as_ref()
            .and_then(|key| KeySanitizer::unsanitize(key.as_str()));
        Self {
            problem,
            owner_email,
            reporter_email,
        }
    }
}

#[derive(Serialize)]
struct BaselineSummary {
    files: usize,
}

async fn health() -> &'static str {
    "ok"
}

async fn list_universal(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<ProblemWithId>>, AppError> {
    Ok(Json(ctx.list_problems.universal().await?))
}

async fn list_personal(
    State(ctx): State<AppContext>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<ProblemListing>, AppError> {
    Ok(Json(ctx.list_problems.personal(&session).await?))
}

async fn stream_universal(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // The feed lives inside the stream; axum drops it when the client goes away.
    let feed = ctx.list_problems.watch_universal();
    let stream = futures::stream::unfold(feed, |mut feed| async move {
        let event = match feed.next().await? {
            Ok(listing) => Event::default()
                .event("problems")
                .json_data(&listing)
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
            Err(err) => Event::default()
                .event("error")
                .json_data(ErrorBody::from(&err))
                .unwrap_or_else(|_| Event::default().event("error").data(err.to_string())),
        };
        Some((Ok(event), feed))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn submit_problem(
    State(ctx): State<AppContext>,
    CurrentUser(session): CurrentUser,
    Json(new_problem): Json<NewProblem>,
) -> Result<(StatusCode, Json<ProblemWithId>), AppError> {
    let created = ctx.submit_problem.execute(&session, new_problem).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn problem_detail(
    State(ctx): State<AppContext>,
    Path((owner, id)): Path<(String, String)>,
) -> Result<Json<ProblemDetail>, AppError> {
    let target = problem_ref(owner, id)?;
    ctx.list_problems
        .problem(&target)
        .await?
        .map(|problem| Json(ProblemDetail::from(problem)))
        .ok_or(AppError::NotFound)
}

async fn toggle_like(
    State(ctx): State<AppContext>,
    CurrentUser(session): CurrentUser,
    Path((owner, id)): Path<(String, String)>,
    Json(request): Json<LikeRequest>,
) -> Result<Json<LikeOutcome>, AppError> {
    let target = problem_ref(owner, id)?;
    let outcome = ctx
        .toggle_like
        .execute(&session, &target, request.currently_liked)
        .await?;
    Ok(Json(outcome))
}

async fn verify_integrity(State(ctx): State<AppContext>) -> Result<Json<Verdict>, AppError> {
    let checker = ctx.integrity_checker.clone();
    let verdict = tokio::task::spawn_blocking(move || checker.verify_integrity())
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;
    Ok(Json(verdict))
}

async fn generate_baseline(
    State(ctx): State<AppContext>,
) -> Result<Json<BaselineSummary>, AppError> {
    let checker = ctx.integrity_checker.clone();
    let baseline = tokio::task::spawn_blocking(move || checker.generate_baseline())
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;
    Ok(Json(BaselineSummary {
        files: baseline.len(),
    }))
}

fn problem_ref(owner: String, id: String) -> Result<ProblemRef, AppError> {
    if !KeySanitizer::is_valid_key(&owner) || !KeySanitizer::is_valid_key(&id) {
        return Err(AppError::InvalidInput("invalid problem address".to_string()));
    }
    Ok(ProblemRef::new(UserKey::from_sanitized(owner), id))
}
