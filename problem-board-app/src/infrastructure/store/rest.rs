use super::{
    split_path, StoreError, Subscription, TreeStore, TxOutcome, TxUpdate, DEFAULT_MAX_RETRIES,
};
use async_trait::async_trait;
use reqwest::header::{ETAG, IF_MATCH};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Client for a hosted realtime database over its REST protocol.
///
/// Transactions use ETag compare-and-swap: a read with
/// `X-Firebase-ETag: true` returns the value's ETag, the write carries it in
/// `if-match`, and a `412` response hands back the newer value and ETag for
/// the next attempt.
///
/// Subscriptions poll with the same ETag read and emit only when the ETag
/// moves. The streaming mode (`Accept: text/event-stream`) sends `put` and
/// `patch` deltas rather than full values, so it would need a local replica
/// of the subtree kept in step with those events. Polling gets full values
/// straight from the server.
#[derive(Clone)]
pub struct RestTree {
    http_client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
    max_retries: u32,
    poll_interval: Duration,
}

impl RestTree {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: None,
            max_retries: DEFAULT_MAX_RETRIES,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_auth(mut self, auth: Option<String>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    fn url(&self, path: &str) -> Result<String, StoreError> {
        let segments = split_path(path)?;
        Ok(format!("{}/{}.json", self.base_url, segments.join("/")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(token) => request.query(&[("auth", token.as_str())]),
            None => request,
        }
    }

    async fn fetch_with_etag(&self, path: &str) -> Result<(Option<Value>, String), StoreError> {
        let request = self
            .http_client
            .get(self.url(path)?)
            .header(ETAG_REQUEST_HEADER, "true");
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let response = Self::check(response).await?;
        let etag = Self::etag(&response)?;
        let value = Self::body(response).await?;
        Ok((value, etag))
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let message = response.text().await.unwrap_or_default();
        tracing::error!("Store error: {} - {}", status, message);
        Err(StoreError::Status {
            status: status.as_u16(),
            message,
        })
    }

    fn etag(response: &Response) -> Result<String, StoreError> {
        response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StoreError::Decode("missing ETag header".to_string()))
    }

    async fn body(response: Response) -> Result<Option<Value>, StoreError> {
        let value: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

#[async_trait]
impl TreeStore for RestTree {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let request = self.http_client.get(self.url(path)?);
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Self::body(Self::check(response).await?).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let request = self.http_client.put(self.url(path)?).json(&value);
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn transact(&self, path: &str, update: TxUpdate<'_>) -> Result<TxOutcome, StoreError> {
        let url = self.url(path)?;
        let (mut current, mut etag) = self.fetch_with_etag(path).await?;

        for attempt in 1..=self.max_retries {
            let Some(next) = update(current.as_ref()) else {
                return Ok(TxOutcome::Aborted(current));
            };

            let request = self
                .http_client
                .put(&url)
                .header(IF_MATCH, etag.as_str())
                .json(&next);
            let response = self
                .authorized(request)
                .send()
                .await
                .map_err(|e| StoreError::Transport(e.to_string()))?;

            if response.status() == StatusCode::PRECONDITION_FAILED {
                tracing::debug!(path, attempt, "transaction conflict, retrying");
                etag = Self::etag(&response)?;
                current = Self::body(response).await?;
                continue;
            }

            Self::check(response).await?;
            return Ok(TxOutcome::Committed(next));
        }

        Err(StoreError::Conflict {
            path: path.to_string(),
            attempts: self.max_retries,
        })
    }

    fn subscribe(&self, path: &str) -> Subscription {
        let store = self.clone();
        let path = path.to_string();

        Subscription::spawn(move |tx| async move {
            let mut last_etag: Option<String> = None;
            let mut ticker = tokio::time::interval(store.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let item = match store.fetch_with_etag(&path).await {
                    Ok((value, etag)) => {
                        if last_etag.as_deref() == Some(etag.as_str()) {
                            continue;
                        }
                        last_etag = Some(etag);
                        Ok(value)
                    }
                    Err(err) => {
                        tracing::warn!(path = %path, "Snapshot poll failed: {}", err);
                        Err(err)
                    }
                };
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let store = RestTree::new("https://example-rtdb.firebaseio.com/");
        assert_eq!(
            store.url("user_problems/a@b_dot_c/p1").unwrap(),
            "https://example-rtdb.firebaseio.com/user_problems/a@b_dot_c/p1.json"
        );
        assert_eq!(store.url("").unwrap(), "https://example-rtdb.firebaseio.com/.json");
        assert!(store.url("bad.path").is_err());
    }

    #[test]
    fn test_limits_are_clamped() {
        let store = RestTree::new("http://localhost:9000")
            .with_max_retries(0)
            .with_poll_interval(Duration::ZERO);
        assert_eq!(store.max_retries, 1);
        assert_eq!(store.poll_interval, MIN_POLL_INTERVAL);
    }

    mod against_server {
        use super::*;
        use axum::body::Bytes;
        use axum::extract::State;
        use axum::http::{HeaderMap, Method};
        use axum::response::IntoResponse;
        use axum::{Json, Router};
        use serde_json::json;
        use std::sync::{Arc, Mutex};
        use tokio::time::timeout;

        #[derive(Debug, Clone, PartialEq)]
        struct Seen {
            method: Method,
            if_match: Option<String>,
            etag_requested: bool,
        }

        /// One-value database speaking the ETag subset of the REST protocol.
        #[derive(Default)]
        struct FakeDatabase {
            value: Value,
            version: u64,
            /// Applied one per conditional write, just before the ETag check.
            racing_writes: Vec<Value>,
            always_race: bool,
            seen: Vec<Seen>,
        }

        impl FakeDatabase {
            fn holding(value: Value) -> Self {
                Self {
                    value,
                    ..Self::default()
                }
            }

            fn etag(&self) -> String {
                format!("etag-{}", self.version)
            }

            fn write(&mut self, value: Value) {
                self.value = value;
                self.version += 1;
            }

            fn conditional_puts(&self) -> Vec<Option<String>> {
                self.seen
                    .iter()
                    .filter(|s| s.method == Method::PUT)
                    .map(|s| s.if_match.clone())
                    .collect()
            }
        }

        type Shared = Arc<Mutex<FakeDatabase>>;

        async fn handle(
            State(db): State<Shared>,
            method: Method,
            headers: HeaderMap,
            body: Bytes,
        ) -> axum::response::Response {
            let mut db = db.lock().unwrap();
            let if_match = headers
                .get(IF_MATCH)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            db.seen.push(Seen {
                method: method.clone(),
                if_match: if_match.clone(),
                etag_requested: headers.contains_key(ETAG_REQUEST_HEADER),
            });

            if method == Method::PUT {
                let next: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                if let Some(expected) = if_match {
                    if db.always_race {
                        let racer = json!({ "racer": db.version });
                        db.write(racer);
                    } else if !db.racing_writes.is_empty() {
                        let racer = db.racing_writes.remove(0);
                        db.write(racer);
                    }
                    if expected != db.etag() {
                        return (
                            StatusCode::PRECONDITION_FAILED,
                            [(ETAG, db.etag())],
                            Json(db.value.clone()),
                        )
                            .into_response();
                    }
                }
                db.write(next.clone());
                return (StatusCode::OK, [(ETAG, db.etag())], Json(next)).into_response();
            }

            (StatusCode::OK, [(ETAG, db.etag())], Json(db.value.clone())).into_response()
        }

        async fn serve(db: FakeDatabase) -> (RestTree, Shared) {
            let shared = Arc::new(Mutex::new(db));
            let app = Router::new().fallback(handle).with_state(shared.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

            let store = RestTree {
                http_client: reqwest::Client::builder().no_proxy().build().unwrap(),
                ..RestTree::new(format!("http://{}", addr))
            };
            (store, shared)
        }

        fn increment(current: Option<&Value>) -> Option<Value> {
            let n = current.and_then(|v| v["n"].as_u64()).unwrap_or(0);
            Some(json!({ "n": n + 1 }))
        }

        #[tokio::test]
        async fn test_transaction_writes_with_etag_from_read() {
            let (store, db) = serve(FakeDatabase::holding(json!({ "n": 1 }))).await;

            let outcome = store.transact("counters/a", &increment).await.unwrap();
            assert_eq!(outcome, TxOutcome::Committed(json!({ "n": 2 })));

            let db = db.lock().unwrap();
            assert_eq!(
                db.seen,
                vec![
                    Seen {
                        method: Method::GET,
                        if_match: None,
                        etag_requested: true,
                    },
                    Seen {
                        method: Method::PUT,
                        if_match: Some("etag-0".to_string()),
                        etag_requested: false,
                    },
                ]
            );
            assert_eq!(db.value, json!({ "n": 2 }));
        }

        #[tokio::test]
        async fn test_precondition_failure_retries_with_new_value_and_etag() {
            let mut fake = FakeDatabase::holding(json!({ "n": 1 }));
            fake.racing_writes.push(json!({ "n": 10 }));
            let (store, db) = serve(fake).await;

            let outcome = store.transact("counters/a", &increment).await.unwrap();
            assert_eq!(outcome, TxOutcome::Committed(json!({ "n": 11 })));

            let db = db.lock().unwrap();
            assert_eq!(
                db.conditional_puts(),
                vec![Some("etag-0".to_string()), Some("etag-1".to_string())]
            );
            assert_eq!(db.value, json!({ "n": 11 }));
        }

        #[tokio::test]
        async fn test_transaction_gives_up_after_retry_bound() {
            let fake = FakeDatabase {
                always_race: true,
                ..FakeDatabase::holding(json!({ "n": 1 }))
            };
            let (store, db) = serve(fake).await;
            let store = store.with_max_retries(3);

            let err = store.transact("counters/a", &increment).await.unwrap_err();
            assert_eq!(
                err,
                StoreError::Conflict {
                    path: "counters/a".to_string(),
                    attempts: 3,
                }
            );
            assert_eq!(db.lock().unwrap().conditional_puts().len(), 3);
        }

        #[tokio::test]
        async fn test_abort_returns_value_seen_after_conflict() {
            let mut fake = FakeDatabase::holding(json!({ "n": 1 }));
            fake.racing_writes.push(json!({ "n": 10 }));
            let (store, db) = serve(fake).await;

            let capped = |current: Option<&Value>| -> Option<Value> {
                let n = current.and_then(|v| v["n"].as_u64()).unwrap_or(0);
                (n < 10).then(|| json!({ "n": n + 1 }))
            };
            let outcome = store.transact("counters/a", &capped).await.unwrap();
            assert_eq!(outcome, TxOutcome::Aborted(Some(json!({ "n": 10 }))));

            let db = db.lock().unwrap();
            assert_eq!(db.conditional_puts().len(), 1);
            assert_eq!(db.value, json!({ "n": 10 }));
        }

        #[tokio::test]
        async fn test_subscription_emits_only_when_etag_changes() {
            let (store, db) = serve(FakeDatabase::holding(json!({ "n": 1 }))).await;
            let store = store.with_poll_interval(MIN_POLL_INTERVAL);

            let mut subscription = store.subscribe("counters/a");
            let first = subscription.next().await.unwrap().unwrap();
            assert_eq!(first, Some(json!({ "n": 1 })));

            let quiet = timeout(Duration::from_millis(350), subscription.next()).await;
            assert!(quiet.is_err());

            db.lock().unwrap().write(json!({ "n": 5 }));
            let changed = timeout(Duration::from_secs(2), subscription.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            assert_eq!(changed, Some(json!({ "n": 5 })));

            let db = db.lock().unwrap();
            let polls: Vec<&Seen> = db.seen.iter().filter(|s| s.method == Method::GET).collect();
            assert!(polls.len() >= 3);
            assert!(polls.iter().all(|s| s.etag_requested));
        }
    }
}
