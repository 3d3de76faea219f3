// SPDX-License-Identifier: Apache-2.0
//! HTTP endpoint for comment reaction submissions.
//!
//! One mutating route: `POST /comment/{id}` with a `{reaction, action}` body.
//! Validation failures never surface as HTTP errors — the body carries
//! `{"success":false}` and the status stays 200, so the client contract is a
//! single boolean plus the authoritative count on success. Reads for the
//! render layer (`GET /comment/{id}`) and the client bootstrap
//! (`GET /bootstrap`) sit alongside.

mod config;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use clap::Parser;
use reactions_catalog::Catalog;
use reactions_proto::{ClientBootstrap, CommentId, SubmitRequest, SubmitResponse};
use reactions_store::{
    CommentDirectory, CounterStore, FsCounterStore, InvalidationBus, StaticCommentDirectory,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use config::{ConfigService, FsConfigStore, ServerPrefs};

/// Session marker cookie set on guest mutations so full-page caches that
/// vary on its presence bypass themselves. Carries no data beyond existing.
const MARKER_COOKIE: &str = "reactions_commenter";

#[derive(Parser, Debug)]
#[command(author, version, about = "Comment reactions endpoint")]
struct Args {
    /// TCP listener (e.g. 0.0.0.0:8780); overrides the stored preference.
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Directory for persisted counter files; overrides the stored preference.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// JSON file seeding the comment directory ({"comments":{"<id>":<content_id>}}).
    #[arg(long)]
    comments: Option<PathBuf>,
    /// Ledger cookie lifetime in days; overrides the stored preference.
    #[arg(long)]
    cookie_days: Option<u32>,
    /// TLS certificate (PEM). If provided, key must also be provided.
    #[arg(long)]
    tls_cert: Option<PathBuf>,
    /// TLS private key (PEM). If provided, cert must also be provided.
    #[arg(long)]
    tls_key: Option<PathBuf>,
}

struct AppState {
    catalog: Catalog,
    counters: Arc<dyn CounterStore>,
    comments: Arc<dyn CommentDirectory>,
    bus: InvalidationBus,
    cookie_days: u32,
    endpoint_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Preferences (best-effort); defaults are persisted once when absent.
    let service = FsConfigStore::new().map(ConfigService::new).ok();
    let prefs: ServerPrefs = service
        .as_ref()
        .and_then(|s| s.load::<ServerPrefs>("server").ok().flatten())
        .unwrap_or_default();
    if let Some(service) = &service {
        let _ = service.save("server", &prefs);
    }

    let listen: SocketAddr = match args.listen {
        Some(addr) => addr,
        None => prefs.listen.parse().context("parse listen preference")?,
    };
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| PathBuf::from(&prefs.data_dir));
    let cookie_days = args.cookie_days.unwrap_or(prefs.cookie_days);

    let comments: StaticCommentDirectory = match &args.comments {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read comments file {}", path.display()))?;
            serde_json::from_slice(&bytes).context("parse comments file")?
        }
        None => StaticCommentDirectory::default(),
    };
    if comments.is_empty() {
        info!("comment directory is empty; every submission will be rejected");
    }

    let counters = FsCounterStore::new(data_dir.clone())
        .with_context(|| format!("open counter store at {}", data_dir.display()))?;

    let state = Arc::new(AppState {
        catalog: Catalog::builtin(),
        counters: Arc::new(counters),
        comments: Arc::new(comments),
        bus: InvalidationBus::new(),
        cookie_days,
        endpoint_url: prefs.endpoint_url,
    });

    let app = Router::new()
        .route("/comment/{id}", post(submit_handler).get(counts_handler))
        .route("/bootstrap", get(bootstrap_handler))
        .with_state(state);

    let handle = Handle::new();
    // graceful shutdown on Ctrl+C
    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shutdown();
        }
    });

    match (args.tls_cert, args.tls_key) {
        (Some(cert), Some(key)) => {
            let tls_config = RustlsConfig::from_pem_file(cert, key)
                .await
                .context("load tls config")?;
            info!("reactions endpoint listening (TLS) on {listen}");
            axum_server::bind_rustls(listen, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        (None, None) => {
            info!("reactions endpoint listening on {listen}");
            axum_server::bind(listen)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            return Err(anyhow!(
                "must provide both --tls-cert and --tls-key or neither"
            ))
        }
    }

    info!("shut down");
    Ok(())
}

/// Apply one submission against the shared state.
///
/// Validation order: comment exists, then alias exists. Either failure — and
/// a store failure — collapses to a bare rejection; no structured detail
/// crosses the wire. On success the cache-invalidation bus is notified with
/// the comment's parent content id before the response is returned.
fn process_submit(
    state: &AppState,
    comment_id: CommentId,
    request: &SubmitRequest,
) -> SubmitResponse {
    let Some(parent) = state.comments.parent_of(comment_id) else {
        debug!(comment_id, "rejected: unknown comment");
        return SubmitResponse::rejected();
    };
    if !state.catalog.exists(&request.reaction) {
        debug!(comment_id, reaction = %request.reaction, "rejected: unknown reaction");
        return SubmitResponse::rejected();
    }
    match state
        .counters
        .apply(comment_id, &request.reaction, request.action)
    {
        Ok(count) => {
            state.bus.notify(parent);
            info!(
                comment_id,
                reaction = %request.reaction,
                action = %request.action,
                count,
                "reaction applied"
            );
            SubmitResponse::ok(count)
        }
        Err(err) => {
            error!(?err, comment_id, "counter store failure");
            SubmitResponse::rejected()
        }
    }
}

/// Counts for the render layer: every default-visible alias (zero included)
/// plus every alias with a stored count. `None` when the comment is unknown.
fn merged_counts(state: &AppState, comment_id: CommentId) -> Option<BTreeMap<String, u64>> {
    if !state.comments.exists(comment_id) {
        return None;
    }
    let mut counts: BTreeMap<String, u64> = state
        .catalog
        .default_visible()
        .iter()
        .map(|alias| (alias.clone(), 0))
        .collect();
    match state.counters.all_for_comment(comment_id) {
        Ok(stored) => counts.extend(stored),
        Err(err) => error!(?err, comment_id, "counter store failure"),
    }
    Some(counts)
}

fn has_marker_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .any(|pair| {
            pair.trim()
                .strip_prefix(MARKER_COOKIE)
                .is_some_and(|rest| rest.starts_with('='))
        })
}

fn marker_cookie(cookie_days: u32) -> String {
    let max_age = u64::from(cookie_days) * 24 * 60 * 60;
    format!("{MARKER_COOKIE}=1; Max-Age={max_age}; Path=/; SameSite=Lax")
}

async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Path(comment_id): Path<CommentId>,
    headers: HeaderMap,
    Json(request): Json<SubmitRequest>,
) -> Response {
    let response = process_submit(&state, comment_id, &request);
    let set_marker = response.success && !has_marker_cookie(&headers);
    let mut http = Json(response).into_response();
    if set_marker {
        if let Ok(value) = HeaderValue::from_str(&marker_cookie(state.cookie_days)) {
            http.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    http
}

async fn counts_handler(
    State(state): State<Arc<AppState>>,
    Path(comment_id): Path<CommentId>,
) -> Response {
    match merged_counts(&state, comment_id) {
        Some(counts) => Json(counts).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn bootstrap_handler(State(state): State<Arc<AppState>>) -> Json<ClientBootstrap> {
    Json(ClientBootstrap {
        endpoint_url: state.endpoint_url.clone(),
        cookie_days: state.cookie_days,
        catalog: state.catalog.brief(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactions_proto::ReactionAction;
    use reactions_store::{CacheInvalidator, ContentId, MemoryCounterStore};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCache {
        flushed: Mutex<Vec<ContentId>>,
    }

    impl CacheInvalidator for RecordingCache {
        fn flush_content(&self, content_id: ContentId) {
            self.flushed.lock().unwrap().push(content_id);
        }
    }

    fn test_state() -> (Arc<AppState>, Arc<RecordingCache>) {
        let cache = Arc::new(RecordingCache::default());
        let mut bus = InvalidationBus::new();
        bus.register(cache.clone());
        let state = Arc::new(AppState {
            catalog: Catalog::builtin(),
            counters: Arc::new(MemoryCounterStore::new()),
            comments: Arc::new(StaticCommentDirectory::from_pairs([
                (7, 100),
                (9, 100),
                (12, 101),
            ])),
            bus,
            cookie_days: 30,
            endpoint_url: "/reactions".to_string(),
        });
        (state, cache)
    }

    fn react(reaction: &str) -> SubmitRequest {
        SubmitRequest {
            reaction: reaction.to_string(),
            action: ReactionAction::React,
        }
    }

    fn revert(reaction: &str) -> SubmitRequest {
        SubmitRequest {
            reaction: reaction.to_string(),
            action: ReactionAction::Revert,
        }
    }

    #[test]
    fn unknown_comment_is_rejected() {
        let (state, cache) = test_state();
        let response = process_submit(&state, 999, &react("thumbsup"));
        assert_eq!(response, SubmitResponse::rejected());
        assert!(cache.flushed.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_reaction_is_rejected_without_mutation() {
        let (state, _cache) = test_state();
        let response = process_submit(&state, 7, &react("nonexistent"));
        assert_eq!(response, SubmitResponse::rejected());
        assert_eq!(state.counters.get(7, "nonexistent").unwrap(), 0);
        assert!(state.counters.all_for_comment(7).unwrap().is_empty());
    }

    #[test]
    fn react_then_revert_returns_authoritative_counts() {
        let (state, _cache) = test_state();
        assert_eq!(
            process_submit(&state, 7, &react("thumbsup")),
            SubmitResponse::ok(1)
        );
        assert_eq!(
            process_submit(&state, 7, &revert("thumbsup")),
            SubmitResponse::ok(0)
        );
        assert_eq!(state.counters.get(7, "thumbsup").unwrap(), 0);
    }

    #[test]
    fn every_successful_submit_invalidates_the_parent_content() {
        let (state, cache) = test_state();
        process_submit(&state, 7, &react("joy"));
        process_submit(&state, 12, &react("joy"));
        process_submit(&state, 7, &revert("joy"));
        assert_eq!(*cache.flushed.lock().unwrap(), vec![100, 101, 100]);
    }

    #[test]
    fn concurrent_reacts_from_zero_count_exactly() {
        let (state, _cache) = test_state();
        let mut handles = Vec::new();
        for _ in 0..2 {
            let state = Arc::clone(&state);
            handles.push(std::thread::spawn(move || {
                process_submit(&state, 9, &react("joy"))
            }));
        }
        for handle in handles {
            assert!(handle.join().unwrap().success);
        }
        assert_eq!(state.counters.get(9, "joy").unwrap(), 2);
    }

    #[test]
    fn merged_counts_include_default_visible_at_zero() {
        let (state, _cache) = test_state();
        process_submit(&state, 7, &react("joy"));

        let counts = merged_counts(&state, 7).unwrap();
        assert_eq!(counts.get("thumbsup"), Some(&0), "default-visible at zero");
        assert_eq!(counts.get("joy"), Some(&1));

        assert!(merged_counts(&state, 999).is_none());
    }

    #[test]
    fn marker_cookie_detection_parses_the_cookie_header() {
        let mut headers = HeaderMap::new();
        assert!(!has_marker_cookie(&headers));

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; reactions_commenter=1"),
        );
        assert!(has_marker_cookie(&headers));

        let mut other = HeaderMap::new();
        other.insert(
            header::COOKIE,
            HeaderValue::from_static("reactions_commenter_like=1"),
        );
        assert!(!has_marker_cookie(&other), "prefix match is not enough");
    }

    #[test]
    fn marker_cookie_carries_only_existence() {
        let cookie = marker_cookie(30);
        assert!(cookie.starts_with("reactions_commenter=1; "));
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(cookie.contains("Path=/"));
    }
}
