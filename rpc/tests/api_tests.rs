//! End-to-end tests of the HTTP surface against an in-memory ledger.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body, BodyDataStream};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tower::ServiceExt;

use agora_broadcast::VoteBroadcastCache;
use agora_crypto::TokenAuthority;
use agora_nullables::{NullClock, NullLedger};
use agora_rpc::{router, ApiSettings, AppState, SharedState, VotingMetrics};
use agora_types::{
    Business, BusinessId, Coefficient, PropertyUnit, PropertyUnitId, Resident, ResidentId,
    Voting, VotingGroup, VotingGroupId, VotingId, VotingOption, VotingOptionId, VotingType,
};
use agora_voting::VoteSubmissionCoordinator;

const ADMIN_KEY: &str = "admin-key";
const NOW: u64 = 1_700_000_000;

struct TestApi {
    app: Router,
    state: SharedState,
    ledger: Arc<NullLedger>,
}

fn seed(ledger: &NullLedger, secret_voting: bool) {
    ledger
        .add_business(Business {
            id: BusinessId::new(1),
            name: "Torre Norte".into(),
        })
        .unwrap();
    for (id, number, micros) in [(1, "A10", 500_000), (2, "A2", 300_000), (3, "B1", 200_000)] {
        ledger
            .add_property_unit(PropertyUnit {
                id: PropertyUnitId::new(id),
                business_id: BusinessId::new(1),
                number: number.into(),
                participation_coefficient: Coefficient::from_micros(micros),
            })
            .unwrap();
    }
    for (id, unit, dni, active) in [(1, 1, "111", true), (2, 2, "222", true), (3, 3, "333", false)] {
        ledger
            .add_resident(Resident {
                id: ResidentId::new(id),
                name: format!("resident {id}"),
                dni: dni.into(),
                property_unit_id: PropertyUnitId::new(unit),
                is_main_resident: true,
                is_active: active,
            })
            .unwrap();
    }
    ledger
        .add_voting_group(VotingGroup {
            id: VotingGroupId::new(1),
            business_id: BusinessId::new(1),
            name: "Asamblea".into(),
            starts_at: None,
            ends_at: None,
            requires_quorum: true,
            quorum_percentage: 50.0,
            is_active: true,
        })
        .unwrap();
    ledger
        .add_voting(Voting {
            id: VotingId::new(1),
            voting_group_id: VotingGroupId::new(1),
            title: "Budget".into(),
            description: None,
            voting_type: VotingType::Binary,
            is_secret: secret_voting,
            allow_abstention: false,
            is_active: true,
            display_order: 1,
            required_approval_percentage: 60.0,
        })
        .unwrap();
    for (id, code, color) in [(1, "YES", "#22c55e"), (2, "NO", "#ef4444")] {
        ledger
            .add_option(VotingOption {
                id: VotingOptionId::new(id),
                voting_id: VotingId::new(1),
                text: code.to_lowercase(),
                code: code.into(),
                display_order: id as u32,
                color: color.into(),
                is_active: true,
            })
            .unwrap();
    }
}

fn api_with(secret_voting: bool, enable_metrics: bool) -> TestApi {
    api_configured(secret_voting, enable_metrics, Duration::from_secs(30))
}

fn api_configured(secret_voting: bool, enable_metrics: bool, heartbeat: Duration) -> TestApi {
    let ledger = Arc::new(NullLedger::new());
    seed(&ledger, secret_voting);
    let clock = Arc::new(NullClock::new(NOW));
    let voting = VoteSubmissionCoordinator::with_clock(
        ledger.clone(),
        Arc::new(VoteBroadcastCache::default()),
        clock.clone(),
    );
    let (shutdown, _) = broadcast::channel(1);
    let state: SharedState = Arc::new(AppState {
        tokens: TokenAuthority::with_clock("test-secret", clock).unwrap(),
        voting,
        metrics: Arc::new(VotingMetrics::new().unwrap()),
        settings: ApiSettings {
            admin_api_key: ADMIN_KEY.into(),
            public_base_url: "https://vote.example.org/".into(),
            default_public_token_hours: 24,
            heartbeat,
            enable_metrics,
        },
        shutdown,
    });
    TestApi {
        app: router(state.clone()),
        state,
        ledger,
    }
}

fn api() -> TestApi {
    api_with(false, true)
}

impl TestApi {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    fn public_token(&self) -> String {
        self.state
            .tokens
            .issue_public_token(VotingId::new(1), VotingGroupId::new(1), BusinessId::new(1), 24)
            .unwrap()
    }

    async fn auth_token(&self, unit: u64, dni: &str) -> String {
        let (status, body) = self
            .post(
                "/public/validate-resident",
                &self.public_token(),
                json!({ "propertyUnitId": unit, "dni": dni }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_owned()
    }

    async fn vote(&self, token: &str, option: u64) -> (StatusCode, Value) {
        self.post("/public/vote", token, json!({ "votingOptionId": option }))
            .await
    }
}

// ── Public flow ─────────────────────────────────────────────────────────

#[tokio::test]
async fn voting_context_exposes_active_voting() {
    let api = api();
    let (status, body) = api.get("/public/voting-context", &api.public_token()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["business"]["name"], "Torre Norte");
    assert_eq!(body["data"]["voting"]["title"], "Budget");
    assert_eq!(body["data"]["voting"]["options"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["data"]["expiresAt"].as_u64().unwrap(),
        NOW + 24 * 3600
    );
}

#[tokio::test]
async fn property_units_come_in_natural_order_and_filter() {
    let api = api();
    let token = api.public_token();
    let (_, body) = api.get("/public/property-units", &token).await;
    let numbers: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, ["A2", "A10", "B1"]);

    let (_, body) = api.get("/public/property-units?number=b", &token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["number"], "B1");
}

#[tokio::test]
async fn resident_validation_checks_unit_dni_and_status() {
    let api = api();
    let token = api.public_token();

    let (status, body) = api
        .post(
            "/public/validate-resident",
            &token,
            json!({ "propertyUnitId": 1, "dni": "111" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["resident"]["id"], 1);
    assert_eq!(body["data"]["propertyUnit"]["number"], "A10");
    assert_eq!(body["data"]["hasVoted"], false);
    assert_eq!(body["data"]["expiresAt"].as_u64().unwrap(), NOW + 2 * 3600);

    let (status, _) = api
        .post(
            "/public/validate-resident",
            &token,
            json!({ "propertyUnitId": 1, "dni": "222" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = api
        .post(
            "/public/validate-resident",
            &token,
            json!({ "propertyUnitId": 99, "dni": "111" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = api
        .post(
            "/public/validate-resident",
            &token,
            json!({ "propertyUnitId": 3, "dni": "333" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = api
        .post("/public/validate-resident", &token, json!({ "dni": "111" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn second_vote_is_a_conflict() {
    let api = api();
    let token = api.auth_token(1, "111").await;

    let (status, body) = api.vote(&token, 1).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["optionCode"], "YES");
    assert_eq!(body["data"]["optionColor"], "#22c55e");
    assert_eq!(body["data"]["votedAt"].as_u64().unwrap(), NOW);

    let (status, body) = api.vote(&token, 2).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(api.ledger.vote_count().unwrap(), 1);
    assert_eq!(api.state.metrics.votes_submitted.get(), 1);
    assert_eq!(api.state.metrics.duplicate_votes.get(), 1);
}

#[tokio::test]
async fn unknown_option_is_rejected() {
    let api = api();
    let token = api.auth_token(1, "111").await;
    let (status, _) = api.vote(&token, 42).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(api.ledger.vote_count().unwrap(), 0);
}

#[tokio::test]
async fn inactive_voting_refuses_votes() {
    let api = api();
    let token = api.auth_token(1, "111").await;
    let (status, _) = api
        .call(Method::POST, "/admin/votings/1/deactivate", Some(ADMIN_KEY), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = api.vote(&token, 1).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn voting_info_shows_results_only_after_voting() {
    let api = api();
    let token = api.auth_token(1, "111").await;

    let (_, body) = api.get("/public/voting-info", &token).await;
    assert_eq!(body["data"]["hasVoted"], false);
    assert!(body["data"]["results"].is_null());

    api.vote(&token, 1).await;
    let (_, body) = api.get("/public/voting-info", &token).await;
    assert_eq!(body["data"]["hasVoted"], true);
    assert_eq!(body["data"]["myVote"]["optionCode"], "YES");
    assert_eq!(body["data"]["results"]["totalVotes"], 1);
}

#[tokio::test]
async fn units_with_residents_mark_voted_units() {
    let api = api();
    let token = api.auth_token(2, "222").await;
    api.vote(&token, 2).await;

    let (_, body) = api.get("/public/units-with-residents", &token).await;
    let units = body["data"].as_array().unwrap();
    assert_eq!(units.len(), 3);
    assert_eq!(units[0]["number"], "A2");
    assert_eq!(units[0]["hasVoted"], true);
    assert_eq!(units[1]["hasVoted"], false);
    // Inactive residents are not listed.
    assert!(units[2]["residents"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn secret_voting_hides_voters_on_public_list() {
    let api = api_with(true, false);
    let token = api.auth_token(1, "111").await;
    api.vote(&token, 1).await;

    let (_, body) = api.get("/public/votes", &token).await;
    let vote = &body["data"][0];
    assert_eq!(vote["optionCode"], "YES");
    assert!(vote["residentId"].is_null());
    assert!(vote["residentName"].is_null());
    assert!(vote["propertyUnitNumber"].is_null());

    let (_, body) = api
        .call(Method::GET, "/admin/votings/1/votes", Some(ADMIN_KEY), None)
        .await;
    assert_eq!(body["data"][0]["residentId"], 1);
}

// ── Authentication ──────────────────────────────────────────────────────

#[tokio::test]
async fn missing_or_malformed_token_is_unauthorized() {
    let api = api();
    let (status, body) = api
        .call(Method::GET, "/public/voting-context", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());

    let (status, _) = api.get("/public/voting-context", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = TokenAuthority::new("other-secret")
        .unwrap()
        .issue_public_token(VotingId::new(1), VotingGroupId::new(1), BusinessId::new(1), 24)
        .unwrap();
    let (status, _) = api.get("/public/voting-context", &forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_of_the_wrong_kind_is_forbidden() {
    let api = api();
    let public = api.public_token();
    let auth = api.auth_token(1, "111").await;

    let (status, _) = api.vote(&public, 1).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = api.get("/public/voting-context", &auth).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_require_the_key() {
    let api = api();
    let (status, _) = api
        .call(Method::GET, "/admin/votings/1", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = api.get("/admin/votings/1", "wrong-key").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = api.get("/admin/votings/1", &api.public_token()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = api.get("/admin/votings/1", ADMIN_KEY).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["options"].as_array().unwrap().len(), 2);
}

// ── Admin surface ───────────────────────────────────────────────────────

#[tokio::test]
async fn public_url_defaults_and_bounds() {
    let api = api();

    let (status, body) = api
        .call(
            Method::POST,
            "/admin/votings/1/generate-public-url",
            Some(ADMIN_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["data"]["token"].as_str().unwrap();
    assert_eq!(
        body["data"]["url"],
        format!("https://vote.example.org/voting?token={token}")
    );
    assert_eq!(body["data"]["expiresAt"].as_u64().unwrap(), NOW + 24 * 3600);

    let (status, body) = api
        .post(
            "/admin/votings/1/generate-public-url",
            ADMIN_KEY,
            json!({ "durationHours": 48 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["expiresAt"].as_u64().unwrap(), NOW + 48 * 3600);

    for hours in [0, 721] {
        let (status, _) = api
            .post(
                "/admin/votings/1/generate-public-url",
                ADMIN_KEY,
                json!({ "durationHours": hours }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{hours}h");
    }

    let (status, _) = api
        .call(
            Method::POST,
            "/admin/votings/9/generate-public-url",
            Some(ADMIN_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generated_link_works_on_the_public_surface() {
    let api = api();
    let (_, body) = api
        .call(
            Method::POST,
            "/admin/votings/1/generate-public-url",
            Some(ADMIN_KEY),
            None,
        )
        .await;
    let token = body["data"]["token"].as_str().unwrap();
    let (status, _) = api.get("/public/voting-context", token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleted_vote_can_be_cast_again() {
    let api = api();
    let token = api.auth_token(1, "111").await;
    let (_, body) = api.vote(&token, 1).await;
    let vote_id = body["data"]["id"].as_u64().unwrap();

    let (status, _) = api
        .call(
            Method::DELETE,
            &format!("/admin/votings/2/votes/{vote_id}"),
            Some(ADMIN_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = api
        .call(
            Method::DELETE,
            &format!("/admin/votings/1/votes/{vote_id}"),
            Some(ADMIN_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["voteId"], vote_id);

    let (status, _) = api.vote(&token, 2).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(api.state.metrics.votes_deleted.get(), 1);
}

#[tokio::test]
async fn non_numeric_ids_are_validation_errors() {
    let api = api();
    let (status, body) = api.get("/admin/votings/abc", ADMIN_KEY).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn results_and_quorum_follow_the_votes() {
    let api = api();
    // Unit A10 carries half of the coefficient; A2 carries 30%.
    let first = api.auth_token(1, "111").await;
    let second = api.auth_token(2, "222").await;
    api.vote(&first, 1).await;

    let (_, body) = api.get("/admin/votings/1/quorum", ADMIN_KEY).await;
    assert_eq!(body["data"]["requiresQuorum"], true);
    assert_eq!(body["data"]["attendedUnits"], 1);
    assert_eq!(body["data"]["totalUnits"], 3);
    assert_eq!(body["data"]["coefficientRate"].as_f64().unwrap(), 0.5);
    assert_eq!(body["data"]["quorumReached"], true);

    api.vote(&second, 2).await;
    let (status, body) = api.get("/admin/votings/1/results", ADMIN_KEY).await;
    assert_eq!(status, StatusCode::OK);
    let results = &body["data"]["results"];
    assert_eq!(results["totalVotes"], 2);
    assert_eq!(results["options"][0]["code"], "YES");
    assert_eq!(results["options"][0]["count"], 1);
    assert_eq!(results["options"][0]["percentage"].as_f64().unwrap(), 50.0);
    // 50% falls short of the 60% approval threshold.
    assert!(body["data"]["approvedOption"].is_null());
}

#[tokio::test]
async fn group_listing_and_unknown_routes() {
    let api = api();
    let (status, body) = api
        .get("/admin/voting-groups/1/votings", ADMIN_KEY)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["title"], "Budget");

    let (status, _) = api.get("/admin/voting-groups/5", ADMIN_KEY).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = api.get("/nowhere", ADMIN_KEY).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

// ── Operations ──────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let api = api();
    let (status, body) = api.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["liveVotings"], 0);
}

#[tokio::test]
async fn metrics_endpoint_follows_settings() {
    let enabled = api_with(false, true);
    let token = enabled.auth_token(1, "111").await;
    enabled.vote(&token, 1).await;
    let response = enabled
        .app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(text.to_vec()).unwrap();
    assert!(text.contains("agora_votes_submitted_total 1"));

    let disabled = api_with(false, false);
    let (status, _) = disabled.call(Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Live stream ─────────────────────────────────────────────────────────

/// Parses `event:` / `data:` frames off an SSE body as they arrive.
struct EventReader {
    stream: BodyDataStream,
    buffer: String,
}

impl EventReader {
    fn new(body: Body) -> Self {
        Self {
            stream: body.into_data_stream(),
            buffer: String::new(),
        }
    }

    async fn next_event(&mut self) -> (String, Value) {
        loop {
            while let Some(end) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..end + 2).collect();
                let mut kind = String::new();
                let mut data = String::new();
                for line in block.lines() {
                    if let Some(v) = line.strip_prefix("event:") {
                        kind = v.trim().to_owned();
                    } else if let Some(v) = line.strip_prefix("data:") {
                        data.push_str(v.trim());
                    }
                }
                if !kind.is_empty() {
                    return (kind, serde_json::from_str(&data).unwrap());
                }
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("stream stalled")
                .expect("stream ended")
                .unwrap();
            self.buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }
}

/// Read from an SSE body until `count` complete events have arrived.
async fn read_events(body: Body, count: usize) -> Vec<(String, Value)> {
    let mut reader = EventReader::new(body);
    let mut events = Vec::new();
    while events.len() < count {
        events.push(reader.next_event().await);
    }
    events
}

#[tokio::test]
async fn stream_sends_snapshot_then_live_votes() {
    let api = api();
    let first = api.auth_token(1, "111").await;
    let second = api.auth_token(2, "222").await;
    api.vote(&first, 1).await;

    let response = api
        .app
        .clone()
        .oneshot(
            Request::get(format!("/public/voting-stream?token={second}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(api.state.metrics.sse_connections.get(), 1);

    let events = read_events(response.into_body(), 2).await;
    assert_eq!(events[0].0, "connected");
    assert_eq!(events[0].1["votingId"], 1);
    assert_eq!(events[1].0, "initial_data");
    assert_eq!(events[1].1["votes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stream_delivers_new_votes_after_initial_data() {
    let api = api();
    let voter = api.auth_token(1, "111").await;

    let response = api
        .call_stream("/admin/votings/1/stream", ADMIN_KEY)
        .await;
    let mut stream = response.into_body().into_data_stream();

    // Drain `connected` and `initial_data` before voting.
    let mut seen = String::new();
    while seen.matches("\n\n").count() < 2 {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        seen.push_str(std::str::from_utf8(&chunk).unwrap());
    }
    assert!(seen.contains("event: initial_data"));

    api.vote(&voter, 2).await;
    let mut live = String::new();
    while !live.contains("\n\n") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        live.push_str(std::str::from_utf8(&chunk).unwrap());
    }
    assert!(live.contains("event: new_vote"));
    assert!(live.contains("\"optionCode\":\"NO\""));
    assert!(live.contains("\"residentName\":\"resident 1\""));

    drop(stream);
    assert_eq!(api.state.metrics.sse_connections.get(), 0);
}

#[tokio::test]
async fn shutdown_ends_open_streams() {
    let api = api();
    let response = api
        .call_stream("/admin/votings/1/stream", ADMIN_KEY)
        .await;
    let mut stream = response.into_body().into_data_stream();
    let mut seen = String::new();
    while seen.matches("\n\n").count() < 2 {
        let chunk = stream.next().await.unwrap().unwrap();
        seen.push_str(std::str::from_utf8(&chunk).unwrap());
    }

    api.state.shutdown.send(()).unwrap();
    let end = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn idle_stream_sends_heartbeats() {
    let api = api_configured(false, true, Duration::from_secs(1));
    let response = api
        .call_stream("/admin/votings/1/stream", ADMIN_KEY)
        .await;
    let mut events = EventReader::new(response.into_body());

    let (kind, connected) = events.next_event().await;
    assert_eq!(kind, "connected");
    assert_eq!(connected["connectedAt"], NOW);
    assert_eq!(connected["heartbeatSecs"], 1);
    assert_eq!(events.next_event().await.0, "initial_data");

    let (kind, heartbeat) = events.next_event().await;
    assert_eq!(kind, "heartbeat");
    assert_eq!(heartbeat["timestamp"], NOW);
}

#[tokio::test]
async fn admin_deletion_reaches_open_streams() {
    let api = api();
    let voter = api.auth_token(1, "111").await;
    let response = api
        .call_stream("/admin/votings/1/stream", ADMIN_KEY)
        .await;
    let mut events = EventReader::new(response.into_body());
    assert_eq!(events.next_event().await.0, "connected");
    assert_eq!(events.next_event().await.0, "initial_data");

    api.vote(&voter, 1).await;
    let (kind, cast) = events.next_event().await;
    assert_eq!(kind, "new_vote");
    let vote_id = cast["id"].as_u64().unwrap();

    let (status, _) = api
        .call(
            Method::DELETE,
            &format!("/admin/votings/1/votes/{vote_id}"),
            Some(ADMIN_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (kind, deleted) = events.next_event().await;
    assert_eq!(kind, "vote_deleted");
    assert_eq!(deleted["id"], vote_id);
    assert_eq!(deleted["optionCode"], "YES");
}

impl TestApi {
    async fn call_stream(&self, uri: &str, token: &str) -> axum::response::Response {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::get(uri)
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response
    }
}
