use anyhow::Context;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use confab_core::{AppConfig, AppState};
use confab_models::ServerEvent;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestContext {
    app: Router,
    state: AppState,
}

impl TestContext {
    async fn new() -> anyhow::Result<Self> {
        let db = confab_db::create_pool("sqlite::memory:", 1).await?;
        confab_db::run_migrations(&db).await?;

        let state = AppState::new(
            db,
            AppConfig {
                jwt_secret: "integration-test-secret".into(),
                jwt_expiry_seconds: 3600,
            },
        );
        let app = confab_api::build_router().with_state(state.clone());
        Ok(Self { app, state })
    }

    async fn request_json(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = if let Some(payload) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            builder.body(Body::from(payload.to_string()))?
        } else {
            builder.body(Body::empty())?
        };

        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let payload = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&body_bytes) }))
        };

        Ok((status, payload))
    }

    /// Register a user through the HTTP surface and hand back (id, token).
    async fn register(&self, username: &str) -> anyhow::Result<(i64, String)> {
        let (status, payload) = self
            .request_json(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "CorrectHorse9",
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {payload}");
        let id = payload["user"]["id"].as_i64().context("user id")?;
        let token = payload["token"].as_str().context("token")?.to_string();
        Ok((id, token))
    }
}

#[tokio::test]
async fn register_and_login_round_trip() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let (user_id, _token) = ctx.register("alice").await?;

    let (status, payload) = ctx
        .request_json(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "CorrectHorse9" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["user"]["id"].as_i64(), Some(user_id));
    assert!(payload["token"].as_str().is_some());

    let (status, _) = ctx
        .request_json(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn group_creation_unions_creator_into_members() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let (alice, token) = ctx.register("alice").await?;
    let (bob, _) = ctx.register("bob").await?;
    let (carol, _) = ctx.register("carol").await?;

    let (status, payload) = ctx
        .request_json(
            Method::POST,
            "/api/v1/groups",
            Some(&token),
            Some(json!({ "name": "Team", "memberIds": [bob, carol] })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payload["adminId"].as_i64(), Some(alice));

    let members: Vec<i64> = payload["memberIds"]
        .as_array()
        .context("memberIds")?
        .iter()
        .filter_map(Value::as_i64)
        .collect();
    assert!(members.contains(&alice));
    assert_eq!(members.len(), 3);

    // Empty member list and blank name are both validation failures.
    let (status, _) = ctx
        .request_json(
            Method::POST,
            "/api/v1/groups",
            Some(&token),
            Some(json!({ "name": "Empty", "memberIds": [] })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .request_json(
            Method::POST,
            "/api/v1/groups",
            Some(&token),
            Some(json!({ "name": "   ", "memberIds": [bob] })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn direct_send_and_history() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let (alice, alice_token) = ctx.register("alice").await?;
    let (bob, bob_token) = ctx.register("bob").await?;

    let (status, sent) = ctx
        .request_json(
            Method::POST,
            "/api/v1/messages",
            Some(&alice_token),
            Some(json!({
                "conversation": { "kind": "direct", "peerId": bob },
                "text": "hi bob",
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["senderId"].as_i64(), Some(alice));
    assert_eq!(sent["kind"], "direct");

    // Both parties see the same single-entry history.
    for (token, peer) in [(&alice_token, bob), (&bob_token, alice)] {
        let (status, history) = ctx
            .request_json(
                Method::GET,
                &format!("/api/v1/messages/direct/{peer}"),
                Some(token),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
        let history = history.as_array().context("history array")?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["text"], "hi bob");
    }
    Ok(())
}

#[tokio::test]
async fn group_history_requires_membership() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let (_alice, alice_token) = ctx.register("alice").await?;
    let (bob, _) = ctx.register("bob").await?;
    let (_mallory, mallory_token) = ctx.register("mallory").await?;

    let (status, created) = ctx
        .request_json(
            Method::POST,
            "/api/v1/groups",
            Some(&alice_token),
            Some(json!({ "name": "Team", "memberIds": [bob] })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = created["id"].as_i64().context("group id")?;

    let (status, _) = ctx
        .request_json(
            Method::GET,
            &format!("/api/v1/messages/group/{group_id}"),
            Some(&mallory_token),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Non-members cannot send into the group either.
    let (status, _) = ctx
        .request_json(
            Method::POST,
            "/api/v1/messages",
            Some(&mallory_token),
            Some(json!({
                "conversation": { "kind": "group", "groupId": group_id },
                "text": "let me in",
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn empty_message_body_is_rejected() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let (_alice, alice_token) = ctx.register("alice").await?;
    let (bob, _) = ctx.register("bob").await?;

    let (status, _) = ctx
        .request_json(
            Method::POST,
            "/api/v1/messages",
            Some(&alice_token),
            Some(json!({ "conversation": { "kind": "direct", "peerId": bob } })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn users_listing_excludes_the_caller() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let (alice, token) = ctx.register("alice").await?;
    ctx.register("bob").await?;

    let (status, users) = ctx
        .request_json(Method::GET, "/api/v1/users", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().context("users array")?;
    assert_eq!(users.len(), 1);
    assert_ne!(users[0]["id"].as_i64(), Some(alice));
    Ok(())
}

#[tokio::test]
async fn http_send_fans_out_to_live_connections() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let (_alice, alice_token) = ctx.register("alice").await?;
    let (bob, _) = ctx.register("bob").await?;

    // A live session for bob, as the gateway would register it.
    let (_conn, mut events) = ctx.state.mux.register(bob);

    let (status, sent) = ctx
        .request_json(
            Method::POST,
            "/api/v1/messages",
            Some(&alice_token),
            Some(json!({
                "conversation": { "kind": "direct", "peerId": bob },
                "text": "ping",
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let event = events.try_recv().context("bob's session got no event")?;
    match event {
        ServerEvent::NewMessage { id, recipient_id, conversation_id, .. } => {
            assert_eq!(Some(id), sent["id"].as_i64());
            assert_eq!(recipient_id, Some(bob));
            assert_eq!(conversation_id, None);
        }
        other => anyhow::bail!("unexpected event: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let (status, _) = ctx
        .request_json(Method::GET, "/api/v1/users", None, None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
