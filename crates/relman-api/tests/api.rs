//! End-to-end HTTP tests over the in-memory store.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use relman_api::auth::USER_HEADER;
use relman_api::{AppState, routes};
use relman_core::access::Grants;
use relman_core::id::UserId;
use relman_core::store::memory::{MemoryPermissionStore, MemoryStore};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    permissions: MemoryPermissionStore,
}

impl TestApp {
    fn new() -> Self {
        let permissions = MemoryPermissionStore::new();
        let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(permissions.clone()));
        Self {
            router: routes::router(state),
            permissions,
        }
    }

    async fn user(&self, grants: Grants) -> UserId {
        let user = UserId::new();
        self.permissions.grant(user, grants).await;
        user
    }

    async fn send(&self, method: Method, uri: &str, user: Option<UserId>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header(USER_HEADER, user.to_string());
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(&self, uri: &str, user: UserId, body: Value) -> Value {
        let (status, value) = self.send(Method::POST, uri, Some(user), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "POST {uri}: {value}");
        value
    }
}

fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_ungated() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_or_invalid_caller_is_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/systems", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .uri("/api/systems")
        .header(USER_HEADER, "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_permissions_gate_each_action() {
    let app = TestApp::new();
    let reader = app.user(Grants::with_patterns(["system:read"])).await;
    let stranger = UserId::new();

    let (status, body) = app.send(Method::GET, "/api/systems", Some(reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = app
        .send(
            Method::POST,
            "/api/systems",
            Some(reader),
            Some(json!({ "name": "Gateway", "type": "systems" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("system:create"));

    let (status, _) = app.send(Method::GET, "/api/releases", Some(stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_hierarchy_rules_surface_as_bad_request() {
    let app = TestApp::new();
    let admin = app.user(Grants::admin()).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/systems",
            Some(admin),
            Some(json!({ "name": "Orphan", "type": "subsystems" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/systems",
            Some(admin),
            Some(json!({ "name": "Gateway", "type": "warehouse" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::GET, &format!("/api/systems/{}", UserId::new()), Some(admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::GET, "/api/systems/not-a-uuid", Some(admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_release_to_environment_flow() {
    let app = TestApp::new();
    let admin = app.user(Grants::admin()).await;

    let system = app
        .create("/api/systems", admin, json!({ "name": "Gateway", "type": "systems" }))
        .await;
    assert_eq!(system["type"], "systems");
    assert_eq!(system["status"], "active");
    let release = app
        .create(
            "/api/releases",
            admin,
            json!({ "name": "R1", "release_date": "2026-03-01T00:00:00Z", "type": "Major" }),
        )
        .await;
    let build_body = json!({ "system_id": id(&system), "release_id": id(&release), "version": "1.2.0" });
    app.create("/api/builds", admin, build_body.clone()).await;

    let (status, _) = app.send(Method::POST, "/api/builds", Some(admin), Some(build_body)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let environment = app
        .create(
            "/api/environments",
            admin,
            json!({ "name": "E1", "type": "dev", "release_id": id(&release) }),
        )
        .await;
    assert_eq!(environment["status"], "pending");
    let systems_uri = format!("/api/environments/{}/systems", id(&environment));

    let (status, body) = app
        .send(
            Method::POST,
            &systems_uri,
            Some(admin),
            Some(json!({ "system_id": id(&system), "version": "9.9.9" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["available_versions"], json!(["1.2.0"]));

    let added = app.create(&systems_uri, admin, json!({ "system_id": id(&system) })).await;
    assert_eq!(added["message"], "Added 1 system(s) to environment");
    assert_eq!(added["systems"][0]["version"], "1.2.0");
    assert_eq!(added["systems"][0]["system_name"], "Gateway");

    let (status, listing) = app.send(Method::GET, &systems_uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["environment_name"], "E1");
    assert_eq!(listing["systems"].as_array().unwrap().len(), 1);

    let member_uri = format!("{systems_uri}/{}", id(&system));
    let (status, detail) = app.send(Method::GET, &member_uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["available_versions"], json!(["1.2.0"]));
    assert_eq!(detail["system"]["system_name"], "Gateway");
    assert_eq!(detail["system"]["version"], "1.2.0");

    let (status, updated) = app
        .send(
            Method::PUT,
            &member_uri,
            Some(admin),
            Some(json!({ "version": "", "status": "inactive" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "inactive");
    assert_eq!(updated["version"], "1.2.0");

    let (status, report) = app
        .send(Method::POST, &format!("{systems_uri}/sync"), Some(admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["updated_count"], 0);
    assert_eq!(report["message"], "Updated 0 system version(s)");

    let (status, _) = app.send(Method::DELETE, &member_uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::DELETE, &member_uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sync_requires_update_permission() {
    let app = TestApp::new();
    let admin = app.user(Grants::admin()).await;
    let viewer = app.user(Grants::with_patterns(["environment-system:read"])).await;

    let release = app
        .create(
            "/api/releases",
            admin,
            json!({ "name": "R1", "release_date": "2026-03-01T00:00:00Z", "type": "Minor" }),
        )
        .await;
    let environment = app
        .create(
            "/api/environments",
            admin,
            json!({ "name": "E1", "type": "staging", "release_id": id(&release) }),
        )
        .await;
    let sync_uri = format!("/api/environments/{}/systems/sync", id(&environment));

    let (status, _) = app.send(Method::POST, &sync_uri, Some(viewer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, report) = app.send(Method::POST, &sync_uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["updated_count"], 0);
}

#[tokio::test]
async fn test_groups_list_their_environments() {
    let app = TestApp::new();
    let admin = app.user(Grants::admin()).await;

    let group = app
        .create("/api/environment-groups", admin, json!({ "name": "Payments" }))
        .await;
    let release = app
        .create(
            "/api/releases",
            admin,
            json!({ "name": "R1", "release_date": "2026-03-01T00:00:00Z", "type": "Hotfix" }),
        )
        .await;
    let environment = app
        .create(
            "/api/environments",
            admin,
            json!({
                "name": "E1",
                "type": "prod",
                "release_id": id(&release),
                "environment_group_id": id(&group),
            }),
        )
        .await;
    assert_eq!(environment["environment_group_id"], group["id"]);

    let environment_uri = format!("/api/environments/{}", id(&environment));
    let (status, fetched) = app.send(Method::GET, &environment_uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["environment_group_id"], group["id"]);

    let group_uri = format!("/api/environment-groups/{}", id(&group));
    let (status, detail) = app.send(Method::GET, &group_uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Payments");
    assert_eq!(detail["environments"][0]["name"], "E1");

    let (status, _) = app.send(Method::DELETE, &group_uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, detached) = app
        .send(
            Method::PUT,
            &environment_uri,
            Some(admin),
            Some(json!({ "environment_group_id": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detached["environment_group_id"], Value::Null);

    let (status, _) = app.send(Method::DELETE, &group_uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
