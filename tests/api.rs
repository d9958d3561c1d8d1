use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use linkdeck::{app, config::Config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_PASSWORD: &str = "hunter22";
const BOUNDARY: &str = "linkdeck-test-boundary";

struct TestApp {
    router: Router,
    _dir: TempDir,
}

/// `auth_extra` lines are appended under the `auth:` section.
async fn setup_app(auth_extra: &str) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!(
        r#"
database:
  path: {db}
auth:
  jwt_secret: integration-secret
  admin_username: admin
  admin_password: {ADMIN_PASSWORD}
  password_hash:
    memory_kib: 8
    iterations: 1
    parallelism: 1
{auth_extra}
"#,
        db = dir.path().join("linkdeck.db").display(),
    );
    let cfg = Config::from_yaml_str(&yaml, |_| None).unwrap();
    let state = app::build_state(&cfg).await.unwrap();
    let router = app::router(state, &cfg.server, true).unwrap();

    TestApp { router, _dir: dir }
}

impl TestApp {
    async fn call(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        json_response(self.call(request).await).await
    }

    async fn login(&self, password: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/login",
            None,
            Some(json!({"username": "admin", "password": password})),
        )
        .await
    }

    async fn token(&self) -> String {
        let (status, body) = self.login(ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn import(&self, token: &str, field: &str, content: &str) -> (StatusCode, Value) {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"export.json\"\r\n\
             Content-Type: application/json\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/admin/import")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();

        json_response(self.call(request).await).await
    }
}

async fn json_response(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn raw_auth_request(uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = setup_app("").await;
    let (status, body) = app.send("GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn login_issues_token() {
    let app = setup_app("").await;
    let (status, body) = app.login(ADMIN_PASSWORD).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "admin");
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_failures_look_the_same() {
    let app = setup_app("").await;

    let (wrong_password, wrong_password_body) = app.login("nope-nope").await;
    let (unknown_user, unknown_user_body) = app
        .send(
            "POST",
            "/api/login",
            None,
            Some(json!({"username": "ghost", "password": ADMIN_PASSWORD})),
        )
        .await;

    assert_eq!(wrong_password, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password_body, unknown_user_body);
    assert_eq!(wrong_password_body["error"], "Invalid username or password");
}

#[tokio::test]
async fn login_rejects_malformed_body() {
    let app = setup_app("").await;

    let (status, body) = app.send("POST", "/api/login", None, Some(json!({"username": "admin"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");

    let (status, _) = app
        .send("POST", "/api/login", None, Some(json!({"username": "", "password": ""})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_require_bearer_token() {
    let app = setup_app("").await;

    let (status, body) = app.send("POST", "/api/admin/link-groups", None, Some(json!({"name": "x"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization header is required");

    for header_value in ["Token abc", "Bearer", "Bearer a b", "bearer abc"] {
        let (status, body) = json_response(app.call(raw_auth_request("/api/admin/export", header_value)).await).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{header_value}");
        assert_eq!(body["error"], "Authorization header format must be Bearer {token}");
    }

    let (status, body) = json_response(app.call(raw_auth_request("/api/admin/export", "Bearer garbage")).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn catalog_crud_flow() {
    let app = setup_app("").await;
    let token = app.token().await;
    let t = Some(token.as_str());

    let (status, body) = app
        .send("POST", "/api/admin/link-groups", t, Some(json!({"name": "Work", "sort_order": 1})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let work = body["id"].as_i64().unwrap();

    let (status, body) = app
        .send("POST", "/api/admin/link-groups", t, Some(json!({"name": "Empty", "sort_order": 0})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let empty = body["id"].as_i64().unwrap();

    let (status, body) = app
        .send(
            "POST",
            "/api/admin/links",
            t,
            Some(json!({"group_id": work, "name": "mail", "url": "https://mail.example.com", "sort_order": 0})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let mail = body["id"].as_i64().unwrap();

    let (status, groups) = app.send("GET", "/api/links", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(groups[0]["id"], empty);
    assert_eq!(groups[0]["links"], json!([]));
    assert_eq!(groups[1]["id"], work);
    assert_eq!(groups[1]["links"][0]["name"], "mail");

    let (status, links) = app
        .send("GET", &format!("/api/admin/link-groups/{work}/links"), t, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(links.as_array().unwrap().len(), 1);

    // Move the link to the other group.
    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/admin/links/{mail}"),
            t,
            Some(json!({"group_id": empty, "name": "mail", "url": "https://mail.example.com", "sort_order": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/admin/links/{mail}"),
            t,
            Some(json!({"group_id": 9999, "name": "mail", "url": "https://mail.example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Group not found");

    let (status, _) = app
        .send("DELETE", &format!("/api/admin/link-groups/{empty}"), t, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send("DELETE", &format!("/api/admin/links/{mail}"), t, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Link not found");

    let (status, _) = app
        .send("GET", &format!("/api/admin/link-groups/{empty}/links"), t, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_rejects_bad_input() {
    let app = setup_app("").await;
    let token = app.token().await;
    let t = Some(token.as_str());

    let (status, body) = app.send("POST", "/api/admin/link-groups", t, Some(json!({"name": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name is required");

    let (_, body) = app.send("POST", "/api/admin/link-groups", t, Some(json!({"name": "Work"}))).await;
    let work = body["id"].as_i64().unwrap();

    let (status, _) = app
        .send(
            "POST",
            "/api/admin/links",
            t,
            Some(json!({"group_id": work, "name": "x", "url": "not a url"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            "POST",
            "/api/admin/links",
            t,
            Some(json!({"group_id": 4242, "name": "x", "url": "https://x.example"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Group not found");

    let (status, body) = app.send("DELETE", "/api/admin/link-groups/abc", t, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid ID");

    let (status, _) = app
        .send("PUT", "/api/admin/link-groups/4242", t, Some(json!({"name": "Ghost"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn group_listing_without_header_is_unauthorized_by_default() {
    let app = setup_app("").await;

    let (status, _) = app.send("GET", "/api/admin/link-groups", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn group_listing_can_answer_empty_without_header() {
    let app = setup_app("  empty_list_on_missing_auth: true").await;

    let (status, body) = app.send("GET", "/api/admin/link-groups", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    // A header that is present but wrong is still refused.
    let (status, _) = json_response(app.call(raw_auth_request("/api/admin/link-groups", "Bearer nope")).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.token().await;
    app.send("POST", "/api/admin/link-groups", Some(&token), Some(json!({"name": "Work"})))
        .await;
    let (status, body) = app.send("GET", "/api/admin/link-groups", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn public_listing_can_require_auth() {
    let app = setup_app("  public_links: false").await;

    let (status, _) = app.send("GET", "/api/links", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.token().await;
    let (status, _) = app.send("GET", "/api/links", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn change_password_flow() {
    let app = setup_app("").await;
    let token = app.token().await;
    let t = Some(token.as_str());
    let uri = "/api/admin/change-password";

    let (status, _) = app
        .send("POST", uri, t, Some(json!({"old_password": ADMIN_PASSWORD, "new_password": "short"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send("POST", uri, t, Some(json!({"old_password": "wrong-one", "new_password": "longenough"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid old password");

    let (status, body) = app
        .send("POST", uri, t, Some(json!({"old_password": ADMIN_PASSWORD, "new_password": "longenough"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password updated successfully");

    assert_eq!(app.login(ADMIN_PASSWORD).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("longenough").await.0, StatusCode::OK);
}

#[tokio::test]
async fn export_is_an_attachment_without_timestamps() {
    let app = setup_app("").await;
    let token = app.token().await;
    let t = Some(token.as_str());

    let (_, body) = app.send("POST", "/api/admin/link-groups", t, Some(json!({"name": "Work"}))).await;
    let work = body["id"].as_i64().unwrap();
    app.send(
        "POST",
        "/api/admin/links",
        t,
        Some(json!({"group_id": work, "name": "mail", "url": "https://mail.example.com"})),
    )
    .await;

    let response = app
        .call(raw_auth_request("/api/admin/export", &format!("Bearer {token}")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=link-deck-export.json"
    );

    let (_, doc) = json_response(response).await;
    let group = &doc["link_groups"][0];
    assert_eq!(group["id"], work);
    assert_eq!(group["name"], "Work");
    assert!(group.get("created_at").is_none());
    assert_eq!(group["links"][0]["group_id"], work);
    assert!(group["links"][0].get("updated_at").is_none());
}

#[tokio::test]
async fn import_merges_by_group_name() {
    let app = setup_app("").await;
    let token = app.token().await;
    let t = Some(token.as_str());

    let (_, body) = app.send("POST", "/api/admin/link-groups", t, Some(json!({"name": "Work"}))).await;
    let work = body["id"].as_i64().unwrap();
    app.send(
        "POST",
        "/api/admin/links",
        t,
        Some(json!({"group_id": work, "name": "old", "url": "https://old.example"})),
    )
    .await;

    let doc = json!({"link_groups": [
        {"id": 500, "name": "Work", "sort_order": 2,
         "links": [{"id": 1, "group_id": 500, "name": "new", "url": "https://new.example", "sort_order": 0}]},
        {"id": 501, "name": "Home", "sort_order": 1, "links": []}
    ]});
    let (status, body) = app.import(&token, "file", &doc.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Data imported successfully");
    assert_eq!(body["summary"]["groups_created"], 1);
    assert_eq!(body["summary"]["groups_replaced"], 1);
    assert_eq!(body["summary"]["group_ids"]["500"], work);

    let (_, groups) = app.send("GET", "/api/links", None, None).await;
    let groups = groups.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["name"], "Home");
    assert_eq!(groups[1]["id"], work);
    assert_eq!(groups[1]["links"].as_array().unwrap().len(), 1);
    assert_eq!(groups[1]["links"][0]["name"], "new");
}

#[tokio::test]
async fn import_rejects_bad_uploads() {
    let app = setup_app("").await;
    let token = app.token().await;

    let (status, body) = app.import(&token, "attachment", "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");

    let (status, body) = app.import(&token, "file", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON format");

    let (status, _) = app
        .import(&token, "file", r#"{"link_groups":[{"id":1,"name":"","links":[]}]}"#)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.import("not-a-token", "file", "{}").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, groups) = app.send("GET", "/api/links", None, None).await;
    assert_eq!(groups, json!([]));
}
