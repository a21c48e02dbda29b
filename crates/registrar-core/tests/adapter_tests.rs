mod common;

use registrar_core::auth::Role;
use registrar_core::models::EntityKind;
use registrar_core::routes::{guard, Access, Route};
use registrar_core::{ApiError, Registrar, SessionStore};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use common::{config_for, envelope, page, signed_in, token, token_for, REFRESH};

/// Matches requests that carry no query string at all.
struct NoQuery;

impl Match for NoQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query().is_none()
    }
}

// ── Refresh on 401 ──────────────────────────────────────────────

#[tokio::test]
async fn expired_token_is_refreshed_once_and_request_retried() {
    let server = MockServer::start().await;
    let (registrar, old_token) = signed_in(&server, Role::Admin).await;
    let new_token = token(Role::Admin, 2);

    Mock::given(method("GET"))
        .and(path("/api/v1/blogs"))
        .and(header("authorization", old_token.as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "You are not authorized"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh-token"))
        .and(header("cookie", format!("refreshToken={}", REFRESH).as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(json!({ "accessToken": new_token }))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/blogs"))
        .and(header("authorization", new_token.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{ "_id": "b1", "title": "T", "category": "C", "description": "D" }]),
            1,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let blogs = registrar.blogs().list(&[]).await.unwrap();
    assert_eq!(blogs.len(), 1);
    assert_eq!(blogs.items[0].title, "T");
    assert_eq!(registrar.session().current_token(), Some(new_token));
}

#[tokio::test]
async fn failed_refresh_clears_session_and_reports_unauthenticated() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Student).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = registrar.resource(EntityKind::Job).list(&[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated));
    assert!(!registrar.session().is_authenticated());
    assert_eq!(
        guard(registrar.session(), &Route::Dashboard(Role::Student)),
        Access::Redirect(Route::Login)
    );
}

#[tokio::test]
async fn rejected_retry_signs_out_without_a_second_refresh() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/courses"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({ "accessToken": token(Role::Admin, 3) }))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = registrar.courses().list(&[]).await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert!(registrar.session().current_token().is_none());
}

#[tokio::test]
async fn missing_refresh_credential_signs_out_immediately() {
    let server = MockServer::start().await;
    let session = SessionStore::in_memory();
    session.sign_in(token(Role::Faculty, 1), false).unwrap();
    let registrar = Registrar::new(&config_for(&server), session).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/exams"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = registrar.exams().list(&[]).await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert!(!registrar.session().is_authenticated());
}

// ── Query strings and error mapping ─────────────────────────────

#[tokio::test]
async fn query_string_only_when_params_present() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/announcements"))
        .and(NoQuery)
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/announcements"))
        .and(query_param("searchTerm", "exam"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .expect(1)
        .mount(&server)
        .await;

    let resource = registrar.resource(EntityKind::Announcement);
    resource.list(&[]).await.unwrap();
    let params = registrar_core::cache::params([("searchTerm", "exam"), ("page", "2")]);
    resource.list(&params).await.unwrap();
}

#[tokio::test]
async fn backend_errors_carry_the_server_message() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/courses/create-course"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "message": "Course CSE-101 already exists"
        })))
        .mount(&server)
        .await;

    let err = registrar
        .courses()
        .create(&json!({ "title": "Intro", "prefix": "CSE", "code": 101, "credits": 3 }))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(err.user_message(), "Course CSE-101 already exists");
}

#[tokio::test]
async fn people_are_created_through_the_users_endpoints() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;
    let payload = json!({ "password": "secret1", "faculty": { "designation": "Lecturer" } });

    Mock::given(method("POST"))
        .and(path("/api/v1/users/create-faculty"))
        .and(body_json(&payload))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({ "_id": "f1", "id": "F-0001" }))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = registrar.faculties().create(&payload).await.unwrap();
    assert_eq!(created.object_id.as_deref(), Some("f1"));
}

#[tokio::test]
async fn users_cannot_be_created_directly() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;

    let err = registrar
        .resource(EntityKind::User)
        .create(&json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unsupported(_)));
}

// ── Login ───────────────────────────────────────────────────────

#[tokio::test]
async fn login_installs_session_and_refresh_cookie() {
    let server = MockServer::start().await;
    let session = SessionStore::in_memory();
    let registrar = Registrar::new(&config_for(&server), session).unwrap();
    let access = token(Role::Student, 1);

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({ "id": "A-0001", "password": "secret1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refreshToken=from-cookie; Path=/; HttpOnly")
                .set_body_json(envelope(json!({
                    "accessToken": access,
                    "needsPasswordChange": true
                }))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome = registrar.auth().login("A-0001", "secret1").await.unwrap();
    assert_eq!(outcome.user.role, Role::Student);
    assert!(outcome.needs_password_change);
    assert_eq!(registrar.session().refresh_token().as_deref(), Some("from-cookie"));
    assert_eq!(
        guard(registrar.session(), &Route::MyEnrolledCourses),
        Access::Redirect(Route::ChangePassword)
    );
}

#[tokio::test]
async fn wrong_password_does_not_trigger_refresh() {
    let server = MockServer::start().await;
    let registrar = Registrar::new(&config_for(&server), SessionStore::in_memory()).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Password did not match"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = registrar.auth().login("A-0001", "nope").await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert!(!registrar.session().is_authenticated());
}

#[tokio::test]
async fn change_password_clears_the_pending_flag() {
    let server = MockServer::start().await;
    let session = SessionStore::in_memory();
    session.sign_in(token(Role::Faculty, 1), true).unwrap();
    let registrar = Registrar::new(&config_for(&server), session).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/change-password"))
        .and(body_json(json!({ "oldPassword": "old-pass", "newPassword": "new-pass" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(null))))
        .expect(1)
        .mount(&server)
        .await;

    registrar
        .auth()
        .change_password("old-pass", "new-pass")
        .await
        .unwrap();
    assert!(!registrar.session().needs_password_change());
    assert_eq!(
        guard(registrar.session(), &Route::Dashboard(Role::Faculty)),
        Access::Granted
    );
}

// ── Session changes ─────────────────────────────────────────────

#[tokio::test]
async fn cached_reads_do_not_outlive_a_lost_session() {
    let server = MockServer::start().await;
    let (registrar, token_a) = signed_in(&server, Role::Student).await;
    let token_b = token_for("B-0002", Role::Student, 1);

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .and(header("authorization", token_a.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({ "id": "A-0001" }))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/students"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({ "accessToken": token_b, "refreshToken": "r-b" }))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .and(header("authorization", token_b.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({ "id": "B-0002" }))))
        .expect(1)
        .mount(&server)
        .await;

    let profile = registrar.my_profile().await.unwrap();
    assert_eq!(profile["id"], "A-0001");
    assert!(!registrar.cache().is_empty());

    // Refresh fails: the adapter signs out on its own.
    let err = registrar.students().list(&[]).await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert!(registrar.cache().is_empty());

    registrar.auth().login("B-0002", "secret1").await.unwrap();
    let profile = registrar.my_profile().await.unwrap();
    assert_eq!(profile["id"], "B-0002");
}

#[tokio::test]
async fn another_user_signing_in_drops_cached_reads() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Faculty).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .expect(3)
        .mount(&server)
        .await;

    let courses = registrar.courses();
    courses.list(&[]).await.unwrap();
    // Same user with a refreshed token keeps the cache.
    registrar
        .session()
        .replace_token(token(Role::Faculty, 2))
        .unwrap();
    courses.list(&[]).await.unwrap();

    registrar
        .session()
        .sign_in(token_for("F-0009", Role::Faculty, 1), false)
        .unwrap();
    courses.list(&[]).await.unwrap();

    registrar.session().logout();
    assert!(registrar.cache().is_empty());
    registrar
        .session()
        .sign_in(token(Role::Faculty, 3), false)
        .unwrap();
    courses.list(&[]).await.unwrap();
}
