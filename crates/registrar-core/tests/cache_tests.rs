mod common;

use std::time::{Duration, Instant};

use registrar_core::auth::Role;
use registrar_core::forms::{schemas, FormError};
use registrar_core::models::{Blog, EntityKind};
use registrar_core::notify::Level;
use registrar_core::views::{Dashboard, DetailView, ListView, RowAction, RowIntent};
use registrar_core::{ApiError, Config, Notifier};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{config_for, envelope, page, signed_in, signed_in_with};

fn blog(id: &str, title: &str) -> serde_json::Value {
    json!({ "_id": id, "title": title, "category": "C", "description": "D" })
}

// ── Invalidation ────────────────────────────────────────────────

#[tokio::test]
async fn creating_a_blog_refreshes_the_mounted_list() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;
    let config = config_for(&server);

    Mock::given(method("GET"))
        .and(path("/api/v1/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([blog("b1", "T")]), 1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/blogs"))
        .and(body_json(json!({ "title": "T", "category": "C", "description": "D" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(blog("b1", "T"))))
        .expect(1)
        .mount(&server)
        .await;

    let mut list: ListView<Blog> = ListView::new(&registrar, EntityKind::Blog, &config);
    list.mount();
    list.settle().await.unwrap();
    assert!(list.rows().is_empty());

    let mut form = schemas::blog();
    form.set("title", "T");
    form.set("category", "C");
    form.set("description", "D");

    let notifier = Notifier::new();
    let blogs = registrar.blogs();
    let mut modal_open = true;
    let created = form
        .submit(
            &notifier,
            |payload| async move { blogs.create(&payload).await },
            |_| modal_open = false,
        )
        .await
        .unwrap();

    assert_eq!(created.title, "T");
    assert!(!modal_open);
    assert_eq!(notifier.all().last().map(|n| n.level), Some(Level::Success));

    list.settle().await.unwrap();
    let titles: Vec<&str> = list.rows().iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["T"]);
}

#[tokio::test]
async fn invalid_form_never_reaches_the_server() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(blog("b1", "T"))))
        .expect(0)
        .mount(&server)
        .await;

    let mut form = schemas::blog();
    form.set("title", "T");
    form.set("category", "C");

    let notifier = Notifier::new();
    let blogs = registrar.blogs();
    let result = form
        .submit(
            &notifier,
            |payload| async move { blogs.create(&payload).await },
            |_| {},
        )
        .await;

    assert!(matches!(result, Err(FormError::Invalid(_))));
    assert_eq!(form.error("description"), Some("Description is required"));
}

#[tokio::test]
async fn inactive_reads_are_evicted_and_refetched_on_next_use() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/jobs/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(null))))
        .expect(1)
        .mount(&server)
        .await;

    let jobs = registrar.jobs();
    jobs.list(&[]).await.unwrap();
    // Served from cache.
    jobs.list(&[]).await.unwrap();
    let before = registrar.cache().len();

    jobs.delete("j1").await.unwrap();
    assert_eq!(registrar.cache().len(), before - 1);

    jobs.list(&[]).await.unwrap();
}

#[tokio::test]
async fn marks_write_invalidates_enrollments() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Faculty).await;
    let config = config_for(&server);

    Mock::given(method("GET"))
        .and(path("/api/v1/enrolled-courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/enrolled-courses/update-enrolled-course-marks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({ "_id": "e1" }))))
        .expect(1)
        .mount(&server)
        .await;

    let mut list: ListView = ListView::new(&registrar, EntityKind::EnrolledCourse, &config);
    list.settle().await.unwrap();

    let mut form = schemas::course_marks();
    form.set("semesterRegistration", "r1");
    form.set("offeredCourse", "o1");
    form.set("student", "s1");
    form.set("courseMarks.midTerm", "25");
    let notifier = Notifier::new();
    let registrar_for_submit = registrar.clone();
    form.submit(
        &notifier,
        |payload| async move { registrar_for_submit.update_marks(&payload).await },
        |_| {},
    )
    .await
    .unwrap();

    list.settle().await.unwrap();
}

#[tokio::test]
async fn updating_a_record_refreshes_the_mounted_list() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;
    let config = config_for(&server);

    Mock::given(method("GET"))
        .and(path("/api/v1/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([blog("b1", "T")]), 1)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([blog("b1", "T2")]), 1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/blogs/b1"))
        .and(body_json(json!({ "title": "T2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(blog("b1", "T2"))))
        .expect(1)
        .mount(&server)
        .await;

    let mut list: ListView<Blog> = ListView::new(&registrar, EntityKind::Blog, &config);
    list.settle().await.unwrap();
    assert_eq!(list.rows()[0].title, "T");

    let updated = registrar
        .blogs()
        .update("b1", &json!({ "title": "T2" }))
        .await
        .unwrap();
    assert_eq!(updated.title, "T2");

    list.settle().await.unwrap();
    assert_eq!(list.rows()[0].title, "T2");
}

#[tokio::test]
async fn open_detail_follows_updates_and_deletes() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/blogs/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(blog("b1", "T"))))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/blogs/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(blog("b1", "T2"))))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/blogs/b1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "message": "Blog not found"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/blogs/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(blog("b1", "T2"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/blogs/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(null))))
        .expect(1)
        .mount(&server)
        .await;

    let mut detail: DetailView<Blog> = DetailView::new(&registrar, EntityKind::Blog, "b1");
    detail.settle().await.unwrap();
    assert_eq!(detail.record().map(|b| b.title.as_str()), Some("T"));

    registrar
        .blogs()
        .update("b1", &json!({ "title": "T2" }))
        .await
        .unwrap();
    detail.settle().await.unwrap();
    assert_eq!(detail.record().map(|b| b.title.as_str()), Some("T2"));

    registrar.blogs().delete("b1").await.unwrap();
    let err = detail.settle().await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert!(matches!(detail.error(), Some(ApiError::NotFound(_))));
}

// ── Eviction ────────────────────────────────────────────────────

#[tokio::test]
async fn searching_does_not_grow_the_cache() {
    let server = MockServer::start().await;
    let config = Config {
        cache_keep_unused_secs: 0,
        ..config_for(&server)
    };
    let (registrar, _) = signed_in_with(&config, Role::Admin);

    Mock::given(method("GET"))
        .and(path("/api/v1/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .mount(&server)
        .await;

    let mut list: ListView = ListView::new(&registrar, EntityKind::Course, &config);
    list.settle().await.unwrap();

    let now = Instant::now();
    for i in 0..50 {
        list.type_search(format!("course {}", i), now);
        list.submit_search();
    }
    list.settle().await.unwrap();

    // The mounted read plus the one it just replaced.
    assert!(registrar.cache().len() <= 2, "{} entries", registrar.cache().len());
}

#[tokio::test]
async fn unused_read_is_kept_for_a_while() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/exams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .expect(1)
        .mount(&server)
        .await;

    let exams = registrar.resource(EntityKind::Exam);
    let mut first = exams.subscribe_list(&[]);
    first.ready().await.unwrap();
    drop(first);

    // Reopening within the keep-unused window reuses the read.
    let mut second = exams.subscribe_list(&[]);
    second.ready().await.unwrap();
    assert_eq!(registrar.cache().len(), 1);
}

// ── List view ───────────────────────────────────────────────────

#[tokio::test]
async fn confirmed_delete_removes_the_row() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;
    let config = config_for(&server);

    Mock::given(method("GET"))
        .and(path("/api/v1/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([blog("b1", "T")]), 1)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/blogs/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(null))))
        .expect(1)
        .mount(&server)
        .await;

    let mut list: ListView<Blog> = ListView::new(&registrar, EntityKind::Blog, &config);
    list.settle().await.unwrap();
    assert_eq!(list.rows().len(), 1);

    let intent = list.row_action(RowAction::Delete).unwrap();
    assert_eq!(
        intent,
        RowIntent::ConfirmDelete {
            id: "b1".to_string(),
            label: "T".to_string()
        }
    );
    assert_eq!(list.pending_delete(), Some("b1"));

    let notifier = Notifier::new();
    list.confirm_delete(&notifier).await.unwrap();
    assert_eq!(notifier.all()[0].message, "Blog deleted");
    assert!(list.pending_delete().is_none());

    list.settle().await.unwrap();
    assert!(list.rows().is_empty());
}

#[tokio::test]
async fn cancelled_delete_issues_no_request() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;
    let config = config_for(&server);

    Mock::given(method("GET"))
        .and(path("/api/v1/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([blog("b1", "T")]), 1)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/blogs/b1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut list: ListView = ListView::new(&registrar, EntityKind::Blog, &config);
    list.settle().await.unwrap();

    let intent = list.row_action(RowAction::Edit).unwrap();
    assert!(matches!(intent, RowIntent::Edit { ref id, .. } if id == "b1"));

    list.row_action(RowAction::Delete).unwrap();
    list.cancel_delete();
    list.confirm_delete(&Notifier::new()).await.unwrap();
}

#[tokio::test]
async fn debounced_search_issues_one_request() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;
    let config = config_for(&server);

    Mock::given(method("GET"))
        .and(path("/api/v1/courses"))
        .and(query_param("searchTerm", "algo"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    // Only the initial unfiltered read may land here.
    Mock::given(method("GET"))
        .and(path("/api/v1/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 0)))
        .expect(1)
        .mount(&server)
        .await;

    let mut list: ListView = ListView::new(&registrar, EntityKind::Course, &config);
    list.settle().await.unwrap();

    let start = Instant::now();
    for (i, c) in "algo".chars().enumerate() {
        let at = start + Duration::from_millis(120 * i as u64);
        list.push_search_char(c, at);
        list.tick(at);
    }
    assert_eq!(list.search(), "algo");

    let settled = start + Duration::from_millis(120 * 3) + config.search_debounce();
    assert!(list.tick(settled));
    assert_eq!(
        list.params(),
        vec![
            ("searchTerm".to_string(), "algo".to_string()),
            ("page".to_string(), "1".to_string()),
            ("limit".to_string(), "10".to_string()),
        ]
    );
    list.settle().await.unwrap();

    // Nothing new typed: later ticks do not re-issue the read.
    list.tick(settled + Duration::from_secs(2));
}

// ── Dashboard ───────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_reads_totals_and_tolerates_failures() {
    let server = MockServer::start().await;
    let (registrar, _) = signed_in(&server, Role::Admin).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/blogs"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "ok",
            "data": [],
            "meta": { "page": 1, "limit": 1, "total": 42, "totalPage": 42 }
        })))
        .mount(&server)
        .await;

    let dashboard = Dashboard::load(&registrar, Role::SuperAdmin).await;
    assert_eq!(dashboard.total("Students"), Some(42));
    assert_eq!(dashboard.total("Courses"), Some(42));
    assert_eq!(dashboard.total("Blogs"), None);
    assert_eq!(dashboard.values()[0].counter.label, "Students");
    assert!(dashboard.values().iter().any(|v| v.total.is_err()));
}
