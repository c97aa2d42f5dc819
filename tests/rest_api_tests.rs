//! End-to-end tests of the REST surface, driven through axum-test

mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use common::*;
use postapi::prelude::*;
use serde_json::json;

// =============================================================================
// Health Check Tests
// =============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = create_test_app();

        for path in ["/health", "/healthz"] {
            let response = app.server.get(path).await;
            response.assert_status_ok();

            let body: Value = response.json();
            assert_eq!(body["status"], "ok");
            assert_eq!(body["service"], "postapi");
        }
    }
}

// =============================================================================
// Authorization Tests
// =============================================================================

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_unauthenticated_create_is_forbidden() {
        let app = create_test_app();

        let response = app
            .server
            .post("/posts")
            .json(&json!({"text": "anonymous"}))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["message"], "Forbidden");
        assert_eq!(app.posts.count(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let app = create_test_app();

        let response = app
            .server
            .get("/posts")
            .authorization_bearer("forged")
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_public_policy_allows_anonymous_list() {
        let mut config = ApiConfig::default_config();
        config.resources[0].auth.list = "public".to_string();
        let app = create_test_app_with(config);

        app.server.get("/posts").await.assert_status_ok();
        app.server
            .get("/replies")
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_role_policy() {
        let mut config = ApiConfig::default_config();
        config.resources[0].auth.delete = "admin_only".to_string();
        let app = create_test_app_with(config);
        let post = app.posts.create(fields(json!({"text": "x"}))).await.unwrap();

        app.server
            .delete(&format!("/posts/{}", post.id))
            .authorization_bearer(USER_TOKEN)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        app.server
            .delete(&format!("/posts/{}", post.id))
            .authorization_bearer("admin-token")
            .await
            .assert_status_ok();
    }
}

// =============================================================================
// Create / Read / Update Tests
// =============================================================================

mod crud_tests {
    use super::*;

    #[tokio::test]
    async fn test_authenticated_create_returns_sanitized_entity() {
        let app = create_test_app();

        let response = app
            .server
            .post("/posts")
            .authorization_bearer(USER_TOKEN)
            .json(&json!({
                "text": "Hello world",
                "author": {"id": 1, "username": "ada", "role": {"id": 1}, "wallet_balance": 20},
                "created_at": "1970-01-01"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["text"], "Hello world");
        assert!(body["id"].as_str().is_some());
        assert!(body.get("created_at").is_none());
        assert!(body.get("updated_at").is_none());
        assert_eq!(body["author"], json!({"id": 1, "username": "ada"}));
    }

    #[tokio::test]
    async fn test_create_missing_required_field() {
        let app = create_test_app();

        let response = app
            .server
            .post("/replies")
            .authorization_bearer(USER_TOKEN)
            .json(&json!({"post_id": "abc"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"]["messages"][0]["field"], "text");
        assert_eq!(
            body["details"]["messages"][0]["id"],
            "reply.form.error.text.required"
        );
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_body() {
        let app = create_test_app();

        app.server
            .post("/posts")
            .authorization_bearer(USER_TOKEN)
            .json(&json!(["text"]))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let app = create_test_app();
        let post = app
            .posts
            .create(fields(json!({"text": "stored", "hash": "internal"})))
            .await
            .unwrap();

        let response = app
            .server
            .get(&format!("/posts/{}", post.id))
            .authorization_bearer(USER_TOKEN)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["id"], post.id.to_string());
        assert_eq!(body["text"], "stored");
        assert!(body.get("hash").is_none());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let app = create_test_app();

        let response = app
            .server
            .get(&format!("/posts/{}", Uuid::new_v4()))
            .authorization_bearer(USER_TOKEN)
            .await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["code"], "ENTITY_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_get_invalid_id_is_bad_request() {
        let app = create_test_app();

        app.server
            .get("/posts/42")
            .authorization_bearer(USER_TOKEN)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let app = create_test_app();
        let post = app
            .posts
            .create(fields(json!({"text": "before", "likes": ["3"]})))
            .await
            .unwrap();

        let response = app
            .server
            .put(&format!("/posts/{}", post.id))
            .authorization_bearer(USER_TOKEN)
            .json(&json!({"text": "after", "id": "ignored"}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["id"], post.id.to_string());
        assert_eq!(body["text"], "after");
        assert_eq!(body["likes"], json!(["3"]));
    }

    #[tokio::test]
    async fn test_update_cannot_clear_required_field() {
        let app = create_test_app();
        let post = app.posts.create(fields(json!({"text": "x"}))).await.unwrap();

        app.server
            .put(&format!("/posts/{}", post.id))
            .authorization_bearer(USER_TOKEN)
            .json(&json!({"text": null}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

// =============================================================================
// List / Pagination Tests
// =============================================================================

mod list_tests {
    use super::*;

    async fn seed_posts(app: &TestApp, n: usize) {
        for i in 0..n {
            app.posts
                .create(fields(json!({"text": format!("post {}", i), "size": 99})))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_default_window() {
        let app = create_test_app();
        seed_posts(&app, 12).await;

        let response = app
            .server
            .get("/posts")
            .authorization_bearer(USER_TOKEN)
            .await;

        response.assert_status_ok();
        let page: PageEnvelope<Value> = response.json();
        assert_eq!(page.count, 12);
        assert_eq!(page.data.len(), 5);
        assert!(page.previous.is_none());
        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost:1337/posts?_start=5&_limit=5")
        );
        assert_eq!(page.data[0]["text"], "post 0");
        assert!(page.data[0].get("size").is_none());
    }

    #[tokio::test]
    async fn test_middle_and_last_windows() {
        let app = create_test_app();
        seed_posts(&app, 12).await;

        let middle: PageEnvelope<Value> = app
            .server
            .get("/posts")
            .add_query_param("_start", 5)
            .add_query_param("_limit", 5)
            .authorization_bearer(USER_TOKEN)
            .await
            .json();
        assert_eq!(
            middle.next.as_deref(),
            Some("http://localhost:1337/posts?_start=10&_limit=5")
        );
        assert_eq!(
            middle.previous.as_deref(),
            Some("http://localhost:1337/posts?_start=0&_limit=5")
        );

        let last: PageEnvelope<Value> = app
            .server
            .get("/posts")
            .add_query_param("_start", 10)
            .add_query_param("_limit", 5)
            .authorization_bearer(USER_TOKEN)
            .await
            .json();
        assert!(last.next.is_none());
        assert_eq!(last.data.len(), 2);
        assert_eq!(last.count, 12);
    }

    #[tokio::test]
    async fn test_unusable_params_fall_back_to_defaults() {
        let app = create_test_app();
        seed_posts(&app, 7).await;

        let page: PageEnvelope<Value> = app
            .server
            .get("/posts")
            .add_query_param("_start", "abc")
            .add_query_param("_limit", 0)
            .authorization_bearer(USER_TOKEN)
            .await
            .json();
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data[0]["text"], "post 0");
    }

    #[tokio::test]
    async fn test_filter_replies_by_post() {
        let app = create_test_app();
        let post = app.posts.create(fields(json!({"text": "parent"}))).await.unwrap();
        let other = Uuid::new_v4();
        for i in 0..3 {
            app.replies
                .create(fields(json!({"text": format!("r{}", i), "post_id": post.id})))
                .await
                .unwrap();
        }
        app.replies
            .create(fields(json!({"text": "elsewhere", "post_id": other})))
            .await
            .unwrap();

        let page: PageEnvelope<Value> = app
            .server
            .get("/replies")
            .add_query_param("post_id", post.id)
            .authorization_bearer(USER_TOKEN)
            .await
            .json();

        assert_eq!(page.count, 3);
        assert!(page.data.iter().all(|r| r["post_id"] == post.id.to_string()));
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn test_search() {
        let app = create_test_app();
        seed_posts(&app, 3).await;
        app.posts
            .create(fields(json!({"text": "Learning Rust"})))
            .await
            .unwrap();

        let page: PageEnvelope<Value> = app
            .server
            .get("/posts")
            .add_query_param("_q", "rust")
            .authorization_bearer(USER_TOKEN)
            .await
            .json();

        assert_eq!(page.count, 1);
        assert_eq!(page.data[0]["text"], "Learning Rust");
    }

    #[tokio::test]
    async fn test_configured_default_limit() {
        let mut config = ApiConfig::default_config();
        config.default_limit = 2;
        let app = create_test_app_with(config);
        seed_posts(&app, 3).await;

        let page: PageEnvelope<Value> = app
            .server
            .get("/posts")
            .authorization_bearer(USER_TOKEN)
            .await
            .json();
        assert_eq!(page.data.len(), 2);
        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost:1337/posts?_start=2&_limit=2")
        );
    }
}

// =============================================================================
// Like Toggle Tests
// =============================================================================

mod like_tests {
    use super::*;

    async fn like(app: &TestApp, id: Uuid, user: &str, liked: bool) -> Value {
        let response = app
            .server
            .put(&format!("/posts/{}/like/{}", id, user))
            .authorization_bearer(USER_TOKEN)
            .json(&json!({"liked": liked}))
            .await;
        response.assert_status_ok();
        response.json()
    }

    #[tokio::test]
    async fn test_like_twice_does_not_duplicate() {
        let app = create_test_app();
        let post = app.posts.create(fields(json!({"text": "likeable"}))).await.unwrap();

        let first = like(&app, post.id, "7", true).await;
        assert_eq!(first["likes"], json!(["7"]));

        let second = like(&app, post.id, "7", true).await;
        assert_eq!(second["likes"], json!(["7"]));
    }

    #[tokio::test]
    async fn test_unlike() {
        let app = create_test_app();
        let post = app
            .posts
            .create(fields(json!({"text": "liked", "likes": ["7", "8"]})))
            .await
            .unwrap();

        let body = like(&app, post.id, "7", false).await;
        assert_eq!(body["likes"], json!(["8"]));

        let again = like(&app, post.id, "7", false).await;
        assert_eq!(again["likes"], json!(["8"]));
    }

    #[tokio::test]
    async fn test_like_reply() {
        let app = create_test_app();
        let reply = app.replies.create(fields(json!({"text": "r"}))).await.unwrap();

        let response = app
            .server
            .put(&format!("/replies/{}/like/{}", reply.id, USER_ID))
            .authorization_bearer(USER_TOKEN)
            .json(&json!({"liked": true}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["likes"], json!([USER_ID]));
    }

    #[tokio::test]
    async fn test_like_missing_record() {
        let app = create_test_app();

        app.server
            .put(&format!("/posts/{}/like/7", Uuid::new_v4()))
            .authorization_bearer(USER_TOKEN)
            .json(&json!({"liked": true}))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_like_requires_boolean() {
        let app = create_test_app();
        let post = app.posts.create(fields(json!({"text": "x"}))).await.unwrap();

        app.server
            .put(&format!("/posts/{}/like/7", post.id))
            .authorization_bearer(USER_TOKEN)
            .json(&json!({"liked": "yes"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_like_route_absent_when_disabled() {
        let mut config = ApiConfig::default_config();
        config.resources[0].likes = false;
        let app = create_test_app_with(config);
        let post = app.posts.create(fields(json!({"text": "x"}))).await.unwrap();

        app.server
            .put(&format!("/posts/{}/like/7", post.id))
            .authorization_bearer(USER_TOKEN)
            .json(&json!({"liked": true}))
            .await
            .assert_status_not_found();
    }
}

// =============================================================================
// Delete With Cascade Tests
// =============================================================================

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_removes_attachments_and_replies() {
        let app = create_test_app();
        let file = app.files.upload("a.png", "image/png", vec![1, 2]).await.unwrap();
        let reply = app.replies.create(fields(json!({"text": "child"}))).await.unwrap();
        let post = app
            .posts
            .create(fields(json!({
                "text": "parent",
                "attachments": [file.to_value()],
                "replies": [{"id": reply.id}]
            })))
            .await
            .unwrap();

        let response = app
            .server
            .delete(&format!("/posts/{}", post.id))
            .authorization_bearer(USER_TOKEN)
            .await;

        response.assert_status_ok();
        let report: CascadeReport = response.json();
        assert_eq!(
            report.message,
            "posts and all its attachments and replies have been deleted"
        );
        assert_eq!(report.id, post.id);
        assert!(report.failures.is_empty());

        assert!(app.posts.find_one(&post.id).await.unwrap().is_none());
        assert!(app.replies.find_one(&reply.id).await.unwrap().is_none());
        assert!(!app.files.contains(&file.id));
    }

    #[tokio::test]
    async fn test_failed_attachment_is_reported_not_fatal() {
        let app = create_test_app();
        let present = app.files.upload("b.png", "image/png", vec![3]).await.unwrap();
        let mut missing = present.clone();
        missing.id = Uuid::new_v4();

        let post = app
            .posts
            .create(fields(json!({
                "text": "parent",
                "attachments": [missing.to_value(), present.to_value()]
            })))
            .await
            .unwrap();

        let response = app
            .server
            .delete(&format!("/posts/{}", post.id))
            .authorization_bearer(USER_TOKEN)
            .await;

        response.assert_status_ok();
        let report: CascadeReport = response.json();
        assert_eq!(
            report.message,
            "posts and all its attachments and replies have been deleted"
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].target, missing.id.to_string());
        assert!(!app.files.contains(&present.id));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let app = create_test_app();

        app.server
            .delete(&format!("/posts/{}", Uuid::new_v4()))
            .authorization_bearer(USER_TOKEN)
            .await
            .assert_status_not_found();
    }
}

// =============================================================================
// Multipart Upload Tests
// =============================================================================

mod upload_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_with_attachments() {
        let app = create_test_app();

        let form = MultipartForm::new()
            .add_text("data", json!({"text": "with picture"}).to_string())
            .add_part(
                "files.attachments",
                Part::bytes(vec![0x89, 0x50, 0x4e, 0x47])
                    .file_name("picture.png")
                    .mime_type("image/png"),
            );

        let response = app
            .server
            .post("/posts")
            .authorization_bearer(USER_TOKEN)
            .multipart(form)
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["text"], "with picture");

        let attachment = &body["attachments"][0];
        assert_eq!(attachment["name"], "picture.png");
        assert_eq!(attachment["mime"], "image/png");
        assert!(attachment["url"].as_str().unwrap().ends_with(".png"));
        assert!(attachment.get("hash").is_none());
        assert!(attachment.get("size").is_none());
        assert_eq!(app.files.len(), 1);
    }

    #[tokio::test]
    async fn test_update_appends_attachments() {
        let app = create_test_app();
        let existing = app.files.upload("old.txt", "text/plain", vec![1]).await.unwrap();
        let post = app
            .posts
            .create(fields(json!({"text": "x", "attachments": [existing.to_value()]})))
            .await
            .unwrap();

        let form = MultipartForm::new().add_part(
            "files.attachments",
            Part::text("new content").file_name("new.txt"),
        );

        let response = app
            .server
            .put(&format!("/posts/{}", post.id))
            .authorization_bearer(USER_TOKEN)
            .multipart(form)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let names: Vec<&str> = body["attachments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["old.txt", "new.txt"]);
    }

    #[tokio::test]
    async fn test_anonymous_upload_stores_nothing() {
        let app = create_test_app();

        let form = MultipartForm::new()
            .add_text("data", json!({"text": "nope"}).to_string())
            .add_part("files.attachments", Part::bytes(vec![1]).file_name("x.bin"));

        app.server
            .post("/posts")
            .multipart(form)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        assert!(app.files.is_empty());
    }
}
