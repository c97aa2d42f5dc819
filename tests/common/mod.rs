//! Shared fixtures for the integration tests

#![allow(dead_code)]

use axum_test::TestServer;
use postapi::prelude::*;

/// Bearer token of the regular test user
pub const USER_TOKEN: &str = "user-token";
/// User id behind [`USER_TOKEN`]
pub const USER_ID: &str = "1";
/// Base URL used for pagination links
pub const BASE_URL: &str = "http://localhost:1337";

/// Handles on the collaborators behind a test server
pub struct TestApp {
    pub server: TestServer,
    pub posts: InMemoryEntityStore,
    pub replies: InMemoryEntityStore,
    pub files: InMemoryFileStorage,
}

/// A server over the default posts/replies configuration
pub fn create_test_app() -> TestApp {
    create_test_app_with(ApiConfig::default_config())
}

pub fn create_test_app_with(config: ApiConfig) -> TestApp {
    let posts = InMemoryEntityStore::new("post");
    let replies = InMemoryEntityStore::new("reply");
    let files = InMemoryFileStorage::new(format!("{}/uploads", BASE_URL));

    let app = ServerBuilder::new()
        .with_config(config)
        .with_store("post", posts.clone())
        .with_store("reply", replies.clone())
        .with_file_storage(files.clone())
        .with_auth_provider(
            StaticTokenAuthProvider::new()
                .with_user(USER_TOKEN, USER_ID, &["authenticated"])
                .with_admin("admin-token", "root"),
        )
        .build()
        .expect("Failed to build app");

    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        posts,
        replies,
        files,
    }
}

/// JSON object literal to field map
pub fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("fixture must be an object")
}
