use super::api_path;
use axum_test::TestServer;
use serde_json::{json, Value};

pub const TEST_PASSWORD: &str = "TestPassword123!";

/// A registered account and its bearer token
pub struct TestUser {
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Register `email` with [`TEST_PASSWORD`] and return its token.
pub async fn register_test_user(client: &TestServer, name: &str, email: &str) -> TestUser {
    let response = client
        .post(&api_path("/auth/register"))
        .json(&json!({
            "name": name,
            "email": email,
            "password": TEST_PASSWORD,
        }))
        .await;
    assert_eq!(response.status_code(), 201, "register failed: {}", response.text());

    let body: Value = response.json();
    TestUser {
        email: body["user"]["email"].as_str().unwrap().to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}
