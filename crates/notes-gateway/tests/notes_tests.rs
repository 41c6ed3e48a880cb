//! Note endpoint integration tests.
//!
//! Note routes sit behind the admission pipeline; these tests run with a
//! generous rate limit and focus on ownership, validation and expiry.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use chrono::DateTime;
use gateway_test_utils::*;
use serde_json::{json, Value};

struct Caller<'a> {
    server: &'a TestGatewayServer,
    auth: String,
}

impl<'a> Caller<'a> {
    async fn new(server: &'a TestGatewayServer, username: &str) -> Result<Self> {
        let token = server.register_and_login(username, "s3cret").await?;
        Ok(Self {
            server,
            auth: format!("Bearer {token}"),
        })
    }

    async fn create(&self, body: Value) -> Result<reqwest::Response> {
        Ok(self
            .server
            .client()
            .post(format!("{}/api/notes", self.server.url()))
            .header("Authorization", &self.auth)
            .json(&body)
            .send()
            .await?)
    }

    async fn update(&self, id: &str, body: Value) -> Result<reqwest::Response> {
        Ok(self
            .server
            .client()
            .put(format!("{}/api/notes/{}", self.server.url(), id))
            .header("Authorization", &self.auth)
            .json(&body)
            .send()
            .await?)
    }

    async fn delete(&self, id: &str) -> Result<reqwest::Response> {
        Ok(self
            .server
            .client()
            .delete(format!("{}/api/notes/{}", self.server.url(), id))
            .header("Authorization", &self.auth)
            .send()
            .await?)
    }

    async fn latest(&self) -> Result<Vec<Value>> {
        let response = self
            .server
            .get_with_auth("/api/notes/latest", Some(&self.auth))
            .await?;
        assert_eq!(response.status(), 200);
        Ok(response.json().await?)
    }
}

fn rfc3339(epoch_secs: i64) -> String {
    DateTime::from_timestamp(epoch_secs, 0).unwrap().to_rfc3339()
}

#[tokio::test]
async fn test_create_returns_note() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let alice = Caller::new(&server, "alice").await?;

    let response = alice
        .create(json!({"title": "groceries", "content": "milk", "expiresAt": null}))
        .await?;
    assert_eq!(response.status(), 200);

    let note: Value = response.json().await?;
    assert_eq!(note["title"], "groceries");
    assert_eq!(note["content"], "milk");
    assert_eq!(note["expiresAt"], Value::Null);
    assert!(note["id"].as_str().is_some());
    Ok(())
}

#[tokio::test]
async fn test_latest_is_newest_first_and_per_owner() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let alice = Caller::new(&server, "alice").await?;
    let bob = Caller::new(&server, "bob").await?;

    alice.create(json!({"title": "one", "content": ""})).await?;
    server.clock().advance_secs(1);
    alice.create(json!({"title": "two", "content": ""})).await?;
    bob.create(json!({"title": "bob's", "content": ""})).await?;

    let titles: Vec<_> = alice
        .latest()
        .await?
        .iter()
        .map(|n| n["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["two", "one"]);
    assert_eq!(bob.latest().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_expired_notes_drop_out_of_latest() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let alice = Caller::new(&server, "alice").await?;

    let expires = TEST_START_EPOCH_SECONDS + 100;
    alice
        .create(json!({"title": "short-lived", "content": "", "expiresAt": rfc3339(expires)}))
        .await?;
    alice.create(json!({"title": "forever", "content": ""})).await?;
    assert_eq!(alice.latest().await?.len(), 2);

    server.clock().advance_secs(100);
    let latest = alice.latest().await?;
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0]["title"], "forever");
    Ok(())
}

#[tokio::test]
async fn test_validation_errors() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let alice = Caller::new(&server, "alice").await?;

    let too_long_title = "t".repeat(31);
    let too_long_content = "c".repeat(256);

    for body in [
        json!({"title": "", "content": "c"}),
        json!({"content": "c"}),
        json!({"title": too_long_title, "content": "c"}),
        json!({"title": "ok", "content": too_long_content}),
    ] {
        assert_eq!(alice.create(body).await?.status(), 400);
    }

    let exact = json!({"title": "t".repeat(30), "content": "c".repeat(255)});
    assert_eq!(alice.create(exact).await?.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_update_own_note() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let alice = Caller::new(&server, "alice").await?;

    let created: Value = alice
        .create(json!({"title": "draft", "content": "v1"}))
        .await?
        .json()
        .await?;
    let id = created["id"].as_str().unwrap();

    let response = alice
        .update(id, json!({"title": "final", "content": "v2"}))
        .await?;
    assert_eq!(response.status(), 200);

    let updated: Value = response.json().await?;
    assert_eq!(updated["id"], id);
    assert_eq!(updated["title"], "final");
    assert_eq!(updated["content"], "v2");
    Ok(())
}

#[tokio::test]
async fn test_foreign_notes_are_not_found() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let alice = Caller::new(&server, "alice").await?;
    let bob = Caller::new(&server, "bob").await?;

    let created: Value = alice
        .create(json!({"title": "mine", "content": ""}))
        .await?
        .json()
        .await?;
    let id = created["id"].as_str().unwrap();

    assert_eq!(
        bob.update(id, json!({"title": "stolen", "content": ""}))
            .await?
            .status(),
        404
    );
    assert_eq!(bob.delete(id).await?.status(), 404);

    let latest = alice.latest().await?;
    assert_eq!(latest[0]["title"], "mine");
    Ok(())
}

#[tokio::test]
async fn test_delete_own_note() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let alice = Caller::new(&server, "alice").await?;

    let created: Value = alice
        .create(json!({"title": "temp", "content": ""}))
        .await?
        .json()
        .await?;
    let id = created["id"].as_str().unwrap();

    assert_eq!(alice.delete(id).await?.status(), 204);
    assert_eq!(alice.delete(id).await?.status(), 404);
    assert!(alice.latest().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_note_routes_require_authentication() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/notes", server.url()))
        .json(&json!({"title": "t", "content": "c"}))
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    let response = server.get_with_auth("/api/notes/latest", None).await?;
    assert_eq!(response.status(), 401);
    Ok(())
}
