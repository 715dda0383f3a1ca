mod common;

use common::{spawn_app, token, TestApp};
use notekeeper::auth::TokenKind;
use serde_json::{json, Value};

async fn save_note(app: &TestApp, access_token: &str, body: &Value) -> reqwest::Response {
    app.authorized(app.client.post(&format!("{}/notes", app.address)), access_token)
        .json(body)
        .send()
        .await
        .expect("Failed to execute request.")
}

async fn list_notes(app: &TestApp, access_token: &str) -> Vec<Value> {
    let response = app
        .authorized(app.client.get(&format!("{}/notes", app.address)), access_token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

async fn delete_note(app: &TestApp, access_token: &str, id: &str) -> reqwest::Response {
    app.authorized(
        app.client.delete(&format!("{}/notes/{}", app.address, id)),
        access_token,
    )
    .send()
    .await
    .expect("Failed to execute request.")
}

fn note(title: &str) -> Value {
    json!({ "title": title, "content": "milk, eggs", "color": 4294967295_i64 })
}

#[tokio::test]
async fn notes_require_authentication() {
    let app = spawn_app();

    let response = app
        .client
        .get(&format!("{}/notes", app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "MISSING_TOKEN");

    let response = save_note(&app, "not-a-token", &note("Groceries")).await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_token_is_not_accepted_as_credential() {
    let app = spawn_app();
    let login = app.signed_in_user("alice@example.com").await;

    let response = save_note(&app, &token(&login, "refresh_token"), &note("Groceries")).await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn credential_must_use_custom_header_and_bearer_scheme() {
    let app = spawn_app();
    let login = app.signed_in_user("alice@example.com").await;
    let access_token = token(&login, "access_token");

    let standard_header = app
        .client
        .get(&format!("{}/notes", app.address))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(401, standard_header.status().as_u16());

    let missing_scheme = app
        .client
        .get(&format!("{}/notes", app.address))
        .header("X-Authorization", access_token.as_str())
        .send()
        .await
        .unwrap();
    assert_eq!(401, missing_scheme.status().as_u16());
}

#[tokio::test]
async fn create_list_and_update_own_notes() {
    let app = spawn_app();
    let login = app.signed_in_user("alice@example.com").await;
    let access_token = token(&login, "access_token");

    let response = save_note(&app, &access_token, &note("Groceries")).await;
    assert_eq!(200, response.status().as_u16());
    let created: Value = response.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 32);
    assert_eq!(created["title"], "Groceries");
    assert_eq!(created["color"], 4294967295_i64);

    let update = json!({ "id": id, "title": "Groceries (updated)", "content": "bread", "color": 1 });
    let response = save_note(&app, &access_token, &update).await;
    assert_eq!(200, response.status().as_u16());

    let notes = list_notes(&app, &access_token).await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["id"], id.as_str());
    assert_eq!(notes[0]["title"], "Groceries (updated)");
    assert_eq!(notes[0]["content"], "bread");
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let app = spawn_app();
    let login = app.signed_in_user("alice@example.com").await;

    let response = save_note(&app, &token(&login, "access_token"), &note("   ")).await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn users_cannot_see_or_touch_each_others_notes() {
    let app = spawn_app();
    let alice = token(&app.signed_in_user("alice@example.com").await, "access_token");
    let mallory = token(&app.signed_in_user("mallory@example.com").await, "access_token");

    let created: Value = save_note(&app, &alice, &note("Secret")).await.json().await.unwrap();
    let id = created["id"].as_str().unwrap();

    assert!(list_notes(&app, &mallory).await.is_empty());

    let hijack = json!({ "id": id, "title": "Mine now", "content": "", "color": 0 });
    assert_eq!(404, save_note(&app, &mallory, &hijack).await.status().as_u16());
    assert_eq!(404, delete_note(&app, &mallory, id).await.status().as_u16());

    let notes = list_notes(&app, &alice).await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["title"], "Secret");
}

#[tokio::test]
async fn delete_own_note() {
    let app = spawn_app();
    let access_token = token(&app.signed_in_user("alice@example.com").await, "access_token");
    let created: Value = save_note(&app, &access_token, &note("Groceries")).await.json().await.unwrap();
    let id = created["id"].as_str().unwrap();

    assert_eq!(204, delete_note(&app, &access_token, id).await.status().as_u16());
    assert_eq!(404, delete_note(&app, &access_token, id).await.status().as_u16());
    assert!(list_notes(&app, &access_token).await.is_empty());
}

#[tokio::test]
async fn malformed_note_id_is_rejected() {
    let app = spawn_app();
    let access_token = token(&app.signed_in_user("alice@example.com").await, "access_token");

    assert_eq!(400, delete_note(&app, &access_token, "not-an-id").await.status().as_u16());
}

#[tokio::test]
async fn access_token_for_forged_subject_is_ignored() {
    let app = spawn_app();
    let forged = app.codec.issue_access_token("not-a-user-id").unwrap();
    assert!(app.codec.verify(&forged, TokenKind::Access).is_some());

    let response = app
        .authorized(app.client.get(&format!("{}/notes", app.address)), &forged)
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}
