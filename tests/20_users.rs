mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, PASSWORD};
use finance_tracker_api::config::BootstrapAdmin;
use finance_tracker_api::database::RecordFilter;
use finance_tracker_api::database::{ExpenseStore, IncomeStore};
use finance_tracker_api::services::UserService;
use finance_tracker_api::types::Role;

#[tokio::test]
async fn sign_up_creates_plain_user() -> Result<()> {
    let app = TestApp::new();

    let res = app
        .post(
            "/v1/users",
            None,
            &json!({"username": "dave", "email": "dave@example.com", "password": "s3cure-pass"}),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["username"], "dave");
    assert_eq!(res.body["role"], "USER");
    assert!(res.body["id"].is_i64());
    assert!(res.body["createdAt"].is_string());
    assert!(res.body.get("password").is_none());
    assert!(res.body.get("passwordHash").is_none());

    let login = app
        .post("/v1/auth/login", None, &json!({"username": "dave", "password": "s3cure-pass"}))
        .await;
    assert_eq!(login.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn sign_up_ignores_requested_role() -> Result<()> {
    let app = TestApp::new();

    let res = app
        .post(
            "/v1/users",
            None,
            &json!({"username": "eve", "email": "eve@example.com", "password": "s3cure-pass", "role": "ADMIN"}),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["role"], "USER");
    Ok(())
}

#[tokio::test]
async fn sign_up_rejects_duplicates() -> Result<()> {
    let app = TestApp::new();
    app.seed_user("alice", Role::User).await;

    let same_name = app
        .post(
            "/v1/users",
            None,
            &json!({"username": "alice", "email": "other@example.com", "password": "s3cure-pass"}),
        )
        .await;
    let same_email = app
        .post(
            "/v1/users",
            None,
            &json!({"username": "alice2", "email": "ALICE@example.com", "password": "s3cure-pass"}),
        )
        .await;

    assert_eq!(same_name.status, StatusCode::CONFLICT);
    assert_eq!(same_name.body["error"], "Conflict");
    assert_eq!(same_email.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn sign_up_validation_errors_name_each_field() -> Result<()> {
    let app = TestApp::new();

    let res = app
        .post("/v1/users", None, &json!({"username": "ab", "email": "not-an-email", "password": "short"}))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "Validation failed");
    assert_eq!(res.body["path"], "/v1/users");
    let errors = res.body["validationErrors"].as_array().unwrap();
    let fields: Vec<&str> = errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert_eq!(fields, vec!["email", "password", "username"]);
    assert_eq!(errors[2]["message"], "Username must be between 3 and 50 characters");
    Ok(())
}

#[tokio::test]
async fn listing_users_is_admin_only() -> Result<()> {
    let app = TestApp::new();
    let (_, user_token) = app.user_with_token("alice", Role::User).await;
    let (_, admin_token) = app.user_with_token("root", Role::Admin).await;

    assert_eq!(app.get("/v1/users", None).await.status, StatusCode::UNAUTHORIZED);

    let forbidden = app.get("/v1/users", Some(&user_token)).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.body["status"], 403);
    assert_eq!(forbidden.body["error"], "Forbidden");

    let res = app.get("/v1/users", Some(&admin_token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body.as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn users_see_only_themselves() -> Result<()> {
    let app = TestApp::new();
    let (alice, alice_token) = app.user_with_token("alice", Role::User).await;
    let bob = app.seed_user("bob", Role::User).await;
    let (_, admin_token) = app.user_with_token("root", Role::Admin).await;

    let own = app.get(&format!("/v1/users/{}", alice.id), Some(&alice_token)).await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["email"], "alice@example.com");

    let other = app.get(&format!("/v1/users/{}", bob.id), Some(&alice_token)).await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);

    let as_admin = app.get(&format!("/v1/users/{}", bob.id), Some(&admin_token)).await;
    assert_eq!(as_admin.status, StatusCode::OK);

    let missing = app.get("/v1/users/9999", Some(&admin_token)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["path"], "/v1/users/9999");
    Ok(())
}

#[tokio::test]
async fn user_updates_profile_but_not_role() -> Result<()> {
    let app = TestApp::new();
    let (alice, token) = app.user_with_token("alice", Role::User).await;
    let uri = format!("/v1/users/{}", alice.id);

    let res = app.put(&uri, Some(&token), &json!({"email": "alice@new.example.com"})).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["email"], "alice@new.example.com");
    assert_eq!(res.body["username"], "alice");

    let res = app.put(&uri, Some(&token), &json!({"role": "ADMIN"})).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    // sending the current role is not a change
    let res = app.put(&uri, Some(&token), &json!({"role": "USER"})).await;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn password_change_takes_effect() -> Result<()> {
    let app = TestApp::new();
    let (alice, token) = app.user_with_token("alice", Role::User).await;

    let res = app
        .put(&format!("/v1/users/{}", alice.id), Some(&token), &json!({"password": "brand-new-pass"}))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let old = app
        .post("/v1/auth/login", None, &json!({"username": "alice", "password": PASSWORD}))
        .await;
    let new = app
        .post("/v1/auth/login", None, &json!({"username": "alice", "password": "brand-new-pass"}))
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    assert_eq!(new.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn admin_promotes_user() -> Result<()> {
    let app = TestApp::new();
    let alice = app.seed_user("alice", Role::User).await;
    let (_, admin_token) = app.user_with_token("root", Role::Admin).await;

    let res = app
        .put(&format!("/v1/users/{}", alice.id), Some(&admin_token), &json!({"role": "ADMIN"}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["role"], "ADMIN");

    let login = app
        .post("/v1/auth/login", None, &json!({"username": "alice", "password": PASSWORD}))
        .await;
    assert_eq!(login.body["role"], "ADMIN");
    Ok(())
}

#[tokio::test]
async fn rename_to_taken_username_conflicts() -> Result<()> {
    let app = TestApp::new();
    let (alice, token) = app.user_with_token("alice", Role::User).await;
    app.seed_user("bob", Role::User).await;

    let res = app
        .put(&format!("/v1/users/{}", alice.id), Some(&token), &json!({"username": "bob"}))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn deleting_user_removes_their_records() -> Result<()> {
    let app = TestApp::new();
    let (alice, token) = app.user_with_token("alice", Role::User).await;
    let (_, admin_token) = app.user_with_token("root", Role::Admin).await;
    let food = app.seed_category("Food", None).await;

    let res = app
        .post(
            "/v1/expenses",
            Some(&token),
            &json!({"amount": 10.0, "date": "2024-05-01", "categoryId": food.id}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let res = app
        .post(
            "/v1/incomes",
            Some(&token),
            &json!({"amount": 2500.0, "source": "ACME", "date": "2024-05-31"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = app.delete(&format!("/v1/users/{}", alice.id), Some(&admin_token)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(res.body, serde_json::Value::Null);

    let filter = RecordFilter { user_id: Some(alice.id), ..Default::default() };
    assert!(app.state.store.list_expenses(&filter).await?.is_empty());
    assert!(app.state.store.list_incomes(&filter).await?.is_empty());

    let again = app.delete(&format!("/v1/users/{}", alice.id), Some(&admin_token)).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn bootstrap_admin_is_created_once() -> Result<()> {
    let app = TestApp::new();
    let admin = BootstrapAdmin {
        username: "admin".into(),
        email: "admin@example.com".into(),
        password: "admin-password".into(),
    };
    let service = UserService::new(&app.state);

    let created = service.bootstrap_admin(&admin).await?.expect("created");
    assert_eq!(created.role, Role::Admin);
    assert!(service.bootstrap_admin(&admin).await?.is_none());

    let login = app
        .post("/v1/auth/login", None, &json!({"username": "admin", "password": "admin-password"}))
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["role"], "ADMIN");
    Ok(())
}
