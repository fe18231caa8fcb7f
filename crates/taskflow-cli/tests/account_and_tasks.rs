//! Account and task commands against a mock backend.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Creates a temp TASKFLOW_HOME directory for test isolation.
fn temp_taskflow_home() -> TempDir {
    TempDir::new().expect("create temp taskflow home")
}

fn session_json(access: &str, refresh: &str) -> Value {
    json!({
        "user": {"id": "u1", "email": "ada@example.com", "name": "Ada"},
        "accessToken": access,
        "refreshToken": refresh,
    })
}

fn write_credentials(home: &Path, access: &str, refresh: &str) {
    let record = json!({"session": session_json(access, refresh)});
    fs::write(home.join("credentials.json"), record.to_string()).unwrap();
}

fn read_credentials(home: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(home.join("credentials.json")).unwrap()).unwrap()
}

#[tokio::test]
async fn test_login_whoami_list_logout() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_taskflow_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "ada@example.com", "password": "secret1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json("tok1", "ref1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/task"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "t1", "title": "Buy milk", "dueDate": "2020-01-01T09:00:00Z", "completed": true},
            {"_id": "t2", "title": "Ship it", "dueDate": "2020-01-01T09:00:00Z", "completed": false},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("taskflow")
        .env("TASKFLOW_HOME", home.path())
        .env("TASKFLOW_API_BASE_URL", server.uri())
        .args(["login", "--email", "ada@example.com"])
        .write_stdin("secret1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as Ada <ada@example.com>"));

    assert_eq!(
        read_credentials(home.path())["session"]["accessToken"],
        "tok1"
    );

    cargo_bin_cmd!("taskflow")
        .env("TASKFLOW_HOME", home.path())
        .env("TASKFLOW_API_BASE_URL", server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada <ada@example.com>"));

    cargo_bin_cmd!("taskflow")
        .env("TASKFLOW_HOME", home.path())
        .env("TASKFLOW_API_BASE_URL", server.uri())
        .args(["tasks", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[x] t1  Buy milk"))
        .stdout(predicate::str::contains("[ ] t2  Ship it"))
        .stdout(predicate::str::contains("overdue"))
        .stdout(predicate::str::contains(
            "2 tasks: 1 completed, 1 pending, 1 overdue (50% done)",
        ));

    cargo_bin_cmd!("taskflow")
        .env("TASKFLOW_HOME", home.path())
        .env("TASKFLOW_API_BASE_URL", server.uri())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));

    assert!(read_credentials(home.path()).get("session").is_none());
}

#[tokio::test]
async fn test_register_then_verify() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_taskflow_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "OTP sent"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verify"))
        .and(body_json(json!({"email": "ada@example.com", "otp": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json("tok1", "ref1")))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("taskflow")
        .env("TASKFLOW_HOME", home.path())
        .env("TASKFLOW_API_BASE_URL", server.uri())
        .args(["register", "--name", "Ada", "--email", "ada@example.com"])
        .write_stdin("secret1\nsecret1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("OTP sent"))
        .stdout(predicate::str::contains("taskflow verify"));

    assert_eq!(
        read_credentials(home.path())["pendingSignupEmail"],
        "ada@example.com"
    );

    cargo_bin_cmd!("taskflow")
        .env("TASKFLOW_HOME", home.path())
        .env("TASKFLOW_API_BASE_URL", server.uri())
        .args(["verify", "123456"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome, Ada!"));

    let credentials = read_credentials(home.path());
    assert_eq!(credentials["session"]["refreshToken"], "ref1");
    assert!(credentials.get("pendingSignupEmail").is_none());
}

#[tokio::test]
async fn test_register_rejects_short_password_locally() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_taskflow_home();
    let server = MockServer::start().await;

    cargo_bin_cmd!("taskflow")
        .env("TASKFLOW_HOME", home.path())
        .env("TASKFLOW_API_BASE_URL", server.uri())
        .args([
            "register",
            "--name",
            "Ada",
            "--email",
            "ada@example.com",
            "--password",
            "abc",
            "--confirm-password",
            "abc",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 6 characters"));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_session_is_cleared() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_taskflow_home();
    let server = MockServer::start().await;
    write_credentials(home.path(), "tok1", "ref1");

    Mock::given(method("GET"))
        .and(path("/task"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": "ref1"})))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("taskflow")
        .env("TASKFLOW_HOME", home.path())
        .env("TASKFLOW_API_BASE_URL", server.uri())
        .args(["tasks", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session expired, please log in again"));

    assert!(read_credentials(home.path()).get("session").is_none());
}

#[tokio::test]
async fn test_add_task_with_relative_due() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_taskflow_home();
    let server = MockServer::start().await;
    write_credentials(home.path(), "tok1", "ref1");

    Mock::given(method("POST"))
        .and(path("/task"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "t7",
            "title": "Call mom",
            "dueDate": "2099-01-01T09:00:00Z",
            "completed": false,
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("taskflow")
        .env("TASKFLOW_HOME", home.path())
        .env("TASKFLOW_API_BASE_URL", server.uri())
        .args(["tasks", "add", "--title", "Call mom", "--due", "+2h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added [ ] t7  Call mom"));
}

#[test]
fn test_tasks_require_login() {
    let home = temp_taskflow_home();

    cargo_bin_cmd!("taskflow")
        .env("TASKFLOW_HOME", home.path())
        .env("TASKFLOW_API_BASE_URL", "http://127.0.0.1:9")
        .args(["tasks", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}
