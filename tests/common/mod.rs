use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub const PASSWORD: &str = "Passw0rd!";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // In-memory store and object storage, no AI key, no mail relay
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_edulearn-api"));
        cmd.env("PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("DATABASE_URL", "")
            .env("STORAGE_PROVIDER", "memory")
            .env("GEMINI_API_KEY", "")
            .env("EMAIL_API_URL", "")
            .env("JWT_SECRET", "integration-test-secret")
            .env("BCRYPT_COST", "4")
            .env("API_ENABLE_RATE_LIMITING", "false")
            .env("ENABLE_KEEP_ALIVE", "false")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

/// Register a fresh teacher and return its bearer token
#[allow(dead_code)]
pub async fn register_teacher(server: &TestServer, client: &reqwest::Client) -> Result<String> {
    let email = format!("teacher-{}@school.test", uuid::Uuid::new_v4().simple());
    let res = client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "name": "Test Teacher", "email": email, "password": PASSWORD }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

    let body: Value = res.json().await?;
    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .context("register response has no token")
}

/// Create a standard with one division; returns (standard id, division id)
#[allow(dead_code)]
pub async fn create_class(server: &TestServer, client: &reqwest::Client, token: &str) -> Result<(String, String)> {
    let standard: Value = client
        .post(server.url("/api/standards"))
        .bearer_auth(token)
        .json(&json!({ "name": "6th Standard", "subjects": ["Maths", "Science"] }))
        .send()
        .await?
        .json()
        .await?;
    let standard_id = standard["data"]["id"].as_str().context("standard id")?.to_string();

    let division: Value = client
        .post(server.url("/api/divisions"))
        .bearer_auth(token)
        .json(&json!({ "name": "a", "standardId": standard_id }))
        .send()
        .await?
        .json()
        .await?;
    let division_id = division["data"]["id"].as_str().context("division id")?.to_string();

    Ok((standard_id, division_id))
}

/// Create one student in the division and return its id
#[allow(dead_code)]
pub async fn create_student(
    server: &TestServer,
    client: &reqwest::Client,
    token: &str,
    standard_id: &str,
    division_id: &str,
    name: &str,
) -> Result<String> {
    let student: Value = client
        .post(server.url("/api/students"))
        .bearer_auth(token)
        .json(&json!({ "name": name, "standardId": standard_id, "divisionId": division_id }))
        .send()
        .await?
        .json()
        .await?;
    student["data"]["id"]
        .as_str()
        .map(str::to_string)
        .context("student id")
}
