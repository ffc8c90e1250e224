pub mod rest;

use std::{path::Path, str::FromStr as _, time::Duration};

use anyhow::{anyhow, Result};
use kritika_app::{
    mail::{Mailer, Outbox},
    state::AppState,
};
use kritika_dal::user::{CreateUser, User, UserRepository};
use kritika_server::config::{Parser, ServerConfig};
use kritika_types::{
    claim::Role,
    general::{ValidEmail, ValidUsername},
};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let args = &[
        "kritika-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    test_config(test_name, &base_dir)
}

pub struct TestEnv {
    pub base_url: Url,
    pub state: AppState,
    pub outbox: Outbox,
    server: tokio::task::JoinHandle<()>,
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub async fn launch_env(args: ServerConfig) -> Result<TestEnv> {
    let (mailer, outbox) = Mailer::memory();
    launch_env_with_mailer(args, mailer, outbox).await
}

pub async fn launch_env_with_mailer(
    args: ServerConfig,
    mailer: Mailer,
    outbox: Outbox,
) -> Result<TestEnv> {
    let base_url = Url::parse(&format!("http://127.0.0.1:{}/", args.port))?;
    let state = kritika_server::build_state_with_mailer(&args, mailer).await?;

    let server_state = state.clone();
    let server = tokio::spawn(async move {
        if let Err(e) =
            kritika_server::run::run_graceful_with_state(args, server_state, futures::future::pending())
                .await
        {
            tracing::error!("Test server failed: {e}");
        }
    });

    let env = TestEnv {
        base_url,
        state,
        outbox,
        server,
    };
    wait_for_health(&env.base_url).await?;
    Ok(env)
}

async fn wait_for_health(base_url: &Url) -> Result<()> {
    let client = reqwest::Client::new();
    let url = base_url.join("health")?;
    for _ in 0..100 {
        if let Ok(response) = client.get(url.clone()).send().await {
            if response.status().is_success() {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(anyhow!("Server did not become healthy"))
}

pub fn client_with_token(token: &str) -> reqwest::Client {
    let mut headers = reqwest::header::HeaderMap::new();
    let value = format!("Bearer {token}")
        .parse()
        .expect("Invalid header value");
    headers.insert(reqwest::header::AUTHORIZATION, value);
    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .expect("Failed to build client")
}

/// Creates a user straight in the store and returns an authenticated client,
/// sidestepping the signup flow for tests that are not about it.
pub async fn spawn_user(
    env: &TestEnv,
    username: &str,
    role: Role,
    superuser: bool,
) -> Result<(User, reqwest::Client)> {
    let repository = UserRepository::new(env.state.pool().clone());
    let user = repository
        .create(CreateUser {
            username: ValidUsername::from_str(username)?,
            email: ValidEmail::from_str(&format!("{username}@example.com"))?,
            role: Some(role),
            superuser: Some(superuser),
            bio: None,
        })
        .await?;
    let pair = env
        .state
        .tokens()
        .issue_pair(user.id, &user.username, user.role, user.is_superuser)?;
    Ok((user, client_with_token(&pair.access_token)))
}

/// Latest confirmation code mailed to the address, if any.
pub fn confirmation_code_for(outbox: &Outbox, email: &str) -> Option<String> {
    outbox
        .lock()
        .unwrap()
        .iter()
        .rev()
        .find(|m| m.recipients.iter().any(|r| r == email))
        .and_then(|m| m.body.strip_prefix("Confirmation code: "))
        .map(|code| code.trim().to_string())
}
