pub mod rest;

use std::{path::Path, time::Duration};

use anyhow::{Context as _, Result, anyhow};
use rand::Rng as _;
use reqwest::{
    Url,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde_json::json;
use tempfile::TempDir;
use tracing::{debug, info};
use yamdb_dal::user::{CreateUser, User, UserRepository};
use yamdb_server::config::{Parser, ServerConfig};
use yamdb_types::claim::Role;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
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
    let mail_dir = tmp_data_dir.path().join("mail").to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://127.0.0.1:{}", port);
    let args = &[
        "yamdb-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
        "--mail-dir",
        &mail_dir,
        "--default-page-size",
        "2",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Config with fresh data directory, database is created and migrated.
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let (args, guard) = test_config(test_name, &std::env::temp_dir())?;
    let pool = yamdb_dal::new_pool(&args.database_url()).await?;
    yamdb_dal::migrate(&pool).await?;
    pool.close().await;
    Ok((args, guard))
}

/// Root of the REST API on the test server.
pub fn api_url(args: &ServerConfig) -> Url {
    let mut url = args.base_url.clone();
    url.set_path("/api/v1/");
    url
}

pub fn extend_url(url: &Url, segment: impl ToString) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .map(|mut segments| {
            segments.pop_if_empty().push(&segment.to_string());
        })
        .ok();
    url
}

pub async fn spawn_server(args: ServerConfig) -> Result<()> {
    let health_url = args.base_url.join("health")?;
    tokio::spawn(async move {
        if let Err(e) = yamdb_server::run::run(args).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
    Err(anyhow!("Server did not start"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestUser {
    Admin,
    Moderator,
    User,
    Superuser,
}

impl TestUser {
    pub fn username(&self) -> &'static str {
        match self {
            TestUser::Admin => "admin",
            TestUser::Moderator => "moder",
            TestUser::User => "usak",
            TestUser::Superuser => "root",
        }
    }

    fn role(&self) -> Role {
        match self {
            TestUser::Admin => Role::Admin,
            TestUser::Moderator => Role::Moderator,
            TestUser::User | TestUser::Superuser => Role::User,
        }
    }
}

/// Creates user directly in database, returns it with its confirmation code.
pub async fn create_user(args: &ServerConfig, user: TestUser) -> Result<(User, String)> {
    let pool = yamdb_dal::new_pool(&args.database_url()).await?;
    let repository = UserRepository::new(pool.clone());
    let username = user.username();
    let new_user = CreateUser {
        username: Some(username.to_string()),
        email: Some(format!("{username}@example.com").parse()?),
        first_name: None,
        last_name: None,
        role: Some(user.role().to_string()),
        bio: None,
        is_superuser: user == TestUser::Superuser,
    };
    let code = yamdb_auth::generate_confirmation_code();
    let record = repository.create(new_user, &code).await?;
    pool.close().await;
    Ok((record, code))
}

pub async fn obtain_token(api_url: &Url, username: &str, code: &str) -> Result<String> {
    let response = reqwest::Client::new()
        .post(api_url.join("auth/token")?)
        .json(&json!({"username": username, "confirmation_code": code}))
        .send()
        .await?;
    debug!("Token response: {:#?}", response);
    if !response.status().is_success() {
        return Err(anyhow!("Token request failed with {}", response.status()));
    }
    let body: serde_json::Value = response.json().await?;
    body["access"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("No access token in response"))
}

pub fn authorized_client(token: &str) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))?,
    );
    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .build()?)
}

/// Client authorized as given test user, created in the database of the running server.
pub async fn client_for(args: &ServerConfig, user: TestUser) -> Result<reqwest::Client> {
    let (record, code) = create_user(args, user).await?;
    let token = obtain_token(&api_url(args), &record.username, &code).await?;
    authorized_client(&token)
}

/// Spawns server and returns client authorized as `user`.
pub async fn launch_env(args: ServerConfig, user: TestUser) -> Result<(reqwest::Client, Url)> {
    let api = api_url(&args);
    spawn_server(args.clone()).await?;
    let client = client_for(&args, user).await?;
    info!("Test environment ready for {:?}", user);
    Ok((client, api))
}

const CODE_PREFIX: &str = "your confirmation code is: ";

/// Confirmation codes from all stored mail addressed to `to`, in no particular order.
pub fn mailed_codes(args: &ServerConfig, to: &str) -> Result<Vec<String>> {
    let mail_dir = args.mail_dir.as_ref().context("Mail directory not set")?;
    let mut codes = Vec::new();
    if !mail_dir.exists() {
        return Ok(codes);
    }
    for entry in std::fs::read_dir(mail_dir)? {
        let path = entry?.path();
        if path.extension().is_none_or(|ext| ext != "eml") {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        if !content.contains(&format!("To: {to}\r\n")) {
            continue;
        }
        if let Some(code) = content
            .lines()
            .find_map(|line| line.strip_prefix(CODE_PREFIX))
        {
            codes.push(code.trim().to_string());
        }
    }
    Ok(codes)
}
