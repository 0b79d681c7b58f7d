use anyhow::{Result, anyhow};
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};
use tracing::info;

async fn post_created(client: &reqwest::Client, url: Url, payload: &Value) -> Result<Value> {
    let response = client.post(url).json(payload).send().await?;
    info!("Response: {:#?}", response);
    if response.status() != StatusCode::CREATED {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("Expected 201, got {status}: {body}"));
    }
    Ok(response.json().await?)
}

pub async fn create_category(
    client: &reqwest::Client,
    api_url: &Url,
    name: &str,
    slug: &str,
) -> Result<Value> {
    let payload = json!({"name": name, "slug": slug});
    post_created(client, api_url.join("categories")?, &payload).await
}

pub async fn create_genre(
    client: &reqwest::Client,
    api_url: &Url,
    name: &str,
    slug: &str,
) -> Result<Value> {
    let payload = json!({"name": name, "slug": slug});
    post_created(client, api_url.join("genres")?, &payload).await
}

pub async fn create_title(
    client: &reqwest::Client,
    api_url: &Url,
    name: &str,
    year: i32,
    category: &str,
    genres: &[&str],
) -> Result<Value> {
    let payload = json!({"name": name, "year": year, "category": category, "genre": genres});
    post_created(client, api_url.join("titles")?, &payload).await
}

pub fn reviews_url(api_url: &Url, title_id: i64) -> Result<Url> {
    Ok(api_url.join(&format!("titles/{title_id}/reviews"))?)
}

pub fn comments_url(api_url: &Url, title_id: i64, review_id: i64) -> Result<Url> {
    Ok(api_url.join(&format!("titles/{title_id}/reviews/{review_id}/comments"))?)
}

pub async fn create_review(
    client: &reqwest::Client,
    api_url: &Url,
    title_id: i64,
    text: &str,
    score: i32,
) -> Result<Value> {
    let payload = json!({"text": text, "score": score});
    post_created(client, reviews_url(api_url, title_id)?, &payload).await
}

pub async fn get_json(client: &reqwest::Client, url: Url) -> Result<Value> {
    let response = client.get(url).send().await?;
    info!("Response: {:#?}", response);
    if !response.status().is_success() {
        return Err(anyhow!("GET failed with {}", response.status()));
    }
    Ok(response.json().await?)
}

pub async fn title_rating(client: &reqwest::Client, api_url: &Url, title_id: i64) -> Result<Value> {
    let title = get_json(client, api_url.join(&format!("titles/{title_id}"))?).await?;
    Ok(title["rating"].clone())
}
