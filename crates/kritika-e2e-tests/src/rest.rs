use anyhow::Result;
use kritika_dal::{category::Category, genre::Genre, review::Review, title::Title};
use reqwest::Url;
use serde_json::json;
use tracing::info;

pub async fn create_category(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    slug: &str,
) -> Result<Category> {
    let payload = json!({"name": name, "slug": slug});
    let api_url = base_url.join("api/category").unwrap();

    let response = client.post(api_url).json(&payload).send().await?;
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_category: Category = response.json().await?;
    Ok(new_category)
}

pub async fn create_genre(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    slug: &str,
) -> Result<Genre> {
    let payload = json!({"name": name, "slug": slug});
    let api_url = base_url.join("api/genre").unwrap();

    let response = client.post(api_url).json(&payload).send().await?;
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_genre: Genre = response.json().await?;
    Ok(new_genre)
}

pub async fn create_title<T>(client: &reqwest::Client, base_url: &Url, payload: &T) -> Result<Title>
where
    T: serde::Serialize,
{
    let api_url = base_url.join("api/title").unwrap();

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Title response: {:#?}", response);
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_title: Title = response.json().await?;
    Ok(new_title)
}

pub async fn create_review(
    client: &reqwest::Client,
    base_url: &Url,
    title_id: i64,
    text: &str,
    score: i64,
) -> Result<Review> {
    let payload = json!({"text": text, "score": score});
    let api_url = base_url
        .join(&format!("api/title/{title_id}/review"))
        .unwrap();

    let response = client.post(api_url).json(&payload).send().await?;
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_review: Review = response.json().await?;
    Ok(new_review)
}
