use kritika_e2e_tests::{
    launch_env, prepare_env,
    rest::{create_category, create_genre, create_review, create_title},
    spawn_user,
};
use kritika_types::claim::Role;
use serde_json::{json, Value};
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_title_write_shape_resolves_slugs() {
    let (args, _config_guard) = prepare_env("test_title_slugs").await.unwrap();
    let env = launch_env(args).await.unwrap();
    let (_, admin) = spawn_user(&env, "root", Role::Admin, false).await.unwrap();

    create_category(&admin, &env.base_url, "Movies", "movies")
        .await
        .unwrap();
    create_genre(&admin, &env.base_url, "Crime", "crime")
        .await
        .unwrap();

    let title = create_title(
        &admin,
        &env.base_url,
        &json!({"name": "Heat", "year": 1995, "category": "movies", "genre": ["crime"]}),
    )
    .await
    .unwrap();
    // Read shape nests the resolved taxonomy.
    assert_eq!(title.category.slug, "movies");
    assert_eq!(title.genre.len(), 1);
    assert_eq!(title.rating, None);

    // Unknown slugs are rejected before anything is written.
    let titles_url = env.base_url.join("api/title").unwrap();
    let response = admin
        .post(titles_url.clone())
        .json(&json!({"name": "Ghost", "year": 1990, "category": "books", "genre": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    let response = admin
        .post(titles_url.clone())
        .json(&json!({"name": "Ghost", "year": 1990, "category": "movies", "genre": ["romance"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    // Release year cannot lie in the future.
    let next_year = time::OffsetDateTime::now_utc().year() as i64 + 1;
    let response = admin
        .post(titles_url)
        .json(&json!({"name": "Ghost", "year": next_year, "category": "movies", "genre": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(422, response.status().as_u16());
}

#[tokio::test]
#[traced_test]
async fn test_rating_aggregation() {
    let (args, _config_guard) = prepare_env("test_rating").await.unwrap();
    let env = launch_env(args).await.unwrap();
    let (_, admin) = spawn_user(&env, "root", Role::Admin, false).await.unwrap();
    let (_, bob) = spawn_user(&env, "bob", Role::User, false).await.unwrap();
    let (_, alice) = spawn_user(&env, "alice", Role::User, false).await.unwrap();

    create_category(&admin, &env.base_url, "Movies", "movies")
        .await
        .unwrap();
    let title = create_title(
        &admin,
        &env.base_url,
        &json!({"name": "Heat", "year": 1995, "category": "movies", "genre": []}),
    )
    .await
    .unwrap();

    let title_url = env
        .base_url
        .join(&format!("api/title/{}", title.id))
        .unwrap();
    let fetched: Value = reqwest::get(title_url.clone()).await.unwrap().json().await.unwrap();
    assert_eq!(fetched["rating"], Value::Null);

    create_review(&bob, &env.base_url, title.id, "Tight", 10)
        .await
        .unwrap();
    create_review(&alice, &env.base_url, title.id, "Fine", 5)
        .await
        .unwrap();

    let fetched: Value = reqwest::get(title_url).await.unwrap().json().await.unwrap();
    assert_eq!(fetched["rating"], 7.5);

    // The list shape carries the rating as well.
    let list: Value = reqwest::get(env.base_url.join("api/title").unwrap())
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 1);
    assert_eq!(list["rows"][0]["rating"], 7.5);
}

#[tokio::test]
#[traced_test]
async fn test_title_filters() {
    let (args, _config_guard) = prepare_env("test_title_filters").await.unwrap();
    let env = launch_env(args).await.unwrap();
    let (_, admin) = spawn_user(&env, "root", Role::Admin, false).await.unwrap();

    create_category(&admin, &env.base_url, "Movies", "movies")
        .await
        .unwrap();
    create_category(&admin, &env.base_url, "Books", "books")
        .await
        .unwrap();
    create_genre(&admin, &env.base_url, "SciFi", "scifi")
        .await
        .unwrap();

    create_title(
        &admin,
        &env.base_url,
        &json!({"name": "Heat", "year": 1995, "category": "movies", "genre": []}),
    )
    .await
    .unwrap();
    create_title(
        &admin,
        &env.base_url,
        &json!({"name": "Solaris", "year": 1961, "category": "books", "genre": ["scifi"]}),
    )
    .await
    .unwrap();

    let titles_url = env.base_url.join("api/title").unwrap();
    let client = reqwest::Client::new();

    let by_category: Value = client
        .get(titles_url.clone())
        .query(&[("category", "books")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_category["total"], 1);
    assert_eq!(by_category["rows"][0]["name"], "Solaris");

    let by_genre: Value = client
        .get(titles_url.clone())
        .query(&[("genre", "scifi")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_genre["total"], 1);

    let by_year: Value = client
        .get(titles_url)
        .query(&[("year", "1995")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_year["total"], 1);
    assert_eq!(by_year["rows"][0]["name"], "Heat");
}

#[tokio::test]
#[traced_test]
async fn test_title_delete_cascades() {
    let (args, _config_guard) = prepare_env("test_title_cascade").await.unwrap();
    let env = launch_env(args).await.unwrap();
    let (_, admin) = spawn_user(&env, "root", Role::Admin, false).await.unwrap();
    let (_, bob) = spawn_user(&env, "bob", Role::User, false).await.unwrap();
    let (_, alice) = spawn_user(&env, "alice", Role::User, false).await.unwrap();

    create_category(&admin, &env.base_url, "Movies", "movies")
        .await
        .unwrap();
    let title = create_title(
        &admin,
        &env.base_url,
        &json!({"name": "Heat", "year": 1995, "category": "movies", "genre": []}),
    )
    .await
    .unwrap();
    let review = create_review(&bob, &env.base_url, title.id, "Tight", 9)
        .await
        .unwrap();

    let comment_url = env
        .base_url
        .join(&format!(
            "api/title/{}/review/{}/comment",
            title.id, review.id
        ))
        .unwrap();
    let response = alice
        .post(comment_url.clone())
        .json(&json!({"text": "Agreed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());

    let title_url = env
        .base_url
        .join(&format!("api/title/{}", title.id))
        .unwrap();
    let response = admin.delete(title_url.clone()).send().await.unwrap();
    assert_eq!(204, response.status().as_u16());

    // Reviews and their comments went with the title.
    let response = reqwest::get(title_url).await.unwrap();
    assert_eq!(404, response.status().as_u16());
    let response = reqwest::get(comment_url).await.unwrap();
    assert_eq!(404, response.status().as_u16());

    let leftovers: i64 = sqlx_count(&env, "review").await + sqlx_count(&env, "comment").await;
    assert_eq!(leftovers, 0);
}

async fn sqlx_count(env: &kritika_e2e_tests::TestEnv, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT count(*) FROM {table}"))
        .fetch_one(env.state.pool())
        .await
        .unwrap()
}
