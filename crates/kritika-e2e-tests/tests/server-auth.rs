use kritika_app::mail::Mailer;
use kritika_e2e_tests::{confirmation_code_for, launch_env, launch_env_with_mailer, prepare_env};
use serde_json::{json, Value};
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_signup_and_token_exchange() {
    let (args, _config_guard) = prepare_env("test_signup").await.unwrap();
    let env = launch_env(args).await.unwrap();
    let client = reqwest::Client::new();

    let signup_url = env.base_url.join("auth/signup").unwrap();
    let response = client
        .post(signup_url)
        .json(&json!({"email": "bob@example.com", "username": "bob"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    // Response echoes identity only, never the code.
    assert_eq!(
        body,
        json!({"email": "bob@example.com", "username": "bob"})
    );

    let code = confirmation_code_for(&env.outbox, "bob@example.com").unwrap();

    let token_url = env.base_url.join("auth/token").unwrap();

    // Wrong code names the offending field and yields no tokens.
    let response = client
        .post(token_url.clone())
        .json(&json!({"username": "bob", "confirmation_code": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("confirmation_code").is_some());

    // Unknown user is a 404, distinct from a bad code.
    let response = client
        .post(token_url.clone())
        .json(&json!({"username": "nosuch", "confirmation_code": code.clone()}))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());

    let response = client
        .post(token_url.clone())
        .json(&json!({"username": "bob", "confirmation_code": code.clone()}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let tokens: Value = response.json().await.unwrap();
    let access = tokens["access_token"].as_str().unwrap();
    assert!(!access.is_empty());
    assert!(tokens["refresh_token"].as_str().is_some());

    // The issued credential works against a protected endpoint.
    let me_url = env.base_url.join("users/me").unwrap();
    let response = client
        .get(me_url)
        .bearer_auth(access)
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let me: Value = response.json().await.unwrap();
    assert_eq!(me["username"], "bob");
    assert_eq!(me["role"], "user");

    // The code was consumed by the successful exchange.
    let response = client
        .post(token_url)
        .json(&json!({"username": "bob", "confirmation_code": code}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
#[traced_test]
async fn test_repeated_signup_rotates_code() {
    let (args, _config_guard) = prepare_env("test_signup_rotate").await.unwrap();
    let env = launch_env(args).await.unwrap();
    let client = reqwest::Client::new();
    let signup_url = env.base_url.join("auth/signup").unwrap();
    let payload = json!({"email": "bob@example.com", "username": "bob"});

    client
        .post(signup_url.clone())
        .json(&payload)
        .send()
        .await
        .unwrap();
    let first_code = confirmation_code_for(&env.outbox, "bob@example.com").unwrap();

    client.post(signup_url).json(&payload).send().await.unwrap();
    let second_code = confirmation_code_for(&env.outbox, "bob@example.com").unwrap();
    assert_ne!(first_code, second_code);

    // Only the fresh code is honored.
    let token_url = env.base_url.join("auth/token").unwrap();
    let response = client
        .post(token_url.clone())
        .json(&json!({"username": "bob", "confirmation_code": first_code}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
    let response = client
        .post(token_url)
        .json(&json!({"username": "bob", "confirmation_code": second_code}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
#[traced_test]
async fn test_signup_identity_conflicts() {
    let (args, _config_guard) = prepare_env("test_signup_conflict").await.unwrap();
    let env = launch_env(args).await.unwrap();
    let client = reqwest::Client::new();
    let signup_url = env.base_url.join("auth/signup").unwrap();

    let response = client
        .post(signup_url.clone())
        .json(&json!({"email": "a@x.com", "username": "bob"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    // Same email under another username.
    let response = client
        .post(signup_url.clone())
        .json(&json!({"email": "a@x.com", "username": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    // Same username under another email.
    let response = client
        .post(signup_url.clone())
        .json(&json!({"email": "b@x.com", "username": "bob"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    // The original record survived both conflicts unchanged.
    let users = kritika_dal::user::UserRepository::new(env.state.pool().clone());
    let bob = users.get_by_username("bob").await.unwrap();
    assert_eq!(bob.email, "a@x.com");
}

#[tokio::test]
#[traced_test]
async fn test_signup_validation() {
    let (args, _config_guard) = prepare_env("test_signup_validation").await.unwrap();
    let env = launch_env(args).await.unwrap();
    let client = reqwest::Client::new();
    let signup_url = env.base_url.join("auth/signup").unwrap();

    // Reserved username.
    let response = client
        .post(signup_url.clone())
        .json(&json!({"email": "me@example.com", "username": "me"}))
        .send()
        .await
        .unwrap();
    assert_eq!(422, response.status().as_u16());

    // Bad charset.
    let response = client
        .post(signup_url.clone())
        .json(&json!({"email": "bad@example.com", "username": "has space"}))
        .send()
        .await
        .unwrap();
    assert_eq!(422, response.status().as_u16());

    // Overlong email.
    let long_email = format!("{}@example.com", "a".repeat(250));
    let response = client
        .post(signup_url)
        .json(&json!({"email": long_email, "username": "bob"}))
        .send()
        .await
        .unwrap();
    assert_eq!(422, response.status().as_u16());
}

#[tokio::test]
#[traced_test]
async fn test_signup_fails_loudly_on_mail_failure() {
    let (args, _config_guard) = prepare_env("test_signup_mail_failure").await.unwrap();
    let (_, outbox) = Mailer::memory();
    let env = launch_env_with_mailer(args, Mailer::Refusing, outbox)
        .await
        .unwrap();
    let client = reqwest::Client::new();
    let signup_url = env.base_url.join("auth/signup").unwrap();

    let response = client
        .post(signup_url)
        .json(&json!({"email": "bob@example.com", "username": "bob"}))
        .send()
        .await
        .unwrap();
    assert_eq!(502, response.status().as_u16());

    // Caller cannot obtain the code, so the exchange stays closed.
    let token_url = env.base_url.join("auth/token").unwrap();
    let response = client
        .post(token_url)
        .json(&json!({"username": "bob", "confirmation_code": "anything"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
}
