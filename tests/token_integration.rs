use keycloak_introspect::{TokenFetchError, TokenGetter, TokenGetterConfig};
use mockito::Matcher;

const CLIENT_ID: &str = "status-agent";
const CLIENT_SECRET: &str = "abc-123-def-4567";

fn getter_for(server: &mockito::ServerGuard) -> TokenGetter {
    TokenGetter::new(TokenGetterConfig {
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        token_url: format!("{}/token", server.url()),
    })
}

fn token_body(access_token: &str, expires_in: i64) -> String {
    format!(
        r#"{{"access_token":"{access_token}","expires_in":{expires_in},"refresh_expires_in":1800,"token_type":"Bearer","not-before-policy":0,"scope":"agent-api"}}"#
    )
}

#[tokio::test]
async fn second_call_is_served_from_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("client_id".into(), CLIENT_ID.into()),
            Matcher::UrlEncoded("client_secret".into(), CLIENT_SECRET.into()),
            Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
        ]))
        .with_body(token_body("first-token", 300))
        .expect(1)
        .create_async()
        .await;

    let getter = getter_for(&server);
    let first = getter.get_token().await.unwrap();
    let second = getter.get_token().await.unwrap();

    assert_eq!(first.token.access_token, "first-token");
    assert_eq!(second.token.access_token, "first-token");
    assert_eq!(first.expires_at, second.expires_at);
    mock.assert_async().await;
}

#[tokio::test]
async fn expired_token_is_replaced_wholesale() {
    let mut server = mockito::Server::new_async().await;
    let first_mock = server
        .mock("POST", "/token")
        .with_body(token_body("first-token", 0))
        .expect(1)
        .create_async()
        .await;

    let getter = getter_for(&server);
    let first = getter.get_token().await.unwrap();
    assert_eq!(first.token.access_token, "first-token");
    first_mock.assert_async().await;

    server.reset_async().await;
    let second_mock = server
        .mock("POST", "/token")
        .with_body(token_body("second-token", 300))
        .expect(1)
        .create_async()
        .await;

    // expires_in of 0 put expires_at at the fetch instant, which has passed by
    // now, so this call must hit the endpoint again.
    let second = getter.get_token().await.unwrap();
    assert_eq!(second.token.access_token, "second-token");
    assert!(second.expires_at > first.expires_at);

    // ...and the replacement is itself cached.
    let third = getter.get_token().await.unwrap();
    assert_eq!(third.token.access_token, "second-token");
    second_mock.assert_async().await;
}

#[tokio::test]
async fn concurrent_cold_calls_share_one_fetch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .with_body(token_body("only-token", 300))
        .expect(1)
        .create_async()
        .await;

    let getter = getter_for(&server);
    let (a, b, c) = tokio::join!(getter.get_token(), getter.get_token(), getter.get_token());

    for container in [a.unwrap(), b.unwrap(), c.unwrap()] {
        assert_eq!(container.token.access_token, "only-token");
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn clones_share_the_cache_slot() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .with_body(token_body("shared-token", 300))
        .expect(1)
        .create_async()
        .await;

    let getter = getter_for(&server);
    let cloned = getter.clone();

    let from_clone = cloned.get_token().await.unwrap();
    let from_original = getter.get_token().await.unwrap();

    assert_eq!(from_clone.token.access_token, "shared-token");
    assert_eq!(from_original.token.access_token, "shared-token");
    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_token_endpoint_is_a_transport_error() {
    let getter = TokenGetter::new(TokenGetterConfig {
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        token_url: "http://127.0.0.1:1/token".to_string(),
    });

    let err = getter.get_token().await.unwrap_err();
    assert!(matches!(err, TokenFetchError::Transport(_)));
}

#[tokio::test]
async fn non_json_response_is_a_decode_error_and_not_cached() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/token")
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let getter = getter_for(&server);
    let err = getter.get_token().await.unwrap_err();
    assert!(matches!(err, TokenFetchError::Decode(_)));

    // The failure left the cache empty: a later call fetches again and
    // succeeds once the endpoint recovers.
    server.reset_async().await;
    let recovered = server
        .mock("POST", "/token")
        .with_body(token_body("recovered-token", 300))
        .expect(1)
        .create_async()
        .await;

    let container = getter.get_token().await.unwrap();
    assert_eq!(container.token.access_token, "recovered-token");
    recovered.assert_async().await;
}
