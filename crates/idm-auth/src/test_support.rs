//! Fixtures shared by the unit tests.

use std::sync::OnceLock;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde::Serialize;

pub(crate) struct RsaTestKey {
    pub encoding_key: EncodingKey,
    pub n: String,
    pub e: String,
}

/// A 2048-bit key generated once per test binary.
pub(crate) fn rsa_key() -> &'static RsaTestKey {
    static KEY: OnceLock<RsaTestKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let pem = private_key.to_pkcs8_pem(LineEnding::LF).unwrap();
        RsaTestKey {
            encoding_key: EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
            n: URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be()),
        }
    })
}

/// Key set with the shared RSA key under `kid`.
pub(crate) fn rsa_jwks(kid: &str) -> serde_json::Value {
    let key = rsa_key();
    serde_json::json!({
        "keys": [{
            "kty": "RSA",
            "kid": kid,
            "alg": "RS256",
            "use": "sig",
            "n": key.n,
            "e": key.e,
        }]
    })
}

/// Signs `claims` with the shared RSA key.
pub(crate) fn sign_rs256<T: Serialize>(kid: Option<&str>, claims: &T) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    jsonwebtoken::encode(&header, claims, &rsa_key().encoding_key).unwrap()
}

pub(crate) const TEST_SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
pub(crate) const TEST_CLIENT: &str = "demo-client";
pub(crate) const TEST_REDIRECT: &str = "https://app.example/callback";
pub(crate) const TEST_EMAIL: &str = "alice@example.com";

/// Handler state with `demo-client` registered and `alice@example.com`
/// known to the session resolver.
pub(crate) fn oauth_state() -> crate::http::OAuthState {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::AuthConfig;
    use crate::oauth::{AuthorizationConfig, AuthorizationService};
    use crate::storage::{
        InMemoryAuthorizationCodeStorage, InMemoryClientStorage, InMemoryUserDirectory,
    };
    use crate::token::TokenIssuer;
    use crate::types::{Client, Principal};

    let config = AuthConfig {
        issuer: "https://idm.example.com/".to_string(),
        ..AuthConfig::default()
    };
    let issuer = TokenIssuer::new(
        TEST_SECRET,
        "default",
        "https://idm.example.com",
        Duration::from_secs(3600),
    )
    .unwrap();
    let service = AuthorizationService::new(
        Arc::new(InMemoryClientStorage::with_clients([Client::new(
            TEST_CLIENT,
            "Demo",
            vec![TEST_REDIRECT.to_string()],
        )])),
        Arc::new(InMemoryAuthorizationCodeStorage::new()),
        Arc::new(issuer),
        AuthorizationConfig::from(&config),
    );
    let users = InMemoryUserDirectory::with_users([Principal::new("user-1", TEST_EMAIL)]);

    crate::http::OAuthState::new(
        Arc::new(service),
        Arc::new(session_resolver(Arc::new(users))),
        &config,
    )
}

/// Session resolver keyed with [`TEST_SECRET`].
pub(crate) fn session_resolver(
    users: std::sync::Arc<dyn crate::storage::UserDirectory>,
) -> crate::session::SessionCookieResolver {
    crate::session::SessionCookieResolver::new(users, TEST_SECRET).unwrap()
}

/// Signed `Cookie` header value logging in `email`.
pub(crate) fn session_cookie(email: &str) -> String {
    session_resolver(std::sync::Arc::new(crate::storage::InMemoryUserDirectory::new()))
        .session_cookie(email)
}
