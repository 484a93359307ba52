//! Drives `HttpAuthority` against a small signing server over real HTTP.

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use blindvote::*;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

struct Server {
    pem: String,
    public: PublicKey,
    secret: SecretKey,
    consumed: Mutex<HashSet<BigUint>>,
    accounts: Mutex<Vec<String>>,
}

type Reply<T> = Result<Json<T>, (StatusCode, String)>;

fn bad_request(msg: &str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.to_owned())
}

impl Server {
    fn consume(&self, req: &ExchangeRequest) -> Result<(), (StatusCode, String)> {
        if !verify(&self.public, &req.message, &req.signature) {
            return Err(bad_request("invalid signature"));
        }
        if !self.consumed.lock().insert(req.signature.clone()) {
            return Err((StatusCode::CONFLICT, "signature already used".to_owned()));
        }
        Ok(())
    }
}

async fn public_pem(Extension(server): Extension<Arc<Server>>) -> String {
    server.pem.clone()
}

async fn blind_sign(
    Extension(server): Extension<Arc<Server>>,
    Json(req): Json<BlindSignRequest>,
) -> Reply<BlindSignResponse> {
    let blind_signature = server
        .secret
        .sign_blinded(&req.blinded_message)
        .map_err(|e| bad_request(&e.to_string()))?;
    Ok(Json(BlindSignResponse { blind_signature }))
}

async fn assign_account(
    Extension(server): Extension<Arc<Server>>,
    Json(req): Json<ExchangeRequest>,
) -> Reply<AccountResponse> {
    server.consume(&req)?;
    let account_address = server
        .accounts
        .lock()
        .pop()
        .ok_or((StatusCode::SERVICE_UNAVAILABLE, "no more accounts".to_owned()))?;
    Ok(Json(AccountResponse { account_address }))
}

async fn eligibility(
    Extension(server): Extension<Arc<Server>>,
    Json(req): Json<EligibilityRequest>,
) -> Json<EligibilityResponse> {
    let eligible = verify(&server.public, &req.user_hash, &req.signature)
        && !server.consumed.lock().contains(&req.signature);
    Json(EligibilityResponse { eligible })
}

async fn deployed() -> Json<Value> {
    Json(json!({
        "contracts": {"Voting": {"address": "0xvoting", "abi": []}}
    }))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Start the server on an ephemeral port and return its base URI
fn spawn_server() -> (String, PublicKey) {
    let key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
    let rsa_public = key.to_public_key();
    let public = PublicKey::from_rsa(&rsa_public).unwrap();
    let server = Arc::new(Server {
        pem: rsa_public.to_public_key_pem(LineEnding::LF).unwrap(),
        public: public.clone(),
        secret: SecretKey::from_rsa(&key),
        consumed: Mutex::new(HashSet::new()),
        accounts: Mutex::new(vec!["0xaccount1".to_owned()]),
    });

    let router = Router::new()
        .route("/public.pem", get(public_pem))
        .route("/blind_sign", post(blind_sign))
        .route("/assign_account", post(assign_account))
        .route("/check_eligibility", post(eligibility))
        .route("/deployed.json", get(deployed))
        .route("/health", get(health))
        .layer(Extension(server));

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router.into_make_service())
                .await
                .unwrap();
        });
    });

    (format!("http://{}", addr), public)
}

#[test]
fn credential_over_http() {
    let (uri, public) = spawn_server();
    let authority = HttpAuthority::new(&uri).unwrap();
    let keys = KeyCache::new();

    authority.health().unwrap();
    assert_eq!(authority.deployment().unwrap().voting().unwrap().address, "0xvoting");

    let alice = Identity::new("Alice", "42");
    let credential =
        request_credential(&authority, &keys, alice.clone(), CredentialKind::AccountAddress)
            .unwrap();
    assert_eq!(credential.kind(), CredentialKind::AccountAddress);
    assert_eq!(keys.cached(&uri).as_deref(), Some(&public));

    // Same identity again: the authority refuses the replayed signature
    let failure =
        request_credential(&authority, &keys, alice.clone(), CredentialKind::AccountAddress)
            .unwrap_err();
    assert_eq!(failure.step, Step::ExchangeCredential);
    assert_eq!(failure.http_status(), Some(409));

    // A token for the same identity carries the consumed signature
    let token = request_credential(&authority, &keys, alice, CredentialKind::EligibilityToken)
        .unwrap();
    match token {
        Credential::EligibilityToken { message, signature } => {
            assert!(!check_eligibility(&authority, &message, &signature).unwrap());
        }
        other => panic!("unexpected credential {:?}", other),
    }

    let bob = Identity::new("Bob", "7");
    let token =
        request_credential(&authority, &keys, bob, CredentialKind::EligibilityToken).unwrap();
    match token {
        Credential::EligibilityToken { message, signature } => {
            assert!(check_eligibility(&authority, &message, &signature).unwrap());
        }
        other => panic!("unexpected credential {:?}", other),
    }
}

#[test]
fn missing_endpoint_fails_at_exchange() {
    let (uri, _) = spawn_server();
    let authority = HttpAuthority::new(&uri).unwrap();
    let keys = KeyCache::new();

    // The test server has no /get_signing_key route
    let failure = request_credential(
        &authority,
        &keys,
        Identity::new("Carol", "9"),
        CredentialKind::SigningKey,
    )
    .unwrap_err();
    assert_eq!(failure.step, Step::ExchangeCredential);
    assert_eq!(failure.http_status(), Some(404));
}

#[test]
fn wrong_key_path_fails_at_resolve() {
    let (uri, _) = spawn_server();
    let authority = HttpAuthority::with_config(&Config {
        uri: uri.clone(),
        key_path: "/missing.pem".to_owned(),
        ..Config::default()
    })
    .unwrap();
    let keys = KeyCache::new();

    let failure = request_credential(
        &authority,
        &keys,
        Identity::new("Dave", "3"),
        CredentialKind::EligibilityToken,
    )
    .unwrap_err();
    assert_eq!(failure.step, Step::ResolveKey);
    assert_eq!(failure.http_status(), Some(404));
    assert!(keys.cached(&uri).is_none());
}
