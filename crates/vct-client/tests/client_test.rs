//! Contract tests for the log client against a mock log.
//!
//! ## Endpoints Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST   | `/v1/add-vc` | `add_vc_*` |
//! | GET    | `/healthcheck` | `health_check_*` |
//! | GET    | `/v1/get-issuers` | `get_issuers_*` |
//! | GET    | `/.well-known/webfinger` | `webfinger_*` |
//! | GET    | `/v1/get-sth` | `get_sth_*` |
//! | GET    | `/v1/get-sth-consistency` | `get_sth_consistency_*` |
//! | GET    | `/v1/get-proof-by-hash` | `get_proof_by_hash_*` |
//! | GET    | `/v1/get-entries` | `get_entries_*` |
//! | GET    | `/v1/get-entry-and-proof` | `get_entry_and_proof_*` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use p256::ecdsa::signature::Signer as _;
use p256::pkcs8::EncodePublicKey as _;
use rand_core::OsRng;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::StatusCode;
use vct_client::{
    cancellable, Client, ClientConfig, ClientError, GetSthResponse, HttpRequest, HttpResponse,
    HttpTransport, TransportError,
};
use vct_core::{calculate_leaf_hash, SignedTreeHead, StaticDocumentLoader};
use vct_crypto::{
    tree_head_signature_input, verify_sth_signature, verify_vc_timestamp_signature,
    DigitallySigned, SignatureAndHashAlgorithm,
};
use wiremock::matchers::{any, body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CREDENTIAL: &[u8] = include_bytes!("../../vct-core/tests/testdata/simple_vc.json");

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn test_client(server: &MockServer) -> Client {
    init_tracing();
    let config = ClientConfig {
        endpoint: server.uri().parse().unwrap(),
        read_token: Some(zeroize::Zeroizing::new("tk1".into())),
        write_token: Some(zeroize::Zeroizing::new("tk2".into())),
        timeout_secs: 5,
        use_system_roots: false,
    };
    Client::new(config).unwrap()
}

async fn serve(server: &MockServer, verb: &str, route: &str, body: &str) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

// -- Round trips --------------------------------------------------------------

#[tokio::test]
async fn add_vc_sends_raw_body_with_write_token() {
    let server = MockServer::start().await;
    let expected = r#"{"svct_version":1,"id":"aWQ=","timestamp":1234567889,"extensions":"extensions","signature":"c2lnbmF0dXJl"}"#;

    Mock::given(method("POST"))
        .and(path("/v1/add-vc"))
        .and(header("authorization", "Bearer tk2"))
        .and(body_bytes(b"{credential}".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_string(expected))
        .expect(1)
        .mount(&server)
        .await;

    let resp = test_client(&server).add_vc(b"{credential}").await.unwrap();
    assert_eq!(resp.id, b"id");
    assert_eq!(resp.signature, b"signature");
    assert_eq!(serde_json::to_string(&resp).unwrap(), expected);
}

#[tokio::test]
async fn health_check_succeeds_under_path_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maple2020/healthcheck"))
        .and(header("authorization", "Bearer tk1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(format!("{}/maple2020", server.uri()).parse().unwrap())
        .with_read_token("tk1");
    Client::new(config).unwrap().health_check().await.unwrap();
}

#[tokio::test]
async fn get_issuers_round_trips() {
    let server = MockServer::start().await;
    let expected = r#"["issuer_a","issuer_b"]"#;
    serve(&server, "GET", "/v1/get-issuers", expected).await;

    let issuers = test_client(&server).get_issuers().await.unwrap();
    assert_eq!(issuers, vec!["issuer_a", "issuer_b"]);
    assert_eq!(serde_json::to_string(&issuers).unwrap(), expected);
}

#[tokio::test]
async fn webfinger_round_trips() {
    let server = MockServer::start().await;
    let expected = r#"{"subject":"https://vct.com/maple2021","properties":{"https://trustbloc.dev/ns/public-key":"cHVibGljIGtleQ=="},"links":[{"rel":"self","href":"https://vct.com/maple2021"}]}"#;
    serve(&server, "GET", "/.well-known/webfinger", expected).await;

    let resp = test_client(&server).webfinger().await.unwrap();
    assert_eq!(resp.public_key(), Some("cHVibGljIGtleQ=="));
    assert_eq!(serde_json::to_string(&resp).unwrap(), expected);
}

#[tokio::test]
async fn get_sth_round_trips() {
    let server = MockServer::start().await;
    let expected = r#"{"tree_size":1,"timestamp":1234567889,"sha256_root_hash":"AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyA=","tree_head_signature":"c2lnbmF0dXJl"}"#;
    serve(&server, "GET", "/v1/get-sth", expected).await;

    let resp = test_client(&server).get_sth().await.unwrap();
    assert_eq!(serde_json::to_string(&resp).unwrap(), expected);
    let sth = resp.signed_tree_head().unwrap();
    assert_eq!(sth.sha256_root_hash[0], 1);
    assert_eq!(sth.sha256_root_hash[31], 32);
}

#[tokio::test]
async fn get_sth_consistency_sends_sizes() {
    let server = MockServer::start().await;
    let expected = r#"{"consistency":["AQ==","Ag=="]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/get-sth-consistency"))
        .and(query_param("first", "1"))
        .and(query_param("second", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(expected))
        .expect(1)
        .mount(&server)
        .await;

    let resp = test_client(&server).get_sth_consistency(1, 2).await.unwrap();
    assert_eq!(resp.proof(), &[vec![1u8], vec![2u8]]);
    assert_eq!(serde_json::to_string(&resp).unwrap(), expected);
}

#[tokio::test]
async fn get_proof_by_hash_sends_hash_and_size() {
    let server = MockServer::start().await;
    let expected = r#"{"leaf_index":1,"audit_path":["AQ=="]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/get-proof-by-hash"))
        .and(query_param("hash", "aGFzaA=="))
        .and(query_param("tree_size", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(expected))
        .expect(1)
        .mount(&server)
        .await;

    let resp = test_client(&server)
        .get_proof_by_hash("aGFzaA==", 2)
        .await
        .unwrap();
    assert_eq!(resp.leaf_index, 1);
    assert_eq!(serde_json::to_string(&resp).unwrap(), expected);
}

#[tokio::test]
async fn get_entries_sends_range() {
    let server = MockServer::start().await;
    let expected = r#"{"entries":[{"leaf_input":"bGVhZg==","extra_data":"ZXh0cmE="}]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/get-entries"))
        .and(query_param("start", "1"))
        .and(query_param("end", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(expected))
        .expect(1)
        .mount(&server)
        .await;

    let resp = test_client(&server).get_entries(1, 2).await.unwrap();
    assert_eq!(resp.entries[0].leaf_input, b"leaf");
    assert_eq!(serde_json::to_string(&resp).unwrap(), expected);
}

#[tokio::test]
async fn nil_extra_data_is_preserved() {
    let server = MockServer::start().await;
    let expected = r#"{"entries":[{"leaf_input":"bGVhZg==","extra_data":null},{"leaf_input":"bGVhZg==","extra_data":""}]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/get-entries"))
        .respond_with(ResponseTemplate::new(200).set_body_string(expected))
        .mount(&server)
        .await;

    let resp = test_client(&server).get_entries(0, 1).await.unwrap();
    assert_eq!(resp.entries[0].extra_data, None);
    assert_eq!(resp.entries[1].extra_data, Some(Vec::new()));
    assert_eq!(serde_json::to_string(&resp).unwrap(), expected);
}

#[tokio::test]
async fn get_entry_and_proof_sends_index_and_size() {
    let server = MockServer::start().await;
    let expected = r#"{"leaf_input":"bGVhZg==","extra_data":"ZXh0cmE=","audit_path":["AQ==","Ag=="]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/get-entry-and-proof"))
        .and(query_param("leaf_index", "1"))
        .and(query_param("tree_size", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(expected))
        .expect(1)
        .mount(&server)
        .await;

    let resp = test_client(&server).get_entry_and_proof(1, 2).await.unwrap();
    assert_eq!(serde_json::to_string(&resp).unwrap(), expected);
}

// -- Errors -------------------------------------------------------------------

#[tokio::test]
async fn every_operation_reports_server_message() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"message":"error"}"#))
        .mount(&server)
        .await;
    let client = test_client(&server);

    let errors = [
        client.add_vc(b"{}").await.unwrap_err(),
        client.health_check().await.unwrap_err(),
        client.get_issuers().await.unwrap_err(),
        client.webfinger().await.unwrap_err(),
        client.get_sth().await.unwrap_err(),
        client.get_sth_consistency(1, 2).await.unwrap_err(),
        client.get_proof_by_hash("aGFzaA==", 2).await.unwrap_err(),
        client.get_entries(1, 2).await.unwrap_err(),
        client.get_entry_and_proof(1, 2).await.unwrap_err(),
    ];
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    assert_eq!(
        messages,
        [
            "add VC: error",
            "health check: error",
            "get issuers: error",
            "webfinger: error",
            "get STH: error",
            "get STH consistency: error",
            "get proof by hash: error",
            "get entries: error",
            "get entry and proof: error",
        ]
    );
    assert!(errors.iter().all(ClientError::is_server_error));
}

#[tokio::test]
async fn status_without_error_body() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = test_client(&server).get_sth().await.unwrap_err();
    match err {
        ClientError::Status {
            operation,
            status,
            body,
        } => {
            assert_eq!(operation, "get STH");
            assert_eq!(status, 502);
            assert_eq!(body, "bad gateway");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_success_body_is_decode_error() {
    let server = MockServer::start().await;
    serve(&server, "GET", "/v1/get-sth", "{").await;

    let err = test_client(&server).get_sth().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { operation: "get STH", .. }));
}

#[tokio::test]
async fn slow_log_times_out() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut config = ClientConfig::new(server.uri().parse().unwrap());
    config.timeout_secs = 1;
    let err = Client::new(config).unwrap().get_sth().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport {
            source: TransportError::Timeout,
            ..
        }
    ));
}

#[tokio::test]
async fn cancelled_call_is_distinct_from_server_errors() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    let client = test_client(&server);

    let err = cancellable(
        "get STH",
        tokio::time::sleep(Duration::from_millis(50)),
        client.get_sth(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled { operation: "get STH" }));
    assert!(!err.is_server_error());
}

// -- Request shape through an in-process transport -----------------------------

#[derive(Default)]
struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request);
        Ok(HttpResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: br#"{"entries":[]}"#.to_vec(),
        })
    }
}

#[tokio::test]
async fn read_operations_never_send_the_write_token() {
    let transport = Arc::new(RecordingTransport::default());
    let config = ClientConfig::new("https://vct.example/maple2021".parse().unwrap())
        .with_write_token("tk2");
    let client = Client::with_transport(config, transport.clone());

    client.get_entries(0, 9).await.unwrap();

    let requests = transport.requests.lock();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, reqwest::Method::GET);
    assert_eq!(
        req.url.as_str(),
        "https://vct.example/maple2021/v1/get-entries?start=0&end=9"
    );
    assert!(req.headers.get(AUTHORIZATION).is_none());
    assert!(req.body.is_none());
}

#[tokio::test]
async fn transport_failure_is_reported_with_operation() {
    struct Failing;

    #[async_trait]
    impl HttpTransport for Failing {
        async fn send(&self, _: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Other("connection refused".into()))
        }
    }

    let client = Client::with_transport(
        ClientConfig::new("https://vct.example".parse().unwrap()),
        Arc::new(Failing),
    );
    let err = client.health_check().await.unwrap_err();
    assert_eq!(err.to_string(), "health check: connection refused");
}

// -- End to end with a real log key ---------------------------------------------

fn p256_envelope(key: &p256::ecdsa::SigningKey, message: &[u8]) -> Vec<u8> {
    let sig: p256::ecdsa::Signature = key.sign(message);
    DigitallySigned {
        algorithm: SignatureAndHashAlgorithm {
            signature: "ECDSA".into(),
            key_type: "ECDSAP256DER".into(),
        },
        signature: sig.to_der().as_bytes().to_vec(),
    }
    .to_json()
    .unwrap()
}

#[tokio::test]
async fn add_vc_receipt_verifies_against_log_key() {
    let key = p256::ecdsa::SigningKey::random(&mut OsRng);
    let public_key = key.verifying_key().to_public_key_der().unwrap();
    let loader = StaticDocumentLoader::with_builtin_contexts();
    let timestamp = 1_662_067_083_140;

    let leaf = calculate_leaf_hash(timestamp, CREDENTIAL, &loader).unwrap();
    let receipt = vct_client::AddVcResponse {
        svct_version: 0,
        id: b"log-id".to_vec(),
        timestamp,
        extensions: String::new(),
        signature: p256_envelope(&key, leaf.as_bytes()),
    };

    let server = MockServer::start().await;
    serve(
        &server,
        "POST",
        "/v1/add-vc",
        &serde_json::to_string(&receipt).unwrap(),
    )
    .await;

    let resp = test_client(&server).add_vc(CREDENTIAL).await.unwrap();
    assert_eq!(resp, receipt);
    verify_vc_timestamp_signature(
        &resp.signature,
        public_key.as_bytes(),
        resp.timestamp,
        CREDENTIAL,
        &loader,
    )
    .unwrap();
}

#[tokio::test]
async fn get_sth_signature_verifies_against_log_key() {
    let key = p256::ecdsa::SigningKey::random(&mut OsRng);
    let public_key = key.verifying_key().to_public_key_der().unwrap();

    let mut head = SignedTreeHead {
        tree_size: 7,
        timestamp: 1_662_067_083_140,
        sha256_root_hash: [0x11; 32],
        tree_head_signature: Vec::new(),
    };
    head.tree_head_signature = p256_envelope(&key, &tree_head_signature_input(&head));
    let wire = GetSthResponse {
        tree_size: head.tree_size,
        timestamp: head.timestamp,
        sha256_root_hash: head.sha256_root_hash.to_vec(),
        tree_head_signature: head.tree_head_signature.clone(),
    };

    let server = MockServer::start().await;
    serve(&server, "GET", "/v1/get-sth", &serde_json::to_string(&wire).unwrap()).await;

    let sth = test_client(&server)
        .get_sth()
        .await
        .unwrap()
        .signed_tree_head()
        .unwrap();
    assert_eq!(sth, head);
    verify_sth_signature(&sth, public_key.as_bytes()).unwrap();
}
