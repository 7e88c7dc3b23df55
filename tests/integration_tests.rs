//! Tests against a live Pos web service instance.
//!
//! Run with: cargo test --test integration_tests -- --ignored
//! after pointing POS_BASE_URL / POS_API_KEY at a running backend.

use posrs::{Envelope, Options, PosError, PosWebService, PosWebServiceDict, SortOrder};

fn base_url() -> String {
    std::env::var("POS_BASE_URL").unwrap_or_else(|_| "http://localhost:8000/api".to_string())
}

fn api_key() -> String {
    std::env::var("POS_API_KEY").unwrap_or_default()
}

#[test]
#[ignore] // Run with: cargo test --test integration_tests -- --ignored
fn test_product_list() {
    let ws = PosWebService::new(base_url(), api_key());

    let envelope = ws
        .product()
        .list(
            Options::new()
                .filter("price", "lt", 40000)
                .display(["name", "price", "updated_at"])
                .sort("price", SortOrder::Asc)
                .limit(2),
        )
        .expect("failed to list products");

    let data = envelope.data().expect("expected a JSON payload");
    assert!(data.get("data").is_some(), "expected a data field, got {:?}", data);

    println!("Product list test passed: {:?}", data);
}

#[test]
#[ignore]
fn test_search_returns_identifiers() {
    let ws = PosWebServiceDict::new(base_url(), api_key());

    let ids = ws
        .search("product", Options::new().action("list").limit(2))
        .expect("failed to search products");

    assert!(ids.len() <= 2, "limit was not honored: {:?}", ids);

    println!("Search test passed: {:?}", ids);
}

#[test]
#[ignore]
fn test_get_single_product() {
    let ws = PosWebService::new(base_url(), api_key());

    let envelope = ws
        .get("product", Some(23), Options::new().action("read"))
        .expect("failed to read product");

    match envelope {
        Envelope::Data(value) => println!("Get test passed: {:?}", value),
        other => panic!("expected a data envelope, got {:?}", other),
    }
}

#[test]
#[ignore]
fn test_head_surfaces_headers() {
    let ws = PosWebService::new(base_url(), api_key());

    let envelope = ws
        .head("product", None, Options::new().action("list"))
        .expect("failed to head products");

    match envelope {
        Envelope::Headers(headers) => {
            assert!(!headers.is_empty(), "expected response headers");
            println!("Head test passed: {:?}", headers);
        }
        other => panic!("expected a headers envelope, got {:?}", other),
    }
}

#[test]
#[ignore]
fn test_bad_api_key_is_an_authentication_error() {
    let ws = PosWebService::new(base_url(), "definitely-not-a-key");

    let result = ws.search("product", Options::new().action("list"));

    match result {
        Err(PosError::Authentication { status, .. }) => {
            assert_eq!(status, 401);
            println!("Authentication test passed");
        }
        other => panic!("expected Authentication, got {:?}", other),
    }
}

#[test]
#[ignore]
fn test_unknown_resource_is_a_webservice_error() {
    let ws = PosWebService::new(base_url(), api_key());

    let result = ws.connect("definitely/not/an/endpoint");

    match result {
        Err(PosError::WebService { status, .. }) => {
            assert_eq!(status, 404);
            println!("Unknown endpoint test passed");
        }
        other => panic!("expected WebService, got {:?}", other),
    }
}

#[test]
#[ignore]
fn test_unreachable_host_is_a_transport_error() {
    // nothing listens on port 9
    let ws = PosWebService::new("http://127.0.0.1:9/api", "key");

    let result = ws.search("product", Options::new().action("list"));

    match result {
        Err(PosError::Transport(_)) => println!("Transport test passed"),
        other => panic!("expected Transport, got {:?}", other),
    }
}
