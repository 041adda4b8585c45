//! Nominatim client tests against a wiremock server.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frunch_core::{Error, GeoPoint, GeocodeClient};
use frunch_remote::{NominatimClient, NominatimConfig};

fn client(server: &MockServer) -> NominatimClient {
    NominatimClient::new(
        NominatimConfig::default()
            .with_url(format!("{}/reverse", server.uri()))
            .with_user_agent("frunch-test"),
    )
    .expect("client")
}

#[tokio::test]
async fn test_reverse_sends_expected_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "47.6"))
        .and(query_param("lon", "-122.3"))
        .and(query_param("format", "json"))
        .and(query_param("zoom", "10"))
        .and(header("user-agent", "frunch-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "address": {
                "city": "Seattle",
                "state": "Washington",
                "country": "United States",
                "country_code": "us"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let address = client(&server)
        .reverse_geocode(GeoPoint::new(47.6, -122.3))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(address.city.as_deref(), Some("Seattle"));
    assert_eq!(address.region.as_deref(), Some("Washington"));
    assert_eq!(address.country_code.as_deref(), Some("us"));
}

#[tokio::test]
async fn test_no_address_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "Unable to geocode"})),
        )
        .mount(&server)
        .await;

    let result = client(&server)
        .reverse_geocode(GeoPoint::new(0.0, -140.0))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client(&server)
        .reverse_geocode(GeoPoint::new(1.0, 1.0))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_http_error_is_geocode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client(&server)
        .reverse_geocode(GeoPoint::new(1.0, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Geocode(_)), "got {:?}", err);
}
