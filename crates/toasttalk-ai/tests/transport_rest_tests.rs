//! transport.rest resolver against a local server.

use serde_json::json;
use toasttalk_ai::TransportRestClient;
use toasttalk_traits::{CollaboratorError, Coordinate, TransitRouteResolver};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver(server: &MockServer) -> TransportRestClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    TransportRestClient::with_http_client(http).with_base_url(format!("{}/", server.uri()))
}

fn stop(id: &str, name: &str, distance: u32) -> serde_json::Value {
    json!({
        "type": "stop",
        "id": id,
        "name": name,
        "location": {"type": "location", "latitude": 52.52, "longitude": 13.41},
        "distance": distance
    })
}

async fn mount_nearby(server: &MockServer, latitude: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/locations/nearby"))
        .and(query_param("latitude", latitude))
        .and(query_param("distance", "1000"))
        .and(query_param("stops", "true"))
        .and(query_param("poi", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_resolves_nearest_stops_then_journeys() {
    let server = MockServer::start().await;
    mount_nearby(
        &server,
        "52.52",
        json!([stop("900100003", "S+U Alexanderplatz", 120), stop("900100005", "Rotes Rathaus", 400)]),
    )
    .await;
    mount_nearby(&server, "52.507", json!([stop("900023201", "S+U Zoologischer Garten", 80)])).await;

    Mock::given(method("GET"))
        .and(path("/journeys"))
        .and(query_param("from", "900100003"))
        .and(query_param("to", "900023201"))
        .and(query_param("results", "2"))
        .and(query_param("stopovers", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "journeys": [{
                "type": "journey",
                "legs": [{
                    "origin": {"name": "S+U Alexanderplatz"},
                    "destination": {"name": "S+U Zoologischer Garten"},
                    "departure": "2025-09-02T08:00:00+02:00",
                    "arrival": "2025-09-02T08:17:00+02:00",
                    "line": {"type": "line", "name": "S5", "mode": "train"},
                    "stopovers": [
                        {"stop": {"name": "Friedrichstraße"}, "arrival": "2025-09-02T08:05:00+02:00"}
                    ]
                }]
            }],
            "realtimeDataUpdatedAt": 1756792800
        })))
        .expect(1)
        .mount(&server)
        .await;

    let search = resolver(&server)
        .search(Coordinate::new(52.52, 13.41), Coordinate::new(52.507, 13.332), 2)
        .await
        .unwrap();

    assert_eq!(search.from_stop.name, "S+U Alexanderplatz");
    assert_eq!(search.from_stop.distance, Some(120.0));
    assert_eq!(search.to_stop.id, "900023201");
    assert_eq!(search.journeys.len(), 1);
    let leg = &search.journeys[0].legs[0];
    assert_eq!(leg.line.as_ref().unwrap().name.as_deref(), Some("S5"));
    assert!(!leg.is_walking());
    assert_eq!(search.journeys[0].arrival_time(), Some("2025-09-02T08:17:00+02:00"));
}

#[tokio::test]
async fn test_no_nearby_stop() {
    let server = MockServer::start().await;
    mount_nearby(&server, "10", json!([])).await;

    let err = resolver(&server)
        .search(Coordinate::new(10.0, 20.0), Coordinate::new(52.5, 13.4), 3)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CollaboratorError::NoNearbyStop {
            latitude: 10.0,
            longitude: 20.0
        }
    );
}

#[tokio::test]
async fn test_upstream_failure_is_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations/nearby"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = resolver(&server)
        .nearby_stops(Coordinate::new(52.5, 13.4), 5)
        .await
        .unwrap_err();

    match err {
        CollaboratorError::Request(message) => {
            assert!(message.contains("503"));
            assert!(message.contains("maintenance"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unexpected_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations/nearby"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = resolver(&server)
        .nearby_stops(Coordinate::new(52.5, 13.4), 5)
        .await
        .unwrap_err();

    assert!(matches!(err, CollaboratorError::Decode(_)));
}
