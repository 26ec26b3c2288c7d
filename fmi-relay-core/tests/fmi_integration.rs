//! Integration tests for FmiProvider and the relay cycle using wiremock.

use std::sync::Arc;

use fmi_relay_core::{
    CycleOutcome, DropReason, ExtractError, FmiProvider, ObservationSource, OutputFormat, Relay,
    Trigger, WeatherMessage, WriterLink, run_event_loop,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXTURE: &str = include_str!("fixtures/multipointcoverage.xml");

fn body(region: &str, temperature: &str) -> String {
    format!(
        "<target:region codeSpace=\"http://xml.fmi.fi/namespace/location/region\">{region}</target:region>\n\
         <gml:doubleOrNilReasonTupleList>\n {temperature} \n</gml:doubleOrNilReasonTupleList>"
    )
}

async fn mount_body(server: &MockServer, place: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path("/fmi-apikey/KEY/wfs"))
        .and(query_param("place", place))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_sends_stored_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fmi-apikey/KEY/wfs"))
        .and(query_param("request", "getFeature"))
        .and(query_param("storedquery_id", "fmi::observations::weather::multipointcoverage"))
        .and(query_param("place", "Helsinki"))
        .and(query_param("parameters", "temperature"))
        .and(query_param("maxlocations", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE))
        .expect(1)
        .mount(&server)
        .await;

    let provider = FmiProvider::new(&server.uri(), Some("KEY"), "Helsinki").unwrap();
    let body = provider.fetch_body().await.unwrap();

    assert!(body.contains("doubleOrNilReasonTupleList"));
}

#[tokio::test]
async fn test_fetch_error_status() {
    let server = MockServer::start().await;
    mount_body(&server, "Helsinki", 400, "<ExceptionReport>Invalid API key</ExceptionReport>".into())
        .await;

    let provider = FmiProvider::new(&server.uri(), Some("KEY"), "Helsinki").unwrap();
    let err = provider.fetch_body().await.unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("400"));
    assert!(msg.contains("Invalid API key"));
}

#[tokio::test]
async fn test_cycle_forwards_fixture_observation() {
    let server = MockServer::start().await;
    mount_body(&server, "Helsinki", 200, FIXTURE.to_string()).await;

    let provider = FmiProvider::new(&server.uri(), Some("KEY"), "Helsinki").unwrap();
    let link = Arc::new(WriterLink::new(Vec::new(), OutputFormat::Json));
    let relay = Relay::new(Arc::new(provider), link.clone());

    let outcome = relay.run_cycle(Trigger::Ready).await;

    let expected = WeatherMessage { temperature: "5.2°C".into(), city: "Helsinki".into() };
    assert_eq!(outcome, CycleOutcome::Sent(expected));

    drop(relay);
    let out = Arc::try_unwrap(link).unwrap().into_inner();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "{\"temperature\":\"5.2°C\",\"city\":\"Helsinki\"}\n"
    );
}

#[tokio::test]
async fn test_cycle_drops_body_without_temperature() {
    let server = MockServer::start().await;
    let region_only =
        "<target:region codeSpace=\"http://xml.fmi.fi/namespace/location/region\">Helsinki</target:region>";
    mount_body(&server, "Helsinki", 200, region_only.to_string()).await;

    let provider = FmiProvider::new(&server.uri(), Some("KEY"), "Helsinki").unwrap();
    let link = Arc::new(WriterLink::new(Vec::new(), OutputFormat::Json));
    let relay = Relay::new(Arc::new(provider), link.clone());

    let outcome = relay.run_cycle(Trigger::DeviceMessage).await;

    assert_eq!(outcome, CycleOutcome::Dropped(DropReason::Extract(ExtractError::MissingTemperature)));
    drop(relay);
    assert!(Arc::try_unwrap(link).unwrap().into_inner().is_empty());
}

#[tokio::test]
async fn test_cycle_drops_on_server_error() {
    let server = MockServer::start().await;
    mount_body(&server, "Helsinki", 503, body("Helsinki", "5.2")).await;

    let provider = FmiProvider::new(&server.uri(), Some("KEY"), "Helsinki").unwrap();
    let link = Arc::new(WriterLink::new(Vec::new(), OutputFormat::Json));
    let relay = Relay::new(Arc::new(provider), link.clone());

    let outcome = relay.run_cycle(Trigger::Tick).await;

    assert!(matches!(outcome, CycleOutcome::Dropped(DropReason::Fetch(ref e)) if e.contains("503")));
}

#[tokio::test]
async fn test_two_cycles_reflect_their_own_responses() {
    let server = MockServer::start().await;
    mount_body(&server, "Helsinki", 200, body("Helsinki", "5.2")).await;
    mount_body(&server, "Oulu", 200, body("Oulu", "-3.4")).await;

    let link = Arc::new(WriterLink::new(Vec::new(), OutputFormat::Json));
    let helsinki = Relay::new(
        Arc::new(FmiProvider::new(&server.uri(), Some("KEY"), "Helsinki").unwrap()),
        link.clone(),
    );
    let oulu = Relay::new(
        Arc::new(FmiProvider::new(&server.uri(), Some("KEY"), "Oulu").unwrap()),
        link.clone(),
    );

    let (a, b) = tokio::join!(helsinki.run_cycle(Trigger::Ready), oulu.run_cycle(Trigger::Ready));

    assert_eq!(
        a,
        CycleOutcome::Sent(WeatherMessage { temperature: "5.2°C".into(), city: "Helsinki".into() })
    );
    assert_eq!(
        b,
        CycleOutcome::Sent(WeatherMessage { temperature: "-3.4°C".into(), city: "Oulu".into() })
    );
}

#[tokio::test]
async fn test_event_loop_runs_cycle_per_device_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wfs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE))
        .expect(3)
        .mount(&server)
        .await;

    let provider = FmiProvider::new(&server.uri(), None, "Helsinki").unwrap();
    let link = Arc::new(WriterLink::new(Vec::new(), OutputFormat::Dictionary));
    let relay = Arc::new(Relay::new(Arc::new(provider), link.clone()));

    let outcomes = run_event_loop(relay, &b"\x00\n\x00\n"[..], None).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| matches!(o, CycleOutcome::Sent(_))));

    let out = String::from_utf8(Arc::try_unwrap(link).unwrap().into_inner()).unwrap();
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| l.starts_with("02")));
}
