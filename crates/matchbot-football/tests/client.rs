//! Integration tests for `FootballClient` using wiremock HTTP mocks.

use matchbot_football::{FootballClient, FootballError, LineupStatus};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> FootballClient {
    FootballClient::with_base_url("test-key", &server.uri())
        .expect("client construction should not fail")
}

fn fixture_json(id: u64, date: &str, home: (u64, &str), away: (u64, &str)) -> serde_json::Value {
    json!({
        "fixture": {
            "id": id,
            "referee": null,
            "timezone": "UTC",
            "date": date,
            "timestamp": 1_792_422_000,
            "periods": { "first": null, "second": null },
            "venue": { "id": 550, "name": "Anfield", "city": "Liverpool" },
            "status": { "long": "Not Started", "short": "NS", "elapsed": null }
        },
        "league": {
            "id": 39,
            "name": "Premier League",
            "country": "England",
            "logo": "https://media.api-sports.io/football/leagues/39.png",
            "flag": null,
            "season": 2026,
            "round": "Regular Season - 9"
        },
        "teams": {
            "home": { "id": home.0, "name": home.1, "logo": "https://x/h.png", "winner": null },
            "away": { "id": away.0, "name": away.1, "logo": "https://x/a.png", "winner": null }
        },
        "goals": { "home": null, "away": null },
        "score": {}
    })
}

#[test_log::test(tokio::test)]
async fn upcoming_fixtures_are_parsed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fixtures"))
        .and(query_param("team", "40"))
        .and(query_param("next", "3"))
        .and(header("X-RapidAPI-Key", "test-key"))
        .and(header("X-RapidAPI-Host", "api-football-v1.p.rapidapi.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "get": "fixtures",
            "errors": [],
            "results": 1,
            "response": [
                fixture_json(501, "2026-10-19T15:00:00+00:00", (40, "Liverpool"), (49, "Chelsea"))
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fixtures = test_client(&server)
        .upcoming_fixtures(40, 3)
        .await
        .expect("should parse fixtures");

    assert_eq!(fixtures.len(), 1);
    let f = &fixtures[0];
    assert_eq!(f.id(), 501);
    assert_eq!(f.teams.away.name, "Chelsea");
    assert_eq!(f.fixture.venue.name.as_deref(), Some("Anfield"));
    assert_eq!(f.kickoff().unix_timestamp(), 1_792_422_000);
    assert_eq!(f.goals.home, None);
}

#[test_log::test(tokio::test)]
async fn recent_fixtures_use_last_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fixtures"))
        .and(query_param("team", "49"))
        .and(query_param("last", "8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "response": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fixtures = test_client(&server).recent_fixtures(49, 8).await.unwrap();
    assert!(fixtures.is_empty());
}

#[test_log::test(tokio::test)]
async fn empty_lineups_mean_not_yet_available() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fixtures/lineups"))
        .and(query_param("fixture", "501"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "response": []
        })))
        .mount(&server)
        .await;

    let status = test_client(&server).lineups(501).await.unwrap();
    assert_eq!(status, LineupStatus::NotYetAvailable);
}

#[test_log::test(tokio::test)]
async fn announced_lineups_are_keyed_by_team() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fixtures/lineups"))
        .and(query_param("fixture", "501"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "response": [
                {
                    "team": { "id": 40, "name": "Liverpool", "logo": "x", "colors": null },
                    "formation": "4-3-3",
                    "startXI": [
                        { "player": { "id": 1, "name": "Alisson", "number": 1, "pos": "G", "grid": "1:1" } }
                    ],
                    "substitutes": [
                        { "player": { "id": 2, "name": "Kelleher", "number": 62, "pos": "G", "grid": null } }
                    ],
                    "coach": { "id": 3, "name": "A. Slot", "photo": "x" }
                },
                {
                    "team": { "id": 49, "name": "Chelsea", "logo": "x", "colors": null },
                    "formation": null,
                    "startXI": [],
                    "substitutes": [],
                    "coach": null
                }
            ]
        })))
        .mount(&server)
        .await;

    let status = test_client(&server).lineups(501).await.unwrap();
    let LineupStatus::Announced(lineups) = status else {
        panic!("lineup should be announced");
    };
    // A team with an empty starting XI has not announced yet.
    assert_eq!(lineups.len(), 1);
    let liverpool = &lineups[&40];
    assert_eq!(liverpool.formation.as_deref(), Some("4-3-3"));
    assert_eq!(liverpool.start_xi[0].player.name, "Alisson");
}

#[test_log::test(tokio::test)]
async fn api_errors_in_envelope_are_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fixtures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": { "token": "Error/Missing application key" },
            "response": []
        })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .upcoming_fixtures(40, 3)
        .await
        .expect_err("should surface API error");
    assert!(matches!(err, FootballError::Api { .. }), "got {err:?}");
}

#[test_log::test(tokio::test)]
async fn http_failure_is_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fixtures"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .upcoming_fixtures(40, 3)
        .await
        .expect_err("should fail");
    assert!(
        matches!(err, FootballError::Status { status: 503, .. }),
        "got {err:?}"
    );
}

#[test_log::test(tokio::test)]
async fn malformed_fixture_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fixtures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "response": [ { "fixture": { "id": "not-a-number" } } ]
        })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .upcoming_fixtures(40, 3)
        .await
        .expect_err("should fail");
    assert!(matches!(err, FootballError::Decode { .. }), "got {err:?}");
}
