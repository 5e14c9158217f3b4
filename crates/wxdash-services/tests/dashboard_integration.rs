//! End-to-end tests for the Dashboard against a mock weather and AI provider.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxdash_ai::{AiClient, AiClientConfig};
use wxdash_core::{AppError, Units};
use wxdash_services::{
    Dashboard, FavoritesStore, FileSlotStorage, MemorySlotStorage, SlotStorage,
};
use wxdash_weather::{WeatherClient, WeatherClientConfig};

/// 2024-06-01T00:00:00Z
const DAY_ONE: i64 = 1_717_200_000;

fn current_body(name: &str, temp: f64) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "sys": {"country": "PT"},
        "main": {"temp": temp, "humidity": 72},
        "wind": {"speed": 5.0},
        "weather": [{"description": "scattered clouds", "icon": "03d"}]
    })
}

fn forecast_body() -> serde_json::Value {
    serde_json::json!({
        "list": [
            {"dt": DAY_ONE, "main": {"temp_min": 12.0, "temp_max": 15.0},
             "weather": [{"description": "light rain", "icon": "10d"}]},
            {"dt": DAY_ONE + 3 * 3600, "main": {"temp_min": 10.0, "temp_max": 19.0},
             "weather": [{"description": "clear sky", "icon": "01d"}]},
            {"dt": DAY_ONE + 86_400, "main": {"temp_min": 14.0, "temp_max": 22.0},
             "weather": [{"description": "few clouds", "icon": "02d"}]}
        ]
    })
}

async fn mount_city(server: &MockServer, city: &str, temp: f64) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", city))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(city, temp)))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("q", city))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(1)
        .mount(server)
        .await;
}

fn dashboard(server: &MockServer, storage: Arc<dyn SlotStorage>) -> Dashboard {
    let weather =
        WeatherClient::new(WeatherClientConfig::new("test_key").with_base_url(server.uri()))
            .unwrap();
    let ai = AiClient::new(AiClientConfig::new("test_token").with_base_url(server.uri())).unwrap();

    Dashboard::new(
        Arc::new(weather),
        Arc::new(ai),
        FavoritesStore::load(storage),
        Units::Metric,
    )
}

#[tokio::test]
async fn test_search_shows_weather_and_forecast() {
    let mock_server = MockServer::start().await;
    mount_city(&mock_server, "Braga", 16.0).await;

    let dashboard = dashboard(&mock_server, Arc::new(MemorySlotStorage::new()));
    assert!(dashboard.view().is_none());

    let view = dashboard.search("  Braga ").await.unwrap();

    assert_eq!(view.city, "Braga, PT");
    assert_eq!(view.temperature, 16.0);
    assert_eq!(view.temperature_symbol, "°C");
    assert_eq!(view.humidity_pct, 72);
    assert_eq!(view.condition_text, "scattered clouds");
    assert_eq!(view.forecast.len(), 2);
    assert_eq!(view.forecast[0].min_temp, Some(10.0));
    assert_eq!(view.forecast[0].max_temp, Some(19.0));
    assert_eq!(view.forecast[0].condition_text.as_deref(), Some("light rain"));
    assert_eq!(
        view.forecast[0].icon_url.as_deref(),
        Some("https://openweathermap.org/img/wn/10d@2x.png")
    );
    assert_eq!(dashboard.view(), Some(view));
}

#[tokio::test]
async fn test_toggle_units_reconverts_without_request() {
    let mock_server = MockServer::start().await;
    // `.expect(1)` fails the test on drop if the toggle hits the network.
    mount_city(&mock_server, "Braga", 20.0).await;

    let dashboard = dashboard(&mock_server, Arc::new(MemorySlotStorage::new()));
    dashboard.search("Braga").await.unwrap();

    assert_eq!(dashboard.toggle_units(), Units::Imperial);
    let view = dashboard.view().unwrap();
    assert_eq!(view.temperature, 68.0);
    assert_eq!(view.temperature_symbol, "°F");
    assert_eq!(view.speed_symbol, "mph");
    assert!((view.wind_speed - 11.1847).abs() < 1e-9);
    assert_eq!(view.forecast[1].max_temp, Some(22.0 * 9.0 / 5.0 + 32.0));

    dashboard.set_units(Units::Metric);
    assert_eq!(dashboard.view().unwrap().temperature, 20.0);
}

#[tokio::test]
async fn test_search_with_country_and_favorites_persisted() {
    let mock_server = MockServer::start().await;
    mount_city(&mock_server, "Braga", 16.0).await;
    mount_city(&mock_server, "Paris,FR", 21.0).await;

    let temp = TempDir::new().unwrap();
    let storage: Arc<dyn SlotStorage> = Arc::new(FileSlotStorage::new(temp.path()));
    let dashboard = dashboard(&mock_server, storage.clone());

    dashboard.search("Braga").await.unwrap();
    dashboard.search("Paris, FR").await.unwrap();

    let favorites = dashboard.favorites();
    assert_eq!(favorites.len(), 2);
    assert_eq!(favorites[0].to_string(), "Paris, FR");
    assert_eq!(favorites[1].to_string(), "Braga");

    let reloaded = FavoritesStore::load(storage);
    assert_eq!(reloaded.list(), favorites);
}

#[tokio::test]
async fn test_select_favorite_uses_cache() {
    let mock_server = MockServer::start().await;
    mount_city(&mock_server, "Braga", 16.0).await;
    mount_city(&mock_server, "Porto", 18.0).await;

    let dashboard = dashboard(&mock_server, Arc::new(MemorySlotStorage::new()));
    dashboard.search("Braga").await.unwrap();
    dashboard.search("Porto").await.unwrap();

    let view = dashboard.select_favorite(1).await.unwrap();

    assert_eq!(view.temperature, 16.0);
    assert_eq!(dashboard.selected_city().unwrap().name, "Braga");
    assert_eq!(dashboard.favorites()[0].name, "Braga");

    let missing = dashboard.select_favorite(7).await;
    assert!(matches!(missing, Err(AppError::NoSuchFavorite(7))));
}

#[tokio::test]
async fn test_sixth_city_evicts_oldest_favorite() {
    let mock_server = MockServer::start().await;
    let cities = ["Braga", "Porto", "Lisbon", "Faro", "Coimbra", "Aveiro"];
    for city in cities {
        mount_city(&mock_server, city, 15.0).await;
    }

    let dashboard = dashboard(&mock_server, Arc::new(MemorySlotStorage::new()));
    for city in cities {
        dashboard.search(city).await.unwrap();
    }

    let names: Vec<String> = dashboard.favorites().into_iter().map(|q| q.name).collect();
    assert_eq!(names, vec!["Aveiro", "Coimbra", "Faro", "Lisbon", "Porto"]);

    dashboard.clear_favorites().unwrap();
    assert!(dashboard.favorites().is_empty());
}

#[tokio::test]
async fn test_failed_search_keeps_previous_view() {
    let mock_server = MockServer::start().await;
    mount_city(&mock_server, "Braga", 16.0).await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Atlantis"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dashboard = dashboard(&mock_server, Arc::new(MemorySlotStorage::new()));
    dashboard.search("Braga").await.unwrap();

    let err = dashboard.search("Atlantis").await.unwrap_err();
    assert!(matches!(err, AppError::CityNotFound(_)));
    assert_eq!(err.user_message(), "City not found");

    // A retry inside the throttle window never leaves the process.
    let err = dashboard.search("Atlantis").await.unwrap_err();
    assert!(matches!(err, AppError::Throttled));

    assert_eq!(dashboard.view().unwrap().city, "Braga, PT");
    assert_eq!(dashboard.favorites().len(), 1);
}

#[tokio::test]
async fn test_forecast_failure_keeps_current_reading() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("Braga", 16.0)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dashboard = dashboard(&mock_server, Arc::new(MemorySlotStorage::new()));
    let view = dashboard.search("Braga").await.unwrap();

    assert_eq!(view.temperature, 16.0);
    assert!(view.forecast.is_empty());
}

#[tokio::test]
async fn test_empty_search_is_rejected() {
    let mock_server = MockServer::start().await;
    let dashboard = dashboard(&mock_server, Arc::new(MemorySlotStorage::new()));

    let err = dashboard.search("   ").await.unwrap_err();

    assert!(matches!(err, AppError::EmptyQuery(_)));
    assert!(dashboard.favorites().is_empty());
}

#[tokio::test]
async fn test_ask_records_answer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Bring a jacket."}}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dashboard = dashboard(&mock_server, Arc::new(MemorySlotStorage::new()));

    assert_eq!(dashboard.ask("Cold tonight?").await.unwrap(), "Bring a jacket.");
    assert_eq!(dashboard.last_answer().as_deref(), Some("Bring a jacket."));

    let err = dashboard.ask("").await.unwrap_err();
    assert!(matches!(err, AppError::EmptyQuery(_)));
}

#[tokio::test]
async fn test_ai_failure_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let dashboard = dashboard(&mock_server, Arc::new(MemorySlotStorage::new()));
    let err = dashboard.ask("Snow?").await.unwrap_err();

    assert_eq!(err.user_message(), "Error: Unable to get AI response.");
    assert!(dashboard.last_answer().is_none());
}
