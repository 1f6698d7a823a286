use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

pub const LOCATION_URL: &str = "https://ipapi.co/json/";
pub const WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("location lookup failed: {0}")]
    Location(#[source] reqwest::Error),

    #[error("weather lookup failed: {0}")]
    Weather(#[source] reqwest::Error),

    #[error("weather response had no conditions")]
    NoConditions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub country_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<Conditions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conditions {
    pub description: String,
}

/// Sentence posted into the chat as an assistant turn.
pub fn describe(location: &Location, weather: &CurrentWeather) -> Result<String, WeatherError> {
    let conditions = weather.weather.first().ok_or(WeatherError::NoConditions)?;
    Ok(format!(
        "The current weather in {}, {} is {}°C with {}.",
        location.city, location.country_name, weather.main.temp, conditions.description
    ))
}

/// Looks up the caller's location by IP, then the current weather there.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    api_key: String,
    location_url: String,
    weather_url: String,
}

impl WeatherClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            location_url: LOCATION_URL.to_string(),
            weather_url: WEATHER_URL.to_string(),
        }
    }

    pub fn with_endpoints(mut self, location_url: impl Into<String>, weather_url: impl Into<String>) -> Self {
        self.location_url = location_url.into();
        self.weather_url = weather_url.into();
        self
    }

    pub async fn location(&self) -> Result<Location, WeatherError> {
        self.http
            .get(&self.location_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(WeatherError::Location)?
            .json()
            .await
            .map_err(WeatherError::Location)
    }

    pub async fn current_weather(&self, latitude: f64, longitude: f64) -> Result<CurrentWeather, WeatherError> {
        self.http
            .get(&self.weather_url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(WeatherError::Weather)?
            .json()
            .await
            .map_err(WeatherError::Weather)
    }

    pub async fn current_report(&self) -> Result<String, WeatherError> {
        let location = self.location().await.inspect_err(|e| error!("Error fetching location data: {e}"))?;
        debug!("Resolved location: {}, {}", location.city, location.country_name);

        let weather = self
            .current_weather(location.latitude, location.longitude)
            .await
            .inspect_err(|e| error!("Error fetching weather data: {e}"))?;

        describe(&location, &weather)
    }
}
