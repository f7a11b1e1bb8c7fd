use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    services::weather::Forecast,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(current_weather))
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Falls back to the configured site coordinate when none is given.
async fn current_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<Forecast>> {
    let latitude = query.lat.unwrap_or(state.config.default_latitude);
    let longitude = query.lon.unwrap_or(state.config.default_longitude);

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Validation("Invalid coordinates".to_string()));
    }

    Ok(Json(state.weather.forecast(latitude, longitude).await?))
}
