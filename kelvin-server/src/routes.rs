//! HTTP routes exposing the aggregate.

use std::convert::Infallible;
use std::sync::Arc;

use kelvin_core::Aggregator;
use serde::Serialize;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

#[derive(Debug, Serialize)]
struct WeatherReply {
    city: String,
    /// Mean in Kelvin.
    temp: f64,
    took: String,
}

/// `GET /hello` and `GET /weather/{city}`.
pub(crate) fn routes(
    aggregator: Arc<Aggregator>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let hello = warp::path!("hello").and(warp::get()).map(|| "Hello!");

    let weather = warp::path!("weather" / String)
        .and(warp::get())
        .and(with_aggregator(aggregator))
        .and_then(get_weather);

    hello.or(weather)
}

fn with_aggregator(
    aggregator: Arc<Aggregator>,
) -> impl Filter<Extract = (Arc<Aggregator>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&aggregator))
}

async fn get_weather(
    raw_city: String,
    aggregator: Arc<Aggregator>,
) -> Result<Response, Infallible> {
    let Ok(city) = urlencoding::decode(&raw_city) else {
        return Ok(
            warp::reply::with_status("City is not valid UTF-8", StatusCode::BAD_REQUEST)
                .into_response(),
        );
    };
    let city = city.into_owned();

    match aggregator.temperature(&city).await {
        Ok(result) => {
            info!(city = %city, mean = %result.mean, "served aggregate");
            let reply = WeatherReply {
                city,
                temp: result.mean.value(),
                took: format!("{:?}", result.elapsed),
            };
            Ok(warp::reply::json(&reply).into_response())
        }
        Err(err) => {
            error!(city = %city, error = %err, "aggregate failed");
            Ok(
                warp::reply::with_status(err.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
                    .into_response(),
            )
        }
    }
}
