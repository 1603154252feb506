use geoweather_core::{ApiReply, WeatherQuery, WeatherService};
use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc};
use warp::http::StatusCode;
use warp::http::header::{CONTENT_TYPE, HeaderValue};
use warp::{Filter, Reply};

pub async fn run(address: SocketAddr, service: WeatherService) {
    tracing::info!(
        "Listening on http://{} (cache: {:?})",
        address,
        service.config().cache_dir
    );

    warp::serve(routes(Arc::new(service))).run(address).await
}

fn routes(
    service: Arc<WeatherService>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let health_route = warp::path!("health").and(warp::get()).map(|| StatusCode::OK);

    let weather_route = warp::path!("weather")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_service(service))
        .and_then(weather);

    health_route.or(weather_route)
}

fn with_service(
    service: Arc<WeatherService>,
) -> impl Filter<Extract = (Arc<WeatherService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn weather(
    params: HashMap<String, String>,
    service: Arc<WeatherService>,
) -> Result<impl Reply, Infallible> {
    let query = WeatherQuery::from_params(&params);
    let reply = ApiReply::from_result(&service.handle(&query).await);

    if !reply.is_success() {
        tracing::warn!("GET /weather {:?} -> {}", params, reply.status);
    }

    Ok(json_reply(reply))
}

fn json_reply(reply: ApiReply) -> warp::reply::Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut res = warp::reply::with_status(reply.body, status).into_response();
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
    res
}
