// src/relay/http.rs
//! Localhost bridge so an in-page script can reach the background handler.
//! Same JSON contract as the in-process relay.

use super::{RelayClient, RelayRequest, RelayResponse};
use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, Request, Response, Rocket, State};
use tracing::{error, info};

pub struct RelayState {
    pub background: RelayClient,
}

pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "POST, GET, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

/// Answers CORS preflight for any path.
#[rocket::options("/<_..>")]
pub async fn universal_options_handler() -> Status {
    Status::Ok
}

/// Channel failures map to 503 so callers can tell them apart from a
/// `success: false` answer, which is still a 200.
#[post("/message", data = "<request>")]
pub async fn message(
    request: Json<RelayRequest>,
    state: &State<RelayState>,
) -> Result<Json<RelayResponse>, status::Custom<Json<RelayResponse>>> {
    let request = request.into_inner();
    info!("HTTP relay received {}", request.action());

    match state.background.send(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            error!("Relay channel failure: {}", e);
            Err(status::Custom(
                Status::ServiceUnavailable,
                Json(RelayResponse::failure(e.to_string())),
            ))
        }
    }
}

#[get("/health")]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn build_rocket(background: RelayClient, port: u16) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("port", port))
        .merge(("address", "127.0.0.1"));

    rocket::custom(figment)
        .manage(RelayState { background })
        .mount("/", routes![message, health, universal_options_handler])
        .attach(Cors)
}

pub async fn serve(background: RelayClient, port: u16) -> Result<()> {
    info!("Background relay listening on http://127.0.0.1:{}", port);
    build_rocket(background, port)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Relay server failed: {}", e))?;
    Ok(())
}
