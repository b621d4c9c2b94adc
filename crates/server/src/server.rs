use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::{net::SocketAddr, sync::Arc};

use crate::{backup, balances, locations, organizers, payments, players, sessions};
use engine::{Engine, EngineError};

static ORGANIZER_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("organizer-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Organizer every request of the scoped routes acts for.
///
/// Inserted as a request extension by the scope middleware once the
/// organizer has been checked.
#[derive(Clone, Debug)]
pub struct OrganizerScope(pub String);

/// `TypedHeader` for the organizer scope.
///
/// Scoped requests must contain an "organizer-id" entry in the header.
#[derive(Debug)]
struct OrganizerHeader(String);

impl Header for OrganizerHeader {
    fn name() -> &'static axum::http::HeaderName {
        &ORGANIZER_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(AxumError::invalid());
        }

        Ok(OrganizerHeader(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode organizer-id header"),
        }
    }
}

async fn scope(
    TypedHeader(OrganizerHeader(organizer_id)): TypedHeader<OrganizerHeader>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    match state.engine.organizer(&organizer_id).await {
        Ok(_) => {}
        Err(EngineError::Forbidden(_)) => return Err(StatusCode::FORBIDDEN),
        Err(err) => {
            tracing::error!("failed to check organizer scope: {err}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    request.extensions_mut().insert(OrganizerScope(organizer_id));
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    let scoped = Router::new()
        .route("/organizer", get(organizers::get))
        .route("/locations", post(locations::location_new).get(locations::list))
        .route("/locations/{id}", axum::routing::delete(locations::delete))
        .route("/players", post(players::player_new).get(players::list))
        .route(
            "/players/{id}",
            get(players::get)
                .patch(players::update)
                .delete(players::delete),
        )
        .route("/players/{id}/active", put(players::set_active))
        .route("/sessions", post(sessions::record).get(sessions::list))
        .route("/sessions/plan", post(sessions::plan))
        .route(
            "/sessions/{id}",
            get(sessions::get)
                .put(sessions::update)
                .delete(sessions::delete),
        )
        .route("/sessions/{id}/complete", post(sessions::complete))
        .route("/sessions/{id}/cancel", post(sessions::cancel))
        .route("/payments", post(payments::payment_new).get(payments::list))
        .route(
            "/payments/{id}",
            get(payments::get)
                .patch(payments::update)
                .delete(payments::delete),
        )
        .route("/transfers", post(payments::transfer_new))
        .route("/transfers/check", get(payments::transfer_check))
        .route(
            "/transfers/{reference}",
            get(payments::transfer_get)
                .patch(payments::transfer_update)
                .delete(payments::transfer_delete),
        )
        .route("/balances", get(balances::list))
        .route("/balances/summary", get(balances::summary))
        .route("/balances/recompute", post(balances::recompute_all))
        .route("/balances/{player_id}", get(balances::get))
        .route("/balances/{player_id}/recompute", post(balances::recompute))
        .route("/backup/export", get(backup::export))
        .route("/backup/import", post(backup::import))
        .route_layer(middleware::from_fn_with_state(state.clone(), scope));

    Router::new()
        .route("/organizers", post(organizers::organizer_new))
        .merge(scoped)
        .with_state(state)
}

/// Builds the application router. Exposed for in-process tests.
pub fn app(engine: Engine) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
    })
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
