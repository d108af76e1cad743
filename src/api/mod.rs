//! External API adapter (C6): maps HTTP verbs to ledger mutations and
//! triggers C5. Not the hard part — see `engine` for that.

pub mod accounts;
pub mod activity;
pub mod dto;
pub mod entries;
pub mod rules;
pub mod seed;
pub mod simulations;

use axum::{
    http::{header, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::manager::SimulationManager;

pub fn router(manager: SimulationManager) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/simulations", get(simulations::list).post(simulations::create))
        .route("/simulations/:sim", delete(simulations::delete))
        .route(
            "/simulations/:sim/metadata",
            get(simulations::get_metadata).patch(simulations::update_metadata),
        )
        .route("/simulations/:sim/accounts", get(accounts::list).post(accounts::create))
        .route(
            "/simulations/:sim/accounts/:account_id",
            get(accounts::get)
                .patch(accounts::update)
                .delete(accounts::delete),
        )
        .route(
            "/simulations/:sim/accounts/:account_id/entries",
            get(entries::list).post(entries::create),
        )
        .route("/simulations/:sim/activity", get(activity::list))
        .route("/simulations/:sim/funding-rules", get(rules::list).post(rules::create))
        .route("/simulations/:sim/funding-rules/:rule_id", delete(rules::delete))
        .route("/simulations/:sim/seed", post(seed::seed))
        .with_state(manager)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
