use crate::handlers;
use crate::pages;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::hub))
        .route("/index.html", get(pages::shell))
        .route("/hub", post(pages::back_to_hub))
        .route("/stale/keep", post(pages::keep_stale))
        .route("/stale/clear", post(pages::clear_stale))
        .route("/app/tipcalc", get(pages::tip_calc))
        .route("/app/tipcalc/parties", post(pages::add_party))
        .route("/app/tipcalc/parties/:index", post(pages::edit_party))
        .route("/app/tipcalc/parties/:index/remove", post(pages::remove_party))
        .route("/app/tipcalc/send", post(pages::send_tips))
        .route("/app/tipcalc/preset", post(pages::propose_preset))
        .route("/app/tipcalc/preset/reset", post(pages::propose_reset))
        .route("/app/tipcalc/preset/confirm", post(pages::confirm_preset))
        .route("/app/tipcalc/preset/cancel", post(pages::cancel_preset))
        .route("/app/tipcalc/clear", post(pages::clear_tips))
        .route("/app/hourscalc", get(pages::hours_calc))
        .route("/app/hourscalc/send", post(pages::send_hours))
        .route("/app/endofday", get(pages::end_of_day))
        .route("/app/endofday/entries", post(pages::add_entry))
        .route("/app/endofday/entries/:kind/:index/edit", post(pages::edit_entry))
        .route("/app/endofday/entries/:kind/:index/delete", post(pages::delete_entry))
        .route("/app/endofday/undo", post(pages::undo))
        .route("/app/endofday/reorder", post(pages::reorder))
        .route("/app/endofday/reset", post(pages::reset_end_of_day))
        .route("/service-worker.js", get(pages::service_worker))
        .route("/manifest.json", get(pages::manifest))
        .route("/style.css", get(pages::stylesheet))
        .route(
            "/api/session",
            get(handlers::get_session).delete(handlers::clear_session),
        )
        .route("/api/entries", post(handlers::add_entry))
        .route(
            "/api/entries/:kind/:index",
            put(handlers::edit_entry).delete(handlers::delete_entry),
        )
        .route("/api/undo", post(handlers::undo))
        .route("/api/reorder", post(handlers::reorder))
        .route("/api/breakdown", get(handlers::get_breakdown))
        .route("/api/stale", get(handlers::get_stale))
        .route("/api/tips", post(handlers::calculate_tips))
        .route("/api/tips/send", post(handlers::send_tips))
        .route(
            "/api/preset",
            get(handlers::get_preset)
                .put(handlers::put_preset)
                .delete(handlers::reset_preset),
        )
        .route("/api/hours", post(handlers::calculate_hours))
        .route("/api/hours/send", post(handlers::send_hours))
        .route("/api/last-app", get(handlers::get_last_app))
        .with_state(state)
}
