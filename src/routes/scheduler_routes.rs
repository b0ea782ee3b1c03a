use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::scheduler_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/scheduler", get(scheduler_controller::get_status))
        .route("/scheduler/start", post(scheduler_controller::post_start))
        .route("/scheduler/stop", post(scheduler_controller::post_stop))
}
