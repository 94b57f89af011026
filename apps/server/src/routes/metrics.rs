use actix_web::{HttpResponse, get, web};
use uppe_service::metrics::exposition::{CONTENT_TYPE, gather};

use crate::error::AppError;
use crate::state::AppState;

macros_utils::routes! {
    route metrics_route,
}

/// Prometheus scrape target
#[get("/metrics")]
pub async fn metrics_route(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let body = gather(&state.registry).await?;
    Ok(HttpResponse::Ok().content_type(CONTENT_TYPE).body(body))
}
