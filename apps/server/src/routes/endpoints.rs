use std::time::Instant;

use actix_web::http::header::{ContentType, LOCATION};
use actix_web::{HttpResponse, get, post, web};
use askama::Template;
use serde::Deserialize;
use tracing::info;
use uppe_service::database::{Endpoint, NewEndpoint};
use uppe_service::metrics::Operation;
use uppe_service::monitoring::classify;

use crate::error::AppError;
use crate::state::AppState;

macros_utils::routes! {
    route index,
    route add,
    route delete,
}

/// One table row of the listing
struct EndpointRow {
    id: i64,
    name: String,
    kind: &'static str,
    up: &'static str,
    registered: &'static str,
    latency: String,
}

impl From<Endpoint> for EndpointRow {
    fn from(endpoint: Endpoint) -> Self {
        Self {
            id: endpoint.id,
            kind: endpoint.kind.as_str(),
            up: yes_no(endpoint.up),
            registered: yes_no(endpoint.registered),
            latency: endpoint.latency_ms.map_or_else(|| "-".to_string(), |ms| format!("{ms} ms")),
            name: endpoint.name,
        }
    }
}

fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    rows: Vec<EndpointRow>,
}

#[derive(Debug, Deserialize)]
pub struct AddForm {
    i_hostname: String,
    #[serde(default)]
    i_port: String,
}

fn redirect_home() -> HttpResponse {
    HttpResponse::Found().insert_header((LOCATION, "/")).finish()
}

/// Current endpoint list and the add form
#[get("/")]
pub async fn index(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let start = Instant::now();
    let result = render_index(&state).await;
    state.observe(Operation::Index, start).await;
    result
}

async fn render_index(state: &AppState) -> Result<HttpResponse, AppError> {
    let rows = state.store.list().await?.into_iter().map(EndpointRow::from).collect();
    let body = IndexTemplate { rows }.render()?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(body))
}

/// Classify the submitted name/port and store the endpoint
#[post("/add")]
pub async fn add(
    state: web::Data<AppState>,
    form: web::Form<AddForm>,
) -> Result<HttpResponse, AppError> {
    let start = Instant::now();
    let classification = classify(&form.i_hostname, &form.i_port);
    let result = state.store.add(NewEndpoint::from(classification)).await;
    state.observe(Operation::Add, start).await;

    let id = result?;
    info!(id, "Added endpoint");
    Ok(redirect_home())
}

/// Remove an endpoint; its metric series stay registered
#[get("/delete/{id}")]
pub async fn delete(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let start = Instant::now();
    let id = id.into_inner();
    let result = state.store.delete(id).await;
    state.observe(Operation::Delete, start).await;

    result?;
    info!(id, "Deleted endpoint");
    Ok(redirect_home())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use std::sync::Arc;
    use uppe_service::database::MemoryStore;
    use uppe_service::monitoring::EndpointKind;

    async fn state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new())).await.unwrap()
    }

    #[actix_web::test]
    async fn test_add_domain_and_redirect() {
        let state = state().await;
        let app = test::init_service(
            App::new().app_data(web::Data::new(state.clone())).configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/add")
            .set_form([("i_hostname", "example.com"), ("i_port", "")])
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(LOCATION).unwrap(), "/");
        let endpoints = state.store.list().await.unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].name, "example.com");
        assert_eq!(endpoints[0].kind, EndpointKind::Domain);
    }

    #[actix_web::test]
    async fn test_add_hostname() {
        let state = state().await;
        let app = test::init_service(
            App::new().app_data(web::Data::new(state.clone())).configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/add")
            .set_form([("i_hostname", "192.168.1.1"), ("i_port", "8080")])
            .to_request();
        test::call_service(&app, req).await;

        let endpoints = state.store.list().await.unwrap();
        assert_eq!(endpoints[0].name, "192.168.1.1:8080");
        assert_eq!(endpoints[0].kind, EndpointKind::Hostname);
        assert_eq!((endpoints[0].up, endpoints[0].registered, endpoints[0].latency_ms), (None, None, None));
    }

    #[actix_web::test]
    async fn test_index_lists_endpoints_escaped() {
        let state = state().await;
        state
            .store
            .add(NewEndpoint { name: "<b>evil</b>".to_string(), kind: EndpointKind::Domain })
            .await
            .unwrap();
        let app = test::init_service(
            App::new().app_data(web::Data::new(state.clone())).configure(routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();

        assert!(body.contains("name=\"i_hostname\""));
        assert!(body.contains("name=\"i_port\""));
        assert!(body.contains("&#60;b&#62;evil&#60;/b&#62;"));
        assert!(!body.contains("<b>evil</b>"));
    }

    #[actix_web::test]
    async fn test_delete_removes_endpoint() {
        let state = state().await;
        let id = state
            .store
            .add(NewEndpoint { name: "example.com".to_string(), kind: EndpointKind::Domain })
            .await
            .unwrap();
        let app = test::init_service(
            App::new().app_data(web::Data::new(state.clone())).configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri(&format!("/delete/{id}")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert!(state.store.get(id).await.unwrap().is_none());

        let req = test::TestRequest::get().uri(&format!("/delete/{id}")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_requests_are_counted() {
        let state = state().await;
        let app = test::init_service(
            App::new().app_data(web::Data::new(state.clone())).configure(routes),
        )
        .await;

        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        test::call_service(&app, test::TestRequest::get().uri("/delete/42").to_request()).await;

        let output = uppe_service::metrics::exposition::gather(&state.registry).await.unwrap();
        assert!(output.contains("uppe_request_index_operations_total 2"));
        assert!(output.contains("uppe_request_delete_operations_total 1"));
        assert!(output.contains("uppe_request_add_operations_total 0"));
    }
}
