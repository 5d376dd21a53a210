mod error;
pub mod form;
pub mod pages;

use actix_cors::Cors;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::http::StatusCode;
use actix_web::{dev::Server, get, post, route, web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::application::use_cases::csv_export::{CSV_FILENAME, CSV_MIME};
use crate::application::{CsvExport, FilterBuilder, FilterOptions};
use crate::domain::app_config::AppConfig;
use crate::domain::error::Result;
use crate::domain::estimate::Estimate;
use crate::domain::filter::FormFields;
use crate::infrastructure::db::{DbSession, EstimateStore};

use form::read_form;
use pages::{wants_json, HtmlRenderer, PageRenderer};

/// Process-wide state shared by every worker. The pool is the only resource;
/// connections are taken per request through [`DbSession`].
pub struct HttpState {
    pub pool: SqlitePool,
    pub filter_builder: FilterBuilder,
    pub filter_options: FilterOptions,
    pub csv_export: CsvExport,
    pub renderer: Arc<dyn PageRenderer>,
}

impl HttpState {
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Self {
        Self {
            pool,
            filter_builder: FilterBuilder::new(),
            filter_options: FilterOptions::new(),
            csv_export: CsvExport::new(config.csv_crlf),
            renderer: Arc::new(HtmlRenderer::new()),
        }
    }
}

fn html(status: StatusCode, page: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(page)
}

fn no_indicators(data: &HttpState, req: &HttpRequest) -> HttpResponse {
    if wants_json(req) {
        HttpResponse::NotAcceptable().json(json!({ "indicators": [] }))
    } else {
        html(StatusCode::NOT_ACCEPTABLE, data.renderer.no_indicators())
    }
}

/// Runs the filter for one request on its own session.
async fn filtered_rows(data: &HttpState, form: &FormFields) -> Result<Vec<Estimate>> {
    let mut session = DbSession::open(&data.pool).await?;
    data.filter_builder.handle_form(&mut session, form).await
}

#[route("/", method = "GET", method = "POST")]
async fn index(
    req: HttpRequest,
    body: web::Bytes,
    data: web::Data<HttpState>,
) -> Result<HttpResponse> {
    let form = read_form(&req, &body);
    let mut session = DbSession::open(&data.pool).await?;
    let view = data.filter_options.build(&mut session, &form).await?;

    info!(
        route = "/",
        categories = view.indicator_category.len(),
        indicators = view.indicators.len(),
        go_disabled = view.go_disabled,
        "Rendered filter options"
    );

    if wants_json(&req) {
        return Ok(HttpResponse::Ok().json(view));
    }
    Ok(html(StatusCode::OK, data.renderer.index(&view, &form)))
}

#[get("/login")]
async fn login(data: web::Data<HttpState>) -> HttpResponse {
    html(StatusCode::OK, data.renderer.login())
}

#[post("/results")]
async fn results(
    req: HttpRequest,
    body: web::Bytes,
    data: web::Data<HttpState>,
) -> Result<HttpResponse> {
    let form = read_form(&req, &body);
    let rows = filtered_rows(&data, &form).await?;

    info!(route = "/results", rows = rows.len(), "Filtered estimates");

    if rows.is_empty() {
        return Ok(no_indicators(&data, &req));
    }
    if wants_json(&req) {
        return Ok(HttpResponse::Ok().json(json!({ "indicators": rows })));
    }
    Ok(html(StatusCode::OK, data.renderer.results(&rows, &form)))
}

#[route("/get-csv", method = "GET", method = "POST")]
async fn get_csv(
    req: HttpRequest,
    body: web::Bytes,
    data: web::Data<HttpState>,
) -> Result<HttpResponse> {
    let form = read_form(&req, &body);
    let rows = filtered_rows(&data, &form).await?;

    info!(route = "/get-csv", rows = rows.len(), "Exporting estimates");

    if rows.is_empty() {
        return Ok(no_indicators(&data, &req));
    }

    let document = data.csv_export.export_estimates(&rows)?;
    Ok(HttpResponse::Ok()
        .content_type(CSV_MIME)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(CSV_FILENAME.to_string())],
        })
        .body(document))
}

#[get("/about-data/")]
async fn about_data(req: HttpRequest, data: web::Data<HttpState>) -> Result<HttpResponse> {
    let mut session = DbSession::open(&data.pool).await?;
    let decisions = session.fetch_decisions().await?;
    drop(session);

    info!(
        route = "/about-data/",
        decisions = decisions.len(),
        "Listed decisions"
    );

    if wants_json(&req) {
        return Ok(HttpResponse::Ok().json(json!({ "decisions": decisions })));
    }
    Ok(html(StatusCode::OK, data.renderer.about_data(&decisions)))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(login)
        .service(results)
        .service(get_csv)
        .service(about_data);
}

pub fn start_server(state: HttpState, config: &AppConfig) -> std::io::Result<Server> {
    let state = web::Data::new(state);
    let origins = config.allowed_origins.clone();

    let server = HttpServer::new(move || {
        let cors = origins.iter().fold(
            Cors::default().allowed_methods(vec!["GET", "POST"]),
            |cors, origin| cors.allowed_origin(origin),
        );

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((config.host.clone(), config.port))?
    .run();

    Ok(server)
}
