use crate::{
    config::AppConfig,
    db::{self, PgPool},
    error::{Result, ServiceError},
    filters::{DateRange, FilterParams, SalesFilter},
    models::{
        CategorySales, DailySales, DashboardStats, FilteredDashboard, Product, Sale, TopProduct,
    },
    reports::{resolve_top_limit, ReportEngine},
    state::AppState,
};
use axum::{
    extract::{FromRequestParts, Query, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

/// `Query` whose rejections surface as JSON `InvalidRequest` errors.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ServiceError))]
struct QueryParams<T>(T);

#[derive(Debug, Default, Deserialize)]
struct CategoryParams {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    subcategory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StateParams {
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DateRangeParams {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LimitParams {
    #[serde(default)]
    limit: Option<String>,
}

impl Server {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect_pool(&config).await?;
        Ok(Self::with_pool(config, pool))
    }

    pub fn with_pool(config: AppConfig, pool: PgPool) -> Self {
        let config = Arc::new(config);
        let reports = ReportEngine::new(pool);
        let state = AppState::new(Arc::clone(&config), reports);

        Self { config, state }
    }

    pub fn router(&self) -> Router {
        let routes = [
            ("/categories/", get(Self::categories)),
            ("/subcategories/", get(Self::subcategories)),
            ("/products/", get(Self::products)),
            ("/products/top/", get(Self::top_products)),
            ("/sales/", get(Self::sales)),
            ("/sales/by-date/", get(Self::sales_by_date)),
            ("/sales/by-category/", get(Self::sales_by_category)),
            ("/dashboard/stats/", get(Self::dashboard_stats)),
            ("/dashboard/summary/", get(Self::dashboard_summary)),
            ("/states/", get(Self::states)),
            ("/cities/", get(Self::cities)),
        ];

        routes
            .into_iter()
            .fold(
                Router::new().route("/healthz", get(Self::health)),
                |router, (path, handler)| route_with_and_without_slash(router, path, handler),
            )
            .with_state(self.state.clone())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.config.request_timeout,
            ))
            .layer(cors_layer(&self.config))
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "sales analytics API listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<serde_json::Value> {
        Json(json!({ "status": "ok" }))
    }

    async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
        Ok(Json(state.reports.categories().await?))
    }

    async fn subcategories(
        State(state): State<AppState>,
        QueryParams(params): QueryParams<CategoryParams>,
    ) -> Result<Json<Vec<String>>> {
        let values = state
            .reports
            .subcategories(params.category.as_deref())
            .await?;
        Ok(Json(values))
    }

    async fn states(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
        Ok(Json(state.reports.states().await?))
    }

    async fn cities(
        State(state): State<AppState>,
        QueryParams(params): QueryParams<StateParams>,
    ) -> Result<Json<Vec<String>>> {
        Ok(Json(state.reports.cities(params.state.as_deref()).await?))
    }

    async fn products(
        State(state): State<AppState>,
        QueryParams(params): QueryParams<CategoryParams>,
    ) -> Result<Json<Vec<Product>>> {
        let products = state
            .reports
            .products(params.category.as_deref(), params.subcategory.as_deref())
            .await?;
        Ok(Json(products))
    }

    async fn sales(State(state): State<AppState>) -> Result<Json<Vec<Sale>>> {
        Ok(Json(state.reports.sales().await?))
    }

    async fn sales_by_date(
        State(state): State<AppState>,
        QueryParams(params): QueryParams<DateRangeParams>,
    ) -> Result<Json<Vec<DailySales>>> {
        let range =
            DateRange::from_optional(params.start_date.as_deref(), params.end_date.as_deref())?
                .ok_or_else(|| {
                    ServiceError::InvalidRequest("start_date and end_date are required".into())
                })?;
        Ok(Json(state.reports.sales_by_date(range).await?))
    }

    async fn sales_by_category(State(state): State<AppState>) -> Result<Json<Vec<CategorySales>>> {
        Ok(Json(state.reports.sales_by_category().await?))
    }

    async fn top_products(
        State(state): State<AppState>,
        QueryParams(params): QueryParams<LimitParams>,
    ) -> Result<Json<Vec<TopProduct>>> {
        let limit = resolve_top_limit(params.limit.as_deref(), &state.config);
        Ok(Json(state.reports.top_products(limit).await?))
    }

    async fn dashboard_stats(
        State(state): State<AppState>,
        QueryParams(params): QueryParams<FilterParams>,
    ) -> Result<Json<FilteredDashboard>> {
        let filter = SalesFilter::from_params(&params)?;
        Ok(Json(state.reports.dashboard(&filter).await?))
    }

    async fn dashboard_summary(State(state): State<AppState>) -> Result<Json<DashboardStats>> {
        Ok(Json(state.reports.dashboard_summary().await?))
    }
}

fn route_with_and_without_slash(
    router: Router<AppState>,
    path: &'static str,
    handler: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(path.trim_end_matches('/'), handler.clone())
        .route(path, handler)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET]).allow_headers(Any);

    match &config.allowed_origins {
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(parsed))
        }
        None => layer.allow_origin(Any),
    }
}
