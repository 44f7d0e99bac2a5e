//! Report assemblers over the sales dataset.
//!
//! Each submodule exposes free functions taking an explicit
//! `&mut AsyncPgConnection`, so callers decide where the connection (and any
//! transaction around it) comes from. [`ReportEngine`] is the pooled front end
//! the HTTP layer uses.

mod aggregates;
mod dashboard;
mod dimensions;
mod listings;

pub use aggregates::{sales_by_category, sales_by_date_range, top_products};
pub use dashboard::{dashboard_stats, dashboard_stats_filtered};
pub use dimensions::{list_categories, list_cities, list_states, list_subcategories};
pub use listings::{list_products, list_sales};

use crate::{
    config::AppConfig,
    db::{self, PgPool},
    error::{Result, ServiceError},
    filters::{rewrite_placeholders, DateRange, SalesFilter, SqlBindValue},
    models::{
        CategorySales, DailySales, DashboardStats, FilteredDashboard, Product, Sale, TopProduct,
    },
};
use diesel::deserialize::QueryableByName;
use diesel::pg::Pg;
use diesel::sql_query;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;

/// Hand-written SQL with `?` placeholders and its binds in placeholder order.
#[derive(Debug, Clone)]
pub struct SqlStatement {
    sql: String,
    binds: Vec<SqlBindValue>,
}

impl SqlStatement {
    pub fn new(sql: String, binds: Vec<SqlBindValue>) -> Self {
        Self { sql, binds }
    }

    /// The statement as sent to PostgreSQL: `$n` placeholders plus binds.
    pub fn to_sql_and_params(&self) -> (String, Vec<SqlBindValue>) {
        (rewrite_placeholders(&self.sql), self.binds.clone())
    }

    pub async fn load<T>(&self, conn: &mut AsyncPgConnection) -> Result<Vec<T>>
    where
        T: QueryableByName<Pg> + Send + 'static,
    {
        let mut query = sql_query(rewrite_placeholders(&self.sql)).into_boxed::<Pg>();
        for bind in &self.binds {
            query = bind.apply(query);
        }

        query.load::<T>(conn).await.map_err(ServiceError::from)
    }

    /// Loads a statement that always yields exactly one row (ungrouped aggregates).
    pub async fn load_one<T>(&self, conn: &mut AsyncPgConnection) -> Result<T>
    where
        T: QueryableByName<Pg> + Send + 'static,
    {
        self.load::<T>(conn).await?.into_iter().next().ok_or_else(|| {
            ServiceError::DatastoreUnavailable("aggregate query returned no rows".into())
        })
    }
}

/// Resolves a raw `limit` query value; unusable values fall back to the default.
pub fn resolve_top_limit(raw: Option<&str>, config: &AppConfig) -> i64 {
    match raw.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(value)) if value > 0 => value.min(config.max_top_limit),
        Some(_) => {
            debug!(limit = ?raw, "unusable limit, using default");
            config.default_top_limit
        }
        None => config.default_top_limit,
    }
}

#[derive(Clone)]
pub struct ReportEngine {
    pool: PgPool,
}

impl ReportEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        let mut conn = db::checkout(&self.pool).await?;
        list_categories(&mut conn).await
    }

    pub async fn subcategories(&self, category: Option<&str>) -> Result<Vec<String>> {
        let mut conn = db::checkout(&self.pool).await?;
        list_subcategories(&mut conn, category).await
    }

    pub async fn states(&self) -> Result<Vec<String>> {
        let mut conn = db::checkout(&self.pool).await?;
        list_states(&mut conn).await
    }

    pub async fn cities(&self, state: Option<&str>) -> Result<Vec<String>> {
        let mut conn = db::checkout(&self.pool).await?;
        list_cities(&mut conn, state).await
    }

    pub async fn products(
        &self,
        category: Option<&str>,
        subcategory: Option<&str>,
    ) -> Result<Vec<Product>> {
        let mut conn = db::checkout(&self.pool).await?;
        list_products(&mut conn, category, subcategory).await
    }

    pub async fn sales(&self) -> Result<Vec<Sale>> {
        let mut conn = db::checkout(&self.pool).await?;
        list_sales(&mut conn).await
    }

    pub async fn sales_by_date(&self, range: DateRange) -> Result<Vec<DailySales>> {
        let mut conn = db::checkout(&self.pool).await?;
        sales_by_date_range(&mut conn, range).await
    }

    pub async fn sales_by_category(&self) -> Result<Vec<CategorySales>> {
        let mut conn = db::checkout(&self.pool).await?;
        sales_by_category(&mut conn).await
    }

    pub async fn top_products(&self, limit: i64) -> Result<Vec<TopProduct>> {
        let mut conn = db::checkout(&self.pool).await?;
        top_products(&mut conn, limit).await
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardStats> {
        let mut conn = db::checkout(&self.pool).await?;
        dashboard_stats(&mut conn).await
    }

    pub async fn dashboard(&self, filter: &SalesFilter) -> Result<FilteredDashboard> {
        let mut conn = db::checkout(&self.pool).await?;
        dashboard_stats_filtered(&mut conn, filter).await
    }
}

#[cfg(test)]
pub(crate) fn assert_bind_arity(statement: &SqlStatement) {
    let (sql, binds) = statement.to_sql_and_params();
    assert_eq!(
        crate::filters::max_dollar_placeholder(&sql),
        binds.len(),
        "sql placeholders must match binds\nsql: {sql}\nbinds: {binds:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::embedded("postgres://unused/db".to_string())
    }

    #[test]
    fn missing_or_unusable_limits_use_default() {
        let config = config();
        for raw in [None, Some("abc"), Some(""), Some("0"), Some("-3"), Some("2.5")] {
            assert_eq!(resolve_top_limit(raw, &config), 10, "limit {raw:?}");
        }
    }

    #[test]
    fn positive_limits_are_kept_and_clamped() {
        let config = config();
        assert_eq!(resolve_top_limit(Some("3"), &config), 3);
        assert_eq!(resolve_top_limit(Some(" 25 "), &config), 25);
        assert_eq!(resolve_top_limit(Some("100000"), &config), 500);
    }

    #[test]
    fn statement_rewrites_placeholders_for_postgres() {
        let statement = SqlStatement::new(
            "SELECT 1 FROM t WHERE a = ? AND b = ?".to_string(),
            vec![SqlBindValue::Text("x".into()), SqlBindValue::BigInt(2)],
        );
        let (sql, binds) = statement.to_sql_and_params();
        assert_eq!(sql, "SELECT 1 FROM t WHERE a = $1 AND b = $2");
        assert_eq!(binds.len(), 2);
        assert_bind_arity(&statement);
    }
}
