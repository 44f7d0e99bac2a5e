//! Dashboard reports.
//!
//! Both dashboards issue several aggregate queries; each runs them inside one
//! read-only REPEATABLE READ transaction so every section reflects the same
//! snapshot of the store.

use super::{aggregates::category_sales_statement, SqlStatement};
use crate::{
    error::{Result, ServiceError},
    filters::{Predicate, SalesFilter},
    models::{
        CategorySales, CategoryTotal, CustomerTotal, DashboardStats, DashboardSummary, DateTotal,
        FilteredDashboard, GrandTotal, MonthlySales, ProductTotal, SegmentTotal,
    },
    schema::columns::{
        CATEGORY, CITY, CUSTOMER_ID, CUSTOMER_NAME, ORDER_DAY, PRODUCT_ID, PRODUCT_NAME, SALES,
        SALES_TOTAL, SEGMENT, STATE, SUB_CATEGORY, TABLE,
    },
};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::AsyncPgConnection;
use tracing::debug;

const MONTHS_SHOWN: i64 = 12;
const TOP_CATEGORIES: i64 = 5;
const TOP_CUSTOMERS: i64 = 10;
const TOP_PRODUCTS: i64 = 20;

/// Whole-table overview: headline numbers, the latest 12 months (oldest first)
/// and the five best-selling categories.
pub async fn dashboard_stats(conn: &mut AsyncPgConnection) -> Result<DashboardStats> {
    let statements = SummaryStatements::new();
    let statements = &statements;

    conn.build_transaction()
        .read_only()
        .repeatable_read()
        .run(|conn| {
            async move {
                let summary: DashboardSummary = statements.summary.load_one(conn).await?;
                let mut monthly_sales: Vec<MonthlySales> = statements.monthly.load(conn).await?;
                // Latest months are selected newest-first; display oldest-first.
                monthly_sales.reverse();
                let top_categories: Vec<CategorySales> =
                    statements.top_categories.load(conn).await?;

                Ok::<_, ServiceError>(DashboardStats {
                    summary,
                    monthly_sales,
                    top_categories,
                })
            }
            .scope_boxed()
        })
        .await
}

/// Six views over the rows matching `filter`, all read from one snapshot.
pub async fn dashboard_stats_filtered(
    conn: &mut AsyncPgConnection,
    filter: &SalesFilter,
) -> Result<FilteredDashboard> {
    let statements = FilteredStatements::new(&filter.predicate());
    let statements = &statements;
    debug!(?filter, "building filtered dashboard");

    conn.build_transaction()
        .read_only()
        .repeatable_read()
        .run(|conn| {
            async move {
                let total: GrandTotal = statements.total.load_one(conn).await?;
                let sales_by_segment: Vec<SegmentTotal> = statements.by_segment.load(conn).await?;
                let top_customers: Vec<CustomerTotal> =
                    statements.top_customers.load(conn).await?;
                let top_products: Vec<ProductTotal> = statements.top_products.load(conn).await?;
                let sales_by_date: Vec<DateTotal> = statements.by_date.load(conn).await?;
                let sales_by_category: Vec<CategoryTotal> =
                    statements.by_category.load(conn).await?;

                Ok::<_, ServiceError>(FilteredDashboard {
                    total_sales: total.total,
                    sales_by_segment,
                    top_customers,
                    top_products,
                    sales_by_date,
                    sales_by_category,
                })
            }
            .scope_boxed()
        })
        .await
}

struct SummaryStatements {
    summary: SqlStatement,
    monthly: SqlStatement,
    top_categories: SqlStatement,
}

impl SummaryStatements {
    fn new() -> Self {
        let summary = format!(
            "SELECT COUNT(*) AS total_sales, {SALES_TOTAL} AS total_revenue, \
             COUNT(DISTINCT {CUSTOMER_ID}) AS total_customers, \
             COUNT(DISTINCT {PRODUCT_ID}) AS total_products, \
             COALESCE(AVG({SALES}), 0)::float8 AS average_sale, \
             COUNT(DISTINCT {CATEGORY}) AS total_categories \
             FROM {TABLE}"
        );
        let monthly = format!(
            "SELECT to_char(date_trunc('month', {ORDER_DAY}), 'YYYY-MM') AS month, \
             {SALES_TOTAL} AS sales, COUNT(*) AS count \
             FROM {TABLE} \
             GROUP BY 1 \
             ORDER BY 1 DESC \
             LIMIT {MONTHS_SHOWN}"
        );

        Self {
            summary: SqlStatement::new(summary, Vec::new()),
            monthly: SqlStatement::new(monthly, Vec::new()),
            top_categories: category_sales_statement(Some(TOP_CATEGORIES)),
        }
    }
}

struct FilteredStatements {
    total: SqlStatement,
    by_segment: SqlStatement,
    top_customers: SqlStatement,
    top_products: SqlStatement,
    by_date: SqlStatement,
    by_category: SqlStatement,
}

impl FilteredStatements {
    fn new(predicate: &Predicate) -> Self {
        let filtered = |select: &str, tail: &str| {
            let sql = format!("{select} FROM {TABLE}{} {tail}", predicate.where_sql());
            SqlStatement::new(sql.trim_end().to_string(), predicate.binds().to_vec())
        };

        Self {
            total: filtered(&format!("SELECT {SALES_TOTAL} AS total"), ""),
            by_segment: filtered(
                &format!("SELECT {SEGMENT} AS segment, {SALES_TOTAL} AS total"),
                &format!("GROUP BY {SEGMENT} ORDER BY total DESC, segment ASC"),
            ),
            top_customers: filtered(
                &format!(
                    "SELECT {CUSTOMER_NAME} AS name, {SEGMENT} AS segment, {CITY} AS city, \
                     {STATE} AS state, {SALES_TOTAL} AS total"
                ),
                &format!(
                    "GROUP BY {CUSTOMER_NAME}, {SEGMENT}, {CITY}, {STATE} \
                     ORDER BY total DESC, name ASC LIMIT {TOP_CUSTOMERS}"
                ),
            ),
            top_products: filtered(
                &format!(
                    "SELECT {PRODUCT_ID} AS product_id, {CATEGORY} AS category, \
                     {SUB_CATEGORY} AS sub_category, {PRODUCT_NAME} AS product_name, \
                     {SALES_TOTAL} AS total_sales"
                ),
                &format!(
                    "GROUP BY {PRODUCT_ID}, {CATEGORY}, {SUB_CATEGORY}, {PRODUCT_NAME} \
                     ORDER BY total_sales DESC, product_name ASC LIMIT {TOP_PRODUCTS}"
                ),
            ),
            by_date: filtered(
                &format!("SELECT {ORDER_DAY} AS date, {SALES_TOTAL} AS total"),
                "GROUP BY 1 ORDER BY 1 ASC",
            ),
            by_category: filtered(
                &format!("SELECT {CATEGORY} AS category, {SALES_TOTAL} AS total"),
                &format!("GROUP BY {CATEGORY} ORDER BY total DESC, category ASC"),
            ),
        }
    }

    #[cfg(test)]
    fn all(&self) -> [&SqlStatement; 6] {
        [
            &self.total,
            &self.by_segment,
            &self.top_customers,
            &self.top_products,
            &self.by_date,
            &self.by_category,
        ]
    }
}
