use super::SqlStatement;
use crate::{
    error::Result,
    filters::{DateRange, SalesFilter, SqlBindValue},
    models::{CategorySales, DailySales, TopProduct},
    schema::columns::{CATEGORY, ORDER_DAY, PRODUCT_NAME, SALES_TOTAL, TABLE},
};
use diesel_async::AsyncPgConnection;

/// Daily totals for `[start, end]`, one bucket per calendar day with sales.
pub async fn sales_by_date_range(
    conn: &mut AsyncPgConnection,
    range: DateRange,
) -> Result<Vec<DailySales>> {
    sales_by_date_statement(range).load(conn).await
}

pub async fn sales_by_category(conn: &mut AsyncPgConnection) -> Result<Vec<CategorySales>> {
    category_sales_statement(None).load(conn).await
}

/// Best-selling products by revenue. `limit` must already be resolved to a positive value.
pub async fn top_products(conn: &mut AsyncPgConnection, limit: i64) -> Result<Vec<TopProduct>> {
    top_products_statement(limit).load(conn).await
}

fn sales_by_date_statement(range: DateRange) -> SqlStatement {
    let predicate = SalesFilter {
        date_range: Some(range),
        ..SalesFilter::default()
    }
    .predicate();

    let sql = format!(
        "SELECT {ORDER_DAY} AS date, {SALES_TOTAL} AS total_amount, COUNT(*) AS num_sales \
         FROM {TABLE}{} \
         GROUP BY 1 \
         ORDER BY 1 ASC",
        predicate.where_sql()
    );
    SqlStatement::new(sql, predicate.binds().to_vec())
}

pub(super) fn category_sales_statement(limit: Option<i64>) -> SqlStatement {
    let mut sql = format!(
        "SELECT {CATEGORY} AS category, {SALES_TOTAL} AS total_sales, COUNT(*) AS num_sales \
         FROM {TABLE} \
         GROUP BY {CATEGORY} \
         ORDER BY total_sales DESC, category ASC"
    );
    let mut binds = Vec::new();
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        binds.push(SqlBindValue::BigInt(limit));
    }
    SqlStatement::new(sql, binds)
}

fn top_products_statement(limit: i64) -> SqlStatement {
    let sql = format!(
        "SELECT {PRODUCT_NAME} AS product, COUNT(*) AS total_quantity, \
         {SALES_TOTAL} AS total_sales, COUNT(*) AS num_sales \
         FROM {TABLE} \
         GROUP BY {PRODUCT_NAME} \
         ORDER BY total_sales DESC, product ASC \
         LIMIT ?"
    );
    SqlStatement::new(sql, vec![SqlBindValue::BigInt(limit)])
}
