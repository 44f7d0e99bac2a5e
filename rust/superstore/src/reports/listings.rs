use super::SqlStatement;
use crate::{
    error::Result,
    filters::{dimension_value, SalesFilter},
    models::{Product, ProductRow, Sale},
    schema::columns::{
        CATEGORY, CITY, CUSTOMER_NAME, ORDER_DAY, PRODUCT_ID, PRODUCT_NAME, ROW_ID, SALES_F8,
        STATE, SUB_CATEGORY, TABLE,
    },
};
use diesel_async::AsyncPgConnection;

/// Distinct product tuples ordered by name; ids are positions in this result only.
pub async fn list_products(
    conn: &mut AsyncPgConnection,
    category: Option<&str>,
    subcategory: Option<&str>,
) -> Result<Vec<Product>> {
    let rows: Vec<ProductRow> = products_statement(category, subcategory).load(conn).await?;
    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| row.into_product(idx + 1))
        .collect())
}

/// Every transaction, newest order date first. Not paginated.
pub async fn list_sales(conn: &mut AsyncPgConnection) -> Result<Vec<Sale>> {
    sales_statement().load(conn).await
}

fn products_statement(category: Option<&str>, subcategory: Option<&str>) -> SqlStatement {
    let filter = SalesFilter {
        category: dimension_value(category),
        subcategory: dimension_value(subcategory),
        ..SalesFilter::default()
    };
    let predicate = filter.predicate();

    let sql = format!(
        "SELECT DISTINCT {PRODUCT_ID} AS product_id, {PRODUCT_NAME} AS name, \
         {CATEGORY} AS category, {SUB_CATEGORY} AS subcategory, {SALES_F8} AS price \
         FROM {TABLE}{} \
         ORDER BY name ASC, product_id ASC, price ASC",
        predicate.where_sql()
    );
    SqlStatement::new(sql, predicate.binds().to_vec())
}

fn sales_statement() -> SqlStatement {
    let sql = format!(
        "SELECT {ROW_ID}::int8 AS id, {CUSTOMER_NAME} AS customer, {PRODUCT_NAME} AS product, \
         {ORDER_DAY} AS order_date, {SALES_F8} AS total_amount, {CITY} AS city, {STATE} AS state \
         FROM {TABLE} \
         ORDER BY {ORDER_DAY} DESC, {ROW_ID} DESC"
    );
    SqlStatement::new(sql, Vec::new())
}
