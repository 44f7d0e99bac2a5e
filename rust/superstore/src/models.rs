//! Row and response shapes for the sales reports.
//!
//! Monetary values arrive from the store already cast to `float8`; counts are
//! `int8`. JSON key names follow what the dashboard frontend consumes.

use chrono::NaiveDate;
use diesel::deserialize::QueryableByName;
use diesel::sql_types::{Date, Float8, Int8, Text};
use serde::Serialize;

#[derive(Debug, Clone, QueryableByName)]
pub struct ProductRow {
    #[diesel(sql_type = Text)]
    pub product_id: String,
    #[diesel(sql_type = Text)]
    pub name: String,
    #[diesel(sql_type = Text)]
    pub category: String,
    #[diesel(sql_type = Text)]
    pub subcategory: String,
    #[diesel(sql_type = Float8)]
    pub price: f64,
}

/// Product listing entry. `id` is the 1-based position in this response only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: usize,
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub price: f64,
}

impl ProductRow {
    pub fn into_product(self, id: usize) -> Product {
        Product {
            id,
            product_id: self.product_id,
            name: self.name,
            category: self.category,
            subcategory: self.subcategory,
            price: self.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct Sale {
    #[diesel(sql_type = Int8)]
    pub id: i64,
    #[diesel(sql_type = Text)]
    pub customer: String,
    #[diesel(sql_type = Text)]
    pub product: String,
    #[diesel(sql_type = Date)]
    pub order_date: NaiveDate,
    #[diesel(sql_type = Float8)]
    pub total_amount: f64,
    #[diesel(sql_type = Text)]
    pub city: String,
    #[diesel(sql_type = Text)]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct DailySales {
    #[diesel(sql_type = Date)]
    pub date: NaiveDate,
    #[diesel(sql_type = Float8)]
    pub total_amount: f64,
    #[diesel(sql_type = Int8)]
    pub num_sales: i64,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct CategorySales {
    #[diesel(sql_type = Text)]
    pub category: String,
    #[diesel(sql_type = Float8)]
    pub total_sales: f64,
    #[diesel(sql_type = Int8)]
    pub num_sales: i64,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct TopProduct {
    #[diesel(sql_type = Text)]
    pub product: String,
    #[diesel(sql_type = Int8)]
    pub total_quantity: i64,
    #[diesel(sql_type = Float8)]
    pub total_sales: f64,
    #[diesel(sql_type = Int8)]
    pub num_sales: i64,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct DashboardSummary {
    #[diesel(sql_type = Int8)]
    pub total_sales: i64,
    #[diesel(sql_type = Float8)]
    pub total_revenue: f64,
    #[diesel(sql_type = Int8)]
    pub total_customers: i64,
    #[diesel(sql_type = Int8)]
    pub total_products: i64,
    #[diesel(sql_type = Float8)]
    pub average_sale: f64,
    #[diesel(sql_type = Int8)]
    pub total_categories: i64,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct MonthlySales {
    #[diesel(sql_type = Text)]
    pub month: String,
    #[diesel(sql_type = Float8)]
    pub sales: f64,
    #[diesel(sql_type = Int8)]
    pub count: i64,
}

/// Whole-table overview: headline numbers, the latest 12 months, the top 5 categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub summary: DashboardSummary,
    pub monthly_sales: Vec<MonthlySales>,
    pub top_categories: Vec<CategorySales>,
}

#[derive(Debug, Clone, QueryableByName)]
pub struct GrandTotal {
    #[diesel(sql_type = Float8)]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct SegmentTotal {
    #[serde(rename = "customer__segment")]
    #[diesel(sql_type = Text)]
    pub segment: String,
    #[diesel(sql_type = Float8)]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct CustomerTotal {
    #[diesel(sql_type = Text)]
    pub name: String,
    #[diesel(sql_type = Text)]
    pub segment: String,
    #[diesel(sql_type = Text)]
    pub city: String,
    #[diesel(sql_type = Text)]
    pub state: String,
    #[diesel(sql_type = Float8)]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct ProductTotal {
    #[serde(rename = "Product_ID")]
    #[diesel(sql_type = Text)]
    pub product_id: String,
    #[serde(rename = "Category")]
    #[diesel(sql_type = Text)]
    pub category: String,
    #[serde(rename = "Sub_Category")]
    #[diesel(sql_type = Text)]
    pub sub_category: String,
    #[serde(rename = "Product_Name")]
    #[diesel(sql_type = Text)]
    pub product_name: String,
    #[diesel(sql_type = Float8)]
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct DateTotal {
    #[diesel(sql_type = Date)]
    pub date: NaiveDate,
    #[diesel(sql_type = Float8)]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct CategoryTotal {
    #[diesel(sql_type = Text)]
    pub category: String,
    #[diesel(sql_type = Float8)]
    pub total: f64,
}

/// Six views over one filtered row set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredDashboard {
    pub total_sales: f64,
    pub sales_by_segment: Vec<SegmentTotal>,
    pub top_customers: Vec<CustomerTotal>,
    pub top_products: Vec<ProductTotal>,
    pub sales_by_date: Vec<DateTotal>,
    pub sales_by_category: Vec<CategoryTotal>,
}
