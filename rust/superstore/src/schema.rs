//! Dataset store layout for the flat superstore sales table.

diesel::table! {
    use diesel::sql_types::*;

    superstore_final_dataset (row_id) {
        #[sql_name = "Row_ID"]
        row_id -> Int8,
        #[sql_name = "City"]
        city -> Text,
        #[sql_name = "State"]
        state -> Text,
        #[sql_name = "Category"]
        category -> Text,
        #[sql_name = "Sub_Category"]
        sub_category -> Text,
    }
}

/// Quoted identifiers for hand-written aggregate SQL.
pub mod columns {
    pub const TABLE: &str = "superstore_final_dataset";

    pub const ROW_ID: &str = "\"Row_ID\"";
    pub const CUSTOMER_ID: &str = "\"Customer_ID\"";
    pub const CUSTOMER_NAME: &str = "\"Customer_Name\"";
    pub const SEGMENT: &str = "\"Segment\"";
    pub const CITY: &str = "\"City\"";
    pub const STATE: &str = "\"State\"";
    pub const PRODUCT_ID: &str = "\"Product_ID\"";
    pub const CATEGORY: &str = "\"Category\"";
    pub const SUB_CATEGORY: &str = "\"Sub_Category\"";
    pub const PRODUCT_NAME: &str = "\"Product_Name\"";
    pub const SALES: &str = "\"Sales\"";

    /// `"Order_Date"` may be stored as text or timestamp; reports always compare calendar dates.
    pub const ORDER_DAY: &str = "\"Order_Date\"::date";
    pub const SALES_F8: &str = "\"Sales\"::float8";
    pub const SALES_TOTAL: &str = "COALESCE(SUM(\"Sales\"), 0)::float8";
}
