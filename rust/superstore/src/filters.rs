//! Typed sales filters and their rendering into parameterized SQL predicates.
//!
//! A [`SalesFilter`] carries at most one value per dimension. Each present field
//! maps to exactly one predicate, all predicates are ANDed, and every value is
//! bound rather than interpolated. The same filter renders two ways: as a raw
//! `WHERE` fragment with positional binds for the aggregate reports, and as
//! diesel predicates on a boxed query for the dimension lookups.

use crate::{
    error::{Result, ServiceError},
    schema::{columns, superstore_final_dataset},
};
use chrono::NaiveDate;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::{BoxedSelectStatement, BoxedSqlQuery, FromClause, SqlQuery};
use diesel::sql_types::{Date, Int8, Text};
use serde::{Deserialize, Serialize};

/// Values meaning "no filter" in the dashboard's selectors.
const SENTINELS: &[&str] = &["todas", "todos", "all"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

pub type DimensionQuery<'a> =
    BoxedSelectStatement<'a, Text, FromClause<superstore_final_dataset::table>, Pg>;

/// Raw query-string filters as they arrive over HTTP.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterParams {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            start: parse_date(start)?,
            end: parse_date(end)?,
        })
    }

    /// Both bounds or neither; a lone bound is a client error.
    pub fn from_optional(start: Option<&str>, end: Option<&str>) -> Result<Option<Self>> {
        match (non_empty(start), non_empty(end)) {
            (Some(start), Some(end)) => Self::parse(start, end).map(Some),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ServiceError::InvalidRequest(
                "end_date is required when start_date is supplied".into(),
            )),
            (None, Some(_)) => Err(ServiceError::InvalidRequest(
                "start_date is required when end_date is supplied".into(),
            )),
        }
    }
}

/// Parses `YYYY-MM-DD`, falling back to `MM/DD/YYYY`.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| {
            ServiceError::InvalidDateFormat(format!(
                "Invalid date format '{trimmed}'. Use MM/DD/YYYY or YYYY-MM-DD"
            ))
        })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Normalises a dimension value: blanks and "all" sentinels mean no filter.
pub fn dimension_value(value: Option<&str>) -> Option<String> {
    non_empty(value)
        .filter(|v| !SENTINELS.iter().any(|s| v.eq_ignore_ascii_case(s)))
        .map(str::to_string)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesFilter {
    pub date_range: Option<DateRange>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
}

impl SalesFilter {
    pub fn from_params(params: &FilterParams) -> Result<Self> {
        Ok(Self {
            date_range: DateRange::from_optional(
                params.start_date.as_deref(),
                params.end_date.as_deref(),
            )?,
            category: dimension_value(params.category.as_deref()),
            subcategory: dimension_value(params.subcategory.as_deref()),
            state: dimension_value(params.state.as_deref()),
            city: dimension_value(params.city.as_deref()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn text_predicates(&self) -> impl Iterator<Item = (&'static str, &String)> + '_ {
        [
            (columns::CATEGORY, self.category.as_ref()),
            (columns::SUB_CATEGORY, self.subcategory.as_ref()),
            (columns::STATE, self.state.as_ref()),
            (columns::CITY, self.city.as_ref()),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
    }

    pub fn predicate(&self) -> Predicate {
        let mut predicate = Predicate::default();

        if let Some(DateRange { start, end }) = self.date_range {
            predicate.push(
                format!("{} BETWEEN ? AND ?", columns::ORDER_DAY),
                [SqlBindValue::Date(start), SqlBindValue::Date(end)],
            );
        }

        for (column, value) in self.text_predicates() {
            predicate.push(
                format!("{column} = ?"),
                [SqlBindValue::Text(value.clone())],
            );
        }

        predicate
    }

    /// Text predicates only; dimension lookups never carry a date range.
    pub fn apply_dimensions<'a>(&self, mut query: DimensionQuery<'a>) -> DimensionQuery<'a> {
        use crate::schema::superstore_final_dataset::dsl::{
            category as col_category, city as col_city, state as col_state,
            sub_category as col_sub_category,
        };

        if let Some(value) = &self.category {
            query = query.filter(col_category.eq(value.clone()));
        }
        if let Some(value) = &self.subcategory {
            query = query.filter(col_sub_category.eq(value.clone()));
        }
        if let Some(value) = &self.state {
            query = query.filter(col_state.eq(value.clone()));
        }
        if let Some(value) = &self.city {
            query = query.filter(col_city.eq(value.clone()));
        }

        query
    }
}

/// A conjunction of clauses using `?` placeholders, with binds in clause order.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    clauses: Vec<String>,
    binds: Vec<SqlBindValue>,
}

impl Predicate {
    pub fn push(&mut self, clause: String, binds: impl IntoIterator<Item = SqlBindValue>) {
        self.clauses.push(clause);
        self.binds.extend(binds);
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn binds(&self) -> &[SqlBindValue] {
        &self.binds
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlBindValue {
    Text(String),
    Date(NaiveDate),
    BigInt(i64),
}

impl SqlBindValue {
    pub fn apply<'a>(
        &self,
        query: BoxedSqlQuery<'a, Pg, SqlQuery>,
    ) -> BoxedSqlQuery<'a, Pg, SqlQuery> {
        match self {
            SqlBindValue::Text(value) => query.bind::<Text, _>(value.clone()),
            SqlBindValue::Date(value) => query.bind::<Date, _>(*value),
            SqlBindValue::BigInt(value) => query.bind::<Int8, _>(*value),
        }
    }
}

/// Rewrites `?` markers into PostgreSQL's `$n` placeholders.
pub fn rewrite_placeholders(sql: &str) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut index = 1;
    for ch in sql.chars() {
        if ch == '?' {
            result.push('$');
            result.push_str(&index.to_string());
            index += 1;
        } else {
            result.push(ch);
        }
    }
    result
}

/// Highest `$n` placeholder referenced by `sql`.
pub fn max_dollar_placeholder(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut max = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }

        i += 1;
        let mut value = 0usize;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            value = value * 10 + (bytes[i] - b'0') as usize;
            i += 1;
        }

        max = max.max(value);
    }

    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        let mut params = FilterParams::default();
        for (key, value) in pairs {
            let slot = match *key {
                "start_date" => &mut params.start_date,
                "end_date" => &mut params.end_date,
                "category" => &mut params.category,
                "subcategory" => &mut params.subcategory,
                "state" => &mut params.state,
                "city" => &mut params.city,
                other => panic!("unknown filter key {other}"),
            };
            *slot = Some(value.to_string());
        }
        params
    }

    #[test]
    fn parses_iso_and_us_dates() {
        let expected = NaiveDate::from_ymd_opt(2017, 3, 9).unwrap();
        assert_eq!(parse_date("2017-03-09").unwrap(), expected);
        assert_eq!(parse_date("03/09/2017").unwrap(), expected);
        assert_eq!(parse_date(" 2017-03-09 ").unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_date_formats() {
        for raw in ["09.03.2017", "2017/03/09", "13/40/2017", "yesterday", ""] {
            let err = parse_date(raw).expect_err("date should be rejected");
            assert!(
                matches!(err, ServiceError::InvalidDateFormat(_)),
                "expected InvalidDateFormat for {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn lone_date_bound_is_rejected() {
        let err = SalesFilter::from_params(&params(&[("start_date", "2017-01-01")]))
            .expect_err("start without end should fail");
        assert!(matches!(err, ServiceError::InvalidRequest(_)));

        let err = SalesFilter::from_params(&params(&[("end_date", "2017-01-01")]))
            .expect_err("end without start should fail");
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }

    #[test]
    fn sentinels_and_blanks_are_treated_as_absent() {
        let filter = SalesFilter::from_params(&params(&[
            ("category", "Todas"),
            ("subcategory", "  "),
            ("state", "Todos"),
            ("city", "ALL"),
        ]))
        .unwrap();

        assert!(filter.is_empty());
        assert!(filter.predicate().is_empty());
        assert_eq!(filter.predicate().where_sql(), "");
    }

    #[test]
    fn each_filter_contributes_one_clause_in_order() {
        let filter = SalesFilter::from_params(&params(&[
            ("start_date", "01/01/2017"),
            ("end_date", "2017-12-31"),
            ("category", "Furniture"),
            ("subcategory", "Chairs"),
            ("state", "Texas"),
            ("city", "Houston"),
        ]))
        .unwrap();

        let predicate = filter.predicate();
        assert_eq!(
            predicate.where_sql(),
            " WHERE \"Order_Date\"::date BETWEEN ? AND ? AND \"Category\" = ? AND \"Sub_Category\" = ? AND \"State\" = ? AND \"City\" = ?"
        );
        assert_eq!(
            predicate.binds(),
            &[
                SqlBindValue::Date(NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()),
                SqlBindValue::Date(NaiveDate::from_ymd_opt(2017, 12, 31).unwrap()),
                SqlBindValue::Text("Furniture".into()),
                SqlBindValue::Text("Chairs".into()),
                SqlBindValue::Text("Texas".into()),
                SqlBindValue::Text("Houston".into()),
            ]
        );
    }

    #[test]
    fn values_are_bound_not_interpolated() {
        let hostile = "x'; DROP TABLE superstore_final_dataset; --";
        let filter = SalesFilter::from_params(&params(&[("city", hostile)])).unwrap();
        let predicate = filter.predicate();

        assert!(!predicate.where_sql().contains("DROP"));
        assert_eq!(predicate.binds(), &[SqlBindValue::Text(hostile.into())]);
    }

    #[test]
    fn placeholders_rewrite_to_positional_binds() {
        let sql = rewrite_placeholders("SELECT 1 WHERE a = ? AND b BETWEEN ? AND ? LIMIT ?");
        assert_eq!(sql, "SELECT 1 WHERE a = $1 AND b BETWEEN $2 AND $3 LIMIT $4");
        assert_eq!(max_dollar_placeholder(&sql), 4);
        assert_eq!(max_dollar_placeholder("SELECT 1"), 0);
    }

    #[test]
    fn dimension_predicates_render_through_diesel() {
        use crate::schema::superstore_final_dataset::dsl::{
            sub_category as col_sub_category, superstore_final_dataset as table,
        };

        let filter = SalesFilter {
            category: Some("Furniture".into()),
            ..SalesFilter::default()
        };
        let query = filter.apply_dimensions(
            table
                .select(col_sub_category)
                .distinct()
                .into_boxed::<Pg>(),
        );
        let rendered = diesel::debug_query::<Pg, _>(&query).to_string();

        assert!(
            rendered.contains("\"superstore_final_dataset\".\"Category\" = $1"),
            "expected bound category predicate, got: {rendered}"
        );
        assert!(rendered.contains("\"Furniture\""), "missing bind: {rendered}");
    }
}
