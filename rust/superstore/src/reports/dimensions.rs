use crate::{
    error::{Result, ServiceError},
    filters::{dimension_value, DimensionQuery, SalesFilter},
    schema::superstore_final_dataset::dsl::{
        category as col_category, city as col_city, state as col_state,
        sub_category as col_sub_category, superstore_final_dataset,
    },
};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

pub async fn list_categories(conn: &mut AsyncPgConnection) -> Result<Vec<String>> {
    load(conn, categories_query()).await
}

pub async fn list_subcategories(
    conn: &mut AsyncPgConnection,
    category: Option<&str>,
) -> Result<Vec<String>> {
    load(conn, subcategories_query(category)).await
}

pub async fn list_states(conn: &mut AsyncPgConnection) -> Result<Vec<String>> {
    load(conn, states_query()).await
}

pub async fn list_cities(conn: &mut AsyncPgConnection, state: Option<&str>) -> Result<Vec<String>> {
    load(conn, cities_query(state)).await
}

async fn load(conn: &mut AsyncPgConnection, query: DimensionQuery<'static>) -> Result<Vec<String>> {
    query.load::<String>(conn).await.map_err(ServiceError::from)
}

fn categories_query() -> DimensionQuery<'static> {
    superstore_final_dataset
        .select(col_category)
        .distinct()
        .order(col_category.asc())
        .into_boxed::<Pg>()
}

fn subcategories_query(category: Option<&str>) -> DimensionQuery<'static> {
    let filter = SalesFilter {
        category: dimension_value(category),
        ..SalesFilter::default()
    };
    filter
        .apply_dimensions(
            superstore_final_dataset
                .select(col_sub_category)
                .distinct()
                .into_boxed::<Pg>(),
        )
        .order(col_sub_category.asc())
}

fn states_query() -> DimensionQuery<'static> {
    superstore_final_dataset
        .select(col_state)
        .distinct()
        .order(col_state.asc())
        .into_boxed::<Pg>()
}

fn cities_query(state: Option<&str>) -> DimensionQuery<'static> {
    let filter = SalesFilter {
        state: dimension_value(state),
        ..SalesFilter::default()
    };
    filter
        .apply_dimensions(
            superstore_final_dataset
                .select(col_city)
                .distinct()
                .into_boxed::<Pg>(),
        )
        .order(col_city.asc())
}
