use crate::include::RelationFilter;
use sea_orm::sea_query::Order;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Sort direction for one ordering term. Anything other than a
/// case-insensitive `desc` sorts ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    #[must_use]
    pub fn to_order(self) -> Order {
        match self {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One applied ordering term, reported with the externally visible field
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderSpec {
    pub field: String,
    pub dir: SortDirection,
}

/// The filters applied to one included relation, keyed by its dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RelationInfo {
    pub name: String,
    pub filters: Vec<RelationFilter>,
}

/// Report of everything one compilation applied. Created fresh per request,
/// populated during compilation, optionally corrected once by
/// [`normalize`](crate::pagination::normalize) after the total count is
/// known, then read-only. Hosts render it into response metadata and audit
/// logs verbatim.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct Filters {
    pub limit: i64,
    pub offset: i64,
    pub page: i64,
    pub order: Vec<OrderSpec>,
    pub fields: Vec<String>,
    pub include: Vec<String>,
    pub relations: Vec<RelationInfo>,
    pub search: String,
    pub count: i64,
    pub adjusted: bool,
}

/// Query parameters reserved by the criteria compiler.
///
/// # Pagination
/// `limit` and `offset` page the result set; both fall back to the
/// compiler's configured defaults.
///
/// # Ordering
/// `order` is a comma-separated list of `field [asc|desc]` terms, for
/// example `name asc,age desc`. Unknown fields are dropped.
///
/// # Selection
/// `select` is a comma-separated list of field names to return.
///
/// # Includes
/// `include` lists dot-paths of relations to eager-load, with optional
/// inline filters, for example `Blocks.Translations.locale__eq=es`. The
/// parameter may be repeated.
///
/// # Search
/// `_search` matches a term case-insensitively across the model's configured
/// search fields.
///
/// Every other parameter is interpreted as a field filter in
/// `field[__operator]=value` form.
#[derive(Debug, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Maximum number of records to return.
    #[param(example = 25)]
    pub limit: Option<i64>,
    /// Number of records to skip.
    #[param(example = 0)]
    pub offset: Option<i64>,
    /// Comma-separated `field [asc|desc]` ordering terms.
    #[param(example = "name asc,age desc")]
    pub order: Option<String>,
    /// Comma-separated field names to return.
    #[param(example = "id,name")]
    pub select: Option<String>,
    /// Comma-separated relation dot-paths with optional inline filters.
    #[param(example = "Blocks.Translations.locale__eq=es")]
    pub include: Option<String>,
    /// Free-text search term.
    #[serde(rename = "_search")]
    #[param(example = "foo")]
    pub search: Option<String>,
}
