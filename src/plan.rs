use crate::include::{IncludeNode, RelationFilter};
use sea_orm::{
    Condition, Value,
    sea_query::{Alias, Expr, Order, SimpleExpr, extension::postgres::PgExpr},
};
use uuid::Uuid;

/// A composable query transformation. Criteria are stateless closures; the
/// compiler fixes their construction order, the storage engine decides how to
/// execute the resulting plan.
pub type Criterion = Box<dyn Fn(QueryPlan) -> QueryPlan + Send + Sync>;

/// Apply criteria in order to a plan.
#[must_use]
pub fn apply(criteria: &[Criterion], plan: QueryPlan) -> QueryPlan {
    criteria.iter().fold(plan, |plan, criterion| criterion(plan))
}

/// The engine-agnostic builder criteria operate on. A storage engine maps
/// this onto its own query: pagination and ordering verbatim, `condition`
/// onto the WHERE clause, `columns` onto the select list and `loads` onto
/// relation eager-loading.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Vec<(String, Order)>,
    pub condition: Condition,
    pub columns: Vec<String>,
    pub loads: Vec<RelationLoad>,
}

impl Default for QueryPlan {
    fn default() -> Self {
        Self {
            limit: None,
            offset: None,
            order: Vec::new(),
            condition: Condition::all(),
            columns: Vec::new(),
            loads: Vec::new(),
        }
    }
}

impl QueryPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Instruction to eager-load one relation, with its scoped filters and any
/// nested loads. Carries both the built condition and the raw filter records
/// for engines that assemble joins themselves.
#[derive(Debug, Clone)]
pub struct RelationLoad {
    pub relation: String,
    pub path: String,
    pub condition: Condition,
    pub filters: Vec<RelationFilter>,
    pub nested: Vec<RelationLoad>,
}

/// Build the load instruction for one include node and its subtree.
#[must_use]
pub fn relation_load(node: &IncludeNode, prefix: Option<&str>) -> RelationLoad {
    let path = match prefix {
        Some(prefix) => format!("{prefix}.{}", node.relation),
        None => node.relation.clone(),
    };
    let mut condition = Condition::all();
    for filter in &node.filters {
        condition = condition.add(binary_expr(&filter.column, &filter.operator, &filter.value));
    }
    RelationLoad {
        relation: node.relation.clone(),
        path: path.clone(),
        condition,
        filters: node.filters.clone(),
        nested: node
            .children
            .values()
            .map(|child| relation_load(child, Some(&path)))
            .collect(),
    }
}

/// Coerce a raw query value into a typed [`Value`]: UUID, integer, float and
/// boolean literals are recognized, everything else stays a string.
#[must_use]
pub fn coerce_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(uuid) = Uuid::parse_str(trimmed) {
        return uuid.into();
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return int.into();
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        return float.into();
    }
    if let Ok(boolean) = trimmed.parse::<bool>() {
        return boolean.into();
    }
    trimmed.into()
}

/// Render `column <engine-op> value` as an expression. The known renderings
/// map onto typed builders; anything else configured through the alias table
/// is emitted as a parameterized custom expression.
#[must_use]
pub fn binary_expr(column: &str, engine_op: &str, raw: &str) -> SimpleExpr {
    let col = Expr::col(Alias::new(column));
    match engine_op.trim().to_uppercase().as_str() {
        "=" => col.eq(coerce_value(raw)),
        "<>" | "!=" => col.ne(coerce_value(raw)),
        ">" => col.gt(coerce_value(raw)),
        ">=" => col.gte(coerce_value(raw)),
        "<" => col.lt(coerce_value(raw)),
        "<=" => col.lte(coerce_value(raw)),
        "LIKE" => col.like(raw),
        "ILIKE" => col.ilike(raw),
        other => Expr::cust_with_values(format!("\"{column}\" {other} ?"), [coerce_value(raw)]),
    }
}

/// One `column IN (...)` expression over coerced values.
#[must_use]
pub fn in_expr<'a, I>(column: &str, values: I) -> SimpleExpr
where
    I: IntoIterator<Item = &'a str>,
{
    Expr::col(Alias::new(column)).is_in(values.into_iter().map(coerce_value))
}

/// Case-insensitive contains match, as used by scoped search.
#[must_use]
pub fn contains_expr(column: &str, term: &str) -> SimpleExpr {
    Expr::col(Alias::new(column)).ilike(format!("%{term}%"))
}
