use crate::errors::CompileError;
use crate::include;
use crate::metadata::{FieldMap, ModelIndex};
use crate::models::{Filters, OrderSpec, RelationInfo, SortDirection};
use crate::operators::{self, CanonicalOp, OperatorAliases, default_aliases, split_filter_key};
use crate::plan::{self, Criterion, QueryPlan};
use crate::query::QueryAccessor;
use sea_orm::{Condition, sea_query::SimpleExpr};
use std::collections::HashSet;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::{debug, warn};

/// Query parameters the compiler consumes itself; everything else is
/// interpreted as a field filter.
pub const RESERVED_PARAMS: [&str; 6] = ["limit", "offset", "order", "select", "include", "_search"];

/// The kind of read operation being compiled. Single-record reads are
/// addressed by primary key, so pagination, ordering and row filtering do
/// not apply to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Read,
}

impl Operation {
    #[must_use]
    pub fn is_list(self) -> bool {
        matches!(self, Operation::List)
    }
}

/// Compiler behavior knobs. `aliases: None` means the process-wide operator
/// table; strictness converts the silent operator and search fallbacks into
/// hard errors.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub default_limit: i64,
    pub default_offset: i64,
    pub strict: bool,
    pub search_columns_required: bool,
    pub aliases: Option<OperatorAliases>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_limit: 25,
            default_offset: 0,
            strict: false,
            search_columns_required: false,
            aliases: None,
        }
    }
}

static GLOBAL_CONFIG: LazyLock<RwLock<Arc<CompilerConfig>>> =
    LazyLock::new(|| RwLock::new(Arc::new(CompilerConfig::default())));

impl CompilerConfig {
    /// Snapshot of the process-wide default configuration.
    #[must_use]
    pub fn global() -> Arc<CompilerConfig> {
        GLOBAL_CONFIG
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Replace the process-wide default configuration used by
/// [`compile_with_defaults`].
pub fn configure(config: CompilerConfig) {
    *GLOBAL_CONFIG
        .write()
        .unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
}

/// Compile a request's query parameters into an ordered criteria list and
/// the [`Filters`] report describing what was applied.
///
/// Criteria are emitted as pagination, ordering and row filters (list
/// operations only), then column selection, then relation loads, so storage
/// engines receive them in a stable, analyzable order. The caller hands the
/// criteria to its storage engine unmodified and the report to logging and
/// response metadata.
///
/// # Errors
///
/// Malformed include expressions always fail; unsupported operators and
/// missing search columns fail only under the configured strictness. No
/// partial criteria list is returned on error.
pub fn compile<Q: QueryAccessor + ?Sized>(
    query: &Q,
    operation: Operation,
    index: &ModelIndex,
    config: &CompilerConfig,
) -> Result<(Vec<Criterion>, Filters), CompileError> {
    let aliases = config.aliases.clone().map_or_else(default_aliases, Arc::new);
    let fields = index.root_field_map();
    let mut filters = Filters::default();

    let mut pagination: Option<Criterion> = None;
    let mut ordering: Option<Criterion> = None;
    let mut row_filter: Option<Criterion> = None;

    if operation.is_list() {
        let limit = query.int("limit", config.default_limit);
        let offset = query.int("offset", config.default_offset);
        filters.limit = limit;
        filters.offset = offset;
        filters.page = if limit > 0 { offset / limit + 1 } else { 1 };
        pagination = Some(Box::new(move |mut plan: QueryPlan| {
            plan.limit = Some(limit);
            plan.offset = Some(offset);
            plan
        }));

        ordering = parse_order(query, fields, &mut filters);
    }

    let selection = parse_select(query, fields, &mut filters);
    let loads = build_includes(query, index, config, &aliases, &mut filters)?;

    if operation.is_list() {
        row_filter = build_row_filter(query, index, fields, config, &aliases, &mut filters)?;
    }

    let mut criteria: Vec<Criterion> = Vec::new();
    criteria.extend(pagination);
    criteria.extend(ordering);
    criteria.extend(row_filter);
    criteria.extend(selection);
    criteria.extend(loads);

    debug!(
        model = %index.model,
        criteria = criteria.len(),
        includes = filters.include.len(),
        "compiled request"
    );
    Ok((criteria, filters))
}

/// [`compile`] with the process-wide default configuration.
///
/// # Errors
///
/// See [`compile`].
pub fn compile_with_defaults<Q: QueryAccessor + ?Sized>(
    query: &Q,
    operation: Operation,
    index: &ModelIndex,
) -> Result<(Vec<Criterion>, Filters), CompileError> {
    compile(query, operation, index, &CompilerConfig::global())
}

fn parse_order<Q: QueryAccessor + ?Sized>(
    query: &Q,
    fields: &FieldMap,
    filters: &mut Filters,
) -> Option<Criterion> {
    let raw = query.value("order")?;
    let mut terms: Vec<(String, sea_orm::sea_query::Order)> = Vec::new();
    for item in raw.split(',') {
        let mut parts = item.split_whitespace();
        let Some(field) = parts.next() else {
            continue;
        };
        let dir = SortDirection::parse(parts.next().unwrap_or(""));
        let Some(column) = fields.resolve(field) else {
            warn!(field, "dropping order on unknown field");
            continue;
        };
        filters.order.push(OrderSpec {
            field: field.to_string(),
            dir,
        });
        terms.push((column.to_string(), dir.to_order()));
    }
    if terms.is_empty() {
        return None;
    }
    Some(Box::new(move |mut plan: QueryPlan| {
        plan.order.extend(terms.iter().cloned());
        plan
    }))
}

fn parse_select<Q: QueryAccessor + ?Sized>(
    query: &Q,
    fields: &FieldMap,
    filters: &mut Filters,
) -> Option<Criterion> {
    let raw = query.value("select")?;
    let mut columns = Vec::new();
    for field in raw.split(',') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        if let Some(column) = fields.resolve(field) {
            filters.fields.push(field.to_string());
            columns.push(column.to_string());
        } else {
            warn!(field, "dropping selection of unknown field");
        }
    }
    if columns.is_empty() {
        return None;
    }
    Some(Box::new(move |mut plan: QueryPlan| {
        plan.columns.extend(columns.iter().cloned());
        plan
    }))
}

/// Normalize `include` (one comma string or repeated parameters) into one
/// expression, build the tree and emit one load criterion per top-level
/// relation.
fn build_includes<Q: QueryAccessor + ?Sized>(
    query: &Q,
    index: &ModelIndex,
    config: &CompilerConfig,
    aliases: &OperatorAliases,
    filters: &mut Filters,
) -> Result<Vec<Criterion>, CompileError> {
    let values = query.values("include");
    let expr = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    if expr.is_empty() {
        return Ok(Vec::new());
    }

    let tree = include::build_include_tree(&expr, index, config.strict, aliases)?;
    filters.include = include::flatten_paths(&tree);
    filters.relations = include::flatten_filters(&tree)
        .into_iter()
        .map(|(name, filters)| RelationInfo { name, filters })
        .collect();

    Ok(tree
        .values()
        .map(|node| {
            let load = plan::relation_load(node, None);
            Box::new(move |mut plan: QueryPlan| {
                plan.loads.push(load.clone());
                plan
            }) as Criterion
        })
        .collect())
}

/// Steps 5 and 6 of the pipeline: field filters from the non-reserved
/// parameters plus the scoped search, combined into one criterion. Discrete
/// AND conditions come first, then OR groups, then the search group, all
/// ANDed together.
fn build_row_filter<Q: QueryAccessor + ?Sized>(
    query: &Q,
    index: &ModelIndex,
    fields: &FieldMap,
    config: &CompilerConfig,
    aliases: &OperatorAliases,
    filters: &mut Filters,
) -> Result<Option<Criterion>, CompileError> {
    let mut and_exprs: Vec<SimpleExpr> = Vec::new();
    let mut or_groups: Vec<Condition> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (key, value) in query.entries() {
        if RESERVED_PARAMS.contains(&key.as_str()) || !seen.insert(key.clone()) {
            continue;
        }
        let (field, token) = split_filter_key(&key);
        let op = operators::resolve(field, token, config.strict, aliases)?;
        let Some(column) = fields.resolve(field) else {
            warn!(field, "dropping filter on unknown field");
            continue;
        };
        let values: Vec<&str> = value.split(',').collect();
        match CanonicalOp::from_token(&op.token) {
            Some(CanonicalOp::And) => {
                for v in values {
                    and_exprs.push(plan::binary_expr(column, "=", v));
                }
            }
            Some(CanonicalOp::Or) => {
                let mut group = Condition::any();
                for v in values {
                    group = group.add(plan::binary_expr(column, "=", v));
                }
                or_groups.push(group);
            }
            Some(CanonicalOp::In) => {
                and_exprs.push(plan::in_expr(column, values));
            }
            // Multiple values under a non-grouping operator each become
            // their own ANDed condition.
            _ => {
                for v in values {
                    and_exprs.push(plan::binary_expr(column, &op.engine, v));
                }
            }
        }
    }

    let search_group = build_search(query, index, fields, config, filters)?;

    if and_exprs.is_empty() && or_groups.is_empty() && search_group.is_none() {
        return Ok(None);
    }

    let mut condition = Condition::all();
    for expr in and_exprs {
        condition = condition.add(expr);
    }
    for group in or_groups {
        condition = condition.add(group);
    }
    if let Some(group) = search_group {
        condition = condition.add(group);
    }
    Ok(Some(Box::new(move |mut plan: QueryPlan| {
        plan.condition = plan.condition.add(condition.clone());
        plan
    })))
}

fn build_search<Q: QueryAccessor + ?Sized>(
    query: &Q,
    index: &ModelIndex,
    fields: &FieldMap,
    config: &CompilerConfig,
    filters: &mut Filters,
) -> Result<Option<Condition>, CompileError> {
    let term = query
        .value("_search")
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    if term.is_empty() {
        return Ok(None);
    }
    filters.search = term.clone();

    let columns: Vec<String> = index
        .search_fields
        .iter()
        .filter_map(|field| fields.resolve(field).map(str::to_string))
        .collect();
    if columns.is_empty() {
        if config.strict && config.search_columns_required {
            return Err(CompileError::SearchColumnsRequired { term });
        }
        return Ok(None);
    }

    let mut group = Condition::any();
    for column in &columns {
        group = group.add(plan::contains_expr(column, &term));
    }
    Ok(Some(group))
}
