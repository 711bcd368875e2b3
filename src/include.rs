use crate::errors::CompileError;
use crate::metadata::{ModelIndex, RelationNode};
use crate::operators::{self, OperatorAliases, split_filter_key};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;
use utoipa::ToSchema;

/// A condition scoped to one included relation, applied when that relation is
/// loaded. `operator` is the engine rendering; `token` the surface form it
/// was requested with; `column` the resolved storage column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RelationFilter {
    pub field: String,
    pub token: String,
    pub operator: String,
    pub value: String,
    pub column: String,
}

/// A node of the per-request include tree. Children are keyed by lowercased
/// relation name, so overlapping paths merge case-insensitively and traversal
/// order is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeNode {
    pub relation: String,
    pub requested: String,
    pub filters: Vec<RelationFilter>,
    pub children: BTreeMap<String, IncludeNode>,
}

struct PathStep {
    key: String,
    relation: String,
    requested: String,
    model: String,
    filters: Vec<RelationFilter>,
}

/// Parse a comma-separated list of dot-paths (`Blocks.Translations.locale__eq=es`)
/// into a merged include tree rooted at `index`'s model.
///
/// Path segments are either relation names (matched case-insensitively
/// against the relation graph, by name or alias) or filter expressions
/// (`field[__operator]=value`) attached to the most recently parsed relation
/// and resolved against that relation's field map. Paths sharing a prefix
/// merge: children union, filters concatenate in request order.
///
/// # Errors
///
/// Malformed expressions abort regardless of strict mode: empty segments,
/// filters before any relation, filters with an empty field name, unknown
/// relations and unresolvable filter fields. Strict mode additionally
/// rejects unknown operator tokens.
pub fn build_include_tree(
    expr: &str,
    index: &ModelIndex,
    strict: bool,
    aliases: &OperatorAliases,
) -> Result<BTreeMap<String, IncludeNode>, CompileError> {
    let mut roots = BTreeMap::new();
    for path in expr.split(',') {
        let steps = parse_path(path.trim(), index, strict, aliases)?;
        merge_steps(&mut roots, steps);
    }
    apply_default_filters(&mut roots, &index.graph, index, aliases);
    Ok(roots)
}

fn parse_path(
    path: &str,
    index: &ModelIndex,
    strict: bool,
    aliases: &OperatorAliases,
) -> Result<Vec<PathStep>, CompileError> {
    let mut steps: Vec<PathStep> = Vec::new();
    let mut graph_node = &index.graph;

    for raw in path.split('.') {
        let segment = raw.trim();
        if segment.is_empty() {
            return Err(CompileError::EmptyIncludeSegment {
                path: path.to_string(),
            });
        }

        if let Some((lhs, value)) = segment.split_once('=') {
            let Some(step) = steps.last_mut() else {
                return Err(CompileError::FilterBeforeRelation {
                    segment: segment.to_string(),
                    path: path.to_string(),
                });
            };
            let (field, token) = split_filter_key(lhs.trim());
            if field.is_empty() {
                return Err(CompileError::InvalidIncludeFilter {
                    segment: segment.to_string(),
                    path: path.to_string(),
                });
            }
            let op = operators::resolve(field, token, strict, aliases)?;
            let column = index
                .field_map(&step.model)
                .and_then(|map| map.resolve(field))
                .ok_or_else(|| CompileError::UnsupportedRelationField {
                    field: field.to_string(),
                    relation: step.relation.clone(),
                })?
                .to_string();
            step.filters.push(RelationFilter {
                field: field.to_string(),
                token: op.token,
                operator: op.engine,
                value: value.to_string(),
                column,
            });
        } else {
            let child = graph_node.child(segment).ok_or_else(|| {
                CompileError::UnknownRelation {
                    name: segment.to_string(),
                    path: path.to_string(),
                }
            })?;
            steps.push(PathStep {
                key: child.name.to_lowercase(),
                relation: child.name.clone(),
                requested: segment.to_string(),
                model: child.model.clone(),
                filters: Vec::new(),
            });
            graph_node = child;
        }
    }

    Ok(steps)
}

fn merge_steps(roots: &mut BTreeMap<String, IncludeNode>, steps: Vec<PathStep>) {
    let mut current = roots;
    for step in steps {
        let node = current.entry(step.key).or_insert_with(|| IncludeNode {
            relation: step.relation,
            requested: step.requested,
            filters: Vec::new(),
            children: BTreeMap::new(),
        });
        node.filters.extend(step.filters);
        current = &mut node.children;
    }
}

/// Attach descriptor-default filters to every node the request left
/// unfiltered. A single request filter on a path drops that node's defaults;
/// its children are considered independently.
fn apply_default_filters(
    nodes: &mut BTreeMap<String, IncludeNode>,
    graph: &RelationNode,
    index: &ModelIndex,
    aliases: &OperatorAliases,
) {
    for (key, node) in nodes {
        let Some(graph_node) = graph.children.get(key) else {
            continue;
        };
        if node.filters.is_empty() {
            for spec in &graph_node.default_filters {
                let Ok(op) = operators::resolve(&spec.field, &spec.operator, false, aliases) else {
                    continue;
                };
                let Some(column) = index
                    .field_map(&graph_node.model)
                    .and_then(|map| map.resolve(&spec.field))
                else {
                    warn!(
                        relation = %node.relation,
                        field = %spec.field,
                        "descriptor default filter names an unknown field, skipping"
                    );
                    continue;
                };
                node.filters.push(RelationFilter {
                    field: spec.field.clone(),
                    token: op.token,
                    operator: op.engine,
                    value: spec.value.clone(),
                    column: column.to_string(),
                });
            }
        }
        apply_default_filters(&mut node.children, graph_node, index, aliases);
    }
}

/// Flatten a tree into dotted paths, parents before descendants, children in
/// name order.
#[must_use]
pub fn flatten_paths(nodes: &BTreeMap<String, IncludeNode>) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(nodes, None, &mut paths);
    paths
}

fn collect_paths(nodes: &BTreeMap<String, IncludeNode>, prefix: Option<&str>, out: &mut Vec<String>) {
    for node in nodes.values() {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{}", node.relation),
            None => node.relation.clone(),
        };
        out.push(path.clone());
        collect_paths(&node.children, Some(&path), out);
    }
}

/// Flatten a tree into `(dotted path, filters)` pairs for every node that
/// carries filters, in traversal order.
#[must_use]
pub fn flatten_filters(nodes: &BTreeMap<String, IncludeNode>) -> Vec<(String, Vec<RelationFilter>)> {
    let mut out = Vec::new();
    collect_filters(nodes, None, &mut out);
    out
}

fn collect_filters(
    nodes: &BTreeMap<String, IncludeNode>,
    prefix: Option<&str>,
    out: &mut Vec<(String, Vec<RelationFilter>)>,
) {
    for node in nodes.values() {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{}", node.relation),
            None => node.relation.clone(),
        };
        if !node.filters.is_empty() {
            out.push((path.clone(), node.filters.clone()));
        }
        collect_filters(&node.children, Some(&path), out);
    }
}
