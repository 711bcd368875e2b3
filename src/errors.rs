use thiserror::Error;

/// Failures raised while compiling a request into criteria.
///
/// Operator and search failures only surface under strict validation;
/// include-expression failures always abort the request because there is no
/// safe fallback for a malformed path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("unsupported operator `{operator}` on field `{field}`")]
    UnsupportedOperator { field: String, operator: String },

    #[error("search term `{term}` given but no search columns are configured")]
    SearchColumnsRequired { term: String },

    #[error("empty segment in include path `{path}`")]
    EmptyIncludeSegment { path: String },

    #[error("filter `{segment}` appears before any relation in include path `{path}`")]
    FilterBeforeRelation { segment: String, path: String },

    #[error("invalid filter expression `{segment}` in include path `{path}`")]
    InvalidIncludeFilter { segment: String, path: String },

    #[error("unknown relation `{name}` in include path `{path}`")]
    UnknownRelation { name: String, path: String },

    #[error("unsupported filter field `{field}` on relation `{relation}`")]
    UnsupportedRelationField { field: String, relation: String },
}
