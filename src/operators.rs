use crate::errors::CompileError;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

/// Separator between a field name and its operator token in filter keys,
/// as in `age__gte=18`.
pub const OPERATOR_SEPARATOR: &str = "__";

/// The fixed operator vocabulary. These tokens always resolve, no matter how
/// the alias table has been reconfigured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    ILike,
    Like,
    And,
    Or,
}

impl CanonicalOp {
    pub const ALL: [CanonicalOp; 11] = [
        CanonicalOp::Eq,
        CanonicalOp::Ne,
        CanonicalOp::Gt,
        CanonicalOp::Lt,
        CanonicalOp::Gte,
        CanonicalOp::Lte,
        CanonicalOp::In,
        CanonicalOp::ILike,
        CanonicalOp::Like,
        CanonicalOp::And,
        CanonicalOp::Or,
    ];

    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            CanonicalOp::Eq => "eq",
            CanonicalOp::Ne => "ne",
            CanonicalOp::Gt => "gt",
            CanonicalOp::Lt => "lt",
            CanonicalOp::Gte => "gte",
            CanonicalOp::Lte => "lte",
            CanonicalOp::In => "in",
            CanonicalOp::ILike => "ilike",
            CanonicalOp::Like => "like",
            CanonicalOp::And => "and",
            CanonicalOp::Or => "or",
        }
    }

    /// The engine rendering used when the alias table has no entry for the
    /// token.
    #[must_use]
    pub fn default_engine_op(self) -> &'static str {
        match self {
            CanonicalOp::Eq => "=",
            CanonicalOp::Ne => "<>",
            CanonicalOp::Gt => ">",
            CanonicalOp::Lt => "<",
            CanonicalOp::Gte => ">=",
            CanonicalOp::Lte => "<=",
            CanonicalOp::In => "IN",
            CanonicalOp::ILike => "ILIKE",
            CanonicalOp::Like => "LIKE",
            CanonicalOp::And => "AND",
            CanonicalOp::Or => "OR",
        }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }
}

/// Surface token -> engine operator table. Hosts may remap tokens or add
/// their own (e.g. `contains` -> `ILIKE`); the canonical set keeps resolving
/// through [`CanonicalOp::default_engine_op`] even when replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct OperatorAliases {
    map: HashMap<String, String>,
}

impl OperatorAliases {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A table pre-seeded with the canonical defaults.
    #[must_use]
    pub fn canonical() -> Self {
        let mut aliases = Self::new();
        for op in CanonicalOp::ALL {
            aliases.set(op.token(), op.default_engine_op());
        }
        aliases
    }

    pub fn set(&mut self, token: impl Into<String>, engine_op: impl Into<String>) -> &mut Self {
        self.map
            .insert(token.into().to_lowercase(), engine_op.into());
        self
    }

    #[must_use]
    pub fn get(&self, token: &str) -> Option<&str> {
        self.map.get(token).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl From<HashMap<String, String>> for OperatorAliases {
    fn from(map: HashMap<String, String>) -> Self {
        let mut aliases = Self::new();
        for (token, engine_op) in map {
            aliases.set(token, engine_op);
        }
        aliases
    }
}

static DEFAULT_ALIASES: LazyLock<RwLock<Arc<OperatorAliases>>> =
    LazyLock::new(|| RwLock::new(Arc::new(OperatorAliases::canonical())));

/// Snapshot of the process-wide alias table.
#[must_use]
pub fn default_aliases() -> Arc<OperatorAliases> {
    DEFAULT_ALIASES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replace the process-wide alias table. Requests already holding a snapshot
/// keep the table they started with.
pub fn set_default_aliases(aliases: OperatorAliases) {
    *DEFAULT_ALIASES
        .write()
        .unwrap_or_else(PoisonError::into_inner) = Arc::new(aliases);
}

/// A resolved filter operator: the surface token (normalized) and the engine
/// rendering the storage layer will see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOp {
    pub token: String,
    pub engine: String,
}

impl ResolvedOp {
    #[must_use]
    pub fn is(&self, op: CanonicalOp) -> bool {
        self.token == op.token()
    }
}

/// Split a filter key into `(field, operator token)` on the first `__`.
/// A missing separator or an empty operator segment both mean `eq`.
#[must_use]
pub fn split_filter_key(key: &str) -> (&str, &str) {
    match key.split_once(OPERATOR_SEPARATOR) {
        Some((field, token)) => (field, token),
        None => (key, ""),
    }
}

/// Resolve an operator token for `field`.
///
/// Lookup order: alias table, then canonical default. Unknown tokens fall
/// back to `eq` unless `strict` is set, in which case the request is rejected
/// with the offending field and token.
///
/// # Errors
///
/// Returns [`CompileError::UnsupportedOperator`] for an unknown token in
/// strict mode.
pub fn resolve(
    field: &str,
    token: &str,
    strict: bool,
    aliases: &OperatorAliases,
) -> Result<ResolvedOp, CompileError> {
    let token = token.trim().to_lowercase();
    if token.is_empty() {
        return Ok(ResolvedOp {
            token: CanonicalOp::Eq.token().to_string(),
            engine: CanonicalOp::Eq.default_engine_op().to_string(),
        });
    }

    if let Some(engine) = aliases.get(&token) {
        return Ok(ResolvedOp {
            token,
            engine: engine.to_string(),
        });
    }

    if let Some(op) = CanonicalOp::from_token(&token) {
        return Ok(ResolvedOp {
            token,
            engine: op.default_engine_op().to_string(),
        });
    }

    if strict {
        return Err(CompileError::UnsupportedOperator {
            field: field.to_string(),
            operator: token,
        });
    }

    Ok(ResolvedOp {
        token: CanonicalOp::Eq.token().to_string(),
        engine: CanonicalOp::Eq.default_engine_op().to_string(),
    })
}
