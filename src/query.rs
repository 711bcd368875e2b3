/// The narrow request boundary the compiler reads query data through.
/// Implementations must preserve parameter order; the compiler's output
/// order follows it.
pub trait QueryAccessor {
    /// All `(key, value)` pairs in request order, repeats included.
    fn entries(&self) -> Vec<(String, String)>;

    /// Every value supplied for `key`, in request order.
    fn values(&self, key: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect()
    }

    /// The first value supplied for `key`.
    fn value(&self, key: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// The first value for `key` parsed as an integer, or `default` when
    /// absent or unparseable.
    fn int(&self, key: &str, default: i64) -> i64 {
        self.value(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

/// An order-preserving view of a percent-encoded query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap {
    pairs: Vec<(String, String)>,
}

impl QueryMap {
    /// Parse a raw query string (`limit=10&name__or=John,Jack`), decoding
    /// percent-escapes and `+`.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

impl QueryAccessor for QueryMap {
    fn entries(&self) -> Vec<(String, String)> {
        self.pairs.clone()
    }
}
