use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// One externally visible field of a model and the column it maps to.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub column: String,
    pub excluded: bool,
}

/// A filter a relation descriptor applies by default when the relation is
/// included without any request-supplied filter on that path.
#[derive(Debug, Clone)]
pub struct RelationFilterSpec {
    pub field: String,
    pub operator: String,
    pub value: String,
}

/// A declared relation edge to another registered model.
#[derive(Debug, Clone)]
pub struct RelationDef {
    pub name: String,
    pub alias: Option<String>,
    pub target: String,
    pub excluded: bool,
    pub default_filters: Vec<RelationFilterSpec>,
}

impl RelationDef {
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            target: target.into(),
            excluded: false,
            default_filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn exclude(mut self) -> Self {
        self.excluded = true;
        self
    }

    #[must_use]
    pub fn default_filter(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_filters.push(RelationFilterSpec {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        });
        self
    }
}

/// Declarative description of a model: its filterable fields, relation edges
/// and search fields. Registered once per model, replacing any runtime
/// struct introspection.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    pub name: String,
    pub table: String,
    pub fields: Vec<FieldDef>,
    pub relations: Vec<RelationDef>,
    pub search_fields: Vec<String>,
}

impl ModelDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            fields: Vec::new(),
            relations: Vec::new(),
            search_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            column: column.into(),
            excluded: false,
        });
        self
    }

    /// Declare a field that exists on the model but must never be filterable,
    /// sortable or selectable.
    #[must_use]
    pub fn hidden_field(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            column: column.into(),
            excluded: true,
        });
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    #[must_use]
    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Per-model map of externally visible field names (lowercased) to columns.
/// Only fields present here are filterable, sortable or selectable.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    map: HashMap<String, String>,
}

impl FieldMap {
    #[must_use]
    pub fn resolve(&self, field: &str) -> Option<&str> {
        self.map.get(&field.trim().to_lowercase()).map(String::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, column: impl Into<String>) {
        self.map.insert(field.into().to_lowercase(), column.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// A node in a model's relation graph. Children are keyed by lowercased
/// relation name so include paths match case-insensitively and traversal
/// order stays stable.
#[derive(Debug, Clone)]
pub struct RelationNode {
    pub name: String,
    pub alias: Option<String>,
    pub model: String,
    pub default_filters: Vec<RelationFilterSpec>,
    pub children: BTreeMap<String, RelationNode>,
}

impl RelationNode {
    /// Look up a child relation by name or declared alias, case-insensitively.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&RelationNode> {
        let lowered = name.to_lowercase();
        if let Some(node) = self.children.get(&lowered) {
            return Some(node);
        }
        self.children.values().find(|node| {
            node.alias
                .as_deref()
                .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
        })
    }
}

/// The cached artifact of walking one model's declared relations: the nested
/// relation graph plus a [`FieldMap`] for every model reachable from the root.
#[derive(Debug, Clone)]
pub struct ModelIndex {
    pub model: String,
    pub graph: RelationNode,
    pub search_fields: Vec<String>,
    root_fields: Arc<FieldMap>,
    field_maps: HashMap<String, Arc<FieldMap>>,
}

impl ModelIndex {
    #[must_use]
    pub fn field_map(&self, model: &str) -> Option<&FieldMap> {
        self.field_maps.get(model).map(Arc::as_ref)
    }

    /// The root model's field map.
    #[must_use]
    pub fn root_field_map(&self) -> &FieldMap {
        &self.root_fields
    }
}

/// Registry of model descriptors plus the cache of built relation indexes.
/// Both maps are safe for concurrent access; registration and override
/// changes invalidate affected cache entries.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    descriptors: DashMap<String, Arc<ModelDescriptor>>,
    overrides: DashMap<String, HashMap<String, String>>,
    indexes: DashMap<String, Arc<ModelIndex>>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, descriptor: ModelDescriptor) {
        let name = descriptor.name.clone();
        self.descriptors.insert(name.clone(), Arc::new(descriptor));
        self.invalidate(&name);
    }

    /// Extend or override the generated field map for one model. Entries win
    /// over the descriptor's declared columns.
    pub fn set_field_overrides(&self, model: &str, overrides: HashMap<String, String>) {
        self.overrides.insert(model.to_string(), overrides);
        self.invalidate(model);
    }

    /// Drop every cached index that involves `model`, directly or through a
    /// relation.
    pub fn invalidate(&self, model: &str) {
        self.indexes
            .retain(|root, index| root != model && !index.field_maps.contains_key(model));
    }

    pub fn invalidate_all(&self) {
        self.indexes.clear();
    }

    #[must_use]
    pub fn descriptor(&self, model: &str) -> Option<Arc<ModelDescriptor>> {
        self.descriptors.get(model).map(|entry| entry.value().clone())
    }

    /// The relation index for `model`: built on first use, cached afterwards.
    #[must_use]
    pub fn index_for(&self, model: &str) -> Option<Arc<ModelIndex>> {
        if let Some(cached) = self.indexes.get(model) {
            return Some(cached.value().clone());
        }
        let descriptor = self.descriptor(model)?;
        let index = Arc::new(self.build_index(&descriptor));
        self.indexes.insert(model.to_string(), index.clone());
        Some(index)
    }

    fn build_index(&self, descriptor: &ModelDescriptor) -> ModelIndex {
        let mut field_maps = HashMap::new();
        let mut visited = HashSet::new();
        visited.insert(descriptor.name.clone());
        let root_fields = Arc::new(self.field_map_for(descriptor));
        field_maps.insert(descriptor.name.clone(), root_fields.clone());

        let children = self.build_children(descriptor, &mut visited, &mut field_maps);
        ModelIndex {
            model: descriptor.name.clone(),
            graph: RelationNode {
                name: descriptor.name.clone(),
                alias: None,
                model: descriptor.name.clone(),
                default_filters: Vec::new(),
                children,
            },
            search_fields: descriptor.search_fields.clone(),
            root_fields,
            field_maps,
        }
    }

    fn build_children(
        &self,
        descriptor: &ModelDescriptor,
        visited: &mut HashSet<String>,
        field_maps: &mut HashMap<String, Arc<FieldMap>>,
    ) -> BTreeMap<String, RelationNode> {
        let mut children = BTreeMap::new();
        for relation in &descriptor.relations {
            if relation.excluded {
                continue;
            }
            let grandchildren = match self.descriptor(&relation.target) {
                Some(target) => {
                    if visited.insert(relation.target.clone()) {
                        field_maps.insert(
                            relation.target.clone(),
                            Arc::new(self.field_map_for(&target)),
                        );
                        self.build_children(&target, visited, field_maps)
                    } else {
                        // Revisiting a model within one build pass stops the
                        // walk with an empty leaf instead of recursing forever.
                        BTreeMap::new()
                    }
                }
                None => {
                    warn!(
                        model = %descriptor.name,
                        relation = %relation.name,
                        target = %relation.target,
                        "relation targets an unregistered model, treating as leaf"
                    );
                    BTreeMap::new()
                }
            };
            children.insert(
                relation.name.to_lowercase(),
                RelationNode {
                    name: relation.name.clone(),
                    alias: relation.alias.clone(),
                    model: relation.target.clone(),
                    default_filters: relation.default_filters.clone(),
                    children: grandchildren,
                },
            );
        }
        children
    }

    fn field_map_for(&self, descriptor: &ModelDescriptor) -> FieldMap {
        let mut map = FieldMap::default();
        for field in &descriptor.fields {
            if field.excluded {
                continue;
            }
            map.insert(field.name.clone(), field.column.clone());
        }
        if let Some(overrides) = self.overrides.get(&descriptor.name) {
            for (field, column) in overrides.value() {
                map.insert(field.clone(), column.clone());
            }
        }
        map
    }
}
