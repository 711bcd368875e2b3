use critquery::metadata::{ModelDescriptor, ModelRegistry, RelationDef};

/// Registry with the CMS-style graph used across the integration tests:
/// `Page -> Blocks -> Translations`, plus an aliased `Author` relation and a
/// `User -> Profile` pair for flat filter tests.
pub fn content_registry() -> ModelRegistry {
    let registry = ModelRegistry::new();
    registry.register(
        ModelDescriptor::new("Page", "pages")
            .field("id", "id")
            .field("title", "title")
            .field("slug", "slug")
            .search_fields(["title", "slug"])
            .relation(RelationDef::new("Blocks", "Block"))
            .relation(RelationDef::new("Author", "User").alias("CreatedBy")),
    );
    registry.register(
        ModelDescriptor::new("Block", "blocks")
            .field("id", "id")
            .field("kind", "kind")
            .field("position", "position")
            .relation(RelationDef::new("Translations", "Translation")),
    );
    registry.register(
        ModelDescriptor::new("Translation", "translations")
            .field("id", "id")
            .field("locale", "locale")
            .field("body", "body"),
    );
    registry.register(
        ModelDescriptor::new("User", "users")
            .field("id", "id")
            .field("name", "name")
            .field("age", "age")
            .hidden_field("password_hash", "password_hash")
            .relation(RelationDef::new("Profile", "Profile")),
    );
    registry.register(
        ModelDescriptor::new("Profile", "profiles")
            .field("id", "id")
            .field("status", "status")
            .field("points", "points"),
    );
    registry
}

/// Registry with a relation carrying descriptor-default filters.
pub fn moderated_registry() -> ModelRegistry {
    let registry = ModelRegistry::new();
    registry.register(
        ModelDescriptor::new("Article", "articles")
            .field("id", "id")
            .field("title", "title")
            .relation(
                RelationDef::new("Comments", "Comment").default_filter("status", "eq", "approved"),
            ),
    );
    registry.register(
        ModelDescriptor::new("Comment", "comments")
            .field("id", "id")
            .field("status", "status")
            .field("body", "body"),
    );
    registry
}

/// Registry with a self-referential relation for cycle-safety tests.
pub fn tree_registry() -> ModelRegistry {
    let registry = ModelRegistry::new();
    registry.register(
        ModelDescriptor::new("Category", "categories")
            .field("id", "id")
            .field("name", "name")
            .relation(RelationDef::new("Parent", "Category"))
            .relation(RelationDef::new("Children", "Category")),
    );
    registry
}
