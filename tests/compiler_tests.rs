mod common;

use common::content_registry;
use critquery::criteria::{CompilerConfig, Operation, compile, compile_with_defaults};
use critquery::errors::CompileError;
use critquery::models::SortDirection;
use critquery::operators::OperatorAliases;
use critquery::plan::{self, QueryPlan, binary_expr, contains_expr, in_expr};
use critquery::query::QueryMap;
use sea_orm::{Condition, sea_query::Order};

fn dbg<T: std::fmt::Debug>(value: &T) -> String {
    format!("{value:?}")
}

fn lenient() -> CompilerConfig {
    CompilerConfig::default()
}

fn strict() -> CompilerConfig {
    CompilerConfig {
        strict: true,
        ..CompilerConfig::default()
    }
}

#[test]
fn end_to_end_list_compilation_emits_in_precedence_order() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let query = QueryMap::from_pairs([
        ("limit", "10"),
        ("offset", "20"),
        ("order", "name asc,age desc"),
        ("select", "id,name"),
        ("name__or", "John,Jack"),
        ("age__gte", "18"),
    ]);

    let (criteria, filters) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    assert_eq!(criteria.len(), 4);

    // Pagination first.
    let plan = criteria[0](QueryPlan::new());
    assert_eq!(plan.limit, Some(10));
    assert_eq!(plan.offset, Some(20));
    assert!(plan.order.is_empty() && plan.columns.is_empty() && plan.loads.is_empty());

    // Ordering second.
    let plan = criteria[1](QueryPlan::new());
    assert_eq!(
        plan.order,
        vec![
            ("name".to_string(), Order::Asc),
            ("age".to_string(), Order::Desc)
        ]
    );

    // Row filters third: discrete ANDs before OR groups, whatever the
    // request order was.
    let plan = criteria[2](QueryPlan::new());
    let expected = Condition::all().add(
        Condition::all()
            .add(binary_expr("age", ">=", "18"))
            .add(
                Condition::any()
                    .add(binary_expr("name", "=", "John"))
                    .add(binary_expr("name", "=", "Jack")),
            ),
    );
    assert_eq!(dbg(&plan.condition), dbg(&expected));

    // Selection last.
    let plan = criteria[3](QueryPlan::new());
    assert_eq!(plan.columns, vec!["id", "name"]);

    assert_eq!(filters.limit, 10);
    assert_eq!(filters.offset, 20);
    assert_eq!(filters.page, 3);
    assert_eq!(filters.fields, vec!["id", "name"]);
    assert_eq!(filters.order.len(), 2);
    assert_eq!(filters.order[0].field, "name");
    assert_eq!(filters.order[0].dir, SortDirection::Asc);
    assert_eq!(filters.order[1].field, "age");
    assert_eq!(filters.order[1].dir, SortDirection::Desc);
}

#[test]
fn defaults_apply_when_pagination_is_absent() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let query = QueryMap::parse("");

    let (criteria, filters) = compile_with_defaults(&query, Operation::List, &index).unwrap();
    assert_eq!(criteria.len(), 1);
    assert_eq!(filters.limit, 25);
    assert_eq!(filters.offset, 0);
    assert_eq!(filters.page, 1);

    let plan = plan::apply(&criteria, QueryPlan::new());
    assert_eq!(plan.limit, Some(25));
    assert_eq!(plan.offset, Some(0));
}

#[test]
fn unknown_operator_downgrades_to_equality_when_lenient() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();

    let bogus = QueryMap::from_pairs([("name__bogus", "x")]);
    let plain = QueryMap::from_pairs([("name", "x")]);

    let (bogus_criteria, _) = compile(&bogus, Operation::List, &index, &lenient()).unwrap();
    let (plain_criteria, _) = compile(&plain, Operation::List, &index, &lenient()).unwrap();

    let bogus_plan = plan::apply(&bogus_criteria, QueryPlan::new());
    let plain_plan = plan::apply(&plain_criteria, QueryPlan::new());
    assert_eq!(dbg(&bogus_plan.condition), dbg(&plain_plan.condition));
}

#[test]
fn unknown_operator_fails_when_strict() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let query = QueryMap::from_pairs([("name__bogus", "x")]);

    let err = compile(&query, Operation::List, &index, &strict()).err().unwrap();
    assert_eq!(
        err,
        CompileError::UnsupportedOperator {
            field: "name".to_string(),
            operator: "bogus".to_string(),
        }
    );
}

#[test]
fn unknown_fields_are_dropped_silently() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let query = QueryMap::from_pairs([("karma", "9000"), ("password_hash", "x")]);

    let (criteria, _) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    // Only the pagination criterion survives; both filters were dropped
    // (one unknown, one excluded from the field map).
    assert_eq!(criteria.len(), 1);
}

#[test]
fn multi_value_non_equality_ands_each_value() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let query = QueryMap::from_pairs([("age__gte", "10,20")]);

    let (criteria, _) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    let plan = criteria[1](QueryPlan::new());
    let expected = Condition::all().add(
        Condition::all()
            .add(binary_expr("age", ">=", "10"))
            .add(binary_expr("age", ">=", "20")),
    );
    assert_eq!(dbg(&plan.condition), dbg(&expected));
}

#[test]
fn and_operator_ands_each_value_as_equality() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let query = QueryMap::from_pairs([("name__and", "John,Jack")]);

    let (criteria, _) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    let plan = criteria[1](QueryPlan::new());
    let expected = Condition::all().add(
        Condition::all()
            .add(binary_expr("name", "=", "John"))
            .add(binary_expr("name", "=", "Jack")),
    );
    assert_eq!(dbg(&plan.condition), dbg(&expected));
}

#[test]
fn in_operator_collapses_values_into_one_condition() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let query = QueryMap::from_pairs([("age__in", "10,20,30")]);

    let (criteria, _) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    let plan = criteria[1](QueryPlan::new());
    let expected = Condition::all().add(Condition::all().add(in_expr("age", ["10", "20", "30"])));
    assert_eq!(dbg(&plan.condition), dbg(&expected));
}

#[test]
fn duplicate_filter_keys_keep_the_first_occurrence() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let query = QueryMap::from_pairs([("age__gte", "18"), ("age__gte", "21")]);

    let (criteria, _) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    let plan = criteria[1](QueryPlan::new());
    let expected = Condition::all().add(Condition::all().add(binary_expr("age", ">=", "18")));
    assert_eq!(dbg(&plan.condition), dbg(&expected));
}

#[test]
fn custom_alias_renders_through_the_configured_operator() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let mut aliases = OperatorAliases::canonical();
    aliases.set("contains", "ILIKE");
    let config = CompilerConfig {
        aliases: Some(aliases),
        ..CompilerConfig::default()
    };
    let query = QueryMap::from_pairs([("name__contains", "jo")]);

    let (criteria, _) = compile(&query, Operation::List, &index, &config).unwrap();
    let plan = criteria[1](QueryPlan::new());
    let expected = Condition::all().add(Condition::all().add(binary_expr("name", "ILIKE", "jo")));
    assert_eq!(dbg(&plan.condition), dbg(&expected));
}

#[test]
fn include_paths_are_reported_and_loaded_recursively() {
    let registry = content_registry();
    let index = registry.index_for("Page").unwrap();
    let query = QueryMap::from_pairs([("include", "Blocks.Translations.locale__eq=es")]);

    let (criteria, filters) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    assert_eq!(filters.include, vec!["Blocks", "Blocks.Translations"]);
    assert_eq!(filters.relations.len(), 1);
    assert_eq!(filters.relations[0].name, "Blocks.Translations");
    assert_eq!(filters.relations[0].filters.len(), 1);
    assert_eq!(filters.relations[0].filters[0].field, "locale");
    assert_eq!(filters.relations[0].filters[0].token, "eq");
    assert_eq!(filters.relations[0].filters[0].value, "es");

    // Pagination plus one load criterion for the single top-level relation.
    assert_eq!(criteria.len(), 2);
    let plan = plan::apply(&criteria, QueryPlan::new());
    assert_eq!(plan.loads.len(), 1);
    let blocks = &plan.loads[0];
    assert_eq!(blocks.relation, "Blocks");
    assert_eq!(blocks.path, "Blocks");
    assert_eq!(dbg(&blocks.condition), dbg(&Condition::all()));
    assert_eq!(blocks.nested.len(), 1);
    let translations = &blocks.nested[0];
    assert_eq!(translations.path, "Blocks.Translations");
    let expected = Condition::all().add(binary_expr("locale", "=", "es"));
    assert_eq!(dbg(&translations.condition), dbg(&expected));
}

#[test]
fn repeated_include_parameters_merge_like_a_comma_list() {
    let registry = content_registry();
    let index = registry.index_for("Page").unwrap();
    let query = QueryMap::from_pairs([("include", "Blocks"), ("include", "Author")]);

    let (criteria, filters) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    assert_eq!(filters.include, vec!["Author", "Blocks"]);
    // Pagination plus one load per top-level relation.
    assert_eq!(criteria.len(), 3);
}

#[test]
fn malformed_include_fails_in_any_mode() {
    let registry = content_registry();
    let index = registry.index_for("Page").unwrap();
    let query = QueryMap::from_pairs([("include", "Nope")]);

    let err = compile(&query, Operation::List, &index, &lenient()).err().unwrap();
    assert!(matches!(err, CompileError::UnknownRelation { .. }));
}

#[test]
fn read_operations_only_carry_selection_and_includes() {
    let registry = content_registry();
    let index = registry.index_for("Page").unwrap();
    let query = QueryMap::from_pairs([
        ("limit", "10"),
        ("offset", "20"),
        ("order", "title desc"),
        ("select", "id,title"),
        ("include", "Blocks"),
        ("title__eq", "Home"),
        ("_search", "foo"),
    ]);

    let (criteria, filters) = compile(&query, Operation::Read, &index, &lenient()).unwrap();
    assert_eq!(criteria.len(), 2);

    let plan = plan::apply(&criteria, QueryPlan::new());
    assert_eq!(plan.limit, None);
    assert_eq!(plan.offset, None);
    assert!(plan.order.is_empty());
    assert_eq!(dbg(&plan.condition), dbg(&Condition::all()));
    assert_eq!(plan.columns, vec!["id", "title"]);
    assert_eq!(plan.loads.len(), 1);

    assert_eq!(filters.limit, 0);
    assert_eq!(filters.offset, 0);
    assert!(filters.order.is_empty());
    assert_eq!(filters.search, "");
}

#[test]
fn search_builds_an_or_group_across_configured_columns() {
    let registry = content_registry();
    let index = registry.index_for("Page").unwrap();
    let query = QueryMap::from_pairs([("_search", "home")]);

    let (criteria, filters) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    assert_eq!(filters.search, "home");

    let plan = criteria[1](QueryPlan::new());
    let expected = Condition::all().add(
        Condition::all().add(
            Condition::any()
                .add(contains_expr("title", "home"))
                .add(contains_expr("slug", "home")),
        ),
    );
    assert_eq!(dbg(&plan.condition), dbg(&expected));
}

#[test]
fn search_without_columns_is_recorded_but_not_applied() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let query = QueryMap::from_pairs([("_search", "foo")]);

    for config in [
        lenient(),
        CompilerConfig {
            search_columns_required: true,
            ..CompilerConfig::default()
        },
        strict(),
    ] {
        let (criteria, filters) = compile(&query, Operation::List, &index, &config).unwrap();
        assert_eq!(filters.search, "foo");
        assert_eq!(criteria.len(), 1);
    }
}

#[test]
fn search_without_columns_fails_when_both_flags_are_set() {
    let registry = content_registry();
    let index = registry.index_for("User").unwrap();
    let query = QueryMap::from_pairs([("_search", "foo")]);
    let config = CompilerConfig {
        strict: true,
        search_columns_required: true,
        ..CompilerConfig::default()
    };

    let err = compile(&query, Operation::List, &index, &config).err().unwrap();
    assert_eq!(
        err,
        CompileError::SearchColumnsRequired {
            term: "foo".to_string(),
        }
    );
}

#[test]
fn filters_report_serializes_for_response_metadata() {
    let registry = content_registry();
    let index = registry.index_for("Page").unwrap();
    let query = QueryMap::from_pairs([
        ("limit", "10"),
        ("include", "Blocks.Translations.locale__eq=es"),
        ("_search", "home"),
    ]);

    let (_, filters) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    let value = serde_json::to_value(&filters).unwrap();

    assert_eq!(value["limit"], 10);
    assert_eq!(value["page"], 1);
    assert_eq!(value["search"], "home");
    assert_eq!(
        value["include"],
        serde_json::json!(["Blocks", "Blocks.Translations"])
    );
    assert_eq!(value["relations"][0]["name"], "Blocks.Translations");
    assert_eq!(value["relations"][0]["filters"][0]["operator"], "=");
}

#[test]
fn search_is_anded_with_field_filters() {
    let registry = content_registry();
    let index = registry.index_for("Page").unwrap();
    let query = QueryMap::from_pairs([("slug__ne", "draft"), ("_search", "home")]);

    let (criteria, _) = compile(&query, Operation::List, &index, &lenient()).unwrap();
    let plan = criteria[1](QueryPlan::new());
    let expected = Condition::all().add(
        Condition::all()
            .add(binary_expr("slug", "<>", "draft"))
            .add(
                Condition::any()
                    .add(contains_expr("title", "home"))
                    .add(contains_expr("slug", "home")),
            ),
    );
    assert_eq!(dbg(&plan.condition), dbg(&expected));
}
