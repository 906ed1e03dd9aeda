//! Tests for global and named scopes.

mod common;

use serde_json::{Value, json};

use common::TestContext;
use helios_odm::error::{OdmError, ScopeError};
use helios_odm::model::ModelDefinition;
use helios_odm::{Builder, Model, Scope, ScopeRegistration};

// ============================================================================
// Helper Functions
// ============================================================================

fn filters(builder: &Builder) -> Value {
    builder.to_body()["query"]["bool"]["filter"].clone()
}

struct PublishedScope;

impl Scope for PublishedScope {
    fn apply(&self, builder: Builder, _model: &Model) -> Builder {
        builder.where_value("status", "published")
    }
}

struct TenantScope {
    tenant: String,
}

impl Scope for TenantScope {
    fn apply(&self, builder: Builder, _model: &Model) -> Builder {
        builder.where_value("tenant", self.tenant.as_str())
    }

    fn identifier(&self) -> String {
        "tenant".to_string()
    }
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_global_scope_applied_and_removed() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    posts
        .add_global_scope_fn("foo", |builder, _| builder.where_value("foo", "bar"))
        .unwrap();

    let scoped = posts.new_query();
    assert_eq!(filters(&scoped), json!([{"term": {"foo": "bar"}}]));
    assert!(scoped.removed_scopes().is_empty());

    let unscoped = posts.without_global_scope("foo");
    assert!(unscoped.to_body().get("query").is_none());
    assert_eq!(unscoped.removed_scopes(), vec!["foo"]);
}

#[test]
fn test_scopes_apply_in_registration_order() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    posts
        .add_global_scope_fn("second", |b, _| b.where_value("order", 2))
        .unwrap();
    posts
        .add_global_scope_fn("first", |b, _| b.where_value("order", 1))
        .unwrap();

    assert_eq!(posts.global_scopes(), vec!["second", "first"]);
    assert_eq!(
        filters(&posts.new_query()),
        json!([{"term": {"order": 2}}, {"term": {"order": 1}}])
    );
}

#[test]
fn test_reregistering_keeps_position_and_replaces() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    posts.add_global_scope_fn("a", |b, _| b.where_value("a", 1)).unwrap();
    posts.add_global_scope_fn("b", |b, _| b.where_value("b", 1)).unwrap();
    posts.add_global_scope_fn("a", |b, _| b.where_value("a", 2)).unwrap();

    assert_eq!(posts.global_scopes(), vec!["a", "b"]);
    assert_eq!(
        filters(&posts.new_query()),
        json!([{"term": {"a": 2}}, {"term": {"b": 1}}])
    );
}

#[test]
fn test_scope_object_keyed_by_type_identity() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    let identifier = posts.add_global_scope_object(PublishedScope).unwrap();

    assert!(identifier.ends_with("PublishedScope"));
    assert!(posts.has_global_scope(&identifier));
    assert_eq!(
        filters(&posts.new_query()),
        json!([{"term": {"status": "published"}}])
    );
    assert!(posts.without_global_scope(identifier).to_body().get("query").is_none());
}

#[test]
fn test_scope_object_with_custom_identifier() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    let identifier = posts
        .add_global_scope_object(TenantScope {
            tenant: "acme".to_string(),
        })
        .unwrap();

    assert_eq!(identifier, "tenant");
    assert_eq!(filters(&posts.new_query()), json!([{"term": {"tenant": "acme"}}]));
}

#[test]
fn test_anonymous_closures_are_distinct() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    let first = posts
        .add_global_closure(|b, _| b.where_value("x", 1))
        .unwrap();
    let second = posts
        .add_global_closure(|b, _| b.where_value("y", 1))
        .unwrap();

    assert!(first.starts_with("closure:"));
    assert_ne!(first, second);
    assert_eq!(posts.global_scopes().len(), 2);
    assert_eq!(filters(&posts.without_global_scope(first)), json!([{"term": {"y": 1}}]));
}

#[test]
fn test_empty_identifier_rejected() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    let result = posts.add_global_scope(ScopeRegistration::identified("  ", |b, _| b));

    assert!(matches!(
        result,
        Err(OdmError::Scope(ScopeError::InvalidRegistration { .. }))
    ));
    assert!(posts.global_scopes().is_empty());
}

#[test]
fn test_scopes_isolated_per_model_type() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    let comments = ctx.define(ModelDefinition::builder("Comment").index("comments"));
    posts
        .add_global_scope_fn("published", |b, _| b.where_value("status", "published"))
        .unwrap();

    assert!(posts.has_global_scope("published"));
    assert!(!comments.has_global_scope("published"));
    assert!(comments.new_query().to_body().get("query").is_none());
}

#[test]
fn test_registry_clear() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    posts.add_global_scope_fn("a", |b, _| b).unwrap();
    posts.add_global_scope_fn("b", |b, _| b).unwrap();

    assert!(ctx.scopes.remove("Post", "a"));
    assert!(!ctx.scopes.remove("Post", "a"));
    assert_eq!(posts.global_scopes(), vec!["b"]);

    ctx.scopes.clear("Post");
    assert!(posts.global_scopes().is_empty());
}

// ============================================================================
// Removal
// ============================================================================

#[test]
fn test_without_several_scopes() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    posts.add_global_scope_fn("a", |b, _| b.where_value("a", 1)).unwrap();
    posts.add_global_scope_fn("b", |b, _| b.where_value("b", 1)).unwrap();
    posts.add_global_scope_fn("c", |b, _| b.where_value("c", 1)).unwrap();

    let builder = posts.without_global_scopes(["a", "c"]);
    assert_eq!(filters(&builder), json!([{"term": {"b": 1}}]));
    assert_eq!(builder.removed_scopes(), vec!["a", "c"]);
}

#[test]
fn test_without_all_scopes_snapshots_identifiers() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    posts.add_global_scope_fn("a", |b, _| b.where_value("a", 1)).unwrap();
    posts.add_global_scope_fn("b", |b, _| b.where_value("b", 1)).unwrap();

    let pending = posts.new_query_without_scopes().without_all_global_scopes();
    posts.add_global_scope_fn("late", |b, _| b.where_value("late", 1)).unwrap();

    let builder = pending.apply_global_scopes();
    assert_eq!(builder.removed_scopes(), vec!["a", "b"]);
    assert_eq!(filters(&builder), json!([{"term": {"late": 1}}]));
}

#[test]
fn test_removal_after_application_has_no_effect() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    posts
        .add_global_scope_fn("foo", |b, _| b.where_value("foo", "bar"))
        .unwrap();

    let builder = posts.new_query().without_global_scope("foo");
    assert!(builder.scopes_applied());
    assert_eq!(builder.removed_scopes(), vec!["foo"]);
    assert_eq!(filters(&builder), json!([{"term": {"foo": "bar"}}]));
}

#[test]
fn test_scopes_apply_once() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    posts
        .add_global_scope_fn("foo", |b, _| b.where_value("foo", "bar"))
        .unwrap();

    let builder = posts.new_query().apply_global_scopes();
    assert_eq!(filters(&builder).as_array().unwrap().len(), 1);
}

#[test]
fn test_scope_receives_model_prototype() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    posts
        .add_global_scope_fn("type", |b, model| {
            let model_type = model.model_type().to_string();
            b.where_value("type", model_type)
        })
        .unwrap();

    assert_eq!(filters(&posts.new_query()), json!([{"term": {"type": "Post"}}]));
}

// ============================================================================
// Named Scopes
// ============================================================================

#[test]
fn test_named_scope_with_arguments() {
    let ctx = TestContext::new();
    let posts = ctx.define(
        ModelDefinition::builder("Post")
            .index("posts")
            .named_scope("popular", |builder, args| {
                let threshold = args.first().cloned().unwrap_or(json!(100));
                builder.where_op("views", ">=", threshold)
            }),
    );

    assert!(posts.has_named_scope("popular"));
    let builder = posts.new_query().scope("popular", &[json!(500)]).unwrap();
    assert_eq!(filters(&builder), json!([{"range": {"views": {"gte": 500}}}]));

    let defaulted = posts.new_query().scope("popular", &[]).unwrap();
    assert_eq!(filters(&defaulted), json!([{"range": {"views": {"gte": 100}}}]));
}

#[test]
fn test_unknown_named_scope_fails() {
    let ctx = TestContext::new();
    let posts = ctx.posts();
    let err = posts.new_query().scope("trending", &[]).unwrap_err();

    assert!(matches!(
        err,
        OdmError::Scope(ScopeError::UnknownScope { ref name, .. }) if name == "trending"
    ));
}
