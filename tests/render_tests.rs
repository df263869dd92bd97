use html_bindings::{BindError, CompileError, Options, Registry, Scope, parse, render_document};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

const PLAYLIST: &str = "<h1>{{ title }}</h1><ul><li hb-repeat=\"track in tracks\">{{ track.name }}</li></ul>";

#[test]
fn test_host_drives_scope_directly() {
    let mut doc = parse(PLAYLIST).unwrap();
    let scope = Scope::new(json!({"title": "Music", "tracks": [{"name": "A"}, {"name": "B"}]}));
    let root = doc.root();
    scope.compile(&mut doc, root).unwrap();

    scope.render(&mut doc);
    assert_eq!(doc.to_html(), "<h1>Music</h1><ul><li>A</li><li>B</li></ul>");
    assert_eq!(scope.fragments()[0].len(), 2);

    // Shrink
    scope.set("tracks", json!([{"name": "C"}]));
    scope.render(&mut doc);
    assert_eq!(doc.to_html(), "<h1>Music</h1><ul><li>C</li></ul>");

    // Grow
    scope.set("tracks", json!([{"name": "C"}, {"name": "D"}, {"name": "E"}]));
    scope.render(&mut doc);
    assert_eq!(doc.to_html(), "<h1>Music</h1><ul><li>C</li><li>D</li><li>E</li></ul>");
}

#[test]
fn test_render_is_idempotent() {
    let mut doc = parse(PLAYLIST).unwrap();
    let scope = Scope::new(json!({"title": "Music", "tracks": [{"name": "A"}, {"name": "B"}]}));
    let root = doc.root();
    scope.compile(&mut doc, root).unwrap();

    scope.render(&mut doc);
    let first = doc.to_html();
    let nodes = doc.len();

    scope.render(&mut doc);
    assert_eq!(doc.to_html(), first);
    assert_eq!(doc.len(), nodes);
    assert_eq!(scope.fragments()[0].len(), 2);
}

#[test]
fn test_items_fall_back_to_outer_data() {
    let html = render_document(
        "<p hb-repeat=\"track in tracks\">{{ track.name }} on {{ album }}</p>",
        &json!({"album": "Blue", "tracks": [{"name": "A"}]}),
        &Options::default(),
    )
    .unwrap();
    assert_eq!(html, "<p>A on Blue</p>");
}

#[test]
fn test_empty_and_missing_collections_render_nothing() {
    let options = Options::default();
    let source = "<ul><li hb-repeat=\"t in tracks\">{{ t }}</li></ul>";
    assert_eq!(render_document(source, &json!({"tracks": []}), &options).unwrap(), "<ul></ul>");
    assert_eq!(render_document(source, &json!({}), &options).unwrap(), "<ul></ul>");
    assert_eq!(render_document(source, &json!({"tracks": 3}), &options).unwrap(), "<ul></ul>");
}

#[test]
fn test_invalid_repeat_expression_produces_no_fragments() {
    let mut doc = parse("<ul><li hb-repeat=\"track tracks\">{{ track }}</li></ul>").unwrap();
    let scope = Scope::new(json!({"tracks": [1, 2]}));
    let root = doc.root();

    let err = scope.compile(&mut doc, root).unwrap_err();
    assert!(matches!(err, BindError::InvalidRepeatExpression { .. }));
    assert!(scope.fragments().is_empty());
}

#[test]
fn test_registry_with_host_state() {
    let mut doc = parse(
        "<main hb-controller=\"player\"><h1>{{ title }}</h1><p hb-repeat=\"t in queue\">{{ t }}</p></main>",
    )
    .unwrap();

    let calls = Rc::new(Cell::new(0));
    let mut registry = Registry::new();
    {
        let calls = Rc::clone(&calls);
        registry
            .register("player", move |scope: &Scope| {
                calls.set(calls.get() + 1);
                scope.set_data(json!({"title": "Now playing", "queue": ["x", "y"]}));
            })
            .unwrap();
    }

    let mounts = registry.bootstrap(&mut doc).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(
        doc.to_html(),
        "<main hb-controller=\"player\"><h1>Now playing</h1><p>x</p><p>y</p></main>"
    );

    mounts[0].scope.set("queue", json!([]));
    mounts[0].render(&mut doc);
    assert_eq!(doc.to_html(), "<main hb-controller=\"player\"><h1>Now playing</h1></main>");
}

#[test]
fn test_custom_attributes() {
    let options = Options {
        repeat_attribute: "data-each".to_string(),
        controller_attribute: "data-controller".to_string(),
    };
    let html = render_document(
        "<ol data-controller=\"list\"><li data-each=\"n in numbers\">{{ n }}</li></ol>",
        &json!({"list": {"numbers": [1, 2]}}),
        &options,
    )
    .unwrap();
    assert_eq!(html, "<ol data-controller=\"list\"><li>1</li><li>2</li></ol>");
}

#[test]
fn test_parse_errors_surface_through_render() {
    let err = render_document("<div><p>open", &json!({}), &Options::default()).unwrap_err();
    assert!(matches!(err, CompileError::Parse(_)));
}

#[test]
fn test_document_without_bindings_round_trips() {
    let source = "<!DOCTYPE html><html><body><p class=\"a\">x &amp; y</p><br><!-- note --></body></html>";
    let html = render_document(source, &json!({}), &Options::default()).unwrap();
    assert_eq!(html, source);
}
