use retriever::tpl::arith;
use retriever::tpl::branch::BranchList;
use retriever::tpl::condition::Condition;
use retriever::{Delimiters, Engine, EngineOptions, TemplateError, Value, compile, to_value};
use serde::Serialize;
use serde_json::json;

fn render(tpl: &str, ctx: serde_json::Value) -> String {
    compile(tpl, &Delimiters::default())
        .unwrap()
        .render(&ctx)
        .unwrap()
}

const FULL: &str = "{{foo}}{{bar}}{{loop section}}{{data}}{{/loop}}{{if baz}}{{baz}}{{/if}}";

#[test]
fn test_end_to_end() {
    let ctx = json!({
        "foo": "a",
        "bar": "b",
        "section": [{"data": "a"}, {"data": "b"}],
        "baz": "dog"
    });
    assert_eq!(render(FULL, ctx), "ababdog");
}

#[test]
fn test_end_to_end_parts() {
    assert_eq!(render(FULL, json!({"foo": "a", "bar": "b"})), "ab");
    assert_eq!(
        render(FULL, json!({"section": [{"data": "a"}, {"data": "b"}]})),
        "ab"
    );
    assert_eq!(render(FULL, json!({"baz": "dog"})), "dog");
    assert_eq!(render(FULL, json!({})), "");
}

#[test]
fn test_escaping() {
    let ctx = json!({"attr": "<img src=\"xss\" />"});
    assert_eq!(
        render(r#"<div class="{{attr}}"></div>"#, ctx.clone()),
        r#"<div class="&lt;img src=&quot;xss&quot; /&gt;"></div>"#
    );
    assert_eq!(
        render(r#"<div class="{{%attr}}"></div>"#, ctx),
        r#"<div class="<img src="xss" />"></div>"#
    );
}

#[test]
fn test_reserved_variables() {
    let ctx = json!({"list": [1, 2, 3], "foo": "x"});
    assert_eq!(render("{{loop list}}{{@data}}{{/loop}}", ctx.clone()), "123");
    assert_eq!(render("{{loop list}}{{@index}}{{/loop}}", ctx.clone()), "012");
    assert_eq!(render("{{loop list}}{{@parent.foo}}{{/loop}}", ctx.clone()), "xxx");
    assert_eq!(render("{{for list}}{{@%data}}{{/for}}", ctx), "123");
}

#[test]
fn test_nested_loops_and_parent() {
    let ctx = json!({
        "groups": [
            {"name": "a", "items": [1, 2]},
            {"name": "b", "items": [3]}
        ]
    });
    let tpl = "{{loop groups}}[{{loop items}}{{@parent.name}}{{@data}}{{/loop}}]{{/loop}}";
    assert_eq!(render(tpl, ctx), "[a1a2][b3]");
}

#[test]
fn test_loop_over_map_and_missing_source() {
    let ctx = json!({"m": {"x": 1, "y": 2}, "s": "text"});
    assert_eq!(render("{{loop m}}{{@data}}{{/loop}}", ctx.clone()), "12");
    assert_eq!(render("{{loop s}}x{{/loop}}", ctx.clone()), "");
    assert_eq!(render("{{loop nope}}x{{/loop}}", ctx), "");
}

#[test]
fn test_whitespace_trim() {
    let tpl = "\n  <ul>\n{{loop list}}\n  <li>{{@data}}</li>\n{{/loop}}\n  </ul>\n";
    assert_eq!(
        render(tpl, json!({"list": ["a", "b"]})),
        "<ul>\n<li>a</li><li>b</li>\n  </ul>"
    );
}

#[test]
fn test_if_chain() {
    let tpl = "{{if a > 1}}\nfoo\n{{else if a == 0}}\nbar\n{{else}}\nbaz\n{{/if}}";
    assert_eq!(render(tpl, json!({"a": 2})), "foo");
    assert_eq!(render(tpl, json!({"a": 0})), "bar");
    assert_eq!(render(tpl, json!({"a": -1})), "baz");
}

#[test]
fn test_condition_inside_loop() {
    let tpl = "{{loop list}}{{if @data > 1 && @index != 2}}{{@data}}{{/if}}{{/loop}}";
    assert_eq!(render(tpl, json!({"list": [1, 2, 3]})), "2");
}

#[test]
fn test_idempotence() {
    let template = compile(FULL, &Delimiters::default()).unwrap();
    let ctx = json!({"foo": "a", "section": [{"data": "x"}], "baz": 1});
    let first = template.render(&ctx).unwrap();
    let second = template.render(&ctx).unwrap();
    assert_eq!(first, "ax1");
    assert_eq!(first, second);

    let engine = Engine::new();
    let a = engine.render_template("full", FULL, &ctx).unwrap();
    let b = engine.render_template("full", FULL, &ctx).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_helpers() {
    let engine = Engine::new();
    engine.register_helper("join", |args: &[Value]| {
        args.iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("-")
    });
    let tpl = engine.compile("{{#join 'a b' 1 user.name}}").unwrap();
    assert_eq!(tpl.render(&json!({"user": {"name": "<x>"}})).unwrap(), "a b-1-<x>");

    engine.register_helper("join", |_: &[Value]| "new");
    assert_eq!(tpl.render(&json!({})).unwrap(), "a b-1-");
    let again = engine.compile("{{#join}}").unwrap();
    assert_eq!(again.render(&json!({})).unwrap(), "new");
}

#[test]
fn test_undefined_helper() {
    let engine = Engine::new();
    assert_eq!(
        engine.compile("a {{#nope x}}").unwrap_err(),
        TemplateError::UndefinedHelper("nope".into())
    );
}

#[test]
fn test_custom_delimiters() {
    let engine = Engine::with_options(EngineOptions::new().delimiters("<%", "%>"));
    let out = engine
        .render_template("d", "<%if ok%>{{raw}} <%name%><%/if%>", &json!({"ok": true, "name": "n"}))
        .unwrap();
    assert_eq!(out, "{{raw}} n");
}

#[test]
fn test_syntax_errors() {
    let cases = [
        ("line1\nline2 }}", 2),
        ("{{if a}}\n{{else}}x\n{{else}}y{{/if}}", 3),
        ("{{loop a}}\n\n{{/if}}", 3),
        ("\n{{if a}}", 2),
        ("{{if a > > b}}x{{/if}}", 1),
        ("{{if (a + 1 > 2}}x{{/if}}", 1),
        ("{{if a b}}yes{{/if}}", 1),
        ("\n{{if a >}}x{{/if}}", 2),
        ("{{if a}}x{{else if && b}}y{{/if}}", 1),
    ];
    for (tpl, line) in cases {
        match compile(tpl, &Delimiters::default()) {
            Err(TemplateError::Syntax { line: l, .. }) => assert_eq!(l, line, "{}", tpl),
            other => panic!("expected syntax error for {:?}, got {:?}", tpl, other),
        }
    }
}

#[test]
fn test_deep_expression_is_an_error() {
    let tpl = format!(
        "{{{{if {}1{} > 0}}}}x{{{{/if}}}}",
        "(".repeat(200_000),
        ")".repeat(200_000)
    );
    assert!(matches!(
        compile(&tpl, &Delimiters::default()),
        Err(TemplateError::Syntax { line: 1, .. })
    ));
}

#[test]
fn test_nesting_limit() {
    let engine = Engine::with_options(EngineOptions::new().max_depth(3));
    let ok = "{{loop a}}{{loop b}}{{if c}}x{{/if}}{{/loop}}{{/loop}}";
    assert!(engine.compile(ok).is_ok());
    let deep = "{{loop a}}{{loop b}}{{if c}}{{if d}}x{{/if}}{{/if}}{{/loop}}{{/loop}}";
    assert_eq!(
        engine.compile(deep).unwrap_err(),
        TemplateError::NestingTooDeep(3)
    );
}

#[test]
fn test_arithmetic() {
    assert_eq!(
        arith::evaluate_str(&["100", "/", "(", "10", "+", "15", ")"]).unwrap(),
        Value::F64(4.0)
    );
    assert!(arith::evaluate_str(&["100", "/", "(", "10", "+", "15"]).is_err());
}

#[test]
fn test_conditions() {
    let check = |cond: &str, ctx: serde_json::Value| {
        Condition::parse(cond)
            .unwrap()
            .evaluate_in(&to_value(&ctx).unwrap())
            .unwrap()
    };
    assert!(check("a > 0", json!({"a": 1})));
    assert!(!check("a > 0", json!({"a": -1})));
    assert!(check("a > 10 && a < 12", json!({"a": 11})));
    assert!(!check("a > 10 && a < 12", json!({"a": 12})));
    assert!(check("a > 10 || a < 5", json!({"a": 2})));
    assert!(!check("a > 10 || a < 5", json!({"a": 8})));
    assert!(check("a === 10", json!({"a": "10"})));
}

#[test]
fn test_branch_resolver() {
    let list = BranchList::split("a>1", "foo{{else if a==0}}bar{{else}}baz").unwrap();
    let pick = |ctx: serde_json::Value| list.resolve(&to_value(&ctx).unwrap()).unwrap().to_string();
    assert_eq!(pick(json!({"a": 2})), "foo");
    assert_eq!(pick(json!({"a": 0})), "bar");
    assert_eq!(pick(json!({"a": -1})), "baz");
}

#[derive(Serialize)]
struct Row {
    id: u32,
    tags: Vec<&'static str>,
    note: Option<String>,
}

#[test]
fn test_struct_context() {
    let rows = vec![
        Row {
            id: 1,
            tags: vec!["x", "y"],
            note: None,
        },
        Row {
            id: 2,
            tags: vec![],
            note: Some("n".into()),
        },
    ];
    let tpl = compile(
        "{{loop @data}}{{id}}:{{tags}}:{{note}};{{/loop}}",
        &Delimiters::default(),
    )
    .unwrap();
    assert_eq!(tpl.render(&rows).unwrap(), "1:x,y:;2::n;");
}
