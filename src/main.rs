use retriever::tpl::helper::helper_fn;
use retriever::{Engine, EngineOptions, Value};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Serialize, Debug)]
struct Item<'a> {
    name: &'a str,
    price: f64,
}

#[derive(Serialize, Debug)]
struct Page<'a> {
    title: &'a str,
    user: Option<&'a str>,
    items: Vec<Item<'a>>,
}

const PAGE: &str = r#"
<h1>{{#upper title}}</h1>
{{if user != null}}
<p>Hello, {{user}}</p>
{{else}}
<p>Please sign in</p>
{{/if}}
<ul>
{{loop items}}
  <li>{{@index}}. {{#tag name}} {{#currency price}}{{if price > 100}} (premium){{/if}}</li>
{{/loop}}
</ul>
"#;

fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::new("debug")).init();

    let engine = Engine::with_options(EngineOptions::new().max_depth(16));
    engine.register_helper("currency", |args: &[Value]| {
        let amount = args.first().and_then(Value::to_number).unwrap_or(0.0);
        format!("${:.2}", amount)
    });
    engine.register_helpers([
        (
            "upper",
            helper_fn(|args| {
                let text = args.first().map(|v| v.to_string()).unwrap_or_default();
                Ok(Value::from(text.to_uppercase()))
            }),
        ),
        (
            "tag",
            helper_fn(|args| match args {
                [name] => Ok(Value::from(format!("<span class=\"tag\">{}</span>", name))),
                _ => Err(format!("tag expects 1 argument, got {}", args.len())),
            }),
        ),
    ]);
    tracing::info!("helpers ready, upper registered: {}", engine.has_helper("upper"));

    let page = Page {
        title: "Fruit <stand>",
        user: Some("jason"),
        items: vec![
            Item {
                name: "apple",
                price: 3.5,
            },
            Item {
                name: "durian",
                price: 120.0,
            },
        ],
    };

    let html = engine.render_template("page", PAGE, &page)?;
    println!("{}", html);
    Ok(())
}
