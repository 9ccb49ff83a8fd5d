use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use toolshed::prelude::*;
use toolshed::{ManualClock, optional_str, required_f64, required_str};

struct PriceTable {
    lookups: AtomicUsize,
    prices: HashMap<&'static str, f64>,
}

impl PriceTable {
    fn new() -> Self {
        Self {
            lookups: AtomicUsize::new(0),
            prices: HashMap::from([("widget", 2.5), ("gadget", 10.0)]),
        }
    }
}

fn pricing_module() -> ToolModule {
    ToolModule::factory("pricing", |deps: Arc<Dependencies>| async move {
        let table = deps.require::<PriceTable>()?;
        Ok::<_, ToolError>(ToolSet::new().with_fn(
            ts_schema!(
                "quote",
                "Price for a quantity of one item",
                required { item: string, quantity: integer },
            ),
            move |args: Value, _ctx| {
                let table = Arc::clone(&table);
                async move {
                    table.lookups.fetch_add(1, Ordering::SeqCst);
                    let item = required_str(&args, "item")?;
                    let quantity = required_f64(&args, "quantity")?;
                    let unit = table
                        .prices
                        .get(item)
                        .copied()
                        .ok_or_else(|| ToolError::execution(format!("unknown item {item}")))?;
                    Ok::<_, ToolError>(json!({ "item": item, "total": unit * quantity }))
                }
            },
        ))
    })
}

struct Inventory {
    warehouse: String,
    stock: Mutex<HashMap<String, i64>>,
}

impl ToolClass for Inventory {
    fn construct(dependencies: &Dependencies) -> Result<Self, ToolError> {
        Ok(Self {
            warehouse: dependencies.require_setting("warehouse")?.to_string(),
            stock: Mutex::new(HashMap::new()),
        })
    }

    fn methods() -> Vec<ToolMethod<Self>> {
        vec![
            ToolMethod::new(
                ts_schema!(
                    "restock",
                    "Adds units of an item",
                    required { item: string, units: integer },
                ),
                |inventory: Arc<Inventory>, args: Value, _ctx| async move {
                    let item = required_str(&args, "item")?.to_string();
                    let units = args["units"].as_i64().unwrap_or_default();
                    let mut stock = inventory
                        .stock
                        .lock()
                        .map_err(|_| ToolError::internal("stock lock poisoned"))?;
                    let level = stock.entry(item).or_insert(0);
                    *level += units;
                    Ok::<_, ToolError>(json!({ "warehouse": inventory.warehouse, "level": *level }))
                },
            ),
            ToolMethod::new(
                ts_schema!("level", "Units on hand", required { item: string }),
                |inventory: Arc<Inventory>, args: Value, _ctx| async move {
                    let item = required_str(&args, "item")?;
                    let stock = inventory
                        .stock
                        .lock()
                        .map_err(|_| ToolError::internal("stock lock poisoned"))?;
                    Ok::<_, ToolError>(json!({ "level": stock.get(item).copied().unwrap_or(0) }))
                },
            ),
        ]
    }
}

fn greeter() -> FunctionTool {
    FunctionTool::from_sync(
        ts_schema!("greet", "Greets someone", optional { name: string }),
        |args, _ctx| {
            let name = optional_str(&args, "name").unwrap_or("there");
            Ok(json!(format!("hello {name}")))
        },
    )
}

#[tokio::test]
async fn modules_classes_and_host_tools_serve_requests() {
    let table = Arc::new(PriceTable::new());
    let clock = Arc::new(ManualClock::new());
    let config = RuntimeConfig::default()
        .with_tool_policy("quote", ToolPolicy::default().with_cache_ttl(Duration::from_secs(60)));

    let runtime = toolshed::runtime_builder()
        .config(config)
        .clock(clock.clone())
        .tool(greeter())
        .module(pricing_module())
        .module(ToolModule::class::<Inventory>("inventory"))
        .build()
        .expect("build");

    let registered = runtime
        .initialize(
            Dependencies::new()
                .with_shared(Arc::clone(&table))
                .with_setting("warehouse", "north"),
        )
        .await
        .expect("initialize");
    assert_eq!(registered, 4);

    let listed = handle_list(&runtime);
    let names: Vec<&str> = listed.body["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    assert_eq!(names, vec!["greet", "quote", "restock", "level"]);

    let greeting = handle_execute(&runtime, "greet", "").await;
    assert_eq!(greeting.body["result"], "hello there");

    let first = handle_execute(&runtime, "quote", r#"{"item":"widget","quantity":4}"#).await;
    assert_eq!(first.body["result"]["total"], 10.0);
    assert_eq!(first.body["fromCache"], false);

    let second = handle_execute(&runtime, "quote", r#"{"quantity":4,"item":"widget"}"#).await;
    assert_eq!(second.body["fromCache"], true);
    assert_eq!(table.lookups.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(61));
    let expired = handle_execute(&runtime, "quote", r#"{"item":"widget","quantity":4}"#).await;
    assert_eq!(expired.body["fromCache"], false);
    assert_eq!(table.lookups.load(Ordering::SeqCst), 2);

    handle_execute(&runtime, "restock", r#"{"item":"bolt","units":5}"#).await;
    let restocked = handle_execute(&runtime, "restock", r#"{"item":"bolt","units":3}"#).await;
    assert_eq!(restocked.body["result"]["warehouse"], "north");
    assert_eq!(restocked.body["result"]["level"], 8);

    let level = handle_execute(&runtime, "level", r#"{"item":"bolt"}"#).await;
    assert_eq!(level.body["result"]["level"], 8);

    let stats = handle_stats(&runtime);
    assert_eq!(stats.body["totalCalls"], 7);
    assert_eq!(stats.body["cacheHits"], 1);
    assert_eq!(stats.body["failedCalls"], 0);
}

#[tokio::test]
async fn missing_dependencies_skip_only_the_affected_modules() {
    let runtime = start_runtime(
        RuntimeConfig::default(),
        [pricing_module(), ToolModule::class::<Inventory>("inventory")],
        Dependencies::new().with_setting("warehouse", "south"),
    )
    .await
    .expect("runtime should start without pricing");

    assert!(!runtime.has_tool("quote"));
    assert!(runtime.has_tool("restock"));

    let response = handle_execute(&runtime, "quote", r#"{"item":"widget","quantity":1}"#).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["error"], "TOOL_NOT_FOUND");
}

#[tokio::test]
async fn execution_errors_surface_in_the_result_body() {
    let table = Arc::new(PriceTable::new());
    let runtime = start_runtime(
        RuntimeConfig::default(),
        [pricing_module()],
        Dependencies::new().with_shared(table),
    )
    .await
    .expect("start");

    let unknown = handle_execute(&runtime, "quote", r#"{"item":"sprocket","quantity":1}"#).await;
    assert_eq!(unknown.status, 200);
    assert_eq!(unknown.body["success"], false);
    assert_eq!(unknown.body["error"], "EXECUTION_ERROR");
    assert_eq!(unknown.body["message"], "unknown item sprocket");

    let wrong_type = handle_execute(&runtime, "quote", r#"{"item":"widget","quantity":"two"}"#).await;
    assert_eq!(wrong_type.body["error"], "VALIDATION_ERROR");

    let learning = runtime.learning_log().expect("learning log");
    assert_eq!(learning.failures.len(), 1);
    assert_eq!(learning.failures[0].tool_name, "quote");
}
