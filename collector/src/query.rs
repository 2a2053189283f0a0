use serde_json::{json, Map, Value};

pub mod runs;
pub mod telemetry;

pub use runs::{discover_runs, run_results_query, select_runs};
pub use telemetry::{telemetry_query, PageOutcome, TelemetryPages};

/// Ascending sort on a single field.
fn sort_ascending(field: &str) -> Value {
    json!([{ field: { "order": "asc" } }])
}

/// Range filter on an epoch-second field, open-ended when `lte` is not given.
fn epoch_second_range(field: &str, gte: i64, lte: Option<i64>) -> Value {
    let mut bounds = Map::new();
    bounds.insert("format".to_string(), json!("epoch_second"));
    bounds.insert("gte".to_string(), json!(gte));
    if let Some(lte) = lte {
        bounds.insert("lte".to_string(), json!(lte));
    }

    json!({ "range": { field: bounds } })
}
