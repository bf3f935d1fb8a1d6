//! Built-in tools.

mod transit_route;
mod transport_rest;

use std::sync::Arc;

use serde_json::Value;
use toasttalk_traits::{LocationResolver, ToolRegistry, TransitRouteResolver};

pub use transit_route::{TRANSIT_ROUTE_TOOL, TransitRouteTool, format_route_info};
pub use transport_rest::{DEFAULT_TRANSPORT_REST_URL, TransportRestClient};

const SUMMARY_CHARS: usize = 200;

/// Registry holding every built-in tool.
pub fn default_registry(
    location: Arc<dyn LocationResolver>,
    routes: Arc<dyn TransitRouteResolver>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(TransitRouteTool::new(location, routes));
    registry
}

/// One-line description of a tool result for live display.
pub fn summarize_tool_result(content: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(content)
        && let Some(Value::Array(journeys)) = map.get("journeys")
    {
        return format!("found {} routes", journeys.len());
    }

    if content.chars().count() > SUMMARY_CHARS {
        let head: String = content.chars().take(SUMMARY_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}
