//! Public transport route search tool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::{Value, json};
use toasttalk_traits::{
    Coordinate, Journey, Leg, LocationResolver, RouteSearch, Tool, ToolError, ToolOutput,
    ToolResult, TransitRouteResolver, TransitStop,
};

pub const TRANSIT_ROUTE_TOOL: &str = "search_transit_route";

const DEFAULT_NUM_RESULTS: usize = 3;
const MAX_NUM_RESULTS: usize = 10;

fn default_num_results() -> usize {
    DEFAULT_NUM_RESULTS
}

#[derive(Debug, Deserialize)]
struct RouteInput {
    from_latitude: f64,
    from_longitude: f64,
    to_latitude: f64,
    to_longitude: f64,
    #[serde(default = "default_num_results")]
    num_results: usize,
}

/// Searches transit connections between two coordinates.
///
/// Either end may be the `(-999, -999)` sentinel, which is resolved through
/// the location collaborator. The conversation receives a compact summary;
/// the full journey payload is attached as the output's presentation.
pub struct TransitRouteTool {
    location: Arc<dyn LocationResolver>,
    routes: Arc<dyn TransitRouteResolver>,
}

impl TransitRouteTool {
    pub fn new(location: Arc<dyn LocationResolver>, routes: Arc<dyn TransitRouteResolver>) -> Self {
        Self { location, routes }
    }

    async fn resolve(&self, point: Coordinate, end: &str) -> ToolResult<Coordinate> {
        if !point.is_current_location() {
            return Ok(point);
        }
        tracing::info!(category = "tool", end, "Resolving current location");
        self.location.current_location().await.map_err(|e| {
            tracing::warn!(category = "tool", end, error = %e, "Current location unavailable");
            ToolError::execution(format!("could not determine current location for {end}: {e}"))
        })
    }
}

#[async_trait]
impl Tool for TransitRouteTool {
    fn name(&self) -> &str {
        TRANSIT_ROUTE_TOOL
    }

    fn description(&self) -> &str {
        "Search public transport routes between two points given as coordinates. \
         Use -999 for both latitude and longitude of an end to mean the user's current location."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from_latitude": {"type": "number", "description": "Start latitude"},
                "from_longitude": {"type": "number", "description": "Start longitude"},
                "to_latitude": {"type": "number", "description": "Destination latitude"},
                "to_longitude": {"type": "number", "description": "Destination longitude"},
                "num_results": {
                    "type": "integer",
                    "description": "Number of routes to return",
                    "default": DEFAULT_NUM_RESULTS
                }
            },
            "required": ["from_latitude", "from_longitude", "to_latitude", "to_longitude"]
        })
    }

    async fn execute(&self, input: Value) -> ToolResult<ToolOutput> {
        let params: RouteInput = serde_json::from_value(input)?;
        let num_results = params.num_results.clamp(1, MAX_NUM_RESULTS);

        let from = self
            .resolve(Coordinate::new(params.from_latitude, params.from_longitude), "start")
            .await?;
        let to = self
            .resolve(Coordinate::new(params.to_latitude, params.to_longitude), "destination")
            .await?;

        let search = self.routes.search(from, to, num_results).await?;
        tracing::info!(
            category = "tool",
            from_stop = %search.from_stop.name,
            to_stop = %search.to_stop.name,
            journeys = search.journeys.len(),
            "Transit routes found"
        );

        let full = full_payload(&search, from, to, num_results);
        let summary = simplified_payload(&search, num_results);
        Ok(ToolOutput::success(summary).with_presentation(full))
    }
}

fn stop_payload(stop: &TransitStop, query: Coordinate) -> Value {
    json!({
        "name": stop.name,
        "distance": stop.distance.unwrap_or(0.0),
        "coordinates": {"lat": query.latitude, "lon": query.longitude}
    })
}

fn location_payload(location: Option<&toasttalk_traits::StopLocation>) -> Value {
    json!({
        "lat": location.and_then(|l| l.latitude).unwrap_or(0.0),
        "lon": location.and_then(|l| l.longitude).unwrap_or(0.0),
    })
}

fn leg_payload(leg: &Leg) -> Value {
    let mut payload = json!({
        "walking": leg.is_walking(),
        "distance": leg.distance.unwrap_or(0),
        "origin": {
            "name": leg.origin.name.clone().unwrap_or_default(),
            "location": location_payload(leg.origin.location.as_ref()),
        },
        "destination": {
            "name": leg.destination.name.clone().unwrap_or_default(),
            "location": location_payload(leg.destination.location.as_ref()),
        },
    });

    if let Some(line) = &leg.line {
        payload["line"] = json!({
            "name": line.name.clone().unwrap_or_default(),
            "mode": line.mode.clone().unwrap_or_default(),
        });
    }
    if let Some(departure) = &leg.departure {
        payload["departure"] = json!(departure);
    }
    if let Some(arrival) = &leg.arrival {
        payload["arrival"] = json!(arrival);
    }
    if let Some(stopovers) = &leg.stopovers {
        let stops: Vec<Value> = stopovers
            .iter()
            .map(|stopover| {
                let stop = stopover.stop.as_ref();
                let mut entry = json!({
                    "name": stop.and_then(|s| s.name.clone()).unwrap_or_default(),
                });
                if let Some(location) = stop.and_then(|s| s.location.as_ref()) {
                    entry["location"] = location_payload(Some(location));
                }
                if let Some(arrival) = &stopover.arrival {
                    entry["arrival"] = json!(arrival);
                }
                if let Some(departure) = &stopover.departure {
                    entry["departure"] = json!(departure);
                }
                entry
            })
            .collect();
        payload["stopovers"] = Value::Array(stops);
    }

    payload
}

fn full_payload(search: &RouteSearch, from: Coordinate, to: Coordinate, limit: usize) -> Value {
    let journeys: Vec<Value> = search
        .journeys
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, journey)| {
            json!({
                "index": index,
                "route_info": format_route_info(journey, &search.from_stop, &search.to_stop),
                "departure": journey.departure_time().unwrap_or_default(),
                "arrival": journey.arrival_time().unwrap_or_default(),
                "legs": journey.legs.iter().map(leg_payload).collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "status": "success",
        "from_stop": stop_payload(&search.from_stop, from),
        "to_stop": stop_payload(&search.to_stop, to),
        "journeys": journeys,
        "total_results": search.journeys.len(),
    })
}

/// Compact form kept in the conversation history.
fn simplified_payload(search: &RouteSearch, limit: usize) -> Value {
    let journeys: Vec<Value> = search
        .journeys
        .iter()
        .take(limit)
        .map(|journey| {
            let modes: Vec<String> = journey
                .legs
                .iter()
                .filter_map(|leg| {
                    if leg.is_walking() {
                        Some("walk".to_string())
                    } else {
                        leg.line.as_ref().and_then(|line| line.name.clone())
                    }
                })
                .collect();
            json!({
                "route_info": format_route_info(journey, &search.from_stop, &search.to_stop),
                "departure": journey.departure_time().unwrap_or_default(),
                "arrival": journey.arrival_time().unwrap_or_default(),
                "transport_modes": modes,
            })
        })
        .collect();

    json!({
        "status": "success",
        "total_results": search.journeys.len(),
        "journeys": journeys,
    })
}

fn clock_time(timestamp: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|t| t.format("%H:%M").to_string())
}

fn minutes_between(start: &str, end: &str) -> Option<i64> {
    let start = DateTime::parse_from_rfc3339(start).ok()?;
    let end = DateTime::parse_from_rfc3339(end).ok()?;
    Some((end - start).num_minutes())
}

fn format_duration(minutes: i64) -> String {
    if minutes >= 60 {
        format!("{} h {} min", minutes / 60, minutes % 60)
    } else {
        format!("{minutes} min")
    }
}

/// Human-readable description of one journey.
pub fn format_route_info(journey: &Journey, from: &TransitStop, to: &TransitStop) -> String {
    let mut info = format!(
        "From: {} ({} m away)\nTo: {} ({} m away)\n",
        from.name,
        from.distance.unwrap_or(0.0).round() as i64,
        to.name,
        to.distance.unwrap_or(0.0).round() as i64,
    );

    if let (Some(departure), Some(arrival)) = (journey.departure_time(), journey.arrival_time())
        && let (Some(dep), Some(arr)) = (clock_time(departure), clock_time(arrival))
    {
        info.push_str(&format!("Departure: {dep}\nArrival: {arr}\n"));
        if let Some(minutes) = minutes_between(departure, arrival) {
            info.push_str(&format!("Travel time: {}\n", format_duration(minutes)));
        }
    }

    let rides = journey.legs.iter().filter(|leg| !leg.is_walking()).count();
    info.push_str(&format!("Transfers: {}\n\nSteps:\n", rides.saturating_sub(1)));

    for (index, leg) in journey.legs.iter().enumerate() {
        if leg.is_walking() {
            info.push_str(&format!("{}. Walk {} m", index + 1, leg.distance.unwrap_or(0)));
            if let (Some(dep), Some(arr)) = (&leg.departure, &leg.arrival)
                && let Some(minutes) = minutes_between(dep, arr)
            {
                info.push_str(&format!(" (about {minutes} min)"));
            }
        } else {
            let line = leg.line.as_ref();
            let name = line.and_then(|l| l.name.as_deref()).unwrap_or("unknown line");
            let origin = leg.origin.name.as_deref().unwrap_or("unknown stop");
            let destination = leg.destination.name.as_deref().unwrap_or("unknown stop");
            info.push_str(&format!("{}. {name}", index + 1));
            if let Some(mode) = line.and_then(|l| l.mode.as_deref())
                && !mode.is_empty()
            {
                info.push_str(&format!(" ({mode})"));
            }
            info.push_str(&format!(": {origin} -> {destination}"));
            let dep = leg.departure.as_deref().and_then(clock_time);
            let arr = leg.arrival.as_deref().and_then(clock_time);
            if let (Some(dep), Some(arr)) = (dep, arr) {
                info.push_str(&format!(", {dep}-{arr}"));
            }
        }
        info.push('\n');
    }

    info.trim_end().to_string()
}
