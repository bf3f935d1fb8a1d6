//! Transit routing collaborator and its data model.
//!
//! Field names follow the transport.rest JSON shape so resolvers backed by
//! that API can deserialize responses directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::location::Coordinate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A stop found near a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitStop {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<StopLocation>,
    /// Walking distance from the query point in metres.
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<StopLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stopover {
    #[serde(default)]
    pub stop: Option<Stop>,
    #[serde(default)]
    pub arrival: Option<String>,
    #[serde(default)]
    pub departure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    #[serde(default)]
    pub origin: Stop,
    #[serde(default)]
    pub destination: Stop,
    #[serde(default)]
    pub departure: Option<String>,
    #[serde(default)]
    pub arrival: Option<String>,
    #[serde(default)]
    pub line: Option<Line>,
    #[serde(default)]
    pub walking: Option<bool>,
    #[serde(default)]
    pub distance: Option<i64>,
    #[serde(default)]
    pub stopovers: Option<Vec<Stopover>>,
}

impl Leg {
    pub fn is_walking(&self) -> bool {
        self.walking.unwrap_or(false)
    }
}

/// One route candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub departure: Option<String>,
    #[serde(default)]
    pub arrival: Option<String>,
}

impl Journey {
    /// Departure of the first leg, falling back to the journey-level value.
    pub fn departure_time(&self) -> Option<&str> {
        self.legs
            .first()
            .and_then(|leg| leg.departure.as_deref())
            .or(self.departure.as_deref())
    }

    /// Arrival of the last leg, falling back to the journey-level value.
    pub fn arrival_time(&self) -> Option<&str> {
        self.legs
            .last()
            .and_then(|leg| leg.arrival.as_deref())
            .or(self.arrival.as_deref())
    }
}

/// Ordered route candidates between the stops nearest to each endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSearch {
    pub from_stop: TransitStop,
    pub to_stop: TransitStop,
    pub journeys: Vec<Journey>,
}

#[async_trait]
pub trait TransitRouteResolver: Send + Sync {
    /// Search up to `results` routes between two coordinates.
    async fn search(
        &self,
        from: Coordinate,
        to: Coordinate,
        results: usize,
    ) -> Result<RouteSearch, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(departure: Option<&str>, arrival: Option<&str>) -> Leg {
        Leg {
            origin: Stop::default(),
            destination: Stop::default(),
            departure: departure.map(str::to_string),
            arrival: arrival.map(str::to_string),
            line: None,
            walking: None,
            distance: None,
            stopovers: None,
        }
    }

    #[test]
    fn test_times_prefer_leg_values() {
        let journey = Journey {
            legs: vec![leg(Some("08:00"), None), leg(None, Some("08:40"))],
            departure: Some("07:59".into()),
            arrival: Some("08:41".into()),
        };
        assert_eq!(journey.departure_time(), Some("08:00"));
        assert_eq!(journey.arrival_time(), Some("08:40"));
    }

    #[test]
    fn test_times_fall_back_to_journey() {
        let journey = Journey {
            legs: vec![leg(None, None)],
            departure: Some("07:59".into()),
            arrival: None,
        };
        assert_eq!(journey.departure_time(), Some("07:59"));
        assert_eq!(journey.arrival_time(), None);
    }

    #[test]
    fn test_deserialize_transport_rest_leg() {
        let leg: Leg = serde_json::from_value(serde_json::json!({
            "origin": {"name": "Hauptbahnhof", "location": {"latitude": 48.14, "longitude": 11.56}},
            "destination": {"name": "Marienplatz"},
            "departure": "2025-09-02T08:00:00+02:00",
            "line": {"name": "U4", "mode": "train", "product": "subway"},
            "stopovers": [{"stop": {"name": "Karlsplatz"}, "arrival": null}]
        }))
        .unwrap();

        assert_eq!(leg.origin.name.as_deref(), Some("Hauptbahnhof"));
        assert_eq!(leg.line.unwrap().name.as_deref(), Some("U4"));
        assert!(!leg.walking.unwrap_or(false));
        assert_eq!(leg.stopovers.unwrap().len(), 1);
    }
}
