//! Toast Talk Traits - Shared tool abstractions and collaborator interfaces.
//!
//! This crate provides the interfaces used across the Toast Talk workspace:
//! - Tool trait, ToolOutput, ToolSchema, ToolCallRecord, FnTool
//! - ToolRegistry (name-keyed, read-mostly after startup)
//! - ToolError and CollaboratorError
//! - LocationResolver and TransitRouteResolver collaborator traits
//! - Transit data model shared by the route tool and its resolvers

pub mod error;
pub mod location;
pub mod registry;
pub mod tool;
pub mod transit;

// ── Top-level re-exports ─────────────────────────────────────────────

// Error types
pub use error::{CollaboratorError, Result as ToolResult, ToolError};

// Tool trait and core types
pub use tool::{FnTool, Tool, ToolCallRecord, ToolExecutor, ToolOutput, ToolSchema};

// Registry
pub use registry::ToolRegistry;

// Collaborators
pub use location::{
    CURRENT_LOCATION_SENTINEL, Coordinate, FixedLocation, LocationResolver, UnavailableLocation,
};
pub use transit::{
    Journey, Leg, Line, RouteSearch, Stop, StopLocation, Stopover, TransitRouteResolver,
    TransitStop,
};
