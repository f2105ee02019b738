//! Data models for the Sidequest engine
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates, detected user location and provider candidates
//! - Conditions: situational context and provider activation gates
//! - Quest: request options, content blocks and composed quests

pub mod conditions;
pub mod location;
pub mod quest;

// Re-export all public types for convenient access
pub use conditions::{ConditionsGate, ProviderConditions, QuestMode, Season, TimeOfDay, WeatherKind};
pub use location::{Coordinates, DetectedLocation, LocationCandidate};
pub use quest::{
    BlockTimeOfDay, ComposedQuest, ContentBlock, Difficulty, RequestContext, Theme, Timeframe,
    TransportRequirement, Transportation,
};
