//! Relay Engine Library
//!
//! Core orchestration engine for routing generation requests across a
//! heterogeneous pool of AI backends. The engine is invoked as a library by
//! a host application: the host registers backends and collaborators, builds
//! one [`orchestrator::Orchestrator`] at startup, and drives everything
//! through it.

/// Configuration management module
pub mod config;

/// Model catalog: descriptors, priorities, load state
pub mod registry;

/// Task classification and candidate ranking
pub mod analyzer;

/// Execution strategies and output combination
pub mod executor;

/// Bounded-concurrency dispatch to remote providers
pub mod remote;

/// Interaction history and context-aware prompt assembly
pub mod memory;

/// Metrics, health derivation, and recovery
pub mod diagnostics;

/// Event bus for presentation-layer observation
pub mod events;

/// Top-level request pipeline
pub mod orchestrator;

/// Telemetry and Observability
pub mod telemetry;
