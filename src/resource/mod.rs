//! Resource trait and types for declarative account configuration
//!
//! Every account in the config is modeled as a Resource with:
//! - State detection (observed vs desired)
//! - Apply function (run the planned commands)
//! - Sudo requirements (from config, skipped when already root)

use anyhow::Result;
use std::fmt;

use crate::runner::CommandRunner;

/// Requirement level for sudo privileges
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SudoRequirement {
    /// No sudo needed
    None,
    /// Sudo required with a reason
    Required { reason: String },
}

/// Current or desired state of a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource exists
    Present { details: Option<String> },
    /// Resource does not exist
    Absent,
    /// Resource exists but differs from desired
    Modified { from: String, to: String },
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

/// Context passed to apply operations
pub struct ApplyContext<'a> {
    pub dry_run: bool,
    pub verbose: bool,
    pub runner: &'a dyn CommandRunner,
}

/// Core trait for all resources in roster
pub trait Resource: fmt::Debug {
    /// Unique identifier for this resource (e.g., "user:bob")
    fn id(&self) -> String;

    /// Human-readable description
    fn description(&self) -> String;

    /// Resource type category
    fn resource_type(&self) -> &'static str;

    /// Whether this resource requires sudo
    fn sudo_requirement(&self) -> SudoRequirement {
        SudoRequirement::None
    }

    /// Detect current state of this resource
    fn current_state(&self) -> Result<ResourceState>;

    /// Get the desired state (from config)
    fn desired_state(&self) -> ResourceState;

    /// Check if resource needs changes
    fn needs_apply(&self) -> Result<bool> {
        let current = self.current_state()?;
        let desired = self.desired_state();
        Ok(current != desired)
    }

    /// Apply changes to reach desired state
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

/// A diff between current and desired state
#[derive(Debug, Clone)]
pub struct ResourceDiff {
    pub resource_id: String,
    pub resource_type: String,
    pub description: String,
    pub current: ResourceState,
    pub desired: ResourceState,
    /// Why sudo is needed, when it is
    pub sudo_reason: Option<String>,
}

impl ResourceDiff {
    pub fn from_resource(resource: &dyn Resource) -> Result<Option<Self>> {
        if !resource.needs_apply()? {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current: resource.current_state()?,
            desired: resource.desired_state(),
            sudo_reason: match resource.sudo_requirement() {
                SudoRequirement::Required { reason } => Some(reason),
                SudoRequirement::None => None,
            },
        }))
    }

    pub fn requires_sudo(&self) -> bool {
        self.sudo_reason.is_some()
    }
}

pub mod user;

pub use user::UserResource;
