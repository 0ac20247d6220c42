/// Convenience result type used across the crate.
pub type ClipforgeResult<T> = Result<T, ClipforgeError>;

/// Top-level error taxonomy used by planning, execution and export APIs.
#[derive(thiserror::Error, Debug)]
pub enum ClipforgeError {
    /// Invalid caller-provided data (clips, PiP configuration, settings).
    #[error("validation error: {0}")]
    Validation(String),

    /// A source could not be resolved or written into the engine filesystem.
    #[error("staging error: {0}")]
    Staging(String),

    /// A plan step was rejected by the media engine.
    #[error("step {index}/{total} ({description}) failed: {message}")]
    Step {
        /// 1-based index of the failing step.
        index: usize,
        /// Number of steps in the plan.
        total: usize,
        /// Human-readable step description.
        description: String,
        /// Engine error text, verbatim.
        message: String,
    },

    /// A state machine was asked for a transition its table does not allow.
    #[error("invalid transition from {from} on {event}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Rejected event or target state.
        event: String,
    },

    /// Engine initialization or engine filesystem I/O failed.
    #[error("engine error: {0}")]
    Engine(String),

    /// The operation observed a cancellation request.
    #[error("operation cancelled")]
    Cancelled,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClipforgeError {
    /// Build a [`ClipforgeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ClipforgeError::Staging`] value.
    pub fn staging(msg: impl Into<String>) -> Self {
        Self::Staging(msg.into())
    }

    /// Build a [`ClipforgeError::Engine`] value.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Build a [`ClipforgeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`ClipforgeError::InvalidTransition`] value.
    pub fn invalid_transition(from: impl std::fmt::Debug, event: impl std::fmt::Debug) -> Self {
        Self::InvalidTransition {
            from: format!("{from:?}"),
            event: format!("{event:?}"),
        }
    }

    /// `true` when this error only signals cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
