//! Supervisor errors

/// Failures raised while preparing or running one client iteration
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("client run panicked: {0}")]
    Panicked(String),

    #[error("supervisor task failed: {0}")]
    Task(String),
}
