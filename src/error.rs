use thiserror::Error;

/// Errors reported by network construction, attachment and configuration.
///
/// The simulation loop itself has no failure modes: unknown names evaluate to
/// zero and underflow clamps at zero.
#[derive(Debug, Error)]
pub enum ReactionError {
    #[error("no reaction has been added yet; conditions need a preceding reaction")]
    NoReaction,
    #[error("reaction index {0} is out of range")]
    UnknownReaction(usize),
    #[error("object of kind '{kind}' does not carry molecule counts and cannot run reactions")]
    MissingCapability { kind: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to parse configuration: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, ReactionError>;
