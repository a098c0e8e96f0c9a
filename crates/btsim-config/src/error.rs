use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    /// A layer file could not be read.
    Read { path: String, detail: String },
    /// A layer's content was not valid YAML.
    Parse { path: String, detail: String },
    /// The merged config could not be interpreted as a [`crate::BtsimConfig`].
    Shape(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, detail } => write!(f, "read config '{path}': {detail}"),
            ConfigError::Parse { path, detail } => write!(f, "parse config '{path}': {detail}"),
            ConfigError::Shape(detail) => write!(f, "config shape error: {detail}"),
        }
    }
}

impl std::error::Error for ConfigError {}
