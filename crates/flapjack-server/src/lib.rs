//! Process wiring for the notification pipeline: configuration, seed
//! bootstrap, the administrative surface, and the pipeline loop.

pub mod admin;
pub mod config;
pub mod pipeline;
pub mod seed;

/// Fatal startup failures, mapped to process exit codes.
#[derive(Debug)]
pub enum RunError {
    /// Bad configuration (unparseable file, unknown medium, invalid
    /// gateway settings).
    Config(anyhow::Error),
    /// The store could not be brought up (seed file unreadable or invalid).
    Store(anyhow::Error),
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Config(_) => 1,
            RunError::Store(_) => 2,
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Config(e) => write!(f, "configuration error: {e:#}"),
            RunError::Store(e) => write!(f, "store unavailable: {e:#}"),
        }
    }
}

pub const EXIT_USAGE: u8 = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_the_contract() {
        assert_eq!(RunError::Config(anyhow::anyhow!("x")).exit_code(), 1);
        assert_eq!(RunError::Store(anyhow::anyhow!("x")).exit_code(), 2);
        assert_eq!(EXIT_USAGE, 64);
    }
}
