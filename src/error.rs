#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Startup-time failure: the detection feature cannot run at all.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single frame failed to decode or infer; the pipeline keeps going.
    #[error("frame {sequence} could not be processed: {reason}")]
    TransientFrame { sequence: u64, reason: String },

    #[error("no processed frame is available to capture")]
    NothingToCapture,

    #[error("failed to encode snapshot image")]
    Encoding(#[source] anyhow::Error),

    #[error("failed to persist snapshot")]
    Persistence(#[source] anyhow::Error),
}

impl PipelineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration(_) | PipelineError::Persistence(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_and_persistence_are_fatal() {
        assert!(PipelineError::configuration("no model").is_fatal());
        assert!(PipelineError::Persistence(anyhow::anyhow!("disk full")).is_fatal());
        assert!(!PipelineError::NothingToCapture.is_fatal());
        assert!(!PipelineError::TransientFrame {
            sequence: 4,
            reason: "bad buffer".into()
        }
        .is_fatal());
    }

    #[test]
    fn transient_error_names_the_frame() {
        let err = PipelineError::TransientFrame {
            sequence: 17,
            reason: "truncated".into(),
        };
        assert_eq!(err.to_string(), "frame 17 could not be processed: truncated");
    }
}
