use serde::Serialize;
use std::fmt;

/// Where the broadcast pipeline is.
///
/// States only move forward (`Idle -> Curating -> Transcoding -> Publishing`)
/// and any of them may drop to `Failed`, which is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Curating,
    Transcoding,
    Publishing,
    Failed,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Curating => "curating",
            Self::Transcoding => "transcoding",
            Self::Publishing => "publishing",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Failed
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, Curating) | (Curating, Transcoding) | (Transcoding, Publishing) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState::*;

    #[test]
    fn test_forward_path() {
        assert!(Idle.can_transition_to(Curating));
        assert!(Curating.can_transition_to(Transcoding));
        assert!(Transcoding.can_transition_to(Publishing));
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!Idle.can_transition_to(Transcoding));
        assert!(!Curating.can_transition_to(Publishing));
        assert!(!Publishing.can_transition_to(Curating));
        assert!(!Transcoding.can_transition_to(Transcoding));
    }

    #[test]
    fn test_failed_reachable_and_terminal() {
        for state in [Idle, Curating, Transcoding, Publishing] {
            assert!(state.can_transition_to(Failed));
        }
        for state in [Idle, Curating, Transcoding, Publishing, Failed] {
            assert!(!Failed.can_transition_to(state));
        }
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Publishing).unwrap(), "publishing");
    }
}
