use thiserror::Error;

/// Structural problems with an assistant definition, raised before any work starts.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidAssistantError {
    #[error("assistant id is required")]
    MissingId,
    #[error("assistant id `{0}` must be a machine name (lowercase letters, digits, underscores)")]
    InvalidId(String),
    #[error("assistant `{0}` has no label")]
    MissingLabel(String),
    #[error("assistant `{0}` has an empty error message template")]
    MissingErrorMessage(String),
    #[error("assistant `{0}` enables an action plugin with an empty id")]
    EmptyActionPlugin(String),
    #[error("assistant `{0}` references an empty agent")]
    EmptyAgentRef(String),
}

impl InvalidAssistantError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingId | Self::InvalidId(_) => {
                "The assistant is not configured correctly. Check its machine name."
            }
            Self::MissingLabel(_) | Self::MissingErrorMessage(_) => {
                "The assistant is missing required settings."
            }
            Self::EmptyActionPlugin(_) | Self::EmptyAgentRef(_) => {
                "The assistant references an action or agent that does not exist."
            }
        }
    }
}
