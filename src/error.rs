use thiserror::Error;

/// Shown when a failure carries no message of its own.
pub const GENERIC_FAILURE: &str =
    "Generation failed, please try again later. This may be caused by API rate limits.";

pub const NO_IMAGE_MESSAGE: &str =
    "The model did not return an image. Please try again or adjust the description.";

/// Everything that can end a generation attempt.
///
/// Values travel from background tasks back to the UI, so the variants only
/// hold owned strings and the type is `Clone`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),

    #[error("No image data found in response")]
    NoImage,

    #[error("Gemini API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Could not decode image: {0}")]
    Decode(String),
}

impl GenerationError {
    /// Text for the error box in the UI.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Validation(msg) => msg.clone(),
            GenerationError::NoImage => NO_IMAGE_MESSAGE.to_string(),
            GenerationError::Api { message, .. } if message.trim().is_empty() => {
                GENERIC_FAILURE.to_string()
            }
            GenerationError::Transport(msg) if msg.trim().is_empty() => {
                GENERIC_FAILURE.to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Transport(err.to_string())
    }
}

impl From<image::ImageError> for GenerationError {
    fn from(err: image::ImageError) -> Self {
        GenerationError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_transport_message_falls_back_to_generic() {
        let err = GenerationError::Transport(String::new());
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_transport_message_is_kept() {
        let err = GenerationError::Transport("connection refused".to_string());
        assert_eq!(err.user_message(), "connection refused");
    }

    #[test]
    fn test_api_error_without_body_is_generic() {
        let err = GenerationError::Api { status: 429, message: "  ".to_string() };
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_api_error_with_message() {
        let err = GenerationError::Api {
            status: 400,
            message: "API key not valid".to_string(),
        };
        assert_eq!(err.user_message(), "Gemini API error 400: API key not valid");
    }

    #[test]
    fn test_no_image_uses_friendly_message() {
        assert_eq!(GenerationError::NoImage.user_message(), NO_IMAGE_MESSAGE);
    }
}
