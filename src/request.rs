use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::GenerationError;
use crate::style::AvatarStyle;

pub const MIN_IMAGES: u8 = 1;
pub const MAX_IMAGES: u8 = 4;

pub const EMPTY_PROMPT_MESSAGE: &str = "Please describe the avatar you want.";

/// Number of avatars per generation, always within `MIN_IMAGES..=MAX_IMAGES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCount(u8);

impl ImageCount {
    pub fn new(n: u8) -> Option<Self> {
        (MIN_IMAGES..=MAX_IMAGES).contains(&n).then_some(Self(n))
    }

    pub fn clamped(n: u8) -> Self {
        Self(n.clamp(MIN_IMAGES, MAX_IMAGES))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn increment(self) -> Self {
        Self::clamped(self.0.saturating_add(1))
    }

    pub fn decrement(self) -> Self {
        Self::clamped(self.0.saturating_sub(1))
    }
}

impl Default for ImageCount {
    fn default() -> Self {
        Self(MAX_IMAGES)
    }
}

/// One user-initiated generation. Built fresh per submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    style: AvatarStyle,
    count: ImageCount,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        style: AvatarStyle,
        count: ImageCount,
    ) -> Result<Self, GenerationError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(GenerationError::Validation(EMPTY_PROMPT_MESSAGE.to_string()));
        }

        Ok(Self {
            prompt,
            style,
            count,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn style(&self) -> AvatarStyle {
        self.style
    }

    pub fn count(&self) -> ImageCount {
        self.count
    }
}

/// A generated avatar held by the current result set.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub id: String,
    pub data_uri: String,
    pub created_at: DateTime<Utc>,
}

impl GeneratedImage {
    /// Wrap a returned data URI with a fresh id and the current time.
    pub fn tag(data_uri: String) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            data_uri,
            created_at: Utc::now(),
        }
    }

    pub fn short_id(&self) -> &str {
        let end = self.id.char_indices().nth(8).map(|(i, _)| i).unwrap_or(self.id.len());
        &self.id[..end]
    }

    pub fn mime_type(&self) -> &str {
        self.data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .filter(|mime| !mime.is_empty())
            .unwrap_or("image/png")
    }

    /// Decoded payload size, computed from the base64 length.
    pub fn byte_len(&self) -> usize {
        let payload = match self.data_uri.split_once(',') {
            Some((_, payload)) => payload.trim_end(),
            None => return 0,
        };
        let padding = payload.bytes().rev().take_while(|&b| b == b'=').count();
        (payload.len() / 4 * 3).saturating_sub(padding) + match payload.len() % 4 {
            2 => 1,
            3 => 2,
            _ => 0,
        }
    }

    pub fn file_name(&self) -> String {
        format!("avatar-{}.{}", self.id, extension_for_mime(self.mime_type()))
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}
