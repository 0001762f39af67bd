use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::request::GenerationRequest;
use crate::style::AvatarStyle;

pub const ASPECT_RATIO: &str = "1:1";

/// One "text prompt in, image out" call against an image model.
#[async_trait]
pub trait ImageApi: Send + Sync {
    /// Returns the produced image as a `data:` URI.
    async fn generate_image(&self, prompt: &str, aspect_ratio: &str) -> Result<String, GenerationError>;
}

/// Wrap the user's subject in the fixed avatar composition rules.
pub fn build_prompt(subject: &str, style: AvatarStyle) -> String {
    format!(
        "Generate a professional, high-quality avatar image ({ASPECT_RATIO} aspect ratio).\n\
         \n\
         CORE SUBJECT: {subject}\n\
         ART STYLE: {style}\n\
         \n\
         COMPOSITION RULES:\n\
         - Subject's face/head must be centered and clearly visible.\n\
         - Good spacing around the subject (not too zoomed in).\n\
         - Clean, aesthetic background that complements the subject.\n\
         - Professional lighting and shading.\n\
         - High resolution details.\n\
         - NO text, NO watermarks, NO multiple faces (unless specified).\n",
        subject = subject,
        style = style.label(),
    )
}

/// Fans a request out into one concurrent API call per requested image.
#[derive(Clone)]
pub struct Generator {
    api: Arc<dyn ImageApi>,
}

impl Generator {
    pub fn new(api: Arc<dyn ImageApi>) -> Self {
        Self { api }
    }

    /// All-or-nothing: the first failing call fails the whole batch.
    pub async fn generate_avatars(&self, request: &GenerationRequest) -> Result<Vec<String>, GenerationError> {
        let count = request.count().get() as usize;
        info!(count, style = request.style().as_str(), "requesting avatars");

        let calls = (0..count).map(|index| {
            let api = Arc::clone(&self.api);
            let prompt = build_prompt(request.prompt(), request.style());
            async move {
                let result = api.generate_image(&prompt, ASPECT_RATIO).await;
                match &result {
                    Ok(_) => debug!(index, "avatar received"),
                    Err(e) => warn!(index, error = %e, "avatar call failed"),
                }
                result
            }
        });

        let images = try_join_all(calls).await?;
        info!(count = images.len(), "avatars generated");
        Ok(images)
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Barrier;

    use super::fakes::FakeImageApi;
    use super::*;
    use crate::request::ImageCount;

    fn request(prompt: &str, style: AvatarStyle, count: u8) -> GenerationRequest {
        GenerationRequest::new(prompt, style, ImageCount::clamped(count)).unwrap()
    }

    #[tokio::test]
    async fn test_subject_reaches_the_api_untrimmed() {
        let api = Arc::new(FakeImageApi::default());
        let generator = Generator::new(api.clone());
        generator
            .generate_avatars(&request(" a fox\n", AvatarStyle::Anime, 1))
            .await
            .unwrap();
        assert!(api.prompts.lock().unwrap()[0].contains("CORE SUBJECT:  a fox\n"));
    }

    #[test]
    fn test_prompt_embeds_subject_style_and_rules() {
        let prompt = build_prompt("a cyberpunk cat", AvatarStyle::Cyberpunk);
        assert!(prompt.contains("CORE SUBJECT: a cyberpunk cat"));
        assert!(prompt.contains("ART STYLE: Cyberpunk"));
        assert!(prompt.contains("1:1 aspect ratio"));
        assert!(prompt.contains("centered"));
        assert!(prompt.contains("NO text, NO watermarks"));
    }

    #[tokio::test]
    async fn test_yields_exactly_count_images() {
        for n in 1..=4u8 {
            let api = Arc::new(FakeImageApi::default());
            let generator = Generator::new(api.clone());
            let images = generator
                .generate_avatars(&request("a knight", AvatarStyle::PixelArt, n))
                .await
                .unwrap();
            assert_eq!(images.len(), n as usize);
            assert_eq!(api.call_count(), n as usize);
        }
    }

    #[tokio::test]
    async fn test_every_call_gets_the_enriched_prompt() {
        let api = Arc::new(FakeImageApi::default());
        let generator = Generator::new(api.clone());
        generator
            .generate_avatars(&request("a cyberpunk cat", AvatarStyle::Cyberpunk, 2))
            .await
            .unwrap();

        let prompts = api.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        for prompt in prompts.iter() {
            assert!(prompt.contains("a cyberpunk cat"));
            assert!(prompt.contains("Cyberpunk"));
        }
    }

    #[tokio::test]
    async fn test_one_failure_fails_the_batch() {
        let api = Arc::new(FakeImageApi::failing_on(
            2,
            GenerationError::Transport("quota exceeded".to_string()),
        ));
        let generator = Generator::new(api);
        let err = generator
            .generate_avatars(&request("a fox", AvatarStyle::Watercolor, 4))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Transport("quota exceeded".to_string()));
    }

    struct RendezvousApi {
        barrier: Barrier,
    }

    #[async_trait]
    impl ImageApi for RendezvousApi {
        async fn generate_image(&self, _prompt: &str, _aspect_ratio: &str) -> Result<String, GenerationError> {
            // Only returns once every call is in flight at the same time.
            tokio::time::timeout(Duration::from_secs(2), self.barrier.wait())
                .await
                .map_err(|_| GenerationError::Transport("calls were not concurrent".to_string()))?;
            Ok("data:image/png;base64,AAAA".to_string())
        }
    }

    #[tokio::test]
    async fn test_calls_are_issued_concurrently() {
        let api = Arc::new(RendezvousApi { barrier: Barrier::new(3) });
        let generator = Generator::new(api);
        let images = generator
            .generate_avatars(&request("twins", AvatarStyle::Clay, 3))
            .await
            .unwrap();
        assert_eq!(images.len(), 3);
    }
}
