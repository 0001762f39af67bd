//! Session state for one run of the app.
//!
//! The status is a single tagged value so "loading", "showing results" and
//! "showing an error" can never be true at the same time. Every submission
//! gets a fresh [`RequestToken`]; completions carrying an older token are
//! dropped so a slow response can never overwrite a newer one.

use rand::Rng;

use crate::error::GenerationError;
use crate::request::{GeneratedImage, GenerationRequest, ImageCount};
use crate::style::AvatarStyle;

pub const BUSY_MESSAGE: &str = "A generation is already running.";

pub const EXAMPLE_PROMPTS: [&str; 6] = [
    "A cyberpunk hacker girl wearing neon goggles, short purple hair, city skyline behind her",
    "A cute orange cat in a space suit floating in orbit, Earth in the background",
    "A Victorian-era detective holding a pipe, watercolor style",
    "A pixel-art hero raising a glowing holy sword, 8-bit",
    "A futuristic robot barista pouring latte art, metallic finish",
    "An elf prince in the forest with long silver hair and pointed ears, surrounded by fireflies",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Loading {
        token: RequestToken,
        count: ImageCount,
    },
    Success(Vec<GeneratedImage>),
    Failed(String),
}

/// A submission that passed validation and is waiting to be run.
#[derive(Debug, Clone)]
pub struct PendingGeneration {
    pub token: RequestToken,
    pub request: GenerationRequest,
}

#[derive(Debug, Default)]
pub struct Session {
    prompt: String,
    style: AvatarStyle,
    count: ImageCount,
    status: SessionStatus,
    validation: Option<String>,
    last_token: u64,
}

impl Session {
    pub fn new(style: AvatarStyle, count: ImageCount) -> Self {
        Self {
            style,
            count,
            ..Default::default()
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Edit the prompt in place. Any pending validation message is dropped.
    pub fn edit_prompt<F: FnOnce(&mut String)>(&mut self, edit: F) {
        edit(&mut self.prompt);
        self.validation = None;
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.edit_prompt(|p| *p = prompt.into());
    }

    pub fn style(&self) -> AvatarStyle {
        self.style
    }

    pub fn set_style(&mut self, style: AvatarStyle) {
        self.style = style;
    }

    pub fn count(&self) -> ImageCount {
        self.count
    }

    pub fn set_count(&mut self, count: ImageCount) {
        self.count = count;
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn validation(&self) -> Option<&str> {
        self.validation.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, SessionStatus::Loading { .. })
    }

    pub fn images(&self) -> &[GeneratedImage] {
        match &self.status {
            SessionStatus::Success(images) => images,
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            SessionStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Whether the generate action is enabled.
    pub fn can_generate(&self) -> bool {
        !self.is_loading() && !self.prompt.trim().is_empty()
    }

    /// Validate the current inputs and move into `Loading`.
    ///
    /// A blank prompt leaves the status untouched and records an inline
    /// validation message instead.
    pub fn submit(&mut self) -> Result<PendingGeneration, GenerationError> {
        if self.is_loading() {
            return Err(GenerationError::Validation(BUSY_MESSAGE.to_string()));
        }

        let request = match GenerationRequest::new(self.prompt.clone(), self.style, self.count) {
            Ok(request) => request,
            Err(err) => {
                self.validation = Some(err.user_message());
                return Err(err);
            }
        };

        self.validation = None;
        self.last_token += 1;
        let token = RequestToken(self.last_token);
        self.status = SessionStatus::Loading {
            token,
            count: request.count(),
        };

        Ok(PendingGeneration { token, request })
    }

    /// Apply the outcome of a generation. Returns `false` when the token is
    /// not the one currently loading and the outcome was discarded.
    pub fn complete(&mut self, token: RequestToken, result: Result<Vec<String>, GenerationError>) -> bool {
        match self.status {
            SessionStatus::Loading { token: current, .. } if current == token => {}
            _ => return false,
        }

        self.status = match result {
            Ok(uris) => SessionStatus::Success(uris.into_iter().map(GeneratedImage::tag).collect()),
            Err(err) => SessionStatus::Failed(err.user_message()),
        };
        true
    }

    /// Empty the gallery. Prompt, style and count stay as they are.
    pub fn clear_results(&mut self) {
        if matches!(self.status, SessionStatus::Success(_)) {
            self.status = SessionStatus::Idle;
        }
    }

    pub fn pick_random_prompt(&mut self) {
        self.pick_random_prompt_with(&mut rand::thread_rng());
    }

    pub fn pick_random_prompt_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let idx = rng.gen_range(0..EXAMPLE_PROMPTS.len());
        self.set_prompt(EXAMPLE_PROMPTS[idx]);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::error::GENERIC_FAILURE;
    use crate::request::EMPTY_PROMPT_MESSAGE;

    fn ready_session(prompt: &str) -> Session {
        let mut session = Session::new(AvatarStyle::Cyberpunk, ImageCount::clamped(2));
        session.set_prompt(prompt);
        session
    }

    fn uris(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("data:image/png;base64,QUJD{}", i)).collect()
    }

    #[test]
    fn test_defaults() {
        let session = Session::default();
        assert_eq!(session.prompt(), "");
        assert_eq!(session.style(), AvatarStyle::Anime);
        assert_eq!(session.count().get(), 4);
        assert_eq!(session.status(), &SessionStatus::Idle);
        assert!(!session.can_generate());
    }

    #[test]
    fn test_blank_prompt_sets_validation_and_keeps_status() {
        let mut session = ready_session("   ");
        let err = session.submit().unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));
        assert_eq!(session.validation(), Some(EMPTY_PROMPT_MESSAGE));
        assert_eq!(session.status(), &SessionStatus::Idle);

        session.edit_prompt(|p| p.push('x'));
        assert_eq!(session.validation(), None);
    }

    #[test]
    fn test_submit_enters_loading_and_drops_old_results() {
        let mut session = ready_session("a cyberpunk cat");
        let first = session.submit().unwrap();
        assert!(session.complete(first.token, Ok(uris(2))));
        assert_eq!(session.images().len(), 2);

        let second = session.submit().unwrap();
        assert!(session.is_loading());
        assert!(session.images().is_empty());
        assert!(second.token > first.token);
        assert_eq!(second.request.prompt(), "a cyberpunk cat");
        assert_eq!(second.request.style(), AvatarStyle::Cyberpunk);
    }

    #[test]
    fn test_submit_while_loading_is_refused() {
        let mut session = ready_session("a fox");
        let pending = session.submit().unwrap();
        let err = session.submit().unwrap_err();
        assert_eq!(err, GenerationError::Validation(BUSY_MESSAGE.to_string()));
        assert_eq!(
            session.status(),
            &SessionStatus::Loading { token: pending.token, count: ImageCount::clamped(2) }
        );
    }

    #[test]
    fn test_success_tags_each_image() {
        let mut session = ready_session("a fox");
        let pending = session.submit().unwrap();
        assert!(session.complete(pending.token, Ok(uris(2))));
        assert!(!session.is_loading());
        let images = session.images();
        assert_eq!(images.len(), 2);
        assert_ne!(images[0].id, images[1].id);
        assert_eq!(images[0].data_uri, "data:image/png;base64,QUJD0");
    }

    #[test]
    fn test_failure_keeps_gallery_empty() {
        let mut session = ready_session("a fox");
        let pending = session.submit().unwrap();
        let err = GenerationError::Transport(String::new());
        assert!(session.complete(pending.token, Err(err)));
        assert_eq!(session.error(), Some(GENERIC_FAILURE));
        assert!(session.images().is_empty());
        assert!(!session.is_loading());
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut session = ready_session("a fox");
        let stale = session.submit().unwrap();
        // Force a second submission as if the first had been abandoned.
        session.status = SessionStatus::Idle;
        let fresh = session.submit().unwrap();

        assert!(!session.complete(stale.token, Ok(uris(2))));
        assert!(session.is_loading());

        assert!(session.complete(fresh.token, Ok(uris(2))));
        assert!(!session.complete(fresh.token, Ok(uris(1))));
        assert_eq!(session.images().len(), 2);
    }

    #[test]
    fn test_clear_results_keeps_inputs() {
        let mut session = ready_session("a fox");
        session.set_style(AvatarStyle::Clay);
        session.set_count(ImageCount::clamped(3));
        let pending = session.submit().unwrap();
        session.complete(pending.token, Ok(uris(3)));

        session.clear_results();
        assert!(session.images().is_empty());
        assert_eq!(session.status(), &SessionStatus::Idle);
        assert_eq!(session.prompt(), "a fox");
        assert_eq!(session.style(), AvatarStyle::Clay);
        assert_eq!(session.count().get(), 3);
    }

    #[test]
    fn test_clear_does_not_interrupt_loading() {
        let mut session = ready_session("a fox");
        session.submit().unwrap();
        session.clear_results();
        assert!(session.is_loading());
    }

    #[test]
    fn test_random_prompt_comes_from_examples() {
        let mut session = Session::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            session.pick_random_prompt_with(&mut rng);
            assert!(EXAMPLE_PROMPTS.contains(&session.prompt()));
        }
        assert!(session.can_generate());
    }
}
