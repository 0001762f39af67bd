use std::collections::HashMap;
use std::path::PathBuf;

use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::download;
use crate::error::GenerationError;
use crate::generator::Generator;
use crate::preview::Preview;
use crate::session::{PendingGeneration, RequestToken, Session};
use crate::style::AvatarStyle;
use crate::tui::AppEvent;

/// Columns in the style selector grid.
pub const STYLE_COLUMNS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Prompt,
    Styles,
    Count,
    Gallery,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Prompt => FocusPane::Styles,
            FocusPane::Styles => FocusPane::Count,
            FocusPane::Count => FocusPane::Gallery,
            FocusPane::Gallery => FocusPane::Prompt,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FocusPane::Prompt => FocusPane::Gallery,
            FocusPane::Styles => FocusPane::Prompt,
            FocusPane::Count => FocusPane::Styles,
            FocusPane::Gallery => FocusPane::Count,
        }
    }
}

/// Columns used by the results grid.
pub fn grid_columns(count: usize) -> usize {
    if count <= 1 {
        1
    } else {
        2
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub session: Session,

    // Prompt editor
    pub prompt_cursor: usize, // char index into the prompt

    // Style selector cursor (selection happens on Enter/Space)
    pub style_cursor: usize,

    // Gallery
    pub gallery_selected: usize,
    pub previews: HashMap<String, Option<Preview>>, // by image id, None when undecodable
    pub output_dir: PathBuf,
    pub status_message: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Areas for mouse hit-testing (updated during render)
    pub style_cells: Vec<(Rect, AvatarStyle)>,
    pub gallery_area: Option<Rect>,

    pub model: String,
    generator: Generator,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, generator: Generator, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        let style = config.default_style();
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Prompt,
            session: Session::new(style, config.default_count()),
            prompt_cursor: 0,
            style_cursor: style.index(),
            gallery_selected: 0,
            previews: HashMap::new(),
            output_dir: config.output_dir(),
            status_message: None,
            animation_frame: 0,
            style_cells: Vec::new(),
            gallery_area: None,
            model: config.model().to_string(),
            generator,
            events,
        }
    }

    /// Validate, then run the generation in the background. The result
    /// comes back as `AppEvent::GenerationFinished`.
    pub fn start_generation(&mut self) {
        let PendingGeneration { token, request } = match self.session.submit() {
            Ok(pending) => pending,
            Err(err) => {
                debug!(error = %err, "generation not started");
                if self.session.validation().is_none() {
                    self.status_message = Some(err.user_message());
                }
                return;
            }
        };

        info!(?token, count = request.count().get(), style = request.style().as_str(), "generation started");
        self.gallery_selected = 0;
        self.status_message = None;
        self.input_mode = InputMode::Normal;

        let generator = self.generator.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = generator.generate_avatars(&request).await;
            if tx.send(AppEvent::GenerationFinished { token, result }).is_err() {
                debug!(?token, "event loop gone, dropping generation result");
            }
        });
    }

    pub fn on_generation_finished(&mut self, token: RequestToken, result: Result<Vec<String>, GenerationError>) {
        let failed = result.as_ref().err().cloned();
        if !self.session.complete(token, result) {
            warn!(?token, "discarding stale generation result");
            return;
        }

        match failed {
            Some(err) => warn!(?token, error = %err, "generation failed"),
            None => info!(?token, images = self.session.images().len(), "generation finished"),
        }
        self.gallery_selected = 0;
    }

    pub fn pick_random_prompt(&mut self) {
        self.session.pick_random_prompt();
        self.prompt_cursor = self.session.prompt().chars().count();
    }

    pub fn clear_results(&mut self) {
        self.session.clear_results();
        self.gallery_selected = 0;
        self.status_message = None;
    }

    pub fn select_style(&mut self, style: AvatarStyle) {
        self.session.set_style(style);
        self.style_cursor = style.index();
    }

    pub fn select_style_at_cursor(&mut self) {
        if let Some(style) = AvatarStyle::from_index(self.style_cursor) {
            self.select_style(style);
        }
    }

    pub fn style_cursor_move(&mut self, dx: isize, dy: isize) {
        let total = AvatarStyle::all().len() as isize;
        let cols = STYLE_COLUMNS as isize;
        let current = self.style_cursor as isize;
        let col = (current % cols + dx).clamp(0, cols - 1);
        let row = current / cols + dy;
        let target = row * cols + col;
        if (0..total).contains(&target) {
            self.style_cursor = target as usize;
        }
    }

    pub fn count_up(&mut self) {
        let count = self.session.count().increment();
        self.session.set_count(count);
    }

    pub fn count_down(&mut self) {
        let count = self.session.count().decrement();
        self.session.set_count(count);
    }

    pub fn gallery_move(&mut self, delta: isize) {
        let len = self.session.images().len();
        if len == 0 {
            return;
        }
        let next = (self.gallery_selected as isize + delta).clamp(0, len as isize - 1);
        self.gallery_selected = next as usize;
    }

    /// Row-wise movement in the gallery grid.
    pub fn gallery_move_row(&mut self, rows: isize) {
        let cols = grid_columns(self.session.images().len()) as isize;
        let len = self.session.images().len() as isize;
        let target = self.gallery_selected as isize + rows * cols;
        if (0..len).contains(&target) {
            self.gallery_selected = target as usize;
        }
    }

    pub fn save_selected(&mut self) {
        let Some(image) = self.session.images().get(self.gallery_selected) else {
            return;
        };

        self.status_message = Some(match download::save_image(image, &self.output_dir) {
            Ok(path) => format!("Saved {}", path.display()),
            Err(err) => {
                warn!(error = %err, "save failed");
                format!("Save failed: {:#}", err)
            }
        });
    }

    /// Decode thumbnails for the current results once and forget the rest.
    pub fn ensure_previews(&mut self) {
        let images = self.session.images();
        self.previews.retain(|id, _| images.iter().any(|image| &image.id == id));
        for image in images {
            self.previews.entry(image.id.clone()).or_insert_with(|| match Preview::decode(image) {
                Ok(preview) => Some(preview),
                Err(err) => {
                    warn!(id = image.short_id(), error = %err, "could not decode preview");
                    None
                }
            });
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}
