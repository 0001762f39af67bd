use ratatui::style::Color;

/// Neutral accent for styles without a colour of their own.
const DEFAULT_ACCENT: Color = Color::Rgb(100, 116, 139);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AvatarStyle {
    #[default]
    Anime,
    Realistic,
    PixelArt,
    ThreeDRender,
    Watercolor,
    Cyberpunk,
    OilPainting,
    FlatDesign,
    Clay,
}

impl AvatarStyle {
    pub fn all() -> Vec<AvatarStyle> {
        vec![
            AvatarStyle::Anime,
            AvatarStyle::Realistic,
            AvatarStyle::PixelArt,
            AvatarStyle::ThreeDRender,
            AvatarStyle::Watercolor,
            AvatarStyle::Cyberpunk,
            AvatarStyle::OilPainting,
            AvatarStyle::FlatDesign,
            AvatarStyle::Clay,
        ]
    }

    /// Label shown in the selector and embedded in the generation prompt.
    pub fn label(&self) -> &'static str {
        match self {
            AvatarStyle::Anime => "Anime",
            AvatarStyle::Realistic => "Realistic Photo",
            AvatarStyle::PixelArt => "Pixel Art",
            AvatarStyle::ThreeDRender => "3D Render",
            AvatarStyle::Watercolor => "Watercolor",
            AvatarStyle::Cyberpunk => "Cyberpunk",
            AvatarStyle::OilPainting => "Oil Painting",
            AvatarStyle::FlatDesign => "Flat Illustration",
            AvatarStyle::Clay => "Clay",
        }
    }

    /// Key used in the config file and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarStyle::Anime => "anime",
            AvatarStyle::Realistic => "realistic",
            AvatarStyle::PixelArt => "pixel-art",
            AvatarStyle::ThreeDRender => "3d-render",
            AvatarStyle::Watercolor => "watercolor",
            AvatarStyle::Cyberpunk => "cyberpunk",
            AvatarStyle::OilPainting => "oil-painting",
            AvatarStyle::FlatDesign => "flat-design",
            AvatarStyle::Clay => "clay",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase();
        Self::all().into_iter().find(|style| style.as_str() == key)
    }

    pub fn accent(&self) -> Color {
        match self {
            AvatarStyle::Anime => Color::Rgb(236, 72, 153),
            AvatarStyle::Cyberpunk => Color::Rgb(6, 182, 212),
            AvatarStyle::Realistic => Color::Rgb(16, 185, 129),
            AvatarStyle::Watercolor => Color::Rgb(96, 165, 250),
            AvatarStyle::PixelArt => Color::Rgb(249, 115, 22),
            AvatarStyle::ThreeDRender => Color::Rgb(139, 92, 246),
            AvatarStyle::Clay => Color::Rgb(217, 119, 6),
            AvatarStyle::OilPainting | AvatarStyle::FlatDesign => DEFAULT_ACCENT,
        }
    }

    /// Position in display order.
    pub fn index(&self) -> usize {
        Self::all()
            .iter()
            .position(|style| style == self)
            .unwrap_or(0)
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::all().get(idx).copied()
    }

    pub fn next(&self) -> Self {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    pub fn prev(&self) -> Self {
        let all = Self::all();
        all[(self.index() + all.len() - 1) % all.len()]
    }
}

/// clap value parser for `--style`.
pub fn parse_style(s: &str) -> Result<AvatarStyle, String> {
    AvatarStyle::from_str(s).ok_or_else(|| {
        let known: Vec<&str> = AvatarStyle::all().iter().map(|s| s.as_str()).collect();
        format!("unknown style '{}', expected one of: {}", s, known.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_nine_distinct_styles() {
        let all = AvatarStyle::all();
        assert_eq!(all.len(), 9);
        let mut keys: Vec<&str> = all.iter().map(|s| s.as_str()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 9);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!(AvatarStyle::from_str("Pixel-Art"), Some(AvatarStyle::PixelArt));
        assert_eq!(AvatarStyle::from_str(" 3D-RENDER "), Some(AvatarStyle::ThreeDRender));
        assert_eq!(AvatarStyle::from_str("baroque"), None);
    }

    #[test]
    fn test_every_key_parses_back() {
        for style in AvatarStyle::all() {
            assert_eq!(AvatarStyle::from_str(style.as_str()), Some(style));
        }
    }

    #[test]
    fn test_next_and_prev_wrap() {
        assert_eq!(AvatarStyle::Clay.next(), AvatarStyle::Anime);
        assert_eq!(AvatarStyle::Anime.prev(), AvatarStyle::Clay);
        assert_eq!(AvatarStyle::Anime.next(), AvatarStyle::Realistic);
    }

    #[test]
    fn test_unaccented_styles_share_default() {
        assert_eq!(AvatarStyle::OilPainting.accent(), AvatarStyle::FlatDesign.accent());
        assert_ne!(AvatarStyle::Anime.accent(), AvatarStyle::Cyberpunk.accent());
    }

    #[test]
    fn test_parse_style_error_lists_choices() {
        let err = parse_style("nope").unwrap_err();
        assert!(err.contains("cyberpunk"));
    }
}
