use chrono::Local;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthChar;

use crate::app::{grid_columns, App, FocusPane, InputMode, STYLE_COLUMNS};
use crate::preview::{HalfBlocks, Preview};
use crate::request::{GeneratedImage, MAX_IMAGES};
use crate::session::SessionStatus;
use crate::style::AvatarStyle;

const LEFT_COLUMN_WIDTH: u16 = 46;

fn border_color(focused: bool) -> Color {
    if focused { Color::Cyan } else { Color::DarkGray }
}

fn human_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KB * KB {
        format!("{:.1} MB", b / (KB * KB))
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [controls_area, gallery_area] = Layout::horizontal([
        Constraint::Length(LEFT_COLUMN_WIDTH),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_controls(app, frame, controls_area);
    render_gallery(app, frame, gallery_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" AvatarForge ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(
            format!(" {} ", app.model),
            Style::default().fg(Color::Rgb(165, 180, 252)).bg(Color::Rgb(49, 46, 129)),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_controls(app: &mut App, frame: &mut Frame, area: Rect) {
    let style_rows = AvatarStyle::all().len().div_ceil(STYLE_COLUMNS) as u16;
    let message_height = if app.session.error().is_some() || app.session.validation().is_some() {
        4
    } else {
        0
    };

    let [prompt_area, styles_area, count_area, message_area, button_area, _] = Layout::vertical([
        Constraint::Length(7),
        Constraint::Length(style_rows + 2),
        Constraint::Length(4),
        Constraint::Length(message_height),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    render_prompt(app, frame, prompt_area);
    render_style_selector(app, frame, styles_area);
    render_count(app, frame, count_area);
    if message_height > 0 {
        render_message(app, frame, message_area);
    }
    render_generate_button(app, frame, button_area);
}

fn render_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Prompt;
    let editing = focused && app.input_mode == InputMode::Editing;
    let color = if editing { Color::Yellow } else { border_color(focused) };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(" Describe your avatar ")
        .title(Line::from(" r: random idea ").right_aligned().fg(Color::Magenta));

    let inner = block.inner(area);
    let (lines, (col, row)) = wrap_prompt(app.session.prompt(), app.prompt_cursor, inner.width as usize);

    let text = if app.session.prompt().is_empty() {
        Text::from(Span::styled(
            "Describe the avatar you want...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(lines.into_iter().map(Line::from).collect::<Vec<_>>())
    };

    let prompt = Paragraph::new(text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(prompt, area);

    if editing && inner.width > 0 && row < inner.height {
        frame.set_cursor_position((inner.x + col, inner.y + row));
    }
}

/// Hard-wrap `text` by display width and locate the cell before the
/// `cursor`-th char. Wide chars never straddle a row break.
fn wrap_prompt(text: &str, cursor: usize, width: usize) -> (Vec<String>, (u16, u16)) {
    if width == 0 {
        return (vec![text.to_string()], (0, 0));
    }

    let mut lines = vec![String::new()];
    let (mut col, mut row) = (0usize, 0usize);
    let mut cursor_at = None;

    for (idx, ch) in text.chars().enumerate() {
        let w = ch.width().unwrap_or(0);
        if col + w > width {
            lines.push(String::new());
            col = 0;
            row += 1;
        }
        if idx == cursor {
            cursor_at = Some((col, row));
        }
        if let Some(line) = lines.last_mut() {
            line.push(ch);
        }
        col += w;
    }

    let (col, row) = cursor_at.unwrap_or(if col >= width { (0, row + 1) } else { (col, row) });
    (lines, (col as u16, row as u16))
}

fn render_style_selector(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Styles;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" Art style ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let styles = AvatarStyle::all();
    let rows = styles.len().div_ceil(STYLE_COLUMNS);
    let row_areas = Layout::vertical(vec![Constraint::Length(1); rows]).split(inner);

    app.style_cells.clear();
    for (row_idx, row_area) in row_areas.iter().enumerate() {
        let col_areas =
            Layout::horizontal(vec![Constraint::Ratio(1, STYLE_COLUMNS as u32); STYLE_COLUMNS]).split(*row_area);
        for (col_idx, cell) in col_areas.iter().enumerate() {
            let idx = row_idx * STYLE_COLUMNS + col_idx;
            let Some(&style) = styles.get(idx) else { continue };

            let selected = style == app.session.style();
            let under_cursor = focused && idx == app.style_cursor;

            let mut cell_style = if selected {
                Style::default().bg(style.accent()).fg(Color::Black).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            if under_cursor {
                cell_style = cell_style.add_modifier(Modifier::UNDERLINED);
            }

            let label = if under_cursor {
                format!(">{}", style.label())
            } else {
                style.label().to_string()
            };
            frame.render_widget(
                Paragraph::new(label).alignment(Alignment::Center).style(cell_style),
                *cell,
            );
            app.style_cells.push((*cell, style));
        }
    }
}

fn render_count(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Count;
    let count = app.session.count().get();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" Images ")
        .title(Line::from(format!(" {} ", count)).right_aligned().fg(Color::Cyan));

    let mut dots: Vec<Span> = vec![Span::styled("Single ", Style::default().fg(Color::DarkGray))];
    for n in 1..=MAX_IMAGES {
        let filled = n <= count;
        dots.push(Span::styled(
            if filled { " ● " } else { " ○ " },
            Style::default().fg(if filled { Color::Cyan } else { Color::DarkGray }),
        ));
    }
    dots.push(Span::styled(" Multi", Style::default().fg(Color::DarkGray)));

    let text = Text::from(vec![
        Line::from(dots).centered(),
        Line::from(Span::styled(
            "-/+ or 1-4 to change",
            Style::default().fg(Color::DarkGray),
        ))
        .centered(),
    ]);
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_message(app: &App, frame: &mut Frame, area: Rect) {
    let (text, color, title) = match (app.session.validation(), app.session.error()) {
        (Some(msg), _) => (msg, Color::Yellow, " Check your input "),
        (None, Some(msg)) => (msg, Color::Red, " Generation failed "),
        (None, None) => return,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);
    let paragraph = Paragraph::new(text.to_string())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_generate_button(app: &App, frame: &mut Frame, area: Rect) {
    let (label, style) = if app.session.is_loading() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        (
            format!("Generating{:<3}", dots),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )
    } else if app.session.can_generate() {
        (
            "Generate  (Enter / g)".to_string(),
            Style::default().fg(Color::White).bg(Color::Rgb(79, 70, 229)).add_modifier(Modifier::BOLD),
        )
    } else {
        (
            "Generate".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let button = Paragraph::new(label)
        .alignment(Alignment::Center)
        .style(style)
        .block(block);
    frame.render_widget(button, area);
}

fn gallery_summary(app: &App) -> String {
    match app.session.status() {
        SessionStatus::Loading { count, .. } => format!("Creating {} avatar(s)...", count.get()),
        SessionStatus::Success(images) if !images.is_empty() => {
            format!("{} avatar(s) generated", images.len())
        }
        _ => "Waiting for a prompt...".to_string(),
    }
}

fn render_gallery(app: &mut App, frame: &mut Frame, area: Rect) {
    app.gallery_area = Some(area);
    app.ensure_previews();

    let focused = app.focus == FocusPane::Gallery;
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" Results ")
        .title(Line::from(format!(" {} ", gallery_summary(app))).right_aligned().fg(Color::DarkGray));
    if let Some(status) = &app.status_message {
        block = block.title_bottom(Line::from(format!(" {} ", status)).fg(Color::Green));
    }
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match app.session.status() {
        SessionStatus::Loading { count, .. } => {
            let n = count.get() as usize;
            let cells = grid_cells(inner, n);
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            for cell in cells {
                render_placeholder(frame, cell, &dots);
            }
        }
        SessionStatus::Success(images) if !images.is_empty() => {
            let cells = grid_cells(inner, images.len());
            for (idx, (image, cell)) in images.iter().zip(cells).enumerate() {
                let selected = idx == app.gallery_selected;
                let preview = app.previews.get(&image.id).and_then(Option::as_ref);
                render_card(frame, cell, image, preview, selected, focused);
            }
        }
        _ => render_empty_state(frame, inner),
    }
}

/// Split `area` into `n` cells laid out in `grid_columns(n)` columns.
fn grid_cells(area: Rect, n: usize) -> Vec<Rect> {
    if n == 0 {
        return Vec::new();
    }
    let cols = grid_columns(n);
    let rows = n.div_ceil(cols);
    let row_areas = Layout::vertical(vec![Constraint::Ratio(1, rows as u32); rows]).split(area);

    let mut cells = Vec::with_capacity(n);
    for row_area in row_areas.iter() {
        let col_areas = Layout::horizontal(vec![Constraint::Ratio(1, cols as u32); cols]).split(*row_area);
        cells.extend(col_areas.iter().copied());
    }
    cells.truncate(n);
    cells
}

fn render_placeholder(frame: &mut Frame, area: Rect, dots: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [_, middle, _] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(inner);
    let text = Paragraph::new(format!("Creating{:<3}", dots))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Rgb(165, 180, 252)).add_modifier(Modifier::ITALIC));
    frame.render_widget(text, middle);
}

fn render_empty_state(frame: &mut Frame, area: Rect) {
    let [_, middle, _] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let text = Text::from(vec![
        Line::from(Span::styled("Ready", Style::default().fg(Color::White).bold())),
        Line::default(),
        Line::from(Span::styled(
            "Pick a style, describe your idea, and generate a one-of-a-kind avatar.",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }),
        middle,
    );
}

fn render_card(
    frame: &mut Frame,
    area: Rect,
    image: &GeneratedImage,
    preview: Option<&Preview>,
    selected: bool,
    focused: bool,
) {
    let color = if selected && focused {
        Color::Cyan
    } else if selected {
        Color::Blue
    } else {
        Color::DarkGray
    };

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" #{} ", image.short_id()));
    if selected {
        block = block.title(Line::from(" AI ART ").right_aligned().fg(Color::White).bold());
    }
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [thumb_area, info_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(5),
    ])
    .areas(inner);

    match preview {
        Some(preview) => {
            let pixels = preview.fit(thumb_area.width, thumb_area.height);
            frame.render_widget(HalfBlocks::new(&pixels), thumb_area);
        }
        None => {
            let [_, middle, _] = Layout::vertical([
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .areas(thumb_area);
            frame.render_widget(
                Paragraph::new("preview unavailable")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)),
                middle,
            );
        }
    }

    let label = Style::default().fg(Color::DarkGray);
    let format = match preview {
        Some(preview) => format!("{}  {}", preview.dimensions(), image.mime_type()),
        None => image.mime_type().to_string(),
    };
    let text = Text::from(vec![
        Line::from(vec![
            Span::styled("Format   ", label),
            Span::raw(format),
            Span::styled(format!("  {}", human_size(image.byte_len())), label),
        ]),
        Line::from(vec![
            Span::styled("Created  ", label),
            Span::raw(image.created_at.with_timezone(&Local).format("%H:%M:%S").to_string()),
        ]),
        Line::from(vec![Span::styled("File     ", label), Span::raw(image.file_name())]),
        Line::default(),
        Line::from(Span::styled(
            if selected { "[s] save image" } else { "" },
            Style::default().fg(Color::Green),
        )),
    ]);

    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), info_area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match (app.input_mode, app.focus) {
        (InputMode::Editing, _) => " EDIT ",
        (_, FocusPane::Prompt) => " PROMPT ",
        (_, FocusPane::Styles) => " STYLE ",
        (_, FocusPane::Count) => " COUNT ",
        (_, FocusPane::Gallery) => " GALLERY ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |k: &'static str, l: &'static str| {
        [Span::styled(k, key_style), Span::styled(l, label_style)]
    };

    let mut hints: Vec<Span> = Vec::new();
    if app.input_mode == InputMode::Editing {
        hints.extend(hint(" Enter ", " generate "));
        hints.extend(hint(" ^R ", " random "));
        hints.extend(hint(" ^U ", " clear "));
        hints.extend(hint(" Esc ", " stop typing "));
        hints.extend(hint(" Tab ", " next "));
    } else {
        match app.focus {
            FocusPane::Prompt => hints.extend(hint(" i ", " edit ")),
            FocusPane::Styles => {
                hints.extend(hint(" ←↑↓→ ", " move "));
                hints.extend(hint(" Enter ", " select "));
            }
            FocusPane::Count => hints.extend(hint(" ←/→ ", " count ")),
            FocusPane::Gallery => {
                hints.extend(hint(" ←↑↓→ ", " move "));
                hints.extend(hint(" s ", " save "));
            }
        }
        hints.extend(hint(" g ", " generate "));
        hints.extend(hint(" [/] ", " style "));
        hints.extend(hint(" r ", " random "));
        if !app.session.images().is_empty() {
            hints.extend(hint(" c ", " clear results "));
        }
        hints.extend(hint(" Tab ", " focus "));
        hints.extend(hint(" q ", " quit "));
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::{backend::TestBackend, buffer::Buffer, layout::Position, Terminal};

    use super::*;
    use crate::app::tests::test_app;
    use crate::generator::fakes::FakeImageApi;
    use crate::preview::tests::solid_png_uri;
    use crate::request::ImageCount;

    fn draw_buffer(app: &mut App) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal.backend().buffer().clone()
    }

    fn draw(app: &mut App) -> String {
        let buffer = draw_buffer(app);
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn uris(n: usize) -> Vec<String> {
        (0..n).map(|_| "data:image/png;base64,aGVsbG8=".to_string()).collect()
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_grid_cells_layout() {
        let area = Rect::new(0, 0, 100, 40);
        let single = grid_cells(area, 1);
        assert_eq!(single, vec![area]);

        let two = grid_cells(area, 2);
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].y, two[1].y);
        assert!(two[1].x > two[0].x);

        let three = grid_cells(area, 3);
        assert_eq!(three.len(), 3);
        assert!(three[2].y > three[0].y);
    }

    #[tokio::test]
    async fn test_empty_state() {
        let (mut app, _rx) = test_app(Arc::new(FakeImageApi::default()));
        let screen = draw(&mut app);
        assert!(screen.contains("Ready"));
        assert!(screen.contains("Waiting for a prompt"));
        assert_eq!(app.style_cells.len(), 9);
    }

    #[tokio::test]
    async fn test_loading_shows_one_placeholder_per_image() {
        let (mut app, _rx) = test_app(Arc::new(FakeImageApi::default()));
        app.session.set_prompt("a fox");
        app.session.set_count(ImageCount::clamped(3));
        app.session.submit().unwrap();

        let screen = draw(&mut app);
        assert_eq!(screen.matches("Creating.").count(), 3);
        assert!(!screen.contains("Ready"));
    }

    #[tokio::test]
    async fn test_results_render_cards() {
        let (mut app, _rx) = test_app(Arc::new(FakeImageApi::default()));
        app.session.set_prompt("a fox");
        app.session.set_count(ImageCount::clamped(2));
        let pending = app.session.submit().unwrap();
        app.session.complete(pending.token, Ok(uris(2)));

        let screen = draw(&mut app);
        assert_eq!(screen.matches("Format").count(), 2);
        assert_eq!(screen.matches("preview unavailable").count(), 2);
        assert!(screen.contains("2 avatar(s) generated"));
        assert!(screen.contains("AI ART"));
    }

    #[tokio::test]
    async fn test_result_thumbnail_is_drawn_in_image_colours() {
        let (mut app, _rx) = test_app(Arc::new(FakeImageApi::default()));
        app.session.set_prompt("a fox");
        app.session.set_count(ImageCount::clamped(1));
        let pending = app.session.submit().unwrap();
        app.session.complete(pending.token, Ok(vec![solid_png_uri(1, 1, [255, 0, 0])]));

        let buffer = draw_buffer(&mut app);
        let gallery = app.gallery_area.unwrap();
        let red = Color::Rgb(255, 0, 0);
        let mut red_cells = 0;
        for y in gallery.top()..gallery.bottom() {
            for x in gallery.left()..gallery.right() {
                let cell = &buffer[(x, y)];
                if cell.fg == red || cell.bg == red {
                    red_cells += 1;
                }
            }
        }
        assert!(red_cells > 100, "only {} red cells", red_cells);

        let screen = draw(&mut app);
        assert!(screen.contains("1 × 1  image/png"));
        assert!(!screen.contains("preview unavailable"));
    }

    #[test]
    fn test_wrap_prompt_ascii() {
        let (lines, cursor) = wrap_prompt("abcdef", 4, 4);
        assert_eq!(lines, vec!["abcd", "ef"]);
        assert_eq!(cursor, (0, 1));

        let (_, end) = wrap_prompt("abcd", 4, 4);
        assert_eq!(end, (0, 1));
        let (_, start) = wrap_prompt("", 0, 4);
        assert_eq!(start, (0, 0));
    }

    #[test]
    fn test_wrap_prompt_counts_wide_chars() {
        // Each CJK char takes two cells; the third cannot fit in a width of 5.
        let (lines, cursor) = wrap_prompt("猫猫猫", 2, 5);
        assert_eq!(lines, vec!["猫猫", "猫"]);
        assert_eq!(cursor, (0, 1));

        let (_, cursor) = wrap_prompt("猫a", 1, 10);
        assert_eq!(cursor, (2, 0));
        let (_, end) = wrap_prompt("猫a", 2, 10);
        assert_eq!(end, (3, 0));
    }

    #[tokio::test]
    async fn test_editing_cursor_follows_display_width() {
        let (mut app, _rx) = test_app(Arc::new(FakeImageApi::default()));
        app.session.set_prompt("猫猫 cat");
        app.prompt_cursor = 2;

        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        // Prompt block sits at (0, 1); its inner area starts one cell in.
        assert_eq!(terminal.get_cursor_position().unwrap(), Position::new(1 + 4, 2));
    }

    #[tokio::test]
    async fn test_validation_message_is_rendered() {
        let (mut app, _rx) = test_app(Arc::new(FakeImageApi::default()));
        app.start_generation();
        let screen = draw(&mut app);
        assert!(screen.contains("Please describe the avatar you want."));
    }
}
