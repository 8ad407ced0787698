use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEvent,
    MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

use crate::controller::{Controller, LoadState};
use crate::data::FeedService;
use crate::post::RawPost;
use crate::view::{FeedView, ViewRecord};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Nominal height of one terminal row when measuring distance to the bottom
/// of the post list.
const CELL_HEIGHT_UNITS: u32 = 16;
const SEARCH_BOX_HEIGHT: u16 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Pane {
    Tags,
    Posts,
}

impl Pane {
    fn title(self) -> &'static str {
        match self {
            Pane::Tags => "Tags",
            Pane::Posts => "Posts",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Tags => Pane::Posts,
            Pane::Posts => Pane::Tags,
        }
    }
}

enum AsyncResponse {
    Posts {
        request_id: u64,
        result: Result<Vec<RawPost>>,
    },
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

fn pad_lines_to_width(lines: &mut [Line<'static>], width: u16) {
    let width = width as usize;
    if width == 0 {
        return;
    }

    for line in lines {
        let mut current_width = 0usize;
        for span in &line.spans {
            current_width =
                current_width.saturating_add(UnicodeWidthStr::width(span.content.as_ref()));
        }
        if current_width >= width {
            continue;
        }
        let pad_style = line.spans.last().map(|span| span.style).unwrap_or_default();
        let padding = " ".repeat(width - current_width);
        line.spans.push(Span::styled(padding, pad_style));
    }
}

fn wrap_plain(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    wrap(text, width.max(1))
        .into_iter()
        .map(|segment| Line::from(Span::styled(segment.into_owned(), style)))
        .collect()
}

fn post_card_lines(
    record: &ViewRecord,
    view: &FeedView,
    width: usize,
    background: Color,
    highlight: bool,
) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    let mut title_style = Style::default().fg(COLOR_TEXT_PRIMARY).bg(background);
    if highlight {
        title_style = title_style.fg(COLOR_ACCENT);
    }
    title_style = title_style.add_modifier(Modifier::BOLD);
    lines.extend(wrap_plain(&record.title, width, title_style));
    if record.matching_tags > 0 {
        lines.push(Line::from(Span::styled(
            format!("matches {} selected tag(s)", record.matching_tags),
            Style::default().fg(COLOR_SUCCESS).bg(background),
        )));
    }

    let body_style = Style::default().fg(COLOR_TEXT_SECONDARY).bg(background);
    lines.extend(wrap_plain(&record.description, width, body_style));

    lines.push(Line::from(Span::styled(
        format!("Date: {}", record.formatted_date),
        body_style.add_modifier(Modifier::ITALIC),
    )));

    if !record.tags.is_empty() {
        let mut spans: Vec<Span<'static>> = Vec::new();
        for (idx, tag) in record.tags.iter().enumerate() {
            if idx > 0 {
                spans.push(Span::styled(" ", body_style));
            }
            let style = if view.is_selected(tag) {
                Style::default()
                    .fg(COLOR_SUCCESS)
                    .bg(background)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_ACCENT).bg(background)
            };
            spans.push(Span::styled(format!("#{tag}"), style));
        }
        lines.push(Line::from(spans));
    }

    if !record.image.trim().is_empty() {
        lines.push(Line::from(Span::styled(
            format!("image: {}", record.image.trim()),
            body_style.add_modifier(Modifier::DIM),
        )));
    }

    lines
}

pub struct Options {
    pub status_message: String,
    pub source_label: String,
    pub feed_service: Arc<dyn FeedService + Send + Sync>,
    pub controller: Controller,
}

pub struct Model {
    controller: Controller,
    view: FeedView,
    feed_service: Arc<dyn FeedService + Send + Sync>,
    source_label: String,
    status_message: String,
    focused_pane: Pane,
    search_active: bool,
    search_input: String,
    selected_post: usize,
    selected_tag: usize,
    post_offset: usize,
    post_heights: Vec<usize>,
    post_view_height: u16,
    needs_redraw: bool,
    spinner: Spinner,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    next_request_id: u64,
    pending_request: Option<u64>,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let view = opts.controller.view();
        let search_input = view.search_text.clone();
        let startup_message = opts.status_message;
        let mut model = Self {
            controller: opts.controller,
            view,
            feed_service: opts.feed_service,
            source_label: opts.source_label,
            status_message: String::new(),
            focused_pane: Pane::Posts,
            search_active: false,
            search_input,
            selected_post: 0,
            selected_tag: 0,
            post_offset: 0,
            post_heights: Vec::new(),
            post_view_height: 0,
            needs_redraw: true,
            spinner: Spinner::new(),
            response_tx,
            response_rx,
            next_request_id: 1,
            pending_request: None,
        };
        model.reload_posts();
        if !startup_message.is_empty() {
            model.status_message = format!("{} · {}", model.status_message, startup_message);
        }
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.pending_request.is_some()
    }

    fn reload_posts(&mut self) {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending_request = Some(request_id);
        self.status_message = format!("Loading posts from {}…", self.source_label);

        let service = self.feed_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.load_posts();
            let _ = tx.send(AsyncResponse::Posts { request_id, result });
        });
        self.mark_dirty();
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Posts { request_id, result } => {
                if self.pending_request != Some(request_id) {
                    return;
                }
                self.pending_request = None;
                self.controller.load_posts(result);
                self.selected_post = 0;
                self.selected_tag = 0;
                self.post_offset = 0;
                self.refresh_view();
                self.status_message = match self.controller.load_state() {
                    LoadState::Loaded(count) => {
                        format!("Loaded {} posts from {}.", count, self.source_label)
                    }
                    LoadState::Failed(err) => format!("Failed to load posts: {err}"),
                    LoadState::Pending => String::new(),
                };
            }
        }
    }

    fn refresh_view(&mut self) {
        self.view = self.controller.view();
        if self.view.posts.is_empty() {
            self.selected_post = 0;
        } else {
            self.selected_post = self.selected_post.min(self.view.posts.len() - 1);
        }
        if self.view.tags.is_empty() {
            self.selected_tag = 0;
        } else {
            self.selected_tag = self.selected_tag.min(self.view.tags.len() - 1);
        }
        self.mark_dirty();
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.search_active {
            self.handle_search_key(code);
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('/') => {
                self.search_active = true;
                self.status_message =
                    "Search titles: type a pattern, Enter or Esc to finish.".to_string();
                self.mark_dirty();
            }
            KeyCode::Esc => {
                if !self.search_input.is_empty() {
                    self.search_input.clear();
                    self.apply_search();
                    self.status_message = "Search cleared.".to_string();
                }
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.next();
                self.status_message = format!("Focus: {}", self.focused_pane.title());
                self.mark_dirty();
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.focused_pane = Pane::Tags;
                self.mark_dirty();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.focused_pane = Pane::Posts;
                self.mark_dirty();
            }
            KeyCode::Down | KeyCode::Char('j') => self.navigate(1),
            KeyCode::Up | KeyCode::Char('k') => self.navigate(-1),
            KeyCode::PageDown => self.navigate(self.page_step()),
            KeyCode::PageUp => self.navigate(-self.page_step()),
            KeyCode::Home | KeyCode::Char('g') => self.navigate(i32::MIN / 2),
            KeyCode::End | KeyCode::Char('G') => self.navigate(i32::MAX / 2),
            KeyCode::Enter | KeyCode::Char(' ') if self.focused_pane == Pane::Tags => {
                self.toggle_selected_tag();
            }
            KeyCode::Char('s') => {
                let direction = self.controller.toggle_sort();
                self.selected_post = 0;
                self.post_offset = 0;
                self.refresh_view();
                self.status_message = format!("Sorted by date, {}.", direction.label());
            }
            KeyCode::Char('d') | KeyCode::Delete if self.focused_pane == Pane::Posts => {
                self.delete_selected_post();
            }
            KeyCode::Char('c') => {
                if self.controller.show_less() {
                    self.selected_post = 0;
                    self.post_offset = 0;
                    self.refresh_view();
                    self.status_message = "Showing only the first page of posts.".to_string();
                }
            }
            KeyCode::Char('r') => {
                if !self.is_loading() {
                    self.reload_posts();
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc | KeyCode::Enter => {
                self.search_active = false;
                self.status_message = if self.search_input.is_empty() {
                    "Search cleared.".to_string()
                } else {
                    format!("Filtering titles by {:?}.", self.search_input)
                };
                self.mark_dirty();
            }
            KeyCode::Backspace => {
                if self.search_input.pop().is_some() {
                    self.apply_search();
                }
            }
            KeyCode::Char(ch) => {
                self.search_input.push(ch);
                self.apply_search();
            }
            _ => {}
        }
    }

    fn apply_search(&mut self) {
        self.controller.set_search_text(self.search_input.clone());
        self.selected_post = 0;
        self.post_offset = 0;
        self.refresh_view();
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        let delta = match event.kind {
            MouseEventKind::ScrollDown => 1,
            MouseEventKind::ScrollUp => -1,
            _ => return,
        };
        let focused = self.focused_pane;
        self.focused_pane = Pane::Posts;
        self.navigate(delta);
        self.focused_pane = focused;
    }

    fn page_step(&self) -> i32 {
        let visible_cards = self
            .post_heights
            .iter()
            .skip(self.post_offset)
            .scan(0usize, |used, height| {
                *used += height;
                (*used <= self.post_view_height as usize).then_some(())
            })
            .count();
        visible_cards.max(1) as i32
    }

    fn navigate(&mut self, delta: i32) {
        match self.focused_pane {
            Pane::Tags => {
                self.selected_tag = step_index(self.selected_tag, delta, self.view.tags.len());
                self.mark_dirty();
            }
            Pane::Posts => {
                self.selected_post = step_index(self.selected_post, delta, self.view.posts.len());
                self.ensure_post_visible();
                if delta > 0 {
                    self.check_near_bottom();
                }
                self.mark_dirty();
            }
        }
    }

    fn check_near_bottom(&mut self) {
        let remaining = (self.remaining_rows() as u32).saturating_mul(CELL_HEIGHT_UNITS);
        if self.controller.on_near_bottom(remaining) {
            self.refresh_view();
            self.status_message = format!(
                "Showing {} of {} posts.",
                self.view.posts.len(),
                self.view.total
            );
        }
    }

    fn remaining_rows(&self) -> usize {
        let below: usize = self.post_heights.iter().skip(self.post_offset).sum();
        below.saturating_sub(self.post_view_height as usize)
    }

    fn ensure_post_visible(&mut self) {
        if self.post_heights.is_empty() || self.post_view_height == 0 {
            self.post_offset = 0;
            return;
        }
        let selected = self.selected_post.min(self.post_heights.len() - 1);
        if selected < self.post_offset {
            self.post_offset = selected;
            return;
        }
        let available = self.post_view_height as usize;
        while self.post_offset < selected
            && self.post_heights[self.post_offset..=selected].iter().sum::<usize>() > available
        {
            self.post_offset += 1;
        }
    }

    fn toggle_selected_tag(&mut self) {
        let Some(tag) = self.view.tags.get(self.selected_tag).cloned() else {
            return;
        };
        let selected = self.controller.toggle_tag(&tag);
        self.selected_post = 0;
        self.post_offset = 0;
        self.refresh_view();
        self.status_message = if selected {
            format!("Ranking posts by #{tag}.")
        } else if self.view.selected_tags.is_empty() {
            "No tags selected, sorted by date.".to_string()
        } else {
            format!("Removed #{tag} from the ranking.")
        };
    }

    fn delete_selected_post(&mut self) {
        let Some(record) = self.view.posts.get(self.selected_post) else {
            return;
        };
        let id = record.id;
        let title = record.title.clone();
        if self.controller.delete(id) {
            self.refresh_view();
            self.ensure_post_visible();
            self.status_message = format!("Deleted {:?}.", title);
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
                .trim()
                .to_string()
        } else {
            self.status_message.clone()
        };
        let status_color = match self.controller.load_state() {
            LoadState::Failed(_) => COLOR_ERROR,
            _ => COLOR_TEXT_PRIMARY,
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(status_color)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
            .split(layout[1]);

        let side_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(SEARCH_BOX_HEIGHT), Constraint::Min(0)])
            .split(main_chunks[0]);

        self.draw_search(frame, side_chunks[0]);
        self.draw_tags(frame, side_chunks[1]);
        self.draw_posts(frame, main_chunks[1]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[2]);
    }

    fn pane_block(&self, pane: Pane, title: String) -> Block<'static> {
        let focused = self.focused_pane == pane && !self.search_active;
        let border_style = if focused {
            Style::default().fg(COLOR_BORDER_FOCUSED)
        } else {
            Style::default().fg(COLOR_BORDER_IDLE)
        };
        let title_style = if focused {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        Block::default()
            .title(Span::styled(title, title_style))
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1))
    }

    fn draw_search(&self, frame: &mut Frame<'_>, area: Rect) {
        let border = if self.search_active {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        let block = Block::default()
            .title(Span::styled(
                "Search",
                Style::default().fg(if self.search_active {
                    COLOR_ACCENT
                } else {
                    COLOR_TEXT_SECONDARY
                }),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1));

        let line = if self.search_input.is_empty() && !self.search_active {
            Line::from(Span::styled(
                "press / to search titles",
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            ))
        } else {
            let mut spans = vec![Span::styled(
                self.search_input.clone(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )];
            if self.search_active {
                spans.push(Span::styled("▏", Style::default().fg(COLOR_ACCENT)));
            }
            Line::from(spans)
        };
        frame.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_tags(&self, frame: &mut Frame<'_>, area: Rect) {
        let title = if self.view.selected_tags.is_empty() {
            "Tags".to_string()
        } else {
            format!("Tags ({} selected)", self.view.selected_tags.len())
        };
        let block = self.pane_block(Pane::Tags, title);
        let focused = self.focused_pane == Pane::Tags && !self.search_active;

        if self.view.tags.is_empty() {
            let empty = Paragraph::new(Span::styled(
                "No tags yet.",
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            ))
            .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = self
            .view
            .tags
            .iter()
            .map(|tag| {
                let selected = self.view.is_selected(tag);
                let (marker, style) = if selected {
                    (
                        "● ",
                        Style::default()
                            .fg(COLOR_SUCCESS)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    ("  ", Style::default().fg(COLOR_TEXT_PRIMARY))
                };
                ListItem::new(Line::from(vec![
                    Span::styled(marker, style),
                    Span::styled(format!("#{tag}"), style),
                ]))
            })
            .collect();

        let highlight = if focused {
            Style::default().bg(COLOR_PANEL_SELECTED_BG)
        } else {
            Style::default()
        };
        let list = List::new(items).block(block).highlight_style(highlight);
        let mut state = ListState::default().with_selected(Some(self.selected_tag));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_posts(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let title = format!(
            "Posts · {} of {} · {}",
            self.view.posts.len(),
            self.view.total,
            if self.view.selected_tags.is_empty() {
                self.view.sort_direction.label()
            } else {
                "ranked by tags"
            }
        );
        let block = self.pane_block(Pane::Posts, title);
        let inner = block.inner(area);
        let width = inner.width.max(1) as usize;
        let pane_width = inner.width;
        let focused = self.focused_pane == Pane::Posts && !self.search_active;

        let mut cards: Vec<Vec<Line<'static>>> = Vec::with_capacity(self.view.posts.len());
        for (idx, record) in self.view.posts.iter().enumerate() {
            let selected = idx == self.selected_post;
            let highlight = focused && selected;
            let background = if highlight {
                COLOR_PANEL_SELECTED_BG
            } else {
                COLOR_PANEL_BG
            };
            let mut lines = post_card_lines(record, &self.view, width, background, highlight);
            lines.push(Line::from(Span::styled(
                String::new(),
                Style::default().bg(COLOR_PANEL_BG),
            )));
            pad_lines_to_width(&mut lines, pane_width);
            cards.push(lines);
        }

        self.post_heights = cards.iter().map(Vec::len).collect();
        self.post_view_height = inner.height;
        self.ensure_post_visible();

        let mut items: Vec<ListItem> = Vec::new();
        let mut used_height = 0usize;
        for lines in cards.into_iter().skip(self.post_offset) {
            if used_height >= inner.height as usize && !items.is_empty() {
                break;
            }
            used_height = used_height.saturating_add(lines.len());
            items.push(ListItem::new(lines));
        }

        if items.is_empty() {
            let message = if self.is_loading() {
                format!("{} Loading feed...", self.spinner.frame())
            } else if matches!(self.controller.load_state(), LoadState::Failed(_)) {
                "No posts loaded.".to_string()
            } else if !self.view.search_text.is_empty() {
                format!("No titles match {:?}.", self.view.search_text)
            } else {
                "No posts to show.".to_string()
            };
            let mut lines = vec![Line::from(Span::styled(
                message,
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            ))];
            pad_lines_to_width(&mut lines, pane_width);
            items.push(ListItem::new(lines));
        } else if self.view.exhausted && self.post_offset + items.len() >= self.view.posts.len() {
            let mut lines = vec![Line::from(Span::styled(
                "· end of feed ·",
                Style::default().fg(COLOR_TEXT_SECONDARY).bg(COLOR_PANEL_BG),
            ))];
            pad_lines_to_width(&mut lines, pane_width);
            items.push(ListItem::new(lines));
        }

        let list = List::new(items).block(block);
        frame.render_widget(list, area);
    }

    fn footer_text(&self) -> String {
        if self.search_active {
            return "Search: type to filter titles · Backspace delete · Enter/Esc done".to_string();
        }

        let mut parts: Vec<String> = Vec::new();
        match self.focused_pane {
            Pane::Tags => {
                parts.push("Tags: j/k move, Enter/Space toggle".to_string());
            }
            Pane::Posts => {
                if self.view.posts.is_empty() {
                    parts.push("Posts: waiting for feed…".to_string());
                } else {
                    parts.push("Posts: j/k move, PageUp/PageDown scroll".to_string());
                    parts.push("d delete".to_string());
                }
            }
        }
        parts.push("Tab switch pane".to_string());
        parts.push("/ search".to_string());
        parts.push(format!(
            "s sort ({})",
            self.view.sort_direction.toggled().label()
        ));
        if self.view.expanded {
            parts.push("c show only 10 posts".to_string());
        }
        if self.is_loading() {
            parts.push("Refreshing feed…".to_string());
        } else {
            parts.push("r reload".to_string());
        }
        parts.push("q quit".to_string());

        parts.join(" · ")
    }
}

fn step_index(current: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = current as i64 + delta as i64;
    next.clamp(0, len as i64 - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockFeedService;
    use crate::pipeline::SearchMode;
    use crate::post::PostId;
    use crate::preferences::MemoryPreferences;
    use crate::selection::SortDirection;

    fn demo_model() -> Model {
        let controller = Controller::new(Box::new(MemoryPreferences::new()), SearchMode::Pattern);
        let mut model = Model::new(Options {
            status_message: String::new(),
            source_label: "demo".into(),
            feed_service: Arc::new(MockFeedService),
            controller,
        });
        let message = model
            .response_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("mock feed reply");
        model.handle_async_response(message);
        model
    }

    // Ten cards of six rows in a thirty-row viewport: 30 rows hidden at the top.
    fn with_layout(model: &mut Model) {
        model.post_heights = vec![6; model.view.posts.len()];
        model.post_view_height = 30;
    }

    fn visible_count(model: &Model) -> usize {
        model.controller.pagination().visible_count()
    }

    fn total_width(line: &Line<'_>) -> usize {
        line.spans
            .iter()
            .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
            .sum()
    }

    fn record(tags: &[&str], image: &str) -> ViewRecord {
        ViewRecord {
            id: PostId(1),
            title: "A fairly long title for a post".into(),
            description: "Body text".into(),
            image: image.into(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            formatted_date: "Monday, January 1st 2024, 3:05 pm".into(),
            matching_tags: 0,
        }
    }

    #[test]
    fn pad_lines_extends_to_width() {
        let mut lines = vec![Line::from(vec![Span::raw("abc")])];
        pad_lines_to_width(&mut lines, 6);
        assert_eq!(lines[0].spans.len(), 2);
        assert_eq!(lines[0].spans[1].content.as_ref(), "   ");
        assert_eq!(total_width(&lines[0]), 6);
    }

    #[test]
    fn pad_lines_does_not_shorten() {
        let mut lines = vec![Line::from(vec![Span::raw("abcdef")])];
        pad_lines_to_width(&mut lines, 4);
        assert_eq!(lines[0].spans.len(), 1);
        assert_eq!(total_width(&lines[0]), 6);
    }

    #[test]
    fn step_index_clamps() {
        assert_eq!(step_index(0, -1, 5), 0);
        assert_eq!(step_index(3, 1, 5), 4);
        assert_eq!(step_index(4, 1, 5), 4);
        assert_eq!(step_index(2, i32::MAX / 2, 5), 4);
        assert_eq!(step_index(2, 1, 0), 0);
    }

    #[test]
    fn card_lists_title_date_and_tags() {
        let view = FeedView {
            selected_tags: vec!["rust".into()],
            sort_direction: SortDirection::Descending,
            ..FeedView::default()
        };
        let lines = post_card_lines(&record(&["rust", "tui"], ""), &view, 80, COLOR_PANEL_BG, false);
        let text: Vec<String> = lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect();
        assert_eq!(text[0], "A fairly long title for a post");
        assert!(text.iter().any(|line| line.starts_with("Date: Monday")));
        assert!(text.iter().any(|line| line == "#rust #tui"));
        assert!(!text.iter().any(|line| line.starts_with("image:")));
    }

    #[test]
    fn card_wraps_title_to_width() {
        let view = FeedView::default();
        let lines = post_card_lines(
            &record(&[], "https://example.com/a.png"),
            &view,
            12,
            COLOR_PANEL_BG,
            true,
        );
        assert!(lines.len() > 4);
        assert!(lines
            .iter()
            .any(|line| line.spans[0].content.starts_with("image:")));
    }

    #[test]
    fn stepping_far_from_the_bottom_keeps_one_page() {
        let mut model = demo_model();
        assert_eq!(model.view.posts.len(), 10);
        with_layout(&mut model);
        assert_eq!(model.remaining_rows(), 30);

        model.navigate(1);
        assert_eq!(model.selected_post, 1);
        assert_eq!(model.post_offset, 0);
        assert_eq!(visible_count(&model), 10);
        assert_eq!(model.view.posts.len(), 10);
    }

    #[test]
    fn stepping_near_the_bottom_reveals_a_page() {
        let mut model = demo_model();
        with_layout(&mut model);

        model.selected_post = 4;
        model.navigate(1);
        assert_eq!(model.post_offset, 1);
        assert_eq!(model.remaining_rows(), 24);
        assert_eq!(visible_count(&model), 10);

        model.navigate(1);
        assert_eq!(model.post_offset, 2);
        assert_eq!(model.remaining_rows(), 18);
        assert_eq!(visible_count(&model), 20);
        assert_eq!(model.view.posts.len(), 12);
    }

    #[test]
    fn scrolling_at_the_bottom_stops_growing() {
        let mut model = demo_model();
        with_layout(&mut model);
        model.selected_post = 9;
        for _ in 0..25 {
            model.navigate(1);
        }
        assert_eq!(visible_count(&model), 30);
        assert_eq!(model.view.posts.len(), 12);
    }

    #[test]
    fn wheel_scrolls_posts_while_tags_are_focused() {
        let mut model = demo_model();
        with_layout(&mut model);
        model.focused_pane = Pane::Tags;
        model.handle_mouse(MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 0,
            row: 0,
            modifiers: crossterm::event::KeyModifiers::NONE,
        });
        assert_eq!(model.selected_post, 1);
        assert_eq!(model.selected_tag, 0);
        assert_eq!(model.focused_pane, Pane::Tags);
    }

    #[test]
    fn stale_replies_are_ignored() {
        let mut model = demo_model();
        assert_eq!(model.controller.store().len(), 12);

        model.handle_async_response(AsyncResponse::Posts {
            request_id: 999,
            result: Ok(Vec::new()),
        });
        assert_eq!(model.controller.store().len(), 12);
        assert_eq!(model.view.total, 12);
    }

    #[test]
    fn reload_accepts_only_the_latest_request() {
        let mut model = demo_model();
        model.reload_posts();
        let pending = model.pending_request.expect("reload pending");

        model.handle_async_response(AsyncResponse::Posts {
            request_id: pending - 1,
            result: Ok(Vec::new()),
        });
        assert_eq!(model.pending_request, Some(pending));
        assert_eq!(model.controller.store().len(), 12);

        let message = model
            .response_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("reload reply");
        model.handle_async_response(message);
        assert_eq!(model.pending_request, None);
        assert_eq!(model.controller.load_state(), &LoadState::Loaded(12));
    }

    #[test]
    fn failed_reload_keeps_posts_and_reports() {
        let mut model = demo_model();
        model.reload_posts();
        let pending = model.pending_request.expect("reload pending");
        // Drain the real reply so only the failure is applied.
        let _ = model.response_rx.recv_timeout(Duration::from_secs(5));

        model.handle_async_response(AsyncResponse::Posts {
            request_id: pending,
            result: Err(anyhow::anyhow!("connection reset")),
        });
        assert_eq!(model.view.total, 12);
        assert!(model.status_message.contains("connection reset"));
    }
}
