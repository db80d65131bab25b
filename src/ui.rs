use std::collections::HashMap;
use std::io::{self, Stdout};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

use crate::card::{self, CardAction};
use crate::collage::{Cell as CollageCell, Collage, ModalRequest};
use crate::config::Config;
use crate::dropdown::{Point, PointerHub};
use crate::feed::{FeedView, ScrollDirection};
use crate::fixture::{compact_count, Post};
use crate::genai::{AspectRatio, GenAiError, GenerativeService, ImageReply, Source, TextReply};
use crate::lab::{ChatPanel, InputLine, Role, VisionEntry, VisionPanel};
use crate::markdown;
use crate::preview::{self, Picture};
use crate::shell::{
    LayoutMode, NavItem, ProfileAction, Sidebar, Topbar, UtilityHeader, View, ViewHistory,
};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_BRAND: Color = Color::Rgb(0, 168, 132);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);
const COLOR_BADGE: Color = Color::Rgb(239, 68, 68);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const HEADER_HEIGHT: u16 = 3;
const TOPBAR_HEIGHT: u16 = 3;
const MENU_WIDTH: u16 = 26;
const PROFILE_MENU_WIDTH: u16 = 22;
const SEARCH_PLACEHOLDER: &str = "Buscar em Thoth...";

pub struct Options {
    pub config: Config,
    pub posts: Vec<Post>,
    pub service: Arc<dyn GenerativeService>,
    pub status_message: String,
    /// Fetch collage and modal images over HTTP.
    pub fetch_images: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HitTarget {
    SidebarToggle,
    Nav(NavItem),
    Hamburger,
    TopbarAvatar,
    TopbarNav(NavItem),
    TopbarProfile(ProfileAction),
    Backdrop,
    Back,
    Search,
    HeaderAvatar,
    HeaderProfile(ProfileAction),
    ScrollLeft,
    ScrollRight,
    Card(usize),
    Tile { card: usize, index: usize },
    Bookmark(usize),
    MenuTrigger(usize),
    MenuAction { card: usize, action: usize },
    ExpandToggle(usize),
    ModalBackdrop,
    ModalBody,
    ModalPrevious,
    ModalNext,
    ModalClose,
    ChatSend,
    Sources,
    Aspect(AspectRatio),
    Generate,
    SaveImage,
    Gallery(usize),
    NoticeBody,
    NoticeDismiss,
    LinkBackdrop,
    Link(usize),
}

type HitMap = Vec<(Rect, HitTarget)>;

enum AsyncResponse {
    Chat {
        result: Result<TextReply, GenAiError>,
    },
    Vision {
        result: Result<ImageReply, GenAiError>,
    },
    Image {
        url: String,
        result: Result<Picture>,
    },
}

enum PictureSlot {
    Loading,
    Ready(Picture),
    Failed(String),
}

struct LinkMenu {
    items: Vec<Source>,
    selected: usize,
}

struct Spinner {
    index: usize,
}

impl Spinner {
    fn new() -> Self {
        Self { index: 0 }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % SPINNER_FRAMES.len();
    }

    fn reset(&mut self) {
        self.index = 0;
    }
}

/// Screen regions for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenLayout {
    mode: LayoutMode,
    status: Rect,
    nav: Rect,
    header: Rect,
    content: Rect,
    footer: Rect,
}

fn screen_layout(full: Rect, sidebar: &Sidebar, cfg: &Config) -> ScreenLayout {
    let mode = LayoutMode::for_width(full.width, &cfg.ui);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(full);
    let (nav, main) = match mode {
        LayoutMode::Wide => {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Length(sidebar.width(&cfg.ui)),
                    Constraint::Min(0),
                ])
                .split(rows[1]);
            (cols[0], cols[1])
        }
        LayoutMode::Narrow => {
            let split = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(TOPBAR_HEIGHT), Constraint::Min(0)])
                .split(rows[1]);
            (split[0], split[1])
        }
    };
    let main_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(HEADER_HEIGHT), Constraint::Min(0)])
        .split(main);
    ScreenLayout {
        mode,
        status: rows[0],
        nav,
        header: main_rows[0],
        content: main_rows[1],
        footer: rows[2],
    }
}

/// Feed section rows: welcome, section title, cards, credit.
fn feed_layout(content: Rect) -> [Rect; 4] {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(content);
    [rows[0], rows[1], rows[2], rows[3]]
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// A popup of `width` x `height` anchored under `anchor`, kept inside `bounds`.
fn popup_below(anchor: Rect, width: u16, height: u16, bounds: Rect, align_right: bool) -> Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);
    let x = if align_right {
        anchor.right().saturating_sub(width)
    } else {
        anchor.x
    };
    let x = x.clamp(bounds.x, bounds.right().saturating_sub(width));
    let y = anchor
        .bottom()
        .min(bounds.bottom().saturating_sub(height))
        .max(bounds.y);
    Rect::new(x, y, width, height)
}

fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .collect::<String>()
        .to_uppercase()
}

/// The visible slice of an input plus the cursor column inside it.
fn input_window(input: &InputLine, width: u16) -> (String, u16) {
    let width = width.max(1) as usize;
    let chars: Vec<char> = input.as_str().chars().collect();
    let cursor = input.cursor().min(chars.len());
    let start = cursor.saturating_sub(width - 1);
    let visible: String = chars[start..].iter().take(width).collect();
    let before: String = chars[start..cursor].iter().collect();
    (visible, before.width() as u16)
}

fn wrap_plain(text: &str, width: u16, style: Style) -> Vec<Line<'static>> {
    let width = width.max(1) as usize;
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        if paragraph.trim().is_empty() {
            lines.push(Line::default());
            continue;
        }
        for piece in textwrap::wrap(paragraph, width) {
            lines.push(Line::from(Span::styled(piece.into_owned(), style)));
        }
    }
    lines
}

/// Wraps and clamps post text. The last kept line gets an ellipsis when
/// anything was cut.
fn clamp_text(text: &str, width: u16, max_lines: usize, style: Style) -> Vec<Line<'static>> {
    let mut lines = wrap_plain(text, width, style);
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            last.spans.push(Span::styled("…", style));
        }
    }
    lines
}

fn is_plain_char(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(ch)
            if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Some(ch)
        }
        _ => None,
    }
}

/// Applies an editing key to an input. Returns false for keys it does not own.
fn edit_input(input: &mut InputLine, key: &KeyEvent) -> bool {
    if let Some(ch) = is_plain_char(key) {
        input.insert(ch);
        return true;
    }
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        _ => return false,
    }
    true
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("open clipboard")?;
    clipboard
        .set_text(text.to_string())
        .context("write clipboard")?;
    Ok(())
}

pub struct Model {
    cfg: Config,
    status_message: String,
    hub: PointerHub,
    history: ViewHistory,
    sidebar: Sidebar,
    topbar: Topbar,
    header: UtilityHeader,
    feed: FeedView,
    chat: ChatPanel,
    vision: VisionPanel,
    service: Arc<dyn GenerativeService>,
    fetch_images: bool,
    modal: Option<ModalRequest>,
    pictures: HashMap<String, PictureSlot>,
    vision_pictures: HashMap<u64, Picture>,
    link_menu: Option<LinkMenu>,
    nav_selected: usize,
    profile_selected: usize,
    chat_scroll: usize,
    hits: HitMap,
    spinner: Spinner,
    needs_redraw: bool,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let feed = FeedView::new("Feed", opts.posts, &opts.config.feed);
        let chat = ChatPanel::new(opts.config.lab.search_grounding);
        let header = UtilityHeader::new(&opts.config.ui);
        tracing::debug!(cards = feed.len(), "model ready");
        Self {
            status_message: opts.status_message,
            hub: PointerHub::new(),
            history: ViewHistory::default(),
            sidebar: Sidebar::default(),
            topbar: Topbar::default(),
            header,
            feed,
            chat,
            vision: VisionPanel::new(),
            service: opts.service,
            fetch_images: opts.fetch_images,
            modal: None,
            pictures: HashMap::new(),
            vision_pictures: HashMap::new(),
            link_menu: None,
            nav_selected: 0,
            profile_selected: 0,
            chat_scroll: 0,
            hits: Vec::new(),
            spinner: Spinner::new(),
            needs_redraw: true,
            response_tx,
            response_rx,
            cfg: opts.config,
        }
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
                        match self.handle_key(key) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                tracing::warn!(error = %err, "key handler failed");
                                self.status_message = format!("Erro: {err}");
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Err(err) = self.handle_mouse(mouse) {
                            tracing::warn!(error = %err, "mouse handler failed");
                            self.status_message = format!("Erro: {err}");
                            self.mark_dirty();
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    self.spinner.advance();
                    self.mark_dirty();
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
        self.chat.is_loading()
            || self.vision.is_loading()
            || self
                .pictures
                .values()
                .any(|slot| matches!(slot, PictureSlot::Loading))
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
            AsyncResponse::Chat { result } => {
                let failed = result.is_err();
                self.chat.resolve(result);
                self.chat_scroll = 0;
                self.status_message = if failed {
                    "Lumina não respondeu.".to_string()
                } else {
                    "Resposta recebida.".to_string()
                };
            }
            AsyncResponse::Vision { result } => {
                self.vision.resolve(result);
                if let Some(image) = self.vision.images().last() {
                    if !self.vision_pictures.contains_key(&image.id) {
                        match Picture::decode(&image.image.bytes) {
                            Ok(picture) => {
                                self.vision_pictures.insert(image.id, picture);
                            }
                            Err(err) => {
                                tracing::warn!(error = %err, id = image.id, "generated image not decodable");
                            }
                        }
                    }
                }
            }
            AsyncResponse::Image { url, result } => {
                let slot = match result {
                    Ok(picture) => PictureSlot::Ready(picture),
                    Err(err) => {
                        tracing::debug!(%url, error = %err, "image fetch failed");
                        PictureSlot::Failed(err.to_string())
                    }
                };
                self.pictures.insert(url, slot);
            }
        }
        self.mark_dirty();
    }

    fn ensure_picture(&mut self, url: &str) {
        if !self.fetch_images || self.pictures.contains_key(url) {
            return;
        }
        self.pictures.insert(url.to_string(), PictureSlot::Loading);
        let tx = self.response_tx.clone();
        let url = url.to_string();
        thread::spawn(move || {
            let result = Picture::fetch(&url);
            let _ = tx.send(AsyncResponse::Image { url, result });
        });
    }

    fn spawn_chat(&mut self) {
        let Some(request) = self.chat.submit() else {
            return;
        };
        self.chat_scroll = 0;
        self.status_message = "Lumina está pensando…".to_string();
        let service = self.service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result =
                guarded(|| service.generate_text(&request.prompt, request.search_grounding));
            let _ = tx.send(AsyncResponse::Chat { result });
        });
    }

    fn spawn_vision(&mut self) {
        let Some(request) = self.vision.submit() else {
            return;
        };
        self.status_message = format!("Gerando imagem {}…", request.aspect_ratio.as_str());
        let service = self.service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = guarded(|| service.generate_image(&request.prompt, request.aspect_ratio));
            let _ = tx.send(AsyncResponse::Vision { result });
        });
    }

    fn navigate(&mut self, item: NavItem) {
        self.sidebar.select(item);
        self.close_transient();
        if self.history.navigate(item.view()) {
            self.status_message = item.view().title().to_string();
        }
        self.mark_dirty();
    }

    fn back(&mut self) {
        self.close_transient();
        if self.history.back() {
            let item = match self.history.current() {
                View::Feed => NavItem::Home,
                View::Chat => NavItem::ChatLab,
                View::Vision => NavItem::VisionLab,
            };
            if self.sidebar.active().view() != self.history.current() {
                self.sidebar.select(item);
            }
            self.status_message = self.history.current().title().to_string();
        } else {
            self.status_message = "Nada para voltar.".to_string();
        }
        self.mark_dirty();
    }

    /// Closes menus, dropdowns and the link picker. The modal stays.
    fn close_transient(&mut self) {
        for card in self.feed.cards_mut() {
            card.state.close_menu();
        }
        self.topbar.close_all();
        self.header.close_profile();
        self.link_menu = None;
    }

    fn open_modal(&mut self, card_index: usize, tile: usize) {
        let Some(card) = self.feed.cards().get(card_index) else {
            return;
        };
        let images = &card.post.images;
        let Some(request) = Collage::plan(images).activate(images, tile) else {
            return;
        };
        tracing::debug!(post = %card.post.id, tile, "open image modal");
        self.feed.select(card_index);
        if let Some(card) = self.feed.card_mut(card_index) {
            card.state.focus_tile(tile);
        }
        if let Some(url) = request.current().map(str::to_string) {
            self.ensure_picture(&url);
        }
        self.modal = Some(request);
        self.mark_dirty();
    }

    fn page_modal(&mut self, forward: bool) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };
        let moved = if forward {
            modal.next()
        } else {
            modal.previous()
        };
        if moved {
            if let Some(url) = modal.current().map(str::to_string) {
                self.ensure_picture(&url);
            }
            self.mark_dirty();
        }
    }

    fn close_modal(&mut self) {
        if self.modal.take().is_some() {
            self.mark_dirty();
        }
    }

    fn run_card_action(&mut self, card_index: usize, action: CardAction) -> Result<()> {
        let Some(card) = self.feed.cards().get(card_index) else {
            return Ok(());
        };
        let link = card.post.permalink(&self.cfg.feed.permalink_base);
        tracing::info!(post = %card.post.id, action = action.label(), "card action");
        self.status_message = match action {
            CardAction::Share => format!("Compartilhar: {link}"),
            CardAction::CopyLink => {
                copy_to_clipboard(&link)?;
                "Link copiado para a área de transferência.".to_string()
            }
            CardAction::NotInterested => "Você verá menos publicações como esta.".to_string(),
            CardAction::Report => "Publicação denunciada. Obrigado pelo aviso.".to_string(),
        };
        self.mark_dirty();
        Ok(())
    }

    fn run_profile_action(&mut self, action: ProfileAction) {
        self.status_message = match action {
            ProfileAction::Logout => "Sessão encerrada.".to_string(),
            other => format!("{}: em breve.", other.label()),
        };
        self.profile_selected = 0;
        self.mark_dirty();
    }

    fn open_link_menu(&mut self) {
        let items = self.chat.latest_sources().to_vec();
        if items.is_empty() {
            self.status_message = "Nenhuma fonte na última resposta.".to_string();
        } else {
            self.link_menu = Some(LinkMenu { items, selected: 0 });
            self.status_message = "Fontes: j/k move · Enter abre · Esc fecha".to_string();
        }
        self.mark_dirty();
    }

    fn open_link(&mut self, index: usize) {
        let Some(menu) = self.link_menu.as_ref() else {
            return;
        };
        let Some(source) = menu.items.get(index) else {
            return;
        };
        let url = source.uri.clone();
        let title = source.title.clone();
        match webbrowser::open(&url) {
            Ok(_) => {
                self.link_menu = None;
                self.status_message = format!("Abrindo {title} no navegador.");
            }
            Err(err) => {
                self.status_message = format!("Falha ao abrir {title}: {err} ({url})");
            }
        }
        self.mark_dirty();
    }

    fn save_selected_image(&mut self) -> Result<()> {
        let Some(image) = self.vision.selected_image() else {
            self.status_message = "Nenhuma imagem para salvar.".to_string();
            self.mark_dirty();
            return Ok(());
        };
        let dir = self
            .cfg
            .lab
            .download_dir
            .clone()
            .context("no download directory configured")?;
        let path = preview::save_png(&image.image.bytes, &dir, image.id)?;
        tracing::info!(path = %path.display(), "generated image saved");
        self.status_message = format!("Imagem salva em {}", path.display());
        self.mark_dirty();
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            return Ok(true);
        }
        if ctrl && key.code == KeyCode::Char('k') {
            self.close_transient();
            self.close_modal();
            self.header.focus_search();
            self.mark_dirty();
            return Ok(false);
        }
        match key.code {
            KeyCode::F(1) => {
                self.navigate(NavItem::Home);
                return Ok(false);
            }
            KeyCode::F(2) => {
                self.navigate(NavItem::ChatLab);
                return Ok(false);
            }
            KeyCode::F(3) => {
                self.navigate(NavItem::VisionLab);
                return Ok(false);
            }
            _ => {}
        }

        if self.modal.is_some() {
            return self.handle_modal_key(key);
        }
        if self.link_menu.is_some() {
            return self.handle_link_menu_key(key);
        }
        if self.history.current() == View::Vision && self.vision.notice().is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ')) {
                self.vision.dismiss_notice();
                self.mark_dirty();
            }
            return Ok(false);
        }
        if self.header.is_search_focused() {
            return self.handle_search_key(key);
        }
        if self.header.is_profile_open() || self.topbar.is_profile_open() {
            return self.handle_profile_key(key);
        }
        if self.topbar.is_menu_open() {
            return self.handle_nav_menu_key(key);
        }
        match self.history.current() {
            View::Feed => self.handle_feed_key(key),
            View::Chat => self.handle_chat_key(key),
            View::Vision => self.handle_vision_key(key),
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.close_modal(),
            KeyCode::Left | KeyCode::Char('h') => self.page_modal(false),
            KeyCode::Right | KeyCode::Char('l') => self.page_modal(true),
            KeyCode::Char('o') => {
                if let Some(url) = self.modal.as_ref().and_then(|m| m.current()) {
                    let url = url.to_string();
                    webbrowser::open(&url).with_context(|| format!("open {url}"))?;
                    self.status_message = "Imagem aberta no navegador.".to_string();
                    self.mark_dirty();
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_link_menu_key(&mut self, key: KeyEvent) -> Result<bool> {
        let Some(menu) = self.link_menu.as_mut() else {
            return Ok(false);
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.link_menu = None;
                self.status_message = "Fontes fechadas.".to_string();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                menu.selected = menu.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if menu.selected + 1 < menu.items.len() {
                    menu.selected += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char('o') => {
                let index = menu.selected;
                self.open_link(index);
            }
            _ => {}
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc | KeyCode::Tab => self.header.blur_search(),
            KeyCode::Enter => self.header.submit_search(),
            _ => {
                edit_input(&mut self.header.search, &key);
            }
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_profile_key(&mut self, key: KeyEvent) -> Result<bool> {
        let len = ProfileAction::ALL.len();
        match key.code {
            KeyCode::Esc => {
                self.header.close_profile();
                self.topbar.close_all();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.profile_selected = (self.profile_selected + len - 1) % len;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.profile_selected = (self.profile_selected + 1) % len;
            }
            KeyCode::Enter => {
                let action = ProfileAction::ALL[self.profile_selected % len];
                let action = if self.header.is_profile_open() {
                    self.header.select_profile(action)
                } else {
                    self.topbar.select_profile(action)
                };
                self.run_profile_action(action);
            }
            _ => {}
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_nav_menu_key(&mut self, key: KeyEvent) -> Result<bool> {
        let len = NavItem::ALL.len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('n') => self.topbar.close_all(),
            KeyCode::Up | KeyCode::Char('k') => {
                self.nav_selected = (self.nav_selected + len - 1) % len;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.nav_selected = (self.nav_selected + 1) % len;
            }
            KeyCode::Enter => {
                let item = self.topbar.select_nav(NavItem::ALL[self.nav_selected % len]);
                self.navigate(item);
            }
            _ => {}
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_feed_key(&mut self, key: KeyEvent) -> Result<bool> {
        let selected = self.feed.selected();
        if let Some(card) = self.feed.selected_card_mut() {
            if card.state.is_menu_open() {
                match key.code {
                    KeyCode::Esc | KeyCode::Char('m') => card.state.close_menu(),
                    KeyCode::Up | KeyCode::Char('k') => card.state.move_menu_selection(-1),
                    KeyCode::Down | KeyCode::Char('j') => card.state.move_menu_selection(1),
                    KeyCode::Enter => {
                        if let Some(action) = card.state.select_highlighted() {
                            self.run_card_action(selected, action)?;
                        }
                    }
                    _ => {}
                }
                self.mark_dirty();
                return Ok(false);
            }
        }

        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Left | KeyCode::Char('h') => self.feed.select_previous(),
            KeyCode::Right | KeyCode::Char('l') => self.feed.select_next(),
            KeyCode::Char('[') => {
                self.feed.scroll(ScrollDirection::Left);
            }
            KeyCode::Char(']') => {
                self.feed.scroll(ScrollDirection::Right);
            }
            KeyCode::Char('b') => {
                if let Some(card) = self.feed.selected_card_mut() {
                    let on = card.state.toggle_bookmark();
                    self.status_message = if on {
                        "Publicação salva.".to_string()
                    } else {
                        "Publicação removida dos salvos.".to_string()
                    };
                }
            }
            KeyCode::Char('m') => {
                if let Some(card) = self.feed.selected_card_mut() {
                    card.state.toggle_menu(&self.hub);
                }
            }
            KeyCode::Char('x') => {
                let card_cfg = self.cfg.card.clone();
                if let Some(card) = self.feed.selected_card_mut() {
                    card.state.toggle_expanded(&card.post, &card_cfg);
                }
            }
            KeyCode::Tab => {
                if let Some(card) = self.feed.selected_card_mut() {
                    let tiles = Collage::plan(&card.post.images).tiles();
                    card.state.cycle_tile(&tiles);
                }
            }
            KeyCode::Enter => {
                if let Some(card) = self.feed.selected_card() {
                    let tile = card.state.focused_tile();
                    self.open_modal(selected, tile);
                }
            }
            KeyCode::Char('s') => self.sidebar.toggle_collapsed(),
            KeyCode::Char('n') => self.topbar.toggle_menu(),
            KeyCode::Char('p') => {
                self.profile_selected = 0;
                self.header.toggle_profile(&self.hub);
            }
            KeyCode::Char('c') => self.navigate(NavItem::ChatLab),
            KeyCode::Char('v') => self.navigate(NavItem::VisionLab),
            KeyCode::Backspace => self.back(),
            _ => {}
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_chat_key(&mut self, key: KeyEvent) -> Result<bool> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.back(),
            KeyCode::Char('l') if ctrl => self.open_link_menu(),
            KeyCode::Enter => self.spawn_chat(),
            KeyCode::PageUp => self.chat_scroll = self.chat_scroll.saturating_add(5),
            KeyCode::PageDown => self.chat_scroll = self.chat_scroll.saturating_sub(5),
            _ => {
                if !self.chat.is_loading() {
                    edit_input(&mut self.chat.input, &key);
                }
            }
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_vision_key(&mut self, key: KeyEvent) -> Result<bool> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.back(),
            KeyCode::Char('s') if ctrl => self.save_selected_image()?,
            KeyCode::Tab => {
                if !self.vision.is_loading() {
                    self.vision.cycle_aspect_ratio();
                }
            }
            KeyCode::Up => self.vision.select_newer(),
            KeyCode::Down => self.vision.select_older(),
            KeyCode::Enter => self.spawn_vision(),
            _ => {
                if !self.vision.is_loading() {
                    edit_input(&mut self.vision.input, &key);
                }
            }
        }
        self.mark_dirty();
        Ok(false)
    }

    fn hit_at(&self, point: Point) -> Option<HitTarget> {
        self.hits
            .iter()
            .rev()
            .find(|(rect, _)| point.within(rect))
            .map(|(_, target)| *target)
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Result<()> {
        let point = Point::new(event.column, event.row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.hub.dispatch(point);
                self.feed.sync_menus();
                self.topbar.sync();
                self.header.sync();
                let target = self.hit_at(point);
                if target != Some(HitTarget::Search) {
                    self.header.blur_search();
                }
                if let Some(target) = target {
                    self.activate(target)?;
                }
                self.mark_dirty();
            }
            MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
                let down = event.kind == MouseEventKind::ScrollDown;
                match self.history.current() {
                    View::Feed if self.modal.is_none() => {
                        let direction = if down {
                            ScrollDirection::Right
                        } else {
                            ScrollDirection::Left
                        };
                        self.feed.scroll(direction);
                    }
                    View::Chat => {
                        self.chat_scroll = if down {
                            self.chat_scroll.saturating_sub(1)
                        } else {
                            self.chat_scroll.saturating_add(1)
                        };
                    }
                    _ => {}
                }
                self.mark_dirty();
            }
            _ => {}
        }
        Ok(())
    }

    fn activate(&mut self, target: HitTarget) -> Result<()> {
        match target {
            HitTarget::SidebarToggle => self.sidebar.toggle_collapsed(),
            HitTarget::Nav(item) => self.navigate(item),
            HitTarget::Hamburger => self.topbar.toggle_menu(),
            HitTarget::TopbarAvatar => {
                self.profile_selected = 0;
                self.topbar.toggle_profile(&self.hub);
            }
            HitTarget::TopbarNav(item) => {
                let item = self.topbar.select_nav(item);
                self.navigate(item);
            }
            HitTarget::TopbarProfile(action) => {
                let action = self.topbar.select_profile(action);
                self.run_profile_action(action);
            }
            HitTarget::Backdrop => self.topbar.close_all(),
            HitTarget::Back => self.back(),
            HitTarget::Search => self.header.focus_search(),
            HitTarget::HeaderAvatar => {
                self.profile_selected = 0;
                self.header.toggle_profile(&self.hub);
            }
            HitTarget::HeaderProfile(action) => {
                let action = self.header.select_profile(action);
                self.run_profile_action(action);
            }
            HitTarget::ScrollLeft => {
                self.feed.scroll(ScrollDirection::Left);
            }
            HitTarget::ScrollRight => {
                self.feed.scroll(ScrollDirection::Right);
            }
            HitTarget::Card(index) => self.feed.select(index),
            HitTarget::Tile { card, index } => self.open_modal(card, index),
            HitTarget::Bookmark(index) => {
                self.feed.select(index);
                if let Some(card) = self.feed.card_mut(index) {
                    card.state.toggle_bookmark();
                }
            }
            HitTarget::MenuTrigger(index) => {
                self.feed.select(index);
                if let Some(card) = self.feed.card_mut(index) {
                    card.state.toggle_menu(&self.hub);
                }
            }
            HitTarget::MenuAction { card, action } => {
                let chosen = self
                    .feed
                    .card_mut(card)
                    .and_then(|mounted| mounted.state.select_action(action));
                if let Some(chosen) = chosen {
                    self.run_card_action(card, chosen)?;
                }
            }
            HitTarget::ExpandToggle(index) => {
                self.feed.select(index);
                let card_cfg = self.cfg.card.clone();
                if let Some(card) = self.feed.card_mut(index) {
                    card.state.toggle_expanded(&card.post, &card_cfg);
                }
            }
            HitTarget::ModalBackdrop | HitTarget::ModalClose => self.close_modal(),
            HitTarget::ModalPrevious => self.page_modal(false),
            HitTarget::ModalNext => self.page_modal(true),
            HitTarget::ModalBody | HitTarget::NoticeBody => {}
            HitTarget::ChatSend => self.spawn_chat(),
            HitTarget::Sources => self.open_link_menu(),
            HitTarget::Aspect(ratio) => {
                if !self.vision.is_loading() {
                    self.vision.set_aspect_ratio(ratio);
                }
            }
            HitTarget::Generate => self.spawn_vision(),
            HitTarget::SaveImage => self.save_selected_image()?,
            HitTarget::Gallery(index) => self.vision.select(index),
            HitTarget::NoticeDismiss => self.vision.dismiss_notice(),
            HitTarget::LinkBackdrop => self.link_menu = None,
            HitTarget::Link(index) => self.open_link(index),
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        let layout = screen_layout(full, &self.sidebar, &self.cfg);
        if self.history.current() == View::Feed {
            let rows = feed_layout(layout.content);
            self.feed.scroller_mut().set_viewport(rows[2].width);
            let urls: Vec<String> = self
                .feed
                .scroller()
                .visible()
                .filter_map(|index| self.feed.cards().get(index))
                .flat_map(|card| {
                    let tiles = Collage::plan(&card.post.images).tiles();
                    tiles
                        .into_iter()
                        .filter_map(|tile| card.post.images.get(tile).cloned())
                        .collect::<Vec<_>>()
                })
                .collect();
            for url in urls {
                self.ensure_picture(&url);
            }
        }

        let mut hits = HitMap::new();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);
        self.draw_status(frame, layout.status);
        match layout.mode {
            LayoutMode::Wide => self.draw_sidebar(frame, layout.nav, &mut hits),
            LayoutMode::Narrow => self.draw_topbar(frame, layout.nav, &mut hits),
        }
        self.draw_header(frame, layout.header, &mut hits);
        match self.history.current() {
            View::Feed => self.draw_feed(frame, layout.content, &mut hits),
            View::Chat => self.draw_chat(frame, layout.content, &mut hits),
            View::Vision => self.draw_vision(frame, layout.content, &mut hits),
        }
        self.draw_footer(frame, layout.footer);

        if layout.mode == LayoutMode::Narrow {
            self.draw_topbar_panels(frame, &layout, &mut hits);
        }
        self.draw_header_profile(frame, &layout, &mut hits);
        if self.link_menu.is_some() {
            self.draw_link_menu(frame, layout.content, &mut hits);
        }
        if self.modal.is_some() {
            self.draw_modal(frame, full, &mut hits);
        }
        self.hits = hits;
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
        } else {
            self.status_message.clone()
        };
        let status = Paragraph::new(text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status, area);
    }

    fn footer_text(&self) -> &'static str {
        if self.modal.is_some() {
            return "←/→ navegar · o abrir no navegador · Esc fechar";
        }
        if self.header.is_search_focused() {
            return "digite para buscar · Enter · Esc sair da busca";
        }
        match self.history.current() {
            View::Feed => {
                "h/l card · [/] rolar · Tab imagem · Enter ampliar · b salvar · m menu · x ler mais · c chat · v vision · Ctrl+K busca · q sair"
            }
            View::Chat => "Enter enviar · PgUp/PgDn rolar · Ctrl+L fontes · Esc voltar · Ctrl+C sair",
            View::Vision => {
                "Enter gerar · Tab proporção · ↑/↓ galeria · Ctrl+S salvar PNG · Esc voltar · Ctrl+C sair"
            }
        }
    }

    fn draw_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, area);
    }

    fn draw_sidebar(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut HitMap) {
        let block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let collapsed = self.sidebar.is_collapsed();
        let toggle = if collapsed { "»" } else { "«" };
        let toggle_rect = Rect::new(inner.right().saturating_sub(3), inner.y, 3.min(inner.width), 1);
        if !collapsed {
            let logo = Paragraph::new(Span::styled(
                " thoth",
                Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD),
            ));
            frame.render_widget(logo, Rect::new(inner.x, inner.y, inner.width, 1));
        }
        frame.render_widget(
            Paragraph::new(Span::styled(toggle, Style::default().fg(COLOR_TEXT_SECONDARY)))
                .alignment(Alignment::Center),
            toggle_rect,
        );
        hits.push((toggle_rect, HitTarget::SidebarToggle));

        let mut y = inner.y + 2;
        let mut labs_heading = false;
        for item in NavItem::ALL {
            if item.is_lab() && !labs_heading {
                labs_heading = true;
                y += 1;
                if y >= inner.bottom() {
                    break;
                }
                if !collapsed {
                    frame.render_widget(
                        Paragraph::new(Span::styled(
                            " LABS",
                            Style::default()
                                .fg(COLOR_TEXT_SECONDARY)
                                .add_modifier(Modifier::BOLD),
                        )),
                        Rect::new(inner.x, y, inner.width, 1),
                    );
                }
                y += 1;
            }
            if y >= inner.bottom() {
                break;
            }
            let row = Rect::new(inner.x, y, inner.width, 1);
            let active = self.sidebar.active() == item;
            let style = if active {
                Style::default()
                    .fg(COLOR_BRAND)
                    .bg(COLOR_PANEL_SELECTED_BG)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            };
            let text = if collapsed {
                format!("  {}", item.icon())
            } else {
                let marker = if active { "▎" } else { " " };
                format!("{marker}{}  {}", item.icon(), item.label())
            };
            frame.render_widget(Paragraph::new(text).style(style), row);
            hits.push((row, HitTarget::Nav(item)));
            y += 2;
        }
    }

    fn draw_topbar(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut HitMap) {
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }
        let avatar = topbar_avatar_rect(area);
        let row = Rect::new(inner.x, avatar.y, inner.width, 1);

        let burger = Rect::new(row.x, row.y, 4.min(row.width), 1);
        let glyph = if self.topbar.is_menu_open() { " ✕" } else { " ☰" };
        frame.render_widget(
            Paragraph::new(Span::styled(glyph, Style::default().fg(COLOR_TEXT_PRIMARY))),
            burger,
        );
        hits.push((burger, HitTarget::Hamburger));

        frame.render_widget(
            Paragraph::new(Span::styled(
                "thoth",
                Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            row,
        );

        let avatar_style = if self.topbar.is_profile_open() {
            Style::default().fg(COLOR_BG).bg(COLOR_BRAND)
        } else {
            Style::default().fg(COLOR_BRAND)
        };
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("({})", initials(self.header.user_name())),
                avatar_style.add_modifier(Modifier::BOLD),
            )),
            avatar,
        );
        self.topbar.profile().set_regions(vec![avatar]);
        hits.push((avatar, HitTarget::TopbarAvatar));
    }

    fn draw_topbar_panels(&self, frame: &mut Frame<'_>, layout: &ScreenLayout, hits: &mut HitMap) {
        if !self.topbar.has_backdrop() {
            return;
        }
        let below = Rect::new(
            layout.nav.x,
            layout.nav.bottom(),
            layout.nav.width,
            layout.footer.y.saturating_sub(layout.nav.bottom()),
        );
        frame.render_widget(
            Block::default().style(Style::default().bg(COLOR_PANEL_BG).fg(COLOR_TEXT_SECONDARY)),
            below,
        );
        hits.push((below, HitTarget::Backdrop));

        if self.topbar.is_menu_open() {
            let height = (NavItem::ALL.len() as u16 + 3).min(below.height);
            let panel = Rect::new(below.x, below.y, below.width, height);
            frame.render_widget(Clear, panel);
            let block = Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(COLOR_BORDER_IDLE))
                .style(Style::default().bg(COLOR_PANEL_FOCUSED_BG));
            let inner = block.inner(panel);
            frame.render_widget(block, panel);
            if inner.height > 0 {
                frame.render_widget(
                    Paragraph::new(Span::styled(
                        "  NAVEGAÇÃO",
                        Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD),
                    )),
                    Rect::new(inner.x, inner.y, inner.width, 1),
                );
            }
            for (i, item) in NavItem::ALL.iter().enumerate() {
                let y = inner.y + 1 + i as u16;
                if y >= inner.bottom() {
                    break;
                }
                let row = Rect::new(inner.x, y, inner.width, 1);
                let highlighted = i == self.nav_selected % NavItem::ALL.len();
                let active = self.sidebar.active() == *item;
                let mut style = Style::default().fg(if active {
                    COLOR_BRAND
                } else {
                    COLOR_TEXT_PRIMARY
                });
                if highlighted {
                    style = style.bg(COLOR_PANEL_SELECTED_BG).add_modifier(Modifier::BOLD);
                }
                let dot = if active { "  •" } else { "" };
                frame.render_widget(
                    Paragraph::new(format!("  {}  {}{dot}", item.icon(), item.label())).style(style),
                    row,
                );
                hits.push((row, HitTarget::TopbarNav(*item)));
            }
        }

        if self.topbar.is_profile_open() {
            let anchor = topbar_avatar_rect(layout.nav);
            let popup = popup_below(
                Rect::new(anchor.x, layout.nav.y, anchor.width, layout.nav.height),
                PROFILE_MENU_WIDTH,
                ProfileAction::ALL.len() as u16 + 3,
                below,
                true,
            );
            self.draw_profile_menu(frame, popup, hits, HitTarget::TopbarProfile);
            self.topbar.profile().set_regions(vec![anchor, popup]);
        }
    }

    fn draw_profile_menu(
        &self,
        frame: &mut Frame<'_>,
        popup: Rect,
        hits: &mut HitMap,
        target: fn(ProfileAction) -> HitTarget,
    ) {
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);
        if inner.height == 0 {
            return;
        }
        frame.render_widget(
            Paragraph::new(Span::styled(
                " MINHA CONTA",
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Rect::new(inner.x, inner.y, inner.width, 1),
        );
        for (i, action) in ProfileAction::ALL.iter().enumerate() {
            let y = inner.y + 1 + i as u16;
            if y >= inner.bottom() {
                break;
            }
            let row = Rect::new(inner.x, y, inner.width, 1);
            let mut style = if *action == ProfileAction::Logout {
                Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            };
            if i == self.profile_selected % ProfileAction::ALL.len() {
                style = style.bg(COLOR_PANEL_SELECTED_BG);
            }
            frame.render_widget(Paragraph::new(format!(" {}", action.label())).style(style), row);
            hits.push((row, target(*action)));
        }
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut HitMap) {
        let messages = self.header.messages_badge();
        let notifications = self.header.notifications_badge();
        let badge_width = |icon: &str, badge: &Option<String>| {
            icon.width() as u16 + badge.as_ref().map(|b| b.width() as u16 + 1).unwrap_or(0) + 2
        };
        let actions_width = badge_width("✉", &messages) + badge_width("♪", &notifications);
        let name = self.header.user_name();
        let avatar_width = (name.width() as u16 + 8).min(area.width / 3);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(5),
                Constraint::Min(10),
                Constraint::Length(actions_width),
                Constraint::Length(avatar_width),
            ])
            .split(area);

        let back = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE));
        frame.render_widget(
            Paragraph::new(Span::styled("‹", Style::default().fg(COLOR_TEXT_PRIMARY)))
                .alignment(Alignment::Center)
                .block(back),
            cols[0],
        );
        hits.push((cols[0], HitTarget::Back));

        let focused = self.header.is_search_focused();
        let search_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(if focused {
                COLOR_BRAND
            } else {
                COLOR_BORDER_IDLE
            }));
        let search_inner = search_block.inner(cols[1]);
        frame.render_widget(search_block, cols[1]);
        let hint = "Ctrl K";
        let text_width = search_inner.width.saturating_sub(hint.width() as u16 + 1);
        let line = if self.header.search.as_str().is_empty() && !focused {
            Line::from(Span::styled(
                SEARCH_PLACEHOLDER,
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))
        } else {
            let (visible, cursor) = input_window(&self.header.search, text_width);
            if focused {
                frame.set_cursor(search_inner.x + cursor, search_inner.y);
            }
            Line::from(Span::styled(visible, Style::default().fg(COLOR_TEXT_PRIMARY)))
        };
        frame.render_widget(
            Paragraph::new(line),
            Rect::new(search_inner.x, search_inner.y, text_width, search_inner.height),
        );
        frame.render_widget(
            Paragraph::new(Span::styled(hint, Style::default().fg(COLOR_BORDER_IDLE)))
                .alignment(Alignment::Right),
            search_inner,
        );
        hits.push((cols[1], HitTarget::Search));

        let mut spans = Vec::new();
        for (icon, badge) in [("✉", messages), ("♪", notifications)] {
            spans.push(Span::styled(
                format!(" {icon}"),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            ));
            if let Some(badge) = badge {
                spans.push(Span::styled(
                    badge,
                    Style::default()
                        .fg(Color::White)
                        .bg(COLOR_BADGE)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            spans.push(Span::raw(" "));
        }
        let actions_row = Rect::new(cols[2].x, cols[2].y + 1, cols[2].width, 1);
        frame.render_widget(Paragraph::new(Line::from(spans)), actions_row);

        let open = self.header.is_profile_open();
        let avatar_style = if open {
            Style::default().fg(COLOR_BRAND).bg(COLOR_PANEL_SELECTED_BG)
        } else {
            Style::default().fg(COLOR_TEXT_PRIMARY)
        };
        let avatar_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(if open { COLOR_BRAND } else { COLOR_BORDER_IDLE }));
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(
                    format!("{} ", initials(name)),
                    Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD),
                ),
                Span::styled(name.to_string(), avatar_style),
                Span::styled(" ▾", avatar_style),
            ]))
            .block(avatar_block),
            cols[3],
        );
        hits.push((cols[3], HitTarget::HeaderAvatar));
        self.header.profile().set_regions(vec![cols[3]]);
    }

    fn draw_header_profile(&self, frame: &mut Frame<'_>, layout: &ScreenLayout, hits: &mut HitMap) {
        if !self.header.is_profile_open() {
            return;
        }
        let anchor = header_avatar_rect(layout.header, self.header.user_name());
        let bounds = Rect::new(
            layout.content.x,
            layout.header.y,
            layout.content.width,
            layout.footer.y.saturating_sub(layout.header.y),
        );
        let popup = popup_below(
            anchor,
            PROFILE_MENU_WIDTH,
            ProfileAction::ALL.len() as u16 + 3,
            bounds,
            true,
        );
        self.draw_profile_menu(frame, popup, hits, HitTarget::HeaderProfile);
        self.header.profile().set_regions(vec![anchor, popup]);
    }

    fn draw_feed(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut HitMap) {
        let [welcome, title, cards_area, credit] = feed_layout(area);

        let greeting = vec![
            Line::from(Span::styled(
                format!("Bem-vindo, {}", self.header.first_name()),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Confira o que há de novo na Thoth.",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ];
        frame.render_widget(Paragraph::new(greeting), welcome);

        let scroller = self.feed.scroller();
        frame.render_widget(
            Paragraph::new(Span::styled(
                self.feed.title.clone(),
                Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
            )),
            title,
        );
        let arrow_style = |enabled: bool| {
            if enabled {
                Style::default().fg(COLOR_TEXT_PRIMARY).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_BORDER_IDLE)
            }
        };
        let left = Rect::new(title.right().saturating_sub(6), title.y, 3.min(title.width), 1);
        let right = Rect::new(title.right().saturating_sub(3), title.y, 3.min(title.width), 1);
        frame.render_widget(
            Paragraph::new(Span::styled(
                " ◀ ",
                arrow_style(scroller.can_scroll(ScrollDirection::Left)),
            )),
            left,
        );
        frame.render_widget(
            Paragraph::new(Span::styled(
                " ▶ ",
                arrow_style(scroller.can_scroll(ScrollDirection::Right)),
            )),
            right,
        );
        hits.push((left, HitTarget::ScrollLeft));
        hits.push((right, HitTarget::ScrollRight));

        if self.feed.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "Nenhuma publicação por aqui.",
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                )),
                cards_area,
            );
        }

        let offset = scroller.offset();
        let card_width = self.cfg.feed.card_width;
        for index in scroller.visible() {
            let start = scroller.card_start(index).saturating_sub(offset);
            let x = cards_area.x.saturating_add(start as u16);
            if x >= cards_area.right() {
                break;
            }
            let width = card_width.min(cards_area.right() - x);
            let rect = Rect::new(x, cards_area.y, width, cards_area.height);
            self.draw_card(frame, index, rect, hits);
        }

        if let Some(index) = self.feed.open_menu_index() {
            self.draw_card_menu(frame, index, cards_area, hits);
        }

        frame.render_widget(
            Paragraph::new(Span::styled(
                "THOTH CREATIVE SUITE • 2024",
                Style::default().fg(COLOR_BORDER_IDLE).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            credit,
        );
    }

    fn draw_card(&self, frame: &mut Frame<'_>, index: usize, area: Rect, hits: &mut HitMap) {
        let Some(card) = self.feed.cards().get(index) else {
            return;
        };
        let post = &card.post;
        let state = &card.state;
        let selected = index == self.feed.selected();
        let border = if selected { COLOR_ACCENT } else { COLOR_BORDER_IDLE };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(if selected {
                COLOR_PANEL_FOCUSED_BG
            } else {
                COLOR_PANEL_BG
            }));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        hits.push((area, HitTarget::Card(index)));
        if inner.width < 4 || inner.height < 3 {
            return;
        }

        let card_cfg = &self.cfg.card;
        let long = card::is_long_text(&post.content, card_cfg.truncate_threshold);
        let expanded = state.is_expanded();
        let collage = Collage::plan(&post.images);
        let text_style = Style::default().fg(COLOR_TEXT_PRIMARY);
        let text = if expanded {
            wrap_plain(&post.content, inner.width, text_style)
        } else {
            clamp_text(&post.content, inner.width, card_cfg.clamp_lines, text_style)
        };
        let show_tags = !expanded && !post.tags.is_empty();
        let collage_height = if collage.is_empty() {
            0
        } else {
            card_cfg.collage_height
        };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(text.len() as u16),
                Constraint::Length(u16::from(long)),
                Constraint::Length(collage_height),
                Constraint::Length(u16::from(show_tags)),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        let controls_width = 5u16.min(rows[0].width);
        let author_area = Rect::new(
            rows[0].x,
            rows[0].y,
            rows[0].width.saturating_sub(controls_width),
            rows[0].height,
        );
        let mut name_spans = vec![Span::styled(
            post.author.name.clone(),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        )];
        if post.author.verified {
            name_spans.push(Span::styled(" ✓", Style::default().fg(COLOR_ACCENT)));
        }
        let author = vec![
            Line::from(name_spans),
            Line::from(Span::styled(
                format!("@{} · {}", post.author.username, post.timestamp),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ];
        frame.render_widget(Paragraph::new(author), author_area);

        let bookmark = Rect::new(author_area.right(), rows[0].y, 2.min(controls_width), 1);
        let trigger = Rect::new(
            author_area.right() + bookmark.width,
            rows[0].y,
            controls_width.saturating_sub(bookmark.width),
            1,
        );
        let bookmark_span = if state.is_bookmarked() {
            Span::styled("★ ", Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD))
        } else {
            Span::styled("☆ ", Style::default().fg(COLOR_TEXT_SECONDARY))
        };
        frame.render_widget(Paragraph::new(bookmark_span), bookmark);
        let trigger_style = if state.is_menu_open() {
            Style::default().fg(COLOR_ACCENT).bg(COLOR_PANEL_SELECTED_BG)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        frame.render_widget(Paragraph::new(Span::styled("⋯", trigger_style)), trigger);
        hits.push((bookmark, HitTarget::Bookmark(index)));
        hits.push((trigger, HitTarget::MenuTrigger(index)));

        frame.render_widget(Paragraph::new(text), rows[1]);

        if long {
            let label = if expanded { "Ver menos" } else { "Ler mais" };
            frame.render_widget(
                Paragraph::new(Span::styled(
                    label,
                    Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD),
                )),
                rows[2],
            );
            hits.push((rows[2], HitTarget::ExpandToggle(index)));
        }

        if collage_height > 0 {
            let focused_tile = selected.then(|| state.focused_tile());
            self.draw_collage(frame, index, post, &collage, focused_tile, rows[3], hits);
        }

        if show_tags {
            let strip = card::tag_strip(&post.tags, card_cfg.tag_cap);
            let mut spans = Vec::new();
            for tag in strip.shown {
                spans.push(Span::styled(
                    format!("#{tag}"),
                    Style::default().fg(COLOR_ACCENT).bg(COLOR_PANEL_SELECTED_BG),
                ));
                spans.push(Span::raw(" "));
            }
            if let Some(indicator) = strip.indicator() {
                spans.push(Span::styled(
                    indicator,
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ));
            }
            frame.render_widget(Paragraph::new(Line::from(spans)), rows[4]);
        }

        let mut stats = vec![
            Span::styled(
                format!("♥ {}", compact_count(post.likes)),
                Style::default().fg(COLOR_ERROR),
            ),
            Span::raw("  "),
            Span::styled(
                format!("💬 {}", compact_count(post.replies)),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        ];
        if let Some(count) = post.item_count.as_ref() {
            stats.push(Span::raw("  "));
            stats.push(Span::styled(
                count.clone(),
                Style::default().fg(COLOR_SUCCESS),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(stats)), rows[5]);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_collage(
        &self,
        frame: &mut Frame<'_>,
        card_index: usize,
        post: &Post,
        collage: &Collage,
        focused_tile: Option<usize>,
        area: Rect,
        hits: &mut HitMap,
    ) {
        match collage {
            Collage::Empty => {}
            Collage::Single => {
                self.draw_tile(frame, &post.images[0], area, focused_tile == Some(0), None);
                hits.push((area, HitTarget::Tile { card: card_index, index: 0 }));
            }
            Collage::Grid { cells } => {
                let halves = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
                    .split(area);
                self.draw_tile(frame, &post.images[0], halves[0], focused_tile == Some(0), None);
                hits.push((halves[0], HitTarget::Tile { card: card_index, index: 0 }));

                let grid_rows = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
                    .split(halves[1]);
                let mut slots = Vec::with_capacity(cells.len());
                for row in grid_rows.iter() {
                    let pair = Layout::default()
                        .direction(Direction::Horizontal)
                        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
                        .split(*row);
                    slots.push(pair[0]);
                    slots.push(pair[1]);
                }
                for (cell, slot) in cells.iter().zip(slots) {
                    match cell {
                        CollageCell::Image { index, badge } => {
                            let Some(url) = post.images.get(*index) else {
                                continue;
                            };
                            self.draw_tile(frame, url, slot, focused_tile == Some(*index), *badge);
                            hits.push((slot, HitTarget::Tile { card: card_index, index: *index }));
                        }
                        CollageCell::Placeholder => {
                            frame.render_widget(
                                Block::default()
                                    .borders(Borders::ALL)
                                    .border_style(Style::default().fg(COLOR_BORDER_IDLE))
                                    .style(Style::default().bg(COLOR_BG)),
                                slot,
                            );
                        }
                    }
                }
            }
        }
    }

    fn draw_tile(
        &self,
        frame: &mut Frame<'_>,
        url: &str,
        area: Rect,
        focused: bool,
        badge: Option<usize>,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused {
                COLOR_BRAND
            } else {
                COLOR_BORDER_IDLE
            }));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.width == 0 || inner.height == 0 {
            return;
        }
        match self.pictures.get(url) {
            Some(PictureSlot::Ready(picture)) => {
                frame.render_widget(Paragraph::new(picture.render(inner.width, inner.height)), inner);
            }
            slot => {
                let label = match slot {
                    Some(PictureSlot::Loading) => "…".to_string(),
                    Some(PictureSlot::Failed(_)) => "✕".to_string(),
                    _ => preview::image_label(url),
                };
                frame.render_widget(
                    Paragraph::new(Span::styled(label, Style::default().fg(COLOR_TEXT_SECONDARY)))
                        .alignment(Alignment::Center)
                        .wrap(Wrap { trim: true }),
                    inner,
                );
            }
        }
        if let Some(extra) = badge {
            let text = format!(" +{extra} ");
            let width = (text.width() as u16).min(inner.width);
            let badge_area = Rect::new(
                inner.x + (inner.width - width) / 2,
                inner.y + inner.height / 2,
                width,
                1,
            );
            frame.render_widget(
                Paragraph::new(Span::styled(
                    text,
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::Black)
                        .add_modifier(Modifier::BOLD),
                )),
                badge_area,
            );
        }
    }

    fn draw_card_menu(&self, frame: &mut Frame<'_>, index: usize, bounds: Rect, hits: &mut HitMap) {
        let Some(card) = self.feed.cards().get(index) else {
            return;
        };
        let Some(trigger) = self
            .hits_for(hits, HitTarget::MenuTrigger(index))
        else {
            return;
        };
        let popup = popup_below(
            trigger,
            MENU_WIDTH,
            CardAction::ALL.len() as u16 + 2,
            bounds,
            true,
        );
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);
        for (i, action) in CardAction::ALL.iter().enumerate() {
            let y = inner.y + i as u16;
            if y >= inner.bottom() {
                break;
            }
            let row = Rect::new(inner.x, y, inner.width, 1);
            let mut style = if action.is_destructive() {
                Style::default().fg(COLOR_ERROR)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            };
            if i == card.state.menu_selected() {
                style = style.bg(COLOR_PANEL_SELECTED_BG).add_modifier(Modifier::BOLD);
            }
            frame.render_widget(Paragraph::new(format!(" {}", action.label())).style(style), row);
            hits.push((row, HitTarget::MenuAction { card: index, action: i }));
        }
        card.state.menu().set_regions(vec![trigger, popup]);
    }

    fn hits_for(&self, hits: &HitMap, target: HitTarget) -> Option<Rect> {
        hits.iter()
            .rev()
            .find(|(_, candidate)| *candidate == target)
            .map(|(rect, _)| *rect)
    }

    fn draw_chat(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut HitMap) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(area);

        let log_block = Block::default()
            .title(Span::styled(
                " Lumina Chat ",
                Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let log_inner = log_block.inner(rows[0]);
        frame.render_widget(log_block, rows[0]);

        let width = log_inner.width.saturating_sub(2);
        let mut lines: Vec<Line<'static>> = Vec::new();
        for message in self.chat.messages() {
            let (who, color) = match message.role {
                Role::User => ("Você", COLOR_ACCENT),
                Role::Assistant => ("Lumina", COLOR_BRAND),
            };
            lines.push(Line::from(vec![
                Span::styled(who, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  {}", message.timestamp.with_timezone(&chrono::Local).format("%H:%M")),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
            ]));
            let body = if message.is_error {
                wrap_plain(&message.content, width, Style::default().fg(COLOR_ERROR))
            } else if message.role == Role::Assistant {
                markdown::render(&message.content, width)
            } else {
                wrap_plain(&message.content, width, Style::default().fg(COLOR_TEXT_PRIMARY))
            };
            lines.extend(body);
            if !message.sources.is_empty() {
                lines.push(Line::from(Span::styled(
                    "Fontes:",
                    Style::default()
                        .fg(COLOR_TEXT_SECONDARY)
                        .add_modifier(Modifier::BOLD),
                )));
                for (i, source) in message.sources.iter().enumerate() {
                    lines.push(Line::from(Span::styled(
                        format!("  [{}] {}", i + 1, source.title),
                        Style::default().fg(COLOR_ACCENT),
                    )));
                }
            }
            lines.push(Line::default());
        }
        if self.chat.is_loading() {
            lines.push(Line::from(Span::styled(
                format!("{} Lumina está pensando…", self.spinner.frame()),
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        let height = log_inner.height as usize;
        let max_scroll = lines.len().saturating_sub(height);
        let scroll = self.chat_scroll.min(max_scroll);
        let start = lines.len().saturating_sub(height + scroll);
        let visible: Vec<Line<'static>> = lines.into_iter().skip(start).take(height).collect();
        let padded = Rect::new(
            log_inner.x + 1,
            log_inner.y,
            log_inner.width.saturating_sub(2),
            log_inner.height,
        );
        frame.render_widget(Paragraph::new(visible), padded);

        let has_sources = !self.chat.latest_sources().is_empty();
        let input_cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(10),
                Constraint::Length(10),
                Constraint::Length(if has_sources { 10 } else { 0 }),
            ])
            .split(rows[1]);
        self.draw_input(
            frame,
            &self.chat.input,
            input_cols[0],
            "Pergunte qualquer coisa…",
            !self.chat.is_loading(),
        );
        let send_style = if self.chat.is_loading() || self.chat.input.is_blank() {
            Style::default().fg(COLOR_BORDER_IDLE)
        } else {
            Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD)
        };
        frame.render_widget(
            Paragraph::new(Span::styled("Enviar", send_style))
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .border_style(Style::default().fg(COLOR_BORDER_IDLE)),
                ),
            input_cols[1],
        );
        hits.push((input_cols[1], HitTarget::ChatSend));
        if has_sources {
            frame.render_widget(
                Paragraph::new(Span::styled("Fontes", Style::default().fg(COLOR_ACCENT)))
                    .alignment(Alignment::Center)
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded)
                            .border_style(Style::default().fg(COLOR_BORDER_IDLE)),
                    ),
                input_cols[2],
            );
            hits.push((input_cols[2], HitTarget::Sources));
        }
    }

    fn draw_input(
        &self,
        frame: &mut Frame<'_>,
        input: &InputLine,
        area: Rect,
        placeholder: &str,
        enabled: bool,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(if enabled {
                COLOR_ACCENT
            } else {
                COLOR_BORDER_IDLE
            }));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.width == 0 || inner.height == 0 {
            return;
        }
        let focused = enabled
            && self.modal.is_none()
            && self.link_menu.is_none()
            && !self.header.is_search_focused();
        if input.as_str().is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    placeholder.to_string(),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                )),
                inner,
            );
            if focused {
                frame.set_cursor(inner.x, inner.y);
            }
            return;
        }
        let (visible, cursor) = input_window(input, inner.width);
        let style = if enabled {
            Style::default().fg(COLOR_TEXT_PRIMARY)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        frame.render_widget(Paragraph::new(Span::styled(visible, style)), inner);
        if focused {
            frame.set_cursor(inner.x + cursor, inner.y);
        }
    }

    fn draw_vision(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut HitMap) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(cols[0]);

        frame.render_widget(
            Paragraph::new(Span::styled(
                "Lumina Vision",
                Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD),
            )),
            left[0],
        );
        let loading = self.vision.is_loading();
        self.draw_input(
            frame,
            &self.vision.input,
            left[1],
            "Descreva a imagem que você imagina…",
            !loading,
        );

        let mut x = left[2].x;
        let y = left[2].y;
        for ratio in AspectRatio::ALL {
            let label = format!(" {} ", ratio.as_str());
            let width = label.width() as u16;
            if x + width > left[2].right() {
                break;
            }
            let rect = Rect::new(x, y, width, 1);
            let style = if ratio == self.vision.aspect_ratio() {
                Style::default()
                    .fg(COLOR_BG)
                    .bg(COLOR_BRAND)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_SECONDARY).bg(COLOR_PANEL_BG)
            };
            frame.render_widget(Paragraph::new(Span::styled(label, style)), rect);
            hits.push((rect, HitTarget::Aspect(ratio)));
            x += width + 1;
        }

        let buttons = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(left[3]);
        let generate_label = if loading {
            format!("{} Gerando…", self.spinner.frame())
        } else {
            "Gerar imagem".to_string()
        };
        let generate_style = if loading || self.vision.input.is_blank() {
            Style::default().fg(COLOR_BORDER_IDLE)
        } else {
            Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD)
        };
        let button_block = || {
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(COLOR_BORDER_IDLE))
        };
        frame.render_widget(
            Paragraph::new(Span::styled(generate_label, generate_style))
                .alignment(Alignment::Center)
                .block(button_block()),
            buttons[0],
        );
        hits.push((buttons[0], HitTarget::Generate));
        if self.vision.selected_image().is_some() {
            frame.render_widget(
                Paragraph::new(Span::styled("Salvar PNG", Style::default().fg(COLOR_ACCENT)))
                    .alignment(Alignment::Center)
                    .block(button_block()),
                buttons[1],
            );
            hits.push((buttons[1], HitTarget::SaveImage));
        }

        let images: Vec<_> = self.vision.images().rev().collect();
        let mut lines = Vec::new();
        let mut rows = Vec::new();
        for entry in self.vision.entries().iter().rev() {
            match entry {
                VisionEntry::Image(image) => {
                    let position = images.iter().position(|candidate| candidate.id == image.id);
                    let selected = position == Some(self.vision.selected());
                    let style = if selected {
                        Style::default()
                            .fg(COLOR_TEXT_PRIMARY)
                            .bg(COLOR_PANEL_SELECTED_BG)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(COLOR_TEXT_PRIMARY)
                    };
                    rows.push(position);
                    lines.push(Line::from(vec![
                        Span::styled(
                            format!("{} ", image.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S")),
                            Style::default().fg(COLOR_BRAND),
                        ),
                        Span::styled(image.prompt.clone(), style),
                        Span::styled(
                            format!("  {}", image.aspect_ratio.as_str()),
                            Style::default().fg(COLOR_TEXT_SECONDARY),
                        ),
                    ]));
                }
                VisionEntry::Failure { prompt, message, .. } => {
                    rows.push(None);
                    lines.push(Line::from(vec![
                        Span::styled("✕ ", Style::default().fg(COLOR_ERROR)),
                        Span::styled(prompt.clone(), Style::default().fg(COLOR_TEXT_SECONDARY)),
                        Span::styled(format!("  {message}"), Style::default().fg(COLOR_ERROR)),
                    ]));
                }
            }
        }
        let history_block = Block::default()
            .title(" Histórico ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE));
        let history_inner = history_block.inner(left[4]);
        frame.render_widget(history_block, left[4]);
        for (i, position) in rows.iter().enumerate() {
            let y = history_inner.y + i as u16;
            if y >= history_inner.bottom() {
                break;
            }
            if let Some(position) = position {
                hits.push((
                    Rect::new(history_inner.x, y, history_inner.width, 1),
                    HitTarget::Gallery(*position),
                ));
            }
        }
        frame.render_widget(Paragraph::new(lines), history_inner);

        let canvas_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let canvas = canvas_block.inner(cols[1]);
        frame.render_widget(canvas_block, cols[1]);
        match self.vision.selected_image() {
            Some(image) => match self.vision_pictures.get(&image.id) {
                Some(picture) => {
                    let (w, h) = picture.fit(canvas.width, canvas.height);
                    let rect = Rect::new(
                        canvas.x + (canvas.width - w) / 2,
                        canvas.y + (canvas.height - h) / 2,
                        w,
                        h,
                    );
                    frame.render_widget(Paragraph::new(picture.render(w, h)), rect);
                }
                None => {
                    frame.render_widget(
                        Paragraph::new(image.prompt.clone())
                            .alignment(Alignment::Center)
                            .wrap(Wrap { trim: true }),
                        canvas,
                    );
                }
            },
            None => {
                let hint = if loading {
                    "Criando sua imagem…"
                } else {
                    "Suas criações aparecem aqui."
                };
                frame.render_widget(
                    Paragraph::new(Span::styled(hint, Style::default().fg(COLOR_TEXT_SECONDARY)))
                        .alignment(Alignment::Center),
                    Rect::new(canvas.x, canvas.y + canvas.height / 2, canvas.width, 1),
                );
            }
        }

        if let Some(notice) = self.vision.notice() {
            self.draw_notice(frame, area, notice, hits);
        }
    }

    fn draw_notice(&self, frame: &mut Frame<'_>, area: Rect, notice: &str, hits: &mut HitMap) {
        hits.push((area, HitTarget::NoticeBody));
        let popup = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .title(Span::styled(
                " Aviso ",
                Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_ERROR))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);
        let body = Rect::new(inner.x, inner.y, inner.width, inner.height.saturating_sub(1));
        frame.render_widget(
            Paragraph::new(notice.to_string())
                .style(Style::default().fg(COLOR_TEXT_PRIMARY))
                .wrap(Wrap { trim: true }),
            body,
        );
        if inner.height > 0 {
            let ok = Rect::new(
                inner.x + inner.width.saturating_sub(6) / 2,
                inner.bottom() - 1,
                6.min(inner.width),
                1,
            );
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "  OK  ",
                    Style::default().fg(COLOR_BG).bg(COLOR_BRAND),
                )),
                ok,
            );
            hits.push((ok, HitTarget::NoticeDismiss));
        }
    }

    fn draw_link_menu(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut HitMap) {
        let Some(menu) = self.link_menu.as_ref() else {
            return;
        };
        hits.push((area, HitTarget::LinkBackdrop));
        let popup = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .title(Span::styled(
                " Fontes ",
                Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);
        hits.push((popup, HitTarget::ModalBody));
        for (i, source) in menu.items.iter().enumerate() {
            let y = inner.y + (i as u16) * 2;
            if y + 1 >= inner.bottom() {
                break;
            }
            let selected = i == menu.selected;
            let title_style = if selected {
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .bg(COLOR_PANEL_SELECTED_BG)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            };
            let marker = if selected { "▶ " } else { "  " };
            let rect = Rect::new(inner.x, y, inner.width, 2);
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(Span::styled(format!("{marker}{}", source.title), title_style)),
                    Line::from(Span::styled(
                        format!("  {}", source.uri),
                        Style::default().fg(COLOR_ACCENT),
                    )),
                ]),
                rect,
            );
            hits.push((rect, HitTarget::Link(i)));
        }
    }

    fn draw_modal(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut HitMap) {
        let Some(modal) = self.modal.as_ref() else {
            return;
        };
        hits.push((area, HitTarget::ModalBackdrop));
        let popup = centered_rect(80, 80, area);
        frame.render_widget(Clear, popup);
        let url = modal.current().unwrap_or_default();
        let title = format!(
            " {} / {} · {} ",
            modal.current_index() + 1,
            modal.len(),
            preview::image_label(url)
        );
        let block = Block::default()
            .title(Span::styled(
                title,
                Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_BG));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);
        hits.push((popup, HitTarget::ModalBody));
        if inner.width < 8 || inner.height < 2 {
            return;
        }

        let close = Rect::new(popup.right().saturating_sub(5), popup.y, 3, 1);
        frame.render_widget(
            Paragraph::new(Span::styled(" ✕ ", Style::default().fg(COLOR_ERROR))),
            close,
        );
        hits.push((close, HitTarget::ModalClose));

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(inner);
        let arrow = |enabled: bool| {
            if enabled {
                Style::default().fg(COLOR_TEXT_PRIMARY).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_BORDER_IDLE)
            }
        };
        let mid = inner.y + inner.height / 2;
        let prev = Rect::new(cols[0].x, mid, cols[0].width, 1);
        let next = Rect::new(cols[2].x, mid, cols[2].width, 1);
        frame.render_widget(
            Paragraph::new(Span::styled(" ◀ ", arrow(modal.current_index() > 0))),
            prev,
        );
        frame.render_widget(
            Paragraph::new(Span::styled(
                " ▶ ",
                arrow(modal.current_index() + 1 < modal.len()),
            )),
            next,
        );
        hits.push((cols[0], HitTarget::ModalPrevious));
        hits.push((cols[2], HitTarget::ModalNext));

        let canvas = cols[1];
        match self.pictures.get(url) {
            Some(PictureSlot::Ready(picture)) => {
                let (w, h) = picture.fit(canvas.width, canvas.height);
                let rect = Rect::new(
                    canvas.x + (canvas.width - w) / 2,
                    canvas.y + (canvas.height - h) / 2,
                    w,
                    h,
                );
                frame.render_widget(Paragraph::new(picture.render(w, h)), rect);
            }
            Some(PictureSlot::Failed(err)) => {
                frame.render_widget(
                    Paragraph::new(vec![
                        Line::from(Span::styled(
                            "Não foi possível carregar a imagem.",
                            Style::default().fg(COLOR_ERROR),
                        )),
                        Line::from(Span::styled(
                            err.clone(),
                            Style::default().fg(COLOR_TEXT_SECONDARY),
                        )),
                    ])
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true }),
                    Rect::new(canvas.x, mid.saturating_sub(1), canvas.width, 3),
                );
            }
            _ => {
                let text = if self.fetch_images {
                    format!("{} Carregando…", self.spinner.frame())
                } else {
                    url.to_string()
                };
                frame.render_widget(
                    Paragraph::new(Span::styled(text, Style::default().fg(COLOR_TEXT_SECONDARY)))
                        .alignment(Alignment::Center),
                    Rect::new(canvas.x, mid, canvas.width, 1),
                );
            }
        }
    }
}

/// Avatar cell of the narrow top bar.
fn topbar_avatar_rect(nav: Rect) -> Rect {
    let inner_height = nav.height.saturating_sub(1);
    let width = 6.min(nav.width);
    Rect::new(nav.right().saturating_sub(width), nav.y + inner_height / 2, width, 1)
}

/// Where the header avatar lands for a given header row. Mirrors the
/// column split in `draw_header`.
fn header_avatar_rect(header: Rect, name: &str) -> Rect {
    let width = (name.width() as u16 + 8).min(header.width / 3);
    Rect::new(header.right().saturating_sub(width), header.y, width, header.height)
}

/// Runs a service call on a worker thread, turning a panic into an error so
/// the caller always gets a reply.
fn guarded<T>(call: impl FnOnce() -> Result<T, GenAiError>) -> Result<T, GenAiError> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic".to_string());
        tracing::error!(%reason, "service call panicked");
        Err(GenAiError::Worker(reason))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Feed;
    use crate::genai::MockService;
    use ratatui::backend::TestBackend;

    fn model() -> Model {
        let config = Config::default();
        let posts = Feed::embedded().unwrap().take(config.feed.max_posts);
        Model::new(Options {
            config,
            posts,
            service: Arc::new(MockService),
            status_message: String::new(),
            fetch_images: false,
        })
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn render(model: &mut Model, width: u16, height: u16) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| model.draw(frame)).unwrap();
        terminal
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    fn click_target(model: &mut Model, target: HitTarget) {
        let rect = model
            .hits
            .iter()
            .rev()
            .find(|(_, candidate)| *candidate == target)
            .map(|(rect, _)| *rect)
            .unwrap_or_else(|| panic!("no hit region for {target:?}"));
        click(model, rect.x, rect.y);
    }

    fn click(model: &mut Model, column: u16, row: u16) {
        model
            .handle_mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column,
                row,
                modifiers: KeyModifiers::NONE,
            })
            .unwrap();
    }

    fn wait_async(model: &mut Model) {
        let message = model
            .response_rx
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        model.handle_async_response(message);
    }

    #[test]
    fn wide_terminal_gets_sidebar() {
        let cfg = Config::default();
        let layout = screen_layout(Rect::new(0, 0, 120, 40), &Sidebar::default(), &cfg);
        assert_eq!(layout.mode, LayoutMode::Wide);
        assert_eq!(layout.nav.width, cfg.ui.sidebar_width);
        let narrow = screen_layout(Rect::new(0, 0, 80, 40), &Sidebar::default(), &cfg);
        assert_eq!(narrow.mode, LayoutMode::Narrow);
        assert_eq!(narrow.nav.height, TOPBAR_HEIGHT);
    }

    #[test]
    fn input_window_follows_cursor() {
        let mut input = InputLine::default();
        for ch in "abcdefghij".chars() {
            input.insert(ch);
        }
        let (visible, cursor) = input_window(&input, 5);
        assert_eq!(visible, "ghij");
        assert_eq!(cursor, 4);
    }

    #[test]
    fn clamp_text_adds_ellipsis() {
        let text = "um dois três quatro cinco seis sete oito nove dez";
        let lines = clamp_text(text, 10, 2, Style::default());
        assert_eq!(lines.len(), 2);
        let last = lines[1].spans.last().unwrap();
        assert_eq!(last.content.as_ref(), "…");
    }

    #[test]
    fn feed_draws_cards_and_badge() {
        let mut model = model();
        let terminal = render(&mut model, 140, 40);
        let text = screen_text(&terminal);
        assert!(text.contains("Bem-vindo, Moises"));
        assert!(text.contains("+2"), "six images show a +2 badge");
        assert!(model.hits.iter().any(|(_, t)| *t == HitTarget::Tile { card: 0, index: 4 }));
        assert!(!model.hits.iter().any(|(_, t)| *t == HitTarget::Tile { card: 0, index: 5 }));
    }

    #[test]
    fn keyboard_opens_modal_and_pages() {
        let mut model = model();
        render(&mut model, 140, 40);
        model.handle_key(key(KeyCode::Tab)).unwrap();
        model.handle_key(key(KeyCode::Enter)).unwrap();
        let modal = model.modal.as_ref().unwrap();
        assert_eq!(modal.current_index(), 1);
        assert_eq!(modal.len(), 6);
        model.handle_key(key(KeyCode::Right)).unwrap();
        assert_eq!(model.modal.as_ref().unwrap().current_index(), 2);
        model.handle_key(key(KeyCode::Esc)).unwrap();
        assert!(model.modal.is_none());
    }

    #[test]
    fn clicking_tile_opens_modal_at_that_image() {
        let mut model = model();
        render(&mut model, 140, 40);
        click_target(&mut model, HitTarget::Tile { card: 0, index: 3 });
        assert_eq!(model.modal.as_ref().unwrap().current_index(), 3);
        render(&mut model, 140, 40);
        click(&mut model, 0, 0);
        assert!(model.modal.is_none());
    }

    #[test]
    fn card_menu_closes_on_outside_click() {
        let mut model = model();
        render(&mut model, 140, 40);
        click_target(&mut model, HitTarget::MenuTrigger(0));
        assert!(model.feed.cards()[0].state.is_menu_open());
        render(&mut model, 140, 40);
        assert_eq!(model.hub.listener_count(), 1);
        click(&mut model, 139, 39);
        assert!(!model.feed.cards()[0].state.is_menu_open());
        assert_eq!(model.hub.listener_count(), 0);
    }

    #[test]
    fn card_menu_selection_runs_action_and_closes() {
        let mut model = model();
        render(&mut model, 140, 40);
        model.handle_key(key(KeyCode::Char('m'))).unwrap();
        render(&mut model, 140, 40);
        click_target(&mut model, HitTarget::MenuAction { card: 0, action: 3 });
        assert!(!model.feed.cards()[0].state.is_menu_open());
        assert!(model.status_message.contains("denunciada"));
        assert_eq!(model.hub.listener_count(), 0);
    }

    #[test]
    fn bookmark_and_expand_keys() {
        let mut model = model();
        render(&mut model, 140, 40);
        model.handle_key(key(KeyCode::Char('b'))).unwrap();
        assert!(model.feed.cards()[0].state.is_bookmarked());
        model.handle_key(key(KeyCode::Char('x'))).unwrap();
        let long = card::is_long_text(&model.feed.cards()[0].post.content, 130);
        assert_eq!(model.feed.cards()[0].state.is_expanded(), long);
    }

    #[test]
    fn chat_round_trip_with_mock_service() {
        let mut model = model();
        model.handle_key(key(KeyCode::Char('c'))).unwrap();
        assert_eq!(model.history.current(), View::Chat);
        for ch in "olá".chars() {
            model.handle_key(key(KeyCode::Char(ch))).unwrap();
        }
        model.handle_key(key(KeyCode::Enter)).unwrap();
        assert!(model.chat.is_loading());
        assert_eq!(model.chat.input.as_str(), "");
        wait_async(&mut model);
        assert!(!model.chat.is_loading());
        let last = model.chat.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("olá"));
        let terminal = render(&mut model, 140, 40);
        assert!(screen_text(&terminal).contains("Lumina"));
    }

    struct PanickingService;

    impl GenerativeService for PanickingService {
        fn generate_text(&self, _prompt: &str, _search_grounding: bool) -> Result<TextReply, GenAiError> {
            panic!("text backend blew up");
        }

        fn generate_image(&self, _prompt: &str, _aspect: AspectRatio) -> Result<ImageReply, GenAiError> {
            panic!("image backend blew up");
        }
    }

    #[test]
    fn panicking_service_still_settles_labs() {
        let mut model = model();
        model.service = Arc::new(PanickingService);

        model.handle_key(key(KeyCode::Char('c'))).unwrap();
        model.handle_key(key(KeyCode::Char('x'))).unwrap();
        model.handle_key(key(KeyCode::Enter)).unwrap();
        wait_async(&mut model);
        assert!(!model.chat.is_loading());
        assert!(model.chat.messages().last().unwrap().is_error);

        model.handle_key(key(KeyCode::F(3))).unwrap();
        model.handle_key(key(KeyCode::Char('y'))).unwrap();
        model.handle_key(key(KeyCode::Enter)).unwrap();
        wait_async(&mut model);
        assert!(!model.vision.is_loading());
        assert!(model.vision.notice().is_some());
    }

    #[test]
    fn vision_failure_raises_blocking_notice() {
        let mut model = model();
        model.handle_key(key(KeyCode::F(3))).unwrap();
        model.handle_key(key(KeyCode::Char('a'))).unwrap();
        model.handle_key(key(KeyCode::Tab)).unwrap();
        assert_eq!(model.vision.aspect_ratio(), AspectRatio::Landscape);
        model.handle_key(key(KeyCode::Enter)).unwrap();
        wait_async(&mut model);
        assert!(model.vision.notice().is_some());
        assert_eq!(model.vision.entries().len(), 1);
        model.handle_key(key(KeyCode::Char('z'))).unwrap();
        assert_eq!(model.vision.input.as_str(), "a");
        model.handle_key(key(KeyCode::Enter)).unwrap();
        assert!(model.vision.notice().is_none());
    }

    #[test]
    fn back_returns_through_history() {
        let mut model = model();
        model.handle_key(key(KeyCode::F(2))).unwrap();
        model.handle_key(key(KeyCode::F(3))).unwrap();
        render(&mut model, 140, 40);
        click_target(&mut model, HitTarget::Back);
        assert_eq!(model.history.current(), View::Chat);
        model.handle_key(key(KeyCode::Esc)).unwrap();
        assert_eq!(model.history.current(), View::Feed);
        assert_eq!(model.sidebar.active(), NavItem::Home);
    }

    #[test]
    fn ctrl_k_focuses_search_and_submit_is_inert() {
        let mut model = model();
        model.handle_key(ctrl('k')).unwrap();
        assert!(model.header.is_search_focused());
        model.handle_key(key(KeyCode::Char('q'))).unwrap();
        model.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(model.header.search.as_str(), "q");
        assert_eq!(model.history.current(), View::Feed);
        model.handle_key(key(KeyCode::Esc)).unwrap();
        assert!(!model.header.is_search_focused());
    }

    #[test]
    fn narrow_topbar_menu_and_backdrop() {
        let mut model = model();
        render(&mut model, 80, 40);
        click_target(&mut model, HitTarget::Hamburger);
        assert!(model.topbar.is_menu_open());
        render(&mut model, 80, 40);
        click_target(&mut model, HitTarget::TopbarAvatar);
        assert!(model.topbar.is_profile_open());
        assert!(!model.topbar.is_menu_open());
        render(&mut model, 80, 40);
        click_target(&mut model, HitTarget::Backdrop);
        assert!(!model.topbar.has_backdrop());
        assert_eq!(model.hub.listener_count(), 0);
    }

    #[test]
    fn sidebar_click_switches_view() {
        let mut model = model();
        render(&mut model, 140, 40);
        click_target(&mut model, HitTarget::Nav(NavItem::VisionLab));
        assert_eq!(model.history.current(), View::Vision);
        assert_eq!(model.sidebar.active(), NavItem::VisionLab);
        let terminal = render(&mut model, 140, 40);
        assert!(screen_text(&terminal).contains("1:1"));
    }

    #[test]
    fn quit_keys() {
        let mut model = model();
        assert!(model.handle_key(ctrl('c')).unwrap());
        assert!(model.handle_key(key(KeyCode::Char('q'))).unwrap());
        model.handle_key(key(KeyCode::Char('c'))).unwrap();
        assert!(!model.handle_key(key(KeyCode::Char('q'))).unwrap());
    }
}
