//! Navigation chrome around the feed: sidebar, top bar and utility header.

use crate::config::UIConfig;
use crate::dropdown::{Dropdown, PointerHub};
use crate::lab::InputLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Feed,
    Chat,
    Vision,
}

impl View {
    pub fn title(self) -> &'static str {
        match self {
            View::Feed => "Feed",
            View::Chat => "Lumina Chat",
            View::Vision => "Lumina Vision",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
    Home,
    Courses,
    Connections,
    Events,
    Research,
    Jobs,
    ChatLab,
    VisionLab,
}

impl NavItem {
    pub const ALL: [NavItem; 8] = [
        NavItem::Home,
        NavItem::Courses,
        NavItem::Connections,
        NavItem::Events,
        NavItem::Research,
        NavItem::Jobs,
        NavItem::ChatLab,
        NavItem::VisionLab,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NavItem::Home => "Página Inicial",
            NavItem::Courses => "Disciplinas",
            NavItem::Connections => "Conexões",
            NavItem::Events => "Eventos",
            NavItem::Research => "Pesquisas",
            NavItem::Jobs => "Vagas",
            NavItem::ChatLab => "Chat",
            NavItem::VisionLab => "Vision",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            NavItem::Home => "⌂",
            NavItem::Courses => "≡",
            NavItem::Connections => "☺",
            NavItem::Events => "◷",
            NavItem::Research => "⌕",
            NavItem::Jobs => "◆",
            NavItem::ChatLab => "✉",
            NavItem::VisionLab => "◎",
        }
    }

    pub fn is_lab(self) -> bool {
        matches!(self, NavItem::ChatLab | NavItem::VisionLab)
    }

    /// Only the labs have their own screen; the rest show the feed.
    pub fn view(self) -> View {
        match self {
            NavItem::ChatLab => View::Chat,
            NavItem::VisionLab => View::Vision,
            _ => View::Feed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAction {
    Profile,
    Settings,
    Support,
    Logout,
}

impl ProfileAction {
    pub const ALL: [ProfileAction; 4] = [
        ProfileAction::Profile,
        ProfileAction::Settings,
        ProfileAction::Support,
        ProfileAction::Logout,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProfileAction::Profile => "Meu Perfil",
            ProfileAction::Settings => "Configurações",
            ProfileAction::Support => "Suporte",
            ProfileAction::Logout => "Sair da conta",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Persistent sidebar.
    Wide,
    /// Top bar with a hamburger menu.
    Narrow,
}

impl LayoutMode {
    pub fn for_width(width: u16, cfg: &UIConfig) -> Self {
        if width >= cfg.wide_breakpoint {
            LayoutMode::Wide
        } else {
            LayoutMode::Narrow
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sidebar {
    collapsed: bool,
    active: NavItem,
}

impl Default for Sidebar {
    fn default() -> Self {
        Self {
            collapsed: false,
            active: NavItem::Home,
        }
    }
}

impl Sidebar {
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn toggle_collapsed(&mut self) {
        self.collapsed = !self.collapsed;
    }

    pub fn active(&self) -> NavItem {
        self.active
    }

    pub fn width(&self, cfg: &UIConfig) -> u16 {
        if self.collapsed {
            cfg.sidebar_collapsed_width
        } else {
            cfg.sidebar_width
        }
    }

    pub fn select(&mut self, item: NavItem) {
        self.active = item;
        tracing::info!(item = item.label(), "navigating");
    }
}

pub struct Topbar {
    menu_open: bool,
    profile: Dropdown,
}

impl Default for Topbar {
    fn default() -> Self {
        Self {
            menu_open: false,
            profile: Dropdown::new(),
        }
    }
}

impl Topbar {
    pub fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn is_profile_open(&self) -> bool {
        self.profile.is_open()
    }

    pub fn profile(&self) -> &Dropdown {
        &self.profile
    }

    /// The backdrop is shown while either panel is open.
    pub fn has_backdrop(&self) -> bool {
        self.menu_open || self.profile.is_open()
    }

    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
        self.profile.close();
    }

    pub fn toggle_profile(&mut self, hub: &PointerHub) {
        self.profile.toggle(hub);
        self.menu_open = false;
    }

    pub fn close_all(&mut self) {
        self.menu_open = false;
        self.profile.close();
    }

    pub fn select_nav(&mut self, item: NavItem) -> NavItem {
        self.close_all();
        item
    }

    pub fn select_profile(&mut self, action: ProfileAction) -> ProfileAction {
        self.close_all();
        action
    }

    pub fn sync(&mut self) -> bool {
        self.profile.sync()
    }
}

pub struct UtilityHeader {
    pub search: InputLine,
    search_focused: bool,
    profile: Dropdown,
    messages: u32,
    notifications: u32,
    user_name: String,
}

impl UtilityHeader {
    pub fn new(cfg: &UIConfig) -> Self {
        Self {
            search: InputLine::default(),
            search_focused: false,
            profile: Dropdown::new(),
            messages: 2,
            notifications: 3,
            user_name: cfg.user_name.clone(),
        }
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn first_name(&self) -> &str {
        self.user_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.user_name)
    }

    pub fn is_search_focused(&self) -> bool {
        self.search_focused
    }

    pub fn focus_search(&mut self) {
        self.search_focused = true;
    }

    pub fn blur_search(&mut self) {
        self.search_focused = false;
    }

    /// Submitting keeps the query and does nothing else.
    pub fn submit_search(&mut self) {
        tracing::debug!(query = self.search.as_str(), "search submitted");
    }

    pub fn messages_badge(&self) -> Option<String> {
        count_badge(self.messages)
    }

    pub fn notifications_badge(&self) -> Option<String> {
        count_badge(self.notifications)
    }

    pub fn set_counts(&mut self, messages: u32, notifications: u32) {
        self.messages = messages;
        self.notifications = notifications;
    }

    pub fn is_profile_open(&self) -> bool {
        self.profile.is_open()
    }

    pub fn profile(&self) -> &Dropdown {
        &self.profile
    }

    pub fn toggle_profile(&mut self, hub: &PointerHub) {
        self.profile.toggle(hub);
    }

    pub fn close_profile(&mut self) {
        self.profile.close();
    }

    pub fn select_profile(&mut self, action: ProfileAction) -> ProfileAction {
        self.profile.close();
        tracing::info!(action = action.label(), "profile menu");
        action
    }

    pub fn sync(&mut self) -> bool {
        self.profile.sync()
    }
}

fn count_badge(count: u32) -> Option<String> {
    (count > 0).then(|| count.to_string())
}

/// Back-button history. The current view is never on the stack.
#[derive(Debug, Clone)]
pub struct ViewHistory {
    current: View,
    stack: Vec<View>,
}

impl Default for ViewHistory {
    fn default() -> Self {
        Self {
            current: View::Feed,
            stack: Vec::new(),
        }
    }
}

impl ViewHistory {
    pub fn current(&self) -> View {
        self.current
    }

    pub fn navigate(&mut self, view: View) -> bool {
        if view == self.current {
            return false;
        }
        self.stack.push(self.current);
        self.current = view;
        true
    }

    pub fn back(&mut self) -> bool {
        match self.stack.pop() {
            Some(view) => {
                self.current = view;
                true
            }
            None => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_switches_at_breakpoint() {
        let cfg = UIConfig::default();
        assert_eq!(LayoutMode::for_width(cfg.wide_breakpoint, &cfg), LayoutMode::Wide);
        assert_eq!(
            LayoutMode::for_width(cfg.wide_breakpoint - 1, &cfg),
            LayoutMode::Narrow
        );
    }

    #[test]
    fn sidebar_width_follows_collapse() {
        let cfg = UIConfig::default();
        let mut sidebar = Sidebar::default();
        assert_eq!(sidebar.width(&cfg), cfg.sidebar_width);
        sidebar.toggle_collapsed();
        assert_eq!(sidebar.width(&cfg), cfg.sidebar_collapsed_width);
        sidebar.select(NavItem::Events);
        assert_eq!(sidebar.active(), NavItem::Events);
    }

    #[test]
    fn topbar_panels_are_exclusive() {
        let hub = PointerHub::new();
        let mut topbar = Topbar::default();
        topbar.toggle_menu();
        assert!(topbar.is_menu_open());
        topbar.toggle_profile(&hub);
        assert!(topbar.is_profile_open());
        assert!(!topbar.is_menu_open());
        topbar.toggle_menu();
        assert!(!topbar.is_profile_open());
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn topbar_selection_closes_everything() {
        let hub = PointerHub::new();
        let mut topbar = Topbar::default();
        topbar.toggle_profile(&hub);
        topbar.select_profile(ProfileAction::Support);
        assert!(!topbar.has_backdrop());
        topbar.toggle_menu();
        assert_eq!(topbar.select_nav(NavItem::Jobs), NavItem::Jobs);
        assert!(!topbar.has_backdrop());
    }

    #[test]
    fn badges_hidden_at_zero() {
        let mut header = UtilityHeader::new(&UIConfig::default());
        assert_eq!(header.messages_badge().as_deref(), Some("2"));
        assert_eq!(header.notifications_badge().as_deref(), Some("3"));
        header.set_counts(0, 1);
        assert_eq!(header.messages_badge(), None);
        assert_eq!(header.notifications_badge().as_deref(), Some("1"));
    }

    #[test]
    fn search_submit_keeps_query() {
        let mut header = UtilityHeader::new(&UIConfig::default());
        header.focus_search();
        header.search.insert('x');
        header.submit_search();
        assert_eq!(header.search.as_str(), "x");
        assert!(header.is_search_focused());
    }

    #[test]
    fn header_profile_selection_closes() {
        let hub = PointerHub::new();
        let mut header = UtilityHeader::new(&UIConfig::default());
        header.toggle_profile(&hub);
        assert_eq!(hub.listener_count(), 1);
        header.select_profile(ProfileAction::Logout);
        assert!(!header.is_profile_open());
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn history_back_returns_to_previous_view() {
        let mut history = ViewHistory::default();
        assert!(!history.back());
        assert!(history.navigate(View::Chat));
        assert!(!history.navigate(View::Chat));
        assert!(history.navigate(View::Vision));
        assert!(history.back());
        assert_eq!(history.current(), View::Chat);
        assert!(history.back());
        assert_eq!(history.current(), View::Feed);
        assert_eq!(history.depth(), 0);
    }

    #[test]
    fn labs_map_to_their_views() {
        assert_eq!(NavItem::ChatLab.view(), View::Chat);
        assert_eq!(NavItem::VisionLab.view(), View::Vision);
        assert_eq!(NavItem::Courses.view(), View::Feed);
        assert_eq!(NavItem::ALL.iter().filter(|item| item.is_lab()).count(), 2);
    }
}
