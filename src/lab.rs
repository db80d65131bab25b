//! Chat and vision lab panels.
//!
//! Both panels allow one outstanding request. `submit` hands back the work
//! to run off the UI thread, `resolve` folds the outcome into the log.
//! A submission while a request is in flight is ignored.

use chrono::{DateTime, Utc};

use crate::genai::{AspectRatio, GenAiError, ImageReply, InlineImage, Source, TextReply};

pub const CHAT_GREETING: &str = "Olá! Eu sou Lumina, sua assistente de IA avançada. Tenho acesso a informações em tempo real via Google Search. Como posso ajudar você hoje?";
pub const CHAT_EMPTY_REPLY: &str = "Sinto muito, não consegui gerar uma resposta.";
pub const CHAT_ERROR: &str =
    "Erro: Encontrei um problema ao conectar. Por favor, tente novamente.";
pub const VISION_ERROR: &str =
    "Error generating image. It might be due to safety filters or connection issues.";
pub const VISION_NO_IMAGE: &str = "Failed to extract image data from response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sources: Vec<Source>,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub prompt: String,
    pub search_grounding: bool,
}

/// Single-line text input with a cursor, shared by both panels and the
/// search box.
#[derive(Debug, Clone, Default)]
pub struct InputLine {
    text: String,
    cursor: usize,
}

impl InputLine {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn insert(&mut self, ch: char) {
        let byte = self.byte_offset();
        self.text.insert(byte, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte = self.byte_offset();
        self.text.remove(byte);
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    fn byte_offset(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len())
    }
}

pub struct ChatPanel {
    messages: Vec<Message>,
    pub input: InputLine,
    in_flight: bool,
    search_grounding: bool,
    next_id: u64,
}

impl ChatPanel {
    pub fn new(search_grounding: bool) -> Self {
        let mut panel = Self {
            messages: Vec::new(),
            input: InputLine::default(),
            in_flight: false,
            search_grounding,
            next_id: 1,
        };
        panel.push(Role::Assistant, CHAT_GREETING.to_string(), Vec::new(), false);
        panel
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn submit(&mut self) -> Option<ChatRequest> {
        if self.in_flight || self.input.is_blank() {
            return None;
        }
        let prompt = self.input.take();
        self.push(Role::User, prompt.clone(), Vec::new(), false);
        self.in_flight = true;
        tracing::info!(chars = prompt.chars().count(), "chat request submitted");
        Some(ChatRequest {
            prompt,
            search_grounding: self.search_grounding,
        })
    }

    pub fn resolve(&mut self, result: Result<TextReply, GenAiError>) {
        if !self.in_flight {
            tracing::warn!("chat reply arrived with no request in flight");
            return;
        }
        self.in_flight = false;
        match result {
            Ok(reply) => {
                let text = reply
                    .text
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| CHAT_EMPTY_REPLY.to_string());
                self.push(Role::Assistant, text, reply.sources, false);
            }
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                self.push(Role::Assistant, CHAT_ERROR.to_string(), Vec::new(), true);
            }
        }
    }

    /// Sources of the most recent assistant reply that has any.
    pub fn latest_sources(&self) -> &[Source] {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant && !message.sources.is_empty())
            .map(|message| message.sources.as_slice())
            .unwrap_or(&[])
    }

    fn push(&mut self, role: Role, content: String, sources: Vec<Source>, is_error: bool) {
        self.messages.push(Message {
            id: self.next_id,
            role,
            content,
            timestamp: Utc::now(),
            sources,
            is_error,
        });
        self.next_id += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub id: u64,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub image: InlineImage,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisionEntry {
    Image(GeneratedImage),
    Failure {
        prompt: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

pub struct VisionPanel {
    entries: Vec<VisionEntry>,
    pub input: InputLine,
    aspect_ratio: AspectRatio,
    in_flight: Option<VisionRequest>,
    notice: Option<String>,
    selected: usize,
    last_id: u64,
}

impl Default for VisionPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionPanel {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            input: InputLine::default(),
            aspect_ratio: AspectRatio::default(),
            in_flight: None,
            notice: None,
            selected: 0,
            last_id: 0,
        }
    }

    /// Log in arrival order. The gallery draws it newest first.
    pub fn entries(&self) -> &[VisionEntry] {
        &self.entries
    }

    pub fn images(&self) -> impl DoubleEndedIterator<Item = &GeneratedImage> {
        self.entries.iter().filter_map(|entry| match entry {
            VisionEntry::Image(image) => Some(image),
            VisionEntry::Failure { .. } => None,
        })
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.aspect_ratio = ratio;
    }

    pub fn cycle_aspect_ratio(&mut self) {
        self.aspect_ratio = self.aspect_ratio.next();
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn submit(&mut self) -> Option<VisionRequest> {
        if self.in_flight.is_some() || self.input.is_blank() {
            return None;
        }
        let request = VisionRequest {
            prompt: self.input.as_str().to_string(),
            aspect_ratio: self.aspect_ratio,
        };
        self.in_flight = Some(request.clone());
        tracing::info!(aspect = request.aspect_ratio.as_str(), "image request submitted");
        Some(request)
    }

    pub fn resolve(&mut self, result: Result<ImageReply, GenAiError>) {
        let Some(request) = self.in_flight.take() else {
            tracing::warn!("image reply arrived with no request in flight");
            return;
        };
        match result {
            Ok(ImageReply {
                image: Some(image), ..
            }) => {
                let timestamp = Utc::now();
                let id = self.image_id(timestamp);
                self.entries.push(VisionEntry::Image(GeneratedImage {
                    id,
                    prompt: request.prompt,
                    aspect_ratio: request.aspect_ratio,
                    image,
                    timestamp,
                }));
                self.selected = 0;
                self.input.clear();
            }
            Ok(ImageReply { image: None, .. }) => {
                tracing::warn!("image response had no inline image data");
                self.notice = Some(VISION_NO_IMAGE.to_string());
            }
            Err(err) => {
                tracing::error!(error = %err, "image request failed");
                self.entries.push(VisionEntry::Failure {
                    prompt: request.prompt,
                    message: VISION_ERROR.to_string(),
                    timestamp: Utc::now(),
                });
                self.notice = Some(VISION_ERROR.to_string());
            }
        }
    }

    /// Creation time in milliseconds, bumped past the previous id so two
    /// images from the same millisecond stay distinct.
    fn image_id(&mut self, timestamp: DateTime<Utc>) -> u64 {
        let millis = u64::try_from(timestamp.timestamp_millis()).unwrap_or(0);
        self.last_id = millis.max(self.last_id + 1);
        self.last_id
    }

    /// Gallery selection, 0 = newest image.
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_older(&mut self) {
        let count = self.images().count();
        if count > 0 {
            self.selected = (self.selected + 1).min(count - 1);
        }
    }

    pub fn select_newer(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select(&mut self, index: usize) {
        let count = self.images().count();
        if index < count {
            self.selected = index;
        }
    }

    pub fn selected_image(&self) -> Option<&GeneratedImage> {
        self.images().rev().nth(self.selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(input: &mut InputLine, text: &str) {
        for ch in text.chars() {
            input.insert(ch);
        }
    }

    fn png() -> InlineImage {
        InlineImage {
            mime_type: "image/png".into(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn chat_starts_with_greeting() {
        let chat = ChatPanel::new(true);
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].content, CHAT_GREETING);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut chat = ChatPanel::new(true);
        typed(&mut chat.input, "   ");
        assert!(chat.submit().is_none());
        assert!(!chat.is_loading());
    }

    #[test]
    fn second_submission_while_in_flight_is_ignored() {
        let mut chat = ChatPanel::new(true);
        typed(&mut chat.input, "primeira");
        let first = chat.submit().unwrap();
        assert_eq!(first.prompt, "primeira");
        assert!(first.search_grounding);

        typed(&mut chat.input, "segunda");
        assert!(chat.submit().is_none());
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.input.as_str(), "segunda");

        chat.resolve(Ok(TextReply {
            text: Some("resposta".into()),
            sources: Vec::new(),
        }));
        assert!(!chat.is_loading());
        let second = chat.submit().unwrap();
        assert_eq!(second.prompt, "segunda");
    }

    #[test]
    fn failure_appends_fixed_error() {
        let mut chat = ChatPanel::new(false);
        typed(&mut chat.input, "oi");
        chat.submit().unwrap();
        chat.resolve(Err(GenAiError::MissingApiKey));
        let last = chat.messages().last().unwrap();
        assert_eq!(last.content, CHAT_ERROR);
        assert!(last.is_error);
        assert!(chat.submit().is_none());
        typed(&mut chat.input, "de novo");
        assert!(chat.submit().is_some());
    }

    #[test]
    fn empty_reply_uses_fallback_and_keeps_sources() {
        let mut chat = ChatPanel::new(true);
        typed(&mut chat.input, "oi");
        chat.submit().unwrap();
        chat.resolve(Ok(TextReply {
            text: None,
            sources: vec![Source {
                uri: "https://a.example".into(),
                title: "A".into(),
            }],
        }));
        assert_eq!(chat.messages().last().unwrap().content, CHAT_EMPTY_REPLY);
        assert_eq!(chat.latest_sources().len(), 1);
    }

    #[test]
    fn stray_reply_is_dropped() {
        let mut chat = ChatPanel::new(true);
        chat.resolve(Ok(TextReply {
            text: Some("ninguém perguntou".into()),
            sources: Vec::new(),
        }));
        assert_eq!(chat.messages().len(), 1);
        assert!(!chat.is_loading());
    }

    #[test]
    fn image_ids_follow_creation_time() {
        let mut vision = VisionPanel::new();
        for prompt in ["one", "two"] {
            typed(&mut vision.input, prompt);
            vision.submit().unwrap();
            vision.resolve(Ok(ImageReply {
                image: Some(png()),
                text: None,
            }));
        }
        let ids: Vec<u64> = vision.images().map(|image| image.id).collect();
        assert!(ids[1] > ids[0]);
        let first = vision.images().next().unwrap();
        assert!(ids[0] >= first.timestamp.timestamp_millis() as u64);
    }

    #[test]
    fn input_line_edits_unicode() {
        let mut input = InputLine::default();
        typed(&mut input, "açaí");
        input.left();
        input.backspace();
        assert_eq!(input.as_str(), "açí");
        input.right();
        input.insert('!');
        assert_eq!(input.as_str(), "açí!");
    }

    #[test]
    fn vision_success_keeps_log_and_clears_prompt() {
        let mut vision = VisionPanel::new();
        vision.cycle_aspect_ratio();
        typed(&mut vision.input, "a city");
        let request = vision.submit().unwrap();
        assert_eq!(request.aspect_ratio, AspectRatio::Landscape);
        assert!(vision.submit().is_none());

        vision.resolve(Ok(ImageReply {
            image: Some(png()),
            text: None,
        }));
        assert_eq!(vision.images().count(), 1);
        assert!(vision.input.is_blank());
        assert_eq!(vision.selected_image().unwrap().prompt, "a city");
    }

    #[test]
    fn vision_missing_image_raises_notice_only() {
        let mut vision = VisionPanel::new();
        typed(&mut vision.input, "a city");
        vision.submit().unwrap();
        vision.resolve(Ok(ImageReply::default()));
        assert_eq!(vision.notice(), Some(VISION_NO_IMAGE));
        assert!(vision.entries().is_empty());
        assert_eq!(vision.input.as_str(), "a city");
        vision.dismiss_notice();
        assert!(vision.submit().is_some());
    }

    #[test]
    fn vision_failure_logs_entry_and_notice() {
        let mut vision = VisionPanel::new();
        typed(&mut vision.input, "a city");
        vision.submit().unwrap();
        vision.resolve(Err(GenAiError::Decode("x".into())));
        assert!(matches!(vision.entries()[0], VisionEntry::Failure { .. }));
        assert_eq!(vision.notice(), Some(VISION_ERROR));
        assert!(!vision.is_loading());
    }

    #[test]
    fn gallery_selection_is_newest_first() {
        let mut vision = VisionPanel::new();
        for prompt in ["one", "two"] {
            typed(&mut vision.input, prompt);
            vision.submit().unwrap();
            vision.resolve(Ok(ImageReply {
                image: Some(png()),
                text: None,
            }));
        }
        assert_eq!(vision.selected_image().unwrap().prompt, "two");
        vision.select_older();
        assert_eq!(vision.selected_image().unwrap().prompt, "one");
        vision.select_older();
        assert_eq!(vision.selected(), 1);
        vision.select_newer();
        assert_eq!(vision.selected_image().unwrap().prompt, "two");
    }
}
