use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;
use std::ops::Range;
use std::rc::Rc;
use std::time::Duration;

use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    label::Label,
    text::TextView,
    v_flex, v_virtual_list,
};

use crate::chat::events::{RatingClicked, TopicPicked};
use crate::chat::message::{EntryId, EntryStatus, Sender, TranscriptEntry, split_reply};
use crate::chat::scroll_manager::ScrollManager;

const DEFAULT_CONTENT_WIDTH: Pixels = px(680.);
const LIST_HORIZONTAL_PADDING: Pixels = px(16.);
const CONTENT_WIDTH_CHANGE_EPSILON: f32 = 1.0;
const USER_BUBBLE_MAX_WIDTH: Pixels = px(540.);
const USER_BUBBLE_PADDING_X: Pixels = px(14.);
const USER_BUBBLE_PADDING_Y: Pixels = px(10.);
const BOT_LABEL_HEIGHT: Pixels = px(16.);
const BOT_LABEL_GAP: Pixels = px(8.);
const TYPING_ROW_HEIGHT: Pixels = px(20.);
const ACTION_ROW_HEIGHT: Pixels = px(24.);
const ACTION_ROW_GAP: Pixels = px(8.);
const TOPIC_ROW_HEIGHT: Pixels = px(32.);
const TOPIC_ROW_GAP: Pixels = px(8.);
const ESTIMATED_TEXT_LINE_HEIGHT: Pixels = px(18.);
const ESTIMATED_CHAR_WIDTH: f32 = 7.0;
const MARKDOWN_SAFE_FALLBACK_THRESHOLD_BYTES: usize = 128 * 1024;

/// How long the copy control shows its confirmation before reverting.
const COPIED_RESET_MS: u64 = 2_000;
const MAX_STARS: u8 = 5;

struct SizeCacheEntry {
    layout_hash: u64,
    height: Pixels,
    measured: bool,
}

/// Transcript renderer: user bubbles, markdown replies, the typing
/// placeholder, star ratings, copy-to-clipboard and the trailing
/// related-topic suggestions.
pub struct MessageList {
    entries: Vec<TranscriptEntry>,
    ratings: HashMap<usize, u8>,
    related_topics: Vec<String>,
    copied_index: Option<usize>,
    copied_reset_task: Option<Task<()>>,
    item_sizes: Rc<Vec<Size<Pixels>>>,
    scroll_manager: ScrollManager,
    size_cache: HashMap<EntryId, SizeCacheEntry>,
    content_width: Option<Pixels>,
}

impl EventEmitter<RatingClicked> for MessageList {}
impl EventEmitter<TopicPicked> for MessageList {}

impl MessageList {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self {
            entries: Vec::new(),
            ratings: HashMap::new(),
            related_topics: Vec::new(),
            copied_index: None,
            copied_reset_task: None,
            item_sizes: Rc::new(Vec::new()),
            scroll_manager: ScrollManager::new(),
            size_cache: HashMap::new(),
            content_width: None,
        }
    }

    pub fn set_transcript(
        &mut self,
        entries: Vec<TranscriptEntry>,
        ratings: HashMap<usize, u8>,
        related_topics: Vec<String>,
        cx: &mut Context<Self>,
    ) {
        let should_request_follow = entries.len() > self.entries.len()
            || entries
                .iter()
                .any(|entry| entry.status == EntryStatus::Pending);

        self.entries = entries;
        self.ratings = ratings;
        self.related_topics = related_topics;
        self.rebuild_item_sizes();

        if should_request_follow {
            self.scroll_manager.request_scroll_to_bottom_if_following();
        }

        cx.notify();
    }

    pub fn reset_scroll_tracking(&mut self, cx: &mut Context<Self>) {
        self.scroll_manager.reset();
        cx.notify();
    }

    /// Suggestions attach only to the transcript's final settled reply.
    fn topics_shown_at(&self, index: usize) -> usize {
        let is_last = index + 1 == self.entries.len();
        let settled = self
            .entries
            .get(index)
            .is_some_and(TranscriptEntry::is_settled_reply);

        if is_last && settled && !self.related_topics.is_empty() {
            self.related_topics.len()
        } else {
            0
        }
    }

    fn update_content_width(&mut self, cx: &mut Context<Self>) {
        let list_width = self.scroll_manager.bounds().size.width;
        if list_width <= Pixels::ZERO {
            return;
        }

        let next_content_width = max_pixels(px(1.), list_width - LIST_HORIZONTAL_PADDING * 2);
        let width_changed = self.content_width.is_none_or(|current| {
            (f32::from(current) - f32::from(next_content_width)).abs()
                > CONTENT_WIDTH_CHANGE_EPSILON
        });

        if width_changed {
            self.content_width = Some(next_content_width);

            // Mark cached measurements dirty so item heights can be recalculated for new width.
            for entry in self.size_cache.values_mut() {
                entry.measured = false;
            }

            self.rebuild_item_sizes();
            cx.notify();
        }
    }

    fn rebuild_item_sizes(&mut self) {
        let content_width = self.content_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        let mut active_ids = HashSet::with_capacity(self.entries.len());
        let mut sizes = Vec::with_capacity(self.entries.len());

        for index in 0..self.entries.len() {
            let topic_count = self.topics_shown_at(index);
            let entry = &self.entries[index];
            let next_hash = layout_hash(entry, topic_count);
            let estimated_height = estimate_entry_height(entry, topic_count, content_width);

            let cached = self.size_cache.entry(entry.id).or_insert(SizeCacheEntry {
                layout_hash: next_hash,
                height: estimated_height,
                measured: false,
            });

            // Keep cache entries stable by entry id and invalidate only on layout-relevant changes.
            if cached.layout_hash != next_hash {
                cached.layout_hash = next_hash;
                cached.height = estimated_height;
                cached.measured = false;
            } else if !cached.measured {
                cached.height = estimated_height;
            }

            sizes.push(size(px(0.), cached.height));
            active_ids.insert(entry.id);
        }

        self.size_cache.retain(|id, _| active_ids.contains(id));
        self.item_sizes = Rc::new(sizes);
    }

    fn measure_visible_items(
        &mut self,
        visible_range: Range<usize>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if self.entries.is_empty() {
            return;
        }

        let content_width = self.content_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        let available_space = size(
            AvailableSpace::Definite(content_width),
            AvailableSpace::MinContent,
        );
        let mut updated = false;

        for index in visible_range {
            let topic_count = self.topics_shown_at(index);
            let Some(entry) = self.entries.get(index).cloned() else {
                continue;
            };

            let next_hash = layout_hash(&entry, topic_count);
            let estimated_height = estimate_entry_height(&entry, topic_count, content_width);

            {
                let cached = self.size_cache.entry(entry.id).or_insert(SizeCacheEntry {
                    layout_hash: next_hash,
                    height: estimated_height,
                    measured: false,
                });

                if cached.layout_hash != next_hash {
                    cached.layout_hash = next_hash;
                    cached.height = estimated_height;
                    cached.measured = false;
                }
            }

            let mut row = self.render_entry_row(&entry, index, cx);
            let measured_height = row.layout_as_root(available_space, window, cx).height;
            let Some(cached) = self.size_cache.get_mut(&entry.id) else {
                continue;
            };
            let height_changed = !cached.measured || pixels_changed(cached.height, measured_height);
            if height_changed {
                cached.height = measured_height;
                updated = true;
            }
            cached.measured = true;
        }

        if updated {
            self.rebuild_item_sizes();
            cx.notify();
        }
    }

    fn render_entry_row(
        &self,
        entry: &TranscriptEntry,
        index: usize,
        cx: &mut Context<Self>,
    ) -> AnyElement {
        let theme = cx.theme();

        if entry.sender == Sender::User {
            let content = if entry.text.is_empty() {
                " ".to_string()
            } else {
                entry.text.clone()
            };

            return v_flex()
                .w_full()
                .items_end()
                .child(
                    div()
                        .max_w(USER_BUBBLE_MAX_WIDTH)
                        .px(USER_BUBBLE_PADDING_X)
                        .py(USER_BUBBLE_PADDING_Y)
                        .rounded_lg()
                        .bg(theme.accent)
                        .text_color(theme.accent_foreground)
                        .child(Label::new(content).text_sm()),
                )
                .into_any_element();
        }

        let topic_count = self.topics_shown_at(index);

        v_flex()
            .w_full()
            .gap_2()
            .child(
                Label::new("Asystent")
                    .text_xs()
                    .text_color(theme.foreground.opacity(0.5)),
            )
            .child(self.render_reply_content(entry, index, cx))
            .when(entry.is_settled_reply(), |column| {
                column.child(self.render_action_row(entry, index, cx))
            })
            .when(topic_count > 0, |column| {
                column.child(self.render_topic_buttons(index, cx))
            })
            .into_any_element()
    }

    fn render_reply_content(
        &self,
        entry: &TranscriptEntry,
        index: usize,
        cx: &mut Context<Self>,
    ) -> AnyElement {
        if entry.status == EntryStatus::Pending {
            let dot_color = cx.theme().muted_foreground;
            let typing_dot = move || div().size(px(6.)).rounded_full().bg(dot_color);

            // Typing placeholder: stands in for the reply until it resolves.
            return h_flex()
                .h(TYPING_ROW_HEIGHT)
                .gap_1()
                .items_center()
                .child(typing_dot())
                .child(typing_dot())
                .child(typing_dot())
                .into_any_element();
        }

        let body = split_reply(&entry.text).body;

        if body.is_empty() {
            return Label::new("(pusta odpowiedź)").text_sm().into_any_element();
        }

        if body.len() > MARKDOWN_SAFE_FALLBACK_THRESHOLD_BYTES {
            // Keep markdown rendering predictable by falling back to plain text for oversized payloads.
            return Label::new(body).text_sm().into_any_element();
        }

        let markdown_id = ElementId::Name(SharedString::from(format!(
            "reply-markdown-{}-{index}",
            entry.id.0
        )));

        TextView::markdown(markdown_id, body)
            .selectable(true)
            .into_any_element()
    }

    fn render_action_row(
        &self,
        entry: &TranscriptEntry,
        index: usize,
        cx: &mut Context<Self>,
    ) -> AnyElement {
        let theme = cx.theme();
        let current_rating = self.ratings.get(&index).copied().unwrap_or(0);

        let mut stars = h_flex().h(ACTION_ROW_HEIGHT).gap_1().items_center();
        for star in 1..=MAX_STARS {
            let filled = star <= current_rating;
            let glyph = if filled { "★" } else { "☆" };
            let color = if filled {
                theme.primary
            } else {
                theme.muted_foreground
            };

            stars = stars.child(
                Button::new(format!("star-{index}-{star}"))
                    .ghost()
                    .small()
                    .child(Label::new(glyph).text_sm().text_color(color))
                    .on_click(cx.listener(move |this, _, _window, cx| {
                        this.handle_rating_click(index, star, cx);
                    })),
            );
        }

        let copy_control = if self.copied_index == Some(index) {
            Label::new("Skopiowano")
                .text_xs()
                .text_color(theme.muted_foreground)
                .into_any_element()
        } else {
            let raw_text = entry.text.clone();
            Button::new(format!("copy-{index}"))
                .ghost()
                .small()
                .icon(IconName::Copy)
                .on_click(cx.listener(move |this, _, _window, cx| {
                    this.handle_copy_click(index, raw_text.clone(), cx);
                }))
                .into_any_element()
        };

        h_flex()
            .w_full()
            .gap_3()
            .items_center()
            .child(stars)
            .child(copy_control)
            .into_any_element()
    }

    fn render_topic_buttons(&self, index: usize, cx: &mut Context<Self>) -> AnyElement {
        let mut column = v_flex().w_full().gap_2();

        for (topic_index, topic) in self.related_topics.iter().enumerate() {
            let text = topic.clone();
            column = column.child(
                div().w_full().child(
                    Button::new(format!("topic-{index}-{topic_index}"))
                        .small()
                        .child(topic.clone())
                        .on_click(cx.listener(move |this, _, _window, cx| {
                            this.handle_topic_click(text.clone(), cx);
                        })),
                ),
            );
        }

        column.into_any_element()
    }

    fn handle_rating_click(&mut self, index: usize, stars: u8, cx: &mut Context<Self>) {
        cx.emit(RatingClicked { index, stars });
    }

    fn handle_topic_click(&mut self, text: String, cx: &mut Context<Self>) {
        cx.emit(TopicPicked { text });
    }

    fn handle_copy_click(&mut self, index: usize, text: String, cx: &mut Context<Self>) {
        cx.write_to_clipboard(ClipboardItem::new_string(text));
        self.copied_index = Some(index);

        // A fresh copy supersedes the previous confirmation timer.
        self.copied_reset_task = Some(cx.spawn(async move |this, cx| {
            cx.background_executor()
                .timer(Duration::from_millis(COPIED_RESET_MS))
                .await;

            let _ = this.update(cx, |this, cx| {
                if this.copied_index == Some(index) {
                    this.copied_index = None;
                    cx.notify();
                }
                this.copied_reset_task = None;
            });
        }));

        cx.notify();
    }
}

impl Render for MessageList {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.update_content_width(cx);
        self.scroll_manager.update_follow_state();
        self.scroll_manager.apply_pending_scroll();

        v_flex().size_full().min_h_0().child(
            v_virtual_list(
                cx.entity().clone(),
                "message-list",
                self.item_sizes.clone(),
                |this, visible_range, window, cx| {
                    // Measure only visible rows so long histories keep O(visible) layout work.
                    this.update_content_width(cx);
                    this.measure_visible_items(visible_range.clone(), window, cx);
                    visible_range
                        .filter_map(|index| {
                            this.entries
                                .get(index)
                                .cloned()
                                .map(|entry| this.render_entry_row(&entry, index, cx))
                        })
                        .collect::<Vec<_>>()
                },
            )
            .size_full()
            .px_4()
            .py_3()
            .gap_4()
            .track_scroll(self.scroll_manager.handle()),
        )
    }
}

fn layout_hash(entry: &TranscriptEntry, topic_count: usize) -> u64 {
    let mut hasher = DefaultHasher::new();

    hasher.write_u64(entry.id.0);
    hasher.write_u8(match entry.sender {
        Sender::User => 0,
        Sender::Bot => 1,
    });
    hasher.write_u8(match entry.status {
        EntryStatus::Pending => 0,
        EntryStatus::Done => 1,
    });
    hasher.write(entry.text.as_bytes());
    // Ratings and the copy confirmation are height-stable, so they stay out
    // of the layout hash; suggestion rows are not.
    hasher.write_u64(topic_count as u64);
    hasher.finish()
}

fn estimate_entry_height(
    entry: &TranscriptEntry,
    topic_count: usize,
    content_width: Pixels,
) -> Pixels {
    match entry.sender {
        Sender::User => {
            let bubble_width = min_pixels(content_width, USER_BUBBLE_MAX_WIDTH);
            let text_width = max_pixels(px(1.), bubble_width - USER_BUBBLE_PADDING_X * 2);
            let text_height = estimate_text_height(&entry.text, text_width);
            text_height + USER_BUBBLE_PADDING_Y * 2
        }
        Sender::Bot => {
            let content_height = if entry.status == EntryStatus::Pending {
                TYPING_ROW_HEIGHT
            } else {
                estimate_text_height(&split_reply(&entry.text).body, content_width)
            };

            let mut total_height = BOT_LABEL_HEIGHT + BOT_LABEL_GAP + content_height;
            if entry.is_settled_reply() {
                total_height += ACTION_ROW_GAP + ACTION_ROW_HEIGHT;
            }
            total_height += (TOPIC_ROW_GAP + TOPIC_ROW_HEIGHT) * topic_count;

            total_height
        }
    }
}

fn estimate_text_height(content: &str, width: Pixels) -> Pixels {
    if content.is_empty() {
        return ESTIMATED_TEXT_LINE_HEIGHT;
    }

    let width_as_f32 = f32::from(width);
    let chars_per_line = (width_as_f32 / ESTIMATED_CHAR_WIDTH).floor().max(1.0) as usize;

    let mut line_count = 0usize;
    for line in content.lines() {
        let char_count = line.chars().count().max(1);
        line_count += char_count.div_ceil(chars_per_line);
    }

    // Account for the trailing empty line when content ends with a newline.
    if content.ends_with('\n') {
        line_count += 1;
    }

    ESTIMATED_TEXT_LINE_HEIGHT * line_count.max(1)
}

fn max_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) >= f32::from(b) { a } else { b }
}

fn min_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) <= f32::from(b) { a } else { b }
}

fn pixels_changed(a: Pixels, b: Pixels) -> bool {
    (f32::from(a) - f32::from(b)).abs() > 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::{EntryId, EntryStatus, TranscriptEntry};

    fn entry(id: u64, sender: Sender, text: &str, status: EntryStatus) -> TranscriptEntry {
        TranscriptEntry {
            id: EntryId::new(id),
            sender,
            text: text.to_string(),
            status,
        }
    }

    #[test]
    fn large_history_fixture_keeps_row_metrics_deterministic() {
        let mut entries = (0..2_000)
            .map(|index| {
                let sender = if index % 2 == 0 {
                    Sender::User
                } else {
                    Sender::Bot
                };
                let status = if index == 1_999 {
                    EntryStatus::Pending
                } else {
                    EntryStatus::Done
                };

                entry(
                    index as u64 + 1,
                    sender,
                    &format!("entry-{index}: virtualization fixture payload"),
                    status,
                )
            })
            .collect::<Vec<_>>();

        let content_width = px(680.);
        let heights_before = entries
            .iter()
            .map(|entry| estimate_entry_height(entry, 0, content_width))
            .collect::<Vec<_>>();
        let hashes_before = entries
            .iter()
            .map(|entry| layout_hash(entry, 0))
            .collect::<Vec<_>>();

        assert_eq!(heights_before.len(), 2_000);
        assert!(heights_before.iter().all(|height| *height > Pixels::ZERO));

        if let Some(last_entry) = entries.last_mut() {
            // Tail-only mutation should invalidate only the final row hash.
            last_entry.text = "resolved reply".to_string();
            last_entry.status = EntryStatus::Done;
        }

        let hashes_after = entries
            .iter()
            .map(|entry| layout_hash(entry, 0))
            .collect::<Vec<_>>();

        assert_eq!(hashes_before[..1_999], hashes_after[..1_999]);
        assert_ne!(hashes_before[1_999], hashes_after[1_999]);
    }

    #[test]
    fn settled_replies_reserve_room_for_the_action_row() {
        let width = px(680.);
        let pending = entry(1, Sender::Bot, "", EntryStatus::Pending);
        let settled = entry(2, Sender::Bot, "short", EntryStatus::Done);

        let pending_height = estimate_entry_height(&pending, 0, width);
        let settled_height = estimate_entry_height(&settled, 0, width);

        assert!(settled_height > pending_height);
    }

    #[test]
    fn suggestion_rows_add_estimated_height_and_change_the_hash() {
        let width = px(680.);
        let reply = entry(1, Sender::Bot, "Body RELATED_TOPICS: A | B", EntryStatus::Done);

        let without_topics = estimate_entry_height(&reply, 0, width);
        let with_topics = estimate_entry_height(&reply, 2, width);
        assert!(with_topics > without_topics);

        assert_ne!(layout_hash(&reply, 0), layout_hash(&reply, 2));
    }

    #[test]
    fn height_estimation_uses_the_reply_body_not_the_raw_text() {
        let width = px(680.);
        let plain = entry(1, Sender::Bot, "Body", EntryStatus::Done);
        let with_marker = entry(
            2,
            Sender::Bot,
            "Body RELATED_TOPICS: TopicA | TopicB | TopicC | TopicD",
            EntryStatus::Done,
        );

        // The marker tail never renders, so it must not inflate the estimate.
        assert_eq!(
            estimate_entry_height(&plain, 0, width),
            estimate_entry_height(&with_marker, 0, width)
        );
    }
}
