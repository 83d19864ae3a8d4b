//! The collage state machine.
//!
//! A [`CollageController`] owns the slots of one collage widget. Every
//! mutation happens through `&mut self`: `setup`, `reset`, `layout` and the
//! completion entry points. Network loads finish on other threads and are
//! queued on the controller's completion channel; nothing touches a slot
//! until the host calls [`CollageController::drain_completions`],
//! [`CollageController::next_completion`] or [`CollageController::settle`].

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::bitmap::{default_placeholder, Bitmap};
use crate::content_mode;
use crate::error::CollageResult;
use crate::events::CollageEvents;
use crate::geometry::{Point, Rect, Size};
use crate::layout_config::{ContentMode, LayoutConfiguration};
use crate::loader::{
    CompletionSink, LoadCompletion, LoadHandle, LoadStart, LoadTicket, MediaLoader,
};
use crate::media_item::MediaItem;
use crate::template::{self, SlotConstraint};

/// Highest count shown on the "+N" label
pub const MAX_COUNT_LABEL: usize = 99;

#[derive(Debug, Clone)]
pub enum SlotState {
    Placeholder,
    Loading,
    Loaded(Bitmap),
    Failed,
}

/// One visible region bound to one media item
#[derive(Debug)]
pub struct Slot {
    index: usize,
    item: MediaItem,
    state: SlotState,
    frame: Rect,
    content_mode: ContentMode,
    placeholder: Bitmap,
    pending: Option<LoadHandle>,
}

impl Slot {
    fn new(index: usize, item: MediaItem, placeholder: Bitmap) -> Self {
        Self {
            index,
            item,
            state: SlotState::Placeholder,
            frame: Rect::default(),
            content_mode: ContentMode::Fit,
            placeholder,
            pending: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn item(&self) -> &MediaItem {
        &self.item
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn content_mode(&self) -> ContentMode {
        self.content_mode
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SlotState::Loading)
    }

    /// The loaded bitmap, or the placeholder in every other state
    pub fn displayed_bitmap(&self) -> &Bitmap {
        match &self.state {
            SlotState::Loaded(bitmap) => bitmap,
            _ => &self.placeholder,
        }
    }

    fn refresh_content_mode(&mut self, override_mode: Option<ContentMode>) {
        let intrinsic = self.displayed_bitmap().intrinsic();
        self.content_mode = content_mode::resolve(intrinsic, self.frame.size(), override_mode);
    }
}

/// The "+N" overlay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountLabel {
    pub hidden: bool,
    pub text: String,
    /// Set by the last layout pass while visible
    pub frame: Option<Rect>,
}

impl CountLabel {
    fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::default()
        }
    }
}

/// What happened to a completion taken off the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Applied,
    /// Issued by an older generation, or its slot stopped waiting for it
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollagePhase {
    /// Never set up, or reset since
    Empty,
    /// At least one slot still waits for the network
    Loading,
    Settled,
}

pub struct CollageController {
    loader: MediaLoader,
    events: CollageEvents,
    configuration: LayoutConfiguration,
    configured: bool,
    constraints: Vec<SlotConstraint>,
    slots: Vec<Slot>,
    remaining_count: usize,
    count_label: CountLabel,
    bounds: Size,
    sink: CompletionSink,
    completions: UnboundedReceiver<LoadCompletion>,
}

impl CollageController {
    pub fn new(loader: MediaLoader) -> Self {
        let (sink, completions) = CompletionSink::channel();

        Self {
            loader,
            events: CollageEvents::default(),
            configuration: LayoutConfiguration::default(),
            configured: false,
            constraints: Vec::new(),
            slots: Vec::new(),
            remaining_count: 0,
            count_label: CountLabel::hidden(),
            bounds: Size::default(),
            sink,
            completions,
        }
    }

    pub fn set_events(&mut self, events: CollageEvents) {
        self.events = events;
    }

    /// Configuration of the last `setup`
    pub fn configuration(&self) -> &LayoutConfiguration {
        &self.configuration
    }

    pub fn generation(&self) -> u64 {
        self.sink.current_generation()
    }

    pub fn bounds(&self) -> Size {
        self.bounds
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// The slot at `index`, `None` past the current slot count
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.remaining_count
    }

    pub fn count_label(&self) -> &CountLabel {
        &self.count_label
    }

    pub fn phase(&self) -> CollagePhase {
        if !self.configured {
            CollagePhase::Empty
        } else if self.slots.iter().any(Slot::is_loading) {
            CollagePhase::Loading
        } else {
            CollagePhase::Settled
        }
    }

    /// Drop every slot and hide the label. In-flight loads keep running but
    /// their completions belong to an old generation and will be discarded.
    pub fn reset(&mut self) {
        let generation = self.sink.advance();
        debug!("Collage reset, generation {}", generation);

        self.configured = false;
        self.constraints.clear();
        self.slots.clear();
        self.remaining_count = 0;
        self.count_label = CountLabel::hidden();
    }

    pub fn setup(&mut self, images: Vec<MediaItem>, configuration: LayoutConfiguration) {
        self.reset();

        let total = images.len();
        let max_slots = configuration.max_slots();
        let placeholder = configuration
            .placeholder_image
            .clone()
            .unwrap_or_else(default_placeholder);
        let generation = self.sink.current_generation();

        info!(
            "Setting up collage: {} items, style {}, generation {}",
            total, configuration.style, generation
        );

        let mut cache_hits = Vec::new();
        for (index, item) in images.into_iter().take(max_slots).enumerate() {
            let mut slot = Slot::new(index, item, placeholder.clone());
            let ticket = LoadTicket { generation, slot: index };

            match self.loader.load(&slot.item, ticket, &self.sink) {
                LoadStart::Immediate { bitmap, from_cache } => {
                    if from_cache {
                        cache_hits.push((slot.item.url.clone(), bitmap.clone()));
                    }
                    slot.state = SlotState::Loaded(bitmap);
                }
                LoadStart::Pending(handle) => {
                    slot.state = SlotState::Loading;
                    slot.pending = Some(handle);
                }
                LoadStart::Unset => {}
            }
            self.slots.push(slot);
        }

        self.remaining_count = total.saturating_sub(self.slots.len());
        if total > max_slots {
            self.count_label = CountLabel {
                hidden: false,
                text: format!("+{}", self.remaining_count.min(MAX_COUNT_LABEL)),
                frame: None,
            };
        }

        self.constraints = template::select(self.slots.len(), configuration.style);
        self.configuration = configuration;
        self.configured = true;
        self.layout(self.bounds);

        for (url, bitmap) in &cache_hits {
            self.events.image_loaded(url, bitmap);
        }
    }

    /// `setup` for anything convertible to a [`MediaItem`]: bitmaps, URL
    /// strings or items
    pub fn setup_with<I>(&mut self, images: I, configuration: LayoutConfiguration)
    where
        I: IntoIterator,
        I::Item: Into<MediaItem>,
    {
        let items = images.into_iter().map(Into::into).collect();
        self.setup(items, configuration);
    }

    /// `setup` for loosely typed input. Every element is validated first; on
    /// error the controller is left untouched.
    pub fn setup_json(
        &mut self,
        images: &[Value],
        configuration: LayoutConfiguration,
    ) -> CollageResult<()> {
        let items = images
            .iter()
            .enumerate()
            .map(|(index, value)| MediaItem::from_json(index, value))
            .collect::<CollageResult<Vec<_>>>()?;

        self.setup(items, configuration);
        Ok(())
    }

    /// Re-run geometry for new bounds. The template stays as selected at
    /// setup; content modes are resolved again for every slot.
    pub fn layout(&mut self, bounds: Size) {
        self.bounds = bounds;

        let margin = self.configuration.margin();
        let frames = template::resolve_frames(&self.constraints, bounds, margin);
        let override_mode = self.configuration.images_content_mode;

        for (slot, frame) in self.slots.iter_mut().zip(&frames) {
            slot.frame = *frame;
            slot.refresh_content_mode(override_mode);
        }

        if !self.count_label.hidden {
            self.count_label.frame = template::count_label_frame(
                self.configuration.count_label_position,
                bounds,
                &frames,
            );
        }
    }

    /// Apply one finished load. Completions from an older generation are
    /// dropped without any side effect.
    pub fn apply_completion(&mut self, completion: LoadCompletion) -> CompletionOutcome {
        if !self.sink.is_current(completion.ticket) {
            return CompletionOutcome::Discarded;
        }

        let override_mode = self.configuration.images_content_mode;
        let slot = match self.slots.get_mut(completion.ticket.slot) {
            Some(slot) if slot.is_loading() => slot,
            _ => return CompletionOutcome::Discarded,
        };
        slot.pending = None;

        match completion.result {
            Ok(bitmap) => {
                debug!("Loaded {} into slot {}", completion.url, slot.index);
                slot.state = SlotState::Loaded(bitmap.clone());
                slot.refresh_content_mode(override_mode);
                self.events.image_loaded(&completion.url, &bitmap);
            }
            Err(e) => {
                warn!("Failed to load {}: {}", completion.url, e);
                slot.state = SlotState::Failed;
                slot.refresh_content_mode(override_mode);
                self.events.image_load_failed(&completion.url, &e);
            }
        }

        CompletionOutcome::Applied
    }

    /// Apply every completion already queued, without waiting. Returns how
    /// many were applied.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;

        loop {
            match self.completions.try_recv() {
                Ok(completion) => {
                    if self.apply_completion(completion) == CompletionOutcome::Applied {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        applied
    }

    /// Wait for the next completion and apply it
    pub async fn next_completion(&mut self) -> Option<CompletionOutcome> {
        let completion = self.completions.recv().await?;
        Some(self.apply_completion(completion))
    }

    /// Wait until no slot is loading
    pub async fn settle(&mut self) {
        while self.slots.iter().any(Slot::is_loading) {
            if self.next_completion().await.is_none() {
                break;
            }
        }
    }

    /// Abort in-flight loads; their slots fall back to the placeholder
    pub fn cancel_pending_loads(&mut self) {
        let override_mode = self.configuration.images_content_mode;

        for slot in &mut self.slots {
            if let Some(handle) = slot.pending.take() {
                handle.cancel();
            }
            if slot.is_loading() {
                slot.state = SlotState::Placeholder;
                slot.refresh_content_mode(override_mode);
            }
        }
    }

    /// Index of the slot under `point`
    pub fn slot_at(&self, point: Point) -> Option<usize> {
        self.slots
            .iter()
            .find(|slot| slot.frame.contains(point))
            .map(Slot::index)
    }

    /// Report a tap on slot `index`. The index is forwarded as is, even if
    /// the collage was set up again since the tap happened.
    pub fn tap(&self, index: usize) {
        debug!("Slot {} tapped", index);
        self.events.slot_tapped(index);
    }

    /// Hit-test `point` and report the tap. Returns the tapped slot.
    pub fn tap_at(&self, point: Point) -> Option<usize> {
        let index = self.slot_at(point)?;
        self.tap(index);
        Some(index)
    }

    /// Empty both cache layers; only future lookups are affected
    pub fn clear_images_cache(&self) {
        let cache = self.loader.cache();
        cache.clear_memory();

        match cache.clear_disk() {
            Ok(()) => info!("Cleared image caches"),
            Err(e) => warn!("Failed to clear disk image cache: {}", e),
        }
    }
}
