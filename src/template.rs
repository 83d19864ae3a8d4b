//! Slot templates for one to four visible items.
//!
//! A template is a list of declarative constraints, one per slot, in the
//! spirit of auto layout anchors: per axis a slot may be pinned to the
//! container start (or placed after an earlier slot), pinned to the container
//! end, and/or given a length relative to the container. Exactly two of the
//! three are set for every axis, so each slot resolves to one frame.
//!
//! Templates only depend on slot count and style. Frames depend on the
//! container size and are re-resolved on every layout pass.

use crate::geometry::{Rect, Size};
use crate::layout_config::{CollageStyle, CountLabelPosition};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartAnchor {
    /// Leading or top edge of the container
    Container,
    /// End of the given earlier slot plus one margin
    After(usize),
    /// Centred in the container; needs a length
    Center,
}

/// `container * fraction + margin * margin_factor` along the same axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length {
    pub fraction: f64,
    pub margin_factor: f64,
}

impl Length {
    pub const FULL: Length = Length {
        fraction: 1.0,
        margin_factor: 0.0,
    };
    /// Half the container minus half a gutter
    pub const HALF: Length = Length {
        fraction: 0.5,
        margin_factor: -0.5,
    };
    /// One of three columns separated by two gutters
    pub const THIRD: Length = Length {
        fraction: 1.0 / 3.0,
        margin_factor: -2.0 / 3.0,
    };
    /// Stack column: a third of the container minus a third of a gutter
    pub const STACK_THIRD: Length = Length {
        fraction: 1.0 / 3.0,
        margin_factor: -1.0 / 3.0,
    };
    /// Lead row of the collection style
    pub const TWO_THIRDS: Length = Length {
        fraction: 2.0 / 3.0,
        margin_factor: -0.5,
    };

    pub fn resolve(&self, container: f64, margin: f64) -> f64 {
        container * self.fraction + margin * self.margin_factor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisConstraint {
    pub start: Option<StartAnchor>,
    pub end_pinned: bool,
    pub length: Option<Length>,
}

impl AxisConstraint {
    /// Pinned to both container edges
    pub const fn stretch() -> Self {
        Self {
            start: Some(StartAnchor::Container),
            end_pinned: true,
            length: None,
        }
    }

    pub const fn leading(length: Length) -> Self {
        Self {
            start: Some(StartAnchor::Container),
            end_pinned: false,
            length: Some(length),
        }
    }

    pub const fn trailing(length: Length) -> Self {
        Self {
            start: None,
            end_pinned: true,
            length: Some(length),
        }
    }

    pub const fn after(slot: usize, length: Length) -> Self {
        Self {
            start: Some(StartAnchor::After(slot)),
            end_pinned: false,
            length: Some(length),
        }
    }

    pub const fn centered(length: Length) -> Self {
        Self {
            start: Some(StartAnchor::Center),
            end_pinned: false,
            length: Some(length),
        }
    }

    /// Placed after `slot`, stretched to the container end
    pub const fn after_to_end(slot: usize) -> Self {
        Self {
            start: Some(StartAnchor::After(slot)),
            end_pinned: true,
            length: None,
        }
    }

    fn is_determined(&self, own_index: usize) -> bool {
        let anchors =
            self.start.is_some() as u8 + self.end_pinned as u8 + self.length.is_some() as u8;
        let start_valid = match self.start {
            Some(StartAnchor::After(slot)) => slot < own_index,
            Some(StartAnchor::Center) => self.length.is_some(),
            _ => true,
        };

        anchors == 2 && start_valid
    }

    /// Returns (origin, length) along this axis. `previous_ends` holds the
    /// already resolved end coordinate of every earlier slot.
    fn resolve(&self, container: f64, margin: f64, previous_ends: &[f64]) -> (f64, f64) {
        let length = self.length.map(|l| l.resolve(container, margin));
        let start = self.start.map(|anchor| match anchor {
            StartAnchor::Container => 0.0,
            StartAnchor::After(slot) => previous_ends.get(slot).copied().unwrap_or(0.0) + margin,
            StartAnchor::Center => (container - length.unwrap_or(container)) / 2.0,
        });

        match (start, self.end_pinned, length) {
            (Some(start), true, _) => (start, container - start),
            (Some(start), false, Some(length)) => (start, length),
            (None, true, Some(length)) => (container - length, length),
            (Some(start), false, None) => (start, 0.0),
            (None, _, length) => (0.0, length.unwrap_or(container)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotConstraint {
    pub horizontal: AxisConstraint,
    pub vertical: AxisConstraint,
}

impl SlotConstraint {
    pub const fn new(horizontal: AxisConstraint, vertical: AxisConstraint) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// True when both axes resolve to exactly one position and length and
    /// only reference slots laid out before `own_index`
    pub fn is_determined(&self, own_index: usize) -> bool {
        self.horizontal.is_determined(own_index) && self.vertical.is_determined(own_index)
    }
}

/// Template for `slot_count` visible items. Counts above the style's
/// maximum are clamped to it; zero yields an empty template.
pub fn select(slot_count: usize, style: CollageStyle) -> Vec<SlotConstraint> {
    use AxisConstraint as A;

    let full = A::stretch();

    match (slot_count.min(style.max_slots()), style) {
        (0, _) => Vec::new(),
        (1, _) => vec![SlotConstraint::new(full, full)],
        (2, _) => vec![
            SlotConstraint::new(A::leading(Length::HALF), full),
            SlotConstraint::new(A::trailing(Length::HALF), full),
        ],
        (3, CollageStyle::Collection) => vec![
            SlotConstraint::new(full, A::leading(Length::TWO_THIRDS)),
            SlotConstraint::new(A::leading(Length::HALF), A::after_to_end(0)),
            SlotConstraint::new(A::trailing(Length::HALF), A::after_to_end(0)),
        ],
        (3, CollageStyle::Stack) => vec![
            SlotConstraint::new(A::leading(Length::STACK_THIRD), full),
            SlotConstraint::new(A::centered(Length::STACK_THIRD), full),
            SlotConstraint::new(A::trailing(Length::STACK_THIRD), full),
        ],
        // Last column keeps whatever rounding the first two leave behind
        _ => vec![
            SlotConstraint::new(full, A::leading(Length::TWO_THIRDS)),
            SlotConstraint::new(A::leading(Length::THIRD), A::after_to_end(0)),
            SlotConstraint::new(A::after(1, Length::THIRD), A::after_to_end(0)),
            SlotConstraint::new(A::after(2, Length::THIRD), A::after_to_end(0)),
        ],
    }
}

/// Resolve a template against a container of `container` size
pub fn resolve_frames(constraints: &[SlotConstraint], container: Size, margin: f64) -> Vec<Rect> {
    let mut frames: Vec<Rect> = Vec::with_capacity(constraints.len());

    for constraint in constraints {
        let max_xs: Vec<f64> = frames.iter().map(Rect::max_x).collect();
        let max_ys: Vec<f64> = frames.iter().map(Rect::max_y).collect();

        let (x, width) = constraint
            .horizontal
            .resolve(container.width, margin, &max_xs);
        let (y, height) = constraint
            .vertical
            .resolve(container.height, margin, &max_ys);

        frames.push(Rect::new(x, y, width, height));
    }

    frames
}

/// Frame of the "+N" overlay: the whole widget, or exactly the last slot
pub fn count_label_frame(
    position: CountLabelPosition,
    container: Size,
    frames: &[Rect],
) -> Option<Rect> {
    match position {
        CountLabelPosition::FullScreen => Some(Rect::from_size(container)),
        CountLabelPosition::LastItem => frames.last().copied(),
    }
}
