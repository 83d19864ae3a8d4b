use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::bitmap::Bitmap;

/// Layout family for the collage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollageStyle {
    /// Large lead image with a row of smaller ones underneath
    #[default]
    Collection,
    /// Row of equal-width columns
    Stack,
}

impl CollageStyle {
    pub fn max_slots(self) -> usize {
        match self {
            CollageStyle::Collection => 4,
            CollageStyle::Stack => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CollageStyle::Collection => "collection",
            CollageStyle::Stack => "stack",
        }
    }
}

impl FromStr for CollageStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collection" => Ok(CollageStyle::Collection),
            "stack" => Ok(CollageStyle::Stack),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CollageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the "+N" overlay goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CountLabelPosition {
    /// Covers the whole widget
    FullScreen,
    /// Covers the last visible slot
    #[default]
    #[serde(alias = "bottomRight")]
    LastItem,
}

impl CountLabelPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountLabelPosition::FullScreen => "full-screen",
            CountLabelPosition::LastItem => "last-item",
        }
    }
}

impl FromStr for CountLabelPosition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-screen" | "fullScreen" => Ok(CountLabelPosition::FullScreen),
            "last-item" | "lastItem" | "bottom-right" | "bottomRight" => {
                Ok(CountLabelPosition::LastItem)
            }
            _ => Err(()),
        }
    }
}

impl fmt::Display for CountLabelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentMode {
    /// Scale to cover the slot, centre crop
    Fill,
    /// Scale to fit inside the slot, letterbox
    Fit,
    /// Scale to cover the slot, keep the top-right corner
    TopAlignedFill,
}

impl ContentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentMode::Fill => "fill",
            ContentMode::Fit => "fit",
            ContentMode::TopAlignedFill => "top-aligned-fill",
        }
    }
}

impl FromStr for ContentMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fill" => Ok(ContentMode::Fill),
            "fit" => Ok(ContentMode::Fit),
            "top-aligned-fill" | "topAlignedFill" => Ok(ContentMode::TopAlignedFill),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl FromStr for Color {
    type Err = ();

    /// `#RRGGBB` or `#RRGGBBAA`, leading `#` optional
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };

        Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

/// Everything one `setup` call needs to know about presentation.
///
/// Built by the caller per setup and replaced wholesale by the next one.
/// Corner radius and border are inert styling applied to every slot and to
/// the count label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfiguration {
    pub count_label_position: CountLabelPosition,
    pub style: CollageStyle,
    /// Gap between slots, in points
    pub items_margin: f64,
    pub corner_radius: f64,
    pub border_color: Color,
    pub border_width: f64,
    /// Shown while loading and after a failure; built-in default when absent
    #[serde(skip)]
    pub placeholder_image: Option<Bitmap>,
    /// Bypasses content mode resolution when set
    pub images_content_mode: Option<ContentMode>,
}

impl Default for LayoutConfiguration {
    fn default() -> Self {
        Self {
            count_label_position: CountLabelPosition::LastItem,
            style: CollageStyle::Collection,
            items_margin: 2.0,
            corner_radius: 0.0,
            border_color: Color::BLACK,
            border_width: 0.0,
            placeholder_image: None,
            images_content_mode: None,
        }
    }
}

impl LayoutConfiguration {
    pub fn with_style(style: CollageStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn max_slots(&self) -> usize {
        self.style.max_slots()
    }

    /// Negative margins are treated as zero
    pub fn margin(&self) -> f64 {
        self.items_margin.max(0.0)
    }
}
