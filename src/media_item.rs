use log::warn;
use serde_json::Value;
use url::Url;

use crate::bitmap::Bitmap;
use crate::error::{CollageError, CollageResult};

/// One entry of the list handed to `setup`.
///
/// An inline `image` always wins over `url`. An empty `url` means unset.
#[derive(Debug, Clone, Default)]
pub struct MediaItem {
    pub image: Option<Bitmap>,
    pub url: String,
    /// Known intrinsic size before anything is loaded, for hosts that want
    /// to reserve space
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// What a loader will actually do with an item
#[derive(Debug, Clone, Copy)]
pub enum MediaSource<'a> {
    Inline(&'a Bitmap),
    Remote(&'a str),
    Unset,
}

impl MediaItem {
    pub fn inline(image: Bitmap) -> Self {
        Self {
            image: Some(image),
            ..Self::default()
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn source(&self) -> MediaSource<'_> {
        if let Some(image) = &self.image {
            MediaSource::Inline(image)
        } else if !self.url.is_empty() {
            MediaSource::Remote(&self.url)
        } else {
            MediaSource::Unset
        }
    }

    /// Parsed remote URL, `None` for inline, unset or malformed entries
    pub fn remote_url(&self) -> Option<Url> {
        match self.source() {
            MediaSource::Remote(raw) => parse_remote(raw),
            _ => None,
        }
    }

    /// True when the item is fetched over the network and its URL parses
    pub fn is_valid_remote(&self) -> bool {
        matches!(self.source(), MediaSource::Remote(raw) if parse_remote(raw).is_some())
    }

    /// Build an item from loosely typed input.
    ///
    /// Accepts a URL string or an object `{ "url": ..., "width": ..., "height": ... }`.
    /// Anything else is a caller bug and is rejected, in every build profile.
    pub fn from_json(index: usize, value: &Value) -> CollageResult<Self> {
        match value {
            Value::String(url) => Ok(Self::remote(url.as_str())),
            Value::Object(fields) => {
                let url = fields
                    .get("url")
                    .and_then(Value::as_str)
                    .ok_or(CollageError::UnsupportedMediaElement { index })?;

                let dimension = |key: &str| {
                    fields
                        .get(key)
                        .and_then(Value::as_u64)
                        .and_then(|v| u32::try_from(v).ok())
                };

                Ok(Self {
                    image: None,
                    url: url.to_string(),
                    width: dimension("width"),
                    height: dimension("height"),
                })
            }
            _ => Err(CollageError::UnsupportedMediaElement { index }),
        }
    }
}

fn parse_remote(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Ignoring malformed image URL {:?}: {}", raw, e);
            None
        }
    }
}

impl From<Bitmap> for MediaItem {
    fn from(image: Bitmap) -> Self {
        MediaItem::inline(image)
    }
}

impl From<&str> for MediaItem {
    fn from(url: &str) -> Self {
        MediaItem::remote(url)
    }
}

impl From<String> for MediaItem {
    fn from(url: String) -> Self {
        MediaItem::remote(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use serde_json::json;

    fn bitmap() -> Bitmap {
        Bitmap::new(DynamicImage::ImageRgb8(RgbImage::new(2, 2)))
    }

    #[test]
    fn test_inline_image_wins_over_url() {
        let mut item = MediaItem::inline(bitmap());
        item.url = "https://example.com/a.jpg".to_string();

        assert!(matches!(item.source(), MediaSource::Inline(_)));
        assert!(item.remote_url().is_none());
    }

    #[test]
    fn test_empty_url_is_unset() {
        assert!(matches!(MediaItem::default().source(), MediaSource::Unset));
        assert!(matches!(MediaItem::remote("").source(), MediaSource::Unset));
    }

    #[test]
    fn test_remote_url_parsing() {
        let item = MediaItem::remote("https://example.com/photo.png");
        assert_eq!(
            item.remote_url().map(|u| u.host_str().map(str::to_string)),
            Some(Some("example.com".to_string()))
        );

        assert!(MediaItem::remote("not a url").remote_url().is_none());
    }

    #[test]
    fn test_is_valid_remote() {
        assert!(MediaItem::remote("https://example.com/photo.png").is_valid_remote());
        assert!(!MediaItem::remote("not a url").is_valid_remote());
        assert!(!MediaItem::default().is_valid_remote());
        assert!(!MediaItem::inline(bitmap()).is_valid_remote());
    }

    #[test]
    fn test_from_json_accepts_strings_and_objects() {
        let item = MediaItem::from_json(0, &json!("https://example.com/1.jpg")).unwrap();
        assert_eq!(item.url, "https://example.com/1.jpg");

        let item = MediaItem::from_json(
            1,
            &json!({"url": "https://example.com/2.jpg", "width": 640, "height": 480}),
        )
        .unwrap();
        assert_eq!(item.width, Some(640));
        assert_eq!(item.height, Some(480));
    }

    #[test]
    fn test_from_json_rejects_other_types() {
        for (index, value) in [json!(42), json!(null), json!(["a"]), json!({"href": "x"})]
            .iter()
            .enumerate()
        {
            let err = MediaItem::from_json(index, value).unwrap_err();
            assert!(matches!(
                err,
                CollageError::UnsupportedMediaElement { index: i } if i == index
            ));
        }
    }

    #[test]
    fn test_conversions() {
        let from_str: MediaItem = "https://example.com/x.jpg".into();
        assert_eq!(from_str.url, "https://example.com/x.jpg");

        let from_bitmap: MediaItem = bitmap().into();
        assert!(from_bitmap.image.is_some());
    }
}
