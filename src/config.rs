use std::env;

use crate::layout_config::{
    CollageStyle, Color, ContentMode, CountLabelPosition, LayoutConfiguration,
};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// No disk layer when unset
    pub disk_cache_path: Option<String>,
    pub memory_cache_size: usize,
    pub memory_cache_max_size_mb: usize,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    pub max_image_size_mb: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub font_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    pub network: NetworkConfig,
    pub render: RenderConfig,
    pub style: CollageStyle,
    pub count_label_position: CountLabelPosition,
    pub items_margin: f64,
    pub corner_radius: f64,
    pub border_width: f64,
    pub border_color: Color,
    pub content_mode: Option<ContentMode>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache: CacheConfig {
                disk_cache_path: None,
                memory_cache_size: 100,
                memory_cache_max_size_mb: 64,
            },
            network: NetworkConfig {
                timeout_secs: 15,
                max_image_size_mb: 20,
                user_agent: format!("collage-view/{}", env!("CARGO_PKG_VERSION")),
            },
            render: RenderConfig {
                width: 600,
                height: 600,
                font_path: None,
            },
            style: CollageStyle::Collection,
            count_label_position: CountLabelPosition::LastItem,
            items_margin: 2.0,
            corner_radius: 0.0,
            border_width: 0.0,
            border_color: Color::BLACK,
            content_mode: None,
        }
    }
}

fn invalid(name: &str, value: &str) -> Box<dyn std::error::Error> {
    format!("Invalid value for {}: {:?}", name, value).into()
}

fn parse_enum<T: std::str::FromStr>(
    name: &str,
    default: T,
) -> Result<T, Box<dyn std::error::Error>> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| invalid(name, &value)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Config::default();

        let content_mode = match env::var("COLLAGE_CONTENT_MODE") {
            Ok(value) if !value.is_empty() => Some(
                value
                    .parse::<ContentMode>()
                    .map_err(|_| invalid("COLLAGE_CONTENT_MODE", &value))?,
            ),
            _ => None,
        };

        Ok(Config {
            cache: CacheConfig {
                disk_cache_path: env::var("COLLAGE_CACHE_PATH").ok().filter(|p| !p.is_empty()),
                memory_cache_size: env::var("COLLAGE_MEMORY_CACHE_SIZE")
                    .unwrap_or_else(|_| defaults.cache.memory_cache_size.to_string())
                    .parse()?,
                memory_cache_max_size_mb: env::var("COLLAGE_MEMORY_CACHE_MAX_SIZE_MB")
                    .unwrap_or_else(|_| defaults.cache.memory_cache_max_size_mb.to_string())
                    .parse()?,
            },
            network: NetworkConfig {
                timeout_secs: env::var("COLLAGE_NETWORK_TIMEOUT_SECS")
                    .unwrap_or_else(|_| defaults.network.timeout_secs.to_string())
                    .parse()?,
                max_image_size_mb: env::var("COLLAGE_MAX_IMAGE_SIZE_MB")
                    .unwrap_or_else(|_| defaults.network.max_image_size_mb.to_string())
                    .parse()?,
                user_agent: env::var("COLLAGE_USER_AGENT")
                    .unwrap_or(defaults.network.user_agent),
            },
            render: RenderConfig {
                width: env::var("COLLAGE_WIDTH")
                    .unwrap_or_else(|_| defaults.render.width.to_string())
                    .parse()?,
                height: env::var("COLLAGE_HEIGHT")
                    .unwrap_or_else(|_| defaults.render.height.to_string())
                    .parse()?,
                font_path: env::var("COLLAGE_FONT_PATH").ok().filter(|p| !p.is_empty()),
            },
            style: parse_enum("COLLAGE_STYLE", defaults.style)?,
            count_label_position: parse_enum(
                "COLLAGE_COUNT_LABEL_POSITION",
                defaults.count_label_position,
            )?,
            items_margin: env::var("COLLAGE_ITEMS_MARGIN")
                .unwrap_or_else(|_| defaults.items_margin.to_string())
                .parse()?,
            corner_radius: env::var("COLLAGE_CORNER_RADIUS")
                .unwrap_or_else(|_| defaults.corner_radius.to_string())
                .parse()?,
            border_width: env::var("COLLAGE_BORDER_WIDTH")
                .unwrap_or_else(|_| defaults.border_width.to_string())
                .parse()?,
            border_color: parse_enum("COLLAGE_BORDER_COLOR", defaults.border_color)?,
            content_mode,
        })
    }

    /// Layout settings for one `setup` call
    pub fn layout_configuration(&self) -> LayoutConfiguration {
        LayoutConfiguration {
            count_label_position: self.count_label_position,
            style: self.style,
            items_margin: self.items_margin,
            corner_radius: self.corner_radius,
            border_color: self.border_color,
            border_width: self.border_width,
            placeholder_image: None,
            images_content_mode: self.content_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_configuration_from_config() {
        let config = Config {
            style: CollageStyle::Stack,
            count_label_position: CountLabelPosition::FullScreen,
            items_margin: 6.0,
            content_mode: Some(ContentMode::Fit),
            ..Config::default()
        };

        let layout = config.layout_configuration();
        assert_eq!(layout.style, CollageStyle::Stack);
        assert_eq!(layout.count_label_position, CountLabelPosition::FullScreen);
        assert_eq!(layout.items_margin, 6.0);
        assert_eq!(layout.images_content_mode, Some(ContentMode::Fit));
        assert!(layout.placeholder_image.is_none());
    }

    #[test]
    fn test_defaults_match_layout_defaults() {
        let layout = Config::default().layout_configuration();
        let defaults = LayoutConfiguration::default();

        assert_eq!(layout.style, defaults.style);
        assert_eq!(layout.count_label_position, defaults.count_label_position);
        assert_eq!(layout.items_margin, defaults.items_margin);
    }
}
