//! Favicon lookup for the `origin` of a stored entity.
//!
//! The origin page is fetched once and its `<link rel="...icon...">` tags are
//! collected, plus the conventional `/favicon.ico`. Icons are not downloaded;
//! their size comes from the `sizes` attribute, with fixed assumptions when it
//! is missing.

use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::config::IconConfig;
use crate::error::{ServerError, ServerResult};

/// Largest icon edge a size range may ask for.
pub const MAX_ICON_SIZE: u32 = 500;

/// Size assumed for an icon that declares none (the classic favicon).
const DEFAULT_ICON_SIZE: u32 = 16;

/// Size iOS assumes for an `apple-touch-icon` without `sizes`.
const APPLE_TOUCH_ICON_SIZE: u32 = 180;

/// Acceptable icon edge lengths: `min..perfect..max`, or a bare `perfect`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeRange {
    pub min: u32,
    pub perfect: u32,
    pub max: u32,
}

impl SizeRange {
    pub fn contains(&self, size: u32) -> bool {
        (self.min..=self.max).contains(&size)
    }
}

impl FromStr for SizeRange {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ServerError::BadRequest(format!("invalid size range {s:?}"));
        let parts = s
            .trim()
            .split("..")
            .map(|p| p.trim().parse::<u32>().map_err(|_| bad()))
            .collect::<Result<Vec<_>, _>>()?;
        let range = match parts.as_slice() {
            [perfect] => SizeRange {
                min: 0,
                perfect: *perfect,
                max: MAX_ICON_SIZE,
            },
            [min, perfect, max] => SizeRange {
                min: *min,
                perfect: *perfect,
                max: *max,
            },
            _ => return Err(bad()),
        };
        if range.min > range.perfect || range.perfect > range.max || range.max > MAX_ICON_SIZE {
            return Err(bad());
        }
        Ok(range)
    }
}

/// One candidate icon found on a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Icon {
    pub url: Url,
    /// Largest declared edge, or the assumed one.
    pub size: u32,
    /// `png`, `ico`, `gif`, `jpg`, `svg`, or empty when unknown.
    pub format: String,
}

impl Icon {
    fn is_scalable(&self) -> bool {
        self.format == "svg"
    }
}

/// Parse a comma-separated `formats` parameter. Empty means "any".
pub fn parse_formats(formats: Option<&str>) -> Vec<String> {
    formats
        .unwrap_or_default()
        .split(',')
        .map(|f| f.trim().to_ascii_lowercase())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Pick the icon closest to `range.perfect` among those inside the range and
/// in an allowed format. Scalable icons fit any range. Ties go to the
/// larger icon.
pub fn best_in_range<'a>(icons: &'a [Icon], range: &SizeRange, formats: &[String]) -> Option<&'a Icon> {
    icons
        .iter()
        .filter(|icon| formats.is_empty() || formats.iter().any(|f| *f == icon.format))
        .filter(|icon| icon.is_scalable() || range.contains(icon.size))
        .min_by_key(|icon| {
            let size = if icon.is_scalable() { range.perfect } else { icon.size };
            (size.abs_diff(range.perfect), std::cmp::Reverse(size))
        })
}

/// Fetches origin pages and extracts icon links from them.
pub struct IconFinder {
    client: reqwest::Client,
    link_tag: Regex,
    attribute: Regex,
}

impl IconFinder {
    pub fn new(config: &IconConfig) -> ServerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self::with_client(client))
    }

    fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            link_tag: Regex::new(r"(?is)<link\b[^>]*>").expect("static regex"),
            attribute: Regex::new(r#"(?s)([a-zA-Z-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
                .expect("static regex"),
        }
    }

    /// Fetch `origin` and list every icon it advertises.
    pub async fn fetch_icons(&self, origin: &str) -> ServerResult<Vec<Icon>> {
        let url = normalize_origin(origin)?;
        let response = self.client.get(url).send().await?.error_for_status()?;
        let base = response.url().clone();
        let html = response.text().await?;
        Ok(self.extract_icons(&html, &base))
    }

    /// Icons declared in `html`, resolved against `base`, plus the implicit
    /// `/favicon.ico` when the page does not declare it.
    pub fn extract_icons(&self, html: &str, base: &Url) -> Vec<Icon> {
        let mut icons: Vec<Icon> = self
            .link_tag
            .find_iter(html)
            .filter_map(|tag| self.icon_from_link(tag.as_str(), base))
            .collect();
        if let Ok(fallback) = base.join("/favicon.ico") {
            if !icons.iter().any(|icon| icon.url == fallback) {
                icons.push(Icon {
                    url: fallback,
                    size: DEFAULT_ICON_SIZE,
                    format: "ico".into(),
                });
            }
        }
        icons
    }

    fn icon_from_link(&self, tag: &str, base: &Url) -> Option<Icon> {
        let mut rel = None;
        let mut href = None;
        let mut sizes = None;
        let mut mime = None;
        for cap in self.attribute.captures_iter(tag) {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .or_else(|| cap.get(4))
                .map_or("", |m| m.as_str())
                .trim();
            match cap[1].to_ascii_lowercase().as_str() {
                "rel" => rel = Some(value.to_ascii_lowercase()),
                "href" => href = Some(value),
                "sizes" => sizes = Some(value),
                "type" => mime = Some(value.to_ascii_lowercase()),
                _ => {}
            }
        }

        let rel = rel?;
        if !rel.split_whitespace().any(|r| r.contains("icon")) {
            return None;
        }
        let url = base.join(href.filter(|h| !h.is_empty())?).ok()?;
        let format = mime
            .as_deref()
            .and_then(format_from_mime)
            .or_else(|| format_from_path(url.path()))
            .unwrap_or_default()
            .to_string();
        let default_size = if rel.contains("apple-touch-icon") {
            APPLE_TOUCH_ICON_SIZE
        } else {
            DEFAULT_ICON_SIZE
        };
        let size = sizes.and_then(largest_declared_size).unwrap_or(default_size);
        Some(Icon { url, size, format })
    }
}

/// Origins are stored as sent by browsers (`https://host`), but bare hosts
/// are accepted too.
fn normalize_origin(origin: &str) -> ServerResult<Url> {
    let origin = origin.trim();
    let parsed = Url::parse(origin)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .or_else(|| Url::parse(&format!("https://{origin}")).ok());
    parsed.ok_or_else(|| ServerError::BadRequest(format!("unusable origin {origin:?}")))
}

/// `sizes="16x16 32x32"` → 32. `any` (scalable) and junk are ignored.
fn largest_declared_size(sizes: &str) -> Option<u32> {
    sizes
        .split_whitespace()
        .filter_map(|s| {
            let s = s.to_ascii_lowercase();
            let (w, h) = s.split_once('x')?;
            Some(w.parse::<u32>().ok()?.max(h.parse::<u32>().ok()?))
        })
        .max()
}

fn format_from_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/png" => Some("png"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "image/gif" => Some("gif"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    }
}

fn format_from_path(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("png"),
        "ico" => Some("ico"),
        "gif" => Some("gif"),
        "jpg" | "jpeg" => Some("jpg"),
        "svg" => Some("svg"),
        _ => None,
    }
}
