//! Media URL rewriting.
//!
//! Pure transformation of stored asset URLs into display URLs: when the URL
//! belongs to the known media host, a size/format transform segment is
//! inserted; any other URL passes through unchanged.

/// Hostname fragment identifying transformable media URLs.
const MEDIA_HOST: &str = "cloudinary.com";

/// Path segment after which the transform is inserted.
const UPLOAD_SEGMENT: &str = "/upload/";

/// Size/format presets for different placements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPreset {
    /// Full-width hero/background images.
    Hero,
    /// Card and gallery thumbnails.
    Card,
}

impl MediaPreset {
    fn transform(self) -> &'static str {
        match self {
            Self::Hero => "w_800,f_auto,q_auto,c_fill,g_auto",
            Self::Card => "w_300,h_300,c_fill,f_auto,q_auto",
        }
    }
}

/// Rewrite an asset URL for display.
///
/// Identity for empty URLs, non-media hosts, and URLs without an upload
/// segment.
pub fn display_url(url: &str, preset: MediaPreset) -> String {
    if url.is_empty() || !url.contains(MEDIA_HOST) {
        return url.to_string();
    }

    match url.find(UPLOAD_SEGMENT) {
        Some(_) => url.replacen(
            UPLOAD_SEGMENT,
            &format!("{UPLOAD_SEGMENT}{}/", preset.transform()),
            1,
        ),
        None => url.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn media_url_gets_transform() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1/auto.jpg";
        let display = display_url(url, MediaPreset::Hero);
        assert_eq!(
            display,
            "https://res.cloudinary.com/demo/image/upload/w_800,f_auto,q_auto,c_fill,g_auto/v1/auto.jpg"
        );
    }

    #[test]
    fn card_preset_differs_from_hero() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1/auto.jpg";
        assert!(display_url(url, MediaPreset::Card).contains("w_300,h_300"));
    }

    #[test]
    fn foreign_host_is_identity() {
        let url = "https://example.com/upload/foto.jpg";
        assert_eq!(display_url(url, MediaPreset::Hero), url);
    }

    #[test]
    fn media_host_without_upload_segment_is_identity() {
        let url = "https://res.cloudinary.com/demo/raw/foto.jpg";
        assert_eq!(display_url(url, MediaPreset::Card), url);
    }

    #[test]
    fn empty_url_is_identity() {
        assert_eq!(display_url("", MediaPreset::Card), "");
    }

    #[test]
    fn only_first_upload_segment_is_rewritten() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1/upload/a.jpg";
        let display = display_url(url, MediaPreset::Card);
        assert_eq!(display.matches("c_fill").count(), 1);
    }
}
