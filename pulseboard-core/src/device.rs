//! Device classification from user-agent strings.
//!
//! Classification is substring sniffing and inherently fragile, so it sits
//! behind the [`DeviceClassifier`] trait; the aggregation logic never sees
//! the matching rules and a proper UA-parsing implementation can be swapped
//! in without touching it.

use crate::types::DeviceCategory;

/// Anything that can map a user-agent string to a device family.
pub trait DeviceClassifier: Send + Sync {
    fn classify(&self, user_agent: &str) -> DeviceCategory;
}

/// Default classifier: case-insensitive keyword match, first match wins.
///
/// Priority order is mobile, then tablet, then desktop. A user agent
/// containing both "android" and "mobile" therefore counts once as mobile.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

const MOBILE_KEYWORDS: &[&str] = &["mobile", "android", "iphone"];
const TABLET_KEYWORDS: &[&str] = &["ipad", "tablet"];
const DESKTOP_KEYWORDS: &[&str] = &["windows", "mac", "linux"];

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceClassifier for KeywordClassifier {
    fn classify(&self, user_agent: &str) -> DeviceCategory {
        let ua = user_agent.to_lowercase();

        if MOBILE_KEYWORDS.iter().any(|kw| ua.contains(kw)) {
            DeviceCategory::Mobile
        } else if TABLET_KEYWORDS.iter().any(|kw| ua.contains(kw)) {
            DeviceCategory::Tablet
        } else if DESKTOP_KEYWORDS.iter().any(|kw| ua.contains(kw)) {
            DeviceCategory::Desktop
        } else {
            DeviceCategory::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iphone_is_mobile_not_tablet() {
        let classifier = KeywordClassifier::new();
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X)";
        assert_eq!(classifier.classify(ua), DeviceCategory::Mobile);
    }

    #[test]
    fn test_android_mobile_counts_once_as_mobile() {
        let classifier = KeywordClassifier::new();
        let ua = "Mozilla/5.0 (Linux; Android 13; Pixel 7) Mobile Safari/537.36";
        assert_eq!(classifier.classify(ua), DeviceCategory::Mobile);
    }

    #[test]
    fn test_ipad_is_tablet() {
        let classifier = KeywordClassifier::new();
        let ua = "Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X)";
        assert_eq!(classifier.classify(ua), DeviceCategory::Tablet);
    }

    #[test]
    fn test_desktop_platforms() {
        let classifier = KeywordClassifier::new();
        assert_eq!(
            classifier.classify("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
            DeviceCategory::Desktop
        );
        assert_eq!(
            classifier.classify("Mozilla/5.0 (X11; Linux x86_64)"),
            DeviceCategory::Desktop
        );
    }

    #[test]
    fn test_unrecognized_is_unknown() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.classify("curl/8.4.0"), DeviceCategory::Unknown);
        assert_eq!(classifier.classify(""), DeviceCategory::Unknown);
    }
}
