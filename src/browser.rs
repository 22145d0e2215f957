//! Browser and platform detection
//!
//! - User-agent sniffing: browser, engine, OS, version, mobile
//! - CSS feature probes against a style object
//!
//! Everything is data-driven and pure so it runs natively in tests; the
//! browser target adds `detect()` constructors that read the live page.

use crate::format::capitalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    Edge,
    Firefox,
    Safari,
    Opera,
    IE,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Blink,
    WebKit,
    Gecko,
    Trident,
    EdgeHtml,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Windows,
    Mac,
    Linux,
    Android,
    Ios,
    ChromeOs,
    Unknown,
}

/// What the user agent says about the browser
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserInfo {
    pub browser: Browser,
    pub engine: Engine,
    pub os: Os,
    /// `major.minor`, 0.0 if unknown
    pub version: f64,
    pub is_mobile: bool,
}

/// Browser identification rules, first match wins. Order matters: Edge and
/// Opera also claim to be Chrome, Chrome also claims to be Safari.
const BROWSER_RULES: &[(Browser, &[&str])] = &[
    (Browser::Edge, &["Edg/", "EdgA/", "EdgiOS/", "Edge/"]),
    (Browser::Opera, &["OPR/", "Opera/"]),
    (Browser::Chrome, &["CriOS/", "Chrome/"]),
    (Browser::Firefox, &["FxiOS/", "Firefox/"]),
    (Browser::IE, &["MSIE ", "rv:"]),
    (Browser::Safari, &["Version/"]),
];

impl BrowserInfo {
    pub fn from_user_agent(ua: &str) -> Self {
        let (browser, version) = identify_browser(ua);
        Self {
            browser,
            engine: identify_engine(ua, browser),
            os: identify_os(ua),
            version,
            is_mobile: ua.contains("Mobi") || ua.contains("iPhone") || ua.contains("iPod"),
        }
    }

    /// Sniff the running browser (browser target only)
    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    pub fn detect() -> crate::platform::PlatformResult<Self> {
        use crate::platform::PlatformError;

        let window = web_sys::window()
            .ok_or_else(|| PlatformError::Unavailable("No window object".to_string()))?;
        let ua = window
            .navigator()
            .user_agent()
            .map_err(|e| PlatformError::HostCall(format!("userAgent: {:?}", e)))?;
        Ok(Self::from_user_agent(&ua))
    }

    pub fn is_webkit(&self) -> bool {
        matches!(self.engine, Engine::WebKit | Engine::Blink)
    }
}

fn identify_browser(ua: &str) -> (Browser, f64) {
    let is_ie = ua.contains("MSIE ") || ua.contains("Trident/");
    let is_safari = ua.contains("Safari/") && ua.contains("AppleWebKit");

    for (browser, tokens) in BROWSER_RULES {
        match browser {
            Browser::IE if !is_ie => continue,
            Browser::Safari if !is_safari => continue,
            _ => {}
        }
        for token in tokens.iter() {
            if let Some(version) = version_after(ua, token) {
                return (*browser, version);
            }
        }
    }
    (Browser::Unknown, 0.0)
}

fn identify_engine(ua: &str, browser: Browser) -> Engine {
    if ua.contains("Trident/") || ua.contains("MSIE ") {
        Engine::Trident
    } else if ua.contains("Edge/") {
        Engine::EdgeHtml
    } else if ua.contains("Gecko/") && !ua.contains("like Gecko") {
        Engine::Gecko
    } else if ua.contains("AppleWebKit") {
        // iOS forces WebKit on every browser
        let ios = matches!(identify_os(ua), Os::Ios);
        match browser {
            Browser::Chrome | Browser::Edge | Browser::Opera if !ios => Engine::Blink,
            _ => Engine::WebKit,
        }
    } else {
        Engine::Unknown
    }
}

fn identify_os(ua: &str) -> Os {
    if ua.contains("Windows") {
        Os::Windows
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        Os::Ios
    } else if ua.contains("Android") {
        Os::Android
    } else if ua.contains("CrOS") {
        Os::ChromeOs
    } else if ua.contains("Macintosh") || ua.contains("Mac OS X") {
        Os::Mac
    } else if ua.contains("Linux") {
        Os::Linux
    } else {
        Os::Unknown
    }
}

/// `major.minor` following `token`, if the token is present
fn version_after(ua: &str, token: &str) -> Option<f64> {
    let start = ua.find(token)? + token.len();
    let raw: String = ua[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = raw.split('.');
    let major = parts.next().filter(|p| !p.is_empty())?;
    let version = match parts.next().filter(|p| !p.is_empty()) {
        Some(minor) => format!("{}.{}", major, minor),
        None => major.to_string(),
    };
    version.parse().ok()
}

/// Something that can answer questions about a CSS style object
pub trait StyleProbe {
    /// The style object knows the (camelCase) property
    fn has_property(&self, name: &str) -> bool;

    /// Setting `property` to `value` sticks
    fn accepts(&self, property: &str, value: &str) -> bool;
}

const VENDOR_PREFIXES: [&str; 4] = ["Webkit", "Moz", "ms", "O"];

/// CSS capabilities of the running browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features {
    pub transforms: bool,
    pub transforms_3d: bool,
    pub transitions: bool,
    pub animations: bool,
    pub border_radius: bool,
    pub box_shadow: bool,
    pub flexbox: bool,
    pub opacity: bool,
    pub rgba: bool,
}

impl Features {
    pub fn probe(style: &impl StyleProbe) -> Self {
        let supports = |prop: &str| {
            style.has_property(prop)
                || VENDOR_PREFIXES
                    .iter()
                    .any(|prefix| style.has_property(&format!("{}{}", prefix, capitalize(prop))))
        };

        Self {
            transforms: supports("transform"),
            transforms_3d: supports("perspective"),
            transitions: supports("transition"),
            animations: supports("animationName"),
            border_radius: supports("borderRadius"),
            box_shadow: supports("boxShadow"),
            flexbox: supports("flexWrap"),
            opacity: supports("opacity"),
            rgba: style.accepts("color", "rgba(1, 5, 13, 0.44)"),
        }
    }

    /// Probe a scratch element of the live document (browser target only)
    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    pub fn detect() -> crate::platform::PlatformResult<Self> {
        Ok(Self::probe(&web::ScratchStyle::new()?))
    }
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod web {
    use super::StyleProbe;
    use crate::platform::{PlatformError, PlatformResult};
    use wasm_bindgen::{JsCast, JsValue};

    /// Style object of a detached `<div>`
    pub struct ScratchStyle {
        style: web_sys::CssStyleDeclaration,
    }

    impl ScratchStyle {
        pub fn new() -> PlatformResult<Self> {
            let document = web_sys::window()
                .and_then(|w| w.document())
                .ok_or_else(|| PlatformError::Unavailable("No document".to_string()))?;
            let div: web_sys::HtmlElement = document
                .create_element("div")
                .map_err(|e| PlatformError::HostCall(format!("createElement: {:?}", e)))?
                .dyn_into()
                .map_err(|_| PlatformError::HostCall("Failed to cast to HtmlElement".to_string()))?;
            Ok(Self { style: div.style() })
        }
    }

    impl StyleProbe for ScratchStyle {
        fn has_property(&self, name: &str) -> bool {
            js_sys::Reflect::has(&self.style, &JsValue::from_str(name)).unwrap_or(false)
        }

        fn accepts(&self, property: &str, value: &str) -> bool {
            self.style.set_property(property, value).is_ok()
                && self
                    .style
                    .get_property_value(property)
                    .map(|v| !v.is_empty())
                    .unwrap_or(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.109 Safari/537.36";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15";
    const CHROME_IOS: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/120.0.6099.119 Mobile/15E148 Safari/604.1";
    const IE11: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64; Trident/7.0; rv:11.0) like Gecko";
    const IE8: &str = "Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 6.1; Trident/4.0)";
    const OPERA_ANDROID: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Mobile Safari/537.36 OPR/79.1.4195.76595";

    #[test]
    fn test_desktop_browsers() {
        let info = BrowserInfo::from_user_agent(CHROME_WIN);
        assert_eq!(
            (info.browser, info.engine, info.os, info.version),
            (Browser::Chrome, Engine::Blink, Os::Windows, 120.0)
        );
        assert!(!info.is_mobile);
        assert!(info.is_webkit());

        let info = BrowserInfo::from_user_agent(EDGE_WIN);
        assert_eq!((info.browser, info.engine), (Browser::Edge, Engine::Blink));

        let info = BrowserInfo::from_user_agent(FIREFOX_LINUX);
        assert_eq!(
            (info.browser, info.engine, info.os, info.version),
            (Browser::Firefox, Engine::Gecko, Os::Linux, 121.0)
        );

        let info = BrowserInfo::from_user_agent(SAFARI_MAC);
        assert_eq!(
            (info.browser, info.engine, info.os, info.version),
            (Browser::Safari, Engine::WebKit, Os::Mac, 17.2)
        );
    }

    #[test]
    fn test_internet_explorer() {
        let info = BrowserInfo::from_user_agent(IE11);
        assert_eq!(
            (info.browser, info.engine, info.version),
            (Browser::IE, Engine::Trident, 11.0)
        );
        let info = BrowserInfo::from_user_agent(IE8);
        assert_eq!((info.browser, info.version), (Browser::IE, 8.0));
    }

    #[test]
    fn test_mobile_browsers() {
        let info = BrowserInfo::from_user_agent(CHROME_IOS);
        assert_eq!(
            (info.browser, info.engine, info.os),
            (Browser::Chrome, Engine::WebKit, Os::Ios)
        );
        assert!(info.is_mobile);

        let info = BrowserInfo::from_user_agent(OPERA_ANDROID);
        assert_eq!(
            (info.browser, info.engine, info.os),
            (Browser::Opera, Engine::Blink, Os::Android)
        );
        assert_eq!(info.version, 79.1);
        assert!(info.is_mobile);
    }

    #[test]
    fn test_unknown_agent() {
        let info = BrowserInfo::from_user_agent("curl/8.4.0");
        assert_eq!(info.browser, Browser::Unknown);
        assert_eq!(info.engine, Engine::Unknown);
        assert_eq!(info.os, Os::Unknown);
        assert_eq!(info.version, 0.0);
    }

    struct FakeStyle {
        properties: HashSet<&'static str>,
        rgba: bool,
    }

    impl StyleProbe for FakeStyle {
        fn has_property(&self, name: &str) -> bool {
            self.properties.contains(name)
        }

        fn accepts(&self, _property: &str, value: &str) -> bool {
            self.rgba || !value.starts_with("rgba")
        }
    }

    #[test]
    fn test_feature_probe_with_prefixes() {
        let style = FakeStyle {
            properties: ["transform", "WebkitTransition", "MozBorderRadius", "opacity"]
                .into_iter()
                .collect(),
            rgba: true,
        };
        let features = Features::probe(&style);
        assert!(features.transforms);
        assert!(features.transitions);
        assert!(features.border_radius);
        assert!(features.opacity);
        assert!(features.rgba);
        assert!(!features.transforms_3d);
        assert!(!features.animations);
        assert!(!features.flexbox);
        assert!(!features.box_shadow);
    }

    #[test]
    fn test_feature_probe_old_browser() {
        let style = FakeStyle {
            properties: HashSet::new(),
            rgba: false,
        };
        assert_eq!(Features::probe(&style), Features::default());
    }
}
