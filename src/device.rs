//! Device emulation profiles.
//!
//! Social platforms serve very different markup to phones and desktops. The
//! mobile pages are lighter and more likely to carry a plain `<video src>`,
//! so the default profile is an Android phone.

use reqwest::header::{
    HeaderMap, HeaderValue, InvalidHeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT,
};
use serde::{Deserialize, Serialize};

/// Viewport emulated by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// User agent, viewport and header set for one emulated device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    pub user_agent: String,
    pub viewport: Viewport,
    pub mobile: bool,
    pub accept_language: String,
}

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

impl DeviceProfile {
    /// Android phone on Chrome, 412x915.
    #[must_use]
    pub fn android_mobile() -> Self {
        Self {
            name: "android".to_string(),
            user_agent: "Mozilla/5.0 (Linux; Android 10; Mobile) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36".to_string(),
            viewport: Viewport { width: 412, height: 915, scale: 2.625 },
            mobile: true,
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }

    /// iPhone on Safari, 390x844.
    #[must_use]
    pub fn iphone_mobile() -> Self {
        Self {
            name: "iphone".to_string(),
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1".to_string(),
            viewport: Viewport { width: 390, height: 844, scale: 3.0 },
            mobile: true,
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }

    /// Desktop Chrome on Windows, 1280x800.
    #[must_use]
    pub fn chrome_desktop() -> Self {
        Self {
            name: "desktop".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            viewport: Viewport { width: 1280, height: 800, scale: 1.0 },
            mobile: false,
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }

    /// Built-in profile by name.
    pub fn named(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "android" => Some(Self::android_mobile()),
            "iphone" | "ios" => Some(Self::iphone_mobile()),
            "desktop" | "chrome" => Some(Self::chrome_desktop()),
            _ => None,
        }
    }

    /// Names accepted by [`DeviceProfile::named`].
    pub const BUILTIN: &'static [&'static str] = &["android", "iphone", "desktop"];

    /// Request headers a real browser on this device sends for a navigation.
    pub fn to_headers(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&self.accept_language)?);

        // Client hints only exist on Chromium
        if self.user_agent.contains("Chrome/") {
            let mobile = if self.mobile { "?1" } else { "?0" };
            let platform = if self.user_agent.contains("Android") {
                "\"Android\""
            } else {
                "\"Windows\""
            };
            headers.insert("Sec-CH-UA-Mobile", HeaderValue::from_static(mobile));
            headers.insert("Sec-CH-UA-Platform", HeaderValue::from_static(platform));
        }

        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        Ok(headers)
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::android_mobile()
    }
}
