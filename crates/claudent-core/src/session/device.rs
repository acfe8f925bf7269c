//! Device fingerprinting from client hints and the user-agent string.
//!
//! The result is shown in session lists only. Nothing here is trusted for
//! security decisions.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::DeviceInfo;

pub const DEVICE_PHONE: &str = "Phone";
pub const DEVICE_TABLET: &str = "Tablet";
pub const DEVICE_DESKTOP: &str = "Desktop";

/// Largest short screen edge still treated as a laptop panel.
const LAPTOP_MAX_SCREEN_EDGE: u32 = 1366;

/// One entry of the structured client-hint brand list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandVersion {
    pub brand: String,
    pub version: String,
}

impl BrandVersion {
    pub fn new(brand: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            version: version.into(),
        }
    }
}

/// What the host runtime reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHints {
    pub user_agent: String,
    /// Structured brands, empty when the runtime does not expose them
    pub brands: Vec<BrandVersion>,
    /// Reported platform, empty when unknown
    pub platform: String,
    /// Structured mobile hint
    pub mobile: Option<bool>,
    pub max_touch_points: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl ClientHints {
    pub fn from_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ..Self::default()
        }
    }

    /// Describe the device.
    pub fn detect(&self) -> DeviceInfo {
        let ua = self.user_agent.as_str();
        let platform = if self.platform.trim().is_empty() {
            "Unknown".to_string()
        } else {
            self.platform.clone()
        };

        let device_type = if is_tablet(ua) {
            DEVICE_TABLET
        } else if mobile_regex().is_match(ua) || self.mobile.unwrap_or(false) {
            DEVICE_PHONE
        } else {
            DEVICE_DESKTOP
        };

        let device_label = if device_type == DEVICE_DESKTOP {
            let short_edge = self.screen_width.min(self.screen_height);
            if self.max_touch_points > 0 && short_edge <= LAPTOP_MAX_SCREEN_EDGE {
                "Desktop (Laptop)".to_string()
            } else {
                "Desktop (Workstation)".to_string()
            }
        } else {
            device_type.to_string()
        };

        let (browser, browser_version) = browser_info(ua, &self.brands);

        DeviceInfo {
            device_type: device_type.to_string(),
            device_label,
            browser,
            browser_version,
            os: os_name(ua, &platform),
            platform,
        }
    }
}

fn tablet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)tablet|ipad|playbook|silk").unwrap())
}

fn mobile_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Mobile|Android|iP(hone|od)|IEMobile|BlackBerry|Kindle|Silk-Accelerated").unwrap()
    })
}

fn windows_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Windows NT (\d+\.\d+)").unwrap())
}

fn android_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Android\s([0-9.]+)").unwrap())
}

fn ios_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)OS\s([0-9_]+)\slike Mac OS X").unwrap())
}

fn macos_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Mac OS X\s([0-9_]+)").unwrap())
}

fn browser_regexes() -> &'static [(&'static str, Regex)] {
    static RES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            ("Edge", r"(?i)Edg/([\d.]*)"),
            ("Opera", r"(?i)OPR/([\d.]*)"),
            ("Samsung Internet", r"(?i)SamsungBrowser/([\d.]*)"),
            ("Firefox", r"(?i)Firefox/([\d.]*)"),
            ("Chrome", r"(?i)Chrome/([\d.]*)"),
        ]
        .into_iter()
        .map(|(label, pattern)| (label, Regex::new(pattern).unwrap()))
        .collect()
    })
}

fn safari_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Version/([\d.]*)").unwrap())
}

/// Structured brands whose presence names the browser, in lookup order.
const BRAND_LOOKUP: [(&str, &str); 6] = [
    ("Microsoft Edge", "Edge"),
    ("Google Chrome", "Chrome"),
    ("Chromium", "Chromium"),
    ("Opera", "Opera"),
    ("Brave", "Brave"),
    ("Vivaldi", "Vivaldi"),
];

/// Android without "mobi" is a tablet.
fn is_tablet(ua: &str) -> bool {
    let lower = ua.to_lowercase();
    tablet_regex().is_match(ua) || (lower.contains("android") && !lower.contains("mobi"))
}

fn capture(re: &Regex, ua: &str) -> Option<String> {
    re.captures(ua)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Browser family and version: brands first, then user-agent markers.
pub fn browser_info(ua: &str, brands: &[BrandVersion]) -> (String, String) {
    for (brand, label) in BRAND_LOOKUP {
        if let Some(found) = brands.iter().find(|b| b.brand == brand) {
            return (label.to_string(), found.version.clone());
        }
    }

    for (label, re) in browser_regexes() {
        if let Some(version) = capture(re, ua) {
            return (label.to_string(), version);
        }
    }

    if ua.to_lowercase().contains("safari/") {
        if let Some(version) = capture(safari_version_regex(), ua) {
            return ("Safari".to_string(), version);
        }
    }

    ("Browser".to_string(), String::new())
}

/// OS name and version, falling back to the platform.
pub fn os_name(ua: &str, platform: &str) -> String {
    if let Some(nt) = capture(windows_regex(), ua) {
        let name = match nt.as_str() {
            "10.0" => Some("Windows 10"),
            "11.0" => Some("Windows 11"),
            "6.3" => Some("Windows 8.1"),
            "6.2" => Some("Windows 8"),
            "6.1" => Some("Windows 7"),
            "6.0" => Some("Windows Vista"),
            "5.1" => Some("Windows XP"),
            _ => None,
        };
        if let Some(name) = name {
            return name.to_string();
        }
    }
    if let Some(version) = capture(android_regex(), ua) {
        return format!("Android {}", version);
    }
    if let Some(version) = capture(ios_regex(), ua) {
        return format!("iOS {}", version.replace('_', "."));
    }
    if let Some(version) = capture(macos_regex(), ua) {
        return format!("macOS {}", version.replace('_', "."));
    }
    let lower = ua.to_lowercase();
    if lower.contains("cros") {
        return "ChromeOS".to_string();
    }
    if lower.contains("linux") {
        return "Linux".to_string();
    }
    if platform.is_empty() {
        "Unknown OS".to_string()
    } else {
        platform.to_string()
    }
}
