//! Device session models.

use serde::{Deserialize, Serialize};

/// Human-readable description of the device running this instance.
///
/// Informational only; never used to decide whether a session is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceInfo {
    /// "Phone", "Tablet" or "Desktop"
    pub device_type: String,
    /// Device type refined for desktops ("Desktop (Laptop)")
    pub device_label: String,
    /// Browser family
    pub browser: String,
    /// Browser version, empty when unknown
    pub browser_version: String,
    /// OS name and version
    pub os: String,
    /// Reported platform
    pub platform: String,
}

/// A device session record under one identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSession {
    /// Persistent device-session ID (document ID)
    #[serde(skip)]
    pub id: String,
    #[serde(flatten)]
    pub device: DeviceInfo,
    /// Last heartbeat, stamped by the store
    #[serde(default)]
    pub last_active_at: Option<String>,
    /// Last write, stamped by the store
    #[serde(default)]
    pub updated_at: Option<String>,
    /// True for the record of the running instance; derived, never stored
    #[serde(skip)]
    pub is_current: bool,
}

impl DeviceSession {
    /// Headline shown in a session list ("Phone • Firefox").
    pub fn headline(&self) -> String {
        format!("{} • {}", self.device.device_type, self.device.browser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_session_wire_shape() {
        let value = serde_json::json!({
            "deviceType": "Phone",
            "deviceLabel": "Phone",
            "browser": "Firefox",
            "browserVersion": "120.0",
            "os": "Android 14",
            "platform": "Linux armv8l",
            "lastActiveAt": "2026-01-01T00:00:00Z",
        });
        let session: DeviceSession = serde_json::from_value(value).unwrap();
        assert_eq!(session.device.browser, "Firefox");
        assert_eq!(session.last_active_at.as_deref(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(session.updated_at, None);
        assert!(!session.is_current);
        assert_eq!(session.headline(), "Phone • Firefox");
    }
}
