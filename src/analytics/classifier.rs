//! User-agent classification
//!
//! Deterministic, case-insensitive substring matching. The match order
//! matters: real Chrome user agents contain "safari", and Edge user agents
//! contain both "chrome" and "safari", hence the exclusion checks.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device: String,
    pub browser: String,
    pub os: String,
}

pub fn parse_user_agent(user_agent: &str) -> DeviceInfo {
    let ua = user_agent.to_lowercase();

    let device = if ua.contains("mobile") || ua.contains("android") || ua.contains("iphone") {
        "Mobile"
    } else if ua.contains("tablet") || ua.contains("ipad") {
        "Tablet"
    } else {
        "Desktop"
    };

    let browser = if ua.contains("firefox") {
        "Firefox"
    } else if ua.contains("chrome") && !ua.contains("edg") {
        "Chrome"
    } else if ua.contains("safari") && !ua.contains("chrome") {
        "Safari"
    } else if ua.contains("edg") {
        "Edge"
    } else if ua.contains("opera") {
        "Opera"
    } else {
        "Unknown"
    };

    let os = if ua.contains("windows") {
        "Windows"
    } else if ua.contains("mac os") || ua.contains("macos") {
        "macOS"
    } else if ua.contains("linux") {
        "Linux"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("ios") || ua.contains("iphone") || ua.contains("ipad") {
        "iOS"
    } else {
        "Unknown"
    };

    DeviceInfo {
        device: device.to_string(),
        browser: browser.to_string(),
        os: os.to_string(),
    }
}
