use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AnimationConfig {
    pub duration: Duration,
    /// Zero disables animation: values snap to target.
    pub frame_interval: Duration,
    /// How long a finished cell keeps its `updated` mark.
    pub highlight: Duration,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(1000),
            frame_interval: Duration::from_millis(16),
            highlight: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Visible time before the fade starts.
    pub ttl: Duration,
    pub fade: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5),
            fade: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Auto-refresh cadence.
    pub period: Duration,
    /// Whether the timer starts armed.
    pub auto_refresh: bool,
    pub animation: AnimationConfig,
    pub notifications: NotificationConfig,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(30),
            auto_refresh: true,
            animation: AnimationConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}
