//! Runtime configuration.

/// Configuration for a [`Runtime`](super::Runtime).
///
/// The defaults suit tests and embedded drivers; production embeddings
/// typically only tune `step_quota`.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum consecutive synchronous resumes of one frame before the
    /// scheduler forces a turn boundary. Must be at least 1.
    pub step_quota: u32,
    /// Optional hard bound on total scheduler turns; `None` means unbounded.
    pub max_steps: Option<u64>,
    /// Whether the virtual clock advances automatically to the earliest
    /// pending timer deadline when no task is runnable.
    pub auto_advance: bool,
}

impl RuntimeConfig {
    /// Creates a configuration with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step_quota: 64,
            max_steps: None,
            auto_advance: true,
        }
    }

    /// Sets the synchronous step quota (clamped to at least 1).
    #[must_use]
    pub fn step_quota(mut self, quota: u32) -> Self {
        self.step_quota = quota.max(1);
        self
    }

    /// Bounds the total number of scheduler turns.
    #[must_use]
    pub fn max_steps(mut self, max: u64) -> Self {
        self.max_steps = Some(max);
        self
    }

    /// Disables automatic virtual-clock advancement.
    #[must_use]
    pub fn manual_time(mut self) -> Self {
        self.auto_advance = false;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.step_quota, 64);
        assert_eq!(config.max_steps, None);
        assert!(config.auto_advance);
    }

    #[test]
    fn step_quota_is_clamped() {
        assert_eq!(RuntimeConfig::new().step_quota(0).step_quota, 1);
    }

    #[test]
    fn builder_composes() {
        let config = RuntimeConfig::new().max_steps(100).manual_time();
        assert_eq!(config.max_steps, Some(100));
        assert!(!config.auto_advance);
    }
}
