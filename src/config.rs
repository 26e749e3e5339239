//! Prefetch configuration and its builder.

use std::num::NonZeroU64;

use crate::error::ConfigError;

/// Window used by [`PrefetchConfigBuilder`] when none is given.
pub const DEFAULT_PREFETCH_WINDOW: u64 = 256;

/// Settings for [`Flux::with_prefetch_config`](crate::Flux::with_prefetch_config).
///
/// The adapter requests `window` elements upstream when subscribed, then
/// requests `replenish_at` more each time that many elements have been
/// delivered downstream. At most `window` elements are ever in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefetchConfig {
    window: NonZeroU64,
    replenish_at: NonZeroU64,
}

impl PrefetchConfig {
    /// Full-window replenishment with the given window.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWindow`] if `window` is zero.
    pub fn new(window: u64) -> Result<Self, ConfigError> {
        Self::builder().window(window).build()
    }

    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> PrefetchConfigBuilder { PrefetchConfigBuilder::default() }

    /// Number of elements requested upstream at subscription time.
    #[must_use]
    pub fn window(&self) -> u64 { self.window.get() }

    /// Downstream deliveries that trigger the next upstream request.
    #[must_use]
    pub fn replenish_at(&self) -> u64 { self.replenish_at.get() }
}

/// Builder for [`PrefetchConfig`].
///
/// # Examples
///
/// ```
/// use tributary::PrefetchConfig;
///
/// let config = PrefetchConfig::builder()
///     .window(8)
///     .replenish_at(6)
///     .build()
///     .expect("valid prefetch configuration");
/// assert_eq!(config.window(), 8);
/// assert_eq!(config.replenish_at(), 6);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct PrefetchConfigBuilder {
    window: u64,
    replenish_at: Option<u64>,
}

impl Default for PrefetchConfigBuilder {
    fn default() -> Self {
        Self {
            window: DEFAULT_PREFETCH_WINDOW,
            replenish_at: None,
        }
    }
}

impl PrefetchConfigBuilder {
    /// Set the prefetch window.
    #[must_use]
    pub fn window(mut self, window: u64) -> Self {
        self.window = window;
        self
    }

    /// Set the low-water mark. Defaults to the full window.
    #[must_use]
    pub fn replenish_at(mut self, replenish_at: u64) -> Self {
        self.replenish_at = Some(replenish_at);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWindow`] if the window is zero and
    /// [`ConfigError::InvalidReplenish`] if the replenish threshold is zero or
    /// larger than the window.
    pub fn build(self) -> Result<PrefetchConfig, ConfigError> {
        let window = NonZeroU64::new(self.window).ok_or(ConfigError::InvalidWindow(self.window))?;
        let replenish_at = self.replenish_at.unwrap_or(self.window);
        let invalid = ConfigError::InvalidReplenish {
            window: self.window,
            replenish_at,
        };
        if replenish_at > self.window {
            return Err(invalid);
        }
        let replenish_at = NonZeroU64::new(replenish_at).ok_or(invalid)?;
        Ok(PrefetchConfig {
            window,
            replenish_at,
        })
    }
}
