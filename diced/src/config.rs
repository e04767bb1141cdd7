//! `diced` global configuration options.
//!
//! See [`Config`] for the list of options.

use std::num::NonZeroU64;
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use diced_storage::DEFAULT_MAX_TRANSFER_VOLUME;

/// Global configuration options for the `diced` crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
/// An [`Array`](crate::array::Array) takes a snapshot of the global configuration when it is created.
///
/// ## Maximum Transfer Volume
/// > default: `512^3` elements
///
/// The maximum number of elements in a single block store request.
/// Larger requests are split into tiles.
///
/// ## Concurrent Target
/// > default: [`rayon::current_num_threads`] at the time of first access
///
/// The number of tiles of a single request that are transferred concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    max_transfer_volume: NonZeroU64,
    concurrent_target: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_transfer_volume: NonZeroU64::new(DEFAULT_MAX_TRANSFER_VOLUME)
                .unwrap_or(NonZeroU64::MIN),
            concurrent_target: rayon::current_num_threads(),
        }
    }
}

impl Config {
    /// Get the [maximum transfer volume](#maximum-transfer-volume) configuration.
    #[must_use]
    pub fn max_transfer_volume(&self) -> NonZeroU64 {
        self.max_transfer_volume
    }

    /// Set the [maximum transfer volume](#maximum-transfer-volume) configuration.
    pub fn set_max_transfer_volume(&mut self, max_transfer_volume: NonZeroU64) -> &mut Self {
        self.max_transfer_volume = max_transfer_volume;
        self
    }

    /// Get the [concurrent target](#concurrent-target) configuration.
    #[must_use]
    pub fn concurrent_target(&self) -> usize {
        self.concurrent_target
    }

    /// Set the [concurrent target](#concurrent-target) configuration.
    ///
    /// A target of zero is treated as one.
    pub fn set_concurrent_target(&mut self, concurrent_target: usize) -> &mut Self {
        self.concurrent_target = std::cmp::max(concurrent_target, 1);
        self
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global `diced` configuration.
///
/// This may deadlock if the global config is already mutably held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Returns a mutable reference to the global `diced` configuration.
///
/// This may deadlock if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.max_transfer_volume().get(), 512 * 512 * 512);
        assert!(config.concurrent_target() >= 1);
    }

    #[test]
    fn config_setters() {
        let mut config = Config::default();
        config
            .set_max_transfer_volume(NonZeroU64::new(1024).unwrap())
            .set_concurrent_target(0);
        assert_eq!(config.max_transfer_volume().get(), 1024);
        assert_eq!(config.concurrent_target(), 1);
    }

    #[test]
    fn config_global() {
        let concurrent_target = global_config().concurrent_target();
        global_config_mut().set_concurrent_target(concurrent_target);
        assert_eq!(global_config().concurrent_target(), concurrent_target);
    }
}
