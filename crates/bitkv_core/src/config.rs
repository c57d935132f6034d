//! Database configuration.

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace prepended to every user key.
    pub namespace: String,

    /// Largest bit offset `set_bit` accepts.
    pub max_bit_offset: u64,

    /// The lock manager uses `2^lock_stripes_power` mutexes.
    pub lock_stripes_power: u32,

    /// Whether to sync the batch log on every write (file stores only).
    pub sync_on_write: bool,

    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: "__namespace".to_string(),
            max_bit_offset: u64::from(u32::MAX), // 512 MiB bitmaps
            lock_stripes_power: 16,
            sync_on_write: true,
            create_if_missing: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the largest accepted bit offset.
    #[must_use]
    pub const fn max_bit_offset(mut self, offset: u64) -> Self {
        self.max_bit_offset = offset;
        self
    }

    /// Sets the number of lock stripes as a power of two.
    #[must_use]
    pub const fn lock_stripes_power(mut self, power: u32) -> Self {
        self.lock_stripes_power = power;
        self
    }

    /// Sets whether to sync the batch log on every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets whether to create the store directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.namespace, "__namespace");
        assert_eq!(config.max_bit_offset, 4_294_967_295);
        assert!(config.sync_on_write);
        assert!(config.create_if_missing);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .namespace("tenant")
            .max_bit_offset(1024)
            .lock_stripes_power(4)
            .sync_on_write(false);

        assert_eq!(config.namespace, "tenant");
        assert_eq!(config.max_bit_offset, 1024);
        assert_eq!(config.lock_stripes_power, 4);
        assert!(!config.sync_on_write);
    }
}
