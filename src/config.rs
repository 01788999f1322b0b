//! # Configuration
//!
//! Options recognized at construction time (spec §6.4). Immutable once the
//! core is initialized, mirroring how the teacher's `Fetcher::new` takes its
//! arguments up front rather than exposing setters.

/// A 128-bit opaque label used to domain-separate a key derivation from
/// other uses of the same derivation key.
pub type Label = [u8; 16];

#[derive(Debug, Clone)]
pub struct Config {
    /// Lower bound (inclusive) for the random per-chunk content split target.
    pub target_min_chunk_size: u32,
    /// Upper bound (inclusive) for the random per-chunk content split target.
    pub target_max_chunk_size: u32,
    /// Domain separation label for the envelope/persistent AEAD key derivation.
    pub crypt_label: Label,
    /// Domain separation label for the naming HMAC key derivation.
    pub hmac_label: Label,
    /// When true, the Name Hasher becomes the identity function. Diagnostic
    /// builds only; never enable this for a production-facing instance.
    pub plain_text_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_min_chunk_size: 256 * 1024,
            target_max_chunk_size: 4 * 1024 * 1024,
            crypt_label: *b"cryptfs-crypt-k1",
            hmac_label: *b"cryptfs-hmac--k1",
            plain_text_mode: false,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

#[derive(Debug)]
pub struct ConfigBuilder {
    inner: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            inner: Config::default(),
        }
    }
}

impl ConfigBuilder {
    pub fn chunk_size_range(mut self, min: u32, max: u32) -> Self {
        self.inner.target_min_chunk_size = min;
        self.inner.target_max_chunk_size = max;
        self
    }

    pub fn crypt_label(mut self, label: Label) -> Self {
        self.inner.crypt_label = label;
        self
    }

    pub fn hmac_label(mut self, label: Label) -> Self {
        self.inner.hmac_label = label;
        self
    }

    /// Diagnostic builds only: see [`Config::plain_text_mode`].
    pub fn plain_text_mode(mut self, enabled: bool) -> Self {
        self.inner.plain_text_mode = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.inner
    }
}
