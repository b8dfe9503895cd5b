//! Conversion limits and target-format capabilities.

/// Default nesting limit for both directions.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Options shared by the encoder, decoder and driver boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Maximum number of nested containers (objects, arrays, maps) allowed
    /// before a conversion fails with `TooDeeplyNested`.
    pub max_depth: usize,

    /// Whether the target store accepts arbitrary precision integers.
    ///
    /// When `false`, an `xs:integer` outside the 64-bit range fails with
    /// `NumericOverflow` instead of producing `DocValue::BigInteger`.
    pub big_integers: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            big_integers: false,
        }
    }
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_big_integers(mut self, enabled: bool) -> Self {
        self.big_integers = enabled;
        self
    }
}
