use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::Result;
use crate::format::Format;

/// Parsed formats keyed by their source string.
///
/// Each distinct format string is parsed once; later lookups share the
/// parsed tree. Parse failures are not cached.
#[derive(Debug, Default)]
pub struct FormatCache {
    formats: HashMap<String, Arc<Format>>,
}

impl FormatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the parsed form of `source`, parsing it on first use.
    pub fn get_or_parse(&mut self, source: &str) -> Result<Arc<Format>> {
        if let Some(format) = self.formats.get(source) {
            return Ok(Arc::clone(format));
        }

        let format = Arc::new(Format::parse(source)?);
        trace!(
            format = source,
            cached = self.formats.len() + 1,
            "parsed format"
        );
        self.formats
            .insert(source.to_string(), Arc::clone(&format));
        Ok(format)
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    pub fn clear(&mut self) {
        self.formats.clear();
    }
}
