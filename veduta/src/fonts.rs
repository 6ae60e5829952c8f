//! Font resolution and embedding.
//!
//! Labels arrive with a list of requested font names (e.g. `["DIN Pro Medium", "Arial Unicode MS
//! Regular"]`). The resolver maps the first name to an embeddable binary through a
//! [`FontLibrary`], encodes it once, and caches the result per `(family, weight)` pair for the
//! duration of one export. Unmapped families degrade to a generic system family in the output,
//! with no embedded data.

use base64::Engine as _;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::diagnostics::{Diagnostics, Stage};

/// A font as a label asks for it: canonical family plus CSS weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontRequest {
    pub family: String,
    pub weight: u16,
}

/// An embeddable font, ready for a `@font-face` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontResource {
    pub family: String,
    pub weight: u16,
    pub data_base64: String,
}

/// Source of embeddable font binaries.
///
/// This is the seam towards whatever stores the fonts: the reference implementation is a static
/// table of files on disk, but a caller may plug in anything, including an asynchronous fetcher
/// that resolves before the export starts.
pub trait FontLibrary {
    /// Binary (TTF/OTF) for the canonical family name, or `None` when the family is not mapped.
    fn load(&self, family: &str) -> Option<Vec<u8>>;
}

/// A [`FontLibrary`] with no fonts: every label falls back to a generic system family.
#[derive(Debug, Default)]
pub struct NoEmbeddedFonts;

impl FontLibrary for NoEmbeddedFonts {
    fn load(&self, _family: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Static table mapping canonical font families to font files on disk.
#[derive(Debug, Default)]
pub struct FontDirectory {
    paths: HashMap<String, PathBuf>,
}

impl FontDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, family: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(family.into(), path.into());
        self
    }
}

impl FontLibrary for FontDirectory {
    fn load(&self, family: &str) -> Option<Vec<u8>> {
        let path = self.paths.get(family)?;
        match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(error) => {
                log::warn!("could not read font file {}: {}", path.display(), error);
                None
            }
        }
    }
}

/// Per-export cache of resolved fonts. Font binaries can be large, so each `(family, weight)`
/// pair is fetched and encoded at most once, including failed lookups.
pub(crate) struct FontResolver<'a> {
    library: &'a dyn FontLibrary,
    cache: HashMap<FontRequest, Option<FontResource>>,
}

impl<'a> FontResolver<'a> {
    pub(crate) fn new(library: &'a dyn FontLibrary) -> Self {
        Self {
            library,
            cache: HashMap::new(),
        }
    }

    /// Make sure `request` has a cache slot, fetching and encoding the binary on first sight.
    /// Returns whether an embeddable resource is available for it.
    pub(crate) fn request(&mut self, request: &FontRequest, diagnostics: &mut Diagnostics) -> bool {
        if let Some(slot) = self.cache.get(request) {
            return slot.is_some();
        }

        let resource = self.library.load(&request.family).map(|bytes| FontResource {
            family: request.family.clone(),
            weight: request.weight,
            data_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
        });

        if resource.is_none() {
            diagnostics.note(
                Stage::Fonts,
                format!(
                    "no embeddable binary for '{}'; labels fall back to a system family",
                    request.family
                ),
            );
        }

        let available = resource.is_some();
        self.cache.insert(request.clone(), resource);
        available
    }

    /// All fonts embedded during this export, in a deterministic order.
    pub(crate) fn resources(&self) -> Vec<&FontResource> {
        let mut resources: Vec<&FontResource> =
            self.cache.values().filter_map(Option::as_ref).collect();
        resources.sort_by(|a, b| (&a.family, a.weight).cmp(&(&b.family, b.weight)));
        resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingLibrary {
        loads: Cell<usize>,
    }

    impl FontLibrary for CountingLibrary {
        fn load(&self, family: &str) -> Option<Vec<u8>> {
            self.loads.set(self.loads.get() + 1);
            (family == "DIN Pro").then(|| vec![0u8, 1, 2, 3])
        }
    }

    fn request(family: &str, weight: u16) -> FontRequest {
        FontRequest {
            family: family.to_owned(),
            weight,
        }
    }

    #[test]
    fn binaries_are_fetched_once_per_family_and_weight() {
        let library = CountingLibrary {
            loads: Cell::new(0),
        };
        let mut resolver = FontResolver::new(&library);
        let mut diagnostics = Diagnostics::new();

        assert!(resolver.request(&request("DIN Pro", 500), &mut diagnostics));
        assert!(resolver.request(&request("DIN Pro", 500), &mut diagnostics));
        assert_eq!(library.loads.get(), 1);

        // A different weight of the same family is a different slot.
        assert!(resolver.request(&request("DIN Pro", 700), &mut diagnostics));
        assert_eq!(library.loads.get(), 2);
    }

    #[test]
    fn failed_lookups_are_negatively_cached() {
        let library = CountingLibrary {
            loads: Cell::new(0),
        };
        let mut resolver = FontResolver::new(&library);
        let mut diagnostics = Diagnostics::new();

        assert!(!resolver.request(&request("Comic Neue", 400), &mut diagnostics));
        assert!(!resolver.request(&request("Comic Neue", 400), &mut diagnostics));
        assert_eq!(library.loads.get(), 1);
        assert_eq!(diagnostics.entries().len(), 1);
    }

    #[test]
    fn resources_are_ordered_and_encoded() {
        let library = CountingLibrary {
            loads: Cell::new(0),
        };
        let mut resolver = FontResolver::new(&library);
        let mut diagnostics = Diagnostics::new();

        resolver.request(&request("DIN Pro", 700), &mut diagnostics);
        resolver.request(&request("DIN Pro", 400), &mut diagnostics);

        let resources = resolver.resources();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].weight, 400);
        assert_eq!(resources[1].weight, 700);
        assert_eq!(resources[0].data_base64, "AAECAw==");
    }

    #[test]
    fn missing_directory_entry_resolves_to_none() {
        let directory = FontDirectory::new().with_font("Ghost", "/definitely/not/there.ttf");
        assert!(directory.load("Ghost").is_none());
        assert!(directory.load("Unmapped").is_none());
    }
}
