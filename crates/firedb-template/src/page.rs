//! In-memory page model: named regions holding rendered HTML.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{Result, TemplateError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Region {
    html: String,
    visible: bool,
}

/// A page of named regions that templates render into.
///
/// Regions start empty and visible.
#[derive(Debug, Default)]
pub struct Page {
    regions: RwLock<BTreeMap<String, Region>>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a page with the given regions.
    pub fn with_regions<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let page = Self::new();
        for id in ids {
            page.add_region(id);
        }
        page
    }

    /// Add an empty, visible region. Existing regions are left alone.
    pub fn add_region(&self, id: impl Into<String>) {
        self.regions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.into())
            .or_insert(Region {
                html: String::new(),
                visible: true,
            });
    }

    pub fn has_region(&self, id: &str) -> bool {
        self.regions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn html(&self, id: &str) -> Option<String> {
        self.regions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|r| r.html.clone())
    }

    pub fn is_visible(&self, id: &str) -> Option<bool> {
        self.regions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|r| r.visible)
    }

    pub fn set_html(&self, id: &str, html: String) -> Result<()> {
        self.with_region(id, |r| r.html = html)
    }

    pub fn set_visible(&self, id: &str, visible: bool) -> Result<()> {
        self.with_region(id, |r| r.visible = visible)
    }

    /// Region ids in name order.
    pub fn region_ids(&self) -> Vec<String> {
        self.regions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn with_region(&self, id: &str, f: impl FnOnce(&mut Region)) -> Result<()> {
        let mut regions = self.regions.write().unwrap_or_else(PoisonError::into_inner);
        let region = regions
            .get_mut(id)
            .ok_or_else(|| TemplateError::PlaceholderNotFound { id: id.to_string() })?;
        f(region);
        Ok(())
    }
}
