//! Hospital records and the ordered hospital catalog

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Specialty classification of a hospital
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Trauma,
    Spinal,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Trauma => "trauma",
            Category::Spinal => "spinal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A destination hospital. Two hospitals are the same entity iff name,
/// address and category all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hospital {
    pub name: String,
    pub address: String,
    pub category: Category,
}

impl Hospital {
    pub fn new(name: impl Into<String>, address: impl Into<String>, category: Category) -> Self {
        Self { name: name.into(), address: address.into(), category }
    }

    #[inline]
    pub fn is_category(&self, category: Category) -> bool {
        self.category == category
    }
}

impl fmt::Display for Hospital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hospital", self.name)
    }
}

/// Reports render a hospital by its display name only
pub fn serialize_display_name<S>(hospital: &Arc<Hospital>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(hospital.as_ref())
}

/// Ordered hospital set. Iteration order is insertion order and is the order
/// matrix requests list their destinations in.
///
/// Name uniqueness is the ingestion scraper's job; `add` only appends.
#[derive(Debug, Clone, Default)]
pub struct HospitalCatalog {
    items: Vec<Arc<Hospital>>,
}

impl HospitalCatalog {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn add(&mut self, hospital: Hospital) {
        self.items.push(Arc::new(hospital));
    }

    /// First hospital whose cleaned name matches exactly
    pub fn by_name(&self, name: &str) -> Option<&Arc<Hospital>> {
        self.items.iter().find(|h| h.name == name)
    }

    /// Subset of one category, insertion order preserved
    pub fn by_category(&self, category: Category) -> HospitalCatalog {
        let items = self.items.iter().filter(|h| h.is_category(category)).cloned().collect();
        HospitalCatalog { items }
    }

    /// Addresses aligned index-for-index with `iter()`
    pub fn addresses(&self) -> Vec<&str> {
        self.items.iter().map(|h| h.address.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Hospital>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Hospital> for HospitalCatalog {
    fn from_iter<I: IntoIterator<Item = Hospital>>(iter: I) -> Self {
        Self { items: iter.into_iter().map(Arc::new).collect() }
    }
}
