use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const ALL_CATEGORIES: &str = "All Categories";
const USER_AGENT: &str = "dokkan-checklist";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    File(PathBuf),
    Url(String),
}

impl CatalogSource {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            CatalogSource::Url(trimmed.to_string())
        } else {
            CatalogSource::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSource::File(path) => write!(f, "{}", path.display()),
            CatalogSource::Url(url) => f.write_str(url),
        }
    }
}

/// Immutable, ordered list of items with unique ids.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(items: Vec<Item>) -> Result<Self, LoadError> {
        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if item.id.trim().is_empty() {
                return Err(LoadError::MissingId { position });
            }
            if index.insert(item.id.clone(), position).is_some() {
                return Err(LoadError::DuplicateId {
                    id: item.id.clone(),
                });
            }
        }
        Ok(Self { items, index })
    }

    pub fn from_json(raw: &str) -> Result<Self, LoadError> {
        let raw_items: Vec<RawItem> = serde_json::from_str(raw).map_err(LoadError::Parse)?;
        let items = raw_items
            .into_iter()
            .map(|raw| Item {
                id: raw.id.unwrap_or_default(),
                name: raw.name,
                category: raw.category,
                icon: raw.icon.filter(|icon| !icon.trim().is_empty()),
            })
            .collect();
        Self::new(items)
    }

    pub fn load(source: &CatalogSource) -> Result<Self, LoadError> {
        let raw = match source {
            CatalogSource::File(path) => read_file(path)?,
            CatalogSource::Url(url) => fetch_url(url)?,
        };
        let catalog = Self::from_json(&raw)?;
        tracing::info!(source = %source, items = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|position| &self.items[*position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sorted unique categories, without the "All Categories" sentinel.
    pub fn categories(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn fetch_url(url: &str) -> Result<String, LoadError> {
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(5))
        .timeout_read(Duration::from_secs(10))
        .build();
    let response = agent
        .get(url)
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|err| LoadError::Fetch {
            url: url.to_string(),
            source: Box::new(err),
        })?;
    response.into_string().map_err(|err| LoadError::Fetch {
        url: url.to_string(),
        source: Box::new(err),
    })
}
