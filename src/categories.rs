use crate::error::{Error, Result};
use crate::parser::{CategoryRef, CocoCategory};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub const BACKGROUND: &str = "__background__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: usize,
    pub name: String,
}

/// Where a registry is built from.
#[derive(Debug, Clone)]
pub enum CategorySource {
    /// A COCO `categories` list.
    Coco(Vec<CocoCategory>),
    /// A flat, ordered class-name list.
    Names(Vec<String>),
    /// Any JSON class list accepted by [`CategoryRegistry::from_json`].
    Json(Value),
}

#[derive(Serialize)]
struct CategoriesFile<'a> {
    categories: &'a [Category],
}

/// Bidirectional mapping between category names and dense ids.
///
/// Ids follow the source order starting at 0, after any `__background__`
/// entry is removed. A source that repeats a name is rejected.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    names: IndexSet<String>,
    // Raw COCO category id -> dense id.
    source_ids: HashMap<u64, usize>,
}

impl CategoryRegistry {
    pub fn build(source: CategorySource) -> Result<Self> {
        match source {
            CategorySource::Coco(categories) => Self::from_coco(&categories),
            CategorySource::Names(names) => Self::from_names(names),
            CategorySource::Json(value) => Self::from_json(&value),
        }
    }

    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for name in names {
            let name = name.into();
            if name != BACKGROUND {
                registry.insert(name)?;
            }
        }
        Ok(registry)
    }

    pub fn from_coco(categories: &[CocoCategory]) -> Result<Self> {
        let mut registry = Self::default();
        for category in categories.iter().filter(|c| c.name != BACKGROUND) {
            let id = registry.insert(category.name.clone())?;
            if registry.source_ids.insert(category.id, id).is_some() {
                return Err(Error::MalformedInput(format!(
                    "category id {} appears more than once",
                    category.id
                )));
            }
        }
        Ok(registry)
    }

    /// Accepts a JSON array of names, a JSON array of `{id, name}` objects,
    /// an object whose keys are class names, or an object carrying a
    /// `categories` array (a COCO document or a category side file).
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Err(Error::MalformedInput(
                "category source is absent".to_string(),
            )),
            Value::Array(items) if items.iter().all(Value::is_string) => {
                Self::from_names(items.iter().filter_map(Value::as_str))
            }
            Value::Array(items) if items.iter().all(Value::is_object) => {
                let categories: Vec<CocoCategory> = serde_json::from_value(value.clone())
                    .map_err(|e| {
                        Error::MalformedInput(format!("invalid category entry: {}", e))
                    })?;
                Self::from_coco(&categories)
            }
            Value::Object(map) => match map.get("categories") {
                Some(inner @ Value::Array(_)) => Self::from_json(inner),
                _ => Self::from_names(map.keys().cloned()),
            },
            other => Err(Error::MalformedInput(format!(
                "unrecognized category source: {}",
                describe(other)
            ))),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let value: Value = serde_json::from_reader(BufReader::new(file))?;
        Self::from_json(&value)
    }

    fn insert(&mut self, name: String) -> Result<usize> {
        let (id, inserted) = self.names.insert_full(name);
        if !inserted {
            return Err(Error::MalformedInput(format!(
                "category '{}' is listed more than once",
                self.names[id]
            )));
        }
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn id_of(&self, name: &str) -> Result<usize> {
        self.names
            .get_index_of(name)
            .ok_or_else(|| Error::UnknownCategory(name.to_string()))
    }

    pub fn name_of(&self, id: usize) -> Result<&str> {
        self.names
            .get_index(id)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownCategory(format!("id {}", id)))
    }

    /// Maps a raw COCO `category_id` to its dense id.
    pub fn resolve_source_id(&self, source_id: u64) -> Result<usize> {
        self.source_ids
            .get(&source_id)
            .copied()
            .ok_or_else(|| Error::UnknownCategory(format!("category_id {}", source_id)))
    }

    pub fn resolve(&self, reference: &CategoryRef) -> Result<Category> {
        let id = match reference {
            CategoryRef::Id(source_id) => self.resolve_source_id(*source_id)?,
            CategoryRef::Name(name) => self.id_of(name)?,
        };
        Ok(Category {
            id,
            name: self.names[id].clone(),
        })
    }

    /// Class names in id order.
    pub fn names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }

    pub fn name_to_id(&self) -> HashMap<String, usize> {
        self.names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id))
            .collect()
    }

    pub fn id_to_name(&self) -> HashMap<usize, String> {
        self.names.iter().cloned().enumerate().collect()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.names
            .iter()
            .enumerate()
            .map(|(id, name)| Category {
                id,
                name: name.clone(),
            })
            .collect()
    }

    /// The `{"categories": [...]}` document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        let categories = self.categories();
        Ok(serde_json::to_string_pretty(&CategoriesFile {
            categories: &categories,
        })?)
    }

    /// Writes `{"categories": [{"id": .., "name": ..}, ..]}`.
    pub fn write_categories(&self, path: impl AsRef<Path>) -> Result<()> {
        let categories = self.categories();
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(
            writer,
            &CategoriesFile {
                categories: &categories,
            },
        )?;
        Ok(())
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a mixed array",
        Value::Object(_) => "an object",
    }
}
