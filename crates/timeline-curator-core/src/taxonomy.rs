//! The two-level category taxonomy.
//!
//! Every classification is validated against a [`Taxonomy`]: the main
//! category must exist, and the subcategory must be listed under *that*
//! main category. A subcategory that exists under a different main
//! category is rejected like any other unknown name.
//!
//! The taxonomy is an injected value: built once when the curation engine
//! is constructed and never mutated afterwards. [`Taxonomy::builtin`]
//! provides the default five-by-three layout; configuration may supply an
//! alternative through [`Taxonomy::from_map`].

use std::collections::{BTreeMap, HashSet};

use anyhow::{bail, Result};
use serde::Serialize;

/// A main category and the subcategories it allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MainCategory {
    pub name: String,
    pub subcategories: Vec<String>,
}

/// A validated (main category, subcategory) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Classification {
    pub main_category: String,
    pub subcategory: String,
}

/// Fixed mapping of main category to allowed subcategories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Taxonomy {
    categories: Vec<MainCategory>,
}

const BUILTIN: &[(&str, &[&str])] = &[
    (
        "Creative Works",
        &["Music Releases", "Film & Television", "Awards & Honors"],
    ),
    (
        "Live & Broadcast",
        &["Concerts & Tours", "Broadcast Appearances", "Fan Events"],
    ),
    (
        "Business & Endorsements",
        &["Brand Partnerships", "Agency & Contracts", "Philanthropy"],
    ),
    (
        "Personal Life",
        &["Education", "Relationships", "Military Service"],
    ),
    (
        "Incidents & Legal",
        &["Legal Matters", "Controversies", "Accidents & Emergencies"],
    ),
];

impl Taxonomy {
    /// Build a taxonomy, rejecting empty categories and subcategories
    /// listed under more than one main category.
    pub fn new(categories: Vec<MainCategory>) -> Result<Self> {
        if categories.is_empty() {
            bail!("taxonomy must define at least one main category");
        }

        let mut mains = HashSet::new();
        let mut subs = HashSet::new();
        for main in &categories {
            if main.name.trim().is_empty() {
                bail!("taxonomy main category names must not be empty");
            }
            if !mains.insert(main.name.as_str()) {
                bail!("taxonomy main category '{}' is listed twice", main.name);
            }
            if main.subcategories.is_empty() {
                bail!(
                    "taxonomy main category '{}' has no subcategories",
                    main.name
                );
            }
            for sub in &main.subcategories {
                if !subs.insert(sub.as_str()) {
                    bail!(
                        "taxonomy subcategory '{}' appears under more than one main category",
                        sub
                    );
                }
            }
        }

        Ok(Self { categories })
    }

    /// The default taxonomy: five main categories, three subcategories each.
    pub fn builtin() -> Self {
        Self {
            categories: BUILTIN
                .iter()
                .map(|(name, subs)| MainCategory {
                    name: name.to_string(),
                    subcategories: subs.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        }
    }

    /// Build from a config table. Main categories come out in key order.
    pub fn from_map(map: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        Self::new(
            map.iter()
                .map(|(name, subs)| MainCategory {
                    name: name.clone(),
                    subcategories: subs.clone(),
                })
                .collect(),
        )
    }

    pub fn categories(&self) -> &[MainCategory] {
        &self.categories
    }

    pub fn subcategories(&self, main_category: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|c| c.name == main_category)
            .map(|c| c.subcategories.as_slice())
    }

    /// Check a pair returned by the classification oracle.
    ///
    /// Returns `None` when the pair is not valid under this taxonomy.
    pub fn validate(&self, main_category: &str, subcategory: &str) -> Option<Classification> {
        let main_category = main_category.trim();
        let subcategory = subcategory.trim();
        let allowed = self.subcategories(main_category)?;
        if allowed.iter().any(|s| s == subcategory) {
            Some(Classification {
                main_category: main_category.to_string(),
                subcategory: subcategory.to_string(),
            })
        } else {
            None
        }
    }

    /// The main category a subcategory belongs to.
    pub fn main_category_of(&self, subcategory: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.subcategories.iter().any(|s| s == subcategory))
            .map(|c| c.name.as_str())
    }

    /// JSON object of main category → subcategories, for oracle prompts.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .categories
            .iter()
            .map(|c| (c.name.clone(), serde_json::json!(c.subcategories)))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}
