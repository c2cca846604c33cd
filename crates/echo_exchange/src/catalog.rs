//! # Item Catalog
//!
//! **Read-only view of the host's item and recipe assets.**
//!
//! The exchange never owns item definitions. It asks the catalog three
//! questions:
//!
//! 1. What are an item's `level` and `max_stack`?
//! 2. Which recipe produces this item as its primary output?
//! 3. Which item ids exist at all (for the warm-up pass)?
//!
//! Hosts with their own asset system implement [`ItemCatalog`]. Everyone
//! else can use [`Catalog`], which is filled programmatically or loaded from
//! a TOML file.
//!
//! ## File Format
//!
//! ```toml
//! [[items]]
//! id = "Ingredient_Bar_Iron"
//! level = 3
//! max_stack = 100
//!
//! [[recipes]]
//! id = "smelt_iron"
//! inputs = [
//!     { item_id = "Ore_Iron", quantity = 2 },
//!     { resource_type = "Fuel", quantity = 1 },
//! ]
//! output = { item_id = "Ingredient_Bar_Iron", quantity = 1 }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::error::{EchoError, EchoResult};

/// Unique identifier for an item type.
pub type ItemId = String;

/// Stack size assumed for items the catalog does not know.
pub const DEFAULT_MAX_STACK: u32 = 64;

/// Catalog facts about a single item type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Item level, drives the fallback valuation.
    pub level: u32,
    /// Maximum units per inventory slot.
    pub max_stack: u32,
}

/// An item and a quantity, used for recipe outputs and item inputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeItem {
    /// The item ID.
    pub item_id: ItemId,
    /// Quantity required/produced.
    pub quantity: u32,
}

impl RecipeItem {
    /// Creates a new recipe item.
    #[inline]
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }
}

/// A recipe input: either a concrete item or a raw resource type.
///
/// Resource-type inputs ("any wood", "any fuel") have no single item to
/// price, so the resolver charges them a flat 1 Echo per unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialQuantity {
    /// A specific item.
    Item(RecipeItem),
    /// A resource category.
    Resource {
        /// Resource category id.
        resource_type: String,
        /// Units consumed.
        quantity: u32,
    },
}

impl MaterialQuantity {
    /// Item input shorthand.
    #[must_use]
    pub fn item(item_id: impl Into<ItemId>, quantity: u32) -> Self {
        Self::Item(RecipeItem::new(item_id, quantity))
    }

    /// Resource input shorthand.
    #[must_use]
    pub fn resource(resource_type: impl Into<String>, quantity: u32) -> Self {
        Self::Resource {
            resource_type: resource_type.into(),
            quantity,
        }
    }

    /// Units consumed by this input.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        match self {
            Self::Item(item) => item.quantity,
            Self::Resource { quantity, .. } => *quantity,
        }
    }
}

/// A crafting recipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique recipe identifier.
    pub id: String,
    /// Materials consumed by this recipe.
    pub inputs: Vec<MaterialQuantity>,
    /// The primary product.
    pub output: RecipeItem,
}

impl Recipe {
    /// Creates a new recipe with basic validation.
    ///
    /// # Errors
    ///
    /// Returns error if recipe has no inputs.
    pub fn new(
        id: impl Into<String>,
        inputs: Vec<MaterialQuantity>,
        output: RecipeItem,
    ) -> EchoResult<Self> {
        let recipe = Self {
            id: id.into(),
            inputs,
            output,
        };
        recipe.validate()?;
        Ok(recipe)
    }

    fn validate(&self) -> EchoResult<()> {
        if self.inputs.is_empty() {
            return Err(EchoError::InvalidRecipe {
                id: self.id.clone(),
                reason: "recipe must have at least one input".to_string(),
            });
        }
        if self.output.item_id.is_empty() {
            return Err(EchoError::InvalidRecipe {
                id: self.id.clone(),
                reason: "recipe must name a primary output".to_string(),
            });
        }
        Ok(())
    }
}

/// Read-only catalog lookup consumed by the exchange.
pub trait ItemCatalog: Send + Sync {
    /// Level and stack size for an item, `None` if the item does not exist.
    fn entry(&self, item_id: &str) -> Option<CatalogEntry>;

    /// The recipe that produces `item_id` as its primary output.
    ///
    /// When several recipes qualify, the first registered one wins.
    fn primary_recipe(&self, item_id: &str) -> Option<&Recipe>;

    /// Every known item id.
    fn item_ids(&self) -> Vec<ItemId>;

    /// Max stack size, falling back to [`DEFAULT_MAX_STACK`].
    fn max_stack(&self, item_id: &str) -> u32 {
        self.entry(item_id)
            .map_or(DEFAULT_MAX_STACK, |entry| entry.max_stack.max(1))
    }
}

/// Item entry as written in a catalog file.
#[derive(Clone, Debug, Deserialize)]
struct CatalogItem {
    id: ItemId,
    #[serde(default)]
    level: u32,
    #[serde(default = "default_max_stack")]
    max_stack: u32,
}

fn default_max_stack() -> u32 {
    DEFAULT_MAX_STACK
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<CatalogItem>,
    #[serde(default)]
    recipes: Vec<Recipe>,
}

/// In-memory catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Item facts, ordered so warm-up passes are deterministic.
    items: BTreeMap<ItemId, CatalogEntry>,
    /// All recipes in registration order.
    recipes: Vec<Recipe>,
    /// Registered recipe ids.
    recipe_ids: HashSet<String>,
    /// Item -> index of the first recipe producing it.
    item_producers: HashMap<ItemId, usize>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid TOML, or a recipe is invalid
    /// or registered twice.
    pub fn from_toml_str(text: &str) -> EchoResult<Self> {
        let file: CatalogFile =
            toml::from_str(text).map_err(|e| EchoError::InvalidConfig(e.to_string()))?;

        let mut catalog = Self::new();
        for item in file.items {
            catalog.add_item(
                item.id,
                CatalogEntry {
                    level: item.level,
                    max_stack: item.max_stack,
                },
            );
        }
        for recipe in file.recipes {
            recipe.validate()?;
            catalog.add_recipe(recipe)?;
        }
        Ok(catalog)
    }

    /// Loads a catalog file from disk.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> EchoResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EchoError::storage(path, e))?;
        let catalog = Self::from_toml_str(&text)?;
        tracing::info!(
            "Loaded catalog from {}: {} items, {} recipes",
            path.display(),
            catalog.item_count(),
            catalog.recipe_count()
        );
        Ok(catalog)
    }

    /// Registers or replaces an item definition.
    pub fn add_item(&mut self, item_id: impl Into<ItemId>, entry: CatalogEntry) {
        self.items.insert(item_id.into(), entry);
    }

    /// Adds a recipe to the catalog.
    ///
    /// # Errors
    ///
    /// Returns error if recipe ID already exists.
    pub fn add_recipe(&mut self, recipe: Recipe) -> EchoResult<()> {
        if !self.recipe_ids.insert(recipe.id.clone()) {
            return Err(EchoError::DuplicateRecipe(recipe.id));
        }

        // Index the primary output; earlier registrations keep priority
        self.item_producers
            .entry(recipe.output.item_id.clone())
            .or_insert(self.recipes.len());

        self.recipes.push(recipe);
        Ok(())
    }

    /// Returns the number of items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the number of recipes.
    #[must_use]
    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    /// Returns all recipes.
    pub fn all_recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }
}

impl ItemCatalog for Catalog {
    fn entry(&self, item_id: &str) -> Option<CatalogEntry> {
        self.items.get(item_id).copied()
    }

    fn primary_recipe(&self, item_id: &str) -> Option<&Recipe> {
        self.item_producers
            .get(item_id)
            .and_then(|&index| self.recipes.get(index))
    }

    fn item_ids(&self) -> Vec<ItemId> {
        self.items.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[items]]
        id = "Ore_Iron"
        level = 2
        max_stack = 100

        [[items]]
        id = "Ingredient_Bar_Iron"
        level = 3

        [[recipes]]
        id = "smelt_iron"
        inputs = [
            { item_id = "Ore_Iron", quantity = 2 },
            { resource_type = "Fuel", quantity = 1 },
        ]
        output = { item_id = "Ingredient_Bar_Iron", quantity = 1 }
    "#;

    #[test]
    fn test_parse_toml_catalog() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();

        assert_eq!(catalog.item_count(), 2);
        assert_eq!(catalog.recipe_count(), 1);
        assert_eq!(
            catalog.entry("Ore_Iron"),
            Some(CatalogEntry { level: 2, max_stack: 100 })
        );
        // max_stack defaults when omitted
        assert_eq!(catalog.max_stack("Ingredient_Bar_Iron"), DEFAULT_MAX_STACK);

        let recipe = catalog.primary_recipe("Ingredient_Bar_Iron").unwrap();
        assert_eq!(recipe.inputs[0], MaterialQuantity::item("Ore_Iron", 2));
        assert_eq!(recipe.inputs[1], MaterialQuantity::resource("Fuel", 1));
    }

    #[test]
    fn test_duplicate_recipe_rejected() {
        let mut catalog = Catalog::new();
        let recipe = Recipe::new(
            "plank",
            vec![MaterialQuantity::item("Wood_Log", 1)],
            RecipeItem::new("Wood_Plank", 4),
        )
        .unwrap();

        catalog.add_recipe(recipe.clone()).unwrap();
        assert_eq!(
            catalog.add_recipe(recipe),
            Err(EchoError::DuplicateRecipe("plank".to_string()))
        );
    }

    #[test]
    fn test_first_registered_recipe_is_primary() {
        let mut catalog = Catalog::new();
        catalog
            .add_recipe(
                Recipe::new(
                    "torch_a",
                    vec![MaterialQuantity::item("Stick", 1)],
                    RecipeItem::new("Torch", 1),
                )
                .unwrap(),
            )
            .unwrap();
        catalog
            .add_recipe(
                Recipe::new(
                    "torch_b",
                    vec![MaterialQuantity::item("Coal", 1)],
                    RecipeItem::new("Torch", 4),
                )
                .unwrap(),
            )
            .unwrap();

        assert_eq!(catalog.primary_recipe("Torch").unwrap().id, "torch_a");
        assert!(catalog.primary_recipe("Stick").is_none());
    }

    #[test]
    fn test_recipe_without_inputs_rejected() {
        let result = Recipe::new("free", vec![], RecipeItem::new("Gold", 1));
        assert!(matches!(result, Err(EchoError::InvalidRecipe { .. })));
    }

    #[test]
    fn test_unknown_item_uses_default_stack() {
        let catalog = Catalog::new();
        assert!(catalog.entry("Nothing").is_none());
        assert_eq!(catalog.max_stack("Nothing"), DEFAULT_MAX_STACK);
    }
}
