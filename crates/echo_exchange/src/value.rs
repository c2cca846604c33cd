//! # Echo Value Resolution
//!
//! **Recipe-derived pricing with memoization and cycle detection.**
//!
//! Every item resolves to a positive integer Echo value. First match wins:
//!
//! 1. **Override**: the configured value, used verbatim.
//! 2. **Unknown item**: not in the catalog at all, worth 1 (warning).
//! 3. **Recipe**: `max(1, Σ(input value × input qty) / output qty)` for the
//!    first recipe with this item as primary output. Resource-type inputs
//!    count 1 per unit.
//! 4. **Fallback**: `max(1, level² × max((101 − max_stack) / 10, 1))`.
//!
//! ## Cycles
//!
//! Before the first lookup the resolver finds every item that sits on a
//! loop of primary recipes (strongly connected components, self-loops
//! included) and logs each loop once. Those items skip the recipe tier
//! and take the fallback, so `A ⇄ B` prices both sides the same way no
//! matter which is asked first, or by how many threads at once.
//!
//! ```text
//!   Top ──> A ──> B ──> A        {A, B} cyclic: both priced by fallback
//!                                Top: recipe over A's fallback value
//! ```
//!
//! Each call chain still carries its own visit path. Re-entering an item
//! already on it (possible only if a host catalog answers
//! `primary_recipe` differently between calls) logs a warning and
//! contributes 0, so resolution always terminates.
//!
//! ## Concurrency
//!
//! The cache is a [`DashMap`]; entries are insert-once, and every value is
//! a function of the catalog alone, so racing threads converge on the same
//! value. The visit path lives on the caller's stack and is never shared.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use crate::catalog::{CatalogEntry, ItemCatalog, ItemId, MaterialQuantity, Recipe};

const UNVISITED: usize = usize::MAX;

/// Finds items that lie on a loop of primary recipes.
///
/// Overridden items never expand their recipe, so they break loops.
/// Iterative Tarjan over the item-to-input graph.
fn find_cyclic_items(
    catalog: &dyn ItemCatalog,
    overrides: &HashMap<ItemId, u32>,
) -> HashSet<ItemId> {
    let ids: Vec<ItemId> = catalog
        .item_ids()
        .into_iter()
        .filter(|id| !overrides.contains_key(id))
        .collect();
    let position: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index))
        .collect();
    let edges: Vec<Vec<usize>> = ids
        .iter()
        .map(|id| {
            catalog.primary_recipe(id).map_or_else(Vec::new, |recipe| {
                recipe
                    .inputs
                    .iter()
                    .filter_map(|input| match input {
                        MaterialQuantity::Item(item) => {
                            position.get(item.item_id.as_str()).copied()
                        }
                        MaterialQuantity::Resource { .. } => None,
                    })
                    .collect()
            })
        })
        .collect();

    let count = ids.len();
    let mut index = vec![UNVISITED; count];
    let mut low = vec![0; count];
    let mut on_stack = vec![false; count];
    let mut stack = Vec::new();
    let mut next = 0;
    let mut cyclic = HashSet::new();

    for root in 0..count {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next;
        low[root] = next;
        next += 1;
        stack.push(root);
        on_stack[root] = true;
        let mut work = vec![(root, 0usize)];

        while let Some(&(node, edge)) = work.last() {
            if let Some(&target) = edges[node].get(edge) {
                if let Some(frame) = work.last_mut() {
                    frame.1 += 1;
                }
                if index[target] == UNVISITED {
                    index[target] = next;
                    low[target] = next;
                    next += 1;
                    stack.push(target);
                    on_stack[target] = true;
                    work.push((target, 0));
                } else if on_stack[target] {
                    low[node] = low[node].min(index[target]);
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                low[parent] = low[parent].min(low[node]);
            }
            if low[node] != index[node] {
                continue;
            }

            let mut component = Vec::new();
            while let Some(member) = stack.pop() {
                on_stack[member] = false;
                component.push(member);
                if member == node {
                    break;
                }
            }
            if component.len() > 1 || edges[node].contains(&node) {
                let mut names: Vec<&str> =
                    component.iter().map(|&member| ids[member].as_str()).collect();
                names.sort_unstable();
                tracing::warn!(
                    "Circular recipe dependency detected: {}",
                    names.join(" <-> ")
                );
                cyclic.extend(component.into_iter().map(|member| ids[member].clone()));
            }
        }
    }
    cyclic
}

/// Items currently being resolved within one call chain.
#[derive(Debug, Default)]
struct VisitPath {
    stack: Vec<ItemId>,
}

impl VisitPath {
    /// Returns true, with a warning, if `item_id` is already being resolved.
    fn reenters(&self, item_id: &str) -> bool {
        let Some(start) = self.stack.iter().position(|id| id == item_id) else {
            return false;
        };
        tracing::warn!(
            "Circular recipe dependency detected: {} -> {}",
            self.stack[start..].join(" -> "),
            item_id
        );
        true
    }
}

/// Memoizing Echo value calculator.
pub struct ValueResolver {
    catalog: Arc<dyn ItemCatalog>,
    overrides: HashMap<ItemId, u32>,
    cache: DashMap<ItemId, u32>,
    /// Items on recipe loops, found on first use.
    cyclic: OnceLock<HashSet<ItemId>>,
}

impl std::fmt::Debug for ValueResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueResolver")
            .field("overrides", &self.overrides.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl ValueResolver {
    /// Creates a resolver over `catalog` with manual `overrides`.
    #[must_use]
    pub fn new(catalog: Arc<dyn ItemCatalog>, overrides: HashMap<ItemId, u32>) -> Self {
        Self {
            catalog,
            overrides,
            cache: DashMap::new(),
            cyclic: OnceLock::new(),
        }
    }

    /// The catalog values are resolved against.
    #[must_use]
    pub fn catalog(&self) -> &dyn ItemCatalog {
        self.catalog.as_ref()
    }

    /// Echo value of one unit of `item_id`.
    #[must_use]
    pub fn value(&self, item_id: &str) -> u32 {
        if let Some(cached) = self.cache.get(item_id) {
            return *cached;
        }
        self.resolve(item_id, &mut VisitPath::default())
    }

    /// Returns true if `item_id` lies on a loop of primary recipes.
    #[must_use]
    pub fn is_cyclic(&self, item_id: &str) -> bool {
        self.cyclic_items().contains(item_id)
    }

    /// Number of memoized values.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Drops every memoized value.
    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("Echo value cache cleared");
    }

    /// Resolves every catalog item once. Returns the number of items visited.
    pub fn precompute_all(&self) -> usize {
        tracing::info!("Pre-calculating Echo values for all items...");
        let ids = self.catalog.item_ids();
        for item_id in &ids {
            let _ = self.value(item_id);
        }
        tracing::info!("Pre-calculated {} item Echo values", ids.len());
        ids.len()
    }

    fn cyclic_items(&self) -> &HashSet<ItemId> {
        self.cyclic.get_or_init(|| find_cyclic_items(self.catalog.as_ref(), &self.overrides))
    }

    fn resolve(&self, item_id: &str, path: &mut VisitPath) -> u32 {
        if let Some(cached) = self.cache.get(item_id) {
            return *cached;
        }

        if let Some(&value) = self.overrides.get(item_id) {
            return self.remember(item_id, value);
        }

        let Some(entry) = self.catalog.entry(item_id) else {
            tracing::warn!("Item not found: {}, defaulting to 1 Echo", item_id);
            return self.remember(item_id, 1);
        };

        if self.is_cyclic(item_id) {
            return self.remember(item_id, fallback_value(entry));
        }

        // Recursion back into an unfinished item contributes nothing
        if path.reenters(item_id) {
            return 0;
        }

        path.stack.push(item_id.to_string());
        let recipe_value = self
            .catalog
            .primary_recipe(item_id)
            .map_or(0, |recipe| self.recipe_cost(recipe, path));
        path.stack.pop();

        let value = if recipe_value > 0 {
            recipe_value
        } else {
            fallback_value(entry)
        };
        self.remember(item_id, value)
    }

    fn recipe_cost(&self, recipe: &Recipe, path: &mut VisitPath) -> u32 {
        let total = recipe.inputs.iter().fold(0u64, |total, input| {
            let unit = match input {
                MaterialQuantity::Item(item) => u64::from(self.resolve(&item.item_id, path)),
                MaterialQuantity::Resource { .. } => 1,
            };
            total.saturating_add(unit.saturating_mul(u64::from(input.quantity())))
        });
        let output_quantity = u64::from(recipe.output.quantity.max(1));
        let cost = (total / output_quantity).max(1);
        u32::try_from(cost).unwrap_or(u32::MAX)
    }

    fn remember(&self, item_id: &str, value: u32) -> u32 {
        *self
            .cache
            .entry(item_id.to_string())
            .or_insert(value)
            .value()
    }
}

/// Level and stack-size based value for items without a usable recipe.
fn fallback_value(entry: CatalogEntry) -> u32 {
    let level = i128::from(entry.level);
    let rarity = ((101 - i128::from(entry.max_stack)) / 10).max(1);
    let value = (level * level * rarity).max(1);
    u32::try_from(value).unwrap_or(u32::MAX)
}
