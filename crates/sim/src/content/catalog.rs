use std::collections::HashMap;

use super::hashing::fingerprint_recipes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDef {
    pub def_name: String,
    pub label: String,
    pub base_time_ms: u64,
    pub batch_size: u32,
    pub input_cost: i64,
    pub unit_value: i64,
}

/// Static economy definitions. Loaded once at startup and never persisted;
/// saves only record its fingerprint.
#[derive(Debug, Clone)]
pub struct Catalog {
    recipes: Vec<RecipeDef>,
    recipe_index_by_name: HashMap<String, usize>,
    fingerprint: String,
}

impl Catalog {
    pub fn from_recipes(mut recipes: Vec<RecipeDef>) -> Self {
        recipes.sort_by(|a, b| a.def_name.cmp(&b.def_name));
        let recipe_index_by_name = recipes
            .iter()
            .enumerate()
            .map(|(index, recipe)| (recipe.def_name.clone(), index))
            .collect();
        let fingerprint = fingerprint_recipes(&recipes);
        Self {
            recipes,
            recipe_index_by_name,
            fingerprint,
        }
    }

    pub fn builtin() -> Self {
        Self::from_recipes(vec![
            RecipeDef {
                def_name: "recipe.street_weed".to_string(),
                label: "Street Weed".to_string(),
                base_time_ms: 3_600_000,
                batch_size: 20,
                input_cost: 2_000,
                unit_value: 150,
            },
            RecipeDef {
                def_name: "recipe.blue_glass".to_string(),
                label: "Blue Glass".to_string(),
                base_time_ms: 7_200_000,
                batch_size: 10,
                input_cost: 5_000,
                unit_value: 600,
            },
            RecipeDef {
                def_name: "recipe.party_pills".to_string(),
                label: "Party Pills".to_string(),
                base_time_ms: 1_800_000,
                batch_size: 30,
                input_cost: 1_500,
                unit_value: 80,
            },
        ])
    }

    pub fn recipe(&self, def_name: &str) -> Option<&RecipeDef> {
        self.recipe_index_by_name
            .get(def_name)
            .and_then(|index| self.recipes.get(*index))
    }

    pub fn recipes(&self) -> &[RecipeDef] {
        &self.recipes
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
