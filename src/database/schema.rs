/*!
 * Bootstrap schema for the ingest tables.
 *
 * The servings table mirrors the normalized headers of a nutrition
 * tracker's "servings" export: four descriptive columns, one FLOAT column
 * per nutrient and a free-text category.
 */

use log::info;

use super::store::RecordStore;
use crate::errors::StoreError;

/// Name of the servings table
pub const SERVINGS_TABLE: &str = "servings";

/// Nutrient columns of the servings table, in declaration order
pub const SERVINGS_NUTRIENT_COLUMNS: &[&str] = &[
    "energy_kcal",
    "alcohol_g",
    "caffeine_mg",
    "water_g",
    "b1_thiamine_mg",
    "b2_riboflavin_mg",
    "b3_niacin_mg",
    "b5_pantothenic_acid_mg",
    "b6_pyridoxine_mg",
    "b12_cobalamin_g",
    "folate_g",
    "vitamin_a_g",
    "vitamin_c_mg",
    "vitamin_d_iu",
    "vitamin_e_mg",
    "vitamin_k_g",
    "calcium_mg",
    "copper_mg",
    "iron_mg",
    "magnesium_mg",
    "manganese_mg",
    "phosphorus_mg",
    "potassium_mg",
    "selenium_g",
    "sodium_mg",
    "zinc_mg",
    "carbs_g",
    "fiber_g",
    "starch_g",
    "sugars_g",
    "added_sugars_g",
    "net_carbs_g",
    "fat_g",
    "cholesterol_mg",
    "monounsaturated_g",
    "polyunsaturated_g",
    "saturated_g",
    "transfats_g",
    "omega3_g",
    "omega6_g",
    "cystine_g",
    "histidine_g",
    "isoleucine_g",
    "leucine_g",
    "lysine_g",
    "methionine_g",
    "phenylalanine_g",
    "protein_g",
    "threonine_g",
    "tryptophan_g",
    "tyrosine_g",
    "valine_g",
];

/// `CREATE TABLE` statement for the servings table
pub fn servings_table_ddl() -> String {
    let mut ddl = String::from(
        "CREATE TABLE IF NOT EXISTS servings (\n    day TEXT NOT NULL,\n    \"group\" TEXT,\n    food_name TEXT NOT NULL,\n    amount TEXT NOT NULL,\n",
    );
    for column in SERVINGS_NUTRIENT_COLUMNS {
        ddl.push_str(&format!("    {} FLOAT,\n", column));
    }
    ddl.push_str("    category TEXT\n)");
    ddl
}

/// Ordered column names of the servings table
pub fn servings_columns() -> Vec<String> {
    let mut columns: Vec<String> = ["day", "group", "food_name", "amount"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    columns.extend(SERVINGS_NUTRIENT_COLUMNS.iter().map(|c| c.to_string()));
    columns.push("category".to_string());
    columns
}

/// Create the ingest tables if they do not exist yet
pub fn initialize_database(store: &RecordStore) -> Result<(), StoreError> {
    store.run(&servings_table_ddl())?;
    info!("Table '{}' is ready", SERVINGS_TABLE);
    Ok(())
}
