//! CSV-based master data loader
//!
//! Loads products, raw materials, recipes, indirect costs, inflation and the
//! production schedule from CSV files in a data directory.

use super::{
    DistributionType, IndirectCostRecord, InflationRecord, MaterialId, Product, ProductId,
    RawMaterial, ScheduledProductionEntry,
};
use crate::month::YearMonth;
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use csv::Reader;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default path to the data directory
pub const DEFAULT_DATA_PATH: &str = "data/sample";

#[derive(Debug, serde::Deserialize)]
struct ProductRow {
    id: ProductId,
    code: String,
    name: String,
    batch_weight_kg: f64,
    #[serde(default)]
    waste_pct: f64,
    #[serde(default)]
    labor_minutes_per_kg: f64,
    #[serde(default = "default_true")]
    active: bool,
}

#[derive(Debug, serde::Deserialize)]
struct MaterialRow {
    id: MaterialId,
    name: String,
    category: String,
    unit: String,
    unit_cost: f64,
    #[serde(default = "default_true")]
    active: bool,
}

#[derive(Debug, serde::Deserialize)]
struct RecipeRow {
    product_id: ProductId,
    material_id: MaterialId,
    quantity: f64,
}

#[derive(Debug, serde::Deserialize)]
struct IndirectCostRow {
    account: String,
    amount: f64,
    distribution: String,
    base_month: String,
    #[serde(default)]
    is_variable: bool,
}

#[derive(Debug, serde::Deserialize)]
struct InflationRow {
    month: String,
    pct: f64,
}

#[derive(Debug, serde::Deserialize)]
struct ScheduleRow {
    product_id: ProductId,
    batches: f64,
    date: String,
}

fn default_true() -> bool {
    true
}

impl ProductRow {
    fn to_product(self) -> Result<Product> {
        let product = Product {
            id: self.id,
            code: self.code,
            name: self.name,
            batch_weight_kg: self.batch_weight_kg,
            waste_pct: self.waste_pct,
            labor_minutes_per_kg: self.labor_minutes_per_kg,
            active: self.active,
        };
        product.validate()?;
        Ok(product)
    }
}

impl IndirectCostRow {
    fn to_record(self) -> Result<IndirectCostRecord> {
        let distribution: DistributionType = self.distribution.parse().map_err(|e: String| anyhow!(e))?;
        let base_month = YearMonth::parse_field(&self.base_month, "base_month")?;
        if !self.amount.is_finite() {
            bail!("indirect cost '{}' has invalid amount {}", self.account, self.amount);
        }
        Ok(IndirectCostRecord {
            account: self.account,
            amount: self.amount,
            distribution,
            base_month,
            is_variable: self.is_variable,
        })
    }
}

/// Read products from any CSV source
pub fn read_products<R: Read>(reader: R) -> Result<Vec<Product>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut products = Vec::new();

    let mut seen = HashSet::new();

    for (line, result) in csv_reader.deserialize().enumerate() {
        let row: ProductRow = result?;
        let product = row.to_product().with_context(|| format!("product row {}", line + 1))?;
        if !seen.insert(product.id) {
            bail!("product row {}: duplicate product id {}", line + 1, product.id);
        }
        products.push(product);
    }

    Ok(products)
}

/// Read raw materials from any CSV source
pub fn read_materials<R: Read>(reader: R) -> Result<Vec<RawMaterial>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut materials = Vec::new();

    let mut seen = HashSet::new();

    for (line, result) in csv_reader.deserialize().enumerate() {
        let row: MaterialRow = result?;
        if !(row.unit_cost >= 0.0) || !row.unit_cost.is_finite() {
            bail!("raw material {} has invalid unit cost {}", row.id, row.unit_cost);
        }
        if !seen.insert(row.id) {
            bail!("raw material row {}: duplicate material id {}", line + 1, row.id);
        }
        materials.push(RawMaterial {
            id: row.id,
            name: row.name,
            category: row.category.trim().to_string(),
            unit: row.unit,
            unit_cost: row.unit_cost,
            active: row.active,
        });
    }

    Ok(materials)
}

/// Read recipe links `(product, material, quantity per batch)`
pub fn read_recipes<R: Read>(reader: R) -> Result<Vec<(ProductId, MaterialId, f64)>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut links = Vec::new();

    for result in csv_reader.deserialize() {
        let row: RecipeRow = result?;
        links.push((row.product_id, row.material_id, row.quantity));
    }

    Ok(links)
}

/// Read indirect cost records
pub fn read_indirect_costs<R: Read>(reader: R) -> Result<Vec<IndirectCostRecord>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for (line, result) in csv_reader.deserialize().enumerate() {
        let row: IndirectCostRow = result?;
        let record = row.to_record().with_context(|| format!("indirect cost row {}", line + 1))?;
        if !seen.insert((record.account.clone(), record.base_month)) {
            bail!("duplicate indirect cost account '{}' for {}", record.account, record.base_month);
        }
        records.push(record);
    }

    Ok(records)
}

/// Read monthly inflation records (one per month)
pub fn read_inflation<R: Read>(reader: R) -> Result<Vec<InflationRecord>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for result in csv_reader.deserialize() {
        let row: InflationRow = result?;
        let month = YearMonth::parse_field(&row.month, "inflation month")?;
        if !seen.insert(month) {
            bail!("duplicate inflation month {}", month);
        }
        records.push(InflationRecord::new(month, row.pct));
    }

    Ok(records)
}

/// Read the manual production schedule
pub fn read_schedule<R: Read>(reader: R) -> Result<Vec<ScheduledProductionEntry>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut entries = Vec::new();

    for (line, result) in csv_reader.deserialize().enumerate() {
        let row: ScheduleRow = result?;
        let date = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d")
            .with_context(|| format!("schedule row {}: bad date '{}'", line + 1, row.date))?;
        let entry = ScheduledProductionEntry::new(row.product_id, row.batches, date)
            .with_context(|| format!("schedule row {}", line + 1))?;
        entries.push(entry);
    }

    Ok(entries)
}

fn open(path: &Path, file_name: &str) -> Result<File> {
    let full = path.join(file_name);
    File::open(&full).with_context(|| format!("opening {}", full.display()))
}

/// All master data loaded from a data directory
#[derive(Debug, Clone, Default)]
pub struct LoadedCatalog {
    pub products: Vec<Product>,
    pub materials: Vec<RawMaterial>,
    pub recipe_links: Vec<(ProductId, MaterialId, f64)>,
    pub indirect_costs: Vec<IndirectCostRecord>,
    pub inflation: Vec<InflationRecord>,
    pub schedule: Vec<ScheduledProductionEntry>,
}

/// Every recipe link must name a loaded product and raw material
fn check_recipe_links(
    products: &[Product],
    materials: &[RawMaterial],
    links: &[(ProductId, MaterialId, f64)],
) -> Result<()> {
    let product_ids: HashSet<ProductId> = products.iter().map(|p| p.id).collect();
    let material_ids: HashSet<MaterialId> = materials.iter().map(|m| m.id).collect();

    for (line, (product_id, material_id, _)) in links.iter().enumerate() {
        if !product_ids.contains(product_id) {
            bail!("recipe row {}: product {} not in products.csv", line + 1, product_id);
        }
        if !material_ids.contains(material_id) {
            bail!(
                "recipe row {}: raw material {} of product {} not in raw_materials.csv",
                line + 1,
                material_id,
                product_id
            );
        }
    }
    Ok(())
}

impl LoadedCatalog {
    /// Load all master data from the default path
    pub fn load_default() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_DATA_PATH))
    }

    /// Load all master data from a specific directory
    pub fn load_from(path: &Path) -> Result<Self> {
        let catalog = Self {
            products: read_products(open(path, "products.csv")?).context("products.csv")?,
            materials: read_materials(open(path, "raw_materials.csv")?).context("raw_materials.csv")?,
            recipe_links: read_recipes(open(path, "recipes.csv")?).context("recipes.csv")?,
            indirect_costs: read_indirect_costs(open(path, "indirect_costs.csv")?)
                .context("indirect_costs.csv")?,
            inflation: read_inflation(open(path, "inflation.csv")?).context("inflation.csv")?,
            schedule: read_schedule(open(path, "schedule.csv")?).context("schedule.csv")?,
        };
        check_recipe_links(&catalog.products, &catalog.materials, &catalog.recipe_links)
            .context("recipes.csv")?;

        log::debug!(
            "catalog.loaded path={} products={} materials={} recipe_lines={} indirect_costs={} inflation={} schedule={}",
            path.display(),
            catalog.products.len(),
            catalog.materials.len(),
            catalog.recipe_links.len(),
            catalog.indirect_costs.len(),
            catalog.inflation.len(),
            catalog.schedule.len(),
        );

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryRepository, ProductRepository, RecipeRepository};
    use std::path::PathBuf;

    #[test]
    fn test_read_products_validates_waste() {
        let csv = "id,code,name,batch_weight_kg,waste_pct,labor_minutes_per_kg,active\n\
                   1,SAL,Salchicha,100,3.6,1.5,true\n";
        let products = read_products(csv.as_bytes()).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].code, "SAL");

        let bad = "id,code,name,batch_weight_kg,waste_pct,labor_minutes_per_kg,active\n\
                   2,X,X,100,120,0,true\n";
        assert!(read_products(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_read_indirect_costs_rejects_duplicates_and_bad_months() {
        let csv = "account,amount,distribution,base_month,is_variable\n\
                   Sueldos,1000,SP,2025-01,false\n\
                   Luz,200,GIF,2025-01,true\n";
        let records = read_indirect_costs(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[1].is_variable);
        assert_eq!(records[0].distribution, DistributionType::Sp);

        let dup = "account,amount,distribution,base_month,is_variable\n\
                   Luz,1,GIF,2025-01,false\n\
                   Luz,2,GIF,2025-01,false\n";
        assert!(read_indirect_costs(dup.as_bytes()).is_err());

        let bad_month = "account,amount,distribution,base_month,is_variable\n\
                         Luz,1,GIF,2025-1,false\n";
        assert!(read_indirect_costs(bad_month.as_bytes()).is_err());
    }

    #[test]
    fn test_read_indirect_costs_rejects_non_finite_amount() {
        for amount in ["NaN", "inf", "-inf"] {
            let csv = format!(
                "account,amount,distribution,base_month,is_variable\n\
                 Sueldos,{},SP,2025-01,false\n\
                 Luz,100,GIF,2025-01,false\n",
                amount
            );
            assert!(read_indirect_costs(csv.as_bytes()).is_err(), "accepted amount {}", amount);
        }
    }

    #[test]
    fn test_read_products_and_materials_reject_duplicate_ids() {
        let products = "id,code,name,batch_weight_kg,waste_pct,labor_minutes_per_kg,active\n\
                        1,SAL,First,100,0,1,true\n\
                        1,SAL,Second,5,0,1,true\n";
        let err = read_products(products.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("duplicate product id 1"));

        let materials = "id,name,category,unit,unit_cost,active\n\
                         7,Carne,CARNE,kg,10,true\n\
                         7,Cerdo,CARNE,kg,8,true\n";
        assert!(read_materials(materials.as_bytes()).is_err());
    }

    #[test]
    fn test_recipe_link_errors_name_the_row() {
        let products = vec![Product::new(1, "SAL", "Salchicha", 100.0, 0.0, 1.0)];
        let materials = vec![RawMaterial::new(7, "Carne", "CARNE", "kg", 10.0)];

        assert!(check_recipe_links(&products, &materials, &[(1, 7, 2.0)]).is_ok());

        let err = check_recipe_links(&products, &materials, &[(1, 7, 2.0), (1, 9, 1.0)]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("recipe row 2"), "{}", message);
        assert!(message.contains("raw material 9"), "{}", message);

        assert!(check_recipe_links(&products, &materials, &[(4, 7, 1.0)]).is_err());
    }

    #[test]
    fn test_read_schedule_rejects_zero_batches() {
        let csv = "product_id,batches,date\n1,2,2025-02-01\n";
        let entries = read_schedule(csv.as_bytes()).unwrap();
        assert_eq!(entries[0].batches, 2.0);

        let bad = "product_id,batches,date\n1,0,2025-02-01\n";
        assert!(read_schedule(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_read_inflation_rejects_duplicate_month() {
        let csv = "month,pct\n2025-02,10\n2025-02,3\n";
        assert!(read_inflation(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_load_sample_data() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/sample");
        let loaded = LoadedCatalog::load_from(&path);
        assert!(loaded.is_ok(), "Failed to load sample data: {:?}", loaded.err());

        let repo = InMemoryRepository::from_loaded(loaded.unwrap()).unwrap();
        assert!(!repo.active_products().is_empty());
        assert!(!repo.lines_for(1).is_empty());
    }
}
