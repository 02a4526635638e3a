use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{check_amount, ProfitResult};

/// One of the four fixed cost categories of a job or quote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostCategory {
    Labor,
    Material,
    Equipment,
    Subcontractor,
}

impl CostCategory {
    /// All categories in their fixed order.
    pub const ALL: [CostCategory; 4] = [
        CostCategory::Labor,
        CostCategory::Material,
        CostCategory::Equipment,
        CostCategory::Subcontractor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CostCategory::Labor => "labor",
            CostCategory::Material => "material",
            CostCategory::Equipment => "equipment",
            CostCategory::Subcontractor => "subcontractor",
        }
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four-category decomposition of a job's or quote's total cost.
///
/// Missing fields deserialize as `0`, matching records saved before a
/// category was filled in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostBreakdown {
    pub labor: f64,
    pub material: f64,
    pub equipment: f64,
    pub subcontractor: f64,
}

impl CostBreakdown {
    pub fn new(labor: f64, material: f64, equipment: f64, subcontractor: f64) -> Self {
        Self {
            labor,
            material,
            equipment,
            subcontractor,
        }
    }

    pub fn get(&self, category: CostCategory) -> f64 {
        match category {
            CostCategory::Labor => self.labor,
            CostCategory::Material => self.material,
            CostCategory::Equipment => self.equipment,
            CostCategory::Subcontractor => self.subcontractor,
        }
    }

    /// `(category, amount)` pairs in the fixed category order.
    pub fn iter(&self) -> impl Iterator<Item = (CostCategory, f64)> + '_ {
        CostCategory::ALL.iter().map(move |&c| (c, self.get(c)))
    }

    /// Check every category is a finite, non-negative amount.
    pub fn validate(&self) -> ProfitResult<()> {
        for (category, amount) in self.iter() {
            check_amount(category.as_str(), amount)?;
        }
        Ok(())
    }

    pub fn total(&self) -> ProfitResult<f64> {
        total_cost(self)
    }
}

/// Sum the four cost categories.
///
/// Fails with `InvalidInput` when any category is negative or not a number.
pub fn total_cost(costs: &CostBreakdown) -> ProfitResult<f64> {
    costs.validate()?;
    Ok(costs.iter().map(|(_, amount)| amount).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProfitError;

    #[test]
    fn sums_all_four_categories() {
        let costs = CostBreakdown::new(35000.0, 25000.0, 15000.0, 5000.0);
        assert_eq!(total_cost(&costs).unwrap(), 80000.0);
    }

    #[test]
    fn default_breakdown_totals_zero() {
        assert_eq!(total_cost(&CostBreakdown::default()).unwrap(), 0.0);
    }

    #[test]
    fn negative_category_is_rejected() {
        let costs = CostBreakdown::new(100.0, -1.0, 0.0, 0.0);
        match total_cost(&costs) {
            Err(ProfitError::InvalidInput { field, .. }) => assert_eq!(field, "material"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn nan_category_is_rejected() {
        let costs = CostBreakdown::new(0.0, 0.0, 0.0, f64::NAN);
        assert!(total_cost(&costs).is_err());
    }

    #[test]
    fn missing_fields_deserialize_as_zero() {
        let costs: CostBreakdown = serde_json::from_str(r#"{"labor": 1200}"#).unwrap();
        assert_eq!(costs.labor, 1200.0);
        assert_eq!(costs.material, 0.0);
        assert_eq!(costs.subcontractor, 0.0);
        assert_eq!(costs.total().unwrap(), 1200.0);
    }

    #[test]
    fn categories_read_in_fixed_order() {
        let costs = CostBreakdown::new(10.0, 20.0, 30.0, 40.0);
        let amounts: Vec<f64> = costs.iter().map(|(_, amount)| amount).collect();
        assert_eq!(amounts, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(costs.get(CostCategory::Labor), 10.0);
        assert_eq!(costs.get(CostCategory::Subcontractor), 40.0);
        assert_eq!(costs.total().unwrap(), 100.0);
    }
}
