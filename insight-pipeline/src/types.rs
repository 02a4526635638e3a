use std::fmt;

use chrono::{DateTime, Utc};
use insight_profit::thresholds::{DEFAULT_OVERHEAD_MARKUP, DEFAULT_RED_FLAG_THRESHOLD};
use insight_profit::{CostBreakdown, MarginPolicy, ProfitabilityInput};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Line of business of a job, quote or company.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobType {
    Marine,
    #[default]
    Construction,
    Logistics,
}

impl JobType {
    /// Report order.
    pub const ALL: [JobType; 3] = [JobType::Marine, JobType::Construction, JobType::Logistics];

    pub fn parse(s: &str) -> Option<JobType> {
        match s.trim().to_lowercase().as_str() {
            "marine" => Some(JobType::Marine),
            "construction" => Some(JobType::Construction),
            "logistics" => Some(JobType::Logistics),
            _ => None,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobType::Marine => write!(f, "Marine"),
            JobType::Construction => write!(f, "Construction"),
            JobType::Logistics => write!(f, "Logistics"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanySize {
    #[default]
    #[serde(rename = "1-10")]
    Small,
    #[serde(rename = "11-50")]
    Medium,
    #[serde(rename = "50+")]
    Large,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageFrequency {
    High,
    Medium,
    #[default]
    Low,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Company and master data
// ---------------------------------------------------------------------------

fn default_overhead_markup() -> f64 {
    DEFAULT_OVERHEAD_MARKUP
}

fn default_red_flag_threshold() -> f64 {
    DEFAULT_RED_FLAG_THRESHOLD
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub industry: JobType,
    pub size: CompanySize,
    pub country: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub is_onboarded: bool,
    /// Percent added on top of quote costs. Unrelated to the red-flag threshold.
    #[serde(default = "default_overhead_markup")]
    pub default_overhead_markup: f64,
    /// Margin percent below which jobs and quotes are flagged.
    #[serde(default = "default_red_flag_threshold")]
    pub red_flag_threshold: f64,
}

impl Company {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            industry: JobType::default(),
            size: CompanySize::default(),
            country: String::new(),
            currency: "USD".into(),
            logo: None,
            is_onboarded: false,
            default_overhead_markup: DEFAULT_OVERHEAD_MARKUP,
            red_flag_threshold: DEFAULT_RED_FLAG_THRESHOLD,
        }
    }

    /// The company's red-flag policy. A threshold that is not a number
    /// falls back to the default.
    pub fn margin_policy(&self) -> MarginPolicy {
        MarginPolicy::new(self.red_flag_threshold).unwrap_or_else(|e| {
            log::warn!("company {}: {}, using default threshold", self.id, e);
            MarginPolicy::default()
        })
    }
}

/// Company settings edited during onboarding. Unset fields are left alone.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub industry: Option<JobType>,
    pub size: Option<CompanySize>,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub logo: Option<String>,
    pub default_overhead_markup: Option<f64>,
    pub red_flag_threshold: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborRole {
    pub id: String,
    pub name: String,
    pub hourly_rate: f64,
    pub company_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub cost_per_unit: f64,
    pub code: String,
    pub company_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: String,
    pub name: String,
    pub daily_rate: f64,
    pub usage_frequency: UsageFrequency,
    pub company_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub company_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaborRoleDraft {
    pub name: String,
    pub hourly_rate: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialDraft {
    pub name: String,
    pub unit: String,
    pub cost_per_unit: f64,
    pub code: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EquipmentDraft {
    pub name: String,
    pub daily_rate: f64,
    pub usage_frequency: Option<UsageFrequency>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientDraft {
    /// Keeps a known id (sample clients, imported references).
    pub id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// A completed job with its actual costs.
///
/// `margin` and `is_red_flag` are derived from `total_revenue` and
/// `actual_costs` and rewritten on every create or edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub job_type: JobType,
    pub location: String,
    pub client_id: String,
    pub crew: String,
    #[serde(default)]
    pub equipment_used: Vec<String>,
    #[serde(default)]
    pub materials_used: Vec<String>,
    pub total_revenue: f64,
    #[serde(default)]
    pub actual_costs: CostBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub date_completed: DateTime<Utc>,
    pub company_id: String,
    pub margin: f64,
    pub is_red_flag: bool,
}

impl Job {
    pub fn profitability_input(&self) -> ProfitabilityInput {
        ProfitabilityInput::new(self.total_revenue, self.actual_costs)
    }
}

/// User input for a new job.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobDraft {
    pub title: String,
    pub job_type: JobType,
    pub location: String,
    pub client_id: String,
    pub crew: String,
    pub equipment_used: Vec<String>,
    pub materials_used: Vec<String>,
    pub total_revenue: f64,
    pub actual_costs: CostBreakdown,
    pub notes: Option<String>,
    /// Defaults to the time the job is recorded.
    pub date_completed: Option<DateTime<Utc>>,
}

/// Edits to an existing job. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobUpdate {
    pub title: Option<String>,
    pub job_type: Option<JobType>,
    pub location: Option<String>,
    pub client_id: Option<String>,
    pub crew: Option<String>,
    pub equipment_used: Option<Vec<String>>,
    pub materials_used: Option<Vec<String>>,
    pub total_revenue: Option<f64>,
    pub actual_costs: Option<CostBreakdown>,
    pub notes: Option<String>,
    pub date_completed: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// Estimated costs of a quote. Quotes carry no subcontractor cost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteCosts {
    pub labor: f64,
    pub material: f64,
    pub equipment: f64,
}

impl QuoteCosts {
    pub fn new(labor: f64, material: f64, equipment: f64) -> Self {
        Self {
            labor,
            material,
            equipment,
        }
    }

    pub fn breakdown(&self) -> CostBreakdown {
        CostBreakdown::new(self.labor, self.material, self.equipment, 0.0)
    }
}

impl From<&CostBreakdown> for QuoteCosts {
    fn from(costs: &CostBreakdown) -> Self {
        Self::new(costs.labor, costs.material, costs.equipment)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub client_name: String,
    pub job_type: JobType,
    pub description: String,
    pub labor_costs: f64,
    pub material_costs: f64,
    pub equipment_costs: f64,
    pub total_costs: f64,
    #[serde(default = "default_overhead_markup")]
    pub overhead_markup: f64,
    #[serde(default)]
    pub custom_markup: f64,
    pub quoted_price: f64,
    pub margin: f64,
    pub status: QuoteStatus,
    pub date_created: DateTime<Utc>,
    pub company_id: String,
    pub is_margin_alert: bool,
}

impl Quote {
    pub fn costs(&self) -> QuoteCosts {
        QuoteCosts::new(self.labor_costs, self.material_costs, self.equipment_costs)
    }

    pub fn profitability_input(&self) -> ProfitabilityInput {
        ProfitabilityInput::new(self.quoted_price, self.costs().breakdown())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuoteDraft {
    pub client_name: String,
    pub job_type: JobType,
    pub description: String,
    pub costs: QuoteCosts,
    /// Falls back to the company's default overhead markup.
    pub overhead_markup: Option<f64>,
    pub custom_markup: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuoteUpdate {
    pub client_name: Option<String>,
    pub job_type: Option<JobType>,
    pub description: Option<String>,
    pub costs: Option<QuoteCosts>,
    pub overhead_markup: Option<f64>,
    pub custom_markup: Option<f64>,
    pub status: Option<QuoteStatus>,
}

// ---------------------------------------------------------------------------
// Onboarding
// ---------------------------------------------------------------------------

/// Everything collected by the onboarding steps.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OnboardingData {
    pub company: CompanyProfile,
    pub labor_roles: Option<Vec<LaborRoleDraft>>,
    pub materials: Option<Vec<MaterialDraft>>,
    pub equipment: Option<Vec<EquipmentDraft>>,
    pub clients: Vec<ClientDraft>,
    pub imported_jobs: Option<Vec<JobDraft>>,
}
