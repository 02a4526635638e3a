//! Job, quote and master-data records of one company.
//!
//! Every write loads the affected collection, applies the change and saves
//! it back through the repository. Margins and red flags are derived through
//! `insight-profit` on every create and edit; stored values are never
//! trusted as inputs.

use chrono::Utc;
use insight_profit::{check_amount, MarginPolicy, ProfitError};
use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::onboarding;
use crate::quoting::price_quote;
use crate::repository::{Collection, Repository};
use crate::types::{
    Client, ClientDraft, Company, CompanyProfile, Equipment, EquipmentDraft, Job, JobDraft,
    JobUpdate, LaborRole, LaborRoleDraft, Material, MaterialDraft, OnboardingData, Quote,
    QuoteDraft, QuoteStatus, QuoteUpdate,
};
use crate::util::next_id;

/// All collections of a company at one point in time.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySnapshot {
    pub jobs: Vec<Job>,
    pub quotes: Vec<Quote>,
    pub labor_roles: Vec<LaborRole>,
    pub materials: Vec<Material>,
    pub equipment: Vec<Equipment>,
    pub clients: Vec<Client>,
}

fn require_text(field: &str, value: &str) -> PipelineResult<()> {
    if value.trim().is_empty() {
        return Err(ProfitError::invalid(field, "must not be empty").into());
    }
    Ok(())
}

pub struct JobBook {
    repo: Repository,
    company: Company,
    policy: MarginPolicy,
}

impl JobBook {
    pub fn new(repo: Repository, company: Company) -> Self {
        let policy = company.margin_policy();
        Self {
            repo,
            company,
            policy,
        }
    }

    /// Open a company's book, reading its stored settings. A company that
    /// was never saved starts from the defaults, named after its id.
    pub async fn open(repo: Repository) -> PipelineResult<Self> {
        let company = match repo.load_company().await? {
            Some(company) => company,
            None => {
                log::info!("no stored record for company {}, using defaults", repo.company_id());
                Company::new(repo.company_id(), repo.company_id())
            }
        };
        Ok(Self::new(repo, company))
    }

    pub fn company(&self) -> &Company {
        &self.company
    }

    pub fn policy(&self) -> &MarginPolicy {
        &self.policy
    }

    pub async fn snapshot(&self) -> PipelineResult<CompanySnapshot> {
        Ok(CompanySnapshot {
            jobs: self.repo.load(Collection::Jobs).await?,
            quotes: self.repo.load(Collection::Quotes).await?,
            labor_roles: self.repo.load(Collection::LaborRoles).await?,
            materials: self.repo.load(Collection::Materials).await?,
            equipment: self.repo.load(Collection::Equipment).await?,
            clients: self.repo.load(Collection::Clients).await?,
        })
    }

    pub async fn jobs(&self) -> PipelineResult<Vec<Job>> {
        self.repo.load(Collection::Jobs).await
    }

    pub async fn quotes(&self) -> PipelineResult<Vec<Quote>> {
        self.repo.load(Collection::Quotes).await
    }

    // -----------------------------------------------------------------------
    // Jobs
    // -----------------------------------------------------------------------

    fn build_job(&self, draft: JobDraft) -> PipelineResult<Job> {
        let result = self.policy.evaluate(draft.total_revenue, &draft.actual_costs)?;
        Ok(Job {
            id: next_id("job"),
            title: draft.title,
            job_type: draft.job_type,
            location: draft.location,
            client_id: draft.client_id,
            crew: draft.crew,
            equipment_used: draft.equipment_used,
            materials_used: draft.materials_used,
            total_revenue: draft.total_revenue,
            actual_costs: draft.actual_costs,
            notes: draft.notes,
            date_completed: draft.date_completed.unwrap_or_else(Utc::now),
            company_id: self.company.id.clone(),
            margin: result.margin,
            is_red_flag: result.is_red_flag,
        })
    }

    /// Record a completed job.
    pub async fn add_job(&self, draft: JobDraft) -> PipelineResult<Job> {
        require_text("title", &draft.title)?;
        let job = self.build_job(draft)?;

        let mut jobs: Vec<Job> = self.repo.load(Collection::Jobs).await?;
        jobs.push(job.clone());
        self.repo.save(Collection::Jobs, &jobs).await?;

        log::info!(
            "added job {} ({}): margin {:.2}%{}",
            job.id,
            job.title,
            job.margin,
            if job.is_red_flag { ", red flag" } else { "" }
        );
        Ok(job)
    }

    /// Apply edits to a job and re-derive its margin and red flag.
    pub async fn update_job(&self, id: &str, update: JobUpdate) -> PipelineResult<Job> {
        let mut jobs: Vec<Job> = self.repo.load(Collection::Jobs).await?;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| PipelineError::NotFound {
                kind: "job",
                id: id.to_string(),
            })?;

        let mut edited = job.clone();
        if let Some(title) = update.title {
            require_text("title", &title)?;
            edited.title = title;
        }
        if let Some(job_type) = update.job_type {
            edited.job_type = job_type;
        }
        if let Some(location) = update.location {
            edited.location = location;
        }
        if let Some(client_id) = update.client_id {
            edited.client_id = client_id;
        }
        if let Some(crew) = update.crew {
            edited.crew = crew;
        }
        if let Some(equipment_used) = update.equipment_used {
            edited.equipment_used = equipment_used;
        }
        if let Some(materials_used) = update.materials_used {
            edited.materials_used = materials_used;
        }
        if let Some(total_revenue) = update.total_revenue {
            edited.total_revenue = total_revenue;
        }
        if let Some(actual_costs) = update.actual_costs {
            edited.actual_costs = actual_costs;
        }
        if let Some(notes) = update.notes {
            edited.notes = Some(notes);
        }
        if let Some(date_completed) = update.date_completed {
            edited.date_completed = date_completed;
        }

        let result = self.policy.evaluate_input(&edited.profitability_input())?;
        edited.margin = result.margin;
        edited.is_red_flag = result.is_red_flag;
        *job = edited.clone();

        self.repo.save(Collection::Jobs, &jobs).await?;
        log::info!("updated job {}: margin {:.2}%", edited.id, edited.margin);
        Ok(edited)
    }

    // -----------------------------------------------------------------------
    // Quotes
    // -----------------------------------------------------------------------

    /// Price and record a new draft quote.
    pub async fn add_quote(&self, draft: QuoteDraft) -> PipelineResult<Quote> {
        require_text("client_name", &draft.client_name)?;
        let overhead_markup = draft
            .overhead_markup
            .unwrap_or(self.company.default_overhead_markup);
        let pricing = price_quote(&draft.costs, overhead_markup, draft.custom_markup, &self.policy)?;

        let quote = Quote {
            id: next_id("quote"),
            client_name: draft.client_name,
            job_type: draft.job_type,
            description: draft.description,
            labor_costs: draft.costs.labor,
            material_costs: draft.costs.material,
            equipment_costs: draft.costs.equipment,
            total_costs: pricing.total_costs,
            overhead_markup,
            custom_markup: draft.custom_markup,
            quoted_price: pricing.quoted_price,
            margin: pricing.margin,
            status: QuoteStatus::Draft,
            date_created: Utc::now(),
            company_id: self.company.id.clone(),
            is_margin_alert: pricing.is_margin_alert,
        };

        let mut quotes: Vec<Quote> = self.repo.load(Collection::Quotes).await?;
        quotes.push(quote.clone());
        self.repo.save(Collection::Quotes, &quotes).await?;

        log::info!(
            "added quote {} for {}: price {:.2}, margin {:.2}%",
            quote.id,
            quote.client_name,
            quote.quoted_price,
            quote.margin
        );
        Ok(quote)
    }

    /// Apply edits to a quote and re-price it.
    pub async fn update_quote(&self, id: &str, update: QuoteUpdate) -> PipelineResult<Quote> {
        let mut quotes: Vec<Quote> = self.repo.load(Collection::Quotes).await?;
        let quote = quotes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| PipelineError::NotFound {
                kind: "quote",
                id: id.to_string(),
            })?;

        let mut edited = quote.clone();
        if let Some(client_name) = update.client_name {
            require_text("client_name", &client_name)?;
            edited.client_name = client_name;
        }
        if let Some(job_type) = update.job_type {
            edited.job_type = job_type;
        }
        if let Some(description) = update.description {
            edited.description = description;
        }
        if let Some(costs) = update.costs {
            edited.labor_costs = costs.labor;
            edited.material_costs = costs.material;
            edited.equipment_costs = costs.equipment;
        }
        if let Some(overhead_markup) = update.overhead_markup {
            edited.overhead_markup = overhead_markup;
        }
        if let Some(custom_markup) = update.custom_markup {
            edited.custom_markup = custom_markup;
        }
        if let Some(status) = update.status {
            edited.status = status;
        }

        let pricing = price_quote(
            &edited.costs(),
            edited.overhead_markup,
            edited.custom_markup,
            &self.policy,
        )?;
        edited.total_costs = pricing.total_costs;
        edited.quoted_price = pricing.quoted_price;
        edited.margin = pricing.margin;
        edited.is_margin_alert = pricing.is_margin_alert;
        *quote = edited.clone();

        self.repo.save(Collection::Quotes, &quotes).await?;
        log::info!("updated quote {} ({})", edited.id, edited.status);
        Ok(edited)
    }

    // -----------------------------------------------------------------------
    // Master data
    // -----------------------------------------------------------------------

    fn build_labor_role(&self, draft: LaborRoleDraft) -> PipelineResult<LaborRole> {
        check_amount("hourly_rate", draft.hourly_rate)?;
        Ok(LaborRole {
            id: next_id("role"),
            name: draft.name,
            hourly_rate: draft.hourly_rate,
            company_id: self.company.id.clone(),
        })
    }

    fn build_material(&self, draft: MaterialDraft) -> PipelineResult<Material> {
        check_amount("cost_per_unit", draft.cost_per_unit)?;
        Ok(Material {
            id: next_id("material"),
            name: draft.name,
            unit: draft.unit,
            cost_per_unit: draft.cost_per_unit,
            code: draft.code,
            company_id: self.company.id.clone(),
        })
    }

    fn build_equipment(&self, draft: EquipmentDraft) -> PipelineResult<Equipment> {
        check_amount("daily_rate", draft.daily_rate)?;
        Ok(Equipment {
            id: next_id("equipment"),
            name: draft.name,
            daily_rate: draft.daily_rate,
            usage_frequency: draft.usage_frequency.unwrap_or_default(),
            company_id: self.company.id.clone(),
        })
    }

    fn build_client(&self, draft: ClientDraft) -> Client {
        Client {
            id: draft.id.unwrap_or_else(|| next_id("client")),
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            company_id: self.company.id.clone(),
        }
    }

    async fn append<T>(&self, collection: Collection, record: T) -> PipelineResult<T>
    where
        T: Clone + Serialize + serde::de::DeserializeOwned + Sync,
    {
        let mut records: Vec<T> = self.repo.load(collection).await?;
        records.push(record.clone());
        self.repo.save(collection, &records).await?;
        log::info!("added record to {}", collection.as_str());
        Ok(record)
    }

    pub async fn add_labor_role(&self, draft: LaborRoleDraft) -> PipelineResult<LaborRole> {
        require_text("name", &draft.name)?;
        let role = self.build_labor_role(draft)?;
        self.append(Collection::LaborRoles, role).await
    }

    pub async fn add_material(&self, draft: MaterialDraft) -> PipelineResult<Material> {
        require_text("name", &draft.name)?;
        let material = self.build_material(draft)?;
        self.append(Collection::Materials, material).await
    }

    pub async fn add_equipment(&self, draft: EquipmentDraft) -> PipelineResult<Equipment> {
        require_text("name", &draft.name)?;
        let equipment = self.build_equipment(draft)?;
        self.append(Collection::Equipment, equipment).await
    }

    pub async fn add_client(&self, draft: ClientDraft) -> PipelineResult<Client> {
        require_text("name", &draft.name)?;
        let client = self.build_client(draft);
        self.append(Collection::Clients, client).await
    }

    // -----------------------------------------------------------------------
    // Onboarding
    // -----------------------------------------------------------------------

    fn apply_profile(&mut self, profile: CompanyProfile) -> PipelineResult<()> {
        if let Some(threshold) = profile.red_flag_threshold {
            self.policy = MarginPolicy::new(threshold)?;
            self.company.red_flag_threshold = threshold;
        }
        if let Some(markup) = profile.default_overhead_markup {
            check_amount("default_overhead_markup", markup)?;
            self.company.default_overhead_markup = markup;
        }
        if let Some(name) = profile.name {
            self.company.name = name;
        }
        if let Some(industry) = profile.industry {
            self.company.industry = industry;
        }
        if let Some(size) = profile.size {
            self.company.size = size;
        }
        if let Some(country) = profile.country {
            self.company.country = country;
        }
        if let Some(currency) = profile.currency {
            self.company.currency = currency;
        }
        if profile.logo.is_some() {
            self.company.logo = profile.logo;
        }
        Ok(())
    }

    fn prepare_import(&self, data: OnboardingData) -> PipelineResult<PreparedImport> {
        let labor_roles = data
            .labor_roles
            .map(|drafts| {
                drafts
                    .into_iter()
                    .map(|d| self.build_labor_role(d))
                    .collect::<PipelineResult<Vec<_>>>()
            })
            .transpose()?;
        let materials = data
            .materials
            .map(|drafts| {
                drafts
                    .into_iter()
                    .map(|d| self.build_material(d))
                    .collect::<PipelineResult<Vec<_>>>()
            })
            .transpose()?;
        let equipment = data
            .equipment
            .map(|drafts| {
                drafts
                    .into_iter()
                    .map(|d| self.build_equipment(d))
                    .collect::<PipelineResult<Vec<_>>>()
            })
            .transpose()?;
        let jobs = data
            .imported_jobs
            .map(|drafts| {
                drafts
                    .into_iter()
                    .map(|d| self.build_job(d))
                    .collect::<PipelineResult<Vec<_>>>()
            })
            .transpose()?;

        let client_drafts = if !data.clients.is_empty() {
            Some(data.clients)
        } else if jobs.as_ref().is_some_and(|j| !j.is_empty()) {
            log::info!("no clients supplied with imported jobs, seeding sample clients");
            Some(onboarding::sample_clients())
        } else {
            None
        };
        let clients = client_drafts
            .map(|drafts| drafts.into_iter().map(|d| self.build_client(d)).collect());

        Ok(PreparedImport {
            labor_roles,
            materials,
            equipment,
            jobs,
            clients,
        })
    }

    /// Apply settings changes and persist the company record. On failure the
    /// company and policy are left as they were.
    pub async fn update_company(&mut self, profile: CompanyProfile) -> PipelineResult<Company> {
        let previous = (self.company.clone(), self.policy);
        let result = match self.apply_profile(profile) {
            Ok(()) => self.repo.save_company(&self.company).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            (self.company, self.policy) = previous;
            log::warn!("settings update for company {} rejected: {}", self.company.id, e);
            return Err(e);
        }
        log::info!(
            "company {} settings saved: red flag below {}%, overhead {}%",
            self.company.id,
            self.company.red_flag_threshold,
            self.company.default_overhead_markup
        );
        Ok(self.company.clone())
    }

    async fn write_import(&self, import: &PreparedImport) -> PipelineResult<()> {
        if let Some(clients) = &import.clients {
            self.repo.save(Collection::Clients, clients).await?;
        }
        if let Some(roles) = &import.labor_roles {
            self.repo.save(Collection::LaborRoles, roles).await?;
        }
        if let Some(materials) = &import.materials {
            self.repo.save(Collection::Materials, materials).await?;
        }
        if let Some(equipment) = &import.equipment {
            self.repo.save(Collection::Equipment, equipment).await?;
        }
        if let Some(jobs) = &import.jobs {
            self.repo.save(Collection::Jobs, jobs).await?;
            let flagged = jobs.iter().filter(|j| j.is_red_flag).count();
            log::info!("imported {} jobs, {} red flags", jobs.len(), flagged);
        }
        self.repo.save_company(&self.company).await
    }

    /// Load everything collected during onboarding.
    ///
    /// Supplied master-data lists replace the stored ones. Imported jobs
    /// replace the stored jobs with freshly derived margins. When jobs are
    /// imported without any clients, the sample clients are seeded so the
    /// sample jobs resolve. Nothing is written and the company is left as it
    /// was unless every record is valid. If a write fails the in-memory
    /// company is restored, but collections already written stay written.
    pub async fn initialize_company_data(
        &mut self,
        mut data: OnboardingData,
    ) -> PipelineResult<CompanySnapshot> {
        let previous = (self.company.clone(), self.policy);
        let profile = std::mem::take(&mut data.company);
        let prepared = self
            .apply_profile(profile)
            .and_then(|()| self.prepare_import(data));
        let import = match prepared {
            Ok(import) => import,
            Err(e) => {
                (self.company, self.policy) = previous;
                log::warn!("onboarding for company {} rejected: {}", self.company.id, e);
                return Err(e);
            }
        };

        self.company.is_onboarded = true;
        if let Err(e) = self.write_import(&import).await {
            (self.company, self.policy) = previous;
            log::warn!("onboarding for company {} failed to save: {}", self.company.id, e);
            return Err(e);
        }
        log::info!("company {} onboarded", self.company.id);
        self.snapshot().await
    }
}

/// Validated onboarding records waiting to be written.
struct PreparedImport {
    labor_roles: Option<Vec<LaborRole>>,
    materials: Option<Vec<Material>>,
    equipment: Option<Vec<Equipment>>,
    jobs: Option<Vec<Job>>,
    clients: Option<Vec<Client>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{KeyValueStore, MemoryStore};
    use crate::types::{JobType, QuoteCosts};
    use async_trait::async_trait;
    use insight_profit::CostBreakdown;
    use std::sync::Arc;

    /// Memory store that refuses writes to keys with a given prefix.
    struct RefusingStore {
        inner: MemoryStore,
        refused_prefix: &'static str,
    }

    #[async_trait]
    impl KeyValueStore for RefusingStore {
        async fn get(&self, key: &str) -> PipelineResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: String) -> PipelineResult<()> {
            if key.starts_with(self.refused_prefix) {
                return Err(PipelineError::Storage(format!("disk full writing {}", key)));
            }
            self.inner.put(key, value).await
        }
    }

    fn book() -> JobBook {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        JobBook::new(Repository::new(store, "c1"), Company::new("c1", "Acme Marine"))
    }

    fn draft(title: &str, revenue: f64, labor: f64) -> JobDraft {
        JobDraft {
            title: title.into(),
            total_revenue: revenue,
            actual_costs: CostBreakdown::new(labor, 0.0, 0.0, 0.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn add_job_derives_margin_and_persists() {
        let book = book();
        let job = book.add_job(draft("Hull repair", 1000.0, 950.0)).await.unwrap();
        assert!(job.id.starts_with("job_"));
        assert_eq!(job.company_id, "c1");
        assert!((job.margin - 5.0).abs() < 1e-9);
        assert!(job.is_red_flag);

        let stored = book.jobs().await.unwrap();
        assert_eq!(stored, vec![job]);
    }

    #[tokio::test]
    async fn add_job_rejects_invalid_input() {
        let book = book();
        let err = book.add_job(draft("", 1000.0, 10.0)).await.unwrap_err();
        assert!(err.is_validation());
        let err = book.add_job(draft("Dock", 1000.0, -10.0)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Profit(_)));
        assert!(book.jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_job_recomputes_margin() {
        let book = book();
        let job = book.add_job(draft("Pier", 1000.0, 950.0)).await.unwrap();
        assert!(job.is_red_flag);

        let update = JobUpdate {
            total_revenue: Some(2000.0),
            ..Default::default()
        };
        let edited = book.update_job(&job.id, update).await.unwrap();
        assert!((edited.margin - 52.5).abs() < 1e-9);
        assert!(!edited.is_red_flag);
        assert_eq!(book.jobs().await.unwrap()[0], edited);
    }

    #[tokio::test]
    async fn update_unknown_job_is_not_found() {
        let err = book().update_job("job_x", JobUpdate::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { kind: "job", .. }));
    }

    #[tokio::test]
    async fn company_threshold_drives_red_flags() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut company = Company::new("c1", "Acme");
        company.red_flag_threshold = 5.0;
        let book = JobBook::new(Repository::new(store, "c1"), company);
        let job = book.add_job(draft("Barge", 1000.0, 930.0)).await.unwrap();
        assert!(!job.is_red_flag);
    }

    #[tokio::test]
    async fn add_quote_uses_company_overhead_markup() {
        let book = book();
        let quote = book
            .add_quote(QuoteDraft {
                client_name: "Harbor Co".into(),
                job_type: JobType::Marine,
                description: "Pontoon refit".into(),
                costs: QuoteCosts::new(6000.0, 4000.0, 3000.0),
                overhead_markup: None,
                custom_markup: 0.0,
            })
            .await
            .unwrap();
        assert_eq!(quote.overhead_markup, 15.0);
        assert_eq!(quote.total_costs, 13000.0);
        assert_eq!(quote.quoted_price, 14950.0);
        assert_eq!(quote.status, QuoteStatus::Draft);
        assert!(!quote.is_margin_alert);
        assert_eq!(book.quotes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_quote_reprices_and_sets_status() {
        let book = book();
        let quote = book
            .add_quote(QuoteDraft {
                client_name: "Harbor Co".into(),
                costs: QuoteCosts::new(1000.0, 0.0, 0.0),
                overhead_markup: Some(20.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(quote.quoted_price, 1200.0);

        let edited = book
            .update_quote(
                &quote.id,
                QuoteUpdate {
                    overhead_markup: Some(5.0),
                    status: Some(QuoteStatus::Submitted),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.quoted_price, 1050.0);
        assert!(edited.is_margin_alert);
        assert_eq!(edited.status, QuoteStatus::Submitted);
    }

    #[tokio::test]
    async fn master_data_is_scoped_to_company() {
        let book = book();
        let role = book
            .add_labor_role(LaborRoleDraft {
                name: "Welder".into(),
                hourly_rate: 55.0,
            })
            .await
            .unwrap();
        assert_eq!(role.company_id, "c1");
        let equipment = book
            .add_equipment(EquipmentDraft {
                name: "Crane".into(),
                daily_rate: 900.0,
                usage_frequency: None,
            })
            .await
            .unwrap();
        assert_eq!(equipment.usage_frequency, crate::types::UsageFrequency::Low);
        assert!(book
            .add_material(MaterialDraft {
                name: "Steel".into(),
                cost_per_unit: -1.0,
                ..Default::default()
            })
            .await
            .is_err());

        let snapshot = book.snapshot().await.unwrap();
        assert_eq!(snapshot.labor_roles.len(), 1);
        assert_eq!(snapshot.equipment.len(), 1);
        assert!(snapshot.materials.is_empty());
    }

    #[tokio::test]
    async fn onboarding_imports_sample_jobs_and_seeds_clients() {
        let mut book = book();
        let data = OnboardingData {
            company: CompanyProfile {
                industry: Some(JobType::Construction),
                ..Default::default()
            },
            imported_jobs: Some(onboarding::sample_jobs()),
            ..Default::default()
        };
        let snapshot = book.initialize_company_data(data).await.unwrap();

        assert!(book.company().is_onboarded);
        assert_eq!(book.company().industry, JobType::Construction);
        assert_eq!(snapshot.jobs.len(), 3);
        assert!(snapshot.jobs.iter().all(|j| j.is_red_flag));
        assert!((snapshot.jobs[0].margin - 5000.0 / 85000.0 * 100.0).abs() < 1e-9);
        assert_eq!(snapshot.clients.len(), 3);
        assert_eq!(snapshot.clients[0].id, "sample_client_1");
        assert_eq!(snapshot.clients[2].company_id, "c1");
    }

    #[tokio::test]
    async fn onboarding_keeps_supplied_clients() {
        let mut book = book();
        let data = OnboardingData {
            clients: vec![ClientDraft {
                name: "Harbor Co".into(),
                ..Default::default()
            }],
            imported_jobs: Some(vec![draft("Dredging", 500.0, 100.0)]),
            labor_roles: Some(vec![LaborRoleDraft::default()]),
            ..Default::default()
        };
        let snapshot = book.initialize_company_data(data).await.unwrap();
        assert_eq!(snapshot.clients.len(), 1);
        assert_eq!(snapshot.clients[0].name, "Harbor Co");
        assert_eq!(snapshot.labor_roles[0].hourly_rate, 0.0);
        assert_eq!(snapshot.jobs[0].job_type, JobType::Construction);
    }

    #[tokio::test]
    async fn invalid_onboarding_writes_nothing() {
        let mut book = book();
        let data = OnboardingData {
            labor_roles: Some(vec![LaborRoleDraft {
                name: "Diver".into(),
                hourly_rate: 80.0,
            }]),
            imported_jobs: Some(vec![draft("Bad", -1.0, 0.0)]),
            ..Default::default()
        };
        assert!(book.initialize_company_data(data).await.is_err());
        let snapshot = book.snapshot().await.unwrap();
        assert!(snapshot.labor_roles.is_empty());
        assert!(snapshot.jobs.is_empty());
        assert!(!book.company().is_onboarded);
    }

    #[tokio::test]
    async fn custom_threshold_from_profile_applies_to_import() {
        let mut book = book();
        let data = OnboardingData {
            company: CompanyProfile {
                red_flag_threshold: Some(5.0),
                ..Default::default()
            },
            imported_jobs: Some(onboarding::sample_jobs()),
            ..Default::default()
        };
        let snapshot = book.initialize_company_data(data).await.unwrap();
        // 5.88% clears a 5% threshold; 4.17% and 3.08% do not
        let flags: Vec<bool> = snapshot.jobs.iter().map(|j| j.is_red_flag).collect();
        assert_eq!(flags, vec![false, true, true]);
        assert_eq!(book.policy().red_flag_threshold, 5.0);
    }

    #[tokio::test]
    async fn open_without_stored_company_uses_defaults() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let book = JobBook::open(Repository::new(store, "c9")).await.unwrap();
        assert_eq!(book.company().id, "c9");
        assert_eq!(book.company().name, "c9");
        assert!(!book.company().is_onboarded);
        assert_eq!(book.policy(), &MarginPolicy::default());
    }

    #[tokio::test]
    async fn update_company_persists_settings_and_policy() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut book = JobBook::open(Repository::new(store.clone(), "c1")).await.unwrap();
        let saved = book
            .update_company(CompanyProfile {
                name: Some("Acme Marine".into()),
                red_flag_threshold: Some(5.0),
                default_overhead_markup: Some(25.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(saved.red_flag_threshold, 5.0);
        assert_eq!(book.policy().red_flag_threshold, 5.0);

        let reopened = JobBook::open(Repository::new(store, "c1")).await.unwrap();
        assert_eq!(reopened.company(), &saved);
        assert_eq!(reopened.policy().red_flag_threshold, 5.0);
        let job = reopened.add_job(draft("Barge", 1000.0, 930.0)).await.unwrap();
        assert!(!job.is_red_flag);
    }

    #[tokio::test]
    async fn invalid_settings_leave_company_unchanged() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut book = JobBook::open(Repository::new(store.clone(), "c1")).await.unwrap();
        let err = book
            .update_company(CompanyProfile {
                red_flag_threshold: Some(5.0),
                default_overhead_markup: Some(-1.0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(book.policy(), &MarginPolicy::default());
        assert_eq!(book.company().default_overhead_markup, 15.0);
        assert_eq!(Repository::new(store, "c1").load_company().await.unwrap(), None);
    }

    #[tokio::test]
    async fn onboarding_persists_company_record() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut book = JobBook::open(Repository::new(store.clone(), "c1")).await.unwrap();
        let data = OnboardingData {
            company: CompanyProfile {
                red_flag_threshold: Some(5.0),
                default_overhead_markup: Some(25.0),
                ..Default::default()
            },
            imported_jobs: Some(onboarding::sample_jobs()),
            ..Default::default()
        };
        book.initialize_company_data(data).await.unwrap();

        let stored = Repository::new(store, "c1").load_company().await.unwrap().unwrap();
        assert!(stored.is_onboarded);
        assert_eq!(stored.red_flag_threshold, 5.0);
        assert_eq!(stored.default_overhead_markup, 25.0);
    }

    #[tokio::test]
    async fn failed_onboarding_write_restores_company() {
        let store: Arc<dyn KeyValueStore> = Arc::new(RefusingStore {
            inner: MemoryStore::new(),
            refused_prefix: "jie_jobs_",
        });
        let mut book = JobBook::new(Repository::new(store, "c1"), Company::new("c1", "Acme"));
        let data = OnboardingData {
            company: CompanyProfile {
                red_flag_threshold: Some(5.0),
                ..Default::default()
            },
            imported_jobs: Some(onboarding::sample_jobs()),
            ..Default::default()
        };
        let err = book.initialize_company_data(data).await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
        assert!(!book.company().is_onboarded);
        assert_eq!(book.company().red_flag_threshold, 10.0);
        assert_eq!(book.policy(), &MarginPolicy::default());
    }
}
