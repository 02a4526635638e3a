//! Sample data offered during onboarding.
//!
//! The three sample jobs reference the three sample clients by id, so the
//! two sets are seeded together.

use insight_profit::CostBreakdown;

use crate::types::{ClientDraft, JobDraft, JobType};

pub const SAMPLE_CLIENT_IDS: [&str; 3] = ["sample_client_1", "sample_client_2", "sample_client_3"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn sample_jobs() -> Vec<JobDraft> {
    vec![
        JobDraft {
            title: "Office Building Foundation".into(),
            job_type: JobType::Construction,
            location: "Downtown District".into(),
            client_id: SAMPLE_CLIENT_IDS[0].into(),
            crew: "Team Alpha".into(),
            equipment_used: strings(&["Excavator", "Concrete Mixer"]),
            materials_used: strings(&["Concrete", "Steel Rebar"]),
            total_revenue: 85000.0,
            actual_costs: CostBreakdown::new(35000.0, 25000.0, 15000.0, 5000.0),
            notes: Some("Completed on time with good profit margin".into()),
            date_completed: None,
        },
        JobDraft {
            title: "Warehouse Renovation".into(),
            job_type: JobType::Construction,
            location: "Industrial Park".into(),
            client_id: SAMPLE_CLIENT_IDS[1].into(),
            crew: "Team Beta".into(),
            equipment_used: strings(&["Crane", "Forklift"]),
            materials_used: strings(&["Steel Beams", "Insulation"]),
            total_revenue: 120000.0,
            actual_costs: CostBreakdown::new(45000.0, 40000.0, 20000.0, 10000.0),
            notes: Some("Material costs higher than expected".into()),
            date_completed: None,
        },
        JobDraft {
            title: "Marine Equipment Installation".into(),
            job_type: JobType::Marine,
            location: "Port Authority".into(),
            client_id: SAMPLE_CLIENT_IDS[2].into(),
            crew: "Marine Team".into(),
            equipment_used: strings(&["Marine Crane", "Diving Equipment"]),
            materials_used: strings(&["Marine Grade Steel", "Waterproof Coating"]),
            total_revenue: 65000.0,
            actual_costs: CostBreakdown::new(20000.0, 15000.0, 25000.0, 3000.0),
            notes: Some("Excellent margin, client satisfied".into()),
            date_completed: None,
        },
    ]
}

pub fn sample_clients() -> Vec<ClientDraft> {
    let clients = [
        ("Downtown Development Corp", "contact@downtown.com"),
        ("Industrial Solutions Ltd", "info@industrial.com"),
        ("Port Authority", "contracts@port.gov"),
    ];
    SAMPLE_CLIENT_IDS
        .iter()
        .zip(clients)
        .map(|(id, (name, email))| ClientDraft {
            id: Some(id.to_string()),
            name: name.to_string(),
            email: Some(email.to_string()),
            phone: None,
        })
        .collect()
}
