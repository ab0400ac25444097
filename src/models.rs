use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Clinic visit - one entry in a pet's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

// A pet with its ordered visit history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: String,
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub visits: Vec<Visit>,
}

// Owner - root of the owners -> pets -> visits tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub telephone: String,
    #[serde(default)]
    pub pets: Vec<Pet>,
}

impl Owner {
    pub fn pet(&self, pet_id: u32) -> Option<&Pet> {
        self.pets.iter().find(|p| p.id == pet_id)
    }
}

/// Coarse health classification derived only from the number of visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    Unknown,
    Good,
    Moderate,
    #[serde(rename = "High Maintenance")]
    HighMaintenance,
}

impl HealthStatus {
    /// 0 -> Unknown, 1..=2 -> Good, 3..=5 -> Moderate, 6+ -> High Maintenance.
    pub fn from_visit_count(visit_count: usize) -> Self {
        match visit_count {
            0 => HealthStatus::Unknown,
            1..=2 => HealthStatus::Good,
            3..=5 => HealthStatus::Moderate,
            _ => HealthStatus::HighMaintenance,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "Unknown",
            HealthStatus::Good => "Good",
            HealthStatus::Moderate => "Moderate",
            HealthStatus::HighMaintenance => "High Maintenance",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Result of analyzing a single pet (produced by a pool worker)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetAnalysis {
    pub name: String,
    pub pet_type: String,
    pub age_in_years: u32,
    pub visit_count: usize,
    pub health_status: HealthStatus,
}

// Aggregate analytics snapshot returned by /api/analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub total_pets: usize,
    pub pets_by_type: BTreeMap<String, usize>,
    pub pets_by_health_status: BTreeMap<HealthStatus, usize>,
    pub average_age: f64,
    pub total_visits: usize,
    pub analysis_date: NaiveDate,
}

// Body of the 429 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitExceeded {
    pub error: String,
    pub max_requests: u32,
    pub window_size_minutes: u32,
}
