//! Pet analytics.
//!
//! [`PetAnalyticsService::analyze_all`] fans every pet out onto the
//! [`AnalysisPool`], joins all results and folds them into an
//! [`AnalyticsReport`]. Any failing pet fails the whole run.
//!
//! The per-pet functions here are pure and are also used directly by the
//! single-pet report endpoint.

use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::clock::Clock;
use crate::error::AnalyticsError;
use crate::metrics::{ANALYSIS_FAILURES, ANALYSIS_LATENCY};
use crate::models::{AnalyticsReport, HealthStatus, Pet, PetAnalysis};
use crate::repository::OwnerRepository;
use crate::worker::AnalysisPool;

const DATE_FORMAT: &str = "%b %d, %Y";

/// Case-insensitive mapping from pet type to its broad category.
pub fn categorize_by_type(pet_type: &str) -> &'static str {
    match pet_type.to_lowercase().as_str() {
        "dog" => "Canine",
        "cat" => "Feline",
        "bird" => "Avian",
        "hamster" | "rabbit" => "Small Mammal",
        _ => "Other",
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format(DATE_FORMAT).to_string(),
        None => "Unknown".to_string(),
    }
}

/// Human readable multi-line report for one pet.
pub fn generate_pet_report(pet: &Pet) -> String {
    let mut lines = vec![
        format!("Pet Report for: {}", pet.name),
        format!("Type: {}", pet.pet_type),
        format!("Birth Date: {}", format_date(pet.birth_date)),
        format!("Category: {}", categorize_by_type(&pet.pet_type)),
    ];

    match pet.visits.iter().map(|v| v.date).max() {
        Some(last_visit) => {
            lines.push(format!("Total Visits: {}", pet.visits.len()));
            lines.push(format!("Last Visit: {}", format_date(Some(last_visit))));
        }
        None => lines.push("No visits recorded".to_string()),
    }

    let mut report = lines.join("\n");
    report.push('\n');
    report
}

/// Whole years between the birth year and `today`'s year. Month and day are
/// ignored; a missing birth date counts as 0.
pub fn calculate_age(birth_date: Option<NaiveDate>, today: NaiveDate) -> i32 {
    birth_date.map_or(0, |b| today.year() - b.year())
}

/// Analyze one pet. Pets without a name or type, or born after `today`'s
/// year, are rejected.
pub fn analyze_pet(pet: &Pet, today: NaiveDate) -> Result<PetAnalysis, AnalyticsError> {
    let malformed = |reason: &str| AnalyticsError::MalformedPet {
        pet_id: pet.id,
        name: pet.name.clone(),
        reason: reason.to_string(),
    };

    if pet.name.trim().is_empty() {
        return Err(malformed("missing name"));
    }
    if pet.pet_type.trim().is_empty() {
        return Err(malformed("missing type"));
    }

    let age = calculate_age(pet.birth_date, today);
    let age_in_years = u32::try_from(age).map_err(|_| malformed("birth date is in the future"))?;
    let visit_count = pet.visits.len();

    Ok(PetAnalysis {
        name: pet.name.clone(),
        pet_type: pet.pet_type.clone(),
        age_in_years,
        visit_count,
        health_status: HealthStatus::from_visit_count(visit_count),
    })
}

/// Fold analyses into a report. The result does not depend on input order.
pub fn summarize(analyses: &[PetAnalysis], today: NaiveDate) -> AnalyticsReport {
    let mut pets_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut pets_by_health_status: BTreeMap<HealthStatus, usize> = BTreeMap::new();
    let mut total_age: u64 = 0;
    let mut total_visits = 0;

    for analysis in analyses {
        *pets_by_type.entry(analysis.pet_type.clone()).or_default() += 1;
        *pets_by_health_status.entry(analysis.health_status).or_default() += 1;
        total_age += u64::from(analysis.age_in_years);
        total_visits += analysis.visit_count;
    }

    // integer sum first so the average is identical for any ordering
    let average_age = if analyses.is_empty() {
        0.0
    } else {
        total_age as f64 / analyses.len() as f64
    };

    AnalyticsReport {
        total_pets: analyses.len(),
        pets_by_type,
        pets_by_health_status,
        average_age,
        total_visits,
        analysis_date: today,
    }
}

/// Runs whole-clinic analyses on an [`AnalysisPool`].
///
/// `task_timeout` bounds each pet twice: once while waiting for queue space
/// and once while waiting for the worker's reply.
pub struct PetAnalyticsService {
    repository: Arc<dyn OwnerRepository>,
    pool: AnalysisPool,
    clock: Arc<dyn Clock>,
    task_timeout: Duration,
}

impl PetAnalyticsService {
    pub fn new(
        repository: Arc<dyn OwnerRepository>,
        pool: AnalysisPool,
        clock: Arc<dyn Clock>,
        task_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            pool,
            clock,
            task_timeout,
        }
    }

    /// Analyze every pet of every owner and reduce to a single report.
    pub async fn analyze_all(&self) -> Result<AnalyticsReport, AnalyticsError> {
        let start_time = Instant::now();
        let result = self.run_analysis().await;
        ANALYSIS_LATENCY.observe(start_time.elapsed().as_secs_f64());

        match &result {
            Ok(report) => info!(
                total_pets = report.total_pets,
                total_visits = report.total_visits,
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "pet analysis complete"
            ),
            Err(e) => {
                ANALYSIS_FAILURES.inc();
                error!(error = %e, "pet analysis failed");
            }
        }

        result
    }

    async fn run_analysis(&self) -> Result<AnalyticsReport, AnalyticsError> {
        let today = self.clock.now().date_naive();
        let owners = self.repository.find_all()?;

        let mut pending = Vec::new();
        for pet in owners.into_iter().flat_map(|o| o.pets) {
            let pet_id = pet.id;
            // a full queue that never drains counts against the same budget
            let response_rx = tokio::time::timeout(self.task_timeout, self.pool.submit(pet, today))
                .await
                .map_err(|_| AnalyticsError::Timeout { pet_id })??;
            pending.push(self.await_analysis(pet_id, response_rx));
        }

        // full barrier; first error aborts the run
        let analyses = try_join_all(pending).await?;

        Ok(summarize(&analyses, today))
    }

    async fn await_analysis(
        &self,
        pet_id: u32,
        response_rx: oneshot::Receiver<Result<PetAnalysis, AnalyticsError>>,
    ) -> Result<PetAnalysis, AnalyticsError> {
        match tokio::time::timeout(self.task_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AnalyticsError::WorkerDropped { pet_id }),
            Err(_) => Err(AnalyticsError::Timeout { pet_id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::SourceError;
    use crate::models::{Owner, Visit};
    use crate::repository::InMemoryOwnerRepository;
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn visits(n: usize) -> Vec<Visit> {
        (0..n)
            .map(|i| Visit {
                id: i as u32,
                date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                description: String::new(),
            })
            .collect()
    }

    fn create_test_pet(id: u32, name: &str, pet_type: &str, birth_year: Option<i32>, visit_count: usize) -> Pet {
        Pet {
            id,
            name: name.to_string(),
            pet_type: pet_type.to_string(),
            birth_date: birth_year.and_then(|y| NaiveDate::from_ymd_opt(y, 5, 15)),
            visits: visits(visit_count),
        }
    }

    fn create_test_owner(id: u32, pets: Vec<Pet>) -> Owner {
        Owner {
            id,
            first_name: "Test".to_string(),
            last_name: format!("Owner{}", id),
            address: String::new(),
            city: String::new(),
            telephone: String::new(),
            pets,
        }
    }

    fn service(repo: Arc<dyn OwnerRepository>, workers: usize) -> PetAnalyticsService {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap());
        PetAnalyticsService::new(repo, AnalysisPool::new(workers, 4), Arc::new(clock), Duration::from_secs(5))
    }

    fn service_with_pool(repo: Arc<dyn OwnerRepository>, pool: AnalysisPool, timeout: Duration) -> PetAnalyticsService {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap());
        PetAnalyticsService::new(repo, pool, Arc::new(clock), timeout)
    }

    struct UnavailableRepository;

    impl OwnerRepository for UnavailableRepository {
        fn find_all(&self) -> Result<Vec<Owner>, SourceError> {
            Err(SourceError::Unavailable("connection refused".to_string()))
        }

        fn find_by_id(&self, _id: u32) -> Result<Option<Owner>, SourceError> {
            Err(SourceError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_categorize_by_type() {
        assert_eq!(categorize_by_type("Dog"), "Canine");
        assert_eq!(categorize_by_type("CAT"), "Feline");
        assert_eq!(categorize_by_type("bird"), "Avian");
        assert_eq!(categorize_by_type("hamster"), "Small Mammal");
        assert_eq!(categorize_by_type("rabbit"), "Small Mammal");
        assert_eq!(categorize_by_type("Snake"), "Other");
    }

    #[test]
    fn test_calculate_age_ignores_month_and_day() {
        let birth = NaiveDate::from_ymd_opt(2020, 12, 31);
        let today = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert_eq!(calculate_age(birth, today), 1);
        assert_eq!(calculate_age(None, today), 0);
    }

    #[test]
    fn test_analyze_pet() {
        let pet = create_test_pet(1, "Buddy", "dog", Some(2020), 3);
        let analysis = analyze_pet(&pet, today()).unwrap();

        assert_eq!(analysis.name, "Buddy");
        assert_eq!(analysis.pet_type, "dog");
        assert_eq!(analysis.age_in_years, 4);
        assert_eq!(analysis.visit_count, 3);
        assert_eq!(analysis.health_status, HealthStatus::Moderate);
    }

    #[test]
    fn test_analyze_pet_rejects_malformed() {
        let nameless = create_test_pet(1, " ", "dog", None, 0);
        let typeless = create_test_pet(2, "Rex", "", None, 0);
        let unborn = create_test_pet(3, "Rex", "dog", Some(2030), 0);

        for pet in [nameless, typeless, unborn] {
            let err = analyze_pet(&pet, today()).unwrap_err();
            assert!(matches!(err, AnalyticsError::MalformedPet { pet_id, .. } if pet_id == pet.id));
        }
    }

    #[test]
    fn test_generate_pet_report_with_visits() {
        let mut pet = create_test_pet(1, "Samantha", "cat", Some(2012), 0);
        pet.visits = vec![
            Visit { id: 1, date: NaiveDate::from_ymd_opt(2013, 1, 4).unwrap(), description: "spayed".to_string() },
            Visit { id: 2, date: NaiveDate::from_ymd_opt(2013, 1, 1).unwrap(), description: "rabies shot".to_string() },
        ];

        let report = generate_pet_report(&pet);

        assert_eq!(
            report,
            "Pet Report for: Samantha\n\
             Type: cat\n\
             Birth Date: May 15, 2012\n\
             Category: Feline\n\
             Total Visits: 2\n\
             Last Visit: Jan 04, 2013\n"
        );
    }

    #[test]
    fn test_generate_pet_report_without_visits_or_birth_date() {
        let pet = create_test_pet(1, "Iggy", "lizard", None, 0);

        let report = generate_pet_report(&pet);

        assert_eq!(
            report,
            "Pet Report for: Iggy\nType: lizard\nBirth Date: Unknown\nCategory: Other\nNo visits recorded\n"
        );
    }

    #[test]
    fn test_summarize_empty() {
        let report = summarize(&[], today());

        assert_eq!(report.total_pets, 0);
        assert_eq!(report.average_age, 0.0);
        assert_eq!(report.total_visits, 0);
        assert!(report.pets_by_type.is_empty());
    }

    #[test]
    fn test_summarize_is_order_independent() {
        let analyses: Vec<PetAnalysis> = [
            create_test_pet(1, "a", "dog", Some(2015), 0),
            create_test_pet(2, "b", "cat", Some(2019), 2),
            create_test_pet(3, "c", "dog", Some(2023), 4),
            create_test_pet(4, "d", "bird", None, 7),
            create_test_pet(5, "e", "cat", Some(2010), 1),
        ]
        .iter()
        .map(|p| analyze_pet(p, today()).unwrap())
        .collect();

        let expected = summarize(&analyses, today());
        let expected_json = serde_json::to_string(&expected).unwrap();

        for shift in 0..analyses.len() {
            let mut permuted = analyses.clone();
            permuted.rotate_left(shift);
            assert_eq!(serde_json::to_string(&summarize(&permuted, today())).unwrap(), expected_json);

            permuted.reverse();
            let report = summarize(&permuted, today());
            assert_eq!(report, expected);
            assert_eq!(report.average_age.to_bits(), expected.average_age.to_bits());
        }
    }

    #[tokio::test]
    async fn test_analyze_all_conserves_counts() {
        let repo = InMemoryOwnerRepository::new();
        repo.insert(create_test_owner(1, vec![
            create_test_pet(1, "Buddy", "dog", Some(2020), 0),
            create_test_pet(2, "Whiskers", "cat", Some(2021), 1),
        ]));
        repo.insert(create_test_owner(2, vec![]));
        repo.insert(create_test_owner(3, vec![
            create_test_pet(3, "Tweety", "bird", None, 6),
            create_test_pet(4, "Rex", "dog", Some(2018), 3),
            create_test_pet(5, "Fluffy", "rabbit", Some(2022), 2),
        ]));

        let report = service(Arc::new(repo), 3).analyze_all().await.unwrap();

        assert_eq!(report.total_pets, 5);
        assert_eq!(report.pets_by_type.values().sum::<usize>(), 5);
        assert_eq!(report.pets_by_health_status.values().sum::<usize>(), 5);
        assert_eq!(report.pets_by_type.get("dog"), Some(&2));
        assert_eq!(report.pets_by_health_status.get(&HealthStatus::Good), Some(&2));
        assert_eq!(report.total_visits, 12);
        // (4 + 3 + 0 + 6 + 2) / 5
        assert_eq!(report.average_age, 3.0);
        assert_eq!(report.analysis_date, today());
    }

    #[tokio::test]
    async fn test_analyze_all_same_report_for_any_pool_size() {
        let repo: Arc<dyn OwnerRepository> = Arc::new(InMemoryOwnerRepository::with_sample_data());

        let sequential = service(Arc::clone(&repo), 1).analyze_all().await.unwrap();
        let parallel = service(Arc::clone(&repo), 8).analyze_all().await.unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(sequential.total_pets, 13);
        assert_eq!(sequential.total_visits, 4);
    }

    #[tokio::test]
    async fn test_analyze_all_fails_whole_batch_on_malformed_pet() {
        let repo = InMemoryOwnerRepository::new();
        repo.insert(create_test_owner(1, vec![
            create_test_pet(1, "Buddy", "dog", Some(2020), 0),
            create_test_pet(2, "", "cat", Some(2021), 1),
            create_test_pet(3, "Rex", "dog", Some(2018), 3),
        ]));

        let err = service(Arc::new(repo), 2).analyze_all().await.unwrap_err();

        assert!(matches!(err, AnalyticsError::MalformedPet { pet_id: 2, .. }));
    }

    #[tokio::test]
    async fn test_analyze_all_propagates_source_failure() {
        let err = service(Arc::new(UnavailableRepository), 2).analyze_all().await.unwrap_err();

        assert!(matches!(err, AnalyticsError::Source(_)));
    }

    #[tokio::test]
    async fn test_analyze_all_with_no_owners() {
        let report = service(Arc::new(InMemoryOwnerRepository::new()), 2)
            .analyze_all()
            .await
            .unwrap();

        assert_eq!(report.total_pets, 0);
        assert_eq!(report.average_age, 0.0);
    }

    #[tokio::test]
    async fn test_await_analysis_times_out_while_worker_holds_job() {
        let (pool, _job_rx) = AnalysisPool::detached(1);
        let service = service_with_pool(Arc::new(InMemoryOwnerRepository::new()), pool, Duration::from_millis(20));
        let (_response_tx, response_rx) = oneshot::channel();

        let result = service.await_analysis(9, response_rx).await;

        assert!(matches!(result, Err(AnalyticsError::Timeout { pet_id: 9 })));
    }

    #[tokio::test]
    async fn test_await_analysis_reports_dropped_worker() {
        let (pool, _job_rx) = AnalysisPool::detached(1);
        let service = service_with_pool(Arc::new(InMemoryOwnerRepository::new()), pool, Duration::from_secs(5));
        let (response_tx, response_rx) = oneshot::channel::<Result<PetAnalysis, AnalyticsError>>();
        drop(response_tx);

        let result = service.await_analysis(9, response_rx).await;

        assert!(matches!(result, Err(AnalyticsError::WorkerDropped { pet_id: 9 })));
    }

    #[tokio::test]
    async fn test_analyze_all_fails_when_pool_is_closed() {
        let repo = InMemoryOwnerRepository::new();
        repo.insert(create_test_owner(1, vec![create_test_pet(1, "Buddy", "dog", Some(2020), 0)]));
        let (pool, job_rx) = AnalysisPool::detached(1);
        drop(job_rx);

        let err = service_with_pool(Arc::new(repo), pool, Duration::from_secs(5))
            .analyze_all()
            .await
            .unwrap_err();

        assert!(matches!(err, AnalyticsError::PoolClosed));
    }

    #[tokio::test]
    async fn test_analyze_all_times_out_on_stalled_queue() {
        let repo = InMemoryOwnerRepository::new();
        repo.insert(create_test_owner(1, vec![
            create_test_pet(1, "Buddy", "dog", Some(2020), 0),
            create_test_pet(2, "Rex", "dog", Some(2018), 1),
        ]));
        // capacity 1 and nobody draining: the second submit never gets a slot
        let (pool, _job_rx) = AnalysisPool::detached(1);

        let err = service_with_pool(Arc::new(repo), pool, Duration::from_millis(20))
            .analyze_all()
            .await
            .unwrap_err();

        assert!(matches!(err, AnalyticsError::Timeout { pet_id: 2 }));
    }
}
