//! Owner storage.
//!
//! The analytics service and the HTTP handlers only see [`OwnerRepository`];
//! the in-memory implementation keeps owners in a `DashMap` keyed by id.

use crate::error::SourceError;
use crate::models::{Owner, Pet, Visit};
use chrono::NaiveDate;
use dashmap::DashMap;

pub trait OwnerRepository: Send + Sync {
    /// Snapshot of every owner (with nested pets and visits), ordered by id.
    fn find_all(&self) -> Result<Vec<Owner>, SourceError>;

    fn find_by_id(&self, id: u32) -> Result<Option<Owner>, SourceError>;

    /// Owners whose last name starts with `prefix`, ignoring case. An empty
    /// prefix matches everyone.
    fn find_by_last_name(&self, prefix: &str) -> Result<Vec<Owner>, SourceError> {
        let prefix = prefix.to_lowercase();
        Ok(self
            .find_all()?
            .into_iter()
            .filter(|o| o.last_name.to_lowercase().starts_with(&prefix))
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOwnerRepository {
    owners: DashMap<u32, Owner>,
}

impl InMemoryOwnerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, owner: Owner) {
        self.owners.insert(owner.id, owner);
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    // Seed with the clinic's demo owners
    pub fn with_sample_data() -> Self {
        let repo = Self::new();
        match sample_owners() {
            Some(owners) => owners.into_iter().for_each(|o| repo.insert(o)),
            None => tracing::warn!("sample owner data has an invalid date, starting empty"),
        }
        repo
    }
}

impl OwnerRepository for InMemoryOwnerRepository {
    fn find_all(&self) -> Result<Vec<Owner>, SourceError> {
        let mut owners: Vec<Owner> = self.owners.iter().map(|e| e.value().clone()).collect();
        owners.sort_by_key(|o| o.id);
        Ok(owners)
    }

    fn find_by_id(&self, id: u32) -> Result<Option<Owner>, SourceError> {
        Ok(self.owners.get(&id).map(|e| e.value().clone()))
    }
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn pet(id: u32, name: &str, pet_type: &str, birth_date: NaiveDate, visits: Vec<Visit>) -> Pet {
    Pet {
        id,
        name: name.to_string(),
        pet_type: pet_type.to_string(),
        birth_date: Some(birth_date),
        visits,
    }
}

fn visit(id: u32, date: NaiveDate, description: &str) -> Visit {
    Visit {
        id,
        date,
        description: description.to_string(),
    }
}

fn owner(id: u32, first: &str, last: &str, address: &str, city: &str, telephone: &str, pets: Vec<Pet>) -> Owner {
    Owner {
        id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        address: address.to_string(),
        city: city.to_string(),
        telephone: telephone.to_string(),
        pets,
    }
}

// None only if one of the literal dates below is invalid
fn sample_owners() -> Option<Vec<Owner>> {
    let samantha_visits = vec![
        visit(1, date(2013, 1, 1)?, "rabies shot"),
        visit(4, date(2013, 1, 4)?, "spayed"),
    ];
    let max_visits = vec![
        visit(2, date(2013, 1, 2)?, "rabies shot"),
        visit(3, date(2013, 1, 3)?, "neutered"),
    ];

    Some(vec![
        owner(1, "George", "Franklin", "110 W. Liberty St.", "Madison", "6085551023",
            vec![pet(1, "Leo", "cat", date(2010, 9, 7)?, vec![])]),
        owner(2, "Betty", "Davis", "638 Cardinal Ave.", "Sun Prairie", "6085551749",
            vec![pet(2, "Basil", "hamster", date(2012, 8, 6)?, vec![])]),
        owner(3, "Eduardo", "Rodriquez", "2693 Commerce St.", "McFarland", "6085558763",
            vec![
                pet(3, "Rosy", "dog", date(2011, 4, 17)?, vec![]),
                pet(4, "Jewel", "dog", date(2010, 3, 7)?, vec![]),
            ]),
        owner(4, "Harold", "Davis", "563 Friendly St.", "Windsor", "6085553198",
            vec![pet(5, "Iggy", "lizard", date(2010, 11, 30)?, vec![])]),
        owner(5, "Peter", "McTavish", "2387 S. Fair Way", "Madison", "6085552765",
            vec![pet(6, "George", "snake", date(2010, 1, 20)?, vec![])]),
        owner(6, "Jean", "Coleman", "105 N. Lake St.", "Monona", "6085552654",
            vec![
                pet(7, "Samantha", "cat", date(2012, 9, 4)?, samantha_visits),
                pet(8, "Max", "cat", date(2012, 9, 4)?, max_visits),
            ]),
        owner(7, "Jeff", "Black", "1450 Oak Blvd.", "Monona", "6085555387",
            vec![pet(9, "Lucky", "bird", date(2011, 8, 6)?, vec![])]),
        owner(8, "Maria", "Escobito", "345 Maple St.", "Madison", "6085557683",
            vec![pet(10, "Mulligan", "dog", date(2007, 2, 24)?, vec![])]),
        owner(9, "David", "Schroeder", "2749 Blackhawk Trail", "Madison", "6085559435",
            vec![pet(11, "Freddy", "bird", date(2010, 3, 9)?, vec![])]),
        owner(10, "Carlos", "Estaban", "2335 Independence La.", "Waunakee", "6085555487",
            vec![
                pet(12, "Lucky", "dog", date(2010, 6, 24)?, vec![]),
                pet(13, "Sly", "cat", date(2012, 6, 8)?, vec![]),
            ]),
    ])
}
