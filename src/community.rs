//! Initial community compositions and their text listing
//!
//! Each map code gets a random subset of [`SPECIES_CATALOG`], and each chosen
//! species a handful of age cohorts. Ages are de-duplicated and sorted, so a
//! species never lists the same cohort twice.

use std::collections::BTreeSet;
use std::io::Write;
use std::ops::RangeInclusive;

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SPECIES_CATALOG: [&str; 19] = [
    "ABIE.BAL",
    "ACER.RUB",
    "ACER.SAH",
    "BETU.ALL",
    "BETU.PAP",
    "FAGU.GRA",
    "LARI.LAR",
    "LARI.HYB",
    "PICE.GLA",
    "PICE.MAR",
    "PICE.RUB",
    "PINU.BAN",
    "PINU.RES",
    "PINU.STR",
    "POPU.TRE",
    "POPU.HYB",
    "QUER.RUB",
    "THUJ.SPP.ALL",
    "TSUG.CAN",
];

pub const LISTING_HEADER: &str = "LandisData \"Initial Communities\"";

/// Map code reserved for cells without data; always listed with no species.
pub const NO_DATA_MAP_CODE: u32 = 0;

const FIELD_GAP: &str = "       ";

#[derive(Debug, Error)]
pub enum CommunityError {
    #[error("invalid composition rules: {0}")]
    InvalidRules(String),
    #[error("listing does not start with the LandisData header")]
    MissingHeader,
    #[error("line {line}: species entry before any MapCode")]
    OrphanSpecies { line: usize },
    #[error("line {line}: invalid map code `{token}`")]
    InvalidMapCode { line: usize, token: String },
    #[error("line {line}: invalid cohort age `{token}`")]
    InvalidAge { line: usize, token: String },
}

/// Inclusive range of cohort ages, sampled in multiples of `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortAgeRange {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl Default for CohortAgeRange {
    fn default() -> Self {
        Self {
            min: 10,
            max: 90,
            step: 10,
        }
    }
}

impl CohortAgeRange {
    pub fn validate(&self) -> Result<(), CommunityError> {
        if self.min == 0 || self.step == 0 {
            return Err(CommunityError::InvalidRules(
                "cohort ages need a positive minimum and step".into(),
            ));
        }
        if self.max < self.min || (self.max - self.min) % self.step != 0 {
            return Err(CommunityError::InvalidRules(format!(
                "cohort age range {}..={} is not a whole number of {}-year steps",
                self.min, self.max, self.step
            )));
        }
        Ok(())
    }

    pub fn choices(&self) -> u32 {
        (self.max - self.min) / self.step + 1
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && age <= self.max && (age - self.min) % self.step == 0
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        self.min + rng.gen_range(0..self.choices()) * self.step
    }
}

/// Inclusive count bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && count <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionRules {
    pub species_per_site: CountRange,
    pub cohorts_per_species: CountRange,
    pub cohort_ages: CohortAgeRange,
}

impl Default for CompositionRules {
    fn default() -> Self {
        Self {
            species_per_site: CountRange { min: 2, max: 6 },
            cohorts_per_species: CountRange { min: 1, max: 3 },
            cohort_ages: CohortAgeRange::default(),
        }
    }
}

impl CompositionRules {
    pub fn validate(&self) -> Result<(), CommunityError> {
        let species = self.species_per_site;
        if species.min == 0 || species.min > species.max || species.max > SPECIES_CATALOG.len() {
            return Err(CommunityError::InvalidRules(format!(
                "species per site must satisfy 1 <= min <= max <= {}, got {}..={}",
                SPECIES_CATALOG.len(),
                species.min,
                species.max
            )));
        }
        let cohorts = self.cohorts_per_species;
        if cohorts.min == 0 || cohorts.min > cohorts.max {
            return Err(CommunityError::InvalidRules(format!(
                "cohorts per species must satisfy 1 <= min <= max, got {}..={}",
                cohorts.min, cohorts.max
            )));
        }
        self.cohort_ages.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesCohorts {
    pub species: String,
    pub ages: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityRecord {
    pub map_code: u32,
    pub species: Vec<SpeciesCohorts>,
}

pub fn generate_communities<R: Rng + ?Sized>(
    rng: &mut R,
    map_codes: RangeInclusive<u32>,
    rules: &CompositionRules,
) -> Vec<CommunityRecord> {
    map_codes
        .map(|map_code| generate_record(rng, map_code, rules))
        .collect()
}

fn generate_record<R: Rng + ?Sized>(
    rng: &mut R,
    map_code: u32,
    rules: &CompositionRules,
) -> CommunityRecord {
    let species_count =
        rng.gen_range(rules.species_per_site.min..=rules.species_per_site.max);
    let picks = index::sample(rng, SPECIES_CATALOG.len(), species_count);

    let mut species = Vec::with_capacity(species_count);
    for pick in picks.iter() {
        let cohort_count =
            rng.gen_range(rules.cohorts_per_species.min..=rules.cohorts_per_species.max);
        // Draws may collide; the set keeps them unique and ascending.
        let ages: BTreeSet<u32> = (0..cohort_count)
            .map(|_| rules.cohort_ages.sample(rng))
            .collect();
        species.push(SpeciesCohorts {
            species: SPECIES_CATALOG[pick].to_string(),
            ages: ages.into_iter().collect(),
        });
    }

    CommunityRecord { map_code, species }
}

pub fn write_listing<W: Write>(writer: &mut W, records: &[CommunityRecord]) -> std::io::Result<()> {
    writeln!(writer, "{LISTING_HEADER}")?;
    writeln!(writer)?;
    writeln!(writer, "MapCode {NO_DATA_MAP_CODE}")?;
    writeln!(writer)?;

    for record in records {
        writeln!(writer, "MapCode {}", record.map_code)?;
        for entry in &record.species {
            let ages = entry
                .ages
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(FIELD_GAP);
            writeln!(writer, "{}{FIELD_GAP}{}", entry.species, ages)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Parses a listing back into records, including the empty no-data block.
pub fn parse_listing(text: &str) -> Result<Vec<CommunityRecord>, CommunityError> {
    let mut lines = text.lines().enumerate();
    match lines.find(|(_, line)| !line.trim().is_empty()) {
        Some((_, line)) if line.trim() == LISTING_HEADER => {}
        _ => return Err(CommunityError::MissingHeader),
    }

    let mut records: Vec<CommunityRecord> = Vec::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        let mut tokens = line.split_whitespace();
        let first = match tokens.next() {
            Some(token) => token,
            None => continue,
        };

        if first == "MapCode" {
            let token = tokens.next().unwrap_or_default();
            let map_code = token.parse().map_err(|_| CommunityError::InvalidMapCode {
                line: line_no,
                token: token.to_string(),
            })?;
            records.push(CommunityRecord {
                map_code,
                species: Vec::new(),
            });
            continue;
        }

        let record = records
            .last_mut()
            .ok_or(CommunityError::OrphanSpecies { line: line_no })?;
        let ages = tokens
            .map(|token| {
                token.parse().map_err(|_| CommunityError::InvalidAge {
                    line: line_no,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<u32>, _>>()?;
        record.species.push(SpeciesCohorts {
            species: first.to_string(),
            ages,
        });
    }
    Ok(records)
}
