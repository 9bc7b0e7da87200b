// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::error::IngestError;
use crate::shootings::Borough;
use civstat_core::StatError;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::io::Read;

/// Resident population per borough.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoroughPopulation {
    counts: BTreeMap<Borough, u64>,
}

impl BoroughPopulation {
    /// 2020 decennial census counts.
    pub fn census_2020() -> Self {
        Self {
            counts: BTreeMap::from([
                (Borough::Bronx, 1_472_654),
                (Borough::Brooklyn, 2_736_074),
                (Borough::Manhattan, 1_694_251),
                (Borough::Queens, 2_405_464),
                (Borough::StatenIsland, 495_747),
            ]),
        }
    }

    /// Builds a table that must cover every borough with a positive count.
    pub fn new(counts: BTreeMap<Borough, u64>) -> Result<Self, StatError> {
        for borough in Borough::ALL {
            match counts.get(&borough) {
                Some(count) if *count > 0 => {}
                Some(_) => {
                    return Err(StatError::invalid_input(format!(
                        "population for {borough} must be positive"
                    )));
                }
                None => {
                    return Err(StatError::invalid_input(format!(
                        "population table is missing {borough}"
                    )));
                }
            }
        }
        Ok(Self { counts })
    }

    pub fn get(&self, borough: Borough) -> u64 {
        self.counts.get(&borough).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Borough, u64)> + '_ {
        self.counts.iter().map(|(b, c)| (*b, *c))
    }
}

impl Default for BoroughPopulation {
    fn default() -> Self {
        Self::census_2020()
    }
}

/// Country-level population from the JHU CSSE `UID_ISO_FIPS_LookUp_Table`.
///
/// Only the national row (empty `Province_State` and `Admin2`) is used.
pub fn read_country_population<R: Read>(reader: R, country: &str) -> Result<u64, IngestError> {
    let mut csv = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = csv.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| IngestError::parse(0, format!("missing required column {name}")))
    };
    let country_col = find("Country_Region")?;
    let province_col = find("Province_State")?;
    let population_col = find("Population")?;
    let admin_col = headers.iter().position(|h| h.trim() == "Admin2");

    for (idx, record) in csv.records().enumerate() {
        let record = record?;
        let get = |col: usize| record.get(col).map(str::trim).unwrap_or("");
        if get(country_col) != country
            || !get(province_col).is_empty()
            || admin_col.is_some_and(|col| !get(col).is_empty())
        {
            continue;
        }
        let raw = get(population_col);
        let population = raw.parse::<u64>().map_err(|err| {
            IngestError::parse(
                idx as u64 + 1,
                format!("invalid population '{raw}' for {country}: {err}"),
            )
        })?;
        if population == 0 {
            return Err(IngestError::parse(
                idx as u64 + 1,
                format!("population for {country} is zero"),
            ));
        }
        tracing::debug!(country, population, "resolved country population");
        return Ok(population);
    }

    Err(IngestError::parse(
        0,
        format!("no national population row for '{country}'"),
    ))
}
