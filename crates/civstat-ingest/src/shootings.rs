// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Reader for the NYPD shooting-incident export.
//!
//! Rows are victims, not incidents: one `INCIDENT_KEY` may span several rows.
//! Only the columns the reports use are read; others are ignored.

use crate::error::IngestError;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::fmt;
use std::io::Read;

const COL_KEY: &str = "INCIDENT_KEY";
const COL_DATE: &str = "OCCUR_DATE";
const COL_BORO: &str = "BORO";
const COL_MURDER: &str = "STATISTICAL_MURDER_FLAG";
const COL_AGE: &str = "VIC_AGE_GROUP";
const COL_SEX: &str = "VIC_SEX";
const COL_RACE: &str = "VIC_RACE";
const DATE_FORMAT: &str = "%m/%d/%Y";

/// New York City borough, in alphabetical (level) order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Borough {
    Bronx,
    Brooklyn,
    Manhattan,
    Queens,
    StatenIsland,
}

impl Borough {
    pub const ALL: [Self; 5] = [
        Self::Bronx,
        Self::Brooklyn,
        Self::Manhattan,
        Self::Queens,
        Self::StatenIsland,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Bronx => "Bronx",
            Self::Brooklyn => "Brooklyn",
            Self::Manhattan => "Manhattan",
            Self::Queens => "Queens",
            Self::StatenIsland => "Staten Island",
        }
    }

    /// Parses the upper-case `BORO` values of the export, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BRONX" => Some(Self::Bronx),
            "BROOKLYN" => Some(Self::Brooklyn),
            "MANHATTAN" => Some(Self::Manhattan),
            "QUEENS" => Some(Self::Queens),
            "STATEN ISLAND" => Some(Self::StatenIsland),
            _ => None,
        }
    }
}

impl fmt::Display for Borough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VictimDemographics {
    pub age_group: String,
    pub sex: String,
    pub race: String,
}

/// One victim row of the export.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncidentRow {
    pub incident_key: String,
    pub occur_date: NaiveDate,
    pub borough: Borough,
    pub murder_flag: bool,
    pub victim: VictimDemographics,
}

struct Columns {
    key: usize,
    date: usize,
    boro: usize,
    murder: usize,
    age: usize,
    sex: usize,
    race: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, IngestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| IngestError::parse(0, format!("missing required column {name}")))
        };
        Ok(Self {
            key: find(COL_KEY)?,
            date: find(COL_DATE)?,
            boro: find(COL_BORO)?,
            murder: find(COL_MURDER)?,
            age: find(COL_AGE)?,
            sex: find(COL_SEX)?,
            race: find(COL_RACE)?,
        })
    }
}

/// Reads every victim row. Any malformed row aborts the read.
pub fn read_incidents<R: Read>(reader: R) -> Result<Vec<IncidentRow>, IngestError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);
    let columns = Columns::locate(csv.headers()?)?;

    let mut rows = vec![];
    for (idx, record) in csv.records().enumerate() {
        let record = record?;
        let line = idx as u64 + 1;
        let field = |col: usize| record.get(col).map(str::trim).unwrap_or("");

        let incident_key = field(columns.key);
        if incident_key.is_empty() {
            return Err(IngestError::parse(line, "empty INCIDENT_KEY"));
        }
        let raw_date = field(columns.date);
        let occur_date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|err| {
            IngestError::parse(line, format!("invalid OCCUR_DATE '{raw_date}': {err}"))
        })?;
        let raw_boro = field(columns.boro);
        let borough = Borough::parse(raw_boro)
            .ok_or_else(|| IngestError::parse(line, format!("unknown BORO '{raw_boro}'")))?;
        let raw_flag = field(columns.murder);
        let murder_flag = parse_flag(raw_flag).ok_or_else(|| {
            IngestError::parse(
                line,
                format!("invalid STATISTICAL_MURDER_FLAG '{raw_flag}'"),
            )
        })?;

        rows.push(IncidentRow {
            incident_key: incident_key.to_string(),
            occur_date,
            borough,
            murder_flag,
            victim: VictimDemographics {
                age_group: field(columns.age).to_string(),
                sex: field(columns.sex).to_string(),
                race: field(columns.race).to_string(),
            },
        });
    }

    tracing::info!(rows = rows.len(), "read shooting incident rows");
    Ok(rows)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "y" | "1" => Some(true),
        "false" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Borough, read_incidents};
    use chrono::NaiveDate;

    const SAMPLE: &str = "\
INCIDENT_KEY,OCCUR_DATE,OCCUR_TIME,BORO,STATISTICAL_MURDER_FLAG,VIC_AGE_GROUP,VIC_SEX,VIC_RACE
236168668,11/11/2021,15:04:00,BROOKLYN,false,18-24,M,BLACK
231008085,07/16/2021,22:05:00,BROOKLYN,true,25-44,M,BLACK
231008085,07/16/2021,22:05:00,BROOKLYN,false,1022,F,WHITE
230717903,07/11/2021,01:09:00,STATEN ISLAND,false,<18,M,WHITE HISPANIC
";

    #[test]
    fn reads_victim_rows_and_ignores_extra_columns() {
        let rows = read_incidents(SAMPLE.as_bytes()).expect("sample should parse");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].incident_key, "236168668");
        assert_eq!(
            rows[0].occur_date,
            NaiveDate::from_ymd_opt(2021, 11, 11).expect("valid")
        );
        assert_eq!(rows[1].borough, Borough::Brooklyn);
        assert!(rows[1].murder_flag);
        assert_eq!(rows[2].victim.age_group, "1022");
        assert_eq!(rows[3].borough, Borough::StatenIsland);
        assert_eq!(rows[3].victim.race, "WHITE HISPANIC");
    }

    #[test]
    fn missing_column_is_a_parse_error() {
        let err = read_incidents("INCIDENT_KEY,OCCUR_DATE\n1,01/01/2020\n".as_bytes())
            .expect_err("missing BORO should fail");
        assert_eq!(err.code(), "parse_error");
        assert!(err.to_string().contains("BORO"));
    }

    #[test]
    fn malformed_values_report_their_record() {
        let bad_date = SAMPLE.replace("11/11/2021", "2021-11-11");
        let err = read_incidents(bad_date.as_bytes()).expect_err("bad date should fail");
        assert!(err.to_string().contains("record 1"), "{err}");

        let bad_boro = SAMPLE.replace("STATEN ISLAND", "JERSEY");
        let err = read_incidents(bad_boro.as_bytes()).expect_err("bad borough should fail");
        assert!(err.to_string().contains("record 4"), "{err}");
    }

    #[test]
    fn borough_order_is_alphabetical() {
        let mut shuffled = vec![Borough::Queens, Borough::Bronx, Borough::StatenIsland];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![Borough::Bronx, Borough::Queens, Borough::StatenIsland]
        );
        assert_eq!(Borough::parse("manhattan"), Some(Borough::Manhattan));
        assert_eq!(Borough::StatenIsland.to_string(), "Staten Island");
    }
}
