// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use civstat_ingest::{read_country_population, read_incidents, read_jhu_global};
use libfuzzer_sys::fuzz_target;

const COUNTRIES: [&str; 3] = ["Ireland", "United Kingdom", ""];

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);
    let country = COUNTRIES[common::bounded(cursor.next_u8(), 0, COUNTRIES.len() - 1)];
    let payload = cursor.remaining();

    let _ = read_incidents(payload);

    if let Ok(series) = read_jhu_global(payload, country) {
        assert_eq!(series.dates.len(), series.values.len());
        assert!(series.values.iter().all(|v| v.is_finite()));
        assert!(series.dates.windows(2).all(|pair| pair[0] < pair[1]));
    }

    let _ = read_country_population(payload, country);
});
