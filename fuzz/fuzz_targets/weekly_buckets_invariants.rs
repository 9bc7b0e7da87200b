// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use chrono::{Days, NaiveDate, Weekday};
use civstat_core::Diagnostics;
use civstat_ingest::DailyCumulative;
use civstat_pipeline::covid::{
    apply_missing_week_corrections, daily_new, split_by_year, weekly_totals,
};
use libfuzzer_sys::fuzz_target;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);
    let Some(start) = NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|epoch| epoch.checked_add_days(Days::new(u64::from(cursor.next_u16() % 1500))))
    else {
        return;
    };
    let week_end = WEEKDAYS[common::bounded(cursor.next_u8(), 0, 6)];
    let days = common::bounded(cursor.next_u8(), 2, 255);

    let mut deaths = 0.0;
    let mut cases = 0.0;
    let mut cumulative = Vec::with_capacity(days);
    for offset in 0..days {
        // Mostly increasing with occasional retroactive corrections.
        let step = f64::from(cursor.next_u8()) - 16.0;
        deaths += step;
        cases += step * 10.0;
        let Some(date) = start.checked_add_days(Days::new(offset as u64)) else {
            return;
        };
        cumulative.push(DailyCumulative { date, cases, deaths });
    }

    let (daily, negative) = daily_new(&cumulative);
    assert_eq!(daily.len(), cumulative.len() - 1);
    assert!(negative <= daily.len());

    let Ok(mut weeks) = weekly_totals(&daily, week_end, 1_000_000) else {
        return;
    };
    let daily_total: f64 = daily.iter().map(|d| d.deaths).sum();
    let weekly_total: f64 = weeks.iter().map(|w| w.deaths).sum();
    assert!(weeks.len() * 7 <= daily.len());
    assert!(weeks.iter().all(|w| w.days == 7));
    if weeks.len() * 7 == daily.len() {
        assert_eq!(daily_total, weekly_total);
    }

    if weeks.len() >= 2 {
        let idx = common::bounded(cursor.next_u8(), 0, weeks.len() - 2);
        let missing = weeks[idx].week_ending;
        let pair_total = weeks[idx + 1].deaths;
        let mut diagnostics = Diagnostics::for_pipeline("fuzz");
        apply_missing_week_corrections(&mut weeks, &[missing], &mut diagnostics)
            .expect("present week with a follower must correct");
        assert_eq!(weeks[idx].deaths + weeks[idx + 1].deaths, pair_total);
        assert_eq!(diagnostics.corrections.len(), 1);
    }

    if let Ok((train, test)) = split_by_year(&weeks, None) {
        assert!(!train.is_empty() && !test.is_empty());
        assert_eq!(train.len() + test.len(), weeks.len());
    }
});
