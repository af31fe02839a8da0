//! The fixed set of upstream sources and the per-source processing
//! that turns a fresh payload into publishable output tables.
//!
//! There is no schema inference and no plugin system: five sources,
//! each with a known schema kind, wired up at integration time.

use crate::extract::{self, ExtractError, VaccinationColumns};
use crate::series::{derive_deltas, repair, to_counts};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;

/// Schema kind of an upstream source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    NationalCases,
    StateCases,
    NationalVaccinations,
    StateVaccinations,
    ManufacturerDoses,
}

/// One configured upstream resource
#[derive(Debug, Clone)]
pub struct Source {
    pub name: &'static str,
    pub url: String,
    pub kind: SourceKind,
}

/// The known sources, in fetch order.
///
/// Each URL can be overridden via `COVIDFLOW_URL_<NAME>` (mirrors,
/// fixtures in tests).
pub fn registry() -> Vec<Source> {
    let defaults = [
        (
            "NATIONAL_CASES",
            "https://raw.githubusercontent.com/nytimes/covid-19-data/master/us.csv",
            SourceKind::NationalCases,
        ),
        (
            "STATE_CASES",
            "https://raw.githubusercontent.com/nytimes/covid-19-data/master/us-states.csv",
            SourceKind::StateCases,
        ),
        (
            "NATIONAL_VACCINATIONS",
            "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/vaccinations/vaccinations.csv",
            SourceKind::NationalVaccinations,
        ),
        (
            "STATE_VACCINATIONS",
            "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/vaccinations/us_state_vaccinations.csv",
            SourceKind::StateVaccinations,
        ),
        (
            "MANUFACTURER_DOSES",
            "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/vaccinations/vaccinations-by-manufacturer.csv",
            SourceKind::ManufacturerDoses,
        ),
    ];

    defaults
        .into_iter()
        .map(|(name, url, kind)| Source {
            name,
            url: env::var(format!("COVIDFLOW_URL_{}", name)).unwrap_or_else(|_| url.to_string()),
            kind,
        })
        .collect()
}

/// A publishable table of date-aligned count columns. The first output
/// column is always the date; `columns` align with `value_headers`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    /// Destination path relative to the output directory
    pub rel_path: String,
    pub value_headers: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<Vec<i64>>,
}

/// National headline numbers for the README summary and the
/// machine-readable summary snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalSummary {
    pub date: NaiveDate,
    pub total_cases: i64,
    pub total_deaths: i64,
    pub new_cases: i64,
    pub new_deaths: i64,
    pub cases_7day_avg: i64,
    pub deaths_7day_avg: i64,
}

/// Everything derived from one new payload
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSource {
    pub tables: Vec<OutputTable>,
    pub summary: Option<NationalSummary>,
}

/// Mean of the final (up to) seven samples, truncated to a count
fn seven_day_average(series: &[i64]) -> i64 {
    let tail = &series[series.len().saturating_sub(7)..];
    if tail.is_empty() {
        return 0;
    }
    let sum: i64 = tail.iter().sum();
    sum / tail.len() as i64
}

fn case_table(
    rel_path: String,
    dates: Vec<NaiveDate>,
    total_cases: Vec<i64>,
    total_deaths: Vec<i64>,
) -> OutputTable {
    let new_cases = derive_deltas(&total_cases);
    let new_deaths = derive_deltas(&total_deaths);

    OutputTable {
        rel_path,
        value_headers: vec![
            "total cases".to_string(),
            "total deaths".to_string(),
            "new cases".to_string(),
            "new deaths".to_string(),
        ],
        dates,
        columns: vec![total_cases, total_deaths, new_cases, new_deaths],
    }
}

fn vaccination_table(rel_path: String, columns: VaccinationColumns) -> OutputTable {
    let first_dose = to_counts(&repair(&columns.first_dose));
    let second_dose = to_counts(&repair(&columns.second_dose));
    let total_doses: Vec<i64> = first_dose
        .iter()
        .zip(&second_dose)
        .map(|(f, s)| f + s)
        .collect();

    OutputTable {
        rel_path,
        value_headers: vec![
            "total doses".to_string(),
            "first dose".to_string(),
            "second dose".to_string(),
        ],
        dates: columns.dates,
        columns: vec![total_doses, first_dose, second_dose],
    }
}

/// Zero-fill an invalid leading sample so the repair always has a
/// bridge value for state-level series (the upstream data frequently
/// starts a state's history with a blank cell).
fn zero_fill_leading(series: &mut [f64]) {
    if let Some(first) = series.first_mut() {
        if first.is_nan() {
            *first = 0.0;
        }
    }
}

/// Rows of the national second-dose series that are force-zeroed
/// before repair. Data workaround: the upstream national series has a
/// long invalid leading run before second doses began reporting, which
/// really does mean zero people were fully vaccinated. Scoped to this
/// one series; the sibling first-dose series has no such run.
const NATIONAL_SECOND_DOSE_ZERO_WINDOW: usize = 25;

fn filename_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Transform one new payload into its output tables (and, for the
/// national case source, the README summary).
pub fn process(kind: SourceKind, payload: &[u8]) -> Result<ProcessedSource, ExtractError> {
    match kind {
        SourceKind::NationalCases => {
            let columns = extract::parse_cases(payload)?;
            let table = case_table(
                "us.csv".to_string(),
                columns.dates,
                columns.cases,
                columns.deaths,
            );

            let summary = table.dates.last().map(|&date| NationalSummary {
                date,
                total_cases: *table.columns[0].last().unwrap_or(&0),
                total_deaths: *table.columns[1].last().unwrap_or(&0),
                new_cases: *table.columns[2].last().unwrap_or(&0),
                new_deaths: *table.columns[3].last().unwrap_or(&0),
                cases_7day_avg: seven_day_average(&table.columns[2]),
                deaths_7day_avg: seven_day_average(&table.columns[3]),
            });

            Ok(ProcessedSource {
                tables: vec![table],
                summary,
            })
        }

        SourceKind::StateCases => {
            let tables = extract::parse_cases_by_state(payload)?
                .into_iter()
                .map(|(state, columns)| {
                    case_table(
                        format!("states/{}.csv", filename_safe(&state)),
                        columns.dates,
                        columns.cases,
                        columns.deaths,
                    )
                })
                .collect();

            Ok(ProcessedSource {
                tables,
                summary: None,
            })
        }

        SourceKind::NationalVaccinations => {
            let mut columns = extract::parse_vaccinations(payload, "United States")?;

            let window = NATIONAL_SECOND_DOSE_ZERO_WINDOW.min(columns.second_dose.len());
            for sample in &mut columns.second_dose[..window] {
                *sample = 0.0;
            }
            zero_fill_leading(&mut columns.first_dose);

            Ok(ProcessedSource {
                tables: vec![vaccination_table("vaccinations/us.csv".to_string(), columns)],
                summary: None,
            })
        }

        SourceKind::StateVaccinations => {
            let tables = extract::parse_vaccinations_by_location(payload)?
                .into_iter()
                .map(|(location, mut columns)| {
                    zero_fill_leading(&mut columns.first_dose);
                    zero_fill_leading(&mut columns.second_dose);
                    vaccination_table(
                        format!("vaccinations/states/{}.csv", filename_safe(&location)),
                        columns,
                    )
                })
                .collect();

            Ok(ProcessedSource {
                tables,
                summary: None,
            })
        }

        SourceKind::ManufacturerDoses => {
            let manufacturers = [
                ("Pfizer/BioNTech", "vaccinations/manufacturers/pfizer_biontech.csv"),
                ("Moderna", "vaccinations/manufacturers/moderna.csv"),
                ("Johnson&Johnson", "vaccinations/manufacturers/johnson_johnson.csv"),
            ];

            let mut tables = Vec::new();
            for (vaccine, rel_path) in manufacturers {
                let columns = extract::parse_manufacturer(payload, "United States", vaccine)?;
                if columns.dates.is_empty() {
                    log::warn!("No '{}' rows in manufacturer source", vaccine);
                    continue;
                }
                let new_doses = derive_deltas(&columns.total_doses);
                tables.push(OutputTable {
                    rel_path: rel_path.to_string(),
                    value_headers: vec!["total doses".to_string(), "new doses".to_string()],
                    dates: columns.dates,
                    columns: vec![columns.total_doses, new_doses],
                });
            }

            Ok(ProcessedSource {
                tables,
                summary: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_five_sources() {
        let sources = registry();
        assert_eq!(sources.len(), 5);
        assert_eq!(sources[0].kind, SourceKind::NationalCases);
        assert!(sources.iter().all(|s| s.url.starts_with("https://")));
    }

    #[test]
    fn test_national_cases_summary() {
        let payload = b"date,cases,deaths\n\
            2021-01-01,100,10\n\
            2021-01-02,160,12\n\
            2021-01-03,230,15\n";

        let processed = process(SourceKind::NationalCases, payload).unwrap();
        assert_eq!(processed.tables.len(), 1);

        let summary = processed.summary.unwrap();
        assert_eq!(summary.total_cases, 230);
        assert_eq!(summary.total_deaths, 15);
        assert_eq!(summary.new_cases, 70);
        assert_eq!(summary.new_deaths, 3);
        // New cases 100, 60, 70 -> mean 76 (truncated)
        assert_eq!(summary.cases_7day_avg, 76);
    }

    #[test]
    fn test_national_cases_table_columns() {
        let payload = b"date,cases,deaths\n2021-01-01,100,10\n2021-01-02,90,12\n";

        let processed = process(SourceKind::NationalCases, payload).unwrap();
        let table = &processed.tables[0];

        assert_eq!(table.rel_path, "us.csv");
        // Downward case revision clamps the delta to 0
        assert_eq!(table.columns[2], vec![100, 0]);
        assert_eq!(table.columns[3], vec![10, 2]);
    }

    #[test]
    fn test_state_cases_one_table_per_state() {
        let payload = b"date,state,fips,cases,deaths\n\
            2021-01-01,Ohio,39,5,0\n\
            2021-01-01,Iowa,19,3,0\n\
            2021-01-02,Ohio,39,9,1\n";

        let processed = process(SourceKind::StateCases, payload).unwrap();
        let paths: Vec<&str> = processed.tables.iter().map(|t| t.rel_path.as_str()).collect();

        assert_eq!(paths, vec!["states/Iowa.csv", "states/Ohio.csv"]);
    }

    #[test]
    fn test_national_vaccinations_repaired_and_totaled() {
        // Gap in first_dose repaired by midpoint; totals are the sum of
        // the repaired dose columns
        let payload = b"location,date,people_vaccinated,people_fully_vaccinated\n\
            United States,2021-01-01,10,0\n\
            United States,2021-01-02,,0\n\
            United States,2021-01-03,20,0\n";

        let processed = process(SourceKind::NationalVaccinations, payload).unwrap();
        let table = &processed.tables[0];

        assert_eq!(table.rel_path, "vaccinations/us.csv");
        assert_eq!(table.columns[1], vec![10, 15, 20]); // first dose
        assert_eq!(table.columns[2], vec![0, 0, 0]); // second dose (zero window)
        assert_eq!(table.columns[0], vec![10, 15, 20]); // totals
    }

    #[test]
    fn test_national_second_dose_zero_window_spans_25_samples() {
        // 30 rows: the first 25 second-dose samples are force-zeroed
        // regardless of what upstream reported, row 26 is blank and
        // must bridge from the zeroed window, the rest pass through
        let mut payload =
            b"location,date,people_vaccinated,people_fully_vaccinated\n".to_vec();
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        for i in 0..30i64 {
            let date = start + chrono::Duration::days(i);
            let second = match i {
                25 => String::new(),
                26 => "40".to_string(),
                _ => (4 * i + 4).to_string(),
            };
            payload.extend_from_slice(
                format!("United States,{},{},{}\n", date.format("%Y-%m-%d"), 100 + i * 10, second)
                    .as_bytes(),
            );
        }

        let processed = process(SourceKind::NationalVaccinations, &payload).unwrap();
        let table = &processed.tables[0];
        let second_dose = &table.columns[2];

        assert_eq!(second_dose.len(), 30);
        assert!(second_dose[..25].iter().all(|&v| v == 0));
        // Blank row 26 bridges from the zeroed sample 25 to the 40:
        // midpoint 20
        assert_eq!(second_dose[25], 20);
        assert_eq!(second_dose[26], 40);
        assert_eq!(&second_dose[27..], &[112, 116, 120]);

        // Total doses stay the sum of the repaired columns
        assert_eq!(table.columns[0][25], (100 + 25 * 10) + 20);
    }

    #[test]
    fn test_state_vaccinations_leading_blank_zero_filled() {
        let payload = b"location,date,people_vaccinated,people_fully_vaccinated\n\
            Vermont,2021-01-01,,\n\
            Vermont,2021-01-02,10,4\n";

        let processed = process(SourceKind::StateVaccinations, payload).unwrap();
        let table = &processed.tables[0];

        assert_eq!(table.rel_path, "vaccinations/states/Vermont.csv");
        assert_eq!(table.columns[1], vec![0, 10]);
        assert_eq!(table.columns[2], vec![0, 4]);
        assert_eq!(table.columns[0], vec![0, 14]);
    }

    #[test]
    fn test_manufacturer_tables_split_per_vaccine() {
        let payload = b"location,date,vaccine,total_vaccinations\n\
            United States,2021-01-01,Moderna,100\n\
            United States,2021-01-02,Moderna,180\n\
            United States,2021-01-01,Pfizer/BioNTech,300\n";

        let processed = process(SourceKind::ManufacturerDoses, payload).unwrap();

        assert_eq!(processed.tables.len(), 2);
        let moderna = processed
            .tables
            .iter()
            .find(|t| t.rel_path.ends_with("moderna.csv"))
            .unwrap();
        assert_eq!(moderna.columns[0], vec![100, 180]);
        assert_eq!(moderna.columns[1], vec![100, 80]);
    }

    #[test]
    fn test_filename_safe_replaces_punctuation() {
        assert_eq!(filename_safe("New York"), "New_York");
        assert_eq!(filename_safe("Johnson&Johnson"), "Johnson_Johnson");
    }
}
