//! CSV payload parsing and column extraction
//!
//! Each upstream source has a known, fixed schema; this module turns a
//! raw payload into typed date/value columns for the series
//! transforms. There is deliberately no schema inference: an
//! unexpected header is an error, not a guess.

use chrono::NaiveDate;
use csv::StringRecord;

/// Date-aligned case/death totals (cumulative)
#[derive(Debug, Clone, PartialEq)]
pub struct CaseColumns {
    pub dates: Vec<NaiveDate>,
    pub cases: Vec<i64>,
    pub deaths: Vec<i64>,
}

/// Date-aligned vaccination totals (cumulative, possibly gappy).
/// Missing samples are NaN; the repair stage fills them.
#[derive(Debug, Clone, PartialEq)]
pub struct VaccinationColumns {
    pub dates: Vec<NaiveDate>,
    pub first_dose: Vec<f64>,
    pub second_dose: Vec<f64>,
}

/// Date-aligned total doses for a single manufacturer (cumulative)
#[derive(Debug, Clone, PartialEq)]
pub struct ManufacturerColumns {
    pub dates: Vec<NaiveDate>,
    pub total_doses: Vec<i64>,
}

#[derive(Debug)]
pub enum ExtractError {
    Csv(csv::Error),
    MissingColumn(String),
    BadValue { column: String, value: String },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Csv(e) => write!(f, "CSV parse error: {}", e),
            ExtractError::MissingColumn(col) => write!(f, "missing expected column '{}'", col),
            ExtractError::BadValue { column, value } => {
                write!(f, "unparseable value '{}' in column '{}'", value, column)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<csv::Error> for ExtractError {
    fn from(e: csv::Error) -> Self {
        ExtractError::Csv(e)
    }
}

/// Header-indexed view over a parsed CSV payload
struct Table {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    fn parse(payload: &[u8]) -> Result<Self, ExtractError> {
        let mut reader = csv::Reader::from_reader(payload);
        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    fn column_index(&self, name: &str) -> Result<usize, ExtractError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ExtractError::MissingColumn(name.to_string()))
    }

    fn field<'a>(&self, row: &'a StringRecord, idx: usize) -> &'a str {
        row.get(idx).unwrap_or("")
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ExtractError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ExtractError::BadValue {
        column: "date".to_string(),
        value: raw.to_string(),
    })
}

fn parse_count(column: &str, raw: &str) -> Result<i64, ExtractError> {
    // Some sources emit integer counts with a trailing ".0"
    raw.parse::<i64>()
        .or_else(|_| raw.parse::<f64>().map(|v| v as i64))
        .map_err(|_| ExtractError::BadValue {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// Blank cells are missing samples, not zeros
fn parse_sample(raw: &str) -> f64 {
    if raw.is_empty() {
        f64::NAN
    } else {
        raw.parse::<f64>().unwrap_or(f64::NAN)
    }
}

/// Extract national cumulative cases/deaths (schema: date,cases,deaths)
pub fn parse_cases(payload: &[u8]) -> Result<CaseColumns, ExtractError> {
    let table = Table::parse(payload)?;
    let date_idx = table.column_index("date")?;
    let cases_idx = table.column_index("cases")?;
    let deaths_idx = table.column_index("deaths")?;

    let mut columns = CaseColumns {
        dates: Vec::with_capacity(table.rows.len()),
        cases: Vec::with_capacity(table.rows.len()),
        deaths: Vec::with_capacity(table.rows.len()),
    };

    for row in &table.rows {
        columns.dates.push(parse_date(table.field(row, date_idx))?);
        columns
            .cases
            .push(parse_count("cases", table.field(row, cases_idx))?);
        columns
            .deaths
            .push(parse_count("deaths", table.field(row, deaths_idx))?);
    }

    Ok(columns)
}

/// Extract per-state cumulative cases/deaths
/// (schema: date,state,...,cases,deaths), one entry per state, states
/// sorted and deduplicated, rows in source (date) order.
pub fn parse_cases_by_state(payload: &[u8]) -> Result<Vec<(String, CaseColumns)>, ExtractError> {
    let table = Table::parse(payload)?;
    let date_idx = table.column_index("date")?;
    let state_idx = table.column_index("state")?;
    let cases_idx = table.column_index("cases")?;
    let deaths_idx = table.column_index("deaths")?;

    let mut states: Vec<String> = table
        .rows
        .iter()
        .map(|row| table.field(row, state_idx).to_string())
        .collect();
    states.sort();
    states.dedup();

    let mut out = Vec::with_capacity(states.len());
    for state in states {
        let mut columns = CaseColumns {
            dates: Vec::new(),
            cases: Vec::new(),
            deaths: Vec::new(),
        };

        for row in &table.rows {
            if table.field(row, state_idx) != state {
                continue;
            }
            columns.dates.push(parse_date(table.field(row, date_idx))?);
            columns
                .cases
                .push(parse_count("cases", table.field(row, cases_idx))?);
            columns
                .deaths
                .push(parse_count("deaths", table.field(row, deaths_idx))?);
        }

        out.push((state, columns));
    }

    Ok(out)
}

/// Extract cumulative vaccination totals for one location
/// (schema: location,date,...,people_vaccinated,people_fully_vaccinated).
/// Blank samples come back as NaN.
pub fn parse_vaccinations(
    payload: &[u8],
    location: &str,
) -> Result<VaccinationColumns, ExtractError> {
    let table = Table::parse(payload)?;
    let location_idx = table.column_index("location")?;
    let date_idx = table.column_index("date")?;
    let first_idx = table.column_index("people_vaccinated")?;
    let second_idx = table.column_index("people_fully_vaccinated")?;

    let mut columns = VaccinationColumns {
        dates: Vec::new(),
        first_dose: Vec::new(),
        second_dose: Vec::new(),
    };

    for row in &table.rows {
        if !table.field(row, location_idx).eq_ignore_ascii_case(location) {
            continue;
        }
        columns.dates.push(parse_date(table.field(row, date_idx))?);
        columns
            .first_dose
            .push(parse_sample(table.field(row, first_idx)));
        columns
            .second_dose
            .push(parse_sample(table.field(row, second_idx)));
    }

    Ok(columns)
}

/// Aggregate pseudo-locations present in the state-level vaccination
/// source that are not states
const EXCLUDED_LOCATIONS: [&str; 2] = ["United States", "Long Term Care"];

/// Extract per-state cumulative vaccination totals, one entry per
/// location, sorted, aggregate pseudo-locations dropped.
pub fn parse_vaccinations_by_location(
    payload: &[u8],
) -> Result<Vec<(String, VaccinationColumns)>, ExtractError> {
    let table = Table::parse(payload)?;
    let location_idx = table.column_index("location")?;

    let mut locations: Vec<String> = table
        .rows
        .iter()
        .map(|row| table.field(row, location_idx).to_string())
        .filter(|loc| !EXCLUDED_LOCATIONS.contains(&loc.as_str()))
        .collect();
    locations.sort();
    locations.dedup();

    let mut out = Vec::with_capacity(locations.len());
    for location in locations {
        let columns = parse_vaccinations(payload, &location)?;
        out.push((location, columns));
    }

    Ok(out)
}

/// Extract cumulative dose totals for one manufacturer within one
/// location (schema: location,date,vaccine,total_vaccinations)
pub fn parse_manufacturer(
    payload: &[u8],
    location: &str,
    vaccine: &str,
) -> Result<ManufacturerColumns, ExtractError> {
    let table = Table::parse(payload)?;
    let location_idx = table.column_index("location")?;
    let date_idx = table.column_index("date")?;
    let vaccine_idx = table.column_index("vaccine")?;
    let total_idx = table.column_index("total_vaccinations")?;

    let mut columns = ManufacturerColumns {
        dates: Vec::new(),
        total_doses: Vec::new(),
    };

    for row in &table.rows {
        if !table.field(row, location_idx).eq_ignore_ascii_case(location) {
            continue;
        }
        let row_vaccine = table.field(row, vaccine_idx);
        if !row_vaccine.to_lowercase().contains(&vaccine.to_lowercase()) {
            continue;
        }
        columns.dates.push(parse_date(table.field(row, date_idx))?);
        columns.total_doses.push(parse_count(
            "total_vaccinations",
            table.field(row, total_idx),
        )?);
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_national_cases() {
        let payload = b"date,cases,deaths\n2021-01-01,100,10\n2021-01-02,150,12\n";
        let columns = parse_cases(payload).unwrap();

        assert_eq!(columns.dates.len(), 2);
        assert_eq!(columns.dates[0], NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(columns.cases, vec![100, 150]);
        assert_eq!(columns.deaths, vec![10, 12]);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let payload = b"date,infections\n2021-01-01,100\n";
        let err = parse_cases(payload).unwrap_err();
        assert!(matches!(err, ExtractError::MissingColumn(ref c) if c == "cases"));
    }

    #[test]
    fn test_bad_count_is_an_error() {
        let payload = b"date,cases,deaths\n2021-01-01,many,10\n";
        assert!(parse_cases(payload).is_err());
    }

    #[test]
    fn test_states_split_sorted_and_deduped() {
        let payload = b"date,state,fips,cases,deaths\n\
            2021-01-01,Washington,53,5,0\n\
            2021-01-01,Alabama,01,3,0\n\
            2021-01-02,Washington,53,8,1\n\
            2021-01-02,Alabama,01,4,0\n";

        let by_state = parse_cases_by_state(payload).unwrap();

        assert_eq!(by_state.len(), 2);
        assert_eq!(by_state[0].0, "Alabama");
        assert_eq!(by_state[1].0, "Washington");
        assert_eq!(by_state[0].1.cases, vec![3, 4]);
        assert_eq!(by_state[1].1.cases, vec![5, 8]);
    }

    #[test]
    fn test_vaccination_blanks_become_nan() {
        let payload = b"location,date,people_vaccinated,people_fully_vaccinated\n\
            United States,2021-01-01,100,\n\
            United States,2021-01-02,,20\n\
            Canada,2021-01-01,999,999\n";

        let columns = parse_vaccinations(payload, "United States").unwrap();

        assert_eq!(columns.dates.len(), 2);
        assert_eq!(columns.first_dose[0], 100.0);
        assert!(columns.first_dose[1].is_nan());
        assert!(columns.second_dose[0].is_nan());
        assert_eq!(columns.second_dose[1], 20.0);
    }

    #[test]
    fn test_pseudo_locations_excluded() {
        let payload = b"location,date,people_vaccinated,people_fully_vaccinated\n\
            United States,2021-01-01,100,50\n\
            Long Term Care,2021-01-01,10,5\n\
            Wyoming,2021-01-01,7,3\n\
            Alaska,2021-01-01,9,4\n";

        let by_location = parse_vaccinations_by_location(payload).unwrap();

        let names: Vec<&str> = by_location.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(names, vec!["Alaska", "Wyoming"]);
    }

    #[test]
    fn test_manufacturer_filtering() {
        let payload = b"location,date,vaccine,total_vaccinations\n\
            United States,2021-01-01,Moderna,100\n\
            United States,2021-01-01,Pfizer/BioNTech,200\n\
            United States,2021-01-02,Moderna,150\n\
            Canada,2021-01-01,Moderna,999\n";

        let moderna = parse_manufacturer(payload, "United States", "Moderna").unwrap();
        assert_eq!(moderna.total_doses, vec![100, 150]);

        let pfizer = parse_manufacturer(payload, "United States", "Pfizer/BioNTech").unwrap();
        assert_eq!(pfizer.total_doses, vec![200]);
    }

    #[test]
    fn test_trailing_point_zero_counts_parse() {
        let payload = b"date,cases,deaths\n2021-01-01,100.0,10.0\n";
        let columns = parse_cases(payload).unwrap();
        assert_eq!(columns.cases, vec![100]);
    }
}
