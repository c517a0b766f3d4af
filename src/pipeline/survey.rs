//! ANES cumulative-file respondents.
//!
//! The file names its columns with opaque `VCF` codes. Only the fields in
//! [`RENAMES`] are read; every other column is ignored.

use crate::error::Result;
use crate::pipeline::utility::{parse_code, parse_numeric, parse_year};
use crate::table::{RawTable, cell};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const YEAR: &str = "year";
pub const RESPONDENT_ID: &str = "VCF0006";

/// ANES code → semantic name.
pub const RENAMES: &[(&str, &str)] = &[
    ("VCF0004", YEAR),
    (RESPONDENT_ID, "respondent_id"),
    ("VCF0101", "age"),
    ("VCF0104", "gender"),
    ("VCF0105a", "race"),
    ("VCF0110", "education"),
    ("VCF0111", "urbanism"),
    ("VCF0301", "party_id"),
    ("VCF0702", "voted"),
];

/// Earliest survey wave kept.
pub const MIN_YEAR: i32 = 2016;

/// `VCF0702` code for "yes, voted".
const VOTED_YES: f64 = 2.0;

/// One respondent in one survey year. Codes are kept numeric as published.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyResponse {
    pub year: i32,
    pub respondent_id: String,
    pub age: Option<f64>,
    pub gender: Option<f64>,
    pub race: Option<f64>,
    pub education: Option<f64>,
    /// Non-integral codes are missing.
    pub urbanism: Option<i64>,
    pub party_id: Option<f64>,
    pub voted: Option<f64>,
}

/// Renames the mapped codes and builds respondents from `min_year` on.
///
/// # Errors
///
/// Returns `SchemaMismatch` if any mapped code is absent from the file.
pub fn survey_responses(mut table: RawTable, min_year: i32) -> Result<Vec<SurveyResponse>> {
    table.rename_columns(RENAMES);
    let col = |name: &str| table.column_index(name);

    let year = col(YEAR)?;
    let id = col("respondent_id")?;
    let age = col("age")?;
    let gender = col("gender")?;
    let race = col("race")?;
    let education = col("education")?;
    let urbanism = col("urbanism")?;
    let party_id = col("party_id")?;
    let voted = col("voted")?;

    let responses: Vec<SurveyResponse> = table
        .rows
        .iter()
        .filter_map(|row| {
            let year = parse_year(cell(row, year)).filter(|y| *y >= min_year)?;
            Some(SurveyResponse {
                year,
                respondent_id: cell(row, id).trim().to_string(),
                age: parse_numeric(cell(row, age)),
                gender: parse_numeric(cell(row, gender)),
                race: parse_numeric(cell(row, race)),
                education: parse_numeric(cell(row, education)),
                urbanism: parse_code(cell(row, urbanism)),
                party_id: parse_numeric(cell(row, party_id)),
                voted: parse_numeric(cell(row, voted)),
            })
        })
        .collect();

    debug!(rows = table.len(), kept = responses.len(), "Survey responses built");
    Ok(responses)
}

/// Respondent counts and self-reported turnout per year and urbanism code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveySummaryRow {
    pub year: i32,
    pub urbanism: Option<i64>,
    pub respondents: usize,
    /// Respondents who answered the turnout question.
    pub answered: usize,
    pub voted_pct: Option<f64>,
}

pub fn summarize(responses: &[SurveyResponse]) -> Vec<SurveySummaryRow> {
    // (respondents, answered, voted)
    let mut groups: BTreeMap<(i32, Option<i64>), (usize, usize, usize)> = BTreeMap::new();

    for r in responses {
        let entry = groups.entry((r.year, r.urbanism)).or_default();
        entry.0 += 1;
        if let Some(voted) = r.voted {
            entry.1 += 1;
            if voted == VOTED_YES {
                entry.2 += 1;
            }
        }
    }

    groups
        .into_iter()
        .map(|((year, urbanism), (respondents, answered, voted))| SurveySummaryRow {
            year,
            urbanism,
            respondents,
            answered,
            voted_pct: (answered > 0).then(|| voted as f64 / answered as f64 * 100.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::table::read_table_from_reader;

    const SURVEY: &str = "\
VCF0004|VCF0006|VCF0101|VCF0104|VCF0105a|VCF0110|VCF0111|VCF0301|VCF0702|VCF9999
2012|1|40|1|1|3|1|2|2|x
2016|2|35|2|1|4|1|7|2|x
2016|3|61|1|2|2|1|1|1|x
2016|4|52|1|1|3|2|4||x
2020|5|29|2|3|4|2|5|2|x
";

    fn responses() -> Vec<SurveyResponse> {
        let table = read_table_from_reader(SURVEY.as_bytes(), "survey", b'|').unwrap();
        survey_responses(table, MIN_YEAR).unwrap()
    }

    #[test]
    fn test_codes_are_renamed_and_old_waves_dropped() {
        let responses = responses();

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0].respondent_id, "2");
        assert_eq!(responses[0].age, Some(35.0));
        assert_eq!(responses[2].voted, None);
    }

    #[test]
    fn test_summary_groups_by_year_and_urbanism() {
        let summary = summarize(&responses());

        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].year, 2016);
        assert_eq!(summary[0].urbanism, Some(1));
        assert_eq!(summary[0].respondents, 2);
        assert_eq!(summary[0].voted_pct, Some(50.0));

        // respondent 4 skipped the turnout question
        assert_eq!(summary[1].respondents, 1);
        assert_eq!(summary[1].answered, 0);
        assert_eq!(summary[1].voted_pct, None);
    }

    #[test]
    fn test_non_integral_urbanism_is_not_grouped_with_integer_code() {
        let rows = responses();
        let table = read_table_from_reader(
            "VCF0004|VCF0006|VCF0101|VCF0104|VCF0105a|VCF0110|VCF0111|VCF0301|VCF0702\n\
             2016|9|44|1|1|3|1.5|2|2\n"
                .as_bytes(),
            "survey",
            b'|',
        )
        .unwrap();
        let odd = survey_responses(table, MIN_YEAR).unwrap();
        assert_eq!(odd[0].urbanism, None);

        let summary = summarize(&[rows[0].clone(), odd[0].clone()]);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].urbanism, None);
        assert_eq!(summary[1].urbanism, Some(1));
        assert_eq!(summary[1].respondents, 1);
    }

    #[test]
    fn test_latin1_in_ignored_column_is_read() {
        let mut data = SURVEY.as_bytes().to_vec();
        data.extend_from_slice(b"2016|6|47|2|1|4|1|7|2|Do\xf1a Ana\n");
        let table = read_table_from_reader(&data[..], "survey", b'|').unwrap();

        let responses = survey_responses(table, MIN_YEAR).unwrap();
        assert_eq!(responses.len(), 5);
        assert_eq!(responses[4].respondent_id, "6");
        assert_eq!(responses[4].voted, Some(2.0));
    }

    #[test]
    fn test_missing_code_is_schema_mismatch() {
        let table = read_table_from_reader("VCF0004|VCF0006\n2016|1\n".as_bytes(), "survey", b'|')
            .unwrap();
        let err = survey_responses(table, MIN_YEAR).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }
}
