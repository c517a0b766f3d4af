//! The merge-and-derive pipeline.
//!
//! Raw source tables are loaded into a [`PipelineContext`], normalized to
//! county `Fips` keys, converted into typed records, merged with full outer
//! joins and derived into analysis columns. [`run`] returns every view and
//! subset in one [`AnalysisTables`] value.

pub mod aggregate;
pub mod derive;
pub mod merge;
pub mod normalize;
pub mod project;
pub mod schema;
pub mod survey;
pub mod types;
pub mod utility;

use crate::config::SourceManifest;
use crate::error::Result;
use crate::pipeline::aggregate::aggregate_connectivity;
use crate::pipeline::derive::{canonicalize_baseline, derive_counties};
use crate::pipeline::merge::{MergeInputs, merge_sources};
use crate::pipeline::normalize::{KeyGrain, filter_min_year, normalize_key};
use crate::pipeline::project::{
    FlipSubsets, TypologySubsets, flip_subsets, presidential_view, reclassification_view,
    typology_subsets, urbanicity_view,
};
use crate::pipeline::survey::{SurveySummaryRow, summarize, survey_responses};
use crate::pipeline::types::{DerivedCounty, PresidentialRow, ReclassifiedRow, UrbanicityRow};
use crate::table::{RawTable, read_table};
use std::path::Path;
use tracing::info;

/// A raw table together with the name of its identifier column.
#[derive(Debug, Clone)]
pub struct Source {
    pub table: RawTable,
    pub key_column: String,
}

/// Every table loaded for one run. Nothing else is shared between stages.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub baseline: Source,
    pub urbanicity: Source,
    pub turnout: Source,
    pub connectivity_2010: Source,
    pub connectivity_2020: Source,
    /// Survey respondents are not joined to counties.
    pub survey: Option<RawTable>,
}

impl PipelineContext {
    /// Reads every source in `manifest` from `data_dir`. The survey file is
    /// optional; any other unreadable file aborts the run.
    #[tracing::instrument(skip(manifest), fields(data_dir = %data_dir.display()))]
    pub fn load(manifest: &SourceManifest, data_dir: &Path) -> Result<Self> {
        let load = |name: &str, spec: &crate::config::SourceSpec| -> Result<Source> {
            let table = read_table(&spec.path(data_dir), name, spec.delimiter_byte()?)?;
            info!(source = name, rows = table.len(), "Source loaded");
            Ok(Source {
                table,
                key_column: spec.key_column.clone(),
            })
        };

        let survey_path = manifest.survey.path(data_dir);
        let survey = if survey_path.exists() {
            Some(read_table(
                &survey_path,
                "survey",
                manifest.survey.delimiter_byte()?,
            )?)
        } else {
            info!(path = %survey_path.display(), "No survey file, skipping survey summary");
            None
        };

        Ok(Self {
            baseline: load("baseline", &manifest.baseline)?,
            urbanicity: load("urbanicity", &manifest.urbanicity)?,
            turnout: load("turnout", &manifest.turnout)?,
            connectivity_2010: load("connectivity_2010", &manifest.connectivity_2010)?,
            connectivity_2020: load("connectivity_2020", &manifest.connectivity_2020)?,
            survey,
        })
    }
}

/// Everything the pipeline produces, by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisTables {
    pub derived: Vec<DerivedCounty>,
    pub presidential: Vec<PresidentialRow>,
    pub urbanicity: Vec<UrbanicityRow>,
    pub reclassification: Vec<ReclassifiedRow>,
    pub flips: FlipSubsets,
    pub typology: TypologySubsets,
    pub survey_summary: Vec<SurveySummaryRow>,
    /// Distinct keys that were not 5-digit county codes after padding.
    pub malformed_keys: Vec<String>,
}

/// Normalizes and converts every county source, ready to merge.
pub fn prepare(ctx: &PipelineContext) -> Result<MergeInputs> {
    let mut baseline = normalize_key(
        ctx.baseline.table.clone(),
        &ctx.baseline.key_column,
        KeyGrain::County,
    )?;
    canonicalize_baseline(&mut baseline);

    let urbanicity = normalize_key(
        ctx.urbanicity.table.clone(),
        &ctx.urbanicity.key_column,
        KeyGrain::County,
    )?;

    let turnout = normalize_key(
        ctx.turnout.table.clone(),
        &ctx.turnout.key_column,
        KeyGrain::County,
    )?;
    let turnout = filter_min_year(turnout, schema::turnout::YEAR, schema::turnout::MIN_YEAR)?;

    let tracts_2010 = normalize_key(
        ctx.connectivity_2010.table.clone(),
        &ctx.connectivity_2010.key_column,
        KeyGrain::Tract,
    )?;
    let tracts_2020 = normalize_key(
        ctx.connectivity_2020.table.clone(),
        &ctx.connectivity_2020.key_column,
        KeyGrain::Tract,
    )?;

    Ok(MergeInputs {
        baseline: schema::baseline_records(&baseline)?,
        urbanicity: schema::urbanicity_records(&urbanicity)?,
        turnout: schema::turnout_records(&turnout)?,
        connectivity_2010: aggregate_connectivity(&schema::tract_records(&tracts_2010)?, 2010),
        connectivity_2020: aggregate_connectivity(&schema::tract_records(&tracts_2020)?, 2020),
    })
}

/// Runs normalize → aggregate → merge → derive → project.
#[tracing::instrument(skip_all)]
pub fn run(ctx: &PipelineContext) -> Result<AnalysisTables> {
    let inputs = prepare(ctx)?;
    let merged = merge_sources(inputs);

    // merged rows are sorted by key, so dedup removes every repeat
    let mut malformed_keys: Vec<String> = merged
        .iter()
        .filter(|r| !r.fips.is_well_formed())
        .map(|r| r.fips.to_string())
        .collect();
    malformed_keys.dedup();

    let derived = derive_counties(&merged);
    let presidential = presidential_view(&derived);
    let flips = flip_subsets(&presidential);
    let typology = typology_subsets(&presidential);

    let survey_summary = match &ctx.survey {
        Some(table) => summarize(&survey_responses(table.clone(), survey::MIN_YEAR)?),
        None => Vec::new(),
    };

    let tables = AnalysisTables {
        urbanicity: urbanicity_view(&derived),
        reclassification: reclassification_view(&derived),
        derived,
        presidential,
        flips,
        typology,
        survey_summary,
        malformed_keys,
    };

    info!(
        derived = tables.derived.len(),
        presidential = tables.presidential.len(),
        urbanicity = tables.urbanicity.len(),
        reclassification = tables.reclassification.len(),
        triple_flip = tables.flips.triple_flip.len(),
        double_flip = tables.flips.double_flip.len(),
        "Pipeline finished"
    );
    Ok(tables)
}
