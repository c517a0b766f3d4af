use crate::error::{PipelineError, Result};
use crate::pipeline::schema::{baseline, connectivity, turnout, urbanicity};
use crate::pipeline::survey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where one source lives and how to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Download location, if the source is fetched rather than supplied by hand.
    #[serde(default)]
    pub url: Option<String>,
    /// File name inside the data directory.
    pub file: String,
    /// Raw name of the identifier column.
    pub key_column: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

impl SourceSpec {
    fn new(file: &str, key_column: &str) -> Self {
        Self {
            url: None,
            file: file.to_string(),
            key_column: key_column.to_string(),
            delimiter: default_delimiter(),
        }
    }

    pub fn path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.file)
    }

    /// Delimiter as a byte.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDelimiter`] for a non-ASCII delimiter.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| PipelineError::InvalidDelimiter {
                file: self.file.clone(),
                delimiter: self.delimiter,
            })
    }
}

/// Every input of a pipeline run, stored as a JSON object on disk:
/// ```json
/// {
///   "turnout": { "url": "https://...", "file": "turnout.csv", "key_column": "stcofips" },
///   "survey":  { "file": "anes_cumulative.csv", "key_column": "VCF0006", "delimiter": "|" }
/// }
/// ```
/// Sources left out of the file keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceManifest {
    pub baseline: SourceSpec,
    pub urbanicity: SourceSpec,
    pub turnout: SourceSpec,
    pub connectivity_2010: SourceSpec,
    pub connectivity_2020: SourceSpec,
    pub survey: SourceSpec,
}

impl Default for SourceManifest {
    fn default() -> Self {
        Self {
            baseline: SourceSpec::new("county_baseline.csv", baseline::KEY),
            urbanicity: SourceSpec::new("urbanicity.csv", urbanicity::KEY),
            turnout: SourceSpec::new("voter_turnout.csv", turnout::KEY),
            connectivity_2010: SourceSpec::new("street_connectivity_2010.csv", connectivity::KEY_2010),
            connectivity_2020: SourceSpec::new("street_connectivity_2020.csv", connectivity::KEY_2020),
            survey: SourceSpec::new("anes_cumulative.csv", survey::RESPONDENT_ID),
        }
    }
}

impl SourceManifest {
    /// Loads the manifest from a JSON file at `path`, rejecting delimiters
    /// the CSV reader cannot use.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        for (_, spec) in manifest.iter() {
            spec.delimiter_byte()?;
        }
        Ok(manifest)
    }

    /// Iterates over all `(name, spec)` pairs in join order, survey last.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SourceSpec)> {
        [
            ("baseline", &self.baseline),
            ("urbanicity", &self.urbanicity),
            ("turnout", &self.turnout),
            ("connectivity_2010", &self.connectivity_2010),
            ("connectivity_2020", &self.connectivity_2020),
            ("survey", &self.survey),
        ]
        .into_iter()
    }
}
