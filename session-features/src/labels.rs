//! Mapping between class indices and site names.
use crate::error::FeatureError;
use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::path::Path;

const LABEL_MAP_HEADER: [&str; 2] = ["label", "site_name"];

/// Site names by label, passed explicitly to whatever needs to print them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRegistry {
    names: BTreeMap<usize, String>,
}

/// `www.baidu.com` -> `baidu`: the second to last dot-separated part.
///
/// Names with a single part are returned unchanged.
pub fn site_name(domain: &str) -> String {
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2].to_string()
    } else {
        warn!("Invalid domain format: {domain}");
        domain.to_string()
    }
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns labels `0..n` to `names` in the given order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).enumerate().collect(),
        }
    }

    /// Reads a `label,site_name` table with a header row.
    ///
    /// Rows without a numeric label and a site name are skipped with a warning.
    pub fn from_label_map(path: &Path) -> Result<Self, FeatureError> {
        let mut table = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(File::open(path)?);

        let mut names = BTreeMap::new();
        for row in table.records() {
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping malformed row of {}: {e}", path.display());
                    continue;
                }
            };
            let parsed = match (row.get(0), row.get(1)) {
                (Some(label), Some(name)) if !name.is_empty() => {
                    label.parse::<usize>().ok().map(|label| (label, name))
                }
                _ => None,
            };
            match parsed {
                Some((label, name)) => {
                    names.insert(label, name.to_string());
                }
                None => warn!(
                    "Skipping line {} of {}: expected label,site_name",
                    row.position().map_or(0, |p| p.line()),
                    path.display()
                ),
            }
        }
        if names.is_empty() {
            return Err(FeatureError::EmptyInput(format!(
                "{} contains no labels",
                path.display()
            )));
        }
        Ok(Self { names })
    }

    /// Reads one domain per line, deduplicates their site names and labels
    /// them in sorted order.
    pub fn from_domain_list(path: &Path) -> Result<Self, FeatureError> {
        let contents = fs::read_to_string(path)?;
        let sites: BTreeSet<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(site_name)
            .collect();
        if sites.is_empty() {
            return Err(FeatureError::EmptyInput(format!(
                "{} contains no domains",
                path.display()
            )));
        }
        Ok(Self::from_names(sites))
    }

    pub fn write_label_map(&self, path: &Path) -> Result<(), FeatureError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(LABEL_MAP_HEADER)?;
        for (label, name) in &self.names {
            writer.write_record([label.to_string().as_str(), name.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Site name for `label`, or `label-<n>` when unknown.
    pub fn name(&self, label: usize) -> String {
        self.names
            .get(&label)
            .cloned()
            .unwrap_or_else(|| format!("label-{label}"))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// One more than the largest label, the output width a network needs.
    pub fn label_count(&self) -> usize {
        self.names.keys().next_back().map_or(0, |&max| max + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(|(&label, name)| (label, name.as_str()))
    }
}
