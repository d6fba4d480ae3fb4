//! ethereum-lists/contracts checkout reader.
//!
//! The checkout carries two trees: `projects/` mapping a project id to
//! its display name, and `contracts/<chain-id>/<address>.json` files
//! describing individual spender contracts. Files that fail to parse or
//! lack the fields a spender record needs are skipped with a warning so
//! one bad commit upstream cannot sink the import.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::registry::{is_address, Partition, SpenderRecord};

#[derive(Debug, Deserialize)]
struct ProjectFile {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContractFile {
    project: Option<String>,
    name: Option<String>,
}

pub struct ContractsCheckout {
    root: PathBuf,
}

impl ContractsCheckout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project display names keyed by project id. The id is the file's
    /// path relative to `projects/` without the extension, which is how
    /// contract files reference it.
    pub fn read_projects(&self) -> Result<BTreeMap<String, String>> {
        let projects_dir = self.root.join("projects");
        if !projects_dir.is_dir() {
            return Err(Error::Config(format!(
                "{} does not look like a contracts checkout (missing projects/)",
                self.root.display()
            )));
        }

        let mut projects = BTreeMap::new();
        for entry in WalkDir::new(&projects_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable checkout entry");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(key) = project_key(&projects_dir, path) else {
                continue;
            };
            match read_json::<ProjectFile>(path) {
                Ok(project) => {
                    projects.insert(key, project.name);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping malformed project file"),
            }
        }
        Ok(projects)
    }

    /// All spender records in the checkout, labelled `project: contract`.
    /// Project ids that have no entry under `projects/` fall back to the
    /// raw id, matching how sparse the upstream index is.
    pub fn read_contracts(
        &self,
        projects: &BTreeMap<String, String>,
    ) -> Result<Vec<(Partition, String, SpenderRecord)>> {
        let contracts_dir = self.root.join("contracts");
        if !contracts_dir.is_dir() {
            return Err(Error::Config(format!(
                "{} does not look like a contracts checkout (missing contracts/)",
                self.root.display()
            )));
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(&contracts_dir)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable checkout entry");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(address) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_address(address) {
                warn!(path = %path.display(), "skipping contract file without an address name");
                continue;
            }
            let Some(chain_dir) = path
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
            else {
                continue;
            };

            let contract = match read_json::<ContractFile>(path) {
                Ok(contract) => contract,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping malformed contract file");
                    continue;
                }
            };
            let (Some(project), Some(contract_name)) = (contract.project, contract.name) else {
                warn!(path = %path.display(), "skipping contract file without project or name");
                continue;
            };

            let name = projects.get(&project).cloned().unwrap_or(project);
            let label = format!("{name}: {contract_name}");
            let record = SpenderRecord {
                name: Some(name),
                label: Some(label),
                risk_factors: None,
            };
            records.push((
                Partition::from_dir_name(chain_dir),
                address.to_string(),
                record,
            ));
        }
        Ok(records)
    }
}

fn project_key(projects_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(projects_dir).ok()?;
    let relative = relative.to_str()?;
    Some(relative.trim_end_matches(".json").replace('\\', "/"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn seed_checkout(dir: &TempDir) {
        let root = dir.path();
        fs::create_dir_all(root.join("projects/nested")).unwrap();
        fs::create_dir_all(root.join("contracts/1")).unwrap();
        fs::create_dir_all(root.join("contracts/137")).unwrap();

        fs::write(
            root.join("projects/uniswap.json"),
            r#"{ "name": "Uniswap", "website": "https://uniswap.org" }"#,
        )
        .unwrap();
        fs::write(
            root.join("projects/nested/aave.json"),
            r#"{ "name": "Aave" }"#,
        )
        .unwrap();

        fs::write(
            root.join("contracts/1/0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45.json"),
            r#"{ "project": "uniswap", "name": "SwapRouter02", "features": [] }"#,
        )
        .unwrap();
        fs::write(
            root.join("contracts/137/0x0000000000000000000000000000000000001010.json"),
            r#"{ "project": "unindexed-project", "name": "Native Token" }"#,
        )
        .unwrap();
        fs::write(root.join("contracts/1/broken.json"), "{ not json").unwrap();
        fs::write(
            root.join("contracts/1/0x1111111111111111111111111111111111111111.json"),
            r#"{ "name": "No project field" }"#,
        )
        .unwrap();
    }

    #[test]
    fn projects_index_by_relative_path() {
        let dir = TempDir::new().unwrap();
        seed_checkout(&dir);
        let checkout = ContractsCheckout::new(dir.path());
        let projects = checkout.read_projects().unwrap();
        assert_eq!(projects.get("uniswap"), Some(&"Uniswap".to_string()));
        assert_eq!(projects.get("nested/aave"), Some(&"Aave".to_string()));
    }

    #[test]
    fn contracts_become_labelled_spender_records() {
        let dir = TempDir::new().unwrap();
        seed_checkout(&dir);
        let checkout = ContractsCheckout::new(dir.path());
        let projects = checkout.read_projects().unwrap();
        let records = checkout.read_contracts(&projects).unwrap();

        assert_eq!(records.len(), 2);
        let (partition, address, record) = records
            .iter()
            .find(|(p, _, _)| *p == Partition::Chain(1))
            .unwrap();
        assert_eq!(*partition, Partition::Chain(1));
        assert_eq!(address, "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45");
        assert_eq!(record.name.as_deref(), Some("Uniswap"));
        assert_eq!(record.label.as_deref(), Some("Uniswap: SwapRouter02"));
    }

    #[test]
    fn unknown_project_ids_fall_back_to_the_raw_id() {
        let dir = TempDir::new().unwrap();
        seed_checkout(&dir);
        let checkout = ContractsCheckout::new(dir.path());
        let projects = checkout.read_projects().unwrap();
        let records = checkout.read_contracts(&projects).unwrap();

        let (_, _, record) = records
            .iter()
            .find(|(p, _, _)| *p == Partition::Chain(137))
            .unwrap();
        assert_eq!(record.name.as_deref(), Some("unindexed-project"));
        assert_eq!(
            record.label.as_deref(),
            Some("unindexed-project: Native Token")
        );
    }

    #[test]
    fn missing_checkout_layout_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let checkout = ContractsCheckout::new(dir.path());
        assert!(matches!(
            checkout.read_projects(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            checkout.read_contracts(&BTreeMap::new()),
            Err(Error::Config(_))
        ));
    }
}
