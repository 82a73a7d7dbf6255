// In: src/setup.rs

//! Declarative run description.
//!
//! A run is described as JSON: an ordered list of chains, each an ordered list of
//! link specifications. The `link` tag selects the link type and every other field
//! goes to that link's configuration struct.
//!
//! ```json
//! { "chains": [ { "name": "Data", "links": [
//!     { "link": "read_to_dataset", "key": "data", "paths": ["in/*.csv"], "chunk_size": 1000 },
//!     { "link": "break" } ] } ] }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ChainrunError;
use crate::link::{Break, BreakConfig, Link, ReadToDataset, ReadToDatasetConfig};
use crate::process::ProcessManager;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "link", rename_all = "snake_case")]
pub enum LinkSpec {
    ReadToDataset(ReadToDatasetConfig),
    Break(BreakConfig),
}

impl LinkSpec {
    /// Builds and validates the link.
    pub fn build(&self) -> Result<Box<dyn Link>, ChainrunError> {
        Ok(match self {
            LinkSpec::ReadToDataset(config) => Box::new(ReadToDataset::new(config.clone())?),
            LinkSpec::Break(config) => Box::new(Break::new(config.clone())?),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChainSpec {
    pub name: String,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RunSetup {
    #[serde(default)]
    pub chains: Vec<ChainSpec>,
}

impl RunSetup {
    pub fn from_json_str(json: &str) -> Result<Self, ChainrunError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ChainrunError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Creates every chain and link in `pm`, in order.
    ///
    /// Chain names are checked and all links are built before the first chain is
    /// added, so a rejected setup leaves `pm` untouched.
    pub fn apply(&self, pm: &mut ProcessManager) -> Result<(), ChainrunError> {
        let mut names: HashSet<&str> = pm.chains().iter().map(|c| c.name()).collect();
        for chain in &self.chains {
            if !names.insert(chain.name.as_str()) {
                log::error!("Chain \"{}\" is defined more than once", chain.name);
                return Err(ChainrunError::DuplicateChain(chain.name.clone()));
            }
        }

        let mut built = Vec::with_capacity(self.chains.len());
        for chain in &self.chains {
            let links = chain
                .links
                .iter()
                .map(LinkSpec::build)
                .collect::<Result<Vec<_>, _>>()?;
            built.push((chain.name.as_str(), links));
        }

        for (name, links) in built {
            let chain = pm.add_chain(name)?;
            for link in links {
                chain.add_link(link);
            }
        }
        log::debug!("Applied setup with {} chain(s)", self.chains.len());
        Ok(())
    }
}
