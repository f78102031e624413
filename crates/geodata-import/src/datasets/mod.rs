//! Concrete datasets
//!
//! Each dataset pairs a [`DatasetProvider`](crate::pipeline::DatasetProvider)
//! that fetches its sources with a
//! [`TablePopulator`](crate::pipeline::TablePopulator) that turns them into
//! one public table.

pub mod census;
pub mod municipalities;
pub mod provinces;

use clap::ValueEnum;
use std::fmt;

pub use census::{CensusDescriptor, CensusPopulator, CensusProvider, Indicator, CENSUS_TABLE};
pub use municipalities::{
    MunicipalitiesDescriptor, MunicipalitiesPopulator, MunicipalitiesProvider, MUNICIPALITIES_TABLE,
};
pub use provinces::{Province, ProvincesDescriptor, ProvincesPopulator, ProvincesProvider, PROVINCES_TABLE};

/// Datasets the importer knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DatasetKind {
    Provinces,
    Census,
    Municipalities,
}

impl DatasetKind {
    /// Default import order
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Provinces,
        DatasetKind::Census,
        DatasetKind::Municipalities,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Provinces => "provinces",
            DatasetKind::Census => "census",
            DatasetKind::Municipalities => "municipalities",
        }
    }

    /// Public table the dataset replaces
    pub fn target_table(&self) -> &'static str {
        match self {
            DatasetKind::Provinces => PROVINCES_TABLE,
            DatasetKind::Census => CENSUS_TABLE,
            DatasetKind::Municipalities => MUNICIPALITIES_TABLE,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
