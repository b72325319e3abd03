//! Product categories.
//!
//! Donated equipment must be filed under one of a fixed set of categories.
//! Buy listings use free-text categories; [`BUY_CATEGORIES`] only lists the
//! ones offered as filter shortcuts.

use serde::{Deserialize, Serialize};

/// Suggested categories for buy listings.
pub const BUY_CATEGORIES: [&str; 5] = [
    "Hygiene",
    "Miscellaneous",
    "Research and Development",
    "Packaging",
    "Pharmaceuticals",
];

/// The fixed category list for donated laboratory equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DonateCategory {
    #[serde(rename = "Analytical Instruments")]
    AnalyticalInstruments,
    #[serde(rename = "Balances and Measuring Equipment")]
    BalancesAndMeasuring,
    #[serde(rename = "Centrifuges and Spinning Equipment")]
    Centrifuges,
    #[serde(rename = "Electrochemistry and Blood Analyzer")]
    Electrochemistry,
    #[serde(rename = "Fermentation and Cell Culture")]
    FermentationAndCellCulture,
    #[serde(rename = "General Laboratory Equipment")]
    GeneralLaboratory,
    #[serde(rename = "Laboratory Incubators")]
    Incubators,
    #[serde(rename = "Liquid Handling and Processing")]
    LiquidHandling,
    #[serde(rename = "Medical and Clinical Devices")]
    MedicalAndClinical,
    #[serde(rename = "Mixing and Shaking Equipment")]
    MixingAndShaking,
    #[serde(rename = "Molecular Biology Equipment")]
    MolecularBiology,
    #[serde(rename = "Refrigeration and Cooling System")]
    Refrigeration,
    #[serde(rename = "Specialized Systems")]
    SpecializedSystems,
    #[serde(rename = "Sterilization Equipment")]
    Sterilization,
    #[serde(rename = "Tissue Processing and Histology")]
    TissueProcessing,
}

impl DonateCategory {
    /// Every donate category, in display order.
    pub const ALL: [Self; 15] = [
        Self::AnalyticalInstruments,
        Self::BalancesAndMeasuring,
        Self::Centrifuges,
        Self::Electrochemistry,
        Self::FermentationAndCellCulture,
        Self::GeneralLaboratory,
        Self::Incubators,
        Self::LiquidHandling,
        Self::MedicalAndClinical,
        Self::MixingAndShaking,
        Self::MolecularBiology,
        Self::Refrigeration,
        Self::SpecializedSystems,
        Self::Sterilization,
        Self::TissueProcessing,
    ];

    /// Display name, identical to the stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AnalyticalInstruments => "Analytical Instruments",
            Self::BalancesAndMeasuring => "Balances and Measuring Equipment",
            Self::Centrifuges => "Centrifuges and Spinning Equipment",
            Self::Electrochemistry => "Electrochemistry and Blood Analyzer",
            Self::FermentationAndCellCulture => "Fermentation and Cell Culture",
            Self::GeneralLaboratory => "General Laboratory Equipment",
            Self::Incubators => "Laboratory Incubators",
            Self::LiquidHandling => "Liquid Handling and Processing",
            Self::MedicalAndClinical => "Medical and Clinical Devices",
            Self::MixingAndShaking => "Mixing and Shaking Equipment",
            Self::MolecularBiology => "Molecular Biology Equipment",
            Self::Refrigeration => "Refrigeration and Cooling System",
            Self::SpecializedSystems => "Specialized Systems",
            Self::Sterilization => "Sterilization Equipment",
            Self::TissueProcessing => "Tissue Processing and Histology",
        }
    }
}

impl std::fmt::Display for DonateCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DonateCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown donate category: {s}"))
    }
}
