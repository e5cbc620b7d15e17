use crate::error::ConfigError;
use core_types::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Which part of the dashboard an instrument belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum InstrumentGroup {
    #[default]
    Commodity,
    Crypto,
    Other,
}

impl fmt::Display for InstrumentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentGroup::Commodity => "commodity",
            InstrumentGroup::Crypto => "crypto",
            InstrumentGroup::Other => "other",
        };
        f.write_str(name)
    }
}

/// One `[[catalog]]` row of `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub display_name: String,
    pub symbol: String,
    #[serde(default)]
    pub group: InstrumentGroup,
}

impl CatalogEntry {
    pub fn new(display_name: &str, symbol: &str, group: InstrumentGroup) -> Self {
        Self {
            display_name: display_name.to_string(),
            symbol: symbol.to_string(),
            group,
        }
    }

    pub fn instrument(&self) -> Instrument {
        Instrument::new(self.display_name.clone(), self.symbol.clone())
    }
}

const DEFAULT_COMMODITIES: [(&str, &str); 20] = [
    ("Gold", "GC=F"),
    ("Silver", "SI=F"),
    ("Crude Oil", "CL=F"),
    ("Brent Crude Oil", "BZ=F"),
    ("Natural Gas", "NG=F"),
    ("Corn", "ZC=F"),
    ("Wheat", "ZW=F"),
    ("Soybeans", "ZS=F"),
    ("Copper", "HG=F"),
    ("Palladium", "PA=F"),
    ("Platinum", "PL=F"),
    ("Cotton", "CT=F"),
    ("Coffee", "KC=F"),
    ("Sugar", "SB=F"),
    ("Cocoa", "CC=F"),
    ("Live Cattle", "LE=F"),
    ("Lean Hogs", "HE=F"),
    ("Feeder Cattle", "GF=F"),
    ("Oats", "ZO=F"),
    ("Orange Juice", "OJ=F"),
];

const DEFAULT_CRYPTO: [(&str, &str); 5] = [
    ("Bitcoin", "BTC-USD"),
    ("Ethereum", "ETH-USD"),
    ("Solana", "SOL-USD"),
    ("XRP", "XRP-USD"),
    ("Dogecoin", "DOGE-USD"),
];

/// What the user asked to see: catalog names, catalog groups, and extra
/// tickers that are not in the catalog at all.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub names: Vec<String>,
    pub groups: Vec<InstrumentGroup>,
    pub extra_symbols: Vec<String>,
}

/// The list of instruments the dashboard knows about, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Builds a catalog from explicit entries, rejecting duplicates and blanks.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, ConfigError> {
        validate_entries(&entries)?;
        Ok(Self { entries })
    }

    /// The built-in commodity futures and crypto pairs.
    pub fn builtin() -> Self {
        let commodities = DEFAULT_COMMODITIES
            .iter()
            .map(|(name, symbol)| CatalogEntry::new(name, symbol, InstrumentGroup::Commodity));
        let crypto = DEFAULT_CRYPTO
            .iter()
            .map(|(name, symbol)| CatalogEntry::new(name, symbol, InstrumentGroup::Crypto));
        Self {
            entries: commodities.chain(crypto).collect(),
        }
    }

    /// Uses the configured `[[catalog]]` rows, or the built-in list when none
    /// are configured.
    pub fn from_entries_or_builtin(entries: &[CatalogEntry]) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            tracing::debug!("No catalog configured, using the built-in instrument list.");
            return Ok(Self::builtin());
        }
        Self::new(entries.to_vec())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn find_by_symbol(&self, symbol: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| entry.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Resolves a selection into the instruments to fetch, in catalog order
    /// followed by the extra tickers in the order given.
    ///
    /// Named instruments are selected regardless of group; when no names are
    /// given, every entry of the selected groups is used (all groups when none
    /// are selected). Extra tickers already covered by the selection are
    /// skipped.
    pub fn select(&self, selection: &Selection) -> Result<Vec<Instrument>, ConfigError> {
        let mut wanted: HashSet<String> = HashSet::new();
        for name in &selection.names {
            let known = self
                .entries
                .iter()
                .any(|entry| entry.display_name.eq_ignore_ascii_case(name.trim()));
            if !known {
                return Err(ConfigError::UnknownInstrument(name.clone()));
            }
            wanted.insert(name.trim().to_lowercase());
        }

        let mut instruments: Vec<Instrument> = self
            .entries
            .iter()
            .filter(|entry| {
                if selection.names.is_empty() {
                    selection.groups.is_empty() || selection.groups.contains(&entry.group)
                } else {
                    wanted.contains(&entry.display_name.to_lowercase())
                }
            })
            .map(CatalogEntry::instrument)
            .collect();

        for raw in &selection.extra_symbols {
            let symbol = raw.trim();
            if symbol.is_empty() {
                continue;
            }
            if instruments.iter().any(|i| i.symbol.eq_ignore_ascii_case(symbol)) {
                tracing::warn!(symbol, "Extra ticker is already selected, skipping it.");
                continue;
            }
            instruments.push(Instrument::from_symbol(symbol));
        }

        if instruments.is_empty() {
            return Err(ConfigError::ValidationError(
                "the selection does not match any instrument".to_string(),
            ));
        }

        Ok(instruments)
    }
}

/// Rejects blank names or symbols and symbols listed more than once.
pub fn validate_entries(entries: &[CatalogEntry]) -> Result<(), ConfigError> {
    let mut symbols = HashSet::with_capacity(entries.len());
    for entry in entries {
        if entry.symbol.trim().is_empty() || entry.display_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "catalog entry {:?} needs both a display_name and a symbol",
                entry
            )));
        }
        if !symbols.insert(entry.symbol.to_ascii_uppercase()) {
            return Err(ConfigError::ValidationError(format!(
                "catalog symbol '{}' is listed more than once",
                entry.symbol
            )));
        }
    }
    Ok(())
}
