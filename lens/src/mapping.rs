//! Hand-maintained dictionaries that fold known company and line naming
//! variants onto one canonical spelling.
//!
//! Entries are curated from the comparison reports (see [`crate::compare`]);
//! nothing here is learned automatically.

use crate::error::{LensError, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use tracing::{info, warn};

const BUILTIN_VERSION: &str = "builtin";

const COMPANY_ENTRIES: &[(&str, &str)] = &[
    // JR group
    ("北海道旅客鉄道", "jr"),
    ("東日本旅客鉄道", "jr"),
    ("東海旅客鉄道", "jr"),
    ("西日本旅客鉄道", "jr"),
    ("四国旅客鉄道", "jr"),
    ("九州旅客鉄道", "jr"),
    // legacy kanji and 電気鉄道 / 電鉄 spellings
    ("わたらせ渓谷鐵道", "わたらせ渓谷鉄道"),
    ("信楽高原鐵道", "信楽高原鉄道"),
    ("小湊鐵道", "小湊鉄道"),
    ("真岡鐵道", "真岡鉄道"),
    ("和歌山電鐵", "わかやま電鉄"),
    ("一畑電車", "一畑電気鉄道"),
    ("上毛電気鉄道", "上毛電鉄"),
    ("京福電気鉄道", "京福電鉄"),
    ("京阪電気鉄道", "京阪電鉄"),
    ("南海電気鉄道", "南海電鉄"),
    ("山陽電気鉄道", "山陽電鉄"),
    ("新京成電鉄", "新京成電鉄"),
    ("熊本電気鉄道", "熊本電鉄"),
    ("筑豊電気鉄道", "筑豊電鉄"),
    ("阪神電気鉄道", "阪神電鉄"),
    ("銚子電気鉄道", "銚子電鉄"),
    ("高松琴平電気鉄道", "高松琴平電鉄"),
    // abbreviations and brand names
    ("首都圏新都市鉄道", "つくばエクスプレス"),
    ("上田電鉄", "上田交通"),
    ("東京地下鉄", "東京メトロ"),
    ("大阪市高速電気軌道", "osakametro"),
    ("アイジーアールいわて銀河鉄道", "igrいわて銀河鉄道"),
    ("willertrains", "京都丹後鉄道"),
    ("東海交通事業", "jr東海交通事業"),
    ("横浜シーサイドライン", "横浜新都市交通"),
    ("松本電鉄", "アルピコ交通"),
    // municipal operators
    ("東京都", "都営地下鉄"),
    ("京都市", "京都市交通局"),
    ("仙台市", "仙台市営地下鉄"),
    ("名古屋市", "名古屋市営地下鉄"),
    ("札幌市", "札幌市営地下鉄"),
    ("函館市", "函館市電"),
    ("横浜市", "横浜市営地下鉄"),
    ("神戸市", "神戸市営地下鉄"),
    ("福岡市", "福岡市営地下鉄"),
    ("熊本市", "熊本市交通局"),
    ("鹿児島市", "鹿児島市交通局"),
    // corporate prefixes
    ("一般社団法人札幌市交通事業振興公社", "札幌市交通事業振興公社"),
    ("一般社団法人神戸住環境整備公社", "神戸住環境整備公社"),
    ("一般財団法人青函トンネル記念館", "青函トンネル記念館"),
];

const LINE_ENTRIES: &[(&str, &str)] = &[
    ("jr山手線", "山手線"),
    ("jr京浜東北線", "京浜東北線"),
    ("jr中央線快速", "中央線"),
    ("中央本線", "中央線"),
    ("丸ノ内線(方南町支線)", "丸ノ内線"),
];

static BUILTIN: Lazy<MappingTables> = Lazy::new(|| MappingTables {
    version: BUILTIN_VERSION.to_string(),
    company: MappingTable::from_trusted(COMPANY_ENTRIES),
    line: MappingTable::from_trusted(LINE_ENTRIES),
});

/// One variant → canonical dictionary.
///
/// Source keys are matched exactly, so they must be written in normalized
/// form (`jr山手線`, not `JR山手線`). Lookup is a single pass: a target that
/// is itself a source key is not mapped again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: HashMap<String, String>,
}

impl MappingTable {
    /// Builds a table, rejecting a source key that maps to two different
    /// targets. Exact repeats are accepted with a warning.
    pub fn from_pairs<I, K, V>(name: &str, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries = HashMap::new();
        for (from, to) in pairs {
            let to = to.into();
            match entries.entry(from.as_ref().to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(to);
                }
                Entry::Occupied(slot) if *slot.get() == to => {
                    warn!("Duplicate {} mapping entry: {} -> {}", name, slot.key(), to);
                }
                Entry::Occupied(slot) => {
                    return Err(LensError::DataFormat(format!(
                        "conflicting {} mapping for '{}': '{}' vs '{}'",
                        name,
                        slot.key(),
                        slot.get(),
                        to
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    fn from_trusted(pairs: &[(&str, &str)]) -> Self {
        Self {
            entries: pairs
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
        }
    }

    /// Returns the mapped value, or `key` itself when it has no entry.
    pub fn apply<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map_or(key, String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTables {
    pub version: String,
    pub company: MappingTable,
    pub line: MappingTable,
}

#[derive(Debug, Deserialize)]
struct MappingDocument {
    version: String,
    #[serde(default)]
    company: Vec<MappingEntry>,
    #[serde(default)]
    line: Vec<MappingEntry>,
}

#[derive(Debug, Deserialize)]
struct MappingEntry {
    from: String,
    to: String,
}

impl MappingTables {
    /// Tables compiled into the binary.
    pub fn builtin() -> &'static MappingTables {
        &BUILTIN
    }

    /// Parses a versioned mapping document:
    ///
    /// ```json
    /// { "version": "2025-06", "company": [{"from": "東京地下鉄", "to": "東京メトロ"}], "line": [] }
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: MappingDocument = serde_json::from_str(json)
            .map_err(|e| LensError::DataFormat(format!("invalid mapping document: {e}")))?;

        let company = MappingTable::from_pairs(
            "company",
            doc.company.into_iter().map(|e| (e.from, e.to)),
        )?;
        let line = MappingTable::from_pairs("line", doc.line.into_iter().map(|e| (e.from, e.to)))?;

        Ok(Self {
            version: doc.version,
            company,
            line,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let tables = Self::from_json_str(&json)?;
        info!(
            "Loaded mapping tables version {} from {} ({} company, {} line entries)",
            tables.version,
            path.display(),
            tables.company.len(),
            tables.line.len()
        );
        Ok(tables)
    }

    /// Loads `path` when given, otherwise returns a copy of the built-in tables.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin().clone()),
        }
    }
}
