//! Built-in postal code table (United States).
//!
//! USPS assigns every 5-digit zip to a state by its 3-digit prefix, so the
//! embedded document lists prefix ranges and the table is expanded to every
//! zip under an assigned prefix. It is parsed once per process.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;

use super::ZipLocation;

const US_ZIP_PREFIXES: &str = include_str!("../../data/us_zip_prefixes.json");

#[derive(Debug, Deserialize)]
struct PrefixDocument {
    country: String,
    #[serde(default)]
    unassigned: Vec<String>,
    ranges: Vec<PrefixRange>,
}

#[derive(Debug, Deserialize)]
struct PrefixRange {
    from: String,
    to: String,
    state: String,
}

static BUILTIN: LazyLock<HashMap<String, ZipLocation>> =
    LazyLock::new(|| match parse(US_ZIP_PREFIXES) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!(error = %e, "Built-in zip table is unreadable");
            HashMap::new()
        }
    });

/// The built-in table, keyed by 5-digit zip.
pub(super) fn builtin() -> &'static HashMap<String, ZipLocation> {
    &BUILTIN
}

fn parse(raw: &str) -> Result<HashMap<String, ZipLocation>, serde_json::Error> {
    let doc: PrefixDocument = serde_json::from_str(raw)?;
    let mut table = HashMap::new();

    for range in &doc.ranges {
        let (Ok(from), Ok(to)) = (range.from.parse::<u16>(), range.to.parse::<u16>()) else {
            tracing::warn!(from = %range.from, to = %range.to, "Skipping malformed zip prefix range");
            continue;
        };
        for prefix in from..=to {
            let prefix = format!("{prefix:03}");
            if doc.unassigned.contains(&prefix) {
                continue;
            }
            for suffix in 0..100 {
                table.insert(
                    format!("{prefix}{suffix:02}"),
                    ZipLocation {
                        state: range.state.clone(),
                        country: doc.country.clone(),
                    },
                );
            }
        }
    }
    Ok(table)
}
