use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

use crate::region::RegionProfile;

/// Older documents keep climate tables under one of these keys.
const LEGACY_NESTS: [&str; 2] = ["climate", "parameters"];

/// Load region profiles from a JSON file holding one document or an array.
pub fn load_regions(path: &Path) -> Result<Vec<RegionProfile>> {
    let file =
        File::open(path).with_context(|| format!("failed to open region file {:?}", path))?;
    from_reader(BufReader::new(file)).with_context(|| format!("in region file {:?}", path))
}

pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RegionProfile>> {
    let document: Value = serde_json::from_reader(reader).context("invalid region json")?;
    let documents = match document {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        other => bail!("expected a region object or array, found {}", kind_of(&other)),
    };

    documents
        .into_iter()
        .enumerate()
        .map(|(index, document)| {
            let region = parse_region(document)
                .with_context(|| format!("region #{} is malformed", index))?;
            region
                .validate()
                .with_context(|| format!("region #{} ({:?}) failed validation", index, region.id))?;
            Ok(region)
        })
        .collect()
}

fn parse_region(document: Value) -> Result<RegionProfile> {
    let fields = match document {
        Value::Object(fields) => fields,
        other => bail!("expected an object, found {}", kind_of(&other)),
    };
    let normalized = flatten_legacy(fields);
    Ok(serde_json::from_value(Value::Object(normalized))?)
}

/// Lift fields out of a legacy `climate` or `parameters` block. Top-level
/// fields win when both are present.
pub fn flatten_legacy(mut fields: Map<String, Value>) -> Map<String, Value> {
    for key in LEGACY_NESTS {
        if let Some(Value::Object(nested)) = fields.remove(key) {
            for (name, value) in nested {
                fields.entry(name).or_insert(value);
            }
        }
    }
    fields
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
