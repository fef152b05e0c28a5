use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::NewItem;

#[derive(Debug)]
pub enum TicketImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for TicketImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketImportError::Io(err) => write!(f, "failed to read ticket export: {}", err),
            TicketImportError::Csv(err) => write!(f, "invalid ticket CSV data: {}", err),
        }
    }
}

impl std::error::Error for TicketImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TicketImportError::Io(err) => Some(err),
            TicketImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for TicketImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for TicketImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads bulk ticket exports with `title,description,price,tags` columns.
///
/// Tags are `;`-separated. Rows are returned as submissions; scoring happens on submit.
pub struct TicketCsvImporter;

impl TicketCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<NewItem>, TicketImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<NewItem>, TicketImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut submissions = Vec::new();

        for record in csv_reader.deserialize::<TicketRow>() {
            let row = record?;
            submissions.push(NewItem {
                title: row.title,
                description: row.description,
                amount: row.price,
                tags: split_tags(row.tags.as_deref()),
            });
        }

        Ok(submissions)
    }
}

#[derive(Debug, Deserialize)]
struct TicketRow {
    title: String,
    description: String,
    #[serde(default, deserialize_with = "empty_string_as_none_f64")]
    price: Option<f64>,
    #[serde(default)]
    tags: Option<String>,
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(';')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn empty_string_as_none_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
