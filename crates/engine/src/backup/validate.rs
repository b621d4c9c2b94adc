use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::Archive;

const DATA_KEYS: [&str; 6] = [
    "locations",
    "players",
    "sessions",
    "session_participants",
    "payments",
    "player_balances",
];

struct Checker<'a> {
    errors: &'a mut Vec<String>,
    table: &'static str,
    index: usize,
    record: &'a Map<String, Value>,
}

impl Checker<'_> {
    fn push(&mut self, message: &str) {
        self.errors
            .push(format!("{}[{}]: {message}", self.table, self.index));
    }

    fn text(&mut self, key: &str) {
        match self.record.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            Some(Value::String(_)) => self.push(&format!("{key} must not be empty")),
            None | Some(Value::Null) => self.push(&format!("missing {key}")),
            Some(_) => self.push(&format!("{key} must be a string")),
        }
    }

    fn date(&mut self, key: &str) {
        match self.record.get(key) {
            Some(Value::String(s)) => {
                if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() {
                    self.push(&format!("{key} is not a YYYY-MM-DD date"));
                }
            }
            None | Some(Value::Null) => self.push(&format!("missing {key}")),
            Some(_) => self.push(&format!("{key} must be a date string")),
        }
    }

    fn number(&mut self, key: &str, required: bool) {
        match self.record.get(key) {
            Some(Value::Number(_)) => {}
            None | Some(Value::Null) if !required => {}
            None | Some(Value::Null) => self.push(&format!("missing {key}")),
            Some(_) => self.push(&format!("{key} must be a number")),
        }
    }
}

/// Checks an archive document and collects every defect found.
///
/// The checks are structural (sections present, data tables are arrays) and
/// per record (required references, dates and numeric amounts). An empty
/// list means the document can be imported.
pub fn validate_archive(document: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(root) = document.as_object() else {
        errors.push("archive must be a JSON object".to_string());
        return errors;
    };
    if !root.get("metadata").is_some_and(Value::is_object) {
        errors.push("missing metadata section".to_string());
    }
    let Some(data) = root.get("data").and_then(Value::as_object) else {
        errors.push("missing data section".to_string());
        return errors;
    };

    for table in DATA_KEYS {
        let records = match data.get(table) {
            None => continue,
            Some(Value::Array(records)) => records,
            Some(_) => {
                errors.push(format!("data.{table} must be an array"));
                continue;
            }
        };
        for (index, record) in records.iter().enumerate() {
            let Some(record) = record.as_object() else {
                errors.push(format!("{table}[{index}]: record must be an object"));
                continue;
            };
            let mut check = Checker {
                errors: &mut errors,
                table,
                index,
                record,
            };
            match table {
                "locations" => {
                    check.text("id");
                    check.text("name");
                    check.text("organizer_id");
                }
                "players" => {
                    check.text("id");
                    check.text("name");
                    check.text("organizer_id");
                }
                "sessions" => {
                    check.text("id");
                    check.date("date");
                    check.text("organizer_id");
                    check.number("court_cost", true);
                    check.number("shuttlecock_cost", true);
                    check.number("other_costs", false);
                }
                "session_participants" => {
                    check.text("id");
                    check.text("session_id");
                    check.text("player_id");
                    check.number("amount_owed", false);
                }
                "payments" => {
                    check.text("id");
                    check.text("player_id");
                    check.text("organizer_id");
                    check.number("amount", true);
                    check.date("payment_date");
                }
                _ => {
                    check.text("player_id");
                    check.text("organizer_id");
                }
            }
        }
    }

    errors
}

/// Validates and converts a document into a typed archive.
pub(crate) fn parse_validated(document: serde_json::Value) -> Result<Archive, Vec<String>> {
    let errors = validate_archive(&document);
    if !errors.is_empty() {
        return Err(errors);
    }
    serde_json::from_value(document).map_err(|err| vec![format!("archive is malformed: {err}")])
}
