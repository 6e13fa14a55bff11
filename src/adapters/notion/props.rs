//! Notion property payload builders and extractors.
//!
//! Notion pages carry typed property objects; these helpers keep the JSON
//! shapes in one place so the store reads like field mapping, not payload
//! assembly.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Notion caps a single rich-text block at 2000 characters; longer content
/// is split across blocks.
const RICH_TEXT_CHUNK: usize = 2000;

pub fn title(text: &str) -> Value {
    json!({ "title": [{ "text": { "content": text } }] })
}

pub fn rich_text(text: &str) -> Value {
    let blocks: Vec<Value> = chunks(text)
        .map(|chunk| json!({ "text": { "content": chunk } }))
        .collect();
    json!({ "rich_text": blocks })
}

pub fn select(name: &str) -> Value {
    json!({ "select": { "name": name } })
}

pub fn multi_select<'a>(names: impl IntoIterator<Item = &'a str>) -> Value {
    let options: Vec<Value> = names.into_iter().map(|n| json!({ "name": n })).collect();
    json!({ "multi_select": options })
}

pub fn date(value: DateTime<Utc>) -> Value {
    json!({ "date": { "start": value.to_rfc3339() } })
}

pub fn email(address: &str) -> Value {
    json!({ "email": address })
}

fn chunks(text: &str) -> impl Iterator<Item = &str> + '_ {
    // Split on char boundaries, not bytes.
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let mut end = rest.len().min(RICH_TEXT_CHUNK);
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

/// Concatenated plain text of a title property.
pub fn title_text(page: &Value, name: &str) -> String {
    plain_text(&page["properties"][name]["title"])
}

/// Concatenated plain text of a rich-text property.
pub fn rich_text_text(page: &Value, name: &str) -> String {
    plain_text(&page["properties"][name]["rich_text"])
}

pub fn select_name(page: &Value, name: &str) -> Option<String> {
    page["properties"][name]["select"]["name"]
        .as_str()
        .map(ToString::to_string)
}

pub fn multi_select_names(page: &Value, name: &str) -> Vec<String> {
    page["properties"][name]["multi_select"]
        .as_array()
        .map(|options| {
            options
                .iter()
                .filter_map(|o| o["name"].as_str())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn email_value(page: &Value, name: &str) -> Option<String> {
    page["properties"][name]["email"]
        .as_str()
        .map(ToString::to_string)
}

pub fn date_value(page: &Value, name: &str) -> Option<DateTime<Utc>> {
    page["properties"][name]["date"]["start"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// The page's own last-edited timestamp (top-level, not a property).
pub fn last_edited(page: &Value) -> Option<DateTime<Utc>> {
    page["last_edited_time"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn plain_text(blocks: &Value) -> String {
    blocks
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|b| {
                    b["text"]["content"]
                        .as_str()
                        .or_else(|| b["plain_text"].as_str())
                })
                .collect::<String>()
        })
        .unwrap_or_default()
}
