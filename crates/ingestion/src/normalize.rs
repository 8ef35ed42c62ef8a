//! Raw snapshot normalization.
//!
//! Run files arrive in several JSON shapes depending on the collector
//! version:
//! - a plain array of per-game objects,
//! - an envelope `{"data": [...]}`,
//! - a map keyed by game id with per-game objects as values.
//!
//! All three normalize to the same uniform [`RawGameDay`] rows. Field
//! names also drifted across collector versions, so identifiers and CCU
//! come from a list of alternatives. Missing fields default downstream;
//! only rows without any resolvable game id are dropped.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rte_core::{Error, GameId, RawGameDay, Result};
use serde_json::Value;

/// Accepted keys for the game identifier, in priority order.
const ID_KEYS: &[&str] = &["universeId", "universe_id", "id"];

/// Accepted keys for a raw concurrent-player count.
const CCU_KEYS: &[&str] = &["players", "playing", "ccu", "concurrentPlayers"];

/// First present value among `keys`.
fn first_of<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

/// Coerce a JSON value to f64: numbers directly, numeric strings parsed.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Coerce a JSON value to a game id: integers directly, numeric strings parsed.
fn as_game_id(value: &Value) -> Option<GameId> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<GameId>().ok(),
        _ => None,
    }
}

/// Extract prices from a monetization item list.
///
/// Entries are objects with a `price` field; entries whose price is
/// absent or not coercible to a float are skipped.
fn extract_prices(value: Option<&Value>) -> Vec<f64> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| item.as_object())
        .filter_map(|obj| obj.get("price"))
        .filter_map(as_f64)
        .collect()
}

/// Normalize one raw per-game object. Returns `None` when no id resolves.
fn normalize_row(obj: &serde_json::Map<String, Value>) -> Option<RawGameDay> {
    let game_id = first_of(obj, ID_KEYS).and_then(as_game_id)?;

    let count_of = |keys: &[&str]| first_of(obj, keys).and_then(as_f64).map(|v| v.max(0.0) as u64);

    Some(RawGameDay {
        game_id,
        name: obj.get("name").and_then(|v| v.as_str()).map(str::to_string),
        developer: obj
            .get("developer")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        avg_ccu: obj.get("avg_ccu").and_then(as_f64),
        ccu: first_of(obj, CCU_KEYS).and_then(as_f64),
        visits: first_of(obj, &["visits", "totalVisits"]).and_then(as_f64),
        favorites: first_of(obj, &["favorites", "favoritedCount"]).and_then(as_f64),
        likes: first_of(obj, &["likes", "thumbsUp"]).and_then(as_f64),
        gamepass_count: count_of(&["gamepassCount", "gamepass_count"]),
        dev_product_count: count_of(&["devProductCount", "dev_product_count"]),
        gamepass_prices: extract_prices(first_of(obj, &["gamepasses", "game_passes"])),
        dev_product_prices: extract_prices(first_of(obj, &["devProducts", "dev_products"])),
    })
}

/// Pull the row list out of one of the three accepted document shapes.
fn rows_of(doc: &Value, path: &Path) -> Result<Vec<Value>> {
    match doc {
        Value::Object(map) => {
            if let Some(Value::Array(rows)) = map.get("data") {
                return Ok(rows.clone());
            }
            if !map.is_empty() && map.values().all(|v| v.is_object()) {
                return Ok(map.values().cloned().collect());
            }
            Err(Error::input(format!(
                "unsupported JSON shape in {}",
                path.display()
            )))
        }
        Value::Array(rows) => Ok(rows.clone()),
        _ => Err(Error::input(format!(
            "unsupported JSON shape in {}",
            path.display()
        ))),
    }
}

/// Load and normalize one run file into uniform per-game rows.
///
/// `snapshot_date` is carried by the caller (it comes from the file
/// path, not the document) and is only used for logging here.
pub fn load_run_file(path: impl AsRef<Path>, snapshot_date: NaiveDate) -> Result<Vec<RawGameDay>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&text)?;

    let raw_rows = rows_of(&doc, path)?;
    let mut rows = Vec::with_capacity(raw_rows.len());
    let mut skipped = 0usize;
    for value in &raw_rows {
        match value.as_object().and_then(normalize_row) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!(
            %snapshot_date,
            path = %path.display(),
            skipped,
            "dropped rows without a resolvable game id"
        );
    }
    tracing::debug!(%snapshot_date, rows = rows.len(), "normalized run file");

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_temp(doc: &Value) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, serde_json::to_string(doc).unwrap()).unwrap();
        (dir, path)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_array_shape() {
        let doc = json!([
            {"universeId": 11, "name": "A", "playing": 120, "visits": 1000},
            {"universeId": 12, "name": "B", "visits": 500}
        ]);
        let (_dir, path) = write_temp(&doc);
        let rows = load_run_file(&path, date()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].game_id, 11);
        assert_eq!(rows[0].ccu, Some(120.0));
    }

    #[test]
    fn test_data_envelope_shape() {
        let doc = json!({"data": [{"id": "77", "visits": "42"}]});
        let (_dir, path) = write_temp(&doc);
        let rows = load_run_file(&path, date()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].game_id, 77);
        assert_eq!(rows[0].visits, Some(42.0));
    }

    #[test]
    fn test_keyed_map_shape() {
        let doc = json!({
            "11": {"universe_id": 11, "name": "A"},
            "12": {"universe_id": 12, "name": "B"}
        });
        let (_dir, path) = write_temp(&doc);
        let mut rows = load_run_file(&path, date()).unwrap();
        rows.sort_by_key(|r| r.game_id);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].game_id, 12);
    }

    #[test]
    fn test_unsupported_shape_is_error() {
        let doc = json!({"data": "not a list"});
        let (_dir, path) = write_temp(&doc);
        assert!(load_run_file(&path, date()).is_err());
    }

    #[test]
    fn test_price_extraction_skips_bad_entries() {
        let doc = json!([{
            "universeId": 5,
            "gamepasses": [
                {"price": 25},
                {"price": "10.5"},
                {"price": null},
                {"name": "no price"},
                "not an object"
            ],
            "devProducts": [{"price": 3}]
        }]);
        let (_dir, path) = write_temp(&doc);
        let rows = load_run_file(&path, date()).unwrap();
        assert_eq!(rows[0].gamepass_prices, vec![25.0, 10.5]);
        assert_eq!(rows[0].dev_product_prices, vec![3.0]);
        assert_eq!(rows[0].monetization_count(), 3);
    }

    #[test]
    fn test_rows_without_id_are_dropped() {
        let doc = json!([
            {"name": "orphan"},
            {"id": 9}
        ]);
        let (_dir, path) = write_temp(&doc);
        let rows = load_run_file(&path, date()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].game_id, 9);
    }
}
