//! Field projection.

use crate::record::{Record, get_path, set_path};

/// Rebuild each record with only the requested fields.
///
/// Dotted paths keep their nesting; fields absent on a record are omitted.
pub fn project(records: Vec<Record>, fields: &[String]) -> Vec<Record> {
    records
        .into_iter()
        .map(|record| {
            let mut out = Record::new();
            for field in fields.iter().map(|f| f.trim()).filter(|f| !f.is_empty()) {
                if let Some(value) = get_path(&record, field) {
                    set_path(&mut out, field, value.clone());
                }
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn product() -> Record {
        let mut specs = Record::new();
        specs.insert("color".into(), "red".into());
        specs.insert("size".into(), Value::Number(42.0));
        let mut record = Record::new();
        record.insert("title".into(), "Red Shoes".into());
        record.insert("price".into(), "$40".into());
        record.insert("specs".into(), Value::Map(specs));
        record
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_project_top_level() {
        let out = project(vec![product()], &fields(&["title"]));
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0]["title"], Value::from("Red Shoes"));
    }

    #[test]
    fn test_project_dotted_path() {
        let out = project(vec![product()], &fields(&["specs.color"]));
        let Value::Map(specs) = &out[0]["specs"] else { panic!("expected nested map") };
        assert_eq!(specs.len(), 1);
        assert_eq!(specs["color"], Value::from("red"));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let out = project(vec![product()], &fields(&["title", "rating", "specs.weight"]));
        assert_eq!(out[0].len(), 1);
        assert!(!out[0].contains_key("rating"));
    }

    #[test]
    fn test_projection_is_idempotent() {
        let f = fields(&["title", "specs.size"]);
        let once = project(vec![product()], &f);
        let twice = project(once.clone(), &f);
        assert_eq!(once, twice);
    }
}
