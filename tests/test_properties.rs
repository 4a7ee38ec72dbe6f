//! Property tests for helpers, field maps, safe access and script entries.

use pdf_formfill::{Context, Error, Evaluator, FieldMap, Helpers, Map, ScriptEntry, Value};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_currency_round_trip(cents in 0u64..10_000_000_000u64) {
        let helpers = Helpers::default();
        let x = cents as f64 / 100.0;
        let formatted = helpers.currency(&Value::Number(x));
        let parsed = helpers.parse_currency(&Value::String(formatted.clone()));
        prop_assert_eq!(parsed, Value::Number(x), "formatted as {}", formatted);
    }

    #[test]
    fn prop_currency_rounds_to_two_places(x in 0.0f64..1.0e9) {
        let helpers = Helpers::default();
        let parsed = helpers.parse_currency(&Value::String(helpers.currency(&Value::Number(x))));
        let Value::Number(n) = parsed else {
            return Err(TestCaseError::fail("parseCurrency returned a non-number"));
        };
        prop_assert!((n - x).abs() <= 0.005 + 1e-6, "{} vs {}", n, x);
    }

    #[test]
    fn prop_resolver_finds_unique_ids(names in prop::collection::hash_set("[a-z]{1,8}\\[[0-9]\\]", 1..20)) {
        let names: Vec<String> = names.into_iter().collect();
        let map = FieldMap::from_field_names(names.clone());
        for (i, name) in names.iter().enumerate() {
            prop_assert_eq!(map.resolve(&i.to_string()), Some(name.as_str()));
        }
        prop_assert_eq!(map.resolve(&names.len().to_string()), None);
        prop_assert_eq!(map.resolve("-1"), None);
    }

    #[test]
    fn prop_missing_paths_are_empty(path in prop::collection::vec("[a-z]{1,6}", 1..5)) {
        let mut config = Map::new();
        config.insert("present".to_string(), Value::from("yes"));
        let context = Context::new(config).unwrap();

        let segments: Vec<String> = path.iter().map(|s| format!("k{}", s)).collect();
        let template = format!("ctx.missing.{}", segments.join("."));
        let value = Evaluator::default().eval_template(&context, &template).unwrap();
        prop_assert_eq!(value, Value::from(""));
    }

    #[test]
    fn prop_multi_index_entries_fail(key in "[a-z_.]{1,12}", count in 2usize..6) {
        let pairs = (0..count).map(|i| (i.to_string(), "ctx.x".to_string())).collect();
        let entry = ScriptEntry::Indexed(pairs);
        match entry.single_index(&key) {
            Err(Error::AmbiguousEntry(named)) => prop_assert_eq!(named, key),
            other => return Err(TestCaseError::fail(format!("unexpected {:?}", other))),
        }
    }
}
