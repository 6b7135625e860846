//! Property-based tests for identity resolution and merging.
//!
//! Ensures identity comparison behaves like an equivalence on resolvable
//! components and that merging is stable under repetition.

use proptest::prelude::*;
use sbom_merge::merge::union_values;
use sbom_merge::{same_entity, Bom, Component, MergeEngine, SpecVersion};
use serde_json::Value;

fn component_strategy() -> impl Strategy<Value = Component> {
    (
        "[a-z]{1,8}",
        proptest::option::of("[0-9]\\.[0-9]{1,2}"),
        proptest::option::of("(npm|pypi|cargo)"),
    )
        .prop_map(|(name, version, ecosystem)| {
            let mut component = Component::new("library", name.clone());
            component.version = version.clone();
            if let Some(ecosystem) = ecosystem {
                let at = version.map(|v| format!("@{v}")).unwrap_or_default();
                component.purl = Some(format!("pkg:{ecosystem}/{name}{at}"));
            }
            component
        })
}

fn bom_of(components: Vec<Component>) -> Bom {
    let mut bom = Bom::new(SpecVersion::V1_5);
    bom.components = components;
    bom
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn same_entity_is_reflexive(component in component_strategy()) {
        prop_assert!(same_entity(&component, &component));
    }

    #[test]
    fn same_entity_is_symmetric(a in component_strategy(), b in component_strategy()) {
        prop_assert_eq!(same_entity(&a, &b), same_entity(&b, &a));
    }

    #[test]
    fn name_case_does_not_change_identity(component in component_strategy()) {
        let mut shouting = component.clone();
        shouting.name = component.name.to_uppercase();
        prop_assert!(same_entity(&component, &shouting));
    }

    #[test]
    fn merging_twice_adds_nothing(components in proptest::collection::vec(component_strategy(), 0..12)) {
        let engine = MergeEngine::new();
        let once = engine.merge(&[bom_of(components.clone())]).unwrap();
        let twice = engine
            .merge(&[bom_of(components.clone()), bom_of(components)])
            .unwrap();
        prop_assert_eq!(
            once.stats.unified_components,
            twice.stats.unified_components
        );
    }

    #[test]
    fn union_keeps_every_value_once(
        a in proptest::collection::vec(0u8..6, 0..8),
        b in proptest::collection::vec(0u8..6, 0..8),
    ) {
        let a: Vec<Value> = a.into_iter().map(Value::from).collect();
        let b: Vec<Value> = b.into_iter().map(Value::from).collect();
        let merged = union_values(&a, &b);

        for value in a.iter().chain(&b) {
            prop_assert_eq!(merged.iter().filter(|v| *v == value).count(), 1);
        }
        prop_assert_eq!(union_values(&merged, &merged), merged.clone());
    }
}
