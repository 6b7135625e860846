//! Integration tests for the merge engine.
//!
//! These tests merge the fixture documents end to end and check the unified
//! components, references, dependency graph and warnings.

use sbom_merge::{
    merge::MergeEngine, model::TargetSchemaVersion, parse_bom_str, Bom, Component, MergeOptions,
    SpecVersion, WarningKind,
};
use serde_json::json;
use std::path::Path;

// ============================================================================
// Test Fixtures
// ============================================================================

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture(name: &str) -> Bom {
    let path = Path::new(FIXTURES_DIR).join(name);
    let content = std::fs::read_to_string(&path).expect("fixture should exist");
    parse_bom_str(&content).expect("fixture should parse")
}

fn app() -> Bom {
    fixture("cyclonedx/app.cdx.json")
}

fn scan() -> Bom {
    fixture("cyclonedx/scan.cdx.json")
}

fn legacy() -> Bom {
    fixture("cyclonedx/legacy.cdx.json")
}

fn component<'a>(bom: &'a Bom, reference: &str) -> &'a Component {
    bom.all_components()
        .find(|c| c.bom_ref.as_deref() == Some(reference))
        .unwrap_or_else(|| panic!("no component '{reference}'"))
}

fn depends_on(bom: &Bom, reference: &str) -> Vec<String> {
    bom.dependencies
        .iter()
        .find(|d| d.reference == reference)
        .map(|d| d.depends_on.clone())
        .unwrap_or_default()
}

fn doc(version: &str, components: serde_json::Value) -> Bom {
    serde_json::from_value(json!({
        "bomFormat": "CycloneDX",
        "specVersion": version,
        "components": components,
    }))
    .expect("valid document")
}

// ============================================================================
// Identity and references
// ============================================================================

mod identity_tests {
    use super::*;

    #[test]
    fn test_same_purl_unifies_and_refs_are_rewritten() {
        let outcome = MergeEngine::new().merge(&[app(), scan()]).unwrap();
        let merged = &outcome.document;

        let names: Vec<&str> = merged.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["lodash", "express", "debug"]);

        // npm-lodash from the second input now points at the unified "lodash"
        assert!(depends_on(merged, "express-1").contains(&"lodash".to_string()));
        assert!(merged
            .dependencies
            .iter()
            .all(|d| d.reference != "npm-lodash" && d.reference != "scan-root"));
    }

    #[test]
    fn test_colliding_ref_is_renamed_with_warning() {
        let outcome = MergeEngine::new().merge(&[app(), scan()]).unwrap();

        let debug = component(&outcome.document, "express-1");
        assert_eq!(debug.name, "debug");
        assert_eq!(component(&outcome.document, "express").name, "express");

        let renamed: Vec<_> = outcome
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::ReferenceRenamed)
            .collect();
        assert_eq!(renamed.len(), 1);
        assert_eq!(renamed[0].subject, "express");
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_lower_priority_identifiers_still_match() {
        // legacy's Express has a cpe and coordinates but no purl
        let outcome = MergeEngine::new().merge(&[app(), legacy()]).unwrap();
        let express = component(&outcome.document, "express");

        assert_eq!(express.purl.as_deref(), Some("pkg:npm/express@4.18.2"));
        assert!(express.cpe.as_deref().is_some_and(|c| c.contains("expressjs")));
        assert_eq!(express.name, "express");
        assert!(!outcome
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::FieldConflict));
    }

    #[test]
    fn test_purl_takes_precedence_over_cpe() {
        let a = doc(
            "1.5",
            json!([{"type": "library", "bom-ref": "a", "name": "zlib", "version": "1.3",
                    "purl": "pkg:generic/zlib@1.3", "cpe": "cpe:2.3:a:zlib:zlib:1.3:*:*:*:*:*:*:*"}]),
        );
        let b = doc(
            "1.5",
            json!([{"type": "library", "bom-ref": "b", "name": "zlib", "version": "1.3",
                    "purl": "pkg:generic/zlib@1.3", "cpe": "cpe:2.3:a:gnu:zlib:1.3:*:*:*:*:*:*:*"}]),
        );
        let outcome = MergeEngine::new().merge(&[a, b]).unwrap();

        assert_eq!(outcome.document.components.len(), 1);
        let conflict = outcome
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::FieldConflict)
            .expect("cpe conflict");
        assert_eq!(conflict.field.as_deref(), Some("cpe"));
        assert!(outcome.document.components[0]
            .cpe
            .as_deref()
            .is_some_and(|c| c.contains(":zlib:zlib:")));
    }

    #[test]
    fn test_different_purls_with_same_coordinates_stay_distinct() {
        let a = doc(
            "1.5",
            json!([{"type": "library", "bom-ref": "a", "name": "util", "version": "1",
                    "purl": "pkg:npm/util@1"}]),
        );
        let b = doc(
            "1.5",
            json!([{"type": "library", "bom-ref": "b", "name": "util", "version": "1",
                    "purl": "pkg:pypi/util@1"}]),
        );
        let outcome = MergeEngine::new().merge(&[a, b]).unwrap();
        assert_eq!(outcome.document.components.len(), 2);
    }

    #[test]
    fn test_unresolvable_component_is_kept_with_warning() {
        let outcome = MergeEngine::new().merge(&[app(), legacy()]).unwrap();

        assert_eq!(component(&outcome.document, "blob").component_type, "file");
        assert_eq!(outcome.stats.unresolvable_components, 1);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::UnresolvableIdentity && w.subject == "blob"));
    }

    #[test]
    fn test_root_components_unify() {
        let outcome = MergeEngine::new().merge(&[app(), scan()]).unwrap();
        let root = outcome
            .document
            .root_component()
            .expect("root component");
        assert_eq!(root.bom_ref.as_deref(), Some("app"));
        // scan-root's dependency entry was folded into the unified root
        assert_eq!(
            depends_on(&outcome.document, "app"),
            vec!["lodash", "express", "express-1"]
        );
    }
}

// ============================================================================
// Field merging
// ============================================================================

mod field_tests {
    use super::*;

    fn licenses(component: &Component) -> Vec<String> {
        let mut ids: Vec<String> = component
            .licenses
            .iter()
            .filter_map(|l| l.license.as_ref().and_then(|l| l.id.clone()))
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_license_union_does_not_depend_on_order() {
        let forward = MergeEngine::new().merge(&[app(), scan()]).unwrap();
        let backward = MergeEngine::new().merge(&[scan(), app()]).unwrap();

        let forward_lodash = component(&forward.document, "lodash");
        let backward_lodash = component(&backward.document, "npm-lodash");
        assert_eq!(licenses(forward_lodash), vec!["CC0-1.0", "MIT"]);
        assert_eq!(licenses(forward_lodash), licenses(backward_lodash));
    }

    #[test]
    fn test_license_sets_union_without_duplicates() {
        let with_licenses = |ids: &[&str]| {
            let licenses: Vec<_> = ids.iter().map(|id| json!({"license": {"id": id}})).collect();
            doc(
                "1.5",
                json!([{"type": "library", "name": "x", "purl": "pkg:npm/x@1",
                        "licenses": licenses}]),
            )
        };
        let ab = with_licenses(&["A", "B"]);
        let bc = with_licenses(&["B", "C"]);

        for inputs in [[ab.clone(), bc.clone()], [bc, ab]] {
            let outcome = MergeEngine::new().merge(&inputs).unwrap();
            assert_eq!(licenses(&outcome.document.components[0]), vec!["A", "B", "C"]);
            assert!(outcome.warnings.is_empty());
        }
    }

    #[test]
    fn test_hashes_union_by_algorithm() {
        let outcome = MergeEngine::new().merge(&[app(), scan()]).unwrap();
        let algorithms: Vec<&str> = component(&outcome.document, "lodash")
            .hashes
            .iter()
            .map(|h| h.alg.as_str())
            .collect();
        assert_eq!(algorithms, vec!["SHA-256", "SHA-1"]);
    }

    #[test]
    fn test_missing_scalar_is_adopted() {
        let outcome = MergeEngine::new().merge(&[app(), scan()]).unwrap();
        let lodash = component(&outcome.document, "lodash");
        assert_eq!(
            lodash.extensions.get("description"),
            Some(&json!("Lodash modular utilities."))
        );
    }

    #[test]
    fn test_first_input_wins_conflicts() {
        let first = doc(
            "1.5",
            json!([{"type": "library", "bom-ref": "x", "name": "x", "purl": "pkg:npm/x@1",
                    "description": "from first"}]),
        );
        let second = doc(
            "1.5",
            json!([{"type": "library", "bom-ref": "x", "name": "x", "purl": "pkg:npm/x@1",
                    "description": "from second"}]),
        );

        let outcome = MergeEngine::new()
            .merge(&[first.clone(), second.clone()])
            .unwrap();
        let kept = &outcome.document.components[0];
        assert_eq!(kept.extensions.get("description"), Some(&json!("from first")));
        let conflict = outcome
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::FieldConflict)
            .expect("conflict warning");
        assert_eq!(conflict.field.as_deref(), Some("description"));

        let swapped = MergeEngine::new().merge(&[second, first]).unwrap();
        assert_eq!(
            swapped.document.components[0].extensions.get("description"),
            Some(&json!("from second"))
        );
    }

    #[test]
    fn test_unknown_fields_survive() {
        let first = doc(
            "1.5",
            json!([{"type": "library", "name": "x", "purl": "pkg:npm/x@1",
                    "x-internal": {"team": "core"}}]),
        );
        let second = doc(
            "1.5",
            json!([{"type": "library", "name": "x", "purl": "pkg:npm/x@1",
                    "x-internal": {"owner": "alice"}}]),
        );
        let outcome = MergeEngine::new().merge(&[first, second]).unwrap();
        assert_eq!(
            outcome.document.components[0].extensions.get("x-internal"),
            Some(&json!({"team": "core", "owner": "alice"}))
        );
    }
}

// ============================================================================
// Dependency graph
// ============================================================================

mod graph_tests {
    use super::*;

    #[test]
    fn test_edges_are_unioned_without_duplicates() {
        let outcome = MergeEngine::new().merge(&[app(), scan()]).unwrap();
        let merged = &outcome.document;

        assert_eq!(depends_on(merged, "express"), vec!["lodash"]);
        assert_eq!(depends_on(merged, "express-1"), vec!["lodash"]);
        assert!(depends_on(merged, "lodash").is_empty());
        assert_eq!(outcome.stats.edges, 5);
    }

    #[test]
    fn test_edges_from_both_inputs_are_kept() {
        let graph = |target: &str| -> Bom {
            serde_json::from_value(json!({
                "bomFormat": "CycloneDX",
                "specVersion": "1.5",
                "components": [
                    {"type": "library", "bom-ref": "x", "name": "x", "purl": "pkg:npm/x@1"},
                    {"type": "library", "bom-ref": target, "name": target,
                     "purl": format!("pkg:npm/{target}@1")}
                ],
                "dependencies": [{"ref": "x", "dependsOn": [target]}]
            }))
            .unwrap()
        };

        let outcome = MergeEngine::new().merge(&[graph("y"), graph("z")]).unwrap();
        assert_eq!(depends_on(&outcome.document, "x"), vec!["y", "z"]);
        assert_eq!(outcome.stats.edges, 2);
    }

    #[test]
    fn test_dangling_reference_warns_by_default() {
        let outcome = MergeEngine::new().merge(&[app(), legacy()]).unwrap();
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::DanglingReference && w.subject == "ghost"));
        // the legacy express entry is folded into the unified one
        assert_eq!(depends_on(&outcome.document, "express"), vec!["lodash"]);
    }

    #[test]
    fn test_dangling_reference_is_fatal_when_strict() {
        let err = MergeEngine::new()
            .strict_references(true)
            .merge(&[app(), legacy()])
            .unwrap_err();
        assert!(err.is_malformed_input());
    }
}

// ============================================================================
// Whole-document properties
// ============================================================================

mod document_tests {
    use super::*;

    #[test]
    fn test_merging_a_document_with_itself_is_identity() {
        let outcome = MergeEngine::new().merge(&[app(), app()]).unwrap();
        assert_eq!(outcome.document, app());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_pairwise_fold_matches_n_way_merge() {
        let engine = MergeEngine::new();
        let n_way = engine.merge(&[app(), scan(), legacy()]).unwrap();

        let first = engine.merge(&[app(), scan()]).unwrap();
        let folded = engine.merge(&[first.document, legacy()]).unwrap();

        assert_eq!(n_way.document.components, folded.document.components);
        assert_eq!(n_way.document.dependencies, folded.document.dependencies);
        assert_eq!(n_way.document.metadata, folded.document.metadata);
    }

    #[test]
    fn test_document_level_fields_come_from_first_input() {
        let outcome = MergeEngine::new().merge(&[app(), scan()]).unwrap();
        let merged = &outcome.document;

        assert_eq!(
            merged.serial_number.as_deref(),
            Some("urn:uuid:3e671687-395b-41f5-a30f-a58921a69b79")
        );
        assert_eq!(merged.version, Some(1));
        let timestamp = merged
            .metadata
            .as_ref()
            .and_then(|m| m.extensions.get("timestamp"));
        assert_eq!(timestamp, Some(&json!("2024-01-15T10:00:00Z")));
    }

    #[test]
    fn test_stats() {
        let outcome = MergeEngine::new()
            .merge(&[app(), scan(), legacy()])
            .unwrap();
        let stats = outcome.stats;
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.input_components, 8);
        assert_eq!(stats.unified_components, 5);
        assert_eq!(stats.merged_components, 3);
        assert_eq!(stats.warnings, outcome.warnings.len());
    }
}

// ============================================================================
// Schema versions
// ============================================================================

mod schema_tests {
    use super::*;

    #[test]
    fn test_highest_common_version_and_schema_url() {
        let outcome = MergeEngine::new()
            .merge(&[app(), scan(), legacy()])
            .unwrap();
        assert_eq!(outcome.document.spec_version, "1.6");
        assert_eq!(
            outcome.document.extensions.get("$schema"),
            Some(&json!("http://cyclonedx.org/schema/bom-1.6.schema.json"))
        );
    }

    #[test]
    fn test_explicit_target_upgrades() {
        let options = MergeOptions {
            target_schema_version: TargetSchemaVersion::Explicit(SpecVersion::V1_6),
            ..MergeOptions::default()
        };
        let outcome = sbom_merge::merge(&[app(), legacy()], &options).unwrap();
        assert_eq!(outcome.document.spec_version, "1.6");
    }

    #[test]
    fn test_explicit_target_older_than_input_fails() {
        let err = MergeEngine::new()
            .with_target_schema_version(TargetSchemaVersion::Explicit(SpecVersion::V1_4))
            .merge(&[app(), scan()])
            .unwrap_err();
        assert!(err.is_incompatible_schema());
    }

    #[test]
    fn test_major_version_mismatch_fails() {
        let future = doc("2.0", json!([]));
        let err = MergeEngine::new().merge(&[app(), future]).unwrap_err();
        assert!(err.is_incompatible_schema());
    }

    #[test]
    fn test_no_inputs_fails() {
        assert!(MergeEngine::new().merge(&[]).is_err());
    }
}
