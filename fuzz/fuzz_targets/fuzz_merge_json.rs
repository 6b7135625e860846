#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_merge::{merge_vex, parse_bom_str, MergeEngine};

const MAX_WRAPPED_INPUT_LEN: usize = 10_000;

const BASE: &str = r#"{"bomFormat":"CycloneDX","specVersion":"1.5","components":[
    {"type":"library","bom-ref":"a","name":"a","version":"1","purl":"pkg:npm/a@1"}],
    "dependencies":[{"ref":"a","dependsOn":[]}]}"#;

/// Fuzz parsing and merging of CycloneDX JSON.
///
/// The input is merged against a small fixed document in both orders, and
/// also wrapped as a component list so that identity resolution and
/// reference rewriting are reached.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(base) = parse_bom_str(BASE) else {
        return;
    };
    let engine = MergeEngine::new();

    if let Ok(bom) = parse_bom_str(s) {
        let _ = engine.merge(&[base.clone(), bom.clone()]);
        let _ = engine.merge(&[bom.clone(), base.clone()]);
        let _ = merge_vex(&base, &[bom]);
    }

    if s.len() < MAX_WRAPPED_INPUT_LEN {
        let wrapped = format!(
            r#"{{"bomFormat":"CycloneDX","specVersion":"1.5","components":[{s}]}}"#,
        );
        if let Ok(bom) = parse_bom_str(&wrapped) {
            let _ = engine.merge(&[base, bom]);
        }
    }
});
