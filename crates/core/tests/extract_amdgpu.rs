#![cfg(feature = "amdgpu-backend")]

mod common;

use bridge_core::binary::{parse_binary, read_binary, Architecture};
use bridge_core::model::{AddressSpace, LaunchAttributes, ParamType, ScalarType};
use bridge_core::services::extract::{default_extractor_registry, extract_kernels, ExtractError};

use common::{amdgpu_object, sample_kernels, x86_64_object, KernelSymbol, GFX90A};

#[test]
fn kernel_add_overloads_come_back_in_address_order() {
    let bytes = amdgpu_object(GFX90A, &sample_kernels(), Some(1));
    let binary = parse_binary(&bytes).expect("parse fixture");
    assert_eq!(binary.architecture, Architecture::Amdgpu);

    let map = extract_kernels(&binary).expect("extract");
    assert_eq!(map.processor.as_deref(), Some("gfx90a"));
    assert_eq!(map.names(), vec!["kernel_add", "barrier_only"]);

    let add = map.get("kernel_add").unwrap();
    assert_eq!(add.len(), 2);
    assert_eq!(add[0].symbol, "kernel_add__i32_i32");
    assert_eq!(
        add[0].params,
        vec![ParamType::Scalar(ScalarType::I32), ParamType::Scalar(ScalarType::I32)]
    );
    assert_eq!(add[1].symbol, "kernel_add__f32_f32");
    assert_eq!(
        add[1].launch,
        LaunchAttributes { group_segment_size: 256, private_segment_size: 16, kernarg_size: 8 }
    );
    assert!(add[0].address < add[1].address);

    assert!(map.get("barrier_only").unwrap()[0].params.is_empty());
    assert_eq!(
        map.diagnostics(),
        vec!["kernel_add(i32, i32)", "kernel_add(f32, f32)", "barrier_only()"]
    );
}

#[test]
fn address_order_wins_over_symbol_table_order() {
    // f32 instantiation laid out first this time.
    let kernels = vec![
        KernelSymbol::new("scale__f32_pf32", 16),
        KernelSymbol::new("scale__i32_pi32", 16),
    ];
    let binary = parse_binary(&amdgpu_object(GFX90A, &kernels, None)).unwrap();
    let map = extract_kernels(&binary).unwrap();
    let scale = map.get("scale").unwrap();
    assert_eq!(scale[0].symbol, "scale__f32_pf32");
    assert_eq!(
        scale[0].params[1],
        ParamType::Pointer { space: AddressSpace::Global, elem: ScalarType::F32, mutable: true }
    );
    assert_eq!(scale[1].symbol, "scale__i32_pi32");
}

#[test]
fn binary_without_kernels_yields_empty_map() {
    let map = extract_kernels(&parse_binary(&amdgpu_object(GFX90A, &[], None)).unwrap()).unwrap();
    assert!(map.is_empty());
    assert_eq!(map.overload_count(), 0);
    assert_eq!(map.architecture, Architecture::Amdgpu);
}

#[test]
fn host_object_is_an_unsupported_platform() {
    let binary = parse_binary(&x86_64_object()).unwrap();
    match extract_kernels(&binary) {
        Err(ExtractError::UnsupportedPlatform { architecture, supported }) => {
            assert_eq!(architecture, Architecture::X86_64);
            assert_eq!(supported, vec!["amdgpu".to_string()]);
        }
        other => panic!("expected unsupported platform, got {other:?}"),
    }
}

#[test]
fn one_malformed_overload_fails_the_whole_binary() {
    let mut kernels = sample_kernels();
    kernels.push(KernelSymbol::new("broken__i32_q7", 8));
    let err = extract_kernels(&parse_binary(&amdgpu_object(GFX90A, &kernels, None)).unwrap())
        .unwrap_err();
    match err {
        ExtractError::MalformedKernelMetadata { symbol, reason } => {
            assert_eq!(symbol, "broken__i32_q7.kd");
            assert!(reason.contains("q7"), "reason: {reason}");
        }
        other => panic!("expected malformed metadata, got {other:?}"),
    }
}

#[test]
fn malformed_metadata_cases_are_reported() {
    let cases: Vec<(Vec<KernelSymbol>, Option<u64>, &str)> = vec![
        (vec![KernelSymbol::new("dangling__i32", 4).without_code()], None, "no code symbol"),
        (vec![KernelSymbol::new("tight__i64_i64", 8)], None, "kernarg_size"),
        (
            vec![KernelSymbol::new("twice__v", 0), KernelSymbol::new("twice__v", 0)],
            None,
            "duplicate",
        ),
        (vec![KernelSymbol::new("nosig", 0)], None, "separator"),
        (sample_kernels(), Some(2), "encoding version"),
    ];
    for (kernels, version, needle) in cases {
        let binary = parse_binary(&amdgpu_object(GFX90A, &kernels, version)).unwrap();
        let err = extract_kernels(&binary).unwrap_err();
        assert!(
            matches!(err, ExtractError::MalformedKernelMetadata { .. }),
            "expected malformed for {needle}, got {err:?}"
        );
        assert!(err.to_string().contains(needle), "'{err}' should mention '{needle}'");
    }
}

#[test]
fn extraction_is_deterministic() {
    let temp = tempfile::tempdir().unwrap();
    let bytes = amdgpu_object(GFX90A, &sample_kernels(), Some(1));
    let path = common::write_file(temp.path(), "device.o", &bytes);
    let registry = default_extractor_registry();
    let first = registry.extract(&read_binary(&path).unwrap()).unwrap();
    let second = registry.extract(&read_binary(&path).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn unknown_processor_is_named_by_mach_value() {
    let map = extract_kernels(&parse_binary(&amdgpu_object(0x7a, &[], None)).unwrap()).unwrap();
    assert_eq!(map.processor.as_deref(), Some("gfx-0x7a"));
}
