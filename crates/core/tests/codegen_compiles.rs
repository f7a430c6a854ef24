use bridge_core::binary::Architecture;
use bridge_core::codegen::render;
use bridge_core::model::{
    select_overload, AddressSpace, KernelConfigMap, LaunchAttributes, Overload, ParamType,
    ScalarType,
};
use bridge_core::side::CompilationSide;

const FIXTURE: &str = include_str!("fixtures/awkward_kernels.rs");

#[allow(dead_code)]
mod generated {
    include!("fixtures/awkward_kernels.rs");
}

const I32: ParamType = ParamType::Scalar(ScalarType::I32);
const F32: ParamType = ParamType::Scalar(ScalarType::F32);

fn overload(symbol: &str, params: Vec<ParamType>, launch: (u32, u32, u32)) -> Overload {
    Overload {
        symbol: symbol.to_string(),
        address: 0,
        params,
        launch: LaunchAttributes {
            group_segment_size: launch.0,
            private_segment_size: launch.1,
            kernarg_size: launch.2,
        },
    }
}

fn awkward_map() -> KernelConfigMap {
    let mut map = KernelConfigMap::new(Architecture::Amdgpu, Some("gfx90a".into()));
    map.insert_overload("kernel_add", overload("kernel_add__i32_i32", vec![I32, I32], (0, 0, 8)));
    map.insert_overload("kernel_add", overload("kernel_add__f32_f32", vec![F32, F32], (0, 0, 8)));
    let out =
        ParamType::Pointer { space: AddressSpace::Global, elem: ScalarType::F32, mutable: true };
    map.insert_overload("match", overload("match__pf32", vec![out], (256, 16, 8)));
    map.insert_overload("a.b", overload("a.b__v", vec![], (0, 0, 0)));
    map.insert_overload("9lives", overload("9lives__v", vec![], (0, 0, 0)));
    map.insert_overload("SIDE", overload("SIDE__v", vec![], (0, 0, 0)));
    let input =
        ParamType::Pointer { space: AddressSpace::Global, elem: ScalarType::U8, mutable: false };
    map.insert_overload("ParamType", overload("ParamType__cu8", vec![input], (0, 0, 8)));
    map
}

#[test]
fn rendered_source_matches_checked_in_fixture() {
    assert_eq!(render(&awkward_map()), FIXTURE);
}

#[test]
fn generated_constants_select_overloads() {
    assert_eq!(generated::SIDE, CompilationSide::Host);
    assert_eq!(generated::KERNELS.len(), 6);

    let picked = select_overload(generated::kernel_add, &[F32, F32]).expect("f32 overload");
    assert_eq!(picked.symbol, "kernel_add__f32_f32");
    assert_eq!(picked.launch.kernarg_size, 8);
    assert!(select_overload(generated::kernel_add, &[I32]).is_none());

    assert_eq!(generated::match_[0].launch.group_segment_size, 256);
    assert_eq!(generated::SIDE_2[0].symbol, "SIDE__v");
    assert!(generated::_9lives[0].params.is_empty());

    let (name, overloads) = generated::KERNELS[2];
    assert_eq!(name, "a.b");
    assert_eq!(overloads[0].symbol, "a.b__v");
    let (name, overloads) = generated::KERNELS[5];
    assert_eq!(name, "ParamType");
    assert_eq!(overloads, generated::ParamType);
}
