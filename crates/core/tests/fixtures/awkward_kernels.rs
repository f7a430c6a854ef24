// @generated by kernel-bridge. Do not edit.
// architecture: amdgpu, processor: gfx90a
// kernels: 6, overloads: 7

#[allow(unused_imports)]
use bridge_core::model::{AddressSpace, LaunchAttributes, OverloadDescriptor, ParamType, ScalarType};
use bridge_core::side::CompilationSide;

pub const SIDE: CompilationSide = CompilationSide::Host;

/// Overloads of kernel "kernel_add".
#[allow(non_upper_case_globals)]
pub const kernel_add: &[OverloadDescriptor] = &[
    OverloadDescriptor { symbol: "kernel_add__i32_i32", params: &[ParamType::Scalar(ScalarType::I32), ParamType::Scalar(ScalarType::I32)], launch: LaunchAttributes { group_segment_size: 0, private_segment_size: 0, kernarg_size: 8 } },
    OverloadDescriptor { symbol: "kernel_add__f32_f32", params: &[ParamType::Scalar(ScalarType::F32), ParamType::Scalar(ScalarType::F32)], launch: LaunchAttributes { group_segment_size: 0, private_segment_size: 0, kernarg_size: 8 } },
];

/// Overloads of kernel "match".
#[allow(non_upper_case_globals)]
pub const match_: &[OverloadDescriptor] = &[
    OverloadDescriptor { symbol: "match__pf32", params: &[ParamType::Pointer { space: AddressSpace::Global, elem: ScalarType::F32, mutable: true }], launch: LaunchAttributes { group_segment_size: 256, private_segment_size: 16, kernarg_size: 8 } },
];

/// Overloads of kernel "a.b".
#[allow(non_upper_case_globals)]
pub const a_b: &[OverloadDescriptor] = &[
    OverloadDescriptor { symbol: "a.b__v", params: &[], launch: LaunchAttributes { group_segment_size: 0, private_segment_size: 0, kernarg_size: 0 } },
];

/// Overloads of kernel "9lives".
#[allow(non_upper_case_globals)]
pub const _9lives: &[OverloadDescriptor] = &[
    OverloadDescriptor { symbol: "9lives__v", params: &[], launch: LaunchAttributes { group_segment_size: 0, private_segment_size: 0, kernarg_size: 0 } },
];

/// Overloads of kernel "SIDE".
#[allow(non_upper_case_globals)]
pub const SIDE_2: &[OverloadDescriptor] = &[
    OverloadDescriptor { symbol: "SIDE__v", params: &[], launch: LaunchAttributes { group_segment_size: 0, private_segment_size: 0, kernarg_size: 0 } },
];

/// Overloads of kernel "ParamType".
#[allow(non_upper_case_globals)]
pub const ParamType: &[OverloadDescriptor] = &[
    OverloadDescriptor { symbol: "ParamType__cu8", params: &[ParamType::Pointer { space: AddressSpace::Global, elem: ScalarType::U8, mutable: false }], launch: LaunchAttributes { group_segment_size: 0, private_segment_size: 0, kernarg_size: 8 } },
];

pub const KERNELS: &[(&str, &[OverloadDescriptor])] = &[
    ("kernel_add", kernel_add),
    ("match", match_),
    ("a.b", a_b),
    ("9lives", _9lives),
    ("SIDE", SIDE_2),
    ("ParamType", ParamType),
];
