//! JSON转换引擎
//!
//! 提供JSON文本解析、JSON值与原生值的双向转换以及配置深度合并

pub mod convert;
pub mod value;

// 重新导出主要类型
pub use convert::{
    map_to_json, merge_configs, parse, parse_native, to_json, to_native, to_native_map,
    to_pretty_string,
};
pub use value::{NativeMap, NativeValue};
