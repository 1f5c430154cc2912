// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.3
// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.9.1

mod error;
mod parser;
mod types;

pub use error::MalformedDescriptor;
pub use parser::{parse_type, try_parse_type};
pub use types::{
    ArrayType, ClassSignature, InnerType, MethodType, ParameterizedType, Primitive, Type, TypeKind,
    TypeParameter, WildcardBound, WildcardType,
};

pub type Result<T, E = MalformedDescriptor> = std::result::Result<T, E>;
