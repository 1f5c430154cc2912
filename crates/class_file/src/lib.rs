// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html

mod access_flags;
pub mod attributes;
mod class_file;
mod constant_pool;
mod error;
pub mod instructions;
mod parser;
mod writer;

use std::fmt;

pub use self::class_file::{ClassFile, Member};
pub use access_flags::AccessFlags;
pub use attributes::{AttributeKind, Attributes};
pub use constant_pool::{
    tags, ClassInfo, ConstantPool, CpInfo, DynamicInfo, MethodHandleInfo, MethodTypeInfo,
    NameAndTypeInfo, RefInfo, ReferenceKind,
};
pub use error::ClassFileError;
pub use parser::{ParseFlags, Parser};
pub use writer::Writer;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;

/// An attribute as read from the class file.
///
/// `info` holds the raw bytes and is what gets written back unless `dirty` is set, in which case
/// the structured `kind` is authoritative and is re-encoded on write.
#[derive(Clone, PartialEq)]
pub struct Attribute {
    pub attribute_name_index: u16,
    pub info: Vec<u8>,
    pub kind: AttributeKind,
    pub dirty: bool,
}
impl Attribute {
    pub fn raw(attribute_name_index: u16, info: Vec<u8>) -> Self {
        Self {
            attribute_name_index,
            info,
            kind: AttributeKind::Raw,
            dirty: false,
        }
    }

    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.utf8(self.attribute_name_index)
    }

    /// Decodes `info` into `kind` according to the attribute's name. Unknown attributes stay raw.
    pub fn decode(&mut self, constant_pool: &ConstantPool, flags: ParseFlags) -> Result<()> {
        let name = self.name(constant_pool)?;
        self.kind = parser::decode_attribute(name, &self.info, constant_pool, flags)?;
        Ok(())
    }

    /// The bytes this attribute serializes to.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if !self.dirty {
            return Ok(self.info.clone());
        }

        writer::encode_attribute_kind(&self.kind, &self.info)
    }
}
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("attribute_name_index", &self.attribute_name_index)
            .field("info", &format!("({} bytes)", self.info.len()))
            .field("kind", &self.kind)
            .field("dirty", &self.dirty)
            .finish()
    }
}
