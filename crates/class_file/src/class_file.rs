use std::io::{Cursor, Read, Seek, Write};

use crate::{
    attributes::{Attributes, BootstrapMethod},
    parser::{ParseFlags, Parser},
    writer::Writer,
    AccessFlags, ConstantPool, Result,
};

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub attributes: Attributes,
}
impl ClassFile {
    pub fn parse(bytes: impl Read + Seek) -> Result<ClassFile> {
        Parser::new(bytes).parse()
    }

    pub fn parse_with_flags(bytes: impl Read + Seek, flags: ParseFlags) -> Result<ClassFile> {
        Parser::with_flags(bytes, flags).parse()
    }

    pub fn write(&self, w: impl Write) -> Result<()> {
        Writer::new(w).write(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        self.write(&mut bytes)?;
        Ok(bytes.into_inner())
    }

    pub fn class_name(&self) -> Result<&str> {
        // The constant_pool entry at this_class must be a CONSTANT_Class_info structure
        // representing the class or interface defined by this class file.
        self.constant_pool.class_name(self.this_class)
    }

    /// The internal name of the direct superclass, `None` for `java/lang/Object` and modules.
    pub fn super_class(&self) -> Result<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }

        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&index| self.constant_pool.class_name(index))
            .collect()
    }

    pub fn member_name(&self, member: &Member) -> Result<&str> {
        self.constant_pool.utf8(member.name_index)
    }

    pub fn member_descriptor(&self, member: &Member) -> Result<&str> {
        self.constant_pool.utf8(member.descriptor_index)
    }

    /// The decoded BootstrapMethods table, empty if the class has none.
    pub fn bootstrap_methods(&self) -> &[BootstrapMethod] {
        self.attributes.bootstrap_methods().unwrap_or(&[])
    }
}

/// A field or a method.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}
