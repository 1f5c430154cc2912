use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    attributes::{Attributes, BootstrapMethod, CodeAttribute, LocalVariable, RecordComponent},
    class_file::Member,
    constant_pool::tags,
    instructions::encode_instructions,
    AttributeKind, ClassFile, ClassFileError, ConstantPool, CpInfo, Result,
};

type Endian = BigEndian;

/// Serializes a [`ClassFile`]. A class that was parsed and left untouched is written back
/// byte-for-byte.
pub struct Writer<W> {
    w: W,
}
impl<W: Write> Writer<W> {
    pub fn new(w: W) -> Self {
        Self { w }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    pub fn write(&mut self, class_file: &ClassFile) -> Result<()> {
        self.write_u32(0xCAFEBABE)?;
        self.write_u16(class_file.minor_version)?;
        self.write_u16(class_file.major_version)?;

        self.write_constant_pool(&class_file.constant_pool)?;
        self.write_u16(class_file.access_flags.bits())?;
        self.write_u16(class_file.this_class)?;
        self.write_u16(class_file.super_class)?;
        self.write_u16_table(&class_file.interfaces)?;

        self.write_members(&class_file.fields)?;
        self.write_members(&class_file.methods)?;
        self.write_attributes(&class_file.attributes)?;

        Ok(self.w.flush()?)
    }

    fn write_constant_pool(&mut self, constant_pool: &ConstantPool) -> Result<()> {
        self.write_u16(constant_pool.count() as u16)?;

        for (index, cp_info) in constant_pool.iter() {
            match constant_pool.undecodable_utf8(index) {
                Some(bytes) => {
                    self.write_u8(tags::UTF8)?;
                    self.write_utf8_bytes(bytes)?;
                }
                None => self.write_cp_info(cp_info)?,
            }
        }

        Ok(())
    }

    fn write_cp_info(&mut self, cp_info: &CpInfo) -> Result<()> {
        let tag = match cp_info.tag() {
            Some(tag) => tag,
            None => return Ok(()),
        };
        self.write_u8(tag)?;

        match cp_info {
            CpInfo::Utf8(string) => self.write_utf8_bytes(&cesu8::to_java_cesu8(string))?,
            CpInfo::Integer(int) => self.w.write_i32::<Endian>(*int)?,
            CpInfo::Float(float) => self.write_u32(float.to_bits())?,
            CpInfo::Long(long) => self.w.write_i64::<Endian>(*long)?,
            CpInfo::Double(double) => self.w.write_u64::<Endian>(double.to_bits())?,
            CpInfo::Class(class) => self.write_u16(class.name_index)?,
            CpInfo::String { string_index } => self.write_u16(*string_index)?,
            CpInfo::FieldRef(ref_info)
            | CpInfo::MethodRef(ref_info)
            | CpInfo::InterfaceMethodRef(ref_info) => {
                self.write_u16(ref_info.class_index)?;
                self.write_u16(ref_info.name_and_type_index)?;
            }
            CpInfo::NameAndType(name_and_type) => {
                self.write_u16(name_and_type.name_index)?;
                self.write_u16(name_and_type.descriptor_index)?;
            }
            CpInfo::MethodHandle(method_handle) => {
                self.write_u8(method_handle.reference_kind as u8)?;
                self.write_u16(method_handle.reference_index)?;
            }
            CpInfo::MethodType(method_type) => self.write_u16(method_type.descriptor_index)?,
            CpInfo::Dynamic(dynamic) | CpInfo::InvokeDynamic(dynamic) => {
                self.write_u16(dynamic.bootstrap_method_attr_index)?;
                self.write_u16(dynamic.name_and_type_index)?;
            }
            CpInfo::Module { name_index } | CpInfo::Package { name_index } => {
                self.write_u16(*name_index)?
            }
            CpInfo::Unusable => {}
        }

        Ok(())
    }

    fn write_utf8_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let length =
            u16::try_from(bytes.len()).map_err(|_| ClassFileError::StringTooLong(bytes.len()))?;
        self.write_u16(length)?;
        Ok(self.w.write_all(bytes)?)
    }

    fn write_members(&mut self, members: &[Member]) -> Result<()> {
        self.write_u16(members.len() as u16)?;

        for member in members {
            self.write_u16(member.access_flags.bits())?;
            self.write_u16(member.name_index)?;
            self.write_u16(member.descriptor_index)?;
            self.write_attributes(&member.attributes)?;
        }

        Ok(())
    }

    fn write_attributes(&mut self, attributes: &Attributes) -> Result<()> {
        self.write_u16(attributes.0.len() as u16)?;

        for attribute in attributes.iter() {
            let info = attribute.encode()?;
            self.write_u16(attribute.attribute_name_index)?;
            self.write_u32(info.len() as u32)?;
            self.w.write_all(&info)?;
        }

        Ok(())
    }

    fn write_code_attribute(&mut self, code: &CodeAttribute) -> Result<()> {
        let bytes = encode_instructions(&code.code, &code.instructions)?;

        self.write_u16(code.max_stack)?;
        self.write_u16(code.max_locals)?;
        self.write_u32(bytes.len() as u32)?;
        self.w.write_all(&bytes)?;

        self.write_u16(code.exception_table.len() as u16)?;
        for entry in &code.exception_table {
            self.write_u16(entry.start_pc)?;
            self.write_u16(entry.end_pc)?;
            self.write_u16(entry.handler_pc)?;
            self.write_u16(entry.catch_type)?;
        }

        self.write_attributes(&code.attributes)
    }

    fn write_bootstrap_method(&mut self, bootstrap_method: &BootstrapMethod) -> Result<()> {
        self.write_u16(bootstrap_method.bootstrap_method_ref)?;
        self.write_u16_table(&bootstrap_method.bootstrap_arguments)
    }

    fn write_record_component(&mut self, component: &RecordComponent) -> Result<()> {
        self.write_u16(component.name_index)?;
        self.write_u16(component.descriptor_index)?;
        self.write_attributes(&component.attributes)
    }

    fn write_local_variable(&mut self, local_variable: &LocalVariable) -> Result<()> {
        self.write_u16(local_variable.start_pc)?;
        self.write_u16(local_variable.length)?;
        self.write_u16(local_variable.name_index)?;
        self.write_u16(local_variable.descriptor_index)?;
        self.write_u16(local_variable.index)
    }

    fn write_u16_table(&mut self, table: &[u16]) -> Result<()> {
        self.write_u16(table.len() as u16)?;
        table.iter().try_for_each(|&value| self.write_u16(value))
    }

    fn write_table<T>(
        &mut self,
        table: &[T],
        mut f: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        self.write_u16(table.len() as u16)?;
        table.iter().try_for_each(|item| f(self, item))
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.w.write_u32::<Endian>(value)?)
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        Ok(self.w.write_u16::<Endian>(value)?)
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.w.write_u8(value)?)
    }
}

/// Encodes the structured form of an attribute. `raw_info` is returned as is for
/// [`AttributeKind::Raw`].
pub(crate) fn encode_attribute_kind(kind: &AttributeKind, raw_info: &[u8]) -> Result<Vec<u8>> {
    let mut w = Writer::new(Vec::new());

    match kind {
        AttributeKind::Raw => return Ok(raw_info.to_vec()),
        AttributeKind::Code(code) => w.write_code_attribute(code)?,
        AttributeKind::Signature { signature_index } => w.write_u16(*signature_index)?,
        AttributeKind::Exceptions(table)
        | AttributeKind::PermittedSubclasses(table)
        | AttributeKind::NestMembers(table) => w.write_u16_table(table)?,
        AttributeKind::InnerClasses(inner_classes) => {
            w.write_table(inner_classes, |w, inner_class| {
                w.write_u16(inner_class.inner_class_info_index)?;
                w.write_u16(inner_class.outer_class_info_index)?;
                w.write_u16(inner_class.inner_name_index)?;
                w.write_u16(inner_class.inner_class_access_flags)
            })?
        }
        AttributeKind::BootstrapMethods(bootstrap_methods) => {
            w.write_table(bootstrap_methods, Writer::write_bootstrap_method)?
        }
        AttributeKind::Record(components) => {
            w.write_table(components, Writer::write_record_component)?
        }
        AttributeKind::NestHost { host_class_index } => w.write_u16(*host_class_index)?,
        AttributeKind::EnclosingMethod(enclosing_method) => {
            w.write_u16(enclosing_method.class_index)?;
            w.write_u16(enclosing_method.method_index)?;
        }
        AttributeKind::LocalVariableTable(local_variables)
        | AttributeKind::LocalVariableTypeTable(local_variables) => {
            w.write_table(local_variables, Writer::write_local_variable)?
        }
    }

    Ok(w.into_inner())
}
