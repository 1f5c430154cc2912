use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Cursor, Read, Seek},
};

use bitflags::bitflags;
use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    attributes::{
        names, Attributes, BootstrapMethod, CodeAttribute, EnclosingMethod, ExceptionTableEntry,
        InnerClass, LocalVariable, RecordComponent,
    },
    class_file::Member,
    constant_pool::{
        tags, ClassInfo, DynamicInfo, MethodHandleInfo, MethodTypeInfo, NameAndTypeInfo, RefInfo,
    },
    instructions::decode_instructions,
    AccessFlags, Attribute, AttributeKind, ClassFile, ClassFileError, ConstantPool, CpInfo,
    ReferenceKind, Result,
};

type Endian = BigEndian;

bitflags! {
    pub struct ParseFlags: u32 {
        /// Keep every attribute as raw bytes.
        const SKIP_ATTRIBUTE_DECODING = 0x1;
        /// Keep Code attributes as raw bytes, which avoids decoding instructions.
        const SKIP_CODE_DECODING = 0x2;
    }
}

pub struct Parser<R> {
    r: BufReader<R>,
    flags: ParseFlags,
}
impl<R: Read + Seek> Parser<R> {
    pub fn new(r: R) -> Self {
        Self::with_flags(r, ParseFlags::empty())
    }

    pub fn with_flags(r: R, flags: ParseFlags) -> Self {
        Self {
            r: BufReader::new(r),
            flags,
        }
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        self.parse_magic_identifier()?;
        let (major_version, minor_version) = self.parse_version()?;

        let constant_pool = self.parse_constant_pool()?;
        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let this_class = self.read_u16()?;
        let super_class = self.read_u16()?;
        let interfaces = self.parse_u16_table()?;

        let fields_count = self.read_u16()?;
        let fields = (0..fields_count)
            .map(|_| self.parse_member(&constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let methods_count = self.read_u16()?;
        let methods = (0..methods_count)
            .map(|_| self.parse_member(&constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let attributes = self.parse_attributes(&constant_pool)?;

        Ok(ClassFile {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn parse_member(&mut self, constant_pool: &ConstantPool) -> Result<Member> {
        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes = self.parse_attributes(constant_pool)?;

        Ok(Member {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<()> {
        match self.read_u32()? {
            0xCAFEBABE => Ok(()),
            magic_identifier => Err(ClassFileError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u16()?;
        let major = self.read_u16()?;
        Ok((major, minor))
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let constant_pool_count = self.read_u16()?;

        let len = (constant_pool_count as usize).saturating_sub(1);
        let mut res = Vec::with_capacity(len);
        let mut undecodable_utf8 = HashMap::new();
        while res.len() < len {
            let index = res.len() as u16 + 1;
            let cp_info = match self.read_u8()? {
                tags::UTF8 => {
                    let (string, undecodable) = self.parse_utf8()?;
                    if let Some(bytes) = undecodable {
                        log::warn!(
                            "Constant #{} is not valid modified UTF-8, keeping its original bytes",
                            index
                        );
                        undecodable_utf8.insert(index, bytes);
                    }
                    CpInfo::Utf8(string)
                }
                tag => self.parse_cp_info(tag)?,
            };
            let slot_size = cp_info.slot_size();
            res.push(cp_info);
            (1..slot_size).for_each(|_| res.push(CpInfo::Unusable));
        }
        Ok(ConstantPool::with_undecodable_utf8(res, undecodable_utf8))
    }

    fn parse_cp_info(&mut self, tag: u8) -> Result<CpInfo> {
        let cp_info = match tag {
            tags::INTEGER => CpInfo::Integer(self.read_i32()?),
            tags::FLOAT => CpInfo::Float(f32::from_bits(self.read_u32()?)),
            tags::LONG => CpInfo::Long(self.r.read_i64::<Endian>()?),
            tags::DOUBLE => CpInfo::Double(f64::from_bits(self.r.read_u64::<Endian>()?)),
            tags::CLASS => CpInfo::Class(ClassInfo {
                name_index: self.read_u16()?,
            }),
            tags::STRING => CpInfo::String {
                string_index: self.read_u16()?,
            },
            tags::FIELD_REF => CpInfo::FieldRef(self.parse_ref_info()?),
            tags::METHOD_REF => CpInfo::MethodRef(self.parse_ref_info()?),
            tags::INTERFACE_METHOD_REF => CpInfo::InterfaceMethodRef(self.parse_ref_info()?),
            tags::NAME_AND_TYPE => self.parse_name_and_type_info()?,
            tags::METHOD_HANDLE => self.parse_method_handle()?,
            tags::METHOD_TYPE => CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: self.read_u16()?,
            }),
            tags::DYNAMIC => CpInfo::Dynamic(self.parse_dynamic_info()?),
            tags::INVOKE_DYNAMIC => CpInfo::InvokeDynamic(self.parse_dynamic_info()?),
            tags::MODULE => CpInfo::Module {
                name_index: self.read_u16()?,
            },
            tags::PACKAGE => CpInfo::Package {
                name_index: self.read_u16()?,
            },
            _ => return Err(ClassFileError::InvalidCpInfoTag(tag)),
        };

        Ok(cp_info)
    }

    // https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4.7
    // Returns the payload alongside a lossy decoding when it is not valid modified UTF-8.
    fn parse_utf8(&mut self) -> Result<(String, Option<Vec<u8>>)> {
        let length = self.read_u16()?;
        let mut bytes = vec![0u8; length as usize];
        self.r.read_exact(&mut bytes)?;

        Ok(match cesu8::from_java_cesu8(&bytes) {
            Ok(string) => (string.into_owned(), None),
            Err(_) => (String::from_utf8_lossy(&bytes).into_owned(), Some(bytes)),
        })
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        Ok(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = ReferenceKind::try_from(self.read_u8()?)
            .map_err(ClassFileError::InvalidReferenceKind)?;
        let reference_index = self.read_u16()?;

        Ok(CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_dynamic_info(&mut self) -> Result<DynamicInfo> {
        let bootstrap_method_attr_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    fn parse_attribute(&mut self, constant_pool: &ConstantPool) -> Result<Attribute> {
        let attribute_name_index = self.read_u16()?;
        let attribute_length = self.read_u32()?;
        let mut info = vec![0u8; attribute_length as usize];
        self.r.read_exact(&mut info)?;

        let mut attribute = Attribute::raw(attribute_name_index, info);
        if let Err(e) = attribute.decode(constant_pool, self.flags) {
            log::warn!(
                "Keeping attribute #{} undecoded: {}",
                attribute_name_index,
                e
            );
            attribute.kind = AttributeKind::Raw;
        }

        Ok(attribute)
    }

    fn parse_attributes(&mut self, constant_pool: &ConstantPool) -> Result<Attributes> {
        let attributes_count = self.read_u16()?;
        (0..attributes_count)
            .map(|_| self.parse_attribute(constant_pool))
            .collect::<Result<Vec<_>>>()
            .map(Attributes)
    }

    fn parse_code_attribute(&mut self, constant_pool: &ConstantPool) -> Result<CodeAttribute> {
        let max_stack = self.read_u16()?;
        let max_locals = self.read_u16()?;
        let code_length = self.read_u32()?;
        let mut code = vec![0u8; code_length as usize];
        self.r.read_exact(&mut code)?;
        let instructions = decode_instructions(&code)?;
        let exception_table_length = self.read_u16()?;
        let exception_table = (0..exception_table_length)
            .map(|_| self.parse_exception_table_entry())
            .collect::<Result<Vec<_>>>()?;
        let attributes = self.parse_attributes(constant_pool)?;

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            instructions,
            exception_table,
            attributes,
        })
    }

    fn parse_exception_table_entry(&mut self) -> Result<ExceptionTableEntry> {
        let start_pc = self.read_u16()?;
        let end_pc = self.read_u16()?;
        let handler_pc = self.read_u16()?;
        let catch_type = self.read_u16()?;

        Ok(ExceptionTableEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        })
    }

    fn parse_inner_class(&mut self) -> Result<InnerClass> {
        Ok(InnerClass {
            inner_class_info_index: self.read_u16()?,
            outer_class_info_index: self.read_u16()?,
            inner_name_index: self.read_u16()?,
            inner_class_access_flags: self.read_u16()?,
        })
    }

    fn parse_bootstrap_method(&mut self) -> Result<BootstrapMethod> {
        let bootstrap_method_ref = self.read_u16()?;
        let bootstrap_arguments = self.parse_u16_table()?;

        Ok(BootstrapMethod {
            bootstrap_method_ref,
            bootstrap_arguments,
        })
    }

    fn parse_record_component(&mut self, constant_pool: &ConstantPool) -> Result<RecordComponent> {
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes = self.parse_attributes(constant_pool)?;

        Ok(RecordComponent {
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_enclosing_method(&mut self) -> Result<EnclosingMethod> {
        Ok(EnclosingMethod {
            class_index: self.read_u16()?,
            method_index: self.read_u16()?,
        })
    }

    fn parse_local_variable(&mut self) -> Result<LocalVariable> {
        Ok(LocalVariable {
            start_pc: self.read_u16()?,
            length: self.read_u16()?,
            name_index: self.read_u16()?,
            descriptor_index: self.read_u16()?,
            index: self.read_u16()?,
        })
    }

    /// A u16 count followed by that many u16 values.
    fn parse_u16_table(&mut self) -> Result<Vec<u16>> {
        let count = self.read_u16()?;
        let mut table = vec![0u16; count as usize];
        self.r.read_u16_into::<Endian>(&mut table)?;
        Ok(table)
    }

    fn parse_table<T>(&mut self, mut f: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.read_u16()?;
        (0..count).map(|_| f(self)).collect()
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(self.r.read_u32::<Endian>()?)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(self.r.read_u16::<Endian>()?)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.r.read_u8()?)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.r.read_i32::<Endian>()?)
    }
}

/// Decodes the `info` of an attribute named `name`. Attributes without a structured layout
/// decode to [`AttributeKind::Raw`].
pub(crate) fn decode_attribute(
    name: &str,
    info: &[u8],
    constant_pool: &ConstantPool,
    flags: ParseFlags,
) -> Result<AttributeKind> {
    if flags.contains(ParseFlags::SKIP_ATTRIBUTE_DECODING)
        || (name == names::CODE && flags.contains(ParseFlags::SKIP_CODE_DECODING))
    {
        return Ok(AttributeKind::Raw);
    }

    let mut p = Parser::with_flags(Cursor::new(info), flags);
    let kind = match name {
        names::CODE => p
            .parse_code_attribute(constant_pool)
            .map(AttributeKind::Code),
        names::SIGNATURE => p
            .read_u16()
            .map(|signature_index| AttributeKind::Signature { signature_index }),
        names::EXCEPTIONS => p.parse_u16_table().map(AttributeKind::Exceptions),
        names::INNER_CLASSES => p
            .parse_table(Parser::parse_inner_class)
            .map(AttributeKind::InnerClasses),
        names::BOOTSTRAP_METHODS => p
            .parse_table(Parser::parse_bootstrap_method)
            .map(AttributeKind::BootstrapMethods),
        names::RECORD => p
            .parse_table(|p| p.parse_record_component(constant_pool))
            .map(AttributeKind::Record),
        names::PERMITTED_SUBCLASSES => p.parse_u16_table().map(AttributeKind::PermittedSubclasses),
        names::NEST_HOST => p
            .read_u16()
            .map(|host_class_index| AttributeKind::NestHost { host_class_index }),
        names::NEST_MEMBERS => p.parse_u16_table().map(AttributeKind::NestMembers),
        names::ENCLOSING_METHOD => p
            .parse_enclosing_method()
            .map(AttributeKind::EnclosingMethod),
        names::LOCAL_VARIABLE_TABLE => p
            .parse_table(Parser::parse_local_variable)
            .map(AttributeKind::LocalVariableTable),
        names::LOCAL_VARIABLE_TYPE_TABLE => p
            .parse_table(Parser::parse_local_variable)
            .map(AttributeKind::LocalVariableTypeTable),
        _ => return Ok(AttributeKind::Raw),
    };

    let unrecognized = |reason: String| ClassFileError::UnrecognizedAttributeLayout {
        name: name.to_owned(),
        reason,
    };

    let kind = kind.map_err(|e| match e {
        ClassFileError::IOError(e) => unrecognized(e.to_string()),
        e => e,
    })?;

    let trailing = p.r.fill_buf()?.len();
    if trailing > 0 {
        return Err(unrecognized(format!("{} trailing bytes", trailing)));
    }

    Ok(kind)
}
