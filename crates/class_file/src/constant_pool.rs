use std::{collections::HashMap, ops::Index};

use crate::{ClassFileError, Result};

macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $($i:ident)|+) => {{
        let index = $index;
        match $cp.get(index) {
            $(Some($crate::CpInfo::$i(n)) => Ok(n),)+
            Some(c) => Err($crate::ClassFileError::UnexpectedConstantPoolEntry(
                stringify!($($i)|+),
                c.clone(),
            )),
            None => Err($crate::ClassFileError::InvalidConstantPoolIndex(index)),
        }
    }};
}

/// The constant pool of a class, addressed with the 1-based indices used throughout the class
/// file. Index 0 is never valid.
///
/// The pool only ever grows: entries read from the class file are not modified, and a changed
/// entry is expressed by [pushing](ConstantPool::push) a new one and pointing the referrer at
/// it. Indices handed out earlier therefore stay valid for the lifetime of the pool.
#[derive(Debug, Default, Clone)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
    decoded_len: usize,
    undecodable_utf8: HashMap<u16, Vec<u8>>,
}
impl ConstantPool {
    pub fn new(cp_infos: Vec<CpInfo>) -> Self {
        Self::with_undecodable_utf8(cp_infos, HashMap::new())
    }

    /// Builds a pool whose `Utf8` entries at the keys of `undecodable_utf8` were not valid
    /// modified UTF-8. Those entries hold a lossy decoding, and the writer emits the original
    /// bytes in their place.
    pub fn with_undecodable_utf8(
        cp_infos: Vec<CpInfo>,
        undecodable_utf8: HashMap<u16, Vec<u8>>,
    ) -> Self {
        let decoded_len = cp_infos.len();
        Self {
            cp_infos,
            decoded_len,
            undecodable_utf8,
        }
    }

    /// The `constant_pool_count` of the class file, one more than the highest valid index.
    pub fn count(&self) -> usize {
        self.cp_infos.len() + 1
    }

    pub fn get(&self, index: u16) -> Option<&CpInfo> {
        (index as usize)
            .checked_sub(1)
            .and_then(|i| self.cp_infos.get(i))
    }

    /// Appends an entry and returns its index. 8-byte constants take two slots.
    pub fn push(&mut self, cp_info: CpInfo) -> Result<u16> {
        let slot_size = cp_info.slot_size();
        if self.cp_infos.len() + slot_size > u16::MAX as usize - 1 {
            return Err(ClassFileError::ConstantPoolOverflow);
        }

        let index = self.count() as u16;
        log::trace!("Appending constant pool entry #{}: {:?}", index, cp_info);

        self.cp_infos.push(cp_info);
        (1..slot_size).for_each(|_| self.cp_infos.push(CpInfo::Unusable));

        Ok(index)
    }

    /// Whether the entry was appended after the pool was read.
    pub fn is_dirty(&self, index: u16) -> bool {
        index as usize > self.decoded_len
    }

    /// The original payload of a `Utf8` entry that could not be decoded, if `index` is one.
    pub fn undecodable_utf8(&self, index: u16) -> Option<&[u8]> {
        self.undecodable_utf8.get(&index).map(Vec::as_slice)
    }

    /// Iterates over `(index, entry)` pairs, including [`CpInfo::Unusable`] slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpInfo)> {
        self.cp_infos
            .iter()
            .enumerate()
            .map(|(i, cp_info)| (i as u16 + 1, cp_info))
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        matches_cp_info!(self, index, Utf8).map(String::as_str)
    }

    pub fn class(&self, index: u16) -> Result<&ClassInfo> {
        matches_cp_info!(self, index, Class)
    }

    /// The internal name held by the `Class` entry at `index`.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        self.utf8(self.class(index)?.name_index)
    }

    pub fn name_and_type(&self, index: u16) -> Result<&NameAndTypeInfo> {
        matches_cp_info!(self, index, NameAndType)
    }

    /// A field, method or interface method reference.
    pub fn ref_info(&self, index: u16) -> Result<&RefInfo> {
        matches_cp_info!(self, index, FieldRef | MethodRef | InterfaceMethodRef)
    }

    pub fn method_handle(&self, index: u16) -> Result<&MethodHandleInfo> {
        matches_cp_info!(self, index, MethodHandle)
    }

    pub fn method_type(&self, index: u16) -> Result<&MethodTypeInfo> {
        matches_cp_info!(self, index, MethodType)
    }

    /// A dynamically-computed constant or call site.
    pub fn dynamic(&self, index: u16) -> Result<&DynamicInfo> {
        matches_cp_info!(self, index, Dynamic | InvokeDynamic)
    }
}
impl Index<u16> for ConstantPool {
    type Output = CpInfo;

    fn index(&self, index: u16) -> &Self::Output {
        &self.cp_infos[index as usize - 1]
    }
}

pub mod tags {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELD_REF: u8 = 9;
    pub const METHOD_REF: u8 = 10;
    pub const INTERFACE_METHOD_REF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    MethodRef(RefInfo),
    FieldRef(RefInfo),
    Float(f32),
    InterfaceMethodRef(RefInfo),
    Class(ClassInfo),
    NameAndType(NameAndTypeInfo),
    Utf8(String),
    String { string_index: u16 },
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Integer(i32),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Long(i64),
    Double(f64),
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// The slot following a `Long` or `Double`.
    Unusable,
}
impl CpInfo {
    pub fn tag(&self) -> Option<u8> {
        let tag = match self {
            CpInfo::Utf8(_) => tags::UTF8,
            CpInfo::Integer(_) => tags::INTEGER,
            CpInfo::Float(_) => tags::FLOAT,
            CpInfo::Long(_) => tags::LONG,
            CpInfo::Double(_) => tags::DOUBLE,
            CpInfo::Class(_) => tags::CLASS,
            CpInfo::String { .. } => tags::STRING,
            CpInfo::FieldRef(_) => tags::FIELD_REF,
            CpInfo::MethodRef(_) => tags::METHOD_REF,
            CpInfo::InterfaceMethodRef(_) => tags::INTERFACE_METHOD_REF,
            CpInfo::NameAndType(_) => tags::NAME_AND_TYPE,
            CpInfo::MethodHandle(_) => tags::METHOD_HANDLE,
            CpInfo::MethodType(_) => tags::METHOD_TYPE,
            CpInfo::Dynamic(_) => tags::DYNAMIC,
            CpInfo::InvokeDynamic(_) => tags::INVOKE_DYNAMIC,
            CpInfo::Module { .. } => tags::MODULE,
            CpInfo::Package { .. } => tags::PACKAGE,
            CpInfo::Unusable => return None,
        };

        Some(tag)
    }

    /// The number of pool slots the entry occupies.
    pub fn slot_size(&self) -> usize {
        match self {
            CpInfo::Long(_) | CpInfo::Double(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassInfo {
    // The constant_pool entry at that index must be a CONSTANT_Utf8_info structure (§4.4.7)
    // representing a valid binary class or interface name encoded in internal form (§4.2.1).
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct DynamicInfo {
    /// Index into the `bootstrap_methods` array of the BootstrapMethods attribute, not into the
    /// constant pool.
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: ReferenceKind,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ReferenceKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl TryFrom<u8> for ReferenceKind {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(ReferenceKind::GetField),
            2 => Ok(ReferenceKind::GetStatic),
            3 => Ok(ReferenceKind::PutField),
            4 => Ok(ReferenceKind::PutStatic),
            5 => Ok(ReferenceKind::InvokeVirtual),
            6 => Ok(ReferenceKind::InvokeStatic),
            7 => Ok(ReferenceKind::InvokeSpecial),
            8 => Ok(ReferenceKind::NewInvokeSpecial),
            9 => Ok(ReferenceKind::InvokeInterface),
            _ => Err(value),
        }
    }
}
