use crate::{instructions::Instruction, Attribute, ConstantPool};

pub mod names {
    pub const CODE: &str = "Code";
    pub const SIGNATURE: &str = "Signature";
    pub const EXCEPTIONS: &str = "Exceptions";
    pub const INNER_CLASSES: &str = "InnerClasses";
    pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";
    pub const RECORD: &str = "Record";
    pub const PERMITTED_SUBCLASSES: &str = "PermittedSubclasses";
    pub const NEST_HOST: &str = "NestHost";
    pub const NEST_MEMBERS: &str = "NestMembers";
    pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
    pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
    pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn find_by_name(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.0
            .iter()
            .find(|a| a.name(constant_pool).map_or(false, |n| n == name))
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        self.0.iter().find_map(|a| match &a.kind {
            AttributeKind::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn bootstrap_methods(&self) -> Option<&[BootstrapMethod]> {
        self.0.iter().find_map(|a| match &a.kind {
            AttributeKind::BootstrapMethods(methods) => Some(methods.as_slice()),
            _ => None,
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Attribute> {
        self.0.iter_mut()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.iter().any(|a| a.dirty)
    }
}

/// The decoded form of an attribute. Attributes that were not decoded, either because their
/// layout is of no interest or because decoding failed, are [`AttributeKind::Raw`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    Raw,
    Code(CodeAttribute),
    Signature { signature_index: u16 },
    Exceptions(Vec<u16>),
    InnerClasses(Vec<InnerClass>),
    BootstrapMethods(Vec<BootstrapMethod>),
    Record(Vec<RecordComponent>),
    PermittedSubclasses(Vec<u16>),
    NestHost { host_class_index: u16 },
    NestMembers(Vec<u16>),
    EnclosingMethod(EnclosingMethod),
    LocalVariableTable(Vec<LocalVariable>),
    LocalVariableTypeTable(Vec<LocalVariable>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Zero for a handler that catches everything.
    pub catch_type: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub instructions: Vec<Instruction>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InnerClass {
    pub inner_class_info_index: u16,
    /// Zero if the class is not a member.
    pub outer_class_info_index: u16,
    /// Zero if the class is anonymous.
    pub inner_name_index: u16,
    pub inner_class_access_flags: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapMethod {
    pub bootstrap_method_ref: u16,
    pub bootstrap_arguments: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordComponent {
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnclosingMethod {
    pub class_index: u16,
    /// Zero if the class is not immediately enclosed by a method or constructor.
    pub method_index: u16,
}

/// An entry of a LocalVariableTable, or of a LocalVariableTypeTable in which case
/// `descriptor_index` points at a signature.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}
