#![allow(dead_code)]

use std::io::Cursor;

use recast_class_file::{
    attributes::{
        BootstrapMethod, CodeAttribute, ExceptionTableEntry, InnerClass, LocalVariable,
    },
    instructions::{decode_instructions, InstructionKind},
    AccessFlags, Attribute, AttributeKind, Attributes, ClassFile, ClassInfo, ConstantPool, CpInfo,
    DynamicInfo, Member, MethodHandleInfo, MethodTypeInfo, NameAndTypeInfo, RefInfo,
    ReferenceKind,
};

pub const METAFACTORY_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";

pub const ALT_METAFACTORY_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;[Ljava/lang/Object;)Ljava/lang/invoke/CallSite;";

/// Assembles a class in memory. [`ClassBuilder::build`] writes it out and parses it back so the
/// result looks exactly like a class read from disk.
pub struct ClassBuilder {
    cp: ConstantPool,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Member>,
    methods: Vec<Member>,
    attributes: Vec<Attribute>,
}
impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        let mut builder = Self {
            cp: ConstantPool::default(),
            this_class: 0,
            super_class: 0,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
        };
        builder.this_class = builder.class(name);
        builder.super_class = builder.class("java/lang/Object");
        builder
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        self.cp.push(CpInfo::Utf8(String::from(s))).unwrap()
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.cp.push(CpInfo::Class(ClassInfo { name_index })).unwrap()
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.cp
            .push(CpInfo::NameAndType(NameAndTypeInfo {
                name_index,
                descriptor_index,
            }))
            .unwrap()
    }

    fn ref_info(&mut self, owner: &str, name: &str, descriptor: &str) -> RefInfo {
        RefInfo {
            class_index: self.class(owner),
            name_and_type_index: self.name_and_type(name, descriptor),
        }
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let ref_info = self.ref_info(owner, name, descriptor);
        self.cp.push(CpInfo::MethodRef(ref_info)).unwrap()
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let ref_info = self.ref_info(owner, name, descriptor);
        self.cp.push(CpInfo::FieldRef(ref_info)).unwrap()
    }

    pub fn static_method_handle(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let reference_index = self.method_ref(owner, name, descriptor);
        self.cp
            .push(CpInfo::MethodHandle(MethodHandleInfo {
                reference_kind: ReferenceKind::InvokeStatic,
                reference_index,
            }))
            .unwrap()
    }

    pub fn method_type(&mut self, descriptor: &str) -> u16 {
        let descriptor_index = self.utf8(descriptor);
        self.cp
            .push(CpInfo::MethodType(MethodTypeInfo { descriptor_index }))
            .unwrap()
    }

    pub fn invoke_dynamic(&mut self, bootstrap_method: u16, name: &str, descriptor: &str) -> u16 {
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.cp
            .push(CpInfo::InvokeDynamic(DynamicInfo {
                bootstrap_method_attr_index: bootstrap_method,
                name_and_type_index,
            }))
            .unwrap()
    }

    pub fn dynamic_constant(&mut self, bootstrap_method: u16, name: &str, descriptor: &str) -> u16 {
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.cp
            .push(CpInfo::Dynamic(DynamicInfo {
                bootstrap_method_attr_index: bootstrap_method,
                name_and_type_index,
            }))
            .unwrap()
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.cp.push(CpInfo::Integer(value)).unwrap()
    }

    /// A structured attribute, encoded from `kind` when the class is built.
    pub fn attribute(&mut self, name: &str, kind: AttributeKind) -> Attribute {
        Attribute {
            attribute_name_index: self.utf8(name),
            info: vec![],
            kind,
            dirty: true,
        }
    }

    pub fn code(
        &mut self,
        code: Vec<u8>,
        exception_table: Vec<ExceptionTableEntry>,
        attributes: Vec<Attribute>,
    ) -> Attribute {
        let instructions = decode_instructions(&code).unwrap();
        self.attribute(
            "Code",
            AttributeKind::Code(CodeAttribute {
                max_stack: 4,
                max_locals: 2,
                code,
                instructions,
                exception_table,
                attributes: Attributes(attributes),
            }),
        )
    }

    pub fn interface(&mut self, name: &str) -> &mut Self {
        let index = self.class(name);
        self.interfaces.push(index);
        self
    }

    fn member(&mut self, name: &str, descriptor: &str, attributes: Vec<Attribute>) -> Member {
        Member {
            access_flags: AccessFlags::PUBLIC,
            name_index: self.utf8(name),
            descriptor_index: self.utf8(descriptor),
            attributes: Attributes(attributes),
        }
    }

    pub fn field(&mut self, name: &str, descriptor: &str, attributes: Vec<Attribute>) -> &mut Self {
        let member = self.member(name, descriptor, attributes);
        self.fields.push(member);
        self
    }

    pub fn method(&mut self, name: &str, descriptor: &str, attributes: Vec<Attribute>) -> &mut Self {
        let member = self.member(name, descriptor, attributes);
        self.methods.push(member);
        self
    }

    pub fn class_attribute(&mut self, attribute: Attribute) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    pub fn build(self) -> ClassFile {
        let class_file = ClassFile {
            minor_version: 0,
            major_version: 61,
            constant_pool: self.cp,
            access_flags: AccessFlags::PUBLIC | AccessFlags::SUPER,
            this_class: self.this_class,
            super_class: self.super_class,
            interfaces: self.interfaces,
            fields: self.fields,
            methods: self.methods,
            attributes: Attributes(self.attributes),
        };

        ClassFile::parse(Cursor::new(class_file.to_bytes().unwrap())).unwrap()
    }
}

/// `com/acme/Foo`, touching every kind of reference the remapper rewrites.
///
/// ```java
/// class Foo implements Api {
///     Foo self;
///     void bar() {}
///     void run() {
///         try {
///             bar();
///             Object o = Foo.class;
///             Foo f = (Foo) self;
///         } catch (FooException e) {}
///         IntConsumer c = i -> {};
///     }
///     class Inner {}
/// }
/// ```
pub fn sample_class() -> ClassFile {
    let mut b = ClassBuilder::new("com/acme/Foo");
    b.interface("com/acme/Api");

    let bar = b.method_ref("com/acme/Foo", "bar", "()V");
    let foo = b.class("com/acme/Foo");
    let this = b.field_ref("com/acme/Foo", "self", "Lcom/acme/Foo;");
    let exception = b.class("com/acme/FooException");

    let metafactory = b.static_method_handle(
        "java/lang/invoke/LambdaMetafactory",
        "metafactory",
        METAFACTORY_DESCRIPTOR,
    );
    let erased = b.method_type("(I)V");
    let implementation = b.static_method_handle("com/acme/Foo", "lambda$run$0", "(I)V");
    let instantiated = b.method_type("(I)V");
    let call_site = b.invoke_dynamic(0, "accept", "()Ljava/util/function/IntConsumer;");

    let [bar_hi, bar_lo] = bar.to_be_bytes();
    let [this_hi, this_lo] = this.to_be_bytes();
    let [foo_hi, foo_lo] = foo.to_be_bytes();
    let [call_site_hi, call_site_lo] = call_site.to_be_bytes();
    let code = vec![
        0x2a, // aload_0
        0xb6, bar_hi, bar_lo, // invokevirtual bar
        0x12, foo_lo, // ldc Foo.class
        0x57, // pop
        0x2a, // aload_0
        0xb4, this_hi, this_lo, // getfield self
        0xc0, foo_hi, foo_lo, // checkcast Foo
        0x57, // pop
        0xba, call_site_hi, call_site_lo, 0x00, 0x00, // invokedynamic accept
        0x57, // pop
        0xb1, // return
    ];
    assert_eq!(0, foo_hi, "ldc operand must fit a byte");

    let local_variable = LocalVariable {
        start_pc: 0,
        length: code.len() as u16,
        name_index: b.utf8("this"),
        descriptor_index: b.utf8("Lcom/acme/Foo;"),
        index: 0,
    };
    let local_variable_table = b.attribute(
        "LocalVariableTable",
        AttributeKind::LocalVariableTable(vec![local_variable]),
    );
    let run = b.code(
        code,
        vec![ExceptionTableEntry {
            start_pc: 0,
            end_pc: 15,
            handler_pc: 21,
            catch_type: exception,
        }],
        vec![local_variable_table],
    );
    let bar_code = b.code(vec![0xb1], vec![], vec![]);
    let lambda_code = b.code(vec![0xb1], vec![], vec![]);

    b.field("self", "Lcom/acme/Foo;", vec![])
        .method("bar", "()V", vec![bar_code])
        .method("run", "()V", vec![run])
        .method("lambda$run$0", "(I)V", vec![lambda_code]);

    let signature_index = b.utf8("Ljava/lang/Object;Lcom/acme/Api;");
    let signature = b.attribute("Signature", AttributeKind::Signature { signature_index });
    let bootstrap_methods = b.attribute(
        "BootstrapMethods",
        AttributeKind::BootstrapMethods(vec![BootstrapMethod {
            bootstrap_method_ref: metafactory,
            bootstrap_arguments: vec![erased, implementation, instantiated],
        }]),
    );
    let inner = b.class("com/acme/Foo$Inner");
    let outer = b.class("com/acme/Foo");
    let inner_name_index = b.utf8("Inner");
    let inner_classes = b.attribute(
        "InnerClasses",
        AttributeKind::InnerClasses(vec![InnerClass {
            inner_class_info_index: inner,
            outer_class_info_index: outer,
            inner_name_index,
            inner_class_access_flags: 0,
        }]),
    );
    let nest_members = b.attribute("NestMembers", AttributeKind::NestMembers(vec![inner]));

    b.class_attribute(signature)
        .class_attribute(bootstrap_methods)
        .class_attribute(inner_classes)
        .class_attribute(nest_members);

    b.build()
}

/// Every symbolic reference of the class, resolved to text. Two classes with the same
/// description are observationally equal however their pools are laid out.
pub fn describe(class_file: &ClassFile) -> Vec<String> {
    let cp = &class_file.constant_pool;
    let mut lines = vec![
        format!("class {}", class_file.class_name().unwrap()),
        format!("extends {:?}", class_file.super_class().unwrap()),
        format!("implements {:?}", class_file.interface_names().unwrap()),
    ];

    for member in class_file.fields.iter().chain(&class_file.methods) {
        lines.push(format!(
            "member {} {}",
            class_file.member_name(member).unwrap(),
            class_file.member_descriptor(member).unwrap()
        ));
        describe_attributes(cp, &member.attributes, &mut lines);
    }
    describe_attributes(cp, &class_file.attributes, &mut lines);

    lines
}

fn describe_attributes(cp: &ConstantPool, attributes: &Attributes, lines: &mut Vec<String>) {
    for attribute in attributes.iter() {
        match &attribute.kind {
            AttributeKind::Code(code) => {
                for entry in &code.exception_table {
                    lines.push(format!("catch {}", describe_entry(cp, entry.catch_type)));
                }
                for instruction in &code.instructions {
                    if let Some(index) = instruction.kind.constant_pool_index() {
                        lines.push(format!(
                            "{:#04x} {}",
                            instruction.opcode,
                            describe_entry(cp, index)
                        ));
                    }
                }
                describe_attributes(cp, &code.attributes, lines);
            }
            AttributeKind::Signature { signature_index } => {
                lines.push(format!("signature {}", cp.utf8(*signature_index).unwrap()))
            }
            AttributeKind::BootstrapMethods(bootstrap_methods) => {
                for bootstrap_method in bootstrap_methods {
                    lines.push(format!(
                        "bootstrap {}",
                        describe_entry(cp, bootstrap_method.bootstrap_method_ref)
                    ));
                    for &argument in &bootstrap_method.bootstrap_arguments {
                        lines.push(format!("argument {}", describe_entry(cp, argument)));
                    }
                }
            }
            AttributeKind::InnerClasses(inner_classes) => {
                for inner_class in inner_classes {
                    lines.push(format!(
                        "inner {} in {} named {}",
                        describe_entry(cp, inner_class.inner_class_info_index),
                        describe_entry(cp, inner_class.outer_class_info_index),
                        describe_entry(cp, inner_class.inner_name_index)
                    ));
                }
            }
            AttributeKind::NestMembers(classes) => {
                for &class in classes {
                    lines.push(format!("nest member {}", describe_entry(cp, class)));
                }
            }
            AttributeKind::NestHost { host_class_index } => {
                lines.push(format!("nest host {}", describe_entry(cp, *host_class_index)))
            }
            AttributeKind::Exceptions(classes) => {
                for &class in classes {
                    lines.push(format!("throws {}", describe_entry(cp, class)));
                }
            }
            AttributeKind::PermittedSubclasses(classes) => {
                for &class in classes {
                    lines.push(format!("permits {}", describe_entry(cp, class)));
                }
            }
            AttributeKind::EnclosingMethod(enclosing_method) => lines.push(format!(
                "enclosed by {} {}",
                describe_entry(cp, enclosing_method.class_index),
                describe_entry(cp, enclosing_method.method_index)
            )),
            AttributeKind::LocalVariableTable(local_variables) => {
                for local_variable in local_variables {
                    lines.push(format!(
                        "local {} {}",
                        cp.utf8(local_variable.name_index).unwrap(),
                        cp.utf8(local_variable.descriptor_index).unwrap()
                    ));
                }
            }
            AttributeKind::LocalVariableTypeTable(local_variables) => {
                for local_variable in local_variables {
                    lines.push(format!(
                        "local type {} {}",
                        cp.utf8(local_variable.name_index).unwrap(),
                        cp.utf8(local_variable.descriptor_index).unwrap()
                    ));
                }
            }
            kind => lines.push(format!("{:?}", kind)),
        }
    }
}

/// Resolves an entry to text, following its references.
pub fn describe_entry(cp: &ConstantPool, index: u16) -> String {
    match cp.get(index) {
        None => String::from("-"),
        Some(CpInfo::Utf8(s)) => s.clone(),
        Some(CpInfo::Class(class)) => describe_entry(cp, class.name_index),
        Some(CpInfo::NameAndType(name_and_type)) => format!(
            "{}:{}",
            describe_entry(cp, name_and_type.name_index),
            describe_entry(cp, name_and_type.descriptor_index)
        ),
        Some(CpInfo::FieldRef(ref_info))
        | Some(CpInfo::MethodRef(ref_info))
        | Some(CpInfo::InterfaceMethodRef(ref_info)) => format!(
            "{}.{}",
            describe_entry(cp, ref_info.class_index),
            describe_entry(cp, ref_info.name_and_type_index)
        ),
        Some(CpInfo::MethodHandle(method_handle)) => format!(
            "{:?} {}",
            method_handle.reference_kind,
            describe_entry(cp, method_handle.reference_index)
        ),
        Some(CpInfo::MethodType(method_type)) => {
            format!("({})", describe_entry(cp, method_type.descriptor_index))
        }
        Some(CpInfo::Dynamic(dynamic)) | Some(CpInfo::InvokeDynamic(dynamic)) => format!(
            "#{} {}",
            dynamic.bootstrap_method_attr_index,
            describe_entry(cp, dynamic.name_and_type_index)
        ),
        Some(cp_info) => format!("{:?}", cp_info),
    }
}

/// Fails unless every index reachable from the class resolves to an entry of the expected kind.
pub fn assert_consistent(class_file: &ClassFile) {
    let cp = &class_file.constant_pool;

    for (index, cp_info) in cp.iter() {
        match cp_info {
            CpInfo::Class(class) => {
                cp.utf8(class.name_index)
                    .unwrap_or_else(|e| panic!("#{}: {}", index, e));
            }
            CpInfo::String { string_index } => {
                cp.utf8(*string_index)
                    .unwrap_or_else(|e| panic!("#{}: {}", index, e));
            }
            CpInfo::NameAndType(name_and_type) => {
                cp.utf8(name_and_type.name_index)
                    .and(cp.utf8(name_and_type.descriptor_index))
                    .unwrap_or_else(|e| panic!("#{}: {}", index, e));
            }
            CpInfo::FieldRef(ref_info)
            | CpInfo::MethodRef(ref_info)
            | CpInfo::InterfaceMethodRef(ref_info) => {
                cp.class(ref_info.class_index)
                    .unwrap_or_else(|e| panic!("#{}: {}", index, e));
                cp.name_and_type(ref_info.name_and_type_index)
                    .unwrap_or_else(|e| panic!("#{}: {}", index, e));
            }
            CpInfo::MethodHandle(method_handle) => {
                cp.ref_info(method_handle.reference_index)
                    .unwrap_or_else(|e| panic!("#{}: {}", index, e));
            }
            CpInfo::MethodType(method_type) => {
                cp.utf8(method_type.descriptor_index)
                    .unwrap_or_else(|e| panic!("#{}: {}", index, e));
            }
            CpInfo::Dynamic(dynamic) | CpInfo::InvokeDynamic(dynamic) => {
                cp.name_and_type(dynamic.name_and_type_index)
                    .unwrap_or_else(|e| panic!("#{}: {}", index, e));
            }
            _ => {}
        }
    }

    class_file.class_name().unwrap();
    class_file.super_class().unwrap();
    class_file.interface_names().unwrap();
    for member in class_file.fields.iter().chain(&class_file.methods) {
        class_file.member_name(member).unwrap();
        class_file.member_descriptor(member).unwrap();
    }

    for method in &class_file.methods {
        if let Some(code) = method.attributes.code() {
            for instruction in &code.instructions {
                let result = match instruction.kind {
                    InstructionKind::Field { index } | InstructionKind::Invoke { index } => {
                        cp.ref_info(index).map(drop)
                    }
                    InstructionKind::InvokeDynamic { index } => cp.dynamic(index).map(drop),
                    InstructionKind::Type { index } | InstructionKind::Array { index } => {
                        cp.class(index).map(drop)
                    }
                    _ => Ok(()),
                };
                result.unwrap_or_else(|e| panic!("offset {}: {}", instruction.offset, e));
            }
        }
    }
}
