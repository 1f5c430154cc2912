use std::{
    fmt,
    hash::{Hash, Hasher},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

// Indexed by `Primitive as usize`.
const PRIMITIVES: [(u8, Primitive, &str); 9] = [
    (b'Z', Primitive::Boolean, "boolean"),
    (b'B', Primitive::Byte, "byte"),
    (b'C', Primitive::Char, "char"),
    (b'S', Primitive::Short, "short"),
    (b'I', Primitive::Int, "int"),
    (b'J', Primitive::Long, "long"),
    (b'F', Primitive::Float, "float"),
    (b'D', Primitive::Double, "double"),
    (b'V', Primitive::Void, "void"),
];

impl Primitive {
    pub fn from_descriptor(c: u8) -> Option<Self> {
        PRIMITIVES
            .iter()
            .find(|(descriptor, _, _)| *descriptor == c)
            .map(|(_, primitive, _)| *primitive)
    }

    pub fn descriptor(self) -> char {
        PRIMITIVES[self as usize].0 as char
    }

    pub fn name(self) -> &'static str {
        PRIMITIVES[self as usize].2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive,
    Object,
    Array,
    Method,
    TypeVariable,
    TypeParameter,
    Parameterized,
    Wildcard,
    ClassSignature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WildcardBound {
    Unbounded,
    Extends,
    Super,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    pub dimensions: u8,
    pub element_type: Box<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodType {
    pub type_parameters: Vec<TypeParameter>,
    pub parameters: Vec<Type>,
    pub return_type: Box<Type>,
    /// `^`-prefixed throws clauses, only present in generic signatures.
    pub exceptions: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub identifier: String,
    pub class_bound: Option<Box<Type>>,
    pub interface_bounds: Vec<Type>,
}

/// A member class of a parameterized type, as in `LOuter<TT;>.Inner<TU;>;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerType {
    pub name: String,
    pub type_arguments: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterizedType {
    /// Internal (slash separated) name of the raw type.
    pub raw_name: String,
    pub type_arguments: Vec<Type>,
    pub inner: Vec<InnerType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardType {
    pub bound_kind: WildcardBound,
    pub bound: Option<Box<Type>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub super_class: Box<Type>,
    pub interfaces: Vec<Type>,
}

/// A parsed field descriptor, method descriptor or generic signature.
///
/// The canonical text ([`Type::value`]) and the display text ([`Type::name`]) are derived from
/// the tree every time they are requested, so a type rebuilt from remapped parts always renders
/// consistently. Two types are equal iff their canonical text is equal.
#[derive(Debug, Clone)]
pub enum Type {
    Primitive(Primitive),
    /// Internal (slash separated) class name.
    Object(String),
    Array(ArrayType),
    Method(MethodType),
    TypeVariable(String),
    TypeParameter(TypeParameter),
    Parameterized(ParameterizedType),
    Wildcard(WildcardType),
    ClassSignature(ClassSignature),
}

impl Type {
    pub const BOOLEAN: Type = Type::Primitive(Primitive::Boolean);
    pub const BYTE: Type = Type::Primitive(Primitive::Byte);
    pub const CHAR: Type = Type::Primitive(Primitive::Char);
    pub const SHORT: Type = Type::Primitive(Primitive::Short);
    pub const INT: Type = Type::Primitive(Primitive::Int);
    pub const LONG: Type = Type::Primitive(Primitive::Long);
    pub const FLOAT: Type = Type::Primitive(Primitive::Float);
    pub const DOUBLE: Type = Type::Primitive(Primitive::Double);
    pub const VOID: Type = Type::Primitive(Primitive::Void);

    pub fn object(internal_name: impl Into<String>) -> Self {
        Type::Object(internal_name.into())
    }

    /// Nested arrays are flattened, so `array(array(I, 1), 1)` is `[[I`.
    pub fn array(element_type: Type, dimensions: u8) -> Self {
        if dimensions == 0 {
            return element_type;
        }

        match element_type {
            Type::Array(ArrayType {
                dimensions: inner,
                element_type,
            }) => Type::Array(ArrayType {
                dimensions: inner.saturating_add(dimensions),
                element_type,
            }),
            element_type => Type::Array(ArrayType {
                dimensions,
                element_type: Box::new(element_type),
            }),
        }
    }

    pub fn method(parameters: Vec<Type>, return_type: Type) -> Self {
        Self::generic_method(Vec::new(), parameters, return_type, Vec::new())
    }

    pub fn generic_method(
        type_parameters: Vec<TypeParameter>,
        parameters: Vec<Type>,
        return_type: Type,
        exceptions: Vec<Type>,
    ) -> Self {
        Type::Method(MethodType {
            type_parameters,
            parameters,
            return_type: Box::new(return_type),
            exceptions,
        })
    }

    pub fn type_variable(identifier: impl Into<String>) -> Self {
        Type::TypeVariable(identifier.into())
    }

    pub fn type_parameter(
        identifier: impl Into<String>,
        class_bound: Option<Type>,
        interface_bounds: Vec<Type>,
    ) -> Self {
        Type::TypeParameter(TypeParameter {
            identifier: identifier.into(),
            class_bound: class_bound.map(Box::new),
            interface_bounds,
        })
    }

    pub fn parameterized(raw_name: impl Into<String>, type_arguments: Vec<Type>) -> Self {
        Type::Parameterized(ParameterizedType {
            raw_name: raw_name.into(),
            type_arguments,
            inner: Vec::new(),
        })
    }

    /// The bound is dropped for [`WildcardBound::Unbounded`].
    pub fn wildcard(bound_kind: WildcardBound, bound: Option<Type>) -> Self {
        let bound = match bound_kind {
            WildcardBound::Unbounded => None,
            _ => bound.map(Box::new),
        };

        Type::Wildcard(WildcardType { bound_kind, bound })
    }

    pub fn class_signature(
        type_parameters: Vec<TypeParameter>,
        super_class: Type,
        interfaces: Vec<Type>,
    ) -> Self {
        Type::ClassSignature(ClassSignature {
            type_parameters,
            super_class: Box::new(super_class),
            interfaces,
        })
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Primitive(_) => TypeKind::Primitive,
            Type::Object(_) => TypeKind::Object,
            Type::Array(_) => TypeKind::Array,
            Type::Method(_) => TypeKind::Method,
            Type::TypeVariable(_) => TypeKind::TypeVariable,
            Type::TypeParameter(_) => TypeKind::TypeParameter,
            Type::Parameterized(_) => TypeKind::Parameterized,
            Type::Wildcard(_) => TypeKind::Wildcard,
            Type::ClassSignature(_) => TypeKind::ClassSignature,
        }
    }

    /// The internal name of an object type, or the raw type of a parameterized one.
    pub fn internal_name(&self) -> Option<&str> {
        match self {
            Type::Object(name) => Some(name),
            Type::Parameterized(parameterized) => Some(&parameterized.raw_name),
            _ => None,
        }
    }

    /// Canonical descriptor or signature text, e.g. `Ljava/util/List<+TT;>;`.
    pub fn value(&self) -> String {
        let mut out = String::new();
        self.write_value(&mut out);
        out
    }

    /// Human readable form, e.g. `java.util.List<? extends T>`.
    pub fn name(&self) -> String {
        let mut out = String::new();
        self.write_name(&mut out);
        out
    }

    /// Rebuilds this type with every class name it mentions passed through `f`. Names for which
    /// `f` returns `None` are kept.
    pub fn map_classes<F>(&self, f: &mut F) -> Type
    where
        F: FnMut(&str) -> Option<String>,
    {
        match self {
            Type::Primitive(_) | Type::TypeVariable(_) => self.clone(),
            Type::Object(name) => Type::Object(f(name).unwrap_or_else(|| name.clone())),
            Type::Array(array) => Type::Array(ArrayType {
                dimensions: array.dimensions,
                element_type: Box::new(array.element_type.map_classes(f)),
            }),
            Type::Method(method) => Type::Method(MethodType {
                type_parameters: map_type_parameters(&method.type_parameters, f),
                parameters: map_all(&method.parameters, f),
                return_type: Box::new(method.return_type.map_classes(f)),
                exceptions: map_all(&method.exceptions, f),
            }),
            Type::TypeParameter(parameter) => Type::TypeParameter(parameter.map_classes(f)),
            Type::Parameterized(parameterized) => {
                Type::Parameterized(parameterized.map_classes(f))
            }
            Type::Wildcard(wildcard) => Type::Wildcard(WildcardType {
                bound_kind: wildcard.bound_kind,
                bound: wildcard
                    .bound
                    .as_ref()
                    .map(|bound| Box::new(bound.map_classes(f))),
            }),
            Type::ClassSignature(signature) => Type::ClassSignature(ClassSignature {
                type_parameters: map_type_parameters(&signature.type_parameters, f),
                super_class: Box::new(signature.super_class.map_classes(f)),
                interfaces: map_all(&signature.interfaces, f),
            }),
        }
    }

    pub(crate) fn write_value(&self, out: &mut String) {
        match self {
            Type::Primitive(primitive) => out.push(primitive.descriptor()),
            Type::Object(name) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            Type::Array(array) => {
                (0..array.dimensions).for_each(|_| out.push('['));
                array.element_type.write_value(out);
            }
            Type::Method(method) => method.write_value(out),
            Type::TypeVariable(identifier) => {
                out.push('T');
                out.push_str(identifier);
                out.push(';');
            }
            Type::TypeParameter(parameter) => parameter.write_value(out),
            Type::Parameterized(parameterized) => parameterized.write_value(out),
            Type::Wildcard(wildcard) => match (wildcard.bound_kind, &wildcard.bound) {
                (WildcardBound::Extends, Some(bound)) => {
                    out.push('+');
                    bound.write_value(out);
                }
                (WildcardBound::Super, Some(bound)) => {
                    out.push('-');
                    bound.write_value(out);
                }
                _ => out.push('*'),
            },
            Type::ClassSignature(signature) => {
                write_type_parameter_values(&signature.type_parameters, out);
                signature.super_class.write_value(out);
                signature
                    .interfaces
                    .iter()
                    .for_each(|interface| interface.write_value(out));
            }
        }
    }

    pub(crate) fn write_name(&self, out: &mut String) {
        match self {
            Type::Primitive(primitive) => out.push_str(primitive.name()),
            Type::Object(name) => push_dotted(name, out),
            Type::Array(array) => {
                array.element_type.write_name(out);
                (0..array.dimensions).for_each(|_| out.push_str("[]"));
            }
            Type::Method(method) => {
                write_type_parameter_names(&method.type_parameters, out);
                out.push('(');
                write_names(&method.parameters, ", ", out);
                out.push_str("): ");
                method.return_type.write_name(out);
                if !method.exceptions.is_empty() {
                    out.push_str(" throws ");
                    write_names(&method.exceptions, ", ", out);
                }
            }
            Type::TypeVariable(identifier) => out.push_str(identifier),
            Type::TypeParameter(parameter) => parameter.write_name(out),
            Type::Parameterized(parameterized) => {
                push_dotted(&parameterized.raw_name, out);
                write_argument_names(&parameterized.type_arguments, out);
                for inner in &parameterized.inner {
                    out.push('.');
                    out.push_str(&inner.name);
                    write_argument_names(&inner.type_arguments, out);
                }
            }
            Type::Wildcard(wildcard) => match (wildcard.bound_kind, &wildcard.bound) {
                (WildcardBound::Extends, Some(bound)) => {
                    out.push_str("? extends ");
                    bound.write_name(out);
                }
                (WildcardBound::Super, Some(bound)) => {
                    out.push_str("? super ");
                    bound.write_name(out);
                }
                _ => out.push('?'),
            },
            Type::ClassSignature(signature) => {
                if !signature.type_parameters.is_empty() {
                    write_type_parameter_names(&signature.type_parameters, out);
                    out.push(' ');
                }
                out.push_str("extends ");
                signature.super_class.write_name(out);
                if !signature.interfaces.is_empty() {
                    out.push_str(" implements ");
                    write_names(&signature.interfaces, ", ", out);
                }
            }
        }
    }
}

impl MethodType {
    fn write_value(&self, out: &mut String) {
        write_type_parameter_values(&self.type_parameters, out);
        out.push('(');
        self.parameters
            .iter()
            .for_each(|parameter| parameter.write_value(out));
        out.push(')');
        self.return_type.write_value(out);
        for exception in &self.exceptions {
            out.push('^');
            exception.write_value(out);
        }
    }
}

impl TypeParameter {
    pub fn map_classes<F>(&self, f: &mut F) -> TypeParameter
    where
        F: FnMut(&str) -> Option<String>,
    {
        TypeParameter {
            identifier: self.identifier.clone(),
            class_bound: self
                .class_bound
                .as_ref()
                .map(|bound| Box::new(bound.map_classes(f))),
            interface_bounds: map_all(&self.interface_bounds, f),
        }
    }

    fn write_value(&self, out: &mut String) {
        out.push_str(&self.identifier);
        out.push(':');
        if let Some(bound) = &self.class_bound {
            bound.write_value(out);
        }
        for bound in &self.interface_bounds {
            out.push(':');
            bound.write_value(out);
        }
    }

    fn write_name(&self, out: &mut String) {
        out.push_str(&self.identifier);

        let bounds = self
            .class_bound
            .iter()
            .map(|bound| &**bound)
            .chain(self.interface_bounds.iter())
            .collect::<Vec<_>>();
        if bounds.is_empty() {
            return;
        }

        out.push_str(" extends ");
        for (i, bound) in bounds.into_iter().enumerate() {
            if i > 0 {
                out.push_str(" & ");
            }
            bound.write_name(out);
        }
    }
}

impl ParameterizedType {
    pub fn map_classes<F>(&self, f: &mut F) -> ParameterizedType
    where
        F: FnMut(&str) -> Option<String>,
    {
        let raw_name = f(&self.raw_name).unwrap_or_else(|| self.raw_name.clone());

        // Member classes are renamed through their binary name, `Outer$Inner`.
        let mut outer_old = self.raw_name.clone();
        let mut outer_new = raw_name.clone();
        let mut inner = Vec::with_capacity(self.inner.len());
        for suffix in &self.inner {
            let old_name = format!("{}${}", outer_old, suffix.name);
            let new_name = f(&old_name).unwrap_or_else(|| format!("{}${}", outer_new, suffix.name));
            let simple_name = new_name
                .rsplit_once('$')
                .map_or(new_name.as_str(), |(_, simple)| simple);

            inner.push(InnerType {
                name: simple_name.to_owned(),
                type_arguments: map_all(&suffix.type_arguments, f),
            });
            outer_old = old_name;
            outer_new = new_name;
        }

        ParameterizedType {
            raw_name,
            type_arguments: map_all(&self.type_arguments, f),
            inner,
        }
    }

    fn write_value(&self, out: &mut String) {
        out.push('L');
        out.push_str(&self.raw_name);
        write_argument_values(&self.type_arguments, out);
        for inner in &self.inner {
            out.push('.');
            out.push_str(&inner.name);
            write_argument_values(&inner.type_arguments, out);
        }
        out.push(';');
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value().hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value())
    }
}

fn map_all<F>(types: &[Type], f: &mut F) -> Vec<Type>
where
    F: FnMut(&str) -> Option<String>,
{
    types.iter().map(|ty| ty.map_classes(f)).collect()
}

fn map_type_parameters<F>(parameters: &[TypeParameter], f: &mut F) -> Vec<TypeParameter>
where
    F: FnMut(&str) -> Option<String>,
{
    parameters
        .iter()
        .map(|parameter| parameter.map_classes(f))
        .collect()
}

fn push_dotted(internal_name: &str, out: &mut String) {
    out.extend(internal_name.chars().map(|c| if c == '/' { '.' } else { c }));
}

fn write_names(types: &[Type], separator: &str, out: &mut String) {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        ty.write_name(out);
    }
}

fn write_argument_values(arguments: &[Type], out: &mut String) {
    if arguments.is_empty() {
        return;
    }

    out.push('<');
    arguments.iter().for_each(|argument| argument.write_value(out));
    out.push('>');
}

fn write_argument_names(arguments: &[Type], out: &mut String) {
    if arguments.is_empty() {
        return;
    }

    out.push('<');
    write_names(arguments, ", ", out);
    out.push('>');
}

fn write_type_parameter_values(parameters: &[TypeParameter], out: &mut String) {
    if parameters.is_empty() {
        return;
    }

    out.push('<');
    parameters
        .iter()
        .for_each(|parameter| parameter.write_value(out));
    out.push('>');
}

fn write_type_parameter_names(parameters: &[TypeParameter], out: &mut String) {
    if parameters.is_empty() {
        return;
    }

    out.push('<');
    for (i, parameter) in parameters.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        parameter.write_name(out);
    }
    out.push('>');
}
