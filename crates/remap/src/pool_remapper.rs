use recast_class_file::{
    attributes::BootstrapMethod, tags, ClassInfo, ConstantPool, CpInfo, DynamicInfo,
    MethodHandleInfo, MethodTypeInfo, NameAndTypeInfo, RefInfo, ReferenceKind,
};
use recast_descriptor::{parse_type, Type};

use crate::{Remapper, Result};

const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";
const METAFACTORY: (&str, &str) = (
    "metafactory",
    "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;",
);
const ALT_METAFACTORY: (&str, &str) = (
    "altMetafactory",
    "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;[Ljava/lang/Object;)Ljava/lang/invoke/CallSite;",
);

/// Rewrites individual constant pool entries.
///
/// Every `remap_*` method takes the index of an entry and returns the index of its replacement.
/// An entry that does not change is returned as is; otherwise the replacement, and whatever
/// entries it refers to, are appended to the pool. Existing entries are never modified.
pub struct PoolRemapper<'a, R> {
    constant_pool: &'a mut ConstantPool,
    remapper: R,
    bootstrap_methods: Vec<BootstrapMethod>,
}
impl<'a, R: Remapper> PoolRemapper<'a, R> {
    pub fn new(constant_pool: &'a mut ConstantPool, remapper: R) -> Self {
        Self {
            constant_pool,
            remapper,
            bootstrap_methods: Vec::new(),
        }
    }

    /// The bootstrap method table that dynamic entries refer to. Without it, lambda call sites
    /// are remapped like any other dynamic entry.
    pub fn with_bootstrap_methods(mut self, bootstrap_methods: Vec<BootstrapMethod>) -> Self {
        self.bootstrap_methods = bootstrap_methods;
        self
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        self.constant_pool
    }

    /// A Utf8 entry holding a descriptor or a signature.
    pub fn remap_descriptor(&mut self, index: u16) -> Result<u16> {
        let ty = parse_type(self.constant_pool.utf8(index)?)?;
        let new_ty = self.remapper.map_type(&ty);
        if new_ty == ty {
            return Ok(index);
        }

        self.push_utf8(new_ty.value())
    }

    pub fn remap_class(&mut self, index: u16) -> Result<u16> {
        let ty = self.class_type(index)?;
        let new_ty = self.remapper.map_type(&ty);
        if new_ty == ty {
            return Ok(index);
        }

        // Array classes are named by their descriptor.
        let name = match new_ty.internal_name() {
            Some(name) => name.to_owned(),
            None => new_ty.value(),
        };
        let name_index = self.push_utf8(name)?;
        self.push(CpInfo::Class(ClassInfo { name_index }))
    }

    /// A field, method or interface method reference.
    pub fn remap_ref(&mut self, index: u16) -> Result<u16> {
        let ref_info = self.constant_pool.ref_info(index)?.clone();
        let name_and_type = self
            .constant_pool
            .name_and_type(ref_info.name_and_type_index)?
            .clone();

        let owner = self.class_type(ref_info.class_index)?;
        let name = self.constant_pool.utf8(name_and_type.name_index)?.to_owned();
        let ty = parse_type(self.constant_pool.utf8(name_and_type.descriptor_index)?)?;

        let new_name = self.remapper.map_ref(&owner, &name, &ty);
        let new_ty = self.remapper.map_type(&ty);

        let name_index = if new_name != name {
            self.push_utf8(new_name)?
        } else {
            name_and_type.name_index
        };
        let descriptor_index = if new_ty != ty {
            self.push_utf8(new_ty.value())?
        } else {
            name_and_type.descriptor_index
        };
        let class_index = self.remap_class(ref_info.class_index)?;

        if class_index == ref_info.class_index
            && name_index == name_and_type.name_index
            && descriptor_index == name_and_type.descriptor_index
        {
            return Ok(index);
        }

        let name_and_type_index = self.push(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))?;

        let rebuild: fn(RefInfo) -> CpInfo = match self.constant_pool[index] {
            CpInfo::FieldRef(_) => CpInfo::FieldRef,
            CpInfo::MethodRef(_) => CpInfo::MethodRef,
            _ => CpInfo::InterfaceMethodRef,
        };
        self.push(rebuild(RefInfo {
            class_index,
            name_and_type_index,
        }))
    }

    /// Renames through [`Remapper::map_ref`] when an `owner` is given and remaps the descriptor.
    /// Without an owner the name is kept.
    pub fn remap_name_and_type(&mut self, index: u16, owner: Option<&Type>) -> Result<u16> {
        let name_and_type = self.constant_pool.name_and_type(index)?.clone();

        let name_index = match owner {
            Some(owner) => {
                let ty = parse_type(self.constant_pool.utf8(name_and_type.descriptor_index)?)?;
                self.remap_name(owner, name_and_type.name_index, &ty)?
            }
            None => name_and_type.name_index,
        };
        let descriptor_index = self.remap_descriptor(name_and_type.descriptor_index)?;

        if name_index == name_and_type.name_index
            && descriptor_index == name_and_type.descriptor_index
        {
            return Ok(index);
        }

        self.push(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    pub fn remap_method_handle(&mut self, index: u16) -> Result<u16> {
        let method_handle = self.constant_pool.method_handle(index)?.clone();
        let reference_index = self.remap_ref(method_handle.reference_index)?;
        if reference_index == method_handle.reference_index {
            return Ok(index);
        }

        self.push(CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind: method_handle.reference_kind,
            reference_index,
        }))
    }

    pub fn remap_method_type(&mut self, index: u16) -> Result<u16> {
        let method_type = self.constant_pool.method_type(index)?.clone();
        let descriptor_index = self.remap_descriptor(method_type.descriptor_index)?;
        if descriptor_index == method_type.descriptor_index {
            return Ok(index);
        }

        self.push(CpInfo::MethodType(MethodTypeInfo { descriptor_index }))
    }

    /// A dynamically-computed constant or call site.
    ///
    /// Call sites bootstrapped by the lambda metafactory are renamed after the functional
    /// interface method they implement, whose erased type is the first bootstrap argument.
    /// Other dynamic entries keep their name and only have their descriptor remapped.
    pub fn remap_dynamic(&mut self, index: u16) -> Result<u16> {
        let dynamic = self.constant_pool.dynamic(index)?.clone();
        let name_and_type_index = dynamic.name_and_type_index;

        let mut new_name_and_type_index = None;
        if let Some((owner, name, ty)) = self.lambda_implemented_method(&dynamic)? {
            let new_name = self.remapper.map_ref(&owner, &name, &ty);
            if new_name != name {
                let descriptor_index = self
                    .constant_pool
                    .name_and_type(name_and_type_index)?
                    .descriptor_index;
                let name_index = self.push_utf8(new_name)?;
                let descriptor_index = self.remap_descriptor(descriptor_index)?;
                new_name_and_type_index = Some(self.push(CpInfo::NameAndType(
                    NameAndTypeInfo {
                        name_index,
                        descriptor_index,
                    },
                ))?);
            }
        }

        let new_name_and_type_index = match new_name_and_type_index {
            Some(new_name_and_type_index) => new_name_and_type_index,
            None => self.remap_name_and_type(name_and_type_index, None)?,
        };
        if new_name_and_type_index == name_and_type_index {
            return Ok(index);
        }

        let info = DynamicInfo {
            bootstrap_method_attr_index: dynamic.bootstrap_method_attr_index,
            name_and_type_index: new_name_and_type_index,
        };
        let cp_info = match self.constant_pool[index] {
            CpInfo::Dynamic(_) => CpInfo::Dynamic(info),
            _ => CpInfo::InvokeDynamic(info),
        };
        self.push(cp_info)
    }

    /// Any entry an `ldc` or a bootstrap argument may load. Entries that hold no symbolic
    /// reference, such as strings and numbers, are returned unchanged.
    pub fn remap_loadable(&mut self, index: u16) -> Result<u16> {
        match self.constant_pool.get(index).and_then(CpInfo::tag) {
            Some(tags::CLASS) => self.remap_class(index),
            Some(tags::METHOD_HANDLE) => self.remap_method_handle(index),
            Some(tags::METHOD_TYPE) => self.remap_method_type(index),
            Some(tags::DYNAMIC) => self.remap_dynamic(index),
            _ => Ok(index),
        }
    }

    /// The name of a member declared by `owner`, held by the Utf8 entry at `name_index`.
    pub(crate) fn remap_name(&mut self, owner: &Type, name_index: u16, ty: &Type) -> Result<u16> {
        let name = self.constant_pool.utf8(name_index)?;
        let new_name = self.remapper.map_ref(owner, name, ty);
        if new_name == name {
            return Ok(name_index);
        }

        self.push_utf8(new_name)
    }

    pub(crate) fn push_utf8(&mut self, string: String) -> Result<u16> {
        self.push(CpInfo::Utf8(string))
    }

    /// The type named by the Class entry at `index`.
    pub(crate) fn class_type(&self, index: u16) -> Result<Type> {
        let name = self.constant_pool.class_name(index)?;
        if name.starts_with('[') {
            Ok(parse_type(name)?)
        } else {
            Ok(Type::object(name))
        }
    }

    fn push(&mut self, cp_info: CpInfo) -> Result<u16> {
        Ok(self.constant_pool.push(cp_info)?)
    }

    /// The owner, name and type of the method a lambda call site implements, if it is one.
    fn lambda_implemented_method(
        &self,
        dynamic: &DynamicInfo,
    ) -> Result<Option<(Type, String, Type)>> {
        let bootstrap_method =
            match self.bootstrap_methods.get(dynamic.bootstrap_method_attr_index as usize) {
                Some(bootstrap_method) => bootstrap_method,
                None => return Ok(None),
            };
        if !self.is_lambda_metafactory(bootstrap_method.bootstrap_method_ref)? {
            return Ok(None);
        }

        let name_and_type = self.constant_pool.name_and_type(dynamic.name_and_type_index)?;
        let name = self.constant_pool.utf8(name_and_type.name_index)?;
        let call_site_type = parse_type(self.constant_pool.utf8(name_and_type.descriptor_index)?)?;
        let owner = match call_site_type {
            Type::Method(method) if matches!(*method.return_type, Type::Object(_)) => {
                *method.return_type
            }
            _ => return Ok(None),
        };

        let implemented_descriptor_index = match bootstrap_method
            .bootstrap_arguments
            .first()
            .and_then(|&argument| self.constant_pool.get(argument))
        {
            Some(CpInfo::MethodType(method_type)) => method_type.descriptor_index,
            _ => return Ok(None),
        };
        let ty = parse_type(self.constant_pool.utf8(implemented_descriptor_index)?)?;

        Ok(Some((owner, name.to_owned(), ty)))
    }

    fn is_lambda_metafactory(&self, method_handle_index: u16) -> Result<bool> {
        let method_handle = self.constant_pool.method_handle(method_handle_index)?;
        if method_handle.reference_kind != ReferenceKind::InvokeStatic {
            return Ok(false);
        }

        let ref_info = self.constant_pool.ref_info(method_handle.reference_index)?;
        if self.constant_pool.class_name(ref_info.class_index)? != LAMBDA_METAFACTORY {
            return Ok(false);
        }

        let name_and_type = self.constant_pool.name_and_type(ref_info.name_and_type_index)?;
        let method = (
            self.constant_pool.utf8(name_and_type.name_index)?,
            self.constant_pool.utf8(name_and_type.descriptor_index)?,
        );

        Ok(method == METAFACTORY || method == ALT_METAFACTORY)
    }
}

#[cfg(test)]
mod remap_entry_tests {
    use super::*;
    use crate::MappingRemapper;

    struct Pool(ConstantPool);
    impl Pool {
        fn utf8(&mut self, s: &str) -> u16 {
            self.0.push(CpInfo::Utf8(String::from(s))).unwrap()
        }

        fn class(&mut self, name: &str) -> u16 {
            let name_index = self.utf8(name);
            self.0.push(CpInfo::Class(ClassInfo { name_index })).unwrap()
        }

        fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
            let class_index = self.class(owner);
            let name_index = self.utf8(name);
            let descriptor_index = self.utf8(descriptor);
            let name_and_type_index = self
                .0
                .push(CpInfo::NameAndType(NameAndTypeInfo {
                    name_index,
                    descriptor_index,
                }))
                .unwrap();
            self.0
                .push(CpInfo::MethodRef(RefInfo {
                    class_index,
                    name_and_type_index,
                }))
                .unwrap()
        }
    }

    fn pool() -> Pool {
        Pool(ConstantPool::default())
    }

    fn renaming_foo() -> MappingRemapper {
        let mut remapper = MappingRemapper::new();
        remapper.rename_class("com/acme/Foo", "org/example/Bar");
        remapper
    }

    #[test]
    fn it_should_keep_an_unchanged_class() {
        let mut cp = pool();
        let index = cp.class("java/lang/Object");
        let count = cp.0.count();

        let new_index = PoolRemapper::new(&mut cp.0, renaming_foo())
            .remap_class(index)
            .unwrap();

        assert_eq!(index, new_index);
        assert_eq!(count, cp.0.count());
    }

    #[test]
    fn it_should_append_a_renamed_class() {
        let mut cp = pool();
        let index = cp.class("com/acme/Foo");

        let new_index = PoolRemapper::new(&mut cp.0, renaming_foo())
            .remap_class(index)
            .unwrap();

        assert_ne!(index, new_index);
        assert_eq!("org/example/Bar", cp.0.class_name(new_index).unwrap());
        assert_eq!("com/acme/Foo", cp.0.class_name(index).unwrap());
        assert!(cp.0.is_dirty(new_index));
    }

    #[test]
    fn it_should_rename_array_classes_by_descriptor() {
        let mut cp = pool();
        let index = cp.class("[[Lcom/acme/Foo;");

        let new_index = PoolRemapper::new(&mut cp.0, renaming_foo())
            .remap_class(index)
            .unwrap();

        assert_eq!("[[Lorg/example/Bar;", cp.0.class_name(new_index).unwrap());
    }

    #[test]
    fn it_should_rewrite_the_owner_and_descriptor_of_a_ref() {
        let mut cp = pool();
        let index = cp.method_ref("com/acme/Foo", "make", "(Lcom/acme/Foo;)V");

        let new_index = PoolRemapper::new(&mut cp.0, renaming_foo())
            .remap_ref(index)
            .unwrap();

        let ref_info = cp.0.ref_info(new_index).unwrap();
        let name_and_type = cp.0.name_and_type(ref_info.name_and_type_index).unwrap();
        assert!(matches!(cp.0.get(new_index), Some(CpInfo::MethodRef(_))));
        assert_eq!("org/example/Bar", cp.0.class_name(ref_info.class_index).unwrap());
        assert_eq!("make", cp.0.utf8(name_and_type.name_index).unwrap());
        assert_eq!(
            "(Lorg/example/Bar;)V",
            cp.0.utf8(name_and_type.descriptor_index).unwrap()
        );
    }

    #[test]
    fn it_should_rename_a_ref_by_its_original_owner_and_descriptor() {
        let mut cp = pool();
        let index = cp.method_ref("com/acme/Foo", "bar", "()V");
        let mut remapper = renaming_foo();
        remapper.rename_member("com/acme/Foo", "bar", "()V", "baz");

        let new_index = PoolRemapper::new(&mut cp.0, remapper)
            .remap_ref(index)
            .unwrap();

        let ref_info = cp.0.ref_info(new_index).unwrap();
        let name_and_type = cp.0.name_and_type(ref_info.name_and_type_index).unwrap();
        assert_eq!("baz", cp.0.utf8(name_and_type.name_index).unwrap());
    }

    #[test]
    fn it_should_rebuild_a_method_handle_around_a_remapped_ref() {
        let mut cp = pool();
        let reference_index = cp.method_ref("com/acme/Foo", "create", "()V");
        let index = cp
            .0
            .push(CpInfo::MethodHandle(MethodHandleInfo {
                reference_kind: ReferenceKind::InvokeStatic,
                reference_index,
            }))
            .unwrap();

        let new_index = PoolRemapper::new(&mut cp.0, renaming_foo())
            .remap_method_handle(index)
            .unwrap();

        let method_handle = cp.0.method_handle(new_index).unwrap();
        assert_eq!(ReferenceKind::InvokeStatic, method_handle.reference_kind);
        assert_ne!(reference_index, method_handle.reference_index);
    }

    #[test]
    fn it_should_rebuild_a_method_type_around_a_remapped_descriptor() {
        let mut cp = pool();
        let descriptor_index = cp.utf8("(Lcom/acme/Foo;)V");
        let index = cp
            .0
            .push(CpInfo::MethodType(MethodTypeInfo { descriptor_index }))
            .unwrap();
        let unchanged_descriptor_index = cp.utf8("(I)V");
        let unchanged = cp
            .0
            .push(CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: unchanged_descriptor_index,
            }))
            .unwrap();

        let mut pool_remapper = PoolRemapper::new(&mut cp.0, renaming_foo());
        let new_index = pool_remapper.remap_loadable(index).unwrap();
        assert_eq!(unchanged, pool_remapper.remap_method_type(unchanged).unwrap());

        let method_type = cp.0.method_type(new_index).unwrap();
        assert_eq!(
            "(Lorg/example/Bar;)V",
            cp.0.utf8(method_type.descriptor_index).unwrap()
        );
        assert_eq!(descriptor_index, cp.0.method_type(index).unwrap().descriptor_index);
    }

    #[test]
    fn it_should_leave_strings_and_numbers_alone() {
        let mut cp = pool();
        let string_index = cp.utf8("com/acme/Foo");
        let string = cp.0.push(CpInfo::String { string_index }).unwrap();
        let long = cp.0.push(CpInfo::Long(1)).unwrap();

        let mut pool_remapper = PoolRemapper::new(&mut cp.0, renaming_foo());

        assert_eq!(string, pool_remapper.remap_loadable(string).unwrap());
        assert_eq!(long, pool_remapper.remap_loadable(long).unwrap());
    }

    #[test]
    fn it_should_keep_the_name_of_a_plain_dynamic_constant() {
        let mut cp = pool();
        let name_index = cp.utf8("foo");
        let descriptor_index = cp.utf8("Lcom/acme/Foo;");
        let name_and_type_index = cp
            .0
            .push(CpInfo::NameAndType(NameAndTypeInfo {
                name_index,
                descriptor_index,
            }))
            .unwrap();
        let index = cp
            .0
            .push(CpInfo::Dynamic(DynamicInfo {
                bootstrap_method_attr_index: 0,
                name_and_type_index,
            }))
            .unwrap();
        let mut remapper = renaming_foo();
        remapper.rename_member("com/acme/Foo", "foo", "Lcom/acme/Foo;", "renamed");

        let new_index = PoolRemapper::new(&mut cp.0, remapper)
            .remap_dynamic(index)
            .unwrap();

        let dynamic = cp.0.dynamic(new_index).unwrap();
        let name_and_type = cp.0.name_and_type(dynamic.name_and_type_index).unwrap();
        assert!(matches!(cp.0.get(new_index), Some(CpInfo::Dynamic(_))));
        assert_eq!(name_index, name_and_type.name_index);
        assert_eq!(
            "Lorg/example/Bar;",
            cp.0.utf8(name_and_type.descriptor_index).unwrap()
        );
    }

    #[test]
    fn it_should_fail_on_a_malformed_descriptor() {
        let mut cp = pool();
        let index = cp.utf8("Lcom/acme/Foo");

        assert!(matches!(
            PoolRemapper::new(&mut cp.0, renaming_foo()).remap_descriptor(index),
            Err(crate::RemapError::MalformedDescriptor(_))
        ));
    }
}
