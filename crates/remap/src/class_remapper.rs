use recast_class_file::{
    attributes::CodeAttribute,
    instructions::{Instruction, InstructionKind},
    Attribute, AttributeKind, Attributes, ClassFile, Member,
};
use recast_descriptor::{parse_type, Type};

use crate::{PoolRemapper, Remapper, Result};

/// Renames the classes and members of `class_file` in place.
///
/// Rewritten constant pool entries are appended to the pool and attributes referring to them are
/// marked dirty, so that writing the class back only re-encodes what changed.
///
/// An `ldc` keeps its one-byte operand. When the pool already holds more than 255 entries and
/// the constant an `ldc` loads is rewritten, the replacement lands out of its reach and writing
/// the class fails with [`ClassFileError::ConstantIndexOverflow`]. Classes parsed with
/// [`ParseFlags::SKIP_CODE_DECODING`] never fail this way, but their code is not remapped.
///
/// [`ClassFileError::ConstantIndexOverflow`]: recast_class_file::ClassFileError::ConstantIndexOverflow
/// [`ParseFlags::SKIP_CODE_DECODING`]: recast_class_file::ParseFlags::SKIP_CODE_DECODING
pub fn remap<R: Remapper>(class_file: &mut ClassFile, remapper: &mut R) -> Result<()> {
    let owner = Type::object(class_file.class_name()?);
    let bootstrap_methods = class_file.bootstrap_methods().to_vec();
    let count = class_file.constant_pool.count();
    log::debug!("Remapping {}", owner.name());

    let ClassFile {
        constant_pool,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
        ..
    } = class_file;
    let mut pool =
        PoolRemapper::new(constant_pool, remapper).with_bootstrap_methods(bootstrap_methods);

    *this_class = pool.remap_class(*this_class)?;
    if *super_class != 0 {
        *super_class = pool.remap_class(*super_class)?;
    }
    for interface in interfaces.iter_mut() {
        *interface = pool.remap_class(*interface)?;
    }

    for member in fields.iter_mut().chain(methods.iter_mut()) {
        pool.remap_member(&owner, member)?;
    }
    pool.remap_attributes(&owner, attributes)?;

    log::debug!(
        "Remapped {}, {} constant pool entries appended",
        owner.name(),
        pool.constant_pool().count() - count
    );
    Ok(())
}

/// Points `index` at `new_index` and tells whether it moved.
fn update(index: &mut u16, new_index: u16) -> bool {
    let changed = *index != new_index;
    *index = new_index;
    changed
}

impl<R: Remapper> PoolRemapper<'_, R> {
    fn remap_member(&mut self, owner: &Type, member: &mut Member) -> Result<()> {
        let ty = parse_type(self.constant_pool().utf8(member.descriptor_index)?)?;
        member.name_index = self.remap_name(owner, member.name_index, &ty)?;
        member.descriptor_index = self.remap_descriptor(member.descriptor_index)?;

        self.remap_attributes(owner, &mut member.attributes)
    }

    fn remap_attributes(&mut self, owner: &Type, attributes: &mut Attributes) -> Result<()> {
        attributes
            .iter_mut()
            .try_for_each(|attribute| self.remap_attribute(owner, attribute))
    }

    fn remap_attribute(&mut self, owner: &Type, attribute: &mut Attribute) -> Result<()> {
        let changed = match &mut attribute.kind {
            AttributeKind::Raw => false,
            AttributeKind::Code(code) => self.remap_code(owner, code)?,
            AttributeKind::Signature { signature_index } => {
                let new_index = self.remap_descriptor(*signature_index)?;
                update(signature_index, new_index)
            }
            AttributeKind::Exceptions(classes)
            | AttributeKind::PermittedSubclasses(classes)
            | AttributeKind::NestMembers(classes) => {
                let mut changed = false;
                for class_index in classes.iter_mut() {
                    let new_index = self.remap_class(*class_index)?;
                    changed |= update(class_index, new_index);
                }
                changed
            }
            AttributeKind::NestHost { host_class_index } => {
                let new_index = self.remap_class(*host_class_index)?;
                update(host_class_index, new_index)
            }
            AttributeKind::InnerClasses(inner_classes) => {
                let mut changed = false;
                for inner_class in inner_classes.iter_mut() {
                    let inner_class_info_index =
                        self.remap_class(inner_class.inner_class_info_index)?;
                    if update(
                        &mut inner_class.inner_class_info_index,
                        inner_class_info_index,
                    ) {
                        changed = true;

                        if inner_class.inner_name_index != 0 {
                            let binary_name =
                                self.constant_pool().class_name(inner_class_info_index)?;
                            let simple_name = binary_name
                                .rsplit_once('$')
                                .map_or(binary_name, |(_, simple_name)| simple_name)
                                .to_owned();
                            if simple_name
                                != self.constant_pool().utf8(inner_class.inner_name_index)?
                            {
                                inner_class.inner_name_index = self.push_utf8(simple_name)?;
                            }
                        }
                    }

                    if inner_class.outer_class_info_index != 0 {
                        let outer_class_info_index =
                            self.remap_class(inner_class.outer_class_info_index)?;
                        changed |= update(
                            &mut inner_class.outer_class_info_index,
                            outer_class_info_index,
                        );
                    }
                }
                changed
            }
            AttributeKind::BootstrapMethods(bootstrap_methods) => {
                let mut changed = false;
                for bootstrap_method in bootstrap_methods.iter_mut() {
                    let method_ref =
                        self.remap_method_handle(bootstrap_method.bootstrap_method_ref)?;
                    changed |= update(&mut bootstrap_method.bootstrap_method_ref, method_ref);

                    for argument in bootstrap_method.bootstrap_arguments.iter_mut() {
                        let new_index = self.remap_loadable(*argument)?;
                        changed |= update(argument, new_index);
                    }
                }
                changed
            }
            AttributeKind::Record(components) => {
                let mut changed = false;
                for component in components.iter_mut() {
                    let ty = parse_type(self.constant_pool().utf8(component.descriptor_index)?)?;
                    let name_index = self.remap_name(owner, component.name_index, &ty)?;
                    changed |= update(&mut component.name_index, name_index);
                    let descriptor_index = self.remap_descriptor(component.descriptor_index)?;
                    changed |= update(&mut component.descriptor_index, descriptor_index);

                    self.remap_attributes(owner, &mut component.attributes)?;
                    changed |= component.attributes.is_dirty();
                }
                changed
            }
            AttributeKind::EnclosingMethod(enclosing_method) => {
                let mut changed = false;
                if enclosing_method.method_index != 0 {
                    let enclosing_class = self.class_type(enclosing_method.class_index)?;
                    let method_index = self.remap_name_and_type(
                        enclosing_method.method_index,
                        Some(&enclosing_class),
                    )?;
                    changed |= update(&mut enclosing_method.method_index, method_index);
                }
                let class_index = self.remap_class(enclosing_method.class_index)?;
                changed |= update(&mut enclosing_method.class_index, class_index);
                changed
            }
            AttributeKind::LocalVariableTable(local_variables)
            | AttributeKind::LocalVariableTypeTable(local_variables) => {
                let mut changed = false;
                for local_variable in local_variables.iter_mut() {
                    let descriptor_index = self.remap_descriptor(local_variable.descriptor_index)?;
                    changed |= update(&mut local_variable.descriptor_index, descriptor_index);
                }
                changed
            }
        };

        if changed {
            attribute.dirty = true;
        }
        Ok(())
    }

    fn remap_code(&mut self, owner: &Type, code: &mut CodeAttribute) -> Result<bool> {
        let mut changed = false;

        for entry in code.exception_table.iter_mut() {
            if entry.catch_type != 0 {
                let catch_type = self.remap_class(entry.catch_type)?;
                changed |= update(&mut entry.catch_type, catch_type);
            }
        }

        for instruction in code.instructions.iter_mut() {
            changed |= self.remap_instruction(instruction)?;
        }

        self.remap_attributes(owner, &mut code.attributes)?;
        Ok(changed || code.attributes.is_dirty())
    }

    fn remap_instruction(&mut self, instruction: &mut Instruction) -> Result<bool> {
        let index = match instruction.kind.constant_pool_index() {
            Some(index) => index,
            None => return Ok(false),
        };

        let new_index = match instruction.kind {
            InstructionKind::Constant { .. } => self.remap_loadable(index)?,
            InstructionKind::Field { .. } | InstructionKind::Invoke { .. } => {
                self.remap_ref(index)?
            }
            InstructionKind::InvokeDynamic { .. } => self.remap_dynamic(index)?,
            InstructionKind::Type { .. } | InstructionKind::Array { .. } => {
                self.remap_class(index)?
            }
            InstructionKind::Other => index,
        };

        instruction.kind.set_constant_pool_index(new_index);
        Ok(new_index != index)
    }
}
