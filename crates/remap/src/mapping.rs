use std::collections::HashMap;

use recast_descriptor::Type;

use crate::Remapper;

/// A [`Remapper`] driven by tables of class and member renames.
///
/// Class renames apply wherever the class appears, including inside arrays, method types and
/// generic signatures. Member renames are keyed by the owner, name and descriptor found in the
/// class being remapped, that is before any class rename is applied.
#[derive(Debug, Default, Clone)]
pub struct MappingRemapper {
    classes: HashMap<String, String>,
    members: HashMap<(String, String, String), String>,
}
impl MappingRemapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename_class(
        &mut self,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> &mut Self {
        self.classes.insert(old_name.into(), new_name.into());
        self
    }

    pub fn rename_member(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        new_name: impl Into<String>,
    ) -> &mut Self {
        self.members
            .insert((owner.into(), name.into(), descriptor.into()), new_name.into());
        self
    }

    /// The new internal name of the class `name`, if it is renamed.
    pub fn class_name(&self, name: &str) -> Option<&str> {
        self.classes.get(name).map(String::as_str)
    }

    /// A mapping undoing this one.
    ///
    /// Member renames are keyed by their new name and the descriptor as it reads after the
    /// class renames.
    pub fn inverse(&self) -> Self {
        let mut inverse = Self::new();
        for (old_name, new_name) in &self.classes {
            inverse.rename_class(new_name.as_str(), old_name.as_str());
        }
        for ((owner, name, descriptor), new_name) in &self.members {
            let new_owner = self.class_name(owner).unwrap_or(owner.as_str());
            let new_descriptor = match recast_descriptor::parse_type(descriptor) {
                Ok(ty) => self.rename_classes(&ty).value(),
                Err(_) => descriptor.clone(),
            };
            inverse.rename_member(new_owner, new_name.as_str(), new_descriptor, name.as_str());
        }
        inverse
    }

    fn rename_classes(&self, ty: &Type) -> Type {
        ty.map_classes(&mut |name: &str| self.classes.get(name).cloned())
    }
}
impl Remapper for MappingRemapper {
    fn map_type(&mut self, ty: &Type) -> Type {
        self.rename_classes(ty)
    }

    fn map_ref(&mut self, owner: &Type, name: &str, ty: &Type) -> String {
        let owner = match owner.internal_name() {
            Some(owner) => owner,
            None => return name.to_owned(),
        };

        self.members
            .get(&(owner.to_owned(), name.to_owned(), ty.value()))
            .cloned()
            .unwrap_or_else(|| name.to_owned())
    }
}

impl<S: Into<String>> FromIterator<(S, S)> for MappingRemapper {
    /// Collects `(old, new)` class renames.
    fn from_iter<I: IntoIterator<Item = (S, S)>>(iter: I) -> Self {
        let mut remapper = Self::new();
        for (old_name, new_name) in iter {
            remapper.rename_class(old_name, new_name);
        }
        remapper
    }
}
