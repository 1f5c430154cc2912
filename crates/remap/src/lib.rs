mod class_remapper;
mod error;
mod mapping;
mod pool_remapper;

use recast_descriptor::Type;

pub use class_remapper::remap;
pub use error::RemapError;
pub use mapping::MappingRemapper;
pub use pool_remapper::PoolRemapper;

pub type Result<T, E = RemapError> = std::result::Result<T, E>;

/// Decides the new names of classes and members.
///
/// Both methods return their input unchanged to leave a symbol alone. Results are not cached by
/// the remapping pass, so equal inputs must produce equal outputs for the rewritten pool to stay
/// consistent; implementations are free to memoize.
pub trait Remapper {
    /// The replacement of any descriptor or signature found in the class.
    fn map_type(&mut self, ty: &Type) -> Type;

    /// The new name of the field or method `name` of type `ty` declared by `owner`.
    fn map_ref(&mut self, owner: &Type, name: &str, ty: &Type) -> String;
}

impl<R: Remapper + ?Sized> Remapper for &mut R {
    fn map_type(&mut self, ty: &Type) -> Type {
        (**self).map_type(ty)
    }

    fn map_ref(&mut self, owner: &Type, name: &str, ty: &Type) -> String {
        (**self).map_ref(owner, name, ty)
    }
}
