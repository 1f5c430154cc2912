use recast_class_file::ClassFileError;
use recast_descriptor::MalformedDescriptor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemapError {
    #[error(transparent)]
    MalformedDescriptor(#[from] MalformedDescriptor),
    #[error(transparent)]
    ClassFile(#[from] ClassFileError),
}
