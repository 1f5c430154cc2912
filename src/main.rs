use std::{env, error::Error, fs, process};

use recast_class_file::{ClassFile, ClassFileError};
use recast_remap::{remap, MappingRemapper};

const USAGE: &str = "usage: recast <input.class> <output.class> [old=new | owner.name:descriptor=new]...";

fn main() {
    pretty_env_logger::init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let (input, output, renames) = match args.as_slice() {
        [input, output, renames @ ..] => (input, output, renames),
        _ => {
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    if let Err(e) = run(input, output, renames) {
        eprintln!("recast: {}", e);
        process::exit(1);
    }
}

fn run(input: &str, output: &str, renames: &[String]) -> Result<(), Box<dyn Error>> {
    let mut remapper = MappingRemapper::new();
    for rename in renames {
        let Some((old, new)) = rename.split_once('=') else {
            return Err(format!("Expected old=new, found {:?}", rename).into());
        };

        match parse_member(old) {
            Some((owner, name, descriptor)) => remapper.rename_member(owner, name, descriptor, new),
            None => remapper.rename_class(old, new),
        };
    }

    let mut class_file = ClassFile::parse(fs::File::open(input)?)?;
    let count = class_file.constant_pool.count();
    remap(&mut class_file, &mut remapper)?;

    if class_file.constant_pool.count() == count {
        log::warn!("Nothing in {} was renamed", class_file.class_name()?);
    }

    let bytes = class_file
        .to_bytes()
        .map_err(|e| explain_write_error(&class_file, e))?;
    fs::write(output, bytes)?;
    Ok(())
}

/// Splits `owner.name:descriptor`.
fn parse_member(s: &str) -> Option<(&str, &str, &str)> {
    let (member, descriptor) = s.split_once(':')?;
    let (owner, name) = member.rsplit_once('.')?;
    Some((owner, name, descriptor))
}

fn explain_write_error(class_file: &ClassFile, e: ClassFileError) -> Box<dyn Error> {
    if let ClassFileError::ConstantIndexOverflow { index, offset } = e {
        if let Ok(message) = ldc_overflow_message(class_file, index, offset) {
            return message.into();
        }
    }
    e.into()
}

/// Names the method holding the `ldc` that can no longer reach its constant.
fn ldc_overflow_message(
    class_file: &ClassFile,
    index: u16,
    offset: u32,
) -> Result<String, ClassFileError> {
    let method = class_file.methods.iter().find(|method| {
        method.attributes.code().map_or(false, |code| {
            code.instructions.iter().any(|instruction| {
                instruction.offset == offset && instruction.kind.constant_pool_index() == Some(index)
            })
        })
    });

    let location = match method {
        Some(method) => format!(
            "{}.{}{}",
            class_file.class_name()?,
            class_file.member_name(method)?,
            class_file.member_descriptor(method)?
        ),
        None => class_file.class_name()?.to_owned(),
    };
    Ok(format!(
        "ldc at offset {} of {} cannot address renamed constant #{}: the constant pool \
         outgrew its one-byte operand and ldc is never widened to ldc_w",
        offset, location, index
    ))
}
