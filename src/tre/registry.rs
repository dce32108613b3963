
//! The process-wide table mapping record tags to their descriptions.
//!
//! Descriptions are registered once, typically at program start, and are
//! immutable afterwards. A tag may carry several descriptions selected by
//! the record's declared byte length, because some historical records
//! changed layout without changing their tag.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{Error, Result, UnitResult};
use super::describe::TreDescription;

/// One registered description, optionally restricted
/// to records of an exact declared length.
#[derive(Debug)]
struct Variant {
    declared_length: Option<usize>,
    description: Arc<TreDescription>,
}

fn table() -> &'static RwLock<HashMap<String, Vec<Variant>>> {
    static TABLE: OnceLock<RwLock<HashMap<String, Vec<Variant>>>> = OnceLock::new();
    TABLE.get_or_init(Default::default)
}

pub(crate) fn validate_tag(tag: &str) -> UnitResult {
    let valid = !tag.is_empty() && tag.len() <= super::TAG_LEN
        && tag.bytes().all(|byte| (0x21..=0x7e).contains(&byte));

    if valid { Ok(()) }
    else { Err(Error::schema(format!("`{}` is not a valid record tag", tag))) }
}

/// Register the description used for all records with this tag.
/// Registering the same tag again replaces the previous description.
pub fn register(tag: &str, description: TreDescription) -> UnitResult {
    insert(tag, None, description)
}

/// Register a description used only for records with this tag
/// whose declared length matches exactly.
pub fn register_for_length(tag: &str, declared_length: usize, description: TreDescription) -> UnitResult {
    insert(tag, Some(declared_length), description)
}

fn insert(tag: &str, declared_length: Option<usize>, description: TreDescription) -> UnitResult {
    validate_tag(tag)?;

    let mut table = table().write().expect("record registry was poisoned");
    let variants = table.entry(tag.to_owned()).or_default();

    match variants.iter_mut().find(|variant| variant.declared_length == declared_length) {
        Some(variant) => variant.description = Arc::new(description),
        None => variants.push(Variant { declared_length, description: Arc::new(description) }),
    }

    Ok(())
}

/// The description for a record of this tag and declared length.
/// An exact length-restricted variant wins over the generic description.
pub fn find(tag: &str, declared_length: usize) -> Option<Arc<TreDescription>> {
    let table = table().read().expect("record registry was poisoned");
    let variants = table.get(tag)?;

    variants.iter()
        .find(|variant| variant.declared_length == Some(declared_length))
        .or_else(|| variants.iter().find(|variant| variant.declared_length.is_none()))
        .map(|variant| Arc::clone(&variant.description))
}

/// The generic description for this tag, used when constructing
/// a record from scratch (its final length is not known yet).
pub fn find_any(tag: &str) -> Option<Arc<TreDescription>> {
    let table = table().read().expect("record registry was poisoned");
    let variants = table.get(tag)?;

    variants.iter()
        .find(|variant| variant.declared_length.is_none())
        .or_else(|| variants.first())
        .map(|variant| Arc::clone(&variant.description))
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::tre::describe::Descriptor;

    fn simple(width: usize) -> TreDescription {
        TreDescription::compile(&[
            Descriptor::bcs_a("VALUE", width, "Value"),
            Descriptor::End,
        ]).unwrap()
    }

    #[test]
    fn invalid_tags_are_rejected() {
        assert!(register("", simple(1)).is_err());
        assert!(register("TOOLONGTAG", simple(1)).is_err());
        assert!(register("HAS SP", simple(1)).is_err());
    }

    #[test]
    fn length_variants_take_precedence() {
        register("TSTVAR", simple(4)).unwrap();
        register_for_length("TSTVAR", 8, simple(8)).unwrap();

        assert_eq!(find("TSTVAR", 8).unwrap(), Arc::new(simple(8)));
        assert_eq!(find("TSTVAR", 4).unwrap(), Arc::new(simple(4)));
        assert_eq!(find("TSTVAR", 99).unwrap(), Arc::new(simple(4))); // generic fallback
        assert!(find("UNSEEN", 4).is_none());
    }
}
