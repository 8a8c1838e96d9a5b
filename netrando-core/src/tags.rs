use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{RandomiserError, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Element {
    Heat,
    Aqua,
    Elec,
    Wood,
    Recovery,
    Bonus,
    Sword,
    Invisible,
    Ground,
    Summon,
    Wind,
    Break,
    Null,
    Pa,
    Unused,
    Unused2,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Library {
    Standard,
    Mega,
    Giga,
    None,
    Pa,
}

/// What a reward grants.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Battlechip,
    /// A chip handed out by a trapped container.
    BattlechipTrap,
    Item,
    Subchip,
    NavicustProgram,
}

// On-disk order of the Battle Network 4 chip element byte.
pub const BN4_ELEMENTS: &[Element] = &[
    Element::Heat,
    Element::Aqua,
    Element::Elec,
    Element::Wood,
    Element::Recovery,
    Element::Bonus,
    Element::Sword,
    Element::Invisible,
    Element::Ground,
    Element::Summon,
    Element::Wind,
    Element::Break,
    Element::Null,
    Element::Unused2,
    Element::Pa,
    Element::Unused,
];

pub const BN4_LIBRARIES: &[Library] = &[
    Library::Standard,
    Library::Mega,
    Library::Giga,
    Library::None,
    Library::Pa,
];

pub const NUMBER_CODE_ITEM_TYPES: &[ItemKind] = &[
    ItemKind::Battlechip,
    ItemKind::Item,
    ItemKind::Subchip,
    ItemKind::NavicustProgram,
];

/// Ordered mapping between on-disk indices and tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagTable<T> {
    table: &'static str,
    tags: Vec<T>,
}

impl<T: Copy + PartialEq + fmt::Debug> TagTable<T> {
    pub fn new(table: &'static str, tags: Vec<T>) -> Self {
        Self { table, tags }
    }

    pub fn tag(&self, index: usize) -> Result<T> {
        self.tags
            .get(index)
            .copied()
            .ok_or(RandomiserError::UnknownTagIndex {
                table: self.table,
                index,
            })
    }

    pub fn index_of(&self, tag: T) -> Result<u8> {
        self.tags
            .iter()
            .position(|t| *t == tag)
            .and_then(|i| u8::try_from(i).ok())
            .ok_or_else(|| RandomiserError::UnmappedTag {
                table: self.table,
                tag: format!("{tag:?}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_both_ways() {
        let table = TagTable::new("library", BN4_LIBRARIES.to_vec());
        assert_eq!(table.tag(2).unwrap(), Library::Giga);
        assert_eq!(table.index_of(Library::Pa).unwrap(), 4);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let table = TagTable::new("element", BN4_ELEMENTS.to_vec());
        assert!(matches!(
            table.tag(16),
            Err(RandomiserError::UnknownTagIndex { table: "element", index: 16 })
        ));
    }

    #[test]
    fn missing_tag_is_an_error() {
        let table = TagTable::new("item type", NUMBER_CODE_ITEM_TYPES.to_vec());
        let err = table.index_of(ItemKind::BattlechipTrap).unwrap_err();
        assert_eq!(err.to_string(), "tag BattlechipTrap is not present in the item type table");
    }

    #[test]
    fn bn4_element_order_keeps_unused_slots() {
        let table = TagTable::new("element", BN4_ELEMENTS.to_vec());
        assert_eq!(table.tag(13).unwrap(), Element::Unused2);
        assert_eq!(table.tag(15).unwrap(), Element::Unused);
    }
}
