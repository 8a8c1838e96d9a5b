use std::ops::RangeInclusive;

use crate::records::{BattleChip, ChipCodec};
use crate::stream::ByteStream;
use crate::strategy::{ArrayStrategy, StreamStrategy};
use crate::tags::{Element, Library};
use crate::Result;

/// Filter for [`ChipCatalog::query`]. `None` matches anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChipQuery {
    pub element: Option<Element>,
    pub rarity: RangeInclusive<u16>,
    /// Only chips that come in this code.
    pub code: Option<u8>,
    pub library: Option<Library>,
    pub index: RangeInclusive<u16>,
}

impl Default for ChipQuery {
    fn default() -> Self {
        Self {
            element: None,
            rarity: 1..=256,
            code: None,
            library: None,
            index: 0..=u16::MAX,
        }
    }
}

impl ChipQuery {
    pub fn matches(&self, chip: &BattleChip) -> bool {
        self.element.map_or(true, |e| e == chip.element)
            && self.rarity.contains(&chip.rarity)
            && self.code.map_or(true, |c| chip.has_code(c))
            && self.library.map_or(true, |l| l == chip.library)
            && self.index.contains(&chip.index)
    }
}

pub trait ChipCatalog {
    fn chip(&self, index: u16) -> Option<BattleChip>;

    /// Chips matching `query`, in table order. May be empty.
    fn query(&self, query: &ChipQuery) -> Vec<BattleChip>;
}

#[derive(Clone, Debug, Default)]
pub struct ChipLibrary {
    chips: Vec<BattleChip>,
}

impl ChipLibrary {
    pub fn new(chips: Vec<BattleChip>) -> Self {
        Self { chips }
    }

    /// Decode `count` consecutive chip records starting at the stream's position.
    pub fn load(stream: &mut ByteStream<'_>, codec: &ChipCodec, count: usize) -> Result<Self> {
        let mut chips = Vec::new();
        ArrayStrategy::new(
            |s: &mut ByteStream<'_>| -> Result<()> {
                chips.push(codec.decode(s)?);
                Ok(())
            },
            count,
        )
        .execute(stream)?;
        Ok(Self { chips })
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }
}

impl ChipCatalog for ChipLibrary {
    fn chip(&self, index: u16) -> Option<BattleChip> {
        self.chips.iter().find(|c| c.index == index).cloned()
    }

    fn query(&self, query: &ChipQuery) -> Vec<BattleChip> {
        self.chips.iter().filter(|c| query.matches(c)).cloned().collect()
    }
}
