//! Per-title layout and tag tables, loaded from JSON.
//!
//! ```json
//! {
//!   "name": "bn4-red-sun",
//!   "chip_table": { "offset": 73728, "count": 390 },
//!   "number_codes": { "offset": 8192, "length": 120, "base_pointer": -134217728 }
//! }
//! ```
//!
//! Tag tables and the cipher key fall back to the Battle Network 4 / 5-6
//! values when omitted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::cipher::{NumberCodeCipher, DEFAULT_KEY, KEY_LEN};
use crate::records::{ChipCodec, NumberCodeCodec};
use crate::tags::{Element, ItemKind, Library, TagTable, BN4_ELEMENTS, BN4_LIBRARIES, NUMBER_CODE_ITEM_TYPES};
use crate::{RandomiserError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLocation {
    pub offset: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerTableLayout {
    pub offset: usize,
    pub length: usize,
    /// Added to every entry; GBA ROM pointers use `-0x0800_0000`.
    #[serde(default)]
    pub base_pointer: i64,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default = "default_true")]
    pub ignore_null: bool,
    #[serde(default = "default_records_per_entry")]
    pub records_per_entry: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProfile {
    pub name: String,
    #[serde(default = "default_element_tags")]
    pub element_tags: Vec<Element>,
    #[serde(default = "default_library_tags")]
    pub library_tags: Vec<Library>,
    #[serde(default = "default_item_types")]
    pub item_types: Vec<ItemKind>,
    #[serde(default = "default_cipher_key")]
    pub cipher_key: [u8; KEY_LEN],
    pub chip_table: TableLocation,
    pub number_codes: PointerTableLayout,
}

fn default_true() -> bool {
    true
}

fn default_records_per_entry() -> usize {
    1
}

fn default_element_tags() -> Vec<Element> {
    BN4_ELEMENTS.to_vec()
}

fn default_library_tags() -> Vec<Library> {
    BN4_LIBRARIES.to_vec()
}

fn default_item_types() -> Vec<ItemKind> {
    NUMBER_CODE_ITEM_TYPES.to_vec()
}

fn default_cipher_key() -> [u8; KEY_LEN] {
    DEFAULT_KEY
}

impl GameProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let profile: GameProfile = serde_json::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<()> {
        if self.element_tags.is_empty() || self.library_tags.is_empty() || self.item_types.is_empty() {
            return Err(RandomiserError::Config(format!(
                "profile {}: tag tables must not be empty",
                self.name
            )));
        }
        if self.element_tags.len() > 256 || self.library_tags.len() > 256 || self.item_types.len() > 256 {
            return Err(RandomiserError::Config(format!(
                "profile {}: tag tables are indexed by a single byte",
                self.name
            )));
        }
        if self.number_codes.records_per_entry == 0 {
            return Err(RandomiserError::Config(format!(
                "profile {}: records_per_entry must be at least 1",
                self.name
            )));
        }
        Ok(())
    }

    pub fn chip_codec(&self) -> ChipCodec {
        ChipCodec::new(
            TagTable::new("element", self.element_tags.clone()),
            TagTable::new("library", self.library_tags.clone()),
            self.chip_table.offset,
        )
    }

    pub fn number_code_codec(&self) -> NumberCodeCodec {
        NumberCodeCodec::new(
            TagTable::new("item type", self.item_types.clone()),
            NumberCodeCipher::new(self.cipher_key),
        )
    }
}
