//! Fixed-size record layouts and their codecs.
//!
//! A decoded record remembers the [`Span`] it came from. Encoding starts
//! from the bytes currently at that span and only patches known fields, so
//! any byte the codec does not understand survives a round trip unchanged.

use crate::bytes;
use crate::cipher::{NumberCodeCipher, CODE_LEN};
use crate::stream::{ByteStream, Span};
use crate::tags::{Element, ItemKind, Library, TagTable};
use crate::{RandomiserError, Result};

pub const CHIP_RECORD_SIZE: usize = 44;
pub const NUMBER_CODE_RECORD_SIZE: usize = 12;

/// Marks an unused code slot in a chip record.
pub const CODE_NONE: u8 = 0xFF;

const CHIP_CODES: usize = 0;
const CHIP_RARITY: usize = 5;
const CHIP_MB: usize = 6;
const CHIP_ELEMENT: usize = 7;
const CHIP_LIBRARY: usize = 8;
const CHIP_FLAGS: usize = 9;
const CHIP_IN_LIBRARY_BIT: u32 = 6;
const CHIP_ID_POSITION: usize = 28;

/// Letter shown in game for a chip code byte.
pub fn code_letter(code: u8) -> Option<char> {
    match code {
        0..=25 => Some(char::from(b'A' + code)),
        26 => Some('*'),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleChip {
    pub index: u16,
    pub span: Span,
    /// Raw code slots; unused slots hold [`CODE_NONE`].
    pub codes: [u8; 4],
    /// One-based.
    pub rarity: u16,
    pub mb: u8,
    pub element: Element,
    pub library: Library,
    pub id_position: u16,
    pub in_library: bool,
}

impl BattleChip {
    /// Codes this chip can actually come in.
    pub fn codes(&self) -> Vec<u8> {
        self.codes.iter().copied().filter(|&c| c != CODE_NONE).collect()
    }

    pub fn has_code(&self, code: u8) -> bool {
        code != CODE_NONE && self.codes.contains(&code)
    }
}

/// A reward as stored in number-code and similar tables.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    pub value: u16,
    pub sub_value: u8,
}

impl Item {
    pub fn is_chip(&self) -> bool {
        matches!(self.kind, ItemKind::Battlechip | ItemKind::BattlechipTrap)
    }

    pub fn chip_index(&self) -> Option<u16> {
        self.is_chip().then_some(self.value)
    }

    /// Chip code, meaningful for chip rewards only.
    pub fn code(&self) -> u8 {
        self.sub_value
    }

    pub fn set_chip_code(&mut self, chip: &BattleChip, code: u8) {
        self.kind = ItemKind::Battlechip;
        self.value = chip.index;
        self.sub_value = code;
    }

    pub fn set_chip_code_trap(&mut self, chip: &BattleChip, code: u8) {
        self.kind = ItemKind::BattlechipTrap;
        self.value = chip.index;
        self.sub_value = code;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberCode {
    pub span: Span,
    pub item: Item,
    /// Decoded digits.
    pub code: [u8; CODE_LEN],
}

impl NumberCode {
    pub fn code_string(&self) -> String {
        self.code
            .iter()
            .map(|&d| match d {
                0..=9 => char::from(b'0' + d),
                b'0'..=b'9' => char::from(d),
                _ => '?',
            })
            .collect()
    }
}

fn template(stream: &ByteStream<'_>, span: Span, size: usize) -> Result<Vec<u8>> {
    if span.len != size {
        return Err(RandomiserError::InvalidField {
            field: "record length",
            value: span.len as i64,
        });
    }
    Ok(stream.slice(span)?.to_vec())
}

fn rarity_byte(rarity: u16) -> Result<u8> {
    rarity
        .checked_sub(1)
        .and_then(|r| u8::try_from(r).ok())
        .ok_or(RandomiserError::InvalidField {
            field: "chip rarity",
            value: i64::from(rarity),
        })
}

#[derive(Clone, Debug)]
pub struct ChipCodec {
    elements: TagTable<Element>,
    libraries: TagTable<Library>,
    table_offset: usize,
}

impl ChipCodec {
    /// `table_offset` is where chip 0 starts; a chip's index is derived from
    /// its distance to it.
    pub fn new(elements: TagTable<Element>, libraries: TagTable<Library>, table_offset: usize) -> Self {
        Self {
            elements,
            libraries,
            table_offset,
        }
    }

    fn index_at(&self, start: usize) -> Result<u16> {
        let invalid = || RandomiserError::InvalidField {
            field: "chip record offset",
            value: start as i64,
        };
        let rel = start.checked_sub(self.table_offset).ok_or_else(invalid)?;
        if rel % CHIP_RECORD_SIZE != 0 {
            return Err(invalid());
        }
        u16::try_from(rel / CHIP_RECORD_SIZE).map_err(|_| invalid())
    }

    pub fn decode(&self, stream: &mut ByteStream<'_>) -> Result<BattleChip> {
        let start = stream.position();
        let index = self.index_at(start)?;
        let raw = stream.read_bytes(CHIP_RECORD_SIZE)?;

        let mut codes = [CODE_NONE; 4];
        codes.copy_from_slice(&raw[CHIP_CODES..CHIP_CODES + 4]);

        Ok(BattleChip {
            index,
            span: Span::new(start, CHIP_RECORD_SIZE),
            codes,
            rarity: u16::from(raw[CHIP_RARITY]) + 1,
            mb: raw[CHIP_MB],
            element: self.elements.tag(usize::from(raw[CHIP_ELEMENT]))?,
            library: self.libraries.tag(usize::from(raw[CHIP_LIBRARY]))?,
            id_position: bytes::read_u16(raw, CHIP_ID_POSITION)?,
            in_library: bytes::read_bits(&raw[CHIP_FLAGS..CHIP_FLAGS + 1], CHIP_IN_LIBRARY_BIT, 1)? != 0,
        })
    }

    pub fn encode(&self, stream: &mut ByteStream<'_>, chip: &BattleChip) -> Result<()> {
        let mut raw = template(stream, chip.span, CHIP_RECORD_SIZE)?;

        raw[CHIP_CODES..CHIP_CODES + 4].copy_from_slice(&chip.codes);
        raw[CHIP_RARITY] = rarity_byte(chip.rarity)?;
        raw[CHIP_MB] = chip.mb;
        raw[CHIP_ELEMENT] = self.elements.index_of(chip.element)?;
        raw[CHIP_LIBRARY] = self.libraries.index_of(chip.library)?;
        bytes::write_u16(&mut raw, CHIP_ID_POSITION, chip.id_position)?;
        bytes::write_bits(
            &mut raw[CHIP_FLAGS..CHIP_FLAGS + 1],
            u32::from(chip.in_library),
            CHIP_IN_LIBRARY_BIT,
            1,
        )?;

        stream.write_bytes(&raw)
    }
}

#[derive(Clone, Debug)]
pub struct NumberCodeCodec {
    item_types: TagTable<ItemKind>,
    cipher: NumberCodeCipher,
}

impl NumberCodeCodec {
    pub fn new(item_types: TagTable<ItemKind>, cipher: NumberCodeCipher) -> Self {
        Self { item_types, cipher }
    }

    pub fn decode(&self, stream: &mut ByteStream<'_>) -> Result<NumberCode> {
        let start = stream.position();
        let raw = stream.read_bytes(NUMBER_CODE_RECORD_SIZE)?;

        let item = Item {
            kind: self.item_types.tag(usize::from(raw[0]))?,
            sub_value: raw[1],
            value: bytes::read_u16(raw, 2)?,
        };
        let mut payload = [0u8; CODE_LEN];
        payload.copy_from_slice(&raw[4..4 + CODE_LEN]);

        Ok(NumberCode {
            span: Span::new(start, NUMBER_CODE_RECORD_SIZE),
            item,
            code: self.cipher.decode(&payload),
        })
    }

    pub fn encode(&self, stream: &mut ByteStream<'_>, code: &NumberCode) -> Result<()> {
        let mut raw = template(stream, code.span, NUMBER_CODE_RECORD_SIZE)?;

        raw[0] = self.item_types.index_of(code.item.kind)?;
        raw[1] = code.item.sub_value;
        bytes::write_u16(&mut raw, 2, code.item.value)?;
        raw[4..4 + CODE_LEN].copy_from_slice(&self.cipher.encode(&code.code));

        stream.write_bytes(&raw)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Chip(BattleChip),
    NumberCode(NumberCode),
}

impl Record {
    pub fn span(&self) -> Span {
        match self {
            Record::Chip(chip) => chip.span,
            Record::NumberCode(code) => code.span,
        }
    }
}

/// The record layouts this crate understands.
#[derive(Clone, Debug)]
pub enum RecordCodec {
    Chip(ChipCodec),
    NumberCode(NumberCodeCodec),
}

impl RecordCodec {
    pub fn record_size(&self) -> usize {
        match self {
            RecordCodec::Chip(_) => CHIP_RECORD_SIZE,
            RecordCodec::NumberCode(_) => NUMBER_CODE_RECORD_SIZE,
        }
    }

    pub fn decode(&self, stream: &mut ByteStream<'_>) -> Result<Record> {
        match self {
            RecordCodec::Chip(codec) => codec.decode(stream).map(Record::Chip),
            RecordCodec::NumberCode(codec) => codec.decode(stream).map(Record::NumberCode),
        }
    }

    pub fn encode(&self, stream: &mut ByteStream<'_>, record: &Record) -> Result<()> {
        match (self, record) {
            (RecordCodec::Chip(codec), Record::Chip(chip)) => codec.encode(stream, chip),
            (RecordCodec::NumberCode(codec), Record::NumberCode(code)) => codec.encode(stream, code),
            _ => Err(RandomiserError::Config(
                "record does not match the codec it is encoded with".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{BN4_ELEMENTS, BN4_LIBRARIES, NUMBER_CODE_ITEM_TYPES};
    use proptest::prelude::*;

    fn chip_codec(table_offset: usize) -> ChipCodec {
        ChipCodec::new(
            TagTable::new("element", BN4_ELEMENTS.to_vec()),
            TagTable::new("library", BN4_LIBRARIES.to_vec()),
            table_offset,
        )
    }

    fn number_code_codec() -> NumberCodeCodec {
        NumberCodeCodec::new(
            TagTable::new("item type", NUMBER_CODE_ITEM_TYPES.to_vec()),
            NumberCodeCipher::default(),
        )
    }

    fn sample_chip() -> [u8; CHIP_RECORD_SIZE] {
        let mut raw = [0u8; CHIP_RECORD_SIZE];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = 0xA0 ^ i as u8;
        }
        raw[..4].copy_from_slice(&[0, 2, 26, CODE_NONE]);
        raw[5] = 2;
        raw[6] = 30;
        raw[7] = 6;
        raw[8] = 1;
        raw[9] = 0b1011_1111;
        raw[28..30].copy_from_slice(&0x0123u16.to_le_bytes());
        raw
    }

    #[test]
    fn decodes_chip_fields() {
        let mut data = [0u8; 2 * CHIP_RECORD_SIZE];
        data[CHIP_RECORD_SIZE..].copy_from_slice(&sample_chip());
        let mut stream = ByteStream::new(&mut data);
        stream.set_position(CHIP_RECORD_SIZE).unwrap();

        let chip = chip_codec(0).decode(&mut stream).unwrap();
        assert_eq!(stream.position(), 2 * CHIP_RECORD_SIZE);
        assert_eq!(chip.index, 1);
        assert_eq!(chip.codes(), vec![0, 2, 26]);
        assert_eq!(chip.rarity, 3);
        assert_eq!(chip.mb, 30);
        assert_eq!(chip.element, Element::Sword);
        assert_eq!(chip.library, Library::Mega);
        assert_eq!(chip.id_position, 0x0123);
        assert!(!chip.in_library);
    }

    #[test]
    fn chip_encode_only_touches_known_fields() {
        let mut data = sample_chip();
        let original = data;
        let mut stream = ByteStream::new(&mut data);

        let codec = chip_codec(0);
        let mut chip = codec.decode(&mut stream).unwrap();
        chip.in_library = true;
        chip.codes[3] = 4;
        chip.rarity = 5;

        stream.set_position(0).unwrap();
        codec.encode(&mut stream, &chip).unwrap();
        assert_eq!(stream.position(), CHIP_RECORD_SIZE);
        drop(stream);

        for (i, (&after, &before)) in data.iter().zip(original.iter()).enumerate() {
            match i {
                3 => assert_eq!(after, 4),
                5 => assert_eq!(after, 4),
                9 => assert_eq!(after, 0b1111_1111),
                _ => assert_eq!(after, before, "byte {i} changed"),
            }
        }
    }

    #[test]
    fn unknown_element_index_is_an_error() {
        let mut data = sample_chip();
        data[7] = 16;
        let mut stream = ByteStream::new(&mut data);
        assert!(matches!(
            chip_codec(0).decode(&mut stream),
            Err(RandomiserError::UnknownTagIndex { table: "element", index: 16 })
        ));
    }

    #[test]
    fn rarity_zero_cannot_be_encoded() {
        let mut data = sample_chip();
        let mut stream = ByteStream::new(&mut data);
        let codec = chip_codec(0);
        let mut chip = codec.decode(&mut stream).unwrap();
        chip.rarity = 0;
        stream.set_position(0).unwrap();
        assert!(matches!(
            codec.encode(&mut stream, &chip),
            Err(RandomiserError::InvalidField { field: "chip rarity", value: 0 })
        ));
    }

    #[test]
    fn misaligned_chip_offset_is_rejected() {
        let mut data = [0u8; 2 * CHIP_RECORD_SIZE];
        let mut stream = ByteStream::new(&mut data);
        stream.set_position(3).unwrap();
        assert!(chip_codec(0).decode(&mut stream).is_err());
    }

    #[test]
    fn rarity_is_symmetric_over_its_range() {
        let codec = chip_codec(0);
        for on_disk in 0..=u8::MAX {
            let mut data = sample_chip();
            data[5] = on_disk;
            let mut stream = ByteStream::new(&mut data);
            let chip = codec.decode(&mut stream).unwrap();
            assert_eq!(chip.rarity, u16::from(on_disk) + 1);
            stream.set_position(0).unwrap();
            codec.encode(&mut stream, &chip).unwrap();
            drop(stream);
            assert_eq!(data[5], on_disk);
        }
    }

    #[test]
    fn decodes_number_code() {
        let cipher = NumberCodeCipher::default();
        let mut data = [0u8; NUMBER_CODE_RECORD_SIZE];
        data[0] = 2;
        data[1] = 7;
        data[2..4].copy_from_slice(&0x0150u16.to_le_bytes());
        data[4..].copy_from_slice(&cipher.encode(&[1, 2, 3, 4, 5, 6, 7, 8]));

        let mut stream = ByteStream::new(&mut data);
        let code = number_code_codec().decode(&mut stream).unwrap();
        assert_eq!(code.item.kind, ItemKind::Subchip);
        assert_eq!(code.item.sub_value, 7);
        assert_eq!(code.item.value, 0x0150);
        assert_eq!(code.code_string(), "12345678");
        assert!(!code.item.is_chip());
    }

    #[test]
    fn number_code_writes_back_through_the_cipher() {
        let mut data = [0u8; NUMBER_CODE_RECORD_SIZE];
        let mut stream = ByteStream::new(&mut data);
        let codec = number_code_codec();
        let mut code = codec.decode(&mut stream).unwrap();
        code.code = *b"87654321";
        code.item.kind = ItemKind::NavicustProgram;

        stream.set_position(0).unwrap();
        codec.encode(&mut stream, &code).unwrap();
        drop(stream);

        assert_eq!(data[0], 3);
        assert_eq!(NumberCodeCipher::default().decode(data[4..].try_into().unwrap()), *b"87654321");
    }

    #[test]
    fn codec_rejects_mismatched_record() {
        let mut data = [0u8; CHIP_RECORD_SIZE];
        let mut stream = ByteStream::new(&mut data);
        let code = number_code_codec().decode(&mut stream).unwrap();
        stream.set_position(0).unwrap();
        let codec = RecordCodec::Chip(chip_codec(0));
        assert_eq!(codec.record_size(), CHIP_RECORD_SIZE);
        assert!(codec.encode(&mut stream, &Record::NumberCode(code)).is_err());
    }

    #[test]
    fn chip_setters_rewrite_the_reward() {
        let mut data = sample_chip();
        let mut stream = ByteStream::new(&mut data);
        let chip = chip_codec(0).decode(&mut stream).unwrap();

        let mut item = Item {
            kind: ItemKind::Item,
            value: 9,
            sub_value: 1,
        };
        item.set_chip_code(&chip, 26);
        assert_eq!(item.chip_index(), Some(0));
        assert_eq!(code_letter(item.code()), Some('*'));
        item.set_chip_code_trap(&chip, 2);
        assert_eq!(item.kind, ItemKind::BattlechipTrap);
        assert_eq!(code_letter(item.code()), Some('C'));
    }

    proptest! {
        #[test]
        fn valid_chip_records_round_trip(mut raw in any::<[u8; 32]>(), tail in any::<[u8; 12]>()) {
            raw[7] %= BN4_ELEMENTS.len() as u8;
            raw[8] %= BN4_LIBRARIES.len() as u8;
            let mut data = [0u8; CHIP_RECORD_SIZE];
            data[..32].copy_from_slice(&raw);
            data[32..].copy_from_slice(&tail);
            let original = data;

            let codec = RecordCodec::Chip(chip_codec(0));
            let mut stream = ByteStream::new(&mut data);
            let record = codec.decode(&mut stream).unwrap();
            stream.set_position(0).unwrap();
            codec.encode(&mut stream, &record).unwrap();
            drop(stream);
            prop_assert_eq!(data, original);
        }

        #[test]
        fn valid_number_code_records_round_trip(mut raw in any::<[u8; NUMBER_CODE_RECORD_SIZE]>()) {
            raw[0] %= NUMBER_CODE_ITEM_TYPES.len() as u8;
            let original = raw;

            let codec = RecordCodec::NumberCode(number_code_codec());
            let mut stream = ByteStream::new(&mut raw);
            let record = codec.decode(&mut stream).unwrap();
            stream.set_position(0).unwrap();
            codec.encode(&mut stream, &record).unwrap();
            drop(stream);
            prop_assert_eq!(raw, original);
        }
    }
}
