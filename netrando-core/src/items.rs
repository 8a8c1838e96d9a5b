use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::library::{ChipCatalog, ChipQuery};
use crate::records::{code_letter, Item};
use crate::tags::ItemKind;
use crate::{RandomiserError, Result};

/// Source of uniformly distributed indices.
pub trait RandomSource {
    /// Returns a value in `0..bound`. `bound` must be non-zero.
    fn next_index(&mut self, bound: usize) -> usize;
}

impl<R: Rng> RandomSource for R {
    fn next_index(&mut self, bound: usize) -> usize {
        self.gen_range(0..bound)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum CodePolicy {
    /// Roll every reward's code independently.
    #[default]
    Uniform,
    /// Give every original code of a chip one fixed replacement, without two
    /// originals sharing the same replacement.
    StableMapping,
}

/// Original code -> assigned code, per target chip.
#[derive(Clone, Debug, Default)]
pub struct CodeMapping {
    by_chip: HashMap<u16, HashMap<u8, u8>>,
}

impl CodeMapping {
    pub fn get(&self, chip: u16, original: u8) -> Option<u8> {
        self.by_chip.get(&chip)?.get(&original).copied()
    }

    /// Returns the code assigned to `original` for `chip`, picking an unused
    /// one from `codes` on first sight. `None` once every code is taken.
    pub fn assign<R: RandomSource + ?Sized>(
        &mut self,
        rng: &mut R,
        chip: u16,
        original: u8,
        codes: &[u8],
    ) -> Option<u8> {
        let map = self.by_chip.entry(chip).or_default();
        if let Some(&code) = map.get(&original) {
            return Some(code);
        }

        let mut free: Vec<u8> = Vec::with_capacity(codes.len());
        for &c in codes {
            if !free.contains(&c) && !map.values().any(|&v| v == c) {
                free.push(c);
            }
        }
        if free.is_empty() {
            return None;
        }

        let code = free[rng.next_index(free.len())];
        map.insert(original, code);
        Some(code)
    }
}

/// State that lives for exactly one randomisation run.
#[derive(Debug)]
pub struct RandomizerContext<R> {
    rng: R,
    mapping: CodeMapping,
    skipped_reassignments: usize,
}

impl RandomizerContext<StdRng> {
    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: RandomSource> RandomizerContext<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            mapping: CodeMapping::default(),
            skipped_reassignments: 0,
        }
    }

    pub fn mapping(&self) -> &CodeMapping {
        &self.mapping
    }

    /// Rewards left at their vanilla code because no injective choice remained.
    pub fn skipped_reassignments(&self) -> usize {
        self.skipped_reassignments
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RandomizeOutcome {
    Replaced { chip: u16, code: u8 },
    /// The code mapping for `chip` ran out of codes; the item was not touched.
    MappingExhausted { chip: u16 },
    /// The chosen chip has no usable code; the item was not touched.
    NoCodes { chip: u16 },
    NotAChip,
}

/// Rerolls chip rewards while keeping rarity and library intact.
#[derive(Copy, Clone, Debug, Default)]
pub struct ItemRandomizer {
    code_only: bool,
    policy: CodePolicy,
}

impl ItemRandomizer {
    pub fn new(code_only: bool, policy: CodePolicy) -> Self {
        Self { code_only, policy }
    }

    pub fn randomize<C, R>(
        &self,
        ctx: &mut RandomizerContext<R>,
        catalog: &C,
        item: &mut Item,
    ) -> Result<RandomizeOutcome>
    where
        C: ChipCatalog + ?Sized,
        R: RandomSource,
    {
        let Some(index) = item.chip_index() else {
            return Ok(RandomizeOutcome::NotAChip);
        };
        let current = catalog.chip(index).ok_or(RandomiserError::InvalidField {
            field: "reward chip index",
            value: i64::from(index),
        })?;

        let chip = if self.code_only {
            current
        } else {
            // Same library and rarity keeps the reward in its reachability class.
            let query = ChipQuery {
                rarity: current.rarity..=current.rarity,
                library: Some(current.library),
                ..ChipQuery::default()
            };
            let mut candidates = catalog.query(&query);
            if candidates.is_empty() {
                candidates.push(current);
            }
            let r = ctx.rng.next_index(candidates.len());
            candidates.swap_remove(r)
        };

        let codes = chip.codes();
        if codes.is_empty() {
            debug!(chip = chip.index, "chip has no codes, leaving reward");
            return Ok(RandomizeOutcome::NoCodes { chip: chip.index });
        }

        let code = match self.policy {
            CodePolicy::Uniform => codes[ctx.rng.next_index(codes.len())],
            CodePolicy::StableMapping => {
                match ctx
                    .mapping
                    .assign(&mut ctx.rng, chip.index, item.code(), &codes)
                {
                    Some(code) => code,
                    None => {
                        ctx.skipped_reassignments += 1;
                        warn!(
                            chip = chip.index,
                            original = item.code(),
                            "code mapping exhausted, reward keeps its code"
                        );
                        return Ok(RandomizeOutcome::MappingExhausted { chip: chip.index });
                    }
                }
            }
        };

        debug!(
            from_chip = index,
            from_code = ?code_letter(item.code()),
            to_chip = chip.index,
            to_code = ?code_letter(code),
            "replacing chip reward"
        );

        if item.kind == ItemKind::BattlechipTrap {
            item.set_chip_code_trap(&chip, code);
        } else {
            item.set_chip_code(&chip, code);
        }

        Ok(RandomizeOutcome::Replaced {
            chip: chip.index,
            code,
        })
    }
}
