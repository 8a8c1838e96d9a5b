use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, info_span, warn};

pub mod bytes;
pub mod cipher;
pub mod items;
pub mod library;
pub mod profile;
pub mod records;
pub mod stream;
pub mod strategy;
pub mod tags;

use items::{CodePolicy, ItemRandomizer, RandomizeOutcome, RandomizerContext};
use library::ChipLibrary;
use profile::GameProfile;
use records::{Record, RecordCodec};
use stream::ByteStream;
use strategy::{ArrayStrategy, PointerListStrategy, RecordStrategy, StreamStrategy, TraversalMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomiserSettings {
    pub seed: u64,
    /// Keep every reward's chip and only reroll its code.
    pub code_only: bool,
    /// Remap codes consistently per chip instead of rolling each reward independently.
    pub use_code_mapping: bool,
    /// Collect per-entry failures and keep going instead of aborting the table scan.
    pub best_effort: bool,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub profile_path: PathBuf,
}

impl RandomiserSettings {
    pub fn code_policy(&self) -> CodePolicy {
        if self.use_code_mapping {
            CodePolicy::StableMapping
        } else {
            CodePolicy::Uniform
        }
    }

    pub fn traversal_mode(&self) -> TraversalMode {
        if self.best_effort {
            TraversalMode::BestEffort
        } else {
            TraversalMode::FailFast
        }
    }
}

#[derive(Debug, Error)]
pub enum RandomiserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{len} byte(s) at offset {offset} fall outside a {size}-byte buffer")]
    OutOfBounds { offset: i64, len: usize, size: usize },
    #[error("bit field at bit {offset} with width {width} does not fit in a {span_bits}-bit span")]
    InvalidBitField { offset: u32, width: u32, span_bits: u32 },
    #[error("index {index} has no entry in the {table} table")]
    UnknownTagIndex { table: &'static str, index: usize },
    #[error("tag {tag} is not present in the {table} table")]
    UnmappedTag { table: &'static str, tag: String },
    #[error("value {value} is out of range for {field}")]
    InvalidField { field: &'static str, value: i64 },
}

pub type Result<T> = std::result::Result<T, RandomiserError>;

/// Summary of one randomisation pass over an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub chips_loaded: usize,
    pub records_visited: usize,
    pub replaced: usize,
    pub unchanged: usize,
    /// Rewards whose code kept its vanilla value because the chip's
    /// code mapping had no unused code left.
    pub skipped_reassignments: usize,
    pub failures: usize,
}

/// Randomise the number-code rewards of `image` in place.
///
/// The chip table is decoded first and serves as the catalog for
/// replacement chips; the number-code pointer table is then walked and
/// every record re-encoded into the bytes it was read from.
pub fn randomize_image(
    image: &mut [u8],
    profile: &GameProfile,
    settings: &RandomiserSettings,
) -> Result<RunReport> {
    let _span = info_span!("randomize_image", profile = %profile.name, seed = settings.seed).entered();

    let chip_codec = profile.chip_codec();
    let mut stream = ByteStream::new(image);
    stream.set_position(profile.chip_table.offset)?;
    let library = ChipLibrary::load(&mut stream, &chip_codec, profile.chip_table.count)?;
    info!(chips = library.len(), "loaded chip library");

    let randomizer = ItemRandomizer::new(settings.code_only, settings.code_policy());
    let mut ctx = RandomizerContext::new(StdRng::seed_from_u64(settings.seed));
    let mut report = RunReport {
        chips_loaded: library.len(),
        ..RunReport::default()
    };

    let layout = &profile.number_codes;
    let failures = {
        let visitor = |record: &mut Record| -> Result<()> {
            if let Record::NumberCode(code) = record {
                report.records_visited += 1;
                match randomizer.randomize(&mut ctx, &library, &mut code.item)? {
                    RandomizeOutcome::Replaced { .. } => report.replaced += 1,
                    RandomizeOutcome::MappingExhausted { .. } => report.skipped_reassignments += 1,
                    RandomizeOutcome::NoCodes { .. } | RandomizeOutcome::NotAChip => {
                        report.unchanged += 1
                    }
                }
            }
            Ok(())
        };

        let records = ArrayStrategy::new(
            RecordStrategy::new(RecordCodec::NumberCode(profile.number_code_codec()), visitor),
            layout.records_per_entry,
        );
        let mut table = PointerListStrategy::new(records, layout.length)
            .with_base_pointer(layout.base_pointer)
            .with_repeat(layout.repeat)
            .with_ignore_null(layout.ignore_null)
            .with_mode(settings.traversal_mode());

        stream.set_position(layout.offset)?;
        table.execute(&mut stream)?;
        table.take_failures()
    };

    for (offset, err) in &failures {
        warn!("skipped number code entry at {offset:#X}: {err}");
    }
    report.failures = failures.len();

    info!(
        visited = report.records_visited,
        replaced = report.replaced,
        skipped_reassignments = report.skipped_reassignments,
        failures = report.failures,
        "number codes randomised"
    );

    Ok(report)
}

pub fn run(settings: RandomiserSettings) -> Result<RunReport> {
    if !settings.input_path.exists() {
        return Err(RandomiserError::Config(format!(
            "Input path does not exist: {}",
            settings.input_path.display()
        )));
    }

    let profile = GameProfile::load(&settings.profile_path)?;
    let mut image = fs::read(&settings.input_path)?;
    let report = randomize_image(&mut image, &profile, &settings)?;

    if !settings.output_path.exists() {
        fs::create_dir_all(&settings.output_path)?;
    }

    // One file per seed so repeated runs never overwrite each other.
    let out_file = settings
        .output_path
        .join(format!("NetRando_{}.bin", settings.seed));
    fs::write(&out_file, &image)?;
    info!(path = %out_file.display(), "wrote randomised image");

    Ok(report)
}
