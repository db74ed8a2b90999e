//! # Bedrock key classification
//!
//! Keys in a Bedrock world database fall into three families:
//!
//! ```text
//! Chunk keys (fixed width):
//!   [x: i32 le][z: i32 le][tag: u8]                         9 bytes
//!   [x: i32 le][z: i32 le][tag: u8][subchunk: u8]          10 bytes
//!   [x: i32 le][z: i32 le][dim: i32 le][tag: u8]           13 bytes
//!   [x: i32 le][z: i32 le][dim: i32 le][tag: u8][subchunk] 14 bytes
//!
//! Structure templates:
//!   "structuretemplate_" <namespace> ":" <name>
//!
//! Everything else ("~local_player", "BiomeData", ...):
//!   general keys
//! ```
//!
//! Classification is a pure function of the key bytes.

use std::fmt;

/// Literal prefix of every structure template key.
pub const STRUCTURE_PREFIX: &[u8] = b"structuretemplate_";

/// Record tags found in chunk keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkTag {
    /// `0x2c`
    ChunkVersion,
    /// `0x2d`
    Chunk,
    /// `0x2f`
    SubChunk,
    /// `0x31`
    BlockEntity,
    /// `0x32`
    Entity,
    /// `0x33`
    PendingTicks,
    /// `0x34`
    BlockExtraData,
    /// `0x35`
    BiomeState,
    /// `0x36`
    FinalizedState,
    /// `0x38`
    BorderBlocks,
    /// `0x39`
    HardcodedSpawnAreas,
    /// `0x3a`
    RandomTicks,
    /// `0x3b`
    Checksums,
    /// `0x3c`
    GenerationSeed,
    /// `0x3d`
    GeneratedPreCavesAndCliffsBlending,
    /// `0x3e`
    BlendingBiomeHeight,
    /// `0x3f`
    MetaDataHash,
    /// `0x40`
    BlendingData,
    /// `0x41`
    ActorDigestVersion,
    /// `0x76`
    LegacyVersion,
}

impl ChunkTag {
    /// Every known tag, in tag byte order.
    pub const ALL: [ChunkTag; 20] = [
        ChunkTag::ChunkVersion,
        ChunkTag::Chunk,
        ChunkTag::SubChunk,
        ChunkTag::BlockEntity,
        ChunkTag::Entity,
        ChunkTag::PendingTicks,
        ChunkTag::BlockExtraData,
        ChunkTag::BiomeState,
        ChunkTag::FinalizedState,
        ChunkTag::BorderBlocks,
        ChunkTag::HardcodedSpawnAreas,
        ChunkTag::RandomTicks,
        ChunkTag::Checksums,
        ChunkTag::GenerationSeed,
        ChunkTag::GeneratedPreCavesAndCliffsBlending,
        ChunkTag::BlendingBiomeHeight,
        ChunkTag::MetaDataHash,
        ChunkTag::BlendingData,
        ChunkTag::ActorDigestVersion,
        ChunkTag::LegacyVersion,
    ];

    /// Looks up the tag for a tag byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.byte() == byte)
    }

    /// The tag byte stored in the key.
    pub fn byte(self) -> u8 {
        match self {
            ChunkTag::ChunkVersion => 0x2c,
            ChunkTag::Chunk => 0x2d,
            ChunkTag::SubChunk => 0x2f,
            ChunkTag::BlockEntity => 0x31,
            ChunkTag::Entity => 0x32,
            ChunkTag::PendingTicks => 0x33,
            ChunkTag::BlockExtraData => 0x34,
            ChunkTag::BiomeState => 0x35,
            ChunkTag::FinalizedState => 0x36,
            ChunkTag::BorderBlocks => 0x38,
            ChunkTag::HardcodedSpawnAreas => 0x39,
            ChunkTag::RandomTicks => 0x3a,
            ChunkTag::Checksums => 0x3b,
            ChunkTag::GenerationSeed => 0x3c,
            ChunkTag::GeneratedPreCavesAndCliffsBlending => 0x3d,
            ChunkTag::BlendingBiomeHeight => 0x3e,
            ChunkTag::MetaDataHash => 0x3f,
            ChunkTag::BlendingData => 0x40,
            ChunkTag::ActorDigestVersion => 0x41,
            ChunkTag::LegacyVersion => 0x76,
        }
    }

    /// Display name shown by exporters.
    pub fn name(self) -> &'static str {
        match self {
            ChunkTag::ChunkVersion => "ChunkVersion",
            ChunkTag::Chunk => "Chunk",
            ChunkTag::SubChunk => "SubChunk",
            ChunkTag::BlockEntity => "BlockEntity",
            ChunkTag::Entity => "Entity",
            ChunkTag::PendingTicks => "PendingTicks",
            ChunkTag::BlockExtraData => "BlockExtraData",
            ChunkTag::BiomeState => "BiomeState",
            ChunkTag::FinalizedState => "FinalizedState",
            ChunkTag::BorderBlocks => "BorderBlocks",
            ChunkTag::HardcodedSpawnAreas => "HardcodedSpawnAreas",
            ChunkTag::RandomTicks => "RandomTicks",
            ChunkTag::Checksums => "Checksums",
            ChunkTag::GenerationSeed => "GenerationSeed",
            ChunkTag::GeneratedPreCavesAndCliffsBlending => "GeneratedPreCavesAndCliffsBlending",
            ChunkTag::BlendingBiomeHeight => "BlendingBiomeHeight",
            ChunkTag::MetaDataHash => "MetaDataHash",
            ChunkTag::BlendingData => "BlendingData",
            ChunkTag::ActorDigestVersion => "ActorDigestVersion",
            ChunkTag::LegacyVersion => "LegacyVersion",
        }
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Chunk coordinates preceding the tag of a chunk key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    /// Chunk x coordinate.
    pub x: i32,
    /// Chunk z coordinate.
    pub z: i32,
    /// Dimension id; absent for overworld keys, which elide it.
    pub dimension: Option<i32>,
}

/// What a raw key represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// A per-chunk record.
    ChunkFamily {
        /// Record tag.
        tag: ChunkTag,
        /// Vertical sub-chunk index, for 10- and 14-byte keys.
        subchunk: Option<u8>,
        /// Chunk position.
        pos: ChunkPos,
    },
    /// A saved structure; holds the id after the `structuretemplate_` prefix.
    StructureTemplate(String),
    /// Any other key, as text when printable and as uppercase hex otherwise.
    General(String),
}

/// A key together with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey<'a> {
    raw: &'a [u8],
    kind: KeyKind,
}

impl<'a> ParsedKey<'a> {
    /// Classifies `raw`.
    pub fn new(raw: &'a [u8]) -> Self {
        Self { raw, kind: classify(raw) }
    }

    /// Returns the raw key bytes.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// Returns the classification.
    pub fn kind(&self) -> &KeyKind {
        &self.kind
    }

    /// Returns true for structure template keys.
    pub fn is_structure(&self) -> bool {
        matches!(self.kind, KeyKind::StructureTemplate(_))
    }

    /// Returns the structure id for structure template keys.
    pub fn structure_id(&self) -> Option<&str> {
        match &self.kind {
            KeyKind::StructureTemplate(id) => Some(id),
            _ => None,
        }
    }

    /// Human-readable label, e.g. `SubChunk #4` or `mystruct:house`.
    pub fn display_name(&self) -> String {
        match &self.kind {
            KeyKind::StructureTemplate(id) if id.is_empty() => "Unknown Structure".to_string(),
            KeyKind::StructureTemplate(id) => id.clone(),
            KeyKind::ChunkFamily { tag, subchunk: Some(index), .. } => {
                format!("{} #{}", tag.name(), index)
            }
            KeyKind::ChunkFamily { tag, subchunk: None, .. } => tag.name().to_string(),
            KeyKind::General(text) => text.clone(),
        }
    }
}

/// Classifies a raw key.
pub fn classify(key: &[u8]) -> KeyKind {
    if let Some(id) = structure_id(key) {
        return KeyKind::StructureTemplate(id);
    }

    if let Some(kind) = classify_chunk_key(key) {
        return kind;
    }

    KeyKind::General(general_text(key))
}

/// Shorthand for [`ParsedKey::new`].
pub fn parse_key(key: &[u8]) -> ParsedKey<'_> {
    ParsedKey::new(key)
}

/// Returns true if `key` starts with `structuretemplate_`.
///
/// Cheap enough to use as a filter before full classification.
pub fn is_structure_key(key: &[u8]) -> bool {
    key.starts_with(STRUCTURE_PREFIX)
}

/// Returns the part of a structure key after the prefix.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn structure_id(key: &[u8]) -> Option<String> {
    key.strip_prefix(STRUCTURE_PREFIX)
        .map(|id| String::from_utf8_lossy(id).into_owned())
}

fn classify_chunk_key(key: &[u8]) -> Option<KeyKind> {
    let (tag_index, has_dimension) = match key.len() {
        9 | 10 => (8, false),
        13 | 14 => (12, true),
        _ => return None,
    };

    let tag = ChunkTag::from_byte(key[tag_index])?;
    let subchunk = key.get(tag_index + 1).copied();
    let pos = ChunkPos {
        x: read_i32_le(key, 0),
        z: read_i32_le(key, 4),
        dimension: has_dimension.then(|| read_i32_le(key, 8)),
    };

    Some(KeyKind::ChunkFamily { tag, subchunk, pos })
}

fn read_i32_le(data: &[u8], pos: usize) -> i32 {
    i32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn general_text(key: &[u8]) -> String {
    match std::str::from_utf8(key) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => to_hex(key),
    }
}

/// Formats bytes as uppercase hex without separators.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
