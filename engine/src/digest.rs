//! Digest computation.
//!
//! This module provides:
//! - The digest algorithms recorded in result files (MD5, SHA-1, SHA-256, SHA-512)
//! - AlgorithmSet, the enabled subset for one run
//! - DigestSet, a fan-out accumulator that feeds every enabled hash state
//!   from a single pass over the data

use std::fmt;

/// Supported digest algorithms.
///
/// Declaration order is the canonical order: digest records are always
/// produced in this order regardless of how the set was assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Algorithm {
    /// MD5 (128-bit)
    Md5,
    /// SHA-1 (160-bit)
    Sha1,
    /// SHA-256 (256-bit)
    Sha256,
    /// SHA-512 (512-bit)
    Sha512,
}

impl Algorithm {
    /// All algorithms, in canonical order.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Sha512,
    ];

    /// Parse an algorithm name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "md5" => Some(Self::Md5),
            "sha1" => Some(Self::Sha1),
            "sha256" => Some(Self::Sha256),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Length of this algorithm's digest in hex characters.
    pub fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
        }
    }
}

/// The set of algorithms enabled for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmSet {
    md5: bool,
    sha1: bool,
    sha256: bool,
    sha512: bool,
}

impl AlgorithmSet {
    /// The empty set.
    pub const fn empty() -> Self {
        AlgorithmSet {
            md5: false,
            sha1: false,
            sha256: false,
            sha512: false,
        }
    }

    /// Every supported algorithm.
    pub fn all() -> Self {
        Algorithm::ALL.iter().copied().collect()
    }

    /// Add an algorithm to the set.
    pub fn insert(&mut self, algorithm: Algorithm) {
        match algorithm {
            Algorithm::Md5 => self.md5 = true,
            Algorithm::Sha1 => self.sha1 = true,
            Algorithm::Sha256 => self.sha256 = true,
            Algorithm::Sha512 => self.sha512 = true,
        }
    }

    /// Whether an algorithm is enabled.
    pub fn contains(&self, algorithm: Algorithm) -> bool {
        match algorithm {
            Algorithm::Md5 => self.md5,
            Algorithm::Sha1 => self.sha1,
            Algorithm::Sha256 => self.sha256,
            Algorithm::Sha512 => self.sha512,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.md5 || self.sha1 || self.sha256 || self.sha512)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// First enabled algorithm in canonical order. This is the algorithm
    /// used for index lookups when classifying changes.
    pub fn primary(&self) -> Option<Algorithm> {
        self.iter().next()
    }

    /// Enabled algorithms, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Algorithm> {
        let set = *self;
        Algorithm::ALL.iter().copied().filter(move |a| set.contains(*a))
    }
}

/// MD5 only, matching the behavior when no algorithm was requested.
impl Default for AlgorithmSet {
    fn default() -> Self {
        let mut set = Self::empty();
        set.insert(Algorithm::Md5);
        set
    }
}

impl FromIterator<Algorithm> for AlgorithmSet {
    fn from_iter<I: IntoIterator<Item = Algorithm>>(iter: I) -> Self {
        let mut set = Self::empty();
        for algorithm in iter {
            set.insert(algorithm);
        }
        set
    }
}

impl fmt::Display for AlgorithmSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for algorithm in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", algorithm)?;
            first = false;
        }
        Ok(())
    }
}

/// A computed digest value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestRecord {
    algorithm: Algorithm,
    hex: String,
}

impl DigestRecord {
    /// Create a new digest record.
    pub fn new(algorithm: Algorithm, hex: String) -> Self {
        DigestRecord { algorithm, hex }
    }

    /// Get the algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Get the hex string representation.
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for DigestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}

/// Simultaneous digest computation over one byte stream.
///
/// Every enabled hash state is fed from the same `update` call, so the
/// source is read exactly once no matter how many algorithms are active.
/// `finalize` consumes the set and yields the records in canonical order
/// regardless of how the set was assembled.
pub struct DigestSet {
    md5: Option<md5::Context>,
    sha1: Option<sha1::Sha1>,
    sha256: Option<sha2::Sha256>,
    sha512: Option<sha2::Sha512>,
}

impl DigestSet {
    /// Create an accumulator for the enabled set. An empty set falls back
    /// to MD5 so at least one digest is always computed.
    pub fn new(set: AlgorithmSet) -> Self {
        use sha1::Digest;

        let set = if set.is_empty() {
            AlgorithmSet::default()
        } else {
            set
        };
        DigestSet {
            md5: set.contains(Algorithm::Md5).then(md5::Context::new),
            sha1: set.contains(Algorithm::Sha1).then(sha1::Sha1::new),
            sha256: set.contains(Algorithm::Sha256).then(sha2::Sha256::new),
            sha512: set.contains(Algorithm::Sha512).then(sha2::Sha512::new),
        }
    }

    /// Feed one chunk to every enabled hash state.
    pub fn update(&mut self, chunk: &[u8]) {
        use sha1::Digest;

        if let Some(context) = self.md5.as_mut() {
            context.consume(chunk);
        }
        if let Some(hasher) = self.sha1.as_mut() {
            hasher.update(chunk);
        }
        if let Some(hasher) = self.sha256.as_mut() {
            hasher.update(chunk);
        }
        if let Some(hasher) = self.sha512.as_mut() {
            hasher.update(chunk);
        }
    }

    /// Finish the stream and yield one record per enabled algorithm, in
    /// canonical order.
    pub fn finalize(self) -> Vec<DigestRecord> {
        use sha1::Digest;

        let mut records = Vec::new();
        if let Some(context) = self.md5 {
            records.push(DigestRecord::new(
                Algorithm::Md5,
                format!("{:x}", context.compute()),
            ));
        }
        if let Some(hasher) = self.sha1 {
            records.push(DigestRecord::new(
                Algorithm::Sha1,
                format!("{:x}", hasher.finalize()),
            ));
        }
        if let Some(hasher) = self.sha256 {
            records.push(DigestRecord::new(
                Algorithm::Sha256,
                format!("{:x}", hasher.finalize()),
            ));
        }
        if let Some(hasher) = self.sha512 {
            records.push(DigestRecord::new(
                Algorithm::Sha512,
                format!("{:x}", hasher.finalize()),
            ));
        }
        records
    }
}
