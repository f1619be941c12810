//! The gene set and genome container
//!
//! Sixteen opcodes with dense ordinals 0..15. `Stop` is the null gene used to
//! fill uninitialized buffers; `Zero` doubles as the register's reset value.
//! A genome's index 0 is the cell's "logo", consulted by the accessibility
//! check but never executed; execution covers indices 1..len-1 cyclically.

use rand::Rng;

/// Number of distinct genes.
pub const GENE_COUNT: usize = 16;

/// One opcode of the genome VM.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Gene {
    #[default]
    Zero = 0,
    Fwd,
    Back,
    Inc,
    Dec,
    ReadG,
    WriteG,
    ReadB,
    WriteB,
    Loop,
    Rep,
    Turn,
    Xchg,
    Kill,
    Share,
    Stop,
}

impl Gene {
    /// Decode an ordinal, reducing modulo 16. Register arithmetic is defined
    /// in terms of this wrap: `Stop + 1 == Zero`, `Zero - 1 == Stop`.
    #[inline]
    pub fn from_ordinal(v: u8) -> Gene {
        match v % GENE_COUNT as u8 {
            0 => Gene::Zero,
            1 => Gene::Fwd,
            2 => Gene::Back,
            3 => Gene::Inc,
            4 => Gene::Dec,
            5 => Gene::ReadG,
            6 => Gene::WriteG,
            7 => Gene::ReadB,
            8 => Gene::WriteB,
            9 => Gene::Loop,
            10 => Gene::Rep,
            11 => Gene::Turn,
            12 => Gene::Xchg,
            13 => Gene::Kill,
            14 => Gene::Share,
            _ => Gene::Stop,
        }
    }

    /// The dense encoding, 0..15.
    #[inline]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Register increment modulo the gene count.
    #[inline]
    pub fn succ(self) -> Gene {
        Gene::from_ordinal(self.ordinal().wrapping_add(1))
    }

    /// Register decrement modulo the gene count.
    #[inline]
    pub fn pred(self) -> Gene {
        Gene::from_ordinal(self.ordinal().wrapping_add(GENE_COUNT as u8 - 1))
    }

    /// One printable character per opcode, for textual genome dumps.
    pub fn symbol(self) -> char {
        match self {
            Gene::Zero => '0',
            Gene::Fwd => '>',
            Gene::Back => '<',
            Gene::Inc => '+',
            Gene::Dec => '-',
            Gene::ReadG => 'g',
            Gene::WriteG => 'G',
            Gene::ReadB => 'b',
            Gene::WriteB => 'B',
            Gene::Loop => '[',
            Gene::Rep => ']',
            Gene::Turn => 't',
            Gene::Xchg => 'x',
            Gene::Kill => 'k',
            Gene::Share => 's',
            Gene::Stop => '.',
        }
    }

    /// Inverse of [`Gene::symbol`].
    pub fn from_symbol(c: char) -> Option<Gene> {
        (0..GENE_COUNT as u8)
            .map(Gene::from_ordinal)
            .find(|g| g.symbol() == c)
    }

    /// A uniform draw over the 16 genes.
    #[inline]
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Gene {
        Gene::from_ordinal(rng.gen_range(0..GENE_COUNT as u8))
    }
}

impl std::fmt::Display for Gene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// An ordered, fixed-length sequence of genes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Genome(Vec<Gene>);

impl Genome {
    /// A genome of `len` genes, all `Stop`.
    pub fn new(len: usize) -> Genome {
        Genome(vec![Gene::Stop; len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fill with `Stop`.
    pub fn reset(&mut self) {
        self.0.fill(Gene::Stop);
    }

    /// Fill every position with a uniform random gene.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for g in &mut self.0 {
            *g = Gene::random(rng);
        }
    }

    /// Overwrite from another genome of the same length.
    pub fn copy_from(&mut self, other: &Genome) {
        self.0.copy_from_slice(&other.0);
    }

    #[inline]
    pub fn as_slice(&self) -> &[Gene] {
        &self.0
    }

    /// The printable-symbol rendering, one character per gene.
    pub fn symbols(&self) -> String {
        self.0.iter().map(|g| g.symbol()).collect()
    }

    /// Parse a symbol string back into a genome.
    pub fn from_symbols(s: &str) -> Option<Genome> {
        s.chars().map(Gene::from_symbol).collect::<Option<Vec<_>>>().map(Genome)
    }
}

impl From<Vec<Gene>> for Genome {
    fn from(genes: Vec<Gene>) -> Genome {
        Genome(genes)
    }
}

impl std::ops::Index<usize> for Genome {
    type Output = Gene;

    #[inline]
    fn index(&self, i: usize) -> &Gene {
        &self.0[i]
    }
}

impl std::ops::IndexMut<usize> for Genome {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut Gene {
        &mut self.0[i]
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Genome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.symbols())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Genome {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Genome, D::Error> {
        let s = String::deserialize(deserializer)?;
        Genome::from_symbols(&s)
            .ok_or_else(|| serde::de::Error::custom("genome contains an unknown symbol"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_ordinals_dense() {
        for v in 0..GENE_COUNT as u8 {
            assert_eq!(Gene::from_ordinal(v).ordinal(), v);
        }
        assert_eq!(Gene::Zero.ordinal(), 0);
        assert_eq!(Gene::Stop.ordinal(), 15);
    }

    #[test]
    fn test_register_arithmetic_wraps() {
        assert_eq!(Gene::Stop.succ(), Gene::Zero);
        assert_eq!(Gene::Zero.pred(), Gene::Stop);
        assert_eq!(Gene::Inc.succ(), Gene::Dec);
        assert_eq!(Gene::Dec.pred(), Gene::Inc);
        assert_eq!(Gene::from_ordinal(16), Gene::Zero);
        assert_eq!(Gene::from_ordinal(255), Gene::Stop);
    }

    #[test]
    fn test_symbols_unique_and_reversible() {
        for v in 0..GENE_COUNT as u8 {
            let g = Gene::from_ordinal(v);
            assert_eq!(Gene::from_symbol(g.symbol()), Some(g));
        }
        assert_eq!(Gene::from_symbol('?'), None);
    }

    #[test]
    fn test_new_genome_is_all_stop() {
        let g = Genome::new(8);
        assert_eq!(g.len(), 8);
        assert!(g.as_slice().iter().all(|&x| x == Gene::Stop));
        assert_eq!(g.symbols(), "........");
    }

    #[test]
    fn test_symbols_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut g = Genome::new(64);
        g.randomize(&mut rng);
        assert_eq!(Genome::from_symbols(&g.symbols()), Some(g));
    }

    #[test]
    fn test_randomize_changes_reset_restores() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut g = Genome::new(128);
        g.randomize(&mut rng);
        assert!(g.as_slice().iter().any(|&x| x != Gene::Stop));
        g.reset();
        assert!(g.as_slice().iter().all(|&x| x == Gene::Stop));
    }
}
