//! Named fill patterns for `buf_write_pattern`.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPattern {
    /// All bytes `0x00`.
    Zero,
    /// All bytes `0xff`.
    Ones,
    /// Byte `i` holds `i mod 256`.
    Increment,
    /// `0xdeadbeef` repeated as little-endian words.
    DeadBeef,
}

impl FillPattern {
    pub fn name(self) -> &'static str {
        match self {
            FillPattern::Zero => "zero",
            FillPattern::Ones => "ones",
            FillPattern::Increment => "increment",
            FillPattern::DeadBeef => "deadbeef",
        }
    }

    /// Render `len` bytes of the pattern.
    pub fn fill(self, len: usize) -> Vec<u8> {
        match self {
            FillPattern::Zero => vec![0; len],
            FillPattern::Ones => vec![0xff; len],
            FillPattern::Increment => (0..len).map(|i| i as u8).collect(),
            FillPattern::DeadBeef => 0xdead_beef_u32
                .to_le_bytes()
                .iter()
                .copied()
                .cycle()
                .take(len)
                .collect(),
        }
    }
}

impl FromStr for FillPattern {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zero" | "zeros" => Ok(FillPattern::Zero),
            "ones" => Ok(FillPattern::Ones),
            "increment" | "incr" => Ok(FillPattern::Increment),
            "deadbeef" => Ok(FillPattern::DeadBeef),
            _ => Err(()),
        }
    }
}
