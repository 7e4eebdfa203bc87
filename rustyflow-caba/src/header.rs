//! CABA v0.1 fixed-layout header.
//!
//! The byte layout below is a compatibility contract — deviation breaks
//! every downstream reader. Any structural change increments the
//! version pair, and readers reject versions they do not know rather
//! than guess.
//!
//! ## Layout (256 bytes, little-endian)
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 4    | magic `CABA`                           |
//! | 4      | 1    | version major (0)                      |
//! | 5      | 1    | version minor (1)                      |
//! | 6      | 1    | mode (0 = exact, 1 = statistical)      |
//! | 7      | 1    | dtype (0 = f64)                        |
//! | 8      | 1    | endianness (0 = little)                |
//! | 9      | 1    | FFT normalization (0 = unitary)        |
//! | 10     | 1    | axis order (0 = row-major x,y,z)       |
//! | 11     | 1    | periodicity flags (bit per axis)       |
//! | 12     | 1    | window id (0 = none)                   |
//! | 13     | 1    | compressor id                          |
//! | 14     | 2    | binning schema                         |
//! | 16     | 12   | dims, 3 × u32                          |
//! | 28     | 4    | DC index                               |
//! | 32     | 4    | Nyquist index                          |
//! | 36     | 8    | seed (Mode B phase seed)               |
//! | 44     | 8    | payload length (uncompressed)          |
//! | 52     | 8    | stored length (as written)             |
//! | 60     | 8    | Parseval energy, f64                   |
//! | 68     | 32   | SHA-256 of the stored payload          |
//! | 100    | 156  | reserved, zero                         |

use rustyflow_core::FlowError;

pub const HEADER_BYTES: usize = 256;
pub const TRAILER_BYTES: usize = 32;
pub const MAGIC: [u8; 4] = *b"CABA";
pub const VERSION_MAJOR: u8 = 0;
pub const VERSION_MINOR: u8 = 1;

/// Frozen single-valued fields of v0.1.
const DTYPE_F64: u8 = 0;
const ENDIAN_LITTLE: u8 = 0;
const NORM_UNITARY: u8 = 0;
const AXIS_ROW_MAJOR: u8 = 0;
const PERIODIC_ALL: u8 = 0b111;
const WINDOW_NONE: u8 = 0;

/// Archival strategy: exact microstate vs. statistically-equivalent
/// ensemble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Exact = 0,
    Statistical = 1,
}

impl TryFrom<u8> for Mode {
    type Error = FlowError;
    fn try_from(v: u8) -> Result<Self, FlowError> {
        match v {
            0 => Ok(Mode::Exact),
            1 => Ok(Mode::Statistical),
            other => Err(FlowError::Configuration(format!(
                "unknown CABA mode id {}",
                other
            ))),
        }
    }
}

/// Payload compressor ids. `Ans` and `Zstd` are reserved by the frozen
/// header but not implemented by this reader/writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compressor {
    None = 0,
    Ans = 1,
    Zstd = 2,
    Deflate = 3,
}

impl TryFrom<u8> for Compressor {
    type Error = FlowError;
    fn try_from(v: u8) -> Result<Self, FlowError> {
        match v {
            0 => Ok(Compressor::None),
            1 => Ok(Compressor::Ans),
            2 => Ok(Compressor::Zstd),
            3 => Ok(Compressor::Deflate),
            other => Err(FlowError::UnsupportedCompressor(other)),
        }
    }
}

/// Mode B power-spectrum binning schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binning {
    PerMode = 0,
    RadialShells = 1,
}

impl TryFrom<u16> for Binning {
    type Error = FlowError;
    fn try_from(v: u16) -> Result<Self, FlowError> {
        match v {
            0 => Ok(Binning::PerMode),
            1 => Ok(Binning::RadialShells),
            other => Err(FlowError::Configuration(format!(
                "unknown CABA binning schema {}",
                other
            ))),
        }
    }
}

/// Parsed v0.1 header.
#[derive(Clone, Debug, PartialEq)]
pub struct CabaHeader {
    pub mode: Mode,
    pub compressor: Compressor,
    pub binning: Binning,
    pub dims: [u32; 3],
    pub dc_index: u32,
    pub nyquist_index: u32,
    pub seed: u64,
    pub payload_len: u64,
    pub stored_len: u64,
    pub parseval_energy: f64,
    pub checksum: [u8; 32],
}

impl CabaHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_BYTES] {
        let mut b = [0u8; HEADER_BYTES];
        b[0..4].copy_from_slice(&MAGIC);
        b[4] = VERSION_MAJOR;
        b[5] = VERSION_MINOR;
        b[6] = self.mode as u8;
        b[7] = DTYPE_F64;
        b[8] = ENDIAN_LITTLE;
        b[9] = NORM_UNITARY;
        b[10] = AXIS_ROW_MAJOR;
        b[11] = PERIODIC_ALL;
        b[12] = WINDOW_NONE;
        b[13] = self.compressor as u8;
        b[14..16].copy_from_slice(&(self.binning as u16).to_le_bytes());
        b[16..20].copy_from_slice(&self.dims[0].to_le_bytes());
        b[20..24].copy_from_slice(&self.dims[1].to_le_bytes());
        b[24..28].copy_from_slice(&self.dims[2].to_le_bytes());
        b[28..32].copy_from_slice(&self.dc_index.to_le_bytes());
        b[32..36].copy_from_slice(&self.nyquist_index.to_le_bytes());
        b[36..44].copy_from_slice(&self.seed.to_le_bytes());
        b[44..52].copy_from_slice(&self.payload_len.to_le_bytes());
        b[52..60].copy_from_slice(&self.stored_len.to_le_bytes());
        b[60..68].copy_from_slice(&self.parseval_energy.to_le_bytes());
        b[68..100].copy_from_slice(&self.checksum);
        // 100..256 reserved, already zero.
        b
    }

    /// Parse and validate a v0.1 header. Unknown versions are rejected,
    /// never guessed at.
    pub fn from_bytes(b: &[u8]) -> Result<Self, FlowError> {
        if b.len() < HEADER_BYTES {
            return Err(FlowError::Configuration(format!(
                "header truncated: {} bytes",
                b.len()
            )));
        }
        if b[0..4] != MAGIC {
            return Err(FlowError::Configuration(
                "missing CABA magic — not a CABA container".into(),
            ));
        }
        if (b[4], b[5]) != (VERSION_MAJOR, VERSION_MINOR) {
            return Err(FlowError::UnsupportedVersion {
                major: b[4],
                minor: b[5],
            });
        }
        for (offset, expected, name) in [
            (7usize, DTYPE_F64, "dtype"),
            (8, ENDIAN_LITTLE, "endianness"),
            (9, NORM_UNITARY, "fft normalization"),
            (10, AXIS_ROW_MAJOR, "axis order"),
            (11, PERIODIC_ALL, "periodicity"),
            (12, WINDOW_NONE, "window"),
        ] {
            if b[offset] != expected {
                return Err(FlowError::Configuration(format!(
                    "unsupported {} id {} in v0.1 header",
                    name, b[offset]
                )));
            }
        }

        let u32_at = |o: usize| u32::from_le_bytes(b[o..o + 4].try_into().unwrap());
        let u64_at = |o: usize| u64::from_le_bytes(b[o..o + 8].try_into().unwrap());

        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&b[68..100]);

        Ok(Self {
            mode: Mode::try_from(b[6])?,
            compressor: Compressor::try_from(b[13])?,
            binning: Binning::try_from(u16::from_le_bytes([b[14], b[15]]))?,
            dims: [u32_at(16), u32_at(20), u32_at(24)],
            dc_index: u32_at(28),
            nyquist_index: u32_at(32),
            seed: u64_at(36),
            payload_len: u64_at(44),
            stored_len: u64_at(52),
            parseval_energy: f64::from_le_bytes(b[60..68].try_into().unwrap()),
            checksum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CabaHeader {
        CabaHeader {
            mode: Mode::Statistical,
            compressor: Compressor::Deflate,
            binning: Binning::RadialShells,
            dims: [16, 32, 64],
            dc_index: 0,
            nyquist_index: 32,
            seed: 0xDEAD_BEEF,
            payload_len: 1024,
            stored_len: 512,
            parseval_energy: 3.25,
            checksum: [7u8; 32],
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let h = sample();
        let parsed = CabaHeader::from_bytes(&h.to_bytes()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn test_layout_is_frozen() {
        // Golden offsets: these bytes ARE the format. If this test
        // breaks, the version must be bumped instead.
        let b = sample().to_bytes();
        assert_eq!(&b[0..4], b"CABA");
        assert_eq!((b[4], b[5]), (0, 1));
        assert_eq!(b[6], 1); // statistical
        assert_eq!(b[13], 3); // deflate
        assert_eq!(u16::from_le_bytes([b[14], b[15]]), 1); // radial shells
        assert_eq!(u32::from_le_bytes(b[16..20].try_into().unwrap()), 16);
        assert_eq!(u32::from_le_bytes(b[24..28].try_into().unwrap()), 64);
        assert_eq!(u32::from_le_bytes(b[32..36].try_into().unwrap()), 32);
        assert_eq!(u64::from_le_bytes(b[36..44].try_into().unwrap()), 0xDEAD_BEEF);
        assert_eq!(f64::from_le_bytes(b[60..68].try_into().unwrap()), 3.25);
        assert_eq!(&b[68..100], &[7u8; 32]);
        assert!(b[100..].iter().all(|&x| x == 0), "reserved must be zero");
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut b = sample().to_bytes();
        b[5] = 2;
        match CabaHeader::from_bytes(&b) {
            Err(FlowError::UnsupportedVersion { major: 0, minor: 2 }) => {}
            other => panic!("expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut b = sample().to_bytes();
        b[0] = b'X';
        assert!(matches!(
            CabaHeader::from_bytes(&b),
            Err(FlowError::Configuration(_))
        ));
    }

    #[test]
    fn test_unknown_compressor_is_rejected() {
        let mut b = sample().to_bytes();
        b[13] = 9;
        assert!(matches!(
            CabaHeader::from_bytes(&b),
            Err(FlowError::UnsupportedCompressor(9))
        ));
    }
}
