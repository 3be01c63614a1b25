// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! G.711 mu-law and A-law companding.
//!
//! Encoders take 16-bit linear PCM. Decoders return 16-bit linear PCM; mu-law
//! decodes into the range -32124..=32124 and A-law into -32256..=32256.

const SIGN_BIT: u8 = 0x80;
const QUANT_MASK: u8 = 0x0f;
const SEG_SHIFT: u8 = 4;
const SEG_MASK: u8 = 0x70;

/// Segment end points for A-law, in 13-bit magnitude.
const SEG_A_END: [i32; 8] = [0x1f, 0x3f, 0x7f, 0xff, 0x1ff, 0x3ff, 0x7ff, 0xfff];

/// Segment end points for mu-law, in biased 14-bit magnitude.
const SEG_U_END: [i32; 8] = [0x3f, 0x7f, 0xff, 0x1ff, 0x3ff, 0x7ff, 0xfff, 0x1fff];

/// Bias added before mu-law segment lookup.
const ULAW_BIAS: i32 = 0x84;
/// Largest 14-bit magnitude that mu-law can represent.
const ULAW_CLIP: i32 = 8159;

/// Returns the index of the first segment whose end point is >= value.
fn segment(value: i32, table: &[i32; 8]) -> usize {
    table
        .iter()
        .position(|end| value <= *end)
        .unwrap_or(table.len())
}

/// Encodes a 16-bit linear sample as 8-bit A-law.
pub fn linear_to_alaw(sample: i16) -> u8 {
    let mut pcm = i32::from(sample) >> 3;
    let mask = if pcm >= 0 {
        0xd5
    } else {
        pcm = -pcm - 1;
        0x55
    };

    let seg = segment(pcm, &SEG_A_END);
    if seg >= 8 {
        return 0x7f ^ mask;
    }

    let mut aval = (seg as u8) << SEG_SHIFT;
    if seg < 2 {
        aval |= ((pcm >> 1) as u8) & QUANT_MASK;
    } else {
        aval |= ((pcm >> seg) as u8) & QUANT_MASK;
    }
    aval ^ mask
}

/// Decodes an 8-bit A-law value into a 16-bit linear sample.
pub fn alaw_to_linear(value: u8) -> i16 {
    let a = value ^ 0x55;
    let mut t = i32::from(a & QUANT_MASK) << 4;
    let seg = (a & SEG_MASK) >> SEG_SHIFT;
    match seg {
        0 => t += 8,
        1 => t += 0x108,
        _ => {
            t += 0x108;
            t <<= seg - 1;
        }
    }
    if a & SIGN_BIT != 0 {
        t as i16
    } else {
        -t as i16
    }
}

/// Encodes a 16-bit linear sample as 8-bit mu-law.
pub fn linear_to_ulaw(sample: i16) -> u8 {
    let mut pcm = i32::from(sample) >> 2;
    let mask = if pcm < 0 {
        pcm = -pcm;
        0x7f
    } else {
        0xff
    };
    pcm = pcm.min(ULAW_CLIP) + (ULAW_BIAS >> 2);

    let seg = segment(pcm, &SEG_U_END);
    if seg >= 8 {
        return 0x7f ^ mask;
    }

    let uval = ((seg as u8) << SEG_SHIFT) | (((pcm >> (seg + 1)) as u8) & QUANT_MASK);
    uval ^ mask
}

/// Decodes an 8-bit mu-law value into a 16-bit linear sample.
pub fn ulaw_to_linear(value: u8) -> i16 {
    let u = !value;
    let mut t = (i32::from(u & QUANT_MASK) << 3) + ULAW_BIAS;
    t <<= (u & SEG_MASK) >> SEG_SHIFT;
    if u & SIGN_BIT != 0 {
        (ULAW_BIAS - t) as i16
    } else {
        (t - ULAW_BIAS) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Quantization bound shared by both laws: the step size of the top
    /// segment is 1/16 of the segment's magnitude, plus clipping at the ends.
    fn within_bound(sample: i16, decoded: i16) -> bool {
        let error = (i32::from(sample) - i32::from(decoded)).abs();
        error <= i32::from(sample).abs() / 16 + 32
    }

    #[test]
    fn test_ulaw_silence() {
        assert_eq!(linear_to_ulaw(0), 0xff);
        assert_eq!(ulaw_to_linear(0xff), 0);
    }

    #[test]
    fn test_alaw_silence() {
        assert_eq!(linear_to_alaw(0), 0xd5);
        assert_eq!(alaw_to_linear(0xd5), 8);
    }

    #[test]
    fn test_ulaw_extremes() {
        assert_eq!(ulaw_to_linear(linear_to_ulaw(i16::MAX)), 32124);
        assert_eq!(ulaw_to_linear(linear_to_ulaw(i16::MIN)), -32124);
    }

    #[test]
    fn test_alaw_extremes() {
        assert_eq!(alaw_to_linear(linear_to_alaw(i16::MAX)), 32256);
        assert_eq!(alaw_to_linear(linear_to_alaw(i16::MIN)), -32256);
    }

    #[test]
    fn test_ulaw_round_trip_bound() {
        for sample in i16::MIN..=i16::MAX {
            let decoded = ulaw_to_linear(linear_to_ulaw(sample));
            assert!(
                within_bound(sample, decoded),
                "mu-law {} decoded to {}",
                sample,
                decoded
            );
        }
    }

    #[test]
    fn test_alaw_round_trip_bound() {
        for sample in i16::MIN..=i16::MAX {
            let decoded = alaw_to_linear(linear_to_alaw(sample));
            assert!(
                within_bound(sample, decoded),
                "A-law {} decoded to {}",
                sample,
                decoded
            );
        }
    }

    #[test]
    fn test_sign_is_preserved() {
        for sample in [-20000i16, -1000, -100, 100, 1000, 20000] {
            assert_eq!(
                ulaw_to_linear(linear_to_ulaw(sample)).signum(),
                sample.signum()
            );
            assert_eq!(
                alaw_to_linear(linear_to_alaw(sample)).signum(),
                sample.signum()
            );
        }
    }

    #[test]
    fn test_codes_decode_monotonically() {
        // Positive mu-law codes run from 0xff (zero) down to 0x80 (max).
        let mut last = ulaw_to_linear(0xff);
        for code in (0x80u8..0xff).rev() {
            let value = ulaw_to_linear(code);
            assert!(value > last, "code {:#x}", code);
            last = value;
        }
    }
}
