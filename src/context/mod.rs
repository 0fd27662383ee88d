// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]

//! Decoding contexts: the adaptive CDF bank, the above/left neighbor
//! trackers and the symbol reads built on top of them.

use crate::ec::Reader;
use crate::entropymode::*;
use crate::error::DecodeError;
use crate::partition::BlockSize::*;
use crate::partition::*;
use crate::predict::*;
use crate::scan_order::*;
use crate::token_cdfs::*;
use crate::transform::TxSize::*;
use crate::transform::*;

use num_traits::FromPrimitive;
use std::cmp;

pub const FRAME_LF_COUNT: usize = 4;
pub const MAX_LOOP_FILTER: i32 = 63;
pub const DELTA_LF_SMALL: usize = 3;
pub const DELTA_Q_SMALL: usize = 3;

static num_pels_log2_lookup: [u8; BlockSize::BLOCK_SIZES_ALL] =
  [4, 5, 5, 6, 7, 7, 8, 9, 9, 10, 11, 11, 12, 13, 13, 14, 6, 6, 8, 8, 10, 10];

mod cdf_context;
pub use cdf_context::*;

mod partition_unit;
pub use partition_unit::*;

mod superblock_unit;
pub use superblock_unit::*;

mod transform_unit;
pub use transform_unit::TxClass::*;
pub use transform_unit::*;

mod block_unit;
pub use block_unit::*;

/// Converts a decoded symbol to the enum it encodes. Symbols outside the
/// enum are a malformed stream.
#[inline]
fn symbol_to<T: FromPrimitive>(s: u32) -> Result<T, DecodeError> {
  T::from_u32(s).ok_or(DecodeError::InvalidSymbol)
}

/// Decodes a delta-coded magnitude: a small symbol, escaping to a bit
/// count and that many raw bits, followed by a sign.
fn read_delta<const N: usize>(
  r: &mut Reader, cdf: &mut [u16; N],
) -> Result<i32, DecodeError> {
  debug_assert_eq!(N, DELTA_Q_SMALL + 1);
  let mut abs = r.symbol_with_update(cdf)?;
  if abs as usize == DELTA_Q_SMALL {
    let rem_bits = r.literal(3)? as u8 + 1;
    abs = r.literal(rem_bits)? + (1 << rem_bits) + 1;
  }
  if abs == 0 {
    return Ok(0);
  }
  let sign = r.bit()?;
  Ok(if sign == 1 { -(abs as i32) } else { abs as i32 })
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::ec::WriterEncoder;

  fn write_delta(w: &mut WriterEncoder, cdf: &mut [u16; 4], v: i32) {
    let abs = v.unsigned_abs();
    if abs < DELTA_Q_SMALL as u32 {
      w.symbol_with_update(abs, cdf);
    } else {
      w.symbol_with_update(DELTA_Q_SMALL as u32, cdf);
      let x = abs - 1;
      let rem_bits = 31 - x.leading_zeros();
      w.literal(3, rem_bits - 1);
      w.literal(rem_bits as u8, x - (1 << rem_bits));
    }
    if abs != 0 {
      w.bit((v < 0) as u16);
    }
  }

  #[test]
  fn deltas_small_and_escaped() {
    let values = [0, 1, -2, 3, -4, 17, -100, 255];
    let mut w = WriterEncoder::new();
    let mut cdf = default_delta_q_cdf;
    for &v in &values {
      write_delta(&mut w, &mut cdf, v);
    }
    let buf = w.done();

    let mut r = Reader::new(&buf);
    let mut cdf = default_delta_q_cdf;
    for &v in &values {
      assert_eq!(read_delta(&mut r, &mut cdf).unwrap(), v);
    }
  }

}
