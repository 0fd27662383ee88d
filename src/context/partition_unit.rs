// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use super::*;

use PartitionType::*;

// One bit per square size from 8x8 (bit 0) up to 128x128 (bit 4); a set
// bit means the neighbour was cut smaller than that size along the edge.
pub static partition_context_lookup: [[u8; 2]; BlockSize::BLOCK_SIZES_ALL] = [
  [31, 31], // 4X4   - {0b11111, 0b11111}
  [31, 30], // 4X8   - {0b11111, 0b11110}
  [30, 31], // 8X4   - {0b11110, 0b11111}
  [30, 30], // 8X8   - {0b11110, 0b11110}
  [30, 28], // 8X16  - {0b11110, 0b11100}
  [28, 30], // 16X8  - {0b11100, 0b11110}
  [28, 28], // 16X16 - {0b11100, 0b11100}
  [28, 24], // 16X32 - {0b11100, 0b11000}
  [24, 28], // 32X16 - {0b11000, 0b11100}
  [24, 24], // 32X32 - {0b11000, 0b11000}
  [24, 16], // 32X64 - {0b11000, 0b10000}
  [16, 24], // 64X32 - {0b10000, 0b11000}
  [16, 16], // 64X64 - {0b10000, 0b10000}
  [16, 0],  // 64X128- {0b10000, 0b00000}
  [0, 16],  // 128X64- {0b00000, 0b10000}
  [0, 0],   // 128X128-{0b00000, 0b00000}
  [31, 28], // 4X16  - {0b11111, 0b11100}
  [28, 31], // 16X4  - {0b11100, 0b11111}
  [30, 24], // 8X32  - {0b11110, 0b11000}
  [24, 30], // 32X8  - {0b11000, 0b11110}
  [28, 16], // 16X64 - {0b11100, 0b10000}
  [16, 28], // 64X16 - {0b10000, 0b11100}
];

pub const CFL_JOINT_SIGNS: usize = 8;
pub const CFL_ALPHA_CONTEXTS: usize = 6;
pub const CFL_ALPHABET_SIZE: usize = 16;

pub const PARTITION_PLOFFSET: usize = 4;
pub const PARTITION_BLOCK_SIZES: usize = 4 + 1;
pub const PARTITION_CONTEXTS: usize =
  PARTITION_BLOCK_SIZES * PARTITION_PLOFFSET;
pub const PARTITION_TYPES: usize = 4;
pub const EXT_PARTITION_TYPES: usize = 10;

pub const SKIP_CONTEXTS: usize = 3;

/// Partitions folded into the "split" side of the binary symbol read
/// when only the top half of a block is inside the frame.
pub(crate) const VERT_ALIKE: [PartitionType; 6] = [
  PARTITION_VERT,
  PARTITION_SPLIT,
  PARTITION_HORZ_A,
  PARTITION_VERT_A,
  PARTITION_VERT_B,
  PARTITION_VERT_4,
];

/// Same, for blocks whose right half is outside the frame.
pub(crate) const HORZ_ALIKE: [PartitionType; 6] = [
  PARTITION_HORZ,
  PARTITION_SPLIT,
  PARTITION_HORZ_A,
  PARTITION_HORZ_B,
  PARTITION_VERT_A,
  PARTITION_HORZ_4,
];

impl BlockContext {
  #[inline]
  fn above_partition_index(&self, bo: BlockOffset) -> usize {
    (bo.x - self.col_start) >> 1
  }

  #[inline]
  fn left_partition_index(&self, bo: BlockOffset) -> usize {
    (bo.y & self.sb_size.mib_mask()) >> 1
  }

  /// Context of the partition symbol of the square block `bsize` at `bo`.
  pub fn partition_plane_context(
    &self, bo: BlockOffset, bsize: BlockSize,
  ) -> usize {
    debug_assert!(bsize.is_sqr() && bsize >= BLOCK_8X8);
    let above_ctx =
      self.above_partition_context[self.above_partition_index(bo)];
    let left_ctx = self.left_partition_context[self.left_partition_index(bo)];
    let bsl = bsize.width_log2() - BLOCK_8X8.width_log2();
    let above = (above_ctx >> bsl) & 1;
    let left = (left_ctx >> bsl) & 1;

    (left * 2 + above) as usize + bsl * PARTITION_PLOFFSET
  }

  /// Records `subsize` as the shape seen along the edges of the region
  /// `extent` starting at `bo`.
  pub fn update_partition_context(
    &mut self, bo: BlockOffset, subsize: BlockSize, extent: BlockSize,
  ) {
    let above = self.above_partition_index(bo);
    let left = self.left_partition_index(bo);
    let bw = extent.width_mi() >> 1;
    let bh = extent.height_mi() >> 1;

    for v in &mut self.above_partition_context[above..][..bw] {
      *v = partition_context_lookup[subsize as usize][0];
    }
    for v in &mut self.left_partition_context[left..][..bh] {
      *v = partition_context_lookup[subsize as usize][1];
    }
  }

  /// Partition context update once every sub-block of a partition has
  /// been parsed. A split of anything larger than 8x8 leaves the update
  /// to the four quarters.
  ///
  /// # Errors
  ///
  /// - Returns `InvalidBlockSize` if `bsize` cannot be split as `p`.
  pub fn update_ext_partition_context(
    &mut self, bo: BlockOffset, p: PartitionType, bsize: BlockSize,
  ) -> Result<(), InvalidBlockSize> {
    if bsize < BLOCK_8X8 || (bsize != BLOCK_8X8 && p == PARTITION_SPLIT) {
      return Ok(());
    }
    let subsize = bsize.subsize(p)?;
    let hbs = bsize.width_mi() >> 1;
    let below = BlockOffset { x: bo.x, y: bo.y + hbs };
    let right = BlockOffset { x: bo.x + hbs, y: bo.y };

    match p {
      PARTITION_HORZ_A => {
        let split = bsize.subsize(PARTITION_SPLIT)?;
        self.update_partition_context(bo, split, subsize);
        self.update_partition_context(below, subsize, subsize);
      }
      PARTITION_HORZ_B => {
        let split = bsize.subsize(PARTITION_SPLIT)?;
        self.update_partition_context(bo, subsize, subsize);
        self.update_partition_context(below, split, subsize);
      }
      PARTITION_VERT_A => {
        let split = bsize.subsize(PARTITION_SPLIT)?;
        self.update_partition_context(bo, split, subsize);
        self.update_partition_context(right, subsize, subsize);
      }
      PARTITION_VERT_B => {
        let split = bsize.subsize(PARTITION_SPLIT)?;
        self.update_partition_context(bo, subsize, subsize);
        self.update_partition_context(right, split, subsize);
      }
      _ => self.update_partition_context(bo, subsize, bsize),
    }
    Ok(())
  }

  pub(crate) fn reset_left_partition_context(&mut self) {
    for c in &mut self.left_partition_context {
      *c = 0;
    }
  }
}

impl ContextReader {
  /// Probability of a single symbol in an inverted CDF.
  #[inline]
  pub const fn cdf_element_prob(cdf: &[u16], element: usize) -> u16 {
    (if element > 0 { cdf[element - 1] } else { 32768 })
      - (if element + 1 < cdf.len() { cdf[element] } else { 0 })
  }

  /// Folds the probabilities of `elements` into a binary CDF whose
  /// symbol 1 stands for all of them.
  pub(crate) fn partition_gather(
    cdf_in: &[u16], elements: &[PartitionType],
  ) -> [u16; 2] {
    let sum: u32 = elements
      .iter()
      .map(|&e| u32::from(Self::cdf_element_prob(cdf_in, e as usize)))
      .sum();
    [sum.min(32767) as u16, 0]
  }

  fn partition_cdf(&self, ctx: usize) -> &[u16] {
    if ctx < PARTITION_TYPES {
      &self.fc.partition_w8_cdf[ctx]
    } else if ctx < 4 * PARTITION_TYPES {
      &self.fc.partition_cdf[ctx - PARTITION_TYPES]
    } else {
      &self.fc.partition_w128_cdf[ctx - 4 * PARTITION_TYPES]
    }
  }

  /// Reads how the square block `bsize` at `bo` is partitioned. Blocks
  /// crossing the bottom or right frame edge can only choose between a
  /// split and the one cut that follows that edge.
  ///
  /// # Errors
  ///
  /// - Returns `DecodeError` if the tile data ends or the partition
  ///   symbol is out of range.
  pub fn read_partition(
    &mut self, r: &mut Reader, bo: BlockOffset, bsize: BlockSize,
    has_rows: bool, has_cols: bool,
  ) -> Result<PartitionType, DecodeError> {
    debug_assert!(bsize.is_sqr() && bsize >= BLOCK_8X8);
    let ctx = self.bc.partition_plane_context(bo, bsize);
    debug_assert!(ctx < PARTITION_CONTEXTS);

    if has_rows && has_cols {
      let s = if ctx < PARTITION_TYPES {
        r.symbol_with_update(&mut self.fc.partition_w8_cdf[ctx])?
      } else if ctx < 4 * PARTITION_TYPES {
        let cdf = &mut self.fc.partition_cdf[ctx - PARTITION_TYPES];
        r.symbol_with_update(cdf)?
      } else {
        r.symbol_with_update(
          &mut self.fc.partition_w128_cdf[ctx - 4 * PARTITION_TYPES],
        )?
      };
      symbol_to(s)
    } else if has_cols {
      let n = if bsize == BLOCK_128X128 { 5 } else { 6 };
      let cdf =
        Self::partition_gather(self.partition_cdf(ctx), &VERT_ALIKE[..n]);
      Ok(if r.symbol(&cdf)? == 1 { PARTITION_SPLIT } else { PARTITION_HORZ })
    } else if has_rows {
      let n = if bsize == BLOCK_128X128 { 5 } else { 6 };
      let cdf =
        Self::partition_gather(self.partition_cdf(ctx), &HORZ_ALIKE[..n]);
      Ok(if r.symbol(&cdf)? == 1 { PARTITION_SPLIT } else { PARTITION_VERT })
    } else {
      Ok(PARTITION_SPLIT)
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::ec::WriterEncoder;
  use v_frame::pixel::ChromaSampling;

  fn block_context() -> BlockContext {
    BlockContext::new(0, 64, SuperBlockSize::new(false), ChromaSampling::Cs420)
  }

  #[test]
  fn sibling_sees_split_neighbour() {
    let mut bc = block_context();
    let origin = BlockOffset { x: 0, y: 0 };
    assert_eq!(bc.partition_plane_context(origin, BLOCK_64X64), 12);

    // an 8x8 cut into 4x4s marks both of its edges at every level
    bc.update_partition_context(origin, BLOCK_4X4, BLOCK_8X8);
    let right = BlockOffset { x: 2, y: 0 };
    let below = BlockOffset { x: 0, y: 2 };
    assert_eq!(bc.partition_plane_context(right, BLOCK_8X8), 2);
    assert_eq!(bc.partition_plane_context(below, BLOCK_8X8), 1);

    // an unsplit 8x8 only matters to larger neighbours
    bc.update_partition_context(origin, BLOCK_8X8, BLOCK_8X8);
    assert_eq!(bc.partition_plane_context(right, BLOCK_8X8), 0);
    assert_eq!(bc.partition_plane_context(origin, BLOCK_16X16), 4 + 3);

    bc.reset_left_contexts();
    assert_eq!(bc.partition_plane_context(origin, BLOCK_16X16), 4 + 1);
  }

  #[test]
  fn ext_partition_marks_both_halves() {
    let mut bc = block_context();
    let origin = BlockOffset { x: 0, y: 0 };
    bc.update_ext_partition_context(origin, PARTITION_HORZ_A, BLOCK_32X32)
      .unwrap();
    // the bottom 32x16 is what the block below sees, while the left
    // edge carries the split top half and then the 32x16
    assert_eq!(bc.above_partition_context[..4], [24, 24, 24, 24]);
    assert_eq!(bc.left_partition_context[..4], [28, 28, 28, 28]);
    assert_eq!(bc.partition_plane_context(origin, BLOCK_32X32), 8 + 2);

    // a large split leaves the work to its quarters
    let mut bc = block_context();
    bc.update_ext_partition_context(origin, PARTITION_SPLIT, BLOCK_64X64)
      .unwrap();
    assert_eq!(bc.partition_plane_context(origin, BLOCK_64X64), 12);
  }

  #[test]
  fn right_edge_reads_split_or_vert() {
    let fc = CDFContext::new(128);
    let bc = block_context();
    let bo = BlockOffset { x: 0, y: 0 };
    let ctx = bc.partition_plane_context(bo, BLOCK_64X64);

    let mut w = WriterEncoder::new();
    for split in [false, true, false] {
      let cdf = ContextReader::partition_gather(
        &fc.partition_cdf[ctx - 4],
        &HORZ_ALIKE,
      );
      w.symbol(split as u32, &cdf);
    }
    let buf = w.done();

    let mut cr = ContextReader::new(fc, bc);
    let mut r = Reader::new(&buf);
    for expected in [PARTITION_VERT, PARTITION_SPLIT, PARTITION_VERT] {
      let p = cr.read_partition(&mut r, bo, BLOCK_64X64, true, false).unwrap();
      assert_eq!(p, expected);
    }
    // the full partition table was never touched
    assert_eq!(cr.fc.partition_cdf, fc.partition_cdf);
  }

  #[test]
  fn corner_block_is_always_split() {
    let mut cr = ContextReader::new(CDFContext::new(0), block_context());
    let mut r = Reader::new(&[]);
    let bo = BlockOffset { x: 0, y: 0 };
    let p = cr.read_partition(&mut r, bo, BLOCK_32X32, false, false).unwrap();
    assert_eq!(p, PARTITION_SPLIT);
  }

  #[test]
  fn gathered_probability_matches_elements() {
    let cdf: [u16; 4] = crate::util::cdf([8192, 16384, 24576]);
    for e in 0..4 {
      assert_eq!(ContextReader::cdf_element_prob(&cdf, e), 8192);
    }
  }
}
