// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use super::*;

use std::ops::Range;
use v_frame::pixel::ChromaSampling;

pub const MAX_PLANES: usize = 3;

pub const MAX_ANGLE_DELTA: usize = 3;
pub const DIRECTIONAL_MODES: usize = 8;
pub const KF_MODE_CONTEXTS: usize = 5;

pub const PLANE_TYPES: usize = 2;
pub const FILTER_INTRA_MODES: usize = 5;

/// Width or height recorded for transforms of blocks outside the tile.
const TX_CONTEXT_UNAVAILABLE: u8 = 64;

/// Absolute offset in mode-info (4x4 luma) units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockOffset {
  pub x: usize,
  pub y: usize,
}

impl BlockOffset {
  /// Offset of the superblock containing this block.
  #[inline]
  pub const fn sb_offset(self, sb_size: SuperBlockSize) -> SuperBlockOffset {
    SuperBlockOffset {
      x: self.x >> sb_size.mib_size_log2,
      y: self.y >> sb_size.mib_size_log2,
    }
  }

  /// Offset within the containing superblock.
  #[inline]
  pub const fn in_sb(self, sb_size: SuperBlockSize) -> (usize, usize) {
    (self.x & sb_size.mib_mask(), self.y & sb_size.mib_mask())
  }

  #[inline]
  pub fn with_offset(self, col_offset: isize, row_offset: isize) -> Self {
    let x = self.x as isize + col_offset;
    let y = self.y as isize + row_offset;
    debug_assert!(x >= 0);
    debug_assert!(y >= 0);

    BlockOffset { x: x as usize, y: y as usize }
  }
}

/// Mode info of one decoded leaf block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Block {
  pub bsize: BlockSize,
  pub bo: BlockOffset,
  pub partition: PartitionType,
  pub skip: bool,
  pub segment_id: u8,
  pub mode: PredictionMode,
  pub uv_mode: PredictionMode,
  pub angle_delta: AngleDelta,
  pub cfl: CFLParams,
  pub filter_intra: Option<FilterIntraMode>,
  pub palette_size: [u8; 2],
  pub tx_size: TxSize,
  pub has_chroma: bool,
  pub lossless: bool,
  /// Index of the block's first transform unit in its superblock's list,
  /// per plane.
  pub first_tx_unit: [u32; MAX_PLANES],
  pub tx_unit_count: [u16; MAX_PLANES],
}

impl Default for Block {
  fn default() -> Block {
    Block {
      bsize: BLOCK_64X64,
      bo: BlockOffset::default(),
      partition: PartitionType::PARTITION_NONE,
      skip: false,
      segment_id: 0,
      mode: PredictionMode::DC_PRED,
      uv_mode: PredictionMode::DC_PRED,
      angle_delta: AngleDelta::default(),
      cfl: CFLParams::default(),
      filter_intra: None,
      palette_size: [0, 0],
      tx_size: TX_64X64,
      has_chroma: true,
      lossless: false,
      first_tx_unit: [0; MAX_PLANES],
      tx_unit_count: [0; MAX_PLANES],
    }
  }
}

impl Block {
  /// Indices of this block's transform units in the superblock's list
  /// for `plane`.
  #[inline]
  pub fn tx_unit_range(&self, plane: usize) -> Range<usize> {
    let start = self.first_tx_unit[plane] as usize;
    start..start + self.tx_unit_count[plane] as usize
  }
}

/// Everything known about a block before its mode info is parsed.
#[derive(Copy, Clone, Debug)]
pub struct PartitionInfo {
  pub bo: BlockOffset,
  pub bsize: BlockSize,
  pub sbo: SuperBlockOffset,
  pub partition: PartitionType,
  pub has_chroma: bool,
  pub avail_u: bool,
  pub avail_l: bool,
  pub above: Option<Block>,
  pub left: Option<Block>,
}

/// Spatial predictor of a segment id and the context of its residual.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SegmentIdPrediction {
  pub pred: u8,
  pub ctx: usize,
}

impl SegmentIdPrediction {
  /// Builds the prediction from the segment ids above-left, above and to
  /// the left. The above-left id is only looked at when both others
  /// exist.
  pub fn new(up_left: Option<u8>, up: Option<u8>, left: Option<u8>) -> Self {
    let ctx = match (up_left, up, left) {
      (Some(ul), Some(u), Some(l)) => {
        if ul == u && ul == l {
          2
        } else if ul == u || ul == l || u == l {
          1
        } else {
          0
        }
      }
      _ => 0,
    };
    let pred = match (up, left) {
      (None, None) => 0,
      (None, Some(l)) => l,
      (Some(u), None) => u,
      (Some(u), Some(l)) => {
        if up_left == Some(u) {
          u
        } else {
          l
        }
      }
    };
    SegmentIdPrediction { pred, ctx }
  }
}

/// Undoes the folding of segment ids around their predictor `r`, for ids
/// in `0..max`.
pub fn neg_deinterleave(diff: i32, r: i32, max: i32) -> i32 {
  if r == 0 {
    return diff;
  }
  if r >= max - 1 {
    return max - diff - 1;
  }
  if 2 * r < max {
    if diff <= 2 * r {
      if diff & 1 == 1 {
        return r + ((diff + 1) >> 1);
      }
      return r - (diff >> 1);
    }
    diff
  } else {
    if diff <= 2 * (max - r - 1) {
      if diff & 1 == 1 {
        return r + ((diff + 1) >> 1);
      }
      return r - (diff >> 1);
    }
    max - (diff + 1)
  }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TXB_CTX {
  pub txb_skip_ctx: usize,
  pub dc_sign_ctx: usize,
}

/// Above and left neighbour state of one tile.
///
/// The above arrays span the tile's columns rounded up to whole
/// superblocks, the left arrays one superblock column. Partition state is
/// kept per 8x8, transform sizes per mode-info unit and coefficient
/// summaries per 4x4 of each plane.
#[derive(Clone, Debug)]
pub struct BlockContext {
  /// First mode-info column of the tile.
  pub col_start: usize,
  pub sb_size: SuperBlockSize,
  pub xdec: usize,
  pub ydec: usize,
  pub planes: usize,
  pub above_partition_context: Vec<u8>,
  pub left_partition_context: [u8; MAX_MIB_SIZE >> 1],
  pub above_tx_context: Vec<u8>,
  pub left_tx_context: [u8; MAX_MIB_SIZE],
  pub above_coeff_context: [Vec<u8>; MAX_PLANES],
  pub left_coeff_context: [[u8; MAX_MIB_SIZE]; MAX_PLANES],
}

impl BlockContext {
  pub fn new(
    col_start: usize, cols: usize, sb_size: SuperBlockSize,
    cs: ChromaSampling,
  ) -> Self {
    let (xdec, ydec) = cs.get_decimation().unwrap_or((0, 0));
    let planes = if cs == ChromaSampling::Cs400 { 1 } else { MAX_PLANES };
    let aligned = sb_size.count(cols) << sb_size.mib_size_log2;
    let chroma = if planes > 1 { aligned >> xdec } else { 0 };

    BlockContext {
      col_start,
      sb_size,
      xdec,
      ydec,
      planes,
      above_partition_context: vec![0; aligned >> 1],
      left_partition_context: [0; MAX_MIB_SIZE >> 1],
      above_tx_context: vec![TX_CONTEXT_UNAVAILABLE; aligned],
      left_tx_context: [TX_CONTEXT_UNAVAILABLE; MAX_MIB_SIZE],
      above_coeff_context: [
        vec![0; aligned],
        vec![0; chroma],
        vec![0; chroma],
      ],
      left_coeff_context: [[0; MAX_MIB_SIZE]; MAX_PLANES],
    }
  }

  /// Resets the left column at the start of a superblock row.
  pub fn reset_left_contexts(&mut self) {
    for p in 0..self.planes {
      self.left_coeff_context[p] = [0; MAX_MIB_SIZE];
    }
    self.reset_left_partition_context();
    self.left_tx_context = [TX_CONTEXT_UNAVAILABLE; MAX_MIB_SIZE];
  }

  #[inline]
  pub const fn plane_dec(&self, plane: usize) -> (usize, usize) {
    if plane == 0 {
      (0, 0)
    } else {
      (self.xdec, self.ydec)
    }
  }

  #[inline]
  fn above_coeff_index(&self, plane: usize, x4: usize) -> usize {
    x4 - (self.col_start >> self.plane_dec(plane).0)
  }

  #[inline]
  const fn left_coeff_index(y4: usize) -> usize {
    y4 & (MAX_MIB_SIZE - 1)
  }

  /// Context of the transform depth symbol: whether the transforms
  /// above and to the left are at least as large as this block's
  /// largest.
  pub fn tx_size_context(
    &self, bo: BlockOffset, bsize: BlockSize, avail_u: bool, avail_l: bool,
  ) -> usize {
    let max_tx = max_txsize_rect_lookup[bsize as usize];
    let above = avail_u
      && self.above_tx_context[bo.x - self.col_start] as usize
        >= max_tx.width();
    let left = avail_l
      && self.left_tx_context[bo.y & self.sb_size.mib_mask()] as usize
        >= max_tx.height();

    above as usize + left as usize
  }

  pub fn update_tx_size_context(
    &mut self, bo: BlockOffset, bsize: BlockSize, tx_size: TxSize,
  ) {
    let above = bo.x - self.col_start;
    let left = bo.y & self.sb_size.mib_mask();
    for v in &mut self.above_tx_context[above..][..bsize.width_mi()] {
      *v = tx_size.width() as u8;
    }
    for v in &mut self.left_tx_context[left..][..bsize.height_mi()] {
      *v = tx_size.height() as u8;
    }
  }

  /// Packs a cumulative level and the DC sign the way neighbours read
  /// them: magnitude in the low bits, sign category above.
  #[inline]
  pub fn set_dc_sign(cul_level: &mut u32, dc_val: i32) {
    if dc_val < 0 {
      *cul_level |= 1 << COEFF_CONTEXT_BITS;
    } else if dc_val > 0 {
      *cul_level += 2 << COEFF_CONTEXT_BITS;
    }
  }

  /// Writes `value` over `w4` by `h4` units of `plane` from (`x4`, `y4`),
  /// in 4x4 units of that plane.
  pub fn set_coeff_context(
    &mut self, plane: usize, x4: usize, y4: usize, w4: usize, h4: usize,
    value: u8,
  ) {
    let above = self.above_coeff_index(plane, x4);
    for v in &mut self.above_coeff_context[plane][above..][..w4] {
      *v = value;
    }
    let left = Self::left_coeff_index(y4);
    for v in &mut self.left_coeff_context[plane][left..][..h4] {
      *v = value;
    }
  }

  /// Clears the coefficient summaries under a block without residual.
  pub fn reset_skip_context(
    &mut self, bo: BlockOffset, bsize: BlockSize, has_chroma: bool,
  ) {
    let planes = if has_chroma { self.planes } else { 1 };
    for plane in 0..planes {
      let (xdec, ydec) = self.plane_dec(plane);
      let x_end = (bo.x + bsize.width_mi() - 1) >> xdec;
      let y_end = (bo.y + bsize.height_mi() - 1) >> ydec;
      let x4 = bo.x >> xdec;
      let y4 = bo.y >> ydec;
      self.set_coeff_context(plane, x4, y4, x_end - x4 + 1, y_end - y4 + 1, 0);
    }
  }

  /// Contexts of the all-zero flag and the DC sign of a transform block
  /// at (`x4`, `y4`) covering `w4` by `h4` units inside the frame.
  pub fn get_txb_ctx(
    &self, plane: usize, x4: usize, y4: usize, w4: usize, h4: usize,
    plane_bsize: BlockSize, tx_size: TxSize,
  ) -> TXB_CTX {
    let mut txb_ctx = TXB_CTX::default();
    const signs: [i8; 3] = [0, -1, 1];

    let above_ctxs = &self.above_coeff_context[plane]
      [self.above_coeff_index(plane, x4)..][..w4];
    let left_ctxs =
      &self.left_coeff_context[plane][Self::left_coeff_index(y4)..][..h4];

    let dc_sign: i16 = above_ctxs
      .iter()
      .chain(left_ctxs)
      .map(|&ctx| signs[(ctx >> COEFF_CONTEXT_BITS) as usize] as i16)
      .sum();
    txb_ctx.dc_sign_ctx = match dc_sign.cmp(&0) {
      cmp::Ordering::Less => 1,
      cmp::Ordering::Greater => 2,
      cmp::Ordering::Equal => 0,
    };

    if plane == 0 {
      if plane_bsize == tx_size.block_size() {
        txb_ctx.txb_skip_ctx = 0;
      } else {
        const skip_contexts: [[u8; 5]; 5] = [
          [1, 2, 2, 2, 3],
          [1, 4, 4, 4, 5],
          [1, 4, 4, 4, 5],
          [1, 4, 4, 4, 5],
          [1, 4, 4, 4, 6],
        ];

        let top: u8 = above_ctxs.iter().fold(0, |acc, ctx| acc | *ctx)
          & COEFF_CONTEXT_MASK as u8;
        let left: u8 = left_ctxs.iter().fold(0, |acc, ctx| acc | *ctx)
          & COEFF_CONTEXT_MASK as u8;

        let max = cmp::min(top | left, 4);
        let min = cmp::min(cmp::min(top, left), 4);
        txb_ctx.txb_skip_ctx =
          skip_contexts[min as usize][max as usize] as usize;
      }
    } else {
      let top: u8 = above_ctxs.iter().fold(0, |acc, ctx| acc | *ctx);
      let left: u8 = left_ctxs.iter().fold(0, |acc, ctx| acc | *ctx);
      let ctx_base = (top != 0) as usize + (left != 0) as usize;
      let ctx_offset = if num_pels_log2_lookup[plane_bsize as usize]
        > num_pels_log2_lookup[tx_size.block_size() as usize]
      {
        10
      } else {
        7
      };
      txb_ctx.txb_skip_ctx = ctx_base + ctx_offset;
    }

    txb_ctx
  }
}

impl ContextReader {
  /// Reads the skip flag; its context counts skipped neighbours.
  pub fn read_skip(
    &mut self, r: &mut Reader, pi: &PartitionInfo,
  ) -> Result<bool, DecodeError> {
    let ctx = pi.above.map_or(0, |b| b.skip as usize)
      + pi.left.map_or(0, |b| b.skip as usize);
    Ok(r.symbol_with_update(&mut self.fc.skip_cdfs[ctx])? == 1)
  }

  /// Reads a segment id coded against its spatial prediction, clamped to
  /// the ids in use.
  pub fn read_segment_id(
    &mut self, r: &mut Reader, pred: SegmentIdPrediction,
    last_active_segid: u8,
  ) -> Result<u8, DecodeError> {
    let cdf = &mut self.fc.spatial_segmentation_cdfs[pred.ctx];
    let coded = r.symbol_with_update(cdf)? as i32;
    let max = last_active_segid as i32 + 1;
    let id = neg_deinterleave(coded, pred.pred as i32, max);
    Ok(id.clamp(0, last_active_segid as i32) as u8)
  }

  /// Reads an unscaled quantizer index delta.
  pub fn read_delta_qindex(
    &mut self, r: &mut Reader,
  ) -> Result<i32, DecodeError> {
    read_delta(r, &mut self.fc.delta_q_cdf)
  }

  /// Reads an unscaled loop filter delta; `multi` selects the table of
  /// one filter level when each level has its own delta.
  pub fn read_delta_lf(
    &mut self, r: &mut Reader, multi: Option<usize>,
  ) -> Result<i32, DecodeError> {
    match multi {
      Some(i) => read_delta(r, &mut self.fc.deblock_delta_multi_cdf[i]),
      None => read_delta(r, &mut self.fc.deblock_delta_cdf),
    }
  }

  pub fn read_use_intrabc(
    &mut self, r: &mut Reader,
  ) -> Result<bool, DecodeError> {
    Ok(r.symbol_with_update(&mut self.fc.intrabc_cdf)? == 1)
  }

  /// Reads a key frame luma mode. Missing neighbours count as DC.
  pub fn read_intra_mode_kf(
    &mut self, r: &mut Reader, pi: &PartitionInfo,
  ) -> Result<PredictionMode, DecodeError> {
    let above_ctx = pi.above.map_or(0, |b| b.mode.kf_context());
    let left_ctx = pi.left.map_or(0, |b| b.mode.kf_context());
    let cdf = &mut self.fc.kf_y_cdf[above_ctx][left_ctx];
    symbol_to(r.symbol_with_update(cdf)?)
  }

  pub fn read_angle_delta(
    &mut self, r: &mut Reader, mode: PredictionMode,
  ) -> Result<i8, DecodeError> {
    debug_assert!(mode.is_directional());
    let cdf = &mut self.fc.angle_delta_cdf
      [mode as usize - PredictionMode::V_PRED as usize];
    Ok(r.symbol_with_update(cdf)? as i8 - MAX_ANGLE_DELTA as i8)
  }

  pub fn read_intra_uv_mode(
    &mut self, r: &mut Reader, luma_mode: PredictionMode, cfl_allowed: bool,
  ) -> Result<PredictionMode, DecodeError> {
    let s = if cfl_allowed {
      r.symbol_with_update(&mut self.fc.uv_mode_cfl_cdf[luma_mode as usize])?
    } else {
      r.symbol_with_update(&mut self.fc.uv_mode_cdf[luma_mode as usize])?
    };
    symbol_to(s)
  }

  /// Reads the joint sign, then a magnitude for each plane with a
  /// nonzero sign.
  pub fn read_cfl_alphas(
    &mut self, r: &mut Reader,
  ) -> Result<CFLParams, DecodeError> {
    let joint_sign = r.symbol_with_update(&mut self.fc.cfl_sign_cdf)?;
    let mut cfl = CFLParams::from_joint_sign(joint_sign);
    for uv in 0..2 {
      if cfl.sign[uv] != CFLSign::CFL_SIGN_ZERO {
        let cdf = &mut self.fc.cfl_alpha_cdf[cfl.context(uv)];
        cfl.scale[uv] = r.symbol_with_update(cdf)? as u8 + 1;
      }
    }
    Ok(cfl)
  }

  pub fn read_has_palette_y(
    &mut self, r: &mut Reader, pi: &PartitionInfo,
  ) -> Result<bool, DecodeError> {
    let bsize_ctx =
      pi.bsize.width_mi_log2() + pi.bsize.height_mi_log2() - 2;
    let ctx = pi.above.map_or(0, |b| (b.palette_size[0] > 0) as usize)
      + pi.left.map_or(0, |b| (b.palette_size[0] > 0) as usize);
    let cdf = &mut self.fc.palette_y_mode_cdfs[bsize_ctx][ctx];
    Ok(r.symbol_with_update(cdf)? == 1)
  }

  pub fn read_has_palette_uv(
    &mut self, r: &mut Reader, has_palette_y: bool,
  ) -> Result<bool, DecodeError> {
    let cdf = &mut self.fc.palette_uv_mode_cdfs[has_palette_y as usize];
    Ok(r.symbol_with_update(cdf)? == 1)
  }

  /// Reads whether filter intra is used and, if so, its mode.
  pub fn read_filter_intra(
    &mut self, r: &mut Reader, bsize: BlockSize,
  ) -> Result<Option<FilterIntraMode>, DecodeError> {
    let cdf = &mut self.fc.filter_intra_cdfs[bsize as usize];
    if r.symbol_with_update(cdf)? == 0 {
      return Ok(None);
    }
    let mode = r.symbol_with_update(&mut self.fc.filter_intra_mode_cdf)?;
    symbol_to(mode).map(Some)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::ec::WriterEncoder;
  use quickcheck::quickcheck;

  fn neg_interleave(x: i32, r: i32, max: i32) -> i32 {
    assert!(x < max);
    if r == 0 {
      return x;
    } else if r >= (max - 1) {
      return -x + max - 1;
    }
    let diff = x - r;
    if 2 * r < max {
      if diff.abs() <= r {
        if diff > 0 {
          return (diff << 1) - 1;
        } else {
          return (-diff) << 1;
        }
      }
      x
    } else {
      if diff.abs() < (max - r) {
        if diff > 0 {
          return (diff << 1) - 1;
        } else {
          return (-diff) << 1;
        }
      }
      (max - x) - 1
    }
  }

  quickcheck! {
    fn deinterleave_inverts_interleave(x: u8, r: u8, max: u8) -> bool {
      let max = (max % MAX_SEGMENTS as u8) as i32 + 1;
      let x = x as i32 % max;
      let r = r as i32 % max;
      neg_deinterleave(neg_interleave(x, r, max), r, max) == x
    }
  }

  #[test]
  fn segment_prediction() {
    let p = SegmentIdPrediction::new(Some(3), Some(3), Some(3));
    assert_eq!(p, SegmentIdPrediction { pred: 3, ctx: 2 });
    let p = SegmentIdPrediction::new(Some(1), Some(1), Some(4));
    assert_eq!(p, SegmentIdPrediction { pred: 1, ctx: 1 });
    let p = SegmentIdPrediction::new(Some(1), Some(2), Some(4));
    assert_eq!(p, SegmentIdPrediction { pred: 4, ctx: 0 });
    let p = SegmentIdPrediction::new(None, None, Some(5));
    assert_eq!(p, SegmentIdPrediction { pred: 5, ctx: 0 });
    let p = SegmentIdPrediction::new(None, Some(6), None);
    assert_eq!(p, SegmentIdPrediction { pred: 6, ctx: 0 });
    let p = SegmentIdPrediction::new(None, None, None);
    assert_eq!(p, SegmentIdPrediction { pred: 0, ctx: 0 });
  }

  #[test]
  fn segment_id_folds_around_prediction() {
    let fc = CDFContext::new(0);
    let pred = SegmentIdPrediction { pred: 2, ctx: 1 };
    let mut w = WriterEncoder::new();
    let mut cdf = fc.spatial_segmentation_cdfs[1];
    for coded in [0, 1, 2, 5] {
      w.symbol_with_update(coded, &mut cdf);
    }
    let buf = w.done();

    let bc = BlockContext::new(
      0,
      16,
      SuperBlockSize::new(false),
      ChromaSampling::Cs420,
    );
    let mut cr = ContextReader::new(fc, bc);
    let mut r = Reader::new(&buf);
    let ids: Vec<u8> = (0..4)
      .map(|_| cr.read_segment_id(&mut r, pred, 5).unwrap())
      .collect();
    assert_eq!(ids, [2, 3, 1, 5]);
  }

  #[test]
  fn above_context_spans_whole_superblocks() {
    let bc = BlockContext::new(
      16,
      40,
      SuperBlockSize::new(false),
      ChromaSampling::Cs422,
    );
    assert_eq!(bc.above_partition_context.len(), 24);
    assert_eq!(bc.above_tx_context.len(), 48);
    assert_eq!(bc.above_coeff_context[1].len(), 24);
    assert!(bc.above_tx_context.iter().all(|&t| t == 64));
    let mono = BlockContext::new(
      0,
      8,
      SuperBlockSize::new(true),
      ChromaSampling::Cs400,
    );
    assert_eq!(mono.planes, 1);
    assert_eq!(mono.above_tx_context.len(), 32);
    assert!(mono.above_coeff_context[2].is_empty());
  }

  #[test]
  fn tx_size_context_needs_available_neighbours() {
    let mut bc = BlockContext::new(
      0,
      32,
      SuperBlockSize::new(false),
      ChromaSampling::Cs420,
    );
    let bo = BlockOffset { x: 4, y: 4 };
    assert_eq!(bc.tx_size_context(bo, BLOCK_16X16, false, false), 0);
    assert_eq!(bc.tx_size_context(bo, BLOCK_16X16, true, true), 2);

    bc.update_tx_size_context(BlockOffset { x: 4, y: 0 }, BLOCK_16X16, TX_8X8);
    assert_eq!(bc.tx_size_context(bo, BLOCK_16X16, true, true), 1);
    assert_eq!(bc.tx_size_context(bo, BLOCK_8X8, true, false), 1);
  }

  #[test]
  fn txb_contexts() {
    let mut bc = BlockContext::new(
      0,
      32,
      SuperBlockSize::new(false),
      ChromaSampling::Cs420,
    );
    let ctx = bc.get_txb_ctx(0, 0, 0, 2, 2, BLOCK_8X8, TX_8X8);
    assert_eq!(ctx, TXB_CTX { txb_skip_ctx: 0, dc_sign_ctx: 0 });
    let ctx = bc.get_txb_ctx(0, 0, 0, 1, 1, BLOCK_8X8, TX_4X4);
    assert_eq!(ctx.txb_skip_ctx, 1);

    let mut negative = 5;
    BlockContext::set_dc_sign(&mut negative, -3);
    bc.set_coeff_context(0, 0, 0, 1, 1, negative as u8);
    let ctx = bc.get_txb_ctx(0, 0, 0, 1, 1, BLOCK_8X8, TX_4X4);
    assert_eq!(ctx, TXB_CTX { txb_skip_ctx: 6, dc_sign_ctx: 1 });

    let ctx = bc.get_txb_ctx(1, 0, 0, 1, 1, BLOCK_4X4, TX_4X4);
    assert_eq!(ctx, TXB_CTX { txb_skip_ctx: 7, dc_sign_ctx: 0 });
    bc.set_coeff_context(1, 0, 0, 1, 1, 2 << COEFF_CONTEXT_BITS);
    let ctx = bc.get_txb_ctx(1, 0, 0, 1, 1, BLOCK_8X8, TX_4X4);
    assert_eq!(ctx, TXB_CTX { txb_skip_ctx: 12, dc_sign_ctx: 2 });
  }

  #[test]
  fn skip_reset_covers_odd_chroma_position() {
    let mut bc = BlockContext::new(
      0,
      32,
      SuperBlockSize::new(false),
      ChromaSampling::Cs420,
    );
    for plane in 0..3 {
      bc.set_coeff_context(plane, 0, 0, 8, 8, 9);
    }
    bc.reset_skip_context(BlockOffset { x: 3, y: 2 }, BLOCK_4X8, true);
    assert_eq!(bc.above_coeff_context[0][..5], [9, 9, 9, 0, 9]);
    assert_eq!(bc.left_coeff_context[0][..5], [9, 9, 0, 0, 9]);
    assert_eq!(bc.above_coeff_context[2][..3], [9, 0, 9]);
    assert_eq!(bc.left_coeff_context[1][..3], [9, 0, 9]);
  }

  #[test]
  fn cfl_alphas_follow_signs() {
    let mut fc = CDFContext::new(0);
    let mut w = WriterEncoder::new();
    // U positive, V zero
    let joint = CFLParams {
      sign: [CFLSign::CFL_SIGN_POS, CFLSign::CFL_SIGN_ZERO],
      scale: [0, 0],
    }
    .joint_sign();
    w.symbol_with_update(joint, &mut fc.cfl_sign_cdf);
    w.symbol_with_update(6, &mut fc.cfl_alpha_cdf[3]);
    let buf = w.done();

    let bc = BlockContext::new(
      0,
      16,
      SuperBlockSize::new(false),
      ChromaSampling::Cs420,
    );
    let mut cr = ContextReader::new(CDFContext::new(0), bc);
    let mut r = Reader::new(&buf);
    let cfl = cr.read_cfl_alphas(&mut r).unwrap();
    assert_eq!(cfl.alpha(0), 7);
    assert_eq!(cfl.alpha(1), 0);
  }
}
