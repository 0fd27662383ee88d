// Copyright (c) 2018-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Storage for everything the tile syntax produces for one frame.
//!
//! Blocks, transform units and coefficients live in per-superblock lists
//! in the order they are parsed. A map with one slot per mode-info unit
//! points back into the block lists, so any 4x4 position can be resolved
//! to the block covering it.

use crate::context::{
  Block, BlockOffset, SuperBlockOffset, SuperBlockSize, MAX_PLANES,
};
use crate::header::{FrameHeader, SequenceHeader};
use crate::transform::{TxSize, TxType};

use itertools::iproduct;
use std::ops::Range;
use v_frame::pixel::ChromaSampling;

/// Slot of `block_map` with no block parsed yet.
const NO_BLOCK: u16 = u16::MAX;

/// One transform block of one plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransformInfo {
  pub tx_size: TxSize,
  /// Offset from the block origin, in samples of the plane.
  pub x: u16,
  pub y: u16,
  pub tx_type: TxType,
  /// Number of coefficients up to and including the last nonzero one in
  /// scan order.
  pub eob: u16,
  /// Start of the coefficients in the superblock's list for the plane.
  pub coeff_offset: u32,
}

impl TransformInfo {
  #[inline]
  pub const fn has_coefficients(&self) -> bool {
    self.eob > 0
  }
}

/// Everything decoded for one superblock.
#[derive(Clone, Debug)]
pub struct SuperblockInfo {
  pub sbo: SuperBlockOffset,
  pub blocks: Vec<Block>,
  pub tx_units: [Vec<TransformInfo>; MAX_PLANES],
  /// Coefficients of every coded transform block, in transposed order,
  /// covering the coded region of the transform.
  pub coeffs: [Vec<i32>; MAX_PLANES],
  /// CDEF strength of each 64x64 quadrant, -1 until read.
  pub cdef_index: [i8; 4],
  /// Quantizer index in effect at the end of the superblock.
  pub qindex: u8,
  pub delta_lf: [i8; 4],
}

impl SuperblockInfo {
  fn new(sbo: SuperBlockOffset, qindex: u8) -> Self {
    SuperblockInfo {
      sbo,
      blocks: Vec::new(),
      tx_units: Default::default(),
      coeffs: Default::default(),
      cdef_index: [-1; 4],
      qindex,
      delta_lf: [0; 4],
    }
  }

  fn clear(&mut self, qindex: u8) {
    *self = SuperblockInfo::new(self.sbo, qindex);
  }
}

#[derive(Clone, Debug)]
pub struct FrameStorage {
  pub sb_size: SuperBlockSize,
  pub chroma_sampling: ChromaSampling,
  pub planes: usize,
  pub mi_cols: usize,
  pub mi_rows: usize,
  pub sb_cols: usize,
  pub sb_rows: usize,
  superblocks: Vec<SuperblockInfo>,
  /// Index into the owning superblock's block list, per mode-info unit.
  block_map: Vec<u16>,
  segment_ids: Vec<u8>,
}

impl FrameStorage {
  pub fn new(seq: &SequenceHeader, fh: &FrameHeader) -> Self {
    let sb_size = seq.sb_size();
    let mi_cols = fh.mi_cols();
    let mi_rows = fh.mi_rows();
    let sb_cols = sb_size.count(mi_cols);
    let sb_rows = sb_size.count(mi_rows);

    let superblocks = iproduct!(0..sb_rows, 0..sb_cols)
      .map(|(y, x)| SuperBlockOffset { x, y })
      .map(|sbo| SuperblockInfo::new(sbo, fh.base_q_idx))
      .collect();

    FrameStorage {
      sb_size,
      chroma_sampling: seq.chroma_sampling,
      planes: seq.planes(),
      mi_cols,
      mi_rows,
      sb_cols,
      sb_rows,
      superblocks,
      block_map: vec![NO_BLOCK; mi_cols * mi_rows],
      segment_ids: vec![0; mi_cols * mi_rows],
    }
  }

  #[inline]
  fn sb_index(&self, sbo: SuperBlockOffset) -> usize {
    debug_assert!(sbo.x < self.sb_cols && sbo.y < self.sb_rows);
    sbo.y * self.sb_cols + sbo.x
  }

  #[inline]
  fn mi_index(&self, bo: BlockOffset) -> usize {
    debug_assert!(bo.x < self.mi_cols && bo.y < self.mi_rows);
    bo.y * self.mi_cols + bo.x
  }

  #[inline]
  pub fn superblock(&self, sbo: SuperBlockOffset) -> &SuperblockInfo {
    &self.superblocks[self.sb_index(sbo)]
  }

  #[inline]
  pub fn superblock_mut(
    &mut self, sbo: SuperBlockOffset,
  ) -> &mut SuperblockInfo {
    let i = self.sb_index(sbo);
    &mut self.superblocks[i]
  }

  pub fn superblocks(&self) -> impl Iterator<Item = &SuperblockInfo> {
    self.superblocks.iter()
  }

  /// Drops anything previously stored for the superblock, so a tile can
  /// be decoded again.
  pub fn begin_superblock(&mut self, sbo: SuperBlockOffset, qindex: u8) {
    let base = sbo.block_offset(self.sb_size, 0, 0);
    let sb_mi = self.sb_size.mib_size();
    for y in base.y..(base.y + sb_mi).min(self.mi_rows) {
      let row = y * self.mi_cols;
      let cols = base.x..(base.x + sb_mi).min(self.mi_cols);
      self.block_map[row + cols.start..row + cols.end].fill(NO_BLOCK);
    }
    self.superblock_mut(sbo).clear(qindex);
  }

  /// The block covering `bo`, if one has been parsed there.
  pub fn block_at(&self, bo: BlockOffset) -> Option<&Block> {
    if bo.x >= self.mi_cols || bo.y >= self.mi_rows {
      return None;
    }
    match self.block_map[self.mi_index(bo)] {
      NO_BLOCK => None,
      i => {
        let sb = self.superblock(bo.sb_offset(self.sb_size));
        Some(&sb.blocks[i as usize])
      }
    }
  }

  /// The block covering mode-info unit (`x`, `y`) of superblock `sbo`.
  ///
  /// The unit must lie inside the frame and be covered by a stored block;
  /// use [`block_at`](Self::block_at) when that is not known.
  #[inline]
  pub fn mode_info(
    &self, sbo: SuperBlockOffset, x: usize, y: usize,
  ) -> &Block {
    let bo = sbo.block_offset(self.sb_size, x, y);
    let i = self.block_map[self.mi_index(bo)];
    debug_assert_ne!(i, NO_BLOCK, "no block at {:?}", bo);
    &self.superblock(sbo).blocks[i as usize]
  }

  #[inline]
  pub fn blocks(&self, sbo: SuperBlockOffset) -> &[Block] {
    &self.superblock(sbo).blocks
  }

  /// Stores a parsed block and points every mode-info unit it covers
  /// inside the frame at it. Blocks must be stored in parse order.
  pub fn update_mode_info(&mut self, block: Block) {
    let sbo = block.bo.sb_offset(self.sb_size);
    let sb = self.superblock_mut(sbo);
    let index = sb.blocks.len();
    debug_assert!(index < NO_BLOCK as usize);
    sb.blocks.push(block);

    let x_end = (block.bo.x + block.bsize.width_mi()).min(self.mi_cols);
    let y_end = (block.bo.y + block.bsize.height_mi()).min(self.mi_rows);
    for y in block.bo.y..y_end {
      let row = y * self.mi_cols;
      self.block_map[row + block.bo.x..row + x_end].fill(index as u16);
      self.segment_ids[row + block.bo.x..row + x_end].fill(block.segment_id);
    }
  }

  #[inline]
  pub fn transform_units(
    &self, sbo: SuperBlockOffset, plane: usize,
  ) -> &[TransformInfo] {
    &self.superblock(sbo).tx_units[plane]
  }

  pub fn block_transform_units(
    &self, block: &Block, plane: usize,
  ) -> &[TransformInfo] {
    let sbo = block.bo.sb_offset(self.sb_size);
    &self.transform_units(sbo, plane)[block.tx_unit_range(plane)]
  }

  /// Appends a transform unit, returning its index in the superblock.
  pub fn push_transform_unit(
    &mut self, sbo: SuperBlockOffset, plane: usize, tu: TransformInfo,
  ) -> u32 {
    let units = &mut self.superblock_mut(sbo).tx_units[plane];
    units.push(tu);
    units.len() as u32 - 1
  }

  /// Copies the coefficients of a transform block in, returning their
  /// offset.
  pub fn alloc_coefficients(
    &mut self, sbo: SuperBlockOffset, plane: usize, coeffs: &[i32],
  ) -> u32 {
    let list = &mut self.superblock_mut(sbo).coeffs[plane];
    let offset = list.len() as u32;
    list.extend_from_slice(coeffs);
    offset
  }

  #[inline]
  pub fn coefficients(&self, sbo: SuperBlockOffset, plane: usize) -> &[i32] {
    &self.superblock(sbo).coeffs[plane]
  }

  /// Coefficients of a coded transform unit.
  pub fn tx_coefficients(
    &self, sbo: SuperBlockOffset, plane: usize, tu: &TransformInfo,
  ) -> Option<&[i32]> {
    if !tu.has_coefficients() {
      return None;
    }
    let range: Range<usize> = tu.coeff_offset as usize
      ..tu.coeff_offset as usize + tu.tx_size.coded_size().area();
    Some(&self.coefficients(sbo, plane)[range])
  }

  #[inline]
  pub fn delta_q(&self, sbo: SuperBlockOffset) -> u8 {
    self.superblock(sbo).qindex
  }

  #[inline]
  pub fn delta_lf(&self, sbo: SuperBlockOffset) -> [i8; 4] {
    self.superblock(sbo).delta_lf
  }

  /// CDEF strength of the 64x64 area containing `bo`, if read.
  pub fn cdef_index(&self, bo: BlockOffset) -> Option<u8> {
    let sb = self.superblock(bo.sb_offset(self.sb_size));
    let (x, y) = bo.in_sb(self.sb_size);
    let idx = sb.cdef_index[((y >> 4) << 1) + (x >> 4)];
    u8::try_from(idx).ok()
  }

  #[inline]
  pub fn segment_id(&self, bo: BlockOffset) -> u8 {
    self.segment_ids[self.mi_index(bo)]
  }

  pub fn segment_map(&self) -> &[u8] {
    &self.segment_ids
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::partition::BlockSize::*;
  use pretty_assertions::assert_eq;

  fn storage(width: usize, height: usize) -> FrameStorage {
    let seq = SequenceHeader::default();
    let fh = FrameHeader { width, height, ..Default::default() };
    FrameStorage::new(&seq, &fh)
  }

  #[test]
  fn superblocks_cover_the_frame() {
    let fs = storage(200, 70);
    assert_eq!((fs.mi_cols, fs.mi_rows), (50, 18));
    assert_eq!((fs.sb_cols, fs.sb_rows), (4, 2));
    assert_eq!(fs.superblocks().count(), 8);
    let last = fs.superblock(SuperBlockOffset { x: 3, y: 1 });
    assert_eq!(last.sbo, SuperBlockOffset { x: 3, y: 1 });
    assert_eq!(last.cdef_index, [-1; 4]);
    assert_eq!(last.qindex, 100);
  }

  #[test]
  fn blocks_resolve_from_any_unit() {
    let mut fs = storage(64, 64);
    let sbo = SuperBlockOffset { x: 0, y: 0 };
    let a = Block {
      bo: BlockOffset { x: 0, y: 0 },
      bsize: BLOCK_32X32,
      segment_id: 3,
      ..Default::default()
    };
    let b = Block { bo: BlockOffset { x: 8, y: 0 }, bsize: BLOCK_32X16, ..a };
    fs.update_mode_info(a);
    fs.update_mode_info(b);

    assert_eq!(fs.blocks(sbo).len(), 2);
    assert_eq!(fs.mode_info(sbo, 7, 7).bo, a.bo);
    assert_eq!(fs.mode_info(sbo, 15, 3).bo, b.bo);
    assert_eq!(fs.block_at(BlockOffset { x: 9, y: 5 }), None);
    assert_eq!(fs.block_at(BlockOffset { x: 64, y: 0 }), None);
    assert_eq!(fs.segment_id(BlockOffset { x: 15, y: 3 }), 3);
    assert_eq!(fs.segment_id(BlockOffset { x: 15, y: 4 }), 0);

    fs.begin_superblock(sbo, 40);
    assert!(fs.blocks(sbo).is_empty());
    assert_eq!(fs.block_at(BlockOffset { x: 0, y: 0 }), None);
    assert_eq!(fs.delta_q(sbo), 40);
  }

  #[test]
  fn edge_blocks_stay_inside_the_map() {
    let mut fs = storage(40, 24);
    let block = Block {
      bo: BlockOffset { x: 8, y: 4 },
      bsize: BLOCK_16X16,
      segment_id: 1,
      ..Default::default()
    };
    fs.update_mode_info(block);
    let inside = fs.block_at(BlockOffset { x: 9, y: 5 });
    assert_eq!(inside.map(|b| b.bo), Some(block.bo));
    assert_eq!(fs.segment_map().iter().filter(|&&s| s == 1).count(), 4);

    // overhangs the bottom edge only
    let left = Block {
      bo: BlockOffset { x: 4, y: 4 },
      segment_id: 2,
      ..block
    };
    fs.update_mode_info(left);
    assert_eq!(fs.segment_map().iter().filter(|&&s| s == 2).count(), 8);
    assert_eq!(fs.segment_map().iter().filter(|&&s| s == 1).count(), 4);
    let sbo = SuperBlockOffset { x: 0, y: 0 };
    assert_eq!(fs.mode_info(sbo, 7, 5).bo, left.bo);
  }

  #[test]
  #[should_panic]
  fn mode_info_needs_a_stored_block() {
    let fs = storage(64, 64);
    fs.mode_info(SuperBlockOffset { x: 0, y: 0 }, 3, 3);
  }

  #[test]
  fn transform_units_and_coefficients() {
    let mut fs = storage(64, 64);
    let sbo = SuperBlockOffset { x: 0, y: 0 };
    let mut coeffs = [0i32; 16];
    coeffs[0] = 7;
    let offset = fs.alloc_coefficients(sbo, 0, &coeffs);
    let coded = TransformInfo {
      tx_size: TxSize::TX_4X4,
      x: 0,
      y: 0,
      tx_type: TxType::DCT_DCT,
      eob: 1,
      coeff_offset: offset,
    };
    let empty = TransformInfo { x: 4, eob: 0, coeff_offset: 0, ..coded };
    assert_eq!(fs.push_transform_unit(sbo, 0, coded), 0);
    assert_eq!(fs.push_transform_unit(sbo, 0, empty), 1);

    let block = Block {
      bsize: BLOCK_8X4,
      first_tx_unit: [0, 0, 0],
      tx_unit_count: [2, 0, 0],
      ..Default::default()
    };
    let units = fs.block_transform_units(&block, 0);
    assert_eq!(units.len(), 2);
    assert_eq!(fs.tx_coefficients(sbo, 0, &units[0]).map(|c| c[0]), Some(7));
    assert_eq!(fs.tx_coefficients(sbo, 0, &units[1]), None);
  }

  #[test]
  fn cdef_quadrants() {
    let seq =
      SequenceHeader { use_128x128_superblock: true, ..Default::default() };
    let fh = FrameHeader { width: 128, height: 128, ..Default::default() };
    let mut fs = FrameStorage::new(&seq, &fh);
    let sbo = SuperBlockOffset { x: 0, y: 0 };
    fs.superblock_mut(sbo).cdef_index[3] = 5;
    assert_eq!(fs.cdef_index(BlockOffset { x: 20, y: 17 }), Some(5));
    assert_eq!(fs.cdef_index(BlockOffset { x: 20, y: 3 }), None);
  }
}
