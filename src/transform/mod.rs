// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]

use crate::context::MI_SIZE_LOG2;
use crate::partition::{BlockSize, BlockSize::*};
use crate::predict::PredictionMode;

use TxSize::*;
use TxType::*;

pub const TX_TYPES: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Default)]
pub enum TxType {
  #[default]
  DCT_DCT = 0, // DCT  in both horizontal and vertical
  ADST_DCT = 1,  // ADST in vertical, DCT in horizontal
  DCT_ADST = 2,  // DCT  in vertical, ADST in horizontal
  ADST_ADST = 3, // ADST in both directions
  FLIPADST_DCT = 4,
  DCT_FLIPADST = 5,
  FLIPADST_FLIPADST = 6,
  ADST_FLIPADST = 7,
  FLIPADST_ADST = 8,
  IDTX = 9,
  V_DCT = 10,
  H_DCT = 11,
  V_ADST = 12,
  H_ADST = 13,
  V_FLIPADST = 14,
  H_FLIPADST = 15,
}

/// Transform Size
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Default)]
pub enum TxSize {
  #[default]
  TX_4X4,
  TX_8X8,
  TX_16X16,
  TX_32X32,
  TX_64X64,

  TX_4X8,
  TX_8X4,
  TX_8X16,
  TX_16X8,
  TX_16X32,
  TX_32X16,
  TX_32X64,
  TX_64X32,

  TX_4X16,
  TX_16X4,
  TX_8X32,
  TX_32X8,
  TX_16X64,
  TX_64X16,
}

impl TxSize {
  /// Number of square transform sizes
  pub const TX_SIZES: usize = 5;

  /// Number of transform sizes (including non-square sizes)
  pub const TX_SIZES_ALL: usize = 14 + 5;

  #[inline]
  pub const fn width(self) -> usize {
    1 << self.width_log2()
  }

  #[inline]
  pub const fn width_log2(self) -> usize {
    match self {
      TX_4X4 | TX_4X8 | TX_4X16 => 2,
      TX_8X8 | TX_8X4 | TX_8X16 | TX_8X32 => 3,
      TX_16X16 | TX_16X8 | TX_16X32 | TX_16X4 | TX_16X64 => 4,
      TX_32X32 | TX_32X16 | TX_32X64 | TX_32X8 => 5,
      TX_64X64 | TX_64X32 | TX_64X16 => 6,
    }
  }

  #[inline]
  pub const fn height(self) -> usize {
    1 << self.height_log2()
  }

  #[inline]
  pub const fn height_log2(self) -> usize {
    match self {
      TX_4X4 | TX_8X4 | TX_16X4 => 2,
      TX_8X8 | TX_4X8 | TX_16X8 | TX_32X8 => 3,
      TX_16X16 | TX_8X16 | TX_32X16 | TX_4X16 | TX_64X16 => 4,
      TX_32X32 | TX_16X32 | TX_64X32 | TX_8X32 => 5,
      TX_64X64 | TX_32X64 | TX_16X64 => 6,
    }
  }

  #[inline]
  pub const fn width_mi(self) -> usize {
    self.width() >> MI_SIZE_LOG2
  }

  #[inline]
  pub const fn height_mi(self) -> usize {
    self.height() >> MI_SIZE_LOG2
  }

  #[inline]
  pub const fn area(self) -> usize {
    1 << (self.width_log2() + self.height_log2())
  }

  #[inline]
  pub const fn block_size(self) -> BlockSize {
    match self {
      TX_4X4 => BLOCK_4X4,
      TX_8X8 => BLOCK_8X8,
      TX_16X16 => BLOCK_16X16,
      TX_32X32 => BLOCK_32X32,
      TX_64X64 => BLOCK_64X64,
      TX_4X8 => BLOCK_4X8,
      TX_8X4 => BLOCK_8X4,
      TX_8X16 => BLOCK_8X16,
      TX_16X8 => BLOCK_16X8,
      TX_16X32 => BLOCK_16X32,
      TX_32X16 => BLOCK_32X16,
      TX_32X64 => BLOCK_32X64,
      TX_64X32 => BLOCK_64X32,
      TX_4X16 => BLOCK_4X16,
      TX_16X4 => BLOCK_16X4,
      TX_8X32 => BLOCK_8X32,
      TX_32X8 => BLOCK_32X8,
      TX_16X64 => BLOCK_16X64,
      TX_64X16 => BLOCK_64X16,
    }
  }

  #[inline]
  pub const fn sqr(self) -> TxSize {
    match self {
      TX_4X4 | TX_4X8 | TX_8X4 | TX_4X16 | TX_16X4 => TX_4X4,
      TX_8X8 | TX_8X16 | TX_16X8 | TX_8X32 | TX_32X8 => TX_8X8,
      TX_16X16 | TX_16X32 | TX_32X16 | TX_16X64 | TX_64X16 => TX_16X16,
      TX_32X32 | TX_32X64 | TX_64X32 => TX_32X32,
      TX_64X64 => TX_64X64,
    }
  }

  #[inline]
  pub const fn sqr_up(self) -> TxSize {
    match self {
      TX_4X4 => TX_4X4,
      TX_8X8 | TX_4X8 | TX_8X4 => TX_8X8,
      TX_16X16 | TX_8X16 | TX_16X8 | TX_4X16 | TX_16X4 => TX_16X16,
      TX_32X32 | TX_16X32 | TX_32X16 | TX_8X32 | TX_32X8 => TX_32X32,
      TX_64X64 | TX_32X64 | TX_64X32 | TX_16X64 | TX_64X16 => TX_64X64,
    }
  }

  /// The region that actually carries coefficients. Only the top-left
  /// 32x32 of a 64-point transform is coded.
  #[inline]
  pub const fn coded_size(self) -> TxSize {
    match self {
      TX_64X64 | TX_32X64 | TX_64X32 => TX_32X32,
      TX_16X64 => TX_16X32,
      TX_64X16 => TX_32X16,
      t => t,
    }
  }

  /// Next smaller size when a transform is split one level.
  #[inline]
  pub fn split(self) -> TxSize {
    sub_tx_size_map[self as usize]
  }

  /// Number of splits from this size down to 4x4.
  pub fn depth(self) -> usize {
    let mut t = self;
    let mut depth = 0;
    while !matches!(t, TX_4X4) {
      depth += 1;
      t = t.split();
    }
    depth
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd)]
pub enum TxSet {
  // DCT only
  TX_SET_DCTONLY,
  // Discrete Trig transforms w/o flip (4) + Identity (1)
  TX_SET_INTRA_2, // TX_SET_DTT4_IDTX
  // Discrete Trig transforms w/o flip (4) + Identity (1) + 1D Hor/vert DCT (2)
  TX_SET_INTRA_1, // TX_SET_DTT4_IDTX_1DDCT
}

impl TxSet {
  /// Transform types in the order their symbols are coded.
  pub const fn tx_types(self) -> &'static [TxType] {
    match self {
      TxSet::TX_SET_DCTONLY => &[DCT_DCT],
      TxSet::TX_SET_INTRA_2 => &[IDTX, DCT_DCT, ADST_ADST, ADST_DCT, DCT_ADST],
      TxSet::TX_SET_INTRA_1 => {
        &[IDTX, DCT_DCT, V_DCT, H_DCT, ADST_ADST, ADST_DCT, DCT_ADST]
      }
    }
  }

  #[inline]
  pub fn contains(self, tx_type: TxType) -> bool {
    self.tx_types().contains(&tx_type)
  }
}

/// Transform set available to an intra block for `tx_size`.
pub fn get_tx_set(tx_size: TxSize, use_reduced_set: bool) -> TxSet {
  let tx_size_sqr_up = tx_size.sqr_up();
  let tx_size_sqr = tx_size.sqr();

  if tx_size_sqr_up >= TX_32X32 {
    TxSet::TX_SET_DCTONLY
  } else if use_reduced_set || tx_size_sqr == TX_16X16 {
    TxSet::TX_SET_INTRA_2
  } else {
    TxSet::TX_SET_INTRA_1
  }
}

/// Default transform type of each intra mode; chroma blocks use it
/// directly.
static intra_mode_to_tx_type: [TxType; 14] = [
  DCT_DCT,   // DC
  ADST_DCT,  // V
  DCT_ADST,  // H
  DCT_DCT,   // D45
  ADST_ADST, // D135
  ADST_DCT,  // D113
  DCT_ADST,  // D157
  DCT_ADST,  // D203
  ADST_DCT,  // D67
  ADST_ADST, // SMOOTH
  ADST_DCT,  // SMOOTH_V
  DCT_ADST,  // SMOOTH_H
  ADST_ADST, // PAETH
  DCT_DCT,   // UV_CFL
];

/// Transform type of a chroma transform block of an intra block.
pub fn uv_intra_tx_type(
  uv_mode: PredictionMode, uv_tx_size: TxSize, lossless: bool,
  use_reduced_set: bool,
) -> TxType {
  if lossless || uv_tx_size.sqr_up() > TX_32X32 {
    return DCT_DCT;
  }
  let tx_type = intra_mode_to_tx_type[uv_mode as usize];
  if get_tx_set(uv_tx_size, use_reduced_set).contains(tx_type) {
    tx_type
  } else {
    DCT_DCT
  }
}

pub static max_txsize_rect_lookup: [TxSize; BlockSize::BLOCK_SIZES_ALL] = [
  TX_4X4,   // 4x4
  TX_4X8,   // 4x8
  TX_8X4,   // 8x4
  TX_8X8,   // 8x8
  TX_8X16,  // 8x16
  TX_16X8,  // 16x8
  TX_16X16, // 16x16
  TX_16X32, // 16x32
  TX_32X16, // 32x16
  TX_32X32, // 32x32
  TX_32X64, // 32x64
  TX_64X32, // 64x32
  TX_64X64, // 64x64
  TX_64X64, // 64x128
  TX_64X64, // 128x64
  TX_64X64, // 128x128
  TX_4X16,  // 4x16
  TX_16X4,  // 16x4
  TX_8X32,  // 8x32
  TX_32X8,  // 32x8
  TX_16X64, // 16x64
  TX_64X16, // 64x16
];

pub static sub_tx_size_map: [TxSize; TxSize::TX_SIZES_ALL] = [
  TX_4X4,   // TX_4X4
  TX_4X4,   // TX_8X8
  TX_8X8,   // TX_16X16
  TX_16X16, // TX_32X32
  TX_32X32, // TX_64X64
  TX_4X4,   // TX_4X8
  TX_4X4,   // TX_8X4
  TX_8X8,   // TX_8X16
  TX_8X8,   // TX_16X8
  TX_16X16, // TX_16X32
  TX_16X16, // TX_32X16
  TX_32X32, // TX_32X64
  TX_32X32, // TX_64X32
  TX_4X8,   // TX_4X16
  TX_8X4,   // TX_16X4
  TX_8X16,  // TX_8X32
  TX_16X8,  // TX_32X8
  TX_16X32, // TX_16X64
  TX_32X16, // TX_64X16
];

#[cfg(test)]
mod test {
  use super::*;
  use crate::predict::PredictionMode::*;

  #[test]
  fn depth_to_4x4() {
    assert_eq!(TX_4X4.depth(), 0);
    assert_eq!(TX_8X8.depth(), 1);
    assert_eq!(TX_4X16.depth(), 2);
    assert_eq!(TX_8X32.depth(), 3);
    assert_eq!(TX_16X64.depth(), 4);
    assert_eq!(TX_64X64.depth(), 4);
  }

  #[test]
  fn coded_region_is_capped() {
    assert_eq!(TX_64X16.coded_size(), TX_32X16);
    assert_eq!(TX_16X64.coded_size().area(), 512);
    assert_eq!(TX_8X32.coded_size(), TX_8X32);
  }

  #[test]
  fn intra_sets() {
    assert_eq!(get_tx_set(TX_4X4, false), TxSet::TX_SET_INTRA_1);
    assert_eq!(get_tx_set(TX_4X4, true), TxSet::TX_SET_INTRA_2);
    assert_eq!(get_tx_set(TX_16X16, false), TxSet::TX_SET_INTRA_2);
    assert_eq!(get_tx_set(TX_16X4, false), TxSet::TX_SET_INTRA_1);
    assert_eq!(get_tx_set(TX_8X32, false), TxSet::TX_SET_DCTONLY);
    assert_eq!(get_tx_set(TX_64X64, false), TxSet::TX_SET_DCTONLY);
  }

  #[test]
  fn chroma_type_falls_back_to_dct() {
    assert_eq!(uv_intra_tx_type(V_PRED, TX_8X8, false, false), ADST_DCT);
    assert_eq!(uv_intra_tx_type(UV_CFL_PRED, TX_8X8, false, false), DCT_DCT);
    assert_eq!(uv_intra_tx_type(PAETH_PRED, TX_32X32, false, false), DCT_DCT);
    assert_eq!(uv_intra_tx_type(H_PRED, TX_4X4, true, false), DCT_DCT);
  }
}
