// Copyright (c) 2018-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! The parts of the sequence and frame headers tile decoding depends on.
//!
//! Headers are parsed elsewhere; these structs are filled in by the caller
//! and only checked for consistency here.

#![allow(non_camel_case_types)]

use crate::context::{SuperBlockSize, MAX_LOOP_FILTER};
use crate::entropymode::MAX_SEGMENTS;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use v_frame::pixel::ChromaSampling;

pub const MAX_TILE_COLS: usize = 64;
pub const MAX_TILE_ROWS: usize = 64;
pub const MAX_CDEF_BITS: u8 = 3;
pub const MAX_DELTA_SHIFT: u8 = 3;
pub const MAX_FRAME_DIMENSION: usize = 1 << 16;

/// Header values that cannot describe a decodable frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvalidHeader {
  /// The width is invalid.
  #[error("invalid width {0} (expected >= 1, <= 65536)")]
  InvalidWidth(usize),
  /// The height is invalid.
  #[error("invalid height {0} (expected >= 1, <= 65536)")]
  InvalidHeight(usize),
  #[error("invalid bit depth {0} (expected 8, 10 or 12)")]
  InvalidBitDepth(usize),
  /// Only vertical subsampling has no AV1 chroma layout.
  #[error("unsupported chroma subsampling ({x}, {y})")]
  InvalidSubsampling { x: bool, y: bool },
  #[error("invalid cdef bits {0} (expected <= 3)")]
  InvalidCdefBits(u8),
  #[error("invalid delta resolution {0} (expected <= 3)")]
  InvalidDeltaShift(u8),
  /// Delta loop filter values are only coded alongside delta q.
  #[error("delta loop filter enabled without delta q")]
  DeltaLfWithoutDeltaQ,
  #[error("invalid last active segment {0} (expected < 8)")]
  InvalidLastActiveSegment(u8),
  #[error("intra block copy requires screen content tools")]
  IntraBcWithoutScreenContent,
  /// Tile starts must be increasing and cover the frame.
  #[error("invalid tile layout: {0}")]
  InvalidTileLayout(&'static str),
  #[error("context update tile {actual} out of range (tiles: {tiles})")]
  InvalidContextUpdateTile { actual: usize, tiles: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct SequenceHeader {
  pub bit_depth: usize,
  pub chroma_sampling: ChromaSampling,
  pub use_128x128_superblock: bool,
  pub enable_filter_intra: bool,
  pub enable_cdef: bool,
}

impl Default for SequenceHeader {
  fn default() -> Self {
    SequenceHeader {
      bit_depth: 8,
      chroma_sampling: ChromaSampling::Cs420,
      use_128x128_superblock: false,
      enable_filter_intra: true,
      enable_cdef: true,
    }
  }
}

impl SequenceHeader {
  #[inline]
  pub const fn sb_size(&self) -> SuperBlockSize {
    SuperBlockSize::new(self.use_128x128_superblock)
  }

  #[inline]
  pub fn planes(&self) -> usize {
    if self.chroma_sampling == ChromaSampling::Cs400 {
      1
    } else {
      3
    }
  }

  pub fn validate(&self) -> Result<(), InvalidHeader> {
    if ![8, 10, 12].contains(&self.bit_depth) {
      return Err(InvalidHeader::InvalidBitDepth(self.bit_depth));
    }
    Ok(())
  }
}

/// Chroma layout of the coded subsampling flags.
pub fn chroma_sampling(
  mono_chrome: bool, subsampling_x: bool, subsampling_y: bool,
) -> Result<ChromaSampling, InvalidHeader> {
  Ok(match (mono_chrome, subsampling_x, subsampling_y) {
    (true, ..) => ChromaSampling::Cs400,
    (false, true, true) => ChromaSampling::Cs420,
    (false, true, false) => ChromaSampling::Cs422,
    (false, false, false) => ChromaSampling::Cs444,
    (false, false, true) => {
      return Err(InvalidHeader::InvalidSubsampling {
        x: subsampling_x,
        y: subsampling_y,
      })
    }
  })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum FrameType {
  #[default]
  KEY,
  INTER,
  INTRA_ONLY,
  SWITCH,
}

impl FrameType {
  #[inline]
  pub const fn is_intra(self) -> bool {
    matches!(self, FrameType::KEY | FrameType::INTRA_ONLY)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum RestorationType {
  #[default]
  None,
  Wiener,
  Sgrproj,
  Switchable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
  Only4x4,
  Largest,
  Select,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SegLvl {
  SEG_LVL_ALT_Q = 0,      /* Use alternate Quantizer .... */
  SEG_LVL_ALT_LF_Y_V = 1, /* Alternate loop filter value, y plane vertical */
  SEG_LVL_ALT_LF_Y_H = 2, /* Alternate loop filter value, y plane horizontal */
  SEG_LVL_ALT_LF_U = 3,   /* Use alternate loop filter value on u plane */
  SEG_LVL_ALT_LF_V = 4,   /* Use alternate loop filter value on v plane */
  SEG_LVL_REF_FRAME = 5,  /* Optional Segment reference frame */
  SEG_LVL_SKIP = 6,       /* Optional Segment (0,0) + skip mode */
  SEG_LVL_GLOBALMV = 7,
  SEG_LVL_MAX = 8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct SegmentationState {
  pub enabled: bool,
  /// Segment ids are coded before the skip flag.
  pub preskip: bool,
  pub last_active_segid: u8,
  pub features: [[bool; SegLvl::SEG_LVL_MAX as usize]; MAX_SEGMENTS],
  pub data: [[i16; SegLvl::SEG_LVL_MAX as usize]; MAX_SEGMENTS],
}

impl Default for SegmentationState {
  fn default() -> Self {
    SegmentationState {
      enabled: false,
      preskip: false,
      last_active_segid: 0,
      features: [[false; SegLvl::SEG_LVL_MAX as usize]; MAX_SEGMENTS],
      data: [[0; SegLvl::SEG_LVL_MAX as usize]; MAX_SEGMENTS],
    }
  }
}

impl SegmentationState {
  /// Derives `preskip` and `last_active_segid` from the enabled features.
  pub fn update(&mut self) {
    self.preskip = false;
    self.last_active_segid = 0;
    if !self.enabled {
      return;
    }
    for (i, features) in self.features.iter().enumerate() {
      for (j, &enabled) in features.iter().enumerate() {
        if enabled {
          self.last_active_segid = i as u8;
          if j >= SegLvl::SEG_LVL_REF_FRAME as usize {
            self.preskip = true;
          }
        }
      }
    }
  }

  #[inline]
  pub fn feature_active(&self, segment_id: u8, feature: SegLvl) -> bool {
    self.enabled && self.features[segment_id as usize][feature as usize]
  }
}

/// Block level loop filter deltas.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct DeblockState {
  pub block_deltas_enabled: bool,
  pub block_delta_shift: u8,
  /// One delta per filter level instead of a single shared one.
  pub block_delta_multi: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum TileLayout {
  /// Equal tiles, `1 << cols_log2` by `1 << rows_log2` at most.
  Uniform { cols_log2: u8, rows_log2: u8 },
  /// First superblock of every tile column and row.
  Explicit { col_starts_sb: Vec<usize>, row_starts_sb: Vec<usize> },
}

impl Default for TileLayout {
  fn default() -> Self {
    TileLayout::Uniform { cols_log2: 0, rows_log2: 0 }
  }
}

/// Tile boundaries in superblocks, each list closed by the frame's
/// superblock count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
  pub col_starts_sb: Vec<usize>,
  pub row_starts_sb: Vec<usize>,
}

impl TileGrid {
  #[inline]
  pub fn cols(&self) -> usize {
    self.col_starts_sb.len() - 1
  }

  #[inline]
  pub fn rows(&self) -> usize {
    self.row_starts_sb.len() - 1
  }

  #[inline]
  pub fn count(&self) -> usize {
    self.cols() * self.rows()
  }
}

fn uniform_starts(sb_count: usize, log2: u8) -> Vec<usize> {
  let step = (sb_count + (1 << log2) - 1) >> log2;
  let mut starts: Vec<usize> = (0..sb_count).step_by(step.max(1)).collect();
  starts.push(sb_count);
  starts
}

fn check_starts(
  starts: &[usize], sb_count: usize, max_tiles: usize,
) -> Result<(), InvalidHeader> {
  use InvalidHeader::InvalidTileLayout;
  match (starts.first(), starts.last()) {
    (Some(0), Some(&end)) if end == sb_count => {}
    _ => return Err(InvalidTileLayout("tiles must span the frame")),
  }
  if starts.len() < 2 || starts.len() - 1 > max_tiles {
    return Err(InvalidTileLayout("too many tiles"));
  }
  if starts.windows(2).any(|w| w[0] >= w[1]) {
    return Err(InvalidTileLayout("tile starts must increase"));
  }
  Ok(())
}

impl TileLayout {
  pub fn grid(
    &self, sb_cols: usize, sb_rows: usize,
  ) -> Result<TileGrid, InvalidHeader> {
    let grid = match self {
      TileLayout::Uniform { cols_log2, rows_log2 } => {
        if *cols_log2 > 6 || *rows_log2 > 6 {
          return Err(InvalidHeader::InvalidTileLayout("too many tiles"));
        }
        TileGrid {
          col_starts_sb: uniform_starts(sb_cols, *cols_log2),
          row_starts_sb: uniform_starts(sb_rows, *rows_log2),
        }
      }
      TileLayout::Explicit { col_starts_sb, row_starts_sb } => {
        let mut grid = TileGrid {
          col_starts_sb: col_starts_sb.clone(),
          row_starts_sb: row_starts_sb.clone(),
        };
        if grid.col_starts_sb.last() != Some(&sb_cols) {
          grid.col_starts_sb.push(sb_cols);
        }
        if grid.row_starts_sb.last() != Some(&sb_rows) {
          grid.row_starts_sb.push(sb_rows);
        }
        grid
      }
    };
    check_starts(&grid.col_starts_sb, sb_cols, MAX_TILE_COLS)?;
    check_starts(&grid.row_starts_sb, sb_rows, MAX_TILE_ROWS)?;
    Ok(grid)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct FrameHeader {
  pub frame_type: FrameType,
  pub width: usize,
  pub height: usize,
  pub base_q_idx: u8,
  /// Per plane quantizer deltas. Luma has no AC delta, `ac_delta_q[0]`
  /// is ignored.
  pub dc_delta_q: [i8; 3],
  pub ac_delta_q: [i8; 3],
  pub segmentation: SegmentationState,
  pub delta_q_present: bool,
  /// log2 of the delta q scale.
  pub delta_q_res: u8,
  pub deblock: DeblockState,
  pub cdef_bits: u8,
  pub tx_mode_select: bool,
  pub reduced_tx_set: bool,
  pub allow_screen_content_tools: bool,
  pub allow_intrabc: bool,
  pub disable_cdf_update: bool,
  pub restoration: [RestorationType; 3],
  pub tiles: TileLayout,
  /// Tile whose final CDFs are carried to the next frame.
  pub context_update_tile_id: usize,
}

impl Default for FrameHeader {
  fn default() -> Self {
    FrameHeader {
      frame_type: FrameType::KEY,
      width: 64,
      height: 64,
      base_q_idx: 100,
      dc_delta_q: [0; 3],
      ac_delta_q: [0; 3],
      segmentation: SegmentationState::default(),
      delta_q_present: false,
      delta_q_res: 0,
      deblock: DeblockState::default(),
      cdef_bits: 0,
      tx_mode_select: true,
      reduced_tx_set: false,
      allow_screen_content_tools: false,
      allow_intrabc: false,
      disable_cdf_update: false,
      restoration: [RestorationType::None; 3],
      tiles: TileLayout::default(),
      context_update_tile_id: 0,
    }
  }
}

impl FrameHeader {
  /// Width in mode-info units, rounded up to whole 8x8 blocks.
  #[inline]
  pub const fn mi_cols(&self) -> usize {
    2 * ((self.width + 7) >> 3)
  }

  #[inline]
  pub const fn mi_rows(&self) -> usize {
    2 * ((self.height + 7) >> 3)
  }

  /// Quantizer index of a segment before any block level delta.
  pub fn segment_qindex(&self, segment_id: u8) -> u8 {
    if self.segmentation.feature_active(segment_id, SegLvl::SEG_LVL_ALT_Q) {
      let data = self.segmentation.data[segment_id as usize]
        [SegLvl::SEG_LVL_ALT_Q as usize];
      (self.base_q_idx as i32 + data as i32).clamp(0, 255) as u8
    } else {
      self.base_q_idx
    }
  }

  pub fn lossless(&self, segment_id: u8) -> bool {
    self.segment_qindex(segment_id) == 0
      && self.dc_delta_q.iter().all(|&d| d == 0)
      && self.ac_delta_q[1..].iter().all(|&d| d == 0)
  }

  /// Every segment is lossless.
  pub fn coded_lossless(&self) -> bool {
    (0..MAX_SEGMENTS as u8).all(|s| self.lossless(s))
  }

  pub fn tx_mode(&self) -> TxMode {
    if self.coded_lossless() {
      TxMode::Only4x4
    } else if self.tx_mode_select {
      TxMode::Select
    } else {
      TxMode::Largest
    }
  }

  pub fn tile_grid(
    &self, seq: &SequenceHeader,
  ) -> Result<TileGrid, InvalidHeader> {
    let sb_size = seq.sb_size();
    self
      .tiles
      .grid(sb_size.count(self.mi_cols()), sb_size.count(self.mi_rows()))
  }

  pub fn validate(&self, seq: &SequenceHeader) -> Result<(), InvalidHeader> {
    use InvalidHeader::*;

    seq.validate()?;
    if self.width < 1 || self.width > MAX_FRAME_DIMENSION {
      return Err(InvalidWidth(self.width));
    }
    if self.height < 1 || self.height > MAX_FRAME_DIMENSION {
      return Err(InvalidHeight(self.height));
    }
    if self.cdef_bits > MAX_CDEF_BITS {
      return Err(InvalidCdefBits(self.cdef_bits));
    }
    if self.delta_q_res > MAX_DELTA_SHIFT {
      return Err(InvalidDeltaShift(self.delta_q_res));
    }
    if self.deblock.block_delta_shift > MAX_DELTA_SHIFT {
      return Err(InvalidDeltaShift(self.deblock.block_delta_shift));
    }
    if self.deblock.block_deltas_enabled && !self.delta_q_present {
      return Err(DeltaLfWithoutDeltaQ);
    }
    if self.segmentation.last_active_segid as usize >= MAX_SEGMENTS {
      return Err(InvalidLastActiveSegment(
        self.segmentation.last_active_segid,
      ));
    }
    if self.allow_intrabc && !self.allow_screen_content_tools {
      return Err(IntraBcWithoutScreenContent);
    }
    let tiles = self.tile_grid(seq)?.count();
    if self.context_update_tile_id >= tiles {
      return Err(InvalidContextUpdateTile {
        actual: self.context_update_tile_id,
        tiles,
      });
    }
    Ok(())
  }
}

/// Applies a coded loop filter delta to the running value.
#[inline]
pub fn clip_delta_lf(current: i8, delta: i32, shift: u8) -> i8 {
  (current as i32 + (delta << shift))
    .clamp(-MAX_LOOP_FILTER, MAX_LOOP_FILTER) as i8
}

/// Applies a coded quantizer delta to the running index.
#[inline]
pub fn clip_delta_q(current: u8, delta: i32, shift: u8) -> u8 {
  (current as i32 + (delta << shift)).clamp(1, 255) as u8
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn mode_info_dimensions() {
    let fh = FrameHeader { width: 1921, height: 1080, ..Default::default() };
    assert_eq!(fh.mi_cols(), 482);
    assert_eq!(fh.mi_rows(), 270);
    let fh = FrameHeader { width: 4, height: 1, ..Default::default() };
    assert_eq!((fh.mi_cols(), fh.mi_rows()), (2, 2));
  }

  #[test]
  fn segment_features() {
    let mut seg = SegmentationState { enabled: true, ..Default::default() };
    seg.features[2][SegLvl::SEG_LVL_ALT_Q as usize] = true;
    seg.update();
    assert_eq!(seg.last_active_segid, 2);
    assert!(!seg.preskip);
    seg.features[5][SegLvl::SEG_LVL_SKIP as usize] = true;
    seg.update();
    assert_eq!(seg.last_active_segid, 5);
    assert!(seg.preskip);
    assert!(seg.feature_active(5, SegLvl::SEG_LVL_SKIP));
    seg.enabled = false;
    assert!(!seg.feature_active(5, SegLvl::SEG_LVL_SKIP));
  }

  #[test]
  fn lossless_segments() {
    let mut fh = FrameHeader { base_q_idx: 0, ..Default::default() };
    assert!(fh.coded_lossless());
    assert_eq!(fh.tx_mode(), TxMode::Only4x4);

    fh.base_q_idx = 30;
    fh.segmentation.enabled = true;
    fh.segmentation.features[1][SegLvl::SEG_LVL_ALT_Q as usize] = true;
    fh.segmentation.data[1][SegLvl::SEG_LVL_ALT_Q as usize] = -40;
    assert_eq!(fh.segment_qindex(1), 0);
    assert!(fh.lossless(1));
    assert!(!fh.lossless(0));
    assert!(!fh.coded_lossless());
    assert_eq!(fh.tx_mode(), TxMode::Select);

    fh.ac_delta_q[2] = 1;
    assert!(!fh.lossless(1));
  }

  #[test]
  fn uniform_tiles() {
    let layout = TileLayout::Uniform { cols_log2: 2, rows_log2: 1 };
    let grid = layout.grid(10, 3).unwrap();
    assert_eq!(grid.col_starts_sb, [0, 3, 6, 9, 10]);
    assert_eq!(grid.row_starts_sb, [0, 2, 3]);
    assert_eq!(grid.count(), 8);

    // fewer superblocks than requested tiles
    let grid = layout.grid(2, 1).unwrap();
    assert_eq!(grid.col_starts_sb, [0, 1, 2]);
    assert_eq!(grid.rows(), 1);
  }

  #[test]
  fn explicit_tiles_are_checked() {
    let layout = TileLayout::Explicit {
      col_starts_sb: vec![0, 4],
      row_starts_sb: vec![0],
    };
    let grid = layout.grid(6, 2).unwrap();
    assert_eq!(grid.col_starts_sb, [0, 4, 6]);
    assert_eq!(grid.row_starts_sb, [0, 2]);

    let layout = TileLayout::Explicit {
      col_starts_sb: vec![0, 4, 4],
      row_starts_sb: vec![0],
    };
    assert!(matches!(
      layout.grid(6, 2),
      Err(InvalidHeader::InvalidTileLayout(_))
    ));
    let layout = TileLayout::Explicit {
      col_starts_sb: vec![1],
      row_starts_sb: vec![0],
    };
    assert!(layout.grid(6, 2).is_err());
  }

  #[test]
  fn validation() {
    let seq = SequenceHeader::default();
    assert_eq!(FrameHeader::default().validate(&seq), Ok(()));

    let fh = FrameHeader { width: 0, ..Default::default() };
    assert_eq!(fh.validate(&seq), Err(InvalidHeader::InvalidWidth(0)));
    let fh = FrameHeader { cdef_bits: 4, ..Default::default() };
    assert_eq!(fh.validate(&seq), Err(InvalidHeader::InvalidCdefBits(4)));
    let fh = FrameHeader {
      deblock: DeblockState {
        block_deltas_enabled: true,
        ..Default::default()
      },
      ..Default::default()
    };
    assert_eq!(fh.validate(&seq), Err(InvalidHeader::DeltaLfWithoutDeltaQ));
    let fh = FrameHeader { context_update_tile_id: 1, ..Default::default() };
    assert_eq!(
      fh.validate(&seq),
      Err(InvalidHeader::InvalidContextUpdateTile { actual: 1, tiles: 1 })
    );
    let seq = SequenceHeader { bit_depth: 9, ..Default::default() };
    assert_eq!(
      FrameHeader::default().validate(&seq),
      Err(InvalidHeader::InvalidBitDepth(9))
    );
  }

  #[test]
  fn subsampling_layouts() {
    assert_eq!(chroma_sampling(false, true, true), Ok(ChromaSampling::Cs420));
    assert_eq!(chroma_sampling(false, true, false), Ok(ChromaSampling::Cs422));
    assert_eq!(chroma_sampling(true, true, true), Ok(ChromaSampling::Cs400));
    assert_eq!(
      chroma_sampling(false, false, true),
      Err(InvalidHeader::InvalidSubsampling { x: false, y: true })
    );
  }

  #[test]
  fn delta_clipping() {
    assert_eq!(clip_delta_q(10, -20, 0), 1);
    assert_eq!(clip_delta_q(250, 3, 2), 255);
    assert_eq!(clip_delta_q(100, -3, 1), 94);
    assert_eq!(clip_delta_lf(60, 2, 1), 63);
    assert_eq!(clip_delta_lf(-60, -9, 0), -63);
  }
}
