// Copyright (c) 2019-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

mod tile_reader;

pub use self::tile_reader::*;

use crate::context::{CDFContext, SuperBlockOffset, SuperBlockSize};
use crate::error::{Error, Feature};
use crate::frame::FrameStorage;
use crate::header::{FrameHeader, RestorationType, SequenceHeader, TileGrid};

use itertools::iproduct;
use log::debug;

/// Position of one tile in the frame.
///
/// Superblock ranges are half-open. The mode-info ranges are clipped to
/// the frame, so the last tile of a row or column may be narrower than
/// its superblocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileInfo {
  /// Index in raster order, which is also the order of the tile data.
  pub index: usize,
  pub sb_col_start: usize,
  pub sb_col_end: usize,
  pub sb_row_start: usize,
  pub sb_row_end: usize,
  pub mi_col_start: usize,
  pub mi_col_end: usize,
  pub mi_row_start: usize,
  pub mi_row_end: usize,
}

impl TileInfo {
  pub fn new(
    grid: &TileGrid, index: usize, sb_size: SuperBlockSize, mi_cols: usize,
    mi_rows: usize,
  ) -> Self {
    debug_assert!(index < grid.count());
    let col = index % grid.cols();
    let row = index / grid.cols();
    let log2 = sb_size.mib_size_log2;
    let (sb_col_start, sb_col_end) =
      (grid.col_starts_sb[col], grid.col_starts_sb[col + 1]);
    let (sb_row_start, sb_row_end) =
      (grid.row_starts_sb[row], grid.row_starts_sb[row + 1]);

    TileInfo {
      index,
      sb_col_start,
      sb_col_end,
      sb_row_start,
      sb_row_end,
      mi_col_start: sb_col_start << log2,
      mi_col_end: (sb_col_end << log2).min(mi_cols),
      mi_row_start: sb_row_start << log2,
      mi_row_end: (sb_row_end << log2).min(mi_rows),
    }
  }

  #[inline]
  pub const fn mi_cols(&self) -> usize {
    self.mi_col_end - self.mi_col_start
  }

  #[inline]
  pub const fn mi_rows(&self) -> usize {
    self.mi_row_end - self.mi_row_start
  }

  /// Superblocks of the tile in decoding order.
  pub fn superblocks(&self) -> impl Iterator<Item = SuperBlockOffset> {
    iproduct!(
      self.sb_row_start..self.sb_row_end,
      self.sb_col_start..self.sb_col_end
    )
    .map(|(y, x)| SuperBlockOffset { x, y })
  }
}

/// Output of decoding the tiles of one frame.
#[derive(Debug)]
pub struct DecodedFrame {
  pub storage: FrameStorage,
  /// Adapted CDFs of the tile selected by `context_update_tile_id`, with
  /// their counters cleared, to seed the next frame.
  pub next_cdfs: Box<CDFContext>,
}

/// Decodes every tile of an intra frame into a new [`FrameStorage`].
///
/// `tiles` holds the payload of each tile in raster order. Tiles are
/// decoded one after another, each with freshly initialised contexts.
///
/// # Errors
///
/// - Returns `Error::InvalidHeader` if the headers are inconsistent.
/// - Returns `Error::Unsupported` for inter frames and loop restoration.
/// - Returns `Error::TileCount` if the number of payloads does not match
///   the tile layout.
/// - Returns `Error::Tile` for the first tile that fails to decode.
#[profiling::function]
pub fn decode_frame_tiles(
  seq: &SequenceHeader, fh: &FrameHeader, tiles: &[&[u8]],
) -> Result<DecodedFrame, Error> {
  fh.validate(seq)?;
  if !fh.frame_type.is_intra() {
    return Err(Error::Unsupported(Feature::InterFrame));
  }
  if fh.restoration.iter().any(|&t| t != RestorationType::None) {
    return Err(Error::Unsupported(Feature::LoopRestoration));
  }
  let grid = fh.tile_grid(seq)?;
  if tiles.len() != grid.count() {
    return Err(Error::TileCount {
      expected: grid.count(),
      actual: tiles.len(),
    });
  }

  debug!(
    "decoding {}x{} {:?} frame in {}x{} tiles",
    fh.width,
    fh.height,
    fh.frame_type,
    grid.cols(),
    grid.rows()
  );

  let mut storage = FrameStorage::new(seq, fh);
  let mut next_cdfs = None;
  for (index, &data) in tiles.iter().enumerate() {
    let tile = TileInfo::new(
      &grid,
      index,
      storage.sb_size,
      storage.mi_cols,
      storage.mi_rows,
    );
    let fc = TileReader::new(seq, fh, &mut storage, tile, data).decode()?;
    if index == fh.context_update_tile_id {
      next_cdfs = Some(fc);
    }
  }

  // validate() guarantees the update tile exists
  let mut next_cdfs = Box::new(
    next_cdfs.unwrap_or_else(|| CDFContext::new(fh.base_q_idx)),
  );
  next_cdfs.reset_counts();

  Ok(DecodedFrame { storage, next_cdfs })
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::header::TileLayout;
  use pretty_assertions::assert_eq;

  #[test]
  fn tiles_are_clipped_to_the_frame() {
    let seq = SequenceHeader::default();
    let fh = FrameHeader {
      width: 200,
      height: 70,
      tiles: TileLayout::Uniform { cols_log2: 1, rows_log2: 1 },
      ..Default::default()
    };
    let grid = fh.tile_grid(&seq).unwrap();
    assert_eq!(grid.count(), 4);

    let last =
      TileInfo::new(&grid, 3, seq.sb_size(), fh.mi_cols(), fh.mi_rows());
    assert_eq!((last.sb_col_start, last.sb_col_end), (2, 4));
    assert_eq!((last.sb_row_start, last.sb_row_end), (1, 2));
    assert_eq!((last.mi_col_start, last.mi_col_end), (32, 50));
    assert_eq!((last.mi_row_start, last.mi_row_end), (16, 18));
    assert_eq!((last.mi_cols(), last.mi_rows()), (18, 2));
    assert_eq!(
      last.superblocks().collect::<Vec<_>>(),
      vec![SuperBlockOffset { x: 2, y: 1 }, SuperBlockOffset { x: 3, y: 1 }]
    );
  }

  #[test]
  fn frame_level_rejections() {
    let seq = SequenceHeader::default();
    let fh = FrameHeader::default();
    let data: &[u8] = &[0; 8];

    let inter =
      FrameHeader { frame_type: crate::header::FrameType::INTER, ..fh.clone() };
    assert_eq!(
      decode_frame_tiles(&seq, &inter, &[data]).err(),
      Some(Error::Unsupported(Feature::InterFrame))
    );

    let mut lr = fh.clone();
    lr.restoration[1] = RestorationType::Wiener;
    assert_eq!(
      decode_frame_tiles(&seq, &lr, &[data]).err(),
      Some(Error::Unsupported(Feature::LoopRestoration))
    );

    assert_eq!(
      decode_frame_tiles(&seq, &fh, &[data, data]).err(),
      Some(Error::TileCount { expected: 1, actual: 2 })
    );

    let narrow = FrameHeader { width: 0, ..fh };
    assert!(matches!(
      decode_frame_tiles(&seq, &narrow, &[data]),
      Err(Error::InvalidHeader(_))
    ));
  }
}
