// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use super::TileInfo;
use crate::context::*;
use crate::ec::Reader;
use crate::error::{DecodeError, Feature, TileError};
use crate::frame::{FrameStorage, TransformInfo};
use crate::header::{
  clip_delta_lf, clip_delta_q, FrameHeader, SegLvl, SequenceHeader, TxMode,
};
use crate::partition::BlockSize::*;
use crate::partition::PartitionType::*;
use crate::partition::{BlockSize, PartitionType};
use crate::predict::PredictionMode::*;
use crate::predict::FilterIntraMode;
use crate::transform::TxSize::*;
use crate::transform::{
  get_tx_set, max_txsize_rect_lookup, uv_intra_tx_type, TxSet, TxSize,
  TxType,
};

use log::{debug, trace};

/// Parses the symbols of one tile into a [`FrameStorage`].
pub struct TileReader<'a> {
  seq: &'a SequenceHeader,
  fh: &'a FrameHeader,
  fs: &'a mut FrameStorage,
  tile: TileInfo,
  r: Reader<'a>,
  bytes: usize,
  cr: ContextReader,
  tx_mode: TxMode,
  coded_lossless: bool,
  current_qindex: u8,
  delta_lf: [i8; FRAME_LF_COUNT],
  /// Block level deltas are only coded in the first block of a
  /// superblock that has them.
  read_deltas: bool,
  /// Mode-info (row, column) of the block being parsed.
  position: Option<(usize, usize)>,
}

impl<'a> TileReader<'a> {
  pub fn new(
    seq: &'a SequenceHeader, fh: &'a FrameHeader, fs: &'a mut FrameStorage,
    tile: TileInfo, data: &'a [u8],
  ) -> Self {
    let mut r = Reader::new(data);
    r.set_cdf_update(!fh.disable_cdf_update);
    let bc = BlockContext::new(
      tile.mi_col_start,
      tile.mi_cols(),
      seq.sb_size(),
      seq.chroma_sampling,
    );

    TileReader {
      seq,
      fh,
      fs,
      tile,
      r,
      bytes: data.len(),
      cr: ContextReader::new(CDFContext::new(fh.base_q_idx), bc),
      tx_mode: fh.tx_mode(),
      coded_lossless: fh.coded_lossless(),
      current_qindex: fh.base_q_idx,
      delta_lf: [0; FRAME_LF_COUNT],
      read_deltas: false,
      position: None,
    }
  }

  /// Decodes every superblock of the tile and returns the adapted CDFs.
  ///
  /// # Errors
  ///
  /// - Returns `TileError` if the tile data is malformed, ends early or
  ///   uses an unsupported tool. Whatever was stored for the tile so far
  ///   is left in place.
  #[profiling::function]
  pub fn decode(mut self) -> Result<CDFContext, TileError> {
    debug!(
      "tile {}: mi cols {}..{}, rows {}..{}, {} bytes",
      self.tile.index,
      self.tile.mi_col_start,
      self.tile.mi_col_end,
      self.tile.mi_row_start,
      self.tile.mi_row_end,
      self.bytes
    );

    match self.decode_superblocks() {
      Ok(()) => {
        debug!("tile {}: {} bits read", self.tile.index, self.r.tell());
        Ok(self.cr.fc)
      }
      Err(source) => Err(TileError {
        tile: self.tile.index,
        position: self.position,
        source,
      }),
    }
  }

  fn decode_superblocks(&mut self) -> Result<(), DecodeError> {
    let sb_size = self.seq.sb_size();
    let mut row = None;
    for sbo in self.tile.superblocks() {
      if row != Some(sbo.y) {
        self.cr.bc.reset_left_contexts();
        row = Some(sbo.y);
      }
      self.fs.begin_superblock(sbo, self.current_qindex);
      self.read_deltas = self.fh.delta_q_present;

      let bo = sbo.block_offset(sb_size, 0, 0);
      self.decode_partition(bo, sb_size.block_size())?;

      let sb = self.fs.superblock_mut(sbo);
      sb.qindex = self.current_qindex;
      sb.delta_lf = self.delta_lf;
    }
    Ok(())
  }

  fn decode_partition(
    &mut self, bo: BlockOffset, bsize: BlockSize,
  ) -> Result<(), DecodeError> {
    let (mi_cols, mi_rows) = (self.fs.mi_cols, self.fs.mi_rows);
    if bo.x >= mi_cols || bo.y >= mi_rows {
      return Ok(());
    }
    self.position = Some((bo.y, bo.x));

    let hbs = bsize.width_mi() >> 1;
    let quarter = hbs >> 1;
    let has_rows = bo.y + hbs < mi_rows;
    let has_cols = bo.x + hbs < mi_cols;

    let partition = if bsize >= BLOCK_8X8 {
      self.cr.read_partition(&mut self.r, bo, bsize, has_rows, has_cols)?
    } else {
      PARTITION_NONE
    };
    let subsize = bsize.subsize(partition)?;
    let right = bo.with_offset(hbs as isize, 0);
    let below = bo.with_offset(0, hbs as isize);
    let below_right = bo.with_offset(hbs as isize, hbs as isize);

    match partition {
      PARTITION_NONE => self.decode_block(bo, subsize, partition)?,
      PARTITION_HORZ => {
        self.decode_block(bo, subsize, partition)?;
        if has_rows {
          self.decode_block(below, subsize, partition)?;
        }
      }
      PARTITION_VERT => {
        self.decode_block(bo, subsize, partition)?;
        if has_cols {
          self.decode_block(right, subsize, partition)?;
        }
      }
      PARTITION_SPLIT => {
        for child in [bo, right, below, below_right] {
          self.decode_partition(child, subsize)?;
        }
      }
      PARTITION_HORZ_A | PARTITION_VERT_A => {
        let split = bsize.subsize(PARTITION_SPLIT)?;
        let second = if partition == PARTITION_HORZ_A { right } else { below };
        let third = if partition == PARTITION_HORZ_A { below } else { right };
        self.decode_block(bo, split, partition)?;
        self.decode_block(second, split, partition)?;
        self.decode_block(third, subsize, partition)?;
      }
      PARTITION_HORZ_B | PARTITION_VERT_B => {
        let split = bsize.subsize(PARTITION_SPLIT)?;
        let second = if partition == PARTITION_HORZ_B { below } else { right };
        self.decode_block(bo, subsize, partition)?;
        self.decode_block(second, split, partition)?;
        self.decode_block(below_right, split, partition)?;
      }
      PARTITION_HORZ_4 => {
        for i in 0..4 {
          let child = bo.with_offset(0, (i * quarter) as isize);
          if i > 0 && child.y >= mi_rows {
            break;
          }
          self.decode_block(child, subsize, partition)?;
        }
      }
      PARTITION_VERT_4 => {
        for i in 0..4 {
          let child = bo.with_offset((i * quarter) as isize, 0);
          if i > 0 && child.x >= mi_cols {
            break;
          }
          self.decode_block(child, subsize, partition)?;
        }
      }
    }

    self.cr.bc.update_ext_partition_context(bo, partition, bsize)?;
    Ok(())
  }

  fn decode_block(
    &mut self, bo: BlockOffset, bsize: BlockSize, partition: PartitionType,
  ) -> Result<(), DecodeError> {
    self.position = Some((bo.y, bo.x));
    let pi = self.partition_info(bo, bsize, partition);

    let mut block = self.read_mode_info(&pi)?;
    block.tx_size =
      self.cr.read_tx_size(&mut self.r, &pi, self.tx_mode, block.lossless)?;
    if block.skip {
      self.cr.bc.reset_skip_context(bo, bsize, pi.has_chroma);
    }
    self.read_residual(&pi, &mut block)?;

    trace!(
      "{} block at mi ({}, {}): {:?} {:?} skip {} seg {} tx {:?}",
      bsize,
      bo.y,
      bo.x,
      block.mode,
      block.uv_mode,
      block.skip,
      block.segment_id,
      block.tx_size
    );
    self.fs.update_mode_info(block);
    Ok(())
  }

  fn partition_info(
    &self, bo: BlockOffset, bsize: BlockSize, partition: PartitionType,
  ) -> PartitionInfo {
    let cs = self.seq.chroma_sampling;
    let (ssx, ssy) = cs.get_decimation().unwrap_or((0, 0));
    let avail_u = bo.y > self.tile.mi_row_start;
    let avail_l = bo.x > self.tile.mi_col_start;
    let neighbour = |avail: bool, x: isize, y: isize| {
      if avail {
        self.fs.block_at(bo.with_offset(x, y)).copied()
      } else {
        None
      }
    };

    PartitionInfo {
      bo,
      bsize,
      sbo: bo.sb_offset(self.fs.sb_size),
      partition,
      has_chroma: has_chroma(bo, bsize, ssx, ssy, cs),
      avail_u,
      avail_l,
      above: neighbour(avail_u, 0, -1),
      left: neighbour(avail_l, -1, 0),
    }
  }

  fn read_mode_info(
    &mut self, pi: &PartitionInfo,
  ) -> Result<Block, DecodeError> {
    let fh = self.fh;
    let seg = &fh.segmentation;
    let mut block = Block {
      bsize: pi.bsize,
      bo: pi.bo,
      partition: pi.partition,
      has_chroma: pi.has_chroma,
      ..Default::default()
    };

    if seg.enabled && seg.preskip {
      block.segment_id = self.read_segment_id(pi, false)?;
    }
    block.skip = if seg.preskip
      && seg.feature_active(block.segment_id, SegLvl::SEG_LVL_SKIP)
    {
      true
    } else {
      self.cr.read_skip(&mut self.r, pi)?
    };
    if seg.enabled && !seg.preskip {
      block.segment_id = self.read_segment_id(pi, block.skip)?;
    }
    block.lossless = fh.lossless(block.segment_id);

    self.read_cdef(pi, block.skip)?;
    self.read_block_deltas(pi, block.skip)?;
    self.read_deltas = false;

    if fh.allow_intrabc && self.cr.read_use_intrabc(&mut self.r)? {
      return Err(DecodeError::Unsupported(Feature::IntraBlockCopy));
    }

    block.mode = self.cr.read_intra_mode_kf(&mut self.r, pi)?;
    if pi.bsize >= BLOCK_8X8 && block.mode.is_directional() {
      block.angle_delta.y = self.cr.read_angle_delta(&mut self.r, block.mode)?;
    }

    if pi.has_chroma {
      let cfl_allowed = if block.lossless {
        let (xdec, ydec) = self.cr.bc.plane_dec(1);
        pi.bsize.subsampled_size(xdec, ydec)? == BLOCK_4X4
      } else {
        pi.bsize.cfl_allowed()
      };
      block.uv_mode =
        self.cr.read_intra_uv_mode(&mut self.r, block.mode, cfl_allowed)?;
      if block.uv_mode.is_cfl() {
        block.cfl = self.cr.read_cfl_alphas(&mut self.r)?;
      }
      if pi.bsize >= BLOCK_8X8 && block.uv_mode.is_directional() {
        block.angle_delta.uv =
          self.cr.read_angle_delta(&mut self.r, block.uv_mode)?;
      }
    }

    if fh.allow_screen_content_tools
      && pi.bsize >= BLOCK_8X8
      && pi.bsize.width() <= 64
      && pi.bsize.height() <= 64
    {
      if block.mode == DC_PRED && self.cr.read_has_palette_y(&mut self.r, pi)?
      {
        return Err(DecodeError::Unsupported(Feature::Palette));
      }
      if pi.has_chroma
        && block.uv_mode == DC_PRED
        && self.cr.read_has_palette_uv(&mut self.r, false)?
      {
        return Err(DecodeError::Unsupported(Feature::Palette));
      }
    }

    if self.seq.enable_filter_intra
      && block.mode == DC_PRED
      && pi.bsize.width().max(pi.bsize.height()) <= 32
    {
      block.filter_intra =
        self.cr.read_filter_intra(&mut self.r, pi.bsize)?;
    }

    Ok(block)
  }

  fn read_segment_id(
    &mut self, pi: &PartitionInfo, skip: bool,
  ) -> Result<u8, DecodeError> {
    let fs = &*self.fs;
    let segment_at = |avail: bool, x: isize, y: isize| {
      avail.then(|| fs.segment_id(pi.bo.with_offset(x, y)))
    };
    let pred = SegmentIdPrediction::new(
      segment_at(pi.avail_u && pi.avail_l, -1, -1),
      segment_at(pi.avail_u, 0, -1),
      segment_at(pi.avail_l, -1, 0),
    );
    if skip {
      return Ok(pred.pred);
    }
    let last_active = self.fh.segmentation.last_active_segid;
    self.cr.read_segment_id(&mut self.r, pred, last_active)
  }

  /// Reads the CDEF strength of the 64x64 area the block starts in, the
  /// first time a block there has residual.
  fn read_cdef(
    &mut self, pi: &PartitionInfo, skip: bool,
  ) -> Result<(), DecodeError> {
    if skip
      || self.coded_lossless
      || !self.seq.enable_cdef
      || self.fh.allow_intrabc
    {
      return Ok(());
    }
    let mask = self.fs.sb_size.mib_mask();
    let x0 = pi.bo.x & mask & !15;
    let y0 = pi.bo.y & mask & !15;
    let slot = |x: usize, y: usize| ((y >> 4) << 1) + (x >> 4);
    if self.fs.superblock(pi.sbo).cdef_index[slot(x0, y0)] != -1 {
      return Ok(());
    }

    let strength = self.r.literal(self.fh.cdef_bits)? as i8;
    let sb = self.fs.superblock_mut(pi.sbo);
    for y in (y0..y0 + pi.bsize.height_mi()).step_by(16) {
      for x in (x0..x0 + pi.bsize.width_mi()).step_by(16) {
        sb.cdef_index[slot(x, y)] = strength;
      }
    }
    Ok(())
  }

  fn read_block_deltas(
    &mut self, pi: &PartitionInfo, skip: bool,
  ) -> Result<(), DecodeError> {
    if !self.read_deltas
      || (skip && pi.bsize == self.fs.sb_size.block_size())
    {
      return Ok(());
    }

    let delta = self.cr.read_delta_qindex(&mut self.r)?;
    if delta != 0 {
      self.current_qindex =
        clip_delta_q(self.current_qindex, delta, self.fh.delta_q_res);
    }

    let deblock = self.fh.deblock;
    if !deblock.block_deltas_enabled {
      return Ok(());
    }
    let count = match (deblock.block_delta_multi, self.seq.planes()) {
      (false, _) => 1,
      (true, 1) => FRAME_LF_COUNT - 2,
      (true, _) => FRAME_LF_COUNT,
    };
    for i in 0..count {
      let multi = deblock.block_delta_multi.then_some(i);
      let delta = self.cr.read_delta_lf(&mut self.r, multi)?;
      if delta != 0 {
        self.delta_lf[i] =
          clip_delta_lf(self.delta_lf[i], delta, deblock.block_delta_shift);
      }
    }
    Ok(())
  }

  /// How the luma transform type of `block` is found.
  fn luma_tx_type_source(
    &self, block: &Block, tx_size: TxSize,
  ) -> TxTypeSource {
    let reduced_tx_set = self.fh.reduced_tx_set;
    if get_tx_set(tx_size, reduced_tx_set) == TxSet::TX_SET_DCTONLY
      || self.fh.segment_qindex(block.segment_id) == 0
    {
      return TxTypeSource::Implied(TxType::DCT_DCT);
    }
    let intra_dir =
      block.filter_intra.map_or(block.mode, FilterIntraMode::intra_dir);
    TxTypeSource::Coded { intra_dir, reduced_tx_set }
  }

  /// Walks the transform blocks of every plane in 64x64 chunks, reading
  /// coefficients unless the block is skipped. Transform blocks starting
  /// outside the frame are dropped.
  fn read_residual(
    &mut self, pi: &PartitionInfo, block: &mut Block,
  ) -> Result<(), DecodeError> {
    let sbo = pi.sbo;
    let planes = if pi.has_chroma { self.fs.planes } else { 1 };
    for plane in 0..MAX_PLANES {
      block.first_tx_unit[plane] =
        self.fs.transform_units(sbo, plane).len() as u32;
    }

    let bw4 = pi.bsize.width_mi();
    let bh4 = pi.bsize.height_mi();
    let mut coeffs = [0i32; MAX_CODED_TX_SQUARE];

    for chunk_y in 0..(bh4 >> 4).max(1) {
      for chunk_x in 0..(bw4 >> 4).max(1) {
        let chunk = pi.bo.with_offset(
          (chunk_x << 4) as isize,
          (chunk_y << 4) as isize,
        );
        for plane in 0..planes {
          let (xdec, ydec) = self.cr.bc.plane_dec(plane);
          let plane_bsize = pi.bsize.subsampled_size(xdec, ydec)?;
          let tx_size = if block.lossless {
            TX_4X4
          } else if plane == 0 {
            block.tx_size
          } else {
            max_txsize_rect_lookup[plane_bsize as usize].coded_size()
          };
          let source = if plane == 0 {
            self.luma_tx_type_source(block, tx_size)
          } else {
            TxTypeSource::Implied(uv_intra_tx_type(
              block.uv_mode,
              tx_size,
              block.lossless,
              self.fh.reduced_tx_set,
            ))
          };

          let (block_x4, block_y4) = (pi.bo.x >> xdec, pi.bo.y >> ydec);
          let (chunk_x4, chunk_y4) = (chunk.x >> xdec, chunk.y >> ydec);
          let max_x4 = self.fs.mi_cols >> xdec;
          let max_y4 = self.fs.mi_rows >> ydec;
          let w4 = plane_bsize.width_mi().min(16 >> xdec);
          let h4 = plane_bsize.height_mi().min(16 >> ydec);

          for y in (0..h4).step_by(tx_size.height_mi()) {
            for x in (0..w4).step_by(tx_size.width_mi()) {
              let (x4, y4) = (chunk_x4 + x, chunk_y4 + y);
              if x4 >= max_x4 || y4 >= max_y4 {
                continue;
              }
              let mut tu = TransformInfo {
                tx_size,
                x: ((x4 - block_x4) << 2) as u16,
                y: ((y4 - block_y4) << 2) as u16,
                tx_type: TxType::DCT_DCT,
                eob: 0,
                coeff_offset: 0,
              };
              if !block.skip {
                let txb = TxbPosition {
                  plane,
                  x4,
                  y4,
                  w4: tx_size.width_mi().min(max_x4 - x4),
                  h4: tx_size.height_mi().min(max_y4 - y4),
                  plane_bsize,
                };
                let read = self.cr.read_coeffs(
                  &mut self.r,
                  txb,
                  tx_size,
                  source,
                  &mut coeffs,
                )?;
                tu.eob = read.eob;
                tu.tx_type = read.tx_type;
                if read.eob > 0 {
                  let area = tx_size.coded_size().area();
                  tu.coeff_offset =
                    self.fs.alloc_coefficients(sbo, plane, &coeffs[..area]);
                }
              }
              self.fs.push_transform_unit(sbo, plane, tu);
              block.tx_unit_count[plane] += 1;
            }
          }
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::ec::WriterEncoder;
  use crate::header::TileLayout;
  use crate::tiling::decode_frame_tiles;
  use pretty_assertions::assert_eq;

  /// Mirrors the decoder's contexts while coding a synthetic tile.
  struct TileWriter {
    w: WriterEncoder,
    fc: CDFContext,
    bc: BlockContext,
  }

  impl TileWriter {
    fn new(seq: &SequenceHeader, fh: &FrameHeader) -> Self {
      TileWriter {
        w: WriterEncoder::new(),
        fc: CDFContext::new(fh.base_q_idx),
        bc: BlockContext::new(
          0,
          fh.mi_cols(),
          seq.sb_size(),
          seq.chroma_sampling,
        ),
      }
    }

    fn partition(&mut self, bo: BlockOffset, bsize: BlockSize, p: u32) {
      let ctx = self.bc.partition_plane_context(bo, bsize);
      let fc = &mut self.fc;
      if ctx < PARTITION_TYPES {
        self.w.symbol_with_update(p, &mut fc.partition_w8_cdf[ctx]);
      } else if ctx < 4 * PARTITION_TYPES {
        let cdf = &mut fc.partition_cdf[ctx - PARTITION_TYPES];
        self.w.symbol_with_update(p, cdf);
      } else {
        let cdf = &mut fc.partition_w128_cdf[ctx - 4 * PARTITION_TYPES];
        self.w.symbol_with_update(p, cdf);
      }
    }

    /// Codes partition `p` of the square block at `bo` followed by its
    /// skipped children, then updates the partition context.
    fn cut(
      &mut self, bo: BlockOffset, bsize: BlockSize, p: PartitionType,
      children: &[(BlockOffset, BlockSize)],
    ) {
      self.partition(bo, bsize, p as u32);
      for &(child, child_size) in children {
        self.skipped_block(child, child_size);
      }
      self.bc.update_ext_partition_context(bo, p, bsize).unwrap();
    }

    /// A skipped DC block with skipped neighbours wherever they exist.
    fn skipped_block(&mut self, bo: BlockOffset, bsize: BlockSize) {
      let avail = (bo.y > 0, bo.x > 0);
      let skip_ctx = avail.0 as usize + avail.1 as usize;
      self.dc_block(bo, bsize, avail, true, skip_ctx, None);
    }

    /// A DC predicted block whose transform is as large as the block.
    /// Non-skipped blocks code every transform block as all zero.
    fn dc_block(
      &mut self, bo: BlockOffset, bsize: BlockSize, avail: (bool, bool),
      skip: bool, skip_ctx: usize, segment: Option<(u32, usize)>,
    ) {
      self.w.symbol_with_update(skip as u32, &mut self.fc.skip_cdfs[skip_ctx]);
      if let Some((coded, ctx)) = segment {
        let cdf = &mut self.fc.spatial_segmentation_cdfs[ctx];
        self.w.symbol_with_update(coded, cdf);
      }
      self.w.symbol_with_update(DC_PRED as u32, &mut self.fc.kf_y_cdf[0][0]);
      if bsize.cfl_allowed() {
        let cdf = &mut self.fc.uv_mode_cfl_cdf[DC_PRED as usize];
        self.w.symbol_with_update(DC_PRED as u32, cdf);
      } else {
        let cdf = &mut self.fc.uv_mode_cdf[DC_PRED as usize];
        self.w.symbol_with_update(DC_PRED as u32, cdf);
      }
      if bsize.width().max(bsize.height()) <= 32 {
        let cdf = &mut self.fc.filter_intra_cdfs[bsize as usize];
        self.w.symbol_with_update(0, cdf);
      }

      let max_tx = max_txsize_rect_lookup[bsize as usize];
      let ctx = self.bc.tx_size_context(bo, bsize, avail.0, avail.1);
      match max_tx.depth() {
        1 => self.w.symbol_with_update(0, &mut self.fc.tx_size_8x8_cdf[ctx]),
        d => {
          self.w.symbol_with_update(0, &mut self.fc.tx_size_cdf[d - 2][ctx])
        }
      }
      self.bc.update_tx_size_context(bo, bsize, max_tx);

      if !skip {
        self.zero_residual(bo, bsize, max_tx);
      }
    }

    /// Walks the block in 64x64 chunks the way the reader does, coding
    /// each 4:2:0 transform block inside the frame as all zero.
    fn zero_residual(
      &mut self, bo: BlockOffset, bsize: BlockSize, tx_size: TxSize,
    ) {
      let (bw4, bh4) = (bsize.width_mi(), bsize.height_mi());
      for chunk_y in 0..(bh4 >> 4).max(1) {
        for chunk_x in 0..(bw4 >> 4).max(1) {
          for plane in 0..3 {
            let dec = (plane > 0) as usize;
            let plane_bsize = bsize.subsampled_size(dec, dec).unwrap();
            let tx = if plane == 0 {
              tx_size
            } else {
              max_txsize_rect_lookup[plane_bsize as usize].coded_size()
            };
            let txs_ctx = ContextReader::get_txsize_entropy_ctx(tx);
            let x0 = (bo.x + (chunk_x << 4)) >> dec;
            let y0 = (bo.y + (chunk_y << 4)) >> dec;
            let w4 = plane_bsize.width_mi().min(16 >> dec);
            let h4 = plane_bsize.height_mi().min(16 >> dec);
            for y in (0..h4).step_by(tx.height_mi()) {
              for x in (0..w4).step_by(tx.width_mi()) {
                let (x4, y4) = (x0 + x, y0 + y);
                let (tw4, th4) = (tx.width_mi(), tx.height_mi());
                let ctx = self
                  .bc
                  .get_txb_ctx(plane, x4, y4, tw4, th4, plane_bsize, tx)
                  .txb_skip_ctx;
                let cdf = &mut self.fc.txb_skip_cdf[txs_ctx][ctx];
                self.w.symbol_with_update(1, cdf);
                self.bc.set_coeff_context(plane, x4, y4, tw4, th4, 0);
              }
            }
          }
        }
      }
    }

    fn done(mut self) -> (Vec<u8>, CDFContext) {
      (self.w.done(), self.fc)
    }
  }

  /// Every block's transform units are its own contiguous run of the
  /// superblock's list and start inside the block.
  fn check_transform_units(fs: &FrameStorage) {
    for sb in fs.superblocks() {
      for plane in 0..fs.planes {
        let total: usize =
          sb.blocks.iter().map(|b| b.tx_unit_count[plane] as usize).sum();
        assert_eq!(total, sb.tx_units[plane].len());
        for block in &sb.blocks {
          let (xdec, ydec) = if plane == 0 { (0, 0) } else { (1, 1) };
          let Ok(plane_bsize) = block.bsize.subsampled_size(xdec, ydec) else {
            continue;
          };
          for tu in fs.block_transform_units(block, plane) {
            assert!((tu.x as usize) < plane_bsize.width().max(4));
            assert!((tu.y as usize) < plane_bsize.height().max(4));
          }
        }
      }
    }
  }

  #[test]
  fn single_skipped_superblock() {
    let seq = SequenceHeader::default();
    let fh = FrameHeader::default();
    let mut tw = TileWriter::new(&seq, &fh);
    let origin = BlockOffset { x: 0, y: 0 };
    tw.partition(origin, BLOCK_64X64, PARTITION_NONE as u32);
    tw.dc_block(origin, BLOCK_64X64, (false, false), true, 0, None);
    let (data, fc) = tw.done();

    let frame = decode_frame_tiles(&seq, &fh, &[&data]).unwrap();
    let fs = &frame.storage;
    let sbo = SuperBlockOffset { x: 0, y: 0 };
    let blocks = fs.blocks(sbo);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].bsize, BLOCK_64X64);
    assert!(blocks[0].skip);
    assert_eq!(blocks[0].tx_size, TX_64X64);
    assert_eq!(fs.superblock(sbo).cdef_index, [-1; 4]);

    let sizes: Vec<Vec<_>> = (0..3)
      .map(|p| fs.transform_units(sbo, p).iter().map(|t| t.tx_size).collect())
      .collect();
    assert_eq!(sizes, vec![vec![TX_64X64], vec![TX_32X32], vec![TX_32X32]]);
    for plane in 0..3 {
      assert!(fs.transform_units(sbo, plane).iter().all(|t| t.eob == 0));
      assert!(fs.coefficients(sbo, plane).is_empty());
    }
    check_transform_units(fs);

    let mut expected = fc;
    expected.reset_counts();
    assert_eq!(frame.next_cdfs.skip_cdfs, expected.skip_cdfs);
    assert_eq!(frame.next_cdfs.kf_y_cdf, expected.kf_y_cdf);
  }

  #[test]
  fn right_edge_superblock_splits_or_cuts_vertically() {
    let seq = SequenceHeader::default();
    let fh = FrameHeader { width: 32, ..Default::default() };
    let mut tw = TileWriter::new(&seq, &fh);
    let origin = BlockOffset { x: 0, y: 0 };
    let ctx = tw.bc.partition_plane_context(origin, BLOCK_64X64);
    let cdf = ContextReader::partition_gather(
      &tw.fc.partition_cdf[ctx - PARTITION_TYPES],
      &HORZ_ALIKE,
    );
    tw.w.symbol(0, &cdf);
    tw.dc_block(origin, BLOCK_32X64, (false, false), true, 0, None);
    let (data, _) = tw.done();

    let frame = decode_frame_tiles(&seq, &fh, &[&data]).unwrap();
    let fs = &frame.storage;
    let sbo = SuperBlockOffset { x: 0, y: 0 };
    let blocks = fs.blocks(sbo);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].partition, PARTITION_VERT);
    assert_eq!(blocks[0].bsize, BLOCK_32X64);
    assert_eq!(blocks[0].tx_size, TX_32X64);
    let corner = fs.block_at(BlockOffset { x: 7, y: 15 });
    assert_eq!(corner.map(|b| b.bo), Some(origin));
    assert_eq!(fs.transform_units(sbo, 1)[0].tx_size, TX_16X32);
    check_transform_units(fs);
  }

  #[test]
  fn bottom_edge_superblock_splits_or_cuts_horizontally() {
    let seq = SequenceHeader::default();
    let fh = FrameHeader { width: 64, height: 32, ..Default::default() };
    let origin = BlockOffset { x: 0, y: 0 };
    let sbo = SuperBlockOffset { x: 0, y: 0 };
    let edge_partition = |tw: &mut TileWriter, split: bool| {
      let ctx = tw.bc.partition_plane_context(origin, BLOCK_64X64);
      let cdf = ContextReader::partition_gather(
        &tw.fc.partition_cdf[ctx - PARTITION_TYPES],
        &VERT_ALIKE,
      );
      tw.w.symbol(split as u32, &cdf);
    };

    let mut tw = TileWriter::new(&seq, &fh);
    edge_partition(&mut tw, false);
    tw.skipped_block(origin, BLOCK_64X32);
    let (data, fc) = tw.done();

    let frame = decode_frame_tiles(&seq, &fh, &[&data]).unwrap();
    let fs = &frame.storage;
    let blocks = fs.blocks(sbo);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].partition, PARTITION_HORZ);
    assert_eq!(blocks[0].bsize, BLOCK_64X32);
    assert_eq!(blocks[0].tx_size, TX_64X32);
    let corner = fs.block_at(BlockOffset { x: 15, y: 7 });
    assert_eq!(corner.map(|b| b.bo), Some(origin));
    assert_eq!(fs.transform_units(sbo, 2)[0].tx_size, TX_32X16);
    check_transform_units(fs);
    let mut expected = fc;
    expected.reset_counts();
    assert_eq!(frame.next_cdfs.partition_cdf, expected.partition_cdf);

    // the split keeps the two top quarters and drops the bottom ones
    let mut tw = TileWriter::new(&seq, &fh);
    edge_partition(&mut tw, true);
    let right = BlockOffset { x: 8, y: 0 };
    for bo in [origin, right] {
      tw.cut(bo, BLOCK_32X32, PARTITION_NONE, &[(bo, BLOCK_32X32)]);
    }
    let (data, _) = tw.done();

    let frame = decode_frame_tiles(&seq, &fh, &[&data]).unwrap();
    let blocks = frame.storage.blocks(sbo);
    assert_eq!(
      blocks.iter().map(|b| (b.bo, b.bsize)).collect::<Vec<_>>(),
      vec![(origin, BLOCK_32X32), (right, BLOCK_32X32)]
    );
    check_transform_units(&frame.storage);
  }

  #[test]
  fn extended_partitions_place_their_blocks() {
    let seq = SequenceHeader::default();
    let fh = FrameHeader { width: 128, height: 64, ..Default::default() };
    let at = |x: usize, y: usize| BlockOffset { x, y };
    let quarters = [
      (at(0, 0), PARTITION_HORZ_A, vec![
        (at(0, 0), BLOCK_16X16),
        (at(4, 0), BLOCK_16X16),
        (at(0, 4), BLOCK_32X16),
      ]),
      (at(8, 0), PARTITION_HORZ_B, vec![
        (at(8, 0), BLOCK_32X16),
        (at(8, 4), BLOCK_16X16),
        (at(12, 4), BLOCK_16X16),
      ]),
      (
        at(0, 8),
        PARTITION_HORZ_4,
        (0..4).map(|i| (at(0, 8 + 2 * i), BLOCK_32X8)).collect(),
      ),
      (
        at(8, 8),
        PARTITION_VERT_4,
        (0..4).map(|i| (at(8 + 2 * i, 8), BLOCK_8X32)).collect(),
      ),
      (at(16, 0), PARTITION_VERT_A, vec![
        (at(16, 0), BLOCK_16X16),
        (at(16, 4), BLOCK_16X16),
        (at(20, 0), BLOCK_16X32),
      ]),
      (at(24, 0), PARTITION_VERT_B, vec![
        (at(24, 0), BLOCK_16X32),
        (at(28, 0), BLOCK_16X16),
        (at(28, 4), BLOCK_16X16),
      ]),
      (at(16, 8), PARTITION_NONE, vec![(at(16, 8), BLOCK_32X32)]),
      (at(24, 8), PARTITION_NONE, vec![(at(24, 8), BLOCK_32X32)]),
    ];

    let mut tw = TileWriter::new(&seq, &fh);
    for (sb, cuts) in quarters.chunks(4).enumerate() {
      tw.partition(at(sb << 4, 0), BLOCK_64X64, PARTITION_SPLIT as u32);
      for (bo, p, children) in cuts {
        tw.cut(*bo, BLOCK_32X32, *p, children);
      }
    }
    let (data, fc) = tw.done();

    let frame = decode_frame_tiles(&seq, &fh, &[&data]).unwrap();
    let fs = &frame.storage;
    for (sb, cuts) in quarters.chunks(4).enumerate() {
      let expected: Vec<_> = cuts
        .iter()
        .flat_map(|(_, p, children)| {
          children.iter().map(move |&(bo, bsize)| (bo, bsize, *p))
        })
        .collect();
      let sbo = SuperBlockOffset { x: sb, y: 0 };
      let blocks: Vec<_> =
        fs.blocks(sbo).iter().map(|b| (b.bo, b.bsize, b.partition)).collect();
      assert_eq!(blocks, expected);
    }
    assert_eq!(fs.block_at(at(15, 15)).map(|b| b.bo), Some(at(14, 8)));
    assert_eq!(fs.block_at(at(23, 7)).map(|b| b.tx_size), Some(TX_16X32));
    check_transform_units(fs);

    let mut expected = fc;
    expected.reset_counts();
    assert_eq!(frame.next_cdfs.partition_cdf, expected.partition_cdf);
    assert_eq!(frame.next_cdfs.skip_cdfs, expected.skip_cdfs);
    assert_eq!(frame.next_cdfs.tx_size_cdf, expected.tx_size_cdf);
  }

  #[test]
  fn wide_block_residual_walks_64x64_chunks() {
    let seq =
      SequenceHeader { use_128x128_superblock: true, ..Default::default() };
    let fh = FrameHeader { width: 128, height: 128, ..Default::default() };
    let mut tw = TileWriter::new(&seq, &fh);
    let origin = BlockOffset { x: 0, y: 0 };
    tw.partition(origin, BLOCK_128X128, PARTITION_NONE as u32);
    tw.dc_block(origin, BLOCK_128X128, (false, false), false, 0, None);
    let (data, fc) = tw.done();

    let frame = decode_frame_tiles(&seq, &fh, &[&data]).unwrap();
    let fs = &frame.storage;
    let sbo = SuperBlockOffset { x: 0, y: 0 };
    let block = fs.blocks(sbo)[0];
    assert_eq!(block.bsize, BLOCK_128X128);
    assert_eq!(block.tx_size, TX_64X64);
    assert!(!block.skip);

    // chunks in raster order, every plane of a chunk before the next one
    let units = |plane| {
      fs.block_transform_units(&block, plane)
        .iter()
        .map(|t| (t.x, t.y, t.tx_size, t.eob))
        .collect::<Vec<_>>()
    };
    assert_eq!(
      units(0),
      vec![
        (0, 0, TX_64X64, 0),
        (64, 0, TX_64X64, 0),
        (0, 64, TX_64X64, 0),
        (64, 64, TX_64X64, 0),
      ]
    );
    for plane in 1..3 {
      assert_eq!(
        units(plane),
        vec![
          (0, 0, TX_32X32, 0),
          (32, 0, TX_32X32, 0),
          (0, 32, TX_32X32, 0),
          (32, 32, TX_32X32, 0),
        ]
      );
    }
    // one CDEF read covers all four 64x64 areas of the block
    assert_eq!(fs.superblock(sbo).cdef_index, [0; 4]);
    check_transform_units(fs);

    let mut expected = fc;
    expected.reset_counts();
    let next = &frame.next_cdfs;
    assert_eq!(next.partition_w128_cdf, expected.partition_w128_cdf);
    assert_eq!(next.txb_skip_cdf, expected.txb_skip_cdf);
  }

  #[test]
  fn skipped_block_takes_the_predicted_segment() {
    let seq = SequenceHeader::default();
    let mut fh = FrameHeader { width: 16, height: 16, ..Default::default() };
    fh.segmentation.enabled = true;
    fh.segmentation.features[3][SegLvl::SEG_LVL_ALT_Q as usize] = true;
    fh.segmentation.update();
    assert_eq!(fh.segmentation.last_active_segid, 3);
    assert!(!fh.segmentation.preskip);

    // 64x64 and 32x32 are split implicitly; the 16x16 is split into
    // four 8x8 blocks, three coding segment 2 and the last one skipped
    let mut tw = TileWriter::new(&seq, &fh);
    let origin = BlockOffset { x: 0, y: 0 };
    tw.partition(origin, BLOCK_16X16, PARTITION_SPLIT as u32);
    let children = [
      (BlockOffset { x: 0, y: 0 }, (false, false), false, Some((2, 0))),
      (BlockOffset { x: 2, y: 0 }, (false, true), false, Some((0, 0))),
      (BlockOffset { x: 0, y: 2 }, (true, false), false, Some((0, 0))),
      (BlockOffset { x: 2, y: 2 }, (true, true), true, None),
    ];
    for (bo, avail, skip, segment) in children {
      tw.partition(bo, BLOCK_8X8, PARTITION_NONE as u32);
      tw.dc_block(bo, BLOCK_8X8, avail, skip, 0, segment);
      tw.bc
        .update_ext_partition_context(bo, PARTITION_NONE, BLOCK_8X8)
        .unwrap();
    }
    let (data, _) = tw.done();

    let frame = decode_frame_tiles(&seq, &fh, &[&data]).unwrap();
    let fs = &frame.storage;
    let sbo = SuperBlockOffset { x: 0, y: 0 };
    let blocks = fs.blocks(sbo);
    assert_eq!(blocks.len(), 4);
    assert_eq!(
      blocks.iter().map(|b| (b.segment_id, b.skip)).collect::<Vec<_>>(),
      vec![(2, false), (2, false), (2, false), (2, true)]
    );
    assert!(fs.segment_map().iter().all(|&s| s == 2));
    // coded blocks read a zero-bit CDEF strength
    assert_eq!(fs.superblock(sbo).cdef_index[0], 0);
    assert_eq!(fs.transform_units(sbo, 0).len(), 4);
    assert!(fs.transform_units(sbo, 0).iter().all(|t| !t.has_coefficients()));
    check_transform_units(fs);
  }

  #[test]
  fn errors_carry_the_tile_and_position() {
    let seq = SequenceHeader::default();
    let fh = FrameHeader {
      tiles: TileLayout::Explicit {
        col_starts_sb: vec![0, 1],
        row_starts_sb: vec![0],
      },
      width: 128,
      ..Default::default()
    };
    let mut tw = TileWriter::new(&seq, &FrameHeader::default());
    let origin = BlockOffset { x: 0, y: 0 };
    tw.partition(origin, BLOCK_64X64, PARTITION_NONE as u32);
    tw.dc_block(origin, BLOCK_64X64, (false, false), true, 0, None);
    let (data, _) = tw.done();

    let err = decode_frame_tiles(&seq, &fh, &[&data, &[]]).unwrap_err();
    assert_eq!(
      err,
      crate::error::Error::Tile(TileError {
        tile: 1,
        position: Some((0, 16)),
        source: DecodeError::EndOfTile,
      })
    );
  }

  #[test]
  fn palette_is_rejected() {
    let seq = SequenceHeader::default();
    let fh = FrameHeader {
      width: 16,
      height: 16,
      allow_screen_content_tools: true,
      ..Default::default()
    };
    let mut tw = TileWriter::new(&seq, &fh);
    let origin = BlockOffset { x: 0, y: 0 };
    tw.partition(origin, BLOCK_16X16, PARTITION_NONE as u32);
    tw.w.symbol_with_update(1, &mut tw.fc.skip_cdfs[0]);
    tw.w.symbol_with_update(DC_PRED as u32, &mut tw.fc.kf_y_cdf[0][0]);
    let cdf = &mut tw.fc.uv_mode_cfl_cdf[DC_PRED as usize];
    tw.w.symbol_with_update(DC_PRED as u32, cdf);
    // 16x16 has palette size context 2
    tw.w.symbol_with_update(1, &mut tw.fc.palette_y_mode_cdfs[2][0]);
    let (data, _) = tw.done();

    let err = decode_frame_tiles(&seq, &fh, &[&data]).unwrap_err();
    assert_eq!(
      err,
      crate::error::Error::Tile(TileError {
        tile: 0,
        position: Some((0, 0)),
        source: DecodeError::Unsupported(Feature::Palette),
      })
    );
  }
}
