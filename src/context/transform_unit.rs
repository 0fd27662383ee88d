// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use super::*;
use crate::header::TxMode;
use crate::transform::TxType::*;
use v_frame::pixel::ChromaSampling;

pub const MAX_CODED_TX_SIZE: usize = 32;
pub const MAX_CODED_TX_SQUARE: usize = MAX_CODED_TX_SIZE * MAX_CODED_TX_SIZE;

// Coded tx_size <= 32x32, so is the # of CDF contexts from tx sizes
pub const TX_SIZE_SQR_CONTEXTS: usize = 4;

pub const INTRA_MODES: usize = 13;
pub const UV_INTRA_MODES: usize = 14;

// Level Map
pub const TXB_SKIP_CONTEXTS: usize = 13;

pub const EOB_COEF_CONTEXTS: usize = 9;

const SIG_COEF_CONTEXTS_2D: usize = 26;
const SIG_COEF_CONTEXTS_1D: usize = 16;
pub const SIG_COEF_CONTEXTS_EOB: usize = 4;
pub const SIG_COEF_CONTEXTS: usize =
  SIG_COEF_CONTEXTS_2D + SIG_COEF_CONTEXTS_1D;

pub const DC_SIGN_CONTEXTS: usize = 3;

pub const LEVEL_CONTEXTS: usize = 21;

pub const NUM_BASE_LEVELS: usize = 2;

pub const BR_CDF_SIZE: usize = 4;
pub const COEFF_BASE_RANGE: usize = 4 * (BR_CDF_SIZE - 1);

pub const COEFF_CONTEXT_BITS: usize = 6;
pub const COEFF_CONTEXT_MASK: usize = (1 << COEFF_CONTEXT_BITS) - 1;

// Pad 4 extra rows to remove the vertical availability check; the
// levels are transposed, so these sit at the end of each column.
pub const TX_PAD_HOR_LOG2: usize = 2;
pub const TX_PAD_HOR: usize = 4;
// and 4 extra columns past the last one
pub const TX_PAD_VER: usize = 4;
const TX_PAD_END: usize = 16;
pub const TX_PAD_2D: usize = (MAX_CODED_TX_SIZE + TX_PAD_HOR)
  * (MAX_CODED_TX_SIZE + TX_PAD_VER)
  + TX_PAD_END;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TxClass {
  TX_CLASS_2D = 0,
  TX_CLASS_HORIZ = 1,
  TX_CLASS_VERT = 2,
}

use crate::context::TxClass::*;

pub static tx_type_to_class: [TxClass; TX_TYPES] = [
  TX_CLASS_2D,    // DCT_DCT
  TX_CLASS_2D,    // ADST_DCT
  TX_CLASS_2D,    // DCT_ADST
  TX_CLASS_2D,    // ADST_ADST
  TX_CLASS_2D,    // FLIPADST_DCT
  TX_CLASS_2D,    // DCT_FLIPADST
  TX_CLASS_2D,    // FLIPADST_FLIPADST
  TX_CLASS_2D,    // ADST_FLIPADST
  TX_CLASS_2D,    // FLIPADST_ADST
  TX_CLASS_2D,    // IDTX
  TX_CLASS_VERT,  // V_DCT
  TX_CLASS_HORIZ, // H_DCT
  TX_CLASS_VERT,  // V_ADST
  TX_CLASS_HORIZ, // H_ADST
  TX_CLASS_VERT,  // V_FLIPADST
  TX_CLASS_HORIZ, // H_FLIPADST
];

pub static k_eob_group_start: [u16; 12] =
  [0, 1, 2, 3, 5, 9, 17, 33, 65, 129, 257, 513];

const NZ_MAP_CTX_0: usize = SIG_COEF_CONTEXTS_2D;
const NZ_MAP_CTX_5: usize = NZ_MAP_CTX_0 + 5;
const NZ_MAP_CTX_10: usize = NZ_MAP_CTX_0 + 10;

pub static nz_map_ctx_offset_1d: [usize; 32] = {
  let mut offsets = [NZ_MAP_CTX_10; 32];
  offsets[0] = NZ_MAP_CTX_0;
  offsets[1] = NZ_MAP_CTX_5;
  offsets
};

/// Whether the block at `bo` carries the chroma of its 8x8 area. With
/// subsampling, a 4-wide or 4-high block only does so at odd positions.
#[inline]
pub fn has_chroma(
  bo: BlockOffset, bsize: BlockSize, subsampling_x: usize,
  subsampling_y: usize, chroma_sampling: ChromaSampling,
) -> bool {
  if chroma_sampling == ChromaSampling::Cs400 {
    return false;
  };

  let bw = bsize.width_mi();
  let bh = bsize.height_mi();

  ((bo.x & 0x01) == 1 || (bw & 0x01) == 0 || subsampling_x == 0)
    && ((bo.y & 0x01) == 1 || (bh & 0x01) == 0 || subsampling_y == 0)
}

/// How the transform type of a transform block is determined.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TxTypeSource {
  /// Coded after the all-zero flag, conditioned on the intra direction.
  Coded { intra_dir: PredictionMode, reduced_tx_set: bool },
  /// Implied by the block's modes.
  Implied(TxType),
}

/// Where a transform block lies within its plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TxbPosition {
  pub plane: usize,
  /// Offset in 4x4 units of the plane.
  pub x4: usize,
  pub y4: usize,
  /// 4x4 units of the transform inside the frame.
  pub w4: usize,
  pub h4: usize,
  /// Block size of the containing block in this plane.
  pub plane_bsize: BlockSize,
}

/// Outcome of reading one transform block's coefficients.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TxbRead {
  pub eob: u16,
  pub tx_type: TxType,
}

impl ContextReader {
  /// Reads a luma transform size and records it for the neighbours.
  pub fn read_tx_size(
    &mut self, r: &mut Reader, pi: &PartitionInfo, tx_mode: TxMode,
    lossless: bool,
  ) -> Result<TxSize, DecodeError> {
    let bsize = pi.bsize;
    let tx_size = if lossless {
      TX_4X4
    } else {
      let max_tx = max_txsize_rect_lookup[bsize as usize];
      if bsize > BLOCK_4X4 && tx_mode == TxMode::Select {
        let ctx =
          self.bc.tx_size_context(pi.bo, bsize, pi.avail_u, pi.avail_l);
        let depth = match max_tx.depth() {
          1 => r.symbol_with_update(&mut self.fc.tx_size_8x8_cdf[ctx])?,
          d => r.symbol_with_update(&mut self.fc.tx_size_cdf[d - 2][ctx])?,
        };
        (0..depth).fold(max_tx, |t, _| t.split())
      } else {
        max_tx
      }
    };
    self.bc.update_tx_size_context(pi.bo, bsize, tx_size);
    Ok(tx_size)
  }

  fn read_tx_type(
    &mut self, r: &mut Reader, tx_size: TxSize, source: TxTypeSource,
  ) -> Result<TxType, DecodeError> {
    let (intra_dir, reduced_tx_set) = match source {
      TxTypeSource::Implied(tx_type) => return Ok(tx_type),
      TxTypeSource::Coded { intra_dir, reduced_tx_set } => {
        (intra_dir, reduced_tx_set)
      }
    };
    let tx_set = get_tx_set(tx_size, reduced_tx_set);
    let square_tx_size = tx_size.sqr() as usize;
    let s = match tx_set {
      TxSet::TX_SET_DCTONLY => return Ok(DCT_DCT),
      TxSet::TX_SET_INTRA_1 => r.symbol_with_update(
        &mut self.fc.intra_tx_1_cdf[square_tx_size][intra_dir as usize],
      )?,
      TxSet::TX_SET_INTRA_2 => r.symbol_with_update(
        &mut self.fc.intra_tx_2_cdf[square_tx_size][intra_dir as usize],
      )?,
    };
    tx_set
      .tx_types()
      .get(s as usize)
      .copied()
      .ok_or(DecodeError::InvalidSymbol)
  }

  #[inline]
  pub const fn get_txsize_entropy_ctx(tx_size: TxSize) -> usize {
    (tx_size.sqr() as usize + tx_size.sqr_up() as usize + 1) >> 1
  }

  // Since the coefficients and levels are transposed in relation to how they
  // are written in the bitstream syntax, use the log of block height in our
  // calculations instead of block width.
  #[inline]
  pub const fn get_txb_bhl(tx_size: TxSize) -> usize {
    tx_size.coded_size().height_log2()
  }

  pub fn get_nz_mag(levels: &[u8], bhl: usize, tx_class: TxClass) -> usize {
    // Levels are transposed: +1 is the next row, +stride the next column.
    let mut mag = cmp::min(3, levels[1]); // { 1, 0 }
    mag += cmp::min(3, levels[(1 << bhl) + TX_PAD_HOR]); // { 0, 1 }

    if tx_class == TX_CLASS_2D {
      mag += cmp::min(3, levels[(1 << bhl) + TX_PAD_HOR + 1]); // { 1, 1 }
      mag += cmp::min(3, levels[2]); // { 2, 0 }
      mag += cmp::min(3, levels[(2 << bhl) + (2 << TX_PAD_HOR_LOG2)]); // { 0, 2 }
    } else if tx_class == TX_CLASS_VERT {
      mag += cmp::min(3, levels[2]); // { 2, 0 }
      mag += cmp::min(3, levels[3]); // { 3, 0 }
      mag += cmp::min(3, levels[4]); // { 4, 0 }
    } else {
      mag += cmp::min(3, levels[(2 << bhl) + (2 << TX_PAD_HOR_LOG2)]); // { 0, 2 }
      mag += cmp::min(3, levels[(3 << bhl) + (3 << TX_PAD_HOR_LOG2)]); // { 0, 3 }
      mag += cmp::min(3, levels[(4 << bhl) + (4 << TX_PAD_HOR_LOG2)]); // { 0, 4 }
    }

    mag as usize
  }

  fn get_nz_map_ctx_from_stats(
    stats: usize,
    coeff_idx: usize, // transposed raster order
    bhl: usize,
    tx_size: TxSize,
    tx_class: TxClass,
  ) -> usize {
    if (tx_class as u32 | coeff_idx as u32) == 0 {
      return 0;
    };

    let col: usize = coeff_idx >> bhl;
    let row: usize = coeff_idx - (col << bhl);

    let ctx = ((stats + 1) >> 1).min(4);

    ctx
      + match tx_class {
        TX_CLASS_2D => {
          // Offsets follow the shape of the whole transform, not of its
          // coded region.
          let (width, height) = (tx_size.width(), tx_size.height());
          if width < height && row < 2 {
            11
          } else if width > height && col < 2 {
            16
          } else if row + col < 2 {
            1
          } else if row + col < 4 {
            6
          } else {
            21
          }
        }
        TX_CLASS_HORIZ => nz_map_ctx_offset_1d[col],
        TX_CLASS_VERT => nz_map_ctx_offset_1d[row],
      }
  }

  fn get_nz_map_ctx(
    levels: &[u8], coeff_idx: usize, bhl: usize, tx_size: TxSize,
    tx_class: TxClass,
  ) -> usize {
    let padded_idx = coeff_idx + ((coeff_idx >> bhl) << TX_PAD_HOR_LOG2);
    let stats = Self::get_nz_mag(&levels[padded_idx..], bhl, tx_class);

    Self::get_nz_map_ctx_from_stats(stats, coeff_idx, bhl, tx_size, tx_class)
  }

  /// Context of the last coefficient, from its place in the scan.
  #[inline]
  fn get_eob_ctx(scan_idx: usize, area: usize) -> usize {
    if scan_idx == 0 {
      0
    } else if scan_idx <= area / 8 {
      1
    } else if scan_idx <= area / 4 {
      2
    } else {
      3
    }
  }

  pub fn get_br_ctx(
    levels: &[u8],
    coeff_idx: usize, // transposed raster order
    bhl: usize,
    tx_class: TxClass,
  ) -> usize {
    let col: usize = coeff_idx >> bhl;
    let row: usize = coeff_idx - (col << bhl);
    let stride: usize = (1 << bhl) + TX_PAD_HOR;
    let pos: usize = col * stride + row;
    let mut mag: usize = (levels[pos + 1] + levels[pos + stride]) as usize;

    match tx_class {
      TX_CLASS_2D => {
        mag += levels[pos + stride + 1] as usize;
        mag = cmp::min((mag + 1) >> 1, 6);
        if coeff_idx == 0 {
          return mag;
        }
        if (row < 2) && (col < 2) {
          return mag + 7;
        }
      }
      TX_CLASS_HORIZ => {
        mag += levels[pos + (stride << 1)] as usize;
        mag = cmp::min((mag + 1) >> 1, 6);
        if coeff_idx == 0 {
          return mag;
        }
        if col == 0 {
          return mag + 7;
        }
      }
      TX_CLASS_VERT => {
        mag += levels[pos + 2] as usize;
        mag = cmp::min((mag + 1) >> 1, 6);
        if coeff_idx == 0 {
          return mag;
        }
        if row == 0 {
          return mag + 7;
        }
      }
    }

    mag + 14
  }

  fn read_eob(
    &mut self, r: &mut Reader, tx_size: TxSize, tx_class: TxClass,
    plane_type: usize,
  ) -> Result<u16, DecodeError> {
    let eob_multi_size = tx_size.width_log2().min(5)
      + tx_size.height_log2().min(5)
      - 4;
    let (pt, ctx) = (plane_type, (tx_class != TX_CLASS_2D) as usize);
    let fc = &mut self.fc;
    let s = match eob_multi_size {
      0 => r.symbol_with_update(&mut fc.eob_flag_cdf16[pt][ctx]),
      1 => r.symbol_with_update(&mut fc.eob_flag_cdf32[pt][ctx]),
      2 => r.symbol_with_update(&mut fc.eob_flag_cdf64[pt][ctx]),
      3 => r.symbol_with_update(&mut fc.eob_flag_cdf128[pt][ctx]),
      4 => r.symbol_with_update(&mut fc.eob_flag_cdf256[pt][ctx]),
      5 => r.symbol_with_update(&mut fc.eob_flag_cdf512[pt][ctx]),
      _ => r.symbol_with_update(&mut fc.eob_flag_cdf1024[pt][ctx]),
    }?;
    let eob_pt = s as usize + 1;
    let mut eob = k_eob_group_start[eob_pt];

    if eob_pt >= 3 {
      let eob_shift = eob_pt - 3;
      let txs_ctx = Self::get_txsize_entropy_ctx(tx_size);
      let cdf = &mut fc.eob_extra_cdf[txs_ctx][plane_type][eob_shift];
      if r.symbol_with_update(cdf)? == 1 {
        eob += 1 << eob_shift;
      }
      for i in 1..cmp::max(1, eob_pt - 2) {
        if r.bit()? == 1 {
          eob += 1 << (eob_shift - i);
        }
      }
    }
    Ok(eob)
  }

  /// Reads the coefficients of one transform block into `coeffs`, in
  /// transposed order, and records the block's cumulative level and DC
  /// sign for its neighbours.
  #[profiling::function]
  pub fn read_coeffs(
    &mut self, r: &mut Reader, txb: TxbPosition, tx_size: TxSize,
    source: TxTypeSource, coeffs: &mut [i32],
  ) -> Result<TxbRead, DecodeError> {
    let TxbPosition { plane, x4, y4, w4, h4, plane_bsize } = txb;
    let txb_ctx =
      self.bc.get_txb_ctx(plane, x4, y4, w4, h4, plane_bsize, tx_size);
    let txs_ctx = Self::get_txsize_entropy_ctx(tx_size);
    let all_zero = r.symbol_with_update(
      &mut self.fc.txb_skip_cdf[txs_ctx][txb_ctx.txb_skip_ctx],
    )? == 1;
    if all_zero {
      self.bc.set_coeff_context(plane, x4, y4, w4, h4, 0);
      return Ok(TxbRead { eob: 0, tx_type: DCT_DCT });
    }

    let tx_type = self.read_tx_type(r, tx_size, source)?;
    let tx_class = tx_type_to_class[tx_type as usize];
    let plane_type = (plane > 0) as usize;
    let scan = scan_order(tx_size, tx_type);
    let coded = tx_size.coded_size();
    let area = coded.area();
    let bhl = Self::get_txb_bhl(tx_size);

    let eob = self.read_eob(r, tx_size, tx_class, plane_type)?;
    debug_assert!(eob as usize <= area);

    let coeffs = &mut coeffs[..area];
    coeffs.fill(0);
    let mut levels_buf = [0u8; TX_PAD_2D];
    let levels = &mut levels_buf[..];

    let br_ctx_size = txs_ctx.min(TxSize::TX_32X32 as usize);
    for (c, &pos) in scan[..eob as usize].iter().enumerate().rev() {
      let pos = pos as usize;
      let mut level = if c == eob as usize - 1 {
        let ctx = Self::get_eob_ctx(c, area);
        let cdf = &mut self.fc.coeff_base_eob_cdf[txs_ctx][plane_type][ctx];
        r.symbol_with_update(cdf)? + 1
      } else {
        let ctx = Self::get_nz_map_ctx(levels, pos, bhl, tx_size, tx_class);
        let cdf = &mut self.fc.coeff_base_cdf[txs_ctx][plane_type][ctx];
        r.symbol_with_update(cdf)?
      };
      if level > NUM_BASE_LEVELS as u32 {
        let ctx = Self::get_br_ctx(levels, pos, bhl, tx_class);
        let cdf = &mut self.fc.coeff_br_cdf[br_ctx_size][plane_type][ctx];
        for _ in 0..COEFF_BASE_RANGE / (BR_CDF_SIZE - 1) {
          let k = r.symbol_with_update(cdf)?;
          level += k;
          if k < (BR_CDF_SIZE - 1) as u32 {
            break;
          }
        }
      }
      levels[pos + ((pos >> bhl) << TX_PAD_HOR_LOG2)] = level as u8;
      coeffs[pos] = level as i32;
    }

    let mut cul_level: u32 = 0;
    for (c, &pos) in scan[..eob as usize].iter().enumerate() {
      let pos = pos as usize;
      let mut level = coeffs[pos] as u32;
      if level == 0 {
        continue;
      }
      let sign = if c == 0 {
        let cdf =
          &mut self.fc.dc_sign_cdf[plane_type][txb_ctx.dc_sign_ctx];
        r.symbol_with_update(cdf)?
      } else {
        r.bit()?
      };
      if level > (NUM_BASE_LEVELS + COEFF_BASE_RANGE) as u32 {
        level = r.golomb()? + (NUM_BASE_LEVELS + COEFF_BASE_RANGE) as u32 + 1;
      }
      level &= 0xFFFFF;
      cul_level += level;
      coeffs[pos] = if sign == 1 { -(level as i32) } else { level as i32 };
    }

    let mut cul_level = cul_level.min(COEFF_CONTEXT_MASK as u32);
    BlockContext::set_dc_sign(&mut cul_level, coeffs[0]);
    self.bc.set_coeff_context(plane, x4, y4, w4, h4, cul_level as u8);

    Ok(TxbRead { eob, tx_type })
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::ec::WriterEncoder;
  use pretty_assertions::assert_eq;

  fn context_reader() -> ContextReader {
    let bc = BlockContext::new(
      0,
      32,
      SuperBlockSize::new(false),
      ChromaSampling::Cs420,
    );
    ContextReader::new(CDFContext::new(60), bc)
  }

  #[test]
  fn chroma_lives_at_odd_positions() {
    let cs = ChromaSampling::Cs420;
    let bo = |x, y| BlockOffset { x, y };
    assert!(!has_chroma(bo(0, 0), BLOCK_4X4, 1, 1, cs));
    assert!(!has_chroma(bo(1, 0), BLOCK_4X4, 1, 1, cs));
    assert!(has_chroma(bo(1, 1), BLOCK_4X4, 1, 1, cs));
    assert!(has_chroma(bo(1, 0), BLOCK_4X8, 1, 1, cs));
    assert!(has_chroma(bo(0, 0), BLOCK_8X8, 1, 1, cs));
    assert!(has_chroma(bo(0, 0), BLOCK_4X4, 0, 0, ChromaSampling::Cs444));
    assert!(!has_chroma(bo(1, 1), BLOCK_8X8, 1, 1, ChromaSampling::Cs400));
  }

  #[test]
  fn entropy_ctx_of_rectangular_sizes() {
    assert_eq!(ContextReader::get_txsize_entropy_ctx(TX_4X4), 0);
    assert_eq!(ContextReader::get_txsize_entropy_ctx(TX_4X8), 1);
    assert_eq!(ContextReader::get_txsize_entropy_ctx(TX_8X32), 2);
    assert_eq!(ContextReader::get_txsize_entropy_ctx(TX_64X64), 4);
    assert_eq!(ContextReader::get_txb_bhl(TX_16X64), 5);
    assert_eq!(ContextReader::get_txb_bhl(TX_16X4), 2);
  }

  #[test]
  fn nz_offsets_follow_transform_shape() {
    let ctx = |idx, bhl, tx_size, class| {
      ContextReader::get_nz_map_ctx_from_stats(0, idx, bhl, tx_size, class)
    };
    assert_eq!(ctx(0, 2, TX_4X4, TX_CLASS_2D), 0);
    assert_eq!(ctx(1, 2, TX_4X4, TX_CLASS_2D), 1);
    assert_eq!(ctx(3, 2, TX_4X4, TX_CLASS_2D), 6);
    assert_eq!(ctx(15, 2, TX_4X4, TX_CLASS_2D), 21);
    // 8 wide, 4 high: second column
    assert_eq!(ctx(4, 2, TX_8X4, TX_CLASS_2D), 16);
    // 64x32 codes a square region but keeps its wide offsets
    assert_eq!(ctx(32, 5, TX_64X32, TX_CLASS_2D), 16);
    assert_eq!(ctx(2, 3, TX_4X8, TX_CLASS_2D), 6);
    assert_eq!(ctx(1, 3, TX_4X8, TX_CLASS_2D), 11);
    assert_eq!(ctx(0, 2, TX_4X4, TX_CLASS_HORIZ), 26);
    assert_eq!(ctx(4, 2, TX_4X4, TX_CLASS_HORIZ), 31);
    assert_eq!(ctx(4, 2, TX_4X4, TX_CLASS_VERT), 26);
    assert_eq!(ctx(3, 2, TX_4X4, TX_CLASS_VERT), 36);
  }

  #[test]
  fn neighbour_magnitudes() {
    // 4x4: stride 8, coefficient 0 sits at 0
    let mut levels = [0u8; TX_PAD_2D];
    levels[1] = 5; // row 1, clamped to 3
    levels[8] = 1; // column 1
    levels[9] = 2; // row 1, column 1
    levels[16] = 1; // column 2
    assert_eq!(ContextReader::get_nz_mag(&levels, 2, TX_CLASS_2D), 7);
    assert_eq!(ContextReader::get_nz_mag(&levels, 2, TX_CLASS_VERT), 4);
    assert_eq!(ContextReader::get_nz_mag(&levels, 2, TX_CLASS_HORIZ), 5);
    assert_eq!(ContextReader::get_br_ctx(&levels, 0, 2, TX_CLASS_2D), 4);
    assert_eq!(ContextReader::get_br_ctx(&levels, 0, 2, TX_CLASS_HORIZ), 4);
  }

  #[test]
  fn eob_contexts() {
    assert_eq!(ContextReader::get_eob_ctx(0, 16), 0);
    assert_eq!(ContextReader::get_eob_ctx(2, 16), 1);
    assert_eq!(ContextReader::get_eob_ctx(3, 16), 2);
    assert_eq!(ContextReader::get_eob_ctx(4, 16), 2);
    assert_eq!(ContextReader::get_eob_ctx(5, 16), 3);
  }

  #[test]
  fn tx_size_reads_depth() {
    let mut fc = CDFContext::new(60);
    let mut w = WriterEncoder::new();
    // 32x32 block: depth 2 gives 8x8
    w.symbol_with_update(2, &mut fc.tx_size_cdf[1][0]);
    // 8x8 block below it, above context now 8 wide: depth 1
    w.symbol_with_update(1, &mut fc.tx_size_8x8_cdf[1]);
    let buf = w.done();

    let mut cr = context_reader();
    let mut r = Reader::new(&buf);
    let mut pi = PartitionInfo {
      bo: BlockOffset { x: 0, y: 0 },
      bsize: BLOCK_32X32,
      sbo: SuperBlockOffset { x: 0, y: 0 },
      partition: PartitionType::PARTITION_NONE,
      has_chroma: true,
      avail_u: false,
      avail_l: false,
      above: None,
      left: None,
    };
    let t = cr.read_tx_size(&mut r, &pi, TxMode::Select, false).unwrap();
    assert_eq!(t, TX_8X8);
    assert_eq!(cr.bc.above_tx_context[..9], [8, 8, 8, 8, 8, 8, 8, 8, 64]);

    pi.bo = BlockOffset { x: 0, y: 8 };
    pi.bsize = BLOCK_8X8;
    pi.avail_u = true;
    let t = cr.read_tx_size(&mut r, &pi, TxMode::Select, false).unwrap();
    assert_eq!(t, TX_4X4);

    // nothing coded for lossless or without select
    let t = cr.read_tx_size(&mut r, &pi, TxMode::Select, true).unwrap();
    assert_eq!(t, TX_4X4);
    let t = cr.read_tx_size(&mut r, &pi, TxMode::Largest, false).unwrap();
    assert_eq!(t, TX_8X8);
  }

  // Writes coefficients the way the reader expects them, driving the
  // same contexts.
  fn write_coeffs(
    w: &mut WriterEncoder, fc: &mut CDFContext, txb_ctx: TXB_CTX,
    tx_size: TxSize, tx_type: TxType, source: TxTypeSource, coeffs: &[i32],
  ) {
    let txs_ctx = ContextReader::get_txsize_entropy_ctx(tx_size);
    let scan = scan_order(tx_size, tx_type);
    let eob = scan
      .iter()
      .rposition(|&p| coeffs[p as usize] != 0)
      .map_or(0, |i| i + 1);
    w.symbol_with_update(
      (eob == 0) as u32,
      &mut fc.txb_skip_cdf[txs_ctx][txb_ctx.txb_skip_ctx],
    );
    if eob == 0 {
      return;
    }

    if let TxTypeSource::Coded { intra_dir, reduced_tx_set } = source {
      let tx_set = get_tx_set(tx_size, reduced_tx_set);
      let s = tx_set.tx_types().iter().position(|&t| t == tx_type).unwrap();
      let (sqr, dir) = (tx_size.sqr() as usize, intra_dir as usize);
      match tx_set {
        TxSet::TX_SET_DCTONLY => assert_eq!(tx_type, DCT_DCT),
        TxSet::TX_SET_INTRA_1 => {
          w.symbol_with_update(s as u32, &mut fc.intra_tx_1_cdf[sqr][dir])
        }
        TxSet::TX_SET_INTRA_2 => {
          w.symbol_with_update(s as u32, &mut fc.intra_tx_2_cdf[sqr][dir])
        }
      }
    }
    let tx_class = tx_type_to_class[tx_type as usize];
    let bhl = ContextReader::get_txb_bhl(tx_size);
    let area = tx_size.coded_size().area();

    let eob_pt =
      k_eob_group_start.iter().rposition(|&s| s as usize <= eob).unwrap();
    let sym = eob_pt as u32 - 1;
    let ctx = (tx_class != TX_CLASS_2D) as usize;
    match tx_size.width_log2().min(5) + tx_size.height_log2().min(5) - 4 {
      0 => w.symbol_with_update(sym, &mut fc.eob_flag_cdf16[0][ctx]),
      1 => w.symbol_with_update(sym, &mut fc.eob_flag_cdf32[0][ctx]),
      2 => w.symbol_with_update(sym, &mut fc.eob_flag_cdf64[0][ctx]),
      3 => w.symbol_with_update(sym, &mut fc.eob_flag_cdf128[0][ctx]),
      4 => w.symbol_with_update(sym, &mut fc.eob_flag_cdf256[0][ctx]),
      5 => w.symbol_with_update(sym, &mut fc.eob_flag_cdf512[0][ctx]),
      _ => w.symbol_with_update(sym, &mut fc.eob_flag_cdf1024[0][ctx]),
    }
    if eob_pt >= 3 {
      let extra = eob - k_eob_group_start[eob_pt] as usize;
      let shift = eob_pt - 3;
      w.symbol_with_update(
        ((extra >> shift) & 1) as u32,
        &mut fc.eob_extra_cdf[txs_ctx][0][shift],
      );
      for i in 1..cmp::max(1, eob_pt - 2) {
        w.bit(((extra >> (shift - i)) & 1) as u16);
      }
    }

    let br_ctx_size = txs_ctx.min(TxSize::TX_32X32 as usize);
    let mut levels = [0u8; TX_PAD_2D];
    for c in (0..eob).rev() {
      let pos = scan[c] as usize;
      let level = coeffs[pos].unsigned_abs().min(15);
      if c == eob - 1 {
        let ctx = ContextReader::get_eob_ctx(c, area);
        w.symbol_with_update(
          level.min(3) - 1,
          &mut fc.coeff_base_eob_cdf[txs_ctx][0][ctx],
        );
      } else {
        let ctx = ContextReader::get_nz_map_ctx(
          &levels, pos, bhl, tx_size, tx_class,
        );
        w.symbol_with_update(
          level.min(3),
          &mut fc.coeff_base_cdf[txs_ctx][0][ctx],
        );
      }
      if level > 2 {
        let ctx = ContextReader::get_br_ctx(&levels, pos, bhl, tx_class);
        let cdf = &mut fc.coeff_br_cdf[br_ctx_size][0][ctx];
        let mut rem = level - 3;
        for _ in 0..4 {
          let k = rem.min(3);
          w.symbol_with_update(k, cdf);
          rem -= k;
          if k < 3 {
            break;
          }
        }
      }
      levels[pos + ((pos >> bhl) << TX_PAD_HOR_LOG2)] = level as u8;
    }
    for c in 0..eob {
      let pos = scan[c] as usize;
      let v = coeffs[pos];
      if v == 0 {
        continue;
      }
      if c == 0 {
        w.symbol_with_update(
          (v < 0) as u32,
          &mut fc.dc_sign_cdf[0][txb_ctx.dc_sign_ctx],
        );
      } else {
        w.bit((v < 0) as u16);
      }
      if v.unsigned_abs() > 14 {
        w.write_golomb(v.unsigned_abs() - 15);
      }
    }
  }

  const DC_INTRA: TxTypeSource = TxTypeSource::Coded {
    intra_dir: PredictionMode::DC_PRED,
    reduced_tx_set: false,
  };

  /// Codes one luma transform block on fresh contexts and reads it back.
  fn round_trip(
    tx_size: TxSize, tx_type: TxType, source: TxTypeSource, coeffs: &[i32],
  ) -> (TxbRead, Vec<i32>) {
    let mut fc = CDFContext::new(60);
    let mut w = WriterEncoder::new();
    let ctx = TXB_CTX::default();
    write_coeffs(&mut w, &mut fc, ctx, tx_size, tx_type, source, coeffs);
    let buf = w.done();

    let mut cr = context_reader();
    let mut r = Reader::new(&buf);
    let txb = TxbPosition {
      plane: 0,
      x4: 0,
      y4: 0,
      w4: tx_size.width_mi(),
      h4: tx_size.height_mi(),
      plane_bsize: tx_size.block_size(),
    };
    let (w4, h4, bsize) = (txb.w4, txb.h4, txb.plane_bsize);
    assert_eq!(cr.bc.get_txb_ctx(0, 0, 0, w4, h4, bsize, tx_size), ctx);
    let mut out = [0i32; MAX_CODED_TX_SQUARE];
    let read =
      cr.read_coeffs(&mut r, txb, tx_size, source, &mut out).unwrap();
    // both sides adapted the same tables
    assert_eq!(cr.fc.txb_skip_cdf, fc.txb_skip_cdf);
    assert_eq!(cr.fc.coeff_base_cdf, fc.coeff_base_cdf);
    (read, out[..tx_size.coded_size().area()].to_vec())
  }

  #[test]
  fn default_scan_of_8x8() {
    let mut coeffs = [0i32; 64];
    coeffs[0] = 40;
    coeffs[8] = -1; // column 1
    coeffs[1] = 4; // row 1
    coeffs[16] = 2; // column 2, sixth in the scan
    let (read, out) = round_trip(TX_8X8, DCT_DCT, DC_INTRA, &coeffs);
    assert_eq!(read, TxbRead { eob: 6, tx_type: DCT_DCT });
    assert_eq!(out, coeffs);
  }

  #[test]
  fn default_scan_of_large_squares() {
    for (tx_size, h) in [(TX_16X16, 16), (TX_32X32, 32), (TX_64X64, 32)] {
      let mut coeffs = vec![0i32; h * h];
      coeffs[0] = -7;
      coeffs[h] = 3;
      coeffs[1] = -1;
      coeffs[2] = 18;
      coeffs[2 * h] = 1;
      let (read, out) = round_trip(tx_size, DCT_DCT, DC_INTRA, &coeffs);
      assert_eq!(read, TxbRead { eob: 6, tx_type: DCT_DCT }, "{:?}", tx_size);
      assert_eq!(out, coeffs);
    }
  }

  #[test]
  fn vertical_class_runs_along_rows() {
    let mut coeffs = [0i32; 64];
    coeffs[0] = 2;
    coeffs[8] = -1;
    coeffs[24] = 5;
    coeffs[1] = 3; // first of the second row
    let (read, out) = round_trip(TX_8X8, V_DCT, DC_INTRA, &coeffs);
    assert_eq!(read, TxbRead { eob: 9, tx_type: V_DCT });
    assert_eq!(out, coeffs);
  }

  #[test]
  fn horizontal_class_runs_down_columns() {
    let mut coeffs = [0i32; 64];
    coeffs[..4].copy_from_slice(&[-3, 1, 1, 20]);
    coeffs[9] = -2;
    let source = TxTypeSource::Coded {
      intra_dir: PredictionMode::H_PRED,
      reduced_tx_set: false,
    };
    let (read, out) = round_trip(TX_8X8, H_DCT, source, &coeffs);
    assert_eq!(read, TxbRead { eob: 10, tx_type: H_DCT });
    assert_eq!(out, coeffs);

    // a full 4x4 reaches all three column offsets
    let coeffs: Vec<i32> = (0..16).map(|i| (i % 3) - 1).collect();
    let (read, out) = round_trip(TX_4X4, H_DCT, source, &coeffs);
    assert_eq!(read.eob, 16);
    assert_eq!(out, coeffs);
  }

  #[test]
  fn rectangular_shapes() {
    // tall: rows 0 and 1 take their own offsets
    let mut coeffs = [0i32; 32];
    coeffs[0] = 1;
    coeffs[1] = -3;
    coeffs[8] = 2;
    coeffs[16] = 1;
    let (read, out) = round_trip(TX_4X8, ADST_DCT, DC_INTRA, &coeffs);
    assert_eq!(read, TxbRead { eob: 4, tx_type: ADST_DCT });
    assert_eq!(out, coeffs);

    // wide, from the reduced set: columns 0 and 1 take their own offsets
    let mut coeffs = [0i32; 128];
    coeffs[0] = -9;
    coeffs[2] = 5;
    coeffs[8] = 1;
    coeffs[16] = -1;
    let source = TxTypeSource::Coded {
      intra_dir: PredictionMode::SMOOTH_PRED,
      reduced_tx_set: true,
    };
    let (read, out) = round_trip(TX_16X8, ADST_ADST, source, &coeffs);
    assert_eq!(read, TxbRead { eob: 6, tx_type: ADST_ADST });
    assert_eq!(out, coeffs);

    // implied types skip the type symbol
    let (read, out) =
      round_trip(TX_16X8, DCT_ADST, TxTypeSource::Implied(DCT_ADST), &coeffs);
    assert_eq!(read, TxbRead { eob: 6, tx_type: DCT_ADST });
    assert_eq!(out, coeffs);
  }

  #[test]
  fn coefficients_and_neighbour_summary() {
    let mut coeffs = [0i32; 16];
    coeffs[0] = -20;
    coeffs[1] = 3;
    coeffs[4] = 1;
    coeffs[10] = -2;

    let mut fc = CDFContext::new(60);
    let mut w = WriterEncoder::new();
    let ctx = TXB_CTX::default();
    write_coeffs(&mut w, &mut fc, ctx, TX_4X4, DCT_DCT, DC_INTRA, &coeffs);
    // its right neighbour sees a negative DC and a nonzero summary
    let ctx = TXB_CTX { txb_skip_ctx: 3, dc_sign_ctx: 1 };
    write_coeffs(&mut w, &mut fc, ctx, TX_4X4, DCT_DCT, DC_INTRA, &[0; 16]);
    let buf = w.done();

    let mut cr = context_reader();
    let mut r = Reader::new(&buf);
    let txb = TxbPosition {
      plane: 0,
      x4: 0,
      y4: 0,
      w4: 1,
      h4: 1,
      plane_bsize: BLOCK_4X4,
    };
    let source = DC_INTRA;
    let mut out = [0i32; MAX_CODED_TX_SQUARE];
    let read =
      cr.read_coeffs(&mut r, txb, TX_4X4, source, &mut out).unwrap();
    assert_eq!(read, TxbRead { eob: 12, tx_type: DCT_DCT });
    assert_eq!(out[..16], coeffs);
    // 20 + 3 + 1 + 2 with a negative DC
    assert_eq!(cr.bc.above_coeff_context[0][0], 26 | (1 << 6));
    assert_eq!(cr.bc.left_coeff_context[0][0], 26 | (1 << 6));

    let txb = TxbPosition { x4: 1, plane_bsize: BLOCK_8X8, ..txb };
    let ctx = cr.bc.get_txb_ctx(0, 1, 0, 1, 1, BLOCK_8X8, TX_4X4);
    assert_eq!(ctx, TXB_CTX { txb_skip_ctx: 3, dc_sign_ctx: 1 });
    let read =
      cr.read_coeffs(&mut r, txb, TX_4X4, source, &mut out).unwrap();
    assert_eq!(read, TxbRead { eob: 0, tx_type: DCT_DCT });
    assert_eq!(cr.bc.above_coeff_context[0][1], 0);
    assert_eq!(cr.bc.left_coeff_context[0][0], 0);
  }
}
