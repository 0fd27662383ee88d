// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use super::*;

/// Every adaptive CDF an intra tile reads from.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct CDFContext {
  pub partition_w8_cdf: [[u16; 4]; PARTITION_TYPES],
  pub partition_w128_cdf: [[u16; 8]; PARTITION_TYPES],
  pub partition_cdf: [[u16; EXT_PARTITION_TYPES]; 3 * PARTITION_TYPES],

  pub kf_y_cdf: [[[u16; INTRA_MODES]; KF_MODE_CONTEXTS]; KF_MODE_CONTEXTS],
  pub uv_mode_cdf: [[u16; INTRA_MODES]; INTRA_MODES],
  pub uv_mode_cfl_cdf: [[u16; UV_INTRA_MODES]; INTRA_MODES],
  pub cfl_sign_cdf: [u16; CFL_JOINT_SIGNS],
  pub cfl_alpha_cdf: [[u16; CFL_ALPHABET_SIZE]; CFL_ALPHA_CONTEXTS],
  pub angle_delta_cdf: [[u16; 2 * MAX_ANGLE_DELTA + 1]; DIRECTIONAL_MODES],
  pub filter_intra_cdfs: [[u16; 2]; BlockSize::BLOCK_SIZES_ALL],
  pub filter_intra_mode_cdf: [u16; FILTER_INTRA_MODES],
  pub palette_y_mode_cdfs:
    [[[u16; 2]; PALETTE_Y_MODE_CONTEXTS]; PALETTE_BSIZE_CTXS],
  pub palette_uv_mode_cdfs: [[u16; 2]; PALETTE_UV_MODE_CONTEXTS],
  pub intrabc_cdf: [u16; 2],
  pub skip_cdfs: [[u16; 2]; SKIP_CONTEXTS],
  pub spatial_segmentation_cdfs:
    [[u16; MAX_SEGMENTS]; SPATIAL_PREDICTION_PROBS],
  pub delta_q_cdf: [u16; DELTA_Q_SMALL + 1],
  pub deblock_delta_cdf: [u16; DELTA_LF_SMALL + 1],
  pub deblock_delta_multi_cdf: [[u16; DELTA_LF_SMALL + 1]; FRAME_LF_COUNT],

  pub tx_size_8x8_cdf: [[u16; MAX_TX_DEPTH]; TX_SIZE_CONTEXTS],
  pub tx_size_cdf: [[[u16; MAX_TX_DEPTH + 1]; TX_SIZE_CONTEXTS]; BIG_TX_CATS],
  pub intra_tx_1_cdf: [[[u16; 7]; INTRA_MODES]; TX_SIZE_SQR_CONTEXTS],
  pub intra_tx_2_cdf: [[[u16; 5]; INTRA_MODES]; TX_SIZE_SQR_CONTEXTS],

  // lv_map
  pub txb_skip_cdf: [[[u16; 2]; TXB_SKIP_CONTEXTS]; TxSize::TX_SIZES],
  pub dc_sign_cdf: [[[u16; 2]; DC_SIGN_CONTEXTS]; PLANE_TYPES],
  pub eob_extra_cdf:
    [[[[u16; 2]; EOB_COEF_CONTEXTS]; PLANE_TYPES]; TxSize::TX_SIZES],
  pub eob_flag_cdf16: [[[u16; 5]; 2]; PLANE_TYPES],
  pub eob_flag_cdf32: [[[u16; 6]; 2]; PLANE_TYPES],
  pub eob_flag_cdf64: [[[u16; 7]; 2]; PLANE_TYPES],
  pub eob_flag_cdf128: [[[u16; 8]; 2]; PLANE_TYPES],
  pub eob_flag_cdf256: [[[u16; 9]; 2]; PLANE_TYPES],
  pub eob_flag_cdf512: [[[u16; 10]; 2]; PLANE_TYPES],
  pub eob_flag_cdf1024: [[[u16; 11]; 2]; PLANE_TYPES],
  pub coeff_base_eob_cdf:
    [[[[u16; 3]; SIG_COEF_CONTEXTS_EOB]; PLANE_TYPES]; TxSize::TX_SIZES],
  pub coeff_base_cdf:
    [[[[u16; 4]; SIG_COEF_CONTEXTS]; PLANE_TYPES]; TxSize::TX_SIZES],
  pub coeff_br_cdf:
    [[[[u16; BR_CDF_SIZE]; LEVEL_CONTEXTS]; PLANE_TYPES]; TxSize::TX_SIZES],
}

impl CDFContext {
  /// Default tables for a frame. The coefficient tables are picked by
  /// the frame's base quantizer index.
  pub fn new(base_q_idx: u8) -> CDFContext {
    let qctx = qctx_for_qindex(base_q_idx);
    CDFContext {
      partition_w8_cdf: default_partition_w8_cdf,
      partition_w128_cdf: default_partition_w128_cdf,
      partition_cdf: default_partition_cdf,
      kf_y_cdf: default_kf_y_mode_cdf,
      uv_mode_cdf: default_uv_mode_cdf,
      uv_mode_cfl_cdf: default_uv_mode_cfl_cdf,
      cfl_sign_cdf: default_cfl_sign_cdf,
      cfl_alpha_cdf: default_cfl_alpha_cdf,
      angle_delta_cdf: default_angle_delta_cdf,
      filter_intra_cdfs: default_filter_intra_cdfs,
      filter_intra_mode_cdf: default_filter_intra_mode_cdf,
      palette_y_mode_cdfs: default_palette_y_mode_cdfs,
      palette_uv_mode_cdfs: default_palette_uv_mode_cdfs,
      intrabc_cdf: default_intrabc_cdf,
      skip_cdfs: default_skip_cdfs,
      spatial_segmentation_cdfs: default_spatial_pred_seg_tree_cdf,
      delta_q_cdf: default_delta_q_cdf,
      deblock_delta_cdf: default_delta_lf_cdf,
      deblock_delta_multi_cdf: default_delta_lf_multi_cdf,
      tx_size_8x8_cdf: default_tx_size_8x8_cdf,
      tx_size_cdf: default_tx_size_cdf,
      intra_tx_1_cdf: default_intra_tx_1_cdf,
      intra_tx_2_cdf: default_intra_tx_2_cdf,

      txb_skip_cdf: default_txb_skip_cdfs[qctx],
      dc_sign_cdf: default_dc_sign_cdfs[qctx],
      eob_extra_cdf: default_eob_extra_cdfs[qctx],
      eob_flag_cdf16: default_eob_multi16_cdfs[qctx],
      eob_flag_cdf32: default_eob_multi32_cdfs[qctx],
      eob_flag_cdf64: default_eob_multi64_cdfs[qctx],
      eob_flag_cdf128: default_eob_multi128_cdfs[qctx],
      eob_flag_cdf256: default_eob_multi256_cdfs[qctx],
      eob_flag_cdf512: default_eob_multi512_cdfs[qctx],
      eob_flag_cdf1024: default_eob_multi1024_cdfs[qctx],
      coeff_base_eob_cdf: default_coeff_base_eob_cdfs[qctx],
      coeff_base_cdf: default_coeff_base_cdfs[qctx],
      coeff_br_cdf: default_coeff_br_cdfs[qctx],
    }
  }

  /// Zeroes the adaptation counters, as is done when a tile's final
  /// tables are carried over to the next frame.
  pub fn reset_counts(&mut self) {
    macro_rules! reset_1d {
      ($field:expr) => {
        if let Some(r) = $field.last_mut() {
          *r = 0;
        }
      };
    }
    macro_rules! reset_2d {
      ($field:expr) => {
        for x in $field.iter_mut() {
          reset_1d!(x);
        }
      };
    }
    macro_rules! reset_3d {
      ($field:expr) => {
        for x in $field.iter_mut() {
          reset_2d!(x);
        }
      };
    }
    macro_rules! reset_4d {
      ($field:expr) => {
        for x in $field.iter_mut() {
          reset_3d!(x);
        }
      };
    }

    reset_2d!(self.partition_w8_cdf);
    reset_2d!(self.partition_w128_cdf);
    reset_2d!(self.partition_cdf);

    reset_3d!(self.kf_y_cdf);
    reset_2d!(self.uv_mode_cdf);
    reset_2d!(self.uv_mode_cfl_cdf);
    reset_1d!(self.cfl_sign_cdf);
    reset_2d!(self.cfl_alpha_cdf);
    reset_2d!(self.angle_delta_cdf);
    reset_2d!(self.filter_intra_cdfs);
    reset_1d!(self.filter_intra_mode_cdf);
    reset_3d!(self.palette_y_mode_cdfs);
    reset_2d!(self.palette_uv_mode_cdfs);
    reset_1d!(self.intrabc_cdf);
    reset_2d!(self.skip_cdfs);
    reset_2d!(self.spatial_segmentation_cdfs);
    reset_1d!(self.delta_q_cdf);
    reset_1d!(self.deblock_delta_cdf);
    reset_2d!(self.deblock_delta_multi_cdf);

    reset_2d!(self.tx_size_8x8_cdf);
    reset_3d!(self.tx_size_cdf);
    reset_3d!(self.intra_tx_1_cdf);
    reset_3d!(self.intra_tx_2_cdf);

    reset_3d!(self.txb_skip_cdf);
    reset_3d!(self.dc_sign_cdf);
    reset_4d!(self.eob_extra_cdf);
    reset_3d!(self.eob_flag_cdf16);
    reset_3d!(self.eob_flag_cdf32);
    reset_3d!(self.eob_flag_cdf64);
    reset_3d!(self.eob_flag_cdf128);
    reset_3d!(self.eob_flag_cdf256);
    reset_3d!(self.eob_flag_cdf512);
    reset_3d!(self.eob_flag_cdf1024);
    reset_4d!(self.coeff_base_eob_cdf);
    reset_4d!(self.coeff_base_cdf);
    reset_4d!(self.coeff_br_cdf);
  }
}

impl std::fmt::Debug for CDFContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "CDFContext contains too many numbers to print :-(")
  }
}

/// Symbol reads for one tile: the neighbor trackers plus the CDFs they
/// select from.
#[derive(Debug)]
pub struct ContextReader {
  pub bc: BlockContext,
  pub fc: CDFContext,
}

impl ContextReader {
  pub fn new(fc: CDFContext, bc: BlockContext) -> Self {
    ContextReader { bc, fc }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn token_tables_follow_qindex() {
    let low = CDFContext::new(0);
    let high = CDFContext::new(255);
    assert_eq!(low.txb_skip_cdf, default_txb_skip_cdfs[0]);
    assert_eq!(high.txb_skip_cdf, default_txb_skip_cdfs[3]);
    assert_eq!(low.skip_cdfs, high.skip_cdfs);
  }

  #[test]
  fn reset_counts_clears_only_counters() {
    let mut fc = CDFContext::new(100);
    fc.skip_cdfs[1][1] = 17;
    fc.coeff_base_cdf[2][1][7][3] = 31;
    let before = fc.skip_cdfs[1][0];
    fc.reset_counts();
    assert_eq!(fc.skip_cdfs[1][1], 0);
    assert_eq!(fc.coeff_base_cdf[2][1][7][3], 0);
    assert_eq!(fc.skip_cdfs[1][0], before);
  }
}
