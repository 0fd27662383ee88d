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

use num_derive::FromPrimitive;

#[derive(
  Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Default, FromPrimitive,
)]
pub enum PredictionMode {
  #[default]
  DC_PRED, // Average of above and left pixels
  V_PRED,      // Vertical
  H_PRED,      // Horizontal
  D45_PRED,    // Directional 45  degree
  D135_PRED,   // Directional 135 degree
  D113_PRED,   // Directional 113 degree
  D157_PRED,   // Directional 157 degree
  D203_PRED,   // Directional 203 degree
  D67_PRED,    // Directional 67  degree
  SMOOTH_PRED, // Combination of horizontal and vertical interpolation
  SMOOTH_V_PRED,
  SMOOTH_H_PRED,
  PAETH_PRED,
  UV_CFL_PRED,
}

/// Above/left context of each luma mode for the key frame mode CDFs.
pub static intra_mode_context: [usize; 13] =
  [0, 1, 2, 3, 4, 4, 4, 4, 3, 0, 1, 2, 0];

impl PredictionMode {
  #[inline]
  pub fn is_cfl(self) -> bool {
    self == PredictionMode::UV_CFL_PRED
  }

  #[inline]
  pub fn is_directional(self) -> bool {
    self >= PredictionMode::V_PRED && self <= PredictionMode::D67_PRED
  }

  #[inline]
  pub fn kf_context(self) -> usize {
    intra_mode_context[self as usize]
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, FromPrimitive)]
pub enum FilterIntraMode {
  #[default]
  FILTER_DC_PRED,
  FILTER_V_PRED,
  FILTER_H_PRED,
  FILTER_D157_PRED,
  FILTER_PAETH_PRED,
}

impl FilterIntraMode {
  /// The directional mode a filter intra mode stands for when picking
  /// transform types.
  pub const fn intra_dir(self) -> PredictionMode {
    match self {
      FilterIntraMode::FILTER_DC_PRED | FilterIntraMode::FILTER_PAETH_PRED => {
        PredictionMode::DC_PRED
      }
      FilterIntraMode::FILTER_V_PRED => PredictionMode::V_PRED,
      FilterIntraMode::FILTER_H_PRED => PredictionMode::H_PRED,
      FilterIntraMode::FILTER_D157_PRED => PredictionMode::D157_PRED,
    }
  }
}

/// Angle offsets of directional modes, in steps of 3 degrees.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AngleDelta {
  pub y: i8,
  pub uv: i8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CFLSign {
  CFL_SIGN_ZERO = 0,
  CFL_SIGN_NEG = 1,
  CFL_SIGN_POS = 2,
}

use self::CFLSign::*;

const CFL_SIGNS: usize = 3;
static cfl_sign_value: [i16; CFL_SIGNS] = [0, -1, 1];

/// Chroma-from-luma signs and magnitudes for the U and V planes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CFLParams {
  pub sign: [CFLSign; 2],
  pub scale: [u8; 2],
}

impl Default for CFLParams {
  #[inline]
  fn default() -> Self {
    Self { sign: [CFL_SIGN_ZERO, CFL_SIGN_ZERO], scale: [0, 0] }
  }
}

impl CFLParams {
  /// Splits a decoded joint sign symbol. Both signs zero is not codable.
  #[inline]
  pub const fn from_joint_sign(joint_sign: u32) -> CFLParams {
    const SIGNS: [CFLSign; CFL_SIGNS] =
      [CFL_SIGN_ZERO, CFL_SIGN_NEG, CFL_SIGN_POS];
    let s = joint_sign as usize + 1;
    CFLParams {
      sign: [SIGNS[s / CFL_SIGNS], SIGNS[s % CFL_SIGNS]],
      scale: [0, 0],
    }
  }

  #[inline]
  pub fn joint_sign(self) -> u32 {
    debug_assert!(
      self.sign[0] != CFL_SIGN_ZERO || self.sign[1] != CFL_SIGN_ZERO
    );
    (self.sign[0] as u32) * (CFL_SIGNS as u32) + (self.sign[1] as u32) - 1
  }

  /// Context of the alpha magnitude for plane `uv`, which must have a
  /// nonzero sign.
  #[inline]
  pub fn context(self, uv: usize) -> usize {
    debug_assert!(self.sign[uv] != CFL_SIGN_ZERO);
    (self.sign[uv] as usize - 1) * CFL_SIGNS + (self.sign[1 - uv] as usize)
  }

  #[inline]
  pub fn alpha(self, uv: usize) -> i16 {
    cfl_sign_value[self.sign[uv] as usize] * (self.scale[uv] as i16)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn joint_signs_cover_all_nonzero_pairs() {
    for js in 0..8 {
      let p = CFLParams::from_joint_sign(js);
      assert!(p.sign != [CFL_SIGN_ZERO, CFL_SIGN_ZERO]);
      assert_eq!(p.joint_sign(), js);
    }
    let p = CFLParams::from_joint_sign(0);
    assert_eq!(p.sign, [CFL_SIGN_ZERO, CFL_SIGN_NEG]);
    assert_eq!(p.context(1), 0);
  }

  #[test]
  fn alpha_contexts() {
    let p = CFLParams { sign: [CFL_SIGN_POS, CFL_SIGN_NEG], scale: [3, 16] };
    assert_eq!(p.context(0), 4);
    assert_eq!(p.context(1), 2);
    assert_eq!(p.alpha(0), 3);
    assert_eq!(p.alpha(1), -16);
  }

  #[test]
  fn directional_modes() {
    assert!(PredictionMode::V_PRED.is_directional());
    assert!(PredictionMode::D67_PRED.is_directional());
    assert!(!PredictionMode::SMOOTH_PRED.is_directional());
    assert_eq!(PredictionMode::D203_PRED.kf_context(), 4);
    assert_eq!(
      FilterIntraMode::FILTER_PAETH_PRED.intra_dir(),
      PredictionMode::DC_PRED
    );
  }
}
