// Copyright (c) 2018-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

#![allow(non_upper_case_globals)]

//! Coefficient scan orders.
//!
//! Coefficients are kept column-major, transposed from the row-major
//! layout the bitstream syntax is written in: position `col * h + row`.
//! The tables are generated once on first use.

use crate::transform::*;
use once_cell::sync::Lazy;

const SCAN_KINDS: usize = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ScanKind {
  /// Zig-zag along anti-diagonals.
  Default = 0,
  /// Row by row, for vertical 1-D transforms.
  Mrow = 1,
  /// Column by column, for horizontal 1-D transforms.
  Mcol = 2,
}

impl ScanKind {
  const fn from_tx_type(tx_type: TxType) -> Self {
    use TxType::*;
    match tx_type {
      V_DCT | V_ADST | V_FLIPADST => ScanKind::Mrow,
      H_DCT | H_ADST | H_FLIPADST => ScanKind::Mcol,
      _ => ScanKind::Default,
    }
  }
}

fn generate(kind: ScanKind, w: usize, h: usize) -> Vec<u16> {
  let mut scan = Vec::with_capacity(w * h);
  match kind {
    ScanKind::Default => {
      for d in 0..w + h - 1 {
        let rows = d.saturating_sub(w - 1)..=d.min(h - 1);
        // square blocks alternate, each odd diagonal running down-left
        // from the top row; wide blocks run up-right, tall ones down-left
        let upward = if w == h { d % 2 == 0 } else { w > h };
        let mut push = |row: usize| scan.push(((d - row) * h + row) as u16);
        if upward {
          rows.rev().for_each(&mut push);
        } else {
          rows.for_each(&mut push);
        }
      }
    }
    ScanKind::Mrow => {
      for row in 0..h {
        for col in 0..w {
          scan.push((col * h + row) as u16);
        }
      }
    }
    ScanKind::Mcol => scan.extend(0..(w * h) as u16),
  }
  scan
}

static av1_scan_orders: Lazy<Vec<[Vec<u16>; SCAN_KINDS]>> = Lazy::new(|| {
  (0..TxSize::TX_SIZES_ALL)
    .map(|i| {
      let (w, h) = coded_dims(i);
      [
        generate(ScanKind::Default, w, h),
        generate(ScanKind::Mrow, w, h),
        generate(ScanKind::Mcol, w, h),
      ]
    })
    .collect()
});

fn coded_dims(tx_size_index: usize) -> (usize, usize) {
  let t = ALL_TX_SIZES[tx_size_index].coded_size();
  (t.width(), t.height())
}

static ALL_TX_SIZES: [TxSize; TxSize::TX_SIZES_ALL] = {
  use TxSize::*;
  [
    TX_4X4, TX_8X8, TX_16X16, TX_32X32, TX_64X64, TX_4X8, TX_8X4, TX_8X16,
    TX_16X8, TX_16X32, TX_32X16, TX_32X64, TX_64X32, TX_4X16, TX_16X4,
    TX_8X32, TX_32X8, TX_16X64, TX_64X16,
  ]
};

/// Scan of the coded region of `tx_size` for `tx_type`.
pub fn scan_order(tx_size: TxSize, tx_type: TxType) -> &'static [u16] {
  &av1_scan_orders[tx_size as usize][ScanKind::from_tx_type(tx_type) as usize]
}

#[cfg(test)]
mod test {
  use super::*;
  use pretty_assertions::assert_eq;
  use TxSize::*;
  use TxType::*;

  #[test]
  fn default_4x4() {
    assert_eq!(
      scan_order(TX_4X4, DCT_DCT),
      &[0, 4, 1, 2, 5, 8, 12, 9, 6, 3, 7, 10, 13, 14, 11, 15]
    );
  }

  // The bitstream tables are row-major; ours hold the transpose.
  fn transposed(row_major: &[u16], w: usize, h: usize) -> Vec<u16> {
    row_major
      .iter()
      .map(|&p| {
        let (row, col) = (p as usize / w, p as usize % w);
        (col * h + row) as u16
      })
      .collect()
  }

  #[test]
  fn default_8x8_matches_bitstream_table() {
    let row_major: [u16; 64] = [
      0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26,
      33, 40, 48, 41, 34, 27, 20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57,
      50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59, 52, 45, 38, 31,
      39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
    ];
    assert_eq!(scan_order(TX_8X8, DCT_DCT), &transposed(&row_major, 8, 8)[..]);
    assert_eq!(
      scan_order(TX_8X8, DCT_DCT)[..10],
      [0, 8, 1, 2, 9, 16, 24, 17, 10, 3]
    );
  }

  #[test]
  fn default_large_squares() {
    assert_eq!(
      scan_order(TX_16X16, DCT_DCT)[..10],
      [0, 16, 1, 2, 17, 32, 48, 33, 18, 3]
    );
    let first_32 = [0, 32, 1, 2, 33, 64, 96, 65, 34, 3];
    assert_eq!(scan_order(TX_32X32, DCT_DCT)[..10], first_32);
    // 64-point transforms code their top-left 32x32
    assert_eq!(scan_order(TX_64X64, DCT_DCT)[..10], first_32);
    assert_eq!(
      scan_order(TX_64X64, DCT_DCT),
      scan_order(TX_32X32, IDTX)
    );
  }

  #[test]
  fn rectangular_diagonals() {
    assert_eq!(
      &scan_order(TX_4X8, ADST_ADST)[..8],
      &[0, 8, 1, 16, 9, 2, 24, 17]
    );
    assert_eq!(
      &scan_order(TX_8X4, IDTX)[..8],
      &[0, 1, 4, 2, 5, 8, 3, 6]
    );
  }

  #[test]
  fn one_dimensional() {
    assert_eq!(
      scan_order(TX_4X4, V_DCT),
      &[0, 4, 8, 12, 1, 5, 9, 13, 2, 6, 10, 14, 3, 7, 11, 15]
    );
    assert_eq!(scan_order(TX_8X4, H_DCT)[..6], [0, 1, 2, 3, 4, 5]);
  }

  #[test]
  fn every_scan_is_a_permutation() {
    for (i, &t) in ALL_TX_SIZES.iter().enumerate() {
      for tx_type in [DCT_DCT, V_DCT, H_DCT] {
        let mut s = scan_order(t, tx_type).to_vec();
        s.sort_unstable();
        assert_eq!(s.len(), t.coded_size().area(), "size {}", i);
        assert!(s.iter().enumerate().all(|(n, &v)| n == v as usize));
      }
    }
  }
}
