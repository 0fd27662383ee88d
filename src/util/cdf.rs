// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Constant constructors for the default CDF tables.
//!
//! Tables are written as probabilities of `value < i` scaled to 32768 and
//! stored inverted (`32768 - p`), followed by a zeroed adaptation counter.

pub const fn cdf<const VARS: usize, const CDF_LEN: usize>(
  vars: [u16; VARS],
) -> [u16; CDF_LEN] {
  // the trailing slot doubles as the terminator and the counter
  assert!(CDF_LEN > VARS);

  let mut out = [0; CDF_LEN];
  let mut i = 0;
  while i < vars.len() {
    assert!(vars[i] <= 32768);
    out[i] = 32768 - vars[i];
    i += 1;
  }

  out
}

macro_rules! nested_cdf {
  (@ty $acc:ty;) => { $acc };
  (@ty $acc:ty; $d:ident $(, $rest:ident)*) => {
    nested_cdf!(@ty [$acc; $d]; $($rest),*)
  };
  (@zero $acc:expr;) => { $acc };
  (@zero $acc:expr; $d:ident $(, $rest:ident)*) => {
    nested_cdf!(@zero [$acc; $d]; $($rest),*)
  };
  ($name:ident => $inner:ident; $($dim:ident),+) => {
    pub const fn $name<
      const VARS: usize,
      const CDF_LEN: usize,
      $(const $dim: usize),+
    >(
      vars: nested_cdf!(@ty [u16; VARS]; $($dim),+),
    ) -> nested_cdf!(@ty [u16; CDF_LEN]; $($dim),+) {
      let mut out = nested_cdf!(@zero [0u16; CDF_LEN]; $($dim),+);
      let mut i = 0;
      while i < vars.len() {
        out[i] = $inner(vars[i]);
        i += 1;
      }

      out
    }
  };
}

nested_cdf!(cdf_2d => cdf; N_2D);
nested_cdf!(cdf_3d => cdf_2d; N_2D, N_3D);
nested_cdf!(cdf_4d => cdf_3d; N_2D, N_3D, N_4D);
nested_cdf!(cdf_5d => cdf_4d; N_2D, N_3D, N_4D, N_5D);
