// Copyright (c) 2019-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use libfuzzer_sys::arbitrary::{Arbitrary, Error, Unstructured};

use crate::ec::Reader;
use crate::header::{
  DeblockState, FrameType, SegLvl, SegmentationState, TileLayout,
};
use crate::prelude::*;

// Adding new fuzz targets
//
// 1. Add a `pub fn fuzz_something(data: T)` here, where `T` implements
//    Arbitrary.
// 2. cargo fuzz add something
// 3. Call it from fuzz/fuzz_targets/something.rs the way the other
//    targets do.

/// Headers and tile payloads for one intra frame.
///
/// Header fields stay inside their valid ranges most of the time so the
/// fuzzer spends its effort in the tile syntax.
#[derive(Debug)]
pub struct ArbitraryFrame {
  pub seq: SequenceHeader,
  pub fh: FrameHeader,
  pub tiles: Vec<Vec<u8>>,
}

fn arbitrary_segmentation(
  u: &mut Unstructured<'_>,
) -> Result<SegmentationState, Error> {
  let mut seg =
    SegmentationState { enabled: u.arbitrary()?, ..Default::default() };
  if seg.enabled {
    for segment in 0..seg.features.len() {
      for feature in [SegLvl::SEG_LVL_ALT_Q, SegLvl::SEG_LVL_SKIP] {
        seg.features[segment][feature as usize] = u.arbitrary()?;
      }
      seg.data[segment][SegLvl::SEG_LVL_ALT_Q as usize] =
        u.int_in_range(-255..=255)?;
    }
  }
  seg.update();
  Ok(seg)
}

impl Arbitrary<'_> for ArbitraryFrame {
  fn arbitrary(u: &mut Unstructured<'_>) -> Result<Self, Error> {
    let seq = SequenceHeader {
      bit_depth: *u.choose(&[8, 10, 12])?,
      chroma_sampling: *u.choose(&[
        ChromaSampling::Cs420,
        ChromaSampling::Cs422,
        ChromaSampling::Cs444,
        ChromaSampling::Cs400,
      ])?,
      use_128x128_superblock: u.arbitrary()?,
      enable_filter_intra: u.arbitrary()?,
      enable_cdef: u.arbitrary()?,
    };

    let delta_q_present = u.arbitrary()?;
    let allow_screen_content_tools = u.arbitrary()?;
    let mut fh = FrameHeader {
      frame_type: *u.choose(&[FrameType::KEY, FrameType::INTRA_ONLY])?,
      width: u.int_in_range(1..=512)?,
      height: u.int_in_range(1..=512)?,
      base_q_idx: u.arbitrary()?,
      dc_delta_q: u.arbitrary()?,
      ac_delta_q: u.arbitrary()?,
      segmentation: arbitrary_segmentation(u)?,
      delta_q_present,
      delta_q_res: u.int_in_range(0..=3)?,
      deblock: DeblockState {
        block_deltas_enabled: delta_q_present && u.arbitrary()?,
        block_delta_shift: u.int_in_range(0..=3)?,
        block_delta_multi: u.arbitrary()?,
      },
      cdef_bits: u.int_in_range(0..=3)?,
      tx_mode_select: u.arbitrary()?,
      reduced_tx_set: u.arbitrary()?,
      allow_screen_content_tools,
      allow_intrabc: allow_screen_content_tools && u.arbitrary()?,
      disable_cdf_update: u.arbitrary()?,
      tiles: TileLayout::Uniform {
        cols_log2: u.int_in_range(0..=2)?,
        rows_log2: u.int_in_range(0..=2)?,
      },
      ..Default::default()
    };

    let count = fh.tile_grid(&seq).map_or(1, |grid| grid.count());
    fh.context_update_tile_id = u.int_in_range(0..=count - 1)?;
    let mut tiles = Vec::with_capacity(count);
    for _ in 0..count {
      tiles.push(u.arbitrary()?);
    }

    Ok(ArbitraryFrame { seq, fh, tiles })
  }
}

pub fn fuzz_decode_tiles(frame: ArbitraryFrame) {
  let tiles: Vec<&[u8]> = frame.tiles.iter().map(Vec::as_slice).collect();
  let _ = decode_frame_tiles(&frame.seq, &frame.fh, &tiles);
}

/// Reads raw symbols with an adapting CDF until the data runs out.
pub fn fuzz_symbol_reader(data: &[u8]) {
  let mut r = Reader::new(data);
  let mut cdf = [24576u16, 16384, 8192, 0];
  // adapted CDFs can get close to free, bound the symbol count
  for _ in 0..data.len() * 64 {
    match r.symbol_with_update(&mut cdf) {
      Ok(3) if r.golomb().is_err() => break,
      Ok(_) => {}
      Err(_) => break,
    }
  }
}
