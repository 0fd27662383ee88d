// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Tile syntax reader for intra-coded AV1 frames.
//!
//! Given the sequence and frame headers and the payload of each tile,
//! [`decode_frame_tiles`] walks the partition tree of every superblock and
//! stores the mode info, transform units and quantized coefficients of
//! each block in a [`frame::FrameStorage`]. Reconstruction and loop
//! filtering are left to the caller.

#![deny(bare_trait_objects)]
#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::upper_case_acronyms)]
#![warn(clippy::missing_errors_doc)]

mod util;

pub mod context;
pub mod ec;
pub mod entropymode;
pub mod error;
pub mod frame;
pub mod header;
pub mod partition;
pub mod predict;
pub mod scan_order;
pub mod tiling;
pub mod token_cdfs;
pub mod transform;

#[cfg(fuzzing)]
pub mod fuzzing;

pub use crate::error::{DecodeError, Error, Feature, TileError};
pub use crate::frame::FrameStorage;
pub use crate::header::{FrameHeader, InvalidHeader, SequenceHeader};
pub use crate::tiling::{decode_frame_tiles, DecodedFrame};

pub use v_frame::pixel::ChromaSampling;

/// Commonly used types and traits.
pub mod prelude {
  pub use crate::context::{Block, BlockOffset, SuperBlockOffset};
  pub use crate::error::*;
  pub use crate::frame::{FrameStorage, SuperblockInfo, TransformInfo};
  pub use crate::header::*;
  pub use crate::partition::{BlockSize, PartitionType};
  pub use crate::predict::PredictionMode;
  pub use crate::tiling::{decode_frame_tiles, DecodedFrame};
  pub use crate::transform::{TxSize, TxType};
  pub use v_frame::pixel::ChromaSampling;
}
