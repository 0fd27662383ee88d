// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use std::fmt;
use thiserror::Error;

pub use crate::header::InvalidHeader;

/// Bitstream tools that are recognised but not decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
  Palette,
  LoopRestoration,
  InterFrame,
  IntraBlockCopy,
}

impl fmt::Display for Feature {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(match self {
      Feature::Palette => "palette mode",
      Feature::LoopRestoration => "loop restoration",
      Feature::InterFrame => "inter frames",
      Feature::IntraBlockCopy => "intra block copy",
    })
  }
}

/// Failures while reading the symbols of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
  /// A read went past the declared length of the tile data.
  #[error("read past the end of the tile data")]
  EndOfTile,
  /// An exp-golomb prefix was longer than any valid coefficient allows.
  #[error("invalid exp-golomb code")]
  InvalidGolomb,
  /// A symbol decoded to a value the syntax element cannot take.
  #[error("invalid symbol")]
  InvalidSymbol,
  /// A partition produced a block with no valid chroma size.
  #[error(transparent)]
  InvalidBlockSize(#[from] crate::partition::InvalidBlockSize),
  #[error("unsupported feature: {0}")]
  Unsupported(Feature),
}

/// A [`DecodeError`] tagged with where it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub struct TileError {
  pub tile: usize,
  /// Mode-info (row, column) of the block being parsed, if any.
  pub position: Option<(usize, usize)>,
  #[source]
  pub source: DecodeError,
}

impl fmt::Display for TileError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "tile {}", self.tile)?;
    if let Some((row, col)) = self.position {
      write!(f, " at mi ({}, {})", row, col)?;
    }
    write!(f, ": {}", self.source)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
  #[error("invalid header: {0}")]
  InvalidHeader(#[from] InvalidHeader),
  #[error(transparent)]
  Tile(#[from] TileError),
  #[error("expected {expected} tile payloads, got {actual}")]
  TileCount { expected: usize, actual: usize },
  #[error("unsupported feature: {0}")]
  Unsupported(Feature),
}
