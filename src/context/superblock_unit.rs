// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use super::*;

pub const MAX_SB_SIZE_LOG2: usize = 7;

pub const MI_SIZE_LOG2: usize = 2;
pub const MI_SIZE: usize = 1 << MI_SIZE_LOG2;
pub const MAX_MIB_SIZE_LOG2: usize = MAX_SB_SIZE_LOG2 - MI_SIZE_LOG2;
pub const MAX_MIB_SIZE: usize = 1 << MAX_MIB_SIZE_LOG2;

/// Superblock geometry of a sequence: 64x64 or 128x128 luma samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuperBlockSize {
  /// log2 of the width in mode-info units.
  pub mib_size_log2: usize,
}

impl SuperBlockSize {
  pub const fn new(use_128x128: bool) -> Self {
    SuperBlockSize { mib_size_log2: if use_128x128 { 5 } else { 4 } }
  }

  #[inline]
  pub const fn mib_size(self) -> usize {
    1 << self.mib_size_log2
  }

  #[inline]
  pub const fn mib_mask(self) -> usize {
    self.mib_size() - 1
  }

  #[inline]
  pub const fn block_size(self) -> BlockSize {
    if self.mib_size_log2 == 5 {
      BLOCK_128X128
    } else {
      BLOCK_64X64
    }
  }

  /// Number of superblocks needed to cover `mi` mode-info units.
  #[inline]
  pub const fn count(self, mi: usize) -> usize {
    (mi + self.mib_mask()) >> self.mib_size_log2
  }
}

/// Absolute offset in superblocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SuperBlockOffset {
  pub x: usize,
  pub y: usize,
}

impl SuperBlockOffset {
  /// Offset of a block inside this superblock.
  #[inline]
  pub const fn block_offset(
    self, sb_size: SuperBlockSize, block_x: usize, block_y: usize,
  ) -> BlockOffset {
    BlockOffset {
      x: (self.x << sb_size.mib_size_log2) + block_x,
      y: (self.y << sb_size.mib_size_log2) + block_y,
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn superblock_geometry() {
    let sb64 = SuperBlockSize::new(false);
    let sb128 = SuperBlockSize::new(true);
    assert_eq!(sb64.mib_size(), 16);
    assert_eq!(sb128.mib_size(), 32);
    assert_eq!(sb64.block_size(), BLOCK_64X64);
    assert_eq!(sb128.block_size(), BLOCK_128X128);
    // 1920 pixels wide is 480 mode-info units
    assert_eq!(sb64.count(480), 30);
    assert_eq!(sb128.count(480), 15);
    assert_eq!(sb64.count(481), 31);

    let sbo = SuperBlockOffset { x: 2, y: 1 };
    assert_eq!(sbo.block_offset(sb64, 3, 4), BlockOffset { x: 35, y: 20 });
    assert_eq!(sbo.block_offset(sb128, 0, 0), BlockOffset { x: 64, y: 32 });
  }
}
