// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

mod error;

use crate::error::*;

use av1_intra_tiles::prelude::*;
use av1_intra_tiles::tiling::TileInfo;
use clap::Parser;
use itertools::Itertools;
use log::{debug, info};
use serde::Deserialize;

use std::fs;
use std::path::PathBuf;
use std::process::exit;

#[derive(Parser, Debug)]
#[command(
  name = "av1-tile-dump",
  version,
  about = "Parses the tiles of an intra AV1 frame and summarizes them"
)]
struct CliOptions {
  /// TOML file with `[sequence]` and `[frame]` header tables
  #[arg(long, short = 'H', value_name = "FILE")]
  header: PathBuf,
  /// Tile payloads in raster order, one file per tile
  #[arg(required = true, value_name = "TILE")]
  tiles: Vec<PathBuf>,
  /// Also print every block
  #[arg(long, short)]
  verbose: bool,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct HeaderFile {
  sequence: SequenceHeader,
  frame: FrameHeader,
}

#[derive(Default, Debug)]
struct TileStats {
  blocks: usize,
  skipped: usize,
  tx_units: [usize; 3],
  coded_tx_units: [usize; 3],
  nonzero_coeffs: [usize; 3],
  modes: Vec<PredictionMode>,
}

impl TileStats {
  fn gather(storage: &FrameStorage, tile: &TileInfo, verbose: bool) -> Self {
    let mut stats = TileStats::default();
    for sbo in tile.superblocks() {
      for block in storage.blocks(sbo) {
        stats.blocks += 1;
        stats.skipped += block.skip as usize;
        stats.modes.push(block.mode);
        if verbose {
          info!(
            "  mi ({}, {}) {:?} {:?}/{:?} {:?}{}",
            block.bo.y,
            block.bo.x,
            block.bsize,
            block.mode,
            block.uv_mode,
            block.tx_size,
            if block.skip { " skip" } else { "" }
          );
        }
      }
      for plane in 0..storage.planes {
        let tus = storage.transform_units(sbo, plane);
        stats.tx_units[plane] += tus.len();
        stats.coded_tx_units[plane] +=
          tus.iter().filter(|tu| tu.has_coefficients()).count();
        stats.nonzero_coeffs[plane] += storage
          .coefficients(sbo, plane)
          .iter()
          .filter(|&&c| c != 0)
          .count();
      }
    }
    stats
  }

  fn print(&self, index: usize, planes: usize) {
    info!(
      "tile {}: {} blocks, {} skipped",
      index, self.blocks, self.skipped
    );
    for plane in 0..planes {
      info!(
        "  plane {}: {} transform blocks, {} coded, {} nonzero coefficients",
        plane,
        self.tx_units[plane],
        self.coded_tx_units[plane],
        self.nonzero_coeffs[plane]
      );
    }
    let modes = self
      .modes
      .iter()
      .sorted()
      .dedup_with_count()
      .map(|(count, mode)| format!("{:?} {}", mode, count))
      .join(", ");
    info!("  luma modes: {}", modes);
  }
}

fn run() -> Result<(), CliError> {
  let cli = CliOptions::parse();

  let text = fs::read_to_string(&cli.header)
    .map_err(|e| e.context("Cannot read the header file"))?;
  let HeaderFile { sequence, mut frame } =
    toml::from_str(&text).map_err(|e| e.context("Cannot parse headers"))?;
  frame.segmentation.update();
  debug!("{:?}", sequence);
  debug!("{:?}", frame);

  let payloads = cli
    .tiles
    .iter()
    .map(|path| {
      fs::read(path).map_err(|e| {
        e.context(&format!("Cannot read tile {}", path.display()))
      })
    })
    .collect::<Result<Vec<_>, _>>()?;
  let tiles = payloads.iter().map(Vec::as_slice).collect::<Vec<_>>();

  let decoded = decode_frame_tiles(&sequence, &frame, &tiles)
    .map_err(|e| e.context("Cannot decode frame"))?;
  let storage = &decoded.storage;
  info!(
    "{}x{} {:?} frame, {}x{} superblocks",
    frame.width,
    frame.height,
    frame.frame_type,
    storage.sb_cols,
    storage.sb_rows
  );

  let grid = frame
    .tile_grid(&sequence)
    .map_err(|e| Error::from(e).context("Cannot lay out tiles"))?;
  for index in 0..grid.count() {
    let tile = TileInfo::new(
      &grid,
      index,
      storage.sb_size,
      storage.mi_cols,
      storage.mi_rows,
    );
    TileStats::gather(storage, &tile, cli.verbose)
      .print(index, storage.planes);
  }
  Ok(())
}

fn main() {
  init_logger();

  run().unwrap_or_else(|e| {
    print_error(&e);
    exit(1);
  });
}

fn init_logger() {
  use std::str::FromStr;
  fn level_colored(l: log::Level) -> console::StyledObject<&'static str> {
    use console::style;
    use log::Level;
    match l {
      Level::Trace => style("??").dim(),
      Level::Debug => style("? ").dim(),
      Level::Info => style("> ").green(),
      Level::Warn => style("! ").yellow(),
      Level::Error => style("!!").red(),
    }
  }

  let level = std::env::var("AV1_TILES_LOG")
    .ok()
    .and_then(|l| log::LevelFilter::from_str(&l).ok())
    .unwrap_or(log::LevelFilter::Info);

  let dispatch = fern::Dispatch::new()
    .format(move |out, message, record| {
      out.finish(format_args!(
        "{level} {message}",
        level = level_colored(record.level()),
        message = message,
      ));
    })
    // dependencies stay at Warn, both crates follow AV1_TILES_LOG
    .level(log::LevelFilter::Warn)
    .level_for("av1_intra_tiles", level)
    .level_for("av1_tile_dump", level)
    .chain(std::io::stderr())
    .apply();
  if let Err(e) = dispatch {
    eprintln!("Cannot install logger: {}", e);
  }
}
