// Copyright (c) 2001-2016, Alliance for Open Media. All rights reserved
// Copyright (c) 2017-2024, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

#![allow(non_camel_case_types)]

use crate::error::DecodeError;

const EC_PROB_SHIFT: u32 = 6;
const EC_MIN_PROB: u32 = 4;
const WINDOW_SIZE: i16 = 32;
/// Written into `cnt` once the input is exhausted so refills stop.
const LOTS_OF_BITS: i16 = 0x4000;
/// Longest exp-golomb prefix a coefficient level can produce.
const MAX_GOLOMB_LENGTH: u32 = 20;

type ec_window = u32;

/// Range decoder over the bytes of one tile.
///
/// Every read checks that the bits consumed so far fit in the tile; once
/// they don't, the read fails with [`DecodeError::EndOfTile`].
#[derive(Debug, Clone)]
pub struct Reader<'a> {
  buf: &'a [u8],
  bptr: usize,
  /// The difference between the top of the range and the coded value,
  /// left aligned in the window.
  dif: ec_window,
  /// The number of values in the current range.
  rng: u16,
  /// The number of bits of data buffered in `dif`, minus 15.
  cnt: i16,
  /// Bits consumed, counting the reserved termination bit.
  tell: u32,
  allow_update: bool,
}

impl<'a> Reader<'a> {
  pub fn new(buf: &'a [u8]) -> Self {
    let mut r = Reader {
      buf,
      bptr: 0,
      dif: (1 << (WINDOW_SIZE - 1)) - 1,
      rng: 0x8000,
      cnt: -15,
      tell: 1,
      allow_update: true,
    };
    r.refill();
    r
  }

  /// Turns CDF adaptation on or off for [`Reader::symbol_with_update`].
  pub fn set_cdf_update(&mut self, allow: bool) {
    self.allow_update = allow;
  }

  /// Returns the number of bits consumed so far. Like the encoder's
  /// count it includes one extra bit reserved for termination.
  pub const fn tell(&self) -> u32 {
    self.tell
  }

  fn refill(&mut self) {
    let mut s = WINDOW_SIZE - 9 - (self.cnt + 15);
    while s >= 0 && self.bptr < self.buf.len() {
      debug_assert!(s <= WINDOW_SIZE - 8);
      self.dif ^= (self.buf[self.bptr] as ec_window) << s;
      self.cnt += 8;
      s -= 8;
      self.bptr += 1;
    }
    if self.bptr >= self.buf.len() {
      self.cnt = LOTS_OF_BITS;
    }
  }

  fn normalize(
    &mut self, dif: ec_window, rng: u32,
  ) -> Result<(), DecodeError> {
    debug_assert!(rng <= 65536);
    let d = rng.leading_zeros() - 16;
    self.cnt -= d as i16;
    // shifts in ones rather than zeros
    self.dif = ((dif + 1) << d) - 1;
    self.rng = (rng << d) as u16;
    self.tell += d;
    if self.cnt < 0 {
      self.refill();
    }
    if self.tell as usize > self.buf.len() * 8 {
      return Err(DecodeError::EndOfTile);
    }
    Ok(())
  }

  /// Decodes a binary value where `f` is the probability of `true`,
  /// scaled by 32768.
  pub fn bool(&mut self, f: u32) -> Result<bool, DecodeError> {
    debug_assert!(f < 32768);
    let r = self.rng as u32;
    debug_assert!(self.dif >> (WINDOW_SIZE - 16) < r);
    let v = (((r >> 8) * (f >> EC_PROB_SHIFT)) >> (7 - EC_PROB_SHIFT))
      + EC_MIN_PROB;
    let vw = v << (WINDOW_SIZE - 16);
    let (dif, rng, ret) = if self.dif >= vw {
      (self.dif - vw, r - v, false)
    } else {
      (self.dif, v, true)
    };
    self.normalize(dif, rng)?;
    Ok(ret)
  }

  /// Decodes one bit with flat probability.
  pub fn bit(&mut self) -> Result<u32, DecodeError> {
    self.bool(16384).map(u32::from)
  }

  /// Decodes an unsigned `bits`-wide value, most significant bit first.
  pub fn literal(&mut self, bits: u8) -> Result<u32, DecodeError> {
    let mut v = 0;
    for _ in 0..bits {
      v = (v << 1) | self.bit()?;
    }
    Ok(v)
  }

  /// Decodes an exp-golomb coded value.
  pub fn golomb(&mut self) -> Result<u32, DecodeError> {
    let mut length = 0;
    while self.bit()? == 0 {
      length += 1;
      if length > MAX_GOLOMB_LENGTH {
        return Err(DecodeError::InvalidGolomb);
      }
    }
    let mut x = 1;
    for _ in 0..length {
      x = (x << 1) | self.bit()?;
    }
    Ok(x - 1)
  }

  /// Decodes a symbol against an inverted CDF without adapting it. The
  /// last entry is the adaptation counter and acts as the terminating
  /// zero.
  pub fn symbol<const CDF_LEN: usize>(
    &mut self, icdf: &[u16; CDF_LEN],
  ) -> Result<u32, DecodeError> {
    let r = self.rng as u32;
    debug_assert!(self.dif >> (WINDOW_SIZE - 16) < r);
    debug_assert!(icdf[CDF_LEN - 1] < (1 << EC_PROB_SHIFT));
    let n = CDF_LEN as u32 - 1;
    let c = self.dif >> (WINDOW_SIZE - 16);
    let mut ret = 0u32;
    let mut u = r;
    let mut v = (((r >> 8) * (icdf[0] as u32 >> EC_PROB_SHIFT))
      >> (7 - EC_PROB_SHIFT))
      + EC_MIN_PROB * n;
    while c < v {
      u = v;
      ret += 1;
      v = (((r >> 8) * (icdf[ret as usize] as u32 >> EC_PROB_SHIFT))
        >> (7 - EC_PROB_SHIFT))
        + EC_MIN_PROB * (n - ret);
    }
    debug_assert!(v < u);
    debug_assert!(u <= r);
    let new_dif = self.dif - (v << (WINDOW_SIZE - 16));
    self.normalize(new_dif, u - v)?;
    Ok(ret)
  }

  /// Decodes a symbol and, unless adaptation is disabled for the frame,
  /// moves the CDF towards it.
  pub fn symbol_with_update<const CDF_LEN: usize>(
    &mut self, cdf: &mut [u16; CDF_LEN],
  ) -> Result<u32, DecodeError> {
    let s = self.symbol(cdf)?;
    if self.allow_update {
      update_cdf(cdf, s);
    }
    Ok(s)
  }
}

/// Adapts an inverted CDF after symbol `val` was coded.
#[inline]
pub fn update_cdf<const N: usize>(cdf: &mut [u16; N], val: u32) {
  let nsymbs = cdf.len();
  let mut rate = 3 + (nsymbs >> 1).min(2);
  if let Some(count) = cdf.last_mut() {
    rate += (*count >> 4) as usize;
    *count += 1 - (*count >> 5);
  } else {
    return;
  }
  for (i, v) in cdf[..nsymbs - 1].iter_mut().enumerate() {
    if i as u32 >= val {
      *v -= *v >> rate;
    } else {
      *v += (32768 - *v) >> rate;
    }
  }
}

/// Range encoder producing the format [`Reader`] consumes. Used to build
/// tile payloads for tests, benchmarks and tools.
#[derive(Debug, Clone)]
pub struct WriterEncoder {
  /// Output bytes with their carries still pending.
  precarry: Vec<u16>,
  /// The low end of the current range.
  low: ec_window,
  rng: u16,
  cnt: i16,
}

impl Default for WriterEncoder {
  fn default() -> Self {
    Self::new()
  }
}

impl WriterEncoder {
  pub const fn new() -> Self {
    WriterEncoder { precarry: Vec::new(), low: 0, rng: 0x8000, cnt: -9 }
  }

  /// Computes the low and range values for a token.
  const fn lr_compute(&self, fl: u16, fh: u16, nms: u16) -> (ec_window, u16) {
    let r = self.rng as u32;
    let mut u = (((r >> 8) * (fl as u32 >> EC_PROB_SHIFT))
      >> (7 - EC_PROB_SHIFT))
      + EC_MIN_PROB * nms as u32;
    if fl >= 32768 {
      u = r;
    }
    let v = (((r >> 8) * (fh as u32 >> EC_PROB_SHIFT)) >> (7 - EC_PROB_SHIFT))
      + EC_MIN_PROB * (nms - 1) as u32;
    (r - u, (u - v) as u16)
  }

  fn store(&mut self, fl: u16, fh: u16, nms: u16) {
    let (l, r) = self.lr_compute(fl, fh, nms);
    let mut low = l + self.low;
    let mut c = self.cnt;
    let d = r.leading_zeros() as usize;
    let mut s = c + (d as i16);

    if s >= 0 {
      c += 16;
      let mut m = (1 << c) - 1;
      if s >= 8 {
        self.precarry.push((low >> c) as u16);
        low &= m;
        c -= 8;
        m >>= 8;
      }
      self.precarry.push((low >> c) as u16);
      s = c + (d as i16) - 24;
      low &= m;
    }
    self.low = low << d;
    self.rng = r << d;
    self.cnt = s;
  }

  /// Encodes symbol `s` against an inverted CDF, leaving it unchanged.
  pub fn symbol<const CDF_LEN: usize>(&mut self, s: u32, cdf: &[u16; CDF_LEN]) {
    let s = s as usize;
    debug_assert!(s < CDF_LEN);
    let nms = CDF_LEN - s;
    let fl = if s > 0 { cdf[s - 1] } else { 32768 };
    let fh = cdf[s];
    self.store(fl, fh, nms as u16);
  }

  pub fn symbol_with_update<const CDF_LEN: usize>(
    &mut self, s: u32, cdf: &mut [u16; CDF_LEN],
  ) {
    self.symbol(s, cdf);
    update_cdf(cdf, s);
  }

  /// Encodes `val` where `f` is the probability of `true`, scaled by
  /// 32768.
  pub fn bool(&mut self, val: bool, f: u16) {
    debug_assert!(0 < f && f < 32768);
    self.symbol(u32::from(val), &[f, 0]);
  }

  pub fn bit(&mut self, bit: u16) {
    self.bool(bit == 1, 16384);
  }

  pub fn literal(&mut self, bits: u8, s: u32) {
    for bit in (0..bits).rev() {
      self.bit((1 & (s >> bit)) as u16);
    }
  }

  pub fn write_golomb(&mut self, level: u32) {
    let x = level + 1;
    let length = 32 - x.leading_zeros();

    for _ in 0..length - 1 {
      self.bit(0);
    }
    for i in (0..length).rev() {
      self.bit(((x >> i) & 0x01) as u16);
    }
  }

  /// Bits used so far, including the reserved termination bit.
  pub fn tell(&self) -> u32 {
    ((self.precarry.len() * 8) as i32 + self.cnt as i32 + 10) as u32
  }

  /// Flushes the coder and returns the finished bitstream, using the
  /// fewest bytes that decode to the coded symbols whatever follows.
  pub fn done(&mut self) -> Vec<u8> {
    let l = self.low;
    let mut c = self.cnt;
    let mut s = 10;
    let m = 0x3FFF;
    let mut e = ((l + m) & !m) | (m + 1);

    s += c;

    if s > 0 {
      let mut n = (1 << (c + 16)) - 1;

      loop {
        self.precarry.push((e >> (c + 16)) as u16);
        e &= n;
        s -= 8;
        c -= 8;
        n >>= 8;

        if s <= 0 {
          break;
        }
      }
    }

    let mut c = 0;
    let mut offs = self.precarry.len();
    let mut out = vec![0_u8; offs];
    while offs > 0 {
      offs -= 1;
      c += self.precarry[offs];
      out[offs] = c as u8;
      c >>= 8;
    }

    out
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::util::*;
  use rand::{Rng, SeedableRng};
  use rand_chacha::ChaChaRng;

  #[test]
  fn booleans() {
    let mut w = WriterEncoder::new();

    w.bool(false, 1);
    w.bool(true, 2);
    w.bool(false, 3);
    w.bool(true, 1);
    w.bool(true, 2);
    w.bool(false, 3);

    let b = w.done();

    let mut r = Reader::new(&b);

    assert!(!r.bool(1).unwrap());
    assert!(r.bool(2).unwrap());
    assert!(!r.bool(3).unwrap());
    assert!(r.bool(1).unwrap());
    assert!(r.bool(2).unwrap());
    assert!(!r.bool(3).unwrap());
  }

  #[test]
  fn fixed_cdf_symbols() {
    let cdf = [7296, 3819, 1716, 0];

    let mut w = WriterEncoder::new();
    for s in [0, 0, 0, 1, 1, 1, 2, 2, 2] {
      w.symbol(s, &cdf);
    }
    let b = w.done();

    let mut r = Reader::new(&b);
    for s in [0, 0, 0, 1, 1, 1, 2, 2, 2] {
      assert_eq!(r.symbol(&cdf).unwrap(), s);
    }
  }

  #[test]
  fn literal_vectors() {
    // eight repetitions of one value at each width
    let vectors: &[(u8, u32, &[u8])] = &[
      (1, 0, &[0, 128]),
      (1, 1, &[255, 128]),
      (2, 1, &[85, 118, 192]),
      (2, 2, &[170, 165, 128]),
      (2, 3, &[255, 255, 128]),
      (3, 1, &[36, 198, 146, 128]),
      (3, 5, &[182, 214, 219, 128]),
      (4, 1, &[17, 68, 34, 34, 128]),
      (4, 9, &[153, 147, 51, 51, 128]),
    ];
    for &(bits, value, bytes) in vectors {
      let mut w = WriterEncoder::new();
      for _ in 0..8 {
        w.literal(bits, value);
      }
      assert_eq!(w.done(), bytes);

      let mut r = Reader::new(bytes);
      for _ in 0..8 {
        assert_eq!(r.literal(bits).unwrap(), value);
      }
      assert!(r.tell() as usize <= bytes.len() * 8);
    }
  }

  #[test]
  fn adaptive_symbols_follow_encoder() {
    let mut rng = ChaChaRng::from_seed([7; 32]);
    let init: [u16; 5] = cdf([4096, 11264, 19456, 27648]);
    let symbols: Vec<u32> = (0..500).map(|_| rng.gen_range(0..5)).collect();

    let mut wcdf = init;
    let mut w = WriterEncoder::new();
    for &s in &symbols {
      w.symbol_with_update(s, &mut wcdf);
    }
    let b = w.done();

    let mut rcdf = init;
    let mut r = Reader::new(&b);
    for &s in &symbols {
      assert_eq!(r.symbol_with_update(&mut rcdf).unwrap(), s);
    }
    assert_eq!(rcdf, wcdf);
  }

  #[test]
  fn frozen_cdf_stays_put() {
    let init: [u16; 3] = cdf([8192, 24576]);
    let mut w = WriterEncoder::new();
    for s in [2, 1, 0, 2] {
      w.symbol(s, &init);
    }
    let b = w.done();

    let mut r = Reader::new(&b);
    r.set_cdf_update(false);
    let mut c = init;
    for s in [2, 1, 0, 2] {
      assert_eq!(r.symbol_with_update(&mut c).unwrap(), s);
    }
    assert_eq!(c, init);
  }

  #[test]
  fn golomb_values() {
    let values = [0, 1, 2, 14, 15, 300, 65535, (1 << 20) - 2];
    let mut w = WriterEncoder::new();
    for &v in &values {
      w.write_golomb(v);
    }
    let b = w.done();

    let mut r = Reader::new(&b);
    for &v in &values {
      assert_eq!(r.golomb().unwrap(), v);
    }
  }

  #[test]
  fn long_golomb_prefix_is_rejected() {
    let mut w = WriterEncoder::new();
    w.literal(24, 0);
    w.literal(8, 0xff);
    let b = w.done();

    let mut r = Reader::new(&b);
    assert_eq!(r.golomb(), Err(DecodeError::InvalidGolomb));
  }

  #[test]
  fn reading_past_the_end_fails() {
    let mut w = WriterEncoder::new();
    w.literal(8, 0xa5);
    let b = w.done();

    let mut r = Reader::new(&b);
    assert_eq!(r.literal(8).unwrap(), 0xa5);
    let mut res = Ok(0);
    for _ in 0..64 {
      res = r.bit();
      if res.is_err() {
        break;
      }
    }
    assert_eq!(res, Err(DecodeError::EndOfTile));

    assert_eq!(Reader::new(&[]).bit(), Err(DecodeError::EndOfTile));
  }

  #[test]
  fn update_cdf_moves_towards_symbol() {
    let mut c: [u16; 4] = cdf([8192, 16384, 24576]);
    update_cdf(&mut c, 0);
    // rate 5 on a fresh 4-symbol CDF
    assert_eq!(c, [23808, 15872, 7936, 1]);
  }

  quickcheck::quickcheck! {
    fn adapted_cdf_stays_monotone(symbols: Vec<u8>) -> bool {
      let mut c: [u16; 5] = cdf([4096, 11264, 19456, 27648]);
      symbols.into_iter().all(|s| {
        update_cdf(&mut c, (s % 5) as u32);
        c[..4].windows(2).all(|w| w[0] >= w[1]) && c[0] <= 32768
      })
    }
  }
}
