//! Radial falloff stamps and their cache.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::foundation::error::{HeatmapError, HeatmapResult};
use crate::foundation::math::unit_to_u8;

/// Largest stamp side accepted, in pixels.
pub const MAX_STAMP_SIDE: u32 = 8192;

/// `(normalized radius, opacity)` control points of the falloff curve.
const FALLOFF: [(f64, f64); 6] = [
    (0.0, 1.0),
    (0.2, 0.9),
    (0.4, 0.8),
    (0.6, 0.6),
    (0.8, 0.3),
    (1.0, 0.0),
];

/// Opacity at normalized distance `t` from the stamp center.
///
/// Piecewise linear through [`FALLOFF`]; slow decay near the center, fast near the edge.
pub fn falloff(t: f64) -> f64 {
    if t <= 0.0 {
        return 1.0;
    }
    for w in FALLOFF.windows(2) {
        let ((t0, o0), (t1, o1)) = (w[0], w[1]);
        if t <= t1 {
            return o0 + (o1 - o0) * ((t - t0) / (t1 - t0));
        }
    }
    0.0
}

/// Side length in pixels of the stamp for `(radius, blur)`: `ceil(2 * (radius + radius * blur))`.
pub fn stamp_side(radius: f64, blur: f64) -> HeatmapResult<u32> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(HeatmapError::validation(format!(
            "stamp radius must be > 0, got {radius}"
        )));
    }
    if !blur.is_finite() || !(0.0..=1.0).contains(&blur) {
        return Err(HeatmapError::validation(format!(
            "stamp blur must be in [0, 1], got {blur}"
        )));
    }
    let side = (2.0 * (radius + radius * blur)).ceil();
    if side > f64::from(MAX_STAMP_SIDE) {
        return Err(HeatmapError::validation(format!(
            "stamp side {side} exceeds {MAX_STAMP_SIDE}px"
        )));
    }
    Ok((side as u32).max(1))
}

/// Cache key for a stamp. Parameters are compared bit-for-bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StampKey {
    radius_bits: u64,
    blur_bits: u64,
}

impl StampKey {
    pub fn new(radius: f64, blur: f64) -> Self {
        Self {
            radius_bits: radius.to_bits(),
            blur_bits: blur.to_bits(),
        }
    }
}

/// Square alpha-only bitmap describing one point's falloff, centered in the bitmap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stamp {
    key: StampKey,
    side: u32,
    alpha: Vec<u8>,
}

impl Stamp {
    /// Rasterize the falloff for `(radius, blur)`.
    ///
    /// Each pixel is sampled at its center; opacity is `falloff(d / radius)` quantized to a
    /// byte. The extra `radius * blur` margin on every side is left for the halo and stays
    /// transparent past `radius`.
    pub fn build(radius: f64, blur: f64) -> HeatmapResult<Self> {
        let side = stamp_side(radius, blur)?;
        let n = side as usize;
        let center = f64::from(side) / 2.0;

        let mut alpha = vec![0u8; n * n];
        for (y, row) in alpha.chunks_exact_mut(n).enumerate() {
            let dy = y as f64 + 0.5 - center;
            for (x, a) in row.iter_mut().enumerate() {
                let dx = x as f64 + 0.5 - center;
                let t = (dx * dx + dy * dy).sqrt() / radius;
                *a = unit_to_u8(falloff(t));
            }
        }

        Ok(Self {
            key: StampKey::new(radius, blur),
            side,
            alpha,
        })
    }

    pub fn key(&self) -> StampKey {
        self.key
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Row-major alpha bytes, `side * side` long.
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.side || y >= self.side {
            return None;
        }
        self.alpha
            .get(y as usize * self.side as usize + x as usize)
            .copied()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StampCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub retained: usize,
}

/// Bounded cache of built stamps keyed by `(radius, blur)`.
///
/// Stamps are immutable once built and handed out as `Arc<Stamp>`, so they can be shared
/// with other threads. The cache itself is owned by one backend. A capacity of 0 disables
/// retention and every lookup rebuilds.
#[derive(Debug)]
pub struct StampCache {
    capacity: usize,
    stamps: HashMap<StampKey, Arc<Stamp>>,
    order: VecDeque<StampKey>,
    stats: StampCacheStats,
}

impl Default for StampCache {
    fn default() -> Self {
        Self::new(StampCache::DEFAULT_CAPACITY)
    }
}

impl StampCache {
    pub const DEFAULT_CAPACITY: usize = 4;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            stamps: HashMap::new(),
            order: VecDeque::new(),
            stats: StampCacheStats::default(),
        }
    }

    pub fn stats(&self) -> StampCacheStats {
        StampCacheStats {
            retained: self.stamps.len(),
            ..self.stats.clone()
        }
    }

    pub fn contains(&self, key: StampKey) -> bool {
        self.stamps.contains_key(&key)
    }

    pub fn get_or_build(&mut self, radius: f64, blur: f64) -> HeatmapResult<Arc<Stamp>> {
        let key = StampKey::new(radius, blur);
        if let Some(stamp) = self.stamps.get(&key) {
            self.stats.hits = self.stats.hits.saturating_add(1);
            tracing::trace!(radius, blur, "stamp cache hit");
            return Ok(Arc::clone(stamp));
        }

        self.stats.misses = self.stats.misses.saturating_add(1);
        let stamp = Arc::new(Stamp::build(radius, blur)?);
        tracing::debug!(radius, blur, side = stamp.side(), "built stamp");

        if self.capacity == 0 {
            return Ok(stamp);
        }
        while self.order.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.stamps.remove(&old);
                self.stats.evictions = self.stats.evictions.saturating_add(1);
            }
        }
        self.stamps.insert(stamp.key(), Arc::clone(&stamp));
        self.order.push_back(stamp.key());
        Ok(stamp)
    }

    /// Drop every cached stamp.
    pub fn invalidate(&mut self) {
        let dropped = self.stamps.len();
        self.stamps.clear();
        self.order.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "stamp cache invalidated");
        }
    }

    /// Drop every cached stamp whose key differs from `key`.
    pub fn retain_only(&mut self, key: StampKey) {
        self.stamps.retain(|k, _| *k == key);
        self.order.retain(|k| *k == key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falloff_hits_control_points() {
        for (t, o) in FALLOFF {
            assert!((falloff(t) - o).abs() < 1e-12, "t={t}");
        }
        assert!((falloff(0.1) - 0.95).abs() < 1e-12);
        assert!((falloff(0.7) - 0.45).abs() < 1e-12);
        assert_eq!(falloff(1.5), 0.0);
        assert_eq!(falloff(-1.0), 1.0);
    }

    #[test]
    fn falloff_is_monotonic() {
        let mut prev = falloff(0.0);
        for i in 1..=100 {
            let cur = falloff(i as f64 / 100.0);
            assert!(cur <= prev);
            prev = cur;
        }
    }

    #[test]
    fn side_rounds_up() {
        assert_eq!(stamp_side(25.0, 0.95).unwrap(), 98);
        assert_eq!(stamp_side(10.0, 0.0).unwrap(), 20);
        assert_eq!(stamp_side(0.1, 0.0).unwrap(), 1);
        assert!(stamp_side(0.0, 0.5).is_err());
        assert!(stamp_side(5.0, 1.5).is_err());
        assert!(stamp_side(1e9, 1.0).is_err());
    }

    #[test]
    fn stamp_is_centered_and_radially_decaying() {
        let s = Stamp::build(25.0, 0.95).unwrap();
        assert_eq!(s.side(), 98);
        assert_eq!(s.alpha().len(), 98 * 98);

        // Pixels around the center are near opaque.
        assert_eq!(s.get(48, 48), s.get(49, 49));
        assert!(s.get(49, 49).unwrap() >= 250);

        // Corners and the halo margin are beyond the radius.
        assert_eq!(s.get(0, 0), Some(0));
        assert_eq!(s.get(97, 97), Some(0));
        assert_eq!(s.get(2, 49), Some(0));

        // Symmetric on both axes.
        for y in 0..98 {
            for x in 0..98 {
                assert_eq!(s.get(x, y), s.get(97 - x, y));
                assert_eq!(s.get(x, y), s.get(x, 97 - y));
            }
        }

        assert_eq!(s.get(98, 0), None);
    }

    #[test]
    fn build_is_deterministic() {
        let a = Stamp::build(12.5, 0.3).unwrap();
        let b = Stamp::build(12.5, 0.3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cache_reuses_and_evicts() {
        let mut c = StampCache::new(1);
        let a = c.get_or_build(10.0, 0.5).unwrap();
        let b = c.get_or_build(10.0, 0.5).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.key(), StampKey::new(10.0, 0.5));
        assert!(c.contains(a.key()));
        assert_eq!(c.stats().hits, 1);
        assert_eq!(c.stats().misses, 1);

        c.get_or_build(11.0, 0.5).unwrap();
        let st = c.stats();
        assert_eq!(st.evictions, 1);
        assert_eq!(st.retained, 1);
        assert!(!c.contains(StampKey::new(10.0, 0.5)));
    }

    #[test]
    fn cache_capacity_zero_rebuilds() {
        let mut c = StampCache::new(0);
        c.get_or_build(10.0, 0.5).unwrap();
        c.get_or_build(10.0, 0.5).unwrap();
        let st = c.stats();
        assert_eq!(st.misses, 2);
        assert_eq!(st.retained, 0);
    }

    #[test]
    fn invalidation_is_explicit() {
        let mut c = StampCache::new(4);
        c.get_or_build(10.0, 0.5).unwrap();
        c.get_or_build(20.0, 0.5).unwrap();
        c.retain_only(StampKey::new(20.0, 0.5));
        assert!(!c.contains(StampKey::new(10.0, 0.5)));
        assert!(c.contains(StampKey::new(20.0, 0.5)));

        c.invalidate();
        assert_eq!(c.stats().retained, 0);
    }

    #[test]
    fn keys_compare_bitwise() {
        assert_eq!(StampKey::new(25.0, 0.95), StampKey::new(25.0, 0.95));
        assert_ne!(StampKey::new(25.0, 0.95), StampKey::new(25.0, 0.9500001));
        assert_ne!(StampKey::new(0.0, 0.5), StampKey::new(-0.0, 0.5));
    }
}
