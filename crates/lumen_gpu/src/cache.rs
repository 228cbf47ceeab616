//! Visual asset cache
//!
//! Assets are keyed by the owning element and a per-element slot, created
//! lazily on first draw and reused while their [`ShapeDescriptor`] matches.
//! A sweep between frames frees every asset that has been idle for the
//! configured threshold and was not used during the current frame.
//!
//! ```text
//!   frame N:  get_or_create(key) ──hit──► touch(now, N)
//!                                └─miss─► allocate new ──ok──► free old, insert
//!                                                      └─err─► old kept, error returned
//!   between frames: sweep(now) ──► free where allocated && idle >= threshold && frame != N
//! ```
//!
//! The cache is not internally synchronised; its owner keeps it behind one
//! lock shared by the render pass and element disposal.

use std::collections::hash_map::Entry;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::asset::VisualAsset;
use crate::device::GraphicsDevice;
use crate::error::Result;
use crate::vertex::ShapeDescriptor;

/// Identifies one cached asset: owning element id plus a slot within it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey {
    pub owner: u64,
    pub slot: u32,
}

impl AssetKey {
    pub const fn new(owner: u64, slot: u32) -> Self {
        Self { owner, slot }
    }
}

/// Cache tuning
#[derive(Clone, Debug, PartialEq)]
pub struct CacheConfig {
    /// Minimum idle time before an asset may be freed
    pub idle_threshold: Duration,
    /// Minimum time between sweeps run by [`VisualAssetCache::maybe_sweep`]
    pub sweep_interval: Duration,
    /// Upper bound on frees per sweep, 0 for no bound
    pub max_frees_per_sweep: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(1),
            max_frees_per_sweep: 0,
        }
    }
}

/// Cumulative cache statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub allocations: u64,
    pub replacements: u64,
    pub failed_allocations: u64,
    pub swept: u64,
    pub released: u64,
}

/// Per-screen pool of GPU resources
pub struct VisualAssetCache {
    config: CacheConfig,
    assets: FxHashMap<AssetKey, VisualAsset>,
    frame: u64,
    last_sweep: Option<Instant>,
    stats: CacheStats,
}

impl VisualAssetCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            assets: FxHashMap::default(),
            frame: 0,
            last_sweep: None,
            stats: CacheStats::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CacheConfig) {
        self.config = config;
    }

    /// Start a new frame; returns its number
    pub fn begin_frame(&mut self) -> u64 {
        self.frame += 1;
        self.frame
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Return the asset for `key`, allocating it if missing, freed, or of a
    /// different shape. The asset is touched with `now` and the current frame.
    ///
    /// A failed allocation returns the error and leaves any existing asset
    /// for `key` untouched.
    pub fn get_or_create(
        &mut self,
        device: &dyn GraphicsDevice,
        key: AssetKey,
        shape: ShapeDescriptor,
        now: Instant,
    ) -> Result<&mut VisualAsset> {
        let frame = self.frame;
        let asset = match self.assets.entry(key) {
            Entry::Occupied(slot) if slot.get().matches(&shape) => {
                self.stats.hits += 1;
                slot.into_mut()
            }
            Entry::Occupied(mut slot) => {
                let fresh = match VisualAsset::allocate(device, shape, now, frame) {
                    Ok(asset) => asset,
                    Err(err) => {
                        self.stats.failed_allocations += 1;
                        tracing::warn!("asset {:?} reallocation failed: {}", key, err);
                        return Err(err);
                    }
                };
                let mut old = slot.insert(fresh);
                if old.free(device) {
                    self.stats.replacements += 1;
                }
                self.stats.allocations += 1;
                slot.into_mut()
            }
            Entry::Vacant(slot) => {
                let fresh = match VisualAsset::allocate(device, shape, now, frame) {
                    Ok(asset) => asset,
                    Err(err) => {
                        self.stats.failed_allocations += 1;
                        tracing::warn!("asset {:?} allocation failed: {}", key, err);
                        return Err(err);
                    }
                };
                self.stats.allocations += 1;
                slot.insert(fresh)
            }
        };
        asset.touch(now, frame);
        Ok(asset)
    }

    pub fn get(&self, key: AssetKey) -> Option<&VisualAsset> {
        self.assets.get(&key)
    }

    /// Mark an existing asset as used without reallocating it
    pub fn touch(&mut self, key: AssetKey, now: Instant) -> bool {
        let frame = self.frame;
        match self.assets.get_mut(&key) {
            Some(asset) => {
                asset.touch(now, frame);
                true
            }
            None => false,
        }
    }

    /// Free and forget one asset
    pub fn release(&mut self, device: &dyn GraphicsDevice, key: AssetKey) -> bool {
        match self.assets.remove(&key) {
            Some(mut asset) => {
                let freed = asset.free(device);
                if freed {
                    self.stats.released += 1;
                }
                freed
            }
            None => false,
        }
    }

    /// Free and forget every asset of one element. Returns the number freed.
    pub fn release_owner(&mut self, device: &dyn GraphicsDevice, owner: u64) -> usize {
        let mut freed = 0;
        self.assets.retain(|key, asset| {
            if key.owner != owner {
                return true;
            }
            if asset.free(device) {
                freed += 1;
            }
            false
        });
        self.stats.released += freed as u64;
        if freed > 0 {
            tracing::debug!("released {} assets of element {}", freed, owner);
        }
        freed
    }

    /// Free every asset eligible for deletion at `now`, up to the configured
    /// per-sweep budget. Freed entries stay in the map, deallocated.
    pub fn sweep(&mut self, device: &dyn GraphicsDevice, now: Instant) -> usize {
        let frame = self.frame;
        let threshold = self.config.idle_threshold;
        let budget = match self.config.max_frees_per_sweep {
            0 => usize::MAX,
            limit => limit,
        };

        let mut freed = 0;
        for asset in self.assets.values_mut() {
            if freed >= budget {
                break;
            }
            if asset.can_be_deleted(now, frame, threshold) && asset.free(device) {
                freed += 1;
            }
        }

        self.last_sweep = Some(now);
        self.stats.swept += freed as u64;
        if freed > 0 {
            tracing::debug!(
                "asset sweep freed {} (live {}, {} bytes)",
                freed,
                self.live_assets(),
                self.allocated_bytes()
            );
        }
        freed
    }

    /// Sweep if at least `sweep_interval` has passed since the last sweep
    pub fn maybe_sweep(&mut self, device: &dyn GraphicsDevice, now: Instant) -> usize {
        let due = match self.last_sweep {
            Some(last) => now.saturating_duration_since(last) >= self.config.sweep_interval,
            None => true,
        };
        if due {
            self.sweep(device, now)
        } else {
            0
        }
    }

    /// Free and forget everything
    pub fn free_all(&mut self, device: &dyn GraphicsDevice) -> usize {
        let mut freed = 0;
        for (_, mut asset) in self.assets.drain() {
            if asset.free(device) {
                freed += 1;
            }
        }
        self.stats.released += freed as u64;
        freed
    }

    /// Number of entries, allocated or not
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Number of allocated assets
    pub fn live_assets(&self) -> usize {
        self.assets.values().filter(|a| a.is_allocated()).count()
    }

    /// Device memory held by allocated assets
    pub fn allocated_bytes(&self) -> usize {
        self.assets.values().map(VisualAsset::byte_size).sum()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Default for VisualAssetCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessDevice;
    use crate::vertex::{PrimitiveType, VertexFormat};

    fn quad() -> ShapeDescriptor {
        ShapeDescriptor::vertices(6, VertexFormat::PositionColored, PrimitiveType::TriangleList)
    }

    #[test]
    fn test_hit_reuses_asset() {
        let device = HeadlessDevice::new(100, 100);
        let mut cache = VisualAssetCache::default();
        let key = AssetKey::new(1, 0);
        let now = Instant::now();

        let first = cache.get_or_create(&device, key, quad(), now).unwrap().buffer();
        let second = cache.get_or_create(&device, key, quad(), now).unwrap().buffer();
        assert_eq!(first, second);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(device.counters().buffers_created, 1);
    }

    #[test]
    fn test_shape_change_replaces_asset() {
        let device = HeadlessDevice::new(100, 100);
        let mut cache = VisualAssetCache::default();
        let key = AssetKey::new(1, 0);
        let now = Instant::now();

        cache.get_or_create(&device, key, quad(), now).unwrap();
        let bigger = ShapeDescriptor::vertices(
            12,
            VertexFormat::PositionColored,
            PrimitiveType::TriangleList,
        );
        cache.get_or_create(&device, key, bigger, now).unwrap();

        assert_eq!(device.live_buffers(), 1);
        assert_eq!(device.counters().buffers_destroyed, 1);
        assert_eq!(cache.get(key).and_then(|a| a.shape().copied()), Some(bigger));
        assert_eq!(cache.stats().replacements, 1);
    }

    #[test]
    fn test_failed_reallocation_keeps_old_asset() {
        let device = HeadlessDevice::new(100, 100);
        let mut cache = VisualAssetCache::default();
        let key = AssetKey::new(7, 0);
        let now = Instant::now();

        let old = cache.get_or_create(&device, key, quad(), now).unwrap().buffer();
        device.fail_texture_allocations(1);
        let err = cache.get_or_create(&device, key, quad().with_texture(10, 10), now);
        assert!(err.is_err());

        let kept = cache.get(key).unwrap();
        assert!(kept.is_allocated());
        assert_eq!(kept.buffer(), old);
        assert_eq!(device.live_buffers(), 1);
        assert_eq!(cache.stats().failed_allocations, 1);
    }

    #[test]
    fn test_sweep_respects_threshold_and_frame() {
        let device = HeadlessDevice::new(100, 100);
        let mut cache = VisualAssetCache::default();
        let t0 = Instant::now();

        cache.begin_frame();
        cache.get_or_create(&device, AssetKey::new(1, 0), quad(), t0).unwrap();
        cache.get_or_create(&device, AssetKey::new(2, 0), quad(), t0).unwrap();

        cache.begin_frame();
        let later = t0 + Duration::from_secs(5);
        // Asset 2 is used again in this frame, so only asset 1 goes
        cache.touch(AssetKey::new(2, 0), t0);
        assert_eq!(cache.sweep(&device, later), 1);
        assert!(!cache.get(AssetKey::new(1, 0)).unwrap().is_allocated());
        assert!(cache.get(AssetKey::new(2, 0)).unwrap().is_allocated());

        // Not touched in the next frame: goes too
        cache.begin_frame();
        assert_eq!(cache.sweep(&device, later), 1);
        assert_eq!(cache.live_assets(), 0);
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn test_freed_asset_is_reallocated_on_use() {
        let device = HeadlessDevice::new(100, 100);
        let mut cache = VisualAssetCache::default();
        let key = AssetKey::new(3, 0);
        let t0 = Instant::now();

        cache.begin_frame();
        cache.get_or_create(&device, key, quad(), t0).unwrap();
        cache.begin_frame();
        cache.sweep(&device, t0 + Duration::from_secs(6));
        assert_eq!(cache.live_assets(), 0);

        let asset = cache
            .get_or_create(&device, key, quad(), t0 + Duration::from_secs(7))
            .unwrap();
        assert!(asset.is_allocated());
        assert_eq!(device.counters().buffers_created, 2);
    }

    #[test]
    fn test_sweep_budget() {
        let device = HeadlessDevice::new(100, 100);
        let mut cache = VisualAssetCache::new(CacheConfig {
            max_frees_per_sweep: 2,
            ..CacheConfig::default()
        });
        let t0 = Instant::now();
        for owner in 0..5 {
            cache.get_or_create(&device, AssetKey::new(owner, 0), quad(), t0).unwrap();
        }
        cache.begin_frame();
        let later = t0 + Duration::from_secs(10);
        assert_eq!(cache.sweep(&device, later), 2);
        assert_eq!(cache.sweep(&device, later), 2);
        assert_eq!(cache.sweep(&device, later), 1);
        assert_eq!(cache.live_assets(), 0);
    }

    #[test]
    fn test_maybe_sweep_cadence() {
        let device = HeadlessDevice::new(100, 100);
        let mut cache = VisualAssetCache::new(CacheConfig {
            idle_threshold: Duration::ZERO,
            sweep_interval: Duration::from_secs(1),
            max_frees_per_sweep: 0,
        });
        let t0 = Instant::now();
        cache.get_or_create(&device, AssetKey::new(1, 0), quad(), t0).unwrap();
        cache.begin_frame();

        assert_eq!(cache.maybe_sweep(&device, t0), 1);
        cache.get_or_create(&device, AssetKey::new(1, 0), quad(), t0).unwrap();
        cache.begin_frame();
        assert_eq!(cache.maybe_sweep(&device, t0 + Duration::from_millis(500)), 0);
        assert_eq!(cache.maybe_sweep(&device, t0 + Duration::from_secs(1)), 1);
    }

    #[test]
    fn test_release_owner() {
        let device = HeadlessDevice::new(100, 100);
        let mut cache = VisualAssetCache::default();
        let now = Instant::now();
        cache.get_or_create(&device, AssetKey::new(1, 0), quad(), now).unwrap();
        cache.get_or_create(&device, AssetKey::new(1, 1), quad(), now).unwrap();
        cache.get_or_create(&device, AssetKey::new(2, 0), quad(), now).unwrap();

        assert_eq!(cache.release_owner(&device, 1), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(device.live_buffers(), 1);
        assert_eq!(cache.free_all(&device), 1);
        assert!(cache.is_empty());
    }
}
