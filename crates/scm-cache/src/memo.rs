//! 模擬結果快取
//!
//! 模擬對相同輸入是決定性的，因此以 (配置, 情境) 的 JSON 作為鍵，
//! 重複查詢直接回傳先前的結果。

use scm_calc::{simulate, SimulationOutput};
use scm_core::{Result, ScenarioModifier, ScmError, SimConfig};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// 快取統計
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct CacheEntry {
    key: String,
    output: Arc<SimulationOutput>,
    last_used: u64,
}

/// 模擬結果快取
///
/// 容量用盡時淘汰最久未使用的項目。可在多執行緒間共用。
pub struct SimulationCache {
    entries: Mutex<HashMap<u64, CacheEntry>>,
    capacity: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SimulationCache {
    pub const DEFAULT_CAPACITY: usize = 16;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// 指定容量（至少 1）
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// 輸入的正規化鍵
    pub fn key_for(config: &SimConfig, scenarios: &[ScenarioModifier]) -> Result<String> {
        serde_json::to_string(&(config, scenarios))
            .map_err(|e| ScmError::ConfigIo(format!("無法序列化快取鍵: {}", e)))
    }

    fn fingerprint(key: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// 查詢快取，未命中時執行模擬並存入
    pub fn get_or_simulate(
        &self,
        config: &SimConfig,
        scenarios: &[ScenarioModifier],
    ) -> Result<Arc<SimulationOutput>> {
        let key = Self::key_for(config, scenarios)?;
        let fingerprint = Self::fingerprint(&key);

        if let Some(output) = self.lookup(fingerprint, &key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("快取命中 {:016x}", fingerprint);
            return Ok(output);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("快取未命中 {:016x}，執行模擬", fingerprint);

        // 模擬期間不持有鎖
        let output = Arc::new(simulate(config, scenarios)?);
        self.store(fingerprint, key, Arc::clone(&output));
        Ok(output)
    }

    fn lookup(&self, fingerprint: u64, key: &str) -> Option<Arc<SimulationOutput>> {
        let now = self.tick();
        let mut entries = self.lock();
        let entry = entries.get_mut(&fingerprint).filter(|e| e.key == key)?;
        entry.last_used = now;
        Some(Arc::clone(&entry.output))
    }

    fn store(&self, fingerprint: u64, key: String, output: Arc<SimulationOutput>) {
        let now = self.tick();
        let mut entries = self.lock();
        if !entries.contains_key(&fingerprint) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(fp, _)| *fp);
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                tracing::debug!("快取已滿，淘汰 {:016x}", oldest);
            }
        }
        entries.insert(
            fingerprint,
            CacheEntry {
                key,
                output,
                last_used: now,
            },
        );
    }

    /// 移除指定輸入的結果，回傳是否存在
    pub fn invalidate(&self, config: &SimConfig, scenarios: &[ScenarioModifier]) -> Result<bool> {
        let key = Self::key_for(config, scenarios)?;
        let fingerprint = Self::fingerprint(&key);
        let mut entries = self.lock();
        let present = entries.get(&fingerprint).is_some_and(|e| e.key == key);
        if present {
            entries.remove(&fingerprint);
        }
        Ok(present)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl Default for SimulationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::*;
    use scm_core::DateWindow;

    #[fixture]
    fn config() -> SimConfig {
        SimConfig::reference(2027)
    }

    fn delay(days: u32) -> Vec<ScenarioModifier> {
        let start = NaiveDate::from_ymd_opt(2027, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2027, 6, 30).unwrap();
        vec![ScenarioModifier::shipping_delay(
            DateWindow::new(start, end),
            vec![],
            days,
        )]
    }

    #[rstest]
    fn test_second_lookup_hits(config: SimConfig) {
        let cache = SimulationCache::new();
        let first = cache.get_or_simulate(&config, &[]).unwrap();
        let second = cache.get_or_simulate(&config, &[]).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[rstest]
    fn test_different_scenarios_are_separate_entries(config: SimConfig) {
        let cache = SimulationCache::new();
        let baseline = cache.get_or_simulate(&config, &[]).unwrap();
        let delayed = cache.get_or_simulate(&config, &delay(7)).unwrap();

        assert!(baseline.scenario.is_none());
        assert!(delayed.scenario.is_some());
        assert_eq!(baseline.baseline, delayed.baseline);
        assert_eq!(cache.len(), 2);
    }

    #[rstest]
    fn test_invalidate_and_clear(config: SimConfig) {
        let cache = SimulationCache::new();
        cache.get_or_simulate(&config, &[]).unwrap();

        assert!(cache.invalidate(&config, &[]).unwrap());
        assert!(!cache.invalidate(&config, &[]).unwrap());
        assert!(cache.is_empty());

        cache.get_or_simulate(&config, &[]).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);
    }

    #[rstest]
    fn test_capacity_evicts_least_recently_used(config: SimConfig) {
        let cache = SimulationCache::with_capacity(2);
        cache.get_or_simulate(&config, &[]).unwrap();
        cache.get_or_simulate(&config, &delay(3)).unwrap();
        // 讓基準成為最近使用
        cache.get_or_simulate(&config, &[]).unwrap();
        cache.get_or_simulate(&config, &delay(5)).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.invalidate(&config, &[]).unwrap());
        assert!(!cache.invalidate(&config, &delay(3)).unwrap());
    }

    #[test]
    fn test_invalid_config_is_not_cached() {
        let mut config = SimConfig::reference(2027);
        config.supplier.lot_size = 0;
        let cache = SimulationCache::new();

        assert!(cache.get_or_simulate(&config, &[]).is_err());
        assert!(cache.is_empty());
    }
}
