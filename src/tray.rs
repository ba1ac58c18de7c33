use crate::error::IconError;
use crate::platform;
use crate::types::TrayIconRecord;
use std::collections::HashSet;

/// Edge lengths a notification-area button may have, in pixels.
pub const TRAY_ITEM_MIN: i32 = 8;
pub const TRAY_ITEM_MAX: i32 = 64;

/// One way of finding notification-area icons. Strategies are tried in the
/// order the discoverer holds them.
pub trait TrayStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn discover(&self, size: u32) -> Result<Vec<TrayIconRecord>, IconError>;
}

/// Screen rectangle in `left, top, right, bottom` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Touching edges do not count.
    pub fn intersects(&self, other: &ScreenRect) -> bool {
        !(other.left >= self.right
            || other.right <= self.left
            || other.top >= self.bottom
            || other.bottom <= self.top)
    }

    pub fn is_icon_sized(&self) -> bool {
        let sized = |edge: i32| (TRAY_ITEM_MIN..=TRAY_ITEM_MAX).contains(&edge);
        sized(self.width()) && sized(self.height())
    }
}

/// Walks strategies until one yields records, then deduplicates.
pub struct TrayIconDiscoverer {
    strategies: Vec<Box<dyn TrayStrategy>>,
}

impl TrayIconDiscoverer {
    pub fn new(strategies: Vec<Box<dyn TrayStrategy>>) -> Self {
        Self { strategies }
    }

    /// Precise, window-enumeration and raw-API tiers on Windows; none elsewhere.
    pub fn native() -> Self {
        Self::new(platform::native_tray_strategies())
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Never fails: a missing taskbar or a failing tier just means fewer
    /// (possibly zero) records.
    pub fn discover(&self, size: u32) -> Vec<TrayIconRecord> {
        for strategy in &self.strategies {
            match strategy.discover(size) {
                Ok(records) => {
                    let records = dedup(records);
                    if !records.is_empty() {
                        tracing::debug!(tier = strategy.name(), count = records.len(), "tray icons found");
                        return records;
                    }
                    tracing::debug!(tier = strategy.name(), "tier found no tray icons");
                }
                Err(err) => tracing::debug!(tier = strategy.name(), %err, "tray tier failed"),
            }
        }
        Vec::new()
    }
}

/// Keeps the first successful record for each `(pid, title, tooltip)`.
pub fn dedup(records: Vec<TrayIconRecord>) -> Vec<TrayIconRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| record.icon.success())
        .filter(|record| {
            let (pid, title, tooltip) = record.dedup_key();
            seen.insert((pid, title.to_string(), tooltip.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(pid: u32, title: &str, tooltip: &str) -> TrayIconRecord {
        TrayIconRecord::new(
            RgbaImage::new(16, 16),
            format!("PID_{pid}"),
            0,
            16,
            pid,
            title.into(),
            tooltip.into(),
        )
    }

    struct Fixed {
        name: &'static str,
        result: fn() -> Result<Vec<TrayIconRecord>, IconError>,
        calls: Arc<AtomicUsize>,
    }

    impl TrayStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn discover(&self, _size: u32) -> Result<Vec<TrayIconRecord>, IconError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn tier(
        name: &'static str,
        result: fn() -> Result<Vec<TrayIconRecord>, IconError>,
    ) -> (Box<dyn TrayStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Fixed {
            name,
            result,
            calls: calls.clone(),
        };
        (Box::new(strategy), calls)
    }

    #[test]
    fn duplicates_collapse_to_one() {
        let out = dedup(vec![
            record(7, "Volume", "Speakers"),
            record(7, "Volume", "Speakers"),
            record(7, "Volume", "Muted"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn failed_records_are_dropped() {
        let failed = TrayIconRecord::new(RgbaImage::new(0, 0), "PID_1", 0, 16, 1, "".into(), "".into());
        assert!(dedup(vec![failed]).is_empty());
    }

    #[test]
    fn first_non_empty_tier_wins() {
        let (precise, precise_calls) = tier("precise", || Ok(Vec::new()));
        let (windows, windows_calls) = tier("window-enum", || Ok(vec![record(1, "a", "b")]));
        let (raw, raw_calls) = tier("raw-api", || Ok(vec![record(2, "c", "d")]));

        let found = TrayIconDiscoverer::new(vec![precise, windows, raw]).discover(16);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].process_id, 1);
        assert_eq!(precise_calls.load(Ordering::SeqCst), 1);
        assert_eq!(windows_calls.load(Ordering::SeqCst), 1);
        assert_eq!(raw_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_tiers_fall_through_to_empty() {
        let (a, _) = tier("precise", || Err(IconError::NativeApiFailure("no taskbar".into())));
        let (b, _) = tier("window-enum", || Ok(Vec::new()));
        assert!(TrayIconDiscoverer::new(vec![a, b]).discover(16).is_empty());
        assert!(TrayIconDiscoverer::new(Vec::new()).discover(16).is_empty());
    }

    #[test]
    fn rect_filters() {
        let area = ScreenRect::new(1000, 1040, 1200, 1080);
        let button = ScreenRect::new(1010, 1044, 1034, 1068);
        assert!(area.intersects(&button));
        assert!(button.is_icon_sized());

        let elsewhere = ScreenRect::new(0, 0, 24, 24);
        assert!(!area.intersects(&elsewhere));
        assert!(!ScreenRect::new(0, 0, 4, 24).is_icon_sized());
        assert!(!ScreenRect::new(0, 0, 80, 24).is_icon_sized());
        assert!(!area.intersects(&ScreenRect::new(1200, 1040, 1224, 1064)));
    }
}
