//! Picture selection: weighted recency with throwbacks and anti-repeat history.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

use frunch_core::defaults::{
    MIN_REPEAT, PICTURE_INTERVAL_SECS, PICTURE_TIMEOUT_SECS, RECENT_WINDOW, THROWBACK_FREQUENCY,
    WEIGHT_WINDOW_DAYS,
};
use frunch_core::{
    describe_when, CatalogRepository, DisplayPicture, Error, ImageResolver, PictureRecord,
    PictureSink, Result,
};

use crate::geocode::GeocodeTrigger;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Smallest age used for weighting: one millisecond, in days.
const MIN_AGE_DAYS: f64 = 0.001 / SECONDS_PER_DAY;

/// Configuration for picture rotation.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Minimum time each picture stays on screen.
    pub interval: Duration,
    /// Upper bound on one rotation tick.
    pub timeout: Duration,
    /// History length `R`: pictures shown before one may repeat.
    pub min_repeat: usize,
    /// A throwback is attempted with probability `1 / throwback_frequency`.
    pub throwback_frequency: u32,
    /// Size `M` of the most-recently-added pool.
    pub recent_window: i64,
    /// Age `W` in days at which weight bottoms out at 1.
    pub weight_window_days: f64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(PICTURE_INTERVAL_SECS),
            timeout: Duration::from_secs(PICTURE_TIMEOUT_SECS),
            min_repeat: MIN_REPEAT,
            throwback_frequency: THROWBACK_FREQUENCY,
            recent_window: RECENT_WINDOW,
            weight_window_days: WEIGHT_WINDOW_DAYS,
        }
    }
}

impl RotationConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `PICTURE_INTERVAL_SECS` | `20` | Time per picture |
    /// | `PICTURE_TIMEOUT_SECS` | `60` | Tick timeout |
    /// | `MIN_REPEAT` | `10` | History length |
    /// | `THROWBACK_FREQUENCY` | `15` | One throwback every N picks on average |
    /// | `RECENT_WINDOW` | `50` | Recent pool size |
    /// | `WEIGHT_WINDOW_DAYS` | `5` | Age at which weight reaches 1 |
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.parse::<T>().ok())
        }

        let defaults = Self::default();
        Self {
            interval: var::<u64>("PICTURE_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            timeout: var::<u64>("PICTURE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            min_repeat: var("MIN_REPEAT").unwrap_or(defaults.min_repeat),
            throwback_frequency: var("THROWBACK_FREQUENCY").unwrap_or(defaults.throwback_frequency),
            recent_window: var("RECENT_WINDOW").unwrap_or(defaults.recent_window),
            weight_window_days: var("WEIGHT_WINDOW_DAYS").unwrap_or(defaults.weight_window_days),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_repeat(mut self, min_repeat: usize) -> Self {
        self.min_repeat = min_repeat;
        self
    }

    pub fn with_throwback_frequency(mut self, frequency: u32) -> Self {
        self.throwback_frequency = frequency;
        self
    }

    pub fn with_recent_window(mut self, window: i64) -> Self {
        self.recent_window = window;
        self
    }

    pub fn with_weight_window_days(mut self, days: f64) -> Self {
        self.weight_window_days = days;
        self
    }

    /// Reject settings the rotation loop cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.timeout <= self.interval {
            return Err(Error::Config(format!(
                "picture timeout ({:?}) must be longer than the picture interval ({:?})",
                self.timeout, self.interval
            )));
        }
        if self.min_repeat == 0 {
            return Err(Error::Config("MIN_REPEAT must be at least 1".to_string()));
        }
        if self.throwback_frequency == 0 {
            return Err(Error::Config(
                "THROWBACK_FREQUENCY must be at least 1".to_string(),
            ));
        }
        if self.recent_window <= 0 {
            return Err(Error::Config("RECENT_WINDOW must be positive".to_string()));
        }
        if !(self.weight_window_days.is_finite() && self.weight_window_days >= MIN_AGE_DAYS) {
            return Err(Error::Config(
                "WEIGHT_WINDOW_DAYS must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Selection weight of a picture `age_days` old.
///
/// `window / clamp(age, 1ms, window)`: a picture at half the window weighs 2,
/// anything at or beyond the window weighs 1.
pub fn recency_weight(age_days: f64, window_days: f64) -> f64 {
    let age = if age_days.is_nan() { window_days } else { age_days };
    window_days / age.max(MIN_AGE_DAYS).min(window_days)
}

/// Index of the first cumulative weight that meets or exceeds `draw`.
pub fn pick_weighted(cumulative: &[f64], draw: f64) -> Option<usize> {
    cumulative.iter().position(|&c| c >= draw)
}

/// Roll for a throwback with probability `1 / frequency`.
pub fn should_throwback<R: Rng>(rng: &mut R, frequency: u32) -> bool {
    frequency > 0 && rng.gen_range(0..frequency) == 0
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns rotation state: the current picture and the anti-repeat history.
pub struct PictureScheduler {
    catalog: Arc<dyn CatalogRepository>,
    resolver: Arc<dyn ImageResolver>,
    sink: Arc<dyn PictureSink>,
    geocoder: GeocodeTrigger,
    config: RotationConfig,
    current: RwLock<Option<DisplayPicture>>,
    history: Mutex<VecDeque<String>>,
    rng: Mutex<StdRng>,
}

impl PictureScheduler {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        resolver: Arc<dyn ImageResolver>,
        sink: Arc<dyn PictureSink>,
        geocoder: GeocodeTrigger,
        config: RotationConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog,
            resolver,
            sink,
            geocoder,
            history: Mutex::new(VecDeque::with_capacity(config.min_repeat + 1)),
            config,
            current: RwLock::new(None),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Use a deterministic random sequence.
    pub fn with_seed(self, seed: u64) -> Self {
        *lock(&self.rng) = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Pick the next picture, skipping any id in `exclude`.
    ///
    /// Returns `Error::NotFound` when nothing is eligible.
    #[instrument(skip(self, exclude), fields(subsystem = "rotation", component = "scheduler", op = "select_next"))]
    pub async fn select_next(&self, exclude: &[String]) -> Result<PictureRecord> {
        let throwback = should_throwback(&mut *lock(&self.rng), self.config.throwback_frequency);
        if throwback {
            if let Some(record) = self
                .catalog
                .random_older_than(self.config.recent_window, exclude)
                .await?
            {
                debug!(picture_id = %record.id, "Throwback selected");
                return Ok(record);
            }
            trace!("No throwback candidate, using recent pool");
        }

        let candidates = self
            .catalog
            .query_recent(self.config.recent_window, exclude)
            .await?;
        if candidates.is_empty() {
            return Err(Error::NotFound("no eligible picture".to_string()));
        }

        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        let mut total = 0.0;
        let cumulative: Vec<f64> = candidates
            .iter()
            .map(|record| {
                let age_days = (now - record.added_at as f64) / SECONDS_PER_DAY;
                total += recency_weight(age_days, self.config.weight_window_days);
                total
            })
            .collect();

        let draw = lock(&self.rng).gen_range(0.0..total);
        let index = pick_weighted(&cumulative, draw).unwrap_or(candidates.len() - 1);
        trace!(candidates = candidates.len(), index, "Weighted pick");

        candidates
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::Internal("weighted pick out of range".to_string()))
    }

    /// Decorate a record for viewers.
    ///
    /// A location still holding a pending marker is shown blank, and the
    /// geocode worker is nudged.
    pub async fn annotate(&self, record: PictureRecord) -> Result<DisplayPicture> {
        // Nudge before downloading so a failed download still gets it geocoded.
        let pending = record.has_pending_geocode();
        if pending {
            self.geocoder.resume();
        }

        let path = self.resolver.resolve(&record).await?;
        let when = describe_when(&record, Utc::now().timestamp());
        let location = if pending { None } else { record.location };

        Ok(DisplayPicture {
            id: record.id,
            author: record.author,
            location,
            path,
            when,
            added_at: record.added_at,
            taken_at: record.taken_at,
        })
    }

    /// Select and annotate the next picture, avoiding recent history.
    pub async fn next_picture(&self) -> Result<DisplayPicture> {
        let exclude = self.history();
        let record = self.select_next(&exclude).await?;
        self.annotate(record).await
    }

    /// Make `picture` current, record it in history, and publish it.
    pub async fn set_picture(&self, picture: DisplayPicture) {
        *self.current.write().await = Some(picture.clone());
        {
            let mut history = lock(&self.history);
            history.push_front(picture.id.clone());
            history.truncate(self.config.min_repeat);
        }
        self.sink.publish(&picture);
    }

    /// Picture currently on screen, for late joiners.
    pub async fn current(&self) -> Option<DisplayPicture> {
        self.current.read().await.clone()
    }

    /// Recently shown ids, most recent first.
    pub fn history(&self) -> Vec<String> {
        lock(&self.history).iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recency_weight_ratio() {
        let young = recency_weight(0.5, 5.0);
        let old = recency_weight(5.0, 5.0);
        assert_eq!(old, 1.0);
        assert_eq!(young / old, 10.0);
    }

    #[test]
    fn test_recency_weight_clamps() {
        assert_eq!(recency_weight(30.0, 5.0), 1.0);
        assert_eq!(recency_weight(0.0, 5.0), 5.0 / MIN_AGE_DAYS);
        // Clock skew can make a picture look added in the future.
        assert_eq!(recency_weight(-2.0, 5.0), 5.0 / MIN_AGE_DAYS);
        assert_eq!(recency_weight(f64::NAN, 5.0), 1.0);
    }

    #[test]
    fn test_pick_weighted_boundaries() {
        let cumulative = [10.0, 11.0, 12.0];
        assert_eq!(pick_weighted(&cumulative, 0.0), Some(0));
        assert_eq!(pick_weighted(&cumulative, 10.0), Some(0));
        assert_eq!(pick_weighted(&cumulative, 10.5), Some(1));
        assert_eq!(pick_weighted(&cumulative, 11.9), Some(2));
        assert_eq!(pick_weighted(&cumulative, 12.5), None);
    }

    #[test]
    fn test_weighted_sampling_matches_ratio() {
        let weights = [recency_weight(0.5, 5.0), recency_weight(5.0, 5.0)];
        let cumulative = [weights[0], weights[0] + weights[1]];
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0usize; 2];
        for _ in 0..100_000 {
            let draw = rng.gen_range(0.0..cumulative[1]);
            counts[pick_weighted(&cumulative, draw).unwrap()] += 1;
        }
        let ratio = counts[0] as f64 / counts[1] as f64;
        assert!((ratio - 10.0).abs() / 10.0 < 0.05, "ratio {}", ratio);
    }

    #[test]
    fn test_throwback_rate() {
        let mut rng = StdRng::seed_from_u64(11);
        let hits = (0..100_000)
            .filter(|_| should_throwback(&mut rng, 15))
            .count();
        let rate = hits as f64 / 100_000.0;
        assert!((rate - 1.0 / 15.0).abs() < 0.005, "rate {}", rate);
    }

    #[test]
    fn test_throwback_frequency_one_always_fires() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!((0..100).all(|_| should_throwback(&mut rng, 1)));
        assert!(!should_throwback(&mut rng, 0));
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        assert!(RotationConfig::default().validate().is_ok());

        let equal = RotationConfig::default()
            .with_interval(Duration::from_secs(60))
            .with_timeout(Duration::from_secs(60));
        assert!(matches!(equal.validate(), Err(Error::Config(_))));

        assert!(RotationConfig::default().with_min_repeat(0).validate().is_err());
        assert!(RotationConfig::default()
            .with_throwback_frequency(0)
            .validate()
            .is_err());
        assert!(RotationConfig::default()
            .with_recent_window(0)
            .validate()
            .is_err());
        assert!(RotationConfig::default()
            .with_weight_window_days(0.0)
            .validate()
            .is_err());
    }
}
