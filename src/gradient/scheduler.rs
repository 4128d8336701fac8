// ============================================================================
// GRADIENT SCHEDULER — per-card debounce, cancel-previous, generation tags
// ============================================================================
//
// Each card owns one slot. A request bumps the slot's generation, cancels
// whatever job is in flight for that card, and parks the new request until
// the debounce window has passed. Jobs run on the rayon pool and drop their
// result into a shared cell that `poll` drains, the same way background
// flattening is handed back to the UI thread. Results whose generation is
// not the slot's current one are discarded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use image::ImageError;

use super::render::{DEFAULT_QUALITY, GradientAsset, RenderOptions, generate_asset};
use crate::model::GradientConfig;
use crate::{log_err, log_info};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Clone, Debug, PartialEq)]
pub struct GradientRequest {
    pub config: GradientConfig,
    pub width: u32,
    pub height: u32,
}

type JobCell = Arc<Mutex<Option<Result<Option<GradientAsset>, ImageError>>>>;

struct Job {
    generation: u64,
    cancel: Arc<AtomicBool>,
    result: JobCell,
}

impl Job {
    fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<(GradientRequest, Instant)>,
    in_flight: Option<Job>,
    asset: Option<Arc<GradientAsset>>,
    /// Generation of the published asset.
    published: u64,
}

pub struct GradientScheduler {
    slots: HashMap<String, Slot>,
    debounce: Duration,
    quality: f64,
}

impl Default for GradientScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, DEFAULT_QUALITY)
    }
}

impl GradientScheduler {
    pub fn new(debounce: Duration, quality: f64) -> Self {
        Self {
            slots: HashMap::new(),
            debounce,
            quality,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Queue a render for `card_id`. Any in-flight job for the card is
    /// cancelled immediately; the new one starts once the debounce window
    /// measured from `now` has elapsed and [`poll`](Self::poll) is called.
    /// Returns the request's generation.
    pub fn request(
        &mut self,
        card_id: &str,
        config: GradientConfig,
        width: u32,
        height: u32,
        now: Instant,
    ) -> u64 {
        let due = now + self.debounce;
        let slot = self.slots.entry(card_id.to_string()).or_default();
        slot.generation += 1;
        if let Some(job) = slot.in_flight.take() {
            job.cancel();
            log_info!(
                "gradient: cancelled job gen {} for card {}",
                job.generation,
                card_id
            );
        }
        slot.pending = Some((
            GradientRequest {
                config,
                width,
                height,
            },
            due,
        ));
        slot.generation
    }

    /// Start due requests and publish finished jobs. Returns the ids of cards
    /// whose asset changed during this call.
    pub fn poll(&mut self, now: Instant) -> Vec<String> {
        let mut updated = Vec::new();
        let quality = self.quality;

        for (card_id, slot) in self.slots.iter_mut() {
            if let Some(job) = &slot.in_flight {
                let finished = job.result.try_lock().ok().and_then(|mut g| g.take());
                if let Some(result) = finished {
                    let generation = job.generation;
                    slot.in_flight = None;
                    match result {
                        Ok(Some(asset)) if generation == slot.generation => {
                            log_info!(
                                "gradient: published gen {} for card {} ({}x{}, {} bytes)",
                                generation,
                                card_id,
                                asset.width,
                                asset.height,
                                asset.byte_len()
                            );
                            slot.asset = Some(Arc::new(asset));
                            slot.published = generation;
                            updated.push(card_id.clone());
                        }
                        Ok(_) => {}
                        Err(e) => {
                            log_err!("gradient: encoding failed for card {}: {}", card_id, e);
                        }
                    }
                }
            }

            if slot.in_flight.is_none()
                && let Some((_, due)) = &slot.pending
                && *due <= now
                && let Some((request, _)) = slot.pending.take()
            {
                slot.in_flight = Some(spawn_job(card_id, slot.generation, request, quality));
            }
        }
        updated
    }

    /// Latest published asset for a card.
    pub fn asset(&self, card_id: &str) -> Option<Arc<GradientAsset>> {
        self.slots.get(card_id).and_then(|s| s.asset.clone())
    }

    /// Generation of the card's published asset, 0 if none.
    pub fn published_generation(&self, card_id: &str) -> u64 {
        self.slots.get(card_id).map_or(0, |s| s.published)
    }

    /// True when nothing is pending or running for any card.
    pub fn is_idle(&self) -> bool {
        self.slots
            .values()
            .all(|s| s.pending.is_none() && s.in_flight.is_none())
    }

    /// Cancel outstanding work for a card and release its asset.
    pub fn forget(&mut self, card_id: &str) {
        if let Some(slot) = self.slots.remove(card_id)
            && let Some(job) = slot.in_flight
        {
            job.cancel();
        }
    }

    /// Forget every card not in `keep`.
    pub fn retain(&mut self, keep: &[&str]) {
        let stale: Vec<String> = self
            .slots
            .keys()
            .filter(|id| !keep.contains(&id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.forget(&id);
        }
    }

    pub fn cancel_all(&mut self) {
        for slot in self.slots.values_mut() {
            slot.pending = None;
            if let Some(job) = slot.in_flight.take() {
                job.cancel();
            }
        }
    }
}

impl Drop for GradientScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn spawn_job(card_id: &str, generation: u64, request: GradientRequest, quality: f64) -> Job {
    let cancel = Arc::new(AtomicBool::new(false));
    let result: JobCell = Arc::new(Mutex::new(None));

    log_info!(
        "gradient: starting gen {} for card {} ({}x{})",
        generation,
        card_id,
        request.width,
        request.height
    );

    let opts = RenderOptions::with_quality(quality).with_cancel(cancel.clone());
    let cell = result.clone();
    rayon::spawn(move || {
        let out = generate_asset(&request.config, request.width, request.height, &opts);
        if let Ok(mut guard) = cell.lock() {
            *guard = Some(out);
        }
    });

    Job {
        generation,
        cancel,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::render::MAX_QUALITY;
    use crate::model::GradientMode;
    use std::thread;

    fn cfg(seed: i64) -> GradientConfig {
        GradientConfig {
            mode: GradientMode::SoftBezier,
            seed,
            ..GradientConfig::default()
        }
    }

    fn drain(s: &mut GradientScheduler, now: Instant) {
        for _ in 0..2000 {
            s.poll(now);
            if s.is_idle() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("scheduler never went idle");
    }

    #[test]
    fn nothing_starts_before_debounce() {
        let mut s = GradientScheduler::new(Duration::from_millis(100), 1.0);
        let t0 = Instant::now();
        s.request("a", cfg(1), 8, 8, t0);
        s.poll(t0 + Duration::from_millis(50));
        assert!(s.slots["a"].in_flight.is_none());
        assert!(s.slots["a"].pending.is_some());
        s.poll(t0 + Duration::from_millis(100));
        assert!(s.slots["a"].pending.is_none());
        drain(&mut s, t0 + Duration::from_millis(100));
        assert!(s.asset("a").is_some());
    }

    #[test]
    fn second_request_supersedes_first() {
        let mut s = GradientScheduler::new(Duration::ZERO, 1.0);
        let now = Instant::now();
        s.request("a", cfg(1), 32, 32, now);
        s.poll(now); // first job starts
        let generation = s.request("a", cfg(2), 32, 32, now);
        drain(&mut s, now);

        let expected = generate_asset(&cfg(2), 32, 32, &RenderOptions::with_quality(1.0))
            .unwrap()
            .unwrap();
        let published = s.asset("a").unwrap();
        assert_eq!(published.png, expected.png);
        assert_eq!(s.published_generation("a"), generation);
    }

    #[test]
    fn new_request_raises_in_flight_cancel_flag() {
        let mut s = GradientScheduler::new(Duration::ZERO, MAX_QUALITY);
        let now = Instant::now();
        s.request("a", cfg(1), 1200, 1200, now);
        s.poll(now);
        let first = s.slots["a"].in_flight.as_ref().unwrap().cancel.clone();
        assert!(!first.load(Ordering::Relaxed));

        let generation = s.request("a", cfg(2), 16, 16, now);
        assert!(first.load(Ordering::Relaxed));
        drain(&mut s, now);

        let expected = generate_asset(&cfg(2), 16, 16, &RenderOptions::with_quality(MAX_QUALITY))
            .unwrap()
            .unwrap();
        assert_eq!(s.asset("a").unwrap().png, expected.png);
        assert_eq!(s.published_generation("a"), generation);
    }

    #[test]
    fn requests_within_window_collapse() {
        let mut s = GradientScheduler::new(Duration::from_millis(10), 1.0);
        let t0 = Instant::now();
        s.request("a", cfg(1), 8, 8, t0);
        s.request("a", cfg(2), 8, 8, t0 + Duration::from_millis(5));
        s.request("a", cfg(3), 8, 8, t0 + Duration::from_millis(8));
        let later = t0 + Duration::from_millis(50);
        drain(&mut s, later);
        assert_eq!(s.published_generation("a"), 3);
    }

    #[test]
    fn cards_are_independent() {
        let mut s = GradientScheduler::new(Duration::ZERO, 1.0);
        let now = Instant::now();
        s.request("a", cfg(1), 8, 8, now);
        s.request("b", cfg(2), 8, 8, now);
        drain(&mut s, now);
        assert!(s.asset("a").is_some());
        assert!(s.asset("b").is_some());
        assert_ne!(s.asset("a").unwrap().png, s.asset("b").unwrap().png);
    }

    #[test]
    fn forget_releases_asset() {
        let mut s = GradientScheduler::new(Duration::ZERO, 1.0);
        let now = Instant::now();
        s.request("a", cfg(1), 8, 8, now);
        drain(&mut s, now);
        s.forget("a");
        assert!(s.asset("a").is_none());
        assert_eq!(s.published_generation("a"), 0);
    }

    #[test]
    fn retain_drops_stale_cards() {
        let mut s = GradientScheduler::new(Duration::ZERO, 1.0);
        let now = Instant::now();
        s.request("a", cfg(1), 8, 8, now);
        s.request("b", cfg(1), 8, 8, now);
        drain(&mut s, now);
        s.retain(&["b"]);
        assert!(s.asset("a").is_none());
        assert!(s.asset("b").is_some());
    }
}
