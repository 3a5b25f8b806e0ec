//! Signal particles travelling along edges.
//!
//! Particles are decoration: they carry no information beyond edge importance and
//! highlight state. A single repeating tick (400 ms while a unit is selected, 1000 ms
//! otherwise) picks candidate edges and spawns particles into a [`ParticleSet`]:
//!
//! - **selection regime**: every highlighted edge gets three pulses, 200 ms apart,
//!   each lasting `500 + 800 × (1 - importance)` ms;
//! - **ambient regime**: each edge is sampled with probability 0.06 and gets one
//!   particle lasting `1500 + 2000 × (1 - importance)` ms.
//!
//! A particle is retired at `spawn + duration`; any batch still around 5000 ms after
//! it was spawned is swept regardless. Selection changes only retarget the next tick,
//! particles already in flight keep flying. The loop wakes at least every 400 ms, so
//! a unit selected during an idle wait gets its first pulses within that interval.
//!
//! [`plan_tick`] is pure and takes the random source as a parameter, so the sampling
//! is reproducible with a seeded generator. [`AnimationScheduler::start`] runs the
//! tick loop on a tokio task and hands back an [`AnimationHandle`]. The loop ends
//! and drops pending particles when the visualization is unmounted.
//! [`AnimationHandle::stop`] does the same on demand; dropping the handle only
//! cancels the task.
//!
//! # Examples
//!
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use synapse_viz::animation::{plan_tick, AnimationConfig, ParticleSet};
//! use synapse_viz::{Architecture, LayerBuilder, LayerType, LayoutConfig, Scene, SelectionState, UnitId, Viewport};
//!
//! let arch = Architecture::new("t")
//!     .with_layer(LayerBuilder::new("a", LayerType::Input).neurons(2).build())
//!     .with_layer(LayerBuilder::new("b", LayerType::Output).neurons(2).build());
//! let scene = Scene::build(&arch, Viewport::default(), &LayoutConfig::default());
//!
//! let mut selection = SelectionState::default();
//! selection.toggle_unit(UnitId::new(0, 0), "a");
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let planned = plan_tick(&scene, &selection, &mut rng, 0, &AnimationConfig::default());
//! // two highlighted edges, three pulses each
//! assert_eq!(planned.len(), 6);
//!
//! let mut set = ParticleSet::new();
//! set.insert_batch(0, planned);
//! assert_eq!(set.retire(5_000), 6);
//! ```

use crate::events::{EventBroadcaster, VizEvent};
use crate::interaction::Visualization;
use crate::scene::Scene;
use crate::selection::SelectionState;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Timing and sampling parameters of the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Tick interval while a unit is selected.
    pub selected_interval_ms: u64,
    /// Tick interval otherwise.
    pub idle_interval_ms: u64,
    /// Probability that an edge gets an ambient particle on a tick.
    pub ambient_sample_rate: f64,
    /// Pulses spawned per highlighted edge.
    pub pulses_per_edge: u32,
    /// Delay between consecutive pulses on one edge.
    pub pulse_stagger_ms: u64,
    /// Shortest highlighted travel time.
    pub highlighted_base_ms: u64,
    /// Extra highlighted travel time at zero importance.
    pub highlighted_spread_ms: u64,
    /// Shortest ambient travel time.
    pub ambient_base_ms: u64,
    /// Extra ambient travel time at zero importance.
    pub ambient_spread_ms: u64,
    /// Age after which a batch is swept unconditionally.
    pub sweep_after_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            selected_interval_ms: 400,
            idle_interval_ms: 1000,
            ambient_sample_rate: 0.06,
            pulses_per_edge: 3,
            pulse_stagger_ms: 200,
            highlighted_base_ms: 500,
            highlighted_spread_ms: 800,
            ambient_base_ms: 1500,
            ambient_spread_ms: 2000,
            sweep_after_ms: 5000,
        }
    }
}

impl AnimationConfig {
    /// Interval until the next tick.
    pub fn tick_interval(&self, unit_selected: bool) -> Duration {
        Duration::from_millis(if unit_selected {
            self.selected_interval_ms
        } else {
            self.idle_interval_ms
        })
    }

    /// Travel time for a particle on an edge of the given importance.
    ///
    /// ```
    /// use synapse_viz::animation::AnimationConfig;
    ///
    /// let config = AnimationConfig::default();
    /// assert_eq!(config.duration_ms(1.0, true), 500);
    /// assert_eq!(config.duration_ms(0.0, true), 1300);
    /// assert_eq!(config.duration_ms(0.5, false), 2500);
    /// ```
    pub fn duration_ms(&self, importance: f64, highlighted: bool) -> u64 {
        let (base, spread) = if highlighted {
            (self.highlighted_base_ms, self.highlighted_spread_ms)
        } else {
            (self.ambient_base_ms, self.ambient_spread_ms)
        };
        let slack = 1.0 - importance.clamp(0.0, 1.0);
        base + (slack * spread as f64).round() as u64
    }

    /// Checks the parameters for values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.selected_interval_ms == 0 || self.idle_interval_ms == 0 {
            return Err("tick intervals must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.ambient_sample_rate) {
            return Err(format!(
                "ambient_sample_rate must be within [0, 1], got {}",
                self.ambient_sample_rate
            ));
        }
        let longest = self.ambient_base_ms + self.ambient_spread_ms;
        let longest_pulse = self.highlighted_base_ms
            + self.highlighted_spread_ms
            + self.pulse_stagger_ms * u64::from(self.pulses_per_edge.saturating_sub(1));
        if self.sweep_after_ms < longest.max(longest_pulse) {
            return Err("sweep_after_ms must outlast the longest particle".to_string());
        }
        Ok(())
    }
}

/// One transient marker travelling along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Identifier, unique within a [`ParticleSet`]. Zero until inserted.
    pub id: u64,
    /// Index into [`Scene::edges`].
    pub edge: usize,
    /// When the particle leaves the source unit.
    pub spawn_ms: u64,
    /// Travel time to the target unit.
    pub duration_ms: u64,
    /// Spawned for a highlighted edge.
    pub highlighted: bool,
    /// Batch (tick) the particle belongs to. Zero until inserted.
    pub batch: u64,
}

impl Particle {
    /// When the particle reaches its target and is retired.
    pub fn end_ms(&self) -> u64 {
        self.spawn_ms + self.duration_ms
    }

    /// Fraction of the edge covered at `now_ms`, or `None` outside the flight window.
    pub fn progress(&self, now_ms: u64) -> Option<f64> {
        if now_ms < self.spawn_ms || now_ms >= self.end_ms() || self.duration_ms == 0 {
            return None;
        }
        Some((now_ms - self.spawn_ms) as f64 / self.duration_ms as f64)
    }
}

/// A particle resolved to a screen position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderedParticle {
    /// Particle id.
    pub id: u64,
    /// Edge index.
    pub edge: usize,
    /// Current x.
    pub x: f64,
    /// Current y.
    pub y: f64,
    /// Fraction of the edge covered.
    pub progress: f64,
    /// Spawned for a highlighted edge.
    pub highlighted: bool,
}

/// Chooses the particles to spawn on a tick.
///
/// With a unit selected, every highlighted edge receives `pulses_per_edge` staggered
/// pulses. Otherwise each edge is sampled independently at `ambient_sample_rate`.
pub fn plan_tick<R: Rng + ?Sized>(
    scene: &Scene,
    selection: &SelectionState,
    rng: &mut R,
    now_ms: u64,
    config: &AnimationConfig,
) -> Vec<Particle> {
    let mut planned = Vec::new();
    if selection.selected_unit().is_some() {
        for (index, edge) in scene.edges.iter().enumerate() {
            if !selection.is_edge_highlighted(edge) {
                continue;
            }
            let duration_ms = config.duration_ms(edge.importance, true);
            for pulse in 0..u64::from(config.pulses_per_edge) {
                planned.push(Particle {
                    id: 0,
                    edge: index,
                    spawn_ms: now_ms + pulse * config.pulse_stagger_ms,
                    duration_ms,
                    highlighted: true,
                    batch: 0,
                });
            }
        }
    } else {
        let rate = config.ambient_sample_rate.clamp(0.0, 1.0);
        for (index, edge) in scene.edges.iter().enumerate() {
            if rng.random_bool(rate) {
                planned.push(Particle {
                    id: 0,
                    edge: index,
                    spawn_ms: now_ms,
                    duration_ms: config.duration_ms(edge.importance, false),
                    highlighted: false,
                    batch: 0,
                });
            }
        }
    }
    planned
}

/// The renderable set of particles, grouped in batches by tick.
#[derive(Debug)]
pub struct ParticleSet {
    epoch: Instant,
    particles: Vec<Particle>,
    batches: HashMap<u64, u64>,
    sweep_after_ms: u64,
    next_id: u64,
    next_batch: u64,
}

impl ParticleSet {
    /// Creates an empty set whose clock starts now.
    pub fn new() -> Self {
        Self::with_sweep(AnimationConfig::default().sweep_after_ms)
    }

    /// Creates an empty set with a custom sweep age.
    pub fn with_sweep(sweep_after_ms: u64) -> Self {
        Self {
            epoch: Instant::now(),
            particles: Vec::new(),
            batches: HashMap::new(),
            sweep_after_ms,
            next_id: 1,
            next_batch: 1,
        }
    }

    /// Milliseconds since the set was created, on the tokio clock.
    pub fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Adds the particles of one tick. Returns the batch id.
    pub fn insert_batch(&mut self, now_ms: u64, planned: Vec<Particle>) -> u64 {
        let batch = self.next_batch;
        self.next_batch += 1;
        self.batches.insert(batch, now_ms);
        for mut particle in planned {
            particle.id = self.next_id;
            particle.batch = batch;
            self.next_id += 1;
            self.particles.push(particle);
        }
        batch
    }

    /// Removes finished particles and sweeps expired batches. Returns how many
    /// particles were removed.
    pub fn retire(&mut self, now_ms: u64) -> usize {
        let sweep = self.sweep_after_ms;
        let batches = &self.batches;
        let before = self.particles.len();
        self.particles.retain(|p| {
            let swept = batches
                .get(&p.batch)
                .is_none_or(|&spawned| spawned + sweep <= now_ms);
            p.end_ms() > now_ms && !swept
        });
        self.batches.retain(|_, &mut spawned| spawned + sweep > now_ms);
        before - self.particles.len()
    }

    /// Particles in flight at `now_ms`, positioned on their edges. Particles whose
    /// edge no longer exists in `scene` are skipped.
    pub fn renderable(&self, now_ms: u64, scene: &Scene) -> Vec<RenderedParticle> {
        self.particles
            .iter()
            .filter_map(|p| {
                let progress = p.progress(now_ms)?;
                let edge = scene.edges.get(p.edge)?;
                let (s, t) = (scene.unit(edge.source)?, scene.unit(edge.target)?);
                Some(RenderedParticle {
                    id: p.id,
                    edge: p.edge,
                    x: s.x + (t.x - s.x) * progress,
                    y: s.y + (t.y - s.y) * progress,
                    progress,
                    highlighted: p.highlighted,
                })
            })
            .collect()
    }

    /// All particles, including ones waiting for their staggered start.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Number of live batches.
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Number of particles held.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether no particles are held.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Drops every particle and batch.
    pub fn clear(&mut self) {
        self.particles.clear();
        self.batches.clear();
    }
}

impl Default for ParticleSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Particle set shared between the scheduler task and readers.
pub type SharedParticles = Arc<RwLock<ParticleSet>>;

/// Starts and owns the tick loop.
#[derive(Debug, Clone, Default)]
pub struct AnimationScheduler {
    config: AnimationConfig,
}

impl AnimationScheduler {
    /// Creates a scheduler with the given parameters.
    pub fn new(config: AnimationConfig) -> Self {
        Self { config }
    }

    /// The scheduler parameters.
    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Spawns the tick loop on the current tokio runtime.
    ///
    /// The task only reads `viz`; it writes nothing but `particles`. Events are
    /// broadcast when a broadcaster is given. Once `viz` is unmounted the loop
    /// clears `particles` and ends.
    pub fn start<R>(
        &self,
        viz: Arc<RwLock<Visualization>>,
        particles: SharedParticles,
        broadcaster: Option<EventBroadcaster>,
        mut rng: R,
    ) -> AnimationHandle
    where
        R: Rng + Send + 'static,
    {
        let config = self.config.clone();
        let task_particles = Arc::clone(&particles);
        let task = tokio::spawn(async move {
            log::debug!("Animation scheduler started");
            let poll = config.tick_interval(true);
            let mut last_tick = Instant::now();
            loop {
                let selected = {
                    let viz = viz.read().await;
                    if !viz.is_mounted() {
                        break;
                    }
                    viz.selection().selected_unit().is_some()
                };

                // Wake at least every selected interval so a new selection is
                // picked up without waiting out an idle interval.
                let due = last_tick + config.tick_interval(selected);
                let now = Instant::now();
                if now < due {
                    tokio::time::sleep_until(due.min(now + poll)).await;
                    continue;
                }
                last_tick = now;

                // viz stays read-locked until the batch is in, so an architecture
                // swap cannot clear the set between planning and insertion.
                let (now_ms, count, highlighted, retired, batch) = {
                    let viz = viz.read().await;
                    let Some(scene) = viz.scene() else {
                        break;
                    };
                    let mut set = task_particles.write().await;
                    let now_ms = set.elapsed_ms();
                    let planned = plan_tick(scene, viz.selection(), &mut rng, now_ms, &config);
                    let highlighted = planned.first().is_some_and(|p| p.highlighted);
                    let count = planned.len();
                    let retired = set.retire(now_ms);
                    let batch = (count > 0).then(|| set.insert_batch(now_ms, planned));
                    (now_ms, count, highlighted, retired, batch)
                };

                if let Some(broadcaster) = &broadcaster {
                    if let Some(batch) = batch {
                        broadcaster
                            .broadcast(VizEvent::ParticlesSpawned {
                                batch,
                                count,
                                highlighted,
                            })
                            .await;
                    }
                    if retired > 0 {
                        broadcaster.broadcast(VizEvent::ParticlesRetired { count: retired }).await;
                    }
                }
                log::trace!("Animation tick at {}ms: +{} -{}", now_ms, count, retired);
            }
            task_particles.write().await.clear();
            log::debug!("Animation scheduler stopped: visualization unmounted");
        });

        AnimationHandle {
            task: Some(task),
            particles,
        }
    }
}

/// Owner's handle on a running tick loop.
///
/// Dropping the handle aborts the task; [`stop`](Self::stop) additionally drops
/// the particles still in flight.
#[derive(Debug)]
pub struct AnimationHandle {
    task: Option<JoinHandle<()>>,
    particles: SharedParticles,
}

impl AnimationHandle {
    /// Whether the tick loop is still scheduled.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// The particle set the loop writes into.
    pub fn particles(&self) -> &SharedParticles {
        &self.particles
    }

    /// Cancels the tick loop and releases all pending particles.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        self.particles.write().await.clear();
        log::debug!("Animation scheduler stopped");
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
