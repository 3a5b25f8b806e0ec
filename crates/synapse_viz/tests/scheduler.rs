//! Tick loop behaviour on a paused tokio clock.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use synapse_viz::animation::SharedParticles;
use synapse_viz::{
    AnimationConfig, AnimationScheduler, ApiState, Architecture, EventBroadcaster, InteractionEvent,
    LayerBuilder, LayerType, LayoutConfig, ParticleSet, UnitId, Viewport, Visualization, VizEvent,
};
use tokio::sync::RwLock;
use tokio::time::sleep;

fn mounted(selected: Option<UnitId>) -> Arc<RwLock<Visualization>> {
    let arch = Architecture::new("sched")
        .with_layer(LayerBuilder::new("in", LayerType::Input).neurons(4).importance(0.5).build())
        .with_layer(LayerBuilder::new("h", LayerType::Dense).neurons(3).importance(0.5).build())
        .with_layer(LayerBuilder::new("out", LayerType::Output).neurons(2).importance(0.5).build());
    let mut viz = Visualization::new(arch, LayoutConfig::default());
    viz.mount(Viewport::new(600.0, 400.0));
    if let Some(unit) = selected {
        viz.handle(InteractionEvent::Click { unit });
    }
    Arc::new(RwLock::new(viz))
}

fn every_edge() -> AnimationConfig {
    AnimationConfig {
        ambient_sample_rate: 1.0,
        ..AnimationConfig::default()
    }
}

fn particles() -> SharedParticles {
    Arc::new(RwLock::new(ParticleSet::new()))
}

#[tokio::test(start_paused = true)]
async fn selected_unit_ticks_every_400ms() {
    let viz = mounted(Some(UnitId::new(0, 0)));
    let set = particles();
    let broadcaster = EventBroadcaster::new();
    let mut rx = broadcaster.subscribe();

    let handle = AnimationScheduler::default().start(
        viz,
        set.clone(),
        Some(broadcaster),
        StdRng::seed_from_u64(1),
    );

    sleep(Duration::from_millis(390)).await;
    assert!(set.read().await.is_empty());

    sleep(Duration::from_millis(20)).await;
    {
        let set = set.read().await;
        // three edges touch unit (0, 0), three pulses each
        assert_eq!(set.len(), 9);
        assert!(set.particles().iter().all(|p| p.highlighted));
        let spawns: Vec<u64> = set.particles().iter().map(|p| p.spawn_ms).collect();
        assert!(spawns.contains(&400));
        assert!(spawns.contains(&600));
        assert!(spawns.contains(&800));
    }

    match rx.recv().await.unwrap() {
        VizEvent::ParticlesSpawned {
            count, highlighted, ..
        } => {
            assert_eq!(count, 9);
            assert!(highlighted);
        }
        other => panic!("unexpected event {:?}", other),
    }

    sleep(Duration::from_millis(400)).await;
    assert_eq!(set.read().await.batch_count(), 2);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn idle_ticks_every_second() {
    let viz = mounted(None);
    let set = particles();
    let handle = AnimationScheduler::new(every_edge()).start(
        viz,
        set.clone(),
        None,
        StdRng::seed_from_u64(2),
    );

    sleep(Duration::from_millis(990)).await;
    assert!(set.read().await.is_empty());

    sleep(Duration::from_millis(20)).await;
    {
        let set = set.read().await;
        assert_eq!(set.len(), 18);
        assert!(set.particles().iter().all(|p| !p.highlighted));
        assert!(set.particles().iter().all(|p| p.spawn_ms == 1000));
    }

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn finished_particles_are_retired() {
    let viz = mounted(None);
    let set = particles();
    let broadcaster = EventBroadcaster::new();
    let mut rx = broadcaster.subscribe();
    let handle = AnimationScheduler::new(every_edge()).start(
        viz,
        set.clone(),
        Some(broadcaster),
        StdRng::seed_from_u64(3),
    );

    sleep(Duration::from_millis(10_050)).await;
    {
        let set = set.read().await;
        assert!(!set.is_empty());
        assert!(set.particles().iter().all(|p| p.end_ms() > 10_000));
        assert!(set.particles().iter().all(|p| p.spawn_ms + 5_000 > 10_000));
    }

    let mut retired = 0;
    while let Ok(event) = rx.try_recv() {
        if let VizEvent::ParticlesRetired { count } = event {
            retired += count;
        }
    }
    assert!(retired > 0);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_the_loop_and_drops_particles() {
    let viz = mounted(None);
    let set = particles();
    let handle = AnimationScheduler::new(every_edge()).start(
        viz,
        set.clone(),
        None,
        StdRng::seed_from_u64(4),
    );
    assert!(handle.is_running());

    sleep(Duration::from_millis(1_010)).await;
    assert!(!set.read().await.is_empty());

    handle.stop().await;
    assert!(set.read().await.is_empty());

    sleep(Duration::from_millis(5_000)).await;
    assert!(set.read().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_ticking() {
    let viz = mounted(None);
    let set = particles();
    let handle = AnimationScheduler::new(every_edge()).start(
        viz,
        set.clone(),
        None,
        StdRng::seed_from_u64(5),
    );

    sleep(Duration::from_millis(1_010)).await;
    let batches = set.read().await.batch_count();
    drop(handle);

    sleep(Duration::from_millis(3_000)).await;
    assert_eq!(set.read().await.batch_count(), batches);
}

#[tokio::test(start_paused = true)]
async fn unmounted_visualization_ends_the_loop() {
    let viz = mounted(None);
    viz.write().await.unmount();
    let set = particles();
    let handle = AnimationScheduler::new(every_edge()).start(
        viz,
        set.clone(),
        None,
        StdRng::seed_from_u64(6),
    );

    sleep(Duration::from_millis(3_100)).await;
    assert!(set.read().await.is_empty());
    assert!(!handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn unmounting_stops_the_timer_and_drops_particles() {
    let viz = mounted(None);
    let set = particles();
    let handle = AnimationScheduler::new(every_edge()).start(
        viz.clone(),
        set.clone(),
        None,
        StdRng::seed_from_u64(7),
    );

    sleep(Duration::from_millis(1_500)).await;
    assert!(!set.read().await.is_empty());

    viz.write().await.unmount();
    sleep(Duration::from_millis(3_000)).await;
    assert!(!handle.is_running());
    assert!(set.read().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn selection_during_idle_wait_ticks_within_400ms() {
    let viz = mounted(None);
    let set = particles();
    let handle = AnimationScheduler::default().start(
        viz.clone(),
        set.clone(),
        None,
        StdRng::seed_from_u64(8),
    );

    sleep(Duration::from_millis(1_050)).await;
    viz.write().await.handle(InteractionEvent::Click {
        unit: UnitId::new(0, 0),
    });

    sleep(Duration::from_millis(450)).await;
    let highlighted = set
        .read()
        .await
        .particles()
        .iter()
        .filter(|p| p.highlighted)
        .count();
    assert_eq!(highlighted, 9);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn in_flight_particles_survive_selection_until_swept() {
    let viz = mounted(None);
    let set = particles();
    // long ambient flights so only the batch sweep can remove them
    let config = AnimationConfig {
        ambient_base_ms: 8_000,
        ..every_edge()
    };
    let handle = AnimationScheduler::new(config).start(
        viz.clone(),
        set.clone(),
        None,
        StdRng::seed_from_u64(9),
    );

    sleep(Duration::from_millis(1_010)).await;
    assert_eq!(set.read().await.len(), 18);

    viz.write().await.handle(InteractionEvent::Click {
        unit: UnitId::new(0, 0),
    });
    let ambient = |set: &ParticleSet| set.particles().iter().filter(|p| !p.highlighted).count();

    // selected ticks from 1400 ms on; the ambient batch was spawned at 1000 ms
    sleep(Duration::from_millis(400)).await;
    {
        let set = set.read().await;
        assert_eq!(ambient(&*set), 18);
        assert!(set.particles().iter().any(|p| p.highlighted));
    }

    sleep(Duration::from_millis(4_400)).await;
    assert_eq!(ambient(&*set.read().await), 18);

    sleep(Duration::from_millis(400)).await;
    assert_eq!(ambient(&*set.read().await), 0);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn architecture_swap_never_leaves_stale_edges() {
    let state = ApiState {
        viz: mounted(None),
        particles: particles(),
        broadcaster: EventBroadcaster::new(),
    };
    let handle = AnimationScheduler::new(every_edge()).start(
        state.viz.clone(),
        state.particles.clone(),
        Some(state.broadcaster.clone()),
        StdRng::seed_from_u64(10),
    );

    sleep(Duration::from_millis(1_010)).await;
    assert_eq!(state.particles.read().await.len(), 18);

    let single = Architecture::new("pair")
        .with_layer(LayerBuilder::new("a", LayerType::Input).neurons(1).importance(0.5).build())
        .with_layer(LayerBuilder::new("b", LayerType::Output).neurons(1).importance(0.5).build());
    state.replace_architecture(single).await;

    sleep(Duration::from_millis(2_000)).await;
    {
        let set = state.particles.read().await;
        assert!(!set.is_empty());
        assert!(set.particles().iter().all(|p| p.edge == 0));
    }

    handle.stop().await;
}
