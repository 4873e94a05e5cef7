//! Decal integration test
//!
//! Полный App (DecalPlugin + headless scene/physics + contacts):
//! - Hitscan penetration + exit decals + splatter через FireTrigger
//! - Reclaim по таймеру и teardown эфемерных узлов
//! - Ballistic projectiles через ProjectileContact
//! - Пустой pool: без паники

use bevy::prelude::*;
use decal_simulation::scene::layers::{LAYER_ARMOR, LAYER_DEFAULT};
use decal_simulation::*;

/// Helper: App с коридором стен поперёк +Z
fn create_corridor_app(settings: DecalSettings, walls: &[(f32, &str, u32)]) -> App {
    let mut app = create_headless_decal_app(7, settings);

    for (z, tag, layer) in walls {
        spawn_headless_surface(
            app.world_mut(),
            SurfaceDesc::wall(&format!("wall_{}", z), *z, tag, *layer),
        );
    }

    *app.world_mut().resource_mut::<ViewState>() = ViewState {
        origin: Vec3::ZERO,
        forward: Vec3::Z,
    };

    app
}

fn fire(app: &mut App) {
    app.world_mut().send_event(FireTrigger);
    run_fixed_tick(app);
}

fn run_ticks(app: &mut App, ticks: u32) {
    for _ in 0..ticks {
        run_fixed_tick(app);
    }
}

fn quiet_settings() -> DecalSettings {
    let mut settings = DecalSettings::default();
    settings.splatter.enabled = false;
    settings.bleed.enabled = false;
    settings.shooting.exit_decals = false;
    settings
}

/// Test: hitscan через FireTrigger, allowance 2 → 3 entry decals
#[test]
fn test_hitscan_fire_places_entry_decals() {
    let walls: Vec<(f32, &str, u32)> = (1..=5).map(|i| (i as f32 * 2.0, "", LAYER_DEFAULT)).collect();
    let mut app = create_corridor_app(quiet_settings(), &walls);

    fire(&mut app);

    let stats = app.world().resource::<DecalStats>();
    assert_eq!(stats.shots, 1);
    assert_eq!(stats.entry_decals, 3);
    assert_eq!(app.world().resource::<ObjectPool>().active_count(), 3);
    assert_eq!(app.world().resource::<Events<DecalPlaced>>().len(), 3);
}

/// Test: armor plate останавливает пробитие
#[test]
fn test_armor_stops_hitscan() {
    let mut app = create_corridor_app(
        quiet_settings(),
        &[(2.0, "", LAYER_DEFAULT), (4.0, "Metal", LAYER_ARMOR), (6.0, "", LAYER_DEFAULT)],
    );

    fire(&mut app);

    assert_eq!(app.world().resource::<DecalStats>().entry_decals, 2);
}

/// Test: decals возвращаются в pool после reclaim delay
#[test]
fn test_decals_reclaimed_after_delay() {
    let mut settings = quiet_settings();
    settings.pool.reclaim_delay = 0.5;
    let mut app = create_corridor_app(settings, &[(2.0, "", LAYER_DEFAULT), (4.0, "", LAYER_DEFAULT)]);

    fire(&mut app);
    assert_eq!(app.world().resource::<ObjectPool>().active_count(), 2);

    // 0.5s на 60Hz = 30 ticks
    run_ticks(&mut app, 29);
    assert_eq!(app.world().resource::<ObjectPool>().active_count(), 2);

    run_ticks(&mut app, 1);
    assert_eq!(app.world().resource::<ObjectPool>().active_count(), 0);
}

/// Test: exit decals + splatter clusters на поверхностях позади
#[test]
fn test_exit_decals_and_splatter() {
    let mut settings = DecalSettings::default();
    settings.bleed.enabled = false;
    let walls: Vec<(f32, &str, u32)> = (1..=4).map(|i| (i as f32 * 2.0, "", LAYER_DEFAULT)).collect();
    let mut app = create_corridor_app(settings, &walls);

    fire(&mut app);

    // Остановка на z=6, exits на z=2 и z=4, каждый exit → cluster на следующей стене
    let stats = app.world().resource::<DecalStats>().clone();
    assert_eq!(stats.entry_decals, 3);
    assert_eq!(stats.exit_decals, 2);
    assert_eq!(stats.splatter_clusters, 2);
    assert_eq!(stats.splatter_decals, 8);
    assert_eq!(stats.splatter_effects, 2);
    assert_eq!(app.world().resource::<ObjectPool>().active_count(), 13);
}

/// Test: после всех таймеров сцена возвращается к исходному состоянию
#[test]
fn test_ephemeral_nodes_torn_down() {
    let mut settings = DecalSettings::default();
    settings.bleed.enabled = false;
    let walls: Vec<(f32, &str, u32)> = (1..=4).map(|i| (i as f32 * 2.0, "", LAYER_DEFAULT)).collect();
    let mut app = create_corridor_app(settings, &walls);

    let baseline = app.world().resource::<HeadlessScene>().node_count();

    fire(&mut app);
    assert!(app.world().resource::<HeadlessScene>().node_count() > baseline);

    // reclaim 5s = 300 ticks, splatter particle 3s
    run_ticks(&mut app, 301);

    let scene = app.world().resource::<HeadlessScene>();
    assert_eq!(scene.node_count(), baseline);
    assert_eq!(app.world().resource::<ObjectPool>().active_count(), 0);
}

/// Test: ballistic projectile проходит первую стену и застревает во второй
#[test]
fn test_ballistic_projectile_passes_then_stops() {
    let mut settings = quiet_settings();
    settings.shooting.mode = ShootingMode::Ballistic {
        speed: 27.0,
        gravity: 0.0,
        lifetime: 2.0,
    };
    settings.shooting.penetrations = 1;
    settings.shooting.exit_decals = true;
    let mut app = create_corridor_app(
        settings,
        &[(2.1, "", LAYER_DEFAULT), (4.1, "", LAYER_DEFAULT), (6.1, "", LAYER_DEFAULT)],
    );

    fire(&mut app);
    run_ticks(&mut app, 20);

    let stats = app.world().resource::<DecalStats>().clone();
    assert_eq!(stats.projectiles_spawned, 1);
    assert_eq!(stats.projectiles_stopped, 1);
    assert_eq!(stats.entry_decals, 2);
    // Exit только у пробитой стены
    assert_eq!(stats.exit_decals, 1);

    let world = app.world_mut();
    let mut projectiles = world.query::<(&Transform, &Projectile)>();
    let (transform, projectile) = projectiles.single(world).unwrap();
    assert!(projectile.stopped);
    assert_eq!(projectile.passes, 1);
    assert!((transform.translation.z - 4.1).abs() < 0.05);
}

/// Test: projectile despawn после lifetime
#[test]
fn test_projectile_expires() {
    let mut settings = quiet_settings();
    settings.shooting.mode = ShootingMode::Ballistic {
        speed: 10.0,
        gravity: 9.8,
        lifetime: 0.5,
    };
    let mut app = create_corridor_app(settings, &[]);

    fire(&mut app);
    run_ticks(&mut app, 40);

    let world = app.world_mut();
    let mut projectiles = world.query::<&Projectile>();
    assert_eq!(projectiles.iter(world).count(), 0);
}

/// Test: пустой pool: выстрелы без паники и без decals
#[test]
fn test_zero_capacity_pool_fires_silently() {
    let mut settings = quiet_settings();
    settings.pool.capacity = 0;
    let mut app = create_corridor_app(settings, &[(2.0, "", LAYER_DEFAULT)]);

    for _ in 0..5 {
        fire(&mut app);
    }

    let stats = app.world().resource::<DecalStats>();
    assert_eq!(stats.shots, 5);
    assert_eq!(stats.total_decals(), 0);
}

/// Test: 1000 тиков стрельбы: pool никогда не переполняется
#[test]
fn test_sustained_fire_respects_pool_capacity() {
    let mut settings = DecalSettings::default();
    settings.pool.capacity = 16;
    let mut app = create_corridor_app(
        settings,
        &[
            (2.0, "Glass", LAYER_DEFAULT),
            (4.0, "", LAYER_DEFAULT),
            (6.0, "Flesh", decal_simulation::scene::layers::LAYER_CHARACTERS),
            (8.0, "", LAYER_DEFAULT),
        ],
    );

    for tick in 0..1000 {
        if tick % 5 == 0 {
            app.world_mut().send_event(FireTrigger);
        }
        run_fixed_tick(&mut app);

        let pool = app.world().resource::<ObjectPool>();
        assert!(pool.active_count() <= pool.capacity());
    }

    let pool = app.world().resource::<ObjectPool>();
    assert!(pool.evictions() > 0);
    assert_eq!(app.world().resource::<DecalStats>().shots, 200);
}

/// Test: event буферы не растут при долгой стрельбе
#[test]
fn test_event_buffers_stay_bounded_under_sustained_fire() {
    let walls: Vec<(f32, &str, u32)> = (1..=3).map(|i| (i as f32 * 2.0, "", LAYER_DEFAULT)).collect();
    let mut app = create_corridor_app(quiet_settings(), &walls);

    for tick in 0..1000 {
        if tick % 5 == 0 {
            app.world_mut().send_event(FireTrigger);
        }
        run_fixed_tick(&mut app);

        // Максимум события двух последних тиков (один выстрел = 3 decals)
        assert!(app.world().resource::<Events<DecalPlaced>>().len() <= 3);
        assert!(app.world().resource::<Events<FireTrigger>>().len() <= 1);
    }

    assert_eq!(app.world().resource::<DecalStats>().entry_decals, 600);
}

/// Test: настройки из кода валидируются при установке plugin'а
#[test]
fn test_plugin_validates_code_built_settings() {
    let mut settings = DecalSettings::default();
    settings.bleed.enabled = false;
    settings.bleed.chance = 400.0;
    for style in settings.splatter.styles.entries_mut() {
        style.horizontal_spread = f32::NAN;
        style.vertical_spread = f32::INFINITY;
    }
    let walls: Vec<(f32, &str, u32)> = (1..=4).map(|i| (i as f32 * 2.0, "", LAYER_DEFAULT)).collect();
    let mut app = create_corridor_app(settings, &walls);

    let installed = app.world().resource::<DecalSettings>();
    assert_eq!(installed.bleed.chance, 100.0);
    for style in installed.splatter.styles.entries() {
        assert_eq!(style.horizontal_spread, 0.0);
        assert_eq!(style.vertical_spread, 0.0);
    }

    // Splatter с нулевым разбросом: без паники в RNG
    fire(&mut app);
    assert_eq!(app.world().resource::<DecalStats>().splatter_clusters, 2);
}
