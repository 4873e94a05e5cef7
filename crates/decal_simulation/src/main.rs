//! Headless demo decal системы
//!
//! Коридор из панелей (стекло, бетон, броня, плоть), выстрел каждые
//! несколько тиков, статистика каждые 100 тиков.
//!
//! Usage: `decal_simulation [settings.ron]`

use bevy::prelude::*;
use decal_simulation::scene::layers::{LAYER_ARMOR, LAYER_CHARACTERS, LAYER_DEFAULT};
use decal_simulation::{
    create_headless_decal_app, init_logger, log_error, run_fixed_tick, scene_snapshot, spawn_headless_surface, DecalSettings,
    DecalStats, FireTrigger, ObjectPool, SurfaceDesc, ViewState,
};

const TICK_COUNT: u64 = 1000;
const FIRE_INTERVAL: u64 = 15;

fn main() {
    let seed = 42;
    init_logger();

    let settings = match std::env::args().nth(1) {
        Some(path) => match DecalSettings::load(&path) {
            Ok(settings) => settings,
            Err(err) => {
                log_error(&format!("❌ {}, falling back to default settings", err));
                DecalSettings::default()
            }
        },
        None => DecalSettings::default(),
    };

    println!("Starting decal headless simulation (seed: {})", seed);

    let mut app = create_headless_decal_app(seed, settings);
    build_corridor(app.world_mut());

    for tick in 0..TICK_COUNT {
        if tick % FIRE_INTERVAL == 0 {
            // Лёгкий разброс прицела по кругу
            let angle = tick as f32 * 0.1;
            let aim = Vec3::new(angle.cos() * 0.05, angle.sin() * 0.05, 1.0).normalize();

            *app.world_mut().resource_mut::<ViewState>() = ViewState {
                origin: Vec3::new(0.0, 1.0, 0.0),
                forward: aim,
            };
            app.world_mut().send_event(FireTrigger);
        }

        run_fixed_tick(&mut app);

        if tick % 100 == 0 {
            print_stats(tick, app.world());
        }
    }

    print_stats(TICK_COUNT, app.world());
    println!(
        "Simulation complete! Scene snapshot: {} bytes",
        scene_snapshot(app.world()).len()
    );
}

fn build_corridor(world: &mut World) {
    let surfaces = [
        SurfaceDesc::wall("glass", 3.0, "Glass", LAYER_DEFAULT),
        SurfaceDesc::wall("drywall", 6.0, "", LAYER_DEFAULT),
        SurfaceDesc::wall("dummy", 9.0, "Flesh", LAYER_CHARACTERS),
        SurfaceDesc::wall("sheet_metal", 12.0, "Metal", LAYER_DEFAULT),
        SurfaceDesc::wall("armor_plate", 15.0, "Metal", LAYER_ARMOR),
        SurfaceDesc::wall("back_wall", 18.0, "", LAYER_DEFAULT),
    ];

    for desc in surfaces {
        spawn_headless_surface(world, desc);
    }
}

fn print_stats(tick: u64, world: &World) {
    let stats = world.resource::<DecalStats>();
    let pool = world.resource::<ObjectPool>();

    println!(
        "Tick {}: shots {}, decals {} (entry {}, exit {}, splatter {}), effects {} bleed / {} splatter, pool {}/{} (evictions {})",
        tick,
        stats.shots,
        stats.total_decals(),
        stats.entry_decals,
        stats.exit_decals,
        stats.splatter_decals,
        stats.bleed_effects,
        stats.splatter_effects,
        pool.active_count(),
        pool.capacity(),
        pool.evictions()
    );
}
