extern crate nalgebra as na;
extern crate simple_logger;
extern crate log;
extern crate totality_model as geom;
extern crate totality_shatter as shatter;
extern crate totality_sim as sim;
extern crate totality_sync as sync;

use std::{
    env::{args, Args},
    error::Error,
    fs,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use geom::{geom::TriMesh, AffineTransform};
use log::LevelFilter;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use shatter::{AnchorMask, Destruction, FractureRequest, Materials, ShatterConfig, SlabKernel};
use sim::{Simulation, Stage, World};
use sync::UnfreezeQueue;

#[derive(Debug, Copy, Clone)]
struct ConfigPaths<'a> {
    base_path: &'a str,
}

const DEFAULT_CONFIGURATION_PATHS: ConfigPaths = ConfigPaths { base_path: "./.totality.json" };

/// The scripted blast that knocks the wall down.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Explosion {
    at_step: u64,
    center: [f32; 3],
    radius: f32,
    impulse: f32,
}

impl Default for Explosion {
    fn default() -> Self {
        Self {
            at_step: 30,
            center: [4., 1., -0.5],
            radius: 1.5,
            impulse: 40.,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Config {
    log_level: LevelFilter,
    shatter: ShatterConfig,
    wall_min: [f32; 3],
    wall_max: [f32; 3],
    total_chunks: i32,
    anchor: AnchorMask,
    seed: u64,
    jitter: f32,
    joint_break_force: f32,
    density: f32,
    explosion: Explosion,
    steps: u64,
    steps_per_second: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            shatter: ShatterConfig::default(),
            wall_min: [0., 0., 0.],
            wall_max: [8., 4., 0.5],
            total_chunks: 16,
            anchor: AnchorMask::LEFT,
            seed: 0x5eed,
            jitter: 0.5,
            joint_break_force: 20.,
            density: 1.,
            explosion: Explosion::default(),
            steps: 240,
            steps_per_second: 60,
        }
    }
}

impl Config {
    /// The first argument, if any, overrides the default path. A missing file means defaults.
    fn new(paths: ConfigPaths, mut args: Args) -> Result<Config, Box<dyn Error>> {
        let path = args.nth(1).unwrap_or_else(|| paths.base_path.to_string());
        if !Path::new(&path).exists() {
            return Ok(Config::default());
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn time_step(&self) -> Duration {
        Duration::from_secs(1) / self.steps_per_second.max(1)
    }
}

fn run(cfg: Config) -> Result<(), Box<dyn Error>> {
    let mut stage = Stage::new(World::default());
    let wall = stage.scene.create_entity("Wall", AffineTransform::identity());
    let queue = Arc::new(UnfreezeQueue::new());
    let mut destruction = Destruction::with_queue(
        Box::new(SlabKernel::new(cfg.jitter)),
        cfg.shatter.clone(),
        Arc::clone(&queue),
    );

    let request = FractureRequest {
        mesh: Arc::new(TriMesh::cuboid(cfg.wall_min.into(), cfg.wall_max.into())),
        target: wall,
        anchor: cfg.anchor,
        seed: cfg.seed,
        total_chunks: cfg.total_chunks,
        materials: Materials::default(),
        joint_break_force: cfg.joint_break_force,
        density: cfg.density,
    };
    let Some(root) = destruction.fracture(&mut stage, &request)? else {
        warn!("Nothing to knock down.");
        return Ok(());
    };
    info!("Wall {:?} is now fracture {:?}.", wall, root);

    let mut sim = Simulation::new(stage.into_lock(), cfg.time_step());
    let explosion = cfg.explosion.clone();
    let mut step = 0;
    sim.add_pre_hook(move |stage: &mut Stage<World>| {
        step += 1;
        if step == explosion.at_step {
            let center: na::Vector3<f32> = explosion.center.into();
            let hit = stage.physics.explode(&center, explosion.radius, explosion.impulse);
            info!("Boom! {} chunks caught in the blast.", hit);
        }
    });

    info!("Beginning Loop!");
    let started = Instant::now();
    for _ in 0..cfg.steps {
        let report = sim.step()?;
        let summary = destruction.tick(sim.stage(), &report)?;
        trace!("Step {}: {:?}", sim.steps(), summary);
    }
    info!("Ran {} steps in {:?}.", sim.steps(), started.elapsed());

    let stage = sim.stage().read()?;
    let states = destruction.chunk_states(&stage);
    let frozen = states.iter().filter(|s| s.frozen).count();
    let deepest = states.iter().map(|s| s.generation).max().unwrap_or(0);
    info!(
        "{} chunks in {} graphs: {} still frozen, {} loose, deepest generation {}. {} left in the queue.",
        states.len(),
        destruction.graphs().count(),
        frozen,
        states.len() - frozen,
        deepest,
        queue.len()
    );
    let lowest = states
        .iter()
        .filter_map(|s| stage.scene.transform(s.entity).ok())
        .map(|t| t.pos.y)
        .fold(f32::INFINITY, f32::min);
    debug!("Lowest chunk sits at y = {}.", lowest);
    Ok(())
}

fn main() {
    let cfg = match Config::new(DEFAULT_CONFIGURATION_PATHS, args()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Could not load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(cfg.log_level).init() {
        eprintln!("Could not set up logging: {}", e);
    }
    info!("Starting at {:?}.", Path::new(".").canonicalize());
    if let Err(e) = run(cfg) {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("And that's all for today, folks!")
}
