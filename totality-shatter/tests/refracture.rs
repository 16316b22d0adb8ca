mod common;

use common::*;
use nalgebra::Vector3;
use totality_model::EntityId;
use totality_shatter::{AnchorMask, ChunkBody, Destruction, ShatterConfig, SlabKernel, TickSummary};
use totality_sim::{PhysicsEngine, Stage, StepReport, World};

/// A single frozen block, tracked by a fresh `Destruction`.
fn block(config: ShatterConfig) -> (Stage<World>, Destruction, EntityId, EntityId) {
    let (mut stage, target) = stage();
    let mut destruction = Destruction::new(Box::new(SlabKernel::new(0.)), config);
    let root = destruction
        .fracture(
            &mut stage,
            &request(cuboid([0., 0., 0.], [5., 1., 1.]), target, 1, AnchorMask::NONE),
        )
        .unwrap()
        .unwrap();
    let chunk = destruction.graph(&root).unwrap().nodes()[0];
    (stage, destruction, root, chunk)
}

fn hit(stage: &mut Stage<World>, chunk: EntityId, strength: f32) -> StepReport {
    let body = stage.scene.component::<ChunkBody>(chunk).unwrap().body;
    stage.physics.apply_impulse(body, Vector3::new(0., strength, 0.)).unwrap();
    stage.physics.step(1. / 60.)
}

#[test]
fn hard_hits_split_a_chunk_one_generation_down() {
    let (mut stage, mut destruction, root, chunk) = block(ShatterConfig::default());
    let bodies = stage.physics.body_count();

    let report = hit(&mut stage, chunk, 6.);
    let summary = destruction.step_stage(&mut stage, &report).unwrap();
    assert_eq!(summary.refractured, 1);
    assert_eq!(summary.retired, 1);
    assert_eq!(summary.queued, 5);
    assert_eq!(summary.activated, 5);

    assert!(!stage.scene.is_alive(chunk));
    assert!(!stage.scene.is_alive(root));
    assert!(destruction.graph(&root).is_none());
    assert_eq!(stage.physics.body_count(), bodies - 1 + 5);

    let states = destruction.chunk_states(&stage);
    assert_eq!(states.len(), 5);
    assert!(states.iter().all(|s| s.generation == 1 && !s.frozen && !s.kinematic));
    let graph = destruction.graph(&states[0].root).unwrap();
    assert_eq!(graph.generation(), 1);
    assert!(graph.joint_count() >= 4);
    assert!(graph.check_symmetry(&stage.scene));
}

#[test]
fn soft_hits_leave_the_chunk_alone() {
    let (mut stage, mut destruction, root, chunk) = block(ShatterConfig::default());

    let report = hit(&mut stage, chunk, 4.);
    let summary = destruction.step_stage(&mut stage, &report).unwrap();
    assert_eq!(summary, TickSummary::default());
    assert!(stage.scene.is_alive(chunk));
    assert_eq!(destruction.graph(&root).unwrap().nodes(), &[chunk]);
}

#[test]
fn chunks_at_the_generation_ceiling_stay_whole() {
    let config = ShatterConfig {
        max_generation: 0,
        ..Default::default()
    };
    let (mut stage, mut destruction, root, chunk) = block(config);

    let report = hit(&mut stage, chunk, 50.);
    let summary = destruction.step_stage(&mut stage, &report).unwrap();
    assert_eq!(summary.refractured, 0);
    assert!(stage.scene.is_alive(chunk));
    assert_eq!(destruction.graphs().count(), 1);
    assert_eq!(destruction.graph(&root).unwrap().generation(), 0);
}

#[test]
fn damaged_chunk_that_lost_its_body_stays_whole() {
    let (mut stage, mut destruction, root, chunk) = block(ShatterConfig::default());
    let report = hit(&mut stage, chunk, 6.);
    let body = stage.scene.component::<ChunkBody>(chunk).unwrap().body;
    stage.physics.destroy_body(body).unwrap();

    let summary = destruction.step_stage(&mut stage, &report).unwrap();
    assert_eq!(summary, TickSummary::default());
    assert!(stage.scene.is_alive(chunk));
    assert!(!stage.scene.has_component::<ChunkBody>(chunk));
    assert_eq!(destruction.graph(&root).unwrap().nodes(), &[chunk]);
    assert_eq!(
        destruction.step_stage(&mut stage, &StepReport::default()).unwrap(),
        TickSummary::default()
    );
}
