use std::{sync::Arc, time::Duration};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use sync::PhysicsLock;

use crate::{PhysicsEngine, SimResult, Stage, StepReport};

pub trait PreStepHook<P>: FnMut(&mut Stage<P>) + Send + 'static {}
impl<P, F: FnMut(&mut Stage<P>) + Send + 'static> PreStepHook<P> for F {}

pub trait PostStepHook<P>: FnMut(&mut Stage<P>, &StepReport) + Send + 'static {}
impl<P, F: FnMut(&mut Stage<P>, &StepReport) + Send + 'static> PostStepHook<P> for F {}

/// Fixed step driver around a shared stage.
pub struct Simulation<P: PhysicsEngine> {
    stage: Arc<PhysicsLock<Stage<P>>>,
    pre_cbs: Vec<Box<dyn PreStepHook<P>>>,
    post_cbs: Vec<Box<dyn PostStepHook<P>>>,
    time_step: Duration,
    steps: u64,
}

impl<P: PhysicsEngine> Simulation<P> {
    pub fn new(stage: Arc<PhysicsLock<Stage<P>>>, time_step: Duration) -> Self {
        Self {
            stage,
            pre_cbs: vec![],
            post_cbs: vec![],
            time_step,
            steps: 0,
        }
    }

    pub fn add_pre_hook(&mut self, hook: impl PreStepHook<P>) {
        self.pre_cbs.push(Box::new(hook));
    }

    pub fn add_post_hook(&mut self, hook: impl PostStepHook<P>) {
        self.post_cbs.push(Box::new(hook));
    }

    pub fn stage(&self) -> &Arc<PhysicsLock<Stage<P>>> {
        &self.stage
    }

    pub fn time_step(&self) -> Duration {
        self.time_step
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Runs the pre hooks, advances physics by one time step, then runs the post hooks, all
    /// under one write lock.
    pub fn step(&mut self) -> SimResult<StepReport> {
        let mut stage = self.stage.write()?;
        for pre in self.pre_cbs.iter_mut() {
            pre(&mut *stage);
        }
        let report = stage.physics.step(self.time_step.as_secs_f32());
        for post in self.post_cbs.iter_mut() {
            post(&mut *stage, &report);
        }
        self.steps += 1;
        trace!(
            "Step {} done: {} joints broke, {} impacts.",
            self.steps,
            report.broken_joints.len(),
            report.impacts.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::World;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn hooks_run_around_each_step() {
        let stage = Stage::new(World::default()).into_lock();
        let mut sim = Simulation::new(stage, Duration::from_millis(16));
        let pre = Arc::new(AtomicUsize::new(0));
        let post = Arc::new(AtomicUsize::new(0));
        {
            let pre = Arc::clone(&pre);
            sim.add_pre_hook(move |_: &mut Stage<World>| {
                pre.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let (pre, post) = (Arc::clone(&pre), Arc::clone(&post));
            sim.add_post_hook(move |_: &mut Stage<World>, report: &StepReport| {
                assert!(report.is_empty());
                assert_eq!(pre.load(Ordering::SeqCst), post.fetch_add(1, Ordering::SeqCst) + 1);
            });
        }
        for _ in 0..3 {
            sim.step().unwrap();
        }
        assert_eq!(sim.steps(), 3);
        assert_eq!(post.load(Ordering::SeqCst), 3);
    }
}
