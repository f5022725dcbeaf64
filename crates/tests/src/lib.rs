//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 双树同构与逐帧同步性质 (随机特征列表)
//! - 循环、分支、响应节点的端到端场景
//! - 失败中止与清理语义
//! - 计划文件到采集的完整流程

#[cfg(test)]
mod support;

#[cfg(test)]
mod tree_tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use acquisition::SyntheticMicroscope;
    use feature_engine::{build_trees, is_isomorphic, AcquisitionControl, FeatureContext};
    use std::sync::Arc;

    use crate::support::{Journal, ListGenerator};

    fn context() -> FeatureContext {
        FeatureContext::new(
            Arc::new(SyntheticMicroscope::default()),
            AcquisitionControl::new(),
        )
    }

    #[test]
    fn test_random_lists_build_isomorphic_trees() {
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let journal = Journal::default();
            let list = ListGenerator::new(&mut rng, &journal).list(3);

            let trees = build_trees(&context(), &list).unwrap();
            assert!(is_isomorphic(&trees.signal, &trees.data), "seed {seed}");
            assert_eq!(trees.signal.names(), trees.data.names(), "seed {seed}");
            assert_eq!(
                trees.signal.len(),
                list.iter().map(|e| e.node_count()).sum::<usize>(),
                "seed {seed}"
            );
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use acquisition::AcquisitionError;
    use contracts::{FeatureSpec, NodeConfig};
    use feature_engine::{EngineError, FeatureElement, Side};

    use crate::support::{acquire, loop_by_count, plain, scripted, Journal, ListGenerator, ScriptSpec};

    fn records(items: &[(u64, &str)]) -> Vec<(u64, String)> {
        items
            .iter()
            .map(|(frame, name)| (*frame, name.to_string()))
            .collect()
    }

    /// Every (frame, node) pair executed on the signal side is executed on the
    /// data side, in the same order.
    #[test]
    fn test_random_lists_stay_in_lockstep() {
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let journal = Journal::default();
            let list = ListGenerator::new(&mut rng, &journal).list(2);

            let (result, microscope) = acquire(&list);
            let report = result.unwrap_or_else(|e| panic!("seed {seed}: {e}"));

            assert_eq!(journal.signal(), journal.data(), "seed {seed}");
            assert_eq!(report.frames_triggered, report.frames_processed, "seed {seed}");
            assert_eq!(
                microscope.snapped_frames(),
                (0..report.frames_triggered).collect::<Vec<_>>(),
                "seed {seed}"
            );
        }
    }

    #[test]
    fn test_loop_by_count_three() {
        let journal = Journal::default();
        let list = vec![FeatureElement::looped(
            vec![plain("node0", &journal)],
            loop_by_count(3),
        )];

        let (result, _) = acquire(&list);
        result.unwrap();

        let expected = records(&[(0, "node0"), (1, "node0"), (2, "node0")]);
        assert_eq!(journal.signal(), expected);
        assert_eq!(journal.data(), expected);
    }

    #[test]
    fn test_nested_loops() {
        let journal = Journal::default();
        let inner = FeatureElement::looped(vec![plain("A", &journal)], loop_by_count(2));
        let list = vec![FeatureElement::looped(
            vec![inner, plain("B", &journal)],
            loop_by_count(2),
        )];

        let (result, _) = acquire(&list);
        let report = result.unwrap();

        let expected = records(&[(0, "A"), (1, "A"), (1, "B"), (2, "A"), (3, "A"), (3, "B")]);
        assert_eq!(journal.signal(), expected);
        assert_eq!(journal.data(), expected);
        assert_eq!(report.frames_triggered, 4);
    }

    #[test]
    fn test_multi_step_response_node_spans_frames() {
        let journal = Journal::default();
        let spec = ScriptSpec::multi_step(5)
            .with_config(NodeConfig::multi_step().with_need_response(true));
        let list = vec![scripted("M", spec, &journal).into()];

        let (result, _) = acquire(&list);
        let report = result.unwrap();

        let expected = records(&[(0, "M"), (1, "M"), (2, "M"), (3, "M"), (4, "M")]);
        assert_eq!(journal.signal(), expected);
        assert_eq!(journal.data(), expected);
        assert_eq!(journal.responses().len(), 5);
        assert_eq!(report.frames_triggered, 5);
    }

    #[test]
    fn test_response_node_shares_frame_with_predecessor() {
        let journal = Journal::default();
        let responder = ScriptSpec::default().with_config(NodeConfig::one_step().with_need_response(true));
        let list = vec![
            plain("A", &journal),
            scripted("B", responder, &journal).into(),
        ];

        let (result, _) = acquire(&list);
        result.unwrap();

        let expected = records(&[(0, "A"), (0, "B")]);
        assert_eq!(journal.signal(), expected);
        assert_eq!(journal.data(), expected);
        assert_eq!(journal.responses(), vec!["B".to_string()]);
    }

    #[test]
    fn test_device_related_node_starts_new_frame() {
        let journal = Journal::default();
        let device = ScriptSpec::default().with_config(NodeConfig::one_step().with_device_related(true));
        let list = vec![
            plain("A", &journal),
            scripted("Stage", device, &journal).into(),
            plain("C", &journal),
        ];

        let (result, _) = acquire(&list);
        result.unwrap();

        let expected = records(&[(0, "A"), (1, "Stage"), (1, "C")]);
        assert_eq!(journal.signal(), expected);
        assert_eq!(journal.data(), expected);
    }

    #[test]
    fn test_wait_to_continue_in_loop() {
        let journal = Journal::default();
        let gate: FeatureElement = features::builtin_registry()
            .descriptor(&FeatureSpec::new("WaitToContinue"))
            .unwrap()
            .into();
        let list = vec![FeatureElement::looped(
            vec![plain("A", &journal), gate, plain("B", &journal)],
            loop_by_count(3),
        )];

        let (result, _) = acquire(&list);
        let report = result.unwrap();

        assert_eq!(journal.signal(), journal.data());
        assert_eq!(journal.signal().len(), 6);
        assert_eq!(report.frames_triggered, report.frames_processed);
    }

    #[test]
    fn test_failing_response_node_aborts_and_cleans_up() {
        let journal = Journal::default();
        let failing = ScriptSpec {
            fail_data_at: Some(2),
            ..ScriptSpec::default().with_config(NodeConfig::one_step().with_need_response(true))
        };
        let list = vec![FeatureElement::looped(
            vec![plain("A", &journal), scripted("F", failing, &journal).into()],
            loop_by_count(10),
        )];

        let (result, microscope) = acquire(&list);
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::Engine(EngineError::NodeFailed { side: Side::Data, ref node, .. }) if node == "F"
        ));
        assert!(microscope.was_ended());

        let mut cleanups = journal.cleanups();
        cleanups.sort();
        assert_eq!(cleanups, vec!["A.data", "A.signal", "F.data", "F.signal"]);
    }

    #[test]
    fn test_failing_plain_data_node_is_skipped() {
        let journal = Journal::default();
        let flaky = ScriptSpec {
            fail_data_at: Some(1),
            ..Default::default()
        };
        let list = vec![FeatureElement::looped(
            vec![scripted("Flaky", flaky, &journal).into(), plain("B", &journal)],
            loop_by_count(3),
        )];

        let (result, _) = acquire(&list);
        let report = result.unwrap();

        assert_eq!(report.frames_processed, 3);
        let flaky_data = journal.data().into_iter().filter(|(_, n)| n == "Flaky").count();
        assert_eq!(flaky_data, 0);
        let b_data = journal.data().into_iter().filter(|(_, n)| n == "B").count();
        assert_eq!(b_data, 3);
        assert_eq!(
            journal.cleanups().iter().filter(|c| *c == "Flaky.data").count(),
            1
        );
    }

    #[test]
    fn test_cleanup_runs_once_per_visited_node() {
        let journal = Journal::default();
        let list = vec![
            plain("A", &journal),
            FeatureElement::branch(
                scripted("Cond", ScriptSpec::default(), &journal),
                vec![plain("Yes", &journal)],
                vec![plain("No", &journal)],
            ),
        ];

        let (result, _) = acquire(&list);
        result.unwrap();

        let mut cleanups = journal.cleanups();
        cleanups.sort();
        assert_eq!(
            cleanups,
            vec!["A.data", "A.signal", "Cond.data", "Cond.signal", "Yes.data", "Yes.signal"]
        );
    }
}

#[cfg(test)]
mod container_tests {
    use std::sync::Arc;

    use acquisition::SyntheticMicroscope;
    use feature_engine::{load_features, AcquisitionControl, CleanupScope, FeatureContext};

    use crate::support::{plain, Journal};

    #[test]
    fn test_cleanup_is_idempotent() {
        let journal = Journal::default();
        let ctx = FeatureContext::new(
            Arc::new(SyntheticMicroscope::default()),
            AcquisitionControl::new(),
        );
        let list = vec![plain("A", &journal), plain("B", &journal)];
        let (mut signal, mut data) = load_features(&ctx, &list).unwrap();

        signal.run().unwrap();
        data.run(&[0]).unwrap();

        assert_eq!(signal.cleanup(CleanupScope::All), 2);
        assert_eq!(signal.cleanup(CleanupScope::All), 0);
        assert_eq!(data.cleanup(CleanupScope::All), 2);
        drop(data);
        drop(signal);

        assert_eq!(journal.cleanups().len(), 4);
    }

    #[test]
    fn test_stop_halts_both_containers() {
        let journal = Journal::default();
        let control = AcquisitionControl::new();
        let ctx = FeatureContext::new(Arc::new(SyntheticMicroscope::default()), control.clone());
        let list = vec![plain("A", &journal)];
        let (mut signal, mut data) = load_features(&ctx, &list).unwrap();

        control.request_stop();
        assert_eq!(signal.run().unwrap(), 0);
        assert_eq!(data.run(&[0]).unwrap(), 0);
        assert!(signal.is_ended());
        assert!(data.is_ended());
        assert!(journal.signal().is_empty());
    }
}

#[cfg(test)]
mod plan_tests {
    use std::io::Write;
    use std::sync::Arc;

    use acquisition::{Acquisition, SyntheticMicroscope};
    use config_loader::ConfigLoader;

    const PLAN: &str = r#"
version = "1"

[acquisition]
frame_wait_ms = 20
camera_wait_iterations = 50
mode = "live"
live_cycles = 2

[experiment.stack]
planes = [0.0, 0.5, 1.0, 1.5]

[[features]]
name = "StackPause"
args = [2, 5]

[[features]]
loop = [{ name = "LogFrames" }, { name = "WaitToContinue" }]
control = { name = "LoopByCount", args = ["stack.planes"] }
"#;

    #[test]
    fn test_plan_file_to_report() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(PLAN.as_bytes()).unwrap();

        let plan = ConfigLoader::load_from_path(file.path()).unwrap();
        let list = features::builtin_registry().resolve(&plan.features).unwrap();

        let microscope = Arc::new(SyntheticMicroscope::default());
        let report = Acquisition::new(microscope.clone(), plan.acquisition.clone())
            .with_experiment(plan.experiment.clone())
            .run(&list)
            .unwrap();

        assert_eq!(report.signal_cycles, 2);
        assert_eq!(report.data_cycles, 2);
        assert!(!report.stopped);
        assert_eq!(report.frames_triggered, report.frames_processed);
        assert_eq!(
            report.metrics.node_counts.get("signal/LogFrames"),
            Some(&8)
        );
        assert!(microscope.was_ended());
    }
}
