//! Level advancement after completion and the standalone next-level flow.

use std::fs;

use levelrunner::advance::{AdvanceOutcome, advance_if_complete, next_level};
use levelrunner::core::sequencer::PassState;
use levelrunner::core::types::LevelInfo;
use levelrunner::io::config::GitMode;
use levelrunner::io::git::Vcs;
use levelrunner::io::paths::LEDGER_FILE_NAME;
use levelrunner::pass::{PassOptions, run_pass};
use levelrunner::test_support::{
    RecordingVcs, SCRIPTED_ARCHIVE_NAME, ScriptedJudge, TestContest, level_info, level_parts,
};

const TEMPLATE: &str = "template";

#[test]
fn first_level_is_built_from_template() {
    let contest = TestContest::new().expect("contest");
    contest
        .write_file("template/solve.py", "print()\n")
        .expect("template");
    let judge = ScriptedJudge::new(level_info(1, 3, &["level1_1", "level1_2"]));
    let vcs = RecordingVcs::new();

    let outcome = next_level(contest.root(), &judge, &vcs, TEMPLATE).expect("advance");

    let paths = contest.paths(1);
    assert_eq!(
        outcome,
        AdvanceOutcome::Created {
            level_nr: 1,
            level_dir: paths.level_dir.clone(),
        }
    );
    assert!(paths.level_dir.join("solve.py").is_file());
    assert!(paths.level_dir.join("description.pdf").is_file());
    assert!(paths.output_dir.is_dir());
    assert_eq!(
        contest.input_stems(1).expect("stems"),
        vec!["level1_1", "level1_2"]
    );
    assert_eq!(
        fs::read_to_string(paths.input_artifact("level1_2")).expect("read"),
        "input for level1_2\n"
    );
    assert_eq!(vcs.messages(), vec!["level1 start"]);
    assert_eq!(vcs.commits()[0].paths, vec![paths.level_dir]);
}

#[test]
fn next_level_copies_previous_level_without_artifacts() {
    let contest = TestContest::new().expect("contest");
    contest.create_level(1).expect("level1");
    contest.write_inputs(1, &["level1_a"]).expect("inputs");
    contest.write_outputs(1, &["level1_a"]).expect("outputs");
    contest.write_ledger(1, &["level1_a"]).expect("ledger");
    contest
        .write_file("level1/solve.py", "print('level1')\n")
        .expect("solver");
    contest
        .write_file("level1/level1.pdf", "old description")
        .expect("pdf");
    let judge = ScriptedJudge::new(level_info(2, 3, &["level2_a", "level2_b"]));
    let vcs = RecordingVcs::new();

    next_level(contest.root(), &judge, &vcs, TEMPLATE).expect("advance");

    let paths = contest.paths(2);
    assert_eq!(
        fs::read_to_string(paths.level_dir.join("solve.py")).expect("read"),
        "print('level1')\n"
    );
    assert!(!paths.level_dir.join("level1.pdf").exists());
    assert!(!paths.output_artifact("level1_a").exists());
    assert!(!paths.output_dir.join(LEDGER_FILE_NAME).exists());
    assert_eq!(
        contest.input_stems(2).expect("stems"),
        vec!["level2_a", "level2_b"]
    );
    assert_eq!(vcs.messages(), vec!["level2 start"]);
}

#[test]
fn existing_level_directory_is_left_alone() {
    let contest = TestContest::new().expect("contest");
    contest.create_level(1).expect("level1");
    contest.write_outputs(1, &["level1_a"]).expect("outputs");
    let judge = ScriptedJudge::new(level_info(1, 3, &["level1_a"]));
    let vcs = RecordingVcs::new();

    let outcome = next_level(contest.root(), &judge, &vcs, TEMPLATE).expect("advance");

    assert!(matches!(
        outcome,
        AdvanceOutcome::AlreadyPresent { level_nr: 1, .. }
    ));
    assert!(contest.paths(1).output_artifact("level1_a").exists());
    assert!(vcs.commits().is_empty());
}

#[test]
fn dirty_repository_blocks_advancement() {
    let contest = TestContest::new().expect("contest");
    contest
        .write_file("template/solve.py", "print()\n")
        .expect("template");
    let judge = ScriptedJudge::new(level_info(1, 3, &["level1_a"]));
    let vcs = RecordingVcs::dirty();

    let err = next_level(contest.root(), &judge, &vcs, TEMPLATE).expect_err("dirty");

    assert!(err.to_string().contains("dirty"));
    assert!(!contest.paths(1).level_dir.exists());
}

#[test]
fn missing_template_is_an_error() {
    let contest = TestContest::new().expect("contest");
    let judge = ScriptedJudge::new(level_info(1, 3, &["level1_a"]));
    let vcs = RecordingVcs::new();

    let err = next_level(contest.root(), &judge, &vcs, TEMPLATE).expect_err("no template");

    assert!(err.to_string().contains("not a valid directory"));
}

#[test]
fn completed_pass_hands_off_to_next_level() {
    let contest = TestContest::new().expect("contest");
    contest.create_level(1).expect("level1");
    contest
        .write_outputs(1, &["level1_a", "level1_b"])
        .expect("outputs");
    let judge = ScriptedJudge::new(level_info(1, 3, &["level1_a", "level1_b"]))
        .with_next_level(level_info(2, 3, &["level2_a"]));
    let vcs = RecordingVcs::new();

    let report = run_pass(contest.root(), &judge, &vcs, &PassOptions::default()).expect("pass");
    assert_eq!(report.state, PassState::Complete);

    let outcome =
        advance_if_complete(contest.root(), &report, &judge, &vcs, TEMPLATE).expect("advance");

    assert!(matches!(
        outcome,
        Some(AdvanceOutcome::Created { level_nr: 2, .. })
    ));
    assert_eq!(vcs.messages(), vec!["level1 done", "level2 start"]);
    assert_eq!(contest.input_stems(2).expect("stems"), vec!["level2_a"]);
}

#[test]
fn partial_pass_does_not_advance() {
    let contest = TestContest::new().expect("contest");
    contest.create_level(1).expect("level1");
    contest.write_outputs(1, &["level1_a"]).expect("outputs");
    let judge = ScriptedJudge::new(level_info(1, 3, &["level1_a", "level1_b"]));
    let vcs = RecordingVcs::new();

    let report = run_pass(contest.root(), &judge, &vcs, &PassOptions::default()).expect("pass");
    let outcome =
        advance_if_complete(contest.root(), &report, &judge, &vcs, TEMPLATE).expect("advance");

    assert_eq!(outcome, None);
    assert!(!contest.paths(2).level_dir.exists());
}

#[test]
fn final_level_does_not_advance() {
    let contest = TestContest::new().expect("contest");
    contest.create_level(3).expect("level3");
    contest.write_outputs(3, &["level3_a"]).expect("outputs");
    let judge = ScriptedJudge::new(level_info(3, 3, &["level3_a"]));
    let vcs = RecordingVcs::new();

    let report = run_pass(contest.root(), &judge, &vcs, &PassOptions::default()).expect("pass");
    assert_eq!(report.state, PassState::Complete);
    assert!(report.final_level);

    let outcome =
        advance_if_complete(contest.root(), &report, &judge, &vcs, TEMPLATE).expect("advance");

    assert_eq!(outcome, None);
    assert_eq!(vcs.messages(), vec!["level3 done"]);
}

#[test]
fn input_archive_is_unpacked_into_level() {
    let contest = TestContest::new().expect("contest");
    contest
        .write_file("template/solve.py", "print()\n")
        .expect("template");
    let mut parts = level_parts(1, 3, &["level1_1", "level1_2"]);
    parts.uses_input_files = true;
    let level = LevelInfo::new(parts).expect("level");
    let judge = ScriptedJudge::new(level).with_input_archive(&[
        ("level1_1.in", "3\n1 2 3\n"),
        ("level1_2.in", "1\n7\n"),
        ("level1_example.in", "2\n1 1\n"),
        ("level1_example.out", "2\n"),
    ]);
    let vcs = RecordingVcs::new();

    next_level(contest.root(), &judge, &vcs, TEMPLATE).expect("advance");

    let paths = contest.paths(1);
    assert_eq!(
        contest.input_stems(1).expect("stems"),
        vec!["level1_1", "level1_2", "level1_example"]
    );
    assert_eq!(
        fs::read_to_string(paths.input_artifact("level1_1")).expect("read"),
        "3\n1 2 3\n"
    );
    assert!(!paths.level_dir.join(SCRIPTED_ARCHIVE_NAME).exists());
    assert!(!paths.input_dir.join("level1_example.out").exists());
    assert_eq!(
        fs::read_to_string(paths.output_artifact("level1_example")).expect("read"),
        "2\n"
    );
    assert_eq!(vcs.messages(), vec!["level1 start"]);
}

#[test]
fn untracked_files_do_not_block_hand_off() {
    let contest = TestContest::new().expect("contest");
    contest.create_level(1).expect("level1");
    contest.write_outputs(1, &["level1_a"]).expect("outputs");
    contest
        .write_file("level1/solve.py", "print()\n")
        .expect("solver");
    contest.init_git().expect("git");
    contest
        .write_file("level1/helper.py", "x = 1\n")
        .expect("helper");
    let judge = ScriptedJudge::new(level_info(1, 3, &["level1_a"]))
        .with_next_level(level_info(2, 3, &["level2_a"]));
    let vcs = Vcs::from_mode(contest.root(), GitMode::Local);

    let report = run_pass(contest.root(), &judge, &vcs, &PassOptions::default()).expect("pass");
    assert_eq!(report.state, PassState::Complete);

    let outcome =
        advance_if_complete(contest.root(), &report, &judge, &vcs, TEMPLATE).expect("advance");

    assert!(matches!(
        outcome,
        Some(AdvanceOutcome::Created { level_nr: 2, .. })
    ));
    assert_eq!(contest.input_stems(2).expect("stems"), vec!["level2_a"]);
}

#[test]
fn tracked_changes_block_next_level() {
    let contest = TestContest::new().expect("contest");
    contest.create_level(1).expect("level1");
    contest
        .write_file("level1/solve.py", "print()\n")
        .expect("solver");
    contest.init_git().expect("git");
    contest
        .write_file("level1/solve.py", "print('edited')\n")
        .expect("edit");
    let judge = ScriptedJudge::new(level_info(2, 3, &["level2_a"]));
    let vcs = Vcs::from_mode(contest.root(), GitMode::Local);

    let err = next_level(contest.root(), &judge, &vcs, TEMPLATE).expect_err("dirty");

    assert!(err.to_string().contains("level1/solve.py"), "{err:#}");
    assert!(!contest.paths(2).level_dir.exists());
}
