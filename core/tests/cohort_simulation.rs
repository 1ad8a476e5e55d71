//! Cohort simulation engine tests: record invariants, state transitions,
//! transfers, repeats, and single-year stepping.

use cohortsim_core::{
    catalog::{generate_catalog, Programme, StudyMode},
    config::SimConfig,
    engine::{CohortEngine, SimulationOutput, SimulationParams, YearStep},
    error::SimError,
    event::CohortEvent,
    model::{ATTENDANCE_MAX, ATTENDANCE_MIN, GPA_MAX, GPA_MIN},
    population::{generate_population, Student},
    records::{EnrolmentRecord, RegistrationStatus},
    rng::{RngBank, StageSlot},
    state::CohortState,
};
use std::collections::{HashMap, HashSet};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn build_inputs(cfg: &SimConfig) -> (Vec<Programme>, Vec<Student>) {
    let bank = RngBank::new(cfg.seed);
    let programmes = generate_catalog(
        cfg,
        &mut bank.for_stage(StageSlot::Catalog),
        &mut bank.for_stage(StageSlot::CatalogNoise),
    )
    .unwrap();
    let students = generate_population(
        cfg,
        cfg.total_students(),
        &mut bank.for_stage(StageSlot::Population),
        &mut bank.for_stage(StageSlot::EntryRouteMissing),
        &mut bank.for_stage(StageSlot::GenderMissing),
    )
    .unwrap();
    (programmes, students)
}

fn simulate(cfg: &SimConfig) -> (Vec<Programme>, SimulationOutput) {
    let (programmes, students) = build_inputs(cfg);
    let output = CohortEngine::new(&programmes, &students, cfg.simulation_params())
        .unwrap()
        .run(
            &cfg.academic_years,
            cfg.new_entrants_per_year,
            &mut RngBank::new(cfg.seed).for_stage(StageSlot::Simulation),
        )
        .unwrap();
    (programmes, output)
}

fn year_index(cfg: &SimConfig) -> HashMap<&str, usize> {
    cfg.academic_years.iter().enumerate().map(|(i, y)| (y.as_str(), i)).collect()
}

/// (student, year index) → enrolment row.
fn by_student_year<'r>(
    cfg: &SimConfig,
    rows: &'r [EnrolmentRecord],
) -> HashMap<(String, usize), &'r EnrolmentRecord> {
    let idx = year_index(cfg);
    rows.iter()
        .map(|r| ((r.student_id.clone(), idx[r.academic_year.as_str()]), r))
        .collect()
}

fn programme(id: &str, faculty: &str, mode: StudyMode, difficulty: f64) -> Programme {
    Programme {
        programme_id: id.into(),
        name: format!("Honours Degree in {faculty} Studies"),
        faculty: faculty.into(),
        qualification_level: 8,
        mode,
        campus: "Athlone".into(),
        difficulty_factor: difficulty,
    }
}

// ── Record invariants ────────────────────────────────────────────────────────

#[test]
fn events_only_mention_simulated_students() {
    let (_, out) = simulate(&SimConfig::default_test());
    let enrolled: HashSet<&str> = out.enrolments.iter().map(|e| e.student_id.as_str()).collect();
    for ev in &out.events {
        assert!(enrolled.contains(ev.student_id()), "{ev:?} has no enrolment rows");
    }
}

#[test]
fn performance_values_are_clipped_before_injection() {
    let (_, out) = simulate(&SimConfig::default_test());
    assert!(!out.performance.is_empty());

    for p in &out.performance {
        let gpa = p.gpa.expect("raw output has no missing gpa");
        let att = p.attendance_rate.expect("raw output has no missing attendance");
        assert!((GPA_MIN..=GPA_MAX).contains(&gpa), "gpa {gpa} out of range");
        assert!((ATTENDANCE_MIN..=ATTENDANCE_MAX).contains(&att), "attendance {att} out of range");
    }
}

#[test]
fn entrant_flag_iff_first_year_of_study() {
    let (_, out) = simulate(&SimConfig::default_test());
    for e in &out.enrolments {
        assert_eq!(
            e.entrant_flag,
            e.year_of_study == 1,
            "{} in {}: entrant_flag={} year_of_study={}",
            e.student_id,
            e.academic_year,
            e.entrant_flag,
            e.year_of_study
        );
        assert_eq!(e.registration_status, RegistrationStatus::Registered);
    }
}

#[test]
fn one_enrolment_and_one_performance_row_per_student_year() {
    let (_, out) = simulate(&SimConfig::default_test());

    let enrol: HashSet<(&str, &str)> = out
        .enrolments
        .iter()
        .map(|e| (e.student_id.as_str(), e.academic_year.as_str()))
        .collect();
    assert_eq!(enrol.len(), out.enrolments.len(), "Duplicate enrolment rows before injection");

    let perf: HashSet<(&str, &str)> = out
        .performance
        .iter()
        .map(|p| (p.student_id.as_str(), p.academic_year.as_str()))
        .collect();
    assert_eq!(perf.len(), out.performance.len(), "Duplicate performance rows before injection");
    assert_eq!(enrol, perf, "Enrolment and performance grains must match");
}

#[test]
fn credits_follow_programme_mode() {
    let (programmes, out) = simulate(&SimConfig::default_test());
    let modes: HashMap<&str, StudyMode> =
        programmes.iter().map(|p| (p.programme_id.as_str(), p.mode)).collect();

    for e in &out.enrolments {
        assert_eq!(e.credits_attempted, modes[e.programme_id.as_str()].credits_attempted());
    }
}

#[test]
fn every_entrant_enters_in_exactly_one_year() {
    let cfg = SimConfig::default_test();
    let (_, out) = simulate(&cfg);

    let mut entry_years: HashMap<&str, HashSet<&str>> = HashMap::new();
    for e in out.enrolments.iter().filter(|e| e.entrant_flag) {
        entry_years.entry(&e.student_id).or_default().insert(&e.academic_year);
    }
    for (student, years) in &entry_years {
        assert_eq!(years.len(), 1, "{student} entered in {years:?}");
    }

    let admitted = out
        .events
        .iter()
        .filter(|e| matches!(e, CohortEvent::EntrantAdmitted { .. }))
        .count();
    assert_eq!(admitted, cfg.new_entrants_per_year * cfg.academic_years.len());
}

#[test]
fn once_inactive_always_inactive() {
    let cfg = SimConfig::default_test();
    let (_, out) = simulate(&cfg);
    let idx = year_index(&cfg);

    let mut years_by_student: HashMap<&str, Vec<usize>> = HashMap::new();
    for e in &out.enrolments {
        years_by_student.entry(&e.student_id).or_default().push(idx[e.academic_year.as_str()]);
    }
    for (student, mut years) in years_by_student {
        years.sort_unstable();
        for pair in years.windows(2) {
            assert_eq!(pair[1], pair[0] + 1, "{student} has a gap in {years:?}");
        }
    }

    for ev in &out.events {
        if let CohortEvent::StudentDeparted { academic_year, student_id, .. } = ev {
            let y = idx[academic_year.as_str()];
            assert!(
                !out.enrolments
                    .iter()
                    .any(|e| &e.student_id == student_id && idx[e.academic_year.as_str()] > y),
                "{student_id} departed in {academic_year} but has later records"
            );
        }
    }
}

#[test]
fn year_of_study_advances_by_one_without_repeats() {
    let cfg = SimConfig { repeat_rate_if_low_gpa: 0.0, ..SimConfig::default_test() };
    let (_, out) = simulate(&cfg);
    let rows = by_student_year(&cfg, &out.enrolments);

    for ((student, y), row) in &rows {
        if let Some(next) = rows.get(&(student.clone(), y + 1)) {
            assert_eq!(next.year_of_study, row.year_of_study + 1, "{student} did not advance");
        }
    }
}

#[test]
fn final_year_makes_no_transition_decisions() {
    let cfg = SimConfig::default_test();
    let (_, out) = simulate(&cfg);
    let last_year = cfg.academic_years.last().unwrap();

    let last = out.summaries.last().unwrap();
    assert_eq!(&last.academic_year, last_year);
    assert_eq!(last.retained + last.departed + last.transferred + last.repeated, 0);
    assert!(last.active > 0);

    assert!(out.events.iter().all(|e| match e {
        CohortEvent::EntrantAdmitted { .. } => true,
        CohortEvent::StudentDeparted { academic_year, .. }
        | CohortEvent::StudentTransferred { academic_year, .. }
        | CohortEvent::StudentRepeatedYear { academic_year, .. } => academic_year != last_year,
    }));
}

#[test]
fn year_summaries_chain_retained_plus_entrants() {
    let cfg = SimConfig::default_test();
    let (_, out) = simulate(&cfg);

    for pair in out.summaries.windows(2) {
        assert_eq!(pair[0].active, pair[0].retained + pair[0].departed);
        assert_eq!(
            pair[1].active,
            pair[0].retained + pair[1].entrants,
            "{} active count does not chain from {}",
            pair[1].academic_year,
            pair[0].academic_year
        );
    }
    let total_active: usize = out.summaries.iter().map(|s| s.active).sum();
    assert_eq!(total_active, out.enrolments.len());
}

// ── Transfers and repeats ────────────────────────────────────────────────────

#[test]
fn transfers_stay_within_the_same_faculty() {
    let cfg = SimConfig {
        n_programmes: 12,
        transfer_rate: 1.0,
        academic_years: vec!["2020/21".into(), "2021/22".into(), "2022/23".into(), "2023/24".into()],
        ..SimConfig::default_test()
    };
    let (programmes, out) = simulate(&cfg);
    let by_id: HashMap<&str, &Programme> =
        programmes.iter().map(|p| (p.programme_id.as_str(), p)).collect();
    let rows = by_student_year(&cfg, &out.enrolments);
    let idx = year_index(&cfg);

    let mut transfers = 0;
    for ev in &out.events {
        if let CohortEvent::StudentTransferred {
            academic_year,
            student_id,
            from_programme_id,
            to_programme_id,
        } = ev
        {
            transfers += 1;
            let from = by_id[from_programme_id.as_str()];
            let to = by_id[to_programme_id.as_str()];
            assert_ne!(from.programme_id, to.programme_id, "Transfer to the same programme");
            assert_eq!(from.faculty_key(), to.faculty_key(), "Transfer crossed faculties");

            let next = rows[&(student_id.clone(), idx[academic_year.as_str()] + 1)];
            assert_eq!(&next.programme_id, to_programme_id, "Next year not in new programme");
        }
    }
    assert!(transfers > 0, "transfer_rate=1.0 should produce transfers");
}

#[test]
fn single_programme_faculties_never_transfer() {
    let catalog = vec![
        programme("PRG001", "Computing", StudyMode::FullTime, 0.90),
        programme("PRG002", "Arts", StudyMode::PartTime, 0.90),
    ];
    let cfg = SimConfig { transfer_rate: 1.0, total_students: Some(200), ..SimConfig::default_test() };
    let (_, students) = build_inputs(&cfg);

    let out = CohortEngine::new(&catalog, &students, cfg.simulation_params())
        .unwrap()
        .run(&cfg.academic_years, 60, &mut RngBank::new(3).for_stage(StageSlot::Simulation))
        .unwrap();

    assert!(out.summaries.iter().all(|s| s.transferred == 0));
    assert!(!out.events.iter().any(|e| matches!(e, CohortEvent::StudentTransferred { .. })));
}

#[test]
fn faculty_matching_ignores_casing_noise() {
    let catalog = vec![
        programme("PRG001", "Computing", StudyMode::FullTime, 0.90),
        programme("PRG002", "computing", StudyMode::FullTime, 0.90),
    ];
    let cfg = SimConfig { transfer_rate: 1.0, ..SimConfig::default_test() };
    let (_, students) = build_inputs(&cfg);

    let out = CohortEngine::new(&catalog, &students, cfg.simulation_params())
        .unwrap()
        .run(&cfg.academic_years, 60, &mut RngBank::new(5).for_stage(StageSlot::Simulation))
        .unwrap();

    let retained_first_year = out.summaries[0].retained;
    assert!(retained_first_year > 0);
    assert_eq!(
        out.summaries[0].transferred, retained_first_year,
        "Every retained student should move to the other 'computing' programme"
    );
}

#[test]
fn low_gpa_students_repeat_when_repeat_rate_is_certain() {
    let cfg = SimConfig {
        new_entrants_per_year: 400,
        transfer_rate: 0.0,
        repeat_rate_if_low_gpa: 1.0,
        ..SimConfig::default_test()
    };
    let (_, out) = simulate(&cfg);
    let rows = by_student_year(&cfg, &out.enrolments);
    let idx = year_index(&cfg);

    let mut repeats = 0;
    for ev in &out.events {
        if let CohortEvent::StudentRepeatedYear { academic_year, student_id, year_of_study } = ev {
            repeats += 1;
            let y = idx[academic_year.as_str()];
            let next = rows[&(student_id.clone(), y + 1)];
            assert_eq!(next.year_of_study, *year_of_study, "{student_id} should repeat");

            let gpa = out
                .performance
                .iter()
                .find(|p| &p.student_id == student_id && &p.academic_year == academic_year)
                .and_then(|p| p.gpa)
                .unwrap();
            assert!(gpa <= 1.8, "{student_id} repeated with gpa {gpa}");
        }
    }
    assert!(repeats > 0, "repeat_rate=1.0 should hold some low-GPA students back");

    // Conversely: clearly-low GPA + retained ⇒ repeated.
    for p in &out.performance {
        let y = idx[p.academic_year.as_str()];
        let (Some(gpa), Some(next)) = (p.gpa, rows.get(&(p.student_id.clone(), y + 1))) else {
            continue;
        };
        if gpa < 1.79 {
            let this = rows[&(p.student_id.clone(), y)];
            assert_eq!(next.year_of_study, this.year_of_study, "{} gpa {gpa}", p.student_id);
        }
    }
}

#[test]
fn year_of_study_starts_at_one_and_never_skips_under_mixed_rates() {
    for seed in 1..=8 {
        let cfg = SimConfig {
            seed,
            transfer_rate: 0.3,
            repeat_rate_if_low_gpa: 0.5,
            new_entrants_per_year: 200,
            academic_years: vec![
                "2020/21".into(),
                "2021/22".into(),
                "2022/23".into(),
                "2023/24".into(),
            ],
            ..SimConfig::default_test()
        };
        let (_, out) = simulate(&cfg);
        let idx = year_index(&cfg);

        let mut history: HashMap<&str, Vec<(usize, u32)>> = HashMap::new();
        for e in &out.enrolments {
            history
                .entry(&e.student_id)
                .or_default()
                .push((idx[e.academic_year.as_str()], e.year_of_study));
        }

        for (student, mut rows) in history {
            rows.sort_unstable();
            assert_eq!(rows[0].1, 1, "seed {seed}: {student} first row {rows:?}");
            for pair in rows.windows(2) {
                let (before, after) = (pair[0].1, pair[1].1);
                assert!(
                    after == before || after == before + 1,
                    "seed {seed}: {student} jumped from year {before} to {after}"
                );
            }
        }
    }
}

// ── Single-year stepping ─────────────────────────────────────────────────────

#[test]
fn advance_one_year_in_isolation() {
    let cfg = SimConfig::default_test();
    let (programmes, students) = build_inputs(&cfg);
    let params = SimulationParams { transfer_rate: 0.0, repeat_rate_if_low_gpa: 0.0 };
    let engine = CohortEngine::new(&programmes, &students, params).unwrap();
    let mut rng = RngBank::new(9).for_stage(StageSlot::Simulation);

    let entrants: Vec<String> = students.iter().take(25).map(|s| s.student_id.clone()).collect();
    let mut state = CohortState::new();
    let step = YearStep { academic_year: "2020/21", entrants: &entrants, final_year: false };
    let out = engine.advance_one_year(&mut state, &step, &mut rng).unwrap();

    assert_eq!(out.enrolments.len(), 25);
    assert_eq!(out.performance.len(), 25);
    assert_eq!(out.summary.entrants, 25);
    assert!(out.enrolments.iter().all(|e| e.year_of_study == 1 && e.entrant_flag));
    assert_eq!(state.len(), 25);
    assert_eq!(state.active_count(), out.summary.retained);

    for s in state.iter().filter(|s| s.active) {
        assert_eq!(s.year_of_study, 2, "Retained students move to year 2 without repeats here");
    }
    for ev in &out.events {
        if let CohortEvent::StudentDeparted { student_id, .. } = ev {
            let st = state.get(student_id).expect("departed students stay in the table");
            assert!(!st.active, "{student_id} departed but is still active");
            assert_eq!(st.year_of_study, 1);
        }
    }

    // Second step with no new entrants only sees the retained students.
    let step = YearStep { academic_year: "2021/22", entrants: &[], final_year: true };
    let out2 = engine.advance_one_year(&mut state, &step, &mut rng).unwrap();
    assert_eq!(out2.enrolments.len(), out.summary.retained);
    assert_eq!(state.active_count(), out.summary.retained, "Final year keeps everyone active");
}

#[test]
fn admitting_a_student_twice_is_rejected() {
    let cfg = SimConfig::default_test();
    let (programmes, students) = build_inputs(&cfg);
    let engine = CohortEngine::new(&programmes, &students, cfg.simulation_params()).unwrap();
    let mut rng = RngBank::new(1).for_stage(StageSlot::Simulation);
    let mut state = CohortState::new();

    let entrants = vec![students[0].student_id.clone()];
    let step = YearStep { academic_year: "2020/21", entrants: &entrants, final_year: false };
    engine.advance_one_year(&mut state, &step, &mut rng).unwrap();

    let step = YearStep { academic_year: "2021/22", entrants: &entrants, final_year: false };
    let err = engine.advance_one_year(&mut state, &step, &mut rng).unwrap_err();
    assert!(matches!(err, SimError::DuplicateEntrant { .. }), "got {err}");
}

#[test]
fn unknown_entrant_is_rejected() {
    let cfg = SimConfig::default_test();
    let (programmes, students) = build_inputs(&cfg);
    let engine = CohortEngine::new(&programmes, &students, cfg.simulation_params()).unwrap();
    let mut rng = RngBank::new(1).for_stage(StageSlot::Simulation);

    let entrants = vec!["STU999999".to_string()];
    let step = YearStep { academic_year: "2020/21", entrants: &entrants, final_year: false };
    let err = engine.advance_one_year(&mut CohortState::new(), &step, &mut rng).unwrap_err();
    assert!(matches!(err, SimError::UnknownStudent { .. }), "got {err}");
}

#[test]
fn empty_catalog_is_rejected() {
    let (_, students) = build_inputs(&SimConfig::default_test());
    let params = SimulationParams { transfer_rate: 0.0, repeat_rate_if_low_gpa: 0.0 };
    assert!(CohortEngine::new(&[], &students, params).is_err());
}

#[test]
fn short_population_yields_short_cohorts() {
    let cfg = SimConfig { total_students: Some(30), new_entrants_per_year: 20, ..SimConfig::default_test() };
    let (programmes, students) = build_inputs(&cfg);
    let engine = CohortEngine::new(&programmes, &students, cfg.simulation_params()).unwrap();

    let cohorts = engine.plan_cohorts(3, 20, &mut RngBank::new(2).for_stage(StageSlot::Simulation));
    let sizes: Vec<usize> = cohorts.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![20, 10, 0]);

    let all: HashSet<&String> = cohorts.iter().flatten().collect();
    assert_eq!(all.len(), 30, "Cohorts must be disjoint and cover the population");
}
