//! Shared problem fixtures for tests.

use copa_core::{App, InstanceClass, LimitingSet, PerformanceSet, Problem, TimeUnit, Workload};

/// Two apps served by two interchangeable classes, one reserved and cheaper.
/// Four hourly timeslots, three distinct workload tuples.
pub fn minimal_problem() -> Problem {
    let mut perf = PerformanceSet::new("perf1", TimeUnit::Hour);
    perf.set("m3large", "a0", 10.0);
    perf.set("m3large", "a1", 500.0);
    perf.set("m3large_r", "a0", 10.0);
    perf.set("m3large_r", "a1", 500.0);
    Problem::new(
        "problem1",
        "minimal",
        vec![
            Workload::new("w0", App::new("a0", "App 0"), TimeUnit::Hour, vec![30, 32, 30, 30]),
            Workload::new("w1", App::new("a1", "App 1"), TimeUnit::Hour, vec![1003, 1200, 1194, 1003]),
        ],
        vec![
            InstanceClass::new("m3large", "m3large", 10.0, TimeUnit::Hour, false)
                .with_limiting_sets(["cloud1"]),
            InstanceClass::new("m3large_r", "m3large_r", 7.0, TimeUnit::Hour, true)
                .with_limiting_sets(["cloudr"]),
        ],
        vec![
            LimitingSet::new("cloud1", "Cloud1"),
            LimitingSet::new("cloudr", "CloudR").with_max_vms(20),
        ],
        perf,
    )
}

/// [`minimal_problem`] under core caps: reserved cores become the scarce
/// resource.
pub fn core_limited_problem() -> Problem {
    let mut problem = minimal_problem();
    problem.limiting_sets = vec![
        LimitingSet::new("cloud1", "Cloud1")
            .with_max_vms(20)
            .with_max_cores(20),
        LimitingSet::new("cloudr", "CloudR")
            .with_max_vms(20)
            .with_max_cores(10),
    ];
    problem.instance_classes[0].cores = 2.0;
    problem.instance_classes[1].cores = 4.0;
    problem
}

/// Two apps, a reserved zonal class and a bigger on-demand class, ten
/// hourly slots with one pronounced peak.
pub fn example1_problem() -> Problem {
    let mut perf = PerformanceSet::new("perf-example1", TimeUnit::Hour);
    perf.set("m3large_z1", "a0", 12.0);
    perf.set("m3large_z1", "a1", 500.0);
    perf.set("m4xlarge_r1", "a0", 44.0);
    perf.set("m4xlarge_r1", "a1", 1800.0);
    Problem::new(
        "example1",
        "two apps, two classes",
        vec![
            Workload::new(
                "ltwp0",
                App::new("a0", "App 0"),
                TimeUnit::Hour,
                vec![201, 203, 180, 220, 190, 211, 199, 204, 500, 200],
            ),
            Workload::new(
                "ltwp1",
                App::new("a1", "App 1"),
                TimeUnit::Hour,
                vec![2010, 2035, 1807, 2202, 1910, 2110, 1985, 2033, 5050, 1992],
            ),
        ],
        vec![
            InstanceClass::new("m3large_z1", "m3large_z1", 7.0, TimeUnit::Hour, true)
                .with_max_vms(20)
                .with_limiting_sets(["r1_z1"]),
            InstanceClass::new("m4xlarge_r1", "m4xlarge_r1", 10.0, TimeUnit::Hour, false)
                .with_max_vms(10)
                .with_limiting_sets(["r1"]),
        ],
        vec![
            LimitingSet::new("r1_z1", "region 1 zone 1").with_max_vms(20),
            LimitingSet::new("r1", "region 1").with_max_vms(20),
        ],
        perf,
    )
}
