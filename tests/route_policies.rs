//! 端到端：路由 + 资源策略 → 验证报告

use std::collections::BTreeSet;

use ids_route_verifier::analysis::{PathSet, StepGraph, StepGraphConfig, parallel_sets};
use ids_route_verifier::formula::{StateFormula, TransitionFormula, TransitionPredicate};
use ids_route_verifier::net::io;
use ids_route_verifier::policy::{
    Action, BinaryOperator, Constraint, ContractOffer, Duty, LeftOperand, PolicyPattern, Resource,
    Rule, build_formula, classify,
};
use ids_route_verifier::route::{Endpoint, Route, RouteBuilder};
use ids_route_verifier::{Outcome, VerificationRequest, Verifier, VerifierConfig};

fn protected(id: &str, rule: Rule) -> Resource {
    let offer = match rule.kind {
        ids_route_verifier::policy::RuleKind::Prohibition => ContractOffer {
            prohibitions: vec![rule],
            ..ContractOffer::default()
        },
        _ => ContractOffer {
            permissions: vec![rule],
            ..ContractOffer::default()
        },
    };
    Resource::new(id).offer(offer)
}

fn outcome(route: &Route, resource: Resource) -> Outcome {
    let rule = resource.rules().next().unwrap().id;
    let report = Verifier::default().verify(route, &[resource.clone()]).unwrap();
    report.verdict(&resource.id, &rule).unwrap().outcome.clone()
}

fn at_most(n: &str) -> Rule {
    Rule::permission("n-times").constraint(Constraint::new(
        LeftOperand::Count,
        BinaryOperator::Lteq,
        n,
    ))
}

/// a -> s1 -> b -> s2 -> c; `b` re-emits R1 so `c` reads it a second time.
fn double_read() -> Route {
    Route::new("double")
        .step(
            Route::new("s1")
                .start(Endpoint::app("a"))
                .end(Endpoint::app("b"))
                .output("R1"),
        )
        .step(
            Route::new("s2")
                .start(Endpoint::app("b"))
                .end(Endpoint::app("c"))
                .output("R1")
                .output("R2"),
        )
}

/// a -> s1 -> b -> s2 -> c -> s3 -> d. `b` reads and erases R1, `c` writes
/// it again and `d` reads it after the erase.
fn read_after_erase() -> Route {
    Route::new("reuse")
        .step(
            Route::new("s1")
                .start(Endpoint::app("a"))
                .end(Endpoint::app("b"))
                .output("R1"),
        )
        .step(
            Route::new("s2")
                .start(Endpoint::app("b"))
                .end(Endpoint::app("c"))
                .output("R2"),
        )
        .step(
            Route::new("s3")
                .start(Endpoint::app("c"))
                .end(Endpoint::app("d"))
                .output("R1"),
        )
}

fn interval() -> Rule {
    Rule::permission("interval")
        .constraint(Constraint::new(
            LeftOperand::PolicyEvaluationTime,
            BinaryOperator::After,
            "2024-01-01T00:00:00Z",
        ))
        .constraint(Constraint::new(
            LeftOperand::PolicyEvaluationTime,
            BinaryOperator::Before,
            "2025-01-01T00:00:00Z",
        ))
}

#[test]
fn single_route_builds_minimal_net() {
    let route = Route::new("r")
        .start(Endpoint::app("in"))
        .end(Endpoint::app("out"))
        .output("R1");
    let built = RouteBuilder::build(&route).unwrap();

    assert_eq!(built.net.transitions_len(), 2);
    assert_eq!(built.net.places_len(), 3);
    let out = built.net.transition_by_id("out").unwrap();
    let context = built.net.transition(out).context.as_ref().unwrap();
    assert_eq!(context.read, BTreeSet::from(["R1".to_owned()]));
}

#[test]
fn prohibited_resource_read_is_a_violation() {
    let route = Route::new("r")
        .start(Endpoint::app("in"))
        .end(Endpoint::app("out"))
        .output("R2");
    let rule = Rule::prohibition("deny");

    assert_eq!(classify(&rule), Some(PolicyPattern::ProhibitAccess));
    assert_eq!(
        outcome(&route, protected("R2", rule.clone())),
        Outcome::Violated {
            message: Some("resource R2 is read".to_owned())
        }
    );
    assert_eq!(outcome(&route, protected("R9", rule)), Outcome::Satisfied);
}

#[test]
fn n_times_counts_reads_along_a_path() {
    let route = double_read();
    assert!(outcome(&route, protected("R1", at_most("1"))).is_violation());
    assert_eq!(outcome(&route, protected("R1", at_most("2"))), Outcome::Satisfied);
    assert_eq!(outcome(&route, protected("R2", at_most("1"))), Outcome::Satisfied);
}

#[test]
fn n_times_formula_evaluates_false_at_source() {
    let built = RouteBuilder::build(&double_read()).unwrap();
    let steps = StepGraph::build(&built.net).unwrap();
    let paths = PathSet::from_step_graph(&steps).unwrap();
    let rule = at_most("1");
    let formula = build_formula(
        PolicyPattern::NTimesUsage,
        &rule,
        "R1",
        &VerifierConfig::default().formula_tags(),
    )
    .unwrap();

    assert!(!formula.evaluate(built.source, &paths));
}

#[test]
fn independent_branches_run_in_parallel() {
    let route = Route::new("root")
        .step(
            Route::new("s1")
                .start(Endpoint::app("E0"))
                .end(Endpoint::app("E1"))
                .output("R1"),
        )
        .step(
            Route::new("s2")
                .start(Endpoint::app("E0"))
                .end(Endpoint::app("E2"))
                .output("R2"),
        );
    let built = RouteBuilder::build(&route).unwrap();
    let sets = parallel_sets(&built.net, &StepGraphConfig::default()).unwrap();

    assert!(sets.iter().any(|set| set.len() >= 2));
    assert!(sets.contains(&BTreeSet::from(["E1".to_owned(), "E2".to_owned()])));
}

#[test]
fn logging_duty_needs_a_tagged_transition_downstream() {
    let logged = Route::new("root")
        .step(
            Route::new("s1")
                .start(Endpoint::app("a"))
                .end(Endpoint::app("b"))
                .output("R1"),
        )
        .step(
            Route::new("s2")
                .start(Endpoint::app("b"))
                .end(Endpoint::app("log").tag("logging"))
                .output("R2"),
        );
    let unlogged = Route::new("plain")
        .start(Endpoint::app("a"))
        .end(Endpoint::app("b"))
        .output("R1");
    let rule = Rule::permission("log").post_duty(Duty::action(Action::Log));

    assert_eq!(outcome(&logged, protected("R1", rule.clone())), Outcome::Satisfied);
    assert!(outcome(&unlogged, protected("R1", rule)).is_violation());
}

#[test]
fn control_reader_never_erases() {
    let erased = Route::new("r")
        .start(Endpoint::app("a"))
        .end(Endpoint::app("b"))
        .output("R1");
    let kept = Route::new("r")
        .start(Endpoint::app("a"))
        .end(Endpoint::control("gateway"))
        .output("R1");
    let rule = Rule::permission("duration").constraint(Constraint::new(
        LeftOperand::ElapsedTime,
        BinaryOperator::ShorterEq,
        "PT1H",
    ));

    assert_eq!(outcome(&erased, protected("R1", rule.clone())), Outcome::Satisfied);
    assert_eq!(
        outcome(&kept, protected("R1", rule)),
        Outcome::Violated {
            message: Some("resource R1 is read; resource R1 is not erased".to_owned())
        }
    );
}

#[test]
fn connector_restriction_checks_reader_tags() {
    let rule = Rule::permission("system").constraint(Constraint::new(
        LeftOperand::System,
        BinaryOperator::Eq,
        "connector-1",
    ));
    let trusted = Route::new("r")
        .start(Endpoint::app("a"))
        .end(Endpoint::app("b").tag("connector-1"))
        .output("R1");
    let foreign = Route::new("r")
        .start(Endpoint::app("a"))
        .end(Endpoint::app("b").tag("connector-2"))
        .output("R1");

    assert_eq!(outcome(&trusted, protected("R1", rule.clone())), Outcome::Satisfied);
    assert!(outcome(&foreign, protected("R1", rule)).is_violation());
}

#[test]
fn dualities_hold_on_every_place() {
    let built = RouteBuilder::build(&double_read()).unwrap();
    let steps = StepGraph::build(&built.net).unwrap();
    let paths = PathSet::from_step_graph(&steps).unwrap();
    let reads = TransitionFormula::predicate(TransitionPredicate::reads("R1"));
    let read_next = StateFormula::modal(reads.clone());

    for place in built.net.places.indices() {
        assert_eq!(
            StateFormula::forall_next(reads.clone()).evaluate(place, &paths),
            !StateFormula::exist_next(!reads.clone()).evaluate(place, &paths)
        );
        assert_eq!(
            StateFormula::inv(read_next.clone()).evaluate(place, &paths),
            !StateFormula::pos(!read_next.clone()).evaluate(place, &paths)
        );
    }
}

#[test]
fn deep_copy_is_independent() {
    let built = RouteBuilder::build(&double_read()).unwrap();
    let mut copy = built.net.deep_copy();
    assert_eq!(copy, built.net);

    let s1 = copy.place_by_id("s1").unwrap();
    copy.places[s1].markers = 3;
    assert_eq!(built.net.place(s1).markers, 0);
    assert_ne!(copy, built.net);
}

#[test]
fn json_request_end_to_end() {
    let json = r#"{
        "route": {
            "id": "r",
            "startEndpoints": [{"id": "in"}],
            "endEndpoints": [{"id": "out", "contextTags": ["logging"]}],
            "outputResources": ["R1"]
        },
        "resources": [{
            "id": "R1",
            "contractOffers": [{
                "permissions": [
                    {"id": "use"},
                    {"id": "log", "postDuties": [{"actions": ["LOG"]}]},
                    {"id": "twice", "constraints": [
                        {"leftOperand": "COUNT", "operator": "LTEQ", "rightOperand": "2"}
                    ]}
                ],
                "prohibitions": [{"id": "deny"}]
            }]
        }]
    }"#;
    let request: VerificationRequest = io::from_json_str(json).unwrap();
    let report = Verifier::default().verify_request(&request).unwrap();

    let outcomes: Vec<_> = report
        .verdicts
        .iter()
        .map(|v| (v.rule.as_str(), v.outcome.is_violation()))
        .collect();
    assert_eq!(
        outcomes,
        vec![("use", false), ("log", false), ("twice", false), ("deny", true)]
    );
    assert!(!report.is_compliant());
    assert_eq!(report.net.steps, Some(3));
}

#[test]
fn large_usage_counts_are_verified() {
    let route = Route::new("r")
        .start(Endpoint::app("in"))
        .end(Endpoint::app("out"))
        .output("R1");

    assert_eq!(outcome(&route, protected("R1", at_most("100000"))), Outcome::Satisfied);
    assert_eq!(outcome(&route, protected("R1", at_most("1e30"))), Outcome::Satisfied);
    assert!(outcome(&double_read(), protected("R1", at_most("1"))).is_violation());
}

#[test]
fn deletion_rejects_a_read_after_the_erase() {
    let route = read_after_erase();
    let deletion = interval().post_duty(Duty::action(Action::Delete));

    assert_eq!(classify(&deletion), Some(PolicyPattern::UsageUntilDeletion));
    assert_eq!(outcome(&route, protected("R1", interval())), Outcome::Satisfied);
    assert_eq!(
        outcome(&route, protected("R1", deletion)),
        Outcome::Violated {
            message: Some("resource R1 is erased; resource R1 is read".to_owned())
        }
    );
}

#[test]
fn interval_needs_an_erase_after_every_read() {
    let kept = Route::new("r")
        .start(Endpoint::app("a"))
        .end(Endpoint::control("gateway"))
        .output("R1");

    assert_eq!(classify(&interval()), Some(PolicyPattern::UsageDuringInterval));
    assert!(outcome(&kept, protected("R1", interval())).is_violation());
    assert_eq!(outcome(&double_read(), protected("R2", interval())), Outcome::Satisfied);
}

#[test]
fn notification_duty_reports_the_missing_tag() {
    let rule = Rule::permission("notify").post_duty(Duty::action(Action::Notify));
    let notified = Route::new("r")
        .start(Endpoint::app("a"))
        .end(Endpoint::app("b").tag("notification"))
        .output("R1");

    assert_eq!(classify(&rule), Some(PolicyPattern::UsageNotification));
    assert_eq!(outcome(&notified, protected("R1", rule.clone())), Outcome::Satisfied);
    assert_eq!(
        outcome(&read_after_erase(), protected("R1", rule)),
        Outcome::Violated {
            message: Some("resource R1 is read; tag notification is missing".to_owned())
        }
    );
}
