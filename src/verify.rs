//! 验证流程：路由 → 网 → 步图 → 路径集 → 每条规则的结论.
use std::collections::BTreeSet;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{PathSet, SimulationError, StepGraph, parallel_sets};
use crate::config::VerifierConfig;
use crate::net::{NetError, PetriNet};
use crate::policy::{LeftOperand, PolicyPattern, Resource, Rule, build_formula_for, classify};
use crate::report::{NetStatistics, Outcome, RuleVerdict, VerificationReport};
use crate::route::{Route, RouteBuilder, RouteNet};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Net(#[from] NetError),
}

/// 路由及其必须遵守策略的资源.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub route: Route,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// 由一条路由推导出的全部结果，归单次验证独占.
#[derive(Debug)]
pub struct RouteAnalysis {
    pub route: RouteNet,
    /// 探索超出配置上限时为 `Err`.
    pub state_space: Result<(StepGraph, PathSet), SimulationError>,
    /// 仅在存在 N_TIMES_USAGE 规则时计算.
    pub parallel_sets: Option<Result<Vec<BTreeSet<String>>, SimulationError>>,
}

impl RouteAnalysis {
    pub fn net(&self) -> &PetriNet {
        &self.route.net
    }

    pub fn statistics(&self) -> NetStatistics {
        let (steps, paths) = match &self.state_space {
            Ok((steps, paths)) => (Some(steps.step_count()), Some(paths.len())),
            Err(_) => (None, None),
        };
        NetStatistics {
            places: self.net().places_len(),
            transitions: self.net().transitions_len(),
            arcs: self.net().arcs_len(),
            steps,
            paths,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Verifier {
    config: VerifierConfig,
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Builds the net and explores it. Bound exhaustion is kept in the
    /// analysis rather than returned, so it can surface as inconclusive.
    pub fn analyse(&self, route: &Route) -> Result<RouteAnalysis, VerifyError> {
        let built = RouteBuilder::build(route)?;
        let state_space = StepGraph::with_config(&built.net, &self.config.step_graph())
            .and_then(|steps| {
                let paths = PathSet::with_limit(&steps, self.config.path_limit)?;
                Ok((steps, paths))
            });
        if let Err(err) = &state_space {
            warn!("route {}: {}", route.id, err);
        }
        Ok(RouteAnalysis {
            route: built,
            state_space,
            parallel_sets: None,
        })
    }

    pub fn verify_request(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationReport, VerifyError> {
        self.verify(&request.route, &request.resources)
    }

    pub fn verify(
        &self,
        route: &Route,
        resources: &[Resource],
    ) -> Result<VerificationReport, VerifyError> {
        Ok(self.verify_analysed(self.analyse(route)?, resources))
    }

    /// Verifies `resources` against a route explored by [`Verifier::analyse`].
    pub fn verify_analysed(
        &self,
        mut analysis: RouteAnalysis,
        resources: &[Resource],
    ) -> VerificationReport {
        let needs_parallel = self.config.check_parallel_reads
            && resources
                .iter()
                .flat_map(Resource::rules)
                .any(|rule| classify(&rule) == Some(PolicyPattern::NTimesUsage));
        if needs_parallel {
            analysis.parallel_sets =
                Some(parallel_sets(analysis.net(), &self.config.step_graph()));
        }

        let route_id = analysis.route.net.id.clone();
        let mut report = VerificationReport::new(route_id, analysis.statistics());
        if let Some(Ok(sets)) = &analysis.parallel_sets {
            report.parallel_sets = sets
                .iter()
                .map(|set| set.iter().cloned().collect())
                .collect();
        }
        for resource in resources {
            for rule in resource.rules() {
                report
                    .verdicts
                    .push(self.verify_rule(&analysis, &resource.id, &rule));
            }
        }

        info!(
            "route {}: {} verdicts, {} violations",
            report.route,
            report.verdicts.len(),
            report.violations().count()
        );
        report
    }

    /// 针对已分析路由，对保护 `target` 的一条规则给出结论.
    pub fn verify_rule(&self, analysis: &RouteAnalysis, target: &str, rule: &Rule) -> RuleVerdict {
        let mut verdict = RuleVerdict {
            resource: target.to_owned(),
            rule: rule.id.clone(),
            pattern: classify(rule),
            formula: None,
            outcome: Outcome::Satisfied,
        };

        let Some(pattern) = verdict.pattern else {
            verdict.outcome = Outcome::Skipped {
                reason: "rule shape not recognised".to_owned(),
            };
            return verdict;
        };

        let tags = self.config.formula_tags();
        let formula = match build_formula_for(analysis.net(), pattern, rule, target, &tags) {
            Ok(formula) => formula,
            Err(err) => {
                verdict.outcome = Outcome::Skipped {
                    reason: err.to_string(),
                };
                return verdict;
            }
        };
        verdict.formula = Some(formula.write_formula());

        verdict.outcome = match &analysis.state_space {
            Err(err) => Outcome::Inconclusive {
                reason: err.to_string(),
            },
            Ok((_, paths)) => {
                let result = formula.verdict(analysis.route.source, paths);
                if !result.satisfied {
                    Outcome::Violated {
                        message: result.message,
                    }
                } else if pattern == PolicyPattern::NTimesUsage {
                    self.parallel_read_outcome(analysis, target, rule)
                } else {
                    Outcome::Satisfied
                }
            }
        };

        info!(
            "[{}] rule {} ({}): {}",
            target, rule.id, pattern, verdict.outcome
        );
        verdict
    }

    /// Rejects an N_TIMES_USAGE rule when more transitions reading `target`
    /// can run at once than the bound allows.
    fn parallel_read_outcome(&self, analysis: &RouteAnalysis, target: &str, rule: &Rule) -> Outcome {
        let sets = match &analysis.parallel_sets {
            None => return Outcome::Satisfied,
            Some(Err(err)) => {
                return Outcome::Inconclusive {
                    reason: err.to_string(),
                };
            }
            Some(Ok(sets)) => sets,
        };
        let Some(bound) = rule
            .constraint_on(LeftOperand::Count)
            .and_then(|c| c.right_operand.trim().parse::<f64>().ok())
        else {
            return Outcome::Satisfied;
        };

        let net = analysis.net();
        let readers_at_once = sets
            .iter()
            .map(|set| {
                set.iter()
                    .filter_map(|id| net.transition_by_id(id))
                    .filter_map(|t| net.transition(t).context.as_ref())
                    .filter(|context| context.reads(target))
                    .count()
            })
            .max()
            .unwrap_or(0);

        if readers_at_once as f64 > bound {
            Outcome::Violated {
                message: Some(format!(
                    "{readers_at_once} concurrent reads of {target} exceed bound {bound}"
                )),
            }
        } else {
            Outcome::Satisfied
        }
    }
}
