use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::net::io::{self, IoError};
use crate::policy::PolicyPattern;

/// 单个 (规则, 资源, 路由) 三元组的结论.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Satisfied,
    /// 路由的某次执行违反了规则.
    Violated { message: Option<String> },
    /// 得出结论前探索已达到配置上限.
    Inconclusive { reason: String },
    /// 该规则没有对应公式.
    Skipped { reason: String },
}

impl Outcome {
    pub fn is_violation(&self) -> bool {
        matches!(self, Outcome::Violated { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Satisfied => write!(f, "satisfied"),
            Outcome::Violated { message: Some(m) } => write!(f, "violated ({m})"),
            Outcome::Violated { message: None } => write!(f, "violated"),
            Outcome::Inconclusive { reason } => write!(f, "inconclusive: {reason}"),
            Outcome::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleVerdict {
    pub resource: String,
    pub rule: String,
    pub pattern: Option<PolicyPattern>,
    /// 所求值公式的规范形式.
    pub formula: Option<String>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetStatistics {
    pub places: usize,
    pub transitions: usize,
    pub arcs: usize,
    /// 探索被截断时为 `None`.
    pub steps: Option<usize>,
    pub paths: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub route: String,
    pub net: NetStatistics,
    /// 可能同时执行的迁移集合.
    pub parallel_sets: Vec<Vec<String>>,
    pub verdicts: Vec<RuleVerdict>,
}

impl VerificationReport {
    pub fn new(route: impl Into<String>, net: NetStatistics) -> Self {
        Self {
            route: route.into(),
            net,
            ..Self::default()
        }
    }

    /// No rule is violated. Inconclusive and skipped rules do not count.
    pub fn is_compliant(&self) -> bool {
        !self.verdicts.iter().any(|v| v.outcome.is_violation())
    }

    pub fn violations(&self) -> impl Iterator<Item = &RuleVerdict> {
        self.verdicts.iter().filter(|v| v.outcome.is_violation())
    }

    pub fn verdict(&self, resource: &str, rule: &str) -> Option<&RuleVerdict> {
        self.verdicts
            .iter()
            .find(|v| v.resource == resource && v.rule == rule)
    }

    /// 将报告以 JSON 保存到文件中
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        io::write_json(path, self)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |value: Option<usize>| value.map_or_else(|| "-".to_owned(), |v| v.to_string());
        writeln!(f, "Route Verification Report: {}", self.route)?;
        writeln!(
            f,
            "net: {} places, {} transitions, {} arcs; {} steps, {} paths",
            self.net.places,
            self.net.transitions,
            self.net.arcs,
            count(self.net.steps),
            count(self.net.paths)
        )?;
        for set in &self.parallel_sets {
            writeln!(f, "parallel: {{{}}}", set.join(", "))?;
        }
        for verdict in &self.verdicts {
            let pattern = verdict
                .pattern
                .map_or_else(|| "UNCLASSIFIED".to_owned(), |p| p.to_string());
            writeln!(
                f,
                "[{}] {} {}: {}",
                verdict.resource, verdict.rule, pattern, verdict.outcome
            )?;
        }
        Ok(())
    }
}
