use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::policy::{Action, BinaryOperator, LeftOperand, Rule, RuleKind};

/// 可识别的使用控制规则模式.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyPattern {
    ProvideAccess,
    ProhibitAccess,
    NTimesUsage,
    DurationUsage,
    UsageDuringInterval,
    UsageUntilDeletion,
    UsageLogging,
    UsageNotification,
    ConnectorRestrictedUsage,
}

impl fmt::Display for PolicyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyPattern::ProvideAccess => "PROVIDE_ACCESS",
            PolicyPattern::ProhibitAccess => "PROHIBIT_ACCESS",
            PolicyPattern::NTimesUsage => "N_TIMES_USAGE",
            PolicyPattern::DurationUsage => "DURATION_USAGE",
            PolicyPattern::UsageDuringInterval => "USAGE_DURING_INTERVAL",
            PolicyPattern::UsageUntilDeletion => "USAGE_UNTIL_DELETION",
            PolicyPattern::UsageLogging => "USAGE_LOGGING",
            PolicyPattern::UsageNotification => "USAGE_NOTIFICATION",
            PolicyPattern::ConnectorRestrictedUsage => "CONNECTOR_RESTRICTED_USAGE",
        };
        f.write_str(name)
    }
}

/// Maps a rule onto its pattern by structure alone. `None` means the shape is
/// not recognised and no formula should be generated.
pub fn classify(rule: &Rule) -> Option<PolicyPattern> {
    let pattern = match rule.kind {
        RuleKind::Prohibition => Some(PolicyPattern::ProhibitAccess),
        RuleKind::Obligation => None,
        RuleKind::Permission => classify_permission(rule),
    };
    debug!("rule {} classified as {:?}", rule.id, pattern);
    pattern
}

fn classify_permission(rule: &Rule) -> Option<PolicyPattern> {
    let has_duty = !rule.post_duties.is_empty();
    match rule.constraints.as_slice() {
        [] if rule.has_duty(Action::Notify) => Some(PolicyPattern::UsageNotification),
        [] if rule.has_duty(Action::Log) => Some(PolicyPattern::UsageLogging),
        [] if !has_duty => Some(PolicyPattern::ProvideAccess),
        [] => None,
        [single] => match (single.left_operand, single.operator) {
            (LeftOperand::Count, _) => Some(PolicyPattern::NTimesUsage),
            (LeftOperand::ElapsedTime, _) => Some(PolicyPattern::DurationUsage),
            (LeftOperand::System, BinaryOperator::Eq | BinaryOperator::SameAs) => {
                Some(PolicyPattern::ConnectorRestrictedUsage)
            }
            _ => None,
        },
        [_, _] if has_duty => Some(PolicyPattern::UsageUntilDeletion),
        [_, _] => Some(PolicyPattern::UsageDuringInterval),
        _ => None,
    }
}
