//! 使用控制策略：只读的资源/合同/规则输入模型，模式识别与公式生成.
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod formula;
mod pattern;

pub use formula::{FormulaTags, MAX_NESTED_BOUND, build_formula, build_formula_for};
pub use pattern::{PolicyPattern, classify};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("rule {rule} has no {operand:?} constraint")]
    MissingConstraint { rule: String, operand: LeftOperand },
    #[error("rule {rule}: {value:?} is not a usage bound")]
    InvalidBound { rule: String, value: String },
    #[error("rule {rule}: bound {bound} nests deeper than {max} reads")]
    BoundTooDeep { rule: String, bound: u64, max: u64 },
}

/// A resource offered by the connector, with the contracts governing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub contract_offers: Vec<ContractOffer>,
}

impl Resource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            contract_offers: Vec::new(),
        }
    }

    pub fn offer(mut self, offer: ContractOffer) -> Self {
        self.contract_offers.push(offer);
        self
    }

    /// 按合同顺序列出所有规则.
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.contract_offers.iter().flat_map(ContractOffer::rules)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractOffer {
    #[serde(default)]
    pub permissions: Vec<Rule>,
    #[serde(default)]
    pub prohibitions: Vec<Rule>,
    #[serde(default)]
    pub obligations: Vec<Rule>,
}

impl ContractOffer {
    /// Rules of the offer; the list a rule sits in decides its kind.
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        let tagged = |kind: RuleKind| move |rule: &Rule| Rule { kind, ..rule.clone() };
        self.permissions
            .iter()
            .map(tagged(RuleKind::Permission))
            .chain(self.prohibitions.iter().map(tagged(RuleKind::Prohibition)))
            .chain(self.obligations.iter().map(tagged(RuleKind::Obligation)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    #[default]
    Permission,
    Prohibition,
    Obligation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub kind: RuleKind,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub post_duties: Vec<Duty>,
}

impl Rule {
    pub fn permission(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn prohibition(id: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Prohibition,
            ..Self::permission(id)
        }
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn post_duty(mut self, duty: Duty) -> Self {
        self.post_duties.push(duty);
        self
    }

    pub fn constraint_on(&self, operand: LeftOperand) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.left_operand == operand)
    }

    pub fn has_duty(&self, action: Action) -> bool {
        self.post_duties.iter().any(|duty| duty.actions.contains(&action))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub left_operand: LeftOperand,
    pub operator: BinaryOperator,
    pub right_operand: String,
}

impl Constraint {
    pub fn new(
        left_operand: LeftOperand,
        operator: BinaryOperator,
        right_operand: impl Into<String>,
    ) -> Self {
        Self {
            left_operand,
            operator,
            right_operand: right_operand.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Duty {
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Duty {
    pub fn action(action: Action) -> Self {
        Self {
            actions: vec![action],
            constraints: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeftOperand {
    Count,
    ElapsedTime,
    System,
    PolicyEvaluationTime,
    Purpose,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinaryOperator {
    Eq,
    Lteq,
    Gteq,
    Shorter,
    ShorterEq,
    After,
    Before,
    SameAs,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Use,
    Log,
    Notify,
    Delete,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_lists_decide_rule_kind() {
        let offer = ContractOffer {
            permissions: vec![Rule::permission("p")],
            prohibitions: vec![Rule::permission("x")],
            obligations: vec![Rule::permission("o")],
        };
        let kinds: Vec<_> = offer.rules().map(|r| (r.id, r.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("p".to_owned(), RuleKind::Permission),
                ("x".to_owned(), RuleKind::Prohibition),
                ("o".to_owned(), RuleKind::Obligation),
            ]
        );
    }

    #[test]
    fn resource_deserializes_with_unknown_vocabulary() {
        let json = r#"{
            "id": "R1",
            "contractOffers": [{
                "permissions": [{
                    "id": "rule-1",
                    "constraints": [
                        {"leftOperand": "COUNT", "operator": "LTEQ", "rightOperand": "3"},
                        {"leftOperand": "ABSOLUTE_SPATIAL_POSITION", "operator": "INSIDE", "rightOperand": "x"}
                    ],
                    "postDuties": [{"actions": ["LOG", "ANONYMIZE"]}]
                }]
            }]
        }"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        let rule = resource.rules().next().unwrap();

        assert_eq!(rule.constraints[1].left_operand, LeftOperand::Unknown);
        assert_eq!(rule.constraints[1].operator, BinaryOperator::Unknown);
        assert!(rule.has_duty(Action::Log));
        assert!(!rule.has_duty(Action::Notify));
        assert_eq!(
            rule.constraint_on(LeftOperand::Count).map(|c| c.right_operand.as_str()),
            Some("3")
        );
    }
}
