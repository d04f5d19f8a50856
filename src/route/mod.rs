//! 应用数据流路由的只读输入模型及其到 Petri 网的构建.
use serde::{Deserialize, Serialize};

use crate::net::TransitionKind;

mod builder;

pub use builder::{RouteBuilder, RouteNet, fill_write_and_erase};

/// 路由或嵌套的路由步骤.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    #[serde(default)]
    pub start_endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub end_endpoints: Vec<Endpoint>,
    /// 此阶段产出的资源标识符.
    #[serde(default)]
    pub output_resources: Vec<String>,
    #[serde(default)]
    pub sub_routes: Vec<Route>,
}

impl Route {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn start(mut self, endpoint: Endpoint) -> Self {
        self.start_endpoints.push(endpoint);
        self
    }

    pub fn end(mut self, endpoint: Endpoint) -> Self {
        self.end_endpoints.push(endpoint);
        self
    }

    pub fn output(mut self, resource: impl Into<String>) -> Self {
        self.output_resources.push(resource.into());
        self
    }

    pub fn step(mut self, sub_route: Route) -> Self {
        self.sub_routes.push(sub_route);
        self
    }

    /// 树中路由节点数，重复的标识符按出现次数计.
    pub fn node_count(&self) -> usize {
        1 + self.sub_routes.iter().map(Route::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: String,
    #[serde(default)]
    pub context_tags: Vec<String>,
    #[serde(default)]
    pub kind: TransitionKind,
}

impl Endpoint {
    pub fn app(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn control(id: impl Into<String>) -> Self {
        Self {
            kind: TransitionKind::Control,
            ..Self::app(id)
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.context_tags.push(tag.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_tree_deserializes_with_defaults() {
        let json = r#"{
            "id": "root",
            "subRoutes": [
                { "id": "s1", "startEndpoints": [{ "id": "e0", "contextTags": ["logging"] }],
                  "endEndpoints": [{ "id": "e1", "kind": "CONTROL" }],
                  "outputResources": ["R1"] }
            ]
        }"#;
        let route: Route = serde_json::from_str(json).unwrap();

        assert_eq!(route.node_count(), 2);
        assert!(route.start_endpoints.is_empty());
        let step = &route.sub_routes[0];
        assert_eq!(step.start_endpoints[0].context_tags, vec!["logging"]);
        assert_eq!(step.start_endpoints[0].kind, TransitionKind::App);
        assert_eq!(step.end_endpoints[0].kind, TransitionKind::Control);
    }
}
