//! Owned step tree.
//!
//! A step node is either a nested step or a reference to an attachment. The
//! reference holds only the attachment id; the attachment record itself lives
//! in the store's attachment index and may be shared by many steps.

use serde::{Deserialize, Serialize};

use crate::meta::Parameter;
use crate::status::{StatusDetails, TestStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StepNode {
    Step(Step),
    Attachment(AttachmentLink),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "StatusDetails::is_empty")]
    pub status_details: StatusDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub steps: Vec<StepNode>,
}

/// Reference from a step to an attachment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentLink {
    /// Id of the referenced attachment.
    pub attachment_id: String,
    /// Name under which the attaching step exposed the file.
    pub name: String,
    pub original_file_name: String,
    /// Content type declared on the link, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl StepNode {
    /// Depth-first visit of every attachment link beneath (and including) this node.
    pub fn for_each_link<'a>(&'a self, visit: &mut impl FnMut(&'a AttachmentLink)) {
        match self {
            Self::Attachment(link) => visit(link),
            Self::Step(step) => {
                for child in &step.steps {
                    child.for_each_link(visit);
                }
            }
        }
    }
}

/// All attachment links across a forest of steps, in depth-first order.
#[must_use]
pub fn collect_links(nodes: &[StepNode]) -> Vec<&AttachmentLink> {
    let mut out = Vec::new();
    for node in nodes {
        node.for_each_link(&mut |link| out.push(link));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: &str) -> StepNode {
        StepNode::Attachment(AttachmentLink {
            attachment_id: id.to_owned(),
            name: id.to_owned(),
            original_file_name: format!("{id}.txt"),
            content_type: None,
        })
    }

    #[test]
    fn collects_links_depth_first() {
        let tree = vec![
            link("a"),
            StepNode::Step(Step {
                name: "outer".to_owned(),
                steps: vec![
                    StepNode::Step(Step {
                        name: "inner".to_owned(),
                        steps: vec![link("b")],
                        ..Step::default()
                    }),
                    link("c"),
                ],
                ..Step::default()
            }),
        ];
        let ids: Vec<&str> = collect_links(&tree)
            .into_iter()
            .map(|l| l.attachment_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn step_node_is_tagged() {
        let json = serde_json::to_value(link("x")).expect("encode");
        assert_eq!(json["type"], "attachment");
        assert_eq!(json["attachmentId"], "x");
    }
}
