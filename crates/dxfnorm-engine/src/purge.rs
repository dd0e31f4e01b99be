//! 块清理（Purge）
//!
//! 构建有向图 A -> B（块 A 中含有 B 的块参照），用显式栈做深度优先后序遍历，
//! 再按后序的逆序删除：引用者先于被引用者删除，
//! 因此不会在某个块仍被尚未删除的块引用时删除它。
//!
//! 遍历遇到正在访问的节点（环）时放弃依赖顺序，改为按名称长度降序删除。
//! 这只是一个确定性的退化顺序，不保证环存在时的正确性。
//! 仍被引用的块由 [`Document::remove_block`] 拒绝删除，记为跳过。

use crate::report::{Skip, Stage, StageReport};
use dxfnorm_core::block::BlockTable;
use dxfnorm_core::document::Document;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// 节点访问状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// 块删除顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOrder {
    /// 依赖感知顺序（引用者在前）
    Dependency(Vec<String>),
    /// 发现环后退化为名称长度降序
    NameLengthFallback {
        order: Vec<String>,
        /// 检测到环时正在访问的块
        cycle_at: String,
    },
}

impl DeletionOrder {
    pub fn names(&self) -> &[String] {
        match self {
            DeletionOrder::Dependency(order) => order,
            DeletionOrder::NameLengthFallback { order, .. } => order,
        }
    }
}

/// 块引用图（按名称有序，保证遍历确定）
///
/// `keep_self` 为假时不计自引用（与 remove_block 的判定一致）；悬空引用没有对应节点。
fn build_graph(blocks: &BlockTable, keep_self: bool) -> BTreeMap<&str, Vec<&str>> {
    let mut graph = BTreeMap::new();
    for block in blocks.iter() {
        let children: Vec<&str> = block
            .referenced_blocks()
            .into_iter()
            .filter(|child| (keep_self || *child != block.name) && blocks.contains(child))
            .collect();
        graph.insert(block.name.as_str(), children);
    }
    graph
}

/// 位于引用环上的块（含自引用），展开这些块的参照不会终止
pub fn cyclic_blocks(blocks: &BlockTable) -> BTreeSet<String> {
    let graph = build_graph(blocks, true);
    let mut cyclic = BTreeSet::new();

    for &start in graph.keys() {
        // 从 start 的子节点出发，能回到 start 即在环上
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut stack: Vec<&str> = graph.get(start).cloned().unwrap_or_default();
        while let Some(node) = stack.pop() {
            if node == start {
                cyclic.insert(start.to_string());
                break;
            }
            if seen.insert(node) {
                if let Some(children) = graph.get(node) {
                    stack.extend(children.iter().copied());
                }
            }
        }
    }

    if !cyclic.is_empty() {
        debug!(blocks = ?cyclic, "blocks on reference cycles");
    }
    cyclic
}

/// 计算删除顺序
pub fn deletion_order(blocks: &BlockTable) -> DeletionOrder {
    let graph = build_graph(blocks, false);
    let mut state: BTreeMap<&str, VisitState> =
        graph.keys().map(|name| (*name, VisitState::Unvisited)).collect();
    let mut post_order: Vec<String> = Vec::with_capacity(graph.len());

    for &root in graph.keys() {
        if state.get(root) != Some(&VisitState::Unvisited) {
            continue;
        }

        // 栈元素：(节点, 下一个待访问子节点的下标)
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        state.insert(root, VisitState::InProgress);

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            let children = graph.get(node).map(Vec::as_slice).unwrap_or(&[]);

            if let Some(&child) = children.get(next) {
                top.1 += 1;
                match state.get(child).copied().unwrap_or(VisitState::Done) {
                    VisitState::Unvisited => {
                        state.insert(child, VisitState::InProgress);
                        stack.push((child, 0));
                    }
                    VisitState::InProgress => {
                        warn!(block = child, "cycle in block references, falling back to name-length order");
                        return DeletionOrder::NameLengthFallback {
                            order: name_length_order(blocks),
                            cycle_at: child.to_string(),
                        };
                    }
                    VisitState::Done => {}
                }
            } else {
                state.insert(node, VisitState::Done);
                post_order.push(node.to_string());
                stack.pop();
            }
        }
    }

    post_order.reverse();
    DeletionOrder::Dependency(post_order)
}

/// 名称长度降序，同长度按名称排序
fn name_length_order(blocks: &BlockTable) -> Vec<String> {
    let mut names: Vec<String> = blocks.block_names().into_iter().map(String::from).collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    names
}

/// 删除所有可删除的块定义（布局根块除外）
pub fn purge_blocks(doc: &mut Document) -> StageReport {
    let mut report = StageReport::new(Stage::Purge);
    let order = deletion_order(doc.blocks());

    if let DeletionOrder::NameLengthFallback { cycle_at, .. } = &order {
        report.skip(Skip::new(
            format!("block {cycle_at}"),
            "reference cycle detected; using name-length deletion order",
        ));
    }

    for name in order.names() {
        if dxfnorm_core::block::is_layout_root_name(name) {
            continue;
        }
        match doc.remove_block(name) {
            Ok(_) => {
                debug!(block = %name, "purged block definition");
                report.changed += 1;
            }
            Err(e) => report.skip(Skip::new(format!("block {name}"), e.to_string())),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxfnorm_core::block::{BlockDefinition, BlockReference};
    use dxfnorm_core::entity::Entity;
    use dxfnorm_core::geometry::Geometry;
    use dxfnorm_core::math::Point2;

    fn block(name: &str, children: &[&str]) -> BlockDefinition {
        let mut block = BlockDefinition::new(name, Point2::origin());
        for child in children {
            block.add_entity(Entity::new(Geometry::Insert(BlockReference::new(
                *child,
                Point2::origin(),
            ))));
        }
        block
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_dependents_come_first() {
        let mut blocks = BlockTable::new();
        blocks.add_block(block("A", &["B", "C"]));
        blocks.add_block(block("B", &["C"]));
        blocks.add_block(block("C", &[]));
        blocks.add_block(block("D", &["MISSING"]));

        let DeletionOrder::Dependency(order) = deletion_order(&blocks) else {
            panic!("expected dependency order");
        };
        assert_eq!(order.len(), 4);
        assert!(position(&order, "A") < position(&order, "B"));
        assert!(position(&order, "B") < position(&order, "C"));
    }

    #[test]
    fn test_cycle_falls_back_to_name_length() {
        let mut blocks = BlockTable::new();
        blocks.add_block(block("AA", &["B"]));
        blocks.add_block(block("B", &["AA"]));
        blocks.add_block(block("CCC", &[]));
        blocks.add_block(block("DD", &[]));

        let order = deletion_order(&blocks);
        assert!(matches!(order, DeletionOrder::NameLengthFallback { .. }));
        assert_eq!(order.names(), ["CCC", "AA", "DD", "B"]);
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let mut blocks = BlockTable::new();
        blocks.add_block(block("SELF", &["SELF"]));

        assert!(matches!(deletion_order(&blocks), DeletionOrder::Dependency(_)));
    }

    #[test]
    fn test_cyclic_blocks_include_self_reference() {
        let mut blocks = BlockTable::new();
        blocks.add_block(block("SELF", &["SELF", "LEAF"]));
        blocks.add_block(block("A", &["B"]));
        blocks.add_block(block("B", &["C"]));
        blocks.add_block(block("C", &["A"]));
        blocks.add_block(block("ENTRY", &["A", "LEAF"]));
        blocks.add_block(block("LEAF", &[]));

        let cyclic = cyclic_blocks(&blocks);

        let names: Vec<&str> = cyclic.iter().map(String::as_str).collect();
        assert_eq!(names, ["A", "B", "C", "SELF"]);
    }

    #[test]
    fn test_purge_removes_unreferenced_chain() {
        let mut doc = Document::new();
        doc.add_block(block("A", &["B"])).unwrap();
        doc.add_block(block("B", &["C"])).unwrap();
        doc.add_block(block("C", &[])).unwrap();
        doc.add_block(block("*Model_Space", &[])).unwrap();

        let report = purge_blocks(&mut doc);

        assert_eq!(report.changed, 3);
        assert!(report.is_clean());
        assert_eq!(doc.blocks().block_names(), vec!["*Model_Space"]);
    }

    #[test]
    fn test_purge_keeps_referenced_blocks() {
        let mut doc = Document::new();
        doc.add_block(block("USED", &["CHILD"])).unwrap();
        doc.add_block(block("CHILD", &[])).unwrap();
        doc.add_block(block("UNUSED", &["CHILD"])).unwrap();
        doc.model_space_mut().add_entity(Entity::new(Geometry::Insert(
            BlockReference::new("USED", Point2::origin()),
        )));

        let report = purge_blocks(&mut doc);

        assert_eq!(doc.blocks().block_names(), vec!["CHILD", "USED"]);
        assert_eq!(report.changed, 1);
        assert_eq!(report.skipped.len(), 2);
    }
}
