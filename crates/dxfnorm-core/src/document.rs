//! CAD文档数据模型
//!
//! 文档独占其图层、块定义、资源表与各布局中的实体；
//! 所有会破坏引用关系的修改（删除块、新增布局）都经由这里的方法完成。

use crate::block::{BlockDefinition, BlockTable};
use crate::entity::Entity;
use crate::layer::{is_reserved, LayerError, LayerTable};
use crate::layout::Layout;
use crate::resources::{
    standard_line_types, standard_text_styles, LineTypeDef, ResourceTable, TextStyle,
};
use std::collections::BTreeSet;

/// CAD文档
#[derive(Debug, Clone)]
pub struct Document {
    /// 文档名称（通常是来源文件名）
    pub name: String,

    /// 图层表
    layers: LayerTable,

    /// 块定义表
    blocks: BlockTable,

    /// 线型表
    line_types: ResourceTable<LineTypeDef>,

    /// 文字样式表
    text_styles: ResourceTable<TextStyle>,

    /// 布局（索引 0 始终是模型空间）
    layouts: Vec<Layout>,
}

impl Document {
    /// 创建新文档：0 层、模型空间、标准线型与 Standard 文字样式
    pub fn new() -> Self {
        Self {
            name: String::new(),
            layers: LayerTable::new(),
            blocks: BlockTable::new(),
            line_types: standard_line_types(),
            text_styles: standard_text_styles(),
            layouts: vec![Layout::model()],
        }
    }

    /// 创建指定名称的新文档
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new()
        }
    }

    pub fn layers(&self) -> &LayerTable {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerTable {
        &mut self.layers
    }

    pub fn blocks(&self) -> &BlockTable {
        &self.blocks
    }

    pub fn line_types(&self) -> &ResourceTable<LineTypeDef> {
        &self.line_types
    }

    pub fn line_types_mut(&mut self) -> &mut ResourceTable<LineTypeDef> {
        &mut self.line_types
    }

    pub fn text_styles(&self) -> &ResourceTable<TextStyle> {
        &self.text_styles
    }

    pub fn text_styles_mut(&mut self) -> &mut ResourceTable<TextStyle> {
        &mut self.text_styles
    }

    /// 添加块定义
    pub fn add_block(&mut self, block: BlockDefinition) -> Result<(), DocumentError> {
        let name = block.name.clone();
        if self.blocks.add_block(block) {
            Ok(())
        } else {
            Err(DocumentError::DuplicateBlock(name))
        }
    }

    /// 所有布局
    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    /// 所有布局（可变）
    pub fn layouts_mut(&mut self) -> &mut [Layout] {
        &mut self.layouts
    }

    /// 同时借用布局（可变）与块定义表（只读），用于块展开
    pub fn layouts_with_blocks(&mut self) -> (&mut [Layout], &BlockTable) {
        (self.layouts.as_mut_slice(), &self.blocks)
    }

    /// 按名称查找布局（不区分大小写）
    pub fn layout(&self, name: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// 主布局（模型空间）
    pub fn model_space(&self) -> &Layout {
        &self.layouts[0]
    }

    /// 主布局（可变）
    pub fn model_space_mut(&mut self) -> &mut Layout {
        &mut self.layouts[0]
    }

    /// 添加图纸空间布局
    pub fn add_layout(&mut self, layout: Layout) -> Result<&mut Layout, DocumentError> {
        if self.layout(&layout.name).is_some() {
            return Err(DocumentError::DuplicateLayout(layout.name));
        }
        self.layouts.push(layout);
        let idx = self.layouts.len() - 1;
        Ok(&mut self.layouts[idx])
    }

    /// 删除块定义
    ///
    /// 布局根块不可删除；仍被布局中的块参照或其他块定义引用时拒绝删除（自引用不计）。
    pub fn remove_block(&mut self, name: &str) -> Result<BlockDefinition, DocumentError> {
        if !self.blocks.contains(name) {
            return Err(DocumentError::BlockNotFound(name.to_string()));
        }
        if crate::block::is_layout_root_name(name) {
            return Err(DocumentError::ReservedBlock(name.to_string()));
        }
        if let Some(referenced_by) = self.block_referrer(name) {
            return Err(DocumentError::BlockInUse {
                block: name.to_string(),
                referenced_by,
            });
        }

        self.blocks
            .remove_block(name)
            .ok_or_else(|| DocumentError::BlockNotFound(name.to_string()))
    }

    /// 块定义是否仍被引用
    pub fn block_in_use(&self, name: &str) -> bool {
        self.block_referrer(name).is_some()
    }

    /// 找到第一个引用该块的位置（布局名或块名）
    fn block_referrer(&self, name: &str) -> Option<String> {
        for layout in &self.layouts {
            if layout.entities().iter().any(|e| e.block_name() == Some(name)) {
                return Some(format!("layout {}", layout.name));
            }
        }

        self.blocks
            .iter()
            .filter(|block| block.name != name)
            .find(|block| block.entities.iter().any(|e| e.block_name() == Some(name)))
            .map(|block| format!("block {}", block.name))
    }

    /// 所有实体（各布局、各块定义、块参照属性）被引用的图层名称
    pub fn referenced_layer_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.for_each_entity(|entity| {
            if !names.contains(&entity.layer) {
                names.insert(entity.layer.clone());
            }
        });
        names
    }

    /// 为被引用但未定义的图层创建默认图层，返回新建数量
    pub fn ensure_referenced_layers(&mut self) -> usize {
        let mut created = 0;
        for name in self.referenced_layer_names() {
            if !self.layers.contains(&name) {
                self.layers.ensure_layer(&name);
                created += 1;
            }
        }
        created
    }

    /// 删除未被引用的图层（保留图层除外），返回被删除的图层名称
    pub fn remove_unreferenced_layers(&mut self) -> Result<Vec<String>, DocumentError> {
        let referenced = self.referenced_layer_names();
        let mut removed = Vec::new();

        for name in self.layers.names() {
            if referenced.contains(&name) || is_reserved(&name) {
                continue;
            }
            self.layers.delete_layer(&name)?;
            removed.push(name);
        }

        Ok(removed)
    }

    /// 将位于 `from` 图层上的实体移到 `to` 图层，返回移动数量
    ///
    /// 包括块定义内的实体与块参照的属性。
    pub fn move_entities(&mut self, from: &str, to: &str) -> usize {
        if from == to {
            return 0;
        }
        let mut moved = 0;
        self.for_each_entity_mut(|entity| {
            if entity.layer == from {
                entity.layer = to.to_string();
                moved += 1;
            }
        });
        moved
    }

    /// 访问所有实体（包括块定义内实体与块参照属性）
    pub fn for_each_entity(&self, mut f: impl FnMut(&Entity)) {
        let layout_entities = self.layouts.iter().flat_map(|l| l.entities().iter());
        let block_entities = self.blocks.iter().flat_map(|b| b.entities.iter());

        for entity in layout_entities.chain(block_entities) {
            f(entity);
            for attribute in entity.attributes() {
                f(attribute);
            }
        }
    }

    /// 访问所有实体（可变）
    pub fn for_each_entity_mut(&mut self, mut f: impl FnMut(&mut Entity)) {
        let layout_entities = self.layouts.iter_mut().flat_map(|l| l.entities_mut().iter_mut());
        let block_entities = self.blocks.iter_mut().flat_map(|b| b.entities.iter_mut());

        for entity in layout_entities.chain(block_entities) {
            f(entity);
            if let Some(attributes) = entity.attributes_mut() {
                attributes.iter_mut().for_each(&mut f);
            }
        }
    }

    /// 所有布局中的实体总数
    pub fn entity_count(&self) -> usize {
        self.layouts.iter().map(Layout::entity_count).sum()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// 文档操作错误
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocumentError {
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Block already exists: {0}")]
    DuplicateBlock(String),

    #[error("Cannot delete layout root block {0}")]
    ReservedBlock(String),

    #[error("Block {block} is still referenced by {referenced_by}")]
    BlockInUse { block: String, referenced_by: String },

    #[error("Layout already exists: {0}")]
    DuplicateLayout(String),

    #[error(transparent)]
    Layer(#[from] LayerError),
}
