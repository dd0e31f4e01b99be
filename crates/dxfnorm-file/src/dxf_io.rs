//! DXF文件导入/导出
//!
//! 支持：
//! - 图层、线型、文字样式表
//! - 块定义、块参照（含阵列与属性）
//! - 模型空间与图纸空间实体
//! - 光栅图像及其图像定义（IMAGEDEF）
//!
//! 文档模型没有对应类型的实体（标注、引线、填充等）序列化后作为
//! [`Geometry::Foreign`] 保留，导出时原样写回，只替换图层与属性。
//!
//! 第一个图纸布局写入图纸空间（组码 67），其余布局写成 `*Paper_Space{n}` 块，
//! 块描述保存布局名称。dxf crate 不写 LAYOUT 对象，导出的额外布局只保留实体。
//! 块参照的属性（ATTRIB）在 dxf crate 中没有公共属性，导入时继承块参照所在图层。

use crate::error::FileError;
use dxf::entities::EntityType;
use dxfnorm_core::block::{is_layout_root_name, BlockDefinition, BlockReference};
use dxfnorm_core::document::Document;
use dxfnorm_core::entity::Entity;
use dxfnorm_core::geometry::{
    Arc, Circle, Ellipse, Foreign, Geometry, Image, Line, Point, Polyline, PolylineVertex, Spline,
    Text,
};
use dxfnorm_core::layer::Layer;
use dxfnorm_core::layout::{Layout, LayoutKind};
use dxfnorm_core::math::{Point2, Vector2};
use dxfnorm_core::properties::{Color, LineType, LineWeight, Properties};
use dxfnorm_core::resources::{LineTypeDef, TextStyle};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// 默认图纸布局名称
const FIRST_PAPER_LAYOUT: &str = "Layout1";

/// 写入器自动生成的表项，导出时不重复写入
const WRITER_LINE_TYPES: [&str; 3] = ["ByBlock", "ByLayer", "Continuous"];
const WRITER_TEXT_STYLES: [&str; 1] = ["Standard"];

/// 导入时无法保留的实体计数
#[derive(Debug, Default)]
struct Dropped(BTreeMap<String, usize>);

impl Dropped {
    fn record(&mut self, kind: &str) {
        *self.0.entry(kind.to_string()).or_insert(0) += 1;
    }

    fn total(&self) -> usize {
        self.0.values().sum()
    }
}

/// 导入过程中共享的状态
#[derive(Debug, Default)]
struct Reader {
    /// IMAGEDEF 句柄 → 图像文件路径
    image_paths: HashMap<u64, String>,
    dropped: Dropped,
}

impl Reader {
    fn new(drawing: &dxf::Drawing) -> Self {
        let image_paths = drawing
            .objects()
            .filter_map(|object| match &object.specific {
                dxf::objects::ObjectType::ImageDefinition(definition) => {
                    Some((object.common.handle.0, definition.file_path.clone()))
                }
                _ => None,
            })
            .collect();
        Self {
            image_paths,
            dropped: Dropped::default(),
        }
    }

    fn image_path(&self, reference: &str) -> Option<String> {
        let handle = u64::from_str_radix(reference.trim(), 16).ok()?;
        self.image_paths.get(&handle).cloned()
    }
}

/// 从DXF文件导入
pub fn import(path: &Path) -> Result<Document, FileError> {
    let drawing = dxf::Drawing::load_file(path).map_err(|e| FileError::Dxf(e.to_string()))?;

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let document = read_drawing(&drawing, name);

    info!(
        file = %path.display(),
        layers = document.layers().count(),
        blocks = document.blocks().block_count(),
        entities = document.entity_count(),
        "imported"
    );
    Ok(document)
}

/// 把内存中的 DXF 图形转换为文档
pub fn read_drawing(drawing: &dxf::Drawing, name: &str) -> Document {
    let mut document = Document::with_name(name);
    let mut reader = Reader::new(drawing);

    // 导入图层；关闭的图层颜色为负值，dxf crate 读入时已取绝对值
    for layer in drawing.layers() {
        let target = document.layers_mut().ensure_layer(&layer.name);
        target.color = color_from_dxf(&layer.color);
        target.line_type = layer.line_type_name.clone();
        target.line_weight = LineWeight::from_raw(layer.line_weight.raw_value());
    }

    for line_type in drawing.line_types() {
        document.line_types_mut().add(LineTypeDef::new(
            line_type.name.as_str(),
            line_type.description.as_str(),
            line_type.dash_dot_space_lengths.clone(),
        ));
    }

    for style in drawing.styles() {
        let mut text_style = TextStyle::new(style.name.as_str(), style.primary_font_file_name.as_str());
        text_style.height = style.text_height;
        document.text_styles_mut().add(text_style);
    }

    // 块定义；编号的图纸空间块还原为布局
    let mut extra_layouts = Vec::new();
    for block in drawing.blocks() {
        let entities: Vec<Entity> = block
            .entities
            .iter()
            .filter_map(|e| convert_dxf_entity(e, &mut reader))
            .collect();

        if is_layout_root_name(&block.name) {
            if let Some(index) = numbered_paper_space(&block.name) {
                if !entities.is_empty() {
                    extra_layouts.push((index, block.description.clone(), entities));
                }
            }
            continue;
        }

        let mut definition = BlockDefinition::new(
            block.name.as_str(),
            Point2::new(block.base_point.x, block.base_point.y),
        );
        definition.description = block.description.clone();
        definition.entities = entities;
        if let Err(e) = document.add_block(definition) {
            warn!(block = %block.name, "skipping block: {e}");
        }
    }

    // 模型空间与当前图纸空间实体
    let mut paper = Vec::new();
    for entity in drawing.entities() {
        let Some(converted) = convert_dxf_entity(entity, &mut reader) else {
            continue;
        };
        if entity.common.is_in_paper_space {
            paper.push(converted);
        } else {
            document.model_space_mut().add_entity(converted);
        }
    }
    if !paper.is_empty() {
        add_layout(&mut document, FIRST_PAPER_LAYOUT.to_string(), paper);
    }

    extra_layouts.sort_by_key(|(index, _, _)| *index);
    for (index, description, entities) in extra_layouts {
        let name = if description.trim().is_empty() {
            format!("Layout{}", index + 2)
        } else {
            description
        };
        add_layout(&mut document, name, entities);
    }

    if reader.dropped.total() > 0 {
        warn!(
            file = name,
            dropped = reader.dropped.total(),
            kinds = ?reader.dropped.0,
            "entities that could not be kept were dropped"
        );
    }

    document
}

fn add_layout(document: &mut Document, name: String, entities: Vec<Entity>) {
    let count = entities.len();
    match document.add_layout(Layout::paper(name.as_str())) {
        Ok(layout) => layout.extend(entities),
        Err(e) => warn!(layout = %name, entities = count, "skipping layout: {e}"),
    }
}

/// `*Paper_Space0` → 0；`*Paper_Space` 本身返回 `None`
fn numbered_paper_space(name: &str) -> Option<usize> {
    let lower = name.to_ascii_lowercase();
    lower.strip_prefix("*paper_space")?.parse().ok()
}

/// DXF 颜色 → 文档颜色；非索引色（含随实体）按随层处理
fn color_from_dxf(color: &dxf::Color) -> Color {
    if color.is_by_block() {
        Color::ByBlock
    } else {
        color.index().map_or(Color::ByLayer, Color::Index)
    }
}

/// 文档颜色 → DXF 颜色
fn color_to_dxf(color: Color) -> dxf::Color {
    match color {
        Color::ByBlock => dxf::Color::by_block(),
        Color::ByLayer => dxf::Color::by_layer(),
        Color::Index(index) => dxf::Color::from_index(index),
    }
}

/// 文档线宽 → DXF 图层线宽
///
/// dxf crate 只公开了随层/随块两个构造函数，任意线宽经由其 serde 表示构造。
fn line_weight_to_dxf(weight: LineWeight) -> dxf::LineWeight {
    let raw = serde_json::json!({ "raw_value": weight.to_raw() });
    serde_json::from_value(raw).unwrap_or_else(|e| {
        warn!(?weight, "cannot encode line weight, using default: {e}");
        dxf::LineWeight::default()
    })
}

/// 读取实体的公共属性
fn read_common(common: &dxf::entities::EntityCommon) -> (String, Properties) {
    let properties = Properties {
        color: color_from_dxf(&common.color),
        line_type: LineType::from_name(&common.line_type_name),
        line_weight: LineWeight::from_raw(common.lineweight_enum_value),
        true_color: (common.color_24_bit != 0).then_some(common.color_24_bit as u32),
    };
    (common.layer.clone(), properties)
}

fn to_point2(p: &dxf::Point) -> Point2 {
    Point2::new(p.x, p.y)
}

fn to_vector2(v: &dxf::Vector) -> Vector2 {
    Vector2::new(v.x, v.y)
}

/// 将DXF实体转换为文档实体
fn convert_dxf_entity(entity: &dxf::entities::Entity, reader: &mut Reader) -> Option<Entity> {
    let geometry = match &entity.specific {
        EntityType::Line(line) => Geometry::Line(Line::new(to_point2(&line.p1), to_point2(&line.p2))),

        EntityType::Circle(circle) => {
            Geometry::Circle(Circle::new(to_point2(&circle.center), circle.radius))
        }

        EntityType::Arc(arc) => Geometry::Arc(Arc::new(
            to_point2(&arc.center),
            arc.radius,
            arc.start_angle.to_radians(),
            arc.end_angle.to_radians(),
        )),

        EntityType::LwPolyline(lwpoly) => {
            let vertices: Vec<PolylineVertex> = lwpoly
                .vertices
                .iter()
                .map(|v| PolylineVertex::with_bulge(Point2::new(v.x, v.y), v.bulge))
                .collect();
            Geometry::Polyline(Polyline::new(vertices, lwpoly.is_closed()))
        }

        EntityType::Polyline(poly) => {
            let vertices: Vec<PolylineVertex> = poly
                .vertices()
                .map(|v| PolylineVertex::with_bulge(to_point2(&v.location), v.bulge))
                .collect();
            Geometry::Polyline(Polyline::new(vertices, poly.is_closed()))
        }

        EntityType::Text(text) => {
            let mut converted = Text::new(to_point2(&text.location), text.value.as_str(), text.text_height)
                .with_rotation(text.rotation.to_radians());
            converted.style = text.text_style_name.clone();
            Geometry::Text(converted)
        }

        EntityType::MText(mtext) => {
            // 只处理段落换行，其余格式代码原样保留
            let content = mtext.text.replace("\\P", "\n");
            let mut converted = Text::new(to_point2(&mtext.insertion_point), content, mtext.initial_text_height)
                .with_rotation(mtext.rotation_angle.to_radians());
            converted.style = mtext.text_style_name.clone();
            converted.multiline = true;
            Geometry::Text(converted)
        }

        EntityType::ModelPoint(point) => Geometry::Point(Point::new(point.location.x, point.location.y)),

        EntityType::Ellipse(ellipse) => Geometry::Ellipse(Ellipse::arc(
            to_point2(&ellipse.center),
            to_vector2(&ellipse.major_axis),
            ellipse.minor_axis_ratio,
            ellipse.start_parameter,
            ellipse.end_parameter,
        )),

        EntityType::Spline(spline) => {
            let mut converted = Spline::new(spline.degree_of_curve.clamp(1, i32::from(u8::MAX)) as u8);
            converted.control_points = spline.control_points.iter().map(to_point2).collect();
            converted.knots = spline.knot_values.clone();
            converted.fit_points = spline.fit_points.iter().map(to_point2).collect();
            converted.closed = spline.is_closed();
            Geometry::Spline(converted)
        }

        EntityType::Image(image) => Geometry::Image(Image {
            position: to_point2(&image.location),
            u_vector: to_vector2(&image.u_vector),
            v_vector: to_vector2(&image.v_vector),
            size: (image.image_size.x, image.image_size.y),
            file_path: reader.image_path(&image.image_def_reference),
        }),

        EntityType::Insert(insert) => {
            let mut reference = BlockReference::new(insert.name.as_str(), to_point2(&insert.location))
                .with_scale(insert.x_scale_factor, insert.y_scale_factor)
                .with_rotation_degrees(insert.rotation)
                .with_array(
                    array_count(insert.column_count),
                    array_count(insert.row_count),
                    insert.column_spacing,
                    insert.row_spacing,
                );
            reference.attributes = insert
                .attributes()
                .map(|attribute| convert_attribute(attribute, &entity.common.layer))
                .collect();
            Geometry::Insert(reference)
        }

        other => match to_foreign(entity, other) {
            Ok(foreign) => Geometry::Foreign(foreign),
            Err(e) => {
                let kind = format!("{other:?}").split('(').next().unwrap_or_default().to_string();
                debug!(kind = %kind, "cannot keep entity: {e}");
                reader.dropped.record(&kind);
                return None;
            }
        },
    };

    let (layer, properties) = read_common(&entity.common);
    Some(Entity::new(geometry).on_layer(layer).with_properties(properties))
}

/// 阵列行列数（DXF 中为 i16，非正值视为 1）
fn array_count(count: i16) -> u32 {
    u32::try_from(count).unwrap_or(0).max(1)
}

/// 保留未建模的实体
fn to_foreign(entity: &dxf::entities::Entity, specific: &EntityType) -> Result<Foreign, serde_json::Error> {
    let payload = serde_json::to_value(entity)?;
    let kind = match payload.get("specific") {
        Some(serde_json::Value::Object(variant)) => variant.keys().next().cloned(),
        Some(serde_json::Value::String(variant)) => Some(variant.clone()),
        _ => None,
    }
    .unwrap_or_else(|| "Unknown".to_string());

    Ok(Foreign {
        kind,
        block: dimension_block(specific),
        payload,
    })
}

/// 标注引用的匿名块（`*D1` 等）
fn dimension_block(specific: &EntityType) -> Option<String> {
    let base = match specific {
        EntityType::RotatedDimension(dim) => &dim.dimension_base,
        EntityType::RadialDimension(dim) => &dim.dimension_base,
        EntityType::DiameterDimension(dim) => &dim.dimension_base,
        EntityType::AngularThreePointDimension(dim) => &dim.dimension_base,
        EntityType::OrdinateDimension(dim) => &dim.dimension_base,
        _ => return None,
    };
    let name = base.block_name.trim();
    (!name.is_empty() && !is_layout_root_name(name)).then(|| name.to_string())
}

/// 块参照属性 → 带标记的文本实体
fn convert_attribute(attribute: &dxf::entities::Attribute, layer: &str) -> Entity {
    let mut text = Text::new(
        to_point2(&attribute.location),
        attribute.value.as_str(),
        attribute.text_height,
    )
    .with_rotation(attribute.rotation.to_radians());
    text.style = attribute.text_style_name.clone();
    text.tag = Some(attribute.attribute_tag.clone());

    Entity::new(Geometry::Text(text)).on_layer(layer)
}

/// 导出到DXF文件
///
/// 导出前补齐实体引用但未定义的图层。
pub fn export(document: &mut Document, path: &Path) -> Result<(), FileError> {
    let added = document.ensure_referenced_layers();
    if added > 0 {
        debug!(added, "created layers referenced by entities");
    }

    let drawing = write_drawing(document);

    drawing
        .save_file(path)
        .map_err(|e| FileError::Dxf(e.to_string()))?;

    info!(
        file = %path.display(),
        layouts = document.layouts().len(),
        entities = document.entity_count(),
        "exported"
    );
    Ok(())
}

/// 导出过程中共享的状态
struct Writer {
    drawing: dxf::Drawing,
    /// 图像文件路径 → 已写入的 IMAGEDEF 句柄
    image_definitions: HashMap<String, String>,
}

impl Writer {
    /// 同一文件路径只写一个 IMAGEDEF
    fn image_definition(&mut self, path: &str, size: (f64, f64)) -> String {
        if let Some(handle) = self.image_definitions.get(path) {
            return handle.clone();
        }
        let mut definition = dxf::objects::ImageDefinition::default();
        definition.file_path = path.to_string();
        definition.image_width = size.0.round() as i32;
        definition.image_height = size.1.round() as i32;
        let object = dxf::objects::Object::new(dxf::objects::ObjectType::ImageDefinition(definition));
        let handle = self.drawing.add_object(object).common.handle.as_string();
        self.image_definitions.insert(path.to_string(), handle.clone());
        handle
    }

    fn entities<'a>(&mut self, entities: impl IntoIterator<Item = &'a Entity>, paper: bool) -> Vec<dxf::entities::Entity> {
        entities
            .into_iter()
            .filter_map(|e| self.convert(e))
            .map(|mut e| {
                e.common.is_in_paper_space = paper;
                e
            })
            .collect()
    }

    /// 将文档实体转换为DXF实体
    ///
    /// 块参照的属性与图像定义需要图形分配句柄。
    fn convert(&mut self, entity: &Entity) -> Option<dxf::entities::Entity> {
        let specific = match &entity.geometry {
            Geometry::Point(point) => {
                let mut dxf_point_entity = dxf::entities::ModelPoint::default();
                dxf_point_entity.location = dxf_point(&point.position);
                EntityType::ModelPoint(dxf_point_entity)
            }

            Geometry::Line(line) => {
                let mut dxf_line = dxf::entities::Line::default();
                dxf_line.p1 = dxf_point(&line.start);
                dxf_line.p2 = dxf_point(&line.end);
                EntityType::Line(dxf_line)
            }

            Geometry::Circle(circle) => {
                let mut dxf_circle = dxf::entities::Circle::default();
                dxf_circle.center = dxf_point(&circle.center);
                dxf_circle.radius = circle.radius;
                EntityType::Circle(dxf_circle)
            }

            Geometry::Arc(arc) => {
                let mut dxf_arc = dxf::entities::Arc::default();
                dxf_arc.center = dxf_point(&arc.center);
                dxf_arc.radius = arc.radius;
                dxf_arc.start_angle = arc.start_angle.to_degrees();
                dxf_arc.end_angle = arc.end_angle.to_degrees();
                EntityType::Arc(dxf_arc)
            }

            Geometry::Polyline(polyline) => {
                let mut dxf_poly = dxf::entities::LwPolyline::default();
                dxf_poly.vertices = polyline
                    .vertices
                    .iter()
                    .map(|v| {
                        let mut vertex = dxf::LwPolylineVertex::default();
                        vertex.x = v.point.x;
                        vertex.y = v.point.y;
                        vertex.bulge = v.bulge;
                        vertex
                    })
                    .collect();
                dxf_poly.set_is_closed(polyline.closed);
                EntityType::LwPolyline(dxf_poly)
            }

            Geometry::Text(text) if text.multiline => {
                let mut dxf_mtext = dxf::entities::MText::default();
                dxf_mtext.insertion_point = dxf_point(&text.position);
                dxf_mtext.initial_text_height = text.height;
                dxf_mtext.text = text.content.replace('\n', "\\P");
                dxf_mtext.rotation_angle = text.rotation.to_degrees();
                dxf_mtext.text_style_name = text.style.clone();
                EntityType::MText(dxf_mtext)
            }

            Geometry::Text(text) => {
                let mut dxf_text = dxf::entities::Text::default();
                dxf_text.location = dxf_point(&text.position);
                dxf_text.text_height = text.height;
                dxf_text.value = text.content.clone();
                dxf_text.rotation = text.rotation.to_degrees();
                dxf_text.text_style_name = text.style.clone();
                EntityType::Text(dxf_text)
            }

            Geometry::Ellipse(ellipse) => {
                let mut dxf_ellipse = dxf::entities::Ellipse::default();
                dxf_ellipse.center = dxf_point(&ellipse.center);
                dxf_ellipse.major_axis = dxf_vector(&ellipse.major_axis);
                dxf_ellipse.minor_axis_ratio = ellipse.ratio;
                dxf_ellipse.start_parameter = ellipse.start_param;
                dxf_ellipse.end_parameter = ellipse.end_param;
                EntityType::Ellipse(dxf_ellipse)
            }

            Geometry::Spline(spline) => {
                let mut dxf_spline = dxf::entities::Spline::default();
                dxf_spline.degree_of_curve = i32::from(spline.degree);
                dxf_spline.control_points = spline.control_points.iter().map(dxf_point).collect();
                dxf_spline.knot_values = spline.knots.clone();
                dxf_spline.fit_points = spline.fit_points.iter().map(dxf_point).collect();
                dxf_spline.set_is_closed(spline.closed);
                EntityType::Spline(dxf_spline)
            }

            Geometry::Image(image) => {
                let mut dxf_image = dxf::entities::Image::default();
                dxf_image.location = dxf_point(&image.position);
                dxf_image.u_vector = dxf_vector(&image.u_vector);
                dxf_image.v_vector = dxf_vector(&image.v_vector);
                dxf_image.image_size = dxf::Vector::new(image.size.0, image.size.1, 0.0);
                match &image.file_path {
                    Some(path) => dxf_image.image_def_reference = self.image_definition(path, image.size),
                    None => debug!("image without a file reference"),
                }
                EntityType::Image(dxf_image)
            }

            Geometry::Insert(reference) => {
                let mut dxf_insert = dxf::entities::Insert::default();
                dxf_insert.name = reference.block_name.clone();
                dxf_insert.location = dxf_point(&reference.insertion_point);
                dxf_insert.x_scale_factor = reference.scale_x;
                dxf_insert.y_scale_factor = reference.scale_y;
                dxf_insert.rotation = reference.rotation.to_degrees();
                dxf_insert.column_count = clamp_count(reference.column_count);
                dxf_insert.row_count = clamp_count(reference.row_count);
                dxf_insert.column_spacing = reference.column_spacing;
                dxf_insert.row_spacing = reference.row_spacing;
                for attribute in &reference.attributes {
                    if let Some(dxf_attribute) = convert_to_dxf_attribute(attribute) {
                        dxf_insert.add_attribute(&mut self.drawing, dxf_attribute);
                    }
                }
                EntityType::Insert(dxf_insert)
            }

            Geometry::Foreign(foreign) => {
                return match restore_foreign(foreign) {
                    Ok(mut restored) => {
                        write_common(&mut restored.common, &entity.layer, &entity.properties);
                        Some(restored)
                    }
                    Err(e) => {
                        warn!(kind = %foreign.kind, "cannot restore entity, skipped: {e}");
                        None
                    }
                };
            }
        };

        let mut dxf_entity = dxf::entities::Entity::new(specific);
        write_common(&mut dxf_entity.common, &entity.layer, &entity.properties);
        Some(dxf_entity)
    }
}

/// 还原未建模的实体；句柄由写入时重新分配
fn restore_foreign(foreign: &Foreign) -> Result<dxf::entities::Entity, serde_json::Error> {
    let mut entity: dxf::entities::Entity = serde_json::from_value(foreign.payload.clone())?;
    entity.common.handle = dxf::Handle::empty();
    entity.common.__owner_handle = dxf::Handle::empty();
    entity.common.__material_handle = dxf::Handle::empty();
    entity.common.__plot_style_handle = dxf::Handle::empty();
    entity.common.is_in_paper_space = false;
    Ok(entity)
}

/// 把文档转换为内存中的 DXF 图形
pub fn write_drawing(document: &Document) -> dxf::Drawing {
    let mut drawing = dxf::Drawing::new();
    // R12 不支持 LWPOLYLINE 与线宽
    drawing.header.version = dxf::enums::AcadVersion::R2013;

    // 导出图层
    for layer in document.layers().all_layers() {
        drawing.add_layer(convert_layer(layer));
    }

    for line_type in document.line_types().iter() {
        if is_writer_entry(&WRITER_LINE_TYPES, &line_type.name) {
            continue;
        }
        let mut dxf_line_type = dxf::tables::LineType::default();
        dxf_line_type.name = line_type.name.clone();
        dxf_line_type.description = line_type.description.clone();
        dxf_line_type.element_count = line_type.pattern.len() as i32;
        dxf_line_type.total_pattern_length = line_type.pattern_length();
        dxf_line_type.dash_dot_space_lengths = line_type.pattern.clone();
        drawing.add_line_type(dxf_line_type);
    }

    for style in document.text_styles().iter() {
        if is_writer_entry(&WRITER_TEXT_STYLES, &style.name) {
            continue;
        }
        let mut dxf_style = dxf::tables::Style::default();
        dxf_style.name = style.name.clone();
        dxf_style.primary_font_file_name = style.font.clone();
        dxf_style.text_height = style.height;
        drawing.add_style(dxf_style);
    }

    let mut writer = Writer {
        drawing,
        image_definitions: HashMap::new(),
    };

    for block in document.blocks().iter() {
        if block.is_layout_root() {
            continue;
        }
        let mut dxf_block = dxf::Block::default();
        dxf_block.name = block.name.clone();
        dxf_block.base_point = dxf::Point::new(block.base_point.x, block.base_point.y, 0.0);
        dxf_block.description = block.description.clone();
        // 标注的 `*D` 等匿名块
        dxf_block.set_is_anonymous(block.name.starts_with('*'));
        dxf_block.entities = writer.entities(&block.entities, false);
        writer.drawing.add_block(dxf_block);
    }

    let mut paper_index = 0;
    for layout in document.layouts() {
        match layout.kind {
            LayoutKind::Model => {
                for dxf_entity in writer.entities(layout.entities(), false) {
                    writer.drawing.add_entity(dxf_entity);
                }
            }
            LayoutKind::Paper if paper_index == 0 => {
                for dxf_entity in writer.entities(layout.entities(), true) {
                    writer.drawing.add_entity(dxf_entity);
                }
                paper_index += 1;
            }
            LayoutKind::Paper => {
                let mut dxf_block = dxf::Block::default();
                dxf_block.name = format!("*Paper_Space{}", paper_index - 1);
                dxf_block.description = layout.name.clone();
                dxf_block.is_in_paperspace = true;
                dxf_block.entities = writer.entities(layout.entities(), true);
                writer.drawing.add_block(dxf_block);
                paper_index += 1;
            }
        }
    }

    writer.drawing
}

fn is_writer_entry(names: &[&str], name: &str) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name))
}

fn convert_layer(layer: &Layer) -> dxf::tables::Layer {
    let mut dxf_layer = dxf::tables::Layer::default();
    dxf_layer.name = layer.name.clone();
    dxf_layer.color = color_to_dxf(layer.color);
    dxf_layer.line_type_name = layer.line_type.clone();
    dxf_layer.line_weight = line_weight_to_dxf(layer.line_weight);
    dxf_layer
}

fn write_common(common: &mut dxf::entities::EntityCommon, layer: &str, properties: &Properties) {
    common.layer = layer.to_string();
    common.color = color_to_dxf(properties.color);
    common.line_type_name = properties.line_type.name().to_string();
    common.lineweight_enum_value = properties.line_weight.to_raw();
    common.color_24_bit = properties.true_color.map_or(0, |rgb| rgb as i32);
}

fn dxf_point(p: &Point2) -> dxf::Point {
    dxf::Point::new(p.x, p.y, 0.0)
}

fn dxf_vector(v: &Vector2) -> dxf::Vector {
    dxf::Vector::new(v.x, v.y, 0.0)
}

fn clamp_count(count: u32) -> i16 {
    i16::try_from(count.max(1)).unwrap_or(i16::MAX)
}

fn convert_to_dxf_attribute(attribute: &Entity) -> Option<dxf::entities::Attribute> {
    let Geometry::Text(text) = &attribute.geometry else {
        debug!(kind = attribute.geometry.type_name(), "attribute is not text, skipped");
        return None;
    };
    let mut dxf_attribute = dxf::entities::Attribute::default();
    dxf_attribute.location = dxf_point(&text.position);
    dxf_attribute.text_height = text.height;
    dxf_attribute.value = text.content.clone();
    dxf_attribute.rotation = text.rotation.to_degrees();
    dxf_attribute.text_style_name = text.style.clone();
    dxf_attribute.attribute_tag = text.tag.clone().unwrap_or_default();
    Some(dxf_attribute)
}
