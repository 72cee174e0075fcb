//! 标注渲染 - 业务能力层
//!
//! 把模型给出的标注指令画到答题页副本上，输出 `<原文件名>_modified<扩展名>`。
//!
//! ## 坐标换算
//!
//! 每个坐标单独判断：落在 [0, 1] 内视为比例，偶数下标乘以宽度、奇数下标乘以高度；
//! 其余值视为绝对像素，原样使用。圆的半径（下标 2）因此按宽度换算。
//!
//! 已知限制：判断只看数值本身，真实的 0 或 1 像素坐标（例如 (0, 1)）会被当成比例放大。
//! 提示词要求模型统一输出比例坐标，以此规避。
//!
//! 换算后的像素坐标限制在图片四周一倍宽高的范围内，线宽不超过图片长边。

use ab_glyph::{FontVec, PxScale};
use anyhow::Result;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, BusinessError};
use crate::models::{AnnotationInstruction, ImageRef, Shape};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// 文字相对第一个坐标点的纵向偏移
const TEXT_OFFSET_Y: f64 = 10.0;

/// 换算后的图形
#[derive(Debug, Clone, Copy, PartialEq)]
enum Geometry {
    Circle { cx: f64, cy: f64, r: f64 },
    Rectangle { x0: f64, y0: f64, x1: f64, y1: f64 },
    Line { x0: f64, y0: f64, x1: f64, y1: f64 },
    /// 未知图形只绘制文字
    TextOnly,
}

/// 批量渲染统计
#[derive(Debug, Default)]
pub struct RenderSummary {
    pub rendered: Vec<PathBuf>,
    pub failed: usize,
    /// 没有标注或没有文件路径的页
    pub skipped: usize,
}

/// 标注渲染器
pub struct AnnotationRenderer {
    font: Option<FontVec>,
    force_red: bool,
}

impl AnnotationRenderer {
    /// 按配置创建，字体加载失败时只画图形不画文字
    pub fn new(config: &Config) -> Self {
        let font = match fs::read(&config.font_path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!("字体文件无法解析 ({}): {}，标注将不含文字", config.font_path, e);
                    None
                }
            },
            Err(e) => {
                warn!("字体文件无法读取 ({}): {}，标注将不含文字", config.font_path, e);
                None
            }
        };

        Self::with_font(font, config.force_red_annotations)
    }

    pub fn with_font(font: Option<FontVec>, force_red: bool) -> Self {
        Self { font, force_red }
    }

    /// 渲染单张图片，返回输出文件路径
    ///
    /// 源图片不存在或任意一条指令格式错误时，整张图片不输出。
    pub fn render(
        &self,
        image_path: &Path,
        instructions: &[AnnotationInstruction],
        output_folder: &Path,
    ) -> Result<PathBuf> {
        if !image_path.exists() {
            return Err(AppError::image_not_found(image_path.display().to_string()).into());
        }

        let file_name = modified_file_name(image_path)
            .ok_or(AppError::Business(BusinessError::UnnamedImage))?;

        let source = image::open(image_path)
            .map_err(|e| AppError::image_decode_failed(image_path.display().to_string(), e))?;
        let (width, height) = (source.width(), source.height());

        // 先全部换算，任何一条出错都不落盘
        let mut resolved = Vec::with_capacity(instructions.len());
        for instruction in instructions {
            let coords = clamp_to_canvas(
                &to_absolute(&instruction.coordinates, width, height),
                width,
                height,
            );
            let geometry = resolve_geometry(&instruction.shape, &coords)?;
            resolved.push((instruction, coords, geometry));
        }

        let mut canvas = source.to_rgba8();
        for (instruction, coords, geometry) in &resolved {
            let color = self.color_for(instruction);
            draw_geometry(&mut canvas, *geometry, instruction.line_width_or_default(), color);

            if let Some(text) = instruction.text() {
                self.draw_label(&mut canvas, coords, text, instruction.font_size_or_default(), color)?;
            }
        }

        fs::create_dir_all(output_folder)
            .map_err(|e| AppError::file_write_failed(output_folder.display().to_string(), e))?;
        let output_path = output_folder.join(file_name);

        let saved = match ImageFormat::from_path(&output_path) {
            // JPEG 不支持透明通道
            Ok(ImageFormat::Jpeg) => DynamicImage::ImageRgba8(canvas).to_rgb8().save(&output_path),
            _ => canvas.save(&output_path),
        };
        saved.map_err(|e| AppError::file_write_failed(output_path.display().to_string(), e))?;

        info!("标注图片已保存: {}", output_path.display());
        Ok(output_path)
    }

    /// 按页渲染，单页失败只记录日志
    ///
    /// `modifications` 与 `answer_images` 下标对齐；没有标注的页和内存图片不输出。
    pub fn render_pages(
        &self,
        answer_images: &[ImageRef],
        modifications: &[Vec<AnnotationInstruction>],
        output_folder: &Path,
    ) -> RenderSummary {
        let mut summary = RenderSummary::default();

        for (index, (image, instructions)) in answer_images.iter().zip(modifications).enumerate() {
            let page_number = index + 1;

            if instructions.is_empty() {
                summary.skipped += 1;
                continue;
            }

            let Some(path) = image.path() else {
                warn!("[第 {} 页] 内存图片没有文件名，跳过标注", page_number);
                summary.skipped += 1;
                continue;
            };

            match self.render(path, instructions, output_folder) {
                Ok(output) => summary.rendered.push(output),
                Err(e) => {
                    warn!("[第 {} 页] 标注失败 ({}): {:#}", page_number, path.display(), e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    fn color_for(&self, instruction: &AnnotationInstruction) -> Rgba<u8> {
        if self.force_red {
            return RED;
        }
        instruction
            .color
            .as_deref()
            .and_then(parse_color)
            .unwrap_or(RED)
    }

    fn draw_label(
        &self,
        canvas: &mut RgbaImage,
        coords: &[f64],
        text: &str,
        font_size: f32,
        color: Rgba<u8>,
    ) -> Result<()> {
        if coords.len() < 2 {
            return Err(AppError::Business(BusinessError::MalformedInstruction {
                shape: "text".to_string(),
                expected: 2,
                actual: coords.len(),
            })
            .into());
        }

        let Some(font) = &self.font else {
            return Ok(());
        };

        let x = coords[0].round() as i32;
        let y = (coords[1] + TEXT_OFFSET_Y).round() as i32;
        draw_text_mut(canvas, color, x, y, PxScale::from(font_size), font, text);
        Ok(())
    }
}

/// 比例坐标换算为像素坐标（偶数下标按宽度，奇数下标按高度）
pub fn to_absolute(coords: &[f64], width: u32, height: u32) -> Vec<f64> {
    coords
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if (0.0..=1.0).contains(&value) {
                let scale = if index % 2 == 0 { width } else { height };
                value * f64::from(scale)
            } else {
                value
            }
        })
        .collect()
}

/// 限制像素坐标范围：偶数下标在 [-宽, 2宽]，奇数下标在 [-高, 2高]
pub fn clamp_to_canvas(coords: &[f64], width: u32, height: u32) -> Vec<f64> {
    coords
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            let extent = f64::from(if index % 2 == 0 { width } else { height });
            value.clamp(-extent, 2.0 * extent)
        })
        .collect()
}

/// 规范矩形两个角点，保证左上角取最小值、右下角取最大值
pub fn normalize_rect(x0: f64, y0: f64, x1: f64, y1: f64) -> (f64, f64, f64, f64) {
    (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
}

/// `answer.png` -> `answer_modified.png`
pub fn modified_file_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    Some(match path.extension() {
        Some(ext) => format!("{}_modified.{}", stem, ext.to_string_lossy()),
        None => format!("{}_modified", stem),
    })
}

fn resolve_geometry(shape: &Shape, coords: &[f64]) -> Result<Geometry, AppError> {
    if let Some(expected) = shape.expected_coordinates() {
        if coords.len() != expected {
            return Err(AppError::Business(BusinessError::MalformedInstruction {
                shape: shape.to_string(),
                expected,
                actual: coords.len(),
            }));
        }
    }

    Ok(match shape {
        Shape::Circle => Geometry::Circle {
            cx: coords[0],
            cy: coords[1],
            r: coords[2],
        },
        Shape::Rectangle => {
            let (x0, y0, x1, y1) = normalize_rect(coords[0], coords[1], coords[2], coords[3]);
            Geometry::Rectangle { x0, y0, x1, y1 }
        }
        Shape::Line => Geometry::Line {
            x0: coords[0],
            y0: coords[1],
            x1: coords[2],
            y1: coords[3],
        },
        Shape::Other(name) => {
            warn!("未知标注图形: {}，只绘制文字", name);
            Geometry::TextOnly
        }
    })
}

// 线宽向内加粗，与常见画图库一致
fn draw_geometry(canvas: &mut RgbaImage, geometry: Geometry, line_width: u32, color: Rgba<u8>) {
    let longest = canvas.width().max(canvas.height()).max(1);
    let width = line_width.clamp(1, longest) as i32;

    match geometry {
        Geometry::Circle { cx, cy, r } => {
            let center = (cx.round() as i32, cy.round() as i32);
            let radius = r.round() as i32;
            for t in 0..width {
                if radius - t <= 0 {
                    break;
                }
                draw_hollow_circle_mut(canvas, center, radius - t, color);
            }
        }
        Geometry::Rectangle { x0, y0, x1, y1 } => {
            let (left, top) = (x0.round() as i32, y0.round() as i32);
            let (right, bottom) = (x1.round() as i32, y1.round() as i32);
            for t in 0..width {
                let w = right - left + 1 - 2 * t;
                let h = bottom - top + 1 - 2 * t;
                if w <= 0 || h <= 0 {
                    break;
                }
                draw_hollow_rect_mut(
                    canvas,
                    Rect::at(left + t, top + t).of_size(w as u32, h as u32),
                    color,
                );
            }
        }
        Geometry::Line { x0, y0, x1, y1 } => {
            let (dx, dy) = (x1 - x0, y1 - y0);
            let len = (dx * dx + dy * dy).sqrt();
            // 法向量，用于平移出多条平行线
            let (nx, ny) = if len > f64::EPSILON {
                (-dy / len, dx / len)
            } else {
                (0.0, 0.0)
            };
            let half = f64::from(width - 1) / 2.0;
            for t in 0..width {
                let offset = f64::from(t) - half;
                draw_line_segment_mut(
                    canvas,
                    ((x0 + nx * offset) as f32, (y0 + ny * offset) as f32),
                    ((x1 + nx * offset) as f32, (y1 + ny * offset) as f32),
                    color,
                );
            }
        }
        Geometry::TextOnly => {}
    }
}

fn parse_color(name: &str) -> Option<Rgba<u8>> {
    let name = name.trim().to_ascii_lowercase();
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() == 6 {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            return Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]));
        }
        return None;
    }

    Some(match name.as_str() {
        "red" => RED,
        "green" => Rgba([0, 160, 0, 255]),
        "blue" => Rgba([0, 0, 255, 255]),
        "black" => Rgba([0, 0, 0, 255]),
        "yellow" => Rgba([255, 215, 0, 255]),
        "orange" => Rgba([255, 140, 0, 255]),
        _ => return None,
    })
}
