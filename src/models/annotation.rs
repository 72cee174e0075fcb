use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 默认线宽（像素）
pub const DEFAULT_LINE_WIDTH: u32 = 2;
/// 默认字号（像素）
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// 标注图形
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Shape {
    /// 坐标: [center_x, center_y, radius]
    Circle,
    /// 坐标: [x1, y1, x2, y2]
    Rectangle,
    /// 坐标: [x1, y1, x2, y2]
    Line,
    /// 模型返回的未知图形，只绘制文字
    Other(String),
}

impl Shape {
    /// 该图形需要的坐标数量
    pub fn expected_coordinates(&self) -> Option<usize> {
        match self {
            Shape::Circle => Some(3),
            Shape::Rectangle | Shape::Line => Some(4),
            Shape::Other(_) => None,
        }
    }
}

impl From<String> for Shape {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "circle" => Shape::Circle,
            "rectangle" | "rect" => Shape::Rectangle,
            "line" => Shape::Line,
            _ => Shape::Other(value),
        }
    }
}

impl From<Shape> for String {
    fn from(shape: Shape) -> Self {
        shape.to_string()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Circle => write!(f, "circle"),
            Shape::Rectangle => write!(f, "rectangle"),
            Shape::Line => write!(f, "line"),
            Shape::Other(name) => write!(f, "{}", name),
        }
    }
}

/// 一条图片标注指令
///
/// 坐标可以是 [0,1] 区间内的比例，也可以是绝对像素值，由渲染器逐个判断。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationInstruction {
    pub shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub coordinates: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_question_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub question_number: Option<u32>,
}

impl AnnotationInstruction {
    pub fn line_width_or_default(&self) -> u32 {
        self.line_width
            .filter(|w| w.is_finite() && *w >= 1.0)
            .map(|w| w.round() as u32)
            .unwrap_or(DEFAULT_LINE_WIDTH)
    }

    pub fn font_size_or_default(&self) -> f32 {
        self.font_size
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE)
    }

    /// 非空的标注文字
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

// 模型有时会把题号写成字符串 "3"
fn lenient_question_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
