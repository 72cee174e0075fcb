//! 图片加载器 - 基础设施层
//!
//! 只暴露"把图片引用解析为已解码图片"的能力，评分和标注共用

use base64::Engine;
use image::ImageFormat;
use tokio::fs;
use tracing::debug;

use crate::error::{AppError, AppResult, ImageError};
use crate::models::ImageRef;

/// 已加载并解码校验过的图片
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// 来源描述（路径或内存图片）
    pub label: String,
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl LoadedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// 以 data URL 形式发送给多模态模型
    pub fn to_data_url(&self) -> String {
        let engine = base64::engine::general_purpose::STANDARD;
        format!("data:{};base64,{}", self.mime_type(), engine.encode(&self.bytes))
    }
}

/// 图片加载器
///
/// 职责：
/// - 读取文件路径或直接使用内存字节
/// - 识别格式并完整解码，确保图片可用
/// - 不关心评分流程
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageLoader;

impl ImageLoader {
    pub fn new() -> Self {
        Self
    }

    /// 加载单张图片
    pub async fn load(&self, image: &ImageRef) -> AppResult<LoadedImage> {
        let label = image.label();
        let bytes = match image {
            ImageRef::FilePath(path) => match fs::read(path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(AppError::image_not_found(path.display().to_string()));
                }
                Err(e) => {
                    return Err(AppError::Image(ImageError::ReadFailed {
                        path: label,
                        source: Box::new(e),
                    }));
                }
            },
            ImageRef::InMemoryBytes(bytes) => bytes.clone(),
        };

        Self::decode(label, bytes)
    }

    /// 按顺序加载全部图片，任意一张失败即返回错误
    pub async fn load_all(&self, images: &[ImageRef]) -> AppResult<Vec<LoadedImage>> {
        let mut loaded = Vec::with_capacity(images.len());
        for image in images {
            loaded.push(self.load(image).await?);
        }
        Ok(loaded)
    }

    fn decode(label: String, bytes: Vec<u8>) -> AppResult<LoadedImage> {
        if bytes.is_empty() {
            return Err(AppError::Image(ImageError::EmptyBuffer { label }));
        }

        let format =
            image::guess_format(&bytes).map_err(|e| AppError::image_decode_failed(&label, e))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| AppError::image_decode_failed(&label, e))?;

        debug!(
            "图片加载完成: {} ({:?}, {}x{})",
            label,
            format,
            decoded.width(),
            decoded.height()
        );

        Ok(LoadedImage {
            label,
            width: decoded.width(),
            height: decoded.height(),
            format,
            bytes,
        })
    }
}
