#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use homework_grader::error::{AppError, LlmError};
use homework_grader::ChatModel;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 一次模型调用的记录
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub image_count: usize,
}

/// 脚本中的一步
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    /// 请求失败
    Fail(String),
    /// 有响应但内容为空（被安全策略拦截时的表现）
    Empty,
}

/// 按顺序返回预设内容的假模型
///
/// 脚本用完后的调用返回请求失败。
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<S, S>>,
        S: Into<String>,
    {
        Self::from_steps(replies.into_iter().map(|r| match r {
            Ok(reply) => Step::Reply(reply.into()),
            Err(message) => Step::Fail(message.into()),
        }))
    }

    pub fn from_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 全部调用都成功的脚本
    pub fn replying<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok::<String, String>(r.into())))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn send_to_llm(
        &self,
        user_message: &str,
        _system_message: Option<&str>,
        imgs: Option<&[String]>,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: user_message.to_string(),
            image_count: imgs.map_or(0, |i| i.len()),
        });

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail(message)) => Err(anyhow!(message)),
            Some(Step::Empty) => Err(AppError::Llm(LlmError::EmptyContent {
                model: "scripted".to_string(),
            })
            .into()),
            None => Err(anyhow!("script exhausted")),
        }
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(width, height)).unwrap();
    path
}
