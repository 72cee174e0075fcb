//! 答题页处理上下文
//!
//! 封装"我正在处理第几页，共几页"这一信息

use std::fmt::Display;

/// 答题页处理上下文
#[derive(Debug, Clone, Copy)]
pub struct PageCtx {
    /// 在答题页列表中的下标（从0开始）
    pub page_index: usize,

    /// 展示给模型和日志的页码（从1开始）
    pub page_number: usize,

    pub total_pages: usize,
}

impl PageCtx {
    pub fn new(page_index: usize, total_pages: usize) -> Self {
        Self {
            page_index,
            page_number: page_index + 1,
            total_pages,
        }
    }
}

impl Display for PageCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[第 {}/{} 页]", self.page_number, self.total_pages)
    }
}
