mod clipboard;
mod memory;

pub use clipboard::ClipboardOutput;
pub use memory::MemoryOutput;

use crate::domain::error::AppError;

/// 出力先 trait
pub trait OutputTarget: Send + Sync {
    fn deliver(&self, text: &str) -> Result<(), AppError>;
    fn name(&self) -> &str;
}

/// 描画済みテキストの唯一の出力経路（既定は OS クリップボード）
pub struct OutputRouter {
    target: Box<dyn OutputTarget>,
}

impl OutputRouter {
    pub fn new() -> Self {
        Self::with_target(Box::new(ClipboardOutput::new()))
    }

    /// テストでは MemoryOutput を渡す
    pub fn with_target(target: Box<dyn OutputTarget>) -> Self {
        Self { target }
    }

    /// 空文字はコピーしない
    pub fn deliver_clipboard(&self, text: &str) -> Result<(), AppError> {
        if text.is_empty() {
            return Err(AppError::internal("Nothing to copy"));
        }
        log::debug!("出力先: {}", self.target.name());
        self.target.deliver(text)
    }
}

impl Default for OutputRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_delivers_to_target() {
        let out = MemoryOutput::new();
        let router = OutputRouter::with_target(Box::new(out.clone()));
        router.deliver_clipboard("Hi Marco").unwrap();
        router.deliver_clipboard("Ciao Luca").unwrap();
        assert_eq!(out.delivered(), vec!["Hi Marco", "Ciao Luca"]);
        assert_eq!(out.last().as_deref(), Some("Ciao Luca"));
    }

    #[test]
    fn test_empty_text_not_copied() {
        let out = MemoryOutput::new();
        let router = OutputRouter::with_target(Box::new(out.clone()));
        assert!(router.deliver_clipboard("").is_err());
        assert!(out.delivered().is_empty());
    }
}
