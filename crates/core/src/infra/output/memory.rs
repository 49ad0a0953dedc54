use std::sync::{Arc, Mutex};

use crate::domain::error::AppError;
use super::OutputTarget;

/// メモリ出力（クリップボードの代わりに履歴を保持）
///
/// clone したハンドル同士で履歴を共有する。
#[derive(Clone, Default)]
pub struct MemoryOutput {
    delivered: Arc<Mutex<Vec<String>>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.delivered().pop()
    }
}

impl OutputTarget for MemoryOutput {
    fn deliver(&self, text: &str) -> Result<(), AppError> {
        self.delivered
            .lock()
            .map_err(|_| AppError::internal("出力バッファのロックに失敗"))?
            .push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_history() {
        let out = MemoryOutput::new();
        let handle = out.clone();
        out.deliver("first").unwrap();
        out.deliver("second").unwrap();
        assert_eq!(handle.delivered(), vec!["first", "second"]);
        assert_eq!(handle.last().as_deref(), Some("second"));
    }
}
