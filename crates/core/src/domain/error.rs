use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_VALIDATION")]
    Validation,
    #[serde(rename = "E_INVALID_STATE")]
    InvalidState,
    #[serde(rename = "E_TEMPLATE")]
    Template,
    #[serde(rename = "E_CSV")]
    Csv,
    #[serde(rename = "E_STORAGE")]
    Storage,
    #[serde(rename = "E_NETWORK")]
    Network,
    #[serde(rename = "E_CRYPTO")]
    Crypto,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "E_VALIDATION",
            Self::InvalidState => "E_INVALID_STATE",
            Self::Template => "E_TEMPLATE",
            Self::Csv => "E_CSV",
            Self::Storage => "E_STORAGE",
            Self::Network => "E_NETWORK",
            Self::Crypto => "E_CRYPTO",
            Self::Internal => "E_INTERNAL",
        }
    }
}

/// アプリケーションエラー（イベントペイロード兼用）
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    /// 入力検証エラー（ダイアログで再入力可能）
    pub fn validation(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidState,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Template,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn csv(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Csv,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Storage,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Network,
            message: msg.into(),
            recoverable: false,
        }
    }

    /// 復号失敗（パスワード再入力で回復可能）
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Crypto,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: msg.into(),
            recoverable: false,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
