//! Producer 错误类型

use contracts::SourceId;
use thiserror::Error;

/// Producer 错误
///
/// 通过错误通道上报给 Supervisor，只记录日志，不会终止 Session。
#[derive(Debug, Clone, Error)]
pub enum ProducerError {
    /// 数据包解析失败
    #[error("failed to decode {source_id} packet: {message}")]
    Decode {
        /// 数据源
        source_id: SourceId,
        /// 错误消息
        message: String,
    },

    /// UDP 端口绑定失败
    #[error("failed to bind {source_id} listener on {addr}: {message}")]
    Bind {
        /// 数据源
        source_id: SourceId,
        /// 监听地址
        addr: String,
        /// 错误消息
        message: String,
    },

    /// 共享内存不可用（游戏未运行或页面未映射）
    #[error("{source_id} shared memory unavailable at {path}: {message}")]
    ResourceUnavailable {
        /// 数据源
        source_id: SourceId,
        /// 页面路径
        path: String,
        /// 错误消息
        message: String,
    },
}

impl ProducerError {
    pub fn decode(source_id: SourceId, message: impl Into<String>) -> Self {
        Self::Decode {
            source_id,
            message: message.into(),
        }
    }

    pub fn bind(source_id: SourceId, addr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Bind {
            source_id,
            addr: addr.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(
        source_id: SourceId,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ResourceUnavailable {
            source_id,
            path: path.into(),
            message: message.into(),
        }
    }

    /// 出错的数据源
    pub fn source_id(&self) -> SourceId {
        match self {
            Self::Decode { source_id, .. }
            | Self::Bind { source_id, .. }
            | Self::ResourceUnavailable { source_id, .. } => *source_id,
        }
    }
}

/// Producer Result 类型别名
pub type Result<T> = std::result::Result<T, ProducerError>;
