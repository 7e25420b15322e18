//! 配置校验模块
//!
//! 校验规则：
//! - 数值范围 (target_fps, 通道容量, 超时, 轮询间隔) 由 `validator` derive 检查
//! - UDP 监听地址可解析
//! - sink 名称非空，network sink 必须有合法 addr

use std::net::SocketAddr;

use contracts::{ContractError, SinkType, SourceId, StreamerConfig};
use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 StreamerConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &StreamerConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_bind_addrs(config)?;
    validate_sink(config)?;
    Ok(())
}

/// 校验数值范围
fn validate_ranges(config: &StreamerConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_error("", &errors)
            .unwrap_or_else(|| ("<root>".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 展开嵌套错误，返回第一个字段路径与描述
fn first_error(prefix: &str, errors: &ValidationErrors) -> Option<(String, String)> {
    for (key, kind) in errors.errors() {
        let path = format!("{prefix}{key}");
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    return Some((path, err.to_string()));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_error(&format!("{path}."), inner) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_error(&format!("{path}[{idx}]."), inner) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// 校验 UDP 监听地址
fn validate_bind_addrs(config: &StreamerConfig) -> Result<(), ContractError> {
    for source in SourceId::ALL {
        let Some(udp) = config.sources.udp(source) else {
            continue;
        };
        if let Some(addr) = &udp.bind_addr {
            addr.parse::<SocketAddr>().map_err(|e| {
                ContractError::config_validation(
                    format!("sources.{source}.bind_addr"),
                    format!("invalid socket address '{addr}': {e}"),
                )
            })?;
        }
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sink(config: &StreamerConfig) -> Result<(), ContractError> {
    let sink = &config.sink;
    if sink.name.is_empty() {
        return Err(ContractError::config_validation(
            "sink.name",
            "sink name cannot be empty",
        ));
    }

    if sink.sink_type == SinkType::Network {
        let addr = sink.params.get("addr").ok_or_else(|| {
            ContractError::config_validation("sink.params.addr", "network sink requires 'addr'")
        })?;
        addr.parse::<SocketAddr>().map_err(|e| {
            ContractError::config_validation(
                "sink.params.addr",
                format!("invalid socket address '{addr}': {e}"),
            )
        })?;
    }
    Ok(())
}
