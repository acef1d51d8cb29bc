//! 配置校验模块
//!
//! 校验规则：
//! - batch_size >= 1
//! - flush_interval_ms / delivery_timeout_ms >= 1
//! - delivery 名称非空
//! - delivery 类型所需参数齐全 (http: url, file: path)

use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};
use contracts::{ContractError, PipelineConfig};

/// 校验 PipelineConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &PipelineConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_delivery_params(config)?;
    Ok(())
}

/// 基于 derive 规则的字段校验
fn validate_fields(config: &PipelineConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_error("", &errors)
                .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

/// 按字段名排序后取第一个错误，保证报错稳定
fn first_error(prefix: &str, errors: &ValidationErrors) -> Option<(String, String)> {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by_key(|(field, _)| field.to_string());

    for (field, kind) in entries {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        let found = match kind {
            ValidationErrorsKind::Field(errs) => errs.first().map(|e| {
                let message = match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("failed '{}' check", e.code),
                };
                (path.clone(), message)
            }),
            ValidationErrorsKind::Struct(inner) => first_error(&path, inner),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_error(&format!("{path}[{idx}]"), inner)),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// 校验 delivery 类型特定参数
fn validate_delivery_params(config: &PipelineConfig) -> Result<(), ContractError> {
    let delivery = &config.delivery;
    for param in delivery.delivery_type.required_params() {
        let present = delivery
            .params
            .get(*param)
            .is_some_and(|value| !value.trim().is_empty());
        if !present {
            return Err(ContractError::config_validation(
                format!("delivery.params.{param}"),
                format!(
                    "'{param}' is required for {:?} delivery '{}'",
                    delivery.delivery_type, delivery.name
                ),
            ));
        }
    }
    Ok(())
}
