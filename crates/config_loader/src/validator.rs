//! 配置校验模块
//!
//! 校验规则：
//! - 特征列表非空
//! - 特征名非空
//! - 循环体非空
//! - 分支至少一侧非空
//! - camera_wait_iterations / frame_wait_ms > 0
//! - live_cycles (若设置) > 0

use contracts::{AcquisitionPlan, ContractError, FeatureSpec, PlanElement};

/// 校验采集计划
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(plan: &AcquisitionPlan) -> Result<(), ContractError> {
    validate_acquisition(plan)?;
    if plan.features.is_empty() {
        return Err(ContractError::config_validation(
            "features",
            "feature list cannot be empty",
        ));
    }
    validate_elements(&plan.features, "features")
}

/// 校验运行参数
fn validate_acquisition(plan: &AcquisitionPlan) -> Result<(), ContractError> {
    let acquisition = &plan.acquisition;

    if acquisition.camera_wait_iterations == 0 {
        return Err(ContractError::config_validation(
            "acquisition.camera_wait_iterations",
            "camera_wait_iterations must be > 0",
        ));
    }
    if acquisition.frame_wait_ms == 0 {
        return Err(ContractError::config_validation(
            "acquisition.frame_wait_ms",
            "frame_wait_ms must be > 0",
        ));
    }
    if acquisition.live_cycles == Some(0) {
        return Err(ContractError::config_validation(
            "acquisition.live_cycles",
            "live_cycles must be > 0 when set",
        ));
    }
    Ok(())
}

/// 递归校验特征列表
fn validate_elements(elements: &[PlanElement], path: &str) -> Result<(), ContractError> {
    for (idx, element) in elements.iter().enumerate() {
        let here = format!("{path}[{idx}]");
        match element {
            PlanElement::Feature(spec) => validate_feature(spec, &here)?,
            PlanElement::Sequence(items) => validate_elements(items, &here)?,
            PlanElement::Loop(group) => {
                if group.body.is_empty() {
                    return Err(ContractError::config_validation(
                        format!("{here}.loop"),
                        format!("loop controlled by '{}' has an empty body", group.control.name),
                    ));
                }
                validate_elements(&group.body, &format!("{here}.loop"))?;
                validate_feature(&group.control, &format!("{here}.control"))?;
            }
            PlanElement::Branch(branch) => {
                validate_feature(&branch.condition, &format!("{here}.branch"))?;
                if branch.on_true.is_empty() && branch.on_false.is_empty() {
                    return Err(ContractError::config_validation(
                        here,
                        format!("branch on '{}' has no arms", branch.condition.name),
                    ));
                }
                validate_elements(&branch.on_true, &format!("{here}.on_true"))?;
                validate_elements(&branch.on_false, &format!("{here}.on_false"))?;
            }
        }
    }
    Ok(())
}

fn validate_feature(spec: &FeatureSpec, path: &str) -> Result<(), ContractError> {
    if spec.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            format!("{path}.name"),
            "feature name cannot be empty",
        ));
    }
    Ok(())
}
