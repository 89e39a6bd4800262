//! 状态流转校验
//!
//! 所有修改状态的操作都先经过这里

use crate::error::{CertificationError, Result};
use crate::models::{CertificationStatus, StatusTransition, UserCertificationInstance};

/// 校验并执行状态流转
pub fn transition(
    instance: &mut UserCertificationInstance,
    to: CertificationStatus,
) -> Result<StatusTransition> {
    ensure_transition(instance, to)?;
    let change = StatusTransition {
        instance_id: instance.id,
        from: instance.status,
        to,
    };
    instance.status = to;
    Ok(change)
}

/// 只校验，不修改
pub fn ensure_transition(
    instance: &UserCertificationInstance,
    to: CertificationStatus,
) -> Result<()> {
    if instance.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(CertificationError::InvalidTransition {
            instance_id: instance.id,
            from: instance.status,
            to,
        })
    }
}
