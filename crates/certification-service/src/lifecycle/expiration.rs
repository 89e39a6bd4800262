//! 到期日计算
//!
//! 按日历月累加，目标月份不存在该日时落到月末

use chrono::{Months, NaiveDate};

use crate::error::{CertificationError, Result};

/// 计算到期日：获得日期 + 有效期月数
pub fn compute_expiration(obtained_on: NaiveDate, validity_months: i32) -> Result<NaiveDate> {
    let months = u32::try_from(validity_months)
        .ok()
        .filter(|m| *m > 0)
        .ok_or_else(|| {
            CertificationError::Validation(format!(
                "validity_months 必须大于 0: {}",
                validity_months
            ))
        })?;

    obtained_on
        .checked_add_months(Months::new(months))
        .ok_or_else(|| {
            CertificationError::Validation(format!(
                "到期日超出范围: obtained_on={}, validity_months={}",
                obtained_on, validity_months
            ))
        })
}
