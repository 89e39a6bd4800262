//! 提醒模板引擎
//!
//! 按紧急程度选取标题与正文模板，支持 `{{variable}}` 语法。
//!
//! ```ignore
//! let engine = TemplateEngine::with_defaults()?;
//! let message = engine.render_reminder(&payload);
//! // message.subject: "【认证到期提醒】AWS SAP 还剩 30 天"
//! ```

use std::collections::HashMap;

use regex::Regex;
use tracing::warn;

use super::types::{ReminderPayload, RenderedMessage};
use crate::error::{CertificationError, Result};
use crate::models::UrgencyTier;

/// 模板引擎
pub struct TemplateEngine {
    subjects: HashMap<UrgencyTier, String>,
    bodies: HashMap<UrgencyTier, String>,
    variable_regex: Regex,
}

impl TemplateEngine {
    /// 创建空的模板引擎
    pub fn new() -> Result<Self> {
        let variable_regex = Regex::new(r"\{\{(\w+)\}\}")
            .map_err(|e| CertificationError::Internal(format!("模板变量正则无效: {}", e)))?;
        Ok(Self {
            subjects: HashMap::new(),
            bodies: HashMap::new(),
            variable_regex,
        })
    }

    /// 创建带有默认模板的引擎
    pub fn with_defaults() -> Result<Self> {
        let mut engine = Self::new()?;
        engine.register_default_templates();
        Ok(engine)
    }

    fn register_default_templates(&mut self) {
        self.register_template(
            UrgencyTier::Planning,
            "【认证规划】{{certification_name}} 将在一年内到期",
            "{{user_name}}，您好：\n\n您持有的 {{vendor}} {{certification_name}}（证书编号 {{certificate_number}}）将于 {{expires_on}} 到期，剩余 {{days_remaining}} 天。\n建议现在开始规划续证或升级路径。\n\n续证指引：{{renewal_url}}",
        );
        self.register_template(
            UrgencyTier::Preparation,
            "【认证准备】{{certification_name}} 还剩约半年",
            "{{user_name}}，您好：\n\n{{vendor}} {{certification_name}} 将于 {{expires_on}} 到期，剩余 {{days_remaining}} 天。\n请开始准备续证所需的学习与考试安排。\n\n续证指引：{{renewal_url}}",
        );
        self.register_template(
            UrgencyTier::Action,
            "【认证到期提醒】{{certification_name}} 还剩 {{days_remaining}} 天",
            "{{user_name}}，您好：\n\n{{vendor}} {{certification_name}} 将于 {{expires_on}} 到期。\n请尽快预约续证考试。\n\n续证指引：{{renewal_url}}",
        );
        self.register_template(
            UrgencyTier::Urgent,
            "【紧急】{{certification_name}} 还剩 {{days_remaining}} 天到期",
            "{{user_name}}，您好：\n\n{{vendor}} {{certification_name}} 将于 {{expires_on}} 到期，剩余 {{days_remaining}} 天。\n如尚未安排续证，请立即处理。\n\n续证指引：{{renewal_url}}",
        );
        self.register_template(
            UrgencyTier::Critical,
            "【危急】{{certification_name}} 即将在 {{days_remaining}} 天内失效",
            "{{user_name}}，您好：\n\n{{vendor}} {{certification_name}} 将于 {{expires_on}} 失效，仅剩 {{days_remaining}} 天。\n失效后相关积分将不再计入能力等级。\n\n续证指引：{{renewal_url}}",
        );
        self.register_template(
            UrgencyTier::Expired,
            "【已过期】{{certification_name}} 已于 {{expires_on}} 到期",
            "{{user_name}}，您好：\n\n{{vendor}} {{certification_name}}（证书编号 {{certificate_number}}）已于 {{expires_on}} 到期，已过期 {{days_overdue}} 天。\n请重新考取后在系统中提交新证书。\n\n续证指引：{{renewal_url}}",
        );
    }

    /// 注册模板，同档位重复注册会覆盖
    pub fn register_template(
        &mut self,
        tier: UrgencyTier,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) {
        self.subjects.insert(tier, subject.into());
        self.bodies.insert(tier, body.into());
    }

    /// 渲染模板
    ///
    /// 未找到的变量保留原样并记录警告
    pub fn render(&self, template: &str, vars: &HashMap<&'static str, String>) -> String {
        self.variable_regex
            .replace_all(template, |caps: &regex::Captures| {
                let name = &caps[1];
                match vars.get(name) {
                    Some(value) => value.clone(),
                    None => {
                        warn!(variable = name, "模板变量未找到，保留原样");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    /// 渲染一条到期提醒
    ///
    /// 档位没有注册模板时退回到摘要文本
    pub fn render_reminder(&self, payload: &ReminderPayload) -> RenderedMessage {
        let vars = payload.variables();
        match (self.subjects.get(&payload.tier), self.bodies.get(&payload.tier)) {
            (Some(subject), Some(body)) => RenderedMessage {
                subject: self.render(subject, &vars),
                body: self.render(body, &vars),
            },
            _ => RenderedMessage {
                subject: payload.summary(),
                body: payload.summary(),
            },
        }
    }
}
